// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The degrade stage and the closed set of governor broadcast events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many tiers of visual quality have been sacrificed for stability.
///
/// Stages are cumulative and, within a session, monotonically non-decreasing:
///
/// | Stage | Meaning |
/// |---|---|
/// | 0 | full quality |
/// | 1 | shadows, bloom and ambient occlusion off, anisotropy capped |
/// | 2 | + reflections and global illumination off |
/// | 3 | + anisotropy forced to its minimum |
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct DegradeStage(u8);

impl DegradeStage {
    /// Full quality.
    pub const FULL: Self = Self(0);
    /// The last stage; nothing further can be disabled.
    pub const MAX: Self = Self(3);

    /// Creates a stage, saturating at [`DegradeStage::MAX`].
    #[inline]
    pub const fn new(stage: u8) -> Self {
        if stage > Self::MAX.0 {
            Self::MAX
        } else {
            Self(stage)
        }
    }

    /// The raw stage number.
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// `true` once the last stage is reached.
    #[inline]
    pub const fn is_max(self) -> bool {
        self.0 >= Self::MAX.0
    }

    /// The next stage, or `None` when already at [`DegradeStage::MAX`].
    #[inline]
    pub const fn next(self) -> Option<Self> {
        if self.is_max() {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }
}

impl fmt::Display for DegradeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {}", self.0)
    }
}

/// A process-wide broadcast notification emitted by the governor core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernorEvent {
    /// The degrade stage increased to `stage`.
    Degrade {
        /// The new stage.
        stage: DegradeStage,
    },
    /// The GPU context was lost; the renderer must not be used.
    ContextLost,
    /// The GPU context came back; every GPU-resident resource must be rebuilt.
    ContextRestored,
}
