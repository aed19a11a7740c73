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

//! Mapping of degrade stages to capability toggles.

use vista_core::{CapabilityToggle, DegradeStage, ToggleCapabilitySet};

use CapabilityToggle::*;

const STAGE_1: &[CapabilityToggle] = &[
    Shadows(false),
    Bloom(false),
    AmbientOcclusion(false),
    MaxAnisotropy(2),
];

const STAGE_2: &[CapabilityToggle] = &[
    Shadows(false),
    Bloom(false),
    AmbientOcclusion(false),
    MaxAnisotropy(2),
    Reflections(false),
    GlobalIllumination(false),
];

const STAGE_3: &[CapabilityToggle] = &[
    Shadows(false),
    Bloom(false),
    AmbientOcclusion(false),
    Reflections(false),
    GlobalIllumination(false),
    MaxAnisotropy(1),
];

/// Applies the cumulative toggle set of a degrade stage.
///
/// Stages only move forward; asking for a stage at or below the one already
/// applied does nothing. Jumping several stages at once applies the target
/// stage's full set.
#[derive(Debug, Default)]
pub struct DegradePolicy {
    applied: DegradeStage,
}

impl DegradePolicy {
    /// A policy at full quality.
    pub fn new() -> Self {
        Self::default()
    }

    /// The complete toggle set in effect at `stage`.
    pub fn toggles_for(stage: DegradeStage) -> &'static [CapabilityToggle] {
        match stage.get() {
            0 => &[],
            1 => STAGE_1,
            2 => STAGE_2,
            _ => STAGE_3,
        }
    }

    /// The last stage applied.
    pub fn applied_stage(&self) -> DegradeStage {
        self.applied
    }

    /// Drives `target` to `stage`. Returns how many toggles were applied.
    pub fn apply<T: ToggleCapabilitySet + ?Sized>(
        &mut self,
        stage: DegradeStage,
        target: &mut T,
    ) -> usize {
        if stage <= self.applied {
            return 0;
        }
        let toggles = Self::toggles_for(stage);
        for toggle in toggles {
            target.apply(*toggle);
        }
        log::info!(
            "Degrade policy: {} -> {} ({} toggles)",
            self.applied,
            stage,
            toggles.len()
        );
        self.applied = stage;
        toggles.len()
    }

    /// Back to full quality. Only for a full session reset; the scene is expected
    /// to reload its own defaults.
    pub fn reset(&mut self) {
        self.applied = DegradeStage::FULL;
    }
}
