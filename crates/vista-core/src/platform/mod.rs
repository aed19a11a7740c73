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

//! Platform abstractions: capability probing and render surfaces.

pub mod surface;

pub use self::surface::{
    physical_pixels, ListenerId, LossNotice, RenderSurface, SignalListener, SignalSender,
    SignalSurface, Subscription, SurfaceSignal,
};

use async_trait::async_trait;
use std::fmt;

/// What the standard (non-advanced) backend offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StandardBackendReport {
    /// A context on the standard backend can be created.
    pub available: bool,
    /// 32-bit float color buffers are renderable.
    pub color_buffer_float: bool,
    /// 16-bit float color buffers are renderable.
    pub half_float_buffer: bool,
}

/// Why a capability probe could not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The graphics API refused to enumerate adapters.
    Enumeration(String),
    /// The probe was interrupted or timed out.
    Interrupted(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Enumeration(msg) => write!(f, "Adapter enumeration failed: {msg}"),
            ProbeError::Interrupted(msg) => write!(f, "Capability probe interrupted: {msg}"),
        }
    }
}

impl std::error::Error for ProbeError {}

/// Queries the device and GPU for the facts tier classification needs.
///
/// Implementations may create throwaway instances and adapters but must leave
/// nothing behind.
#[async_trait(?Send)]
pub trait PlatformProbe {
    /// Whether the process runs on a mobile device.
    fn is_mobile(&self) -> bool;

    /// Whether a usable adapter exists on the advanced API.
    async fn probe_advanced_backend(&self) -> Result<bool, ProbeError>;

    /// What the standard backend offers.
    async fn probe_standard_backend(&self) -> Result<StandardBackendReport, ProbeError>;
}
