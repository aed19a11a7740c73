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

//! The capability toggles the degrade policy drives on the scene layer.

use std::fmt;

/// One expensive visual feature and the value it should be set to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityToggle {
    /// Shadow map rendering.
    Shadows(bool),
    /// Bloom post-process.
    Bloom(bool),
    /// Screen-space ambient occlusion.
    AmbientOcclusion(bool),
    /// Screen-space reflections.
    Reflections(bool),
    /// Global illumination (light probes, baked GI blending).
    GlobalIllumination(bool),
    /// Upper bound for anisotropic texture filtering. `1` disables it.
    MaxAnisotropy(u16),
}

impl CapabilityToggle {
    /// A stable feature name, used for logging.
    pub fn feature_name(&self) -> &'static str {
        match self {
            CapabilityToggle::Shadows(_) => "shadows",
            CapabilityToggle::Bloom(_) => "bloom",
            CapabilityToggle::AmbientOcclusion(_) => "ambientOcclusion",
            CapabilityToggle::Reflections(_) => "reflections",
            CapabilityToggle::GlobalIllumination(_) => "globalIllumination",
            CapabilityToggle::MaxAnisotropy(_) => "maxAnisotropy",
        }
    }
}

impl fmt::Display for CapabilityToggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityToggle::MaxAnisotropy(level) => write!(f, "maxAnisotropy={level}"),
            CapabilityToggle::Shadows(on)
            | CapabilityToggle::Bloom(on)
            | CapabilityToggle::AmbientOcclusion(on)
            | CapabilityToggle::Reflections(on)
            | CapabilityToggle::GlobalIllumination(on) => {
                write!(f, "{}={}", self.feature_name(), on)
            }
        }
    }
}

/// The setters the scene/materials layer exposes to the degrade policy.
///
/// Implementations must be idempotent: applying a toggle whose value is already in
/// effect must be side-effect free.
pub trait ToggleCapabilitySet {
    /// Applies a single toggle.
    fn apply(&mut self, toggle: CapabilityToggle);
}

impl<T: ToggleCapabilitySet + ?Sized> ToggleCapabilitySet for Box<T> {
    fn apply(&mut self, toggle: CapabilityToggle) {
        (**self).apply(toggle);
    }
}

impl<T: ToggleCapabilitySet + ?Sized> ToggleCapabilitySet for &mut T {
    fn apply(&mut self, toggle: CapabilityToggle) {
        (**self).apply(toggle);
    }
}
