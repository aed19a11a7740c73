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

//! Device capability tiers and the per-session render profile derived from them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A coarse classification of what the running device and GPU can sustain.
///
/// Ordered from most to least capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Desktop with the advanced GPU API available.
    DesktopAdvanced,
    /// Desktop limited to the standard API, with renderable float color buffers.
    DesktopStandard,
    /// Mobile device that can still run the full pipeline at reduced density.
    MobileCapable,
    /// Anything else. The conservative default.
    MobileMinimal,
}

impl Tier {
    /// Whether this tier describes a mobile device.
    pub fn is_mobile(self) -> bool {
        matches!(self, Tier::MobileCapable | Tier::MobileMinimal)
    }

    /// The highest device-pixel-ratio the renderer may use on this tier.
    pub fn max_pixel_ratio(self) -> f32 {
        match self {
            Tier::DesktopAdvanced => 2.0,
            Tier::DesktopStandard => 1.5,
            Tier::MobileCapable => 1.25,
            Tier::MobileMinimal => 1.0,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::DesktopAdvanced => "desktop-advanced",
            Tier::DesktopStandard => "desktop-standard",
            Tier::MobileCapable => "mobile-capable",
            Tier::MobileMinimal => "mobile-minimal",
        };
        f.write_str(name)
    }
}

/// The immutable rendering configuration of one session.
///
/// Computed once from the [`Tier`] and threaded into the renderer factory, the
/// frame governor and the shadow fitter. Nothing mutates it after boot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderProfile {
    /// The tier this profile was derived from.
    pub tier: Tier,
    /// Whether the factory should try the advanced backend first.
    pub prefer_advanced_backend: bool,
    /// Upper bound for the device-pixel-ratio handed to the context.
    pub max_pixel_ratio: f32,
    /// Initial state of the scene's shadow casting.
    pub shadows_enabled: bool,
    /// Resolution of the directional shadow map, in texels per side.
    pub shadow_map_size: u32,
    /// Whether the frame governor samples frame times.
    pub frame_governance: bool,
}

impl RenderProfile {
    /// Builds the default profile for `tier`.
    pub fn for_tier(tier: Tier) -> Self {
        let (shadows_enabled, shadow_map_size) = match tier {
            Tier::DesktopAdvanced | Tier::DesktopStandard => (true, 2048),
            Tier::MobileCapable => (true, 1024),
            Tier::MobileMinimal => (false, 512),
        };
        Self {
            tier,
            prefer_advanced_backend: tier != Tier::MobileMinimal,
            max_pixel_ratio: tier.max_pixel_ratio(),
            shadows_enabled,
            shadow_map_size,
            frame_governance: tier.is_mobile(),
        }
    }

    /// Opts a desktop session into frame governance. Never turns it off on mobile.
    pub fn with_forced_governance(mut self, force_enabled: bool) -> Self {
        self.frame_governance |= force_enabled;
        self
    }

    /// Clamps a surface's native pixel ratio to this profile's cap.
    pub fn clamp_pixel_ratio(&self, native: f32) -> f32 {
        if !native.is_finite() || native <= 0.0 {
            return 1.0;
        }
        native.min(self.max_pixel_ratio)
    }
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self::for_tier(Tier::MobileMinimal)
    }
}
