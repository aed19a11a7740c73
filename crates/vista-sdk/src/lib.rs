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

//! The public-facing SDK of the adaptive rendering governor.
//!
//! A host hands a surface and its scene toggles to a [`ViewportBuilder`],
//! boots it once, and then calls [`Viewport::tick`] every frame before its
//! shadow pass. Everything else (tier detection, backend fallback, context
//! loss, jank-driven degradation and shadow fitting) happens behind it.

#![warn(missing_docs)]

pub mod config;
pub mod viewport;

pub use config::ViewportConfig;
pub use viewport::{CancellationToken, FrameReport, Viewport, ViewportBuilder};

use vista_infra::{WgpuBackendProvider, WgpuPlatformProbe};

/// A builder wired to the wgpu backends and probe.
pub type WgpuViewportBuilder = ViewportBuilder<WgpuBackendProvider, WgpuPlatformProbe>;

/// A viewport running on wgpu.
pub type WgpuViewport<T> = Viewport<WgpuBackendProvider, T>;

/// Creates a builder for the wgpu backends, honoring `config.force_fallback`.
pub fn wgpu_viewport(config: ViewportConfig) -> WgpuViewportBuilder {
    let provider = if config.force_fallback {
        WgpuBackendProvider::new().fallback_only()
    } else {
        WgpuBackendProvider::new()
    };
    ViewportBuilder::new(provider, WgpuPlatformProbe::new()).with_config(config)
}

/// Everything a host usually needs.
pub mod prelude {
    pub use crate::{
        wgpu_viewport, CancellationToken, FrameReport, Viewport, ViewportBuilder, ViewportConfig,
        WgpuViewport, WgpuViewportBuilder,
    };
    pub use vista_control::{FatalErrorProbe, GovernorConfig};
    pub use vista_core::math::{Vec3, Vec4};
    pub use vista_core::renderer::{
        BackendType, CameraSnapshot, DirectionalShadowLight, InitError, LightSpaceBounds,
        RenderError, ShadowCamera, ShadowFitConfig,
    };
    pub use vista_core::{
        CapabilityToggle, DegradeStage, GovernorEvent, RenderProfile, Tier, ToggleCapabilitySet,
    };
    pub use vista_infra::{WgpuRenderContext, WinitSurface, WinitSurfaceBuilder};
}
