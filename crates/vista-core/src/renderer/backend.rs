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

//! Backend seams: the provider that creates GPU contexts and the context itself.

use super::error::BackendError;
use crate::platform::RenderSurface;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which backend a renderer ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendType {
    /// The advanced, preferred GPU API.
    PrimaryGpu,
    /// The broadly compatible rasterizer used when the primary API is unusable.
    FallbackRasterizer,
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendType::PrimaryGpu => write!(f, "primary GPU"),
            BackendType::FallbackRasterizer => write!(f, "fallback rasterizer"),
        }
    }
}

/// Output tone mapping applied by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToneMapping {
    /// Linear output, no curve.
    None,
    /// ACES filmic approximation.
    #[default]
    AcesFilmic,
}

/// Session-wide settings applied to a context right after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextSettings {
    /// Tone mapping curve; fixed for the whole session.
    pub tone_mapping: ToneMapping,
    /// Linear RGBA clear color.
    pub clear_color: [f64; 4],
    /// Device-pixel-ratio, already clamped to the tier cap.
    pub pixel_ratio: f32,
    /// Master switch of the context's built-in shadow maps.
    pub shadow_maps_enabled: bool,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            tone_mapping: ToneMapping::AcesFilmic,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            pixel_ratio: 1.0,
            shadow_maps_enabled: false,
        }
    }
}

/// Creation parameters for the fallback rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// MSAA sample count.
    pub sample_count: u32,
    /// Logarithmic depth buffer.
    pub logarithmic_depth: bool,
    /// Refuse adapters flagged as significantly slower than native.
    pub fail_if_major_performance_caveat: bool,
    /// Whether the drawing buffer carries an alpha channel.
    pub alpha: bool,
    /// Depth buffer.
    pub depth: bool,
    /// Stencil buffer.
    pub stencil: bool,
    /// Ask for optional capabilities (float buffers, anisotropy, ...).
    pub request_optional_capabilities: bool,
}

impl FallbackConfig {
    /// The first fallback attempt.
    pub const fn conservative() -> Self {
        Self {
            sample_count: 1,
            logarithmic_depth: false,
            fail_if_major_performance_caveat: false,
            alpha: false,
            depth: true,
            stencil: false,
            request_optional_capabilities: true,
        }
    }

    /// The retry after the conservative attempt failed. Requests nothing optional.
    pub const fn reduced() -> Self {
        Self {
            request_optional_capabilities: false,
            ..Self::conservative()
        }
    }
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self::conservative()
    }
}

/// A live GPU context owned by a [`RendererHandle`](super::RendererHandle).
pub trait RenderContext {
    /// The backend this context runs on.
    fn backend_type(&self) -> BackendType;

    /// Applies the session settings.
    fn configure(&mut self, settings: &ContextSettings) -> Result<(), BackendError>;

    /// Resizes the drawing buffer. `width` and `height` are in physical pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Whether the underlying device is still usable.
    fn is_device_alive(&self) -> bool;

    /// Releases every GPU resource. Calling it twice is harmless.
    fn dispose(&mut self);
}

/// Creates contexts for a surface.
///
/// The renderer factory drives this trait through its fallback chain; it never
/// touches a graphics API directly.
#[async_trait(?Send)]
pub trait BackendProvider {
    /// The surface type contexts are created on.
    type Surface: RenderSurface;
    /// The context type this provider creates.
    type Context: RenderContext;

    /// Cheap check that the advanced API exists at all on this platform.
    fn advanced_api_available(&self) -> bool;

    /// Creates a context on the advanced API.
    async fn create_advanced(&self, surface: &Self::Surface)
        -> Result<Self::Context, BackendError>;

    /// Renders one opaque triangle into a 1x1 target and checks for errors and a
    /// live device.
    async fn smoke_test(&self, context: &Self::Context) -> Result<(), BackendError>;

    /// Creates a context on the fallback rasterizer.
    async fn create_fallback(
        &self,
        surface: &Self::Surface,
        config: &FallbackConfig,
    ) -> Result<Self::Context, BackendError>;
}
