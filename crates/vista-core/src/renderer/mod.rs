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

//! Rendering-side contracts: capability tiers, backend seams, the renderer handle
//! and the data the shadow fitter reads and writes.

pub mod backend;
pub mod error;
pub mod handle;
pub mod light;
pub mod tier;

pub use self::backend::{
    BackendProvider, BackendType, ContextSettings, FallbackConfig, RenderContext, ToneMapping,
};
pub use self::error::{BackendError, InitError, RenderError};
pub use self::handle::{ContextStatus, RendererHandle};
pub use self::light::{
    CameraSnapshot, DirectionalShadowLight, LightSpaceBounds, ShadowCamera, ShadowFitConfig,
};
pub use self::tier::{RenderProfile, Tier};
