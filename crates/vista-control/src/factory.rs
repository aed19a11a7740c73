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

//! Renderer construction with smoke-tested fallback.

use vista_core::platform::{physical_pixels, RenderSurface};
use vista_core::renderer::{
    BackendError, BackendProvider, BackendType, ContextSettings, ContextStatus, FallbackConfig,
    InitError, RenderContext, RendererHandle, ToneMapping,
};
use vista_core::RenderProfile;

/// Builds a [`RendererHandle`] by walking the backend fallback chain:
///
/// 1. the advanced backend, if the profile wants it and the platform has it,
///    accepted only after a smoke test,
/// 2. the fallback rasterizer with [`FallbackConfig::conservative`],
/// 3. the fallback rasterizer with [`FallbackConfig::reduced`].
pub struct RendererFactory<P: BackendProvider> {
    provider: P,
    clear_color: [f64; 4],
}

impl<P: BackendProvider> RendererFactory<P>
where
    P::Context: 'static,
{
    /// A factory with a black clear color.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Sets the clear color every context is configured with.
    pub fn with_clear_color(mut self, clear_color: [f64; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    /// The backend provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Creates, validates and configures a context for `surface`.
    pub async fn create(
        &self,
        surface: &P::Surface,
        profile: &RenderProfile,
    ) -> Result<(RendererHandle<P::Context>, BackendType), InitError> {
        self.create_with_status(surface, profile, ContextStatus::new())
            .await
    }

    /// Like [`create`](Self::create), but the handle shares an existing status.
    ///
    /// Used when rebuilding a lost context, so the guard and any gated toggles
    /// keep observing the same flag.
    pub async fn create_with_status(
        &self,
        surface: &P::Surface,
        profile: &RenderProfile,
        status: ContextStatus,
    ) -> Result<(RendererHandle<P::Context>, BackendType), InitError> {
        let mut advanced_error = None;

        if !profile.prefer_advanced_backend {
            log::info!("Profile {} skips the advanced backend", profile.tier);
        } else if !self.provider.advanced_api_available() {
            log::info!("Advanced backend not available on this platform");
        } else {
            match self.try_advanced(surface).await {
                Ok(context) => return self.finish(context, surface, profile, status),
                Err(e) => {
                    log::warn!("Advanced backend rejected: {e}. Falling back.");
                    advanced_error = Some(e);
                }
            }
        }

        let context = match self
            .provider
            .create_fallback(surface, &FallbackConfig::conservative())
            .await
        {
            Ok(context) => context,
            Err(fallback) => {
                log::warn!("Fallback backend failed: {fallback}. Retrying with reduced config.");
                match self
                    .provider
                    .create_fallback(surface, &FallbackConfig::reduced())
                    .await
                {
                    Ok(context) => context,
                    Err(reduced) => {
                        log::error!("All rendering backends failed: {reduced}");
                        return Err(InitError::Exhausted {
                            advanced: advanced_error,
                            fallback,
                            reduced,
                        });
                    }
                }
            }
        };

        self.finish(context, surface, profile, status)
    }

    async fn try_advanced(&self, surface: &P::Surface) -> Result<P::Context, BackendError> {
        let mut context = self.provider.create_advanced(surface).await?;
        if let Err(e) = self.provider.smoke_test(&context).await {
            context.dispose();
            return Err(e);
        }
        Ok(context)
    }

    fn finish(
        &self,
        mut context: P::Context,
        surface: &P::Surface,
        profile: &RenderProfile,
        status: ContextStatus,
    ) -> Result<(RendererHandle<P::Context>, BackendType), InitError> {
        let pixel_ratio = profile.clamp_pixel_ratio(surface.device_pixel_ratio());
        let settings = ContextSettings {
            tone_mapping: ToneMapping::AcesFilmic,
            clear_color: self.clear_color,
            pixel_ratio,
            shadow_maps_enabled: false,
        };
        if let Err(e) = context.configure(&settings) {
            context.dispose();
            return Err(InitError::Configure(e));
        }

        let (width, height) = surface.size();
        context.resize(
            physical_pixels(width, pixel_ratio),
            physical_pixels(height, pixel_ratio),
        );

        let backend = context.backend_type();
        let mut handle = RendererHandle::new(context, status);
        handle.bind_resize(surface, profile);

        log::info!("Renderer ready on {backend} (pixel ratio {pixel_ratio:.2})");
        Ok((handle, backend))
    }
}
