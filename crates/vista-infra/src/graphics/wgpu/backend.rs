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

//! The wgpu [`BackendProvider`]: the advanced backends (Vulkan, Metal, DX12) as
//! the primary GPU path, OpenGL/GLES as the fallback rasterizer.

use super::context::{ContextOptions, WgpuRenderContext};
use super::smoke;
use crate::platform::WinitSurface;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Instant;
use vista_core::platform::RenderSurface;
use vista_core::renderer::{BackendError, BackendProvider, BackendType, FallbackConfig};

/// Returns a human-readable name for a backend.
pub fn backend_name(backend: wgpu::Backend) -> &'static str {
    match backend {
        wgpu::Backend::Vulkan => "Vulkan",
        wgpu::Backend::Metal => "Metal",
        wgpu::Backend::Dx12 => "DirectX 12",
        wgpu::Backend::Gl => "OpenGL",
        wgpu::Backend::BrowserWebGpu => "WebGPU",
        wgpu::Backend::Noop => "No-op",
    }
}

/// Creates [`WgpuRenderContext`]s on a [`WinitSurface`].
#[derive(Debug, Clone)]
pub struct WgpuBackendProvider {
    advanced: wgpu::Backends,
    fallback: wgpu::Backends,
    power_preference: wgpu::PowerPreference,
}

impl WgpuBackendProvider {
    /// A provider using the platform's primary backends, then GL.
    pub fn new() -> Self {
        Self {
            advanced: wgpu::Backends::PRIMARY,
            fallback: wgpu::Backends::GL,
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }

    /// Disables the advanced backends; every context goes to the fallback.
    pub fn fallback_only(mut self) -> Self {
        self.advanced = wgpu::Backends::empty();
        self
    }

    /// Sets the adapter power preference.
    pub fn with_power_preference(mut self, power_preference: wgpu::PowerPreference) -> Self {
        self.power_preference = power_preference;
        self
    }

    async fn open(
        &self,
        surface: &WinitSurface,
        backends: wgpu::Backends,
        options: impl FnOnce(&wgpu::Adapter) -> Result<ContextOptions>,
    ) -> Result<WgpuRenderContext> {
        let start = Instant::now();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let target = instance
            .create_surface(surface.window().clone())
            .map_err(|e| anyhow!("Failed to create surface: {}", e))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: self.power_preference,
                compatible_surface: Some(&target),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("Failed to find suitable adapter for {:?}: {}", backends, e))?;
        let info = adapter.get_info();
        log::info!(
            "{} adapter found: \"{}\" ({:?})",
            backend_name(info.backend),
            info.name,
            info.device_type
        );

        let options = options(&adapter)?;
        let (width, height) = surface.size();
        let ratio = surface.device_pixel_ratio();
        let physical = (
            vista_core::platform::physical_pixels(width, ratio),
            vista_core::platform::physical_pixels(height, ratio),
        );
        let context = WgpuRenderContext::new(
            target,
            adapter,
            physical,
            &options,
            surface.signal_sender(),
        )
        .await?;

        log::info!(
            "{} context created in {} ms",
            options.backend,
            start.elapsed().as_millis()
        );
        Ok(context)
    }
}

impl Default for WgpuBackendProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl BackendProvider for WgpuBackendProvider {
    type Surface = WinitSurface;
    type Context = WgpuRenderContext;

    fn advanced_api_available(&self) -> bool {
        !self.advanced.is_empty()
    }

    async fn create_advanced(
        &self,
        surface: &WinitSurface,
    ) -> Result<WgpuRenderContext, BackendError> {
        self.open(surface, self.advanced, |adapter| {
            Ok(ContextOptions {
                backend: BackendType::PrimaryGpu,
                limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                optional_features: wgpu::Features::FLOAT32_FILTERABLE,
                opaque: true,
                depth: true,
                stencil: false,
            })
        })
        .await
        .map_err(|e| BackendError::CreationFailed(format!("{e:#}")))
    }

    async fn smoke_test(&self, context: &WgpuRenderContext) -> Result<(), BackendError> {
        smoke::run(
            context.device(),
            context.queue(),
            context.errors(),
            context.alive_flag(),
        )
    }

    async fn create_fallback(
        &self,
        surface: &WinitSurface,
        config: &FallbackConfig,
    ) -> Result<WgpuRenderContext, BackendError> {
        if config.sample_count != 1 {
            log::warn!(
                "Fallback sample count {} not supported; using 1",
                config.sample_count
            );
        }
        if config.logarithmic_depth {
            log::warn!("Logarithmic depth is not supported by the fallback rasterizer");
        }
        let config = *config;
        self.open(surface, self.fallback, move |adapter| {
            if config.fail_if_major_performance_caveat
                && adapter.get_info().device_type == wgpu::DeviceType::Cpu
            {
                return Err(anyhow!("Only a software adapter is available"));
            }
            let optional_features = if config.request_optional_capabilities {
                wgpu::Features::FLOAT32_FILTERABLE
            } else {
                wgpu::Features::empty()
            };
            Ok(ContextOptions {
                backend: BackendType::FallbackRasterizer,
                limits: wgpu::Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                optional_features,
                opaque: !config.alpha,
                depth: config.depth,
                stencil: config.stencil,
            })
        })
        .await
        .map_err(|e| BackendError::CreationFailed(format!("{e:#}")))
    }
}
