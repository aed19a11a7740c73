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

//! Capability probing with throwaway wgpu instances.

use async_trait::async_trait;
use std::time::Instant;
use vista_core::platform::{PlatformProbe, ProbeError, StandardBackendReport};

/// Probes the advanced (Vulkan, Metal, DX12) and standard (GL) wgpu backends.
///
/// Each probe creates its own instance and adapter and drops them before
/// returning.
#[derive(Debug, Clone)]
pub struct WgpuPlatformProbe {
    advanced: wgpu::Backends,
    standard: wgpu::Backends,
}

impl WgpuPlatformProbe {
    /// Probes the default backend sets.
    pub fn new() -> Self {
        Self {
            advanced: wgpu::Backends::PRIMARY,
            standard: wgpu::Backends::GL,
        }
    }

    /// Overrides the backend sets probed.
    pub fn with_backends(advanced: wgpu::Backends, standard: wgpu::Backends) -> Self {
        Self { advanced, standard }
    }

    async fn adapter(backends: wgpu::Backends) -> Option<wgpu::Adapter> {
        if backends.is_empty() {
            return None;
        }
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok()
    }
}

impl Default for WgpuPlatformProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn renderable(adapter: &wgpu::Adapter, format: wgpu::TextureFormat) -> bool {
    adapter
        .get_texture_format_features(format)
        .allowed_usages
        .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
}

#[async_trait(?Send)]
impl PlatformProbe for WgpuPlatformProbe {
    fn is_mobile(&self) -> bool {
        cfg!(any(target_os = "android", target_os = "ios"))
    }

    async fn probe_advanced_backend(&self) -> Result<bool, ProbeError> {
        let start = Instant::now();
        let adapter = Self::adapter(self.advanced).await;
        let available = match &adapter {
            Some(adapter) => {
                let info = adapter.get_info();
                log::info!("Advanced backend probe: \"{}\" ({:?})", info.name, info.backend);
                // A software rasterizer on the advanced API is no better than GL.
                info.device_type != wgpu::DeviceType::Cpu
            }
            None => false,
        };
        log::debug!(
            "Advanced backend probe took {} ms",
            start.elapsed().as_millis()
        );
        Ok(available)
    }

    async fn probe_standard_backend(&self) -> Result<StandardBackendReport, ProbeError> {
        let Some(adapter) = Self::adapter(self.standard).await else {
            log::info!("Standard backend probe: no adapter");
            return Ok(StandardBackendReport::default());
        };
        let report = StandardBackendReport {
            available: true,
            color_buffer_float: renderable(&adapter, wgpu::TextureFormat::Rgba32Float),
            half_float_buffer: renderable(&adapter, wgpu::TextureFormat::Rgba16Float),
        };
        log::info!(
            "Standard backend probe: \"{}\" {:?}",
            adapter.get_info().name,
            report
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_backend_sets_report_nothing() {
        let probe =
            WgpuPlatformProbe::with_backends(wgpu::Backends::empty(), wgpu::Backends::empty());
        assert_eq!(pollster::block_on(probe.probe_advanced_backend()), Ok(false));
        assert_eq!(
            pollster::block_on(probe.probe_standard_backend()),
            Ok(StandardBackendReport::default())
        );
    }

    #[cfg(not(any(target_os = "android", target_os = "ios")))]
    #[test]
    fn desktop_is_not_mobile() {
        assert!(!WgpuPlatformProbe::new().is_mobile());
    }
}
