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

//! A wgpu device bound to a window surface.

use super::smoke::ErrorSlot;
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vista_core::platform::SignalSender;
use vista_core::renderer::{BackendError, BackendType, ContextSettings, RenderContext};

/// How a [`WgpuRenderContext`] should set up its device and swapchain.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Which backend slot this context fills.
    pub backend: BackendType,
    /// Limits requested from the adapter.
    pub limits: wgpu::Limits,
    /// Features to enable if the adapter offers them.
    pub optional_features: wgpu::Features,
    /// Prefer an opaque swapchain.
    pub opaque: bool,
    /// Allocate a depth buffer.
    pub depth: bool,
    /// Give the depth buffer a stencil aspect.
    pub stencil: bool,
}

/// The wgpu implementation of [`RenderContext`].
///
/// The device-lost callback marks the context dead and queues a context-loss
/// signal on the owning surface.
pub struct WgpuRenderContext {
    backend: BackendType,
    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    depth_format: Option<wgpu::TextureFormat>,
    depth_view: Option<wgpu::TextureView>,
    settings: ContextSettings,
    alive: Arc<AtomicBool>,
    errors: ErrorSlot,
    disposed: bool,
}

impl WgpuRenderContext {
    /// Opens a device on `adapter` and configures `surface` for it.
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: wgpu::Adapter,
        size: (u32, u32),
        options: &ContextOptions,
        signals: SignalSender,
    ) -> Result<Self> {
        let adapter_info = adapter.get_info();
        log::info!(
            "Opening {} device on \"{}\" ({:?})",
            options.backend,
            adapter_info.name,
            adapter_info.backend
        );

        let features = adapter.features() & options.optional_features;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Vista Logical Device"),
                required_features: features,
                required_limits: options.limits.clone(),
                memory_hints: wgpu::MemoryHints::default(),
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;

        let errors = ErrorSlot::default();
        let sink = errors.clone();
        device.on_uncaptured_error(Arc::new(move |e: wgpu::Error| {
            log::error!("WGPU Uncaptured Error: {e:?}");
            sink.record(e.to_string());
        }));

        let alive = Arc::new(AtomicBool::new(true));
        let flag = alive.clone();
        device.set_device_lost_callback(move |reason, message| {
            flag.store(false, Ordering::Release);
            // `Destroyed` is our own dispose; anything else came from the driver.
            if !matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                log::error!("WGPU device lost ({reason:?}): {message}");
                signals.context_lost();
            }
        });

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface is not compatible with the adapter"))?;
        let opaque_supported = caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::Opaque);
        let alpha_mode = if options.opaque && opaque_supported {
            wgpu::CompositeAlphaMode::Opaque
        } else {
            caps.alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto)
        };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.0.max(1),
            height: size.1.max(1),
            // Fifo is guaranteed to be supported
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_format = match (options.depth, options.stencil) {
            (false, _) => None,
            (true, false) => Some(wgpu::TextureFormat::Depth24Plus),
            (true, true) => Some(wgpu::TextureFormat::Depth24PlusStencil8),
        };

        let mut context = Self {
            backend: options.backend,
            surface,
            adapter,
            device,
            queue,
            surface_config,
            depth_format,
            depth_view: None,
            settings: ContextSettings::default(),
            alive,
            errors,
            disposed: false,
        };
        context.rebuild_depth();
        Ok(context)
    }

    fn rebuild_depth(&mut self) {
        self.depth_view = self.depth_format.map(|format| {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Vista Depth Buffer"),
                size: wgpu::Extent3d {
                    width: self.surface_config.width,
                    height: self.surface_config.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            texture.create_view(&wgpu::TextureViewDescriptor::default())
        });
    }

    /// Clears the next swapchain image to the configured clear color and
    /// presents it.
    pub fn render_frame(&mut self) -> Result<(), BackendError> {
        if self.disposed || !self.is_device_alive() {
            return Err(BackendError::DeviceLost("context is not alive".into()));
        }
        let frame = match self.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(frame)
            | wgpu::CurrentSurfaceTexture::Suboptimal(frame) => frame,
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                log::debug!("Swapchain lost or outdated; reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => {
                log::warn!("Swapchain acquire timed out; skipping frame");
                return Ok(());
            }
            e => return Err(BackendError::DeviceLost(format!("{e:?}"))),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let [r, g, b, a] = self.settings.clear_color;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Vista Frame Encoder"),
            });
        {
            let depth_stencil_attachment = self.depth_view.as_ref().map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }
            });
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Vista Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// The logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The adapter the device was opened on.
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// The active swapchain configuration.
    pub fn surface_configuration(&self) -> &wgpu::SurfaceConfiguration {
        &self.surface_config
    }

    /// The settings last applied by [`RenderContext::configure`].
    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    pub(crate) fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    pub(crate) fn alive_flag(&self) -> &AtomicBool {
        &self.alive
    }
}

impl RenderContext for WgpuRenderContext {
    fn backend_type(&self) -> BackendType {
        self.backend
    }

    fn configure(&mut self, settings: &ContextSettings) -> Result<(), BackendError> {
        if !(settings.pixel_ratio.is_finite() && settings.pixel_ratio > 0.0) {
            return Err(BackendError::Configuration(format!(
                "pixel ratio {} is not positive",
                settings.pixel_ratio
            )));
        }
        log::debug!(
            "Configuring {} context: tone mapping {:?}, pixel ratio {:.2}",
            self.backend,
            settings.tone_mapping,
            settings.pixel_ratio
        );
        self.settings = *settings;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.disposed {
            return;
        }
        if width == 0 || height == 0 {
            log::warn!("Ignoring resize request to zero dimensions: {width}x{height}");
            return;
        }
        let max = self.device.limits().max_texture_dimension_2d;
        self.surface_config.width = width.min(max);
        self.surface_config.height = height.min(max);
        self.surface.configure(&self.device, &self.surface_config);
        self.rebuild_depth();
    }

    fn is_device_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn dispose(&mut self) {
        if std::mem::replace(&mut self.disposed, true) {
            return;
        }
        self.depth_view = None;
        self.device.destroy();
        log::info!("{} context disposed", self.backend);
    }
}

impl std::fmt::Debug for WgpuRenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuRenderContext")
            .field("backend", &self.backend)
            .field("adapter", &self.adapter.get_info().name)
            .field("size", &(self.surface_config.width, self.surface_config.height))
            .field("alive", &self.is_device_alive())
            .finish()
    }
}
