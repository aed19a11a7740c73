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

//! A `winit` window exposed as a [`RenderSurface`].

use std::sync::Arc;
use vista_core::platform::{
    RenderSurface, SignalListener, SignalSender, SignalSurface, Subscription,
};
use winit::{
    dpi::LogicalSize, error::OsError, event::WindowEvent, event_loop::ActiveEventLoop,
    window::Window,
};

/// A window plus the signal plumbing the governor listens to.
///
/// Window events are translated by [`handle_window_event`](Self::handle_window_event)
/// and delivered to listeners on the next [`pump`](Self::pump).
#[derive(Debug)]
pub struct WinitSurface {
    window: Arc<Window>,
    signals: SignalSurface,
}

impl WinitSurface {
    /// Wraps an existing window.
    pub fn new(window: Arc<Window>) -> Self {
        let scale = window.scale_factor();
        let logical: LogicalSize<u32> = window.inner_size().to_logical(scale);
        Self {
            signals: SignalSurface::new(logical.width, logical.height, scale as f32),
            window,
        }
    }

    /// The wrapped window.
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Translates window events the governor cares about into surface signals.
    pub fn handle_window_event(&self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(physical) => {
                let logical: LogicalSize<u32> = physical.to_logical(self.window.scale_factor());
                self.signals.sender().resized(logical.width, logical.height);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::debug!("Scale factor changed to {scale_factor:.2}");
                self.signals.set_device_pixel_ratio(*scale_factor as f32);
            }
            _ => {}
        }
    }

    /// Whether an unrecoverable context loss tore the surface down.
    pub fn is_torn_down(&self) -> bool {
        self.signals.is_torn_down()
    }

    /// Requests that the window be redrawn.
    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

impl RenderSurface for WinitSurface {
    fn size(&self) -> (u32, u32) {
        self.signals.size()
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.signals.device_pixel_ratio()
    }

    fn subscribe(&self, listener: SignalListener) -> Subscription {
        self.signals.subscribe(listener)
    }

    fn signal_sender(&self) -> SignalSender {
        self.signals.sender()
    }

    fn pump(&self) -> usize {
        self.signals.pump()
    }
}

/// A builder for [`WinitSurface`] windows.
pub struct WinitSurfaceBuilder {
    title: String,
    width: u32,
    height: u32,
}

impl WinitSurfaceBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            title: "Vista".to_string(),
            width: 1280,
            height: 720,
        }
    }

    /// Sets the window title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the initial logical size.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Builds the window on `event_loop`.
    ///
    /// # Errors
    /// Returns an `OsError` if the underlying `winit` window creation fails.
    pub fn build(self, event_loop: &ActiveEventLoop) -> Result<WinitSurface, OsError> {
        log::info!(
            "Building window with title: '{}' and size: {}x{}",
            self.title,
            self.width,
            self.height
        );

        let window_attributes = Window::default_attributes()
            .with_title(self.title)
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_visible(true);

        let window = event_loop.create_window(window_attributes)?;
        log::info!("Winit window created successfully (id: {:?}).", window.id());
        Ok(WinitSurface::new(Arc::new(window)))
    }
}

impl Default for WinitSurfaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
