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

// Vista Sandbox
// Opens a window, boots a governed viewport on it and orbits a camera under a
// shadow-casting sun. Pass a JSON config path to override the defaults.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Instant;
use vista_sdk::prelude::*;
use vista_core::platform::RenderSurface;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

/// Stand-in for a scene's post-processing and material settings.
#[derive(Default)]
struct SceneToggles {
    state: BTreeMap<&'static str, CapabilityToggle>,
}

impl ToggleCapabilitySet for SceneToggles {
    fn apply(&mut self, toggle: CapabilityToggle) {
        log::info!("Scene: {toggle}");
        self.state.insert(toggle.feature_name(), toggle);
    }
}

struct SandboxApp {
    config: ViewportConfig,
    viewport: Option<WgpuViewport<SceneToggles>>,
    events: Option<flume::Receiver<GovernorEvent>>,
    sun: DirectionalShadowLight,
    started: Instant,
}

impl SandboxApp {
    fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            viewport: None,
            events: None,
            sun: DirectionalShadowLight::new(Vec3::new(40.0, 90.0, 25.0), Vec3::ZERO),
            started: Instant::now(),
        }
    }

    fn boot(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let surface = WinitSurfaceBuilder::new()
            .with_title("Vista Sandbox")
            .build(event_loop)
            .context("Failed to create the sandbox window")?;
        let surface = Rc::new(surface);

        let builder = wgpu_viewport(self.config.clone());
        let viewport = pollster::block_on(builder.boot(surface, SceneToggles::default()))
            .context("Failed to boot the viewport")?;

        log::info!(
            "Booted {} on {} (shadow map {})",
            viewport.profile().tier,
            viewport.backend_type(),
            viewport.profile().shadow_map_size
        );
        self.events = Some(viewport.subscribe());
        self.viewport = Some(viewport);
        Ok(())
    }

    /// The camera slowly orbits the origin.
    fn camera(&self, aspect: f32) -> CameraSnapshot {
        let t = self.started.elapsed().as_secs_f32() * 0.2;
        let position = Vec3::new(t.cos() * 30.0, 6.0, t.sin() * 30.0);
        CameraSnapshot {
            position,
            forward: (Vec3::ZERO - position).normalize(),
            up: Vec3::Y,
            fov_y_radians: 60f32.to_radians(),
            aspect,
            near: 0.1,
            far: 200.0,
        }
    }

    fn drain_events(&self) {
        let Some(events) = &self.events else {
            return;
        };
        for event in events.try_iter() {
            match event {
                GovernorEvent::Degrade { stage } => log::warn!("Governor degraded to {stage}"),
                GovernorEvent::ContextLost => log::warn!("Context lost"),
                GovernorEvent::ContextRestored => {
                    log::info!("Context restored; rebuilding scene resources")
                }
            }
        }
    }

    fn redraw(&mut self) {
        let camera = match &self.viewport {
            Some(viewport) => {
                let (width, height) = viewport.surface().size();
                self.camera(width.max(1) as f32 / height.max(1) as f32)
            }
            None => return,
        };
        let Some(viewport) = self.viewport.as_mut() else {
            return;
        };

        if viewport.needs_recovery() {
            match pollster::block_on(viewport.recover()) {
                Ok(backend) => log::info!("Recovered on {backend}"),
                Err(e) => log::error!("Recovery failed: {e}"),
            }
        }

        let mut sun = self.sun;
        let report = viewport.tick(Instant::now(), &camera, Some(&mut sun));
        if let Some(bounds) = report.shadow_bounds {
            log::trace!("Shadow box {:.1}x{:.1}", bounds.width(), bounds.height());
        }
        self.sun = sun;

        match viewport.with_renderer(|context| context.render_frame()) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Rendering error: {e}"),
            Err(RenderError::ContextLost) => log::debug!("Frame skipped while context is lost"),
            Err(e) => log::error!("Rendering error: {e}"),
        }
        self.drain_events();
    }
}

impl ApplicationHandler for SandboxApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewport.is_some() {
            return;
        }
        if let Err(e) = self.boot(event_loop) {
            log::error!("{e:#}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(viewport) = self.viewport.as_mut() else {
            return;
        };
        if viewport.surface().window().id() != id {
            return;
        }
        viewport.surface().handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Shutdown requested, exiting event loop...");
                viewport.shutdown();
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(viewport) = &self.viewport {
            if viewport.is_running() {
                viewport.surface().request_redraw();
            }
        }
    }
}

fn load_config() -> Result<ViewportConfig> {
    match std::env::args().nth(1) {
        Some(path) => ViewportConfig::from_file(&path),
        None => Ok(ViewportConfig::default()),
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .init();

    let config = load_config()?;
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = SandboxApp::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}
