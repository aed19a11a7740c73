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

//! Integration tests for a whole viewport session against a scripted backend
//! provider, a stubbed platform probe and a headless surface.

use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};
use vista_core::math::Vec3;
use vista_core::platform::{
    PlatformProbe, ProbeError, RenderSurface, SignalSurface, StandardBackendReport,
};
use vista_core::renderer::{
    BackendError, BackendProvider, BackendType, CameraSnapshot, ContextSettings,
    DirectionalShadowLight, FallbackConfig, InitError, RenderContext, RenderError,
};
use vista_core::{CapabilityToggle, DegradeStage, GovernorEvent, Tier, ToggleCapabilitySet};
use vista_sdk::{CancellationToken, Viewport, ViewportBuilder, ViewportConfig};

type Journal = Rc<RefCell<Vec<String>>>;

struct FakeContext {
    backend: BackendType,
    journal: Journal,
    frames: u32,
}

impl RenderContext for FakeContext {
    fn backend_type(&self) -> BackendType {
        self.backend
    }
    fn configure(&mut self, _: &ContextSettings) -> Result<(), BackendError> {
        Ok(())
    }
    fn resize(&mut self, width: u32, height: u32) {
        self.journal.borrow_mut().push(format!("resize {width}x{height}"));
    }
    fn is_device_alive(&self) -> bool {
        true
    }
    fn dispose(&mut self) {
        self.journal.borrow_mut().push(format!("dispose {}", self.backend));
    }
}

#[derive(Default)]
struct FakeProvider {
    journal: Journal,
    advanced: bool,
    broken: bool,
    /// Cancelled from inside the fallback constructor.
    cancel_during_create: RefCell<Option<CancellationToken>>,
    created: Cell<u32>,
}

impl FakeProvider {
    fn context(&self, backend: BackendType) -> FakeContext {
        self.created.set(self.created.get() + 1);
        self.journal.borrow_mut().push(format!("create {backend}"));
        FakeContext {
            backend,
            journal: self.journal.clone(),
            frames: 0,
        }
    }
}

#[async_trait(?Send)]
impl BackendProvider for FakeProvider {
    type Surface = SignalSurface;
    type Context = FakeContext;

    fn advanced_api_available(&self) -> bool {
        self.advanced
    }

    async fn create_advanced(&self, _: &SignalSurface) -> Result<FakeContext, BackendError> {
        Ok(self.context(BackendType::PrimaryGpu))
    }

    async fn smoke_test(&self, _: &FakeContext) -> Result<(), BackendError> {
        Ok(())
    }

    async fn create_fallback(
        &self,
        _: &SignalSurface,
        _: &FallbackConfig,
    ) -> Result<FakeContext, BackendError> {
        if self.broken {
            return Err(BackendError::Unavailable("no GL".into()));
        }
        let context = self.context(BackendType::FallbackRasterizer);
        if let Some(token) = self.cancel_during_create.borrow_mut().take() {
            token.cancel();
        }
        Ok(context)
    }
}

struct FakeProbe {
    mobile: bool,
    advanced: bool,
    standard: StandardBackendReport,
}

impl FakeProbe {
    fn desktop() -> Self {
        Self {
            mobile: false,
            advanced: true,
            standard: StandardBackendReport::default(),
        }
    }

    fn phone(half_float: bool) -> Self {
        Self {
            mobile: true,
            advanced: false,
            standard: StandardBackendReport {
                available: true,
                color_buffer_float: false,
                half_float_buffer: half_float,
            },
        }
    }
}

#[async_trait(?Send)]
impl PlatformProbe for FakeProbe {
    fn is_mobile(&self) -> bool {
        self.mobile
    }
    async fn probe_advanced_backend(&self) -> Result<bool, ProbeError> {
        Ok(self.advanced)
    }
    async fn probe_standard_backend(&self) -> Result<StandardBackendReport, ProbeError> {
        Ok(self.standard)
    }
}

#[derive(Default)]
struct Scene {
    state: HashMap<&'static str, CapabilityToggle>,
}

impl ToggleCapabilitySet for Scene {
    fn apply(&mut self, toggle: CapabilityToggle) {
        self.state.insert(toggle.feature_name(), toggle);
    }
}

fn quiet_config() -> ViewportConfig {
    ViewportConfig {
        install_panic_hook: false,
        ..Default::default()
    }
}

fn camera() -> CameraSnapshot {
    CameraSnapshot {
        position: Vec3::new(0.0, 1.7, 0.0),
        forward: Vec3::new(0.0, 0.0, -1.0),
        up: Vec3::Y,
        fov_y_radians: 50f32.to_radians(),
        aspect: 1.5,
        near: 0.1,
        far: 80.0,
    }
}

fn sun() -> DirectionalShadowLight {
    DirectionalShadowLight::new(Vec3::new(30.0, 80.0, 10.0), Vec3::ZERO)
}

fn boot(
    provider: FakeProvider,
    probe: FakeProbe,
    config: ViewportConfig,
) -> (Rc<SignalSurface>, Result<Viewport<FakeProvider, Scene>, InitError>) {
    let surface = Rc::new(SignalSurface::new(800, 600, 2.0));
    let builder = ViewportBuilder::new(provider, probe).with_config(config);
    let viewport = pollster::block_on(builder.boot(surface.clone(), Scene::default()));
    (surface, viewport)
}

/// Ticks `count` frames spaced `gap` apart, returning every stage change.
fn run_frames(
    viewport: &mut Viewport<FakeProvider, Scene>,
    now: &mut Instant,
    count: usize,
    gap: Duration,
) -> Vec<u8> {
    let mut changes = Vec::new();
    for _ in 0..count {
        *now += gap;
        if let Some(stage) = viewport.tick(*now, &camera(), None).degraded_to {
            changes.push(stage.get());
        }
    }
    changes
}

// ─────────────────────────────────────────────────────────────────────────────
// Boot
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_desktop_boots_on_the_advanced_backend_without_governance() {
    let provider = FakeProvider {
        advanced: true,
        ..Default::default()
    };
    let (_surface, viewport) = boot(provider, FakeProbe::desktop(), quiet_config());
    let mut viewport = viewport.unwrap();

    assert_eq!(viewport.profile().tier, Tier::DesktopAdvanced);
    assert_eq!(viewport.backend_type(), BackendType::PrimaryGpu);
    assert!(viewport.toggles().state.is_empty());

    let mut now = Instant::now();
    let changes = run_frames(&mut viewport, &mut now, 30, Duration::from_millis(200));
    assert!(changes.is_empty());
    assert_eq!(viewport.stage(), DegradeStage::FULL);
}

#[test]
fn test_minimal_phone_boots_on_fallback_with_shadows_off() {
    let (_surface, viewport) = boot(
        FakeProvider::default(),
        FakeProbe::phone(false),
        quiet_config(),
    );
    let mut viewport = viewport.unwrap();

    assert_eq!(viewport.profile().tier, Tier::MobileMinimal);
    assert_eq!(viewport.backend_type(), BackendType::FallbackRasterizer);
    assert_eq!(
        viewport.toggles().state["shadows"],
        CapabilityToggle::Shadows(false)
    );

    let mut light = sun();
    let report = viewport.tick(Instant::now(), &camera(), Some(&mut light));
    assert!(report.shadow_bounds.is_none());
}

#[test]
fn test_exhausted_backends_fail_boot() {
    let provider = FakeProvider {
        broken: true,
        ..Default::default()
    };
    let (_surface, viewport) = boot(provider, FakeProbe::phone(true), quiet_config());
    assert!(matches!(viewport, Err(InitError::Exhausted { .. })));
}

#[test]
fn test_forced_governance_applies_on_desktop() {
    let mut config = quiet_config();
    config.governor.force_enabled = true;
    let provider = FakeProvider {
        advanced: true,
        ..Default::default()
    };
    let (_surface, viewport) = boot(provider, FakeProbe::desktop(), config);
    let mut viewport = viewport.unwrap();

    let mut now = Instant::now();
    let changes = run_frames(&mut viewport, &mut now, 7, Duration::from_millis(80));
    assert_eq!(changes, vec![1]);
}

#[test]
fn test_force_fallback_skips_the_advanced_backend() {
    let mut config = quiet_config();
    config.force_fallback = true;
    let provider = FakeProvider {
        advanced: true,
        ..Default::default()
    };
    let (_surface, viewport) = boot(provider, FakeProbe::desktop(), config);
    assert_eq!(
        viewport.unwrap().backend_type(),
        BackendType::FallbackRasterizer
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Cancellation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_cancel_before_boot_creates_nothing() {
    let surface = Rc::new(SignalSurface::new(320, 240, 1.0));
    let builder = ViewportBuilder::new(FakeProvider::default(), FakeProbe::phone(true))
        .with_config(quiet_config());
    builder.cancellation_token().cancel();

    let result = pollster::block_on(builder.boot(surface, Scene::default()));
    assert!(matches!(result, Err(InitError::Cancelled)));
}

#[test]
fn test_cancel_during_creation_disposes_the_new_context() {
    let token = CancellationToken::new();
    let provider = FakeProvider {
        cancel_during_create: RefCell::new(Some(token.clone())),
        ..Default::default()
    };
    let journal = provider.journal.clone();
    let surface = Rc::new(SignalSurface::new(320, 240, 1.0));
    let builder = ViewportBuilder::new(provider, FakeProbe::phone(true))
        .with_config(quiet_config())
        .with_cancellation_token(token);

    let result = pollster::block_on(builder.boot(surface.clone(), Scene::default()));
    assert!(matches!(result, Err(InitError::Cancelled)));
    assert_eq!(
        journal.borrow().last().map(String::as_str),
        Some("dispose fallback rasterizer")
    );
    // Nothing is left listening on the surface.
    assert_eq!(surface.listener_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Frame loop
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_tick_fits_the_shadow_camera_until_the_first_degrade() {
    let (_surface, viewport) = boot(
        FakeProvider::default(),
        FakeProbe::phone(true),
        quiet_config(),
    );
    let mut viewport = viewport.unwrap();
    assert_eq!(viewport.profile().tier, Tier::MobileCapable);

    let mut now = Instant::now();
    let mut light = sun();
    let report = viewport.tick(now, &camera(), Some(&mut light));
    let bounds = report.shadow_bounds.expect("shadows are fitted at full quality");
    let shadow = light.shadow.unwrap();
    assert!(shadow.needs_update);
    assert!(bounds.width() <= 120.0 + 2.0 * 4.0 + 1e-2);

    let changes = run_frames(&mut viewport, &mut now, 6, Duration::from_millis(90));
    assert_eq!(changes, vec![1]);
    assert_eq!(
        viewport.toggles().state["shadows"],
        CapabilityToggle::Shadows(false)
    );

    now += Duration::from_millis(16);
    let mut light = sun();
    let report = viewport.tick(now, &camera(), Some(&mut light));
    assert!(report.shadow_bounds.is_none());
    assert_eq!(light, sun());
}

#[test]
fn test_the_degrading_frame_still_fits_the_shadow_camera() {
    let (_surface, viewport) = boot(
        FakeProvider::default(),
        FakeProbe::phone(true),
        quiet_config(),
    );
    let mut viewport = viewport.unwrap();

    let mut now = Instant::now();
    let degrading = loop {
        now += Duration::from_millis(90);
        let mut light = sun();
        let report = viewport.tick(now, &camera(), Some(&mut light));
        if report.degraded_to.is_some() {
            break report;
        }
        assert!(report.shadow_bounds.is_some());
    };
    assert_eq!(degrading.degraded_to.map(|s| s.get()), Some(1));
    assert!(degrading.shadow_bounds.is_some());

    now += Duration::from_millis(16);
    let report = viewport.tick(now, &camera(), Some(&mut sun()));
    assert!(report.shadow_bounds.is_none());
}

#[test]
fn test_sustained_jank_walks_every_stage_and_publishes_events() {
    let (_surface, viewport) = boot(
        FakeProvider::default(),
        FakeProbe::phone(false),
        quiet_config(),
    );
    let mut viewport = viewport.unwrap();
    let events = viewport.subscribe();

    let mut now = Instant::now();
    let changes = run_frames(&mut viewport, &mut now, 40, Duration::from_millis(120));
    assert_eq!(changes, vec![1, 2, 3]);
    assert_eq!(viewport.stage(), DegradeStage::MAX);
    assert_eq!(
        viewport.toggles().state["maxAnisotropy"],
        CapabilityToggle::MaxAnisotropy(1)
    );

    let published: Vec<_> = events.try_iter().collect();
    assert_eq!(
        published,
        vec![
            GovernorEvent::Degrade { stage: DegradeStage::new(1) },
            GovernorEvent::Degrade { stage: DegradeStage::new(2) },
            GovernorEvent::Degrade { stage: DegradeStage::new(3) },
        ]
    );
}

#[test]
fn test_fatal_fault_degrades_even_without_governance() {
    let provider = FakeProvider {
        advanced: true,
        ..Default::default()
    };
    let (_surface, viewport) = boot(provider, FakeProbe::desktop(), quiet_config());
    let mut viewport = viewport.unwrap();

    viewport.fatal_probe().report_fault(&"worker panicked");
    let report = viewport.tick(Instant::now(), &camera(), None);
    assert_eq!(report.degraded_to, Some(DegradeStage::MAX));
    assert_eq!(
        viewport.toggles().state["globalIllumination"],
        CapabilityToggle::GlobalIllumination(false)
    );
}

#[test]
fn test_resize_reaches_the_context_through_tick() {
    let (surface, viewport) = boot(
        FakeProvider::default(),
        FakeProbe::phone(true),
        quiet_config(),
    );
    let mut viewport = viewport.unwrap();

    surface.signal_sender().resized(200, 100);
    let report = viewport.tick(Instant::now(), &camera(), None);
    assert_eq!(report.signals, 1);
    // MobileCapable caps the native ratio of 2.0 at 1.25.
    let frames = viewport.with_renderer(|context| {
        context.frames += 1;
        context.journal.borrow().last().cloned()
    });
    assert_eq!(frames, Ok(Some("resize 250x125".to_string())));
}

#[test]
fn test_resize_uses_the_pixel_ratio_current_at_the_resize() {
    let (surface, viewport) = boot(
        FakeProvider::default(),
        FakeProbe::phone(true),
        quiet_config(),
    );
    let mut viewport = viewport.unwrap();

    // Dragged onto a 1x monitor after boot.
    surface.set_device_pixel_ratio(1.0);
    surface.signal_sender().resized(200, 100);
    viewport.tick(Instant::now(), &camera(), None);
    let last = viewport.with_renderer(|context| context.journal.borrow().last().cloned());
    assert_eq!(last, Ok(Some("resize 200x100".to_string())));
}

// ─────────────────────────────────────────────────────────────────────────────
// Context loss
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_loss_gates_toggles_and_recovery_restores_them() {
    let provider = FakeProvider::default();
    let journal = provider.journal.clone();
    let (surface, viewport) = boot(provider, FakeProbe::phone(true), quiet_config());
    let mut viewport = viewport.unwrap();
    let events = viewport.subscribe();

    surface.signal_sender().context_lost();
    let mut now = Instant::now();
    viewport.tick(now, &camera(), None);
    assert!(viewport.needs_recovery());
    assert!(!surface.is_torn_down());
    assert_eq!(
        viewport.with_renderer(|_| ()),
        Err(RenderError::ContextLost)
    );

    // Degrading while lost queues the toggles instead of touching the scene.
    let changes = run_frames(&mut viewport, &mut now, 6, Duration::from_millis(90));
    assert_eq!(changes, vec![1]);
    assert!(viewport.toggles().state.is_empty());

    let backend = pollster::block_on(viewport.recover()).unwrap();
    assert_eq!(backend, BackendType::FallbackRasterizer);
    assert!(!viewport.needs_recovery());
    assert_eq!(
        viewport.toggles().state["shadows"],
        CapabilityToggle::Shadows(false)
    );
    assert!(viewport.with_renderer(|_| ()).is_ok());
    assert_eq!(viewport.stage(), DegradeStage::new(1));

    let published: Vec<_> = events.try_iter().collect();
    assert_eq!(published.first(), Some(&GovernorEvent::ContextLost));
    assert_eq!(published.last(), Some(&GovernorEvent::ContextRestored));

    let journal = journal.borrow();
    let creates = journal.iter().filter(|e| e.starts_with("create")).count();
    let disposes = journal.iter().filter(|e| e.starts_with("dispose")).count();
    assert_eq!((creates, disposes), (2, 1));
}

#[test]
fn test_recover_without_loss_is_a_no_op() {
    let provider = FakeProvider::default();
    let journal = provider.journal.clone();
    let (_surface, viewport) = boot(provider, FakeProbe::phone(true), quiet_config());
    let mut viewport = viewport.unwrap();

    assert!(pollster::block_on(viewport.recover()).is_ok());
    assert_eq!(
        journal.borrow().iter().filter(|e| e.starts_with("create")).count(),
        1
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Shutdown
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_shutdown_is_idempotent_and_stops_the_loop() {
    let provider = FakeProvider::default();
    let journal = provider.journal.clone();
    let (surface, viewport) = boot(provider, FakeProbe::phone(true), quiet_config());
    let mut viewport = viewport.unwrap();

    viewport.shutdown();
    viewport.shutdown();
    assert!(!viewport.is_running());
    assert_eq!(surface.listener_count(), 0);
    assert_eq!(
        viewport.with_renderer(|_| ()),
        Err(RenderError::Disposed)
    );

    let mut light = sun();
    let report = viewport.tick(Instant::now(), &camera(), Some(&mut light));
    assert_eq!(report, Default::default());
    assert!(matches!(
        pollster::block_on(viewport.recover()),
        Err(InitError::Cancelled)
    ));

    drop(viewport);
    let disposes = journal
        .borrow()
        .iter()
        .filter(|e| e.starts_with("dispose"))
        .count();
    assert_eq!(disposes, 1);
}
