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

//! Session orchestration: boot, per-frame tick, recovery and teardown.

use crate::config::ViewportConfig;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use vista_control::{
    ContextGuard, DegradePolicy, FatalErrorProbe, FrameGovernor, GatedToggles, RendererFactory,
    TierClassifier,
};
use vista_core::platform::{PlatformProbe, RenderSurface};
use vista_core::renderer::{
    BackendProvider, BackendType, CameraSnapshot, ContextStatus, DirectionalShadowLight,
    InitError, LightSpaceBounds, RenderError, RendererHandle,
};
use vista_core::{
    CapabilityToggle, DegradeStage, EventBus, GovernorEvent, RenderProfile, ToggleCapabilitySet,
};
use vista_lanes::ShadowFitLane;

/// Tells an in-flight [`ViewportBuilder::boot`] or [`Viewport::recover`] that
/// the session was torn down.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What one [`Viewport::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// Surface signals dispatched this tick.
    pub signals: usize,
    /// The new degrade stage, if it changed this tick.
    pub degraded_to: Option<DegradeStage>,
    /// The light-space box the shadow camera was fitted to, if a fit ran.
    pub shadow_bounds: Option<LightSpaceBounds>,
}

/// Collects everything a session needs and boots it.
pub struct ViewportBuilder<P: BackendProvider, Q: PlatformProbe> {
    provider: P,
    probe: Q,
    config: ViewportConfig,
    events: Arc<EventBus<GovernorEvent>>,
    fatal: FatalErrorProbe,
    cancel: CancellationToken,
}

impl<P, Q> ViewportBuilder<P, Q>
where
    P: BackendProvider,
    P::Context: 'static,
    Q: PlatformProbe,
{
    /// A builder with the default configuration.
    pub fn new(provider: P, probe: Q) -> Self {
        Self {
            provider,
            probe,
            config: ViewportConfig::default(),
            events: Arc::new(EventBus::new()),
            fatal: FatalErrorProbe::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: ViewportConfig) -> Self {
        self.config = config;
        self
    }

    /// Publishes governor events on an existing bus.
    pub fn with_events(mut self, events: Arc<EventBus<GovernorEvent>>) -> Self {
        self.events = events;
        self
    }

    /// The bus governor events will be published on.
    pub fn events(&self) -> Arc<EventBus<GovernorEvent>> {
        self.events.clone()
    }

    /// The probe that reports uncaught faults to this session.
    pub fn fatal_probe(&self) -> FatalErrorProbe {
        self.fatal.clone()
    }

    /// Shares a cancellation token owned by the host.
    pub fn with_cancellation_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The token that cancels this session, before or after boot.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Classifies the device, creates the renderer and wires up the governor.
    ///
    /// The tier is known before the renderer is requested, and the returned
    /// [`Viewport`] is the only way to tick, so no frame can run while either is
    /// pending. If the token is cancelled while this is in flight, whatever was
    /// created is disposed and [`InitError::Cancelled`] is returned.
    pub async fn boot<T: ToggleCapabilitySet>(
        self,
        surface: Rc<P::Surface>,
        toggles: T,
    ) -> Result<Viewport<P, T>, InitError> {
        let Self {
            provider,
            probe,
            config,
            events,
            fatal,
            cancel,
        } = self;

        if config.install_panic_hook {
            fatal.install_panic_hook();
        }

        let tier = TierClassifier::detect(&probe).await;
        if cancel.is_cancelled() {
            log::info!("Viewport torn down during tier detection");
            return Err(InitError::Cancelled);
        }

        let mut profile =
            RenderProfile::for_tier(tier).with_forced_governance(config.governor.force_enabled);
        if config.force_fallback {
            profile.prefer_advanced_backend = false;
        }

        let factory = RendererFactory::new(provider).with_clear_color(config.clear_color);
        let status = ContextStatus::new();
        let (handle, backend) = factory
            .create_with_status(&*surface, &profile, status.clone())
            .await?;
        if cancel.is_cancelled() {
            log::info!("Viewport torn down during renderer creation; disposing {backend}");
            drop(handle);
            return Err(InitError::Cancelled);
        }

        let guard = ContextGuard::attach(&*surface, status.clone(), events.clone());
        let governor = FrameGovernor::new(config.governor, profile.frame_governance, fatal.signal())
            .with_events(events.clone());
        let mut toggles = GatedToggles::new(toggles, status.clone());
        if !profile.shadows_enabled {
            toggles.apply(CapabilityToggle::Shadows(false));
        }
        let shadow_lane = ShadowFitLane::for_profile(&profile, config.shadow_fit);

        log::info!(
            "Viewport ready: tier {}, backend {}, governance {}",
            profile.tier,
            backend,
            if governor.is_enabled() { "on" } else { "off" }
        );

        Ok(Viewport {
            factory,
            surface,
            profile,
            handle: Some(handle),
            backend,
            status,
            guard,
            governor,
            policy: DegradePolicy::new(),
            toggles,
            shadow_lane,
            events,
            fatal,
            cancel,
            running: true,
        })
    }
}

/// A running session on one surface.
pub struct Viewport<P: BackendProvider, T: ToggleCapabilitySet> {
    factory: RendererFactory<P>,
    surface: Rc<P::Surface>,
    profile: RenderProfile,
    handle: Option<RendererHandle<P::Context>>,
    backend: BackendType,
    status: ContextStatus,
    guard: ContextGuard,
    governor: FrameGovernor,
    policy: DegradePolicy,
    toggles: GatedToggles<T>,
    shadow_lane: ShadowFitLane,
    events: Arc<EventBus<GovernorEvent>>,
    fatal: FatalErrorProbe,
    cancel: CancellationToken,
    running: bool,
}

impl<P, T> Viewport<P, T>
where
    P: BackendProvider,
    P::Context: 'static,
    T: ToggleCapabilitySet,
{
    /// Runs the per-frame governor work, in order: surface signals, jank
    /// sampling, degrade toggles (effective next frame), then the shadow fit.
    ///
    /// Call once per frame before the shadow pass. Does nothing after
    /// [`shutdown`](Self::shutdown).
    pub fn tick(
        &mut self,
        now: Instant,
        camera: &CameraSnapshot,
        light: Option<&mut DirectionalShadowLight>,
    ) -> FrameReport {
        if !self.running {
            return FrameReport::default();
        }

        let signals = self.surface.pump();
        if self.status.is_usable() {
            self.toggles.flush_pending();
        }

        // Toggles applied below take effect next frame, and so does the fit.
        let shadows_active = self.shadows_active();
        let degraded_to = self.governor.sample(now);
        if let Some(stage) = degraded_to {
            self.policy.apply(stage, &mut self.toggles);
        }

        let shadow_bounds = if shadows_active {
            self.shadow_lane.fit(camera, light)
        } else {
            None
        };

        FrameReport {
            signals,
            degraded_to,
            shadow_bounds,
        }
    }

    fn shadows_active(&self) -> bool {
        self.profile.shadows_enabled && self.policy.applied_stage() == DegradeStage::FULL
    }

    /// Runs `f` against the render context.
    pub fn with_renderer<R>(
        &self,
        f: impl FnOnce(&mut P::Context) -> R,
    ) -> Result<R, RenderError> {
        self.handle
            .as_ref()
            .ok_or(RenderError::Disposed)?
            .with_context_mut(f)
    }

    /// Whether the context is lost and [`recover`](Self::recover) should run.
    pub fn needs_recovery(&self) -> bool {
        self.running && !self.status.is_usable()
    }

    /// Rebuilds a lost context through the full fallback chain and announces
    /// the restore.
    ///
    /// Listeners receive [`GovernorEvent::ContextRestored`] and must rebuild
    /// their GPU resources. Queued toggles are replayed. The degrade stage is
    /// kept.
    pub async fn recover(&mut self) -> Result<BackendType, InitError> {
        if !self.running {
            return Err(InitError::Cancelled);
        }
        if self.status.is_usable() {
            return Ok(self.backend);
        }

        log::warn!("Rebuilding lost {} context", self.backend);
        self.handle = None;
        let (handle, backend) = self
            .factory
            .create_with_status(&*self.surface, &self.profile, self.status.clone())
            .await?;
        if self.cancel.is_cancelled() || !self.running {
            drop(handle);
            return Err(InitError::Cancelled);
        }
        self.handle = Some(handle);
        self.backend = backend;

        self.surface.signal_sender().context_restored();
        self.surface.pump();
        self.toggles.flush_pending();
        Ok(backend)
    }

    /// Stops ticking, detaches the guard and disposes the renderer. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.cancel.cancel();
        self.guard.detach();
        self.handle = None;
        log::info!("Viewport shut down at {}", self.governor.stage());
    }

    /// Whether [`shutdown`](Self::shutdown) has not run yet.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Subscribes to governor events.
    pub fn subscribe(&self) -> flume::Receiver<GovernorEvent> {
        self.events.subscribe()
    }

    /// The session profile.
    pub fn profile(&self) -> &RenderProfile {
        &self.profile
    }

    /// The backend the renderer runs on.
    pub fn backend_type(&self) -> BackendType {
        self.backend
    }

    /// The current degrade stage.
    pub fn stage(&self) -> DegradeStage {
        self.governor.stage()
    }

    /// The surface this session renders to.
    pub fn surface(&self) -> &Rc<P::Surface> {
        &self.surface
    }

    /// The scene's toggles.
    pub fn toggles(&self) -> &T {
        self.toggles.inner()
    }

    /// The probe reporting uncaught faults to this session.
    pub fn fatal_probe(&self) -> &FatalErrorProbe {
        &self.fatal
    }

    /// The shadow fitter.
    pub fn shadow_lane_mut(&mut self) -> &mut ShadowFitLane {
        &mut self.shadow_lane
    }
}

impl<P: BackendProvider, T: ToggleCapabilitySet> Drop for Viewport<P, T> {
    fn drop(&mut self) {
        self.running = false;
        self.cancel.cancel();
        self.guard.detach();
    }
}
