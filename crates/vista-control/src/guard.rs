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

//! GPU context loss interception and toggle gating.

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;
use vista_core::platform::{RenderSurface, Subscription, SurfaceSignal};
use vista_core::renderer::ContextStatus;
use vista_core::{CapabilityToggle, EventBus, GovernorEvent, ToggleCapabilitySet};

/// Keeps a surface's GPU context recoverable.
///
/// While attached, every loss is claimed with
/// [`prevent_default`](vista_core::platform::LossNotice::prevent_default) so
/// the surface never tears itself down. The shared [`ContextStatus`] is flipped
/// and each transition is published once on the bus; duplicate signals are
/// ignored.
pub struct ContextGuard {
    subscription: Option<Subscription>,
    status: ContextStatus,
}

impl ContextGuard {
    /// Starts listening on `surface`.
    pub fn attach<S: RenderSurface + ?Sized>(
        surface: &S,
        status: ContextStatus,
        events: Arc<EventBus<GovernorEvent>>,
    ) -> Self {
        let shared = status.clone();
        let subscription = surface.subscribe(Rc::new(move |signal: &SurfaceSignal| match signal {
            SurfaceSignal::ContextLost(notice) => {
                notice.prevent_default();
                if shared.mark_lost() {
                    log::warn!("GPU context lost; rendering suspended until restore");
                    events.publish(GovernorEvent::ContextLost);
                }
            }
            SurfaceSignal::ContextRestored => {
                if shared.mark_restored() {
                    log::info!("GPU context restored; GPU resources must be rebuilt");
                    events.publish(GovernorEvent::ContextRestored);
                }
            }
            SurfaceSignal::Resized { .. } => {}
        }));

        Self {
            subscription: Some(subscription),
            status,
        }
    }

    /// Stops listening. Idempotent.
    pub fn detach(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
            log::debug!("Context guard detached");
        }
    }

    /// Whether the guard is still listening.
    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// The status this guard maintains.
    pub fn status(&self) -> &ContextStatus {
        &self.status
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        self.detach();
    }
}

/// A [`ToggleCapabilitySet`] that holds toggles back while the context is lost.
///
/// Queued toggles are replayed in arrival order by
/// [`flush_pending`](Self::flush_pending), or by the next `apply` once the
/// context is usable again.
pub struct GatedToggles<T: ToggleCapabilitySet> {
    inner: T,
    status: ContextStatus,
    pending: VecDeque<CapabilityToggle>,
}

impl<T: ToggleCapabilitySet> GatedToggles<T> {
    /// Wraps `inner`, gated on `status`.
    pub fn new(inner: T, status: ContextStatus) -> Self {
        Self {
            inner,
            status,
            pending: VecDeque::new(),
        }
    }

    /// Applies every queued toggle if the context is usable. Returns how many ran.
    pub fn flush_pending(&mut self) -> usize {
        if !self.status.is_usable() {
            return 0;
        }
        let count = self.pending.len();
        while let Some(toggle) = self.pending.pop_front() {
            self.inner.apply(toggle);
        }
        if count > 0 {
            log::debug!("Replayed {count} capability toggles after restore");
        }
        count
    }

    /// Number of toggles waiting for a restore.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The wrapped set.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// The wrapped set, mutably. Bypasses the gate.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Unwraps, dropping anything still queued.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: ToggleCapabilitySet> ToggleCapabilitySet for GatedToggles<T> {
    fn apply(&mut self, toggle: CapabilityToggle) {
        if !self.status.is_usable() {
            self.pending.push_back(toggle);
            return;
        }
        self.flush_pending();
        self.inner.apply(toggle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vista_core::platform::SignalSurface;

    #[derive(Default)]
    struct Recorder(Vec<CapabilityToggle>);

    impl ToggleCapabilitySet for Recorder {
        fn apply(&mut self, toggle: CapabilityToggle) {
            self.0.push(toggle);
        }
    }

    #[test]
    fn duplicate_signals_publish_once() {
        let surface = SignalSurface::new(1, 1, 1.0);
        let bus = Arc::new(EventBus::new());
        let rx = bus.subscribe();
        let _guard = ContextGuard::attach(&surface, ContextStatus::new(), bus.clone());

        let sender = surface.sender();
        sender.context_restored();
        sender.context_lost();
        sender.context_lost();
        sender.context_restored();
        sender.context_restored();
        surface.pump();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![GovernorEvent::ContextLost, GovernorEvent::ContextRestored]
        );
        assert!(!surface.is_torn_down());
    }

    #[test]
    fn detach_is_idempotent_and_restores_default_teardown() {
        let surface = SignalSurface::new(1, 1, 1.0);
        let mut guard = ContextGuard::attach(&surface, ContextStatus::new(), Arc::default());
        guard.detach();
        guard.detach();
        assert!(!guard.is_attached());
        assert_eq!(surface.listener_count(), 0);

        surface.sender().context_lost();
        surface.pump();
        assert!(surface.is_torn_down());
        assert!(guard.status().is_usable());
    }

    #[test]
    fn gated_toggles_apply_directly_while_usable() {
        let mut gated = GatedToggles::new(Recorder::default(), ContextStatus::new());
        gated.apply(CapabilityToggle::Bloom(false));
        assert_eq!(gated.pending_len(), 0);
        assert_eq!(gated.inner().0, vec![CapabilityToggle::Bloom(false)]);
    }

    #[test]
    fn next_apply_after_restore_replays_the_queue_first() {
        let status = ContextStatus::new();
        let mut gated = GatedToggles::new(Recorder::default(), status.clone());
        status.mark_lost();
        gated.apply(CapabilityToggle::Shadows(false));
        assert_eq!(gated.flush_pending(), 0);

        status.mark_restored();
        gated.apply(CapabilityToggle::MaxAnisotropy(1));
        assert_eq!(
            gated.into_inner().0,
            vec![
                CapabilityToggle::Shadows(false),
                CapabilityToggle::MaxAnisotropy(1)
            ]
        );
    }
}
