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

//! The owning handle around a live render context.

use super::backend::{BackendType, RenderContext};
use super::error::RenderError;
use super::tier::RenderProfile;
use crate::platform::{physical_pixels, RenderSurface, Subscription, SurfaceSignal};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared usable/lost flag of a GPU context.
///
/// Cloned into the [`RendererHandle`] and the context-loss guard. Only the guard
/// flips it; everyone else reads.
#[derive(Debug, Clone, Default)]
pub struct ContextStatus {
    lost: Arc<AtomicBool>,
}

impl ContextStatus {
    /// A new status, initially usable.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while the context can be used.
    pub fn is_usable(&self) -> bool {
        !self.lost.load(Ordering::Acquire)
    }

    /// Marks the context lost. Returns `false` if it was already lost.
    pub fn mark_lost(&self) -> bool {
        !self.lost.swap(true, Ordering::AcqRel)
    }

    /// Marks the context usable again. Returns `false` if it was not lost.
    pub fn mark_restored(&self) -> bool {
        self.lost.swap(false, Ordering::AcqRel)
    }
}

/// Owns a render context for the lifetime of a session.
///
/// All access goes through [`with_context`](Self::with_context), which refuses
/// while the shared [`ContextStatus`] reports a loss. Dropping the handle
/// removes its resize listener and disposes the context.
pub struct RendererHandle<C: RenderContext> {
    context: Rc<RefCell<Option<C>>>,
    status: ContextStatus,
    backend: BackendType,
    resize: Option<Subscription>,
}

impl<C: RenderContext + 'static> RendererHandle<C> {
    /// Takes ownership of `context`.
    pub fn new(context: C, status: ContextStatus) -> Self {
        let backend = context.backend_type();
        Self {
            context: Rc::new(RefCell::new(Some(context))),
            status,
            backend,
            resize: None,
        }
    }

    /// Forwards the surface's resize signals to the context, in physical pixels.
    ///
    /// Each resize is scaled by the pixel ratio it carries, clamped to the
    /// profile's cap, so a monitor change between resizes is picked up. Replaces
    /// any previously bound listener. Resizes arriving while the context is lost
    /// are skipped.
    pub fn bind_resize<S: RenderSurface + ?Sized>(&mut self, surface: &S, profile: &RenderProfile) {
        let context = Rc::downgrade(&self.context);
        let status = self.status.clone();
        let profile = *profile;
        let subscription = surface.subscribe(Rc::new(move |signal: &SurfaceSignal| {
            let SurfaceSignal::Resized {
                width,
                height,
                pixel_ratio,
            } = *signal
            else {
                return;
            };
            let pixel_ratio = profile.clamp_pixel_ratio(pixel_ratio);
            if !status.is_usable() {
                return;
            }
            let Some(context) = context.upgrade() else {
                return;
            };
            if let Some(ctx) = context.borrow_mut().as_mut() {
                ctx.resize(
                    physical_pixels(width, pixel_ratio),
                    physical_pixels(height, pixel_ratio),
                );
            };
        }));
        self.resize = Some(subscription);
    }

    /// Runs `f` against the context.
    pub fn with_context<R>(&self, f: impl FnOnce(&C) -> R) -> Result<R, RenderError> {
        if !self.status.is_usable() {
            return Err(RenderError::ContextLost);
        }
        let guard = self.context.borrow();
        let ctx = guard.as_ref().ok_or(RenderError::Disposed)?;
        Ok(f(ctx))
    }

    /// Runs `f` against the context with mutable access.
    pub fn with_context_mut<R>(&self, f: impl FnOnce(&mut C) -> R) -> Result<R, RenderError> {
        if !self.status.is_usable() {
            return Err(RenderError::ContextLost);
        }
        let mut guard = self.context.borrow_mut();
        let ctx = guard.as_mut().ok_or(RenderError::Disposed)?;
        Ok(f(ctx))
    }
}

impl<C: RenderContext> RendererHandle<C> {
    /// The backend the context runs on.
    pub fn backend_type(&self) -> BackendType {
        self.backend
    }

    /// The shared status flag.
    pub fn status(&self) -> &ContextStatus {
        &self.status
    }

    /// `true` while the context is neither lost nor disposed.
    pub fn is_usable(&self) -> bool {
        self.status.is_usable() && self.context.borrow().is_some()
    }

    /// Removes the resize listener and disposes the context. Idempotent.
    pub fn dispose(&mut self) {
        if let Some(mut subscription) = self.resize.take() {
            subscription.cancel();
        }
        if let Some(mut ctx) = self.context.borrow_mut().take() {
            log::debug!("Disposing {} render context", self.backend);
            ctx.dispose();
        }
    }
}

impl<C: RenderContext> Drop for RendererHandle<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<C: RenderContext> std::fmt::Debug for RendererHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererHandle")
            .field("backend", &self.backend)
            .field("usable", &self.status.is_usable())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::SignalSurface;
    use crate::renderer::backend::ContextSettings;
    use crate::renderer::error::BackendError;
    use crate::renderer::tier::Tier;
    use std::cell::Cell;

    #[derive(Default)]
    struct Probe {
        size: Cell<(u32, u32)>,
        disposed: Cell<u32>,
    }

    struct FakeContext(Rc<Probe>);

    impl RenderContext for FakeContext {
        fn backend_type(&self) -> BackendType {
            BackendType::FallbackRasterizer
        }
        fn configure(&mut self, _: &ContextSettings) -> Result<(), BackendError> {
            Ok(())
        }
        fn resize(&mut self, width: u32, height: u32) {
            self.0.size.set((width, height));
        }
        fn is_device_alive(&self) -> bool {
            true
        }
        fn dispose(&mut self) {
            self.0.disposed.set(self.0.disposed.get() + 1);
        }
    }

    #[test]
    fn status_transitions_report_changes_once() {
        let status = ContextStatus::new();
        assert!(status.is_usable());
        assert!(status.mark_lost());
        assert!(!status.mark_lost());
        assert!(!status.is_usable());
        assert!(status.mark_restored());
        assert!(!status.mark_restored());
    }

    #[test]
    fn access_is_refused_while_lost() {
        let status = ContextStatus::new();
        let handle = RendererHandle::new(FakeContext(Rc::default()), status.clone());
        assert!(handle.with_context(|_| ()).is_ok());

        status.mark_lost();
        assert_eq!(handle.with_context(|_| ()), Err(RenderError::ContextLost));
        assert_eq!(handle.with_context_mut(|_| ()), Err(RenderError::ContextLost));

        status.mark_restored();
        assert!(handle.with_context(|_| ()).is_ok());
    }

    #[test]
    fn resize_is_scaled_and_unbound_on_drop() {
        let probe = Rc::new(Probe::default());
        let surface = SignalSurface::new(800, 600, 2.0);
        let mut handle = RendererHandle::new(FakeContext(probe.clone()), ContextStatus::new());
        // Capped at 1.5 on a 2.0 display.
        handle.bind_resize(&surface, &RenderProfile::for_tier(Tier::DesktopStandard));
        assert_eq!(surface.listener_count(), 1);

        surface.sender().resized(100, 40);
        surface.pump();
        assert_eq!(probe.size.get(), (150, 60));

        drop(handle);
        assert_eq!(surface.listener_count(), 0);
        assert_eq!(probe.disposed.get(), 1);
    }

    #[test]
    fn resize_follows_a_pixel_ratio_change_after_binding() {
        let probe = Rc::new(Probe::default());
        let surface = SignalSurface::new(800, 600, 1.0);
        let mut handle = RendererHandle::new(FakeContext(probe.clone()), ContextStatus::new());
        handle.bind_resize(&surface, &RenderProfile::for_tier(Tier::DesktopAdvanced));

        surface.sender().resized(100, 40);
        surface.pump();
        assert_eq!(probe.size.get(), (100, 40));

        surface.set_device_pixel_ratio(2.0);
        surface.sender().resized(100, 40);
        surface.pump();
        assert_eq!(probe.size.get(), (200, 80));

        // Still capped by the profile.
        surface.set_device_pixel_ratio(3.0);
        surface.sender().resized(100, 40);
        surface.pump();
        assert_eq!(probe.size.get(), (200, 80));
    }

    #[test]
    fn dispose_is_idempotent() {
        let probe = Rc::new(Probe::default());
        let mut handle = RendererHandle::new(FakeContext(probe.clone()), ContextStatus::new());
        handle.dispose();
        handle.dispose();
        assert_eq!(handle.with_context(|_| ()), Err(RenderError::Disposed));
        drop(handle);
        assert_eq!(probe.disposed.get(), 1);
    }
}
