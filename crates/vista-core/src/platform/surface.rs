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

//! Render surfaces and the signals they emit.
//!
//! A surface delivers resize and context loss/restore notifications to
//! listeners on the frame-loop thread. Signals raised elsewhere (a driver
//! callback, another thread) are queued through a [`SignalSender`] and
//! dispatched by [`SignalSurface::pump`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Passed with a context-loss signal. A listener calls
/// [`prevent_default`](Self::prevent_default) to keep the surface recoverable.
#[derive(Debug, Default)]
pub struct LossNotice {
    prevented: Cell<bool>,
}

impl LossNotice {
    /// A fresh notice nobody has claimed yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opts into recovery; the surface skips its default teardown.
    pub fn prevent_default(&self) {
        self.prevented.set(true);
    }

    /// Whether any listener opted into recovery.
    pub fn default_prevented(&self) -> bool {
        self.prevented.get()
    }
}

/// A hardware or host signal emitted by a surface.
#[derive(Debug)]
pub enum SurfaceSignal {
    /// The surface's logical size changed.
    Resized {
        /// Logical width.
        width: u32,
        /// Logical height.
        height: u32,
        /// Native device pixel ratio at the time of dispatch.
        pixel_ratio: f32,
    },
    /// The GPU context backing the surface was lost.
    ContextLost(LossNotice),
    /// The GPU context is available again.
    ContextRestored,
}

/// A surface listener.
pub type SignalListener = Rc<dyn Fn(&SurfaceSignal)>;

/// Keeps a listener registered. Dropping it unregisters the listener.
#[must_use = "dropping a Subscription unregisters its listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wraps the closure that unregisters the listener.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unregisters now. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Whether the listener is still registered through this subscription.
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Converts a logical length to physical pixels, never returning zero.
pub fn physical_pixels(logical: u32, pixel_ratio: f32) -> u32 {
    ((logical as f32 * pixel_ratio).round() as u32).max(1)
}

/// Something the renderer draws into.
pub trait RenderSurface {
    /// Logical size in pixels.
    fn size(&self) -> (u32, u32);

    /// Native device-pixel-ratio.
    fn device_pixel_ratio(&self) -> f32;

    /// Registers a listener for this surface's signals.
    fn subscribe(&self, listener: SignalListener) -> Subscription;

    /// A thread-safe sender feeding this surface's signal queue.
    fn signal_sender(&self) -> SignalSender;

    /// Dispatches queued signals on the calling thread. Returns how many ran.
    fn pump(&self) -> usize;
}

#[derive(Debug, Clone, Copy)]
enum QueuedSignal {
    Resized { width: u32, height: u32 },
    ContextLost,
    ContextRestored,
}

/// Thread-safe entry point for raising surface signals.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: flume::Sender<QueuedSignal>,
}

impl SignalSender {
    /// Queues a resize.
    pub fn resized(&self, width: u32, height: u32) {
        self.send(QueuedSignal::Resized { width, height });
    }

    /// Queues a context loss.
    pub fn context_lost(&self) {
        self.send(QueuedSignal::ContextLost);
    }

    /// Queues a context restore.
    pub fn context_restored(&self) {
        self.send(QueuedSignal::ContextRestored);
    }

    fn send(&self, signal: QueuedSignal) {
        if self.tx.send(signal).is_err() {
            log::debug!("Surface dropped; discarding {signal:?}");
        }
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(ListenerId, SignalListener)>,
}

/// A reusable [`RenderSurface`] core: listener registry, signal queue and
/// size tracking.
///
/// Platform surfaces embed one and delegate to it. It also serves as a headless
/// surface on its own.
pub struct SignalSurface {
    registry: Rc<RefCell<Registry>>,
    tx: flume::Sender<QueuedSignal>,
    rx: flume::Receiver<QueuedSignal>,
    size: Cell<(u32, u32)>,
    pixel_ratio: Cell<f32>,
    torn_down: Cell<bool>,
}

impl SignalSurface {
    /// A surface of the given logical size and pixel ratio.
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            registry: Rc::new(RefCell::new(Registry::default())),
            tx,
            rx,
            size: Cell::new((width, height)),
            pixel_ratio: Cell::new(pixel_ratio),
            torn_down: Cell::new(false),
        }
    }

    /// A sender that can be moved to other threads.
    pub fn sender(&self) -> SignalSender {
        SignalSender {
            tx: self.tx.clone(),
        }
    }

    /// Updates the native pixel ratio (e.g. after moving to another monitor).
    pub fn set_device_pixel_ratio(&self, pixel_ratio: f32) {
        self.pixel_ratio.set(pixel_ratio);
    }

    /// Dispatches every queued signal. Returns how many were dispatched.
    pub fn pump(&self) -> usize {
        let mut dispatched = 0;
        while let Ok(queued) = self.rx.try_recv() {
            let signal = match queued {
                QueuedSignal::Resized { width, height } => SurfaceSignal::Resized {
                    width,
                    height,
                    pixel_ratio: self.pixel_ratio.get(),
                },
                QueuedSignal::ContextLost => SurfaceSignal::ContextLost(LossNotice::new()),
                QueuedSignal::ContextRestored => SurfaceSignal::ContextRestored,
            };
            self.dispatch(&signal);
            dispatched += 1;
        }
        dispatched
    }

    /// Dispatches `signal` synchronously to every listener.
    ///
    /// A loss nobody prevented tears the surface down for good.
    pub fn dispatch(&self, signal: &SurfaceSignal) {
        match signal {
            SurfaceSignal::Resized { width, height, .. } => self.size.set((*width, *height)),
            SurfaceSignal::ContextRestored if self.torn_down.get() => {
                log::warn!("Ignoring context restore on a torn-down surface");
                return;
            }
            _ => {}
        }

        // Listeners may subscribe or unsubscribe while being called.
        let listeners: Vec<SignalListener> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in &listeners {
            listener(signal);
        }

        if let SurfaceSignal::ContextLost(notice) = signal {
            if !notice.default_prevented() {
                log::error!("Context lost with no recovery listener; surface torn down");
                self.torn_down.set(true);
            }
        }
    }

    /// Whether an unprevented loss tore the surface down.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.get()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.registry.borrow().listeners.len()
    }
}

impl RenderSurface for SignalSurface {
    fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.pixel_ratio.get()
    }

    fn signal_sender(&self) -> SignalSender {
        self.sender()
    }

    fn pump(&self) -> usize {
        SignalSurface::pump(self)
    }

    fn subscribe(&self, listener: SignalListener) -> Subscription {
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = ListenerId(registry.next_id);
            registry.next_id += 1;
            registry.listeners.push((id, listener));
            id
        };
        let registry: Weak<RefCell<Registry>> = Rc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }
}

impl fmt::Debug for SignalSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalSurface")
            .field("size", &self.size.get())
            .field("pixel_ratio", &self.pixel_ratio.get())
            .field("listeners", &self.listener_count())
            .field("torn_down", &self.torn_down.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, SignalListener) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let listener: SignalListener = Rc::new(move |signal: &SurfaceSignal| {
            let entry = match signal {
                SurfaceSignal::Resized {
                    width,
                    height,
                    pixel_ratio,
                } => format!("resize {width}x{height}@{pixel_ratio}"),
                SurfaceSignal::ContextLost(_) => "lost".to_string(),
                SurfaceSignal::ContextRestored => "restored".to_string(),
            };
            sink.borrow_mut().push(entry);
        });
        (log, listener)
    }

    #[test]
    fn pump_dispatches_in_order_and_tracks_size() {
        let surface = SignalSurface::new(10, 10, 1.0);
        let (log, listener) = recorder();
        let _sub = surface.subscribe(listener);

        let sender = surface.sender();
        sender.resized(640, 480);
        sender.context_restored();
        surface.set_device_pixel_ratio(2.0);
        assert_eq!(surface.pump(), 2);

        assert_eq!(*log.borrow(), vec!["resize 640x480@2", "restored"]);
        assert_eq!(surface.size(), (640, 480));
    }

    #[test]
    fn dropping_the_subscription_unregisters() {
        let surface = SignalSurface::new(1, 1, 1.0);
        let (log, listener) = recorder();
        let sub = surface.subscribe(listener);
        assert_eq!(surface.listener_count(), 1);
        drop(sub);
        assert_eq!(surface.listener_count(), 0);

        surface.sender().resized(2, 2);
        surface.pump();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn unprevented_loss_tears_down() {
        let surface = SignalSurface::new(1, 1, 1.0);
        surface.dispatch(&SurfaceSignal::ContextLost(LossNotice::new()));
        assert!(surface.is_torn_down());
    }

    #[test]
    fn prevented_loss_keeps_the_surface() {
        let surface = SignalSurface::new(1, 1, 1.0);
        let _sub = surface.subscribe(Rc::new(|signal: &SurfaceSignal| {
            if let SurfaceSignal::ContextLost(notice) = signal {
                notice.prevent_default();
            }
        }));
        surface.sender().context_lost();
        surface.pump();
        assert!(!surface.is_torn_down());
    }

    #[test]
    fn sender_works_from_another_thread() {
        let surface = SignalSurface::new(1, 1, 1.0);
        let sender = surface.sender();
        std::thread::spawn(move || sender.context_lost())
            .join()
            .unwrap();
        let (log, listener) = recorder();
        let _sub = surface.subscribe(listener);
        surface.pump();
        assert_eq!(*log.borrow(), vec!["lost"]);
    }
}
