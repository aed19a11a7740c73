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

//! Observation of uncaught faults.
//!
//! A fault anywhere in the process raises a [`FatalSignal`]; the frame governor
//! consumes it on its next tick and jumps straight to the last degrade stage.

use std::fmt::Display;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError, Weak};

/// Signals raised by the process-wide panic hook. Held weakly so dropped
/// sessions fall out on the next prune.
static WATCHED: Mutex<Vec<Weak<AtomicBool>>> = Mutex::new(Vec::new());
static HOOK: Once = Once::new();

fn watched() -> MutexGuard<'static, Vec<Weak<AtomicBool>>> {
    WATCHED.lock().unwrap_or_else(PoisonError::into_inner)
}

fn raise_watched() {
    watched().retain(|weak| match weak.upgrade() {
        Some(pending) => {
            pending.store(true, Ordering::Release);
            true
        }
        None => false,
    });
}

/// A latched "a fault happened" flag shared between the probe and the governor.
#[derive(Debug, Clone, Default)]
pub struct FatalSignal {
    pending: Arc<AtomicBool>,
}

impl FatalSignal {
    /// A new, unraised signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal. Safe from any thread, including a panic hook.
    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Returns whether the signal was raised, and clears it.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Whether the signal is currently raised.
    pub fn is_raised(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

/// Watches for uncaught faults and raises a [`FatalSignal`].
#[derive(Debug, Clone, Default)]
pub struct FatalErrorProbe {
    signal: FatalSignal,
}

impl FatalErrorProbe {
    /// A probe with its own signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// A probe raising an existing signal.
    pub fn with_signal(signal: FatalSignal) -> Self {
        Self { signal }
    }

    /// The signal this probe raises.
    pub fn signal(&self) -> FatalSignal {
        self.signal.clone()
    }

    /// Subscribes this probe's signal to panics anywhere in the process.
    ///
    /// A single hook is chained in front of the one installed at first use, so
    /// default panic output is preserved. Later calls only register the signal.
    /// Registering the same signal twice is a no-op, and a signal whose probes
    /// were all dropped is forgotten.
    pub fn install_panic_hook(&self) {
        HOOK.call_once(|| {
            let previous = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                raise_watched();
                previous(info);
            }));
            log::debug!("Process panic hook installed");
        });

        let mut watched = watched();
        watched.retain(|weak| weak.strong_count() > 0);
        let pending = Arc::downgrade(&self.signal.pending);
        if !watched.iter().any(|weak| weak.ptr_eq(&pending)) {
            watched.push(pending);
            log::debug!("Fatal-error probe watching panics ({} sessions)", watched.len());
        }
    }

    /// Reports a fault that did not unwind through a panic, such as a failed
    /// background task.
    pub fn report_fault(&self, fault: &dyn Display) {
        log::error!("Uncaught fault: {fault}");
        self.signal.raise();
    }
}
