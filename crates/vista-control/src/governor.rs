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

//! The per-frame governor that trades visual quality for stability.
//!
//! Each tick measures the gap since the previous frame. Gaps longer than
//! `jank_threshold_ms` count as janky; `jank_limit` janky frames push the
//! [`DegradeStage`] up by one and reset the count. A raised [`FatalSignal`]
//! forces the last stage once per session.

use crate::fatal::FatalSignal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use vista_core::{DegradeStage, EventBus, GovernorEvent};

/// Tuning of the frame governor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Frame gap, in milliseconds, above which a frame is janky.
    pub jank_threshold_ms: f64,
    /// Janky frames needed to escalate one stage.
    pub jank_limit: u32,
    /// If set, a quiet period this long since the last janky frame clears the
    /// count. Off by default: the count is a plain counter.
    pub jank_decay_ms: Option<f64>,
    /// Run jank sampling even on tiers that do not ask for it.
    pub force_enabled: bool,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            jank_threshold_ms: 50.0,
            jank_limit: 6,
            jank_decay_ms: None,
            force_enabled: false,
        }
    }
}

/// Counts janky frames toward the next escalation.
#[derive(Debug, Clone)]
pub struct JankWindow {
    count: u32,
    limit: u32,
    last_jank: Option<Instant>,
}

impl JankWindow {
    /// An empty window that fills after `limit` janky frames (at least one).
    pub fn new(limit: u32) -> Self {
        Self {
            count: 0,
            limit: limit.max(1),
            last_jank: None,
        }
    }

    /// Records one janky frame at `now`.
    ///
    /// Returns `true` when the window filled; the count is then back at zero.
    pub fn record(&mut self, now: Instant, decay: Option<Duration>) -> bool {
        if let (Some(decay), Some(last)) = (decay, self.last_jank) {
            if now.saturating_duration_since(last) > decay {
                self.count = 0;
            }
        }
        self.last_jank = Some(now);
        self.count += 1;
        if self.count >= self.limit {
            self.count = 0;
            return true;
        }
        false
    }

    /// Janky frames recorded since the last escalation.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The escalation threshold.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Empties the window.
    pub fn reset(&mut self) {
        self.count = 0;
        self.last_jank = None;
    }
}

/// Escalates the degrade stage from frame timings and fatal faults.
pub struct FrameGovernor {
    config: GovernorConfig,
    enabled: bool,
    threshold: Duration,
    decay: Option<Duration>,
    stage: DegradeStage,
    window: JankWindow,
    last_frame: Option<Instant>,
    fatal: FatalSignal,
    fatal_consumed: bool,
    events: Option<Arc<EventBus<GovernorEvent>>>,
}

impl FrameGovernor {
    /// A governor at full quality.
    ///
    /// `enabled` controls jank sampling only. Fatal faults are always honored.
    pub fn new(config: GovernorConfig, enabled: bool, fatal: FatalSignal) -> Self {
        Self {
            threshold: millis(config.jank_threshold_ms),
            decay: config.jank_decay_ms.map(millis),
            window: JankWindow::new(config.jank_limit),
            config,
            enabled: enabled || config.force_enabled,
            stage: DegradeStage::FULL,
            last_frame: None,
            fatal,
            fatal_consumed: false,
            events: None,
        }
    }

    /// Publishes every escalation as [`GovernorEvent::Degrade`] on `events`.
    pub fn with_events(mut self, events: Arc<EventBus<GovernorEvent>>) -> Self {
        self.events = Some(events);
        self
    }

    /// Samples one frame. Returns the new stage if it changed.
    pub fn sample(&mut self, now: Instant) -> Option<DegradeStage> {
        if self.fatal.take() && !self.fatal_consumed {
            self.fatal_consumed = true;
            self.last_frame = Some(now);
            if self.stage.is_max() {
                return None;
            }
            log::error!("Fatal fault observed; forcing {}", DegradeStage::MAX);
            return Some(self.escalate_to(DegradeStage::MAX));
        }

        let previous = self.last_frame.replace(now);
        if !self.enabled || self.stage.is_max() {
            return None;
        }
        let dt = now.saturating_duration_since(previous?);
        if dt <= self.threshold {
            return None;
        }

        log::trace!("Janky frame: {:.1} ms", dt.as_secs_f64() * 1000.0);
        if !self.window.record(now, self.decay) {
            return None;
        }
        let next = self.stage.next()?;
        log::warn!(
            "{} janky frames over {:.0} ms; degrading to {next}",
            self.window.limit(),
            self.config.jank_threshold_ms
        );
        Some(self.escalate_to(next))
    }

    fn escalate_to(&mut self, stage: DegradeStage) -> DegradeStage {
        self.stage = stage;
        self.window.reset();
        if let Some(events) = &self.events {
            events.publish(GovernorEvent::Degrade { stage });
        }
        stage
    }

    /// Back to full quality. Only for a host that rebuilds the whole session.
    pub fn reset(&mut self) {
        log::info!("Frame governor reset from {}", self.stage);
        self.stage = DegradeStage::FULL;
        self.window.reset();
        self.last_frame = None;
        self.fatal_consumed = false;
        self.fatal.take();
    }

    /// The current stage.
    pub fn stage(&self) -> DegradeStage {
        self.stage
    }

    /// Whether jank sampling runs.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The jank window.
    pub fn window(&self) -> &JankWindow {
        &self.window
    }

    /// The configuration.
    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }
}

fn millis(ms: f64) -> Duration {
    if ms.is_nan() || ms <= 0.0 {
        Duration::ZERO
    } else if ms.is_infinite() {
        Duration::MAX
    } else {
        Duration::from_secs_f64(ms / 1000.0)
    }
}
