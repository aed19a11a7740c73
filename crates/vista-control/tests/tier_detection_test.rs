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

//! Integration tests for tier detection against a stubbed platform probe.

use async_trait::async_trait;
use std::cell::Cell;
use vista_control::TierClassifier;
use vista_core::platform::{PlatformProbe, ProbeError, StandardBackendReport};
use vista_core::{RenderProfile, Tier};

#[derive(Default)]
struct StubProbe {
    mobile: bool,
    advanced: Option<bool>,
    standard: Option<StandardBackendReport>,
    standard_probed: Cell<bool>,
}

#[async_trait(?Send)]
impl PlatformProbe for StubProbe {
    fn is_mobile(&self) -> bool {
        self.mobile
    }

    async fn probe_advanced_backend(&self) -> Result<bool, ProbeError> {
        self.advanced
            .ok_or_else(|| ProbeError::Enumeration("driver crashed".into()))
    }

    async fn probe_standard_backend(&self) -> Result<StandardBackendReport, ProbeError> {
        self.standard_probed.set(true);
        self.standard
            .ok_or_else(|| ProbeError::Interrupted("timeout".into()))
    }
}

fn detect(probe: &StubProbe) -> Tier {
    pollster::block_on(TierClassifier::detect(probe))
}

#[test]
fn test_desktop_with_advanced_backend() {
    let probe = StubProbe {
        advanced: Some(true),
        ..Default::default()
    };
    assert_eq!(detect(&probe), Tier::DesktopAdvanced);
    assert!(!probe.standard_probed.get());
}

#[test]
fn test_desktop_with_float_buffers_on_standard_backend() {
    let probe = StubProbe {
        advanced: Some(false),
        standard: Some(StandardBackendReport {
            available: true,
            color_buffer_float: true,
            half_float_buffer: true,
        }),
        ..Default::default()
    };
    assert_eq!(detect(&probe), Tier::DesktopStandard);
}

#[test]
fn test_mobile_with_half_float_buffers() {
    let probe = StubProbe {
        mobile: true,
        advanced: Some(false),
        standard: Some(StandardBackendReport {
            available: true,
            color_buffer_float: false,
            half_float_buffer: true,
        }),
        ..Default::default()
    };
    assert_eq!(detect(&probe), Tier::MobileCapable);
}

#[test]
fn test_probe_failure_falls_back_to_minimal() {
    let advanced_fails = StubProbe::default();
    assert_eq!(detect(&advanced_fails), Tier::MobileMinimal);

    let standard_fails = StubProbe {
        advanced: Some(false),
        ..Default::default()
    };
    assert_eq!(detect(&standard_fails), Tier::MobileMinimal);
    assert!(standard_fails.standard_probed.get());
}

#[test]
fn test_minimal_profile_from_failed_probe_skips_advanced_backend() {
    let tier = detect(&StubProbe::default());
    let profile = RenderProfile::for_tier(tier);
    assert!(!profile.prefer_advanced_backend);
    assert_eq!(profile.max_pixel_ratio, 1.0);
}
