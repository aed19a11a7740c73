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

//! Device tier classification.
//!
//! The classifier runs once per session, before any renderer exists. It never
//! fails: if the platform cannot be probed the session starts on the most
//! conservative tier.

use vista_core::platform::{PlatformProbe, StandardBackendReport};
use vista_core::Tier;

/// Maps platform capabilities onto a [`Tier`].
pub struct TierClassifier;

impl TierClassifier {
    /// Probes the platform and classifies it.
    ///
    /// Probe failures are logged and yield [`Tier::MobileMinimal`]. No retries.
    pub async fn detect<P: PlatformProbe + ?Sized>(probe: &P) -> Tier {
        let is_mobile = probe.is_mobile();

        let advanced = match probe.probe_advanced_backend().await {
            Ok(available) => available,
            Err(e) => {
                log::warn!("Tier probe failed on the advanced backend: {e}. Using MobileMinimal.");
                return Tier::MobileMinimal;
            }
        };

        // The standard backend only matters when the advanced one is missing.
        let standard = if advanced {
            StandardBackendReport::default()
        } else {
            match probe.probe_standard_backend().await {
                Ok(report) => report,
                Err(e) => {
                    log::warn!(
                        "Tier probe failed on the standard backend: {e}. Using MobileMinimal."
                    );
                    return Tier::MobileMinimal;
                }
            }
        };

        let tier = Self::classify(is_mobile, advanced, &standard);
        log::info!(
            "Device tier: {tier} (mobile={is_mobile}, advanced={advanced}, standard={standard:?})"
        );
        tier
    }

    /// The decision table, first match wins.
    pub fn classify(is_mobile: bool, advanced: bool, standard: &StandardBackendReport) -> Tier {
        match (is_mobile, advanced) {
            (false, true) => Tier::DesktopAdvanced,
            (false, false) if standard.available && standard.color_buffer_float => {
                Tier::DesktopStandard
            }
            (true, true) => Tier::MobileCapable,
            (true, false) if standard.available && standard.half_float_buffer => {
                Tier::MobileCapable
            }
            _ => Tier::MobileMinimal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard(available: bool, float: bool, half: bool) -> StandardBackendReport {
        StandardBackendReport {
            available,
            color_buffer_float: float,
            half_float_buffer: half,
        }
    }

    #[test]
    fn desktop_rows() {
        let none = StandardBackendReport::default();
        assert_eq!(TierClassifier::classify(false, true, &none), Tier::DesktopAdvanced);
        assert_eq!(
            TierClassifier::classify(false, false, &standard(true, true, false)),
            Tier::DesktopStandard
        );
        // A desktop without float color buffers is treated like the weakest device.
        assert_eq!(
            TierClassifier::classify(false, false, &standard(true, false, true)),
            Tier::MobileMinimal
        );
    }

    #[test]
    fn mobile_rows() {
        let none = StandardBackendReport::default();
        assert_eq!(TierClassifier::classify(true, true, &none), Tier::MobileCapable);
        assert_eq!(
            TierClassifier::classify(true, false, &standard(true, false, true)),
            Tier::MobileCapable
        );
        assert_eq!(
            TierClassifier::classify(true, false, &standard(true, true, false)),
            Tier::MobileMinimal
        );
        assert_eq!(TierClassifier::classify(true, false, &none), Tier::MobileMinimal);
    }

    #[test]
    fn unavailable_standard_backend_ignores_extension_flags() {
        assert_eq!(
            TierClassifier::classify(false, false, &standard(false, true, true)),
            Tier::MobileMinimal
        );
    }
}
