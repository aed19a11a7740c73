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

//! Host configuration of a viewport session.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vista_control::GovernorConfig;
use vista_core::renderer::ShadowFitConfig;

/// Everything a host can tune about a viewport session.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Frame governor tuning.
    pub governor: GovernorConfig,
    /// Shadow frustum fit tuning. `map_size` is replaced by the tier's.
    pub shadow_fit: ShadowFitConfig,
    /// Linear RGBA clear color.
    pub clear_color: [f64; 4],
    /// Chain the fatal-error probe onto the process panic hook.
    pub install_panic_hook: bool,
    /// Skip the advanced backend regardless of tier.
    pub force_fallback: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            governor: GovernorConfig::default(),
            shadow_fit: ShadowFitConfig::default(),
            clear_color: [0.02, 0.03, 0.05, 1.0],
            install_panic_hook: true,
            force_fallback: false,
        }
    }
}

impl ViewportConfig {
    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid viewport configuration")
    }

    /// Loads a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Serializes to pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
