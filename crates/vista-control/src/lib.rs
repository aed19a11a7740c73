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

//! # Vista Control
//!
//! Decision logic of the adaptive rendering governor: which tier the device
//! belongs to, which backend the renderer runs on, how context loss is
//! contained, and when visual features are sacrificed for frame stability.

#![warn(missing_docs)]

pub mod factory;
pub mod fatal;
pub mod governor;
pub mod guard;
pub mod policy;
pub mod tier;

pub use factory::RendererFactory;
pub use fatal::{FatalErrorProbe, FatalSignal};
pub use governor::{FrameGovernor, GovernorConfig, JankWindow};
pub use guard::{ContextGuard, GatedToggles};
pub use policy::DegradePolicy;
pub use tier::TierClassifier;
