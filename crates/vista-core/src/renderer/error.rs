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

//! Defines the error types of the rendering governor.

use std::fmt;

/// An error reported by a [`BackendProvider`](super::BackendProvider) or a
/// [`RenderContext`](super::RenderContext).
#[derive(Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The requested API is not available on this platform.
    Unavailable(String),
    /// The context or device could not be created.
    CreationFailed(String),
    /// A context was created but failed the smoke test.
    SmokeTestFailed(String),
    /// The device was lost while in use.
    DeviceLost(String),
    /// The context rejected its configuration.
    Configuration(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Unavailable(msg) => write!(f, "Backend unavailable: {msg}"),
            BackendError::CreationFailed(msg) => write!(f, "Context creation failed: {msg}"),
            BackendError::SmokeTestFailed(msg) => write!(f, "Smoke test failed: {msg}"),
            BackendError::DeviceLost(msg) => write!(f, "Device lost: {msg}"),
            BackendError::Configuration(msg) => write!(f, "Invalid context configuration: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Why a renderer could not be brought up.
#[derive(Debug, Clone, PartialEq)]
pub enum InitError {
    /// Every backend in the fallback chain failed.
    Exhausted {
        /// Why the advanced backend was rejected, if it was tried at all.
        advanced: Option<BackendError>,
        /// Error from the conservative fallback attempt.
        fallback: BackendError,
        /// Error from the reduced fallback retry.
        reduced: BackendError,
    },
    /// A context was created but could not be configured.
    Configure(BackendError),
    /// The session was torn down before initialization finished.
    Cancelled,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::Exhausted {
                advanced,
                fallback,
                reduced,
            } => {
                write!(f, "No usable rendering backend (fallback: {fallback}; retry: {reduced}")?;
                if let Some(advanced) = advanced {
                    write!(f, "; advanced: {advanced}")?;
                }
                write!(f, ")")
            }
            InitError::Configure(err) => write!(f, "Failed to configure renderer: {err}"),
            InitError::Cancelled => write!(f, "Renderer initialization cancelled"),
        }
    }
}

impl std::error::Error for InitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InitError::Exhausted { reduced, .. } => Some(reduced),
            InitError::Configure(err) => Some(err),
            InitError::Cancelled => None,
        }
    }
}

/// An error returned when accessing the renderer through its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// The GPU context is lost; wait for the restore signal.
    ContextLost,
    /// The handle was disposed.
    Disposed,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::ContextLost => write!(f, "Rendering context is lost"),
            RenderError::Disposed => write!(f, "Renderer has been disposed"),
        }
    }
}

impl std::error::Error for RenderError {}
