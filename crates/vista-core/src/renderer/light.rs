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

//! Camera and directional-light data read and written by the shadow fitter.

use crate::math::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// A read-only copy of the view camera for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    /// World-space eye position.
    pub position: Vec3,
    /// Normalized viewing direction.
    pub forward: Vec3,
    /// Approximate up vector; re-orthogonalized by consumers.
    pub up: Vec3,
    /// Vertical field of view, in radians.
    pub fov_y_radians: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
}

impl CameraSnapshot {
    /// `true` when every field is finite and the frustum has positive volume.
    pub fn is_valid(&self) -> bool {
        self.position.is_finite()
            && self.forward.is_finite()
            && self.up.is_finite()
            && self.fov_y_radians.is_finite()
            && self.fov_y_radians > 0.0
            && self.fov_y_radians < std::f32::consts::PI
            && self.aspect.is_finite()
            && self.aspect > 0.0
            && self.near.is_finite()
            && self.far.is_finite()
            && self.near > 0.0
            && self.far > self.near
    }
}

/// The orthographic camera a directional light renders its shadow map with.
///
/// Extents are in light view space. `near`/`far` are distances along the light's
/// viewing direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowCamera {
    /// Left clip plane.
    pub left: f32,
    /// Right clip plane.
    pub right: f32,
    /// Top clip plane.
    pub top: f32,
    /// Bottom clip plane.
    pub bottom: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
    /// Set whenever the extents change; cleared by whoever uploads the projection.
    pub needs_update: bool,
}

impl ShadowCamera {
    /// The projection matrix for the current extents.
    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh_zo(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }
}

impl Default for ShadowCamera {
    fn default() -> Self {
        Self {
            left: -10.0,
            right: 10.0,
            top: 10.0,
            bottom: -10.0,
            near: 0.5,
            far: 500.0,
            needs_update: true,
        }
    }
}

/// A shadow-casting directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalShadowLight {
    /// Position the shadow camera looks from.
    pub position: Vec3,
    /// Point the light aims at.
    pub target: Vec3,
    /// The shadow camera, absent when the light casts no shadows.
    pub shadow: Option<ShadowCamera>,
}

impl DirectionalShadowLight {
    /// A light at `position` aiming at `target` with a default shadow camera.
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            shadow: Some(ShadowCamera::default()),
        }
    }
}

/// An axis-aligned box in light view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSpaceBounds {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl LightSpaceBounds {
    /// An inverted box that any point will grow.
    pub const EMPTY: Self = Self {
        min: Vec3::MAX,
        max: Vec3::MIN,
    };

    /// Grows the box to contain `p`.
    #[inline]
    pub fn extend(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Extent along light-space X.
    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Extent along light-space Y.
    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Extent along light-space Z.
    #[inline]
    pub fn depth(&self) -> f32 {
        self.max.z - self.min.z
    }
}

/// Tuning of the per-frame shadow frustum fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowFitConfig {
    /// Largest allowed width and height of the fitted box, in world units.
    pub max_extent: f32,
    /// Padding added on every side after clamping and snapping.
    pub margin: f32,
    /// Shadow map resolution used for texel snapping.
    pub map_size: u32,
    /// Snap the bounds to the shadow-map texel grid to stop edge shimmer.
    pub snap_enabled: bool,
    /// Camera depth beyond which nothing receives shadows.
    pub max_shadow_distance: f32,
    /// Largest allowed distance from the light origin along its Z axis.
    pub max_depth: f32,
}

impl Default for ShadowFitConfig {
    fn default() -> Self {
        Self {
            max_extent: 120.0,
            margin: 4.0,
            map_size: 2048,
            snap_enabled: true,
            max_shadow_distance: 150.0,
            max_depth: 400.0,
        }
    }
}

impl ShadowFitConfig {
    /// `true` if the config can produce a non-degenerate projection.
    pub fn is_valid(&self) -> bool {
        self.max_extent.is_finite()
            && self.max_extent > 0.0
            && self.margin.is_finite()
            && self.margin >= 0.0
            && self.max_shadow_distance.is_finite()
            && self.max_shadow_distance > 0.0
            && self.max_depth.is_finite()
            && self.max_depth > 0.0
            && (!self.snap_enabled || self.map_size > 0)
    }
}
