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

//! Fits the directional light's orthographic shadow camera to the view frustum.
//!
//! Runs once per frame, before the shadow pass. The lane owns its scratch
//! storage so a fit never allocates.

use vista_core::math::{Mat4, Vec3, EPSILON};
use vista_core::renderer::{
    CameraSnapshot, DirectionalShadowLight, LightSpaceBounds, ShadowFitConfig,
};
use vista_core::RenderProfile;

/// Offset added before flooring so values already on the grid stay put.
const SNAP_BIAS: f32 = 1e-3;

/// Per-frame shadow frustum fitter.
#[derive(Debug, Clone)]
pub struct ShadowFitLane {
    config: ShadowFitConfig,
    corners: [Vec3; 8],
}

impl ShadowFitLane {
    /// Creates a lane with `config`.
    pub fn new(config: ShadowFitConfig) -> Self {
        Self {
            config,
            corners: [Vec3::ZERO; 8],
        }
    }

    /// Creates a lane whose snapping grid matches the profile's shadow map.
    pub fn for_profile(profile: &RenderProfile, config: ShadowFitConfig) -> Self {
        Self::new(ShadowFitConfig {
            map_size: profile.shadow_map_size,
            ..config
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &ShadowFitConfig {
        &self.config
    }

    /// Replaces the configuration, e.g. after the lighting setup changed.
    pub fn set_config(&mut self, config: ShadowFitConfig) {
        self.config = config;
    }

    /// Fits `light`'s shadow camera to `camera`.
    ///
    /// Returns the light-space box the projection was built from (before
    /// `margin`), or `None` without touching the light when there is nothing to
    /// fit: no light, no shadow camera, or degenerate input.
    pub fn fit(
        &mut self,
        camera: &CameraSnapshot,
        light: Option<&mut DirectionalShadowLight>,
    ) -> Option<LightSpaceBounds> {
        let light = light?;
        let shadow = light.shadow.as_mut()?;
        if !self.config.is_valid() || !camera.is_valid() {
            return None;
        }
        if !light.position.is_finite() || !light.target.is_finite() {
            return None;
        }

        let far = camera.far.min(self.config.max_shadow_distance);
        if far <= camera.near {
            return None;
        }
        if !frustum_corners(camera, far, &mut self.corners) {
            return None;
        }

        let light_dir = (light.target - light.position).normalize();
        let up = if light_dir.y.abs() > 0.99 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_rh(light.position, light.target, up)?;

        let mut bounds = LightSpaceBounds::EMPTY;
        for corner in &self.corners {
            bounds.extend(view.transform_point3(*corner));
        }

        let bounds = clamp_bounds(bounds, &self.config)?;
        let bounds = if self.config.snap_enabled {
            snap_to_texels(bounds, self.config.map_size)
        } else {
            bounds
        };
        if !bounds.min.is_finite() || !bounds.max.is_finite() {
            return None;
        }

        let margin = self.config.margin;
        shadow.left = bounds.min.x - margin;
        shadow.right = bounds.max.x + margin;
        shadow.bottom = bounds.min.y - margin;
        shadow.top = bounds.max.y + margin;
        // The light looks down -Z, so the nearest point has the largest z.
        shadow.near = -bounds.max.z - margin;
        shadow.far = -bounds.min.z + margin;
        shadow.needs_update = true;

        log::trace!(
            "Shadow fit: {:.2}x{:.2} texel-snapped={}",
            bounds.width(),
            bounds.height(),
            self.config.snap_enabled
        );
        Some(bounds)
    }
}

impl Default for ShadowFitLane {
    fn default() -> Self {
        Self::new(ShadowFitConfig::default())
    }
}

/// Writes the 8 world-space corners of the camera frustum cut at `far`.
///
/// Near plane first, then far plane, each as (-x,-y), (+x,-y), (+x,+y), (-x,+y).
fn frustum_corners(camera: &CameraSnapshot, far: f32, out: &mut [Vec3; 8]) -> bool {
    let forward = camera.forward.normalize();
    let right = forward.cross(camera.up);
    if right.length_squared() < EPSILON * EPSILON {
        return false;
    }
    let right = right.normalize();
    let up = right.cross(forward);

    let tan_half = (camera.fov_y_radians * 0.5).tan();
    for (plane, depth) in [camera.near, far].into_iter().enumerate() {
        let half_h = tan_half * depth;
        let half_w = half_h * camera.aspect;
        let center = camera.position + forward * depth;
        let (r, u) = (right * half_w, up * half_h);
        let base = plane * 4;
        out[base] = center - r - u;
        out[base + 1] = center + r - u;
        out[base + 2] = center + r + u;
        out[base + 3] = center - r + u;
    }
    true
}

/// Limits the box to `±max_extent / 2` on X/Y and `±max_depth` on Z.
///
/// `None` if the frustum lies entirely outside those limits.
fn clamp_bounds(bounds: LightSpaceBounds, config: &ShadowFitConfig) -> Option<LightSpaceBounds> {
    let half = config.max_extent * 0.5;
    let limit = Vec3::new(half, half, config.max_depth);
    let min = bounds.min.max(-limit);
    let max = bounds.max.min(limit);
    if min.x > max.x || min.y > max.y || min.z > max.z {
        return None;
    }
    Some(LightSpaceBounds { min, max })
}

/// Floors X/Y to the texel grid of a `map_size` shadow map.
///
/// The texel size comes from the incoming width (resp. height) and the extent is
/// carried over unchanged, so both edges land on the grid. An axis whose min
/// already sits on its grid is returned bit for bit, which makes the snap an
/// exact fixed point.
pub fn snap_to_texels(bounds: LightSpaceBounds, map_size: u32) -> LightSpaceBounds {
    if map_size == 0 {
        return bounds;
    }
    let texels = map_size as f32;
    let (min_x, max_x) = snap_axis(bounds.min.x, bounds.max.x, texels);
    let (min_y, max_y) = snap_axis(bounds.min.y, bounds.max.y, texels);
    LightSpaceBounds {
        min: Vec3::new(min_x, min_y, bounds.min.z),
        max: Vec3::new(max_x, max_y, bounds.max.z),
    }
}

fn snap_axis(min: f32, max: f32, texels: f32) -> (f32, f32) {
    let extent = max - min;
    let texel = extent / texels;
    if texel <= EPSILON {
        return (min, max);
    }
    let q = min / texel;
    // Re-deriving the texel from `max - min` drifts by a few ulps of the edges;
    // anything within that drift counts as on the grid.
    let drift = 4.0 * f32::EPSILON * q.abs() * (1.0 + (min.abs() + max.abs()) / extent);
    if (q - q.round()).abs() <= SNAP_BIAS.max(drift) {
        return (min, max);
    }
    let min = (q + SNAP_BIAS).floor() * texel;
    (min, min + extent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> CameraSnapshot {
        CameraSnapshot {
            position: Vec3::new(0.0, 2.0, 0.0),
            forward: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::Y,
            fov_y_radians: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 80.0,
        }
    }

    #[test]
    fn corners_are_ordered_near_then_far() {
        let mut corners = [Vec3::ZERO; 8];
        assert!(frustum_corners(&camera(), 10.0, &mut corners));
        for c in &corners[..4] {
            assert_relative_eq!(c.z, -0.1, epsilon = 1e-5);
        }
        for c in &corners[4..] {
            assert_relative_eq!(c.z, -10.0, epsilon = 1e-5);
        }
        assert!(corners[5].x > 0.0 && corners[4].x < 0.0);
    }

    #[test]
    fn up_parallel_to_forward_is_rejected() {
        let cam = CameraSnapshot {
            up: Vec3::new(0.0, 0.0, -1.0),
            ..camera()
        };
        let mut corners = [Vec3::ZERO; 8];
        assert!(!frustum_corners(&cam, 10.0, &mut corners));
    }

    #[test]
    fn clamp_limits_every_axis() {
        let cfg = ShadowFitConfig {
            max_extent: 10.0,
            max_depth: 3.0,
            ..Default::default()
        };
        let b = LightSpaceBounds {
            min: Vec3::new(-20.0, -1.0, -50.0),
            max: Vec3::new(20.0, 1.0, 50.0),
        };
        let c = clamp_bounds(b, &cfg).unwrap();
        assert_eq!(c.min, Vec3::new(-5.0, -1.0, -3.0));
        assert_eq!(c.max, Vec3::new(5.0, 1.0, 3.0));
    }

    #[test]
    fn clamp_rejects_boxes_outside_the_limits() {
        let b = LightSpaceBounds {
            min: Vec3::new(100.0, 0.0, 0.0),
            max: Vec3::new(110.0, 1.0, 1.0),
        };
        assert!(clamp_bounds(b, &ShadowFitConfig::default()).is_none());
    }

    #[test]
    fn snap_puts_both_edges_on_the_grid() {
        let b = LightSpaceBounds {
            min: Vec3::new(-3.3, 1.7, 0.0),
            max: Vec3::new(4.9, 6.2, 1.0),
        };
        let s = snap_to_texels(b, 64);
        let texel = b.width() / 64.0;
        let k = s.min.x / texel;
        assert_relative_eq!(k, k.round(), epsilon = 1e-2);
        assert_relative_eq!(s.width(), b.width(), epsilon = 1e-4);
        assert!(s.min.x <= b.min.x + 1e-5);
    }

    #[test]
    fn snap_leaves_an_on_grid_axis_untouched() {
        let b = LightSpaceBounds {
            min: Vec3::new(-3.3, 1.7, 0.0),
            max: Vec3::new(4.9, 6.2, 1.0),
        };
        let once = snap_to_texels(b, 64);
        assert_eq!(snap_to_texels(once, 64), once);
        assert_eq!(snap_to_texels(b, 0), b);
    }
}
