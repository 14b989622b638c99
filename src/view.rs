//! View orientation and projection state.
//!
//! The camera sits at the center of the celestial sphere. Orientation is
//! azimuth/elevation/roll; the derived look and up vectors feed a right-handed
//! look-at view matrix. An externally supplied transform (e.g. from a fused
//! device-orientation quaternion) can override the derived view matrix until
//! the orientation is set again.

use glam::{Mat4, Quat, Vec3};

/// Keeps elevation away from the exact poles, radians.
pub const ELEVATION_EPSILON: f32 = 0.01;

const MAX_ELEVATION: f32 = std::f32::consts::FRAC_PI_2 - ELEVATION_EPSILON;
const TAU: f32 = std::f32::consts::TAU;

const DEFAULT_FOV_DEG: f32 = 60.0;
const NEAR_PLANE: f32 = 0.01;
const FAR_PLANE: f32 = 100.0;

/// FOV limits enforced by the renderer-side state.
pub const RENDER_FOV_MIN: f32 = 10.0;
pub const RENDER_FOV_MAX: f32 = 120.0;

pub struct ViewOrientation {
    azimuth: f32,
    elevation: f32,
    roll: f32,
    look: Vec3,
    up: Vec3,
    fov_deg: f32,
    fov_min: f32,
    fov_max: f32,
    aspect: f32,
    view: Mat4,
    proj: Mat4,
    view_dirty: bool,
    transform_override: Option<Mat4>,
}

impl ViewOrientation {
    pub fn new() -> Self {
        let mut view = Self {
            azimuth: 0.0,
            elevation: 0.0,
            roll: 0.0,
            look: Vec3::X,
            up: Vec3::Z,
            fov_deg: DEFAULT_FOV_DEG,
            fov_min: RENDER_FOV_MIN,
            fov_max: RENDER_FOV_MAX,
            aspect: 1.0,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            view_dirty: true,
            transform_override: None,
        };
        view.apply_orientation();
        view.update_projection();
        view
    }

    // --- Orientation ---

    pub fn set_orientation(&mut self, azimuth: f32, elevation: f32) {
        let roll = self.roll;
        self.set_orientation_with_roll(azimuth, elevation, roll);
    }

    /// Set azimuth/elevation/roll. Elevation is clamped away from the poles,
    /// azimuth normalized to `[0, 2π)`. Clears any transform override.
    pub fn set_orientation_with_roll(&mut self, azimuth: f32, elevation: f32, roll: f32) {
        self.azimuth = azimuth.rem_euclid(TAU);
        self.elevation = elevation.clamp(-MAX_ELEVATION, MAX_ELEVATION);
        self.roll = roll;
        self.apply_orientation();
    }

    pub fn azimuth(&self) -> f32 {
        self.azimuth
    }

    pub fn elevation(&self) -> f32 {
        self.elevation
    }

    pub fn roll(&self) -> f32 {
        self.roll
    }

    /// Set the view direction from explicit vectors. The look vector is
    /// normalized; the up vector is re-orthogonalized against it. Degenerate
    /// inputs keep the previous direction. Clears any transform override.
    pub fn set_look_up(&mut self, look: Vec3, up: Vec3) {
        if look.length() > 1e-4 {
            self.look = look.normalize();
        }
        let ortho = up - up.dot(self.look) * self.look;
        if ortho.length() > 1e-4 {
            self.up = ortho.normalize();
        }
        self.transform_override = None;
        self.view_dirty = true;
    }

    pub fn look(&self) -> Vec3 {
        self.look
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Derive look/up from the spherical angles, apply roll, invalidate.
    fn apply_orientation(&mut self) {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();

        let look = Vec3::new(cos_el * cos_az, cos_el * sin_az, sin_el);
        // Toward the pole, orthogonal to look by construction
        let mut up = Vec3::new(-sin_el * cos_az, -sin_el * sin_az, cos_el);

        if self.roll.abs() > 1e-3 {
            // Rotate up about the look axis: up' = up·cos r + (look×up)·sin r
            let right = look.cross(up);
            up = up * self.roll.cos() + right * self.roll.sin();
        }

        self.look = look;
        self.up = up;
        self.transform_override = None;
        self.view_dirty = true;
    }

    // --- Field of view / projection ---

    /// Clamp to the configured range and rebuild the projection matrix. The
    /// view matrix is untouched.
    pub fn set_fov(&mut self, fov_deg: f32) {
        self.fov_deg = fov_deg.clamp(self.fov_min, self.fov_max);
        self.update_projection();
    }

    pub fn fov(&self) -> f32 {
        self.fov_deg
    }

    pub fn set_fov_range(&mut self, min_deg: f32, max_deg: f32) {
        self.fov_min = min_deg;
        self.fov_max = max_deg;
        self.set_fov(self.fov_deg);
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
        self.update_projection();
    }

    fn update_projection(&mut self) {
        self.proj = Mat4::perspective_rh(
            self.fov_deg.to_radians(),
            self.aspect,
            NEAR_PLANE,
            FAR_PLANE,
        );
    }

    // --- External transform override ---

    /// Install a view matrix computed elsewhere (sensor fusion, AR pipeline).
    /// Stays in effect until the orientation is set again.
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform_override = Some(transform);
    }

    /// Install the override from a camera-to-world rotation quaternion, as
    /// delivered by a fused rotation-vector sensor.
    pub fn set_rotation_quaternion(&mut self, rotation: Quat) {
        self.set_transform(Mat4::from_quat(rotation.conjugate()));
    }

    pub fn clear_transform(&mut self) {
        self.transform_override = None;
        self.view_dirty = true;
    }

    pub fn has_transform_override(&self) -> bool {
        self.transform_override.is_some()
    }

    // --- Matrices ---

    /// Combined view-projection matrix for the frame. Recomputes the view
    /// matrix only when orientation changed since the last call.
    pub fn view_proj(&mut self) -> Mat4 {
        if let Some(transform) = self.transform_override {
            return self.proj * transform;
        }
        if self.view_dirty {
            self.view = Mat4::look_at_rh(Vec3::ZERO, self.look, self.up);
            self.view_dirty = false;
        }
        self.proj * self.view
    }
}

impl Default for ViewOrientation {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps raw gesture input onto the view state.
///
/// Drag deltas are scaled by the pan sensitivity and by the current FOV, so a
/// zoomed-in drag pans more slowly in angular terms. Pinch divides the FOV by
/// the scale factor raised to the zoom sensitivity, within a narrower range
/// than the renderer allows.
pub struct GestureController {
    pub pan_sensitivity: f32,
    pub zoom_sensitivity: f32,
    pub min_fov: f32,
    pub max_fov: f32,
}

impl GestureController {
    pub fn new() -> Self {
        Self {
            pan_sensitivity: 0.005,
            zoom_sensitivity: 1.0,
            min_fov: 20.0,
            max_fov: 100.0,
        }
    }

    /// Drag by `(dx, dy)` screen pixels.
    pub fn pan(&self, view: &mut ViewOrientation, dx: f32, dy: f32) {
        let fov_factor = view.fov() / 60.0;
        let azimuth = view.azimuth() - dx * self.pan_sensitivity * fov_factor;
        let elevation = view.elevation() + dy * self.pan_sensitivity * fov_factor;
        view.set_orientation(azimuth, elevation);
    }

    /// Pinch by `scale` (> 1 spreads fingers apart: zoom in).
    pub fn pinch(&self, view: &mut ViewOrientation, scale: f32) {
        if scale <= 0.0 {
            return;
        }
        let fov = view.fov() / scale.powf(self.zoom_sensitivity);
        view.set_fov(fov.clamp(self.min_fov, self.max_fov));
    }
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::approx;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn elevation_is_clamped_near_the_poles() {
        let mut view = ViewOrientation::new();
        view.set_orientation(0.0, PI);
        assert!(approx(view.elevation(), FRAC_PI_2 - 0.01, 1e-6));
        view.set_orientation(0.0, -10.0);
        assert!(approx(view.elevation(), -(FRAC_PI_2 - 0.01), 1e-6));
    }

    #[test]
    fn azimuth_is_normalized() {
        let mut view = ViewOrientation::new();
        view.set_orientation(-0.5, 0.0);
        assert!(approx(view.azimuth(), TAU - 0.5, 1e-5));
        view.set_orientation(TAU + 1.0, 0.0);
        assert!(approx(view.azimuth(), 1.0, 1e-5));
    }

    #[test]
    fn look_and_up_stay_orthonormal() {
        let mut view = ViewOrientation::new();
        for (az, el, roll) in [
            (0.0, 0.0, 0.0),
            (1.0, 0.5, 0.0),
            (2.5, -1.2, 0.7),
            (4.0, 1.5, -0.3),
        ] {
            view.set_orientation_with_roll(az, el, roll);
            assert!(approx(view.look().length(), 1.0, 1e-5));
            assert!(approx(view.up().length(), 1.0, 1e-5));
            assert!(approx(view.look().dot(view.up()), 0.0, 1e-5));
        }
    }

    #[test]
    fn zero_elevation_looks_along_the_equator() {
        let mut view = ViewOrientation::new();
        view.set_orientation(0.0, 0.0);
        let look = view.look();
        assert!(approx(look.x, 1.0, 1e-6));
        assert!(approx(look.z, 0.0, 1e-6));
        // Up points to the celestial pole
        assert!(approx(view.up().z, 1.0, 1e-6));
    }

    #[test]
    fn roll_rotates_up_about_look() {
        let mut view = ViewOrientation::new();
        view.set_orientation_with_roll(0.0, 0.0, FRAC_PI_2);
        // look = +X; right = look×up = -Y initially, so up rolls onto -Y
        assert!(approx(view.up().y, -1.0, 1e-5));
        assert!(approx(view.up().z, 0.0, 1e-5));
        assert!(approx(view.look().x, 1.0, 1e-6));
    }

    #[test]
    fn fov_is_clamped_to_render_range() {
        let mut view = ViewOrientation::new();
        view.set_fov(500.0);
        assert!(approx(view.fov(), RENDER_FOV_MAX, 1e-6));
        view.set_fov(1.0);
        assert!(approx(view.fov(), RENDER_FOV_MIN, 1e-6));
    }

    #[test]
    fn fov_change_rebuilds_projection_without_touching_view() {
        let mut view = ViewOrientation::new();
        let before = view.view_proj();
        view.set_fov(30.0);
        let after = view.view_proj();
        assert_ne!(before, after);
    }

    #[test]
    fn transform_override_wins_until_orientation_is_set() {
        let mut view = ViewOrientation::new();
        view.set_viewport(100, 100);
        let base = view.view_proj();

        view.set_transform(Mat4::from_rotation_z(1.0));
        assert!(view.has_transform_override());
        let overridden = view.view_proj();
        assert_ne!(base, overridden);

        // Setting orientation implicitly clears the override
        view.set_orientation(0.0, 0.0);
        assert!(!view.has_transform_override());
        assert_eq!(view.view_proj(), base);
    }

    #[test]
    fn rotation_quaternion_installs_an_override() {
        let mut view = ViewOrientation::new();
        view.set_rotation_quaternion(Quat::from_rotation_z(0.5));
        assert!(view.has_transform_override());
    }

    #[test]
    fn set_look_up_orthogonalizes_and_ignores_degenerate_input() {
        let mut view = ViewOrientation::new();
        view.set_look_up(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 1.0, 1.0));
        assert!(approx(view.look().y, 1.0, 1e-6));
        assert!(approx(view.up().dot(view.look()), 0.0, 1e-6));
        assert!(approx(view.up().z, 1.0, 1e-5));

        let look_before = view.look();
        view.set_look_up(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(view.look(), look_before);
    }

    #[test]
    fn view_looks_down_negative_z_in_eye_space() {
        let mut view = ViewOrientation::new();
        view.set_orientation(0.0, 0.0);
        // A point along the look direction lands in front of the camera
        let vp = view.view_proj();
        let p = vp.project_point3(Vec3::X);
        assert!(p.z > 0.0 && p.z < 1.0, "depth = {}", p.z);
        assert!(approx(p.x, 0.0, 1e-5));
        assert!(approx(p.y, 0.0, 1e-5));
    }

    #[test]
    fn pan_scales_with_fov() {
        let gestures = GestureController::new();

        let mut wide = ViewOrientation::new();
        wide.set_fov(120.0);
        gestures.pan(&mut wide, -100.0, 0.0);
        let wide_delta = wide.azimuth();

        let mut narrow = ViewOrientation::new();
        narrow.set_fov(30.0);
        gestures.pan(&mut narrow, -100.0, 0.0);
        let narrow_delta = narrow.azimuth();

        // Zoomed in pans more slowly in angular terms
        assert!(approx(wide_delta, 1.0, 1e-5));
        assert!(approx(narrow_delta, 0.25, 1e-5));
    }

    #[test]
    fn pinch_in_zooms_out_and_respects_gesture_range() {
        let gestures = GestureController::new();
        let mut view = ViewOrientation::new();

        gestures.pinch(&mut view, 2.0);
        assert!(approx(view.fov(), 30.0, 1e-4));

        // Repeated pinch-out hits the gesture floor, not the renderer floor
        for _ in 0..10 {
            gestures.pinch(&mut view, 2.0);
        }
        assert!(approx(view.fov(), gestures.min_fov, 1e-4));

        for _ in 0..10 {
            gestures.pinch(&mut view, 0.5);
        }
        assert!(approx(view.fov(), gestures.max_fov, 1e-4));

        // Nonsense scale is ignored
        gestures.pinch(&mut view, 0.0);
        assert!(approx(view.fov(), gestures.max_fov, 1e-4));
    }

    #[test]
    fn zoom_sensitivity_exponentiates_the_scale() {
        let gestures = GestureController {
            zoom_sensitivity: 2.0,
            ..GestureController::new()
        };
        let mut view = ViewOrientation::new();
        gestures.pinch(&mut view, 1.2);
        assert!(approx(view.fov(), 60.0 / 1.44, 1e-3));
    }
}
