//! Light sources with derived view/projection matrices.
//! Matrices are recomputed lazily on access and cached until a setter
//! invalidates them.

use std::cell::Cell;

use glam::{Mat4, Vec3};

use crate::extract::{SpotLightState, SunState};

/// Directional light with an orthographic shadow frustum centered on the
/// world origin.
#[derive(Debug)]
pub struct DirectionalLight {
    direction: Vec3,
    color: Vec3,
    /// Full side length of the orthographic shadow volume.
    ortho_size: f32,
    view_projection: Cell<Option<Mat4>>,
}

impl DirectionalLight {
    pub fn new(direction: Vec3, color: Vec3) -> Self {
        Self {
            direction: direction.normalize(),
            color,
            ortho_size: 120.0,
            view_projection: Cell::new(None),
        }
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.normalize();
        self.view_projection.set(None);
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    pub fn set_ortho_size(&mut self, size: f32) {
        self.ortho_size = size;
        self.view_projection.set(None);
    }

    /// Shadow view-projection: look-at from the origin toward the light
    /// direction (interpreted as a point), orthographic extents ±size/2.
    pub fn view_projection(&self) -> Mat4 {
        if let Some(m) = self.view_projection.get() {
            return m;
        }
        let half = self.ortho_size / 2.0;
        let view = Mat4::look_at_rh(Vec3::ZERO, self.direction, Vec3::Y);
        let projection = Mat4::orthographic_rh(-half, half, -half, half, -half, half);
        let m = projection * view;
        self.view_projection.set(Some(m));
        m
    }

    pub fn frame_state(&self) -> SunState {
        SunState {
            direction: self.direction.to_array(),
            color: self.color.to_array(),
            view_projection: self.view_projection().to_cols_array(),
        }
    }
}

/// Spot light with a perspective frustum along its cone axis.
#[derive(Debug)]
pub struct SpotLight {
    position: Vec3,
    direction: Vec3,
    color: Vec3,
    /// Full cone angle in radians.
    cone_angle: f32,
    view_projection: Cell<Option<Mat4>>,
}

impl SpotLight {
    pub fn new(position: Vec3, direction: Vec3, cone_angle_degrees: f32, color: Vec3) -> Self {
        Self {
            position,
            direction: direction.normalize(),
            color,
            cone_angle: cone_angle_degrees.to_radians(),
            view_projection: Cell::new(None),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.view_projection.set(None);
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.normalize();
        self.view_projection.set(None);
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn cone_angle(&self) -> f32 {
        self.cone_angle
    }

    pub fn view_projection(&self) -> Mat4 {
        if let Some(m) = self.view_projection.get() {
            return m;
        }
        let view = Mat4::look_at_rh(self.position, self.position + self.direction, Vec3::Y);
        let projection = Mat4::perspective_rh(self.cone_angle / 2.0, 1.0, 0.2, 100.0);
        let m = projection * view;
        self.view_projection.set(Some(m));
        m
    }

    pub fn frame_state(&self) -> SpotLightState {
        SpotLightState {
            position: self.position.to_array(),
            direction: self.direction.to_array(),
            color: self.color.to_array(),
            cone_angle: self.cone_angle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directional_matrix_invalidated_by_setter() {
        let mut light = DirectionalLight::new(Vec3::new(0.35, -0.7, -1.0), Vec3::splat(0.2));
        let before = light.view_projection();
        assert_eq!(before, light.view_projection());
        light.set_direction(Vec3::new(0.0, -1.0, 0.1));
        assert_ne!(before, light.view_projection());
    }

    #[test]
    fn direction_is_normalized() {
        let light = DirectionalLight::new(Vec3::new(0.0, -4.0, 0.0), Vec3::ONE);
        assert!((light.direction().length() - 1.0).abs() < 1e-6);
    }
}
