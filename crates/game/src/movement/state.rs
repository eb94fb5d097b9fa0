use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::net::EntityState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementMode {
    /// Unconstrained flight, never grounded.
    Free,
    #[default]
    PlayerLocked,
}

impl MovementMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Free => Self::PlayerLocked,
            Self::PlayerLocked => Self::Free,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Unit view direction.
    pub target: Vec3,
    /// Unit, orthogonal to `target`.
    pub up: Vec3,
    /// Degrees, kept in `[0, 360)`.
    pub angle_h: f32,
    /// Degrees, kept in `[-90, 90]`. Positive looks down.
    pub angle_v: f32,
    pub mode: MovementMode,
    pub grounded: bool,
    pub jumped: bool,
}

impl Default for MovementState {
    fn default() -> Self {
        Self::new(Vec3::ZERO, MovementMode::default())
    }
}

impl MovementState {
    pub fn new(position: Vec3, mode: MovementMode) -> Self {
        let mut state = Self {
            position,
            velocity: Vec3::ZERO,
            target: Vec3::X,
            up: Vec3::Y,
            angle_h: 0.0,
            angle_v: 0.0,
            mode,
            grounded: false,
            jumped: false,
        };
        state.update_rotation();
        state
    }

    pub fn set_angles(&mut self, angle_h: f32, angle_v: f32) {
        self.angle_h = angle_h;
        self.angle_v = angle_v;
        self.update_rotation();
    }

    /// Wraps/clamps the angles and rebuilds `target` and `up` from them.
    pub fn update_rotation(&mut self) {
        self.angle_h = self.angle_h.rem_euclid(360.0);
        if self.angle_h >= 360.0 {
            self.angle_h = 0.0;
        }
        self.angle_v = self.angle_v.clamp(-90.0, 90.0);

        let view = Quat::from_axis_angle(Vec3::Y, self.angle_h.to_radians()) * Vec3::X;
        let h_axis = Vec3::Y.cross(view).normalize();
        let view = Quat::from_axis_angle(h_axis, self.angle_v.to_radians()) * view;

        self.target = view.normalize();
        self.up = self.target.cross(h_axis).normalize();
    }

    /// View direction projected on the ground plane.
    pub fn flat_forward(&self) -> Vec3 {
        let flat = Vec3::new(self.target.x, 0.0, self.target.z);
        if flat.length_squared() > 1e-8 {
            return flat.normalize();
        }
        // looking straight up or down; fall back to the yaw heading
        Quat::from_axis_angle(Vec3::Y, self.angle_h.to_radians()) * Vec3::X
    }

    pub fn left(&self) -> Vec3 {
        self.up.cross(self.target).normalize_or_zero()
    }

    pub fn horizontal_speed(&self) -> f32 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z).length()
    }
}

impl From<&MovementState> for EntityState {
    fn from(state: &MovementState) -> Self {
        EntityState::new(state.position, state.angle_h, state.angle_v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(state: &MovementState) {
        assert!((state.target.length() - 1.0).abs() < 1e-4);
        assert!((state.up.length() - 1.0).abs() < 1e-4);
        assert!(state.target.dot(state.up).abs() < 1e-4);
    }

    #[test]
    fn test_rest_orientation() {
        let state = MovementState::default();

        assert!((state.target - Vec3::X).length() < 1e-5);
        assert!((state.up - Vec3::Y).length() < 1e-5);
        assert!((state.left() - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn test_angles_wrap_and_clamp() {
        let mut state = MovementState::default();

        state.set_angles(370.0, 120.0);
        assert!((state.angle_h - 10.0).abs() < 1e-4);
        assert_eq!(state.angle_v, 90.0);

        state.set_angles(-30.0, -200.0);
        assert!((state.angle_h - 330.0).abs() < 1e-4);
        assert_eq!(state.angle_v, -90.0);
    }

    #[test]
    fn test_basis_stays_orthonormal() {
        let mut state = MovementState::default();

        for h in (0..360).step_by(15) {
            for v in (-90..=90).step_by(15) {
                state.set_angles(h as f32, v as f32);
                assert_orthonormal(&state);
            }
        }
    }

    #[test]
    fn test_positive_pitch_looks_down() {
        let mut state = MovementState::default();
        state.set_angles(90.0, 30.0);

        assert!(state.target.y < 0.0);
        assert!(state.up.y > 0.0);
        let flat = state.flat_forward();
        assert!(flat.y.abs() < 1e-6);
        assert!((flat.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_flat_forward_straight_down() {
        let mut state = MovementState::default();
        state.set_angles(180.0, 90.0);

        let flat = state.flat_forward();
        assert!((flat - Vec3::NEG_X).length() < 1e-4);
    }

    #[test]
    fn test_entity_state_conversion() {
        let mut state = MovementState::new(Vec3::new(1.0, 2.0, 3.0), MovementMode::Free);
        state.set_angles(45.0, -10.0);

        let entity = EntityState::from(&state);
        assert_eq!(entity.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(entity.angle_h, 45.0);
        assert_eq!(entity.angle_v, -10.0);
    }
}
