use glam::Vec3;

use crate::terrain::{HeightSample, TerrainQuery};

use super::{ModeTuning, MovementInput, MovementMode, MovementState, MovementTuning};

/// Steepest drop per unit of horizontal travel a grounded walker follows
/// instead of leaving the ground.
const MAX_STEP_DOWN_GRADE: f32 = 2.0;

pub struct MovementController {
    tuning: MovementTuning,
}

impl Default for MovementController {
    fn default() -> Self {
        Self::new(MovementTuning::default())
    }
}

impl MovementController {
    pub fn new(tuning: MovementTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &MovementTuning {
        &self.tuning
    }

    /// Advances `state` by one fixed step of `dt` seconds.
    pub fn tick<T: TerrainQuery + ?Sized>(
        &self,
        state: &mut MovementState,
        input: &MovementInput,
        terrain: &T,
        dt: f32,
    ) {
        if input.mode_toggle() {
            state.mode = state.mode.toggled();
            state.grounded = false;
            state.jumped = false;
            log::debug!("movement mode -> {:?}", state.mode);
        }

        match state.mode {
            MovementMode::Free => self.tick_free(state, input, dt),
            MovementMode::PlayerLocked => self.tick_locked(state, input, terrain, dt),
        }

        let sensitivity = self.tuning.look_sensitivity;
        state.angle_h += input.look_h * sensitivity;
        state.angle_v += input.look_v * sensitivity;
        state.update_rotation();
    }

    fn tick_free(&self, state: &mut MovementState, input: &MovementInput, dt: f32) {
        let tuning = &self.tuning.free;
        state.grounded = false;

        let (forward, left) = input.move_axes();
        let wish = state.target * forward + state.left() * left;
        state.velocity += wish.normalize_or_zero() * tuning.acceleration * dt;

        state.velocity = apply_friction(state.velocity, tuning.friction * dt);
        state.velocity = state.velocity.clamp_length_max(tuning.speed_limit(input.sprint()));

        state.position += state.velocity * dt;
    }

    fn tick_locked<T: TerrainQuery + ?Sized>(
        &self,
        state: &mut MovementState,
        input: &MovementInput,
        terrain: &T,
        dt: f32,
    ) {
        let tuning = &self.tuning.player_locked;
        let ground = terrain.get_height_and_normal(state.position.x, state.position.z);
        update_ground_state(state, &ground, tuning);

        if state.grounded {
            state.velocity.y = 0.0;

            let (forward, left) = input.move_axes();
            let wish = state.flat_forward() * forward + state.left() * left;
            state.velocity += wish.normalize_or_zero() * tuning.acceleration * dt;

            // downhill pull: g * cos(elevation of the normal), along the normal's ground projection
            let n = ground.normal;
            state.velocity += Vec3::new(n.x, 0.0, n.z) * tuning.gravity * dt;

            let horizontal = Vec3::new(state.velocity.x, 0.0, state.velocity.z);
            let horizontal = apply_friction(horizontal, tuning.friction * dt)
                .clamp_length_max(tuning.speed_limit(input.sprint()));
            state.velocity.x = horizontal.x;
            state.velocity.z = horizontal.z;

            if input.jump() && !state.jumped {
                state.velocity.y = tuning.jump_impulse;
                state.jumped = true;
            }
        } else {
            state.velocity.y = (state.velocity.y - tuning.gravity * dt).max(-tuning.max_fall_speed);
        }

        state.position += state.velocity * dt;

        if state.grounded {
            if !state.jumped {
                follow_ground(state, terrain, tuning, dt);
            }
        } else {
            let below = terrain.get_height_and_normal(state.position.x, state.position.z);
            if let Some(height) = below.ground_height() {
                if state.position.y <= height {
                    land(state, height);
                }
            }
        }
    }
}

fn update_ground_state(state: &mut MovementState, ground: &HeightSample, tuning: &ModeTuning) {
    let Some(height) = ground.ground_height() else {
        state.grounded = false;
        return;
    };

    if state.grounded {
        let lifted = state.position.y > height + tuning.ground_margin;
        let launched = state.jumped && state.velocity.y > 0.0;
        if lifted || launched {
            state.grounded = false;
        } else {
            state.position.y = height;
        }
    } else if state.position.y <= height {
        land(state, height);
    }
}

/// Keeps a walker on the surface after it moved. Drops steeper than
/// [`MAX_STEP_DOWN_GRADE`] (or leaving the field) make it airborne.
fn follow_ground<T: TerrainQuery + ?Sized>(
    state: &mut MovementState,
    terrain: &T,
    tuning: &ModeTuning,
    dt: f32,
) {
    let below = terrain.get_height_and_normal(state.position.x, state.position.z);
    let step_down = tuning.ground_margin + state.horizontal_speed() * dt * MAX_STEP_DOWN_GRADE;

    match below.ground_height() {
        Some(height) if state.position.y - height <= step_down => state.position.y = height,
        _ => state.grounded = false,
    }
}

fn land(state: &mut MovementState, height: f32) {
    state.position.y = height;
    state.velocity.y = 0.0;
    state.grounded = true;
    state.jumped = false;
}

/// Removes up to `drop` units of speed. A zero vector stays zero.
fn apply_friction(velocity: Vec3, drop: f32) -> Vec3 {
    let speed = velocity.length();
    if speed <= f32::EPSILON {
        return Vec3::ZERO;
    }
    velocity * ((speed - drop).max(0.0) / speed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::InputFlags;
    use crate::terrain::HeightField;

    const DT: f32 = 1.0 / 60.0;

    fn flat(height: f32) -> HeightField {
        HeightField::flat(64, 64, 1.0, height).unwrap()
    }

    fn grounded_at(position: Vec3) -> MovementState {
        let mut state = MovementState::new(position, MovementMode::PlayerLocked);
        state.grounded = true;
        state
    }

    #[test]
    fn test_forward_speed_converges_to_max() {
        let controller = MovementController::default();
        let terrain = flat(0.0);
        let max = controller.tuning().player_locked.max_speed;
        let mut state = grounded_at(Vec3::new(5.0, 0.0, 30.0));
        let input = MovementInput::new(InputFlags::FORWARD);

        for _ in 0..120 {
            controller.tick(&mut state, &input, &terrain, DT);
            assert!(state.horizontal_speed() <= max + 1e-4);
            assert!(state.grounded);
        }
        assert!((state.horizontal_speed() - max).abs() < 1e-3);
        assert!(state.velocity.x > 0.0);
    }

    #[test]
    fn test_sprint_raises_limit() {
        let controller = MovementController::default();
        let terrain = flat(0.0);
        let tuning = &controller.tuning().player_locked;
        let mut state = grounded_at(Vec3::new(2.0, 0.0, 30.0));
        let input = MovementInput::new(InputFlags::FORWARD | InputFlags::SPRINT);

        for _ in 0..120 {
            controller.tick(&mut state, &input, &terrain, DT);
        }
        assert!(state.horizontal_speed() > tuning.max_speed);
        assert!(state.horizontal_speed() <= tuning.sprint_max_speed + 1e-4);
    }

    #[test]
    fn test_friction_stops_without_input() {
        let controller = MovementController::default();
        let terrain = flat(0.0);
        let mut state = grounded_at(Vec3::new(30.0, 0.0, 30.0));
        state.velocity = Vec3::new(3.0, 0.0, -1.0);

        for _ in 0..120 {
            controller.tick(&mut state, &MovementInput::default(), &terrain, DT);
        }
        assert_eq!(state.velocity, Vec3::ZERO);

        controller.tick(&mut state, &MovementInput::default(), &terrain, DT);
        assert!(state.velocity.is_finite());
    }

    #[test]
    fn test_jump_and_land() {
        let controller = MovementController::default();
        let ground = 2.0;
        let terrain = flat(ground);
        let mut state = grounded_at(Vec3::new(10.0, ground, 10.0));

        controller.tick(&mut state, &MovementInput::new(InputFlags::JUMP), &terrain, DT);
        assert!(state.jumped);
        assert!(state.velocity.y > 0.0);

        controller.tick(&mut state, &MovementInput::default(), &terrain, DT);
        assert!(!state.grounded);

        let mut ticks = 0;
        while !state.grounded {
            assert!(state.position.y > ground);
            controller.tick(&mut state, &MovementInput::new(InputFlags::JUMP), &terrain, DT);
            ticks += 1;
            assert!(ticks < 600, "never landed");
        }

        assert_eq!(state.position.y, ground);
        assert_eq!(state.velocity.y, 0.0);
        assert!(!state.jumped);
    }

    #[test]
    fn test_held_jump_does_not_rejump_midair() {
        let controller = MovementController::default();
        let terrain = flat(0.0);
        let mut state = grounded_at(Vec3::new(10.0, 0.0, 10.0));
        let jump = MovementInput::new(InputFlags::JUMP);

        controller.tick(&mut state, &jump, &terrain, DT);
        let impulse = state.velocity.y;
        controller.tick(&mut state, &jump, &terrain, DT);
        controller.tick(&mut state, &jump, &terrain, DT);

        assert!(state.velocity.y < impulse);
    }

    #[test]
    fn test_stays_grounded_within_margin() {
        let controller = MovementController::default();
        let terrain = flat(1.0);
        let margin = controller.tuning().player_locked.ground_margin;
        let mut state = grounded_at(Vec3::new(10.0, 1.0 + margin * 0.5, 10.0));

        controller.tick(&mut state, &MovementInput::default(), &terrain, DT);

        assert!(state.grounded);
        assert_eq!(state.position.y, 1.0);
    }

    #[test]
    fn test_falls_onto_terrain_from_above() {
        let controller = MovementController::default();
        let terrain = flat(0.0);
        let mut state = MovementState::new(Vec3::new(10.0, 5.0, 10.0), MovementMode::PlayerLocked);
        let max_fall = controller.tuning().player_locked.max_fall_speed;

        for _ in 0..600 {
            controller.tick(&mut state, &MovementInput::default(), &terrain, DT);
            assert!(state.velocity.y >= -max_fall);
            if state.grounded {
                break;
            }
        }
        assert!(state.grounded);
        assert_eq!(state.position.y, 0.0);
    }

    #[test]
    fn test_no_ground_outside_field() {
        let controller = MovementController::default();
        let terrain = flat(3.0);
        let mut state = grounded_at(Vec3::new(-5.0, 0.0, -5.0));

        controller.tick(&mut state, &MovementInput::default(), &terrain, DT);

        assert!(!state.grounded);
        assert!(state.position.y < 0.0);
    }

    #[test]
    fn test_slides_down_steep_slope() {
        let controller = MovementController::default();
        // y = -x: 45 degrees, steep enough to overcome friction
        let mut heights = Vec::new();
        for _iz in 0..64 {
            for ix in 0..64 {
                heights.push(64.0 - ix as f32);
            }
        }
        let terrain = HeightField::from_heights(64, 64, 1.0, heights).unwrap();
        let start = Vec3::new(10.0, 54.0, 30.0);
        let mut state = grounded_at(start);

        for _ in 0..30 {
            controller.tick(&mut state, &MovementInput::default(), &terrain, DT);
        }

        assert!(state.velocity.x > 0.0);
        assert!(state.position.x > start.x);
        assert!(state.velocity.z.abs() < 1e-4);
    }

    fn incline(grade: f32) -> HeightField {
        let mut heights = Vec::new();
        for _iz in 0..64 {
            for ix in 0..64 {
                heights.push(40.0 - grade * ix as f32);
            }
        }
        HeightField::from_heights(64, 64, 1.0, heights).unwrap()
    }

    #[test]
    fn test_sprint_downhill_stays_grounded() {
        let controller = MovementController::default();
        // about 31 degrees, facing straight down the slope
        let terrain = incline(0.6);
        let mut state = grounded_at(Vec3::new(4.0, 40.0 - 0.6 * 4.0, 30.0));
        let input = MovementInput::new(InputFlags::FORWARD | InputFlags::SPRINT);

        for tick in 0..60 {
            controller.tick(&mut state, &input, &terrain, DT);
            assert!(state.grounded, "left the ground on tick {tick}");
            let height = terrain
                .get_height_and_normal(state.position.x, state.position.z)
                .ground_height()
                .unwrap();
            assert!((state.position.y - height).abs() < 1e-3);
        }
        assert!(state.horizontal_speed() > controller.tuning().player_locked.max_speed);

        let jump = MovementInput::new(InputFlags::FORWARD | InputFlags::SPRINT | InputFlags::JUMP);
        controller.tick(&mut state, &jump, &terrain, DT);
        assert!(state.jumped);
        assert!(state.velocity.y > 0.0);

        controller.tick(&mut state, &input, &terrain, DT);
        assert!(!state.grounded);
    }

    #[test]
    fn test_walk_uphill_stays_grounded() {
        let controller = MovementController::default();
        let terrain = incline(0.6);
        let mut state = grounded_at(Vec3::new(40.0, 40.0 - 0.6 * 40.0, 30.0));
        state.set_angles(180.0, 0.0);
        let input = MovementInput::new(InputFlags::FORWARD);

        for _ in 0..60 {
            controller.tick(&mut state, &input, &terrain, DT);
            assert!(state.grounded);
        }
        assert!(state.position.x < 40.0);
    }

    #[test]
    fn test_cliff_edge_goes_airborne() {
        let controller = MovementController::default();
        let mut heights = Vec::new();
        for _iz in 0..64 {
            for ix in 0..64 {
                heights.push(if ix <= 10 { 20.0 } else { 0.0 });
            }
        }
        let terrain = HeightField::from_heights(64, 64, 1.0, heights).unwrap();
        let mut state = grounded_at(Vec3::new(8.0, 20.0, 30.0));
        state.velocity = Vec3::new(6.0, 0.0, 0.0);

        controller.tick(&mut state, &MovementInput::new(InputFlags::FORWARD), &terrain, DT);
        assert!(state.grounded);

        let mut airborne = false;
        for _ in 0..40 {
            controller.tick(&mut state, &MovementInput::new(InputFlags::FORWARD), &terrain, DT);
            airborne |= !state.grounded;
        }
        assert!(airborne);
    }

    #[test]
    fn test_gentle_slope_holds() {
        let controller = MovementController::default();
        let mut heights = Vec::new();
        for _iz in 0..64 {
            for ix in 0..64 {
                heights.push(10.0 - 0.1 * ix as f32);
            }
        }
        let terrain = HeightField::from_heights(64, 64, 1.0, heights).unwrap();
        let mut state = grounded_at(Vec3::new(20.0, 8.0, 20.0));

        for _ in 0..60 {
            controller.tick(&mut state, &MovementInput::default(), &terrain, DT);
        }

        assert_eq!(state.horizontal_speed(), 0.0);
        assert!(state.grounded);
    }

    #[test]
    fn test_free_mode_flies_and_never_grounds() {
        let controller = MovementController::default();
        let terrain = flat(0.0);
        let mut state = MovementState::new(Vec3::new(10.0, -4.0, 10.0), MovementMode::Free);
        state.set_angles(0.0, -45.0);
        let max = controller.tuning().free.max_speed;

        for _ in 0..200 {
            controller.tick(&mut state, &MovementInput::new(InputFlags::FORWARD), &terrain, DT);
            assert!(!state.grounded);
            assert!(state.velocity.length() <= max + 1e-3);
        }
        assert!(state.velocity.y > 0.0);
        assert!(state.position.y > 0.0);
    }

    #[test]
    fn test_mode_toggle_clears_ground_state() {
        let controller = MovementController::default();
        let terrain = flat(0.0);
        let mut state = grounded_at(Vec3::new(10.0, 0.0, 10.0));
        state.jumped = true;

        controller.tick(&mut state, &MovementInput::new(InputFlags::MODE_TOGGLE), &terrain, DT);

        assert_eq!(state.mode, MovementMode::Free);
        assert!(!state.grounded);
        assert!(!state.jumped);

        controller.tick(&mut state, &MovementInput::new(InputFlags::MODE_TOGGLE), &terrain, DT);
        assert_eq!(state.mode, MovementMode::PlayerLocked);
    }

    #[test]
    fn test_look_input_rotates_view() {
        let controller = MovementController::default();
        let terrain = flat(0.0);
        let mut state = grounded_at(Vec3::new(10.0, 0.0, 10.0));

        let input = MovementInput::default().with_look(90.0, 0.0);
        controller.tick(&mut state, &input, &terrain, DT);

        assert!((state.angle_h - 90.0).abs() < 1e-4);
        assert!((state.target - Vec3::NEG_Z).length() < 1e-4);
    }
}
