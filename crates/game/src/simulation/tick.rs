use crate::movement::{InputFlags, MovementController, MovementInput, MovementState};
use crate::net::EntityState;
use crate::terrain::TerrainQuery;

pub struct FixedTimestep {
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
        }
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn accumulate(&mut self, delta: f32) {
        self.accumulator += delta.clamp(0.0, 0.25);
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }
}

/// Everything one locally controlled entity needs to advance: the terrain
/// it stands on, the controller, and its state. Passed explicitly to every
/// tick; there is no process-wide simulation state.
pub struct SimulationContext<T: TerrainQuery> {
    terrain: T,
    controller: MovementController,
    local: MovementState,
    timestep: FixedTimestep,
    tick: u64,
}

impl<T: TerrainQuery> SimulationContext<T> {
    pub fn new(terrain: T, controller: MovementController, local: MovementState, tick_rate: u32) -> Self {
        Self {
            terrain,
            controller,
            local,
            timestep: FixedTimestep::new(tick_rate),
            tick: 0,
        }
    }

    pub fn local(&self) -> &MovementState {
        &self.local
    }

    pub fn timestep(&self) -> &FixedTimestep {
        &self.timestep
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn entity_state(&self) -> EntityState {
        EntityState::from(&self.local)
    }

    /// Runs exactly one fixed tick.
    pub fn step(&mut self, input: &MovementInput) -> &MovementState {
        let dt = self.timestep.dt();
        self.controller.tick(&mut self.local, input, &self.terrain, dt);
        self.tick += 1;
        &self.local
    }

    /// Accumulates `delta` seconds and runs as many fixed ticks as fit.
    /// Edge-triggered inputs and look deltas apply to the first tick only.
    pub fn update(&mut self, delta: f32, input: &MovementInput) -> u32 {
        self.timestep.accumulate(delta);

        let mut held = *input;
        let mut ticks_run = 0;
        while self.timestep.consume_tick() {
            self.step(&held);
            held.flags.remove(InputFlags::JUMP | InputFlags::MODE_TOGGLE);
            held.look_h = 0.0;
            held.look_v = 0.0;
            ticks_run += 1;
        }

        ticks_run
    }
}
