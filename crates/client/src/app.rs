use std::thread;
use std::time::{Duration, Instant};

use glam::Vec3;

use ridgeline::{
    HeightField, InputFlags, MovementController, MovementInput, MovementMode, MovementState,
    SimulationContext, TerrainQuery,
};

use crate::frontend::{FrameView, Frontend, LinkView};
use crate::net::{DeadReckoning, NetworkClient};
use crate::stats::FrameStats;

/// Places a new player over the middle of the field, standing on the ground.
pub fn spawn_state(terrain: &HeightField) -> MovementState {
    let center = terrain.center();
    let height = terrain
        .get_height_and_normal(center.x, center.y)
        .ground_height()
        .unwrap_or(0.0);

    let mut state = MovementState::new(Vec3::new(center.x, height, center.y), MovementMode::PlayerLocked);
    state.grounded = true;
    state
}

pub struct App<T: TerrainQuery, F: Frontend> {
    sim: SimulationContext<T>,
    network: Option<NetworkClient>,
    remotes: DeadReckoning,
    frontend: F,
    frame_duration: Duration,
    stats: FrameStats,
    clock: Instant,
    /// Edges and look seen on a frame that ran no tick.
    carried: MovementInput,
}

impl<T: TerrainQuery, F: Frontend> App<T, F> {
    pub fn new(
        sim: SimulationContext<T>,
        network: Option<NetworkClient>,
        frontend: F,
        frame_rate: u32,
    ) -> Self {
        Self {
            sim,
            network,
            remotes: DeadReckoning::new(),
            frontend,
            frame_duration: Duration::from_secs_f64(1.0 / frame_rate.max(1) as f64),
            stats: FrameStats::new(),
            clock: Instant::now(),
            carried: MovementInput::default(),
        }
    }

    pub fn sim(&self) -> &SimulationContext<T> {
        &self.sim
    }

    /// Runs frames until the frontend asks to quit or `max_frames` have run.
    /// Returns the number of frames run.
    pub fn run(&mut self, max_frames: Option<u64>) -> anyhow::Result<u64> {
        let mut frames = 0;
        let mut last_frame = Instant::now();
        let mut next_frame = last_frame + self.frame_duration;

        let result = loop {
            if max_frames.is_some_and(|max| frames >= max) {
                break Ok(());
            }

            let now = Instant::now();
            let delta = now.saturating_duration_since(last_frame).as_secs_f32();
            last_frame = now;

            match self.frame(frames, now, delta) {
                Ok(true) => frames += 1,
                Ok(false) => break Ok(()),
                Err(e) => break Err(e),
            }

            let now = Instant::now();
            if next_frame > now {
                thread::sleep(next_frame - now);
                next_frame += self.frame_duration;
            } else {
                next_frame = now + self.frame_duration;
            }
        };

        if let Some(network) = &mut self.network {
            network.disconnect();
        }

        result.map(|()| frames)
    }

    /// One frame. Returns `false` when the player asked to quit.
    fn frame(&mut self, frame: u64, now: Instant, delta: f32) -> anyhow::Result<bool> {
        let input = self.frontend.poll_input(now)?;
        if input.quit {
            return Ok(false);
        }

        let elapsed = now.saturating_duration_since(self.clock).as_secs_f64();
        if let Some(network) = &mut self.network {
            match network.poll() {
                Ok(Some(snapshot)) => {
                    self.remotes.ingest(&snapshot, elapsed);
                    self.stats.record_snapshot(now);
                }
                Ok(None) => {}
                Err(e) => log::warn!("receive failed: {}", e),
            }
        }

        let carried = std::mem::take(&mut self.carried);
        let mut movement = input.movement;
        movement.flags |= carried.flags;
        movement.look_h += carried.look_h;
        movement.look_v += carried.look_v;

        let ticks = self.sim.update(delta, &movement);
        if ticks == 0 {
            self.carried = MovementInput::new(movement.flags & (InputFlags::JUMP | InputFlags::MODE_TOGGLE))
                .with_look(movement.look_h, movement.look_v);
        } else {
            if let Some(network) = &mut self.network {
                if let Err(e) = network.send_state(&self.sim.entity_state()) {
                    log::warn!("send to {} failed: {}", network.server_addr(), e);
                }
            }
            self.remotes.advance(ticks as f32 * self.sim.timestep().dt());
        }

        self.stats.record_frame(delta);
        let remotes = self.remotes.poses();
        let view = FrameView {
            frame,
            local: self.sim.local(),
            remotes: &remotes,
            link: self.network.as_ref().map(|n| LinkView {
                status: n.status(now),
                snapshots_received: n.snapshots_received(),
                stale_dropped: n.stale_dropped(),
            }),
            fps: self.stats.fps(),
            snapshot_rate: self.stats.snapshot_rate(),
        };
        self.frontend.present(&view)?;

        Ok(true)
    }
}
