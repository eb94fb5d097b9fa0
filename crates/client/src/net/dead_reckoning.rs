use glam::Vec3;

use ridgeline::{EntityState, WorldSnapshot};

/// Faster than any movement mode or fall can go. A slot whose samples imply
/// more than this now holds a different player.
pub const MAX_PLAUSIBLE_SPEED: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationSample {
    pub state: EntityState,
    /// Receipt time in seconds on the local clock.
    pub time: f64,
}

/// Two most recent samples of one remote entity plus the rates derived from them.
#[derive(Debug, Clone)]
pub struct RemoteEntity {
    prior: Option<InterpolationSample>,
    current: InterpolationSample,
    velocity: Vec3,
    /// Radians per second.
    angular_h: f32,
    angular_v: f32,
}

impl RemoteEntity {
    fn new(state: EntityState, time: f64) -> Self {
        Self {
            prior: None,
            current: InterpolationSample { state, time },
            velocity: Vec3::ZERO,
            angular_h: 0.0,
            angular_v: 0.0,
        }
    }

    fn push(&mut self, state: EntityState, time: f64) {
        let prior = self.current;
        self.current = InterpolationSample { state, time };
        self.prior = Some(prior);

        let dt = (self.current.time - prior.time) as f32;
        if dt <= 0.0 {
            self.velocity = Vec3::ZERO;
            self.angular_h = 0.0;
            self.angular_v = 0.0;
            return;
        }

        let (cur, prev) = (&self.current.state, &prior.state);
        let velocity = (cur.position - prev.position) / dt;
        if velocity.length() > MAX_PLAUSIBLE_SPEED {
            let restarted = Self::new(self.current.state, self.current.time);
            *self = restarted;
            return;
        }

        self.velocity = velocity;
        self.angular_h = shortest_arc(cur.angle_h - prev.angle_h).to_radians() / dt;
        self.angular_v = (cur.angle_v - prev.angle_v).to_radians() / dt;
    }

    pub fn prior(&self) -> Option<&InterpolationSample> {
        self.prior.as_ref()
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Pose `elapsed` seconds after the current sample. Not clamped.
    pub fn extrapolate(&self, elapsed: f32) -> EntityState {
        let state = &self.current.state;
        let angle_h = (state.angle_h.to_radians() + self.angular_h * elapsed).to_degrees();
        let angle_v = (state.angle_v.to_radians() + self.angular_v * elapsed).to_degrees();
        EntityState::new(
            state.position + self.velocity * elapsed,
            angle_h.rem_euclid(360.0),
            angle_v,
        )
    }
}

fn shortest_arc(degrees: f32) -> f32 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

/// Extrapolates remote entities between snapshots. Slots are snapshot indices;
/// a change in entity count discards all history. A leave and a join between
/// two snapshots keep the count, so a slot that teleports is restarted instead.
#[derive(Debug, Default)]
pub struct DeadReckoning {
    entities: Vec<RemoteEntity>,
    time_since_last_packet: f32,
}

impl DeadReckoning {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, snapshot: &WorldSnapshot, time: f64) {
        let states: Vec<EntityState> = snapshot.remote_entities().copied().collect();

        if states.len() != self.entities.len() {
            if !self.entities.is_empty() {
                log::debug!(
                    "remote entity count {} -> {}, resetting history",
                    self.entities.len(),
                    states.len()
                );
            }
            self.entities = states
                .into_iter()
                .map(|state| RemoteEntity::new(state, time))
                .collect();
        } else {
            for (entity, state) in self.entities.iter_mut().zip(states) {
                entity.push(state, time);
            }
        }

        self.time_since_last_packet = 0.0;
    }

    pub fn advance(&mut self, dt: f32) {
        self.time_since_last_packet += dt;
    }

    pub fn time_since_last_packet(&self) -> f32 {
        self.time_since_last_packet
    }

    pub fn entities(&self) -> &[RemoteEntity] {
        &self.entities
    }

    pub fn poses(&self) -> Vec<EntityState> {
        self.entities
            .iter()
            .map(|e| e.extrapolate(self.time_since_last_packet))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

}
