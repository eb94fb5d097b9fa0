use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tuning json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-mode constants. Speeds are units/s, accelerations units/s².
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModeTuning {
    pub acceleration: f32,
    pub friction: f32,
    pub max_speed: f32,
    pub sprint_max_speed: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_impulse: f32,
    /// Height above ground tolerated before a grounded entity counts as airborne.
    pub ground_margin: f32,
}

impl Default for ModeTuning {
    fn default() -> Self {
        Self::player_locked()
    }
}

impl ModeTuning {
    pub fn player_locked() -> Self {
        Self {
            acceleration: 40.0,
            friction: 8.0,
            max_speed: 6.0,
            sprint_max_speed: 10.0,
            gravity: 20.0,
            max_fall_speed: 50.0,
            jump_impulse: 7.0,
            ground_margin: 0.05,
        }
    }

    pub fn free() -> Self {
        Self {
            acceleration: 60.0,
            friction: 20.0,
            max_speed: 20.0,
            sprint_max_speed: 40.0,
            gravity: 0.0,
            max_fall_speed: 0.0,
            jump_impulse: 0.0,
            ground_margin: 0.0,
        }
    }

    pub fn speed_limit(&self, sprint: bool) -> f32 {
        if sprint {
            self.sprint_max_speed
        } else {
            self.max_speed
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MovementTuning {
    pub free: ModeTuning,
    pub player_locked: ModeTuning,
    /// Degrees of view rotation per unit of look input.
    pub look_sensitivity: f32,
}

impl Default for MovementTuning {
    fn default() -> Self {
        Self {
            free: ModeTuning::free(),
            player_locked: ModeTuning::player_locked(),
            look_sensitivity: 1.0,
        }
    }
}

impl MovementTuning {
    /// Parses tuning overrides. Keys left out keep the defaults of their own
    /// mode, so a file may override a single constant.
    pub fn from_json(text: &str) -> Result<Self, TuningError> {
        let overrides: Value = serde_json::from_str(text)?;
        let mut merged = serde_json::to_value(Self::default())?;
        merge(&mut merged, overrides);
        Ok(serde_json::from_value(merged)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
