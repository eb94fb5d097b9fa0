use std::time::Duration;

use ridgeline::{DEFAULT_TICK_RATE, DISCONNECT_TIMEOUT, MAX_CLIENTS};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub max_clients: usize,
    pub disconnect_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_clients: MAX_CLIENTS,
            disconnect_timeout: DISCONNECT_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}
