use std::time::Duration;

use ridgeline::DISCONNECT_TIMEOUT;

pub const DEFAULT_FRAME_RATE: u32 = 60;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub bind_addr: String,
    pub frame_rate: u32,
    /// Silence after which the server is reported as unreachable.
    pub server_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:0".to_string(),
            frame_rate: DEFAULT_FRAME_RATE,
            server_timeout: DISCONNECT_TIMEOUT,
        }
    }
}
