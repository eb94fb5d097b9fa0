mod client;
mod config;
mod dead_reckoning;

pub use client::{LinkStatus, NetworkClient};
pub use config::{ClientConfig, DEFAULT_FRAME_RATE};
pub use dead_reckoning::DeadReckoning;
