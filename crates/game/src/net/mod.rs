mod broadcast;
mod connection;
mod endpoint;
mod protocol;
mod stats;
mod tracking;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use connection::{Admission, ClientRecord, ConnectionRegistry, DISCONNECT_TIMEOUT};
pub use endpoint::{AddressError, NetworkEndpoint, parse_server_address};
pub use protocol::{is_newer, Payload};
pub use protocol::{
    DEFAULT_PORT, DEFAULT_TICK_RATE, EntityState, HEADER_SIZE, LENGTH_PREFIX_SIZE, MAX_CLIENTS,
    MAX_PACKET_DATA_SIZE, MAX_PACKET_SIZE, PROTOCOL_ID, Packet, PacketError, PacketHeader,
    WorldSnapshot,
};
pub use stats::NetworkStats;
pub use tracking::ReceiveTracker;
