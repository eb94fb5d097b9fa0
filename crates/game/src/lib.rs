pub mod movement;
pub mod net;
pub mod simulation;
pub mod terrain;

pub use movement::{
    InputFlags, ModeTuning, MovementController, MovementInput, MovementMode, MovementState,
    MovementTuning, TuningError,
};
pub use net::{
    AddressError, Admission, BroadcastReport, Broadcaster, ClientRecord, ConnectionRegistry,
    DEFAULT_PORT, DEFAULT_TICK_RATE, DISCONNECT_TIMEOUT, EntityState, MAX_CLIENTS,
    MAX_PACKET_DATA_SIZE, MAX_PACKET_SIZE, NetworkEndpoint, NetworkStats, PROTOCOL_ID, Packet,
    PacketError, PacketHeader, Payload, ReceiveTracker, WorldSnapshot, is_newer,
    parse_server_address,
};
pub use simulation::{FixedTimestep, SimulationContext};
pub use terrain::{HeightField, HeightSample, TerrainError, TerrainQuery};
