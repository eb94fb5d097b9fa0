use std::io;
use std::net::SocketAddr;

use super::connection::{ClientRecord, ConnectionRegistry};
use super::endpoint::NetworkEndpoint;
use super::protocol::{Packet, PacketError, PacketHeader, WorldSnapshot};

/// Outcome of one broadcast pass.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failures: Vec<(SocketAddr, io::Error)>,
}

/// Fans the world state out to every connected client once per tick.
#[derive(Debug, Default)]
pub struct Broadcaster {
    sequence: u16,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence id stamped on the most recent broadcast.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Snapshot for `recipient`: everyone else in roster order.
    pub fn compose(registry: &ConnectionRegistry, recipient: &SocketAddr) -> WorldSnapshot {
        let entities = registry
            .roster()
            .into_iter()
            .filter(|c| c.address != *recipient)
            .map(|c| c.state)
            .collect();
        WorldSnapshot::new(entities)
    }

    pub fn packet_for(&self, record: &ClientRecord, snapshot: &WorldSnapshot) -> Result<Packet, PacketError> {
        let (ack, ack_bitfield) = record.receive_tracker.ack_data();
        let header = PacketHeader::new(self.sequence, ack, ack_bitfield);
        Ok(Packet::new(header, snapshot.encode()?))
    }

    /// Sends each client its snapshot. The sequence advances once per pass that
    /// has at least one recipient. A failed send is reported and skipped.
    pub fn broadcast(
        &mut self,
        registry: &ConnectionRegistry,
        endpoint: &mut NetworkEndpoint,
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        if registry.is_empty() {
            return report;
        }

        self.sequence = self.sequence.wrapping_add(1);

        for record in registry.roster() {
            let snapshot = Self::compose(registry, &record.address);
            let result = self
                .packet_for(record, &snapshot)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
                .and_then(|packet| endpoint.send_to(&packet, record.address));

            match result {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    log::debug!("snapshot to {} failed: {}", record.address, e);
                    report.failures.push((record.address, e));
                }
            }
        }

        report
    }
}
