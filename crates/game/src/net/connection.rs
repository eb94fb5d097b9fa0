use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use super::protocol::{EntityState, MAX_CLIENTS, PacketHeader, is_newer};
use super::tracking::ReceiveTracker;

pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ClientRecord {
    pub client_id: u32,
    pub address: SocketAddr,
    pub last_remote_sequence_id: u16,
    pub last_seen: Instant,
    pub connected_at: Instant,
    pub state: EntityState,
    pub receive_tracker: ReceiveTracker,
}

impl ClientRecord {
    fn new(client_id: u32, address: SocketAddr, sequence_id: u16, state: EntityState, now: Instant) -> Self {
        let mut receive_tracker = ReceiveTracker::new();
        receive_tracker.record_received(sequence_id);

        Self {
            client_id,
            address,
            last_remote_sequence_id: sequence_id,
            last_seen: now,
            connected_at: now,
            state,
            receive_tracker,
        }
    }

    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) >= timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Joined { client_id: u32 },
    Updated,
    /// Older than the latest state on record; liveness refreshed, state kept.
    Stale,
    Full,
}

/// Server-side table of connected peers keyed by address.
#[derive(Debug)]
pub struct ConnectionRegistry {
    clients: HashMap<SocketAddr, ClientRecord>,
    next_client_id: u32,
    max_clients: usize,
    timeout: Duration,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(MAX_CLIENTS)
    }
}

impl ConnectionRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self::with_timeout(max_clients, DISCONNECT_TIMEOUT)
    }

    pub fn with_timeout(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients: max_clients.min(MAX_CLIENTS),
            timeout,
        }
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    pub fn ingest(
        &mut self,
        address: SocketAddr,
        header: &PacketHeader,
        state: EntityState,
        now: Instant,
    ) -> Admission {
        if let Some(record) = self.clients.get_mut(&address) {
            record.last_seen = now;
            record.receive_tracker.record_received(header.sequence_id);

            if !is_newer(header.sequence_id, record.last_remote_sequence_id) {
                return Admission::Stale;
            }

            record.last_remote_sequence_id = header.sequence_id;
            record.state = state;
            return Admission::Updated;
        }

        if self.clients.len() >= self.max_clients {
            return Admission::Full;
        }

        let client_id = self.next_client_id;
        self.next_client_id = self.next_client_id.wrapping_add(1).max(1);

        self.clients.insert(
            address,
            ClientRecord::new(client_id, address, header.sequence_id, state, now),
        );

        Admission::Joined { client_id }
    }

    pub fn remove(&mut self, address: &SocketAddr) -> Option<ClientRecord> {
        self.clients.remove(address)
    }

    /// Removes every record silent for at least the timeout.
    pub fn expire(&mut self, now: Instant) -> Vec<ClientRecord> {
        let timed_out: Vec<SocketAddr> = self
            .clients
            .values()
            .filter(|c| c.is_timed_out(now, self.timeout))
            .map(|c| c.address)
            .collect();

        let mut removed: Vec<ClientRecord> = timed_out
            .iter()
            .filter_map(|addr| self.clients.remove(addr))
            .collect();
        removed.sort_by_key(|c| c.client_id);
        removed
    }

    pub fn get(&self, address: &SocketAddr) -> Option<&ClientRecord> {
        self.clients.get(address)
    }

    pub fn contains(&self, address: &SocketAddr) -> bool {
        self.clients.contains_key(address)
    }

    /// Connected clients in join order. Slot indices in snapshots follow this order.
    pub fn roster(&self) -> Vec<&ClientRecord> {
        let mut roster: Vec<&ClientRecord> = self.clients.values().collect();
        roster.sort_by_key(|c| c.client_id);
        roster
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
