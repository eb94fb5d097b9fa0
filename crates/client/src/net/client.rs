use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use ridgeline::{
    EntityState, NetworkEndpoint, NetworkStats, Packet, PacketHeader, Payload, ReceiveTracker,
    WorldSnapshot, is_newer,
};

use super::config::ClientConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Nothing heard from the server yet.
    Waiting,
    Live,
    /// No snapshot for longer than the configured timeout.
    Silent,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Waiting => "waiting for server",
            LinkStatus::Live => "connected",
            LinkStatus::Silent => "server silent",
        }
    }
}

pub struct NetworkClient {
    endpoint: NetworkEndpoint,
    server_addr: SocketAddr,
    server_timeout: Duration,
    local_sequence: u16,
    latest_remote: Option<u16>,
    tracker: ReceiveTracker,
    last_snapshot_at: Option<Instant>,
    snapshots_received: u64,
    stale_dropped: u64,
}

impl NetworkClient {
    pub fn new(config: &ClientConfig, server_addr: SocketAddr) -> io::Result<Self> {
        let endpoint = NetworkEndpoint::bind(config.bind_addr.as_str())?;
        log::info!("sending state to {} from {}", server_addr, endpoint.local_addr());

        Ok(Self {
            endpoint,
            server_addr,
            server_timeout: config.server_timeout,
            local_sequence: 0,
            latest_remote: None,
            tracker: ReceiveTracker::new(),
            last_snapshot_at: None,
            snapshots_received: 0,
            stale_dropped: 0,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn stats(&self) -> &NetworkStats {
        self.endpoint.stats()
    }

    pub fn snapshots_received(&self) -> u64 {
        self.snapshots_received
    }

    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }

    fn next_header(&mut self) -> PacketHeader {
        self.local_sequence = self.local_sequence.wrapping_add(1);
        let (ack, ack_bitfield) = self.tracker.ack_data();
        PacketHeader::new(self.local_sequence, ack, ack_bitfield)
    }

    /// Sends this tick's state. A full socket buffer skips the tick.
    pub fn send_state(&mut self, state: &EntityState) -> io::Result<()> {
        let header = self.next_header();
        let packet = Packet::new(header, state.to_bytes());

        match self.endpoint.send_to(&packet, self.server_addr) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                log::debug!("send would block, skipping tick {}", header.sequence_id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Drains every queued datagram and returns the newest snapshot among them.
    /// Duplicates, stale snapshots and traffic from other addresses are dropped.
    pub fn poll(&mut self) -> io::Result<Option<WorldSnapshot>> {
        let mut newest = None;

        for (packet, from) in self.endpoint.receive()? {
            if from != self.server_addr {
                log::trace!("ignoring datagram from {}", from);
                continue;
            }

            let sequence = packet.header.sequence_id;
            if !self.tracker.record_received(sequence) {
                continue;
            }
            if let Some(latest) = self.latest_remote {
                if !is_newer(sequence, latest) {
                    self.stale_dropped += 1;
                    continue;
                }
            }

            match WorldSnapshot::from_bytes(&packet.data) {
                Ok(snapshot) => {
                    self.latest_remote = Some(sequence);
                    newest = Some(snapshot);
                }
                Err(e) => log::warn!("dropping snapshot {}: {}", sequence, e),
            }
        }

        if newest.is_some() {
            self.snapshots_received += 1;
            self.last_snapshot_at = Some(Instant::now());
        }

        Ok(newest)
    }

    pub fn status(&self, now: Instant) -> LinkStatus {
        match self.last_snapshot_at {
            None => LinkStatus::Waiting,
            Some(at) if now.saturating_duration_since(at) >= self.server_timeout => {
                LinkStatus::Silent
            }
            Some(_) => LinkStatus::Live,
        }
    }

    /// Tells the server we are leaving. Best effort.
    pub fn disconnect(&mut self) {
        let header = self.next_header();
        if let Err(e) = self.endpoint.send_to(&Packet::goodbye(header), self.server_addr) {
            log::debug!("goodbye to {} failed: {}", self.server_addr, e);
        }
    }
}
