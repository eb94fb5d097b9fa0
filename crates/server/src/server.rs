use std::collections::{HashSet, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use glam::Vec3;

use ridgeline::{
    Admission, Broadcaster, ConnectionRegistry, EntityState, NetworkEndpoint, NetworkStats, Packet,
    Payload,
};

use crate::config::ServerConfig;
use crate::events::{DisconnectReason, ServerEvent};

pub struct GameServer {
    endpoint: NetworkEndpoint,
    registry: ConnectionRegistry,
    broadcaster: Broadcaster,
    config: ServerConfig,
    tick: u64,
    tick_duration: Duration,
    next_tick: Instant,
    running: Arc<AtomicBool>,
    start_time: Instant,
    denied: HashSet<SocketAddr>,
    pending_events: VecDeque<ServerEvent>,
}

impl GameServer {
    pub fn new(bind_addr: &str, config: ServerConfig) -> io::Result<Self> {
        let endpoint = NetworkEndpoint::bind(bind_addr)?;
        let tick_duration = config.tick_duration();
        let now = Instant::now();

        Ok(Self {
            endpoint,
            registry: ConnectionRegistry::with_timeout(config.max_clients, config.disconnect_timeout),
            broadcaster: Broadcaster::new(),
            tick: 0,
            tick_duration,
            next_tick: now + tick_duration,
            running: Arc::new(AtomicBool::new(true)),
            start_time: now,
            denied: HashSet::new(),
            pending_events: VecDeque::new(),
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.endpoint.local_addr()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
        }
    }

    /// Waits for datagrams until the next tick boundary, ingesting them as
    /// they arrive, then runs one tick.
    pub fn tick_once(&mut self) {
        loop {
            let now = Instant::now();
            if now >= self.next_tick {
                break;
            }
            match self.endpoint.wait_readable(self.next_tick - now) {
                Ok(true) => self.process_network(),
                Ok(false) => {}
                Err(e) => {
                    self.push_error(format!("wait failed: {}", e));
                    std::thread::sleep(self.next_tick.saturating_duration_since(Instant::now()));
                }
            }
        }

        self.process_network();

        let now = Instant::now();
        self.tick(now);

        self.next_tick += self.tick_duration;
        if self.next_tick < now {
            // fell behind; do not try to catch up with a burst of ticks
            self.next_tick = now + self.tick_duration;
        }
    }

    /// One registry/broadcast pass at `now`. Packets already ingested are
    /// reflected; timed-out clients are removed before anything is sent.
    pub fn tick(&mut self, now: Instant) {
        for record in self.registry.expire(now) {
            self.denied.clear();
            self.pending_events.push_back(ServerEvent::ClientLeft {
                client_id: record.client_id,
                addr: record.address,
                reason: DisconnectReason::Timeout,
            });
        }

        let report = self.broadcaster.broadcast(&self.registry, &mut self.endpoint);
        for (addr, e) in report.failures {
            if e.kind() != io::ErrorKind::WouldBlock {
                self.push_error(format!("failed to send snapshot to {}: {}", addr, e));
            }
        }

        self.tick += 1;
    }

    fn process_network(&mut self) {
        let packets = match self.endpoint.receive() {
            Ok(packets) => packets,
            Err(e) => {
                self.push_error(format!("network error: {}", e));
                return;
            }
        };

        let now = Instant::now();
        for (packet, addr) in packets {
            self.handle_packet(packet, addr, now);
        }
    }

    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr, now: Instant) {
        if packet.is_goodbye() {
            if let Some(record) = self.registry.remove(&addr) {
                self.denied.clear();
                self.pending_events.push_back(ServerEvent::ClientLeft {
                    client_id: record.client_id,
                    addr,
                    reason: DisconnectReason::Goodbye,
                });
            }
            return;
        }

        let state = match EntityState::from_bytes(&packet.data) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("dropping packet from {}: {}", addr, e);
                return;
            }
        };

        match self.registry.ingest(addr, &packet.header, state, now) {
            Admission::Joined { client_id } => {
                self.pending_events
                    .push_back(ServerEvent::ClientJoined { client_id, addr });
            }
            Admission::Full => {
                if self.denied.insert(addr) {
                    self.pending_events.push_back(ServerEvent::ConnectionDenied {
                        addr,
                        reason: format!("server full ({} clients)", self.registry.max_clients()),
                    });
                }
            }
            Admission::Stale => {
                log::trace!("stale state {} from {}", packet.header.sequence_id, addr);
            }
            Admission::Updated => {}
        }
    }

    fn push_error(&mut self, message: String) {
        self.pending_events.push_back(ServerEvent::Error { message });
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            tick: self.tick,
            uptime_secs: self.start_time.elapsed().as_secs(),
            client_count: self.registry.len(),
            max_clients: self.registry.max_clients(),
            broadcast_sequence: self.broadcaster.sequence(),
            network_stats: self.endpoint.stats().clone(),
        }
    }

    pub fn client_infos(&self) -> Vec<ClientInfo> {
        let now = Instant::now();
        self.registry
            .roster()
            .into_iter()
            .map(|c| ClientInfo {
                client_id: c.client_id,
                addr: c.address.to_string(),
                last_sequence: c.last_remote_sequence_id,
                idle_secs: now.saturating_duration_since(c.last_seen).as_secs_f32(),
                connected_secs: now.saturating_duration_since(c.connected_at).as_secs(),
                position: c.state.position,
                angle_h: c.state.angle_h,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub tick: u64,
    pub uptime_secs: u64,
    pub client_count: usize,
    pub max_clients: usize,
    pub broadcast_sequence: u16,
    pub network_stats: NetworkStats,
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub client_id: u32,
    pub addr: String,
    pub last_sequence: u16,
    pub idle_secs: f32,
    pub connected_secs: u64,
    pub position: Vec3,
    pub angle_h: f32,
}
