use std::time::{Duration, Instant};

use glam::Vec3;

use ridgeline::{EntityState, NetworkEndpoint, Packet, PacketHeader, Payload, WorldSnapshot};
use ridgeline_server::{DisconnectReason, GameServer, ServerConfig, ServerEvent};

fn server(disconnect_timeout: Duration) -> GameServer {
    let config = ServerConfig {
        disconnect_timeout,
        ..Default::default()
    };
    GameServer::new("127.0.0.1:0", config).unwrap()
}

fn client() -> NetworkEndpoint {
    NetworkEndpoint::bind("127.0.0.1:0").unwrap()
}

fn send_state(client: &mut NetworkEndpoint, server: &GameServer, sequence: u16, x: f32) {
    let state = EntityState::new(Vec3::new(x, 0.0, 0.0), 0.0, 0.0);
    let packet = Packet::new(PacketHeader::new(sequence, 0, 0), state.to_bytes());
    client.send_to(&packet, server.local_addr()).unwrap();
}

/// Newest snapshot queued on `client`.
fn latest_snapshot(client: &mut NetworkEndpoint) -> WorldSnapshot {
    assert!(client.wait_readable(Duration::from_millis(500)).unwrap());
    let received = client.receive().unwrap();
    let (packet, _) = received.last().unwrap();
    WorldSnapshot::from_bytes(&packet.data).unwrap()
}

#[test]
fn test_tick_once_excludes_recipient() {
    let mut server = server(Duration::from_secs(10));
    let mut a = client();
    let mut b = client();

    send_state(&mut a, &server, 1, 1.0);
    send_state(&mut b, &server, 1, 2.0);
    server.tick_once();

    let joined = server
        .drain_events()
        .filter(|e| matches!(e, ServerEvent::ClientJoined { .. }))
        .count();
    assert_eq!(joined, 2);

    let to_a = latest_snapshot(&mut a);
    let xs: Vec<f32> = to_a.remote_entities().map(|e| e.position.x).collect();
    assert_eq!(xs, vec![2.0]);

    let to_b = latest_snapshot(&mut b);
    let xs: Vec<f32> = to_b.remote_entities().map(|e| e.position.x).collect();
    assert_eq!(xs, vec![1.0]);

    assert_eq!(server.stats().broadcast_sequence, 1);
}

#[test]
fn test_tick_once_expires_silent_client() {
    let timeout = Duration::from_millis(100);
    let mut server = server(timeout);
    let mut active = client();
    let mut silent = client();

    send_state(&mut silent, &server, 1, 9.0);
    let start = Instant::now();
    let mut sequence = 1;
    while start.elapsed() < timeout * 3 {
        send_state(&mut active, &server, sequence, 1.0);
        server.tick_once();
        sequence += 1;
    }

    let left: Vec<ServerEvent> = server
        .drain_events()
        .filter(|e| matches!(e, ServerEvent::ClientLeft { .. }))
        .collect();
    assert!(matches!(
        left.as_slice(),
        [ServerEvent::ClientLeft {
            reason: DisconnectReason::Timeout,
            ..
        }]
    ));

    assert_eq!(latest_snapshot(&mut active).num_entities(), 0);
    assert_eq!(server.registry().len(), 1);
}
