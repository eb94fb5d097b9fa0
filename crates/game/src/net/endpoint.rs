use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use super::protocol::{MAX_PACKET_SIZE, Packet, PacketError};
use super::stats::NetworkStats;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("'{0}' is not a dotted-quad IPv4 address")]
    NotDottedQuad(String),
}

/// Parses the server address given on the command line (`a.b.c.d`).
pub fn parse_server_address(text: &str, port: u16) -> Result<SocketAddr, AddressError> {
    let ip: Ipv4Addr = text
        .trim()
        .parse()
        .map_err(|_| AddressError::NotDottedQuad(text.to_string()))?;
    Ok(SocketAddr::V4(SocketAddrV4::new(ip, port)))
}

/// Datagram transport. Frames whole packets; never blocks except in
/// [`NetworkEndpoint::wait_readable`].
pub struct NetworkEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
    stats: NetworkStats,
    /// One byte over the largest valid packet so oversized datagrams are detectable.
    recv_buffer: [u8; MAX_PACKET_SIZE + 1],
}

impl NetworkEndpoint {
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let addr = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
        })?;

        let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;

        let socket: UdpSocket = socket.into();
        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            stats: NetworkStats::default(),
            recv_buffer: [0u8; MAX_PACKET_SIZE + 1],
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    /// Sends the full encoded packet. A would-block is returned to the caller,
    /// which retries on its next tick.
    pub fn send_to(&mut self, packet: &Packet, addr: SocketAddr) -> io::Result<usize> {
        let data = packet
            .encode()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let bytes = match self.socket.send_to(&data, addr) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.stats.send_failures += 1;
                return Err(e);
            }
        };

        if bytes != data.len() {
            self.stats.send_failures += 1;
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short datagram: {} of {} bytes", bytes, data.len()),
            ));
        }

        self.stats.packets_sent += 1;
        self.stats.bytes_sent += bytes as u64;

        Ok(bytes)
    }

    /// Blocks until a datagram is queued or `timeout` passes.
    pub fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        if timeout.is_zero() {
            return self.peek_ready();
        }

        self.socket.set_nonblocking(false)?;
        let result = self
            .socket
            .set_read_timeout(Some(timeout))
            .and_then(|()| self.socket.peek_from(&mut self.recv_buffer));
        self.socket.set_nonblocking(true)?;

        match result {
            Ok(_) => Ok(true),
            Err(e) if is_transient(&e) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => Ok(true),
            Err(e) => Err(e),
        }
    }

    fn peek_ready(&mut self) -> io::Result<bool> {
        match self.socket.peek_from(&mut self.recv_buffer) {
            Ok(_) => Ok(true),
            Err(e) if is_transient(&e) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::ConnectionReset => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Drains every queued datagram. Foreign traffic is dropped silently;
    /// malformed datagrams are logged and dropped.
    ///
    /// A socket error ends the drain. Datagrams read before it are still
    /// returned; the error is only returned when nothing was read.
    pub fn receive(&mut self) -> io::Result<Vec<(Packet, SocketAddr)>> {
        let socket = &self.socket;
        drain_datagrams(&mut self.recv_buffer, &mut self.stats, |buf| {
            socket.recv_from(buf)
        })
    }
}

fn drain_datagrams<F>(
    buffer: &mut [u8],
    stats: &mut NetworkStats,
    mut recv: F,
) -> io::Result<Vec<(Packet, SocketAddr)>>
where
    F: FnMut(&mut [u8]) -> io::Result<(usize, SocketAddr)>,
{
    let mut packets = Vec::new();

    loop {
        match recv(buffer) {
            Ok((size, addr)) if size > MAX_PACKET_SIZE => {
                stats.malformed_dropped += 1;
                log::warn!("dropping oversized datagram from {}", addr);
            }
            Ok((size, addr)) => match Packet::decode(&buffer[..size]) {
                Ok(packet) => {
                    stats.packets_received += 1;
                    stats.bytes_received += size as u64;
                    packets.push((packet, addr));
                }
                Err(PacketError::ProtocolMismatch(id)) => {
                    stats.foreign_dropped += 1;
                    log::trace!("dropping foreign datagram {:#010x} from {}", id, addr);
                }
                Err(e) => {
                    stats.malformed_dropped += 1;
                    log::warn!("dropping datagram from {}: {}", addr, e);
                }
            },
            Err(ref e) if is_transient(e) => break,
            // ICMP port-unreachable from an earlier send surfaces here on some platforms
            Err(ref e) if e.kind() == io::ErrorKind::ConnectionReset => continue,
            Err(e) => {
                stats.receive_errors += 1;
                if packets.is_empty() {
                    return Err(e);
                }
                log::warn!("receive failed after {} datagrams: {}", packets.len(), e);
                break;
            }
        }
    }

    Ok(packets)
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_parse_dotted_quad() {
        let addr = parse_server_address("200.100.24.10", 27001).unwrap();
        assert_eq!(addr, "200.100.24.10:27001".parse().unwrap());
    }

    #[test]
    fn test_reject_non_dotted_quad() {
        assert!(parse_server_address("localhost", 27001).is_err());
        assert!(parse_server_address("10.0.0", 27001).is_err());
        assert!(parse_server_address("10.0.0.256", 27001).is_err());
    }

    fn datagram(sequence: u16) -> Vec<u8> {
        Packet::goodbye(crate::net::PacketHeader::new(sequence, 0, 0))
            .encode()
            .unwrap()
            .to_vec()
    }

    fn scripted(
        script: Vec<io::Result<Vec<u8>>>,
    ) -> impl FnMut(&mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let from: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let mut script = script.into_iter();
        move |buf| match script.next() {
            Some(Ok(bytes)) => {
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok((bytes.len(), from))
            }
            Some(Err(e)) => Err(e),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    #[test]
    fn test_error_mid_drain_keeps_earlier_datagrams() {
        let mut buffer = [0u8; MAX_PACKET_SIZE + 1];
        let mut stats = NetworkStats::default();
        let script = vec![
            Ok(datagram(1)),
            Ok(datagram(2)),
            Err(io::Error::from(io::ErrorKind::PermissionDenied)),
            Ok(datagram(3)),
        ];

        let packets = drain_datagrams(&mut buffer, &mut stats, scripted(script)).unwrap();

        let sequences: Vec<u16> = packets.iter().map(|(p, _)| p.header.sequence_id).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert_eq!(stats.receive_errors, 1);
    }

    #[test]
    fn test_error_before_any_datagram_is_returned() {
        let mut buffer = [0u8; MAX_PACKET_SIZE + 1];
        let mut stats = NetworkStats::default();
        let script = vec![Err(io::Error::from(io::ErrorKind::PermissionDenied))];

        let result = drain_datagrams(&mut buffer, &mut stats, scripted(script));

        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(stats.receive_errors, 1);
    }

    #[test]
    fn test_oversized_datagram_dropped() {
        let mut buffer = [0u8; MAX_PACKET_SIZE + 1];
        let mut stats = NetworkStats::default();
        let script = vec![Ok(vec![0u8; MAX_PACKET_SIZE + 1]), Ok(datagram(4))];

        let packets = drain_datagrams(&mut buffer, &mut stats, scripted(script)).unwrap();

        assert_eq!(packets.len(), 1);
        assert_eq!(stats.malformed_dropped, 1);
    }

    #[test]
    fn test_socket_stays_nonblocking_after_wait() {
        let mut endpoint = NetworkEndpoint::bind("127.0.0.1:0").unwrap();
        assert!(!endpoint.wait_readable(Duration::from_nanos(1)).unwrap());

        let start = Instant::now();
        assert!(endpoint.receive().unwrap().is_empty());
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_wait_readable_times_out_when_idle() {
        let mut endpoint = NetworkEndpoint::bind("127.0.0.1:0").unwrap();

        let start = Instant::now();
        let ready = endpoint.wait_readable(Duration::from_millis(20)).unwrap();

        assert!(!ready);
        assert!(start.elapsed() >= Duration::from_millis(10));
        assert!(endpoint.receive().unwrap().is_empty());
    }
}
