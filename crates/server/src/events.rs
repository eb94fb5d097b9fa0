use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub enum ServerEvent {
    ClientJoined {
        client_id: u32,
        addr: SocketAddr,
    },
    ClientLeft {
        client_id: u32,
        addr: SocketAddr,
        reason: DisconnectReason,
    },
    ConnectionDenied {
        addr: SocketAddr,
        reason: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Sent an empty packet on the way out.
    Goodbye,
    Timeout,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Goodbye => "disconnected",
            DisconnectReason::Timeout => "timed out",
        }
    }
}

impl ServerEvent {
    pub fn log(&self) {
        match self {
            ServerEvent::ClientJoined { client_id, addr } => {
                log::info!("client {} joined from {}", client_id, addr);
            }
            ServerEvent::ClientLeft {
                client_id,
                addr,
                reason,
            } => {
                log::info!("client {} ({}) {}", client_id, addr, reason.as_str());
            }
            ServerEvent::ConnectionDenied { addr, reason } => {
                log::warn!("refused {}: {}", addr, reason);
            }
            ServerEvent::Error { message } => {
                log::error!("{}", message);
            }
        }
    }
}
