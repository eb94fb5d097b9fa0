#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub send_failures: u64,
    /// Datagrams carrying another protocol id. Dropped without a log line.
    pub foreign_dropped: u64,
    pub malformed_dropped: u64,
    pub receive_errors: u64,
}
