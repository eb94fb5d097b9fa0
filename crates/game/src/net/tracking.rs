use std::collections::VecDeque;

use super::protocol::is_newer;

const ACK_WINDOW: u16 = 32;
const RECENT_CAPACITY: usize = 128;

/// Remembers which remote sequence ids arrived so outgoing headers can carry
/// `ack`/`ack_bitfield`. Nothing is retransmitted; the fields are informational.
#[derive(Debug, Clone)]
pub struct ReceiveTracker {
    last_received: Option<u16>,
    received_bitfield: u32,
    recent_sequences: VecDeque<u16>,
}

impl Default for ReceiveTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiveTracker {
    pub fn new() -> Self {
        Self {
            last_received: None,
            received_bitfield: 0,
            recent_sequences: VecDeque::with_capacity(RECENT_CAPACITY),
        }
    }

    /// Returns `false` for a duplicate of a recently seen id.
    pub fn record_received(&mut self, sequence: u16) -> bool {
        if self.recent_sequences.contains(&sequence) {
            return false;
        }

        if self.recent_sequences.len() >= RECENT_CAPACITY {
            self.recent_sequences.pop_front();
        }
        self.recent_sequences.push_back(sequence);

        let Some(last) = self.last_received else {
            self.last_received = Some(sequence);
            return true;
        };

        if is_newer(sequence, last) {
            let diff = sequence.wrapping_sub(last);
            self.received_bitfield = if diff <= ACK_WINDOW {
                // bit 0 stands for `last` once `sequence` becomes the ack
                self.received_bitfield.checked_shl(diff as u32).unwrap_or(0) | (1 << (diff - 1))
            } else {
                0
            };
            self.last_received = Some(sequence);
        } else {
            let diff = last.wrapping_sub(sequence);
            if diff > 0 && diff <= ACK_WINDOW {
                self.received_bitfield |= 1 << (diff - 1);
            }
        }

        true
    }

    pub fn ack_data(&self) -> (u16, u32) {
        (self.last_received.unwrap_or(0), self.received_bitfield)
    }
}
