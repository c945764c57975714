//! A command waiting for its device to acknowledge or respond.

use std::time::Instant;

use crate::message::Message;

/// An outbound command sitting in the pending list while the engine waits for its response.
///
/// `enqueued_at` is reset every time the message is retransmitted, since the retry handler
/// scans for entries whose age exceeds the retry interval, not entries whose original send
/// time has expired.
#[derive(Debug, Clone)]
pub struct Pending {
    pub message: Message,
    pub enqueued_at: Instant,
    pub retries: u32,
    pub requires_ack: bool,
}

impl Pending {
    pub fn new(message: Message, now: Instant) -> Self {
        let requires_ack = message.requires_ack();
        Self {
            message,
            enqueued_at: now,
            retries: 0,
            requires_ack,
        }
    }

    /// Record a retransmission: bump the retry count and reset the age used by the retry scan.
    pub fn retransmitted(&mut self, now: Instant) {
        self.retries += 1;
        self.enqueued_at = now;
    }

    pub fn age(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.enqueued_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceId;

    #[test]
    fn new_pending_carries_requires_ack_from_message() {
        let now = Instant::now();
        let p = Pending::new(Message::BatteryLow(DeviceId::from_str_exact("AB").unwrap()), now);
        assert!(p.requires_ack);
        assert_eq!(p.retries, 0);
    }

    #[test]
    fn retransmitted_bumps_retries_and_resets_age() {
        let now = Instant::now();
        let mut p = Pending::new(Message::Sleep(DeviceId::from_str_exact("AB").unwrap()), now);
        let later = now + std::time::Duration::from_millis(100);
        p.retransmitted(later);
        assert_eq!(p.retries, 1);
        assert_eq!(p.age(later), std::time::Duration::ZERO);
    }
}
