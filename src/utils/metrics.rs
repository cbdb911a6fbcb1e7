//! Traffic counters
//!
//! Every transport and listener server carries its own [`Metrics`]; read them with
//! `metrics().snapshot()`.
//!
//! Uses atomic counters so the receive threads never take a lock to count.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Packet counters for one socket
#[derive(Debug)]
pub struct Metrics {
    /// Packets put on the wire
    pub packets_sent: AtomicU64,
    /// Datagrams read from the socket
    pub datagrams_received: AtomicU64,
    /// Datagrams that failed to decode
    pub malformed_dropped: AtomicU64,
    /// Decoded packets handed to a queue
    pub packets_delivered: AtomicU64,
    /// Packets discarded because a queue was full
    pub overflow_dropped: AtomicU64,
    /// Listeners removed for falling behind or dying
    pub listeners_disconnected: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            packets_sent: AtomicU64::new(0),
            datagrams_received: AtomicU64::new(0),
            malformed_dropped: AtomicU64::new(0),
            packets_delivered: AtomicU64::new(0),
            overflow_dropped: AtomicU64::new(0),
            listeners_disconnected: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn packet_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn datagram_received(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed(&self) {
        self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn delivered(&self) {
        self.packets_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn overflow(&self) {
        self.overflow_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn listener_disconnected(&self) {
        self.listeners_disconnected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            packets_delivered: self.packets_delivered.load(Ordering::Relaxed),
            overflow_dropped: self.overflow_dropped.load(Ordering::Relaxed),
            listeners_disconnected: self.listeners_disconnected.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            packets_sent = snapshot.packets_sent,
            datagrams_received = snapshot.datagrams_received,
            malformed_dropped = snapshot.malformed_dropped,
            packets_delivered = snapshot.packets_delivered,
            overflow_dropped = snapshot.overflow_dropped,
            listeners_disconnected = snapshot.listeners_disconnected,
            uptime_seconds = snapshot.uptime_seconds,
            "Hexabus metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub packets_sent: u64,
    pub datagrams_received: u64,
    pub malformed_dropped: u64,
    pub packets_delivered: u64,
    pub overflow_dropped: u64,
    pub listeners_disconnected: u64,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_snapshot() {
        let metrics = Metrics::new();
        metrics.datagram_received();
        metrics.datagram_received();
        metrics.malformed();
        metrics.delivered();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.datagrams_received, 2);
        assert_eq!(snapshot.malformed_dropped, 1);
        assert_eq!(snapshot.packets_delivered, 1);
        assert_eq!(snapshot.overflow_dropped, 0);
    }
}
