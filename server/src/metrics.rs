//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Lock-free metrics for the chat relay
//!
//! The dispatch loop is the only writer; the atomics let tests and the
//! binary read the counters from other tasks without touching loop state.
//! Every update is mirrored to the `metrics` facade so an installed
//! recorder sees the same events.

use ::metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free relay metrics
#[derive(Debug)]
pub struct RelayMetrics {
    // Admission
    sessions_admitted: AtomicU64,
    sessions_rejected: AtomicU64,
    sessions_closed: AtomicU64,
    active_sessions: AtomicU64,

    // Traffic
    messages_received: AtomicU64,
    messages_relayed: AtomicU64,
    quit_commands: AtomicU64,
    deliveries: AtomicU64,
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,

    // Errors
    send_failures: AtomicU64,
    accept_errors: AtomicU64,

    started_at: Instant,
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            sessions_admitted: AtomicU64::new(0),
            sessions_rejected: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            active_sessions: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_relayed: AtomicU64::new(0),
            quit_commands: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            accept_errors: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    // Admission

    /// Record a session entering the table
    pub fn session_admitted(&self) {
        self.sessions_admitted.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        counter!("chatrelay.sessions.admitted").increment(1);
        gauge!("chatrelay.sessions.active").increment(1.0);
    }

    /// Record a connection declined because the table was full
    pub fn session_rejected(&self) {
        self.sessions_rejected.fetch_add(1, Ordering::Relaxed);
        counter!("chatrelay.sessions.rejected").increment(1);
    }

    /// Record a session leaving the table
    pub fn session_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_sub(1, Ordering::Relaxed);
        counter!("chatrelay.sessions.closed").increment(1);
        gauge!("chatrelay.sessions.active").decrement(1.0);
    }

    /// Current number of sessions in the table
    pub fn active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::Relaxed)
    }

    /// Sessions admitted since start
    pub fn sessions_admitted(&self) -> u64 {
        self.sessions_admitted.load(Ordering::Relaxed)
    }

    /// Connections declined since start
    pub fn sessions_rejected(&self) -> u64 {
        self.sessions_rejected.load(Ordering::Relaxed)
    }

    /// Sessions closed since start
    pub fn sessions_closed(&self) -> u64 {
        self.sessions_closed.load(Ordering::Relaxed)
    }

    // Traffic

    /// Record one inbound read of `bytes` bytes
    pub fn chunk_received(&self, bytes: usize) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
        counter!("chatrelay.messages.received").increment(1);
    }

    /// Record a chat line handed to broadcast
    pub fn message_relayed(&self) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
        counter!("chatrelay.messages.relayed").increment(1);
    }

    /// Record a quit command
    pub fn quit_command(&self) {
        self.quit_commands.fetch_add(1, Ordering::Relaxed);
        counter!("chatrelay.commands.quit").increment(1);
    }

    /// Record one successful write to a recipient
    pub fn delivered(&self, bytes: usize) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        counter!("chatrelay.deliveries").increment(1);
    }

    /// Chat lines relayed since start
    pub fn messages_relayed(&self) -> u64 {
        self.messages_relayed.load(Ordering::Relaxed)
    }

    /// Successful recipient writes since start
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }

    // Errors

    /// Record a failed write to a recipient
    pub fn send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
        counter!("chatrelay.errors.send").increment(1);
    }

    /// Record a failed accept
    pub fn accept_error(&self) {
        self.accept_errors.fetch_add(1, Ordering::Relaxed);
        counter!("chatrelay.errors.accept").increment(1);
    }

    // Snapshot

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_admitted: self.sessions_admitted.load(Ordering::Relaxed),
            sessions_rejected: self.sessions_rejected.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_relayed: self.messages_relayed.load(Ordering::Relaxed),
            quit_commands: self.quit_commands.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            accept_errors: self.accept_errors.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

/// A snapshot of relay metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Sessions admitted since start
    pub sessions_admitted: u64,
    /// Connections declined because the table was full
    pub sessions_rejected: u64,
    /// Sessions closed since start
    pub sessions_closed: u64,
    /// Sessions currently in the table
    pub active_sessions: u64,
    /// Inbound reads carrying data
    pub messages_received: u64,
    /// Chat lines broadcast
    pub messages_relayed: u64,
    /// Quit commands received
    pub quit_commands: u64,
    /// Successful recipient writes
    pub deliveries: u64,
    /// Bytes read from sessions
    pub bytes_received: u64,
    /// Bytes written to sessions
    pub bytes_sent: u64,
    /// Failed recipient writes
    pub send_failures: u64,
    /// Failed accepts
    pub accept_errors: u64,
    /// Server uptime
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Average number of recipients per relayed line
    pub fn fan_out(&self) -> f64 {
        if self.messages_relayed == 0 {
            return 0.0;
        }
        self.deliveries as f64 / self.messages_relayed as f64
    }

    /// Calculate total error count
    pub fn total_errors(&self) -> u64 {
        self.send_failures + self.accept_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_tracking() {
        let metrics = RelayMetrics::new();
        assert_eq!(metrics.active_sessions(), 0);

        metrics.session_admitted();
        metrics.session_admitted();
        metrics.session_rejected();
        assert_eq!(metrics.active_sessions(), 2);
        assert_eq!(metrics.sessions_admitted(), 2);
        assert_eq!(metrics.sessions_rejected(), 1);

        metrics.session_closed();
        assert_eq!(metrics.active_sessions(), 1);
        assert_eq!(metrics.sessions_closed(), 1);
    }

    #[test]
    fn test_traffic_tracking() {
        let metrics = RelayMetrics::new();

        metrics.chunk_received(6);
        metrics.message_relayed();
        metrics.delivered(14);
        metrics.delivered(14);
        metrics.send_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_received, 1);
        assert_eq!(snapshot.bytes_received, 6);
        assert_eq!(snapshot.deliveries, 2);
        assert_eq!(snapshot.bytes_sent, 28);
        assert_eq!(snapshot.fan_out(), 2.0);
        assert_eq!(snapshot.total_errors(), 1);
    }

    #[test]
    fn test_empty_fan_out() {
        let snapshot = RelayMetrics::new().snapshot();
        assert_eq!(snapshot.fan_out(), 0.0);
    }
}
