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

//! Core types for the chat relay

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Identity assigned to a session at admission (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new session identity
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user-{}", self.0)
    }
}

/// Session lifecycle
///
/// `Connecting -> Active -> Closed`, with no way back from `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted by the listener, not yet placed in a slot
    Connecting,
    /// Tracked by the connection table and armed for readiness
    Active,
    /// Removed from the table, socket released
    Closed,
}

impl SessionState {
    /// Check if the session is in its terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Check whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Active)
                | (Self::Connecting, Self::Closed)
                | (Self::Active, Self::Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Active => write!(f, "active"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Why a session left the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Peer closed its side (zero-length read)
    Eof,
    /// Read or readiness failure
    ReadError,
    /// Peer sent the quit token
    Quit,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eof => write!(f, "eof"),
            Self::ReadError => write!(f, "read error"),
            Self::Quit => write!(f, "quit"),
        }
    }
}

/// Session information snapshot
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Slot the session occupies
    pub slot: usize,
    /// Session identity
    pub identity: SessionId,
    /// Remote address
    pub peer_addr: SocketAddr,
    /// When the session was admitted
    pub connected_at: Instant,
    /// Lifecycle state
    pub state: SessionState,
}

impl SessionInfo {
    /// Get the session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Number of active sessions
    pub active_sessions: usize,
    /// Connection table capacity
    pub capacity: usize,
    /// Sessions admitted since server start
    pub total_admitted: u64,
    /// Server bind address
    pub bind_address: SocketAddr,
    /// Server uptime
    pub uptime: Duration,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RelayServer {{ active: {}/{}, admitted: {}, addr: {}, uptime: {:?} }}",
            self.active_sessions, self.capacity, self.total_admitted, self.bind_address, self.uptime
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id() {
        let id1 = SessionId::new(1);
        let id2 = SessionId::new(2);

        assert_eq!(id1.as_u64(), 1);
        assert_ne!(id1, id2);
        assert!(id1 < id2);
        assert_eq!(id2.to_string(), "user-2");
    }

    #[test]
    fn test_session_state_transitions() {
        assert!(SessionState::Connecting.can_transition_to(SessionState::Active));
        assert!(SessionState::Connecting.can_transition_to(SessionState::Closed));
        assert!(SessionState::Active.can_transition_to(SessionState::Closed));
        assert!(!SessionState::Closed.can_transition_to(SessionState::Active));
        assert!(!SessionState::Active.can_transition_to(SessionState::Connecting));
    }

    #[test]
    fn test_session_state_terminal() {
        assert!(!SessionState::Connecting.is_terminal());
        assert!(!SessionState::Active.is_terminal());
        assert!(SessionState::Closed.is_terminal());
    }

    #[test]
    fn test_snapshot_display() {
        let snapshot = ServerSnapshot {
            active_sessions: 2,
            capacity: 10,
            total_admitted: 5,
            bind_address: "127.0.0.1:12345".parse().unwrap(),
            uptime: Duration::from_secs(1),
        };
        assert_eq!(
            snapshot.to_string(),
            "RelayServer { active: 2/10, admitted: 5, addr: 127.0.0.1:12345, uptime: 1s }"
        );
    }
}
