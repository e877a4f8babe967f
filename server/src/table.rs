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

//! Connection table
//!
//! A fixed number of slots, each holding at most one [`Session`]. The table
//! owns the [`IdentityAllocator`] so an identity is drawn only once a free
//! slot has been found: identities follow admission order and a rejected
//! connection never consumes one.
//!
//! The table is generic over the socket type so the dispatch loop can store
//! whatever it needs per session (the server keeps the stream and its armed
//! readiness wait) while tests can use plain values.

use crate::{IdentityAllocator, RelayError, SessionId, SessionInfo, SessionState};
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// One tracked client connection
#[derive(Debug)]
pub struct Session<S> {
    slot: usize,
    identity: SessionId,
    peer_addr: SocketAddr,
    connected_at: Instant,
    state: SessionState,
    socket: S,
}

impl<S> Session<S> {
    /// Slot index the session occupies
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Identity assigned at admission
    pub fn identity(&self) -> SessionId {
        self.identity
    }

    /// Remote address of the peer
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// When the session was admitted
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Lifecycle state: `Active` while in the table, `Closed` once removed
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal session transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Socket handle
    pub fn socket(&self) -> &S {
        &self.socket
    }

    /// Socket handle, mutably
    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    /// Release the socket handle
    pub fn into_socket(self) -> S {
        self.socket
    }

    /// Get a session info snapshot
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            slot: self.slot,
            identity: self.identity,
            peer_addr: self.peer_addr,
            connected_at: self.connected_at,
            state: self.state,
        }
    }
}

/// Slot and identity handed out by a successful [`ConnectionTable::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Slot the session was stored in
    pub slot: usize,
    /// Identity assigned to the session
    pub identity: SessionId,
}

/// Rejected insert holding the declined socket
///
/// Dropping it, or converting it into a [`RelayError`], closes the socket.
pub struct TableFull<S> {
    capacity: usize,
    _socket: S,
}

impl<S> TableFull<S> {
    /// Capacity of the table that declined the insert
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<S> fmt::Debug for TableFull<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFull")
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<S> From<TableFull<S>> for RelayError {
    fn from(full: TableFull<S>) -> Self {
        RelayError::TableFull(full.capacity())
    }
}

/// Fixed-capacity registry of active sessions
pub struct ConnectionTable<S> {
    slots: Vec<Option<Session<S>>>,
    allocator: IdentityAllocator,
    active: usize,
}

impl<S> ConnectionTable<S> {
    /// Create an empty table with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            allocator: IdentityAllocator::new(),
            active: 0,
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.active
    }

    /// Check whether no session is tracked
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Check whether every slot is occupied
    pub fn is_full(&self) -> bool {
        self.active == self.slots.len()
    }

    /// Sessions admitted since the table was created
    pub fn total_admitted(&self) -> u64 {
        self.allocator.issued()
    }

    /// Store a new session in the first empty slot
    ///
    /// Fails without drawing an identity when every slot is occupied.
    pub fn insert(
        &mut self,
        peer_addr: SocketAddr,
        socket: S,
    ) -> std::result::Result<Admission, TableFull<S>> {
        let Some(slot) = self.slots.iter().position(Option::is_none) else {
            return Err(TableFull {
                capacity: self.slots.len(),
                _socket: socket,
            });
        };

        let identity = self.allocator.next_identity();
        let mut session = Session {
            slot,
            identity,
            peer_addr,
            connected_at: Instant::now(),
            state: SessionState::Connecting,
            socket,
        };
        session.transition(SessionState::Active);
        self.slots[slot] = Some(session);
        self.active += 1;

        Ok(Admission { slot, identity })
    }

    /// Clear a slot, returning the session it held
    ///
    /// Clearing an empty or out-of-range slot is a no-op.
    pub fn remove(&mut self, slot: usize) -> Option<Session<S>> {
        let mut session = self.slots.get_mut(slot)?.take()?;
        session.transition(SessionState::Closed);
        self.active -= 1;
        Some(session)
    }

    /// Session in `slot`, if any
    pub fn get(&self, slot: usize) -> Option<&Session<S>> {
        self.slots.get(slot)?.as_ref()
    }

    /// Session in `slot`, if any, mutably
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Session<S>> {
        self.slots.get_mut(slot)?.as_mut()
    }

    /// Session in `slot` only if it still carries `identity`
    ///
    /// A slot may have been cleared and reused since a readiness event was
    /// produced for it; this filters such stale events.
    pub fn lookup(&self, slot: usize, identity: SessionId) -> Option<&Session<S>> {
        self.get(slot).filter(|session| session.identity == identity)
    }

    /// Iterate over active sessions in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Session<S>> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Call `f` for every active session in slot order
    pub fn for_each_active<F>(&self, f: F)
    where
        F: FnMut(&Session<S>),
    {
        self.iter().for_each(f)
    }

    /// Largest occupied slot index, the highest readiness handle tracked
    pub fn highest_slot(&self) -> Option<usize> {
        self.slots.iter().rposition(Option::is_some)
    }

    /// Snapshots of every active session
    pub fn infos(&self) -> Vec<SessionInfo> {
        self.iter().map(Session::info).collect()
    }
}

impl<S> fmt::Debug for ConnectionTable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTable")
            .field("capacity", &self.capacity())
            .field("active", &self.active)
            .field("next_identity", &self.allocator.peek())
            .finish()
    }
}
