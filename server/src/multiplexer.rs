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

//! Event multiplexer
//!
//! The single place where the server waits for I/O. It tracks the listener
//! and one armed readiness wait per active session, and yields exactly one
//! [`Readiness`] per call to [`EventMultiplexer::wait`].
//!
//! A session's wait is one-shot: once it fires, the dispatcher reads from
//! the session and re-arms it if the session is still active. Disarming
//! aborts the pending wait so it releases its handle on the stream.
//!
//! After a failed accept the listener can be paused for a while. Session
//! waits keep firing during the pause.

use crate::SessionId;
use futures::future::{AbortHandle, Abortable, BoxFuture, abortable};
use futures::stream::{FuturesUnordered, StreamExt};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, sleep_until};

/// Readiness reported for one armed session
#[derive(Debug)]
pub struct SessionReady {
    /// Slot the session occupied when it was armed
    pub slot: usize,
    /// Identity of the session that was armed
    pub identity: SessionId,
    /// Outcome of the readiness wait
    pub result: io::Result<()>,
}

/// One event out of the multiplexer
#[derive(Debug)]
pub enum Readiness {
    /// The listener produced a connection (or an accept error)
    Listener(io::Result<(TcpStream, SocketAddr)>),
    /// A session socket is readable (or failed)
    Session(SessionReady),
}

/// Handle to a session's armed wait; dropping it does not disarm
#[derive(Debug, Clone)]
pub struct Armed {
    abort: AbortHandle,
}

impl Armed {
    /// Cancel the pending wait
    pub fn disarm(&self) {
        self.abort.abort();
    }

    /// Check whether the wait was cancelled
    pub fn is_disarmed(&self) -> bool {
        self.abort.is_aborted()
    }
}

/// Readiness multiplexer over the listener and all session sockets
pub struct EventMultiplexer {
    listener: TcpListener,
    listener_paused_until: Option<Instant>,
    pending: FuturesUnordered<Abortable<BoxFuture<'static, SessionReady>>>,
}

impl EventMultiplexer {
    /// Wrap a bound listener
    pub fn new(listener: TcpListener) -> Self {
        Self {
            listener,
            listener_paused_until: None,
            pending: FuturesUnordered::new(),
        }
    }

    /// Local address of the listener
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of armed or not yet collected session waits
    pub fn tracked(&self) -> usize {
        self.pending.len()
    }

    /// Stop accepting for `backoff`
    pub fn pause_listener(&mut self, backoff: Duration) {
        self.listener_paused_until = Some(Instant::now() + backoff);
    }

    /// Check whether accepting is currently paused
    pub fn is_listener_paused(&self) -> bool {
        self.listener_paused_until
            .is_some_and(|deadline| deadline > Instant::now())
    }

    /// Arm a readiness wait for a session
    pub fn arm(&mut self, slot: usize, identity: SessionId, stream: Arc<TcpStream>) -> Armed {
        let wait: BoxFuture<'static, SessionReady> = Box::pin(async move {
            let result = stream.readable().await;
            SessionReady {
                slot,
                identity,
                result,
            }
        });
        let (wait, abort) = abortable(wait);
        self.pending.push(wait);
        Armed { abort }
    }

    /// Block until the listener or an armed session is ready
    ///
    /// Disarmed waits are collected here and never surface. While the
    /// listener is paused only session waits can fire.
    pub async fn wait(&mut self) -> Readiness {
        loop {
            if !self.is_listener_paused() {
                self.listener_paused_until = None;
            }
            let paused_until = self.listener_paused_until;
            let resume_at = paused_until.unwrap_or_else(Instant::now);

            let readiness = tokio::select! {
                accepted = self.listener.accept(), if paused_until.is_none() => {
                    Some(Readiness::Listener(accepted))
                }
                _ = sleep_until(resume_at), if paused_until.is_some() => None,
                Some(ready) = self.pending.next(), if !self.pending.is_empty() => {
                    ready.ok().map(Readiness::Session)
                }
            };

            if let Some(readiness) = readiness {
                return readiness;
            }
        }
    }
}

impl std::fmt::Debug for EventMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventMultiplexer")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("tracked", &self.tracked())
            .field("listener_paused", &self.is_listener_paused())
            .finish()
    }
}
