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

//! Relay server
//!
//! [`RelayServer`] owns every piece of relay state: the multiplexer, the
//! connection table and the read buffer. One call to
//! [`turn`](RelayServer::turn) waits for a single readiness event and runs
//! its handler to completion; [`run`](RelayServer::run) repeats that
//! forever. Nothing is shared with other tasks except the metrics counters,
//! so the table needs no locking.

use crate::relay::{self, Inbound};
use crate::{
    Admission, Armed, ConnectionTable, DisconnectReason, EventMultiplexer, Readiness,
    RelayError, RelayMetrics, Result, ServerConfig, ServerSnapshot, SessionId, SessionInfo,
    SessionReady,
};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, info, warn};

/// Per-session socket state kept in the connection table
#[derive(Debug)]
pub struct Endpoint {
    stream: Arc<TcpStream>,
    armed: Option<Armed>,
}

impl Endpoint {
    fn new(stream: TcpStream) -> Self {
        Self {
            stream: Arc::new(stream),
            armed: None,
        }
    }

    /// The session's stream
    pub fn stream(&self) -> &Arc<TcpStream> {
        &self.stream
    }

    /// Check whether a readiness wait is pending for this session
    pub fn is_armed(&self) -> bool {
        self.armed.as_ref().is_some_and(|armed| !armed.is_disarmed())
    }
}

/// Chat relay server
///
/// # Example
///
/// ```no_run
/// use chatrelay_server::{RelayServer, ServerConfig};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = RelayServer::bind(ServerConfig::default()).await?;
///     server
///         .run_until(async {
///             let _ = tokio::signal::ctrl_c().await;
///         })
///         .await;
///     Ok(())
/// }
/// ```
pub struct RelayServer {
    config: ServerConfig,
    multiplexer: EventMultiplexer,
    table: ConnectionTable<Endpoint>,
    metrics: Arc<RelayMetrics>,
    buffer: Vec<u8>,
    bind_address: SocketAddr,
    started_at: Instant,
}

impl RelayServer {
    /// Validate the configuration and bind the listener
    ///
    /// Errors here are setup failures; the caller is expected to abort.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;

        let listener = listen(&config).map_err(|source| RelayError::Bind {
            address: config.bind_address,
            source,
        })?;
        let multiplexer = EventMultiplexer::new(listener);
        let bind_address = multiplexer.local_addr()?;

        info!(
            address = %bind_address,
            max_clients = config.max_clients,
            "Chat relay listening"
        );

        Ok(Self {
            table: ConnectionTable::new(config.max_clients),
            buffer: vec![0u8; config.buffer_size],
            multiplexer,
            metrics: Arc::new(RelayMetrics::new()),
            bind_address,
            started_at: Instant::now(),
            config,
        })
    }

    /// Run the dispatch loop forever
    pub async fn run(self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run the dispatch loop until `shutdown` resolves
    ///
    /// Sessions are dropped, not drained, when the loop stops.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future,
    {
        tokio::pin!(shutdown);
        loop {
            let readiness = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                readiness = self.multiplexer.wait() => readiness,
            };
            self.dispatch(readiness).await;
        }
        let totals = self.metrics.snapshot();
        info!(
            active = self.table.len(),
            admitted = totals.sessions_admitted,
            relayed = totals.messages_relayed,
            fan_out = totals.fan_out(),
            errors = totals.total_errors(),
            "Chat relay stopped"
        );
    }

    /// Wait for one readiness event and handle it
    pub async fn turn(&mut self) {
        let readiness = self.multiplexer.wait().await;
        self.dispatch(readiness).await;
    }

    async fn dispatch(&mut self, readiness: Readiness) {
        match readiness {
            Readiness::Listener(Ok((stream, peer_addr))) => self.accept(stream, peer_addr),
            Readiness::Listener(Err(e)) => {
                warn!(
                    error = %e,
                    backoff = ?self.config.accept_backoff,
                    "Failed to accept connection, pausing listener"
                );
                self.metrics.accept_error();
                self.multiplexer.pause_listener(self.config.accept_backoff);
            }
            Readiness::Session(ready) => self.on_session_ready(ready).await,
        }
    }

    /// Admit a freshly accepted connection, or close it when every slot is taken
    fn accept(&mut self, stream: TcpStream, peer_addr: SocketAddr) {
        match self.table.insert(peer_addr, Endpoint::new(stream)) {
            Ok(Admission { slot, identity }) => {
                self.arm(slot, identity);
                self.metrics.session_admitted();
                info!(
                    %identity,
                    slot,
                    ip = %peer_addr.ip(),
                    port = peer_addr.port(),
                    "New client connected"
                );
            }
            Err(full) => {
                // Converting drops the returned socket, closing the connection
                let reason = RelayError::from(full);
                info!(peer = %peer_addr, %reason, "Declining connection");
                self.metrics.session_rejected();
            }
        }
    }

    fn arm(&mut self, slot: usize, identity: SessionId) {
        if let Some(session) = self.table.get_mut(slot) {
            let stream = session.socket().stream.clone();
            session.socket_mut().armed = Some(self.multiplexer.arm(slot, identity, stream));
        }
    }

    /// Read one chunk from a ready session and act on it
    async fn on_session_ready(&mut self, ready: SessionReady) {
        let SessionReady {
            slot,
            identity,
            result,
        } = ready;

        let Some(stream) = self
            .table
            .lookup(slot, identity)
            .map(|session| session.socket().stream.clone())
        else {
            debug!(slot, %identity, "Ignoring readiness for departed session");
            return;
        };

        if let Err(e) = result {
            debug!(%identity, error = %e, "Readiness wait failed");
            self.disconnect(slot, DisconnectReason::ReadError);
            return;
        }

        let read = match stream.try_read(&mut self.buffer) {
            Ok(read) => read,
            Err(e) if is_spurious(&e) => {
                debug!(%identity, "Spurious readiness, re-arming");
                self.arm(slot, identity);
                return;
            }
            Err(e) => {
                debug!(%identity, error = %e, "Read failed");
                self.disconnect(slot, DisconnectReason::ReadError);
                return;
            }
        };

        match Inbound::classify(&self.buffer[..read]) {
            Inbound::Disconnect => self.disconnect(slot, DisconnectReason::Eof),
            Inbound::Quit => {
                self.metrics.chunk_received(read);
                self.metrics.quit_command();
                self.disconnect(slot, DisconnectReason::Quit);
            }
            Inbound::Chat(line) => {
                self.metrics.chunk_received(read);
                info!(%identity, line = %String::from_utf8_lossy(line).trim_end(), "User wrote");
                let message = relay::format_broadcast(identity, line);
                self.relay(slot, &message).await;
                self.arm(slot, identity);
            }
        }
    }

    /// Write `message` to every active session except the one in `sender_slot`
    async fn relay(&mut self, sender_slot: usize, message: &[u8]) {
        let recipients: Vec<_> = self
            .table
            .iter()
            .filter(|session| session.slot() != sender_slot)
            .map(|session| (session.identity(), session.socket().stream.clone()))
            .collect();

        self.metrics.message_relayed();
        let result = relay::broadcast(&recipients, message).await;
        for _ in 0..result.succeeded {
            self.metrics.delivered(message.len());
        }
        for (identity, kind) in &result.errors {
            debug!(%identity, ?kind, "Delivery failed, released on its next read");
            self.metrics.send_failure();
        }
        debug!(
            recipients = result.total,
            delivered = result.succeeded,
            "Broadcast complete"
        );
    }

    /// Remove a session from the table and release its socket
    fn disconnect(&mut self, slot: usize, reason: DisconnectReason) {
        let Some(session) = self.table.remove(slot) else {
            return;
        };

        let identity = session.identity();
        let state = session.state();
        let connected_for = session.info().duration();
        let endpoint = session.into_socket();
        if let Some(armed) = &endpoint.armed {
            armed.disarm();
        }
        drop(endpoint);

        self.metrics.session_closed();
        info!(
            %identity,
            slot,
            %reason,
            %state,
            ?connected_for,
            "User left the chat"
        );
    }

    /// Get the listener's bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.bind_address
    }

    /// Get the number of active sessions
    pub fn connection_count(&self) -> usize {
        self.table.len()
    }

    /// Get snapshots of all active sessions
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.table.infos()
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_sessions: self.table.len(),
            capacity: self.table.capacity(),
            total_admitted: self.table.total_admitted(),
            bind_address: self.bind_address,
            uptime: self.started_at.elapsed(),
        }
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        self.metrics.clone()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for RelayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayServer")
            .field("bind_address", &self.bind_address)
            .field("table", &self.table)
            .field("multiplexer", &self.multiplexer)
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

/// Create the listening socket described by `config`
fn listen(config: &ServerConfig) -> io::Result<TcpListener> {
    let socket = if config.bind_address.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(config.reuse_address)?;
    socket.bind(config.bind_address)?;
    socket.listen(config.backlog)
}

/// Readiness that turned out to have nothing behind it
fn is_spurious(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
