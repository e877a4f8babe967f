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

//! Chat Relay Server
//!
//! A minimal multi-client text chat relay. Every accepted TCP connection is
//! given an identity; each chunk of text read from one client is prefixed
//! with `User <id>: ` and written to every other client. The literal line
//! `quit` ends a session and is never relayed.
//!
//! # Architecture
//!
//! A single dispatch loop owns all state and is the only place that waits
//! for I/O:
//!
//! ```text
//! RelayServer
//!     ↓
//! EventMultiplexer (listener + one armed readiness wait per session)
//!     ↓
//! accept ──→ ConnectionTable (slots + IdentityAllocator)
//! relay ───→ broadcast to every other session
//! disconnect → clear slot, release socket
//! ```
//!
//! Handlers run to completion before the next wait, so the connection table
//! is never touched concurrently. Broadcast writes are awaited inline: a
//! recipient whose send buffer is full holds up the whole loop until it
//! drains. There is no backpressure and no reassembly of lines longer than
//! the read buffer.
//!
//! # Example
//!
//! ```no_run
//! use chatrelay_server::{RelayServer, ServerConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default().with_port(12345).with_max_clients(10);
//!     let server = RelayServer::bind(config).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod identity;
mod metrics;
mod multiplexer;
pub mod relay;
mod server;
mod table;
mod types;

pub use config::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_CLIENTS, DEFAULT_PORT, ServerConfig};
pub use error::{RelayError, Result};
pub use identity::IdentityAllocator;
pub use metrics::{MetricsSnapshot, RelayMetrics};
pub use multiplexer::{Armed, EventMultiplexer, Readiness, SessionReady};
pub use relay::{BroadcastResult, Inbound, QUIT_TOKEN};
pub use server::{Endpoint, RelayServer};
pub use table::{Admission, ConnectionTable, Session, TableFull};
pub use types::{DisconnectReason, ServerSnapshot, SessionId, SessionInfo, SessionState};
