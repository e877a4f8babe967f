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

//! Chat Relay Client
//!
//! Connects to a chat relay server, prints every broadcast it receives and
//! sends each line the user types. Typing `quit` leaves the chat; the token
//! itself is never sent, the server sees the connection close instead.
//!
//! # Example
//!
//! ```no_run
//! use chatrelay_client::{ChatClient, ClientConfig};
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ChatClient::connect(ClientConfig::new("127.0.0.1", 12345)).await?;
//!     client
//!         .run(
//!             BufReader::new(tokio::io::stdin()),
//!             tokio::io::stdout(),
//!             tokio::io::stdout(),
//!         )
//!         .await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;

pub use client::{ChatClient, FAREWELL, SessionEnd};
pub use config::{ClientConfig, DEFAULT_PROMPT};
pub use error::{ClientError, Result};
