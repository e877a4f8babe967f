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

//! Error types for the chat relay server

use std::net::SocketAddr;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Relay server error types
#[derive(Debug, Error)]
pub enum RelayError {
    /// I/O error from a socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The listener could not be set up on the given address
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Requested bind address
        address: SocketAddr,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Every slot in the connection table is occupied
    #[error("Connection table full ({0} slots)")]
    TableFull(usize),
}

impl RelayError {
    /// Check if the error should abort the process
    ///
    /// Setup failures are fatal. A full table only declines one admission.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::Bind { .. } | RelayError::InvalidConfig(_))
    }
}
