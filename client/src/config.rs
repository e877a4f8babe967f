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

//! Client configuration

use crate::{ClientError, Result};
use chatrelay_protocol::{DEFAULT_BUFFER_SIZE, DEFAULT_PORT};
use std::time::Duration;

/// Prompt shown before every line of input
pub const DEFAULT_PROMPT: &str = "Enter a message or quit to exit: ";

/// Client configuration
///
/// # Example
///
/// ```
/// use chatrelay_client::ClientConfig;
///
/// let config = ClientConfig::new("127.0.0.1", 12345).with_prompt("> ");
/// assert_eq!(config.address(), "127.0.0.1:12345");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IP address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Capacity of the receive buffer
    pub buffer_size: usize,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Prompt printed before reading a line
    pub prompt: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            connect_timeout: Duration::from_secs(10),
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration with the given host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the receive buffer capacity
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the input prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Get the server address as a string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(ClientError::InvalidConfig("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ClientError::InvalidConfig("port must not be 0".into()));
        }
        if self.buffer_size == 0 {
            return Err(ClientError::InvalidConfig(
                "buffer_size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
