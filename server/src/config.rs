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

//! Server configuration

use crate::{RelayError, Result};
pub use chatrelay_protocol::{DEFAULT_BUFFER_SIZE, DEFAULT_PORT};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default connection table capacity
pub const DEFAULT_MAX_CLIENTS: usize = 10;

/// Server configuration
///
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use chatrelay_server::ServerConfig;
///
/// let config = ServerConfig::default()
///     .with_port(4000)
///     .with_max_clients(2);
///
/// assert_eq!(config.bind_address.port(), 4000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listener to
    pub bind_address: SocketAddr,

    /// Capacity of the connection table
    ///
    /// The connection arriving while every slot is taken is accepted and
    /// immediately closed.
    pub max_clients: usize,

    /// Size of a single read from a session socket
    ///
    /// Longer lines arrive as several chunks and are relayed separately.
    pub buffer_size: usize,

    /// Listen backlog passed to the OS
    pub backlog: u32,

    /// Pause after a failed accept before waiting again
    pub accept_backoff: Duration,

    /// Set `SO_REUSEADDR` on the listening socket
    pub reuse_address: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_clients: DEFAULT_MAX_CLIENTS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            backlog: 128,
            accept_backoff: Duration::from_millis(100),
            reuse_address: true,
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given bind address
    ///
    /// All other settings will use their default values.
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Default::default()
        }
    }

    /// Keep the bind interface but listen on `port`
    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_address.set_port(port);
        self
    }

    /// Set the connection table capacity
    pub fn with_max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Set the bounded read size
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set the listen backlog
    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Set the pause after a failed accept
    pub fn with_accept_backoff(mut self, backoff: Duration) -> Self {
        self.accept_backoff = backoff;
        self
    }

    /// Enable or disable `SO_REUSEADDR`
    pub fn with_reuse_address(mut self, enabled: bool) -> Self {
        self.reuse_address = enabled;
        self
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_clients == 0 {
            return Err(RelayError::InvalidConfig(
                "max_clients must be greater than 0".to_string(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(RelayError::InvalidConfig(
                "buffer_size must be greater than 0".to_string(),
            ));
        }

        if self.backlog == 0 {
            return Err(RelayError::InvalidConfig(
                "backlog must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:12345".parse().unwrap());
        assert_eq!(config.max_clients, 10);
        assert_eq!(config.buffer_size, 1024);
        assert!(config.reuse_address);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap())
            .with_port(4000)
            .with_max_clients(2)
            .with_buffer_size(64)
            .with_backlog(3)
            .with_accept_backoff(Duration::from_millis(5));

        assert_eq!(config.bind_address, "127.0.0.1:4000".parse().unwrap());
        assert_eq!(config.max_clients, 2);
        assert_eq!(config.buffer_size, 64);
        assert_eq!(config.backlog, 3);
        assert_eq!(config.accept_backoff, Duration::from_millis(5));
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_ok());

        config.max_clients = 0;
        assert!(matches!(
            config.validate(),
            Err(RelayError::InvalidConfig(_))
        ));

        config.max_clients = 10;
        config.buffer_size = 0;
        assert!(config.validate().is_err());

        config.buffer_size = 1024;
        config.backlog = 0;
        assert!(config.validate().is_err());
    }
}
