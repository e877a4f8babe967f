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

//! Chat relay server binary
//!
//! ## Usage
//!
//! ```bash
//! chatrelay-server --port 12345 --max-clients 10
//! ```
//!
//! Then connect with `chatrelay-client`, `nc` or `telnet`.

use chatrelay_server::{
    DEFAULT_BUFFER_SIZE, DEFAULT_MAX_CLIENTS, DEFAULT_PORT, RelayServer, ServerConfig,
};
use clap::Parser;
use std::net::IpAddr;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Multi-client TCP chat relay
#[derive(Parser, Debug)]
#[command(name = "chatrelay-server")]
#[command(version, about)]
struct Args {
    /// Interface to listen on
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Maximum concurrent sessions
    #[arg(short, long = "max-clients", default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,

    /// Size of a single read from a client
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Listen backlog
    #[arg(long, default_value_t = 128)]
    backlog: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = ServerConfig::new((args.bind, args.port).into())
        .with_max_clients(args.max_clients)
        .with_buffer_size(args.buffer_size)
        .with_backlog(args.backlog);

    let server = match RelayServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start chat relay");
            return ExitCode::FAILURE;
        }
    };

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    ExitCode::SUCCESS
}
