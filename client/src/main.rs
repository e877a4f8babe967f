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

//! Chat relay client binary
//!
//! ## Usage
//!
//! ```bash
//! chatrelay-client --host 127.0.0.1 --port 12345
//! ```

use chatrelay_client::{ChatClient, ClientConfig};
use chatrelay_protocol::DEFAULT_PORT;
use clap::Parser;
use std::process::ExitCode;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Terminal client for the chat relay
#[derive(Parser, Debug)]
#[command(name = "chatrelay-client")]
#[command(version, about)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logs go to stderr so they never interleave with the chat on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::new(args.host, args.port);
    let client = match ChatClient::connect(config).await {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect");
            return ExitCode::FAILURE;
        }
    };

    let result = client
        .run(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            tokio::io::stdout(),
        )
        .await;

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Chat session failed");
            ExitCode::FAILURE
        }
    }
}
