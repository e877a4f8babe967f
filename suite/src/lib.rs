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

//! Shared harness for the end-to-end chat relay scenarios

use chatrelay_server::{RelayMetrics, RelayServer, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// How long any single scenario step may take
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// A relay server running on a background task
pub struct RunningServer {
    /// Address the server is listening on
    pub addr: SocketAddr,
    /// Live counters of the running server
    pub metrics: Arc<RelayMetrics>,
    handle: JoinHandle<()>,
}

impl RunningServer {
    /// Start a loopback server admitting at most `max_clients` sessions
    pub async fn start(max_clients: usize) -> Self {
        let config = ServerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)))
            .with_max_clients(max_clients);
        let server = RelayServer::bind(config).await.expect("bind relay server");
        let addr = server.local_addr();
        let metrics = server.metrics();
        let handle = tokio::spawn(server.run());
        Self {
            addr,
            metrics,
            handle,
        }
    }

    /// Connect a raw peer and wait until the server has admitted or declined it
    pub async fn join(&self) -> TcpStream {
        let seen = self.handled();
        let stream = TcpStream::connect(self.addr).await.expect("connect");
        self.wait_for(|m| handled(m) > seen).await;
        stream
    }

    /// Wait until `condition` holds for the server's metrics
    pub async fn wait_for<F>(&self, condition: F)
    where
        F: Fn(&RelayMetrics) -> bool,
    {
        timeout(STEP_TIMEOUT, async {
            while !condition(&self.metrics) {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("server did not reach the expected state");
    }

    fn handled(&self) -> u64 {
        handled(&self.metrics)
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn handled(metrics: &RelayMetrics) -> u64 {
    metrics.sessions_admitted() + metrics.sessions_rejected()
}

/// Send raw bytes from a peer
pub async fn say(stream: &mut TcpStream, bytes: &[u8]) {
    stream.write_all(bytes).await.expect("write");
}

/// Read exactly `expected.len()` bytes and compare
pub async fn expect_bytes(stream: &mut TcpStream, expected: &[u8]) {
    let mut buf = vec![0u8; expected.len()];
    timeout(STEP_TIMEOUT, stream.read_exact(&mut buf))
        .await
        .expect("read timed out")
        .expect("read");
    assert_eq!(
        String::from_utf8_lossy(&buf),
        String::from_utf8_lossy(expected)
    );
}

/// Assert the peer's connection has been closed by the server
pub async fn expect_closed(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    match timeout(STEP_TIMEOUT, stream.read(&mut buf)).await {
        Ok(Ok(0)) | Ok(Err(_)) => {}
        Ok(Ok(n)) => panic!("expected close, got {:?}", &buf[..n]),
        Err(_) => panic!("connection still open"),
    }
}

/// Assert nothing arrives on the peer for a short while
pub async fn expect_silence(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    let read = timeout(Duration::from_millis(200), stream.read(&mut buf)).await;
    assert!(read.is_err(), "unexpected data: {:?}", read);
}
