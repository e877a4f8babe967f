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

//! Relay behaviour and error recovery over real sockets

use chatrelay_server::{MetricsSnapshot, RelayMetrics, RelayServer, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

async fn start_server(config: ServerConfig) -> (SocketAddr, Arc<RelayMetrics>, JoinHandle<()>) {
    let server = RelayServer::bind(config).await.unwrap();
    let addr = server.local_addr();
    let metrics = server.metrics();
    let handle = tokio::spawn(server.run());
    (addr, metrics, handle)
}

fn local_config(max_clients: usize) -> ServerConfig {
    ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_max_clients(max_clients)
}

async fn wait_until<F>(metrics: &RelayMetrics, condition: F)
where
    F: Fn(&MetricsSnapshot) -> bool,
{
    timeout(Duration::from_secs(5), async {
        while !condition(&metrics.snapshot()) {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn connect(addr: SocketAddr, metrics: &RelayMetrics) -> TcpStream {
    let admitted = metrics.sessions_admitted();
    let stream = TcpStream::connect(addr).await.unwrap();
    wait_until(metrics, |s| s.sessions_admitted > admitted).await;
    stream
}

async fn read_exactly(stream: &mut TcpStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("read timed out")
        .unwrap();
    buf
}

async fn assert_silent(stream: &mut TcpStream) {
    let mut buf = [0u8; 64];
    let read = timeout(Duration::from_millis(200), stream.read(&mut buf)).await;
    assert!(read.is_err(), "unexpected data: {:?}", read);
}

#[tokio::test]
async fn test_sender_does_not_receive_own_message() {
    let (addr, metrics, server) = start_server(local_config(4)).await;

    let mut a = connect(addr, &metrics).await;
    let mut b = connect(addr, &metrics).await;
    let mut c = connect(addr, &metrics).await;

    a.write_all(b"hello\n").await.unwrap();
    assert_eq!(read_exactly(&mut b, 14).await, b"User 1: hello\n");
    assert_eq!(read_exactly(&mut c, 14).await, b"User 1: hello\n");
    assert_silent(&mut a).await;

    wait_until(&metrics, |s| s.deliveries == 2).await;
    server.abort();
}

#[tokio::test]
async fn test_message_without_newline_is_relayed_verbatim() {
    let (addr, metrics, server) = start_server(local_config(2)).await;

    let mut a = connect(addr, &metrics).await;
    let mut b = connect(addr, &metrics).await;

    a.write_all(b"no newline").await.unwrap();
    assert_eq!(read_exactly(&mut b, 18).await, b"User 1: no newline");

    server.abort();
}

#[tokio::test]
async fn test_long_line_is_relayed_in_chunks() {
    let (addr, metrics, server) = start_server(local_config(2).with_buffer_size(8)).await;

    let mut a = connect(addr, &metrics).await;
    let mut b = connect(addr, &metrics).await;

    a.write_all(b"abcdefghijkl\n").await.unwrap();
    let expected = b"User 1: abcdefghUser 1: ijkl\n";
    assert_eq!(read_exactly(&mut b, expected.len()).await, expected);

    wait_until(&metrics, |s| s.messages_relayed == 2).await;
    server.abort();
}

#[tokio::test]
async fn test_abrupt_client_disconnect() {
    let (addr, metrics, server) = start_server(local_config(2)).await;

    {
        let _client = connect(addr, &metrics).await;
        // Client drops here without sending quit
    }

    wait_until(&metrics, |s| s.sessions_closed == 1 && s.active_sessions == 0).await;
    server.abort();
}

#[tokio::test]
async fn test_reset_peer_is_released() {
    let (addr, metrics, server) = start_server(local_config(2)).await;

    // Zero linger makes the drop send RST instead of FIN
    let socket = TcpSocket::new_v4().unwrap();
    socket.set_linger(Some(Duration::ZERO)).unwrap();
    let reset = socket.connect(addr).await.unwrap();
    wait_until(&metrics, |s| s.sessions_admitted == 1).await;
    let mut b = connect(addr, &metrics).await;

    drop(reset);
    wait_until(&metrics, |s| s.sessions_closed == 1 && s.active_sessions == 1).await;

    let mut c = connect(addr, &metrics).await;
    assert_eq!(metrics.sessions_rejected(), 0);

    c.write_all(b"x\n").await.unwrap();
    assert_eq!(read_exactly(&mut b, 10).await, b"User 3: x\n");
    b.write_all(b"y\n").await.unwrap();
    assert_eq!(read_exactly(&mut c, 10).await, b"User 2: y\n");

    server.abort();
}

#[tokio::test]
async fn test_multiple_rapid_disconnects() {
    let (addr, metrics, server) = start_server(local_config(10)).await;

    for _ in 0..10 {
        let client = connect(addr, &metrics).await;
        drop(client);
    }

    wait_until(&metrics, |s| s.sessions_closed == 10).await;
    let survivor = connect(addr, &metrics).await;
    assert_eq!(metrics.active_sessions(), 1);

    drop(survivor);
    server.abort();
}

#[tokio::test]
async fn test_quit_closes_only_the_sender() {
    let (addr, metrics, server) = start_server(local_config(3)).await;

    let mut a = connect(addr, &metrics).await;
    let mut b = connect(addr, &metrics).await;

    a.write_all(b"quit\n").await.unwrap();
    wait_until(&metrics, |s| s.quit_commands == 1 && s.active_sessions == 1).await;

    let mut buf = [0u8; 16];
    let read = timeout(Duration::from_secs(5), a.read(&mut buf)).await.unwrap();
    assert!(matches!(read, Ok(0) | Err(_)));
    assert_silent(&mut b).await;
    assert_eq!(metrics.snapshot().messages_relayed, 0);

    server.abort();
}

#[tokio::test]
async fn test_quit_without_newline() {
    let (addr, metrics, server) = start_server(local_config(2)).await;

    let mut a = connect(addr, &metrics).await;
    let mut b = connect(addr, &metrics).await;

    a.write_all(b"quit").await.unwrap();
    wait_until(&metrics, |s| s.quit_commands == 1).await;
    assert_silent(&mut b).await;

    server.abort();
}

#[tokio::test]
async fn test_dead_recipient_does_not_block_others() {
    let (addr, metrics, server) = start_server(local_config(3)).await;

    let mut a = connect(addr, &metrics).await;
    let b = connect(addr, &metrics).await;
    let mut c = connect(addr, &metrics).await;

    drop(b);
    a.write_all(b"still here\n").await.unwrap();
    assert_eq!(read_exactly(&mut c, 19).await, b"User 1: still here\n");

    wait_until(&metrics, |s| s.active_sessions == 2).await;
    server.abort();
}

#[tokio::test]
async fn test_full_table_recovers_after_disconnect() {
    let (addr, metrics, server) = start_server(local_config(1)).await;

    let a = connect(addr, &metrics).await;

    let mut rejected = TcpStream::connect(addr).await.unwrap();
    wait_until(&metrics, |s| s.sessions_rejected == 1).await;
    let mut buf = [0u8; 16];
    let read = timeout(Duration::from_secs(5), rejected.read(&mut buf))
        .await
        .unwrap();
    assert!(matches!(read, Ok(0) | Err(_)));

    drop(a);
    wait_until(&metrics, |s| s.active_sessions == 0).await;

    let _b = connect(addr, &metrics).await;
    assert_eq!(metrics.sessions_admitted(), 2);

    server.abort();
}

#[tokio::test]
async fn test_run_until_stops_loop() {
    let server = RelayServer::bind(local_config(2)).await.unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_until(async {
        let _ = rx.await;
    }));

    tx.send(()).unwrap();
    timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop did not stop")
        .unwrap();
}
