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

//! Message relay
//!
//! Classification of one inbound read and fan-out of a chat line to the
//! other sessions. Reads are never reassembled: a line longer than the read
//! buffer reaches the relay as several chunks, each classified and prefixed
//! on its own.

use crate::SessionId;
use bytes::{BufMut, Bytes, BytesMut};
pub use chatrelay_protocol::{QUIT_TOKEN, is_quit};
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;

/// Meaning of a single inbound read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// Zero-length read: the peer closed its side
    Disconnect,
    /// The quit token, with or without a line terminator
    Quit,
    /// Anything else, relayed verbatim
    Chat(&'a [u8]),
}

impl<'a> Inbound<'a> {
    /// Classify the bytes returned by one read
    pub fn classify(payload: &'a [u8]) -> Self {
        if payload.is_empty() {
            Inbound::Disconnect
        } else if is_quit(payload) {
            Inbound::Quit
        } else {
            Inbound::Chat(payload)
        }
    }
}

/// Build the broadcast copy of a chat chunk: `User <id>: <payload>`
///
/// The payload is kept byte for byte, including whatever line terminator
/// the client sent.
pub fn format_broadcast(identity: SessionId, payload: &[u8]) -> Bytes {
    let prefix = format!("User {}: ", identity.as_u64());
    let mut message = BytesMut::with_capacity(prefix.len() + payload.len());
    message.put_slice(prefix.as_bytes());
    message.put_slice(payload);
    message.freeze()
}

/// Result of a broadcast operation
#[derive(Debug, Clone, Default)]
pub struct BroadcastResult {
    /// Number of recipients attempted
    pub total: usize,
    /// Number of complete writes
    pub succeeded: usize,
    /// Number of failed writes
    pub failed: usize,
    /// Recipients whose write failed
    pub errors: Vec<(SessionId, io::ErrorKind)>,
}

impl BroadcastResult {
    /// Check if every recipient got the message
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Write the whole buffer to a shared stream
///
/// Waits for writability between partial writes, so a recipient with a full
/// send buffer holds up the caller until it drains.
pub async fn write_all(stream: &TcpStream, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        stream.writable().await?;
        match stream.try_write(buf) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Send `message` to every recipient in order
///
/// A failed write is recorded and skipped; it neither stops delivery to the
/// remaining recipients nor removes the failing session. That session finds
/// out on its own next readiness.
pub async fn broadcast(
    recipients: &[(SessionId, Arc<TcpStream>)],
    message: &[u8],
) -> BroadcastResult {
    let mut result = BroadcastResult {
        total: recipients.len(),
        ..Default::default()
    };

    for (identity, stream) in recipients {
        match write_all(stream, message).await {
            Ok(()) => result.succeeded += 1,
            Err(e) => {
                result.failed += 1;
                result.errors.push((*identity, e.kind()));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn create_test_connection() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client_task = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });

        let (server, _) = listener.accept().await.unwrap();
        let client = client_task.await.unwrap();

        (server, client)
    }

    #[test]
    fn test_classify() {
        assert_eq!(Inbound::classify(b""), Inbound::Disconnect);
        assert_eq!(Inbound::classify(b"quit"), Inbound::Quit);
        assert_eq!(Inbound::classify(b"quit\n"), Inbound::Quit);
        assert_eq!(Inbound::classify(b"quit\r\n"), Inbound::Quit);
        assert_eq!(Inbound::classify(b"hello\n"), Inbound::Chat(b"hello\n"));
    }

    #[test]
    fn test_quit_inside_a_line_is_chat() {
        assert_eq!(Inbound::classify(b"quit now\n"), Inbound::Chat(b"quit now\n"));
        assert_eq!(Inbound::classify(b"QUIT\n"), Inbound::Chat(b"QUIT\n"));
    }

    #[test]
    fn test_format_broadcast() {
        let message = format_broadcast(SessionId::new(1), b"hello\n");
        assert_eq!(&message[..], b"User 1: hello\n");

        let message = format_broadcast(SessionId::new(42), b"no newline");
        assert_eq!(&message[..], b"User 42: no newline");
    }

    #[test]
    fn test_format_broadcast_keeps_raw_bytes() {
        let message = format_broadcast(SessionId::new(7), &[0xff, 0x00, b'\n']);
        assert_eq!(&message[..], b"User 7: \xff\x00\n");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_recipient() {
        let (server_a, mut client_a) = create_test_connection().await;
        let (server_b, mut client_b) = create_test_connection().await;
        let recipients = vec![
            (SessionId::new(2), Arc::new(server_a)),
            (SessionId::new(3), Arc::new(server_b)),
        ];

        let message = format_broadcast(SessionId::new(1), b"hi\n");
        let result = broadcast(&recipients, &message).await;
        assert_eq!(result.total, 2);
        assert!(result.all_succeeded());

        for client in [&mut client_a, &mut client_b] {
            let mut buf = vec![0u8; message.len()];
            client.read_exact(&mut buf).await.unwrap();
            assert_eq!(buf, b"User 1: hi\n");
        }
    }

    #[tokio::test]
    async fn test_broadcast_with_no_recipients() {
        let result = broadcast(&[], b"User 1: alone\n").await;
        assert_eq!(result.total, 0);
        assert!(result.all_succeeded());
    }
}
