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

//! Chat client
//!
//! Two independent halves share one connection: a spawned receiver that
//! prints whatever the server broadcasts, and the sender loop that reads
//! lines from the user and writes them unchanged to the socket. Neither half
//! touches the other's direction, so they need no synchronisation.

use crate::{ClientConfig, ClientError, Result};
use bytes::{BufMut, BytesMut};
use chatrelay_protocol::is_quit;
use futures::StreamExt;
use std::net::SocketAddr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{debug, info};

/// Printed when the user leaves with `quit`
pub const FAREWELL: &str = "You left the chat.\n";

/// How the sender loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed `quit`
    Quit,
    /// The input stream ended
    InputClosed,
}

/// Connected chat client
#[derive(Debug)]
pub struct ChatClient {
    config: ClientConfig,
    stream: TcpStream,
    server_addr: SocketAddr,
}

impl ChatClient {
    /// Connect to the configured server
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let stream = timeout(config.connect_timeout, TcpStream::connect(config.address()))
            .await
            .map_err(|_| ClientError::ConnectTimeout)??;
        let server_addr = stream.peer_addr()?;
        info!(server = %server_addr, "Connected");

        Ok(Self {
            config,
            stream,
            server_addr,
        })
    }

    /// Address of the server this client is connected to
    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Local address of the connection
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.local_addr()?)
    }

    /// Run the chat session until the user quits or input ends
    ///
    /// Prompts and the farewell go to `console`; broadcasts are written to
    /// `messages` by the receiver task, which is abandoned when this returns.
    pub async fn run<I, C, M>(self, mut input: I, mut console: C, messages: M) -> Result<SessionEnd>
    where
        I: AsyncBufRead + Unpin,
        C: AsyncWrite + Unpin,
        M: AsyncWrite + Unpin + Send + 'static,
    {
        let (reader, mut writer) = self.stream.into_split();
        let receiver = tokio::spawn(receive(
            reader,
            messages,
            self.config.prompt.clone(),
            self.config.buffer_size,
        ));

        console
            .write_all(format!("Connected to server {}\n", self.server_addr).as_bytes())
            .await?;

        let mut line = Vec::with_capacity(self.config.buffer_size);
        let end = loop {
            console.write_all(self.config.prompt.as_bytes()).await?;
            console.flush().await?;

            line.clear();
            if input.read_until(b'\n', &mut line).await? == 0 {
                break SessionEnd::InputClosed;
            }

            if is_quit(&line) {
                console.write_all(FAREWELL.as_bytes()).await?;
                console.flush().await?;
                break SessionEnd::Quit;
            }

            writer.write_all(&line).await?;
        };

        receiver.abort();
        if let Err(e) = writer.shutdown().await {
            debug!(error = %e, "Shutdown after session end failed");
        }
        info!(?end, "Session ended");

        Ok(end)
    }
}

/// Print every chunk the server sends until the connection ends
async fn receive<R, M>(reader: R, mut messages: M, prompt: String, capacity: usize)
where
    R: AsyncRead + Unpin,
    M: AsyncWrite + Unpin,
{
    let mut frames = FramedRead::with_capacity(reader, BytesCodec::new(), capacity);

    while let Some(frame) = frames.next().await {
        let chunk = match frame {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!(error = %e, "Receive failed");
                break;
            }
        };

        let mut text = BytesMut::with_capacity(chunk.len() + prompt.len() + 2);
        text.put_u8(b'\n');
        text.put_slice(&chunk);
        text.put_u8(b'\n');
        text.put_slice(prompt.as_bytes());

        if messages.write_all(&text).await.is_err() || messages.flush().await.is_err() {
            break;
        }
    }

    debug!("Receiver stopped");
}
