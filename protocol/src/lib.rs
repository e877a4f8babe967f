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

//! Chat Relay Protocol
//!
//! The relay speaks plain text over TCP. Clients send lines; the server
//! sends each one to every other client prefixed with `User <id>: `. The
//! only control input is the quit token, which ends the sender's session and
//! is never relayed.

/// Port the server listens on and the client connects to by default
pub const DEFAULT_PORT: u16 = 12345;

/// Largest chunk handled by a single read
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Line that ends a session instead of being relayed
pub const QUIT_TOKEN: &[u8] = b"quit";

/// Check for `quit`, `quit\n` or `quit\r\n`
///
/// ```
/// use chatrelay_protocol::is_quit;
///
/// assert!(is_quit(b"quit\r\n"));
/// assert!(!is_quit(b"I quit\n"));
/// ```
pub fn is_quit(payload: &[u8]) -> bool {
    let line = payload
        .strip_suffix(b"\n")
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .unwrap_or(payload);
    line == QUIT_TOKEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_variants() {
        assert!(is_quit(b"quit"));
        assert!(is_quit(b"quit\n"));
        assert!(is_quit(b"quit\r\n"));
    }

    #[test]
    fn test_quit_must_match_exactly() {
        assert!(!is_quit(b"quit now\n"));
        assert!(!is_quit(b" quit\n"));
        assert!(!is_quit(b"QUIT\n"));
        assert!(!is_quit(b"quit\n\n"));
        assert!(!is_quit(b"quitquit"));
        assert!(!is_quit(b""));
    }
}
