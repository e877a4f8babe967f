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

//! Session identity allocation

use crate::SessionId;

/// Issues session identities
///
/// Identities start at 1 and grow by one on every successful admission.
/// Disconnects never return an identity to the pool.
#[derive(Debug, Clone)]
pub struct IdentityAllocator {
    next: u64,
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityAllocator {
    /// Create an allocator whose first identity is 1
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Draw the next identity
    pub fn next_identity(&mut self) -> SessionId {
        let id = SessionId::new(self.next);
        self.next += 1;
        id
    }

    /// The identity the next call to [`next_identity`](Self::next_identity) returns
    pub fn peek(&self) -> SessionId {
        SessionId::new(self.next)
    }

    /// Number of identities issued so far
    pub fn issued(&self) -> u64 {
        self.next - 1
    }
}
