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

//! Property tests for connection table invariants

use chatrelay_server::{ConnectionTable, SessionId};
use proptest::prelude::*;
use std::collections::HashSet;
use std::net::SocketAddr;

#[derive(Debug, Clone)]
enum Op {
    Connect,
    Disconnect(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Connect),
        2 => (0usize..16).prop_map(Op::Disconnect),
    ]
}

fn peer() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40000))
}

proptest! {
    #[test]
    fn table_never_exceeds_capacity(capacity in 1usize..8, ops in prop::collection::vec(op(), 0..200)) {
        let mut table = ConnectionTable::new(capacity);

        for op in ops {
            match op {
                Op::Connect => {
                    let was_full = table.is_full();
                    let inserted = table.insert(peer(), ()).is_ok();
                    prop_assert_eq!(inserted, !was_full);
                }
                Op::Disconnect(slot) => {
                    table.remove(slot % capacity);
                }
            }

            prop_assert!(table.len() <= capacity);
            prop_assert_eq!(table.iter().count(), table.len());

            let identities: HashSet<SessionId> = table.iter().map(|s| s.identity()).collect();
            prop_assert_eq!(identities.len(), table.len());
        }
    }

    #[test]
    fn identities_follow_admission_order(capacity in 1usize..8, ops in prop::collection::vec(op(), 0..200)) {
        let mut table = ConnectionTable::new(capacity);
        let mut last = 0u64;
        let mut admitted = 0u64;

        for op in ops {
            match op {
                Op::Connect => {
                    if let Ok(admission) = table.insert(peer(), ()) {
                        admitted += 1;
                        prop_assert!(admission.identity.as_u64() > last);
                        prop_assert_eq!(admission.identity.as_u64(), admitted);
                        last = admission.identity.as_u64();
                    }
                }
                Op::Disconnect(slot) => {
                    table.remove(slot % capacity);
                }
            }
        }

        prop_assert_eq!(table.total_admitted(), admitted);
    }

    #[test]
    fn freed_slot_is_reused(capacity in 1usize..8, victim in 0usize..8) {
        let mut table = ConnectionTable::new(capacity);
        for _ in 0..capacity {
            table.insert(peer(), ()).unwrap();
        }
        prop_assert!(table.is_full());

        let victim = victim % capacity;
        let removed = table.remove(victim).unwrap();
        let admission = table.insert(peer(), ()).unwrap();

        prop_assert_eq!(admission.slot, victim);
        prop_assert!(admission.identity > removed.identity());
        prop_assert_eq!(table.highest_slot(), Some(capacity - 1));
    }
}
