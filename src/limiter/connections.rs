use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use super::slot::SlotResult;

/// Tracks the live streaming connections per client identifier and caps
/// how many may be open at once.
///
/// The member set is the single source of truth - the count reported in
/// `SlotResult` is always its size, so acquire/release can never drift
/// out of sync with it. Connection slots have no natural reset clock,
/// so rejections carry a fixed retry-after ceiling instead.
pub struct ConnectionGate {
    sets: DashMap<String, HashSet<String>>,
    retry_ceiling_secs: u64,
}

impl ConnectionGate {
    pub fn new(retry_ceiling_secs: u64) -> Self {
        Self {
            sets: DashMap::new(),
            retry_ceiling_secs,
        }
    }

    /// Claim a streaming slot for `(identifier, connection_id)`.
    ///
    /// Acquiring a connection id that is already held succeeds without
    /// double counting, so retried calls are safe.
    pub fn acquire(&self, identifier: &str, connection_id: &str, max_connections: u32) -> SlotResult {
        debug_assert!(!identifier.is_empty());
        debug_assert!(max_connections >= 1);

        let reset_at = Utc::now().timestamp_millis() + (self.retry_ceiling_secs as i64) * 1000;

        match self.sets.entry(identifier.to_owned()) {
            Entry::Vacant(vacant) => {
                let mut members = HashSet::new();
                members.insert(connection_id.to_owned());
                vacant.insert(members);
                SlotResult::granted(max_connections, max_connections - 1, reset_at)
            }
            Entry::Occupied(mut occupied) => {
                let members = occupied.get_mut();
                if members.contains(connection_id) {
                    let remaining = max_connections.saturating_sub(members.len() as u32);
                    return SlotResult::granted(max_connections, remaining, reset_at);
                }
                if members.len() as u32 >= max_connections {
                    warn!(
                        identifier,
                        active = members.len(),
                        max_connections,
                        "connection limit exceeded"
                    );
                    return SlotResult::denied(max_connections, reset_at, self.retry_ceiling_secs);
                }
                members.insert(connection_id.to_owned());
                let remaining = max_connections - members.len() as u32;
                SlotResult::granted(max_connections, remaining, reset_at)
            }
        }
    }

    /// Give a slot back. Releasing an unknown connection id is a no-op,
    /// so a success path and an error handler racing to release the same
    /// slot cannot drive the count negative.
    pub fn release(&self, identifier: &str, connection_id: &str) {
        if let Some(mut members) = self.sets.get_mut(identifier) {
            members.remove(connection_id);
        }
        // empty sets are left for the sweeper
    }

    /// Live slot count for one identifier.
    pub fn active(&self, identifier: &str) -> usize {
        self.sets.get(identifier).map(|m| m.len()).unwrap_or(0)
    }

    /// Drop identifiers with no live connections. Sweeper-only; takes
    /// the same shard locks as `acquire`, so an identifier mid-acquire
    /// cannot be evicted from under it.
    pub fn evict_empty(&self) -> usize {
        // counted inside the closure: acquires for fresh identifiers can
        // land mid-retain, so two len() reads would not agree
        let mut evicted = 0;
        self.sets.retain(|_, members| {
            let live = !members.is_empty();
            if !live {
                evicted += 1;
            }
            live
        });
        evicted
    }

    /// Number of identifiers currently holding a connection set.
    pub fn tracked(&self) -> usize {
        self.sets.len()
    }
}

/// Scoped ownership of one acquired slot. Dropping the guard releases
/// the slot, so every exit path out of a relay - clean end, upstream
/// error, client gone, panic - releases exactly once without the call
/// site having to remember to.
pub struct SlotGuard {
    gate: Arc<ConnectionGate>,
    identifier: String,
    connection_id: String,
    released: bool,
}

impl SlotGuard {
    pub fn new(gate: Arc<ConnectionGate>, identifier: String, connection_id: String) -> Self {
        Self {
            gate,
            identifier,
            connection_id,
            released: false,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Release the slot now instead of at scope end.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.gate.release(&self.identifier, &self.connection_id);
        }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.release_once();
    }
}
