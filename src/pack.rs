//! Pooled message buffers.
//!
//! A [`Pack`] carries one message's raw bytes plus decode metadata from an
//! input to a decoder. Packs are allocated once at startup into a bounded
//! [`PackPool`] and recycled: an input acquires one before reading, hands it
//! to a decode queue on dispatch, and the downstream owner releases it back
//! when fully processed. Acquisition blocks while the pool is empty, which
//! is the back-pressure that keeps inputs from outrunning decoders.
//!
//! Ownership is single-threaded and transferred, never shared: a pack lives
//! in exactly one place at a time (pool, input, or decode queue), so its
//! bytes need no locking.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::frame::MAX_MESSAGE_SIZE;

/// Reusable storage for one message's raw bytes plus processing metadata.
#[derive(Debug)]
pub struct Pack {
    /// Raw message bytes, capacity fixed at allocation.
    pub msg_bytes: Vec<u8>,
    /// False until a decoder has consumed the bytes.
    pub decoded: bool,
    /// Authenticated signer name, empty for unsigned messages.
    pub signer: String,
}

impl Pack {
    /// Pack sized for the maximum message payload.
    pub fn new() -> Self {
        Pack::with_capacity(MAX_MESSAGE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Pack { msg_bytes: Vec::with_capacity(capacity), decoded: false, signer: String::new() }
    }

    /// Replace the message bytes, keeping the allocation.
    pub fn set_payload(&mut self, payload: &[u8]) {
        self.msg_bytes.clear();
        self.msg_bytes.extend_from_slice(payload);
    }

    /// Clear per-message state before the pack re-enters the pool.
    pub fn reset(&mut self) {
        self.msg_bytes.clear();
        self.decoded = false;
        self.signer.clear();
    }
}

impl Default for Pack {
    fn default() -> Self {
        Pack::new()
    }
}

struct PoolShared {
    tx: mpsc::Sender<Pack>,
    rx: Mutex<mpsc::Receiver<Pack>>,
}

/// Cloneable handle to the pool's supply channel.
///
/// This is the one capability inputs receive for buffer management; it is
/// also how downstream consumers return packs when they are done.
#[derive(Clone)]
pub struct PackSupply {
    shared: Arc<PoolShared>,
}

impl PackSupply {
    /// Take a free pack, waiting while the pool is exhausted.
    ///
    /// Returns `None` once the pool has shut down and no packs remain.
    pub async fn acquire(&self) -> Option<Pack> {
        let mut rx = self.shared.rx.lock().await;
        rx.recv().await
    }

    /// Return a pack to the pool, resetting its per-message state.
    pub fn release(&self, mut pack: Pack) {
        pack.reset();
        // The channel capacity equals the number of packs in circulation, so
        // this only fails during shutdown, where dropping the pack is fine.
        let _ = self.shared.tx.try_send(pack);
    }
}

/// Bounded pool of reusable packs, fully allocated at construction.
pub struct PackPool {
    supply: PackSupply,
}

impl PackPool {
    /// Allocate `capacity` packs (at least one) into the pool.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        for _ in 0..capacity {
            // Cannot fail: the channel was sized for exactly this many.
            let _ = tx.try_send(Pack::new());
        }
        PackPool { supply: PackSupply { shared: Arc::new(PoolShared { tx, rx: Mutex::new(rx) }) } }
    }

    /// Handle to the supply channel.
    pub fn supply(&self) -> PackSupply {
        self.supply.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn acquire_blocks_until_release() {
        let pool = PackPool::new(2);
        let supply = pool.supply();

        let first = supply.acquire().await.expect("pack available");
        let _second = supply.acquire().await.expect("pack available");

        // Pool is empty now; a third acquire must wait.
        let blocked = timeout(Duration::from_millis(50), supply.acquire()).await;
        assert!(blocked.is_err(), "acquire should block on an exhausted pool");

        supply.release(first);
        let unblocked = timeout(Duration::from_millis(200), supply.acquire()).await;
        assert!(unblocked.is_ok(), "release should unblock a waiting acquire");
    }

    #[tokio::test]
    async fn release_resets_message_state() {
        let pool = PackPool::new(1);
        let supply = pool.supply();

        let mut pack = supply.acquire().await.expect("pack available");
        pack.set_payload(b"leftover bytes");
        pack.decoded = true;
        pack.signer = "ingest".to_string();
        supply.release(pack);

        let pack = supply.acquire().await.expect("pack recycled");
        assert!(pack.msg_bytes.is_empty());
        assert!(!pack.decoded);
        assert!(pack.signer.is_empty());
    }

    #[tokio::test]
    async fn pack_keeps_its_allocation_across_reuse() {
        let pool = PackPool::new(1);
        let supply = pool.supply();

        let pack = supply.acquire().await.expect("pack available");
        let capacity = pack.msg_bytes.capacity();
        assert!(capacity >= MAX_MESSAGE_SIZE);
        supply.release(pack);

        let pack = supply.acquire().await.expect("pack recycled");
        assert_eq!(pack.msg_bytes.capacity(), capacity);
    }
}
