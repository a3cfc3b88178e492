//! Cache Blocks
//!
//! A [`FeedBlock`] holds the feed items for a contiguous run of transaction
//! ids `[base, base + block_size)` on one partition. Blocks are owned by the
//! shared pool and checked out into per-partition working sets; on check-in
//! they are drained and later rebound to whatever range needs them next, so
//! the backing allocation is reused for the life of the process.
//!
//! Records commit strictly in order, so a block only ever fills densely from
//! offset 0 upward. [`FeedBlock::add`] enforces that: the only id a block
//! accepts is `base + fill_level`. Anything else - a re-add, a skip, an id
//! outside the range - is refused without mutation, and the refusal tells the
//! partition cache to retarget another block (or drop the record as caller
//! error).

use ledgerstream_core::{FeedItem, ReqId};

/// Identity of a cache block: one partition, one aligned run of transaction
/// ids.
///
/// Keys are plain values; two keys with the same fields are the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockKey {
    partition_id: i32,
    base_transaction_id: u64,
}

impl BlockKey {
    /// The key of the block covering `transaction_id` on `partition_id`,
    /// given the pool's block size.
    pub fn for_transaction(partition_id: i32, transaction_id: u64, block_size: u64) -> Self {
        Self {
            partition_id,
            base_transaction_id: transaction_id - transaction_id % block_size,
        }
    }

    pub fn partition_id(&self) -> i32 {
        self.partition_id
    }

    pub fn base_transaction_id(&self) -> u64 {
        self.base_transaction_id
    }
}

/// A fixed-capacity run of feed items covering `[base, base + capacity)`.
///
/// The dense-fill invariant means the fill level is exactly `items.len()`:
/// slot `k` holds the item for transaction `base + k`, and there are never
/// holes below the fill level.
#[derive(Debug)]
pub struct FeedBlock {
    key: BlockKey,
    capacity: usize,
    items: Vec<FeedItem>,
}

impl FeedBlock {
    /// Allocate a block bound to `key`. Called by the shared pool only; the
    /// backing storage is allocated once and survives rebinding.
    pub(crate) fn new(key: BlockKey, capacity: usize) -> Self {
        Self {
            key,
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn key(&self) -> BlockKey {
        self.key
    }

    /// Number of items currently stored.
    pub fn fill_level(&self) -> usize {
        self.items.len()
    }

    /// Append the feed item for `transaction_id`.
    ///
    /// Succeeds only when `transaction_id` is the next expected id,
    /// `base + fill_level`. Returns false without mutation otherwise: for ids
    /// outside `[base, base + capacity)`, for ids already stored, and for ids
    /// that would leave a gap.
    pub fn add(&mut self, transaction_id: u64, req_id: ReqId, header: i32) -> bool {
        if self.items.len() == self.capacity {
            return false;
        }
        let expected = self.key.base_transaction_id + self.items.len() as u64;
        if transaction_id != expected {
            return false;
        }
        self.items.push(FeedItem::new(transaction_id, req_id, header));
        true
    }

    /// The stored item for `transaction_id`, if it is below the fill level.
    pub fn get(&self, transaction_id: u64) -> Option<FeedItem> {
        let base = self.key.base_transaction_id;
        if transaction_id < base {
            return None;
        }
        let offset = transaction_id - base;
        if offset >= self.items.len() as u64 {
            return None;
        }
        Some(self.items[offset as usize])
    }

    /// Drain the block on check-in so a pooled block never carries stale
    /// feed data.
    pub(crate) fn reset(&mut self) {
        self.items.clear();
    }

    /// Rebind a recycled block to a new key on checkout.
    pub(crate) fn rebind(&mut self, key: BlockKey) {
        self.key = key;
        self.items.clear();
    }
}
