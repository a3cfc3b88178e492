//! Per-Partition Feed Cache
//!
//! This module implements [`PartitionCache`], the working set of cache blocks
//! for a single partition. The record-ingest path appends committed feed
//! items with [`PartitionCache::add`] / [`PartitionCache::add_all`]; feed
//! dispatchers answer subscriber reads with [`PartitionCache::get`].
//!
//! ## How It Works
//!
//! ```text
//! add(tid) / get(tid)
//!         |
//!         v
//! frontier block covers tid? ----YES----> done (O(1) fast path)
//!         |
//!         NO
//!         v
//! local pool has block for tid? --YES---> use it
//!         |
//!         NO
//!         v
//! evict down to max_blocks - 1 (insertion order, frontier pinned)
//!         |
//!         v
//! check block out of shared pool, install
//!         (closed/exhausted -> give up; reads fall through to storage)
//! ```
//!
//! ## The Frontier
//!
//! Records commit in ascending transaction id order, so nearly every `add`
//! lands in the block the previous `add` touched. The frontier remembers that
//! block. It is a cache of the most recent *write* target: `get` consults it
//! but never moves it, because moving it on reads would break the sequential
//! write fast path.
//!
//! ## Capacity and Eviction
//!
//! A partition holds at most `max_blocks` blocks. Before a new block is
//! installed, the pool is reduced to `max_blocks - 1` by evicting blocks in
//! insertion order, skipping the frontier. Feed access is sequential, so
//! insertion order tracks recency closely and the oldest id ranges age out
//! first. Evicted blocks are checked back into the shared pool for reuse by
//! any partition.
//!
//! ## Lifecycle
//!
//! Overlapping subscribers on one partition share one `PartitionCache`
//! through a reference count: `open` increments it, `close` decrements it,
//! and the decrement that reaches zero returns every block to the shared pool
//! and deregisters the partition. While the count is zero all operations are
//! no-ops; a `get` on an inactive partition is absent.
//!
//! ## Thread Safety
//!
//! Every public operation runs under one per-instance mutex covering the
//! whole method body: the frontier, the ordered local pool, and the reference
//! count only make sense jointly. Critical sections are short and make no
//! storage or I/O calls; the only external calls are into the shared pool,
//! which takes its own locks and never calls back into a partition.

use crate::block::{BlockKey, FeedBlock};
use crate::cache::{Checkout, FeedCache};
use indexmap::IndexMap;
use ledgerstream_core::{FeedItem, ReqId};
use ledgerstream_observability::metrics;
use parking_lot::Mutex;
use std::sync::Arc;

/// State guarded by the per-partition mutex.
struct Inner {
    /// Blocks checked out of the shared pool, in insertion order.
    local_pool: IndexMap<BlockKey, FeedBlock>,

    /// Key of the block the last `add` landed in, if any. Always a member of
    /// `local_pool`.
    frontier: Option<BlockKey>,

    /// Per-partition block cap.
    max_blocks: usize,

    /// Number of open subscriber sessions. Zero means inactive.
    ref_count: i32,
}

/// The feed cache working set of one partition.
///
/// Created by [`FeedCache::partition`] and shared by all subscribers of the
/// partition; see the module docs for the lifecycle.
pub struct PartitionCache {
    partition_id: i32,
    block_size: u64,
    cache: Arc<FeedCache>,
    inner: Mutex<Inner>,
}

impl PartitionCache {
    pub(crate) fn new(partition_id: i32, cache: Arc<FeedCache>, max_blocks: usize) -> Self {
        let block_size = cache.block_size() as u64;
        Self {
            partition_id,
            block_size,
            cache,
            inner: Mutex::new(Inner {
                local_pool: IndexMap::new(),
                frontier: None,
                max_blocks,
                ref_count: 0,
            }),
        }
    }

    pub fn partition_id(&self) -> i32 {
        self.partition_id
    }

    /// Open one subscriber session on this partition.
    pub fn open(&self) {
        self.inner.lock().ref_count += 1;
    }

    /// Close one subscriber session. The close that drops the last session
    /// clears the working set and deregisters the partition; looking the
    /// partition up again afterwards yields a fresh instance.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.ref_count -= 1;
        if inner.ref_count < 0 {
            tracing::warn!(
                partition_id = self.partition_id,
                ref_count = inner.ref_count,
                "feed cache partition closed more often than opened"
            );
        }
        if inner.ref_count <= 0 {
            self.clear_locked(&mut inner);
            self.cache.remove_partition(self.partition_id);
            tracing::debug!(
                partition_id = self.partition_id,
                "feed cache partition torn down"
            );
        }
    }

    /// Return every held block to the shared pool and drop the frontier.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        self.clear_locked(&mut inner);
    }

    /// Number of blocks currently held.
    pub fn num_blocks(&self) -> usize {
        self.inner.lock().local_pool.len()
    }

    /// Current per-partition block cap.
    pub fn max_blocks(&self) -> usize {
        self.inner.lock().max_blocks
    }

    /// Set the per-partition block cap and evict down to it. Capacity is a
    /// property of the instance; setting it while inactive is allowed.
    pub fn set_max_blocks(&self, max_blocks: usize) {
        let mut inner = self.inner.lock();
        inner.max_blocks = max_blocks;
        self.evict_down_to(&mut inner, max_blocks);
    }

    /// Append the feed item for one committed transaction.
    ///
    /// Ids arrive in commit order; an id the covering block refuses
    /// (duplicate or out of order) is dropped silently - the cache is a hint,
    /// not the log. No-op while the partition is inactive or once the shared
    /// pool is closed.
    pub fn add(&self, transaction_id: u64, req_id: ReqId, header: i32) {
        let mut inner = self.inner.lock();
        if inner.ref_count <= 0 {
            return;
        }
        loop {
            if let Some(frontier) = inner.frontier {
                let block = inner
                    .local_pool
                    .get_mut(&frontier)
                    .expect("frontier block is resident");
                if block.add(transaction_id, req_id, header) {
                    return;
                }
            }
            let key =
                BlockKey::for_transaction(self.partition_id, transaction_id, self.block_size);
            if inner.frontier == Some(key) {
                // The covering block already refused this id.
                return;
            }
            if !inner.local_pool.contains_key(&key) && !self.try_install(&mut inner, key) {
                return;
            }
            inner.frontier = Some(key);
        }
    }

    /// Bulk append of feed items in ascending transaction id order.
    ///
    /// Keeps a rolling block target across items so consecutive items in the
    /// same block skip the key computation. The rolling target is call-local;
    /// unlike [`PartitionCache::add`], the bulk path does not move the
    /// frontier.
    pub fn add_all(&self, items: &[FeedItem]) {
        let mut inner = self.inner.lock();
        if inner.ref_count <= 0 {
            return;
        }
        let mut current: Option<BlockKey> = None;
        for item in items {
            loop {
                if let Some(key) = current {
                    match inner.local_pool.get_mut(&key) {
                        Some(block) => {
                            if block.add(item.transaction_id, item.req_id, item.header) {
                                break;
                            }
                        }
                        None => current = None,
                    }
                }
                let key = BlockKey::for_transaction(
                    self.partition_id,
                    item.transaction_id,
                    self.block_size,
                );
                if current == Some(key) {
                    // The covering block already refused this item.
                    break;
                }
                if !inner.local_pool.contains_key(&key) && !self.try_install(&mut inner, key) {
                    return;
                }
                current = Some(key);
            }
        }
    }

    /// Look up the feed item for `transaction_id`.
    ///
    /// Absent is the expected miss condition: the caller falls back to
    /// storage. A miss inside a resident block bumps the shared pool's miss
    /// counter; absence of the block itself does not, and neither does an
    /// inactive partition or a closed pool.
    pub fn get(&self, transaction_id: u64) -> Option<FeedItem> {
        let mut inner = self.inner.lock();
        if inner.ref_count <= 0 {
            return None;
        }
        if let Some(frontier) = inner.frontier {
            let item = inner
                .local_pool
                .get(&frontier)
                .and_then(|block| block.get(transaction_id));
            if let Some(item) = item {
                self.cache.mark_cache_hit();
                return Some(item);
            }
        }
        let key = BlockKey::for_transaction(self.partition_id, transaction_id, self.block_size);
        let resident = inner.local_pool.contains_key(&key);
        if !resident && !self.try_install(&mut inner, key) {
            return None;
        }
        let item = inner
            .local_pool
            .get(&key)
            .and_then(|block| block.get(transaction_id));
        match item {
            Some(item) => {
                self.cache.mark_cache_hit();
                Some(item)
            }
            None => {
                if resident {
                    self.cache.mark_cache_miss();
                }
                None
            }
        }
    }

    fn clear_locked(&self, inner: &mut Inner) {
        if !inner.local_pool.is_empty() {
            self.cache
                .check_in_all(inner.local_pool.drain(..).map(|(_, block)| block));
        }
        inner.frontier = None;
    }

    /// Make room, then check a block for `key` out of the shared pool and
    /// install it. Returns false when the pool is closed or exhausted; the
    /// caller gives up either way.
    fn try_install(&self, inner: &mut Inner, key: BlockKey) -> bool {
        let target = inner.max_blocks.saturating_sub(1);
        self.evict_down_to(inner, target);
        match self.cache.check_out(key) {
            Checkout::Block(block) => {
                inner.local_pool.insert(key, block);
                true
            }
            Checkout::Exhausted => {
                tracing::debug!(
                    partition_id = self.partition_id,
                    "shared block pool exhausted, skipping block install"
                );
                false
            }
            Checkout::Closed => {
                tracing::debug!(
                    partition_id = self.partition_id,
                    "feed cache closed, skipping block install"
                );
                false
            }
        }
    }

    /// Evict blocks in insertion order, skipping the frontier, until at most
    /// `target` blocks remain or only the frontier is left.
    fn evict_down_to(&self, inner: &mut Inner, target: usize) {
        while inner.local_pool.len() > target {
            let frontier = inner.frontier;
            let victim = inner
                .local_pool
                .keys()
                .copied()
                .find(|key| frontier != Some(*key));
            match victim {
                Some(victim) => {
                    if let Some(block) = inner.local_pool.shift_remove(&victim) {
                        tracing::debug!(
                            partition_id = self.partition_id,
                            base_transaction_id = victim.base_transaction_id(),
                            "evicting feed cache block"
                        );
                        metrics::FEED_CACHE_EVICTIONS_TOTAL.inc();
                        self.cache.check_in(block);
                    }
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
impl PartitionCache {
    pub(crate) fn frontier_base(&self) -> Option<u64> {
        self.inner
            .lock()
            .frontier
            .map(|key| key.base_transaction_id())
    }

    pub(crate) fn resident_bases(&self) -> Vec<u64> {
        self.inner
            .lock()
            .local_pool
            .keys()
            .map(|key| key.base_transaction_id())
            .collect()
    }

    pub(crate) fn ref_count(&self) -> i32 {
        self.inner.lock().ref_count
    }
}
