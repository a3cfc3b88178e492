//! Shared Feed Cache Pool
//!
//! This module implements [`FeedCache`], the process-wide reservoir of cache
//! blocks and the registry of per-partition working sets.
//!
//! ## Why a Shared Pool?
//!
//! The server streams feeds for many partitions at once, and partitions come
//! and go as subscribers attach and detach. Allocating blocks per partition
//! would let one hot partition starve the rest and would churn the allocator
//! as partitions open and close. Instead every block belongs to one shared
//! pool with a global cap:
//!
//! - a partition **checks out** a block when its working set needs one
//! - eviction and teardown **check in** blocks, which are drained and kept
//!   on a free list for the next checkout, whatever partition that is
//! - at the global cap, checkouts report exhaustion and the caller simply
//!   serves that read from storage
//!
//! ## Ownership
//!
//! The pool owns every block it has ever allocated. A checkout moves the
//! block value into one partition's local pool, which is the only writer
//! until check-in moves it back. A block is therefore in exactly one place
//! at any moment: the free list, or one partition's working set.
//!
//! ## Lifecycle
//!
//! [`FeedCache::close`] is terminal: the free list is dropped, subsequent
//! checkouts report closed forever, and blocks checked in afterwards are
//! dropped rather than pooled. Partitions keep serving whatever they already
//! hold until their subscribers close.
//!
//! ## Locking
//!
//! Partitions call into the pool while holding their own mutex, so the
//! pool's locks are leaves: nothing here ever calls into a
//! [`PartitionCache`].
//!
//! ## Usage
//!
//! ```ignore
//! use ledgerstream_cache::{CacheConfig, FeedCache};
//!
//! let cache = FeedCache::new(CacheConfig::default())?;
//!
//! // One subscriber session on partition 3
//! let feed = cache.subscribe(3);
//! feed.add(tid, req_id, header);
//! let item = feed.get(tid);
//! drop(feed); // closes the session; last one out tears the partition down
//! ```

use crate::block::{BlockKey, FeedBlock};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::partition::PartitionCache;
use ledgerstream_observability::metrics;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Outcome of a shared pool checkout.
pub(crate) enum Checkout {
    /// A drained block bound to the requested key.
    Block(FeedBlock),
    /// The pool is at its global cap; the caller falls through to storage.
    Exhausted,
    /// The pool has been shut down. Permanent.
    Closed,
}

/// State guarded by the pool mutex.
struct PoolState {
    /// Drained blocks awaiting reuse.
    free: Vec<FeedBlock>,

    /// Blocks currently in existence (free or checked out).
    allocated: usize,

    closed: bool,
}

/// Snapshot of cache counters and resource levels.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Successful `get`s served from cache
    pub hits: u64,

    /// `get`s that found a resident block without the requested id
    pub misses: u64,

    /// Blocks currently in existence across all partitions and the free list
    pub blocks_allocated: usize,

    /// Blocks on the free list
    pub blocks_free: usize,

    /// Partitions currently registered
    pub partitions: usize,
}

/// Process-wide feed cache: block pool plus partition registry.
///
/// See the module docs for the ownership and lifecycle story.
pub struct FeedCache {
    config: CacheConfig,
    state: Mutex<PoolState>,
    partitions: Mutex<HashMap<i32, Arc<PartitionCache>>>,
    hits: AtomicU64,
    misses: AtomicU64,

    /// Handle to the owning `Arc`, passed to partitions on creation.
    me: Weak<FeedCache>,
}

impl FeedCache {
    /// Create a feed cache. Fails on a configuration the pool cannot operate
    /// with (zero block size or capacity).
    pub fn new(config: CacheConfig) -> Result<Arc<Self>> {
        config.validate()?;
        metrics::init();
        tracing::info!(
            block_size = config.block_size,
            max_blocks_per_partition = config.max_blocks_per_partition,
            shared_capacity = config.shared_capacity,
            "creating feed cache"
        );
        Ok(Arc::new_cyclic(|me| Self {
            config,
            state: Mutex::new(PoolState {
                free: Vec::new(),
                allocated: 0,
                closed: false,
            }),
            partitions: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            me: me.clone(),
        }))
    }

    /// Feed items per block.
    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    /// Maximum blocks in circulation across all partitions.
    pub fn shared_capacity(&self) -> usize {
        self.config.shared_capacity
    }

    /// The working set for `partition_id`, created on first use.
    ///
    /// The returned instance is shared by every caller asking for the same
    /// partition until its last subscriber closes it; after that, this method
    /// hands out a fresh instance. Prefer [`FeedCache::subscribe`], which
    /// brackets the open/close pair for you.
    pub fn partition(&self, partition_id: i32) -> Arc<PartitionCache> {
        let mut partitions = self.partitions.lock();
        let partition = partitions.entry(partition_id).or_insert_with(|| {
            tracing::debug!(partition_id, "registering feed cache partition");
            metrics::FEED_CACHE_PARTITIONS_ACTIVE.inc();
            let cache = self.me.upgrade().expect("feed cache is always behind an Arc");
            Arc::new(PartitionCache::new(
                partition_id,
                cache,
                self.config.max_blocks_per_partition,
            ))
        });
        Arc::clone(partition)
    }

    /// Open one subscriber session on `partition_id`.
    ///
    /// Dropping the returned subscription closes the session; the last
    /// session out tears the partition down.
    pub fn subscribe(&self, partition_id: i32) -> FeedSubscription {
        let partition = self.partition(partition_id);
        partition.open();
        FeedSubscription { partition }
    }

    /// Number of partitions currently registered.
    pub fn num_partitions(&self) -> usize {
        self.partitions.lock().len()
    }

    /// Number of drained blocks waiting on the free list.
    pub fn num_free_blocks(&self) -> usize {
        self.state.lock().free.len()
    }

    /// Whether [`FeedCache::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Shut the pool down. Terminal: all subsequent checkouts report closed
    /// and partitions degrade to serving only what they already hold.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let freed = state.free.len();
            state.free.clear();
            state.allocated = state.allocated.saturating_sub(freed);
            metrics::FEED_CACHE_BLOCKS_ALLOCATED.set(state.allocated as i64);
        }
        let deregistered = {
            let mut partitions = self.partitions.lock();
            let count = partitions.len();
            partitions.clear();
            count
        };
        metrics::FEED_CACHE_PARTITIONS_ACTIVE.sub(deregistered as i64);
        tracing::info!(deregistered, "feed cache closed");
    }

    /// Counter and resource-level snapshot.
    pub fn stats(&self) -> CacheStats {
        let (blocks_allocated, blocks_free) = {
            let state = self.state.lock();
            (state.allocated, state.free.len())
        };
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            blocks_allocated,
            blocks_free,
            partitions: self.partitions.lock().len(),
        }
    }

    /// Check a block out for `key`: recycle a free block, or allocate a fresh
    /// one while under the global cap.
    pub(crate) fn check_out(&self, key: BlockKey) -> Checkout {
        let mut state = self.state.lock();
        if state.closed {
            return Checkout::Closed;
        }
        if let Some(mut block) = state.free.pop() {
            block.rebind(key);
            return Checkout::Block(block);
        }
        if state.allocated < self.config.shared_capacity {
            state.allocated += 1;
            metrics::FEED_CACHE_BLOCKS_ALLOCATED.set(state.allocated as i64);
            return Checkout::Block(FeedBlock::new(key, self.config.block_size));
        }
        Checkout::Exhausted
    }

    /// Return a block to the pool. The block is drained before it becomes
    /// available again; once the pool is closed, returned blocks are dropped.
    pub(crate) fn check_in(&self, block: FeedBlock) {
        self.check_in_all(std::iter::once(block));
    }

    /// Bulk check-in, used by partition teardown.
    pub(crate) fn check_in_all(&self, blocks: impl IntoIterator<Item = FeedBlock>) {
        let mut state = self.state.lock();
        for mut block in blocks {
            if state.closed {
                state.allocated = state.allocated.saturating_sub(1);
            } else {
                block.reset();
                state.free.push(block);
            }
        }
        if state.closed {
            metrics::FEED_CACHE_BLOCKS_ALLOCATED.set(state.allocated as i64);
        }
    }

    /// Deregister a partition whose last subscriber has closed it.
    pub(crate) fn remove_partition(&self, partition_id: i32) {
        if self.partitions.lock().remove(&partition_id).is_some() {
            metrics::FEED_CACHE_PARTITIONS_ACTIVE.dec();
            tracing::debug!(partition_id, "deregistered feed cache partition");
        }
    }

    pub(crate) fn mark_cache_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::FEED_CACHE_HITS_TOTAL.inc();
    }

    pub(crate) fn mark_cache_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::FEED_CACHE_MISSES_TOTAL.inc();
    }
}

/// One subscriber session on one partition.
///
/// Holds the partition open for as long as it lives; dropping it closes the
/// session. Dereferences to [`PartitionCache`], so feed operations are called
/// directly on the subscription.
pub struct FeedSubscription {
    partition: Arc<PartitionCache>,
}

impl Deref for FeedSubscription {
    type Target = PartitionCache;

    fn deref(&self) -> &PartitionCache {
        &self.partition
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.partition.close();
    }
}
