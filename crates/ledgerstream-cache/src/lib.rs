//! LedgerStream Feed Cache
//!
//! This crate implements the in-memory cache that sits between the server's
//! feed dispatchers and persistent storage. Each partition streams a totally
//! ordered sequence of committed transactions to many subscribers, and every
//! subscriber repeatedly asks "give me the feed data for transaction T on
//! partition P". Answering each of those reads from storage would collapse
//! the feed under load; this cache answers them from memory.
//!
//! ## Architecture Overview
//!
//! ```text
//! record ingest                     feed dispatchers
//!   add / add_all                       get(tid)
//!        |                                 |
//!        v                                 v
//! +---------------------------------------------------+
//! | PartitionCache (one per partition, refcounted)    |
//! |   frontier --> [ block ][ block ][ block ]        |
//! |                 insertion-ordered local pool      |
//! +------------------------|--------------------------+
//!                 check out | check in
//!                          v
//! +---------------------------------------------------+
//! | FeedCache (process-wide shared pool)              |
//! |   free list, global cap, miss statistics,         |
//! |   partition registry                              |
//! +---------------------------------------------------+
//!                          |
//!               miss -> caller reads storage
//! ```
//!
//! ## Main Components
//!
//! ### FeedBlock / BlockKey
//! A block holds the feed triples for one aligned run of transaction ids on
//! one partition, filled densely in commit order. Blocks are pooled: checked
//! out, filled, evicted, drained, and rebound somewhere else.
//!
//! ### PartitionCache
//! The per-partition working set: a bounded, insertion-ordered pool of
//! checked-out blocks plus the write frontier. Shared by all subscribers of
//! the partition through an open/close reference count.
//!
//! ### FeedCache
//! The shared pool: allocates and recycles blocks under a global cap, tracks
//! hit/miss statistics, and hands out `PartitionCache` instances. Start
//! here: [`FeedCache::subscribe`] is the whole consumer API.
//!
//! ## What the Cache Is Not
//!
//! The cache is a hint, not a source of truth. It never serves data it did
//! not observe directly, it is not a write-through buffer, and it does not
//! survive a restart. On any miss the caller falls back to the storage
//! engine.

pub mod block;
pub mod cache;
pub mod config;
pub mod error;
pub mod partition;

pub use block::{BlockKey, FeedBlock};
pub use cache::{CacheStats, FeedCache, FeedSubscription};
pub use config::CacheConfig;
pub use error::{Error, Result};
pub use partition::PartitionCache;

// Re-export the core feed types so cache users need only this crate.
pub use ledgerstream_core::{FeedItem, ReqId};
