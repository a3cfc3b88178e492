//! LedgerStream Observability
//!
//! Provides Prometheus metrics for LedgerStream components. The feed cache
//! reports hits, misses, evictions, and resource levels here; the serving
//! layer scrapes [`REGISTRY`] through whatever sink it is wired to.
//!
//! # Usage
//!
//! ```no_run
//! use ledgerstream_observability::metrics;
//!
//! // Register metrics once at startup
//! metrics::init();
//!
//! // Components bump the statics directly
//! metrics::FEED_CACHE_HITS_TOTAL.inc();
//! ```

pub mod metrics;

// Re-export commonly used items
pub use metrics::{init as init_metrics, REGISTRY};
