//! Core Error Types
//!
//! Errors shared by all LedgerStream crates. Runtime conditions in the feed
//! path (cache miss, inactive partition, closed pool) are reported by return
//! value, not as errors; this enum covers genuine misuse such as malformed
//! request ids.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request id must be exactly {expected} bytes, got {actual}")]
    InvalidReqIdLength { expected: usize, actual: usize },
}
