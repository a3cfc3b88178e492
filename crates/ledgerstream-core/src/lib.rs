//! LedgerStream Core Types
//!
//! Shared value types for the LedgerStream transaction log server. This crate
//! holds the types that cross component boundaries:
//!
//! - [`FeedItem`]: the (transaction_id, req_id, header) triple describing one
//!   committed record on a partition's feed
//! - [`ReqId`]: the opaque 24-byte id of the client request behind a
//!   transaction
//! - [`Error`]: the core error enum
//!
//! Heavier machinery (the feed cache, observability) lives in sibling crates
//! that depend on this one.

pub mod error;
pub mod feed;

pub use error::{Error, Result};
pub use feed::{FeedItem, ReqId, REQ_ID_LEN};
