//! Feed Data Structures
//!
//! This module defines the types that flow through the feed path - the stream
//! of committed transaction metadata that the server pushes to subscribers.
//!
//! ## What is a Feed Item?
//!
//! When a transaction commits on a partition, the server appends one record to
//! that partition's totally ordered log. Subscribers do not receive the record
//! body over the feed; they receive a small fixed-size triple describing it:
//!
//! - **transaction_id**: the record's position in the partition log
//!   (monotonically increasing, no gaps between committed records)
//! - **req_id**: the id of the client request that produced the transaction,
//!   so a client can recognize its own commits coming back on the feed
//! - **header**: application-defined header flags attached at commit time
//!
//! ## Structure
//!
//! `FeedItem` is 36 bytes of payload and is `Copy`: the feed cache stores and
//! returns these by value, never by reference, so a reader can never observe
//! a torn triple.
//!
//! ## Example
//! ```ignore
//! let req_id = ReqId::new(client_id, session_id, seq);
//! let item = FeedItem::new(100, req_id, 0);
//! assert_eq!(item.transaction_id, 100);
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a request id in bytes.
pub const REQ_ID_LEN: usize = 24;

/// Opaque identifier of the client request that produced a transaction.
///
/// The feed layer never interprets these bytes; it only stores and compares
/// them. The server's session layer packs `(client_id, session_id, seq)` into
/// the 24 bytes, but any byte pattern is a valid `ReqId`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReqId([u8; REQ_ID_LEN]);

impl ReqId {
    /// Build a request id from the session layer's coordinates.
    ///
    /// Packs the three fields big-endian so that ids sort in issue order
    /// within a session.
    pub fn new(client_id: u64, session_id: u64, seq: u64) -> Self {
        let mut bytes = [0u8; REQ_ID_LEN];
        bytes[0..8].copy_from_slice(&client_id.to_be_bytes());
        bytes[8..16].copy_from_slice(&session_id.to_be_bytes());
        bytes[16..24].copy_from_slice(&seq.to_be_bytes());
        Self(bytes)
    }

    /// Wrap raw bytes as a request id.
    pub fn from_bytes(bytes: [u8; REQ_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a request id from a slice, checking the length.
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let bytes: [u8; REQ_ID_LEN] = slice.try_into().map_err(|_| Error::InvalidReqIdLength {
            expected: REQ_ID_LEN,
            actual: slice.len(),
        })?;
        Ok(Self(bytes))
    }

    /// The raw bytes of this request id.
    pub fn as_bytes(&self) -> &[u8; REQ_ID_LEN] {
        &self.0
    }
}

impl fmt::Display for ReqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ReqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReqId({})", self)
    }
}

/// One entry on a partition's feed: the metadata triple for a committed
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Position of the transaction in the partition log.
    pub transaction_id: u64,

    /// Id of the client request that produced the transaction.
    pub req_id: ReqId,

    /// Application-defined header flags.
    pub header: i32,
}

impl FeedItem {
    pub fn new(transaction_id: u64, req_id: ReqId, header: i32) -> Self {
        Self {
            transaction_id,
            req_id,
            header,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // ReqId construction
    // ---------------------------------------------------------------

    #[test]
    fn test_req_id_new_packs_big_endian() {
        let req_id = ReqId::new(1, 2, 3);
        let bytes = req_id.as_bytes();
        assert_eq!(&bytes[0..8], &1u64.to_be_bytes());
        assert_eq!(&bytes[8..16], &2u64.to_be_bytes());
        assert_eq!(&bytes[16..24], &3u64.to_be_bytes());
    }

    #[test]
    fn test_req_id_from_bytes_roundtrip() {
        let raw = [7u8; REQ_ID_LEN];
        let req_id = ReqId::from_bytes(raw);
        assert_eq!(req_id.as_bytes(), &raw);
    }

    #[test]
    fn test_req_id_from_slice_ok() {
        let raw = [9u8; REQ_ID_LEN];
        let req_id = ReqId::from_slice(&raw).unwrap();
        assert_eq!(req_id, ReqId::from_bytes(raw));
    }

    #[test]
    fn test_req_id_from_slice_too_short() {
        let err = ReqId::from_slice(&[0u8; 16]).unwrap_err();
        match err {
            Error::InvalidReqIdLength { expected, actual } => {
                assert_eq!(expected, REQ_ID_LEN);
                assert_eq!(actual, 16);
            }
        }
    }

    #[test]
    fn test_req_id_from_slice_too_long() {
        assert!(ReqId::from_slice(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_req_id_equality() {
        assert_eq!(ReqId::new(1, 2, 3), ReqId::new(1, 2, 3));
        assert_ne!(ReqId::new(1, 2, 3), ReqId::new(1, 2, 4));
    }

    #[test]
    fn test_req_id_display_is_hex() {
        let req_id = ReqId::from_bytes([0xAB; REQ_ID_LEN]);
        assert_eq!(req_id.to_string(), "ab".repeat(REQ_ID_LEN));
    }

    #[test]
    fn test_req_id_debug_contains_hex() {
        let req_id = ReqId::from_bytes([0x01; REQ_ID_LEN]);
        let debug = format!("{:?}", req_id);
        assert!(debug.starts_with("ReqId("));
        assert!(debug.contains("01"));
    }

    #[test]
    fn test_req_id_ordering_within_session() {
        // Big-endian packing means later seq numbers compare higher as bytes.
        let a = ReqId::new(5, 5, 1);
        let b = ReqId::new(5, 5, 2);
        assert!(a.as_bytes() < b.as_bytes());
    }

    // ---------------------------------------------------------------
    // FeedItem
    // ---------------------------------------------------------------

    #[test]
    fn test_feed_item_new() {
        let req_id = ReqId::new(10, 20, 30);
        let item = FeedItem::new(42, req_id, 7);
        assert_eq!(item.transaction_id, 42);
        assert_eq!(item.req_id, req_id);
        assert_eq!(item.header, 7);
    }

    #[test]
    fn test_feed_item_copy_semantics() {
        let item = FeedItem::new(1, ReqId::new(0, 0, 0), 0);
        let copy = item;
        assert_eq!(item, copy);
    }

    #[test]
    fn test_feed_item_eq() {
        let req_id = ReqId::new(1, 1, 1);
        assert_eq!(FeedItem::new(1, req_id, 2), FeedItem::new(1, req_id, 2));
        assert_ne!(FeedItem::new(1, req_id, 2), FeedItem::new(2, req_id, 2));
        assert_ne!(FeedItem::new(1, req_id, 2), FeedItem::new(1, req_id, 3));
    }

    #[test]
    fn test_feed_item_negative_header() {
        let item = FeedItem::new(0, ReqId::new(0, 0, 0), -1);
        assert_eq!(item.header, -1);
    }

    #[test]
    fn test_feed_item_max_transaction_id() {
        let item = FeedItem::new(u64::MAX, ReqId::new(0, 0, 0), 0);
        assert_eq!(item.transaction_id, u64::MAX);
    }

    // ---------------------------------------------------------------
    // Serde round-trip (JSON)
    // ---------------------------------------------------------------

    #[test]
    fn test_serde_roundtrip_feed_item() {
        let item = FeedItem::new(100, ReqId::new(1, 2, 3), 9);
        let json = serde_json::to_string(&item).expect("serialize");
        let deserialized: FeedItem = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(item, deserialized);
    }

    #[test]
    fn test_serde_roundtrip_req_id() {
        let req_id = ReqId::from_bytes([0xC3; REQ_ID_LEN]);
        let json = serde_json::to_string(&req_id).expect("serialize");
        let deserialized: ReqId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(req_id, deserialized);
    }

    #[test]
    fn test_serde_json_structure() {
        let item = FeedItem::new(5, ReqId::new(0, 0, 0), 1);
        let val: serde_json::Value = serde_json::to_value(item).expect("to_value");
        assert_eq!(val["transaction_id"], 5);
        assert_eq!(val["header"], 1);
    }
}
