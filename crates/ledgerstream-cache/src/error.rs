//! Cache Error Types
//!
//! The feed cache reports its runtime conditions by return value: a miss is
//! `None`, an inactive partition is a no-op, a closed pool is permanent
//! absence. Errors here are construction-time problems only.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid feed cache configuration: {0}")]
    InvalidConfig(String),
}
