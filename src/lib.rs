//! Distributed Proof-of-Work Search
//!
//! A coordinator splits the nonce space of a brute-force proof-of-work
//! search between a fixed number of TCP-connected workers:
//! - Rolling hash and decimal difficulty check
//! - Mixed-radix nonce codec over a configurable character set
//! - Disjoint, exhaustive range partitioning
//! - Byte-exact wire protocol and first-report-wins arbitration

pub mod config;
pub mod coordinator;
pub mod error;
pub mod hash;
pub mod nonce;
pub mod partition;
pub mod protocol;
pub mod types;
pub mod utils;
pub mod worker;

pub use error::{Error, Result};
pub use types::*;

/// Application information
pub const APP_NAME: &str = "distributed-pow";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
