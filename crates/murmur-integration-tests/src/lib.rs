//! Integration test crate for the Murmur protocol.
//!
//! This crate has no library code. It only contains integration tests
//! that exercise end-to-end signal flows across the workspace crates:
//! identity, registry, proving, verification and the ledger.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p murmur-integration-tests
//! ```
