//! Integration test suite for the Tlock staking ledger.
//!
//! End-to-end scenarios, randomized interleavings of pool commands checked
//! against accounting invariants, and concurrent access through the shared
//! handle.

pub mod helpers;
