//! Integration tests for the Tessera planner.
//!
//! This crate provides:
//! - In-memory fixtures for the planner's collaborator seams (shard
//!   registry, cluster clock, sample source)
//! - An invariant checker asserting the global properties every policy
//!   output must satisfy
//! - Integration tests per policy family under `tests/`

pub mod harness;

pub use harness::{
    assert_layout_invariants, ManualClock, StaticRegistry, VecSampleSource,
};
