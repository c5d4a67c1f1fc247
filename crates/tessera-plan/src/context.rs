//! Planning environment: clock oracle, cancellation, shuffle seeding.
//!
//! A [`PlanContext`] bundles everything a planning call needs from the
//! outside world. The planner is synchronous; its two blocking points
//! (registry reads and sample pulls) check the context's cancellation
//! token and abort with [`PlanError::Cancelled`] when it has tripped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tessera_core::Timestamp;

use crate::registry::ShardRegistry;
use crate::PlanError;

/// Default seed for the shard-inventory shuffle.
///
/// Deterministic by default: the same inventory shuffles the same way on
/// every run, mirroring the behavior callers have historically relied on.
/// Callers that want a fresh permutation per run inject entropy through
/// [`PlanContext::with_shuffle_seed`].
pub const DEFAULT_SHUFFLE_SEED: u64 = 0;

/// Oracle for the cluster's logical time.
///
/// Must be monotonically non-decreasing across calls.
pub trait ClusterClock {
    /// The current cluster time.
    fn now(&self) -> Timestamp;
}

/// Clock oracle backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClusterClock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Cooperative cancellation flag shared between a caller and a planning
/// call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates an untripped token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the token; the planning call aborts at its next blocking
    /// point.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Errors with [`PlanError::Cancelled`] once tripped.
    pub fn checkpoint(&self) -> Result<(), PlanError> {
        if self.is_cancelled() {
            Err(PlanError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Environment handle threaded through one planning call.
pub struct PlanContext<'a> {
    registry: &'a dyn ShardRegistry,
    clock: &'a dyn ClusterClock,
    cancel: CancelToken,
    shuffle_seed: u64,
}

impl<'a> PlanContext<'a> {
    /// Builds a context with an untripped token and the default shuffle
    /// seed.
    pub fn new(registry: &'a dyn ShardRegistry, clock: &'a dyn ClusterClock) -> Self {
        Self {
            registry,
            clock,
            cancel: CancelToken::new(),
            shuffle_seed: DEFAULT_SHUFFLE_SEED,
        }
    }

    /// Replaces the shuffle seed.
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = seed;
        self
    }

    /// Attaches a caller-owned cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The shard registry.
    pub fn registry(&self) -> &dyn ShardRegistry {
        self.registry
    }

    /// The cluster time the layout becomes valid at.
    pub fn valid_after(&self) -> Timestamp {
        self.clock.now()
    }

    /// The seed used for inventory shuffles.
    pub fn shuffle_seed(&self) -> u64 {
        self.shuffle_seed
    }

    /// Aborts with [`PlanError::Cancelled`] once the caller has
    /// cancelled. Called before every blocking operation.
    pub fn checkpoint(&self) -> Result<(), PlanError> {
        self.cancel.checkpoint()
    }
}
