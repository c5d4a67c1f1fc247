//! Placement policies and the strategy selector.
//!
//! Each policy is a variant of [`SplitPolicy`] owning its own
//! configuration; [`SplitPolicy::create_first_chunks`] dispatches. The
//! automatic selector picks among the first four policies; the sampling
//! and shard-distribution policies are chosen explicitly by
//! resharding-style callers.

mod distribution;
mod presplit;
mod primary;
mod sampling;
mod split_points;
mod tags;

pub use distribution::{ShardDistributionPolicy, ShardKeyRange};
pub use presplit::PresplitHashedZonesPolicy;
pub use primary::SingleChunkOnPrimaryPolicy;
pub use sampling::{select_best_shard, SamplingPolicy};
pub use split_points::SplitPointsPolicy;
pub use tags::{SingleChunkPerTagPolicy, SplitInfo};

use std::fmt;

use tracing::debug;

use tessera_core::{Chunk, KeyPattern, Zone};

use crate::context::PlanContext;
use crate::emit::SplitPolicyParams;
use crate::split::calculate_hashed_split_points;
use crate::PlanError;

/// The planner's output: the initial chunk layout of one collection.
#[derive(Debug, Clone)]
pub struct ShardCollectionConfig {
    /// Chunks in ascending key order, tiling the whole key space.
    pub chunks: Vec<Chunk>,
}

/// An initial split policy with its configuration.
pub enum SplitPolicy {
    /// One chunk covering the whole key space, on the primary shard.
    SingleChunkOnPrimary(SingleChunkOnPrimaryPolicy),
    /// Pre-computed hashed split points, round-robin across shards.
    SplitPoints(SplitPointsPolicy),
    /// One chunk per zone, round-robin within each zone's shards.
    SingleChunkPerTag(SingleChunkPerTagPolicy),
    /// Multiple hashed sub-chunks per zone, spread across zone shards.
    PresplitHashedZones(PresplitHashedZonesPolicy),
    /// Split points drawn from sampled data, load-aware assignment.
    Sampling(SamplingPolicy),
    /// Caller-specified per-shard contiguous layout.
    ShardDistribution(ShardDistributionPolicy),
}

impl SplitPolicy {
    /// Computes the initial chunk layout under this policy.
    pub fn create_first_chunks(
        &mut self,
        ctx: &PlanContext<'_>,
        pattern: &KeyPattern,
        params: &SplitPolicyParams,
    ) -> Result<ShardCollectionConfig, PlanError> {
        let config = match self {
            SplitPolicy::SingleChunkOnPrimary(policy) => {
                policy.create_first_chunks(ctx, pattern, params)
            }
            SplitPolicy::SplitPoints(policy) => policy.create_first_chunks(ctx, pattern, params),
            SplitPolicy::SingleChunkPerTag(policy) => {
                policy.create_first_chunks(ctx, pattern, params)
            }
            SplitPolicy::PresplitHashedZones(policy) => {
                policy.create_first_chunks(ctx, pattern, params)
            }
            SplitPolicy::Sampling(policy) => policy.create_first_chunks(ctx, pattern, params),
            SplitPolicy::ShardDistribution(policy) => {
                policy.create_first_chunks(ctx, pattern, params)
            }
        }?;
        debug!(chunks = config.chunks.len(), "computed initial chunk layout");
        Ok(config)
    }

    fn name(&self) -> &'static str {
        match self {
            SplitPolicy::SingleChunkOnPrimary(_) => "single_chunk_on_primary",
            SplitPolicy::SplitPoints(_) => "split_points",
            SplitPolicy::SingleChunkPerTag(_) => "single_chunk_per_tag",
            SplitPolicy::PresplitHashedZones(_) => "presplit_hashed_zones",
            SplitPolicy::Sampling(_) => "sampling",
            SplitPolicy::ShardDistribution(_) => "shard_distribution",
        }
    }
}

impl fmt::Debug for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SplitPolicy::{}", self.name())
    }
}

/// Picks the policy for an ordinary shard-collection request.
///
/// Evaluated top to bottom, first match wins:
/// 1. `presplit_hashed_zones` flag set → presplit hashed zones
/// 2. no zones, hashed-prefix key, empty collection → hashed split points
/// 3. zones, empty collection → single chunk per zone
/// 4. otherwise → single chunk on the primary
///
/// A non-zero `num_initial_chunks` is only honored for empty collections
/// with a hashed key, and with a hashed-*suffix* key only when
/// presplitting is requested.
pub fn select_policy(
    ctx: &PlanContext<'_>,
    pattern: &KeyPattern,
    num_initial_chunks: usize,
    presplit_hashed_zones: bool,
    zones: Vec<Zone>,
    num_shards: usize,
    collection_is_empty: bool,
) -> Result<SplitPolicy, PlanError> {
    if num_initial_chunks != 0 && !(pattern.is_hashed() && collection_is_empty) {
        return Err(PlanError::invalid_options(
            "a chunk count is only supported when the collection is empty and the \
             shard key pattern has a hashed field",
        ));
    }
    if num_initial_chunks != 0 && !pattern.has_hashed_prefix() && !presplit_hashed_zones {
        return Err(PlanError::invalid_options(
            "with a range field prefixing the hashed field, a chunk count can only \
             be used together with hashed-zone presplitting",
        ));
    }

    // The presplit flag always routes to the presplit policy so that its
    // own validation surfaces the precise failure.
    let policy = if presplit_hashed_zones {
        SplitPolicy::PresplitHashedZones(PresplitHashedZonesPolicy::new(
            ctx,
            pattern,
            zones,
            num_initial_chunks,
            collection_is_empty,
        )?)
    } else if zones.is_empty() && pattern.has_hashed_prefix() && collection_is_empty {
        let num_chunks = if num_initial_chunks == 0 {
            2 * num_shards
        } else {
            num_initial_chunks
        };
        let split_points =
            calculate_hashed_split_points(pattern, &tessera_core::BoundKey::new(vec![]), num_chunks);
        SplitPolicy::SplitPoints(SplitPointsPolicy::new(split_points, 1))
    } else if !zones.is_empty() && collection_is_empty {
        SplitPolicy::SingleChunkPerTag(SingleChunkPerTagPolicy::new(ctx, zones)?)
    } else {
        SplitPolicy::SingleChunkOnPrimary(SingleChunkOnPrimaryPolicy)
    };

    debug!(policy = policy.name(), "selected initial split policy");
    Ok(policy)
}
