//! Explicit shard-distribution policy.
//!
//! Resharding callers may dictate the layout outright: a contiguous,
//! key-space-complete list of per-shard ranges. The planner honors it,
//! splitting additionally at zone boundaries, and then verifies that
//! every chunk's zone is actually carried by the chunk's shard.

use tessera_core::{BoundKey, Chunk, KeyPattern, ShardId, Zone, ZoneInfo};

use crate::context::PlanContext;
use crate::emit::{ChunkEmitter, SplitPolicyParams};
use crate::policy::ShardCollectionConfig;
use crate::registry::build_shard_id_to_tags_map;
use crate::split::extract_split_points_from_zones;
use crate::PlanError;

/// One entry of a caller-supplied distribution: a key range owned by a
/// shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardKeyRange {
    /// Inclusive lower bound; may be under-specified (extended to key
    /// shape with MinKey).
    pub min: Option<BoundKey>,
    /// Exclusive upper bound; extended like `min`.
    pub max: Option<BoundKey>,
    /// The owning shard.
    pub shard: ShardId,
}

/// Honors an explicit per-shard contiguous range layout.
///
/// The caller is responsible for the ranges covering the key space in
/// ascending order without gaps or overlaps; the upstream command
/// validates that before the planner runs.
#[derive(Debug)]
pub struct ShardDistributionPolicy {
    shard_distribution: Vec<ShardKeyRange>,
    zones: Option<Vec<Zone>>,
}

impl ShardDistributionPolicy {
    /// Validates non-emptiness and builds the policy.
    pub fn new(
        shard_distribution: Vec<ShardKeyRange>,
        zones: Option<Vec<Zone>>,
    ) -> Result<Self, PlanError> {
        if shard_distribution.is_empty() {
            return Err(PlanError::EmptyShardDistribution);
        }
        Ok(Self {
            shard_distribution,
            zones,
        })
    }

    /// Computes the dictated layout.
    pub fn create_first_chunks(
        &mut self,
        ctx: &PlanContext<'_>,
        pattern: &KeyPattern,
        params: &SplitPolicyParams,
    ) -> Result<ShardCollectionConfig, PlanError> {
        if let Some(zones) = &mut self.zones {
            for zone in zones.iter_mut() {
                zone.min = pattern.extend_range_bound(&zone.min, false)?;
                zone.max = pattern.extend_range_bound(&zone.max, false)?;
            }
        }
        let split_points = extract_split_points_from_zones(pattern, self.zones.as_deref());

        if self.shard_distribution[0].min.is_none() {
            return Err(PlanError::invalid_options(
                "a shard distribution without explicit range bounds is not supported",
            ));
        }

        let mut emitter = ChunkEmitter::new(params, ctx.valid_after());
        let mut distribution_idx = 0usize;
        for split_point in split_points
            .iter()
            .chain(std::iter::once(&pattern.global_max()))
        {
            self.append_chunks_up_to(split_point, pattern, &mut distribution_idx, &mut emitter)?;
        }
        let chunks = emitter.finish();

        if let Some(zones) = &self.zones {
            self.check_shards_match_zones(ctx, &chunks, zones)?;
        }

        Ok(ShardCollectionConfig { chunks })
    }

    /// Emits chunks for every distribution range left of `split_point`.
    ///
    /// A range straddling the split point is cut at it and resumed by the
    /// next call; a range right of it is left for later entirely.
    fn append_chunks_up_to(
        &self,
        split_point: &BoundKey,
        pattern: &KeyPattern,
        distribution_idx: &mut usize,
        emitter: &mut ChunkEmitter,
    ) -> Result<(), PlanError> {
        while *distribution_idx < self.shard_distribution.len() {
            let entry = &self.shard_distribution[*distribution_idx];
            let (Some(entry_min), Some(entry_max)) = (&entry.min, &entry.max) else {
                return Err(PlanError::invalid_options(
                    "a shard distribution without explicit range bounds is not supported",
                ));
            };
            let shard_min = pattern.extend_range_bound(entry_min, false)?;
            let shard_max = pattern.extend_range_bound(entry_max, false)?;
            let last_chunk_max = emitter
                .last_max()
                .cloned()
                .unwrap_or_else(|| pattern.global_min());

            if shard_min >= *split_point {
                // The whole range sits right of the split point.
                return Ok(());
            }
            if shard_max <= *split_point {
                // The whole range sits left of the split point.
                emitter.append(last_chunk_max, shard_max, entry.shard.clone())?;
                *distribution_idx += 1;
            } else {
                // The split point cuts the range; finish it on the next
                // call with the next split point.
                emitter.append(last_chunk_max, split_point.clone(), entry.shard.clone())?;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Verifies each chunk's containing zone is a tag its shard carries.
    fn check_shards_match_zones(
        &self,
        ctx: &PlanContext<'_>,
        chunks: &[Chunk],
        zones: &[Zone],
    ) -> Result<(), PlanError> {
        let mut zone_info = ZoneInfo::new();
        for zone in zones {
            zone_info.add_zone(zone.clone())?;
        }
        let shard_to_tags = build_shard_id_to_tags_map(
            ctx,
            self.shard_distribution.iter().map(|entry| &entry.shard),
        )?;

        for chunk in chunks {
            let zone = zone_info.zone_for_range(&chunk.range);
            let matches = shard_to_tags
                .get(&chunk.shard)
                .is_some_and(|tags| tags.contains(zone));
            if !matches {
                return Err(PlanError::invalid_options(format!(
                    "the supplied zones and shard distribution conflict: shard {} does \
                     not belong to zone '{}' covering chunk {}",
                    chunk.shard, zone, chunk.range
                )));
            }
        }
        Ok(())
    }
}
