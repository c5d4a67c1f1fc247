//! Chunk emission with version bumping.
//!
//! Every policy funnels its output through a [`ChunkEmitter`]: chunks
//! come out in ascending key order, stamped with a shared fresh epoch
//! and a strictly increasing `(major, minor)` version series, each with
//! a single history entry recording its initial placement.

use std::collections::BTreeSet;

use tessera_core::{
    BoundKey, Chunk, ChunkRange, ChunkVersion, CollectionId, KeyPattern, PlacementEpoch, ShardId,
    Timestamp,
};

use crate::PlanError;

/// Parameters threaded through chunk emission.
#[derive(Debug, Clone)]
pub struct SplitPolicyParams {
    /// The collection being sharded.
    pub collection: CollectionId,
    /// The collection's primary shard, used as default placement.
    pub primary_shard: ShardId,
}

/// Accumulates chunks for one planning run.
///
/// Callers must supply `min < max` and append ranges in ascending,
/// contiguous order; each appended chunk consumes the current version
/// and bumps its minor component.
#[derive(Debug)]
pub struct ChunkEmitter {
    collection: CollectionId,
    version: ChunkVersion,
    chunks: Vec<Chunk>,
}

impl ChunkEmitter {
    /// Starts a run: fresh epoch, version `(1, 0)` at `valid_after`.
    pub fn new(params: &SplitPolicyParams, valid_after: Timestamp) -> Self {
        Self {
            collection: params.collection,
            version: ChunkVersion::initial(PlacementEpoch::random(), valid_after),
            chunks: Vec::new(),
        }
    }

    /// Appends a chunk `[min, max)` on `shard` and bumps the version.
    pub fn append(
        &mut self,
        min: BoundKey,
        max: BoundKey,
        shard: ShardId,
    ) -> Result<(), PlanError> {
        let range = ChunkRange::new(min, max)?;
        debug_assert!(
            self.chunks
                .last()
                .map_or(true, |prev| prev.range.max() == range.min()),
            "chunks must be emitted contiguously in ascending order"
        );
        self.chunks
            .push(Chunk::new(self.collection, range, self.version, shard));
        self.version.inc_minor();
        Ok(())
    }

    /// Upper bound of the last emitted chunk, if any.
    pub fn last_max(&self) -> Option<&BoundKey> {
        self.chunks.last().map(|c| c.range.max())
    }

    /// Number of chunks emitted so far.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True before the first append.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Consumes the emitter, yielding the chunks in emission order.
    pub fn finish(self) -> Vec<Chunk> {
        self.chunks
    }
}

/// Tiles the key space along `split_points`, assigning chunks round-robin
/// in runs of `num_contiguous_chunks_per_shard` across `shards`.
///
/// Split points are deduplicated and sorted before use; the supplied
/// shard list order is preserved (shuffle upstream for spreading).
pub fn generate_initial_chunks(
    params: &SplitPolicyParams,
    pattern: &KeyPattern,
    valid_after: Timestamp,
    split_points: &[BoundKey],
    shards: &[ShardId],
    num_contiguous_chunks_per_shard: usize,
) -> Result<Vec<Chunk>, PlanError> {
    assert!(!shards.is_empty(), "shard inventory must not be empty");
    assert!(
        num_contiguous_chunks_per_shard > 0,
        "contiguous chunk run length must be positive"
    );

    let ordered_points: BTreeSet<BoundKey> = split_points.iter().cloned().collect();

    let mut emitter = ChunkEmitter::new(params, valid_after);
    let mut last_max = pattern.global_min();
    for (i, point) in ordered_points
        .iter()
        .chain(std::iter::once(&pattern.global_max()))
        .enumerate()
    {
        let shard = &shards[(i / num_contiguous_chunks_per_shard) % shards.len()];
        emitter.append(last_max, point.clone(), shard.clone())?;
        last_max = point.clone();
    }
    Ok(emitter.finish())
}
