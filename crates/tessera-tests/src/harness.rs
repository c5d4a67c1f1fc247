//! Fixtures and invariant checks for planner integration tests.

use std::collections::BTreeSet;

use tessera_core::{BoundKey, KeyPattern, ShardId, Timestamp, Value, Zone};
use tessera_plan::{
    PlanError, SampleSource, ShardCollectionConfig, ShardDoc, ShardRegistry,
};
use tessera_plan::context::ClusterClock;

/// In-memory shard registry with fixed documents.
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    docs: Vec<ShardDoc>,
}

impl StaticRegistry {
    /// Builds a registry from `(shard id, tags)` pairs, in registry order.
    pub fn new(docs: &[(&str, &[&str])]) -> Self {
        Self {
            docs: docs
                .iter()
                .map(|(id, tags)| ShardDoc {
                    id: ShardId::from(*id),
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                })
                .collect(),
        }
    }

    /// Shards carrying the given tag, in registry order.
    pub fn shards_with_tag(&self, tag: &str) -> Vec<ShardId> {
        self.docs
            .iter()
            .filter(|d| d.tags.contains(tag))
            .map(|d| d.id.clone())
            .collect()
    }

    /// The full inventory, in registry order.
    pub fn inventory(&self) -> Vec<ShardId> {
        self.docs.iter().map(|d| d.id.clone()).collect()
    }
}

impl ShardRegistry for StaticRegistry {
    fn all_shard_ids(&self) -> Result<Vec<ShardId>, PlanError> {
        Ok(self.inventory())
    }

    fn shard_docs(&self) -> Result<Vec<ShardDoc>, PlanError> {
        Ok(self.docs.clone())
    }
}

/// Cluster clock pinned to a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    now: Timestamp,
}

impl ManualClock {
    /// Pins the clock at the given seconds, increment zero.
    pub fn at(secs: u64) -> Self {
        Self {
            now: Timestamp::new(secs, 0),
        }
    }
}

impl ClusterClock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}

/// Sample source yielding a fixed sequence of keys.
pub struct VecSampleSource {
    keys: std::vec::IntoIter<BoundKey>,
}

impl VecSampleSource {
    /// Builds a source from keys already in ascending shard-key order.
    pub fn new(keys: Vec<BoundKey>) -> Self {
        Self {
            keys: keys.into_iter(),
        }
    }

    /// Convenience: single integer field `x`.
    pub fn of_ints(values: &[i64]) -> Self {
        Self::new(
            values
                .iter()
                .map(|v| BoundKey::new(vec![("x".into(), Value::Int(*v))]))
                .collect(),
        )
    }
}

impl SampleSource for VecSampleSource {
    fn next(&mut self) -> Result<Option<BoundKey>, PlanError> {
        Ok(self.keys.next())
    }
}

/// Asserts the global invariants every policy output must satisfy:
/// tiling, range order, version monotonicity, shard-inventory
/// membership, and (for the supplied zones) boundary alignment and
/// zone-constrained placement.
///
/// Zones must be given in full key shape.
pub fn assert_layout_invariants(
    config: &ShardCollectionConfig,
    pattern: &KeyPattern,
    registry: &StaticRegistry,
    zones: &[Zone],
) {
    let chunks = &config.chunks;
    assert!(!chunks.is_empty(), "a layout must contain chunks");

    // Tiling: the chunks cover [global_min, global_max) exactly.
    assert_eq!(chunks[0].range.min(), &pattern.global_min());
    assert_eq!(
        chunks[chunks.len() - 1].range.max(),
        &pattern.global_max()
    );
    for pair in chunks.windows(2) {
        assert_eq!(
            pair[0].range.max(),
            pair[1].range.min(),
            "chunks {} and {} do not abut",
            pair[0].range,
            pair[1].range
        );
    }

    // Order and version monotonicity.
    for chunk in chunks {
        assert!(chunk.range.min() < chunk.range.max());
    }
    for pair in chunks.windows(2) {
        assert!(
            pair[0].version < pair[1].version,
            "versions must increase in emission order"
        );
        assert_eq!(pair[0].version.epoch, pair[1].version.epoch);
        assert_eq!(pair[0].version.timestamp, pair[1].version.timestamp);
    }

    // History mirrors placement.
    for chunk in chunks {
        assert_eq!(chunk.history.len(), 1);
        assert_eq!(chunk.history[0].shard, chunk.shard);
        assert_eq!(chunk.history[0].valid_after, chunk.version.timestamp);
    }

    // Inventory membership.
    let inventory: BTreeSet<ShardId> = registry.inventory().into_iter().collect();
    for chunk in chunks {
        assert!(
            inventory.contains(&chunk.shard),
            "chunk {} placed on unknown shard {}",
            chunk.range,
            chunk.shard
        );
    }

    // Zone alignment.
    let boundaries: BTreeSet<&BoundKey> = chunks
        .iter()
        .flat_map(|c| [c.range.min(), c.range.max()])
        .collect();
    for zone in zones {
        assert!(
            boundaries.contains(&zone.min),
            "zone {zone} min is not a chunk boundary"
        );
        assert!(
            boundaries.contains(&zone.max),
            "zone {zone} max is not a chunk boundary"
        );

        let permitted: BTreeSet<ShardId> =
            registry.shards_with_tag(&zone.name).into_iter().collect();
        for chunk in chunks {
            let inside = zone.min <= *chunk.range.min() && *chunk.range.max() <= zone.max;
            if inside {
                assert!(
                    permitted.contains(&chunk.shard),
                    "chunk {} inside zone {} placed on {} which lacks the tag",
                    chunk.range,
                    zone.name,
                    chunk.shard
                );
            }
        }
    }
}
