//! The shared zoned-layout driver and the one-chunk-per-zone policy.
//!
//! Any policy that lays chunks out zone by zone plugs into
//! [`create_chunks_for_tags`]: the driver walks the sorted zones, fills
//! the gaps between them with round-robin "hole" chunks, and asks the
//! policy for each zone's split points and per-shard chunk distribution.

use std::collections::{BTreeMap, HashMap};

use tessera_core::{BoundKey, KeyPattern, ShardId, Zone};

use crate::context::PlanContext;
use crate::emit::{ChunkEmitter, SplitPolicyParams};
use crate::policy::ShardCollectionConfig;
use crate::registry::{build_tags_to_shard_ids_map, shuffled_shard_ids};
use crate::PlanError;

/// A zone's layout as computed by a tags-based policy: split points
/// interior to the zone plus the ordered per-shard chunk counts.
///
/// Invariant: `split_points.len() + 1` equals the sum of the counts.
#[derive(Debug, Clone)]
pub struct SplitInfo {
    /// Sorted split points strictly inside the zone's range.
    pub split_points: Vec<BoundKey>,
    /// `(shard, chunk count)` pairs, walked in order during emission.
    pub chunk_distribution: Vec<(ShardId, usize)>,
}

/// A policy that lays out chunks zone by zone.
pub(crate) trait TagsBasedPolicy {
    /// The zones, sorted by min key and non-overlapping.
    fn tags(&self) -> &[Zone];

    /// Zone name to assigned shards, in registry order.
    fn tag_to_shards(&self) -> &BTreeMap<String, Vec<ShardId>>;

    /// Computes one zone's split points and chunk distribution.
    fn build_split_info(
        &mut self,
        tag: &Zone,
        pattern: &KeyPattern,
    ) -> Result<SplitInfo, PlanError>;
}

/// Drives a tags-based policy over its zones.
pub(crate) fn create_chunks_for_tags(
    ctx: &PlanContext<'_>,
    pattern: &KeyPattern,
    params: &SplitPolicyParams,
    policy: &mut dyn TagsBasedPolicy,
) -> Result<ShardCollectionConfig, PlanError> {
    let tags = policy.tags().to_vec();
    assert!(!tags.is_empty(), "tags-based policies require zones");
    assert!(
        tags.windows(2).all(|w| w[0].max <= w[1].min),
        "zones must be sorted by min key and non-overlapping"
    );

    let all_shards = shuffled_shard_ids(ctx)?;
    assert!(!all_shards.is_empty(), "shard inventory must not be empty");

    let mut emitter = ChunkEmitter::new(params, ctx.valid_after());
    let mut next_hole_idx = 0usize;
    let mut last_chunk_max = pattern.global_min();

    for tag in &tags {
        // Fill the gap [last_chunk_max, tag.min) left of this zone.
        if tag.min > last_chunk_max {
            let hole_shard = all_shards[next_hole_idx % all_shards.len()].clone();
            next_hole_idx += 1;
            emitter.append(last_chunk_max.clone(), tag.min.clone(), hole_shard)?;
        }

        let unassigned = policy
            .tag_to_shards()
            .get(&tag.name)
            .map_or(true, |shards| shards.is_empty());
        if unassigned {
            return Err(PlanError::ZoneNotAssignedToShard {
                zone: tag.name.clone(),
            });
        }

        let split_info = policy.build_split_info(tag, pattern)?;
        let total_chunks: usize = split_info
            .chunk_distribution
            .iter()
            .map(|(_, count)| count)
            .sum();
        assert_eq!(
            split_info.split_points.len() + 1,
            total_chunks,
            "split points must be consistent with the chunk distribution"
        );

        // Walk the distribution in order; split points stay interior to
        // the zone, so the first chunk starts at tag.min and the last
        // ends at tag.max.
        let mut split_idx = 0;
        for (shard, count) in &split_info.chunk_distribution {
            for _ in 0..*count {
                let min = if split_idx == 0 {
                    tag.min.clone()
                } else {
                    split_info.split_points[split_idx - 1].clone()
                };
                let max = if split_idx == split_info.split_points.len() {
                    tag.max.clone()
                } else {
                    split_info.split_points[split_idx].clone()
                };
                emitter.append(min, max, shard.clone())?;
                split_idx += 1;
            }
        }
        last_chunk_max = tag.max.clone();
    }

    // Fill the gap right of the last zone.
    if last_chunk_max < pattern.global_max() {
        let hole_shard = all_shards[next_hole_idx % all_shards.len()].clone();
        emitter.append(last_chunk_max, pattern.global_max(), hole_shard)?;
    }

    Ok(ShardCollectionConfig {
        chunks: emitter.finish(),
    })
}

/// One chunk per zone, placed round-robin within the zone's shards.
///
/// The round-robin counter is kept per zone name for the duration of the
/// planner call.
pub struct SingleChunkPerTagPolicy {
    tags: Vec<Zone>,
    tag_to_shards: BTreeMap<String, Vec<ShardId>>,
    next_shard_index_for_zone: HashMap<String, usize>,
}

impl SingleChunkPerTagPolicy {
    /// Resolves the zones' shard assignments from the registry.
    pub fn new(ctx: &PlanContext<'_>, tags: Vec<Zone>) -> Result<Self, PlanError> {
        let tag_to_shards = build_tags_to_shard_ids_map(ctx, &tags)?;
        Ok(Self {
            tags,
            tag_to_shards,
            next_shard_index_for_zone: HashMap::new(),
        })
    }

    /// Computes the zoned layout.
    pub fn create_first_chunks(
        &mut self,
        ctx: &PlanContext<'_>,
        pattern: &KeyPattern,
        params: &SplitPolicyParams,
    ) -> Result<ShardCollectionConfig, PlanError> {
        create_chunks_for_tags(ctx, pattern, params, self)
    }
}

impl TagsBasedPolicy for SingleChunkPerTagPolicy {
    fn tags(&self) -> &[Zone] {
        &self.tags
    }

    fn tag_to_shards(&self) -> &BTreeMap<String, Vec<ShardId>> {
        &self.tag_to_shards
    }

    fn build_split_info(
        &mut self,
        tag: &Zone,
        _pattern: &KeyPattern,
    ) -> Result<SplitInfo, PlanError> {
        let next_index = self
            .next_shard_index_for_zone
            .entry(tag.name.clone())
            .or_insert(0);
        let round_robin = *next_index;
        *next_index += 1;

        let shards_for_tag = &self.tag_to_shards[&tag.name];
        let shard = shards_for_tag[round_robin % shards_for_tag.len()].clone();

        // No split points with this strategy: one chunk per zone.
        Ok(SplitInfo {
            split_points: Vec::new(),
            chunk_distribution: vec![(shard, 1)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SystemClock;
    use crate::registry::{ShardDoc, ShardRegistry};
    use tessera_core::{CollectionId, KeyField, Value};

    struct TaggedRegistry(Vec<ShardDoc>);

    impl TaggedRegistry {
        fn new(docs: Vec<(&str, &[&str])>) -> Self {
            Self(
                docs.into_iter()
                    .map(|(id, tags)| ShardDoc {
                        id: ShardId::from(id),
                        tags: tags.iter().map(|t| t.to_string()).collect(),
                    })
                    .collect(),
            )
        }
    }

    impl ShardRegistry for TaggedRegistry {
        fn all_shard_ids(&self) -> Result<Vec<ShardId>, PlanError> {
            Ok(self.0.iter().map(|d| d.id.clone()).collect())
        }

        fn shard_docs(&self) -> Result<Vec<ShardDoc>, PlanError> {
            Ok(self.0.clone())
        }
    }

    fn bound(v: Value) -> BoundKey {
        BoundKey::new(vec![("x".into(), v)])
    }

    fn params() -> SplitPolicyParams {
        SplitPolicyParams {
            collection: CollectionId::random(),
            primary_shard: ShardId::from("s1"),
        }
    }

    #[test]
    fn zones_and_holes_tile_the_key_space() {
        let registry = TaggedRegistry::new(vec![
            ("sa", &["z1"]),
            ("sb", &["z1"]),
            ("sc", &["z2"]),
        ]);
        let clock = SystemClock;
        let ctx = PlanContext::new(&registry, &clock);
        let pattern = KeyPattern::new(vec![KeyField::ascending("x")]).unwrap();

        let tags = vec![
            Zone::new("z1", bound(Value::MinKey), bound(Value::Int(10))),
            Zone::new("z2", bound(Value::Int(20)), bound(Value::MaxKey)),
        ];
        let mut policy = SingleChunkPerTagPolicy::new(&ctx, tags).unwrap();
        let config = policy
            .create_first_chunks(&ctx, &pattern, &params())
            .unwrap();

        // z1, the hole [10, 20), z2.
        assert_eq!(config.chunks.len(), 3);
        assert_eq!(config.chunks[0].range.min(), &pattern.global_min());
        assert_eq!(config.chunks[0].range.max(), &bound(Value::Int(10)));
        assert_eq!(config.chunks[1].range.max(), &bound(Value::Int(20)));
        assert_eq!(config.chunks[2].range.max(), &pattern.global_max());

        // Zone chunks live on shards assigned to their zone.
        let z1_owner = config.chunks[0].shard.as_str();
        assert!(z1_owner == "sa" || z1_owner == "sb");
        assert_eq!(config.chunks[2].shard, ShardId::from("sc"));
    }

    #[test]
    fn unassigned_zone_is_rejected() {
        let registry = TaggedRegistry::new(vec![("sa", &["z1"])]);
        let clock = SystemClock;
        let ctx = PlanContext::new(&registry, &clock);
        let pattern = KeyPattern::new(vec![KeyField::ascending("x")]).unwrap();

        let tags = vec![
            Zone::new("z1", bound(Value::MinKey), bound(Value::Int(10))),
            Zone::new("orphan", bound(Value::Int(10)), bound(Value::Int(20))),
        ];
        let mut policy = SingleChunkPerTagPolicy::new(&ctx, tags).unwrap();
        let err = policy
            .create_first_chunks(&ctx, &pattern, &params())
            .unwrap_err();
        assert!(
            matches!(err, PlanError::ZoneNotAssignedToShard { zone } if zone == "orphan")
        );
    }

    #[test]
    fn repeated_zone_names_round_robin_their_shards() {
        let registry = TaggedRegistry::new(vec![("sa", &["z"]), ("sb", &["z"])]);
        let clock = SystemClock;
        let ctx = PlanContext::new(&registry, &clock);
        let pattern = KeyPattern::new(vec![KeyField::ascending("x")]).unwrap();

        // The same zone name over two disjoint ranges: the second range
        // must land on the next shard in the zone's list.
        let tags = vec![
            Zone::new("z", bound(Value::Int(0)), bound(Value::Int(10))),
            Zone::new("z", bound(Value::Int(10)), bound(Value::Int(20))),
        ];
        let mut policy = SingleChunkPerTagPolicy::new(&ctx, tags).unwrap();
        let config = policy
            .create_first_chunks(&ctx, &pattern, &params())
            .unwrap();

        // Hole, z range 1, z range 2, hole.
        assert_eq!(config.chunks.len(), 4);
        assert_ne!(config.chunks[1].shard, config.chunks[2].shard);
    }
}
