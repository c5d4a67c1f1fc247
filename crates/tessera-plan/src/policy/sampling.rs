//! Sampling-based policy: split points drawn from existing data.
//!
//! Used when a populated collection is resharded: split points come from
//! zone boundaries topped up with sorted samples of the live shard-key
//! population, and every resulting chunk goes to the least-loaded shard
//! its zone permits.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use tessera_core::{ChunkRange, KeyPattern, ShardId, Zone, ZoneInfo};

use crate::context::PlanContext;
use crate::emit::{ChunkEmitter, SplitPolicyParams};
use crate::policy::ShardCollectionConfig;
use crate::registry::{build_tags_to_shard_ids_map, shuffled_shard_ids};
use crate::sample::SampleSource;
use crate::split::extract_split_points_from_zones;
use crate::PlanError;

/// Chunk counts per shard during greedy assignment.
type ChunkDistributionMap = BTreeMap<ShardId, usize>;

/// Zone name to permitted shards; the empty name holds the unzoned pool.
type ZoneShardMap = BTreeMap<String, Vec<ShardId>>;

/// The shard with the fewest chunks among those the range's zone permits.
///
/// Unzoned ranges resolve to the empty zone name, whose entry holds the
/// full inventory. Ties are broken by the zone's shard-list order.
pub fn select_best_shard(
    chunk_distribution: &ChunkDistributionMap,
    zone_info: &ZoneInfo,
    zone_to_shards: &ZoneShardMap,
    range: &ChunkRange,
) -> Result<ShardId, PlanError> {
    let zone = zone_info.zone_for_range(range);
    let shards = zone_to_shards
        .get(zone)
        .ok_or_else(|| PlanError::ZoneNotFound {
            zone: zone.to_owned(),
        })?;
    if shards.is_empty() {
        return Err(PlanError::EmptyZoneShards {
            zone: zone.to_owned(),
        });
    }

    let mut best: Option<(&ShardId, usize)> = None;
    for shard in shards {
        let count = chunk_distribution.get(shard).copied().unwrap_or(0);
        if best.map_or(true, |(_, best_count)| count < best_count) {
            best = Some((shard, count));
        }
    }
    let (shard, _) = best.expect("shard list checked non-empty");
    Ok(shard.clone())
}

/// Derives split points by sampling and assigns chunks load-aware.
pub struct SamplingPolicy {
    num_initial_chunks: usize,
    zones: Option<Vec<Zone>>,
    samples: Box<dyn SampleSource>,
}

impl SamplingPolicy {
    /// Validates the chunk target and zone list and builds the policy.
    ///
    /// `samples` should already be wrapped in a
    /// [`SkippingSampleSource`](crate::sample::SkippingSampleSource) when
    /// a `samples_per_chunk` factor above one is wanted.
    pub fn new(
        num_initial_chunks: usize,
        zones: Option<Vec<Zone>>,
        samples: Box<dyn SampleSource>,
    ) -> Result<Self, PlanError> {
        if num_initial_chunks == 0 {
            return Err(PlanError::ChunkCountTooSmall);
        }
        if zones.as_ref().is_some_and(Vec::is_empty) {
            return Err(PlanError::EmptyZoneList);
        }
        Ok(Self {
            num_initial_chunks,
            zones,
            samples,
        })
    }

    /// Split points from zone boundaries topped up with samples.
    ///
    /// Fails with the cardinality code when fewer than
    /// `num_initial_chunks - 1` distinct points can be produced.
    fn create_first_split_points(
        &mut self,
        ctx: &PlanContext<'_>,
        pattern: &KeyPattern,
    ) -> Result<BTreeSet<tessera_core::BoundKey>, PlanError> {
        if let Some(zones) = &mut self.zones {
            for zone in zones.iter_mut() {
                zone.min = pattern.extend_range_bound(&zone.min, false)?;
                zone.max = pattern.extend_range_bound(&zone.max, false)?;
            }
        }

        let mut split_points = extract_split_points_from_zones(pattern, self.zones.as_deref());
        let wanted = self.num_initial_chunks - 1;
        if split_points.len() < wanted {
            let mut remaining = wanted - split_points.len();
            loop {
                ctx.checkpoint()?;
                let Some(key) = self.samples.next()? else {
                    break;
                };
                if split_points.insert(key) {
                    remaining -= 1;
                }
                if remaining == 0 {
                    break;
                }
            }
        }

        if split_points.len() < wanted {
            return Err(PlanError::InsufficientCardinality {
                requested: self.num_initial_chunks,
                achievable: split_points.len() + 1,
            });
        }
        Ok(split_points)
    }

    /// Computes the sampled layout.
    pub fn create_first_chunks(
        &mut self,
        ctx: &PlanContext<'_>,
        pattern: &KeyPattern,
        params: &SplitPolicyParams,
    ) -> Result<ShardCollectionConfig, PlanError> {
        let split_points = self.create_first_split_points(ctx, pattern)?;

        let mut zone_info = ZoneInfo::new();
        let mut zone_to_shards = ZoneShardMap::new();
        if let Some(zones) = &self.zones {
            zone_to_shards = build_tags_to_shard_ids_map(ctx, zones)?;
            for zone in zones {
                zone_info.add_zone(zone.clone())?;
            }
        }

        let all_shard_ids = shuffled_shard_ids(ctx)?;
        let mut chunk_distribution: ChunkDistributionMap = all_shard_ids
            .iter()
            .map(|shard| (shard.clone(), 0))
            .collect();
        // The unzoned pool: any shard, least-loaded first.
        zone_to_shards.insert(String::new(), all_shard_ids);

        let mut emitter = ChunkEmitter::new(params, ctx.valid_after());
        let mut last_chunk_max = pattern.global_min();
        for point in split_points
            .iter()
            .chain(std::iter::once(&pattern.global_max()))
        {
            let range = ChunkRange::new(last_chunk_max.clone(), point.clone())?;
            let best_shard =
                select_best_shard(&chunk_distribution, &zone_info, &zone_to_shards, &range)?;
            emitter.append(last_chunk_max, point.clone(), best_shard.clone())?;
            *chunk_distribution.entry(best_shard).or_insert(0) += 1;
            last_chunk_max = point.clone();
        }

        debug!(
            chunks = emitter.len(),
            requested = self.num_initial_chunks,
            "assigned sampled chunks"
        );
        Ok(ShardCollectionConfig {
            chunks: emitter.finish(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SystemClock;
    use crate::registry::{ShardDoc, ShardRegistry};
    use tessera_core::{BoundKey, CollectionId, KeyField, Value};

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

    struct VecSource(std::vec::IntoIter<BoundKey>);

    impl VecSource {
        fn of(values: &[i64]) -> Box<dyn SampleSource> {
            Box::new(Self(
                values
                    .iter()
                    .map(|v| BoundKey::new(vec![("x".into(), Value::Int(*v))]))
                    .collect::<Vec<_>>()
                    .into_iter(),
            ))
        }
    }

    impl SampleSource for VecSource {
        fn next(&mut self) -> Result<Option<BoundKey>, PlanError> {
            Ok(self.0.next())
        }
    }

    fn params() -> SplitPolicyParams {
        SplitPolicyParams {
            collection: CollectionId::random(),
            primary_shard: ShardId::from("s1"),
        }
    }

    fn pattern() -> KeyPattern {
        KeyPattern::new(vec![KeyField::ascending("x")]).unwrap()
    }

    #[test]
    fn rejects_zero_chunks_and_empty_zone_list() {
        assert!(matches!(
            SamplingPolicy::new(0, None, VecSource::of(&[])),
            Err(PlanError::ChunkCountTooSmall)
        ));
        assert!(matches!(
            SamplingPolicy::new(4, Some(vec![]), VecSource::of(&[])),
            Err(PlanError::EmptyZoneList)
        ));
    }

    #[test]
    fn insufficient_cardinality_is_reported() {
        let registry = TaggedRegistry::new(vec![("s1", &[]), ("s2", &[])]);
        let clock = SystemClock;
        let ctx = PlanContext::new(&registry, &clock);

        // Ten chunks wanted, only four distinct keys in the data.
        let mut policy =
            SamplingPolicy::new(10, None, VecSource::of(&[1, 2, 2, 3, 3, 4])).unwrap();
        let err = policy
            .create_first_chunks(&ctx, &pattern(), &params())
            .unwrap_err();
        match err {
            PlanError::InsufficientCardinality {
                requested,
                achievable,
            } => {
                assert_eq!(requested, 10);
                assert_eq!(achievable, 5);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn chunks_spread_evenly_without_zones() {
        let registry = TaggedRegistry::new(vec![("s1", &[]), ("s2", &[])]);
        let clock = SystemClock;
        let ctx = PlanContext::new(&registry, &clock);

        let mut policy = SamplingPolicy::new(4, None, VecSource::of(&[10, 20, 30])).unwrap();
        let config = policy
            .create_first_chunks(&ctx, &pattern(), &params())
            .unwrap();

        assert_eq!(config.chunks.len(), 4);
        let on_s1 = config.chunks.iter().filter(|c| c.shard.as_str() == "s1").count();
        let on_s2 = config.chunks.iter().filter(|c| c.shard.as_str() == "s2").count();
        assert_eq!(on_s1, 2);
        assert_eq!(on_s2, 2);
    }

    #[test]
    fn zoned_chunks_respect_zone_shards() {
        let registry = TaggedRegistry::new(vec![("s1", &["hot"]), ("s2", &[]), ("s3", &[])]);
        let clock = SystemClock;
        let ctx = PlanContext::new(&registry, &clock);

        // The zone is under-specified; bounds get extended to key shape.
        let zones = vec![Zone::new(
            "hot",
            BoundKey::new(vec![("x".into(), Value::Int(0))]),
            BoundKey::new(vec![("x".into(), Value::Int(100))]),
        )];
        let mut policy =
            SamplingPolicy::new(4, Some(zones), VecSource::of(&[10, 50, 200])).unwrap();
        let config = policy
            .create_first_chunks(&ctx, &pattern(), &params())
            .unwrap();

        for chunk in &config.chunks {
            let min = chunk.range.min().value_at(0).unwrap();
            let max = chunk.range.max().value_at(0).unwrap();
            if *min >= Value::Int(0) && *max <= Value::Int(100) {
                assert_eq!(
                    chunk.shard,
                    ShardId::from("s1"),
                    "zoned chunk {} must live on the zone's shard",
                    chunk.range
                );
            }
        }

        // Zone boundaries appear as chunk boundaries.
        let boundaries: Vec<_> = config
            .chunks
            .iter()
            .map(|c| c.range.min().value_at(0).unwrap().clone())
            .collect();
        assert!(boundaries.contains(&Value::Int(0)));
        assert!(boundaries.contains(&Value::Int(100)));
    }

    #[test]
    fn sampling_stops_once_enough_points_are_found() {
        let registry = TaggedRegistry::new(vec![("s1", &[])]);
        let clock = SystemClock;
        let ctx = PlanContext::new(&registry, &clock);

        let mut policy = SamplingPolicy::new(2, None, VecSource::of(&[5, 6, 7, 8])).unwrap();
        let config = policy
            .create_first_chunks(&ctx, &pattern(), &params())
            .unwrap();
        // One split point suffices for two chunks.
        assert_eq!(config.chunks.len(), 2);
        assert_eq!(
            config.chunks[0].range.max().value_at(0),
            Some(&Value::Int(5))
        );
    }
}
