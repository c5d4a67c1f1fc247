//! Presplit hashed zones: multiple hashed sub-chunks per zone.
//!
//! For empty collections with zones and a hashed shard key, each zone is
//! presplit into enough hashed sub-chunks that every shard of the zone
//! receives at least one, with per-shard quotas scaled down by how many
//! zones a shard is a member of.

use std::collections::BTreeMap;

use tessera_core::{BoundKey, KeyPattern, ShardId, Value, Zone};

use crate::context::PlanContext;
use crate::emit::SplitPolicyParams;
use crate::policy::tags::{create_chunks_for_tags, SplitInfo, TagsBasedPolicy};
use crate::policy::ShardCollectionConfig;
use crate::registry::build_tags_to_shard_ids_map;
use crate::split::calculate_hashed_split_points;
use crate::PlanError;

/// Presplits each zone of a hashed shard key into hashed sub-chunks.
#[derive(Debug)]
pub struct PresplitHashedZonesPolicy {
    tags: Vec<Zone>,
    tag_to_shards: BTreeMap<String, Vec<ShardId>>,
    num_tags_per_shard: BTreeMap<ShardId, usize>,
    num_initial_chunks: usize,
}

impl PresplitHashedZonesPolicy {
    /// Validates the zone setup and computes per-shard zone counts.
    ///
    /// `num_initial_chunks == 0` selects the default of twice the number
    /// of zone-carrying shards.
    pub fn new(
        ctx: &PlanContext<'_>,
        pattern: &KeyPattern,
        tags: Vec<Zone>,
        num_initial_chunks: usize,
        collection_is_empty: bool,
    ) -> Result<Self, PlanError> {
        let tag_to_shards = build_tags_to_shard_ids_map(ctx, &tags)?;
        validate(pattern, &tags, collection_is_empty)?;

        // A shard's quota shrinks with every zone it is a member of, so
        // shards serving several zones are not overloaded.
        let mut num_tags_per_shard: BTreeMap<ShardId, usize> = BTreeMap::new();
        for shards in tag_to_shards.values() {
            for shard in shards {
                *num_tags_per_shard.entry(shard.clone()).or_insert(0) += 1;
            }
        }
        assert!(
            !num_tags_per_shard.is_empty(),
            "validated zones must be assigned to at least one shard"
        );

        let num_initial_chunks = if num_initial_chunks == 0 {
            2 * num_tags_per_shard.len()
        } else {
            num_initial_chunks
        };

        Ok(Self {
            tags,
            tag_to_shards,
            num_tags_per_shard,
            num_initial_chunks,
        })
    }

    /// The effective chunk target after defaulting.
    pub fn num_initial_chunks(&self) -> usize {
        self.num_initial_chunks
    }

    /// Computes the presplit zoned layout.
    pub fn create_first_chunks(
        &mut self,
        ctx: &PlanContext<'_>,
        pattern: &KeyPattern,
        params: &SplitPolicyParams,
    ) -> Result<ShardCollectionConfig, PlanError> {
        create_chunks_for_tags(ctx, pattern, params, self)
    }
}

impl TagsBasedPolicy for PresplitHashedZonesPolicy {
    fn tags(&self) -> &[Zone] {
        &self.tags
    }

    fn tag_to_shards(&self) -> &BTreeMap<String, Vec<ShardId>> {
        &self.tag_to_shards
    }

    fn build_split_info(
        &mut self,
        tag: &Zone,
        pattern: &KeyPattern,
    ) -> Result<SplitInfo, PlanError> {
        // Rounding up keeps the total at or above num_initial_chunks and
        // guarantees every zone shard at least one chunk.
        let num_chunks_per_shard = self
            .num_initial_chunks
            .div_ceil(self.num_tags_per_shard.len());

        let shards_for_tag = &self.tag_to_shards[&tag.name];
        let mut chunk_distribution = Vec::with_capacity(shards_for_tag.len());
        let mut num_chunks_for_tag = 0usize;
        for shard in shards_for_tag {
            let quota = num_chunks_per_shard.div_ceil(self.num_tags_per_shard[shard]);
            chunk_distribution.push((shard.clone(), quota));
            num_chunks_for_tag += quota;
        }

        let hashed_idx = pattern
            .hashed_field_index()
            .expect("validated pattern has a hashed field");
        let prefix = BoundKey::new(tag.min.fields()[..hashed_idx].to_vec());

        Ok(SplitInfo {
            split_points: calculate_hashed_split_points(pattern, &prefix, num_chunks_for_tag),
            chunk_distribution,
        })
    }
}

/// Checks the zone shape rules for hashed presplitting.
///
/// With a hashed-prefix key, exactly one zone must cover the whole key
/// space. With a hashed-suffix key, each zone's bounds must isolate a
/// concrete prefix: no sentinels in the lower bound's prefix fields, at
/// least one prefix field differing between the bounds, and MinKey for
/// the hashed field and everything after it in the lower bound.
fn validate(
    pattern: &KeyPattern,
    tags: &[Zone],
    collection_is_empty: bool,
) -> Result<(), PlanError> {
    if !(collection_is_empty && !tags.is_empty() && pattern.is_hashed()) {
        return Err(PlanError::PresplitNotSupported);
    }

    if pattern.has_hashed_prefix() {
        let covers_everything = tags.len() == 1
            && tags[0].min == pattern.global_min()
            && tags[0].max == pattern.global_max();
        if !covers_everything {
            return Err(PlanError::SingleCoveringZoneRequired);
        }
        return Ok(());
    }

    let hashed_idx = pattern
        .hashed_field_index()
        .expect("hashed pattern checked above");
    for tag in tags {
        let mut is_prefix_different = false;
        for i in 0..hashed_idx {
            match tag.min.value_at(i) {
                Some(value) if !value.is_min_key() && !value.is_max_key() => {}
                _ => {
                    return Err(PlanError::ZonePrefixBoundHasSentinel {
                        zone: tag.name.clone(),
                    })
                }
            }
            is_prefix_different = is_prefix_different || tag.min.value_at(i) != tag.max.value_at(i);
        }
        if !is_prefix_different {
            return Err(PlanError::ZonePrefixNotDistinct {
                zone: tag.name.clone(),
            });
        }

        if tag.min.value_at(hashed_idx) != Some(&Value::MinKey) {
            return Err(PlanError::ZoneHashedBoundNotMinKey {
                zone: tag.name.clone(),
            });
        }

        for (_, value) in &tag.min.fields()[hashed_idx + 1..] {
            if !value.is_min_key() {
                return Err(PlanError::ZoneSuffixBoundNotMinKey {
                    zone: tag.name.clone(),
                });
            }
        }
    }
    Ok(())
}
