//! Hashed split-points policy for empty, hashed-prefix collections.

use tessera_core::{BoundKey, KeyPattern};

use crate::context::PlanContext;
use crate::emit::{generate_initial_chunks, SplitPolicyParams};
use crate::policy::ShardCollectionConfig;
use crate::registry::shuffled_shard_ids;
use crate::PlanError;

/// Tiles the key space along pre-computed split points, assigning runs
/// of `num_contiguous_chunks_per_shard` chunks round-robin across the
/// shuffled shard inventory.
#[derive(Debug, Clone)]
pub struct SplitPointsPolicy {
    split_points: Vec<BoundKey>,
    num_contiguous_chunks_per_shard: usize,
}

impl SplitPointsPolicy {
    /// Builds the policy from pre-computed split points.
    pub fn new(split_points: Vec<BoundKey>, num_contiguous_chunks_per_shard: usize) -> Self {
        assert!(
            num_contiguous_chunks_per_shard > 0,
            "contiguous chunk run length must be positive"
        );
        Self {
            split_points,
            num_contiguous_chunks_per_shard,
        }
    }

    /// The split points the policy will tile along.
    pub fn split_points(&self) -> &[BoundKey] {
        &self.split_points
    }

    /// Computes the layout across the shuffled inventory.
    pub fn create_first_chunks(
        &mut self,
        ctx: &PlanContext<'_>,
        pattern: &KeyPattern,
        params: &SplitPolicyParams,
    ) -> Result<ShardCollectionConfig, PlanError> {
        let shard_ids = shuffled_shard_ids(ctx)?;
        let chunks = generate_initial_chunks(
            params,
            pattern,
            ctx.valid_after(),
            &self.split_points,
            &shard_ids,
            self.num_contiguous_chunks_per_shard,
        )?;
        Ok(ShardCollectionConfig { chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SystemClock;
    use crate::registry::{ShardDoc, ShardRegistry};
    use crate::split::calculate_hashed_split_points;
    use tessera_core::{CollectionId, KeyField, ShardId, Value};

    struct FixedRegistry(Vec<ShardId>);

    impl ShardRegistry for FixedRegistry {
        fn all_shard_ids(&self) -> Result<Vec<ShardId>, PlanError> {
            Ok(self.0.clone())
        }

        fn shard_docs(&self) -> Result<Vec<ShardDoc>, PlanError> {
            Ok(self
                .0
                .iter()
                .map(|id| ShardDoc {
                    id: id.clone(),
                    tags: Default::default(),
                })
                .collect())
        }
    }

    #[test]
    fn hashed_layout_tiles_and_spreads() {
        let registry = FixedRegistry(vec![
            ShardId::from("s1"),
            ShardId::from("s2"),
            ShardId::from("s3"),
        ]);
        let clock = SystemClock;
        let ctx = PlanContext::new(&registry, &clock);
        let pattern = KeyPattern::new(vec![KeyField::hashed("h")]).unwrap();
        let params = SplitPolicyParams {
            collection: CollectionId::random(),
            primary_shard: ShardId::from("s1"),
        };

        let points = calculate_hashed_split_points(&pattern, &BoundKey::new(vec![]), 4);
        let mut policy = SplitPointsPolicy::new(points, 1);
        let config = policy.create_first_chunks(&ctx, &pattern, &params).unwrap();

        assert_eq!(config.chunks.len(), 4);
        assert_eq!(config.chunks[0].range.min(), &pattern.global_min());
        assert_eq!(config.chunks[3].range.max(), &pattern.global_max());
        assert_eq!(
            config.chunks[1].range.min().value_at(0),
            Some(&Value::Int(-4611686018427387902))
        );
        // Round-robin with one contiguous chunk per shard: the fourth
        // chunk wraps around to the first shuffled shard.
        assert_eq!(config.chunks[0].shard, config.chunks[3].shard);
        assert_ne!(config.chunks[0].shard, config.chunks[1].shard);
        assert_ne!(config.chunks[1].shard, config.chunks[2].shard);
    }
}
