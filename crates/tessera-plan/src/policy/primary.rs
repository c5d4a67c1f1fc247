//! Fallback policy: the whole key space as one chunk on the primary.

use tessera_core::KeyPattern;

use crate::context::PlanContext;
use crate::emit::{ChunkEmitter, SplitPolicyParams};
use crate::policy::ShardCollectionConfig;
use crate::PlanError;

/// Emits a single chunk `[global_min, global_max)` on the primary shard.
///
/// Used for non-empty collections without zones, and as the general
/// fallback when no other policy applies.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleChunkOnPrimaryPolicy;

impl SingleChunkOnPrimaryPolicy {
    /// Computes the single-chunk layout.
    pub fn create_first_chunks(
        &mut self,
        ctx: &PlanContext<'_>,
        pattern: &KeyPattern,
        params: &SplitPolicyParams,
    ) -> Result<ShardCollectionConfig, PlanError> {
        let mut emitter = ChunkEmitter::new(params, ctx.valid_after());
        emitter.append(
            pattern.global_min(),
            pattern.global_max(),
            params.primary_shard.clone(),
        )?;
        Ok(ShardCollectionConfig {
            chunks: emitter.finish(),
        })
    }
}
