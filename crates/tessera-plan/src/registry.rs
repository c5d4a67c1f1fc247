//! Read-only access to the shard registry.
//!
//! The registry is an external collaborator; the planner consumes it
//! through the [`ShardRegistry`] seam and never mutates it. The helpers
//! here derive the lookup maps the zoned policies need and the shuffled
//! inventory that spreads unconstrained chunks.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use tessera_core::{ShardId, Zone};

use crate::context::PlanContext;
use crate::PlanError;

/// A shard's registry document: its id plus the zone tags it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardDoc {
    /// The shard's id.
    pub id: ShardId,
    /// Zone tags assigned to the shard.
    pub tags: BTreeSet<String>,
}

/// Read-only view of the cluster's shard inventory.
///
/// Both reads may block on remote I/O; transient failures are surfaced
/// through [`PlanError::External`] and propagated unchanged.
pub trait ShardRegistry {
    /// All shard ids, in registry order.
    fn all_shard_ids(&self) -> Result<Vec<ShardId>, PlanError>;

    /// All shard documents, including zone tags, in registry order.
    fn shard_docs(&self) -> Result<Vec<ShardDoc>, PlanError>;
}

/// The full shard inventory in randomized order.
///
/// The permutation is driven by the context's shuffle seed, so a given
/// seed and inventory always produce the same order.
pub fn shuffled_shard_ids(ctx: &PlanContext<'_>) -> Result<Vec<ShardId>, PlanError> {
    ctx.checkpoint()?;
    let mut shard_ids = ctx.registry().all_shard_ids()?;
    let mut rng = StdRng::seed_from_u64(ctx.shuffle_seed());
    shard_ids.shuffle(&mut rng);
    Ok(shard_ids)
}

/// Maps each zone name to the shards carrying its tag.
///
/// Zones no shard carries get an empty entry, so callers can detect
/// unassigned zones. Shard order within an entry follows registry order.
pub fn build_tags_to_shard_ids_map(
    ctx: &PlanContext<'_>,
    zones: &[Zone],
) -> Result<BTreeMap<String, Vec<ShardId>>, PlanError> {
    let mut tag_to_shards: BTreeMap<String, Vec<ShardId>> = BTreeMap::new();
    if zones.is_empty() {
        return Ok(tag_to_shards);
    }

    ctx.checkpoint()?;
    let shard_docs = ctx.registry().shard_docs()?;
    if shard_docs.is_empty() {
        return Err(PlanError::NoShardDocuments);
    }

    for zone in zones {
        tag_to_shards.entry(zone.name.clone()).or_default();
    }
    for doc in &shard_docs {
        for tag in &doc.tags {
            if let Some(shards) = tag_to_shards.get_mut(tag) {
                shards.push(doc.id.clone());
            }
        }
    }

    debug!(zones = zones.len(), shards = shard_docs.len(), "built zone to shard map");
    Ok(tag_to_shards)
}

/// Maps each of the given shards to the zone tags it carries.
pub fn build_shard_id_to_tags_map<'a>(
    ctx: &PlanContext<'_>,
    shards: impl IntoIterator<Item = &'a ShardId>,
) -> Result<BTreeMap<ShardId, BTreeSet<String>>, PlanError> {
    let mut shard_to_tags: BTreeMap<ShardId, BTreeSet<String>> = BTreeMap::new();
    for shard in shards {
        shard_to_tags.entry(shard.clone()).or_default();
    }
    if shard_to_tags.is_empty() {
        return Ok(shard_to_tags);
    }

    ctx.checkpoint()?;
    let shard_docs = ctx.registry().shard_docs()?;
    if shard_docs.is_empty() {
        return Err(PlanError::NoShardDocumentsForDistribution);
    }

    for doc in shard_docs {
        if let Some(tags) = shard_to_tags.get_mut(&doc.id) {
            tags.extend(doc.tags);
        }
    }
    Ok(shard_to_tags)
}
