//! Tessera Plan - Initial chunk placement planner.
//!
//! Given a shard-key pattern, the shard inventory, optional zones, and a
//! distribution policy, the planner computes the initial chunk layout of
//! a sharded collection: contiguous half-open ranges tiling the key
//! space, each assigned to a shard and stamped with version metadata.
//! The output is deterministic and handed to a metadata-catalog writer;
//! the planner itself persists nothing.
//!
//! Five policies are provided, dispatched either automatically
//! ([`policy::select_policy`]) or explicitly by resharding-style callers:
//! single chunk on the primary, hashed split points, one chunk per zone,
//! presplit hashed zones, data sampling, and an explicit per-shard
//! distribution.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod context;
pub mod emit;
pub mod policy;
pub mod registry;
pub mod sample;
pub mod split;

pub use context::{CancelToken, ClusterClock, PlanContext, SystemClock, DEFAULT_SHUFFLE_SEED};
pub use emit::{ChunkEmitter, SplitPolicyParams};
pub use policy::{
    select_policy, PresplitHashedZonesPolicy, SamplingPolicy, ShardCollectionConfig,
    ShardDistributionPolicy, ShardKeyRange, SingleChunkOnPrimaryPolicy, SingleChunkPerTagPolicy,
    SplitPointsPolicy, SplitPolicy,
};
pub use registry::{ShardDoc, ShardRegistry};
pub use sample::{SampleQuery, SampleSource, SkippingSampleSource, DEFAULT_SAMPLES_PER_CHUNK};

use thiserror::Error;

use tessera_core::{KeyError, ZoneOverlapError};

/// Errors surfaced by the planner.
///
/// Precondition and capacity violations carry a stable numeric code
/// (see [`PlanError::code`]) that is visible on the wire; transient
/// collaborator failures and cancellation carry none and are propagated
/// for the caller to handle.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Invalid combination of caller-supplied options.
    #[error("invalid options: {message}")]
    InvalidOptions {
        /// Why the options were rejected.
        message: String,
    },

    /// `num_initial_chunks` must be positive for the sampling policy.
    #[error("the requested number of initial chunks must be greater than zero")]
    ChunkCountTooSmall,

    /// `samples_per_chunk` must be positive.
    #[error("samples per chunk must be greater than zero")]
    SamplesPerChunkTooSmall,

    /// A zone list was supplied but empty.
    #[error("provided zone list must not be empty")]
    EmptyZoneList,

    /// A chunk range resolved to a zone the shard map knows nothing about.
    #[error("no shards found for zone '{zone}' while creating initial chunks")]
    ZoneNotFound {
        /// The unresolvable zone name (empty for the unzoned pool).
        zone: String,
    },

    /// The shard key cannot produce the requested number of chunks.
    #[error(
        "the shard key does not have enough cardinality to make {requested} chunks; \
         it can only make {achievable} chunks"
    )]
    InsufficientCardinality {
        /// Chunk count the caller asked for.
        requested: usize,
        /// Chunk count the observed key population supports.
        achievable: usize,
    },

    /// A zone resolved to an empty shard list during shard selection.
    #[error("zone '{zone}' maps to an empty shard list while creating initial chunks")]
    EmptyZoneShards {
        /// The shardless zone name.
        zone: String,
    },

    /// Presplitting requires an empty collection, zones, and a hashed key.
    #[error(
        "presplitting hashed zones is only supported when the collection is empty, \
         zones are set up, and the shard key pattern has a hashed field"
    )]
    PresplitNotSupported,

    /// With a hashed-prefix key, presplitting needs one all-covering zone.
    #[error(
        "for hashed-prefix shard keys, presplitting is only supported with a single \
         zone covering the entire shard key range"
    )]
    SingleCoveringZoneRequired,

    /// A presplit zone's lower bound carries a sentinel before the hashed field.
    #[error(
        "zone '{zone}' does not support hashed presplitting: fields preceding the \
         hashed field must not be MinKey or MaxKey in the lower bound"
    )]
    ZonePrefixBoundHasSentinel {
        /// Offending zone.
        zone: String,
    },

    /// A presplit zone's lower bound does not set the hashed field to MinKey.
    #[error(
        "zone '{zone}' does not support hashed presplitting: the hashed field of \
         the lower bound must be MinKey"
    )]
    ZoneHashedBoundNotMinKey {
        /// Offending zone.
        zone: String,
    },

    /// A presplit zone's bounds agree on every field before the hashed field.
    #[error(
        "zone '{zone}' does not support hashed presplitting: the upper bound must \
         differ from the lower bound before the hashed field"
    )]
    ZonePrefixNotDistinct {
        /// Offending zone.
        zone: String,
    },

    /// A presplit zone's lower bound has a non-MinKey field after the hashed field.
    #[error(
        "zone '{zone}' does not support hashed presplitting: fields after the \
         hashed field must be MinKey in the lower bound"
    )]
    ZoneSuffixBoundNotMinKey {
        /// Offending zone.
        zone: String,
    },

    /// A zone exists that no shard carries.
    #[error(
        "cannot create chunks for zone '{zone}' which is not assigned to a shard; \
         assign the zone to a shard first"
    )]
    ZoneNotAssignedToShard {
        /// The unassigned zone.
        zone: String,
    },

    /// The registry returned no shard documents.
    #[error("could not find any shard documents")]
    NoShardDocuments,

    /// An explicit shard distribution was supplied but empty.
    #[error("shard distribution must not be empty")]
    EmptyShardDistribution,

    /// The registry returned no shard documents while resolving a distribution.
    #[error("could not find any shard documents for the supplied shard distribution")]
    NoShardDocumentsForDistribution,

    /// Zone ranges overlap.
    #[error(transparent)]
    ZoneOverlap(#[from] ZoneOverlapError),

    /// Key-space validation failure.
    #[error(transparent)]
    Key(#[from] KeyError),

    /// The caller's cancellation signal tripped at a blocking point.
    #[error("planning was cancelled")]
    Cancelled,

    /// Transient failure from an external collaborator, propagated
    /// unchanged. The planner does not retry.
    #[error("external collaborator failure: {0}")]
    External(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl PlanError {
    /// Shorthand for building an [`PlanError::InvalidOptions`].
    pub fn invalid_options(message: impl Into<String>) -> Self {
        PlanError::InvalidOptions {
            message: message.into(),
        }
    }

    /// Wraps a collaborator failure for unchanged propagation.
    pub fn external(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        PlanError::External(Box::new(err))
    }

    /// The stable wire-visible numeric code, if the error carries one.
    ///
    /// Precondition and capacity violations have codes; cancellation and
    /// transient collaborator failures do not.
    pub fn code(&self) -> Option<u32> {
        match self {
            PlanError::InvalidOptions { .. } | PlanError::Key(_) => Some(72),
            PlanError::ZoneOverlap(_) => Some(117),
            PlanError::ChunkCountTooSmall => Some(4952602),
            PlanError::SamplesPerChunkTooSmall => Some(4952603),
            PlanError::EmptyZoneList => Some(4952604),
            PlanError::ZoneNotFound { .. } => Some(4952605),
            PlanError::InsufficientCardinality { .. } => Some(4952606),
            PlanError::EmptyZoneShards { .. } => Some(4952607),
            PlanError::PresplitNotSupported => Some(31387),
            PlanError::ZonePrefixBoundHasSentinel { .. } => Some(31388),
            PlanError::ZoneHashedBoundNotMinKey { .. } => Some(31389),
            PlanError::ZonePrefixNotDistinct { .. } => Some(31390),
            PlanError::ZoneSuffixBoundNotMinKey { .. } => Some(31391),
            PlanError::SingleCoveringZoneRequired => Some(31412),
            PlanError::ZoneNotAssignedToShard { .. } => Some(50973),
            PlanError::NoShardDocuments => Some(50986),
            PlanError::EmptyShardDistribution => Some(7661501),
            PlanError::NoShardDocumentsForDistribution => Some(7661502),
            PlanError::Cancelled | PlanError::External(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            PlanError::invalid_options("whatever").code(),
            Some(72)
        );
        assert_eq!(
            PlanError::InsufficientCardinality {
                requested: 10,
                achievable: 5
            }
            .code(),
            Some(4952606)
        );
        assert_eq!(
            PlanError::ZoneNotAssignedToShard { zone: "z".into() }.code(),
            Some(50973)
        );
        assert_eq!(PlanError::EmptyShardDistribution.code(), Some(7661501));
        assert_eq!(PlanError::Cancelled.code(), None);
    }
}
