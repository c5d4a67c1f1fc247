//! Chunks: contiguous key ranges assigned to shards.
//!
//! A planning run tiles the key space with half-open [`ChunkRange`]s and
//! stamps each resulting [`Chunk`] with a monotonically increasing
//! [`ChunkVersion`]. The catalog uses versions to order chunk mutations;
//! the planner only ever mints the initial `(1, 0)`, `(1, 1)`, ... series
//! under a fresh epoch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{CollectionId, PlacementEpoch, ShardId};
use crate::key::{BoundKey, KeyError};
use crate::time::Timestamp;

/// A half-open interval `[min, max)` of the shard-key space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRange {
    min: BoundKey,
    max: BoundKey,
}

impl ChunkRange {
    /// Validates `min < max` and builds the range.
    pub fn new(min: BoundKey, max: BoundKey) -> Result<Self, KeyError> {
        if min >= max {
            return Err(KeyError::EmptyRange {
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(Self { min, max })
    }

    /// Inclusive lower bound.
    pub fn min(&self) -> &BoundKey {
        &self.min
    }

    /// Exclusive upper bound.
    pub fn max(&self) -> &BoundKey {
        &self.max
    }

    /// True when `other` lies entirely within this range.
    pub fn contains_range(&self, other: &ChunkRange) -> bool {
        self.min <= other.min && other.max <= self.max
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}

/// Version metadata ordering chunk mutations within an epoch.
///
/// All chunks of one planning run share `epoch` and `timestamp`; the
/// `(major, minor)` pair increases strictly in emission order. Ordering
/// is only meaningful between versions of the same epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ChunkVersion {
    /// Layout epoch shared by the whole run.
    pub epoch: PlacementEpoch,
    /// Cluster time the layout becomes valid.
    pub timestamp: Timestamp,
    /// Major component; the planner always emits `1`.
    pub major: u32,
    /// Minor component, bumped once per emitted chunk.
    pub minor: u32,
}

impl ChunkVersion {
    /// The initial version of a fresh layout: `(1, 0)` under a new epoch.
    pub fn initial(epoch: PlacementEpoch, timestamp: Timestamp) -> Self {
        Self {
            epoch,
            timestamp,
            major: 1,
            minor: 0,
        }
    }

    /// Bumps the minor component in place.
    pub fn inc_minor(&mut self) {
        self.minor += 1;
    }
}

impl fmt::Display for ChunkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}.{}", self.epoch, self.timestamp, self.major, self.minor)
    }
}

/// One entry of a chunk's placement history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkHistoryEntry {
    /// Cluster time since which the chunk lives on `shard`.
    pub valid_after: Timestamp,
    /// The owning shard.
    pub shard: ShardId,
}

/// A chunk: a key range placed on a shard, with version and history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Collection the chunk belongs to.
    pub collection: CollectionId,
    /// The key range the chunk owns.
    pub range: ChunkRange,
    /// Version stamped at emission.
    pub version: ChunkVersion,
    /// Current owning shard.
    pub shard: ShardId,
    /// Placement history; a freshly planned chunk has exactly one entry
    /// equal to its current placement.
    pub history: Vec<ChunkHistoryEntry>,
}

impl Chunk {
    /// Builds a chunk whose history records the current placement since
    /// the version's timestamp.
    pub fn new(
        collection: CollectionId,
        range: ChunkRange,
        version: ChunkVersion,
        shard: ShardId,
    ) -> Self {
        let history = vec![ChunkHistoryEntry {
            valid_after: version.timestamp,
            shard: shard.clone(),
        }];
        Self {
            collection,
            range,
            version,
            shard,
            history,
        }
    }

    /// Cluster time since which the chunk has lived on its current shard.
    pub fn on_current_shard_since(&self) -> Timestamp {
        self.history[0].valid_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn bound(v: i64) -> BoundKey {
        BoundKey::new(vec![("x".into(), Value::Int(v))])
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        assert!(ChunkRange::new(bound(5), bound(5)).is_err());
        assert!(ChunkRange::new(bound(6), bound(5)).is_err());
        assert!(ChunkRange::new(bound(5), bound(6)).is_ok());
    }

    #[test]
    fn containment() {
        let outer = ChunkRange::new(bound(0), bound(100)).unwrap();
        let inner = ChunkRange::new(bound(10), bound(20)).unwrap();
        let straddling = ChunkRange::new(bound(90), bound(110)).unwrap();
        assert!(outer.contains_range(&inner));
        assert!(outer.contains_range(&outer));
        assert!(!outer.contains_range(&straddling));
    }

    #[test]
    fn version_minor_bump_is_strictly_increasing() {
        let epoch = PlacementEpoch::random();
        let ts = Timestamp::new(100, 0);
        let mut version = ChunkVersion::initial(epoch, ts);
        let first = version;
        version.inc_minor();
        assert!(first < version);
        assert_eq!(version.minor, 1);
        assert_eq!(version.major, 1);
    }

    #[test]
    fn new_chunk_history_mirrors_placement() {
        let epoch = PlacementEpoch::random();
        let ts = Timestamp::new(7, 3);
        let version = ChunkVersion::initial(epoch, ts);
        let range = ChunkRange::new(bound(0), bound(1)).unwrap();
        let chunk = Chunk::new(CollectionId::random(), range, version, ShardId::from("s1"));

        assert_eq!(chunk.history.len(), 1);
        assert_eq!(chunk.history[0].shard, chunk.shard);
        assert_eq!(chunk.on_current_shard_since(), ts);
    }
}
