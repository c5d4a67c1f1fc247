//! Zones: named key ranges bound to sets of shards.
//!
//! A zone constrains placement: chunks that fall entirely inside a zone's
//! range may only live on shards carrying the zone's tag. Zone ranges
//! never overlap; [`ZoneInfo`] enforces that and answers containment
//! lookups.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunk::ChunkRange;
use crate::key::BoundKey;

/// Two zone ranges overlap.
#[derive(Debug, Error)]
#[error("zone '{adding}' overlaps existing zone '{existing}'")]
pub struct ZoneOverlapError {
    /// Zone being added.
    pub adding: String,
    /// Zone already present.
    pub existing: String,
}

/// A named range of the shard-key space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone (tag) name.
    pub name: String,
    /// Inclusive lower bound.
    pub min: BoundKey,
    /// Exclusive upper bound.
    pub max: BoundKey,
}

impl Zone {
    /// Creates a zone.
    pub fn new(name: impl Into<String>, min: BoundKey, max: BoundKey) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {})", self.name, self.min, self.max)
    }
}

/// An ordered, overlap-free index of zone ranges.
#[derive(Debug, Clone, Default)]
pub struct ZoneInfo {
    // Sorted by min; ranges never overlap.
    zones: Vec<Zone>,
}

impl ZoneInfo {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a zone range, rejecting any overlap with existing ranges.
    pub fn add_zone(&mut self, zone: Zone) -> Result<(), ZoneOverlapError> {
        let idx = self.zones.partition_point(|z| z.min < zone.min);
        if let Some(prev) = idx.checked_sub(1).map(|i| &self.zones[i]) {
            if prev.max > zone.min {
                return Err(ZoneOverlapError {
                    adding: zone.name,
                    existing: prev.name.clone(),
                });
            }
        }
        if let Some(next) = self.zones.get(idx) {
            if zone.max > next.min {
                return Err(ZoneOverlapError {
                    adding: zone.name,
                    existing: next.name.clone(),
                });
            }
        }
        self.zones.insert(idx, zone);
        Ok(())
    }

    /// The name of the zone that fully contains `range`, or `""` when no
    /// zone does.
    pub fn zone_for_range(&self, range: &ChunkRange) -> &str {
        let idx = self.zones.partition_point(|z| z.min <= *range.min());
        let Some(candidate) = idx.checked_sub(1).map(|i| &self.zones[i]) else {
            return "";
        };
        if *range.max() <= candidate.max {
            candidate.name.as_str()
        } else {
            ""
        }
    }

    /// The indexed zones in ascending range order.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// True when no zones are indexed.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn bound(v: i64) -> BoundKey {
        BoundKey::new(vec![("x".into(), Value::Int(v))])
    }

    fn range(min: i64, max: i64) -> ChunkRange {
        ChunkRange::new(bound(min), bound(max)).unwrap()
    }

    #[test]
    fn rejects_overlapping_zones() {
        let mut info = ZoneInfo::new();
        info.add_zone(Zone::new("a", bound(0), bound(10))).unwrap();
        info.add_zone(Zone::new("b", bound(20), bound(30))).unwrap();

        assert!(info.add_zone(Zone::new("c", bound(5), bound(15))).is_err());
        assert!(info.add_zone(Zone::new("d", bound(15), bound(25))).is_err());
        assert!(info.add_zone(Zone::new("e", bound(0), bound(30))).is_err());
        // Adjacent is fine.
        info.add_zone(Zone::new("f", bound(10), bound(20))).unwrap();
    }

    #[test]
    fn containment_lookup() {
        let mut info = ZoneInfo::new();
        info.add_zone(Zone::new("a", bound(0), bound(10))).unwrap();
        info.add_zone(Zone::new("b", bound(20), bound(30))).unwrap();

        assert_eq!(info.zone_for_range(&range(0, 10)), "a");
        assert_eq!(info.zone_for_range(&range(2, 5)), "a");
        assert_eq!(info.zone_for_range(&range(25, 30)), "b");
        // Straddles a zone edge: unzoned.
        assert_eq!(info.zone_for_range(&range(5, 15)), "");
        // Entirely between zones: unzoned.
        assert_eq!(info.zone_for_range(&range(12, 18)), "");
        // Before all zones.
        assert_eq!(info.zone_for_range(&range(-5, 0)), "");
    }

    #[test]
    fn empty_info_zones_nothing() {
        let info = ZoneInfo::new();
        assert_eq!(info.zone_for_range(&range(0, 1)), "");
        assert!(info.is_empty());
    }
}
