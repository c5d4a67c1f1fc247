//! Tessera Core - Key-space types for the Tessera sharding control plane.
//!
//! This crate provides:
//! - Shard-key field values with MinKey/MaxKey sentinels and a single
//!   canonical comparator
//! - Key patterns and range bounds (`KeyPattern`, `BoundKey`)
//! - Chunk ranges, versions, and placement history
//! - Zones (named key ranges bound to shard sets)
//! - Identifier types (`ShardId`, `CollectionId`, `PlacementEpoch`)
//! - Hybrid logical cluster timestamps

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod chunk;
pub mod ids;
pub mod key;
pub mod time;
pub mod value;
pub mod zone;

pub use chunk::{Chunk, ChunkHistoryEntry, ChunkRange, ChunkVersion};
pub use ids::{CollectionId, PlacementEpoch, ShardId};
pub use key::{BoundKey, FieldKind, KeyError, KeyField, KeyPattern};
pub use time::Timestamp;
pub use value::Value;
pub use zone::{Zone, ZoneInfo, ZoneOverlapError};
