//! Shard-key field values.
//!
//! Every field of a shard key is a [`Value`]. Two distinguished sentinels,
//! `MinKey` and `MaxKey`, compare strictly below and above every concrete
//! value; the space of chunk bounds is closed under them.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single shard-key field value.
///
/// The canonical order is total: values are ranked
/// `MinKey < Null < Bool < Int < String < MaxKey`, and same-ranked values
/// compare by their natural order. This is the one comparator used for
/// chunk bounds, split points, and zone ranges; nothing else in the
/// planner compares values directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Value {
    /// Sentinel below every concrete value.
    MinKey,
    /// Explicit null (missing fields normalize to this).
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer. Hashed-field values live here: the hash
    /// space is the full `i64` range.
    Int(i64),
    /// UTF-8 string.
    String(String),
    /// Sentinel above every concrete value.
    MaxKey,
}

impl Value {
    /// Canonical rank used for cross-variant comparison.
    const fn rank(&self) -> u8 {
        match self {
            Value::MinKey => 0,
            Value::Null => 1,
            Value::Bool(_) => 2,
            Value::Int(_) => 3,
            Value::String(_) => 4,
            Value::MaxKey => 5,
        }
    }

    /// Returns true for the `MinKey` sentinel.
    pub const fn is_min_key(&self) -> bool {
        matches!(self, Value::MinKey)
    }

    /// Returns true for the `MaxKey` sentinel.
    pub const fn is_max_key(&self) -> bool {
        matches!(self, Value::MaxKey)
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = self.rank().cmp(&other.rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            // Same-rank sentinels and nulls are equal.
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::MinKey => write!(f, "MinKey"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::MaxKey => write!(f, "MaxKey"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
