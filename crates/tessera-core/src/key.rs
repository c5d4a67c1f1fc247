//! Shard-key patterns and range bounds.
//!
//! A [`KeyPattern`] is the ordered list of fields a collection is
//! partitioned by; a [`BoundKey`] is a concrete point in that key space,
//! used for chunk bounds, split points, and zone ranges.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

/// Errors from key-pattern and bound validation.
#[derive(Debug, Error)]
pub enum KeyError {
    /// A key pattern must have at least one field.
    #[error("shard key pattern must contain at least one field")]
    EmptyPattern,

    /// At most one field of a pattern may be hashed.
    #[error("shard key pattern contains more than one hashed field")]
    MultipleHashedFields,

    /// A bound's fields do not form a prefix of the pattern.
    #[error("bound field '{found}' does not match pattern field '{expected}'")]
    BoundMismatch {
        /// Field name the pattern requires at this position.
        expected: String,
        /// Field name the bound supplied.
        found: String,
    },

    /// A range requires `min < max`.
    #[error("invalid range: min {min} is not below max {max}")]
    EmptyRange {
        /// Offending lower bound.
        min: String,
        /// Offending upper bound.
        max: String,
    },
}

/// How a shard-key field partitions its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Range-partitioned in ascending canonical order.
    Ascending,
    /// Partitioned by a signed 64-bit hash of the value.
    Hashed,
}

/// A single field of a shard-key pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyField {
    /// Document field name.
    pub name: String,
    /// Partitioning kind.
    pub kind: FieldKind,
}

impl KeyField {
    /// Creates an ascending range field.
    pub fn ascending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Ascending,
        }
    }

    /// Creates a hashed field.
    pub fn hashed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Hashed,
        }
    }
}

/// An ordered shard-key pattern with at most one hashed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPattern {
    fields: Vec<KeyField>,
}

impl KeyPattern {
    /// Validates and builds a pattern.
    pub fn new(fields: Vec<KeyField>) -> Result<Self, KeyError> {
        if fields.is_empty() {
            return Err(KeyError::EmptyPattern);
        }
        let hashed = fields
            .iter()
            .filter(|f| f.kind == FieldKind::Hashed)
            .count();
        if hashed > 1 {
            return Err(KeyError::MultipleHashedFields);
        }
        Ok(Self { fields })
    }

    /// The pattern's fields in order.
    pub fn fields(&self) -> &[KeyField] {
        &self.fields
    }

    /// Field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// True if any field is hashed.
    pub fn is_hashed(&self) -> bool {
        self.hashed_field_index().is_some()
    }

    /// True if the first field is the hashed field.
    pub fn has_hashed_prefix(&self) -> bool {
        self.hashed_field_index() == Some(0)
    }

    /// Position of the hashed field, if any.
    pub fn hashed_field_index(&self) -> Option<usize> {
        self.fields.iter().position(|f| f.kind == FieldKind::Hashed)
    }

    /// The hashed field, if any.
    pub fn hashed_field(&self) -> Option<&KeyField> {
        self.hashed_field_index().map(|i| &self.fields[i])
    }

    /// The lower bound of the whole key space: every field `MinKey`.
    pub fn global_min(&self) -> BoundKey {
        BoundKey::new(
            self.fields
                .iter()
                .map(|f| (f.name.clone(), Value::MinKey))
                .collect(),
        )
    }

    /// The upper bound of the whole key space: every field `MaxKey`.
    pub fn global_max(&self) -> BoundKey {
        BoundKey::new(
            self.fields
                .iter()
                .map(|f| (f.name.clone(), Value::MaxKey))
                .collect(),
        )
    }

    /// Extends a possibly short bound to the full pattern shape.
    ///
    /// Supplied fields must form a name-wise prefix of the pattern;
    /// trailing unspecified fields are filled with `MinKey`, or `MaxKey`
    /// when `to_max` is set.
    pub fn extend_range_bound(&self, bound: &BoundKey, to_max: bool) -> Result<BoundKey, KeyError> {
        if bound.len() > self.fields.len() {
            return Err(KeyError::BoundMismatch {
                expected: String::from("<end of pattern>"),
                found: bound.fields()[self.fields.len()].0.clone(),
            });
        }
        for (supplied, field) in bound.fields().iter().zip(&self.fields) {
            if supplied.0 != field.name {
                return Err(KeyError::BoundMismatch {
                    expected: field.name.clone(),
                    found: supplied.0.clone(),
                });
            }
        }

        let fill = if to_max { Value::MaxKey } else { Value::MinKey };
        let mut fields = bound.fields().to_vec();
        for f in &self.fields[bound.len()..] {
            fields.push((f.name.clone(), fill.clone()));
        }
        Ok(BoundKey::new(fields))
    }
}

/// A concrete point in the shard-key space.
///
/// Comparison is positional-lexicographic: two bounds of the same
/// pattern compare field by field in pattern order, name before value,
/// shorter bounds ordering before their extensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundKey {
    fields: Vec<(String, Value)>,
}

impl BoundKey {
    /// Builds a bound from `(field name, value)` pairs in pattern order.
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    /// The bound's fields in order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Values in order, without names.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when no fields are present.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The value at a field position, if present.
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.fields.get(index).map(|(_, v)| v)
    }
}

impl Ord for BoundKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for ((name_a, a), (name_b, b)) in self.fields.iter().zip(&other.fields) {
            let cmp = name_a.cmp(name_b).then_with(|| a.cmp(b));
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        self.fields.len().cmp(&other.fields.len())
    }
}

impl PartialOrd for BoundKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(fields: &[KeyField]) -> KeyPattern {
        KeyPattern::new(fields.to_vec()).unwrap()
    }

    #[test]
    fn rejects_empty_pattern() {
        assert!(matches!(KeyPattern::new(vec![]), Err(KeyError::EmptyPattern)));
    }

    #[test]
    fn rejects_two_hashed_fields() {
        let err = KeyPattern::new(vec![KeyField::hashed("a"), KeyField::hashed("b")]);
        assert!(matches!(err, Err(KeyError::MultipleHashedFields)));
    }

    #[test]
    fn hashed_prefix_detection() {
        let p = pattern(&[KeyField::hashed("h"), KeyField::ascending("x")]);
        assert!(p.is_hashed());
        assert!(p.has_hashed_prefix());

        let p = pattern(&[KeyField::ascending("x"), KeyField::hashed("h")]);
        assert!(p.is_hashed());
        assert!(!p.has_hashed_prefix());
        assert_eq!(p.hashed_field_index(), Some(1));
    }

    #[test]
    fn global_bounds_tile_everything() {
        let p = pattern(&[KeyField::ascending("x"), KeyField::ascending("y")]);
        let min = p.global_min();
        let max = p.global_max();
        assert!(min < max);
        assert!(min.values().all(Value::is_min_key));
        assert!(max.values().all(Value::is_max_key));
    }

    #[test]
    fn extend_range_bound_fills_trailing_fields() {
        let p = pattern(&[KeyField::ascending("x"), KeyField::ascending("y")]);
        let partial = BoundKey::new(vec![("x".into(), Value::Int(7))]);

        let low = p.extend_range_bound(&partial, false).unwrap();
        assert_eq!(low.value_at(1), Some(&Value::MinKey));

        let high = p.extend_range_bound(&partial, true).unwrap();
        assert_eq!(high.value_at(1), Some(&Value::MaxKey));
        assert!(low < high);
    }

    #[test]
    fn extend_range_bound_rejects_wrong_prefix() {
        let p = pattern(&[KeyField::ascending("x"), KeyField::ascending("y")]);
        let bad = BoundKey::new(vec![("y".into(), Value::Int(7))]);
        assert!(matches!(
            p.extend_range_bound(&bad, false),
            Err(KeyError::BoundMismatch { .. })
        ));
    }

    #[test]
    fn bound_comparison_is_lexicographic() {
        let a = BoundKey::new(vec![("x".into(), Value::Int(1)), ("y".into(), Value::MaxKey)]);
        let b = BoundKey::new(vec![("x".into(), Value::Int(2)), ("y".into(), Value::MinKey)]);
        assert!(a < b);
    }
}
