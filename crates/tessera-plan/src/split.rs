//! Split-point construction.
//!
//! Two sources of split points exist: zone boundaries (any zoned policy)
//! and the symmetric partition of the signed 64-bit hash space (hashed
//! policies). Both produce bounds ordered by the canonical comparator.

use std::collections::BTreeSet;

use tessera_core::{BoundKey, KeyPattern, Value, Zone};

/// The sorted, unique set of zone boundary keys, with the global bounds
/// removed.
///
/// Used to seed split points so every zone boundary becomes a chunk
/// boundary.
pub fn extract_split_points_from_zones(
    pattern: &KeyPattern,
    zones: Option<&[Zone]>,
) -> BTreeSet<BoundKey> {
    let mut split_points = BTreeSet::new();
    let Some(zones) = zones else {
        return split_points;
    };

    for zone in zones {
        split_points.insert(zone.min.clone());
        split_points.insert(zone.max.clone());
    }
    split_points.remove(&pattern.global_min());
    split_points.remove(&pattern.global_max());
    split_points
}

/// Computes `num_chunks - 1` split points partitioning the signed 64-bit
/// hash space into `num_chunks` intervals symmetric around zero.
///
/// Each point is `prefix` (the fields preceding the hashed field),
/// followed by the hashed field at the computed integer, followed by
/// MinKey for every remaining field. The result is sorted by the
/// canonical comparator; `num_chunks == 1` yields no points.
pub fn calculate_hashed_split_points(
    pattern: &KeyPattern,
    prefix: &BoundKey,
    num_chunks: usize,
) -> Vec<BoundKey> {
    assert!(num_chunks > 0, "chunk count must be positive");
    let hashed_idx = pattern
        .hashed_field_index()
        .expect("pattern must contain a hashed field");
    debug_assert_eq!(
        prefix.len(),
        hashed_idx,
        "prefix must cover exactly the fields preceding the hashed field"
    );

    let mut split_points = Vec::new();
    if num_chunks == 1 {
        return split_points;
    }

    let hashed_name = &pattern.fields()[hashed_idx].name;
    let build_split_point = |value: i64| -> BoundKey {
        let mut fields = prefix.fields().to_vec();
        fields.push((hashed_name.clone(), Value::Int(value)));
        for field in &pattern.fields()[hashed_idx + 1..] {
            fields.push((field.name.clone(), Value::MinKey));
        }
        BoundKey::new(fields)
    };

    // Hashes are signed 64-bit integers, so the full range is divided
    // into intervals of size 2^64 / num_chunks with boundaries placed
    // symmetrically around 0.
    let interval = (i64::MAX / num_chunks as i64) * 2;
    let mut current: i64 = 0;

    if num_chunks % 2 == 0 {
        split_points.push(build_split_point(current));
        current += interval;
    } else {
        current += interval / 2;
    }

    for _ in 0..(num_chunks - 1) / 2 {
        split_points.push(build_split_point(current));
        split_points.push(build_split_point(-current));
        current += interval;
    }

    split_points.sort();
    split_points
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::KeyField;

    fn hashed_pattern() -> KeyPattern {
        KeyPattern::new(vec![KeyField::hashed("h")]).unwrap()
    }

    fn hashed_values(points: &[BoundKey], idx: usize) -> Vec<i64> {
        points
            .iter()
            .map(|p| match p.value_at(idx) {
                Some(Value::Int(v)) => *v,
                other => panic!("expected hashed int, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn one_chunk_needs_no_split_points() {
        let empty = BoundKey::new(vec![]);
        assert!(calculate_hashed_split_points(&hashed_pattern(), &empty, 1).is_empty());
    }

    #[test]
    fn even_counts_include_zero() {
        let empty = BoundKey::new(vec![]);
        let points = calculate_hashed_split_points(&hashed_pattern(), &empty, 4);
        assert_eq!(
            hashed_values(&points, 0),
            vec![-4611686018427387902, 0, 4611686018427387902]
        );
    }

    #[test]
    fn two_chunks_split_at_zero() {
        let empty = BoundKey::new(vec![]);
        let points = calculate_hashed_split_points(&hashed_pattern(), &empty, 2);
        assert_eq!(hashed_values(&points, 0), vec![0]);
    }

    #[test]
    fn odd_counts_are_symmetric_without_zero() {
        let empty = BoundKey::new(vec![]);
        let points = calculate_hashed_split_points(&hashed_pattern(), &empty, 5);
        let values = hashed_values(&points, 0);
        assert_eq!(values.len(), 4);
        assert!(!values.contains(&0));
        for v in &values {
            assert!(values.contains(&-v), "{v} has no mirror");
        }
    }

    #[test]
    fn output_is_sorted() {
        let empty = BoundKey::new(vec![]);
        for n in 2..=9 {
            let points = calculate_hashed_split_points(&hashed_pattern(), &empty, n);
            assert_eq!(points.len(), n - 1);
            let mut sorted = points.clone();
            sorted.sort();
            assert_eq!(points, sorted);
        }
    }

    #[test]
    fn prefix_and_suffix_fields_are_carried() {
        let pattern = KeyPattern::new(vec![
            KeyField::ascending("region"),
            KeyField::hashed("h"),
            KeyField::ascending("tail"),
        ])
        .unwrap();
        let prefix = BoundKey::new(vec![("region".into(), Value::from("eu"))]);

        let points = calculate_hashed_split_points(&pattern, &prefix, 2);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value_at(0), Some(&Value::from("eu")));
        assert_eq!(points[0].value_at(1), Some(&Value::Int(0)));
        assert_eq!(points[0].value_at(2), Some(&Value::MinKey));
    }

    #[test]
    fn zone_boundaries_exclude_global_bounds() {
        let pattern = KeyPattern::new(vec![KeyField::ascending("x")]).unwrap();
        let bound = |v: Value| BoundKey::new(vec![("x".into(), v)]);
        let zones = vec![
            Zone::new("a", bound(Value::MinKey), bound(Value::Int(10))),
            Zone::new("b", bound(Value::Int(20)), bound(Value::MaxKey)),
        ];

        let points = extract_split_points_from_zones(&pattern, Some(&zones));
        let expected: BTreeSet<_> = [bound(Value::Int(10)), bound(Value::Int(20))].into();
        assert_eq!(points, expected);

        assert!(extract_split_points_from_zones(&pattern, None).is_empty());
    }
}
