use serde::Serialize;
use std::collections::HashMap;

use crate::models::face_record::FaceRecord;

pub const DEFAULT_TOLERANCE: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceMatch {
    pub id: String,
    pub name: String,
    pub distance: f64,
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Linear scan for the nearest stored embedding within `threshold` of `query`.
///
/// Records with an empty embedding or one of a different length are skipped.
/// Equal distances resolve to the smallest id, so the result does not depend
/// on the registry's iteration order.
pub fn find_match(
    query: &[f64],
    registry: &HashMap<String, FaceRecord>,
    threshold: f64,
) -> Option<FaceMatch> {
    if query.is_empty() {
        return None;
    }

    let mut best: Option<(&String, &FaceRecord, f64)> = None;
    for (id, record) in registry {
        if record.embedding.len() != query.len() {
            tracing::debug!(
                id = %id,
                stored_len = record.embedding.len(),
                query_len = query.len(),
                "skipping record without a comparable embedding"
            );
            continue;
        }

        let distance = euclidean_distance(query, &record.embedding);
        if distance.is_nan() || distance > threshold {
            continue;
        }

        let closer = match best {
            None => true,
            Some((best_id, _, best_distance)) => {
                distance < best_distance || (distance == best_distance && id < best_id)
            }
        };
        if closer {
            best = Some((id, record, distance));
        }
    }

    best.map(|(id, record, distance)| FaceMatch {
        id: id.clone(),
        name: record.name.clone(),
        distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, embedding: Vec<f64>) -> FaceRecord {
        FaceRecord {
            id: String::new(),
            name: name.to_string(),
            age: "30".to_string(),
            embedding,
            image_path: String::new(),
            created_at: None,
        }
    }

    fn registry(entries: Vec<(&str, FaceRecord)>) -> HashMap<String, FaceRecord> {
        entries
            .into_iter()
            .map(|(id, r)| (id.to_string(), r.with_id(id)))
            .collect()
    }

    #[test]
    fn returns_the_only_record_within_threshold() {
        let reg = registry(vec![
            ("alice", record("Alice", vec![0.0, 0.0, 0.0])),
            ("bob", record("Bob", vec![5.0, 5.0, 5.0])),
        ]);

        let hit = find_match(&[0.1, 0.1, 0.1], &reg, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(hit.id, "alice");
        assert_eq!(hit.name, "Alice");
        assert!(hit.distance < DEFAULT_TOLERANCE);
    }

    #[test]
    fn no_record_within_threshold_is_a_miss() {
        let reg = registry(vec![
            ("alice", record("Alice", vec![0.0, 0.0])),
            ("bob", record("Bob", vec![3.0, 3.0])),
        ]);
        assert!(find_match(&[1.5, 1.5], &reg, DEFAULT_TOLERANCE).is_none());
    }

    #[test]
    fn prefers_the_nearest_rather_than_the_first_hit() {
        let reg = registry(vec![
            ("a_far", record("Far", vec![0.5, 0.0])),
            ("b_near", record("Near", vec![0.1, 0.0])),
        ]);
        let hit = find_match(&[0.0, 0.0], &reg, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(hit.id, "b_near");
    }

    #[test]
    fn equal_distance_resolves_to_smallest_id() {
        let reg = registry(vec![
            ("zed", record("Zed", vec![0.2, 0.0])),
            ("amy", record("Amy", vec![-0.2, 0.0])),
        ]);
        let hit = find_match(&[0.0, 0.0], &reg, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(hit.id, "amy");
    }

    #[test]
    fn records_without_comparable_embedding_are_skipped() {
        let reg = registry(vec![
            ("empty", record("Empty", vec![])),
            ("short", record("Short", vec![0.0])),
            ("ok", record("Ok", vec![0.0, 0.0])),
        ]);
        let hit = find_match(&[0.0, 0.0], &reg, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(hit.id, "ok");
    }

    #[test]
    fn threshold_is_inclusive() {
        let reg = registry(vec![("edge", record("Edge", vec![0.5]))]);
        assert!(find_match(&[0.0], &reg, 0.5).is_some());
        assert!(find_match(&[0.0], &reg, 0.49).is_none());
    }

    #[test]
    fn empty_registry_or_query_never_matches() {
        assert!(find_match(&[0.0], &HashMap::new(), DEFAULT_TOLERANCE).is_none());
        let reg = registry(vec![("empty", record("Empty", vec![]))]);
        assert!(find_match(&[], &reg, DEFAULT_TOLERANCE).is_none());
    }
}
