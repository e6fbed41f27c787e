use embedding_lab_common::{NearestVector, StoredVector};

/// Euclidean distance between two vectors, `None` if their dimensions differ.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() {
        return None;
    }

    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum();

    Some(sum.sqrt())
}

/// Scores every record against `query`, sorts ascending and keeps `limit`.
///
/// Records of a different dimension are dropped. The sort is stable, so equal
/// distances keep the order the records were given in.
pub fn rank_nearest<I>(query: &[f32], records: I, limit: usize) -> Vec<NearestVector>
where
    I: IntoIterator<Item = StoredVector>,
{
    let mut scored: Vec<NearestVector> = records
        .into_iter()
        .filter_map(|record| {
            euclidean_distance(&record.vector, query)
                .map(|distance| NearestVector { record, distance })
        })
        .collect();

    scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    scored.truncate(limit);
    scored
}
