use std::collections::HashSet;

use crate::models::VideoId;

/// Fraction of `recommended` found in `watched`
///
/// Each occurrence in `recommended` counts, so repeats weigh in twice.
/// An empty list scores 0.
pub fn hit_rate(watched: &[VideoId], recommended: &[VideoId]) -> f64 {
    if recommended.is_empty() {
        return 0.0;
    }

    let watched: HashSet<&VideoId> = watched.iter().collect();
    let hits = recommended
        .iter()
        .filter(|video| watched.contains(video))
        .count();

    hits as f64 / recommended.len() as f64
}
