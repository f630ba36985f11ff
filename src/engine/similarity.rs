use ndarray::{Array1, Array2, ArrayView1, Axis};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use crate::models::{EntityId, VideoId};

use super::dataset::Dataset;

/// Square cosine similarity matrix with an explicit id→row mapping
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    ids: Vec<EntityId>,
    index: HashMap<EntityId, usize>,
    values: Array2<f64>,
    /// Rows whose source vector was all zeros
    degenerate: Vec<bool>,
}

impl SimilarityMatrix {
    /// Computes pairwise cosine similarity between the rows of `vectors`
    ///
    /// `ids[i]` names row `i`. An all-zero row is similar to nothing,
    /// itself included.
    pub fn from_vectors(ids: Vec<EntityId>, vectors: &Array2<f64>) -> Self {
        debug_assert_eq!(ids.len(), vectors.nrows());

        let n = vectors.nrows();
        let norms: Array1<f64> = vectors.map_axis(Axis(1), |row| row.dot(&row).sqrt());
        let degenerate: Vec<bool> = norms.iter().map(|norm| *norm == 0.0).collect();

        let mut values = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            if degenerate[i] {
                continue;
            }
            values[[i, i]] = 1.0;
            for j in (i + 1)..n {
                if degenerate[j] {
                    continue;
                }
                let similarity =
                    cosine(vectors.row(i), vectors.row(j), norms[i], norms[j]);
                values[[i, j]] = similarity;
                values[[j, i]] = similarity;
            }
        }

        let index = ids
            .iter()
            .enumerate()
            .map(|(row, id)| (id.clone(), row))
            .collect();

        Self {
            ids,
            index,
            values,
            degenerate,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn index_of(&self, id: &EntityId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id_at(&self, row: usize) -> &EntityId {
        &self.ids[row]
    }

    /// Similarity between two rows by index
    pub fn score(&self, a: usize, b: usize) -> f64 {
        self.values[[a, b]]
    }

    /// Similarity between two ids, `None` if either is unknown
    pub fn get(&self, a: &EntityId, b: &EntityId) -> Option<f64> {
        Some(self.score(self.index_of(a)?, self.index_of(b)?))
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Every other row ordered by descending similarity to `row`
    ///
    /// The sort is stable, so equal scores keep their row order. A degenerate
    /// row has no neighbors.
    pub fn ranked_neighbors(&self, row: usize) -> Vec<usize> {
        if self.degenerate[row] {
            return Vec::new();
        }

        let scores = self.values.row(row);
        let mut neighbors: Vec<usize> = (0..self.len()).filter(|&other| other != row).collect();
        neighbors.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(Ordering::Equal)
        });
        neighbors
    }
}

fn cosine(a: ArrayView1<f64>, b: ArrayView1<f64>, norm_a: f64, norm_b: f64) -> f64 {
    (a.dot(&b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Pivots interactions into a dense user×video rating matrix
///
/// Rows follow first-seen user order, columns first-seen video order.
/// Repeated (user, video) pairs are averaged and absent cells are 0.
pub fn interaction_matrix(dataset: &Dataset) -> (Vec<EntityId>, Vec<VideoId>, Array2<f64>) {
    let users = dataset.preferences().users().to_vec();
    let user_rows: HashMap<&EntityId, usize> =
        users.iter().enumerate().map(|(row, id)| (id, row)).collect();

    let mut videos: Vec<VideoId> = Vec::new();
    let mut video_columns: HashMap<&VideoId, usize> = HashMap::new();
    for record in dataset.interactions() {
        if !video_columns.contains_key(&record.video_id) {
            video_columns.insert(&record.video_id, videos.len());
            videos.push(record.video_id.clone());
        }
    }

    let mut sums = Array2::<f64>::zeros((users.len(), videos.len()));
    let mut counts = Array2::<f64>::zeros((users.len(), videos.len()));
    for record in dataset.interactions() {
        let cell = [user_rows[&record.user_id], video_columns[&record.video_id]];
        sums[cell] += record.rating;
        counts[cell] += 1.0;
    }

    let matrix = ndarray::Zip::from(&sums)
        .and(&counts)
        .map_collect(|sum, count| if *count > 0.0 { sum / count } else { 0.0 });

    (users, videos, matrix)
}

/// One-hot encodes the categorical attributes of every video
///
/// Rows follow the feature table order; columns are `(field, value)` pairs
/// in first-seen order.
pub fn feature_matrix(dataset: &Dataset) -> (Vec<VideoId>, Array2<f64>) {
    let mut columns: HashMap<(&'static str, &str), usize> = HashMap::new();
    for video in dataset.videos() {
        for key in video.categorical_values() {
            let next = columns.len();
            columns.entry(key).or_insert(next);
        }
    }

    let mut matrix = Array2::<f64>::zeros((dataset.videos().len(), columns.len()));
    for (row, video) in dataset.videos().iter().enumerate() {
        for key in video.categorical_values() {
            matrix[[row, columns[&key]]] = 1.0;
        }
    }

    let ids = dataset.videos().iter().map(|v| v.video_id.clone()).collect();
    (ids, matrix)
}

/// User–user cosine similarity over the interaction matrix
pub fn build_user_similarity(dataset: &Dataset) -> SimilarityMatrix {
    let start = Instant::now();
    let (users, videos, matrix) = interaction_matrix(dataset);
    let similarity = SimilarityMatrix::from_vectors(users, &matrix);

    tracing::debug!(
        users = similarity.len(),
        videos = videos.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "User similarity built"
    );

    similarity
}

/// Video–video cosine similarity over one-hot content features
pub fn build_video_similarity(dataset: &Dataset) -> SimilarityMatrix {
    let start = Instant::now();
    let (videos, matrix) = feature_matrix(dataset);
    let features = matrix.ncols();
    let similarity = SimilarityMatrix::from_vectors(videos, &matrix);

    tracing::debug!(
        videos = similarity.len(),
        features,
        elapsed_ms = start.elapsed().as_millis(),
        "Video similarity built"
    );

    similarity
}
