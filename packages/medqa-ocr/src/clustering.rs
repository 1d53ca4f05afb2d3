//! Two-group K-means over a 1-D sequence, used for layout heuristics such as
//! finding the gutter between two text columns.

const MAX_ITERATIONS: usize = 100;

/// Result of splitting a sequence into a low and a high group.
///
/// Values keep their input order inside each group.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoMeans {
    pub low: Vec<f64>,
    pub high: Vec<f64>,
    pub low_centroid: f64,
    pub high_centroid: f64,
}

impl TwoMeans {
    /// Distance between the two centroids, `0.0` when one group is empty.
    pub fn separation(&self) -> f64 {
        if self.low.is_empty() || self.high.is_empty() {
            0.0
        } else {
            self.high_centroid - self.low_centroid
        }
    }
}

/// Buckets `data` into two groups with Lloyd's algorithm.
///
/// Centroids start at the minimum and maximum, which makes the result
/// deterministic. A value equidistant from both centroids joins the low group.
/// Empty or constant input puts everything into `low`.
pub fn kmeans_two(data: &[f64]) -> TwoMeans {
    let Some(min) = data.iter().copied().reduce(f64::min) else {
        return TwoMeans {
            low: Vec::new(),
            high: Vec::new(),
            low_centroid: 0.0,
            high_centroid: 0.0,
        };
    };
    let max = data.iter().copied().fold(min, f64::max);

    if min == max {
        return TwoMeans {
            low: data.to_vec(),
            high: Vec::new(),
            low_centroid: min,
            high_centroid: min,
        };
    }

    let mut low_centroid = min;
    let mut high_centroid = max;
    let mut labels: Vec<bool> = vec![false; data.len()];

    for iteration in 0..MAX_ITERATIONS {
        let next: Vec<bool> = data
            .iter()
            .map(|x| (x - high_centroid).abs() < (x - low_centroid).abs())
            .collect();

        if iteration > 0 && next == labels {
            break;
        }
        labels = next;

        if let Some(mean) = mean_of(data, &labels, false) {
            low_centroid = mean;
        }
        if let Some(mean) = mean_of(data, &labels, true) {
            high_centroid = mean;
        }
    }

    let (high, low): (Vec<(f64, bool)>, Vec<(f64, bool)>) = data
        .iter()
        .copied()
        .zip(labels)
        .partition(|(_, is_high)| *is_high);

    TwoMeans {
        low: low.into_iter().map(|(x, _)| x).collect(),
        high: high.into_iter().map(|(x, _)| x).collect(),
        low_centroid,
        high_centroid,
    }
}

fn mean_of(data: &[f64], labels: &[bool], group: bool) -> Option<f64> {
    let (sum, count) = data
        .iter()
        .zip(labels)
        .filter(|(_, label)| **label == group)
        .fold((0.0, 0usize), |(sum, count), (x, _)| (sum + x, count + 1));
    (count > 0).then(|| sum / count as f64)
}
