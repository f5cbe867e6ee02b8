// Lloyd's k-means with k-means++ seeding.
//
// Seeding draws from a seeded RNG so a given seed always produces the same
// clustering. Iteration stops when the total squared centroid shift drops
// below `tolerance` times the mean per-feature variance of the data, or after
// `max_iter` rounds. A cluster that loses all its points is re-seeded with
// the point farthest from its current centroid.

use anyhow::Result;
use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub max_iter: usize,
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KMeansFit {
    /// One row per cluster.
    pub centroids: Array2<f64>,
    /// Cluster index (0-based) per input row.
    pub labels: Vec<usize>,
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
    pub iterations: usize,
}

/// Cluster the rows of `data` into `k` groups.
pub fn fit(data: &Array2<f64>, k: usize, config: &KMeansConfig) -> Result<KMeansFit> {
    let n = data.nrows();
    if k == 0 {
        anyhow::bail!("k-means needs at least one cluster");
    }
    if k > n {
        anyhow::bail!("Cannot form {k} clusters from {n} rows");
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centroids = kmeans_plus_plus(data, k, &mut rng);
    let threshold = config.tolerance * mean_variance(data);

    let mut labels = assign(data, &centroids);
    let mut iterations = 0;

    for _ in 0..config.max_iter {
        iterations += 1;
        let updated = update_centroids(data, &labels, &centroids);
        let shift: f64 = (&updated - &centroids).mapv(|v| v * v).sum();
        centroids = updated;
        labels = assign(data, &centroids);
        if shift <= threshold {
            break;
        }
    }

    let inertia = inertia_of(data, &labels, &centroids);

    Ok(KMeansFit {
        centroids,
        labels,
        inertia,
        iterations,
    })
}

fn kmeans_plus_plus(data: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.nrows();
    let mut centroids = Array2::zeros((k, data.ncols()));

    let first = rng.random_range(0..n);
    centroids.row_mut(0).assign(&data.row(first));

    let mut closest: Vec<f64> = data
        .rows()
        .into_iter()
        .map(|row| squared_distance(row, centroids.row(0)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut running = 0.0;
            closest
                .iter()
                .position(|&d| {
                    running += d;
                    running > target
                })
                .unwrap_or(n - 1)
        } else {
            rng.random_range(0..n)
        };

        centroids.row_mut(c).assign(&data.row(chosen));
        for (i, row) in data.rows().into_iter().enumerate() {
            let d = squared_distance(row, centroids.row(c));
            if d < closest[i] {
                closest[i] = d;
            }
        }
    }

    centroids
}

fn assign(data: &Array2<f64>, centroids: &Array2<f64>) -> Vec<usize> {
    data.rows()
        .into_iter()
        .map(|row| nearest(row, centroids).0)
        .collect()
}

fn nearest(point: ArrayView1<'_, f64>, centroids: &Array2<f64>) -> (usize, f64) {
    centroids
        .rows()
        .into_iter()
        .map(|c| squared_distance(point, c))
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, d)| if d < best.1 { (i, d) } else { best })
}

fn update_centroids(data: &Array2<f64>, labels: &[usize], previous: &Array2<f64>) -> Array2<f64> {
    let k = previous.nrows();
    let mut sums = Array2::<f64>::zeros(previous.dim());
    let mut counts = vec![0usize; k];

    for (row, &label) in data.rows().into_iter().zip(labels) {
        let mut sum = sums.row_mut(label);
        sum += &row;
        counts[label] += 1;
    }

    for (c, &count) in counts.iter().enumerate() {
        if count > 0 {
            let mut centroid = sums.row_mut(c);
            centroid /= count as f64;
        } else {
            // Empty cluster: take over the point worst served by its centroid.
            let farthest = data
                .rows()
                .into_iter()
                .zip(labels)
                .map(|(row, &label)| squared_distance(row, previous.row(label)))
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, d)| if d > best.1 { (i, d) } else { best })
                .0;
            sums.row_mut(c).assign(&data.row(farthest));
        }
    }

    sums
}

fn mean_variance(data: &Array2<f64>) -> f64 {
    data.var_axis(Axis(0), 0.0).mean().unwrap_or(0.0)
}

pub fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Within-cluster sum of squares for an arbitrary labelling.
pub fn inertia_of(data: &Array2<f64>, labels: &[usize], centroids: &Array2<f64>) -> f64 {
    data.rows()
        .into_iter()
        .zip(labels)
        .map(|(row, &label)| squared_distance(row, centroids.row(label)))
        .sum()
}
