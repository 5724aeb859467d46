//! Z-score standardization and seeded k-means clustering
//!
//! Partitions customers over their standardized (recency, frequency, value)
//! triples. The algorithm is plain Lloyd iteration with k-means++ seeding,
//! run n_init times from independent deterministic RNG streams; the restart
//! with the lowest inertia wins. For a fixed input, k, and seed the labeling
//! is identical across runs.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use rayon::prelude::*;
use serde::Serialize;

use super::aggregate::CustomerMetrics;
use super::error::{RfvError, RfvResult};

/// Dimensionality of the clustered feature space (recency, frequency, value)
const FEATURE_DIM: usize = 3;

/// Stream constant for deriving per-restart RNG seeds
const SEED_STREAM_MULTIPLIER: u64 = 0x9e37_79b9_7f4a_7c15;

/// Clustering parameters
#[derive(Debug, Clone, Serialize)]
pub struct ClusterConfig {
    /// Number of clusters; must satisfy 2 <= k <= distinct customers
    pub k: usize,
    /// Master seed for the restart RNG streams
    pub seed: u64,
    /// Number of independent k-means++ restarts
    pub n_init: usize,
    /// Iteration cap per restart
    pub max_iterations: usize,
    /// Convergence threshold on maximum centroid movement
    pub tolerance: f64,
}

impl ClusterConfig {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            ..Default::default()
        }
    }

    /// Check k against the population size
    pub fn validate(&self, customers: usize) -> RfvResult<()> {
        if self.k < 2 || self.k > customers {
            return Err(RfvError::InvalidClusterCount {
                k: self.k,
                customers,
            });
        }
        Ok(())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 4,
            seed: 42,
            n_init: 10,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

/// Per-feature z-score transform fitted on the customer population
///
/// Fitted parameters live only for the run; nothing is persisted across
/// invocations.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: [f64; FEATURE_DIM],
    scales: [f64; FEATURE_DIM],
}

impl StandardScaler {
    /// Fit means and population standard deviations
    ///
    /// A zero-variance feature keeps a unit scale so it standardizes to 0
    /// instead of dividing by zero.
    pub fn fit(points: &[[f64; FEATURE_DIM]]) -> RfvResult<Self> {
        if points.is_empty() {
            return Err(RfvError::EmptyDataset);
        }
        let n = points.len() as f64;

        let mut means = [0.0f64; FEATURE_DIM];
        for point in points {
            for dim in 0..FEATURE_DIM {
                means[dim] += point[dim];
            }
        }
        for mean in means.iter_mut() {
            *mean /= n;
        }

        let mut scales = [0.0f64; FEATURE_DIM];
        for point in points {
            for dim in 0..FEATURE_DIM {
                let dev = point[dim] - means[dim];
                scales[dim] += dev * dev;
            }
        }
        for scale in scales.iter_mut() {
            *scale = (*scale / n).sqrt();
            if *scale == 0.0 {
                *scale = 1.0;
            }
        }

        Ok(Self { means, scales })
    }

    pub fn transform_point(&self, point: &[f64; FEATURE_DIM]) -> [f64; FEATURE_DIM] {
        let mut out = [0.0f64; FEATURE_DIM];
        for dim in 0..FEATURE_DIM {
            out[dim] = (point[dim] - self.means[dim]) / self.scales[dim];
        }
        out
    }

    pub fn transform(&self, points: &[[f64; FEATURE_DIM]]) -> Vec<[f64; FEATURE_DIM]> {
        points.iter().map(|p| self.transform_point(p)).collect()
    }

    pub fn means(&self) -> &[f64; FEATURE_DIM] {
        &self.means
    }

    pub fn scales(&self) -> &[f64; FEATURE_DIM] {
        &self.scales
    }
}

/// Final clustering of one run
#[derive(Debug, Clone)]
pub struct ClusterAssignments {
    /// Cluster id per customer, aligned with the input metric order
    pub labels: Vec<usize>,
    /// Final centroids in standardized feature space
    pub centroids: Vec<[f64; FEATURE_DIM]>,
    /// Within-cluster sum of squared distances of the winning restart
    pub inertia: f64,
    /// Lloyd iterations the winning restart used
    pub iterations: usize,
    /// Whether the winning restart converged before the iteration cap
    pub converged: bool,
}

impl ClusterAssignments {
    /// Customers per cluster id
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.centroids.len()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Standardize the RFV triples and cluster the customers
///
/// # Arguments
/// * `metrics` - One row per distinct customer
/// * `config` - Clustering parameters
///
/// # Returns
/// Labels aligned with `metrics`, or `InvalidClusterCount` if k does not
/// fit the population.
pub fn cluster_customers(
    metrics: &[CustomerMetrics],
    config: &ClusterConfig,
) -> RfvResult<ClusterAssignments> {
    config.validate(metrics.len())?;

    let features: Vec<[f64; FEATURE_DIM]> = metrics
        .iter()
        .map(|m| [m.recency as f64, m.frequency as f64, m.value])
        .collect();

    let scaler = StandardScaler::fit(&features)?;
    let points = scaler.transform(&features);

    // Each restart draws from its own stream derived from (seed, restart),
    // so the parallel sweep produces the same candidates as a sequential one
    let restarts = config.n_init.max(1);
    let runs: Vec<ClusterAssignments> = (0..restarts)
        .into_par_iter()
        .map(|restart| {
            let mut rng = restart_rng(config.seed, restart as u64);
            run_lloyd(&points, config, &mut rng)
        })
        .collect();

    // First restart with the lowest inertia wins; ties keep the earlier
    // index so selection does not depend on scheduling
    let mut best: Option<ClusterAssignments> = None;
    for run in runs {
        let better = match &best {
            None => true,
            Some(b) => run.inertia < b.inertia,
        };
        if better {
            best = Some(run);
        }
    }

    // restarts >= 1, so a winner always exists
    best.ok_or(RfvError::EmptyDataset)
}

fn restart_rng(seed: u64, restart: u64) -> Pcg64Mcg {
    Pcg64Mcg::seed_from_u64(seed ^ restart.wrapping_mul(SEED_STREAM_MULTIPLIER))
}

/// One k-means++ initialized Lloyd run
fn run_lloyd(
    points: &[[f64; FEATURE_DIM]],
    config: &ClusterConfig,
    rng: &mut Pcg64Mcg,
) -> ClusterAssignments {
    let mut centroids = kmeans_plus_plus_init(points, config.k, rng);
    let mut labels = vec![0usize; points.len()];
    let mut iterations = 0;
    let mut converged = false;

    for iter in 0..config.max_iterations {
        iterations = iter + 1;

        assign_labels(points, &centroids, &mut labels);
        let new_centroids = update_centroids(points, &labels, &centroids, config.k);

        let max_movement = centroids
            .iter()
            .zip(new_centroids.iter())
            .map(|(old, new)| distance_squared(old, new).sqrt())
            .fold(0.0f64, f64::max);

        centroids = new_centroids;

        if max_movement < config.tolerance {
            converged = true;
            break;
        }
    }

    // The nearest final centroid decides each customer's id
    assign_labels(points, &centroids, &mut labels);
    let inertia = compute_inertia(points, &labels, &centroids);

    ClusterAssignments {
        labels,
        centroids,
        inertia,
        iterations,
        converged,
    }
}

/// Pick initial centroids weighted by squared distance to the nearest
/// already-chosen centroid
fn kmeans_plus_plus_init(
    points: &[[f64; FEATURE_DIM]],
    k: usize,
    rng: &mut Pcg64Mcg,
) -> Vec<[f64; FEATURE_DIM]> {
    let n = points.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..n)]);

    let mut min_distances = vec![f64::MAX; n];
    while centroids.len() < k {
        let last = centroids[centroids.len() - 1];
        for (i, point) in points.iter().enumerate() {
            let dist = distance_squared(point, &last);
            if dist < min_distances[i] {
                min_distances[i] = dist;
            }
        }

        let total: f64 = min_distances.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, dist) in min_distances.iter().enumerate() {
                target -= dist;
                if target <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // Every point already sits on a centroid
            rng.gen_range(0..n)
        };
        centroids.push(points[next]);
    }

    centroids
}

fn assign_labels(
    points: &[[f64; FEATURE_DIM]],
    centroids: &[[f64; FEATURE_DIM]],
    labels: &mut [usize],
) {
    for (label, point) in labels.iter_mut().zip(points.iter()) {
        *label = nearest_centroid(point, centroids);
    }
}

fn nearest_centroid(point: &[f64; FEATURE_DIM], centroids: &[[f64; FEATURE_DIM]]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::MAX;
    for (cluster, centroid) in centroids.iter().enumerate() {
        let dist = distance_squared(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = cluster;
        }
    }
    best
}

/// Recompute centroids as the mean of their assigned points
///
/// A cluster that lost all its points keeps its previous position and is
/// then moved onto the point farthest from its assigned centroid, so no
/// centroid is ever left stranded at an arbitrary origin.
fn update_centroids(
    points: &[[f64; FEATURE_DIM]],
    labels: &[usize],
    previous: &[[f64; FEATURE_DIM]],
    k: usize,
) -> Vec<[f64; FEATURE_DIM]> {
    let mut sums = vec![[0.0f64; FEATURE_DIM]; k];
    let mut counts = vec![0usize; k];
    for (point, &label) in points.iter().zip(labels.iter()) {
        counts[label] += 1;
        for dim in 0..FEATURE_DIM {
            sums[label][dim] += point[dim];
        }
    }

    let mut centroids = previous.to_vec();
    for cluster in 0..k {
        if counts[cluster] > 0 {
            for dim in 0..FEATURE_DIM {
                centroids[cluster][dim] = sums[cluster][dim] / counts[cluster] as f64;
            }
        }
    }

    for cluster in 0..k {
        if counts[cluster] > 0 {
            continue;
        }
        let mut far_idx = 0;
        let mut far_dist = -1.0f64;
        for (i, point) in points.iter().enumerate() {
            let dist = distance_squared(point, &centroids[labels[i]]);
            if dist > far_dist {
                far_dist = dist;
                far_idx = i;
            }
        }
        centroids[cluster] = points[far_idx];
    }

    centroids
}

#[inline]
fn distance_squared(a: &[f64; FEATURE_DIM], b: &[f64; FEATURE_DIM]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

fn compute_inertia(
    points: &[[f64; FEATURE_DIM]],
    labels: &[usize],
    centroids: &[[f64; FEATURE_DIM]],
) -> f64 {
    points
        .iter()
        .zip(labels.iter())
        .map(|(point, &label)| distance_squared(point, &centroids[label]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(id: &str, recency: i64, frequency: u32, value: f64) -> CustomerMetrics {
        CustomerMetrics {
            customer_id: id.to_string(),
            recency,
            frequency,
            value,
        }
    }

    /// Three well-separated customer groups of four members each
    fn separated_population() -> Vec<CustomerMetrics> {
        let mut population = Vec::new();
        for i in 0..4 {
            population.push(metrics(&format!("recent{}", i), 2 + i, 20 + i as u32, 900.0 + i as f64));
        }
        for i in 0..4 {
            population.push(metrics(&format!("mid{}", i), 60 + i, 8 + i as u32, 300.0 + i as f64));
        }
        for i in 0..4 {
            population.push(metrics(&format!("lost{}", i), 300 + i, 1 + i as u32, 20.0 + i as f64));
        }
        population
    }

    #[test]
    fn test_config_rejects_small_k() {
        let config = ClusterConfig::new(1, 42);
        let result = config.validate(10);
        assert!(matches!(
            result,
            Err(RfvError::InvalidClusterCount { k: 1, customers: 10 })
        ));
    }

    #[test]
    fn test_config_rejects_k_above_population() {
        let config = ClusterConfig::new(5, 42);
        assert!(config.validate(4).is_err());
        assert!(config.validate(5).is_ok());
        assert!(config.validate(6).is_ok());
    }

    #[test]
    fn test_config_defaults() {
        let config = ClusterConfig::default();
        assert_eq!(config.k, 4);
        assert_eq!(config.seed, 42);
        assert_eq!(config.n_init, 10);
        assert_eq!(config.max_iterations, 300);
    }

    #[test]
    fn test_scaler_standardizes_features() {
        let points = vec![[1.0, 10.0, 100.0], [3.0, 30.0, 300.0]];
        let scaler = StandardScaler::fit(&points).unwrap();

        assert_eq!(scaler.means(), &[2.0, 20.0, 200.0]);
        // Population std of {1, 3} is 1
        assert_eq!(scaler.scales()[0], 1.0);

        let transformed = scaler.transform(&points);
        assert_eq!(transformed[0][0], -1.0);
        assert_eq!(transformed[1][0], 1.0);

        // Standardized features have zero mean
        for dim in 0..3 {
            let sum: f64 = transformed.iter().map(|p| p[dim]).sum();
            assert!(sum.abs() < 1e-12);
        }
    }

    #[test]
    fn test_scaler_zero_variance_feature() {
        let points = vec![[5.0, 1.0, 7.0], [5.0, 2.0, 7.0], [5.0, 3.0, 7.0]];
        let scaler = StandardScaler::fit(&points).unwrap();

        assert_eq!(scaler.scales()[0], 1.0);
        assert_eq!(scaler.scales()[2], 1.0);

        let transformed = scaler.transform(&points);
        for point in &transformed {
            assert_eq!(point[0], 0.0);
            assert_eq!(point[2], 0.0);
        }
    }

    #[test]
    fn test_scaler_empty_input() {
        let result = StandardScaler::fit(&[]);
        assert!(matches!(result, Err(RfvError::EmptyDataset)));
    }

    #[test]
    fn test_clustering_is_deterministic() {
        let population = separated_population();
        let config = ClusterConfig::new(3, 42);

        let first = cluster_customers(&population, &config).unwrap();
        let second = cluster_customers(&population, &config).unwrap();

        assert_eq!(first.labels, second.labels);
        assert_eq!(first.inertia, second.inertia);
        assert_eq!(first.centroids, second.centroids);
    }

    #[test]
    fn test_clustering_separates_obvious_groups() {
        let population = separated_population();
        let config = ClusterConfig::new(3, 42);

        let assignments = cluster_customers(&population, &config).unwrap();

        // Compare partition structure, not literal ids: each group of four
        // shares a label, and the three group labels are distinct
        let groups = [&assignments.labels[0..4], &assignments.labels[4..8], &assignments.labels[8..12]];
        for group in groups {
            assert!(group.iter().all(|&l| l == group[0]));
        }
        assert_ne!(assignments.labels[0], assignments.labels[4]);
        assert_ne!(assignments.labels[4], assignments.labels[8]);
        assert_ne!(assignments.labels[0], assignments.labels[8]);

        assert!(assignments.converged);
        assert_eq!(assignments.sizes(), vec![4, 4, 4]);
    }

    #[test]
    fn test_labels_within_range() {
        let population = separated_population();
        let config = ClusterConfig::new(5, 7);

        let assignments = cluster_customers(&population, &config).unwrap();
        assert_eq!(assignments.labels.len(), population.len());
        assert!(assignments.labels.iter().all(|&l| l < 5));
        assert_eq!(assignments.sizes().iter().sum::<usize>(), population.len());
    }

    #[test]
    fn test_k_equal_to_population_size() {
        let population = vec![
            metrics("a", 1, 1, 10.0),
            metrics("b", 50, 5, 200.0),
            metrics("c", 200, 9, 900.0),
        ];
        let config = ClusterConfig::new(3, 42);

        let assignments = cluster_customers(&population, &config).unwrap();

        // Every distinct point gets its own centroid
        let mut labels = assignments.labels.clone();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 3);
        assert!(assignments.inertia < 1e-9);
    }

    #[test]
    fn test_identical_points_do_not_panic() {
        let population: Vec<CustomerMetrics> =
            (0..6).map(|i| metrics(&format!("c{}", i), 10, 2, 50.0)).collect();
        let config = ClusterConfig::new(2, 42);

        let assignments = cluster_customers(&population, &config).unwrap();
        assert_eq!(assignments.labels.len(), 6);
        assert!(assignments.labels.iter().all(|&l| l < 2));
        assert!(assignments.inertia < 1e-9);
    }

    #[test]
    fn test_single_restart_still_deterministic() {
        let population = separated_population();
        let config = ClusterConfig {
            n_init: 1,
            ..ClusterConfig::new(3, 99)
        };

        let first = cluster_customers(&population, &config).unwrap();
        let second = cluster_customers(&population, &config).unwrap();
        assert_eq!(first.labels, second.labels);
    }

    #[test]
    fn test_restart_streams_are_independent() {
        let mut a = restart_rng(42, 0);
        let mut b = restart_rng(42, 1);
        assert_ne!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_invalid_k_for_direct_call() {
        let population = vec![metrics("a", 1, 1, 10.0), metrics("b", 2, 2, 20.0)];
        let config = ClusterConfig::new(3, 42);

        let result = cluster_customers(&population, &config);
        assert!(matches!(
            result,
            Err(RfvError::InvalidClusterCount { k: 3, customers: 2 })
        ));
    }
}
