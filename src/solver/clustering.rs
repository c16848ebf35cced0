//! k-means clustering
//!
//! # Algorithm
//!
//! 1. **Seeding (k-means++)**: the first centroid is drawn uniformly from the
//!    points; each next one with probability proportional to its squared
//!    distance from the nearest centroid chosen so far.
//! 2. **Lloyd iterations**: assign every point to its nearest centroid (ties
//!    go to the lowest index), move every centroid to the mean of its points,
//!    repeat until no centroid moves more than `tolerance`.
//! 3. **Empty clusters**: a centroid left without points is moved onto the
//!    point farthest from its own centroid. `max_reseed_attempts` caps the
//!    re-seeds of the whole run, counted across all clusters; one more fails
//!    the run with `ConvergenceError`.
//!
//! All randomness comes from a `StdRng` seeded with [`KMeansConfig::seed`].

use crate::config::KMeansConfig;
use crate::error::{NumericError, Result};
use crate::runtime::{Event, ExecutionContext};
use nalgebra::DVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    pub centroids: Vec<DVector<f64>>,
    /// Cluster index of every input point
    pub assignments: Vec<usize>,
    pub iterations: usize,
    /// Sum of squared distances of points to their centroids
    pub inertia: f64,
    /// False when the iteration cap was reached first
    pub converged: bool,
}

/// Partition `points` into `k` clusters
///
/// # Errors
///
/// - `Domain` when `k == 0` or `k > points.len()`
/// - `Dimension` when the points do not all have the same length
/// - `Convergence` when empty clusters cannot be re-seeded
pub fn kmeans(
    points: &[DVector<f64>],
    k: usize,
    config: &KMeansConfig,
    ctx: &ExecutionContext,
) -> Result<KMeansResult> {
    const OP: &str = "kmeans";

    config.validate()?;
    if k == 0 || k > points.len() {
        return Err(NumericError::domain(
            OP,
            format!("k = {k} must be between 1 and the number of points ({})", points.len()),
        ));
    }
    let dim = points[0].len();
    if let Some(bad) = points.iter().find(|p| p.len() != dim) {
        return Err(NumericError::dimension(
            OP,
            format!("points of dimension {dim}"),
            format!("a point of dimension {}", bad.len()),
        ));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centroids = seed_plus_plus(points, k, &mut rng);
    let mut assignments = vec![0; points.len()];
    let mut reseeds = 0;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        ctx.checkpoint()?;
        iterations += 1;

        assign(points, &centroids, &mut assignments);

        let mut sums = vec![DVector::<f64>::zeros(dim); k];
        let mut counts = vec![0usize; k];
        for (p, &c) in points.iter().zip(&assignments) {
            sums[c] += p;
            counts[c] += 1;
        }

        let mut shift: f64 = 0.0;
        let mut empty = false;
        for c in 0..k {
            if counts[c] == 0 {
                empty = true;
                reseeds += 1;
                if reseeds > config.max_reseed_attempts {
                    log::warn!("{OP}: cluster {c} still empty after {} re-seeds", reseeds - 1);
                    return Err(NumericError::Convergence {
                        operation: OP,
                        iterations,
                        last_error: shift,
                        tolerance: config.tolerance,
                    });
                }
                let far = farthest_point(points, &centroids, &assignments);
                log::debug!("{OP}: cluster {c} empty at iteration {iterations}, re-seeding at point {far}");
                centroids[c] = points[far].clone();
                continue;
            }
            let mean = &sums[c] / counts[c] as f64;
            shift = shift.max(distance2(&mean, &centroids[c]).sqrt());
            centroids[c] = mean;
        }

        log::trace!("{OP}: iteration {iterations}, max centroid shift {shift:e}");
        ctx.emit_with(|| {
            Event::new(Event::PROGRESS)
                .with("iteration", iterations)
                .with("error", shift)
        });

        if !empty && shift <= config.tolerance {
            converged = true;
            break;
        }
    }

    if !converged {
        log::warn!("{OP} stopped at the iteration cap ({})", config.max_iterations);
    }

    assign(points, &centroids, &mut assignments);
    let inertia = points
        .iter()
        .zip(&assignments)
        .map(|(p, &c)| distance2(p, &centroids[c]))
        .sum();

    Ok(KMeansResult {
        centroids,
        assignments,
        iterations,
        inertia,
        converged,
    })
}

fn distance2(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(p: &DVector<f64>, centroids: &[DVector<f64>]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = distance2(p, c);
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

fn assign(points: &[DVector<f64>], centroids: &[DVector<f64>], assignments: &mut [usize]) {
    if points.len() * centroids.len() > crate::solver::parallel_threshold() {
        #[cfg(feature = "parallel")]
        assignments
            .par_iter_mut()
            .zip(points.par_iter())
            .for_each(|(a, p)| *a = nearest(p, centroids));
        #[cfg(not(feature = "parallel"))]
        for (a, p) in assignments.iter_mut().zip(points) {
            *a = nearest(p, centroids);
        }
    } else {
        for (a, p) in assignments.iter_mut().zip(points) {
            *a = nearest(p, centroids);
        }
    }
}

fn farthest_point(points: &[DVector<f64>], centroids: &[DVector<f64>], assignments: &[usize]) -> usize {
    let mut far = 0;
    let mut far_d = f64::NEG_INFINITY;
    for (i, (p, &c)) in points.iter().zip(assignments).enumerate() {
        let d = distance2(p, &centroids[c]);
        if d > far_d {
            far = i;
            far_d = d;
        }
    }
    far
}

fn seed_plus_plus(points: &[DVector<f64>], k: usize, rng: &mut StdRng) -> Vec<DVector<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());

    let mut d2: Vec<f64> = points.iter().map(|p| distance2(p, &centroids[0])).collect();
    while centroids.len() < k {
        let total: f64 = d2.iter().sum();
        let chosen = if total > 0.0 && total.is_finite() {
            let target = rng.gen_range(0.0..total);
            let mut acc = 0.0;
            d2.iter()
                .position(|d| {
                    acc += d;
                    acc > target
                })
                .unwrap_or(points.len() - 1)
        } else {
            rng.gen_range(0..points.len())
        };

        let c = points[chosen].clone();
        for (d, p) in d2.iter_mut().zip(points) {
            *d = d.min(distance2(p, &c));
        }
        centroids.push(c);
    }
    centroids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64) -> DVector<f64> {
        DVector::from_vec(vec![x, y])
    }

    fn three_blobs() -> Vec<DVector<f64>> {
        let mut points = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)] {
            for i in 0..20 {
                let angle = i as f64 * 0.314;
                points.push(point(cx + 0.5 * angle.cos(), cy + 0.5 * angle.sin()));
            }
        }
        points
    }

    #[test]
    fn test_separates_blobs() {
        let points = three_blobs();
        let r = kmeans(&points, 3, &KMeansConfig::seeded(3), &ExecutionContext::detached()).unwrap();
        assert!(r.converged);
        for blob in 0..3 {
            let label = r.assignments[blob * 20];
            assert!(r.assignments[blob * 20..(blob + 1) * 20].iter().all(|&a| a == label));
        }
        let mut labels: Vec<_> = (0..3).map(|b| r.assignments[b * 20]).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), 3);
        assert!(r.inertia < 60.0 * 0.25 + 1e-9);
    }

    #[test]
    fn test_deterministic_per_seed() {
        let points = three_blobs();
        let cfg = KMeansConfig::seeded(17);
        let a = kmeans(&points, 4, &cfg, &ExecutionContext::detached()).unwrap();
        let b = kmeans(&points, 4, &cfg, &ExecutionContext::detached()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_k() {
        let points = vec![point(0.0, 0.0), point(1.0, 1.0)];
        let ctx = ExecutionContext::detached();
        assert_eq!(kmeans(&points, 0, &KMeansConfig::default(), &ctx).unwrap_err().kind(), "DomainError");
        assert_eq!(kmeans(&points, 3, &KMeansConfig::default(), &ctx).unwrap_err().kind(), "DomainError");
    }

    #[test]
    fn test_mismatched_dimensions() {
        let points = vec![point(0.0, 0.0), DVector::from_vec(vec![1.0])];
        let err = kmeans(&points, 1, &KMeansConfig::default(), &ExecutionContext::detached()).unwrap_err();
        assert_eq!(err.kind(), "DimensionError");
    }

    #[test]
    fn test_unfillable_cluster() {
        let points = vec![point(1.0, 1.0); 3];
        let err = kmeans(&points, 2, &KMeansConfig::default(), &ExecutionContext::detached()).unwrap_err();
        assert_eq!(err.kind(), "ConvergenceError");
    }

    #[test]
    fn test_reseed_budget_spans_the_run() {
        // Cluster 1 comes back empty on every iteration, one re-seed each time
        let points = vec![point(1.0, 1.0); 3];
        for budget in [0, 3, 7] {
            let cfg = KMeansConfig {
                max_reseed_attempts: budget,
                ..KMeansConfig::default()
            };
            match kmeans(&points, 2, &cfg, &ExecutionContext::detached()).unwrap_err() {
                NumericError::Convergence { iterations, .. } => assert_eq!(iterations, budget + 1),
                other => panic!("expected ConvergenceError, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_k_equals_n() {
        let points = vec![point(0.0, 0.0), point(5.0, 5.0), point(-3.0, 2.0)];
        let r = kmeans(&points, 3, &KMeansConfig::default(), &ExecutionContext::detached()).unwrap();
        assert!(r.converged);
        assert!(r.inertia < 1e-12);
    }
}
