//! Eigenvalues of general real matrices
//!
//! # Algorithm
//!
//! ```text
//! balance  →  Hessenberg reduction  →  shifted QR iteration
//! (diagonal   (stabilised elementary   (Francis double shift from the
//!  scaling)    similarity, pivoted)     trailing 2×2, deflating 1×1 and
//!                                       2×2 blocks)
//! ```
//!
//! Every stage is a similarity transform, so the spectrum is preserved.
//! Complex eigenvalues of a real matrix come out as conjugate pairs from a
//! deflated 2×2 block.
//!
//! A block that has not deflated after 10 (and 20, 30, ...) iterations gets
//! an exceptional ad-hoc shift to break cycles. When the overall budget
//! [`LinalgConfig::max_eigen_iterations`] is exhausted the current estimate
//! is logged at `warn!`, published as an `eigenvalue_warning` event, and a
//! `Convergence` error is returned.

use crate::config::LinalgConfig;
use crate::error::{NumericError, Result};
use crate::numeric::{Complex, Matrix};
use crate::runtime::{Event, ExecutionContext};

const RADIX: f64 = 2.0;

/// Square working copy, indexed `h[(i, j)]`
struct Work {
    n: usize,
    a: Vec<f64>,
}

impl std::ops::Index<(usize, usize)> for Work {
    type Output = f64;
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.a[i * self.n + j]
    }
}

impl std::ops::IndexMut<(usize, usize)> for Work {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.a[i * self.n + j]
    }
}

fn sign(a: f64, b: f64) -> f64 {
    if b >= 0.0 { a.abs() } else { -a.abs() }
}

/// All eigenvalues of a square matrix, in no particular order
///
/// ```rust
/// use numerix::config::LinalgConfig;
/// use numerix::linalg::eigenvalues;
/// use numerix::numeric::Matrix;
/// use numerix::runtime::ExecutionContext;
///
/// // Rotation by 90°: eigenvalues ±i
/// let m = Matrix::from_rows(&[vec![0.0, -1.0], vec![1.0, 0.0]]).unwrap();
/// let ev = eigenvalues(&m, &LinalgConfig::default(), &ExecutionContext::detached()).unwrap();
/// assert!(ev.iter().all(|z| z.re.abs() < 1e-12 && (z.im.abs() - 1.0).abs() < 1e-12));
/// ```
///
/// # Errors
///
/// - `Dimension` for non-square input
/// - `Convergence` when the iteration budget runs out
/// - `Cancelled` when the context's token fires between iterations
pub fn eigenvalues(
    m: &Matrix,
    config: &LinalgConfig,
    ctx: &ExecutionContext,
) -> Result<Vec<Complex>> {
    m.require_square("eigenvalues")?;
    let n = m.rows();
    match n {
        0 => return Ok(Vec::new()),
        1 => return Ok(vec![Complex::real(m.get(0, 0))]),
        _ => {}
    }

    let mut h = Work {
        n,
        a: m.as_slice().to_vec(),
    };
    balance(&mut h);
    reduce_to_hessenberg(&mut h);
    hessenberg_qr(&mut h, config, ctx)
}

/// Scale rows and columns by powers of two so their norms are comparable
fn balance(h: &mut Work) {
    let n = h.n;
    let sqrdx = RADIX * RADIX;
    let mut done = false;
    while !done {
        done = true;
        for i in 0..n {
            let mut c = 0.0;
            let mut r = 0.0;
            for j in (0..n).filter(|&j| j != i) {
                c += h[(j, i)].abs();
                r += h[(i, j)].abs();
            }
            if c == 0.0 || r == 0.0 {
                continue;
            }

            let total = c + r;
            let mut f = 1.0;
            let mut g = r / RADIX;
            while c < g {
                f *= RADIX;
                c *= sqrdx;
            }
            g = r * RADIX;
            while c > g {
                f /= RADIX;
                c /= sqrdx;
            }

            if (c + r) / f < 0.95 * total {
                done = false;
                let g = 1.0 / f;
                for j in 0..n {
                    h[(i, j)] *= g;
                }
                for j in 0..n {
                    h[(j, i)] *= f;
                }
            }
        }
    }
}

/// Reduce to upper Hessenberg form by pivoted elementary similarity
/// transforms, then clear everything below the subdiagonal
fn reduce_to_hessenberg(h: &mut Work) {
    let n = h.n;
    for m in 1..n.saturating_sub(1) {
        let mut x: f64 = 0.0;
        let mut pivot = m;
        for j in m..n {
            if h[(j, m - 1)].abs() > x.abs() {
                x = h[(j, m - 1)];
                pivot = j;
            }
        }

        if pivot != m {
            for j in (m - 1)..n {
                h.a.swap(pivot * n + j, m * n + j);
            }
            for j in 0..n {
                h.a.swap(j * n + pivot, j * n + m);
            }
        }

        if x != 0.0 {
            for i in (m + 1)..n {
                let mut y = h[(i, m - 1)];
                if y != 0.0 {
                    y /= x;
                    h[(i, m - 1)] = y;
                    for j in m..n {
                        let hmj = h[(m, j)];
                        h[(i, j)] -= y * hmj;
                    }
                    for j in 0..n {
                        let hji = h[(j, i)];
                        h[(j, m)] += y * hji;
                    }
                }
            }
        }
    }

    for i in 2..n {
        for j in 0..(i - 1) {
            h[(i, j)] = 0.0;
        }
    }
}

/// Francis double-shift QR on an upper Hessenberg matrix
#[allow(clippy::many_single_char_names)]
fn hessenberg_qr(h: &mut Work, config: &LinalgConfig, ctx: &ExecutionContext) -> Result<Vec<Complex>> {
    let n = h.n;
    let tol = config.eigen_tolerance;
    let mut wr = vec![0.0; n];
    let mut wi = vec![0.0; n];

    let mut anorm = 0.0;
    for i in 0..n {
        for j in i.saturating_sub(1)..n {
            anorm += h[(i, j)].abs();
        }
    }

    let mut end = n;
    let mut shift_total = 0.0;
    let mut total_iterations = 0usize;
    let mut its = 0usize;

    while end > 0 {
        let nn = end - 1;

        // Deflation point: smallest l with a negligible H[l][l-1]
        let mut l = 0;
        for k in (1..=nn).rev() {
            let mut s = h[(k - 1, k - 1)].abs() + h[(k, k)].abs();
            if s == 0.0 {
                s = anorm;
            }
            if h[(k, k - 1)].abs() <= tol * s {
                h[(k, k - 1)] = 0.0;
                l = k;
                break;
            }
        }

        let mut x = h[(nn, nn)];
        if l == nn {
            wr[nn] = x + shift_total;
            wi[nn] = 0.0;
            end -= 1;
            its = 0;
            continue;
        }

        let mut y = h[(nn - 1, nn - 1)];
        let mut w = h[(nn, nn - 1)] * h[(nn - 1, nn)];
        if l + 1 == nn {
            let p = 0.5 * (y - x);
            let q = p * p + w;
            let mut z = q.abs().sqrt();
            x += shift_total;
            if q >= 0.0 {
                z = p + sign(z, p);
                wr[nn - 1] = x + z;
                wr[nn] = if z != 0.0 { x - w / z } else { x + z };
                wi[nn - 1] = 0.0;
                wi[nn] = 0.0;
            } else {
                wr[nn - 1] = x + p;
                wr[nn] = x + p;
                wi[nn - 1] = z;
                wi[nn] = -z;
            }
            end -= 2;
            its = 0;
            continue;
        }

        if total_iterations >= config.max_eigen_iterations {
            let subdiagonal = h[(nn, nn - 1)].abs();
            return Err(report_non_convergence(
                h,
                &wr,
                &wi,
                end,
                shift_total,
                total_iterations,
                subdiagonal,
                config,
                ctx,
            ));
        }
        ctx.checkpoint()?;

        if its > 0 && its % 10 == 0 {
            // Exceptional shift
            shift_total += x;
            for i in 0..=nn {
                h[(i, i)] -= x;
            }
            let s = h[(nn, nn - 1)].abs() + h[(nn - 1, nn - 2)].abs();
            x = 0.75 * s;
            y = x;
            w = -0.4375 * s * s;
            log::debug!("eigenvalues: exceptional shift after {its} stalled iterations");
        }
        its += 1;
        total_iterations += 1;
        log::trace!(
            "eigenvalues: iteration {total_iterations}, active block {l}..={nn}, subdiagonal {:e}",
            h[(nn, nn - 1)].abs()
        );

        // Look for two consecutive small subdiagonal elements
        let mut m = nn - 2;
        let mut p: f64;
        let mut q: f64;
        let mut r: f64;
        loop {
            let z = h[(m, m)];
            let r0 = x - z;
            let s0 = y - z;
            p = (r0 * s0 - w) / h[(m + 1, m)] + h[(m, m + 1)];
            q = h[(m + 1, m + 1)] - z - r0 - s0;
            r = h[(m + 2, m + 1)];
            let s = p.abs() + q.abs() + r.abs();
            p /= s;
            q /= s;
            r /= s;
            if m == l {
                break;
            }
            let u = h[(m, m - 1)].abs() * (q.abs() + r.abs());
            let v = p.abs() * (h[(m - 1, m - 1)].abs() + z.abs() + h[(m + 1, m + 1)].abs());
            if u + v == v {
                break;
            }
            m -= 1;
        }

        for i in (m + 2)..=nn {
            h[(i, i - 2)] = 0.0;
            if i != m + 2 {
                h[(i, i - 3)] = 0.0;
            }
        }

        // Double-shift QR step on rows l..=nn, columns m..=nn
        for k in m..nn {
            if k != m {
                p = h[(k, k - 1)];
                q = h[(k + 1, k - 1)];
                r = if k != nn - 1 { h[(k + 2, k - 1)] } else { 0.0 };
                x = p.abs() + q.abs() + r.abs();
                if x != 0.0 {
                    p /= x;
                    q /= x;
                    r /= x;
                }
            }

            let s = sign((p * p + q * q + r * r).sqrt(), p);
            if s == 0.0 {
                continue;
            }

            if k == m {
                if l != m {
                    h[(k, k - 1)] = -h[(k, k - 1)];
                }
            } else {
                h[(k, k - 1)] = -s * x;
            }
            p += s;
            x = p / s;
            y = q / s;
            let z = r / s;
            q /= p;
            r /= p;

            for j in k..=nn {
                let mut pj = h[(k, j)] + q * h[(k + 1, j)];
                if k != nn - 1 {
                    pj += r * h[(k + 2, j)];
                    h[(k + 2, j)] -= pj * z;
                }
                h[(k + 1, j)] -= pj * y;
                h[(k, j)] -= pj * x;
            }

            let mmin = nn.min(k + 3);
            for i in l..=mmin {
                let mut pi = x * h[(i, k)] + y * h[(i, k + 1)];
                if k != nn - 1 {
                    pi += z * h[(i, k + 2)];
                    h[(i, k + 2)] -= pi * r;
                }
                h[(i, k + 1)] -= pi * q;
                h[(i, k)] -= pi;
            }
        }
    }

    Ok(wr
        .into_iter()
        .zip(wi)
        .map(|(re, im)| Complex::new(re, im))
        .collect())
}

/// Log and publish the best estimate, then build the error
#[allow(clippy::too_many_arguments)]
fn report_non_convergence(
    h: &Work,
    wr: &[f64],
    wi: &[f64],
    end: usize,
    shift_total: f64,
    iterations: usize,
    subdiagonal: f64,
    config: &LinalgConfig,
    ctx: &ExecutionContext,
) -> NumericError {
    // Undeflated block: its diagonal is the current estimate
    let mut real_parts: Vec<f64> = (0..end).map(|i| h[(i, i)] + shift_total).collect();
    let mut imag_parts = vec![0.0; end];
    real_parts.extend_from_slice(&wr[end..]);
    imag_parts.extend_from_slice(&wi[end..]);

    log::warn!(
        "eigenvalues did not converge after {iterations} iterations \
         (subdiagonal {subdiagonal:e}); partial estimate: {real_parts:?} + i{imag_parts:?}"
    );
    ctx.emit(
        Event::new(Event::EIGENVALUE_WARNING)
            .with("iteration", iterations)
            .with("error", subdiagonal)
            .with("real_parts", real_parts)
            .with("imag_parts", imag_parts),
    );

    NumericError::Convergence {
        operation: "eigenvalues",
        iterations,
        last_error: subdiagonal,
        tolerance: config.eigen_tolerance,
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::EventBus;
    use approx::assert_relative_eq;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn sorted_real(values: &[Complex]) -> Vec<f64> {
        let mut re: Vec<f64> = values.iter().map(|z| z.re).collect();
        re.sort_by(|a, b| a.partial_cmp(b).unwrap());
        re
    }

    #[test]
    fn test_symmetric_tridiagonal() {
        // Eigenvalues 2 - √2, 2, 2 + √2
        let m = Matrix::from_rows(&[
            vec![2.0, -1.0, 0.0],
            vec![-1.0, 2.0, -1.0],
            vec![0.0, -1.0, 2.0],
        ])
        .unwrap();
        let ev = eigenvalues(&m, &LinalgConfig::default(), &ExecutionContext::detached()).unwrap();
        assert!(ev.iter().all(|z| z.im.abs() < 1e-12));
        let re = sorted_real(&ev);
        let s = 2f64.sqrt();
        assert_relative_eq!(re[0], 2.0 - s, epsilon = 1e-10);
        assert_relative_eq!(re[1], 2.0, epsilon = 1e-10);
        assert_relative_eq!(re[2], 2.0 + s, epsilon = 1e-10);
    }

    #[test]
    fn test_triangular_and_trivial_sizes() {
        let ctx = ExecutionContext::detached();
        let cfg = LinalgConfig::default();
        let m = Matrix::from_rows(&[
            vec![1.0, 5.0, 9.0, 2.0],
            vec![0.0, -2.0, 4.0, 1.0],
            vec![0.0, 0.0, 3.0, 7.0],
            vec![0.0, 0.0, 0.0, 0.5],
        ])
        .unwrap();
        let re = sorted_real(&eigenvalues(&m, &cfg, &ctx).unwrap());
        for (got, want) in re.iter().zip([-2.0, 0.5, 1.0, 3.0]) {
            assert_relative_eq!(*got, want, epsilon = 1e-10);
        }

        assert!(eigenvalues(&Matrix::zeros(0, 0), &cfg, &ctx).unwrap().is_empty());
        assert_eq!(
            eigenvalues(&Matrix::diagonal(&[4.0]), &cfg, &ctx).unwrap(),
            vec![Complex::real(4.0)]
        );
        assert!(eigenvalues(&Matrix::zeros(2, 3), &cfg, &ctx).is_err());
    }

    #[test]
    fn test_complex_pair_and_trace() {
        let m = Matrix::from_rows(&[
            vec![4.0, -5.0, 0.0, 3.0],
            vec![0.0, 4.0, -3.0, -5.0],
            vec![5.0, -3.0, 4.0, 0.0],
            vec![3.0, 0.0, 5.0, 4.0],
        ])
        .unwrap();
        let ev = eigenvalues(&m, &LinalgConfig::default(), &ExecutionContext::detached()).unwrap();
        let sum_re: f64 = ev.iter().map(|z| z.re).sum();
        let sum_im: f64 = ev.iter().map(|z| z.im).sum();
        assert_relative_eq!(sum_re, m.trace().unwrap(), epsilon = 1e-9);
        assert!(sum_im.abs() < 1e-9);
        assert!(ev.iter().any(|z| z.im.abs() > 1.0));
    }

    #[test]
    fn test_budget_exhaustion_reports_estimate() {
        let bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(Event::EIGENVALUE_WARNING, move |e: &Event| {
            sink.lock().push(e.clone());
        });
        let ctx = ExecutionContext::with_bus(Arc::clone(&bus));

        let m = Matrix::from_rows(&[
            vec![1.0, 2.0, 3.0, 4.0],
            vec![5.0, 6.0, 7.0, 8.0],
            vec![9.0, 1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0, 9.0],
        ])
        .unwrap();
        let cfg = LinalgConfig::default().with_max_eigen_iterations(1);
        let err = eigenvalues(&m, &cfg, &ctx).unwrap_err();
        assert!(matches!(err, NumericError::Convergence { iterations: 1, .. }));

        let events = seen.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].series("real_parts").map(<[f64]>::len), Some(4));
    }
}
