//! Linear convolution
//!
//! Small inputs use the direct sum; above
//! [`TransformConfig::convolution_crossover`] (measured as the product of the
//! input lengths) both inputs are zero-padded to the next power of two,
//! transformed, multiplied bin by bin and transformed back.

use super::fft::{fft, ifft};
use crate::config::TransformConfig;
use crate::numeric::Complex;

/// `(a * b)[k] = Σ_j a[j] · b[k - j]`, of length `a.len() + b.len() - 1`
///
/// Either input empty gives an empty result.
///
/// ```rust
/// use numerix::config::TransformConfig;
/// use numerix::transform::convolution;
///
/// let c = convolution(&[1.0, 2.0, 3.0], &[0.0, 1.0, 0.5], &TransformConfig::default());
/// assert_eq!(c, vec![0.0, 1.0, 2.5, 4.0, 1.5]);
/// ```
pub fn convolution(a: &[f64], b: &[f64], config: &TransformConfig) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    if a.len().saturating_mul(b.len()) <= config.convolution_crossover {
        direct(a, b)
    } else {
        via_fft(a, b)
    }
}

fn direct(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

fn via_fft(a: &[f64], b: &[f64]) -> Vec<f64> {
    let len = a.len() + b.len() - 1;
    let padded = len.next_power_of_two();
    log::trace!("convolution: FFT path, {len} outputs padded to {padded}");

    let pad = |x: &[f64]| {
        let mut v: Vec<Complex> = x.iter().map(|v| Complex::real(*v)).collect();
        v.resize(padded, Complex::ZERO);
        v
    };
    let fa = fft(&pad(a));
    let fb = fft(&pad(b));
    let product: Vec<Complex> = fa.iter().zip(&fb).map(|(x, y)| *x * *y).collect();

    ifft(&product).into_iter().take(len).map(|z| z.re).collect()
}
