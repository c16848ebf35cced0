//! Discrete Fourier transform
//!
//! # Algorithm
//!
//! Cooley-Tukey decimation in time. Power-of-two lengths run the in-place
//! iterative butterfly after a bit-reversal permutation. Other lengths use
//! the recursive even/odd split, and any level whose length is odd (and not
//! 1) falls back to a direct O(n²) DFT:
//!
//! ```text
//! n = 12 ──split──► 6 ──split──► 3  (odd: direct DFT)
//! n = 7  ─────────────────────────► direct DFT over all 7 points
//! ```
//!
//! Lengths with a large odd factor are therefore much slower than powers of
//! two; no error is raised.
//!
//! Output is in natural bin order, bin 0 being the DC component. The
//! forward transform is unnormalised; [`ifft`] divides by `n`.

use crate::numeric::Complex;
use std::f64::consts::PI;

/// `e^{-2πik/n}`
fn twiddle(k: usize, n: usize) -> Complex {
    Complex::from_polar(1.0, -2.0 * PI * k as f64 / n as f64)
}

/// Bit-reversal permutation (length must be a power of two)
fn bit_reverse_permutation(data: &mut [Complex]) {
    let n = data.len();
    debug_assert!(n.is_power_of_two());
    let bits = n.trailing_zeros();
    if bits == 0 {
        return;
    }
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - bits);
        if i < j {
            data.swap(i, j);
        }
    }
}

/// In-place iterative radix-2 butterfly
fn fft_radix2(data: &mut [Complex]) {
    let n = data.len();
    if n <= 1 {
        return;
    }
    bit_reverse_permutation(data);

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let mut start = 0;
        while start < n {
            for k in 0..half {
                let w = twiddle(k, len);
                let even = start + k;
                let odd = even + half;
                let t = w * data[odd];
                data[odd] = data[even] - t;
                data[even] = data[even] + t;
            }
            start += len;
        }
        len *= 2;
    }
}

/// Direct `X_k = Σ x_j e^{-2πijk/n}`
fn dft(input: &[Complex]) -> Vec<Complex> {
    let n = input.len();
    (0..n)
        .map(|k| {
            input
                .iter()
                .enumerate()
                .fold(Complex::ZERO, |acc, (j, x)| acc + *x * twiddle((j * k) % n, n))
        })
        .collect()
}

/// Recursive decimation in time with the odd-length fallback
fn fft_mixed(input: &[Complex]) -> Vec<Complex> {
    let n = input.len();
    if n <= 1 {
        return input.to_vec();
    }
    if n % 2 == 1 {
        return dft(input);
    }

    let even: Vec<Complex> = input.iter().step_by(2).copied().collect();
    let odd: Vec<Complex> = input.iter().skip(1).step_by(2).copied().collect();
    let even = fft_mixed(&even);
    let odd = fft_mixed(&odd);

    let half = n / 2;
    let mut out = vec![Complex::ZERO; n];
    for k in 0..half {
        let t = twiddle(k, n) * odd[k];
        out[k] = even[k] + t;
        out[k + half] = even[k] - t;
    }
    out
}

/// Forward transform
///
/// ```rust
/// use numerix::numeric::Complex;
/// use numerix::transform::fft;
///
/// let impulse = vec![Complex::ONE, Complex::ZERO, Complex::ZERO, Complex::ZERO];
/// assert!(fft(&impulse).iter().all(|z| z.approx_eq(Complex::ONE, 1e-15)));
/// ```
pub fn fft(signal: &[Complex]) -> Vec<Complex> {
    let n = signal.len();
    if n.is_power_of_two() || n == 0 {
        let mut data = signal.to_vec();
        fft_radix2(&mut data);
        return data;
    }

    let odd_factor = n >> n.trailing_zeros();
    log::debug!(
        "fft: length {n} is not a power of two, sub-sequences of length {odd_factor} use a direct DFT"
    );
    fft_mixed(signal)
}

/// Normalised inverse transform, `ifft(fft(x)) ≈ x`
pub fn ifft(spectrum: &[Complex]) -> Vec<Complex> {
    let n = spectrum.len();
    if n == 0 {
        return Vec::new();
    }
    let conjugated: Vec<Complex> = spectrum.iter().map(|z| z.conj()).collect();
    let scale = 1.0 / n as f64;
    fft(&conjugated)
        .into_iter()
        .map(|z| z.conj().scale(scale))
        .collect()
}

/// Forward transform of a real signal (full spectrum)
pub fn fft_real(signal: &[f64]) -> Vec<Complex> {
    let data: Vec<Complex> = signal.iter().map(|x| Complex::real(*x)).collect();
    fft(&data)
}

/// `|X_k|²` for every bin
pub fn power_spectrum(spectrum: &[Complex]) -> Vec<f64> {
    spectrum.iter().map(|z| z.norm_sqr()).collect()
}

/// Frequency of every bin for `n` samples taken at `sample_rate`
///
/// Bins above the Nyquist index map to negative frequencies:
/// `[0, 1, ..., ⌈n/2⌉-1, -⌊n/2⌋, ..., -1] · sample_rate / n`.
pub fn frequencies(n: usize, sample_rate: f64) -> Vec<f64> {
    let step = sample_rate / n as f64;
    (0..n)
        .map(|k| {
            if k <= (n - 1) / 2 {
                k as f64 * step
            } else {
                -((n - k) as f64) * step
            }
        })
        .collect()
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn signal(n: usize) -> Vec<Complex> {
        (0..n)
            .map(|i| Complex::new((i as f64 * 0.7).sin(), (i as f64 * 0.3).cos() - 0.5))
            .collect()
    }

    fn max_error(a: &[Complex], b: &[Complex]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (*x - *y).modulus())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_empty_and_single() {
        assert!(fft(&[]).is_empty());
        assert!(ifft(&[]).is_empty());
        let one = [Complex::new(2.0, -1.0)];
        assert_eq!(fft(&one), one.to_vec());
    }

    #[test]
    fn test_dc_bin_first() {
        let x = vec![Complex::real(1.0); 8];
        let spectrum = fft(&x);
        assert_relative_eq!(spectrum[0].re, 8.0, epsilon = 1e-12);
        assert!(spectrum[1..].iter().all(|z| z.modulus() < 1e-12));
    }

    #[test]
    fn test_single_frequency_lands_in_its_bin() {
        let n = 16;
        let x: Vec<f64> = (0..n).map(|i| (2.0 * PI * 3.0 * i as f64 / n as f64).cos()).collect();
        let power = power_spectrum(&fft_real(&x));
        assert_relative_eq!(power[3], 64.0, epsilon = 1e-9);
        assert_relative_eq!(power[13], 64.0, epsilon = 1e-9);
        assert!(power[5] < 1e-18);
    }

    #[test]
    fn test_radix2_matches_direct_dft() {
        let x = signal(32);
        assert!(max_error(&fft(&x), &dft(&x)) < 1e-10);
    }

    #[test]
    fn test_mixed_and_odd_lengths_match_direct_dft() {
        for n in [3, 6, 7, 12, 20] {
            let x = signal(n);
            assert!(max_error(&fft(&x), &dft(&x)) < 1e-10, "length {n}");
        }
    }

    #[test]
    fn test_round_trip() {
        for n in [1, 2, 8, 64, 12] {
            let x = signal(n);
            assert!(max_error(&ifft(&fft(&x)), &x) < 1e-12, "length {n}");
        }
    }

    #[test]
    fn test_frequencies() {
        assert_eq!(frequencies(4, 8.0), vec![0.0, 2.0, -4.0, -2.0]);
        assert_eq!(frequencies(5, 5.0), vec![0.0, 1.0, 2.0, -2.0, -1.0]);
    }
}
