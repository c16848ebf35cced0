//! Transform engine
//!
//! - [`fft`] / [`ifft`]: discrete Fourier transform and its normalised
//!   inverse, radix-2 with a direct-DFT fallback for odd lengths
//! - [`fft_real`], [`power_spectrum`], [`frequencies`]: helpers for real
//!   signals
//! - [`convolution`]: direct or FFT-based linear convolution, switched by
//!   [`crate::config::TransformConfig`]

mod convolution;
mod fft;

pub use convolution::convolution;
pub use fft::{fft, fft_real, frequencies, ifft, power_spectrum};
