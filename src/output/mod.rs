//! Rendering hand-off
//!
//! The core never draws anything. It samples functions onto grids
//! ([`sample_function`], [`sample_surface`]) and hands the arrays to a
//! [`RenderSink`] supplied by the caller, or writes them out through
//! [`export`].
//!
//! # Architecture
//!
//! ```text
//! output/
//! ├── mod.rs              ← RenderSink, re-exports
//! ├── sampling.rs         ← Series, SurfaceGrid
//! └── export/             ← Data export
//!     ├── mod.rs          ← Exporter trait
//!     └── csv.rs
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use numerix::error::Result;
//! use numerix::numeric::Polynomial;
//! use numerix::output::{RenderSink, Series, SurfaceGrid, sample_function};
//!
//! struct Printer;
//!
//! impl RenderSink for Printer {
//!     fn plot_function(&mut self, series: &Series) -> Result<()> {
//!         println!("{} points", series.len());
//!         Ok(())
//!     }
//!
//!     fn plot_surface(&mut self, grid: &SurfaceGrid) -> Result<()> {
//!         println!("{:?} grid", grid.z.dim());
//!         Ok(())
//!     }
//! }
//!
//! let series = sample_function(&Polynomial::new(vec![0.0, 1.0]), 0.0, 1.0, 11).unwrap();
//! Printer.plot_function(&series).unwrap();
//! ```

pub mod export;
mod sampling;

pub use sampling::{Series, SurfaceGrid, sample_function, sample_surface};

use crate::error::Result;

/// External renderer contract
///
/// Implementations consume the sampled arrays; they are never called by the
/// numerics themselves.
pub trait RenderSink {
    fn plot_function(&mut self, series: &Series) -> Result<()>;

    fn plot_surface(&mut self, grid: &SurfaceGrid) -> Result<()>;
}
