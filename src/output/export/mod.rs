//! Export of sampled data
//!
//! # Architecture
//!
//! This module defines the [`Exporter`] trait that abstracts the export format.
//! Each format is an independent implementation in its own sub-module, so
//! adding a format means adding a file.
//!
//! # Available formats
//!
//! | Format  | Module          |
//! |---------|-----------------|
//! | CSV     | [`csv`]         |
//!
//! # Usage example
//!
//! ```rust
//! use numerix::numeric::FnFunction;
//! use numerix::output::export::{CsvExporter, Exporter};
//! use numerix::output::sample_function;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let series = sample_function(&FnFunction::new("sin", f64::sin), 0.0, 3.0, 50).unwrap();
//! CsvExporter::default()
//!     .export_series(&series, &dir.path().join("sin.csv"))
//!     .unwrap();
//! ```

pub mod csv;

pub use csv::{CsvConfig, CsvError, CsvExporter, CsvMetadata, export_series_csv, export_surface_csv};

use crate::output::{Series, SurfaceGrid};
use std::path::Path;

/// Abstraction trait for all export formats.
///
/// # Associated type `Error`
///
/// Each format manages its own errors via the associated type.
/// This avoids systematic boxing (`Box<dyn Error>`) and allows
/// the caller to react precisely based on the error type.
pub trait Exporter {
    /// Error type specific to this export format.
    type Error: std::error::Error;

    /// Write a sampled function
    fn export_series(&self, series: &Series, path: &Path) -> Result<(), Self::Error>;

    /// Write a sampled surface
    fn export_surface(&self, grid: &SurfaceGrid, path: &Path) -> Result<(), Self::Error>;
}
