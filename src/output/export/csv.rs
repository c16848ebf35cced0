//! CSV export of sampled series and surfaces
//!
//! CSV is readable by spreadsheets, Python pandas, MATLAB and most plotting
//! tools, which makes it the default hand-off to an external renderer.
//!
//! # Features
//!
//! - **Series**: two columns, `x` and `y`
//! - **Surfaces**: long format, one `x,y,z` row per grid node (row-major in
//!   `y`, then `x`)
//! - **Metadata support**: optional `#` comment header with a generation
//!   timestamp and free-form parameters
//! - **Customizable**: delimiter, decimal separator, precision, headers
//! - **Validation**: rejects empty data, mismatched lengths, NaN and Inf
//!
//! # Quick Examples
//!
//! ## Minimal Export
//!
//! ```rust,ignore
//! use numerix::output::{sample_function, export::export_series_csv};
//!
//! let series = sample_function(&f, 0.0, 3.0, 4)?;
//! export_series_csv(&series, "data.csv", None)?;
//! ```
//!
//! **Output** (`data.csv`):
//! ```csv
//! x,y
//! 0.000000,0.000000
//! 1.000000,1.000000
//! 2.000000,4.000000
//! 3.000000,9.000000
//! ```
//!
//! ## With Metadata
//!
//! ```rust,ignore
//! use numerix::output::export::{CsvConfig, CsvMetadata};
//!
//! let metadata = CsvMetadata::titled("x squared").with("samples", "4");
//! let config = CsvConfig::default().with_metadata(metadata);
//! export_series_csv(&series, "data.csv", Some(&config))?;
//! ```
//!
//! **Output** (`data.csv`):
//! ```csv
//! # x squared
//! # Generated: 2026-10-19T15:30:00+00:00
//! # samples: 4
//! #
//! x,y
//! ...
//! ```

use super::Exporter;
use crate::output::{Series, SurfaceGrid};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

/// Failure to export
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("cannot write CSV: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Configuration Structures
// =============================================================================

/// Configuration for CSV export
///
/// # Example
///
/// ```rust
/// use numerix::output::export::CsvConfig;
///
/// let config = CsvConfig {
///     delimiter: ';',
///     precision: 10,
///     ..Default::default()
/// };
/// assert_eq!(config.decimal_separator, '.');
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CsvConfig {
    /// Column delimiter (default: ',')
    pub delimiter: char,

    /// Decimal separator (default: '.')
    pub decimal_separator: char,

    /// Number of decimal places for floating-point values (default: 6)
    pub precision: usize,

    /// Metadata written as `#` comments before the header
    pub metadata: Option<CsvMetadata>,

    /// Header of the abscissa column (default: "x")
    pub x_header: String,

    /// Header of the second coordinate of a surface (default: "y")
    pub y_header: String,

    /// Header of the value column: `y` of a series, `z` of a surface
    /// (default: "value")
    pub value_header: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            decimal_separator: '.',
            precision: 6,
            metadata: None,
            x_header: "x".to_string(),
            y_header: "y".to_string(),
            value_header: "value".to_string(),
        }
    }
}

impl CsvConfig {
    /// European CSV format (semicolon, comma for decimal)
    pub fn european() -> Self {
        Self {
            delimiter: ';',
            decimal_separator: ',',
            ..Default::default()
        }
    }

    /// High precision (12 decimal places)
    pub fn high_precision() -> Self {
        Self {
            precision: 12,
            ..Default::default()
        }
    }

    /// Builder pattern: set delimiter
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Builder pattern: set precision
    pub fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Builder pattern: set column headers
    pub fn headers(mut self, x: &str, y: &str, value: &str) -> Self {
        self.x_header = x.to_string();
        self.y_header = y.to_string();
        self.value_header = value.to_string();
        self
    }

    /// Builder pattern: enable metadata
    pub fn with_metadata(mut self, metadata: CsvMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn format_number(&self, value: f64) -> String {
        let formatted = format!("{:.prec$}", value, prec = self.precision);
        if self.decimal_separator != '.' {
            formatted.replace('.', &self.decimal_separator.to_string())
        } else {
            formatted
        }
    }
}

/// Comment header of an exported file
///
/// The generation timestamp is added at write time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsvMetadata {
    /// First comment line
    pub title: Option<String>,

    /// `# key: value` lines, in insertion order
    pub entries: Vec<(String, String)>,
}

impl CsvMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            entries: Vec::new(),
        }
    }

    /// Builder pattern: add a parameter line
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.entries.push((key.into(), value.to_string()));
        self
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn write_metadata_header(out: &mut impl Write, metadata: &CsvMetadata) -> Result<(), CsvError> {
    if let Some(title) = &metadata.title {
        writeln!(out, "# {title}")?;
    }
    writeln!(out, "# Generated: {}", chrono::Utc::now().to_rfc3339())?;
    for (key, value) in &metadata.entries {
        writeln!(out, "# {key}: {value}")?;
    }
    writeln!(out, "#")?;
    Ok(())
}

fn check_finite(name: &str, values: &[f64]) -> Result<(), CsvError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(CsvError::InvalidData(format!("NaN or Inf detected in {name}")));
    }
    Ok(())
}

fn create(path: &Path, config: &CsvConfig) -> Result<BufWriter<File>, CsvError> {
    let mut out = BufWriter::new(File::create(path)?);
    if let Some(metadata) = &config.metadata {
        write_metadata_header(&mut out, metadata)?;
    }
    Ok(out)
}

// =============================================================================
// Export Functions
// =============================================================================

/// Write a [`Series`] as two columns
///
/// # Errors
///
/// - Empty series or `x`/`y` length mismatch
/// - NaN or Inf values
/// - File creation or write errors
pub fn export_series_csv(
    series: &Series,
    path: impl AsRef<Path>,
    config: Option<&CsvConfig>,
) -> Result<(), CsvError> {
    // ============================= Validation =============================

    if series.x.is_empty() {
        return Err(CsvError::InvalidData("series is empty".to_string()));
    }
    if series.x.len() != series.y.len() {
        return Err(CsvError::InvalidData(format!(
            "{} x values versus {} y values",
            series.x.len(),
            series.y.len()
        )));
    }
    check_finite("x", &series.x)?;
    check_finite("y", &series.y)?;

    // ============================= Write ==================================

    let binding = CsvConfig::default();
    let config = config.unwrap_or(&binding);
    let mut out = create(path.as_ref(), config)?;

    let d = config.delimiter;
    writeln!(out, "{}{d}{}", config.x_header, config.value_header)?;
    for (x, y) in series.x.iter().zip(&series.y) {
        writeln!(out, "{}{d}{}", config.format_number(*x), config.format_number(*y))?;
    }
    out.flush()?;

    log::debug!("exported {} points to {}", series.len(), path.as_ref().display());
    Ok(())
}

/// Write a [`SurfaceGrid`] in long format, one `x, y, z` row per node
///
/// # Errors
///
/// - Empty grid or `z` shape not `(y.len(), x.len())`
/// - NaN or Inf values
/// - File creation or write errors
pub fn export_surface_csv(
    grid: &SurfaceGrid,
    path: impl AsRef<Path>,
    config: Option<&CsvConfig>,
) -> Result<(), CsvError> {
    // ============================= Validation =============================

    if grid.x.is_empty() || grid.y.is_empty() {
        return Err(CsvError::InvalidData("grid is empty".to_string()));
    }
    if grid.z.dim() != (grid.y.len(), grid.x.len()) {
        return Err(CsvError::InvalidData(format!(
            "z has shape {:?}, expected ({}, {})",
            grid.z.dim(),
            grid.y.len(),
            grid.x.len()
        )));
    }
    check_finite("x", &grid.x)?;
    check_finite("y", &grid.y)?;
    if grid.z.iter().any(|v| !v.is_finite()) {
        return Err(CsvError::InvalidData("NaN or Inf detected in z".to_string()));
    }

    // ============================= Write ==================================

    let binding = CsvConfig::default();
    let config = config.unwrap_or(&binding);
    let mut out = create(path.as_ref(), config)?;

    let d = config.delimiter;
    writeln!(
        out,
        "{}{d}{}{d}{}",
        config.x_header, config.y_header, config.value_header
    )?;
    for (j, y) in grid.y.iter().enumerate() {
        for (i, x) in grid.x.iter().enumerate() {
            writeln!(
                out,
                "{}{d}{}{d}{}",
                config.format_number(*x),
                config.format_number(*y),
                config.format_number(grid.z[[j, i]])
            )?;
        }
    }
    out.flush()?;

    log::debug!(
        "exported {}x{} grid to {}",
        grid.x.len(),
        grid.y.len(),
        path.as_ref().display()
    );
    Ok(())
}

// =============================================================================
// Exporter
// =============================================================================

/// [`Exporter`] writing CSV with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct CsvExporter {
    pub config: CsvConfig,
}

impl CsvExporter {
    pub fn new(config: CsvConfig) -> Self {
        Self { config }
    }
}

impl Exporter for CsvExporter {
    type Error = CsvError;

    fn export_series(&self, series: &Series, path: &Path) -> Result<(), CsvError> {
        export_series_csv(series, path, Some(&self.config))
    }

    fn export_surface(&self, grid: &SurfaceGrid, path: &Path) -> Result<(), CsvError> {
        export_surface_csv(grid, path, Some(&self.config))
    }
}

// =================================================================================================
// Tests
// =================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Polynomial;
    use crate::output::{sample_function, sample_surface};
    use std::fs;
    use tempfile::NamedTempFile;

    fn square_series() -> Series {
        sample_function(&Polynomial::new(vec![0.0, 0.0, 1.0]), 0.0, 3.0, 4).unwrap()
    }

    #[test]
    fn test_series_basic() {
        let file = NamedTempFile::new().unwrap();
        let config = CsvConfig::default().headers("x", "y", "y").precision(1);
        export_series_csv(&square_series(), file.path(), Some(&config)).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["x,y", "0.0,0.0", "1.0,1.0", "2.0,4.0", "3.0,9.0"]);
    }

    #[test]
    fn test_series_with_metadata() {
        let file = NamedTempFile::new().unwrap();
        let metadata = CsvMetadata::titled("x squared").with("samples", 4);
        let config = CsvConfig::default().with_metadata(metadata);
        export_series_csv(&square_series(), file.path(), Some(&config)).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "# x squared");
        assert!(lines[1].starts_with("# Generated: "));
        assert_eq!(lines[2], "# samples: 4");
        assert_eq!(lines[3], "#");
        assert_eq!(lines[4], "x,value");
    }

    #[test]
    fn test_european_format() {
        let file = NamedTempFile::new().unwrap();
        let config = CsvConfig::european().precision(2);
        export_series_csv(&square_series(), file.path(), Some(&config)).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("1,00;1,00"));
        assert!(content.contains("x;value"));
    }

    #[test]
    fn test_series_validation() {
        let file = NamedTempFile::new().unwrap();
        let empty = Series::default();
        assert!(matches!(
            export_series_csv(&empty, file.path(), None),
            Err(CsvError::InvalidData(_))
        ));

        let mismatched = Series {
            x: vec![0.0, 1.0],
            y: vec![0.0],
        };
        assert!(export_series_csv(&mismatched, file.path(), None).is_err());

        let nan = Series {
            x: vec![0.0],
            y: vec![f64::NAN],
        };
        assert!(export_series_csv(&nan, file.path(), None).is_err());
    }

    #[test]
    fn test_surface_long_format() {
        let file = NamedTempFile::new().unwrap();
        let grid = sample_surface(|x, y| x * y, (1.0, 2.0), (0.0, 3.0), 2, 2).unwrap();
        let exporter = CsvExporter::new(CsvConfig::default().precision(0).headers("x", "y", "z"));
        exporter.export_surface(&grid, file.path()).unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["x,y,z", "1,0,0", "2,0,0", "1,3,3", "2,3,6"]);
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        assert!(matches!(
            export_series_csv(&square_series(), &path, None),
            Err(CsvError::Io(_))
        ));
    }
}
