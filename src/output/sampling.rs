//! Sampling functions onto grids for rendering or export

use crate::error::{NumericError, Result};
use crate::numeric::MathFunction;
use ndarray::Array2;

/// `y[i] = f(x[i])` on an evenly spaced grid
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// `z[[j, i]] = f(x[i], y[j])`: one row per `y` value
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Array2<f64>,
}

/// `n` evenly spaced points from `start` to `end`, both included
fn linspace(operation: &'static str, start: f64, end: f64, n: usize) -> Result<Vec<f64>> {
    if n == 0 {
        return Err(NumericError::domain(operation, "at least one sample point is required"));
    }
    if !start.is_finite() || !end.is_finite() {
        return Err(NumericError::domain(
            operation,
            format!("range [{start}, {end}] is not finite"),
        ));
    }
    if n == 1 {
        return Ok(vec![start]);
    }
    let step = (end - start) / (n - 1) as f64;
    let mut points: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
    points[n - 1] = end;
    Ok(points)
}

/// Sample `f` at `n` evenly spaced points of `[a, b]`
///
/// # Example
///
/// ```rust
/// use numerix::numeric::Polynomial;
/// use numerix::output::sample_function;
///
/// let s = sample_function(&Polynomial::new(vec![0.0, 0.0, 1.0]), 0.0, 2.0, 3).unwrap();
/// assert_eq!(s.x, vec![0.0, 1.0, 2.0]);
/// assert_eq!(s.y, vec![0.0, 1.0, 4.0]);
/// ```
pub fn sample_function(f: &dyn MathFunction, a: f64, b: f64, n: usize) -> Result<Series> {
    let x = linspace("sample_function", a, b, n)?;
    let y = x.iter().map(|v| f.evaluate(*v)).collect();
    Ok(Series { x, y })
}

/// Sample `f(x, y)` on an `nx × ny` grid
pub fn sample_surface<F>(
    f: F,
    x_range: (f64, f64),
    y_range: (f64, f64),
    nx: usize,
    ny: usize,
) -> Result<SurfaceGrid>
where
    F: Fn(f64, f64) -> f64,
{
    let x = linspace("sample_surface", x_range.0, x_range.1, nx)?;
    let y = linspace("sample_surface", y_range.0, y_range.1, ny)?;
    let z = Array2::from_shape_fn((ny, nx), |(j, i)| f(x[i], y[j]));
    Ok(SurfaceGrid { x, y, z })
}
