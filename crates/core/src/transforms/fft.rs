//! 2D discrete Fourier transform and per-wavenumber reconstruction
//!
//! The forward transform runs a 1D FFT over every row and then over every
//! column. The inverse is normalized by `1 / (rows * cols)` so a forward then
//! inverse pass returns the input.
//!
//! In polar usage the second axis is azimuth, so spectral column `k` is
//! azimuthal wavenumber `k`.

use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use serde::Serialize;
use tracing::{debug, info};

use crate::core_types::{Field, Units};
use crate::error::{FieldError, SpectralError};

/// Row-major 2D array of complex values
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexGrid {
    rows: usize,
    cols: usize,
    data: Vec<Complex64>,
}

impl ComplexGrid {
    pub fn from_vec(rows: usize, cols: usize, data: Vec<Complex64>) -> Result<Self, SpectralError> {
        if data.len() != rows * cols {
            return Err(SpectralError::ShapeMismatch {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> Complex64 {
        self.data[r * self.cols + c]
    }

    /// Real part as a field with the given units
    pub fn real_part(&self, units: Units) -> Field {
        Field::from_parts(
            self.data.iter().map(|c| c.re).collect(),
            &[self.rows, self.cols],
            units,
        )
    }

    /// Copy with every column except `k` zeroed
    fn keep_column(&self, k: usize) -> ComplexGrid {
        let mut data = vec![Complex64::new(0.0, 0.0); self.data.len()];
        for r in 0..self.rows {
            data[r * self.cols + k] = self.data[r * self.cols + k];
        }
        ComplexGrid {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }
}

/// One real field per azimuthal wavenumber
///
/// Component `k` is the field that would remain if only wavenumber `k` were
/// present. Components are not cumulative.
#[derive(Debug, Clone, Serialize)]
pub struct WavenumberSpectrum {
    components: Vec<Field>,
}

impl WavenumberSpectrum {
    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, k: usize) -> Option<&Field> {
        self.components.get(k)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.components.iter()
    }

    /// NaN-ignoring maximum of each component
    pub fn maxima(&self) -> Vec<f64> {
        self.components.iter().map(Field::nan_max).collect()
    }

    /// Stack into a `[wavenumber, rows, cols]` field
    ///
    /// # Errors
    ///
    /// [`FieldError`] if the spectrum holds no components.
    pub fn to_field(&self) -> Result<Field, FieldError> {
        let units = self.components.first().map_or(Units::Dimensionless, Field::units);
        Field::stack(&self.components, units)
    }
}

fn transform(grid: &mut ComplexGrid, inverse: bool) {
    let (rows, cols) = (grid.rows, grid.cols);
    let mut planner = FftPlanner::<f64>::new();
    let (fft_rows, fft_cols) = if inverse {
        (planner.plan_fft_inverse(cols), planner.plan_fft_inverse(rows))
    } else {
        (planner.plan_fft_forward(cols), planner.plan_fft_forward(rows))
    };

    // Rows are contiguous
    for row in grid.data.chunks_exact_mut(cols) {
        fft_rows.process(row);
    }

    // Columns through a scratch buffer
    let mut column = vec![Complex64::new(0.0, 0.0); rows];
    for c in 0..cols {
        for r in 0..rows {
            column[r] = grid.data[r * cols + c];
        }
        fft_cols.process(&mut column);
        for r in 0..rows {
            grid.data[r * cols + c] = column[r];
        }
    }

    if inverse {
        let scale = 1.0 / (rows * cols) as f64;
        for v in &mut grid.data {
            *v *= scale;
        }
    }
}

/// Forward 2D DFT of a real field
///
/// # Errors
///
/// [`SpectralError::NotTwoDimensional`] unless the field is exactly 2D.
pub fn forward_fft2d(field: &Field) -> Result<ComplexGrid, SpectralError> {
    let (rows, cols) = field
        .dims2()
        .map_err(|_| SpectralError::NotTwoDimensional(field.shape().to_vec()))?;
    if rows == 0 || cols == 0 {
        return Err(SpectralError::Empty { rows, cols });
    }
    info!("Computing the 2-dimensional FFT for array of dimension ({rows}, {cols}).");

    let data = field.as_slice().iter().map(|&v| Complex64::new(v, 0.0)).collect();
    let mut grid = ComplexGrid::from_vec(rows, cols, data)?;
    transform(&mut grid, false);
    Ok(grid)
}

/// Inverse 2D DFT, normalized
pub fn inverse_fft2d(spectrum: &ComplexGrid) -> Result<ComplexGrid, SpectralError> {
    let (rows, cols) = (spectrum.rows, spectrum.cols);
    if rows == 0 || cols == 0 {
        return Err(SpectralError::Empty { rows, cols });
    }
    debug!("Computing the 2-dimensional inverse FFT for array of dimension ({rows}, {cols}).");

    let mut grid = spectrum.clone();
    transform(&mut grid, true);
    Ok(grid)
}

/// Reconstruct one real field per wavenumber `k` in `[0, max_wavenumber)`
///
/// Each component keeps spectral column `k` only, inverts, and takes the
/// real part. `max_wavenumber` beyond the number of columns is limited to
/// the column count.
pub fn reconstruct_by_wavenumber(
    spectrum: &ComplexGrid,
    max_wavenumber: usize,
    units: Units,
) -> Result<WavenumberSpectrum, SpectralError> {
    let count = max_wavenumber.min(spectrum.cols);
    let mut components = Vec::with_capacity(count);
    for k in 0..count {
        debug!("Computing the spectral reconstruction for wavenumber {k}.");
        let kept = spectrum.keep_column(k);
        components.push(inverse_fft2d(&kept)?.real_part(units));
    }
    Ok(WavenumberSpectrum { components })
}
