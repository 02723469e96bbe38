//! Unit-tagged n-dimensional field container
//!
//! Fields store values as a flat `Vec<f64>` in row-major order with an
//! explicit shape. A 2D horizontal field has shape `[ny, nx]`; a 3D field has
//! shape `[nlev, ny, nx]`. `NaN` marks missing or physically invalid cells.

use serde::{Deserialize, Serialize};

use super::units::Units;
use crate::error::FieldError;

/// Output metadata attached to a field for downstream serialization
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldMeta {
    /// Variable name in output files
    pub name: String,
    /// Long description
    pub description: String,
}

/// Row-major n-dimensional `f64` array with a unit tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    data: Vec<f64>,
    shape: Vec<usize>,
    units: Units,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    meta: Option<FieldMeta>,
}

impl Field {
    /// Create a field of the given shape filled with `value`
    pub fn filled(shape: &[usize], value: f64, units: Units) -> Self {
        Self {
            data: vec![value; shape.iter().product()],
            shape: shape.to_vec(),
            units,
            meta: None,
        }
    }

    /// Create a zero-initialized field
    pub fn zeros(shape: &[usize], units: Units) -> Self {
        Self::filled(shape, 0.0, units)
    }

    /// Wrap an existing buffer
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::ShapeMismatch`] if the buffer length is not the
    /// product of `shape`.
    pub fn from_vec(data: Vec<f64>, shape: &[usize], units: Units) -> Result<Self, FieldError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(FieldError::ShapeMismatch {
                shape: shape.to_vec(),
                len: data.len(),
                expected,
            });
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
            units,
            meta: None,
        })
    }

    /// Internal constructor for buffers whose length is known to match
    pub(crate) fn from_parts(data: Vec<f64>, shape: &[usize], units: Units) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>());
        Self {
            data,
            shape: shape.to_vec(),
            units,
            meta: None,
        }
    }

    /// Reinterpret the buffer with a new shape of the same size
    pub fn reshape(self, shape: &[usize]) -> Result<Self, FieldError> {
        let Field { data, units, meta, .. } = self;
        let mut out = Field::from_vec(data, shape, units)?;
        out.meta = meta;
        Ok(out)
    }

    /// Attach output metadata
    pub fn with_meta(mut self, name: &str, description: &str) -> Self {
        self.meta = Some(FieldMeta {
            name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn units(&self) -> Units {
        self.units
    }

    pub fn meta(&self) -> Option<&FieldMeta> {
        self.meta.as_ref()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// `(rows, cols)` of a 2D field, or a rank error
    pub fn dims2(&self) -> Result<(usize, usize), FieldError> {
        match self.shape.as_slice() {
            &[rows, cols] => Ok((rows, cols)),
            _ => Err(FieldError::Rank {
                expected: 2,
                shape: self.shape.clone(),
            }),
        }
    }

    /// `(levels, rows, cols)` of a 3D field, or a rank error
    pub fn dims3(&self) -> Result<(usize, usize, usize), FieldError> {
        match self.shape.as_slice() {
            &[levels, rows, cols] => Ok((levels, rows, cols)),
            _ => Err(FieldError::Rank {
                expected: 3,
                shape: self.shape.clone(),
            }),
        }
    }

    /// Value of a 2D field at row `j`, column `i`
    ///
    /// # Panics
    ///
    /// Panics if the field is not 2D or the index is out of bounds
    #[inline]
    pub fn get2(&self, j: usize, i: usize) -> f64 {
        assert!(
            self.shape.len() == 2 && j < self.shape[0] && i < self.shape[1],
            "Coordinates out of bounds"
        );
        self.data[j * self.shape[1] + i]
    }

    /// Set a value of a 2D field
    ///
    /// # Panics
    ///
    /// Panics if the field is not 2D or the index is out of bounds
    #[inline]
    pub fn set2(&mut self, j: usize, i: usize, value: f64) {
        assert!(
            self.shape.len() == 2 && j < self.shape[0] && i < self.shape[1],
            "Coordinates out of bounds"
        );
        let cols = self.shape[1];
        self.data[j * cols + i] = value;
    }

    /// Copy one level of a 3D field out as a 2D field
    pub fn level(&self, k: usize) -> Result<Field, FieldError> {
        let (levels, rows, cols) = self.dims3()?;
        if k >= levels {
            return Err(FieldError::LevelOutOfRange {
                level: k,
                shape: self.shape.clone(),
            });
        }
        let n = rows * cols;
        Ok(Field {
            data: self.data[k * n..(k + 1) * n].to_vec(),
            shape: vec![rows, cols],
            units: self.units,
            meta: None,
        })
    }

    /// Stack equally shaped 2D fields into a 3D field
    pub fn stack(levels: &[Field], units: Units) -> Result<Field, FieldError> {
        let Some(first) = levels.first() else {
            return Err(FieldError::Rank {
                expected: 3,
                shape: vec![0],
            });
        };
        let (rows, cols) = first.dims2()?;
        let mut data = Vec::with_capacity(levels.len() * rows * cols);
        for level in levels {
            if level.shape() != first.shape() {
                return Err(FieldError::ShapeMismatch {
                    shape: first.shape.clone(),
                    len: level.len(),
                    expected: first.len(),
                });
            }
            data.extend_from_slice(level.as_slice());
        }
        Field::from_vec(data, &[levels.len(), rows, cols], units)
    }

    /// Apply `f` element-wise, producing a new field with `units`
    pub fn map(&self, units: Units, f: impl Fn(f64) -> f64) -> Field {
        Field {
            data: self.data.iter().map(|&v| f(v)).collect(),
            shape: self.shape.clone(),
            units,
            meta: None,
        }
    }

    /// Copy expressed in `target` units
    ///
    /// Supports pressure (Pa, hPa) and temperature (K, °C) rescaling; any
    /// other pair must already match.
    pub fn convert(&self, target: Units) -> Result<Field, FieldError> {
        let f: fn(f64) -> f64 = match (self.units, target) {
            (from, to) if from == to => return Ok(self.clone()),
            (Units::Pascals, Units::Hectopascals) => |v| v / 100.0,
            (Units::Hectopascals, Units::Pascals) => |v| v * 100.0,
            (Units::Kelvin, Units::Celsius) => |v| v - 273.15,
            (Units::Celsius, Units::Kelvin) => |v| v + 273.15,
            (from, to) => return Err(FieldError::IncompatibleUnits { from, to }),
        };
        let mut out = self.map(target, f);
        out.meta.clone_from(&self.meta);
        Ok(out)
    }

    /// Maximum ignoring `NaN`; `NaN` if every value is missing
    pub fn nan_max(&self) -> f64 {
        nan_max(&self.data)
    }

    /// Number of `NaN` cells
    pub fn nan_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

/// Maximum of a slice ignoring `NaN`
pub fn nan_max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NAN, |acc, v| if acc.is_nan() || v > acc { v } else { acc })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_creation() {
        let field = Field::zeros(&[20, 10], Units::MetersPerSecond);
        assert_eq!(field.shape(), &[20, 10]);
        assert_eq!(field.len(), 200);
        assert_eq!(field.units(), Units::MetersPerSecond);
        assert!(field.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_from_vec_rejects_bad_length() {
        let err = Field::from_vec(vec![1.0; 5], &[2, 3], Units::Dimensionless).unwrap_err();
        assert_eq!(
            err,
            FieldError::ShapeMismatch {
                shape: vec![2, 3],
                len: 5,
                expected: 6
            }
        );
    }

    #[test]
    fn test_get_set_row_major() {
        let mut field = Field::zeros(&[10, 10], Units::Dimensionless);
        field.set2(4, 3, 123.45);
        assert_eq!(field.get2(4, 3), 123.45);
        assert_eq!(field.as_slice()[4 * 10 + 3], 123.45);
    }

    #[test]
    #[should_panic(expected = "Coordinates out of bounds")]
    fn test_bounds_check() {
        let field = Field::zeros(&[3, 3], Units::Dimensionless);
        let _ = field.get2(3, 0);
    }

    #[test]
    fn test_level_and_stack() {
        let data: Vec<f64> = (0..24).map(f64::from).collect();
        let field = Field::from_vec(data, &[2, 3, 4], Units::Kelvin).unwrap();
        let upper = field.level(1).unwrap();
        assert_eq!(upper.shape(), &[3, 4]);
        assert_eq!(upper.get2(0, 0), 12.0);
        assert!(field.level(2).is_err());

        let flat = upper.clone().reshape(&[12]).unwrap();
        assert_eq!(flat.shape(), &[12]);
        assert!(upper.clone().reshape(&[5, 2]).is_err());

        let restacked = Field::stack(&[field.level(0).unwrap(), upper], Units::Kelvin).unwrap();
        assert_eq!(restacked, field);
    }

    #[test]
    fn test_nan_max() {
        assert_eq!(nan_max(&[1.0, f64::NAN, 3.0, 2.0]), 3.0);
        assert!(nan_max(&[f64::NAN, f64::NAN]).is_nan());
        assert!(nan_max(&[]).is_nan());
    }

    #[test]
    fn test_convert_units() {
        let p = Field::from_vec(vec![101_200.0, 85_000.0], &[2], Units::Pascals).unwrap();
        let hpa = p.convert(Units::Hectopascals).unwrap();
        assert_eq!(hpa.as_slice(), &[1012.0, 850.0]);
        assert_eq!(hpa.units(), Units::Hectopascals);

        let t = Field::filled(&[1], 300.0, Units::Kelvin).with_meta("t", "Temperature");
        let c = t.convert(Units::Celsius).unwrap();
        assert!((c.as_slice()[0] - 26.85).abs() < 1e-12);
        assert_eq!(c.meta().map(|m| m.name.as_str()), Some("t"));

        assert_eq!(
            t.convert(Units::Meters).unwrap_err(),
            FieldError::IncompatibleUnits {
                from: Units::Kelvin,
                to: Units::Meters
            }
        );
    }

    #[test]
    fn test_rank_errors() {
        let field = Field::zeros(&[4], Units::Dimensionless);
        assert!(field.dims2().is_err());
        assert!(field.dims3().is_err());
    }
}
