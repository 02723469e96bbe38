//! Column-wise vertical interpolation
//!
//! Interpolates `[level, lat, lon]` fields to target values of a matching
//! vertical coordinate field (pressure or height), linearly between the two
//! bracketing levels. Columns may be ordered either way.

use rayon::prelude::*;
use tracing::debug;

use crate::core_types::Field;
use crate::error::VerticalInterpolationError;

/// What to return for a target outside the column's coordinate range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutOfRange {
    Missing,
    NearestEnd,
}

fn interp_column(values: &[f64], coord: &[f64], target: f64, out_of_range: OutOfRange) -> f64 {
    for k in 0..coord.len().saturating_sub(1) {
        let (c0, c1) = (coord[k], coord[k + 1]);
        if c0.is_nan() || c1.is_nan() {
            continue;
        }
        let (lo, hi) = if c0 <= c1 { (c0, c1) } else { (c1, c0) };
        if target >= lo && target <= hi {
            if c1 == c0 {
                return values[k];
            }
            let w = (target - c0) / (c1 - c0);
            return values[k] + w * (values[k + 1] - values[k]);
        }
    }

    match out_of_range {
        OutOfRange::Missing => f64::NAN,
        OutOfRange::NearestEnd => {
            // Value at whichever valid level is closest to the target
            coord
                .iter()
                .zip(values)
                .filter(|(c, _)| !c.is_nan())
                .min_by(|(a, _), (b, _)| (*a - target).abs().total_cmp(&(*b - target).abs()))
                .map_or(f64::NAN, |(_, &v)| v)
        }
    }
}

fn interpolate(
    field: &Field,
    coord: &Field,
    targets: &[f64],
    out_of_range: OutOfRange,
) -> Result<Field, VerticalInterpolationError> {
    if targets.is_empty() {
        return Err(VerticalInterpolationError::NoLevels);
    }
    let (nlev, ny, nx) = field
        .dims3()
        .map_err(|_| VerticalInterpolationError::NotThreeDimensional(field.shape().to_vec()))?;
    if coord.shape() != field.shape() {
        return Err(VerticalInterpolationError::ShapeMismatch {
            field: field.shape().to_vec(),
            coord: coord.shape().to_vec(),
        });
    }
    debug!("Interpolating {nlev}-level field to {} target levels.", targets.len());

    let ncol = ny * nx;
    let (values, coords) = (field.as_slice(), coord.as_slice());
    let columns: Vec<Vec<f64>> = (0..ncol)
        .into_par_iter()
        .map(|col| {
            let v: Vec<f64> = (0..nlev).map(|k| values[k * ncol + col]).collect();
            let c: Vec<f64> = (0..nlev).map(|k| coords[k * ncol + col]).collect();
            targets
                .iter()
                .map(|&t| interp_column(&v, &c, t, out_of_range))
                .collect()
        })
        .collect();

    let mut out = vec![f64::NAN; targets.len() * ncol];
    for (col, column) in columns.iter().enumerate() {
        for (t, &v) in column.iter().enumerate() {
            out[t * ncol + col] = v;
        }
    }
    Ok(Field::from_parts(out, &[targets.len(), ny, nx], field.units()))
}

/// Interpolate to each target level; targets outside a column are `NaN`
///
/// Returns a `[targets, lat, lon]` field.
pub fn interp_to_levels(
    field: &Field,
    coord: &Field,
    levels: &[f64],
) -> Result<Field, VerticalInterpolationError> {
    interpolate(field, coord, levels, OutOfRange::Missing)
}

/// Interpolate to one target level, using the nearest level's value where
/// the target lies outside the column
///
/// Used for 10 m winds, where the target is usually below the lowest model
/// level. Returns a `[lat, lon]` field.
pub fn interp_to_level_or_lowest(
    field: &Field,
    coord: &Field,
    level: f64,
) -> Result<Field, VerticalInterpolationError> {
    let out = interpolate(field, coord, &[level], OutOfRange::NearestEnd)?;
    let (_, ny, nx) = field
        .dims3()
        .map_err(|_| VerticalInterpolationError::NotThreeDimensional(field.shape().to_vec()))?;
    Ok(Field::from_parts(out.into_vec(), &[ny, nx], field.units()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Units;
    use approx::assert_abs_diff_eq;

    /// Three levels over a 1x2 grid; pressure decreasing upward
    fn sounding() -> (Field, Field) {
        let temp = Field::from_vec(
            vec![300.0, 298.0, 290.0, 288.0, 250.0, 240.0],
            &[3, 1, 2],
            Units::Kelvin,
        )
        .unwrap();
        let pres = Field::from_vec(
            vec![1000.0, 1000.0, 850.0, 850.0, 500.0, 500.0],
            &[3, 1, 2],
            Units::Hectopascals,
        )
        .unwrap();
        (temp, pres)
    }

    #[test]
    fn test_linear_between_levels() {
        let (temp, pres) = sounding();
        let out = interp_to_levels(&temp, &pres, &[925.0, 850.0, 675.0]).unwrap();
        assert_eq!(out.shape(), &[3, 1, 2]);
        assert_eq!(out.units(), Units::Kelvin);
        assert_abs_diff_eq!(out.as_slice()[0], 295.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.as_slice()[1], 293.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.as_slice()[2], 290.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.as_slice()[4], 270.0, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_range_is_nan() {
        let (temp, pres) = sounding();
        let out = interp_to_levels(&temp, &pres, &[1050.0, 100.0]).unwrap();
        assert!(out.as_slice().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_increasing_coordinate() {
        let wind = Field::from_vec(vec![5.0, 10.0, 20.0], &[3, 1, 1], Units::MetersPerSecond).unwrap();
        let height = Field::from_vec(vec![10.0, 100.0, 1000.0], &[3, 1, 1], Units::Meters).unwrap();
        let out = interp_to_levels(&wind, &height, &[55.0]).unwrap();
        assert_abs_diff_eq!(out.as_slice()[0], 7.5, epsilon = 1e-12);
    }

    #[test]
    fn test_below_lowest_level_uses_lowest() {
        let wind = Field::from_vec(vec![12.0, 15.0, 20.0], &[3, 1, 1], Units::MetersPerSecond).unwrap();
        let height = Field::from_vec(vec![40.0, 300.0, 1000.0], &[3, 1, 1], Units::Meters).unwrap();
        let out = interp_to_level_or_lowest(&wind, &height, 10.0).unwrap();
        assert_eq!(out.shape(), &[1, 1]);
        assert_eq!(out.as_slice()[0], 12.0);
    }

    #[test]
    fn test_errors() {
        let (temp, pres) = sounding();
        assert_eq!(
            interp_to_levels(&temp, &pres, &[]).unwrap_err(),
            VerticalInterpolationError::NoLevels
        );
        let flat = Field::zeros(&[1, 2], Units::Kelvin);
        assert!(matches!(
            interp_to_levels(&flat, &flat, &[1.0]),
            Err(VerticalInterpolationError::NotThreeDimensional(_))
        ));
        let other = Field::zeros(&[2, 1, 2], Units::Hectopascals);
        assert!(matches!(
            interp_to_levels(&temp, &other, &[900.0]),
            Err(VerticalInterpolationError::ShapeMismatch { .. })
        ));
    }
}
