//! Wind diagnostics: magnitude and global Helmholtz partition
//!
//! The partition follows Lynch (1988): relative vorticity and divergence
//! are inverted for the streamfunction and velocity potential, which give
//! the rotational and divergent winds; whatever is left over is the
//! harmonic wind.
//!
//! [`SphericalPoissonPartitioner`] discretizes on the regular lat/lon grid
//! itself. Longitude is handled spectrally (FFT per latitude row), latitude
//! by a conservative finite-volume stencil, so each zonal wavenumber is a
//! tridiagonal solve. Pole rows are single points in the solve and carry
//! the cap-averaged vorticity and divergence from the adjacent ring.

use rayon::prelude::*;
use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use serde::Serialize;
use std::f64::consts::PI;
use tracing::{debug, info};

use crate::core_types::{Field, Grid, Units};
use crate::error::{FieldError, WindPartitionError};
use crate::geomets::EARTH_RADIUS;

/// `cos(phi)` below this is treated as a pole row
const POLE_COS_THRESHOLD: f64 = 1.0e-9;

/// Wind speed `sqrt(u^2 + v^2)`; `NaN` where either component is missing
pub fn wind_magnitude(u: &Field, v: &Field) -> Result<Field, FieldError> {
    if u.shape() != v.shape() {
        return Err(FieldError::ShapeMismatch {
            shape: u.shape().to_vec(),
            len: v.len(),
            expected: u.len(),
        });
    }
    let data = u
        .as_slice()
        .iter()
        .zip(v.as_slice())
        .map(|(a, b)| a.hypot(*b))
        .collect();
    Ok(Field::from_parts(data, u.shape(), Units::MetersPerSecond))
}

/// Rotational, divergent, and harmonic wind components with their
/// potentials
#[derive(Debug, Clone, Serialize)]
pub struct WindPartition {
    pub vort: Field,
    pub divg: Field,
    pub psi: Field,
    pub chi: Field,
    pub urot: Field,
    pub vrot: Field,
    pub udiv: Field,
    pub vdiv: Field,
    pub uhrm: Field,
    pub vhrm: Field,
}

/// Global wind partition backend
pub trait WindPartitioner {
    /// Partition `u`/`v` (2D `[lat, lon]` or 3D `[level, lat, lon]`) on a
    /// global `grid`
    fn partition(&self, u: &Field, v: &Field, grid: &Grid) -> Result<WindPartition, WindPartitionError>;
}

/// Finite-volume / spectral Poisson partition on the sphere
#[derive(Debug, Clone, Copy)]
pub struct SphericalPoissonPartitioner {
    radius: f64,
}

impl Default for SphericalPoissonPartitioner {
    fn default() -> Self {
        Self {
            radius: EARTH_RADIUS,
        }
    }
}

/// Latitude geometry of the working (ascending, non-duplicated) grid
struct Sphere {
    phi: Vec<f64>,
    cos_phi: Vec<f64>,
    /// Cell-edge latitudes, clamped to the poles (ny + 1)
    half: Vec<f64>,
    /// `sin(half[j+1]) - sin(half[j])`
    weights: Vec<f64>,
    nx: usize,
    dlambda: f64,
    radius: f64,
}

impl Sphere {
    fn new(lats_ascending: &[f64], nx: usize, radius: f64) -> Self {
        let ny = lats_ascending.len();
        let phi: Vec<f64> = lats_ascending.iter().map(|l| l.to_radians()).collect();
        let half: Vec<f64> = (0..=ny)
            .map(|j| {
                let h = if j == 0 {
                    phi[0] - (phi[1] - phi[0]) / 2.0
                } else if j == ny {
                    phi[ny - 1] + (phi[ny - 1] - phi[ny - 2]) / 2.0
                } else {
                    (phi[j - 1] + phi[j]) / 2.0
                };
                h.clamp(-PI / 2.0, PI / 2.0)
            })
            .collect();
        let weights = (0..ny).map(|j| half[j + 1].sin() - half[j].sin()).collect();
        Self {
            cos_phi: phi.iter().map(|p| p.cos()).collect(),
            phi,
            half,
            weights,
            nx,
            dlambda: 2.0 * PI / nx as f64,
            radius,
        }
    }

    #[inline]
    fn ny(&self) -> usize {
        self.phi.len()
    }

    #[inline]
    fn is_pole(&self, j: usize) -> bool {
        self.cos_phi[j] < POLE_COS_THRESHOLD
    }

    /// Area-weighted mean of a `[ny, nx]` field
    fn area_mean(&self, f: &[f64]) -> f64 {
        let nx = self.nx;
        let total: f64 = (0..self.ny())
            .map(|j| self.weights[j] * f[j * nx..(j + 1) * nx].iter().sum::<f64>() / nx as f64)
            .sum();
        total / self.weights.iter().sum::<f64>()
    }

    /// Relative vorticity and divergence
    fn vort_div(&self, u: &[f64], v: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let (ny, nx, a, dl) = (self.ny(), self.nx, self.radius, self.dlambda);
        let mut vort = vec![0.0; ny * nx];
        let mut divg = vec![0.0; ny * nx];

        for j in 0..ny {
            if self.is_pole(j) {
                // Circulation and outflow around the adjacent ring over the
                // polar cap area
                let jn = if j == 0 { 1 } else { ny - 2 };
                let area = 2.0 * PI * a * a * (self.phi[j].sin() - self.phi[jn].sin()).abs();
                let ring = a * self.cos_phi[jn] * dl;
                let circulation: f64 = u[jn * nx..(jn + 1) * nx].iter().sum::<f64>() * ring;
                let outflow: f64 = v[jn * nx..(jn + 1) * nx].iter().sum::<f64>() * ring;
                let (z, d) = if self.phi[j] > 0.0 {
                    (circulation / area, -outflow / area)
                } else {
                    (-circulation / area, outflow / area)
                };
                vort[j * nx..(j + 1) * nx].fill(z);
                divg[j * nx..(j + 1) * nx].fill(d);
                continue;
            }

            let (jp, jm) = ((j + 1).min(ny - 1), j.saturating_sub(1));
            let dphi = self.phi[jp] - self.phi[jm];
            let metric = a * self.cos_phi[j];
            for i in 0..nx {
                let (ip, im) = ((i + 1) % nx, (i + nx - 1) % nx);
                let dv_dl = (v[j * nx + ip] - v[j * nx + im]) / (2.0 * dl);
                let du_dl = (u[j * nx + ip] - u[j * nx + im]) / (2.0 * dl);
                let du_cos = (u[jp * nx + i] * self.cos_phi[jp] - u[jm * nx + i] * self.cos_phi[jm]) / dphi;
                let dv_cos = (v[jp * nx + i] * self.cos_phi[jp] - v[jm * nx + i] * self.cos_phi[jm]) / dphi;
                vort[j * nx + i] = (dv_dl - du_cos) / metric;
                divg[j * nx + i] = (du_dl + dv_cos) / metric;
            }
        }
        (vort, divg)
    }

    /// Solve `laplacian(x) = rhs` for a zero-mean `x`
    fn invert_laplacian(&self, rhs: &[f64], planner: &mut FftPlanner<f64>) -> Vec<f64> {
        let (ny, nx) = (self.ny(), self.nx);
        let a2 = self.radius * self.radius;
        let forward = planner.plan_fft_forward(nx);
        let inverse = planner.plan_fft_inverse(nx);

        // The Laplacian has no mean component; drop it from the forcing
        let mean = self.area_mean(rhs);
        let mut spectra: Vec<Complex64> = rhs.iter().map(|&r| Complex64::new(r - mean, 0.0)).collect();
        for row in spectra.chunks_exact_mut(nx) {
            forward.process(row);
        }

        let mut solution = vec![Complex64::new(0.0, 0.0); ny * nx];
        let (mut lower, mut diag, mut upper) = (vec![0.0; ny], vec![0.0; ny], vec![0.0; ny]);
        let mut forcing = vec![Complex64::new(0.0, 0.0); ny];

        for m in 0..nx {
            let lambda = (2.0 - 2.0 * (2.0 * PI * m as f64 / nx as f64).cos()) / (self.dlambda * self.dlambda);
            for j in 0..ny {
                if self.is_pole(j) && m != 0 {
                    // Only the zonal mean is defined at a pole
                    lower[j] = 0.0;
                    diag[j] = 1.0;
                    upper[j] = 0.0;
                    forcing[j] = Complex64::new(0.0, 0.0);
                    continue;
                }
                let north = if j + 1 < ny {
                    self.half[j + 1].cos() / (self.phi[j + 1] - self.phi[j])
                } else {
                    0.0
                };
                let south = if j > 0 {
                    self.half[j].cos() / (self.phi[j] - self.phi[j - 1])
                } else {
                    0.0
                };
                let scale = a2 * self.weights[j];
                lower[j] = south / scale;
                upper[j] = north / scale;
                diag[j] = -(south + north) / scale;
                if !self.is_pole(j) {
                    diag[j] -= lambda / (a2 * self.cos_phi[j] * self.cos_phi[j]);
                }
                forcing[j] = spectra[j * nx + m];
            }
            if m == 0 {
                // Pin the otherwise free constant
                lower[0] = 0.0;
                diag[0] = 1.0;
                upper[0] = 0.0;
                forcing[0] = Complex64::new(0.0, 0.0);
            }
            let x = solve_tridiagonal(&lower, &diag, &upper, &forcing);
            for j in 0..ny {
                solution[j * nx + m] = x[j];
            }
        }

        for row in solution.chunks_exact_mut(nx) {
            inverse.process(row);
        }
        let mut out: Vec<f64> = solution.iter().map(|c| c.re / nx as f64).collect();
        let mean = self.area_mean(&out);
        for x in &mut out {
            *x -= mean;
        }
        out
    }

    /// `(df/(a dphi), df/(a cos(phi) dlambda))`, the latter zero at poles
    fn gradients(&self, f: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let (ny, nx, a, dl) = (self.ny(), self.nx, self.radius, self.dlambda);
        let mut d_phi = vec![0.0; ny * nx];
        let mut d_lambda = vec![0.0; ny * nx];
        for j in 0..ny {
            let (jp, jm) = ((j + 1).min(ny - 1), j.saturating_sub(1));
            let dphi = a * (self.phi[jp] - self.phi[jm]);
            let pole = self.is_pole(j);
            for i in 0..nx {
                d_phi[j * nx + i] = (f[jp * nx + i] - f[jm * nx + i]) / dphi;
                if !pole {
                    let (ip, im) = ((i + 1) % nx, (i + nx - 1) % nx);
                    d_lambda[j * nx + i] =
                        (f[j * nx + ip] - f[j * nx + im]) / (2.0 * dl * a * self.cos_phi[j]);
                }
            }
        }
        (d_phi, d_lambda)
    }
}

/// Thomas algorithm with real coefficients and complex forcing
fn solve_tridiagonal(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[Complex64]) -> Vec<Complex64> {
    let n = rhs.len();
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![Complex64::new(0.0, 0.0); n];
    c_prime[0] = upper[0] / diag[0];
    d_prime[0] = rhs[0] / diag[0];
    for i in 1..n {
        let m = diag[i] - lower[i] * c_prime[i - 1];
        c_prime[i] = if i + 1 < n { upper[i] / m } else { 0.0 };
        d_prime[i] = (rhs[i] - d_prime[i - 1] * lower[i]) / m;
    }
    let mut x = vec![Complex64::new(0.0, 0.0); n];
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - x[i + 1] * c_prime[i];
    }
    x
}

/// Working-layout description of the input grid
struct Layout {
    ny: usize,
    /// Columns in the input (including a duplicated 360° column)
    nx_in: usize,
    /// Columns used by the solver
    nx: usize,
    descending: bool,
}

impl Layout {
    /// Input `[ny, nx_in]` level to ascending, non-duplicated `[ny, nx]`
    fn to_working(&self, level: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.ny * self.nx);
        for j in 0..self.ny {
            let src = if self.descending { self.ny - 1 - j } else { j };
            out.extend_from_slice(&level[src * self.nx_in..src * self.nx_in + self.nx]);
        }
        out
    }

    /// Inverse of [`Layout::to_working`], copying column 0 into a
    /// duplicated endpoint
    fn from_working(&self, work: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.ny * self.nx_in];
        for j in 0..self.ny {
            let dst = if self.descending { self.ny - 1 - j } else { j };
            let row = &work[j * self.nx..(j + 1) * self.nx];
            out[dst * self.nx_in..dst * self.nx_in + self.nx].copy_from_slice(row);
            if self.nx_in > self.nx {
                out[dst * self.nx_in + self.nx] = row[0];
            }
        }
        out
    }
}

/// One level's outputs in input layout, in [`WindPartition`] field order
type LevelOutputs = [Vec<f64>; 10];

impl SphericalPoissonPartitioner {
    fn partition_level(&self, layout: &Layout, sphere: &Sphere, u: &[f64], v: &[f64]) -> LevelOutputs {
        let missing: Vec<bool> = u.iter().zip(v).map(|(a, b)| a.is_nan() || b.is_nan()).collect();
        let fill = |x: &[f64]| -> Vec<f64> {
            let filled: Vec<f64> = x.iter().map(|&x| if x.is_nan() { 0.0 } else { x }).collect();
            layout.to_working(&filled)
        };
        let (uw, vw) = (fill(u), fill(v));

        let (vort, divg) = sphere.vort_div(&uw, &vw);
        let mut planner = FftPlanner::new();
        let psi = sphere.invert_laplacian(&vort, &mut planner);
        let chi = sphere.invert_laplacian(&divg, &mut planner);

        let (dpsi_dphi, dpsi_dlambda) = sphere.gradients(&psi);
        let (dchi_dphi, dchi_dlambda) = sphere.gradients(&chi);
        let urot: Vec<f64> = dpsi_dphi.iter().map(|d| -d).collect();
        let vrot = dpsi_dlambda;
        let udiv = dchi_dlambda;
        let vdiv = dchi_dphi;
        let uhrm: Vec<f64> = (0..uw.len()).map(|k| uw[k] - urot[k] - udiv[k]).collect();
        let vhrm: Vec<f64> = (0..vw.len()).map(|k| vw[k] - vrot[k] - vdiv[k]).collect();

        [vort, divg, psi, chi, urot, vrot, udiv, vdiv, uhrm, vhrm].map(|work| {
            let mut out = layout.from_working(&work);
            for (x, &m) in out.iter_mut().zip(&missing) {
                if m {
                    *x = f64::NAN;
                }
            }
            out
        })
    }
}

impl WindPartitioner for SphericalPoissonPartitioner {
    fn partition(&self, u: &Field, v: &Field, grid: &Grid) -> Result<WindPartition, WindPartitionError> {
        if u.shape() != v.shape() {
            return Err(WindPartitionError::ComponentMismatch {
                u: u.shape().to_vec(),
                v: v.shape().to_vec(),
            });
        }
        let (nlev, ny, nx_in) = match *u.shape() {
            [ny, nx] => (1, ny, nx),
            [nlev, ny, nx] => (nlev, ny, nx),
            _ => return Err(WindPartitionError::Rank(u.shape().to_vec())),
        };
        if [ny, nx_in] != grid.shape() {
            return Err(WindPartitionError::GridMismatch {
                wind: vec![ny, nx_in],
                grid: grid.shape().to_vec(),
            });
        }
        if !grid.is_global() || ny < 3 {
            return Err(WindPartitionError::NotGlobal(format!(
                "{} latitudes from {} to {}, {} longitudes",
                ny,
                grid.lats()[0],
                grid.lats()[ny - 1],
                nx_in
            )));
        }
        let duplicated = grid.periodic_longitude() == Some(true);
        let layout = Layout {
            ny,
            nx_in,
            nx: if duplicated { nx_in - 1 } else { nx_in },
            descending: grid.lats()[1] < grid.lats()[0],
        };
        let mut lats: Vec<f64> = grid.lats().to_vec();
        if layout.descending {
            lats.reverse();
        }
        let sphere = Sphere::new(&lats, layout.nx, self.radius);
        info!("Partitioning {nlev}-level wind on a {ny}x{nx_in} global grid.");

        let n = ny * nx_in;
        let levels: Vec<LevelOutputs> = (0..nlev)
            .into_par_iter()
            .map(|k| {
                debug!("Partitioning wind level {k}.");
                let range = k * n..(k + 1) * n;
                self.partition_level(&layout, &sphere, &u.as_slice()[range.clone()], &v.as_slice()[range])
            })
            .collect();

        let shape = u.shape();
        let assemble = |idx: usize, units: Units, name: &str, description: &str| -> Field {
            let data: Vec<f64> = levels.iter().flat_map(|lvl| lvl[idx].iter().copied()).collect();
            Field::from_parts(data, shape, units).with_meta(name, description)
        };

        Ok(WindPartition {
            vort: assemble(0, Units::PerSecond, "vort", "Relative vorticity"),
            divg: assemble(1, Units::PerSecond, "divg", "Divergence"),
            psi: assemble(2, Units::SquareMetersPerSecond, "psi", "Streamfunction"),
            chi: assemble(3, Units::SquareMetersPerSecond, "chi", "Velocity potential"),
            urot: assemble(4, Units::MetersPerSecond, "urot", "Rotational zonal wind"),
            vrot: assemble(5, Units::MetersPerSecond, "vrot", "Rotational meridional wind"),
            udiv: assemble(6, Units::MetersPerSecond, "udiv", "Divergent zonal wind"),
            vdiv: assemble(7, Units::MetersPerSecond, "vdiv", "Divergent meridional wind"),
            uhrm: assemble(8, Units::MetersPerSecond, "uhrm", "Harmonic zonal wind"),
            vhrm: assemble(9, Units::MetersPerSecond, "vhrm", "Harmonic meridional wind"),
        })
    }
}
