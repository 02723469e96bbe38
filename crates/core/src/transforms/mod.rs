//! Spectral and linear-algebra transforms on 2D fields

pub mod fft;
pub mod svd;

pub use fft::{forward_fft2d, inverse_fft2d, reconstruct_by_wavenumber, ComplexGrid, WavenumberSpectrum};
pub use svd::{decompose, rebuild, reconstruct, SvdParts};
