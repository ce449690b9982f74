// crates/universality-align/src/testing.rs
//
// Seeded synthetic data for unit tests.

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// `rows x cols` matrix of independent standard normal draws.
pub fn gaussian(rng: &mut ChaCha8Rng, rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| {
        let v: f64 = StandardNormal.sample(&mut *rng);
        v
    })
}

/// Random orthogonal `dim x dim` matrix (Q factor of a Gaussian matrix).
pub fn random_orthogonal(rng: &mut ChaCha8Rng, dim: usize) -> DMatrix<f64> {
    gaussian(rng, dim, dim).qr().q()
}

pub fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "expected {} ~ {} (tol {})", a, b, tol);
}
