// crates/universality-cli/src/testing.rs
//
// Fixtures for tests: small word2vec files related by a random rotation.

use std::path::Path;

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use universality_core::{save_word2vec, VectorSpace};

fn gaussian(rng: &mut ChaCha8Rng, rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| {
        let v: f64 = StandardNormal.sample(&mut *rng);
        v
    })
}

/// Write `a.emb` and `b.emb` into `dir`: `n` shared tokens, `b = a * Q` plus
/// a little noise for a random orthogonal `Q`.
pub fn write_rotated_pair(dir: &Path, n: usize, d: usize, seed: u64) {
    write_rotated_files(dir, &["a.emb", "b.emb"], n, d, seed);
}

/// Write one rotated copy of a common latent space per file name.
pub fn write_rotated_files(dir: &Path, files: &[&str], n: usize, d: usize, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let latent = gaussian(&mut rng, n, d);
    let tokens: Vec<String> = (0..n).map(|i| format!("w{}", i)).collect();
    for (k, file) in files.iter().enumerate() {
        let vectors = if k == 0 {
            latent.clone()
        } else {
            let q = gaussian(&mut rng, d, d).qr().q();
            &latent * q + gaussian(&mut rng, n, d) * 1e-3
        };
        let space = VectorSpace::new(file, tokens.clone(), vectors).unwrap();
        save_word2vec(&space, &dir.join(file)).unwrap();
    }
}
