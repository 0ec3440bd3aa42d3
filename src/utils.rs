extern crate nalgebra as na;
use std::error::Error;
use std::fmt;

use rand::prelude::*;
use rand_distr::StandardNormal;

#[cfg(any(feature = "accelerate", feature = "openblas", feature = "netlib"))]
use nalgebra_lapack::Cholesky;

use crate::config::ConfigError;

/// Epsilon floor applied to residual reference norms so that relative
/// tolerances never divide by a zero-norm reference.
pub const EPS_DIV: f32 = 1e-8;

/// Error type for solver construction and execution.
///
/// `Config` errors surface invalid option sets, `Dimension` errors surface
/// mismatched array shapes at construction time, and `Numerical` errors
/// surface failed factorizations. A non-converged solve is not an error;
/// callers distinguish it by comparing the final iteration count against
/// `MaxMainIter`.
#[derive(Debug)]
pub enum SolverError {
    /// Invalid configuration key or value.
    Config(ConfigError),
    /// Mismatched array shapes between problem inputs.
    Dimension {
        what: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Failed numerical operation (e.g. a factorization of a singular system).
    Numerical(String),
    /// Failed I/O during an export operation (e.g. writing a timing CSV).
    Io(std::io::Error),
}

impl SolverError {
    pub fn numerical(message: String) -> Self {
        SolverError::Numerical(message)
    }

    pub fn dimension(what: &str, expected: (usize, usize), actual: (usize, usize)) -> Self {
        SolverError::Dimension {
            what: what.to_string(),
            expected,
            actual,
        }
    }
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SolverError::Config(e) => write!(f, "{}", e),
            SolverError::Dimension {
                what,
                expected,
                actual,
            } => write!(
                f,
                "dimension mismatch for {}: expected {}x{}, got {}x{}",
                what, expected.0, expected.1, actual.0, actual.1
            ),
            SolverError::Numerical(message) => write!(f, "{}", message),
            SolverError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl Error for SolverError {}

impl From<ConfigError> for SolverError {
    fn from(e: ConfigError) -> Self {
        SolverError::Config(e)
    }
}

impl From<std::io::Error> for SolverError {
    fn from(e: std::io::Error) -> Self {
        SolverError::Io(e)
    }
}

/// Soft thresholding operation for L1 regularization.
/// Computes sign(v) * max(|v| - threshold, 0) elementwise.
pub fn soft_threshold(v: &na::DMatrix<f32>, threshold: f32) -> na::DMatrix<f32> {
    v.map(|x| x.signum() * (x.abs() - threshold).max(0.0))
}

/// Efficiently computes the inverse of (A^T A + rho * I).
///
/// This is the factorization at the heart of the quadratic primal updates in
/// both the sparse coding and the dictionary update problems. It chooses
/// between two approaches based on the matrix dimensions:
///
/// 1. Sherman-Morrison-Woodbury formula for "fat" matrices (m < n/2),
///    avoiding the n x n Gram matrix
/// 2. Cholesky decomposition otherwise
///    - Uses LAPACK's optimized Cholesky when any LAPACK backend feature is
///      enabled (accelerate, openblas, or netlib)
///    - Falls back to nalgebra's built-in Cholesky when no LAPACK backend
///      is available
///
/// # Arguments
///
/// * `a` - The matrix A (m x n)
/// * `rho` - The augmented Lagrangian penalty parameter
///
/// # Returns
///
/// The inverse matrix (A^T A + rho * I)^(-1), or a `SolverError::Numerical`
/// if the system cannot be factorized.
pub fn factored_inverse(
    a: &na::DMatrix<f32>,
    rho: f32,
) -> Result<na::DMatrix<f32>, SolverError> {
    let m = a.nrows();
    let n = a.ncols();

    let eye_n = na::DMatrix::<f32>::identity(n, n);

    if m < n / 2 {
        // For "fat" matrices, use Sherman-Morrison-Woodbury formula
        let rho_inv = 1.0 / rho;
        let eye_m = na::DMatrix::<f32>::identity(m, m);

        // I + A*A^T/rho
        let i_aat = a * a.transpose() * rho_inv + &eye_m;
        let i_aat_inv = i_aat.try_inverse().ok_or_else(|| {
            SolverError::numerical("Woodbury matrix inversion failed".to_string())
        })?;

        // (A^T A + rho*I)^-1 = rho^-1*I - rho^-2*A^T*(I + A A^T/rho)^-1*A
        Ok(eye_n * rho_inv - (a.transpose() * i_aat_inv * a) * (rho_inv * rho_inv))
    } else {
        let ata = a.transpose() * a + eye_n * rho;

        #[cfg(any(feature = "accelerate", feature = "openblas", feature = "netlib"))]
        {
            let l = Cholesky::new(ata).ok_or_else(|| {
                SolverError::numerical("Cholesky decomposition failed".to_string())
            })?;
            l.inverse().map_err(|_| {
                SolverError::numerical("Cholesky inverse failed".to_string())
            })
        }

        #[cfg(not(any(feature = "accelerate", feature = "openblas", feature = "netlib")))]
        {
            // Fallback to nalgebra's built-in cholesky when LAPACK is not available
            let l = ata.cholesky().ok_or_else(|| {
                SolverError::numerical("Cholesky decomposition failed".to_string())
            })?;
            Ok(l.inverse())
        }
    }
}

/// Projects dictionary columns onto the unit-norm constraint set, optionally
/// removing each column's mean first. Zero-norm columns are left unchanged.
pub fn normalize_columns(d: &na::DMatrix<f32>, zero_mean: bool) -> na::DMatrix<f32> {
    let mut out = d.clone();
    for mut col in out.column_iter_mut() {
        if zero_mean {
            let mean = col.mean();
            col.add_scalar_mut(-mean);
        }
        let norm = col.norm();
        if norm > 0.0 {
            col /= norm;
        }
    }
    out
}

/// A synthetic dictionary learning problem with known ground truth.
pub struct SyntheticProblem {
    /// Ground-truth dictionary with unit-norm columns (m x n)
    pub dict: na::DMatrix<f32>,
    /// Sparse ground-truth coefficient maps (n x k)
    pub coef: na::DMatrix<f32>,
    /// Observed signals S = D X + noise (m x k)
    pub signal: na::DMatrix<f32>,
}

/// Generates a seeded synthetic sparse coding / dictionary learning problem.
///
/// The dictionary has normalized Gaussian columns; each signal is a sparse
/// combination of `sparsity` dictionary atoms plus Gaussian noise of
/// standard deviation `noise_sigma`.
pub fn gen_synthetic_problem(
    m: usize,
    n: usize,
    k: usize,
    sparsity: usize,
    noise_sigma: f32,
    seed: u64,
) -> SyntheticProblem {
    let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);

    let mut dict = na::DMatrix::<f32>::zeros(m, n);
    for j in 0..n {
        let mut column: Vec<f32> = (0..m).map(|_| rng.sample(StandardNormal)).collect();
        let norm = column.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            column.iter_mut().for_each(|x| *x /= norm);
        }
        dict.column_mut(j).copy_from_slice(&column);
    }

    let mut coef = na::DMatrix::<f32>::zeros(n, k);
    for j in 0..k {
        let indices = rand::seq::index::sample(&mut rng, n, sparsity.min(n));
        for idx in indices.iter() {
            coef[(idx, j)] = rng.sample(StandardNormal);
        }
    }

    let mut signal = &dict * &coef;
    if noise_sigma > 0.0 {
        for entry in signal.iter_mut() {
            let noise: f32 = rng.sample(StandardNormal);
            *entry += noise_sigma * noise;
        }
    }

    SyntheticProblem { dict, coef, signal }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_threshold_shrinks_towards_zero() {
        let v = na::DMatrix::from_row_slice(1, 4, &[3.0, -3.0, 0.5, -0.5]);
        let out = soft_threshold(&v, 1.0);
        assert_eq!(out[(0, 0)], 2.0);
        assert_eq!(out[(0, 1)], -2.0);
        assert_eq!(out[(0, 2)], 0.0);
        assert_eq!(out[(0, 3)], 0.0);
    }

    #[test]
    fn factored_inverse_matches_direct_inverse() {
        let a = na::DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 0.0, 1.0, 1.0, 0.0]);
        let rho = 0.7;
        let inv = factored_inverse(&a, rho).unwrap();
        let direct = (a.transpose() * &a + na::DMatrix::identity(2, 2) * rho)
            .try_inverse()
            .unwrap();
        assert!((inv - direct).norm() < 1e-5);
    }

    #[test]
    fn factored_inverse_woodbury_branch() {
        // 2x8 is fat enough (m < n/2) to take the Woodbury path.
        let problem = gen_synthetic_problem(2, 8, 1, 2, 0.0, 3);
        let a = problem.dict;
        let rho = 1.3;
        let inv = factored_inverse(&a, rho).unwrap();
        let direct = (a.transpose() * &a + na::DMatrix::identity(8, 8) * rho)
            .try_inverse()
            .unwrap();
        assert!((inv - direct).norm() < 1e-4);
    }

    #[test]
    fn normalize_columns_produces_unit_norms() {
        let d = na::DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 4.0, -2.0]);
        let out = normalize_columns(&d, false);
        for col in out.column_iter() {
            assert!((col.norm() - 1.0).abs() < 1e-6);
        }

        let zm = normalize_columns(&d, true);
        for col in zm.column_iter() {
            assert!(col.mean().abs() < 1e-6);
            assert!((col.norm() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn normalize_columns_leaves_zero_norm_columns_unchanged() {
        // A constant column becomes the zero vector under mean removal and
        // must pass through the projection untouched rather than divide by
        // a zero norm.
        let d = na::DMatrix::from_row_slice(2, 2, &[3.0, 1.0, 4.0, 1.0]);
        let zm = normalize_columns(&d, true);
        assert_eq!(zm.column(1), na::DMatrix::<f32>::zeros(2, 1).column(0));

        let z = na::DMatrix::<f32>::zeros(2, 1);
        assert_eq!(normalize_columns(&z, false), z);
    }

    #[test]
    fn synthetic_problem_is_deterministic_per_seed() {
        let p1 = gen_synthetic_problem(8, 16, 4, 3, 0.01, 42);
        let p2 = gen_synthetic_problem(8, 16, 4, 3, 0.01, 42);
        assert_eq!(p1.signal, p2.signal);
        assert_eq!(p1.coef.iter().filter(|x| **x != 0.0).count(), 4 * 3);
        for col in p1.dict.column_iter() {
            assert!((col.norm() - 1.0).abs() < 1e-5);
        }
    }
}
