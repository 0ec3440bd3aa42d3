extern crate nalgebra as na;

use crate::config::{ConfigMap, map};
use crate::solver::{AdmmProblem, SolverParams};
use crate::utils::{SolverError, factored_inverse, normalize_columns};

/// Constrained Method of Optimal Directions dictionary update problem:
///
///   min_D (1/2) ||D X - S||_F^2  subject to  ||d_j||_2 = 1 for every column
///
/// solved via the identity split D = G. The primal update is the solution of
/// the regularized normal equations D (X X^T + rho I) = S X^T + rho (G - H),
/// computed through a cached factorization that is refreshed only when rho
/// changes; the auxiliary update projects every column onto the unit sphere
/// (optionally after removing the column mean, for zero-mean dictionaries).
#[derive(Debug)]
pub struct Cmod {
    /// Coefficient maps X (n x k)
    coef: na::DMatrix<f32>,
    /// Signal matrix S (m x k)
    signal: na::DMatrix<f32>,
    /// Cached product S X^T, refreshed when the coefficients change
    sxt: na::DMatrix<f32>,
    /// Remove each column's mean before normalization
    zero_mean: bool,
    /// Cached (X X^T + rho I)^-1 together with the rho it was built for
    factor: Option<(na::DMatrix<f32>, f32)>,
}

impl Cmod {
    /// Creates a dictionary update problem for a coefficient estimate and a
    /// signal matrix.
    ///
    /// # Arguments
    ///
    /// * `coef` - The coefficient maps X (n x k)
    /// * `signal` - The signal matrix S (m x k), one signal per column
    /// * `zero_mean` - Project onto zero-mean unit-norm columns instead of
    ///   plain unit-norm columns
    pub fn new(
        coef: na::DMatrix<f32>,
        signal: na::DMatrix<f32>,
        zero_mean: bool,
    ) -> Result<Self, SolverError> {
        if coef.ncols() != signal.ncols() {
            return Err(SolverError::dimension(
                "signal columns vs coefficient columns",
                (signal.nrows(), coef.ncols()),
                signal.shape(),
            ));
        }
        let sxt = &signal * coef.transpose();
        Ok(Cmod {
            coef,
            signal,
            sxt,
            zero_mean,
            factor: None,
        })
    }

    /// Default option template: the shared engine options plus the
    /// `ZeroMean` projection switch.
    pub fn default_options() -> ConfigMap {
        let mut opt = SolverParams::defaults();
        opt.append(&mut map([("ZeroMean", false.into())]));
        opt
    }

    pub fn zero_mean(&self) -> bool {
        self.zero_mean
    }

    fn factor(&mut self, rho: f32) -> Result<&na::DMatrix<f32>, SolverError> {
        let stale = match &self.factor {
            Some((_, cached_rho)) => *cached_rho != rho,
            None => true,
        };
        if stale {
            // (X X^T + rho I)^-1 is the Gram inverse of X^T.
            let inv = factored_inverse(&self.coef.transpose(), rho)?;
            self.factor = Some((inv, rho));
        }
        match &self.factor {
            Some((inv, _)) => Ok(inv),
            None => unreachable!(),
        }
    }
}

impl AdmmProblem for Cmod {
    fn var_shape(&self) -> (usize, usize) {
        (self.signal.nrows(), self.coef.nrows())
    }

    fn update_primal(
        &mut self,
        y: &na::DMatrix<f32>,
        u: &na::DMatrix<f32>,
        rho: f32,
    ) -> Result<na::DMatrix<f32>, SolverError> {
        let rhs = &self.sxt + (y - u) * rho;
        let inv = self.factor(rho)?;
        Ok(rhs * inv)
    }

    fn update_auxiliary(
        &mut self,
        v: &na::DMatrix<f32>,
        _rho: f32,
    ) -> Result<na::DMatrix<f32>, SolverError> {
        Ok(normalize_columns(v, self.zero_mean))
    }

    /// The reported objective is the data fidelity alone; the constraint
    /// violation is reported as a separate `Cnstr` term.
    fn objective(&self, v: &na::DMatrix<f32>) -> (f64, Vec<(&'static str, f64)>) {
        let dfid = 0.5 * (v * &self.coef - &self.signal).norm_squared() as f64;
        let cnstr = (normalize_columns(v, self.zero_mean) - v).norm() as f64;
        (dfid, vec![("DFid", dfid), ("Cnstr", cnstr)])
    }

    /// Installs new coefficient maps (same shape) and invalidates the cached
    /// factorization and S X^T product.
    fn set_linked(
        &mut self,
        value: &na::DMatrix<f32>,
        _rho: f32,
    ) -> Result<(), SolverError> {
        if value.shape() != self.coef.shape() {
            return Err(SolverError::dimension(
                "linked coefficients",
                self.coef.shape(),
                value.shape(),
            ));
        }
        self.coef = value.clone();
        self.sxt = &self.signal * self.coef.transpose();
        self.factor = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigDict;
    use crate::solver::AdmmSolver;

    fn options(overrides: ConfigMap) -> ConfigDict {
        ConfigDict::new(Cmod::default_options(), overrides).unwrap()
    }

    #[test]
    fn mismatched_signal_columns_are_rejected() {
        let coef = na::DMatrix::<f32>::zeros(3, 2);
        let signal = na::DMatrix::<f32>::zeros(4, 5);
        let err = Cmod::new(coef, signal, false).unwrap_err();
        assert!(matches!(err, SolverError::Dimension { .. }));
    }

    #[test]
    fn identity_coefficients_recover_normalized_signal_columns() {
        // With X = I the unconstrained optimum is D = S, so the projected
        // solution is S with normalized columns.
        let coef = na::DMatrix::<f32>::identity(2, 2);
        let signal = na::DMatrix::from_row_slice(2, 2, &[3.0, 0.0, 4.0, 2.0]);
        let expected = normalize_columns(&signal, false);

        let opt = options(map([
            ("MaxMainIter", 300usize.into()),
            ("AbsStopTol", 1e-5.into()),
            ("RelStopTol", 1e-5.into()),
            ("Rho", 1.0.into()),
        ]));
        let problem = Cmod::new(coef, signal, false).unwrap();
        let mut solver = AdmmSolver::new(problem, &opt).unwrap();
        solver.solve().unwrap();

        let dict = solver.result();
        for j in 0..2 {
            assert!((dict.column(j) - expected.column(j)).norm() < 1e-2);
            assert!((dict.column(j).norm() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn objective_reports_fidelity_and_constraint_violation() {
        let coef = na::DMatrix::<f32>::identity(2, 2);
        let signal = na::DMatrix::<f32>::identity(2, 2);
        let problem = Cmod::new(coef, signal, false).unwrap();

        // Unit-norm columns: zero constraint violation, total equals DFid.
        let feasible = na::DMatrix::<f32>::identity(2, 2);
        let (total, terms) = problem.objective(&feasible);
        assert!((total - 0.0).abs() < 1e-9);
        assert_eq!(terms[1], ("Cnstr", 0.0));

        // Doubling the columns violates the constraint.
        let infeasible = na::DMatrix::<f32>::identity(2, 2) * 2.0;
        let (_, terms) = problem.objective(&infeasible);
        assert!(matches!(terms[1], ("Cnstr", c) if c > 0.0));
    }

    #[test]
    fn linked_coefficients_replace_cached_products() {
        let coef = na::DMatrix::<f32>::identity(2, 2);
        let signal = na::DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let mut problem = Cmod::new(coef, signal, false).unwrap();

        problem
            .update_primal(
                &na::DMatrix::zeros(2, 2),
                &na::DMatrix::zeros(2, 2),
                1.0,
            )
            .unwrap();
        let swapped = na::DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        problem.set_linked(&swapped, 1.0).unwrap();

        // S X^T under the swapped coefficients is the column-permuted signal.
        assert_eq!(problem.sxt[(0, 0)], 2.0);
        assert_eq!(problem.sxt[(0, 1)], 1.0);
        assert!(problem.factor.is_none());

        let err = problem
            .set_linked(&na::DMatrix::zeros(3, 3), 1.0)
            .unwrap_err();
        assert!(matches!(err, SolverError::Dimension { .. }));
    }
}
