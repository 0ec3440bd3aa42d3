extern crate nalgebra as na;

use crate::config::{ConfigMap, ConfigValue};
use crate::solver::{AdmmProblem, SolverParams};
use crate::utils::{SolverError, factored_inverse, soft_threshold};

/// Basis Pursuit DeNoising sparse coding problem:
///
///   min_X (1/2) ||D X - S||_F^2 + lambda ||X||_1
///
/// solved via the identity split X = Y. The primal update is the solution of
/// the regularized least-squares system (D^T D + rho I) X = D^T S +
/// rho (Y - U), computed through a cached factorization that is refreshed
/// only when rho changes; the auxiliary update is elementwise soft
/// thresholding with threshold lambda / rho.
///
/// # Example
///
/// ```no_run
/// use sparsedl_core::bpdn::Bpdn;
/// use sparsedl_core::config::ConfigDict;
/// use sparsedl_core::solver::AdmmSolver;
/// extern crate nalgebra as na;
///
/// let dict = na::DMatrix::<f32>::identity(4, 4);
/// let signal = na::DMatrix::<f32>::from_element(4, 1, 1.0);
/// let problem = Bpdn::new(dict, signal, 0.1).unwrap();
/// let opt = ConfigDict::from_defaults(Bpdn::default_options());
/// let mut solver = AdmmSolver::new(problem, &opt).unwrap();
/// solver.solve().unwrap();
/// let coef = solver.result();
/// ```
#[derive(Debug)]
pub struct Bpdn {
    /// Dictionary D (m x n)
    dict: na::DMatrix<f32>,
    /// Signal matrix S (m x k)
    signal: na::DMatrix<f32>,
    /// Cached product D^T S, refreshed when the dictionary changes
    dts: na::DMatrix<f32>,
    /// L1 regularization weight
    lmbda: f32,
    /// Cached (D^T D + rho I)^-1 together with the rho it was built for
    factor: Option<(na::DMatrix<f32>, f32)>,
}

impl Bpdn {
    /// Creates a sparse coding problem for a dictionary, a signal matrix and
    /// an L1 weight.
    ///
    /// # Arguments
    ///
    /// * `dict` - The dictionary D (m x n)
    /// * `signal` - The signal matrix S (m x k), one signal per column
    /// * `lmbda` - The L1 regularization weight
    pub fn new(
        dict: na::DMatrix<f32>,
        signal: na::DMatrix<f32>,
        lmbda: f32,
    ) -> Result<Self, SolverError> {
        if dict.nrows() != signal.nrows() {
            return Err(SolverError::dimension(
                "signal rows vs dictionary rows",
                (dict.nrows(), signal.ncols()),
                signal.shape(),
            ));
        }
        let dts = dict.transpose() * &signal;
        Ok(Bpdn {
            dict,
            signal,
            dts,
            lmbda,
            factor: None,
        })
    }

    /// Default option template: the shared engine options with the adaptive
    /// penalty policy enabled.
    pub fn default_options() -> ConfigMap {
        let mut opt = SolverParams::defaults();
        if let Some(ConfigValue::Map(ar)) = opt.get_mut("AutoRho") {
            ar.insert("Enabled".to_string(), true.into());
        }
        opt
    }

    pub fn lmbda(&self) -> f32 {
        self.lmbda
    }

    pub fn dict(&self) -> &na::DMatrix<f32> {
        &self.dict
    }

    fn factor(&mut self, rho: f32) -> Result<&na::DMatrix<f32>, SolverError> {
        let stale = match &self.factor {
            Some((_, cached_rho)) => *cached_rho != rho,
            None => true,
        };
        if stale {
            let inv = factored_inverse(&self.dict, rho)?;
            self.factor = Some((inv, rho));
        }
        // The cache is guaranteed populated at this point.
        match &self.factor {
            Some((inv, _)) => Ok(inv),
            None => unreachable!(),
        }
    }
}

impl AdmmProblem for Bpdn {
    fn var_shape(&self) -> (usize, usize) {
        (self.dict.ncols(), self.signal.ncols())
    }

    fn update_primal(
        &mut self,
        y: &na::DMatrix<f32>,
        u: &na::DMatrix<f32>,
        rho: f32,
    ) -> Result<na::DMatrix<f32>, SolverError> {
        let rhs = &self.dts + (y - u) * rho;
        let inv = self.factor(rho)?;
        Ok(inv * rhs)
    }

    fn update_auxiliary(
        &mut self,
        v: &na::DMatrix<f32>,
        rho: f32,
    ) -> Result<na::DMatrix<f32>, SolverError> {
        Ok(soft_threshold(v, self.lmbda / rho))
    }

    fn objective(&self, v: &na::DMatrix<f32>) -> (f64, Vec<(&'static str, f64)>) {
        let dfid = 0.5 * (&self.dict * v - &self.signal).norm_squared() as f64;
        let regl1 = v.iter().map(|x| x.abs() as f64).sum::<f64>();
        let total = dfid + self.lmbda as f64 * regl1;
        (total, vec![("DFid", dfid), ("RegL1", regl1)])
    }

    /// Installs a new dictionary (same shape) and invalidates the cached
    /// factorization and D^T S product.
    fn set_linked(
        &mut self,
        value: &na::DMatrix<f32>,
        _rho: f32,
    ) -> Result<(), SolverError> {
        if value.shape() != self.dict.shape() {
            return Err(SolverError::dimension(
                "linked dictionary",
                self.dict.shape(),
                value.shape(),
            ));
        }
        self.dict = value.clone();
        self.dts = self.dict.transpose() * &self.signal;
        self.factor = None;
        Ok(())
    }

    fn default_rho(&self) -> f32 {
        50.0 * self.lmbda + 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigDict, map};
    use crate::solver::AdmmSolver;

    fn options(overrides: ConfigMap) -> ConfigDict {
        ConfigDict::new(Bpdn::default_options(), overrides).unwrap()
    }

    #[test]
    fn mismatched_signal_rows_are_rejected() {
        let dict = na::DMatrix::<f32>::identity(3, 3);
        let signal = na::DMatrix::<f32>::zeros(2, 1);
        let err = Bpdn::new(dict, signal, 0.1).unwrap_err();
        assert!(matches!(err, SolverError::Dimension { .. }));
    }

    #[test]
    fn identity_dictionary_without_regularization_recovers_signal() {
        let dict = na::DMatrix::<f32>::identity(2, 2);
        let signal = na::DMatrix::from_column_slice(2, 1, &[1.0, 2.0]);
        let opt = options(map([
            ("MaxMainIter", 200usize.into()),
            ("AbsStopTol", 1e-5.into()),
            ("RelStopTol", 1e-5.into()),
            ("Rho", 1.0.into()),
            (
                "AutoRho",
                ConfigValue::Map(map([("Enabled", false.into())])),
            ),
        ]));
        let problem = Bpdn::new(dict, signal, 0.0).unwrap();
        let mut solver = AdmmSolver::new(problem, &opt).unwrap();
        solver.solve().unwrap();

        assert!(solver.iterations() < 200);
        let coef = solver.result();
        assert!((coef[(0, 0)] - 1.0).abs() < 1e-3);
        assert!((coef[(1, 0)] - 2.0).abs() < 1e-3);
    }

    #[test]
    fn identity_dictionary_solution_is_soft_thresholded_signal() {
        // With D = I the minimizer is soft(s, lambda) in closed form.
        let dict = na::DMatrix::<f32>::identity(2, 2);
        let signal = na::DMatrix::from_column_slice(2, 1, &[1.0, 2.0]);
        let opt = options(map([
            ("MaxMainIter", 500usize.into()),
            ("AbsStopTol", 1e-6.into()),
            ("RelStopTol", 1e-6.into()),
            ("Rho", 1.0.into()),
            (
                "AutoRho",
                ConfigValue::Map(map([("Enabled", false.into())])),
            ),
        ]));
        let problem = Bpdn::new(dict, signal, 0.5).unwrap();
        let mut solver = AdmmSolver::new(problem, &opt).unwrap();
        solver.solve().unwrap();

        let coef = solver.result();
        assert!((coef[(0, 0)] - 0.5).abs() < 1e-3);
        assert!((coef[(1, 0)] - 1.5).abs() < 1e-3);
    }

    #[test]
    fn objective_reports_fidelity_and_l1_terms() {
        let dict = na::DMatrix::<f32>::identity(2, 2);
        let signal = na::DMatrix::from_column_slice(2, 1, &[1.0, 2.0]);
        let problem = Bpdn::new(dict, signal, 2.0).unwrap();

        let v = na::DMatrix::from_column_slice(2, 1, &[1.0, 0.0]);
        let (total, terms) = problem.objective(&v);
        // DFid = 0.5 * ||v - s||^2 = 0.5 * 4 = 2; RegL1 = 1.
        assert!((total - 4.0).abs() < 1e-9);
        assert_eq!(terms[0], ("DFid", 2.0));
        assert_eq!(terms[1], ("RegL1", 1.0));
    }

    #[test]
    fn linked_dictionary_replaces_cached_products() {
        let dict = na::DMatrix::<f32>::identity(2, 2);
        let signal = na::DMatrix::from_column_slice(2, 1, &[1.0, 2.0]);
        let mut problem = Bpdn::new(dict, signal, 0.1).unwrap();

        // Prime the factorization cache, then swap the dictionary.
        problem
            .update_primal(
                &na::DMatrix::zeros(2, 1),
                &na::DMatrix::zeros(2, 1),
                1.0,
            )
            .unwrap();
        let swapped = na::DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        problem.set_linked(&swapped, 1.0).unwrap();

        // D^T S under the swapped dictionary is the permuted signal.
        assert_eq!(problem.dts[(0, 0)], 2.0);
        assert_eq!(problem.dts[(1, 0)], 1.0);
        assert!(problem.factor.is_none());

        let err = problem
            .set_linked(&na::DMatrix::zeros(3, 3), 1.0)
            .unwrap_err();
        assert!(matches!(err, SolverError::Dimension { .. }));
    }

    #[test]
    fn default_rho_follows_regularization_weight() {
        let dict = na::DMatrix::<f32>::identity(2, 2);
        let signal = na::DMatrix::<f32>::zeros(2, 1);
        let problem = Bpdn::new(dict, signal, 0.1).unwrap();
        assert!((problem.default_rho() - 6.0).abs() < 1e-6);
    }
}
