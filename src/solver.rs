extern crate nalgebra as na;

use crate::config::{ConfigDict, ConfigMap, ConfigValue, map};
use crate::stats::SolverStats;
use crate::timing::{Stopwatch, TimingTracker, time_step};
use crate::utils::{EPS_DIV, SolverError};

/// Parsed adaptive penalty parameter policy.
///
/// When enabled, every `period` iterations the ratio of primal to dual
/// residual is compared against a target band; if it falls outside, rho is
/// multiplied or divided by a scaling factor (optionally derived from the
/// residual ratio itself) and the scaled dual variable is rescaled by the
/// inverse factor.
#[derive(Debug, Clone)]
pub struct AutoRhoParams {
    pub enabled: bool,
    pub period: usize,
    pub scaling: f32,
    pub rsdl_ratio: f32,
    pub rsdl_target: Option<f32>,
    pub auto_scaling: bool,
}

/// Typed ADMM engine options, parsed once from a validated [`ConfigDict`].
#[derive(Debug, Clone)]
pub struct SolverParams {
    pub verbose: bool,
    pub status_header: bool,
    pub max_main_iter: usize,
    pub abs_stop_tol: f32,
    pub rel_stop_tol: f32,
    /// Initial penalty parameter; problems supply a heuristic when unset.
    pub rho: Option<f32>,
    /// Over-relaxation parameter alpha in [1.0, 1.8]; 1.0 disables relaxation.
    pub relax_param: f32,
    /// Evaluate the reported objective at the auxiliary iterate rather than
    /// the primal iterate. The two differ before convergence.
    pub aux_var_obj: bool,
    /// Skip objective evaluation entirely (it can be expensive).
    pub fast_solve: bool,
    pub auto_rho: AutoRhoParams,
}

impl SolverParams {
    /// Default option template shared by all ADMM engines. The keys declared
    /// here (plus any problem-specific additions) form the allowed key set.
    pub fn defaults() -> ConfigMap {
        map([
            ("Verbose", false.into()),
            ("StatusHeader", true.into()),
            ("MaxMainIter", 1000usize.into()),
            ("AbsStopTol", 0.0.into()),
            ("RelStopTol", 1e-3.into()),
            ("Rho", ConfigValue::None),
            ("RelaxParam", 1.0.into()),
            ("AuxVarObj", true.into()),
            ("FastSolve", false.into()),
            (
                "AutoRho",
                ConfigValue::Map(map([
                    ("Enabled", false.into()),
                    ("Period", 10usize.into()),
                    ("Scaling", 2.0.into()),
                    ("RsdlRatio", 10.0.into()),
                    ("RsdlTarget", ConfigValue::None),
                    ("AutoScaling", false.into()),
                ])),
            ),
        ])
    }

    pub fn from_config(opt: &ConfigDict) -> Result<Self, SolverError> {
        Ok(SolverParams {
            verbose: opt.bool(&["Verbose"])?,
            status_header: opt.bool(&["StatusHeader"])?,
            max_main_iter: opt.usize(&["MaxMainIter"])?,
            abs_stop_tol: opt.float(&["AbsStopTol"])? as f32,
            rel_stop_tol: opt.float(&["RelStopTol"])? as f32,
            rho: opt.float_opt(&["Rho"])?.map(|v| v as f32),
            relax_param: opt.float(&["RelaxParam"])? as f32,
            aux_var_obj: opt.bool(&["AuxVarObj"])?,
            fast_solve: opt.bool(&["FastSolve"])?,
            auto_rho: AutoRhoParams {
                enabled: opt.bool(&["AutoRho", "Enabled"])?,
                period: opt.usize(&["AutoRho", "Period"])?,
                scaling: opt.float(&["AutoRho", "Scaling"])? as f32,
                rsdl_ratio: opt.float(&["AutoRho", "RsdlRatio"])? as f32,
                rsdl_target: opt
                    .float_opt(&["AutoRho", "RsdlTarget"])?
                    .map(|v| v as f32),
                auto_scaling: opt.bool(&["AutoRho", "AutoScaling"])?,
            },
        })
    }
}

/// Problem-specific updates plugged into the generic ADMM engine.
///
/// The engine handles the two-block iteration for problems of the form
/// min f(x) + g(y) subject to A x = y; implementors supply the two
/// block minimizations and the objective, and may override the constraint
/// and residual hooks when A is not the identity.
pub trait AdmmProblem {
    /// Shape of the auxiliary and dual variables (the constraint image space).
    fn var_shape(&self) -> (usize, usize);

    /// Solves the primal block: argmin_x f(x) + (rho/2) ||A x - y + u||^2
    /// for the current auxiliary and dual state.
    fn update_primal(
        &mut self,
        y: &na::DMatrix<f32>,
        u: &na::DMatrix<f32>,
        rho: f32,
    ) -> Result<na::DMatrix<f32>, SolverError>;

    /// Proximal step for the auxiliary block, evaluated at A x_relaxed + u.
    fn update_auxiliary(
        &mut self,
        v: &na::DMatrix<f32>,
        rho: f32,
    ) -> Result<na::DMatrix<f32>, SolverError>;

    /// Objective at the given iterate: the total value plus named component
    /// terms for the statistics record.
    fn objective(&self, v: &na::DMatrix<f32>) -> (f64, Vec<(&'static str, f64)>);

    /// Receives the collaborating solver's latest primal estimate (e.g. a
    /// new dictionary for a sparse coding problem). The default ignores it.
    fn set_linked(
        &mut self,
        _value: &na::DMatrix<f32>,
        _rho: f32,
    ) -> Result<(), SolverError> {
        Ok(())
    }

    /// Fallback penalty parameter used when `Rho` is not configured.
    fn default_rho(&self) -> f32 {
        1.0
    }

    /// Constraint operator A; identity for the default x - y = 0 constraint.
    fn cnst_a(&self, x: &na::DMatrix<f32>) -> na::DMatrix<f32> {
        x.clone()
    }

    /// Adjoint of the constraint operator.
    fn cnst_at(&self, v: &na::DMatrix<f32>) -> na::DMatrix<f32> {
        v.clone()
    }

    /// Primal residual A x - y.
    fn rsdl_r(&self, ax: &na::DMatrix<f32>, y: &na::DMatrix<f32>) -> na::DMatrix<f32> {
        ax - y
    }

    /// Dual residual rho * A^T (y_prev - y).
    fn rsdl_s(
        &self,
        y_prev: &na::DMatrix<f32>,
        y: &na::DMatrix<f32>,
        rho: f32,
    ) -> na::DMatrix<f32> {
        self.cnst_at(&(y_prev - y)) * rho
    }

    /// Reference norm for the relative primal stopping tolerance.
    fn rsdl_rn(&self, ax: &na::DMatrix<f32>, y: &na::DMatrix<f32>) -> f32 {
        ax.norm().max(y.norm())
    }

    /// Reference norm for the relative dual stopping tolerance.
    fn rsdl_sn(&self, u: &na::DMatrix<f32>, rho: f32) -> f32 {
        rho * self.cnst_at(u).norm()
    }
}

/// Capability set required of a solver participating in an alternating
/// optimization (see `DictLearn`): run more iterations, expose and replace
/// the current result variable, receive the collaborator's estimate, and
/// report iteration statistics and runtime.
///
/// For the identity-split problems in this crate the result variable is the
/// auxiliary iterate Y, which satisfies the second block's constraint or
/// sparsity pattern exactly (the primal iterate X only does so in the
/// limit).
pub trait AdmmStep {
    fn solve(&mut self) -> Result<(), SolverError>;
    fn result(&self) -> &na::DMatrix<f32>;
    fn set_result(&mut self, value: na::DMatrix<f32>) -> Result<(), SolverError>;
    fn set_linked(&mut self, value: &na::DMatrix<f32>) -> Result<(), SolverError>;
    fn itstat(&self) -> &[SolverStats];
    fn last_stats(&self) -> Option<&SolverStats>;
    fn runtime(&self) -> f64;
}

/// Generic two-block ADMM engine.
///
/// Owns the primal (X), auxiliary (Y) and scaled dual (U) variables together
/// with the penalty parameter rho; the problem type supplies the block
/// minimizations. `solve()` executes a bounded run of up to `MaxMainIter`
/// iterations and resumes from the last completed iteration on repeated
/// calls, so an instance can be solved incrementally. Convergence stops the
/// run when both residual norms fall below their tolerances; hitting the
/// iteration limit is a normal outcome, not an error.
pub struct AdmmSolver<P: AdmmProblem> {
    problem: P,
    params: SolverParams,
    x: na::DMatrix<f32>,
    y: na::DMatrix<f32>,
    u: na::DMatrix<f32>,
    rho: f32,
    /// Completed iteration count, persistent across solve() calls
    k: usize,
    itstat: Vec<SolverStats>,
    timer: Stopwatch,
    timing: TimingTracker,
    /// Cumulative wall-clock seconds across all solve() calls, including
    /// construction overhead
    runtime: f64,
}

impl<P: AdmmProblem> AdmmSolver<P> {
    /// Creates an engine from a problem instance and a validated option set.
    pub fn new(problem: P, opt: &ConfigDict) -> Result<Self, SolverError> {
        let timer = Stopwatch::new();
        let params = SolverParams::from_config(opt)?;
        let (nr, nc) = problem.var_shape();
        let rho = params.rho.unwrap_or_else(|| problem.default_rho());
        let mut solver = AdmmSolver {
            problem,
            params,
            x: na::DMatrix::zeros(nr, nc),
            y: na::DMatrix::zeros(nr, nc),
            u: na::DMatrix::zeros(nr, nc),
            rho,
            k: 0,
            itstat: Vec::new(),
            timer,
            timing: TimingTracker::new(),
            runtime: 0.0,
        };
        solver.runtime += solver.timer.elapsed_reset();
        Ok(solver)
    }

    /// Creates an engine with default options.
    pub fn with_defaults(problem: P) -> Result<Self, SolverError> {
        let opt = ConfigDict::from_defaults(SolverParams::defaults());
        AdmmSolver::new(problem, &opt)
    }

    /// Supplies initial auxiliary and dual variables (e.g. to start a
    /// dictionary update at the initial dictionary).
    pub fn warm_start(
        &mut self,
        y0: na::DMatrix<f32>,
        u0: na::DMatrix<f32>,
    ) -> Result<(), SolverError> {
        let shape = self.problem.var_shape();
        if y0.shape() != shape {
            return Err(SolverError::dimension("warm start Y0", shape, y0.shape()));
        }
        if u0.shape() != shape {
            return Err(SolverError::dimension("warm start U0", shape, u0.shape()));
        }
        self.y = y0;
        self.u = u0;
        Ok(())
    }

    /// Runs up to `MaxMainIter` further iterations, stopping early once both
    /// residual norms fall below `max(AbsStopTol, RelStopTol * reference)`.
    pub fn solve(&mut self) -> Result<(), SolverError> {
        if self.params.verbose && self.params.status_header && self.k == 0 {
            self.print_header();
        }
        self.timer.start();

        let end = self.k + self.params.max_main_iter;
        while self.k < end {
            let j = self.k;
            self.timing.start_iteration(j);
            let rho = self.rho;
            let relax = self.params.relax_param;

            // All fallible sub-steps complete before any state commits, so a
            // failed iteration leaves the iterate unchanged.
            let x = {
                let problem = &mut self.problem;
                let y = &self.y;
                let u = &self.u;
                time_step(&mut self.timing, "update_primal", || {
                    problem.update_primal(y, u, rho)
                })?
            };
            let ax = self.problem.cnst_a(&x);
            let ax_relax = if relax == 1.0 {
                ax.clone()
            } else {
                &ax * relax + &self.y * (1.0 - relax)
            };
            let y_new = {
                let problem = &mut self.problem;
                let v = &ax_relax + &self.u;
                time_step(&mut self.timing, "update_auxiliary", || {
                    problem.update_auxiliary(&v, rho)
                })?
            };
            let u_new = &self.u + &ax_relax - &y_new;

            let y_prev = std::mem::replace(&mut self.y, y_new);
            self.x = x;
            self.u = u_new;

            // Residual bookkeeping with epsilon-floored reference norms
            let nr = self.problem.rsdl_r(&ax, &self.y).norm();
            let ns = self.problem.rsdl_s(&y_prev, &self.y, rho).norm();
            let rn = self.problem.rsdl_rn(&ax, &self.y).max(EPS_DIV);
            let sn = self.problem.rsdl_sn(&self.u, rho).max(EPS_DIV);
            let eps_primal = self.params.abs_stop_tol.max(self.params.rel_stop_tol * rn);
            let eps_dual = self.params.abs_stop_tol.max(self.params.rel_stop_tol * sn);

            let (obj_fun, extra) = if self.params.fast_solve {
                (None, Vec::new())
            } else {
                let v = if self.params.aux_var_obj {
                    &self.y
                } else {
                    &self.x
                };
                let (total, terms) = self.problem.objective(v);
                (Some(total), terms)
            };

            let stats = SolverStats {
                iter: j,
                obj_fun,
                primal_rsdl: nr as f64,
                dual_rsdl: ns as f64,
                eps_primal: eps_primal as f64,
                eps_dual: eps_dual as f64,
                rho: rho as f64,
                time: self.runtime + self.timer.elapsed(),
                extra,
            };
            if self.params.verbose {
                self.print_iter_line(&stats);
            }
            self.itstat.push(stats);
            self.k = j + 1;

            if nr < eps_primal && ns < eps_dual {
                break;
            }
            self.update_rho(j, nr, ns);
        }

        self.runtime += self.timer.elapsed();
        if self.params.verbose && self.params.status_header {
            println!("{}", "-".repeat(44));
        }
        Ok(())
    }

    /// Periodic adaptive rescaling of the penalty parameter. The scaled dual
    /// variable is rescaled by the inverse factor to preserve the scaled
    /// augmented Lagrangian.
    fn update_rho(&mut self, k: usize, r: f32, s: f32) {
        let ar = &self.params.auto_rho;
        if !ar.enabled || ar.period == 0 || (k + 1) % ar.period != 0 {
            return;
        }
        let tau = ar.scaling;
        let mu = ar.rsdl_ratio;
        let xi = ar.rsdl_target.unwrap_or(1.0);

        let rhomlt = if ar.auto_scaling {
            if r == 0.0 || s == 0.0 {
                tau
            } else {
                let ratio = if r > s * xi { r / (s * xi) } else { (s * xi) / r };
                ratio.sqrt().min(tau)
            }
        } else {
            tau
        };

        let mut rsf = 1.0;
        if r > xi * mu * s {
            rsf = rhomlt;
        } else if s > (mu / xi) * r {
            rsf = 1.0 / rhomlt;
        }
        if rsf != 1.0 {
            self.rho *= rsf;
            self.u /= rsf;
        }
    }

    fn print_header(&self) {
        println!(
            "{:>4}  {:>8}  {:>8}  {:>8}  {:>8}",
            "Itn", "Fnc", "r", "s", "rho"
        );
        println!("{}", "-".repeat(44));
    }

    fn print_iter_line(&self, stats: &SolverStats) {
        let fnc = stats
            .obj_fun
            .map(|v| format!("{:>8.2e}", v))
            .unwrap_or_else(|| " ".repeat(8));
        println!(
            "{:>4}  {}  {:>8.2e}  {:>8.2e}  {:>8.2e}",
            stats.iter, fnc, stats.primal_rsdl, stats.dual_rsdl, stats.rho
        );
    }

    /// The primal variable X.
    pub fn primal(&self) -> &na::DMatrix<f32> {
        &self.x
    }

    /// Replaces the primal variable, e.g. for a warm start from another
    /// solver's result.
    pub fn set_primal(&mut self, value: na::DMatrix<f32>) -> Result<(), SolverError> {
        let shape = self.problem.var_shape();
        if value.shape() != shape {
            return Err(SolverError::dimension("primal variable", shape, value.shape()));
        }
        self.x = value;
        Ok(())
    }

    /// Read-only view of the auxiliary variable Y.
    pub fn auxiliary(&self) -> &na::DMatrix<f32> {
        &self.y
    }

    /// The current solution estimate: the auxiliary iterate, which satisfies
    /// the second block's constraint or sparsity pattern exactly.
    pub fn result(&self) -> &na::DMatrix<f32> {
        &self.y
    }

    /// Replaces the current solution estimate (and the primal iterate with
    /// it, keeping the two blocks consistent for a subsequent solve).
    pub fn set_result(&mut self, value: na::DMatrix<f32>) -> Result<(), SolverError> {
        let shape = self.problem.var_shape();
        if value.shape() != shape {
            return Err(SolverError::dimension("result variable", shape, value.shape()));
        }
        self.x = value.clone();
        self.y = value;
        Ok(())
    }

    /// Read-only view of the scaled dual variable U.
    pub fn dual(&self) -> &na::DMatrix<f32> {
        &self.u
    }

    pub fn rho(&self) -> f32 {
        self.rho
    }

    /// Number of completed iterations across all solve() calls.
    pub fn iterations(&self) -> usize {
        self.k
    }

    pub fn itstat(&self) -> &[SolverStats] {
        &self.itstat
    }

    pub fn last_stats(&self) -> Option<&SolverStats> {
        self.itstat.last()
    }

    /// Cumulative wall-clock seconds, including construction overhead.
    pub fn runtime(&self) -> f64 {
        self.runtime
    }

    /// Adjusts the per-call iteration budget (e.g. to interleave tightly
    /// inside an alternating driver).
    pub fn set_max_main_iter(&mut self, n: usize) {
        self.params.max_main_iter = n;
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn problem_mut(&mut self) -> &mut P {
        &mut self.problem
    }

    /// Per-step timing breakdown for this engine.
    pub fn timing(&self) -> &TimingTracker {
        &self.timing
    }
}

impl<P: AdmmProblem> AdmmStep for AdmmSolver<P> {
    fn solve(&mut self) -> Result<(), SolverError> {
        AdmmSolver::solve(self)
    }

    fn result(&self) -> &na::DMatrix<f32> {
        AdmmSolver::result(self)
    }

    fn set_result(&mut self, value: na::DMatrix<f32>) -> Result<(), SolverError> {
        AdmmSolver::set_result(self, value)
    }

    fn set_linked(&mut self, value: &na::DMatrix<f32>) -> Result<(), SolverError> {
        let rho = self.rho;
        self.problem.set_linked(value, rho)
    }

    fn itstat(&self) -> &[SolverStats] {
        AdmmSolver::itstat(self)
    }

    fn last_stats(&self) -> Option<&SolverStats> {
        AdmmSolver::last_stats(self)
    }

    fn runtime(&self) -> f64 {
        AdmmSolver::runtime(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::map;

    /// min 0.5 ||x - t||^2 with the identity split x = y; converges to t.
    struct Quadratic {
        target: na::DMatrix<f32>,
    }

    impl Quadratic {
        fn new(target: na::DMatrix<f32>) -> Self {
            Quadratic { target }
        }
    }

    impl AdmmProblem for Quadratic {
        fn var_shape(&self) -> (usize, usize) {
            self.target.shape()
        }

        fn update_primal(
            &mut self,
            y: &na::DMatrix<f32>,
            u: &na::DMatrix<f32>,
            rho: f32,
        ) -> Result<na::DMatrix<f32>, SolverError> {
            Ok((&self.target + (y - u) * rho) / (1.0 + rho))
        }

        fn update_auxiliary(
            &mut self,
            v: &na::DMatrix<f32>,
            _rho: f32,
        ) -> Result<na::DMatrix<f32>, SolverError> {
            Ok(v.clone())
        }

        fn objective(&self, v: &na::DMatrix<f32>) -> (f64, Vec<(&'static str, f64)>) {
            let dfid = 0.5 * (v - &self.target).norm_squared() as f64;
            (dfid, vec![("DFid", dfid)])
        }
    }

    fn options(overrides: crate::config::ConfigMap) -> ConfigDict {
        ConfigDict::new(SolverParams::defaults(), overrides).unwrap()
    }

    fn target() -> na::DMatrix<f32> {
        na::DMatrix::from_column_slice(2, 1, &[1.0, 2.0])
    }

    #[test]
    fn converges_to_closed_form_solution_before_limit() {
        let opt = options(map([
            ("MaxMainIter", 200usize.into()),
            ("RelStopTol", 1e-5.into()),
            ("Rho", 1.0.into()),
        ]));
        let mut solver = AdmmSolver::new(Quadratic::new(target()), &opt).unwrap();
        solver.solve().unwrap();

        assert!(solver.iterations() < 200);
        let x = solver.primal();
        assert!((x[(0, 0)] - 1.0).abs() < 1e-3);
        assert!((x[(1, 0)] - 2.0).abs() < 1e-3);

        let last = solver.last_stats().unwrap();
        assert!(last.primal_rsdl < last.eps_primal);
        assert!(last.dual_rsdl < last.eps_dual);
    }

    #[test]
    fn zero_iteration_budget_is_a_noop() {
        let opt = options(map([("MaxMainIter", 0usize.into())]));
        let mut solver = AdmmSolver::new(Quadratic::new(target()), &opt).unwrap();
        solver.solve().unwrap();

        assert_eq!(solver.iterations(), 0);
        assert!(solver.itstat().is_empty());
        assert_eq!(solver.primal(), &na::DMatrix::<f32>::zeros(2, 1));
        assert_eq!(solver.result(), &na::DMatrix::<f32>::zeros(2, 1));
    }

    #[test]
    fn repeated_solves_resume_equivalently() {
        // Disable the stop tolerances so both runs use their full budgets.
        let base = map([
            ("MaxMainIter", 5usize.into()),
            ("RelStopTol", 0.0.into()),
            ("Rho", 1.0.into()),
        ]);
        let mut split = AdmmSolver::new(Quadratic::new(target()), &options(base.clone())).unwrap();
        split.solve().unwrap();
        split.solve().unwrap();

        let mut full = AdmmSolver::new(Quadratic::new(target()), &options(base)).unwrap();
        full.set_max_main_iter(10);
        full.solve().unwrap();

        assert_eq!(split.iterations(), 10);
        assert_eq!(full.iterations(), 10);
        assert_eq!(split.primal(), full.primal());
        assert_eq!(split.itstat().len(), full.itstat().len());
    }

    #[test]
    fn iteration_indices_increase_and_residuals_are_non_negative() {
        let opt = options(map([
            ("MaxMainIter", 8usize.into()),
            ("RelStopTol", 0.0.into()),
        ]));
        let mut solver = AdmmSolver::new(Quadratic::new(target()), &opt).unwrap();
        solver.solve().unwrap();

        for (i, stats) in solver.itstat().iter().enumerate() {
            assert_eq!(stats.iter, i);
            assert!(stats.primal_rsdl >= 0.0);
            assert!(stats.dual_rsdl >= 0.0);
            assert!(stats.rho > 0.0);
        }
    }

    #[test]
    fn auto_rho_scales_rho_and_rescales_dual() {
        let opt = options(map([(
            "AutoRho",
            ConfigValue::Map(map([
                ("Enabled", true.into()),
                ("Period", 1usize.into()),
                ("Scaling", 2.0.into()),
                ("RsdlRatio", 10.0.into()),
            ])),
        )]));
        let mut solver = AdmmSolver::new(Quadratic::new(target()), &opt).unwrap();
        solver.u = na::DMatrix::from_element(2, 1, 1.0);

        // Primal residual dominates: rho doubles, dual variable halves.
        solver.update_rho(0, 100.0, 1.0);
        assert_eq!(solver.rho(), 2.0);
        assert_eq!(solver.u[(0, 0)], 0.5);

        // Dual residual dominates: rho halves, dual variable doubles.
        solver.update_rho(1, 1.0, 100.0);
        assert_eq!(solver.rho(), 1.0);
        assert_eq!(solver.u[(0, 0)], 1.0);

        // Balanced residuals leave rho unchanged.
        solver.update_rho(2, 1.0, 1.0);
        assert_eq!(solver.rho(), 1.0);
    }

    #[test]
    fn auto_rho_respects_period() {
        let opt = options(map([(
            "AutoRho",
            ConfigValue::Map(map([
                ("Enabled", true.into()),
                ("Period", 10usize.into()),
            ])),
        )]));
        let mut solver = AdmmSolver::new(Quadratic::new(target()), &opt).unwrap();
        solver.update_rho(0, 100.0, 1.0);
        assert_eq!(solver.rho(), 1.0);
        solver.update_rho(9, 100.0, 1.0);
        assert_eq!(solver.rho(), 2.0);
    }

    #[test]
    fn set_primal_checks_dimensions() {
        let mut solver = AdmmSolver::with_defaults(Quadratic::new(target())).unwrap();
        let err = solver
            .set_primal(na::DMatrix::zeros(3, 3))
            .unwrap_err();
        assert!(matches!(err, SolverError::Dimension { .. }));
        solver
            .set_primal(na::DMatrix::from_element(2, 1, 4.0))
            .unwrap();
        assert_eq!(solver.primal()[(0, 0)], 4.0);
    }

    #[test]
    fn capability_trait_reseeds_the_solution_estimate() {
        fn reseed<S: AdmmStep>(
            step: &mut S,
            value: na::DMatrix<f32>,
        ) -> Result<(), SolverError> {
            step.set_result(value)
        }

        let mut solver = AdmmSolver::with_defaults(Quadratic::new(target())).unwrap();
        let seed = na::DMatrix::from_element(2, 1, 3.0);
        reseed(&mut solver, seed.clone()).unwrap();

        // Both blocks are reset so a subsequent solve starts consistently.
        assert_eq!(solver.result(), &seed);
        assert_eq!(solver.primal(), &seed);
        assert!(matches!(
            reseed(&mut solver, na::DMatrix::zeros(3, 3)),
            Err(SolverError::Dimension { .. })
        ));

        solver.set_max_main_iter(100);
        solver.solve().unwrap();
        assert!((solver.result()[(0, 0)] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn fast_solve_skips_objective_evaluation() {
        let opt = options(map([
            ("MaxMainIter", 2usize.into()),
            ("FastSolve", true.into()),
            ("RelStopTol", 0.0.into()),
        ]));
        let mut solver = AdmmSolver::new(Quadratic::new(target()), &opt).unwrap();
        solver.solve().unwrap();
        assert!(solver.itstat().iter().all(|s| s.obj_fun.is_none()));
    }

    #[test]
    fn runtime_accumulates_across_solves() {
        let opt = options(map([
            ("MaxMainIter", 3usize.into()),
            ("RelStopTol", 0.0.into()),
        ]));
        let mut solver = AdmmSolver::new(Quadratic::new(target()), &opt).unwrap();
        solver.solve().unwrap();
        let after_first = solver.runtime();
        solver.solve().unwrap();
        assert!(solver.runtime() >= after_first);
    }
}
