extern crate nalgebra as na;

use crate::bpdn::Bpdn;
use crate::cmod::Cmod;
use crate::config::{ConfigDict, ConfigMap, ConfigValue, map};
use crate::dictlrn::{DictLearn, DictLearnParams};
use crate::solver::AdmmSolver;
use crate::stats::{IterStats, IterStatsConfig, StatsSource};
use crate::utils::{SolverError, normalize_columns};

/// Dictionary learning via alternation of BPDN sparse coding and constrained
/// MOD dictionary updates:
///
///   min_{D, X} (1/2) ||D X - S||_F^2 + lambda ||X||_1
///   subject to unit-norm dictionary columns
///
/// Each outer iteration runs one inner iteration of each ADMM solver by
/// default, so the two problems are optimized jointly rather than to
/// completion in turn. The coding and update engines are configured through
/// the `BPDN` and `CMOD` sub-trees of the option set; the outer loop itself
/// reads only `Verbose`, `StatusHeader` and `MaxMainIter`.
pub struct BpdnDictLearn {
    dl: DictLearn<AdmmSolver<Bpdn>, AdmmSolver<Cmod>>,
}

impl BpdnDictLearn {
    /// Default option template: outer loop options plus nested `BPDN` and
    /// `CMOD` engine option sets tuned for tightly interleaved alternation.
    pub fn default_options() -> ConfigMap {
        let bpdn = ConfigDict::new(
            Bpdn::default_options(),
            map([
                ("MaxMainIter", 1usize.into()),
                (
                    "AutoRho",
                    ConfigValue::Map(map([
                        ("Period", 10usize.into()),
                        ("AutoScaling", false.into()),
                        ("RsdlRatio", 10.0.into()),
                        ("Scaling", 2.0.into()),
                        ("RsdlTarget", 1.0.into()),
                    ])),
                ),
            ]),
        )
        .expect("coding option template is self-consistent")
        .into_map();

        let cmod = ConfigDict::new(
            Cmod::default_options(),
            map([
                ("MaxMainIter", 1usize.into()),
                ("AuxVarObj", false.into()),
                (
                    "AutoRho",
                    ConfigValue::Map(map([
                        ("Enabled", true.into()),
                        ("Period", 10usize.into()),
                    ])),
                ),
            ]),
        )
        .expect("update option template is self-consistent")
        .into_map();

        let mut opt = DictLearnParams::defaults();
        opt.insert("BPDN".to_string(), ConfigValue::Map(bpdn));
        opt.insert("CMOD".to_string(), ConfigValue::Map(cmod));
        opt
    }

    /// The combined statistics schema: objective terms from the coding step,
    /// constraint violation from the update step, and both engines' residual
    /// and penalty columns.
    fn stats_config() -> IterStatsConfig {
        IterStatsConfig::new(
            vec![
                ("Iter", StatsSource::Iter),
                ("ObjFun", StatsSource::XStep("ObjFun")),
                ("DFid", StatsSource::XStep("DFid")),
                ("RegL1", StatsSource::XStep("RegL1")),
                ("Cnstr", StatsSource::DStep("Cnstr")),
                ("XPrRsdl", StatsSource::XStep("PrimalRsdl")),
                ("XDlRsdl", StatsSource::XStep("DualRsdl")),
                ("XRho", StatsSource::XStep("Rho")),
                ("DPrRsdl", StatsSource::DStep("PrimalRsdl")),
                ("DDlRsdl", StatsSource::DStep("DualRsdl")),
                ("DRho", StatsSource::DStep("Rho")),
                ("Time", StatsSource::Time),
            ],
            vec![
                "Itn", "Fnc", "DFid", "l1", "Cnstr", "r_X", "s_X", "rho_X", "r_D", "s_D",
                "rho_D",
            ],
            vec![
                ("Itn", "Iter"),
                ("Fnc", "ObjFun"),
                ("DFid", "DFid"),
                ("l1", "RegL1"),
                ("Cnstr", "Cnstr"),
                ("r_X", "XPrRsdl"),
                ("s_X", "XDlRsdl"),
                ("rho_X", "XRho"),
                ("r_D", "DPrRsdl"),
                ("s_D", "DDlRsdl"),
                ("rho_D", "DRho"),
            ],
        )
        .expect("dictionary learning stats layout is self-consistent")
    }

    /// Creates a dictionary learning solver from an initial dictionary, a
    /// signal matrix and an L1 weight.
    ///
    /// The initial dictionary is projected onto the constraint set before
    /// use, and the update engine is warm-started at it so the first coding
    /// step sees a feasible dictionary.
    ///
    /// # Arguments
    ///
    /// * `d0` - The initial dictionary (m x n); columns are normalized
    /// * `signal` - The signal matrix S (m x k), one signal per column
    /// * `lmbda` - The L1 regularization weight of the coding problem
    /// * `opt` - Options built on the [`BpdnDictLearn::default_options`] template
    pub fn new(
        d0: &na::DMatrix<f32>,
        signal: na::DMatrix<f32>,
        lmbda: f32,
        opt: &ConfigDict,
    ) -> Result<Self, SolverError> {
        let cmod_opt = opt.sub(&["CMOD"])?;
        let zero_mean = cmod_opt.bool(&["ZeroMean"])?;
        let d0 = normalize_columns(d0, zero_mean);
        let (m, n) = d0.shape();
        let k = signal.ncols();

        let bpdn_opt = opt.sub(&["BPDN"])?;
        let coding = Bpdn::new(d0.clone(), signal.clone(), lmbda)?;
        let xstep = AdmmSolver::new(coding, &bpdn_opt)?;

        let update = Cmod::new(na::DMatrix::zeros(n, k), signal, zero_mean)?;
        let mut dstep = AdmmSolver::new(update, &cmod_opt)?;
        dstep.warm_start(d0, na::DMatrix::zeros(m, n))?;

        let dl = DictLearn::new(xstep, dstep, opt, Self::stats_config())?;
        Ok(BpdnDictLearn { dl })
    }

    /// Runs up to `MaxMainIter` outer iterations and returns the final
    /// dictionary.
    pub fn solve(&mut self) -> Result<na::DMatrix<f32>, SolverError> {
        self.dl.solve()
    }

    /// The current dictionary estimate (unit-norm columns).
    pub fn dict(&self) -> &na::DMatrix<f32> {
        self.dl.dict()
    }

    /// The current sparse coefficient estimate.
    pub fn coef(&self) -> &na::DMatrix<f32> {
        self.dl.coef()
    }

    /// Combined per-outer-iteration statistics records.
    pub fn itstat(&self) -> &[IterStats] {
        self.dl.itstat()
    }

    /// Number of completed outer iterations across all solve() calls.
    pub fn iterations(&self) -> usize {
        self.dl.iterations()
    }

    /// Cumulative wall-clock seconds, including construction overhead.
    pub fn runtime(&self) -> f64 {
        self.dl.runtime()
    }

    pub fn xstep(&self) -> &AdmmSolver<Bpdn> {
        self.dl.xstep()
    }

    pub fn dstep(&self) -> &AdmmSolver<Cmod> {
        self.dl.dstep()
    }
}
