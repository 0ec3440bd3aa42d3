extern crate nalgebra as na;

use crate::config::{ConfigDict, ConfigMap, map};
use crate::stats::{IterStats, IterStatsConfig};
use crate::timing::Stopwatch;
use crate::solver::AdmmStep;
use crate::utils::SolverError;

/// Typed outer-loop options for the dictionary learning driver.
#[derive(Debug, Clone)]
pub struct DictLearnParams {
    pub verbose: bool,
    pub status_header: bool,
    pub max_main_iter: usize,
}

impl DictLearnParams {
    pub fn defaults() -> ConfigMap {
        map([
            ("Verbose", false.into()),
            ("StatusHeader", true.into()),
            ("MaxMainIter", 1000usize.into()),
        ])
    }

    pub fn from_config(opt: &ConfigDict) -> Result<Self, SolverError> {
        Ok(DictLearnParams {
            verbose: opt.bool(&["Verbose"])?,
            status_header: opt.bool(&["StatusHeader"])?,
            max_main_iter: opt.usize(&["MaxMainIter"])?,
        })
    }
}

/// Hook for cross-cutting evaluation metrics computed once per outer
/// iteration; results are merged into the combined statistics record through
/// the `Eval` sources of the recorder configuration.
pub type EvalHook<X, D> = Box<dyn Fn(&X, &D) -> Vec<(&'static str, f64)>>;

/// Alternating dictionary learning driver.
///
/// Composes two independently configured ADMM solvers: a sparse coding step
/// (X) and a dictionary update step (D). Each outer iteration runs the
/// coding solver for its own inner budget, hands its result to the
/// update solver, runs the update solver, and hands the new dictionary back;
/// one combined statistics record is built per outer iteration from both
/// solvers' latest records. The two solvers never share state directly; all
/// cross-solver communication is an explicit copy through the accessor
/// methods.
///
/// `solve()` is resumable exactly like a single engine: the outer iteration
/// counter persists across calls.
pub struct DictLearn<X: AdmmStep, D: AdmmStep> {
    xstep: X,
    dstep: D,
    params: DictLearnParams,
    isc: IterStatsConfig,
    evaluate: Option<EvalHook<X, D>>,
    itstat: Vec<IterStats>,
    /// Completed outer iteration count
    j: usize,
    timer: Stopwatch,
    runtime: f64,
}

impl<X: AdmmStep, D: AdmmStep> DictLearn<X, D> {
    /// Creates a driver from two already-configured solvers, outer-loop
    /// options and a statistics-combination configuration.
    pub fn new(
        xstep: X,
        dstep: D,
        opt: &ConfigDict,
        isc: IterStatsConfig,
    ) -> Result<Self, SolverError> {
        let timer = Stopwatch::new();
        let params = DictLearnParams::from_config(opt)?;
        let mut driver = DictLearn {
            xstep,
            dstep,
            params,
            isc,
            evaluate: None,
            itstat: Vec::new(),
            j: 0,
            timer,
            runtime: 0.0,
        };
        driver.runtime += driver.timer.elapsed_reset();
        Ok(driver)
    }

    /// Installs an evaluation hook. There is no default metric set; problem
    /// variants inject whatever combined metrics they need.
    pub fn with_evaluate(mut self, hook: EvalHook<X, D>) -> Self {
        self.evaluate = Some(hook);
        self
    }

    /// Runs up to `MaxMainIter` outer iterations and returns the final
    /// dictionary.
    pub fn solve(&mut self) -> Result<na::DMatrix<f32>, SolverError> {
        if self.params.verbose && self.params.status_header && self.j == 0 {
            self.isc.print_header();
        }
        self.timer.start();

        let end = self.j + self.params.max_main_iter;
        for j in self.j..end {
            // Sparse coding step, then commit its result to the dictionary
            // update problem before that solver runs.
            self.xstep.solve()?;
            let coef = self.xstep.result().clone();
            self.dstep.set_linked(&coef)?;

            // Dictionary update step, then commit the new dictionary back.
            self.dstep.solve()?;
            let dict = self.dstep.result().clone();
            self.xstep.set_linked(&dict)?;

            let evl = match &self.evaluate {
                Some(hook) => hook(&self.xstep, &self.dstep),
                None => Vec::new(),
            };

            let t = self.runtime + self.timer.elapsed();
            let itst = self.isc.build(
                j,
                t,
                self.xstep.last_stats(),
                self.dstep.last_stats(),
                &evl,
            );
            if self.params.verbose {
                self.isc.print_stats(&itst);
            }
            self.itstat.push(itst);
            self.j = j + 1;
        }

        self.runtime += self.timer.elapsed();
        if self.params.verbose && self.params.status_header {
            self.isc.print_separator();
        }
        Ok(self.dstep.result().clone())
    }

    /// The current dictionary estimate.
    pub fn dict(&self) -> &na::DMatrix<f32> {
        self.dstep.result()
    }

    /// The current coefficient map estimate.
    pub fn coef(&self) -> &na::DMatrix<f32> {
        self.xstep.result()
    }

    /// Combined per-outer-iteration statistics records.
    pub fn itstat(&self) -> &[IterStats] {
        &self.itstat
    }

    /// Number of completed outer iterations across all solve() calls.
    pub fn iterations(&self) -> usize {
        self.j
    }

    /// Cumulative wall-clock seconds, including construction overhead.
    pub fn runtime(&self) -> f64 {
        self.runtime
    }

    pub fn xstep(&self) -> &X {
        &self.xstep
    }

    pub fn dstep(&self) -> &D {
        &self.dstep
    }
}
