use serde::Serialize;

use crate::config::ConfigError;

/// Field width for the iteration count display column.
const FWITER: usize = 4;
/// Field precision for the other display columns.
const FPOTHR: usize = 2;

/// Per-iteration statistics record produced by a single ADMM solver.
///
/// One record is pushed per completed iteration and is immutable once
/// recorded. The fixed fields cover the generic engine bookkeeping;
/// problem-specific objective terms (e.g. data fidelity or a constraint
/// violation measure) travel in `extra` under their own names so the
/// combined-statistics recorder can resolve them by name.
#[derive(Debug, Clone, Serialize)]
pub struct SolverStats {
    /// Iteration index
    pub iter: usize,
    /// Objective function value; `None` when evaluation was skipped
    pub obj_fun: Option<f64>,
    /// Primal residual norm
    pub primal_rsdl: f64,
    /// Dual residual norm
    pub dual_rsdl: f64,
    /// Primal stopping threshold at this iteration
    pub eps_primal: f64,
    /// Dual stopping threshold at this iteration
    pub eps_dual: f64,
    /// Penalty parameter in effect for this iteration
    pub rho: f64,
    /// Cumulative solver runtime in seconds
    pub time: f64,
    /// Problem-specific named terms
    pub extra: Vec<(&'static str, f64)>,
}

impl SolverStats {
    /// Resolves a field by name, covering both fixed and extra fields.
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "ObjFun" => self.obj_fun,
            "PrimalRsdl" => Some(self.primal_rsdl),
            "DualRsdl" => Some(self.dual_rsdl),
            "EpsPrimal" => Some(self.eps_primal),
            "EpsDual" => Some(self.eps_dual),
            "Rho" => Some(self.rho),
            "Time" => Some(self.time),
            _ => self
                .extra
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| *v),
        }
    }
}

/// A tagged statistics value in a combined record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum StatValue {
    Int(usize),
    Float(f64),
    /// Field not mapped by any source, or mapped to an unavailable value.
    Empty,
}

/// Source selector for one field of the combined statistics record.
///
/// The recorder is configured with an ordered list of (field name, source)
/// pairs; `Iter` and `Time` are the reserved sources for the outer iteration
/// index and elapsed time, the others pull a named field from the X-step
/// record, the D-step record, or the externally-computed evaluation list.
#[derive(Debug, Clone, Copy)]
pub enum StatsSource {
    Iter,
    Time,
    XStep(&'static str),
    DStep(&'static str),
    Eval(&'static str),
    Empty,
}

/// One immutable combined statistics record.
#[derive(Debug, Clone, Serialize)]
pub struct IterStats {
    fields: Vec<(&'static str, StatValue)>,
}

impl IterStats {
    pub fn get(&self, name: &str) -> Option<StatValue> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    pub fn fields(&self) -> &[(&'static str, StatValue)] {
        &self.fields
    }
}

/// Configuration for combined iteration statistics and status display.
///
/// Holds the field-resolution table for building one combined record per
/// outer iteration from the two sub-solver records plus evaluation results,
/// together with the display headers and the fixed-width formatting policy.
/// Display order is exactly the declared header order, independent of field
/// order.
#[derive(Debug, Clone)]
pub struct IterStatsConfig {
    /// Ordered field-resolution table: (combined field name, value source)
    fields: Vec<(&'static str, StatsSource)>,
    /// Column header titles in display order
    hdrtxt: Vec<&'static str>,
    /// Mapping from column header title to combined field name
    hdrmap: Vec<(&'static str, &'static str)>,
}

impl IterStatsConfig {
    /// Builds a recorder configuration, validating that every display column
    /// maps onto a declared field.
    pub fn new(
        fields: Vec<(&'static str, StatsSource)>,
        hdrtxt: Vec<&'static str>,
        hdrmap: Vec<(&'static str, &'static str)>,
    ) -> Result<Self, ConfigError> {
        for hdr in &hdrtxt {
            let target = hdrmap
                .iter()
                .find(|(h, _)| h == hdr)
                .map(|(_, f)| *f)
                .ok_or_else(|| ConfigError::UnknownKey {
                    path: hdr.to_string(),
                })?;
            if !fields.iter().any(|(name, _)| *name == target) {
                return Err(ConfigError::UnknownKey {
                    path: target.to_string(),
                });
            }
        }
        Ok(IterStatsConfig {
            fields,
            hdrtxt,
            hdrmap,
        })
    }

    /// The default statistics layout for dictionary learning: per-step
    /// objective, residuals and rho for both solvers, plus iteration index
    /// and elapsed time.
    pub fn standard() -> Self {
        // The table below only references declared fields, so new() cannot fail.
        IterStatsConfig::new(
            vec![
                ("Iter", StatsSource::Iter),
                ("ObjFunX", StatsSource::XStep("ObjFun")),
                ("XPrRsdl", StatsSource::XStep("PrimalRsdl")),
                ("XDlRsdl", StatsSource::XStep("DualRsdl")),
                ("XRho", StatsSource::XStep("Rho")),
                ("ObjFunD", StatsSource::DStep("ObjFun")),
                ("DPrRsdl", StatsSource::DStep("PrimalRsdl")),
                ("DDlRsdl", StatsSource::DStep("DualRsdl")),
                ("DRho", StatsSource::DStep("Rho")),
                ("Time", StatsSource::Time),
            ],
            vec![
                "Itn", "FncX", "r_X", "s_X", "rho_X", "FncD", "r_D", "s_D", "rho_D",
            ],
            vec![
                ("Itn", "Iter"),
                ("FncX", "ObjFunX"),
                ("r_X", "XPrRsdl"),
                ("s_X", "XDlRsdl"),
                ("rho_X", "XRho"),
                ("FncD", "ObjFunD"),
                ("r_D", "DPrRsdl"),
                ("s_D", "DDlRsdl"),
                ("rho_D", "DRho"),
            ],
        )
        .expect("standard stats layout is self-consistent")
    }

    /// Constructs one combined record by resolving every declared field from
    /// its source. Fields whose source record is absent, or whose named
    /// value is unavailable, resolve to `StatValue::Empty`.
    pub fn build(
        &self,
        iter: usize,
        time: f64,
        x_stats: Option<&SolverStats>,
        d_stats: Option<&SolverStats>,
        eval: &[(&'static str, f64)],
    ) -> IterStats {
        let fields = self
            .fields
            .iter()
            .map(|(name, source)| {
                let value = match source {
                    StatsSource::Iter => StatValue::Int(iter),
                    StatsSource::Time => StatValue::Float(time),
                    StatsSource::XStep(field) => x_stats
                        .and_then(|s| s.field(field))
                        .map(StatValue::Float)
                        .unwrap_or(StatValue::Empty),
                    StatsSource::DStep(field) => d_stats
                        .and_then(|s| s.field(field))
                        .map(StatValue::Float)
                        .unwrap_or(StatValue::Empty),
                    StatsSource::Eval(label) => eval
                        .iter()
                        .find(|(n, _)| n == label)
                        .map(|(_, v)| StatValue::Float(*v))
                        .unwrap_or(StatValue::Empty),
                    StatsSource::Empty => StatValue::Empty,
                };
                (*name, value)
            })
            .collect();
        IterStats { fields }
    }

    fn column_width(&self, hdr: &str) -> usize {
        // The iteration column is narrow; every other column is sized for
        // fixed-precision scientific notation.
        let is_iter = self
            .hdrmap
            .iter()
            .find(|(h, _)| *h == hdr)
            .map(|(_, f)| {
                self.fields
                    .iter()
                    .any(|(name, source)| name == f && matches!(source, StatsSource::Iter))
            })
            .unwrap_or(false);
        if is_iter {
            FWITER
        } else {
            (FPOTHR + 6).max(hdr.len())
        }
    }

    /// Formats the status display header line.
    pub fn header(&self) -> String {
        self.hdrtxt
            .iter()
            .map(|hdr| format!("{:>width$}", hdr, width = self.column_width(hdr)))
            .collect::<Vec<_>>()
            .join("  ")
    }

    /// Separator line matching the header width.
    pub fn separator(&self) -> String {
        "-".repeat(self.header().len())
    }

    /// Formats one record as a fixed-width status line. Values are
    /// right-aligned; `Empty` values render as blank columns.
    pub fn format_stats(&self, stats: &IterStats) -> String {
        self.hdrtxt
            .iter()
            .map(|hdr| {
                let width = self.column_width(hdr);
                let value = self
                    .hdrmap
                    .iter()
                    .find(|(h, _)| h == hdr)
                    .and_then(|(_, field)| stats.get(field))
                    .unwrap_or(StatValue::Empty);
                match value {
                    StatValue::Int(i) => format!("{:>width$}", i, width = width),
                    StatValue::Float(v) => {
                        format!("{:>width$.prec$e}", v, width = width, prec = FPOTHR)
                    }
                    StatValue::Empty => " ".repeat(width),
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    }

    pub fn print_header(&self) {
        println!("{}", self.header());
        self.print_separator();
    }

    pub fn print_separator(&self) {
        println!("{}", self.separator());
    }

    pub fn print_stats(&self, stats: &IterStats) {
        println!("{}", self.format_stats(stats));
    }
}
