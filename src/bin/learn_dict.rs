/*
This program generates a synthetic sparse coding problem and learns a
dictionary for it with the BPDN dictionary learning solver.
*/

use std::time::Instant;

use clap::Parser;
use sparsedl_core::{
    bpdndl::BpdnDictLearn,
    config::{ConfigDict, ConfigValue, map},
    utils::{SolverError, gen_synthetic_problem},
};

/// Program to learn a dictionary from synthetically generated sparse signals.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The signal dimension (rows of D)
    #[arg(short, long, default_value_t = 64)]
    m: usize,

    /// The number of dictionary atoms (columns of D)
    #[arg(short, long, default_value_t = 128)]
    n: usize,

    /// The number of signals (columns of S)
    #[arg(short, long, default_value_t = 256)]
    k: usize,

    /// The number of non-zero coefficients per signal
    #[arg(short, long, default_value_t = 8)]
    sparsity: usize,

    /// The standard deviation of the additive noise
    #[arg(long, default_value_t = 0.01)]
    noise: f32,

    /// The L1 regularization weight
    #[arg(short, long, default_value_t = 0.1)]
    lmbda: f32,

    /// The number of outer iterations
    #[arg(short, long, default_value_t = 100)]
    iters: usize,

    /// The seed for problem generation
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output file for the coding engine's per-step timing breakdown
    #[arg(long)]
    timing_csv: Option<String>,
}

fn main() -> Result<(), SolverError> {
    let args = Args::parse();

    println!(
        "[Main] Generating {}x{} problem with {} signals...",
        args.m, args.n, args.k
    );
    let gen_start = Instant::now();
    let problem = gen_synthetic_problem(
        args.m,
        args.n,
        args.k,
        args.sparsity,
        args.noise,
        args.seed,
    );
    println!("[Main] Problem generated in {:?}", gen_start.elapsed());

    // Start from an independently seeded random dictionary.
    let d0 = gen_synthetic_problem(args.m, args.n, 1, 1, 0.0, args.seed + 1).dict;

    let opt = ConfigDict::new(
        BpdnDictLearn::default_options(),
        map([
            ("Verbose", true.into()),
            ("MaxMainIter", args.iters.into()),
            (
                "BPDN",
                ConfigValue::Map(map([("Rho", (50.0 * args.lmbda as f64 + 1.0).into())])),
            ),
        ]),
    )?;

    let mut learner = BpdnDictLearn::new(&d0, problem.signal.clone(), args.lmbda, &opt)?;

    let solve_start = Instant::now();
    learner.solve()?;
    println!("[Main] Learning complete in {:?}", solve_start.elapsed());

    let residual = (learner.dict() * learner.coef() - &problem.signal).norm();
    let nnz = learner.coef().iter().filter(|x| **x != 0.0).count();
    println!("[Main] Final reconstruction residual: {:.4e}", residual);
    println!(
        "[Main] Non-zero coefficients: {} / {}",
        nnz,
        args.n * args.k
    );

    if let Some(path) = &args.timing_csv {
        learner.xstep().timing().write_step_timings_to_csv(path)?;
        println!("[Main] Coding step timings written to {}", path);
    }

    Ok(())
}
