use sparsedl_core::bpdn::Bpdn;
use sparsedl_core::bpdndl::BpdnDictLearn;
use sparsedl_core::config::{ConfigDict, ConfigError, ConfigValue, map};
use sparsedl_core::solver::AdmmSolver;
use sparsedl_core::stats::StatValue;
use sparsedl_core::utils::gen_synthetic_problem;

fn learner_options(iters: usize) -> ConfigDict {
    ConfigDict::new(
        BpdnDictLearn::default_options(),
        map([("MaxMainIter", iters.into())]),
    )
    .unwrap()
}

#[test]
fn sparse_coding_with_the_true_dictionary_reconstructs_the_signals() {
    let problem = gen_synthetic_problem(16, 24, 32, 3, 0.0, 5);
    let signal_norm = problem.signal.norm();

    let opt = ConfigDict::new(
        Bpdn::default_options(),
        map([
            ("MaxMainIter", 500usize.into()),
            ("AbsStopTol", 1e-5.into()),
        ]),
    )
    .unwrap();
    let coding = Bpdn::new(problem.dict.clone(), problem.signal.clone(), 0.01).unwrap();
    let mut solver = AdmmSolver::new(coding, &opt).unwrap();
    solver.solve().unwrap();

    let residual = (&problem.dict * solver.result() - &problem.signal).norm();
    assert!(
        residual < 0.1 * signal_norm,
        "residual {} vs signal norm {}",
        residual,
        signal_norm
    );

    // Soft thresholding keeps the coefficient estimate genuinely sparse.
    let nnz = solver.result().iter().filter(|x| **x != 0.0).count();
    assert!(nnz < 24 * 32);
}

#[test]
fn learning_reduces_the_reconstruction_error() {
    let problem = gen_synthetic_problem(12, 18, 48, 3, 0.0, 11);
    let d0 = gen_synthetic_problem(12, 18, 1, 1, 0.0, 12).dict;

    let mut learner =
        BpdnDictLearn::new(&d0, problem.signal.clone(), 0.02, &learner_options(50)).unwrap();
    learner.solve().unwrap();

    let residual = (learner.dict() * learner.coef() - &problem.signal).norm();
    assert!(
        residual < 0.5 * problem.signal.norm(),
        "residual {} vs signal norm {}",
        residual,
        problem.signal.norm()
    );
    for col in learner.dict().column_iter() {
        assert!((col.norm() - 1.0).abs() < 1e-4);
    }
}

#[test]
fn outer_solve_resumes_with_contiguous_iteration_indices() {
    let problem = gen_synthetic_problem(6, 8, 10, 2, 0.0, 17);
    let d0 = gen_synthetic_problem(6, 8, 1, 1, 0.0, 18).dict;

    let mut learner =
        BpdnDictLearn::new(&d0, problem.signal, 0.05, &learner_options(5)).unwrap();
    learner.solve().unwrap();
    assert_eq!(learner.iterations(), 5);
    learner.solve().unwrap();
    assert_eq!(learner.iterations(), 10);

    for (i, record) in learner.itstat().iter().enumerate() {
        assert_eq!(record.get("Iter"), Some(StatValue::Int(i)));
    }
}

#[test]
fn objective_is_split_into_fidelity_and_regularization_terms() {
    let problem = gen_synthetic_problem(6, 8, 10, 2, 0.0, 23);
    let d0 = gen_synthetic_problem(6, 8, 1, 1, 0.0, 24).dict;
    let lmbda = 0.05f64;

    let mut learner =
        BpdnDictLearn::new(&d0, problem.signal, lmbda as f32, &learner_options(10)).unwrap();
    learner.solve().unwrap();

    for record in learner.itstat() {
        let (obj, dfid, regl1) = match (
            record.get("ObjFun"),
            record.get("DFid"),
            record.get("RegL1"),
        ) {
            (
                Some(StatValue::Float(o)),
                Some(StatValue::Float(d)),
                Some(StatValue::Float(r)),
            ) => (o, d, r),
            other => panic!("incomplete objective columns: {:?}", other),
        };
        assert!((obj - (dfid + lmbda * regl1)).abs() < 1e-4 * obj.abs().max(1.0));
    }
}

#[test]
fn misspelled_option_keys_are_rejected_with_their_full_path() {
    let err = ConfigDict::new(
        BpdnDictLearn::default_options(),
        map([(
            "BPDN",
            ConfigValue::Map(map([(
                "AutoRho",
                ConfigValue::Map(map([("Perod", 5usize.into())])),
            )])),
        )]),
    )
    .unwrap_err();

    match err {
        ConfigError::UnknownKey { path } => assert_eq!(path, "BPDN.AutoRho.Perod"),
        other => panic!("unexpected error: {:?}", other),
    }
}
