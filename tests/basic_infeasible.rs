#![allow(non_snake_case)]

use lorentz::{algebra::*, solver::*};

#[test]
fn test_lp_primal_infeasible() {
    // x <= -1 and -x <= -1 cannot both hold
    let G = CscMatrix::from(&[
        [1.],  //
        [-1.], //
    ]);
    let A = CscMatrix::<f64>::zeros(0, 1);
    let c = vec![1.];
    let h = vec![-1., -1.];
    let b = vec![];

    let settings = Settings::default();
    let mut solver = Solver::new(&G, &A, &c, &h, &b, &[], settings).unwrap();

    solver.solve();

    assert!(matches!(
        solver.info.status,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible
    ));
    assert!(solver.info.pinf);
    assert!(solver.info.pinfres.unwrap() < 1e-4);
}

#[test]
fn test_lp_dual_infeasible() {
    // min -x  s.t. x >= 0 is unbounded below
    let G = CscMatrix::from(&[[-1.]]);
    let A = CscMatrix::<f64>::zeros(0, 1);
    let c = vec![-1.];
    let h = vec![0.];
    let b = vec![];

    let settings = Settings::default();
    let mut solver = Solver::new(&G, &A, &c, &h, &b, &[], settings).unwrap();

    solver.solve();

    assert!(matches!(
        solver.info.status,
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible
    ));
    assert!(solver.info.dinf);
    assert!(solver.info.dinfres.unwrap() < 1e-4);
}

#[test]
fn test_eq_constrained_primal_infeasible() {
    // x1 + x2 = -1 with x >= 0 is infeasible
    let G = CscMatrix::from(&[
        [-1., 0.], //
        [0., -1.], //
    ]);
    let A = CscMatrix::from(&[[1., 1.]]);
    let c = vec![1., 1.];
    let h = vec![0., 0.];
    let b = vec![-1.];

    let settings = Settings::default();
    let mut solver = Solver::new(&G, &A, &c, &h, &b, &[], settings).unwrap();

    solver.solve();

    assert!(matches!(
        solver.info.status,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible
    ));
}
