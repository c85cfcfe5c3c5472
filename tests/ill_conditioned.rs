#![allow(non_snake_case)]

use lorentz::{algebra::*, solver::*};

// Badly scaled problems push work onto the iterative refinement of the
// KKT solves.  Equilibration is disabled so the conditioning reaches
// the factorization unsoftened.

#[test]
fn test_lp_badly_scaled_rows() {
    // min -x1 - x2  s.t.  1e6·x1 <= 1e6, 1e-6·x2 <= 1e-6
    let G = CscMatrix::from(&[
        [1e6, 0.],  //
        [0., 1e-6], //
    ]);
    let A = CscMatrix::<f64>::zeros(0, 2);
    let c = vec![-1., -1.];
    let h = vec![1e6, 1e-6];
    let b = vec![];

    let settings = SettingsBuilder::default()
        .equilibrate_enable(false)
        .build()
        .unwrap();
    let mut solver = Solver::new(&G, &A, &c, &h, &b, &[], settings).unwrap();

    solver.solve();

    assert!(matches!(
        solver.info.status,
        SolverStatus::Solved | SolverStatus::AlmostSolved
    ));
    assert!(solver.variables.x.dist(&[1., 1.]) <= 1e-4);

    // refinement stayed within its budget
    let nitref = solver.settings.nitref;
    assert!(solver.info.nitref1 <= nitref);
    assert!(solver.info.nitref2 <= nitref);
    assert!(solver.info.nitref3 <= nitref);
}

#[test]
fn test_socp_badly_scaled_cone() {
    // unit-ball problem with the cone rows scaled by 1e5
    let G = CscMatrix::from(&[
        [0., 0.],   //
        [-1e5, 0.], //
        [0., -1e5], //
    ]);
    let A = CscMatrix::<f64>::zeros(0, 2);
    let c = vec![1., 1.];
    let h = vec![1e5, 0., 0.];
    let b = vec![];

    let settings = SettingsBuilder::default()
        .equilibrate_enable(false)
        .build()
        .unwrap();
    let mut solver = Solver::new(&G, &A, &c, &h, &b, &[3], settings).unwrap();

    solver.solve();

    let r = 0.5f64.sqrt();
    assert!(matches!(
        solver.info.status,
        SolverStatus::Solved | SolverStatus::AlmostSolved
    ));
    assert!(solver.variables.x.dist(&[-r, -r]) <= 1e-4);
}

#[test]
fn test_equilibration_recovers_conditioning() {
    // same badly scaled LP, solved with equilibration on and the
    // default tolerances expected to hold fully
    let G = CscMatrix::from(&[
        [1e6, 0.],  //
        [0., 1e-6], //
    ]);
    let A = CscMatrix::<f64>::zeros(0, 2);
    let c = vec![-1., -1.];
    let h = vec![1e6, 1e-6];
    let b = vec![];

    let mut solver = Solver::new(&G, &A, &c, &h, &b, &[], Settings::default()).unwrap();

    solver.solve();

    assert_eq!(solver.info.status, SolverStatus::Solved);
    assert!(solver.variables.x.dist(&[1., 1.]) <= 1e-6);
}
