#![allow(non_snake_case)]

use lorentz::{algebra::*, solver::*};

#[test]
fn test_lp_feasible() {
    // min -x1 - x2  s.t.  x <= 1 componentwise
    let G = CscMatrix::<f64>::identity(2);
    let A = CscMatrix::<f64>::zeros(0, 2);
    let c = vec![-1., -1.];
    let h = vec![1., 1.];
    let b = vec![];

    let settings = Settings::default();
    let mut solver = Solver::new(&G, &A, &c, &h, &b, &[], settings).unwrap();

    solver.solve();

    assert_eq!(solver.info.status, SolverStatus::Solved);
    assert!(solver.variables.x.dist(&[1., 1.]) <= 1e-6);
    assert!((solver.info.pcost - (-2.)).abs() <= 1e-6);
    assert!(solver.info.pres < 1e-8);
    assert!(solver.info.dres < 1e-8);

    // primal feasibility in the original data: Gx + s = h with s >= 0.
    // G is the identity here, so the check is elementwise
    for i in 0..2 {
        let ri = h[i] - solver.variables.x[i] - solver.variables.s[i];
        assert!(ri.abs() <= 1e-7);
        assert!(solver.variables.s[i] >= -1e-9);
    }
}

#[test]
fn test_lp_with_equalities() {
    // min x2  s.t.  x1 + x2 = 1, x >= 0
    let G = CscMatrix::<f64>::from(&[
        [-1., 0.], //
        [0., -1.], //
    ]);
    let A = CscMatrix::<f64>::from(&[[1., 1.]]);
    let c = vec![0., 1.];
    let h = vec![0., 0.];
    let b = vec![1.];

    let settings = Settings::default();
    let mut solver = Solver::new(&G, &A, &c, &h, &b, &[], settings).unwrap();

    solver.solve();

    assert_eq!(solver.info.status, SolverStatus::Solved);
    assert!(solver.variables.x.dist(&[1., 0.]) <= 1e-6);
    assert!(solver.info.pcost.abs() <= 1e-6);

    // equality feasibility in the original data
    let ax = solver.variables.x[0] + solver.variables.x[1];
    assert!((ax - 1.).abs() <= 1e-7);
}

#[test]
fn test_lp_iteration_limit() {
    let G = CscMatrix::<f64>::identity(2);
    let A = CscMatrix::<f64>::zeros(0, 2);
    let c = vec![-1., -1.];
    let h = vec![1., 1.];
    let b = vec![];

    let settings = SettingsBuilder::default().maxit(0).build().unwrap();
    let mut solver = Solver::new(&G, &A, &c, &h, &b, &[], settings).unwrap();

    solver.solve();

    assert_eq!(solver.info.status, SolverStatus::MaxIterations);
}

#[test]
fn test_solve_is_single_shot() {
    let G = CscMatrix::<f64>::identity(2);
    let A = CscMatrix::<f64>::zeros(0, 2);
    let c = vec![-1., -1.];
    let h = vec![1., 1.];
    let b = vec![];

    let mut solver = Solver::new(&G, &A, &c, &h, &b, &[], Settings::default()).unwrap();

    solver.solve();
    let x_first = solver.variables.x.clone();
    let iters = solver.info.iter;

    // a second call must leave the result untouched
    solver.solve();
    assert_eq!(solver.variables.x, x_first);
    assert_eq!(solver.info.iter, iters);
}
