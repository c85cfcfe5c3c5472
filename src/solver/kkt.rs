#![allow(non_snake_case)]

use super::cones::{Cone, ConeSet, SupportedCone};
use super::problemdata::ProblemData;
use super::settings::Settings;
use crate::algebra::*;
use crate::ldl::*;
use std::iter::zip;

// ---------------------------------------------------------
// KKT system assembly, numeric updates, and solves with
// iterative refinement.
//
// The KKT matrix is
//
//        [ δI    A'         G'_exp ]
//    K = [  ·   −δI             0  ]
//        [  ·     ·     −V − δI    ]
//
// held in upper-triangular CSC form, where G'_exp pads each
// second-order cone column group with the two expansion columns of
// the sparse scaling representation, and V is the expanded product
// cone scaling W².  The pattern is fixed for the life of the solver;
// each iteration rewrites the scaling block values and refactors.
// ---------------------------------------------------------

// indices of the updatable entries in K.nzval
struct KKTMap {
    // the full structural diagonal
    diag: Vec<usize>,
    // per-SOC entries of the v and u expansion columns
    soc_v: Vec<Vec<usize>>,
    soc_u: Vec<Vec<usize>>,
}

type BoxedDirectLdlSolver<T> = Box<dyn DirectLdlSolver<T> + Send>;

pub(crate) struct KKTSystem<T> {
    // problem dimensions
    n: usize,
    p: usize,
    dimK: usize,

    // unpermuted KKT matrix
    K: CscMatrix<T>,
    map: KKTMap,

    // expected signs of D in K = LDL', used by the factorization's
    // dynamic regularization
    dsigns: Vec<i8>,

    // the direct LDL solver engine
    ldl: BoxedDirectLdlSolver<T>,

    // solution and iterative refinement workspace
    x: Vec<T>,
    work_e: Vec<T>,
    work_dx: Vec<T>,
    work_m: Vec<T>,
}

impl<T> KKTSystem<T>
where
    T: FloatT,
{
    pub fn new(data: &ProblemData<T>, cones: &ConeSet<T>, settings: &Settings<T>) -> Self {
        let (n, p, m) = (data.n, data.p, data.m);
        let me = cones.numel_expanded();
        let dimK = n + p + me;

        let (K, map) = _assemble_kkt(data, cones, dimK, settings.delta);

        let dsigns = _fill_signs(n, p, cones, dimK);

        let ldl = _get_ldl_solver(&K, &dsigns, settings);

        Self {
            n,
            p,
            dimK,
            K,
            map,
            dsigns,
            ldl,
            x: vec![T::zero(); dimK],
            work_e: vec![T::zero(); dimK],
            work_dx: vec![T::zero(); dimK],
            work_m: vec![T::zero(); m],
        }
    }

    pub fn dim(&self) -> usize {
        self.dimK
    }

    /// Rewrites the scaling block of K from the current cone scalings
    /// and refactors.  Returns false on factorization failure.
    pub fn update(&mut self, cones: &ConeSet<T>, settings: &Settings<T>) -> bool {
        let δ = settings.delta;
        let map = &self.map;
        let K = &mut self.K;

        let mut idx = self.n + self.p; //cursor into the diagonal map
        let mut ci = 0; //second-order cone counter

        for cone in cones.iter() {
            match cone {
                SupportedCone::NonnegativeCone(c) => {
                    for &vi in c.v.iter() {
                        K.nzval[map.diag[idx]] = -vi - δ;
                        idx += 1;
                    }
                }
                SupportedCone::SecondOrderCone(c) => {
                    let η2 = c.η2;

                    // D block: diag(d1, 1, …, 1) scaled by −η²
                    K.nzval[map.diag[idx]] = -η2 * c.d1 - δ;
                    idx += 1;
                    for _ in 1..c.dim {
                        K.nzval[map.diag[idx]] = -η2 - δ;
                        idx += 1;
                    }

                    // v column and its (negative) slot diagonal
                    for (&kidx, &qk) in zip(&map.soc_v[ci], &c.q) {
                        K.nzval[kidx] = -η2 * c.v1 * qk;
                    }
                    K.nzval[map.diag[idx]] = -(η2 + δ);
                    idx += 1;

                    // u column and its (positive) slot diagonal
                    let ucol = &map.soc_u[ci];
                    K.nzval[ucol[0]] = -η2 * c.u0;
                    for (&kidx, &qk) in zip(&ucol[1..], &c.q) {
                        K.nzval[kidx] = -η2 * c.u1 * qk;
                    }
                    K.nzval[map.diag[idx]] = η2 + δ;
                    idx += 1;

                    ci += 1;
                }
            }
        }

        self.ldl.factor(&self.K)
    }

    /// Solves KΔ = rhs with iterative refinement against the
    /// un-expanded KKT operator, extracting (dx, dy, dz) with the
    /// expansion slots stripped.  Returns the number of refinement
    /// steps retained.
    ///
    /// During initialization the scaling block is the identity and the
    /// `initialize` flag selects the plain `ez += Δz` residual form.
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &mut self,
        dx: &mut [T],
        dy: &mut [T],
        dz: &mut [T],
        rhs: &[T],
        data: &ProblemData<T>,
        cones: &ConeSet<T>,
        initialize: bool,
        settings: &Settings<T>,
    ) -> u32 {
        let (n, p) = (self.n, self.p);
        let one = T::one();
        let δ = settings.delta;

        self.ldl.solve(&mut self.x, rhs);

        let errtol = (one + rhs.norm_inf()) * settings.linsysacc;
        let mut nerr_prev = T::max_value();
        let mut nref = 0u32;

        for k in 0..=settings.nitref {
            _extract_solution(dx, dy, dz, &self.x, cones, n, p);

            // residuals against the un-expanded representation
            let (ex, rest) = self.work_e.split_at_mut(n);
            let (ey, ez) = rest.split_at_mut(p);

            // ex = bx − A'dy − G'dz − δdx
            ex.copy_from(&rhs[0..n]);
            data.A.t().gemv(ex, dy, -one, one);
            data.G.t().gemv(ex, dz, -one, one);
            ex.axpby(-δ, dx, one);

            // ey = by − Adx + δdy
            ey.copy_from(&rhs[n..n + p]);
            data.A.gemv(ey, dx, -one, one);
            ey.axpby(δ, dy, one);

            // ez = bz − Gdx + VΔz − δdz, all in the expanded layout.
            // The expansion slot entries of bz are always zero
            ez.copy_from(&rhs[n + p..]);
            data.G.gemv(&mut self.work_m, dx, one, T::zero());
            for (rng, erng) in zip(cones.rng_cones.iter(), cones.rng_expanded.iter()) {
                ez[erng.clone()].axpby(-one, &self.work_m[rng.clone()], one);
            }
            if initialize {
                ez.axpby(one, &self.x[n + p..], one);
            } else {
                cones.scale2add(ez, &self.x[n + p..]);
            }
            for (rng, erng) in zip(cones.rng_cones.iter(), cones.rng_expanded.iter()) {
                ez[erng.clone()].axpby(-δ, &dz[rng.clone()], one);
            }

            let nerr = T::max(ex.norm_inf(), T::max(ey.norm_inf(), ez.norm_inf()));

            // a refinement step that increased the error is undone,
            // not counted, and ends the refinement
            if k > 0 && nerr > nerr_prev {
                self.x.axpby(-one, &self.work_dx, one);
                nref = nref.saturating_sub(1);
                break;
            }

            // converged, out of budget, or stagnated
            if k == settings.nitref
                || nerr < errtol
                || (k > 0 && nerr_prev < settings.irerrfact * nerr)
            {
                break;
            }
            nerr_prev = nerr;

            self.ldl.solve(&mut self.work_dx, &self.work_e);
            self.x.axpby(one, &self.work_dx, one);
            nref += 1;
        }

        _extract_solution(dx, dy, dz, &self.x, cones, n, p);
        nref
    }
}

fn _extract_solution<T: FloatT>(
    dx: &mut [T],
    dy: &mut [T],
    dz: &mut [T],
    x: &[T],
    cones: &ConeSet<T>,
    n: usize,
    p: usize,
) {
    dx.copy_from(&x[0..n]);
    dy.copy_from(&x[n..n + p]);
    cones.from_expanded(dz, &x[n + p..]);
}

fn _get_ldl_solver<T: FloatT>(
    K: &CscMatrix<T>,
    dsigns: &[i8],
    settings: &Settings<T>,
) -> BoxedDirectLdlSolver<T> {
    match settings.direct_solve_method.as_str() {
        "qdldl" => {
            let opts = LdlSettingsBuilder::<T>::default()
                .dsigns(dsigns.to_vec())
                .build()
                .unwrap();
            Box::new(LdlFactorization::<T>::new(K, Some(opts)).unwrap())
        }
        _ => {
            panic!("Unrecognized LDL solver type");
        }
    }
}

// expected signs of the LDL' diagonal: positive for the variable
// block, negative for the equality and scaling blocks, except that
// each cone's u expansion slot carries a positive diagonal
fn _fill_signs<T: FloatT>(n: usize, p: usize, cones: &ConeSet<T>, dimK: usize) -> Vec<i8> {
    let mut signs = vec![1i8; dimK];
    signs[n..(n + p)].fill(-1);

    let mut idx = n + p;
    for cone in cones.iter() {
        match cone {
            SupportedCone::NonnegativeCone(c) => {
                signs[idx..idx + c.numel()].fill(-1);
                idx += c.numel();
            }
            SupportedCone::SecondOrderCone(c) => {
                signs[idx..idx + c.dim + 1].fill(-1);
                signs[idx + c.dim + 1] = 1;
                idx += c.dim + 2;
            }
        }
    }
    signs
}

fn _assemble_kkt<T: FloatT>(
    data: &ProblemData<T>,
    cones: &ConeSet<T>,
    dimK: usize,
    δ: T,
) -> (CscMatrix<T>, KKTMap) {
    let (n, p, m) = (data.n, data.p, data.m);
    let (A, G) = (&data.A, &data.G);

    // destination columns of A' and of G', the latter skipping over
    // the expansion columns of each preceding cone
    let acolmap: Vec<usize> = (n..n + p).collect();
    let mut zcolmap = vec![0usize; m];
    for (rng, erng) in zip(cones.rng_cones.iter(), cones.rng_expanded.iter()) {
        for (i, j) in zip(rng.clone(), erng.clone()) {
            zcolmap[i] = n + p + j;
        }
    }

    let nnz_expansion: usize = data.soc_dims.iter().map(|d| 2 * d - 1).sum();
    let nnzK = A.nnz() + G.nnz() + dimK + nnz_expansion;

    let mut K = CscMatrix::<T>::spalloc(dimK, dimK, nnzK);

    // counting pass
    K.colptr.fill(0);
    K.colcount_block_t(A, &acolmap);
    K.colcount_block_t(G, &zcolmap);
    for (cone, erng) in zip(cones.iter(), cones.rng_expanded.iter()) {
        if let SupportedCone::SecondOrderCone(c) = cone {
            let base = n + p + erng.start;
            K.colcount_colvec(c.dim - 1, base + c.dim);
            K.colcount_colvec(c.dim, base + c.dim + 1);
        }
    }
    K.colcount_diag(0, dimK);
    K.colcount_to_colptr();

    // filling pass.  Off-diagonal blocks first, then the structural
    // diagonal, so that each column is filled in ascending row order
    K.fill_block_t(A, &acolmap);
    K.fill_block_t(G, &zcolmap);

    let mut soc_v: Vec<Vec<usize>> = Vec::with_capacity(cones.nsoc());
    let mut soc_u: Vec<Vec<usize>> = Vec::with_capacity(cones.nsoc());
    for (cone, erng) in zip(cones.iter(), cones.rng_expanded.iter()) {
        if let SupportedCone::SecondOrderCone(c) = cone {
            let base = n + p + erng.start;
            let mut vmap = vec![0usize; c.dim - 1];
            let mut umap = vec![0usize; c.dim];
            K.fill_colvec(&mut vmap, base + 1, base + c.dim);
            K.fill_colvec(&mut umap, base, base + c.dim + 1);
            soc_v.push(vmap);
            soc_u.push(umap);
        }
    }

    let mut diag = vec![0usize; dimK];
    K.fill_diag(&mut diag, 0);
    K.backshift_colptrs();

    // static values of the (1,1) and (2,2) regularization blocks, and
    // identity scaling values everywhere in the (3,3) block so that the
    // matrix is factorizable before the first scaling update
    for &di in &diag[0..n] {
        K.nzval[di] = δ;
    }
    for &di in &diag[n..n + p] {
        K.nzval[di] = -δ;
    }
    let mut idx = n + p;
    for cone in cones.iter() {
        match cone {
            SupportedCone::NonnegativeCone(c) => {
                for _ in 0..c.numel() {
                    K.nzval[diag[idx]] = -T::one() - δ;
                    idx += 1;
                }
            }
            SupportedCone::SecondOrderCone(c) => {
                for _ in 0..c.dim {
                    K.nzval[diag[idx]] = -T::one() - δ;
                    idx += 1;
                }
                K.nzval[diag[idx]] = -(T::one() + δ);
                idx += 1;
                K.nzval[diag[idx]] = T::one() + δ;
                idx += 1;
            }
        }
    }

    (K, KKTMap { diag, soc_v, soc_u })
}

// -------------
// testing

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SettingsBuilder;

    fn test_problem() -> (ProblemData<f64>, ConeSet<f64>) {
        // n = 2, one equality, orthant of dim 1 and one SOC of dim 2
        let A = CscMatrix::from(&[[1., 2.]]);
        let G = CscMatrix::from(&[
            [1., 0.], //
            [0., 1.], //
            [1., 1.], //
        ]);
        let c = [1., 1.];
        let h = [1., 1., 1.];
        let b = [1.];

        let data = ProblemData::new(&G, &A, &c, &h, &b, &[2]).unwrap();
        let cones = ConeSet::new(data.l, &data.soc_dims);
        (data, cones)
    }

    #[test]
    fn test_assembled_pattern() {
        let (data, cones) = test_problem();
        let δ = 0.25; //large dummy regularization, easy to spot
        let settings = SettingsBuilder::default().delta(δ).build().unwrap();

        let kkt = KKTSystem::new(&data, &cones, &settings);

        assert_eq!(kkt.dim(), 2 + 1 + 3 + 2);
        assert!(kkt.K.check_format().is_ok());
        assert!(kkt.K.is_triu());

        //identity-scaling values straight out of assembly
        let target = CscMatrix::from(&[
            [δ, 0., 1., 1., 0., 1., 0., 0.],
            [0., δ, 2., 0., 1., 1., 0., 0.],
            [0., 0., -δ, 0., 0., 0., 0., 0.],
            [0., 0., 0., -1. - δ, 0., 0., 0., 0.],
            [0., 0., 0., 0., -1. - δ, 0., 0., 0.],
            [0., 0., 0., 0., 0., -1. - δ, 0., 0.],
            [0., 0., 0., 0., 0., 0., -1. - δ, 0.],
            [0., 0., 0., 0., 0., 0., 0., 1. + δ],
        ]);

        //identical values at identical positions, modulo the explicit
        //structural zeros our assembly keeps for the expansion columns
        let mut dense = vec![vec![0.; 8]; 8];
        for col in 0..8 {
            for idx in kkt.K.colptr[col]..kkt.K.colptr[col + 1] {
                dense[kkt.K.rowval[idx]][col] = kkt.K.nzval[idx];
            }
        }
        for col in 0..8 {
            for row in 0..8 {
                let mut tval = 0.;
                for idx in target.colptr[col]..target.colptr[col + 1] {
                    if target.rowval[idx] == row {
                        tval = target.nzval[idx];
                    }
                }
                assert!((dense[row][col] - tval).abs() <= 1e-15);
            }
        }

        //the v column holds d-1 = 1 entry, the u column d = 2
        assert_eq!(kkt.map.soc_v[0].len(), 1);
        assert_eq!(kkt.map.soc_u[0].len(), 2);

        //expected pivot signs: variables positive, equalities and
        //scaling blocks negative, with the u expansion slot positive
        assert_eq!(kkt.dsigns, vec![1, 1, -1, -1, -1, -1, -1, 1]);
    }

    #[test]
    fn test_solve_with_refinement() {
        let (data, mut cones) = test_problem();

        //zero static regularization so that the expanded matrix is
        //exactly the operator the refinement residual works against
        let settings = SettingsBuilder::default().delta(0.).build().unwrap();

        //scaling at a strictly interior point
        let s = vec![1.5, 2.0, 0.5];
        let z = vec![0.8, 1.5, -0.3];
        assert!(cones.update_scaling(&s, &z));

        let mut kkt = KKTSystem::new(&data, &cones, &settings);
        assert!(kkt.update(&cones, &settings));

        let rhs = vec![0.5, -1., 2., 1., -2., 0.7, 0., 0.];
        let (mut dx, mut dy, mut dz) = (vec![0.; 2], vec![0.; 1], vec![0.; 3]);

        kkt.solve(
            &mut dx, &mut dy, &mut dz, &rhs, &data, &cones, false, &settings,
        );

        //the un-expanded residual is small after refinement
        let one = 1.0;
        let δ = settings.delta;

        let mut ex = rhs[0..2].to_vec();
        data.A.t().gemv(&mut ex, &dy, -one, one);
        data.G.t().gemv(&mut ex, &dz, -one, one);
        ex.axpby(-δ, &dx, one);

        let mut ey = rhs[2..3].to_vec();
        data.A.gemv(&mut ey, &dx, -one, one);
        ey.axpby(δ, &dy, one);

        let mut ez = rhs[3..8].to_vec();
        let mut gdx = vec![0.; 3];
        data.G.gemv(&mut gdx, &dx, one, 0.);
        for (rng, erng) in zip(cones.rng_cones.iter(), cones.rng_expanded.iter()) {
            ez[erng.clone()].axpby(-one, &gdx[rng.clone()], one);
        }
        cones.scale2add(&mut ez, &kkt.x[3..8]);
        for (rng, erng) in zip(cones.rng_cones.iter(), cones.rng_expanded.iter()) {
            ez[erng.clone()].axpby(-δ, &dz[rng.clone()], one);
        }

        assert!(ex.norm_inf() <= 1e-10);
        assert!(ey.norm_inf() <= 1e-10);
        assert!(ez.norm_inf() <= 1e-10);

        //the un-expanded residual must agree with the residual of the
        //expanded matrix itself: e = rhs − K·Δ from the assembled triu K
        let mut e = rhs.clone();
        kkt.K.sym().symv(&mut e, &kkt.x, -one, one);

        let unexpanded: Vec<f64> = ex.iter().chain(&ey).chain(&ez).copied().collect();
        assert!(e.dist(&unexpanded) <= 1e-12);
    }
}
