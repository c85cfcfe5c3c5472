#![allow(non_snake_case)]

use super::cones::ConeSet;
use super::info::{SolveInfo, SolverStatus, ToleranceMode};
use super::info_print;
use super::kkt::KKTSystem;
use super::problemdata::{ProblemData, SolverError};
use super::residuals::Residuals;
use super::settings::Settings;
use super::variables::Variables;
use crate::algebra::*;

// ---------------------------------
// top level solver container type
// ---------------------------------

/// Interior-point solver for the conic program
///
/// ```text
/// minimize    c'x
/// subject to  Ax = b
///             Gx + s = h,  s ∈ R₊ˡ × Q^{d₁} × … × Q^{dₖ}
/// ```
///
/// The first `l` rows of G correspond to the orthant, the remaining
/// rows to the second-order cones in the order of `soc_dims`.
///
/// A solve runs a homogeneous self-dual predictor-corrector iteration
/// and leaves the backscaled solution in [`variables`](Solver::variables)
/// and the termination data in [`info`](Solver::info).  Solves are
/// single-shot: a solver instance is consumed by its `solve` call.
pub struct Solver<T = f64>
where
    T: FloatT,
{
    /// problem data (restored to its unequilibrated form on termination)
    pub data: ProblemData<T>,
    /// iterate variables; the solution after a solve
    pub variables: Variables<T>,
    /// termination status and statistics
    pub info: SolveInfo<T>,
    /// solver settings
    pub settings: Settings<T>,

    pub(crate) cones: ConeSet<T>,
    residuals: Residuals<T>,
    kkt: KKTSystem<T>,

    //expanded right-hand sides.  rhs1 holds the static data terms,
    //rhs2 the affine / combined direction terms
    rhs1: Vec<T>,
    rhs2: Vec<T>,

    //directions from the two KKT solves of each iteration
    dx1: Vec<T>,
    dy1: Vec<T>,
    dz1: Vec<T>,
    dx2: Vec<T>,
    dy2: Vec<T>,
    dz2: Vec<T>,

    //scaled-space work vectors
    Wdz: Vec<T>,
    dsW: Vec<T>,
    ds: Vec<T>,
    ws1: Vec<T>,
    ws2: Vec<T>,
}

impl<T> Solver<T>
where
    T: FloatT,
{
    /// Creates a solver for the given problem data.  Validates the data
    /// and performs all setup work that is independent of the iterates:
    /// Ruiz equilibration, cone construction, KKT assembly and symbolic
    /// factorization.
    pub fn new(
        G: &CscMatrix<T>,
        A: &CscMatrix<T>,
        c: &[T],
        h: &[T],
        b: &[T],
        soc_dims: &[usize],
        settings: Settings<T>,
    ) -> Result<Self, SolverError> {
        let mut data = ProblemData::new(G, A, c, h, b, soc_dims)?;
        let cones = ConeSet::new(data.l, &data.soc_dims);

        data.equilibrate(&cones, &settings);

        let kkt = KKTSystem::new(&data, &cones, &settings);
        let dimK = kkt.dim();

        let (n, p, m) = (data.n, data.p, data.m);

        Ok(Self {
            variables: Variables::new(n, p, m),
            residuals: Residuals::new(n, p, m),
            info: SolveInfo::new(),
            kkt,
            cones,
            settings,
            data,
            rhs1: vec![T::zero(); dimK],
            rhs2: vec![T::zero(); dimK],
            dx1: vec![T::zero(); n],
            dy1: vec![T::zero(); p],
            dz1: vec![T::zero(); m],
            dx2: vec![T::zero(); n],
            dy2: vec![T::zero(); p],
            dz2: vec![T::zero(); m],
            Wdz: vec![T::zero(); m],
            dsW: vec![T::zero(); m],
            ds: vec![T::zero(); m],
            ws1: vec![T::zero(); m],
            ws2: vec![T::zero(); m],
        })
    }

    /// Runs the interior-point iteration to termination.
    pub fn solve(&mut self) {
        if self.info.status != SolverStatus::Unsolved {
            return;
        }

        info_print::print_banner(&self.settings, &self.data, &self.cones);

        let (n, p) = (self.data.n, self.data.p);
        let one = T::one();

        // the objective is equilibrated here rather than in setup, and
        // restored together with the other data on termination
        self.data.c.hadamard_div(&self.data.equilibration.x_equil);
        self.residuals.set_data_norms(&self.data);

        // rhs1 = [0; b; h], with h in the expanded layout
        self.rhs1.fill(T::zero());
        self.rhs1[n..n + p].copy_from(&self.data.b);
        self.cones
            .to_expanded(&mut self.rhs1[n + p..], &self.data.h);

        // rhs2 = [-c; 0; 0]
        self.rhs2.fill(T::zero());
        self.rhs2[0..n].scalarop_from(|c| -c, &self.data.c);

        // identity scaling and first factorization
        self.cones.set_identity_scaling();
        if !self.kkt.update(&self.cones, &self.settings) {
            self.finish(SolverStatus::NumericalError);
            return;
        }

        // initial primal point: x from the least-squares-like solve
        // against [0; b; h], and s = bring_to_cone(-dz)
        self.kkt.solve(
            &mut self.dx1,
            &mut self.dy1,
            &mut self.dz1,
            &self.rhs1,
            &self.data,
            &self.cones,
            true,
            &self.settings,
        );
        self.variables.x.copy_from(&self.dx1);
        self.variables.s.scalarop_from(|v| -v, &self.dz1);
        self.cones.shift_to_cone(&mut self.variables.s);

        // initial dual point: (y, z) against [-c; 0; 0], with
        // z = bring_to_cone(dz)
        self.kkt.solve(
            &mut self.dx2,
            &mut self.dy2,
            &mut self.dz2,
            &self.rhs2,
            &self.data,
            &self.cones,
            true,
            &self.settings,
        );
        self.variables.y.copy_from(&self.dy2);
        self.variables.z.copy_from(&self.dz2);
        self.cones.shift_to_cone(&mut self.variables.z);

        self.variables.τ = one;
        self.variables.κ = one;

        // from here on the static solve uses [-c; b; h]
        self.rhs1[0..n].scalarop_from(|c| -c, &self.data.c);

        // ----------
        // main loop
        // ----------
        let mut status = SolverStatus::MaxIterations;

        for iter in 0..=self.settings.maxit {
            //residuals and statistics
            //--------------
            self.residuals.update(&self.variables, &self.data);

            let gap = self.variables.s.dot(&self.variables.z);
            self.info.update_statistics(
                &self.residuals,
                gap,
                self.variables.τ,
                self.variables.κ,
                self.cones.degree(),
                &self.settings,
            );
            self.info.iter = iter;

            info_print::print_status(&self.info, &self.settings);

            //convergence check
            //--------------
            if self.info.check_exit_conditions(
                &self.residuals,
                self.variables.τ,
                self.variables.κ,
                &self.settings,
                ToleranceMode::Normal,
            ) {
                status = self.info.status;
                break;
            }
            if iter == self.settings.maxit {
                status = SolverStatus::MaxIterations;
                break;
            }

            //scaling update
            //--------------
            if !self
                .cones
                .update_scaling(&self.variables.s, &self.variables.z)
            {
                status = SolverStatus::NumericalError;
                break;
            }

            //KKT update and factorization
            //--------------
            if !self.kkt.update(&self.cones, &self.settings) {
                status = SolverStatus::NumericalError;
                break;
            }

            //static-data solve, reused by both direction solves
            //--------------
            self.info.nitref1 = self.kkt.solve(
                &mut self.dx1,
                &mut self.dy1,
                &mut self.dz1,
                &self.rhs1,
                &self.data,
                &self.cones,
                false,
                &self.settings,
            );

            //predictor (affine) direction
            //--------------
            self.build_affine_rhs();
            self.info.nitref2 = self.kkt.solve(
                &mut self.dx2,
                &mut self.dy2,
                &mut self.dz2,
                &self.rhs2,
                &self.data,
                &self.cones,
                false,
                &self.settings,
            );

            let τ = self.variables.τ;
            let κ = self.variables.κ;

            let dtau_denom = κ / τ
                - self.data.c.dot(&self.dx1)
                - self.data.b.dot(&self.dy1)
                - self.data.h.dot(&self.dz1);

            let dtauaff = (self.residuals.rt - κ
                + self.data.c.dot(&self.dx2)
                + self.data.b.dot(&self.dy2)
                + self.data.h.dot(&self.dz2))
                / dtau_denom;

            // dzaff = dz2 + dtauaff·dz1, and its scaled versions
            self.dz2.axpby(dtauaff, &self.dz1, one);
            self.cones.mul_W(&mut self.Wdz, &self.dz2);
            self.cones.dsaff_from_Wdz(&mut self.dsW, &self.Wdz);

            let dkapaff = -κ - κ / τ * dtauaff;

            //affine step length
            let mut αaff = self.cones.step_length(&self.dsW, &self.Wdz, self.settings.eps);
            αaff = _clip_by_tau_kappa(αaff, τ, dtauaff, κ, dkapaff);
            αaff = αaff.clip(self.settings.stepmin, self.settings.stepmax);
            self.info.step_aff = αaff;

            //centering parameter
            let σ = T::powi(one - αaff, 3).clip(self.settings.sigmamin, self.settings.sigmamax);
            self.info.sigma = σ;

            //corrector (combined) direction
            //--------------
            self.build_combined_rhs(σ, self.info.mu);
            self.info.nitref3 = self.kkt.solve(
                &mut self.dx2,
                &mut self.dy2,
                &mut self.dz2,
                &self.rhs2,
                &self.data,
                &self.cones,
                false,
                &self.settings,
            );

            let bkap = κ * τ + dkapaff * dtauaff - σ * self.info.mu;
            let dtau = ((one - σ) * self.residuals.rt - bkap / τ
                + self.data.c.dot(&self.dx2)
                + self.data.b.dot(&self.dy2)
                + self.data.h.dot(&self.dz2))
                / dtau_denom;

            // fold in the static-data direction weighted by dtau
            self.dx2.axpby(dtau, &self.dx1, one);
            self.dy2.axpby(dtau, &self.dy1, one);
            self.dz2.axpby(dtau, &self.dz1, one);

            // recompute W·dz; dsW holds λ∖ds from the combined RHS
            // build, so W∖ds = −(λ∖ds + W·dz)
            self.cones.mul_W(&mut self.Wdz, &self.dz2);
            self.dsW.axpby(one, &self.Wdz, one);
            self.dsW.negate();

            let dkap = -(bkap + κ * dtau) / τ;

            //combined step length, with step shortening
            let mut α = self.cones.step_length(&self.dsW, &self.Wdz, self.settings.eps);
            α = _clip_by_tau_kappa(α, τ, dtau, κ, dkap);
            α = α.clip(self.settings.stepmin, self.settings.stepmax);
            α = α * self.settings.gamma;
            self.info.step = α;

            // ds back to the unscaled form: ds = W(W∖ds)
            self.cones.mul_W(&mut self.ds, &self.dsW);

            //update iterates
            //--------------
            self.variables.x.axpby(α, &self.dx2, one);
            self.variables.y.axpby(α, &self.dy2, one);
            self.variables.z.axpby(α, &self.dz2, one);
            self.variables.s.axpby(α, &self.ds, one);
            self.variables.κ += α * dkap;
            self.variables.τ += α * dtau;
        }

        self.finish(status);
    }

    // affine RHS in the expanded layout:
    //   [ rx; -ry; (s - rz) ]  with two zero slots per cone
    fn build_affine_rhs(&mut self) {
        let (n, p) = (self.data.n, self.data.p);

        self.rhs2[0..n].copy_from(&self.residuals.rx);
        self.rhs2[n..n + p].scalarop_from(|r| -r, &self.residuals.ry);

        self.ws1
            .waxpby(T::one(), &self.variables.s, -T::one(), &self.residuals.rz);
        self.cones.to_expanded(&mut self.rhs2[n + p..], &self.ws1);
    }

    // combined RHS: scale the affine (x, y) section by (1-σ) and
    // rebuild the cone section as −(1−σ)rz + W(λ∖ds), where
    //   ds = λ∘λ + (W∖Δs_aff)∘(W·Δz_aff) − σμ·e.
    // Leaves λ∖ds behind in dsW for the direction recovery.
    fn build_combined_rhs(&mut self, σ: T, μ: T) {
        let (n, p) = (self.data.n, self.data.p);
        let one = T::one();

        // ds = λ∘λ + (W∖Δs_aff)∘(W·Δz_aff) − σμ·e
        self.cones.affine_ds(&mut self.ws1);
        self.cones.circ_op(&mut self.ws2, &self.dsW, &self.Wdz);
        self.ws1.axpby(one, &self.ws2, one);
        self.cones.unit_shift(&mut self.ws1, -σ * μ);

        // dsW = λ∖ds, ws1 = W(λ∖ds)
        self.cones.λ_inv_circ_op(&mut self.dsW, &self.ws1);
        self.cones.mul_W(&mut self.ws1, &self.dsW);

        self.rhs2[0..n + p].scale(one - σ);

        self.ws2
            .waxpby(-(one - σ), &self.residuals.rz, one, &self.ws1);
        self.cones.to_expanded(&mut self.rhs2[n + p..], &self.ws2);
    }

    // termination: reduced-accuracy rescue of the status, backscaling
    // of the iterate, and restoration of the problem data
    fn finish(&mut self, status: SolverStatus) {
        self.info.status = status;
        self.info.finalize(
            &self.residuals,
            self.variables.τ,
            self.variables.κ,
            &self.settings,
        );

        self.variables.backscale(&self.data);

        self.data.c.hadamard(&self.data.equilibration.x_equil);
        self.data.unequilibrate();

        info_print::print_footer(&self.info, &self.settings);
    }
}

// step length restriction from the homogenization scalars:
// any positive ratio −τ/Δτ or −κ/Δκ at or below α becomes the new α
fn _clip_by_tau_kappa<T: FloatT>(α: T, τ: T, dtau: T, κ: T, dkap: T) -> T {
    let mut α = α;

    let t = -τ / dtau;
    if t > T::zero() && t <= α {
        α = t;
    }
    let t = -κ / dkap;
    if t > T::zero() && t <= α {
        α = t;
    }
    α
}
