use super::residuals::Residuals;
use super::settings::Settings;
use crate::algebra::*;

// ---------------------------------
// solver status and iteration statistics
// ---------------------------------

/// Final status of a solve.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum SolverStatus {
    /// Problem is not solved (solver hasn't run)
    #[default]
    Unsolved,
    /// Solved to full accuracy
    Solved,
    /// Solved to reduced accuracy
    AlmostSolved,
    /// Problem is primal infeasible, certificate found
    PrimalInfeasible,
    /// Problem is primal infeasible to reduced accuracy
    AlmostPrimalInfeasible,
    /// Problem is dual infeasible (primal unbounded), certificate found
    DualInfeasible,
    /// Problem is dual infeasible to reduced accuracy
    AlmostDualInfeasible,
    /// Iteration limit reached before any other status
    MaxIterations,
    /// Solve aborted on a numerical error (factorization failure or
    /// scaling breakdown)
    NumericalError,
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Which tolerance set to test convergence against.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub(crate) enum ToleranceMode {
    Normal,
    Reduced,
}

/// Per-iteration solver statistics.  The final values are left in place
/// on termination for the caller to inspect.
#[derive(Debug, Clone, Default)]
pub struct SolveInfo<T> {
    /// primal objective c'x/τ
    pub pcost: T,
    /// dual objective −(h'z + b'y)/τ
    pub dcost: T,
    /// relative primal residual
    pub pres: T,
    /// relative dual residual
    pub dres: T,
    /// absolute duality gap s'z
    pub gap: T,
    /// relative duality gap, when defined
    pub relgap: Option<T>,
    /// primal infeasibility measure, when the certificate direction is active
    pub pinfres: Option<T>,
    /// dual infeasibility measure, when the certificate direction is active
    pub dinfres: Option<T>,
    /// centering parameter of the last iteration
    pub sigma: T,
    /// complementarity measure μ
    pub mu: T,
    /// combined step length of the last iteration
    pub step: T,
    /// affine step length of the last iteration
    pub step_aff: T,
    /// κ/τ
    pub kapovert: T,
    /// iterations taken
    pub iter: u32,
    /// primal infeasibility flag
    pub pinf: bool,
    /// dual infeasibility flag
    pub dinf: bool,
    /// refinement steps in the static-RHS solve
    pub nitref1: u32,
    /// refinement steps in the affine solve
    pub nitref2: u32,
    /// refinement steps in the combined solve
    pub nitref3: u32,
    /// solver status
    pub status: SolverStatus,
}

impl<T> SolveInfo<T>
where
    T: FloatT,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Refreshes the cost, gap, residual and infeasibility statistics
    /// from the current residuals.
    pub(crate) fn update_statistics(
        &mut self,
        res: &Residuals<T>,
        gap: T,
        τ: T,
        κ: T,
        degree: usize,
        settings: &Settings<T>,
    ) {
        let one = T::one();

        self.gap = gap;
        self.mu = (gap + κ * τ) / T::from_usize(degree + 1).unwrap();
        self.kapovert = κ / τ;
        self.pcost = res.cx / τ;
        self.dcost = -(res.hz + res.by) / τ;

        // relative duality gap, undefined while the two costs straddle
        // zero the wrong way around
        self.relgap = if self.pcost < T::zero() {
            Some(self.gap / -self.pcost)
        } else if self.dcost > T::zero() {
            Some(self.gap / self.dcost)
        } else {
            None
        };

        // relative residuals
        let nry = if res.ry.is_empty() {
            T::zero()
        } else {
            res.ry.norm() / T::max(res.resy0 + res.nx, one)
        };
        let nrz = res.rz.norm() / T::max(res.resz0 + res.nx + res.ns, one);
        self.pres = T::max(nry, nrz) / τ;
        self.dres = res.rx.norm() / T::max(res.resx0 + res.ny + res.nz, one) / τ;

        // infeasibility measures, defined only when the iterate points
        // along a certificate direction
        self.pinfres = {
            if (res.hz + res.by) / T::max(res.ny + res.nz, one) < -settings.reltol {
                Some(res.hresx / T::max(res.ny + res.nz, one))
            } else {
                None
            }
        };
        self.dinfres = {
            if res.cx / T::max(res.nx, one) < -settings.reltol {
                Some(T::max(
                    res.hresy / T::max(res.nx, one),
                    res.hresz / T::max(res.nx + res.ns, one),
                ))
            } else {
                None
            }
        };
    }

    /// Tests the exit conditions at the given tolerance set, recording
    /// the outcome in `status`.  Returns true when a terminal status
    /// was reached.
    pub(crate) fn check_exit_conditions(
        &mut self,
        res: &Residuals<T>,
        τ: T,
        κ: T,
        settings: &Settings<T>,
        mode: ToleranceMode,
    ) -> bool {
        let (feastol, abstol, reltol) = match mode {
            ToleranceMode::Normal => (settings.feastol, settings.abstol, settings.reltol),
            ToleranceMode::Reduced => (
                settings.feastol_inacc,
                settings.abstol_inacc,
                settings.reltol_inacc,
            ),
        };

        // optimality
        if (-res.cx > T::zero() || -res.by - res.hz >= -abstol)
            && (self.pres < feastol && self.dres < feastol)
            && (self.gap < abstol || self.relgap.map_or(false, |rg| rg < reltol))
        {
            self.pinf = false;
            self.dinf = false;
            self.status = match mode {
                ToleranceMode::Normal => SolverStatus::Solved,
                ToleranceMode::Reduced => SolverStatus::AlmostSolved,
            };
            return true;
        }

        // dual infeasibility (unboundedness)
        if self.dinfres.map_or(false, |v| v < feastol) && τ < κ {
            self.pinf = false;
            self.dinf = true;
            self.status = match mode {
                ToleranceMode::Normal => SolverStatus::DualInfeasible,
                ToleranceMode::Reduced => SolverStatus::AlmostDualInfeasible,
            };
            return true;
        }

        // primal infeasibility
        let pinfres_ok = self.pinfres.map_or(false, |v| v < feastol);
        if (pinfres_ok && τ < κ) || (τ < feastol && κ < feastol && pinfres_ok) {
            self.pinf = true;
            self.dinf = false;
            self.status = match mode {
                ToleranceMode::Normal => SolverStatus::PrimalInfeasible,
                ToleranceMode::Reduced => SolverStatus::AlmostPrimalInfeasible,
            };
            return true;
        }

        false
    }

    /// Rescue check run after the iteration loop ends without a normal
    /// termination: accepts the reduced-accuracy statuses if the final
    /// statistics merit them.
    pub(crate) fn finalize(
        &mut self,
        res: &Residuals<T>,
        τ: T,
        κ: T,
        settings: &Settings<T>,
    ) {
        if matches!(
            self.status,
            SolverStatus::MaxIterations | SolverStatus::NumericalError
        ) {
            let prior = self.status;
            if !self.check_exit_conditions(res, τ, κ, settings, ToleranceMode::Reduced) {
                self.status = prior;
            }
        }
    }
}
