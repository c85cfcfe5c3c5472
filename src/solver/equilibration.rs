#![allow(non_snake_case)]
use super::cones::{Cone, ConeSet};
use super::problemdata::ProblemData;
use super::settings::Settings;
use crate::algebra::*;

// ---------------
// Ruiz equilibration
// ---------------

/// Diagonal scaling state from the Ruiz equilibration procedure.  The
/// three vectors accumulate the scalings applied to the variables, the
/// equality rows and the conic rows respectively.
pub struct EquilibrationData<T> {
    /// variable (column) scaling of [A; G]
    pub x_equil: Vec<T>,
    /// row scaling of A
    pub A_equil: Vec<T>,
    /// row scaling of G
    pub G_equil: Vec<T>,

    //work vectors for the scaling sweeps
    xtmp: Vec<T>,
    atmp: Vec<T>,
    gtmp: Vec<T>,
}

impl<T> EquilibrationData<T>
where
    T: FloatT,
{
    pub fn new(n: usize, p: usize, m: usize) -> Self {
        Self {
            x_equil: vec![T::one(); n],
            A_equil: vec![T::one(); p],
            G_equil: vec![T::one(); m],
            xtmp: vec![T::zero(); n],
            atmp: vec![T::zero(); p],
            gtmp: vec![T::zero(); m],
        }
    }
}

// entries of the scaling temporaries below this bound are frozen to
// one before the square root is taken
fn equil_guard<T: FloatT>(x: T) -> T {
    if x.abs() < (1e-6).as_T() {
        T::one()
    } else {
        T::sqrt(x)
    }
}

impl<T> ProblemData<T>
where
    T: FloatT,
{
    /// Ruiz scaling of (A, G, b, h) in place, accumulating the diagonal
    /// scalings into the equilibration state.  The objective c is
    /// rescaled inside the solve itself.
    pub(crate) fn equilibrate(&mut self, cones: &ConeSet<T>, settings: &Settings<T>) {
        if !settings.equilibrate_enable {
            return;
        }

        let equil = &mut self.equilibration;
        let (A, G, b, h) = (&mut self.A, &mut self.G, &mut self.b, &mut self.h);

        let xtmp = &mut equil.xtmp;
        let atmp = &mut equil.atmp;
        let gtmp = &mut equil.gtmp;

        for _ in 0..settings.equil_iters {
            //max-norms across the columns of [A; G] and across the
            //rows of A and of G
            if self.p > 0 {
                A.col_norms(xtmp);
            } else {
                xtmp.fill(T::zero());
            }
            G.col_norms_no_reset(xtmp);

            A.row_norms(atmp);
            G.row_norms(gtmp);

            //collapse each second-order cone onto its group total so
            //that all rows of one cone share a single scaling
            for (cone, rng) in cones.iter().zip(cones.rng_cones.iter()).skip(1) {
                debug_assert!(cone.numel() >= 2);
                let total = gtmp[rng.clone()].iter().fold(T::zero(), |acc, &x| acc + x);
                gtmp[rng.clone()].fill(total);
            }

            xtmp.scalarop(equil_guard);
            atmp.scalarop(equil_guard);
            gtmp.scalarop(equil_guard);

            //divide rows and columns through by the temporaries
            xtmp.recip();
            atmp.recip();
            gtmp.recip();

            A.lrscale(atmp, xtmp);
            G.lrscale(gtmp, xtmp);

            //accumulate: the temporaries currently hold reciprocals
            equil.x_equil.hadamard_div(xtmp);
            equil.A_equil.hadamard_div(atmp);
            equil.G_equil.hadamard_div(gtmp);
        }

        //scale the right hand sides
        b.hadamard_div(&equil.A_equil);
        h.hadamard_div(&equil.G_equil);
    }

    /// Undo the equilibration of (A, G, b, h).
    pub(crate) fn unequilibrate(&mut self) {
        let equil = &self.equilibration;

        self.A.lrscale(&equil.A_equil, &equil.x_equil);
        self.G.lrscale(&equil.G_equil, &equil.x_equil);
        self.b.hadamard(&equil.A_equil);
        self.h.hadamard(&equil.G_equil);
    }
}
