use super::problemdata::ProblemData;
use crate::algebra::*;

// ---------------
// iterate variables of the homogeneous self-dual embedding
// ---------------

/// Solver variables.  After a solve these hold the backscaled solution
/// (or infeasibility certificate).
pub struct Variables<T> {
    /// primal variables
    pub x: Vec<T>,
    /// equality duals
    pub y: Vec<T>,
    /// conic duals
    pub z: Vec<T>,
    /// conic slacks
    pub s: Vec<T>,
    /// homogenization scalar τ
    pub τ: T,
    /// homogenization scalar κ
    pub κ: T,
}

impl<T> Variables<T>
where
    T: FloatT,
{
    pub fn new(n: usize, p: usize, m: usize) -> Self {
        Self {
            x: vec![T::zero(); n],
            y: vec![T::zero(); p],
            z: vec![T::zero(); m],
            s: vec![T::zero(); m],
            τ: T::one(),
            κ: T::one(),
        }
    }

    /// Divides the iterate through by τ and unwinds the equilibration,
    /// recovering variables of the original problem.  The primal slack
    /// s transforms inversely to the dual z, so it picks up a factor of
    /// the row scaling where (x, y, z) lose theirs.
    pub(crate) fn backscale(&mut self, data: &ProblemData<T>) {
        let equil = &data.equilibration;
        let τinv = T::recip(self.τ);

        self.x.hadamard_div(&equil.x_equil).scale(τinv);
        self.y.hadamard_div(&equil.A_equil).scale(τinv);
        self.z.hadamard_div(&equil.G_equil).scale(τinv);
        self.s.hadamard(&equil.G_equil).scale(τinv);
    }
}
