#![allow(non_snake_case)]
use super::problemdata::ProblemData;
use super::variables::Variables;
use crate::algebra::*;

// ---------------
// residuals of the homogeneous self-dual embedding
// ---------------

pub struct Residuals<T> {
    /// rx = −A'y − G'z − τc
    pub rx: Vec<T>,
    /// ry = Ax − τb
    pub ry: Vec<T>,
    /// rz = s + Gx − τh
    pub rz: Vec<T>,
    /// rt = κ + c'x + b'y + h'z
    pub rt: T,

    //norms of the homogeneous parts, taken before the τ-weighted data
    //term is subtracted.  Used by the infeasibility measures
    pub hresx: T,
    pub hresy: T,
    pub hresz: T,

    //data inner products with the current iterate
    pub cx: T,
    pub by: T,
    pub hz: T,

    //iterate norms
    pub nx: T,
    pub ny: T,
    pub nz: T,
    pub ns: T,

    //norms of the equilibrated data, fixed at solve start
    pub resx0: T,
    pub resy0: T,
    pub resz0: T,
}

impl<T> Residuals<T>
where
    T: FloatT,
{
    pub fn new(n: usize, p: usize, m: usize) -> Self {
        Self {
            rx: vec![T::zero(); n],
            ry: vec![T::zero(); p],
            rz: vec![T::zero(); m],
            rt: T::zero(),
            hresx: T::zero(),
            hresy: T::zero(),
            hresz: T::zero(),
            cx: T::zero(),
            by: T::zero(),
            hz: T::zero(),
            nx: T::zero(),
            ny: T::zero(),
            nz: T::zero(),
            ns: T::zero(),
            resx0: T::one(),
            resy0: T::one(),
            resz0: T::one(),
        }
    }

    /// Fixes the data norms used in the relative residual scalings.
    /// Called once per solve, after the objective has been equilibrated.
    pub fn set_data_norms(&mut self, data: &ProblemData<T>) {
        self.resx0 = T::max(T::one(), data.c.norm());
        self.resy0 = T::max(T::one(), data.b.norm());
        self.resz0 = T::max(T::one(), data.h.norm());
    }

    pub fn update(&mut self, vars: &Variables<T>, data: &ProblemData<T>) {
        // rx = -A'y - G'z - τc, with hresx taken before the c term
        data.A.t().gemv(&mut self.rx, &vars.y, -T::one(), T::zero());
        data.G.t().gemv(&mut self.rx, &vars.z, -T::one(), T::one());
        self.hresx = self.rx.norm();
        self.rx.axpby(-vars.τ, &data.c, T::one());

        // ry = Ax - τb
        data.A.gemv(&mut self.ry, &vars.x, T::one(), T::zero());
        self.hresy = self.ry.norm();
        self.ry.axpby(-vars.τ, &data.b, T::one());

        // rz = s + Gx - τh
        self.rz.copy_from(&vars.s);
        data.G.gemv(&mut self.rz, &vars.x, T::one(), T::one());
        self.hresz = self.rz.norm();
        self.rz.axpby(-vars.τ, &data.h, T::one());

        // rt = κ + c'x + b'y + h'z
        self.cx = data.c.dot(&vars.x);
        self.by = data.b.dot(&vars.y);
        self.hz = data.h.dot(&vars.z);
        self.rt = vars.κ + self.cx + self.by + self.hz;

        self.nx = vars.x.norm();
        self.ny = vars.y.norm();
        self.nz = vars.z.norm();
        self.ns = vars.s.norm();
    }
}
