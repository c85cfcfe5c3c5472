#![allow(non_snake_case)]

use crate::algebra::*;
use enum_dispatch::*;
use std::ops::Range;

mod nonneg;
mod soc;
pub use nonneg::*;
pub use soc::*;

/// Operations on a single cone of the product cone
/// K = R₊ˡ × Q^{d₁} × … × Q^{dₖ}.
///
/// All vector arguments are the slice of the corresponding product-cone
/// vector belonging to this cone, except for `scale2add`, which works on
/// the cone's block of the *expanded* KKT layout (second-order cones
/// append two expansion slots to their block there).

#[enum_dispatch]
pub trait Cone<T>
where
    T: FloatT,
{
    // degree of the cone barrier: dim for the orthant, 1 per SOC
    fn degree(&self) -> usize;

    // number of variables in the cone
    fn numel(&self) -> usize;

    // number of columns occupied in the expanded KKT layout
    fn numel_expanded(&self) -> usize;

    // minimum margin of z to the cone boundary.  Positive iff z is in
    // the strict interior
    fn margin(&self, z: &[T]) -> T;

    // z += α·e, where e is the unit element of the cone
    fn unit_shift(&self, z: &mut [T], α: T);

    // reset the scaling to W = I
    fn set_identity_scaling(&mut self);

    // Nesterov-Todd scaling update at the point (s, z).  Computes the
    // scaled variable λ = Wz as a side effect.  Returns false on
    // numerical breakdown (a cone residual going nonpositive)
    fn update_scaling(&mut self, s: &[T], z: &[T]) -> bool;

    // ds = λ∘λ
    fn affine_ds(&self, ds: &mut [T]);

    // x = y∘z.  Returns the absolute value of the block "head", i.e.
    // the block's contribution to the weighted 1-norm of the product
    fn circ_op(&self, x: &mut [T], y: &[T], z: &[T]) -> T;

    // x = y∖z, the inverse of the conic product
    fn inv_circ_op(&self, x: &mut [T], y: &[T], z: &[T]);

    // x = λ∖z
    fn λ_inv_circ_op(&self, x: &mut [T], z: &[T]);

    // y = Wx
    fn mul_W(&self, y: &mut [T], x: &[T]);

    // ds = −wdz − λ, the affine-direction value of W∖Δs
    fn dsaff_from_Wdz(&self, ds: &mut [T], wdz: &[T]);

    // y += W²x on the expanded block
    fn scale2add(&self, y: &mut [T], x: &[T]);

    // largest step so that (s + αΔs, z + αΔz) stays in the cone, in the
    // scaled variables.  The orthant seeds the step length; second-order
    // cones only ever reduce it
    fn step_length(&self, ds: &[T], dz: &[T], α: T, ε: T) -> T;
}

/// The supported cone shapes, as a tagged enum with static dispatch.
#[enum_dispatch(Cone<T>)]
pub enum SupportedCone<T>
where
    T: FloatT,
{
    NonnegativeCone(NonnegativeCone<T>),
    SecondOrderCone(SecondOrderCone<T>),
}

// -------------------------------------
// product cone
// -------------------------------------

/// The product cone R₊ˡ × Q^{d₁} × … × Q^{dₖ}, with the orthant first
/// and the second-order cones in their given order.  Holds the per-cone
/// index ranges into both the natural (length m) and the expanded
/// (length m + 2·ncones) vector layouts.
pub struct ConeSet<T>
where
    T: FloatT,
{
    cones: Vec<SupportedCone<T>>,

    //overall size and barrier degree of the product cone
    numel: usize,
    degree: usize,

    //number of second-order cones
    nsoc: usize,

    //ranges of the constituent cones in natural and expanded layouts.
    //expanded ranges cover the true cone coordinates only; the two
    //expansion slots of a second-order cone sit directly after its range
    pub(crate) rng_cones: Vec<Range<usize>>,
    pub(crate) rng_expanded: Vec<Range<usize>>,
}

impl<T> ConeSet<T>
where
    T: FloatT,
{
    pub fn new(l: usize, soc_dims: &[usize]) -> Self {
        let mut cones: Vec<SupportedCone<T>> = Vec::with_capacity(soc_dims.len() + 1);

        cones.push(NonnegativeCone::<T>::new(l).into());
        for &dim in soc_dims {
            cones.push(SecondOrderCone::<T>::new(dim).into());
        }

        let numel = cones.iter().map(|c| c.numel()).sum();
        let degree = cones.iter().map(|c| c.degree()).sum();
        let nsoc = soc_dims.len();

        let mut rng_cones = Vec::with_capacity(cones.len());
        let mut rng_expanded = Vec::with_capacity(cones.len());
        let (mut start, mut estart) = (0, 0);
        for cone in &cones {
            let stop = start + cone.numel();
            let estop = estart + cone.numel();
            rng_cones.push(start..stop);
            rng_expanded.push(estart..estop);
            start = stop;
            estart += cone.numel_expanded();
        }

        Self {
            cones,
            numel,
            degree,
            nsoc,
            rng_cones,
            rng_expanded,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SupportedCone<T>> {
        self.cones.iter()
    }
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SupportedCone<T>> {
        self.cones.iter_mut()
    }

    /// total variable count of the product cone (= m)
    pub fn numel(&self) -> usize {
        self.numel
    }

    /// barrier degree (l + number of second-order cones)
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// number of second-order cones
    pub fn nsoc(&self) -> usize {
        self.nsoc
    }

    /// dimension of the expanded scaling block (= m + 2·nsoc)
    pub fn numel_expanded(&self) -> usize {
        self.numel + 2 * self.nsoc
    }

    pub fn set_identity_scaling(&mut self) {
        for cone in self.iter_mut() {
            cone.set_identity_scaling();
        }
    }

    pub fn update_scaling(&mut self, s: &[T], z: &[T]) -> bool {
        let cones = &mut self.cones;
        let rngs = &self.rng_cones;

        for (cone, rng) in cones.iter_mut().zip(rngs.iter()) {
            if !cone.update_scaling(&s[rng.clone()], &z[rng.clone()]) {
                return false;
            }
        }
        true
    }

    /// Shifts z into the strict interior of the product cone:
    /// z += (1 + α)·e, where α is the largest cone-boundary violation
    /// over all blocks (or zero if z is already interior).
    pub fn shift_to_cone(&self, z: &mut [T]) {
        let mut α = T::zero();
        for (cone, rng) in self.iter().zip(self.rng_cones.iter()) {
            α = T::max(α, -cone.margin(&z[rng.clone()]));
        }

        let shift = T::one() + α;
        for (cone, rng) in self.iter().zip(self.rng_cones.iter()) {
            cone.unit_shift(&mut z[rng.clone()], shift);
        }
    }

    /// z += α·e blockwise
    pub fn unit_shift(&self, z: &mut [T], α: T) {
        for (cone, rng) in self.iter().zip(self.rng_cones.iter()) {
            cone.unit_shift(&mut z[rng.clone()], α);
        }
    }

    /// ds = λ∘λ
    pub fn affine_ds(&self, ds: &mut [T]) {
        for (cone, rng) in self.iter().zip(self.rng_cones.iter()) {
            cone.affine_ds(&mut ds[rng.clone()]);
        }
    }

    /// x = y∘z; returns the weighted 1-norm Σ|head| over the blocks
    pub fn circ_op(&self, x: &mut [T], y: &[T], z: &[T]) -> T {
        let mut nrm1 = T::zero();
        for (cone, rng) in self.iter().zip(self.rng_cones.iter()) {
            nrm1 += cone.circ_op(&mut x[rng.clone()], &y[rng.clone()], &z[rng.clone()]);
        }
        nrm1
    }

    /// x = y∖z
    pub fn inv_circ_op(&self, x: &mut [T], y: &[T], z: &[T]) {
        for (cone, rng) in self.iter().zip(self.rng_cones.iter()) {
            cone.inv_circ_op(&mut x[rng.clone()], &y[rng.clone()], &z[rng.clone()]);
        }
    }

    /// x = λ∖z
    pub fn λ_inv_circ_op(&self, x: &mut [T], z: &[T]) {
        for (cone, rng) in self.iter().zip(self.rng_cones.iter()) {
            cone.λ_inv_circ_op(&mut x[rng.clone()], &z[rng.clone()]);
        }
    }

    /// y = Wx
    pub fn mul_W(&self, y: &mut [T], x: &[T]) {
        for (cone, rng) in self.iter().zip(self.rng_cones.iter()) {
            cone.mul_W(&mut y[rng.clone()], &x[rng.clone()]);
        }
    }

    /// ds = −wdz − λ
    pub fn dsaff_from_Wdz(&self, ds: &mut [T], wdz: &[T]) {
        for (cone, rng) in self.iter().zip(self.rng_cones.iter()) {
            cone.dsaff_from_Wdz(&mut ds[rng.clone()], &wdz[rng.clone()]);
        }
    }

    /// y += W²x on the expanded layout (both vectors of length
    /// `numel_expanded`).
    pub fn scale2add(&self, y: &mut [T], x: &[T]) {
        for (cone, rng) in self.iter().zip(self.rng_expanded.iter()) {
            let erng = rng.start..(rng.start + cone.numel_expanded());
            cone.scale2add(&mut y[erng.clone()], &x[erng]);
        }
    }

    /// Copies the natural-layout vector `src` into the expanded layout,
    /// zeroing the expansion slots.
    pub fn to_expanded(&self, dst: &mut [T], src: &[T]) {
        dst.fill(T::zero());
        for (rng, erng) in self.rng_cones.iter().zip(self.rng_expanded.iter()) {
            dst[erng.clone()].copy_from(&src[rng.clone()]);
        }
    }

    /// Extracts the natural-layout vector from the expanded layout,
    /// discarding the expansion slots.
    pub fn from_expanded(&self, dst: &mut [T], src: &[T]) {
        for (rng, erng) in self.rng_cones.iter().zip(self.rng_expanded.iter()) {
            dst[rng.clone()].copy_from(&src[erng.clone()]);
        }
    }

    /// Largest step α so that (λ + αΔs, λ + αΔz) remains in the cone,
    /// working in the scaled variables.  Starts from the sentinel value
    /// 10; the orthant block (when nonempty) replaces it, and every
    /// second-order cone can only reduce it.  The caller clips against
    /// τ/κ and the step bounds.
    pub fn step_length(&self, ds: &[T], dz: &[T], ε: T) -> T {
        let mut α: T = (10f64).as_T();
        for (cone, rng) in self.iter().zip(self.rng_cones.iter()) {
            α = cone.step_length(&ds[rng.clone()], &dz[rng.clone()], α, ε);
        }
        α
    }
}

// -------------
// testing

#[cfg(test)]
mod tests {
    use super::*;

    fn soc_set() -> ConeSet<f64> {
        ConeSet::<f64>::new(2, &[3])
    }

    #[test]
    fn test_dims_and_ranges() {
        let K = soc_set();
        assert_eq!(K.numel(), 5);
        assert_eq!(K.degree(), 3);
        assert_eq!(K.numel_expanded(), 7);
        assert_eq!(K.rng_cones, vec![0..2, 2..5]);
        assert_eq!(K.rng_expanded, vec![0..2, 2..5]);
    }

    #[test]
    fn test_shift_to_cone() {
        let K = soc_set();
        let mut z = vec![-1., 2., 1., 3., 1.]; //soc block outside: 1 < ||(3,1)||

        K.shift_to_cone(&mut z);

        //largest violation is the soc: ||(3,1)|| - 1 ≈ 2.1623
        for (cone, rng) in K.iter().zip(K.rng_cones.iter()) {
            assert!(cone.margin(&z[rng.clone()]) > 0.);
        }
        //strict interiority of the soc head
        assert!(z[2] > (z[3] * z[3] + z[4] * z[4]).sqrt());
    }

    #[test]
    fn test_circ_division_roundtrip() {
        let K = soc_set();
        let u = vec![1.5, 2., 2., 0.5, -0.3]; //interior of both blocks
        let v = vec![0.3, -1., 1., 0.2, 0.7];

        let mut w = vec![0.; 5];
        K.circ_op(&mut w, &u, &v);

        let mut vback = vec![0.; 5];
        K.inv_circ_op(&mut vback, &u, &w);

        assert!(vback.dist(&v) <= 1e-12);
    }

    #[test]
    fn test_circ_op_head_norm() {
        let K = soc_set();
        let u = vec![1., 2., 2., 0.5, -0.3];
        let v = vec![3., -1., 1., 0.2, 0.7];

        let mut w = vec![0.; 5];
        let nrm1 = K.circ_op(&mut w, &u, &v);

        //orthant heads are every entry; soc head is the block dot
        let expected = (u[0] * v[0]).abs() + (u[1] * v[1]).abs() + w[2].abs();
        assert!((nrm1 - expected).abs() <= 1e-14);
    }

    #[test]
    fn test_scaling_lambda_identities() {
        let mut K = soc_set();
        let s = vec![1.5, 0.7, 2., 0.5, -0.3];
        let z = vec![0.4, 2.2, 3., -1., 0.5];

        assert!(K.update_scaling(&s, &z));

        //λ = Wz, and Wλ = s since λ = W⁻¹s as well
        let mut ws = vec![0.; 5];
        for (cone, rng) in K.iter().zip(K.rng_cones.iter()) {
            let wsblk = &mut ws[rng.clone()];
            match cone {
                SupportedCone::NonnegativeCone(c) => c.mul_W(wsblk, c.λ()),
                SupportedCone::SecondOrderCone(c) => c.mul_W(wsblk, c.λ()),
            }
        }
        assert!(ws.dist(&s) <= 1e-12);
    }

    #[test]
    fn test_identity_scaling_values() {
        //a single 3-dimensional cone with s = z = e has W = I
        let mut c = SecondOrderCone::<f64>::new(3);
        let e = vec![1., 0., 0.];
        assert!(c.update_scaling(&e, &e));

        assert!((c.η - 1.).abs() <= 1e-15);
        assert!((c.d1 - 0.5).abs() <= 1e-15);
        assert!((c.u0 * c.u0 - 0.5).abs() <= 1e-15);
        assert!(c.λ().dist(&e) <= 1e-15);
    }

    #[test]
    fn test_step_length() {
        let mut K = ConeSet::<f64>::new(2, &[]);
        let s = vec![1., 1.];
        let z = vec![1., 1.];
        assert!(K.update_scaling(&s, &z)); //λ = (1,1)

        //most negative ratio is ds[1]/λ[1] = -2, so α = 1/2
        let ds = vec![-1., -2.];
        let dz = vec![-0.5, -1.];
        let α = K.step_length(&ds, &dz, 1e-13);
        assert!((α - 0.5).abs() <= 1e-14);

        //all directions inward: sentinel-sized step
        let ds = vec![1., 1.];
        let dz = vec![1., 1.];
        let α = K.step_length(&ds, &dz, 1e-13);
        assert!(α >= 1e12);
    }

    #[test]
    fn test_step_length_empty_orthant() {
        let mut K = ConeSet::<f64>::new(0, &[3]);
        let s = vec![2., 0.5, -0.3];
        let z = vec![3., -1., 0.5];
        assert!(K.update_scaling(&s, &z));

        //directions pointing into the cone leave the sentinel untouched
        let ds = vec![1., 0., 0.];
        let dz = vec![1., 0., 0.];
        let α = K.step_length(&ds, &dz, 1e-13);
        assert_eq!(α, 10.);
    }
}
