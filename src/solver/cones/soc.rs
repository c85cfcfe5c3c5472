use super::*;
use crate::algebra::*;

// -------------------------------------
// Second-order (Lorentz) cone Qⁿ
// -------------------------------------

// A second-order cone carries the Nesterov-Todd scaling point (a, q)
// together with the scalars of the sparse rank-two representation of
// W².  In the KKT matrix the cone block is expanded by two extra
// rows/columns so that W² appears as a diagonal plus two sparse column
// patches instead of a dense block:
//
//     W² = η² (D̃ + uu' − vv'),   D̃ = diag(d1, I),
//     u = (u0, u1·q),  v = (0, v1·q).

pub struct SecondOrderCone<T> {
    pub(crate) dim: usize,

    //scaling ratio η² = ||s|| / ||z|| in the cone norms, and its root
    pub(crate) η: T,
    pub(crate) η2: T,

    //Nesterov-Todd scaling point (a, q) with w = ||q||²
    pub(crate) a: T,
    pub(crate) q: Vec<T>,
    pub(crate) w: T,

    //sparse expansion scalars
    pub(crate) d1: T,
    pub(crate) u0: T,
    pub(crate) u1: T,
    pub(crate) v1: T,

    //scaled variable λ = Wz
    λ: Vec<T>,

    //normalized copies of (s, z) used by the scaling update
    sbar: Vec<T>,
    zbar: Vec<T>,
}

impl<T> SecondOrderCone<T>
where
    T: FloatT,
{
    pub fn new(dim: usize) -> Self {
        assert!(dim >= 2);

        Self {
            dim,
            η: T::zero(),
            η2: T::zero(),
            a: T::zero(),
            q: vec![T::zero(); dim - 1],
            w: T::zero(),
            d1: T::zero(),
            u0: T::zero(),
            u1: T::zero(),
            v1: T::zero(),
            λ: vec![T::zero(); dim],
            sbar: vec![T::zero(); dim],
            zbar: vec![T::zero(); dim],
        }
    }

    pub(crate) fn λ(&self) -> &[T] {
        &self.λ
    }
}

impl<T> Cone<T> for SecondOrderCone<T>
where
    T: FloatT,
{
    fn degree(&self) -> usize {
        // degree = 1 for a SOC, since e'e = 1
        1
    }

    fn numel(&self) -> usize {
        self.dim
    }

    fn numel_expanded(&self) -> usize {
        self.dim + 2
    }

    fn margin(&self, z: &[T]) -> T {
        z[0] - z[1..].norm()
    }

    fn unit_shift(&self, z: &mut [T], α: T) {
        z[0] += α;
    }

    fn set_identity_scaling(&mut self) {
        self.η = T::one();
        self.η2 = T::one();
        self.a = T::one();
        self.q.fill(T::zero());
        self.w = T::zero();
        self.d1 = T::one();
        self.u0 = T::zero();
        self.u1 = T::zero();
        self.v1 = T::zero();
        self.λ.fill(T::zero());
        self.λ[0] = T::one();
    }

    fn update_scaling(&mut self, s: &[T], z: &[T]) -> bool {
        let two: T = (2.0).as_T();
        let half: T = (0.5).as_T();

        //check the cone residuals and fail on breakdown
        let sres = s[0] * s[0] - s[1..].sumsq();
        let zres = z[0] * z[0] - z[1..].sumsq();
        if sres <= T::zero() || zres <= T::zero() {
            return false;
        }

        let snorm = T::sqrt(sres);
        let znorm = T::sqrt(zres);

        self.sbar.scalarop_from(|s| s / snorm, s);
        self.zbar.scalarop_from(|z| z / znorm, z);

        self.η2 = snorm / znorm;
        self.η = T::sqrt(self.η2);

        //normalized Nesterov-Todd scaling point (a, q)
        let γ = T::sqrt(half * (T::one() + self.sbar.dot(&self.zbar)));
        let a = half / γ * (self.sbar[0] + self.zbar[0]);
        self.q
            .waxpby(half / γ, &self.sbar[1..], -half / γ, &self.zbar[1..]);
        self.a = a;
        self.w = self.q.sumsq();
        let w = self.w;

        //constants of the sparse expansion of W²
        let one_a = T::one() + a;
        let c = one_a + w / one_a;
        let d = T::one() + two / one_a + w / (one_a * one_a);

        let d1 = T::max(
            T::zero(),
            half * (a * a + w * (T::one() - (c * c) / (T::one() + w * d))),
        );
        let u0_square = a * a + w - d1;

        let c2byu02 = (c * c) / u0_square;
        if c2byu02 - d <= T::zero() {
            return false;
        }

        self.d1 = d1;
        self.u0 = T::sqrt(u0_square);
        self.u1 = T::sqrt(c2byu02);
        self.v1 = T::sqrt(c2byu02 - d);

        //λ = Wz
        _soc_mul_w(self.η, self.a, &self.q, &mut self.λ, z);

        true
    }

    fn affine_ds(&self, ds: &mut [T]) {
        _soc_circ_op(ds, &self.λ, &self.λ);
    }

    fn circ_op(&self, x: &mut [T], y: &[T], z: &[T]) -> T {
        _soc_circ_op(x, y, z);
        x[0].abs()
    }

    fn inv_circ_op(&self, x: &mut [T], y: &[T], z: &[T]) {
        let ρ = y[0] * y[0] - y[1..].sumsq();
        let ζ = y[1..].dot(&z[1..]);

        x[0] = (y[0] * z[0] - ζ) / ρ;

        let c1 = (ζ / y[0] - z[0]) / ρ;
        let c2 = T::recip(y[0]);
        x[1..].waxpby(c1, &y[1..], c2, &z[1..]);
    }

    fn λ_inv_circ_op(&self, x: &mut [T], z: &[T]) {
        let ρ = self.λ[0] * self.λ[0] - self.λ[1..].sumsq();
        let ζ = self.λ[1..].dot(&z[1..]);

        x[0] = (self.λ[0] * z[0] - ζ) / ρ;

        let c1 = (ζ / self.λ[0] - z[0]) / ρ;
        let c2 = T::recip(self.λ[0]);
        x[1..].waxpby(c1, &self.λ[1..], c2, &z[1..]);
    }

    fn mul_W(&self, y: &mut [T], x: &[T]) {
        _soc_mul_w(self.η, self.a, &self.q, y, x);
    }

    fn dsaff_from_Wdz(&self, ds: &mut [T], wdz: &[T]) {
        ds.waxpby(-T::one(), wdz, -T::one(), &self.λ);
    }

    fn scale2add(&self, y: &mut [T], x: &[T]) {
        let d = self.dim;
        let η2 = self.η2;
        let (d1, u0, u1, v1) = (self.d1, self.u0, self.u1, self.v1);

        //block layout: [x1; x2…; x3; x4] with the two expansion slots last
        let x1 = x[0];
        let x3 = x[d];
        let x4 = x[d + 1];

        let qtx2 = self.q.dot(&x[1..d]);

        y[0] += η2 * (d1 * x1 + u0 * x4);

        let t = v1 * x3 + u1 * x4;
        for (y, (&x, &q)) in y[1..d].iter_mut().zip(x[1..d].iter().zip(&self.q)) {
            *y += η2 * (x + t * q);
        }

        y[d] += η2 * (v1 * qtx2 + x3);
        y[d + 1] += η2 * (u0 * x1 + u1 * qtx2 - x4);
    }

    fn step_length(&self, ds: &[T], dz: &[T], α: T, _ε: T) -> T {
        let λ0 = self.λ[0];
        let λ1 = &self.λ[1..];
        let λ1sq = λ1.sumsq();

        let lknorm2 = λ0 * λ0 - λ1sq;
        if lknorm2 <= T::zero() {
            //λ has left the cone numerically; no restriction applied
            return α;
        }
        let lknorm = T::sqrt(lknorm2);

        let ρnorm = _soc_step_bound(λ0, λ1, λ1sq, lknorm, ds);
        let σnorm = _soc_step_bound(λ0, λ1, λ1sq, lknorm, dz);

        let conic_step = T::max(T::zero(), T::max(ρnorm, σnorm));
        if conic_step > T::zero() {
            T::min(α, T::recip(conic_step))
        } else {
            α
        }
    }
}

// ---------------------------------------------
// internal operations for second-order cones
// ---------------------------------------------

fn _soc_circ_op<T>(x: &mut [T], y: &[T], z: &[T])
where
    T: FloatT,
{
    x[0] = y.dot(z);
    let (y0, z0) = (y[0], z[0]);
    x[1..].waxpby(y0, &z[1..], z0, &y[1..]);
}

// y = Wx via the fast product with the scaling point (a, q):
//   y₀ = η(a·x₀ + q'x₁)
//   y₁ = η(x₁ + (x₀ + q'x₁/(1+a))·q)
// Free function so that update_scaling can write into λ while
// borrowing (a, q) from the same struct.
fn _soc_mul_w<T>(η: T, a: T, q: &[T], y: &mut [T], x: &[T])
where
    T: FloatT,
{
    let ζ = q.dot(&x[1..]);
    let f = x[0] + ζ / (T::one() + a);

    y[0] = η * (a * x[0] + ζ);
    y[1..].waxpby(η, &x[1..], η * f, q);
}

// Largest inverse step 1/α at which λ + α·v hits the cone boundary,
// as the quantity ‖ρ₁‖ − ρ₀ of the normalized direction ρ.  Evaluated
// with scalar products only, so no intermediate vector is formed.
fn _soc_step_bound<T>(λ0: T, λ1: &[T], λ1sq: T, lknorm: T, v: &[T]) -> T
where
    T: FloatT,
{
    let two: T = (2.0).as_T();

    let v0 = v[0];
    let v1 = &v[1..];
    let λ1v1 = λ1.dot(v1);

    // b = λ̄₀v₀ − λ̄₁'v₁ with λ̄ = λ/lknorm
    let b = (λ0 * v0 - λ1v1) / lknorm;

    // ρ₁ = (v₁ − f·λ̄₁)/lknorm with f = (b + v₀)/(λ̄₀ + 1)
    let f = (b + v0) / (λ0 / lknorm + T::one());
    let ρ1sq =
        (v1.sumsq() - two * f * λ1v1 / lknorm + f * f * λ1sq / (lknorm * lknorm)) / (lknorm * lknorm);

    T::sqrt(T::max(T::zero(), ρ1sq)) - b / lknorm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale2add_matches_dense() {
        let mut c = SecondOrderCone::<f64>::new(3);
        let s = [2., 0.5, -0.3];
        let z = [3., -1., 0.5];
        assert!(c.update_scaling(&s, &z));

        //dense expanded V row by row
        let (η2, d1, u0, u1, v1) = (c.η2, c.d1, c.u0, c.u1, c.v1);
        let q = c.q.clone();
        let dense = [
            [η2 * d1, 0., 0., 0., η2 * u0],
            [0., η2, 0., η2 * v1 * q[0], η2 * u1 * q[0]],
            [0., 0., η2, η2 * v1 * q[1], η2 * u1 * q[1]],
            [0., η2 * v1 * q[0], η2 * v1 * q[1], η2, 0.],
            [η2 * u0, η2 * u1 * q[0], η2 * u1 * q[1], 0., -η2],
        ];

        let x = [0.3, -0.7, 1.1, 0.25, -0.6];
        let mut y = vec![0.; 5];
        c.scale2add(&mut y, &x);

        for (row, &yi) in dense.iter().zip(y.iter()) {
            let expect: f64 = row.iter().zip(x.iter()).map(|(a, b)| a * b).sum();
            assert!((yi - expect).abs() <= 1e-12);
        }
    }

    #[test]
    fn test_expansion_reproduces_w_squared() {
        //W² = η²(D̃ + uu' − vv') must equal the square of the fast W product
        let mut c = SecondOrderCone::<f64>::new(3);
        let s = [1.5, 0.2, 0.9];
        let z = [2.0, -0.5, 0.4];
        assert!(c.update_scaling(&s, &z));

        let x = [0.7, -0.3, 0.2];
        let mut wx = vec![0.; 3];
        let mut wwx = vec![0.; 3];
        c.mul_W(&mut wx, &x);
        c.mul_W(&mut wwx, &wx);

        //same product through the rank-two representation
        let u = [c.u0, c.u1 * c.q[0], c.u1 * c.q[1]];
        let v = [0., c.v1 * c.q[0], c.v1 * c.q[1]];
        let utx: f64 = u.iter().zip(x.iter()).map(|(a, b)| a * b).sum();
        let vtx: f64 = v.iter().zip(x.iter()).map(|(a, b)| a * b).sum();
        let mut expect = vec![0.; 3];
        expect[0] = c.η2 * (c.d1 * x[0] + utx * u[0] - vtx * v[0]);
        for i in 1..3 {
            expect[i] = c.η2 * (x[i] + utx * u[i] - vtx * v[i]);
        }

        assert!(wwx.dist(&expect) <= 1e-12);
    }
}
