use super::{FloatT, VectorMath};
use std::iter::zip;

impl<T: FloatT> VectorMath<T> for [T] {
    fn copy_from(&mut self, src: &[T]) -> &mut Self {
        self.copy_from_slice(src);
        self
    }

    fn scalarop(&mut self, op: impl Fn(T) -> T) -> &mut Self {
        for x in &mut *self {
            *x = op(*x);
        }
        self
    }

    fn scalarop_from(&mut self, op: impl Fn(T) -> T, v: &[T]) -> &mut Self {
        for (x, v) in zip(&mut *self, v) {
            *x = op(*v);
        }
        self
    }

    fn translate(&mut self, c: T) -> &mut Self {
        self.scalarop(|x| x + c)
    }

    fn scale(&mut self, c: T) -> &mut Self {
        self.scalarop(|x| x * c)
    }

    fn recip(&mut self) -> &mut Self {
        self.scalarop(T::recip)
    }

    fn sqrt(&mut self) -> &mut Self {
        self.scalarop(T::sqrt)
    }

    fn negate(&mut self) -> &mut Self {
        self.scalarop(|x| -x)
    }

    fn hadamard(&mut self, y: &[T]) -> &mut Self {
        zip(&mut *self, y).for_each(|(x, y)| *x *= *y);
        self
    }

    fn hadamard_div(&mut self, y: &[T]) -> &mut Self {
        zip(&mut *self, y).for_each(|(x, y)| *x /= *y);
        self
    }

    fn dot(&self, y: &[T]) -> T {
        zip(self, y).fold(T::zero(), |acc, (&x, &y)| acc + x * y)
    }

    fn dist(&self, y: &Self) -> T {
        let dist2 = zip(self, y).fold(T::zero(), |acc, (&x, &y)| acc + (x - y) * (x - y));
        T::sqrt(dist2)
    }

    fn sumsq(&self) -> T {
        self.dot(self)
    }

    fn norm(&self) -> T {
        T::sqrt(self.sumsq())
    }

    fn norm_inf(&self) -> T {
        let mut out = T::zero();
        for v in self.iter().map(|v| v.abs()) {
            if v.is_nan() {
                return T::nan();
            }
            out = if v > out { v } else { out };
        }
        out
    }

    fn minimum(&self) -> T {
        self.iter().fold(T::infinity(), |r, &s| T::min(r, s))
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|&x| T::is_finite(x))
    }

    fn axpby(&mut self, a: T, x: &[T], b: T) -> &mut Self {
        assert_eq!(self.len(), x.len());

        //dispatch on b = 1 / 0 separately since those are by
        //far the most common cases in the solver iteration
        if b == T::one() {
            zip(&mut *self, x).for_each(|(y, x)| *y += a * (*x));
        } else if b == T::zero() {
            zip(&mut *self, x).for_each(|(y, x)| *y = a * (*x));
        } else {
            zip(&mut *self, x).for_each(|(y, x)| *y = a * (*x) + b * (*y));
        }
        self
    }

    fn waxpby(&mut self, a: T, x: &[T], b: T, y: &[T]) -> &mut Self {
        assert_eq!(self.len(), x.len());
        assert_eq!(self.len(), y.len());

        for (w, (x, y)) in zip(&mut *self, zip(x, y)) {
            *w = a * (*x) + b * (*y);
        }
        self
    }
}

// -------------
// testing

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot() {
        let x = vec![1., 2., 3., 4.];
        let y = vec![4., 5., 6., 7.];
        assert_eq!(x.dot(&y), 60.);
    }

    #[test]
    fn test_axpby() {
        let mut y = vec![1., 1., 1.];
        let x = vec![1., 2., 3.];
        y.axpby(2., &x, 1.);
        assert_eq!(y, vec![3., 5., 7.]);

        y.axpby(1., &x, 0.);
        assert_eq!(y, x);
    }

    #[test]
    fn test_norms() {
        let x = vec![3., -4.];
        assert_eq!(x.norm(), 5.);
        assert_eq!(x.norm_inf(), 4.);
        assert_eq!(x.minimum(), -4.);

        let empty: Vec<f64> = vec![];
        assert_eq!(empty.minimum(), f64::INFINITY);
    }

    #[test]
    fn test_hadamard_div_roundtrip() {
        let mut x = vec![2., 6., -8.];
        let d = vec![2., 3., 4.];
        x.hadamard_div(&d);
        assert_eq!(x, vec![1., 2., -2.]);
        x.hadamard(&d);
        assert_eq!(x, vec![2., 6., -8.]);
    }
}
