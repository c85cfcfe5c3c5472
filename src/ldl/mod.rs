//! Direct solvers for the symmetric quasidefinite KKT systems arising
//! in the interior-point iteration.
//!
//! The solver core talks to the factorization engine only through the
//! [`DirectLdlSolver`](crate::ldl::DirectLdlSolver) trait: symbolic
//! analysis happens once at construction, and each interior-point
//! iteration then calls `factor` with updated numeric values followed by
//! one or more `solve` calls.  The bundled engine is an LDLᵀ
//! factorization with AMD fill-reducing ordering and dynamic
//! regularization of near-zero pivots.

use crate::algebra::{CscMatrix, FloatT};

mod qdldl;
pub use qdldl::*;

/// Interface to a direct LDLᵀ engine for sparse symmetric quasidefinite
/// matrices in upper-triangular CSC form.
///
/// Implementations analyze the nonzero pattern once at construction and
/// must accept repeated `factor` calls against matrices with identical
/// structure but new values.
pub trait DirectLdlSolver<T: FloatT> {
    /// Numerically refactor using the values of `kkt`.  The pattern of
    /// `kkt` must be the one supplied at construction.   Returns `false`
    /// if the factorization failed or produced non-finite pivots.
    fn factor(&mut self, kkt: &CscMatrix<T>) -> bool;

    /// Solve `Kx = b` using the most recent factorization.
    fn solve(&mut self, x: &mut [T], b: &[T]);
}
