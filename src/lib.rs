//Rust hates greek characters
#![allow(confusable_idents)]
#![allow(uncommon_codepoints)]
#![allow(mixed_script_confusables)]

//! <h1>Lorentz</h1>
//!
//! An interior-point solver for linear and second-order cone programs in
//! the standard form
//!
//! ```text
//! minimize    c'x
//! subject to  Ax = b
//!             Gx + s = h,  s ∈ K
//! ```
//!
//! where `K` is a product of a nonnegative orthant and a sequence of
//! second-order (Lorentz) cones.  The solver works on a homogeneous
//! self-dual embedding of the problem, so primal and dual infeasibility
//! are detected and certified rather than causing divergence.
//!
//! All floating point computation is generic over the scalar type via
//! [`FloatT`](crate::algebra::FloatT), with implementations provided for
//! `f32` and `f64`.

pub mod algebra;
pub mod ldl;
pub mod solver;
