//! Internal algebra for the solver: scalar/vector math traits and a
//! standalone sparse matrix type in compressed sparse column format.
//!
//! Users interact with this module only to build problem data in
//! [`CscMatrix`](crate::algebra::CscMatrix) form.  Everything else is
//! machinery for the solver itself, implemented generically over scalars
//! satisfying the [`FloatT`](crate::algebra::FloatT) trait.

mod error_types;
mod floats;
mod math_traits;
pub use error_types::*;
pub use floats::*;
pub use math_traits::*;

mod scalarmath;
mod vecmath;

mod csc;
pub use csc::*;
