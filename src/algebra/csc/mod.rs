// All internal matrix representations are in standard compressed
// sparse column format, as is the API.

mod core;
mod matrix_math;
mod utils;

pub use self::core::*;
