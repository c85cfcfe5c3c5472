#![allow(non_snake_case)]
use super::equilibration::EquilibrationData;
use crate::algebra::*;
use thiserror::Error;

/// Error type returned on construction of a
/// [`Solver`](crate::solver::Solver) with invalid problem data.  No
/// iteration is performed when any of these is raised.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("A and G have incompatible column dimensions")]
    IncompatibleDimension,
    #[error("vector data has lengths inconsistent with the matrix dimensions")]
    BadVectorDimension,
    #[error("second-order cone dimensions must be at least 2")]
    BadConeSize,
    #[error("cone dimensions exceed the row dimension of G")]
    BadConePartition,
    #[error("problem data contains non-finite entries")]
    NonFiniteData,
    #[error("matrix data is not in valid CSC format")]
    BadSparseFormat(#[from] SparseFormatError),
}

// ---------------
// problem data in standard conic form
// ---------------

/// Problem data for the conic program
/// `min c'x  s.t.  Ax = b, Gx + s = h, s ∈ K`.
///
/// The data is held in equilibrated form during a solve and restored on
/// termination.
pub struct ProblemData<T> {
    /// objective vector
    pub c: Vec<T>,
    /// equality constraint matrix (p × n, possibly with p = 0)
    pub A: CscMatrix<T>,
    /// equality right-hand side
    pub b: Vec<T>,
    /// conic constraint matrix (m × n)
    pub G: CscMatrix<T>,
    /// conic right-hand side
    pub h: Vec<T>,

    /// number of variables
    pub n: usize,
    /// number of equality constraints
    pub p: usize,
    /// number of conic constraints
    pub m: usize,
    /// dimension of the nonnegative orthant block
    pub l: usize,
    /// second-order cone dimensions, in row order of G
    pub soc_dims: Vec<usize>,

    /// Ruiz equilibration state
    pub equilibration: EquilibrationData<T>,
}

impl<T> ProblemData<T>
where
    T: FloatT,
{
    pub fn new(
        G: &CscMatrix<T>,
        A: &CscMatrix<T>,
        c: &[T],
        h: &[T],
        b: &[T],
        soc_dims: &[usize],
    ) -> Result<Self, SolverError> {
        G.check_format()?;
        A.check_format()?;

        let n = G.ncols();
        let m = G.nrows();
        let p = A.nrows();

        // A may be supplied 0 x 0 when there are no equalities
        let empty_A = A.nrows() == 0 && A.ncols() == 0;
        if A.ncols() != n && !empty_A {
            return Err(SolverError::IncompatibleDimension);
        }
        if c.len() != n || h.len() != m || b.len() != p {
            return Err(SolverError::BadVectorDimension);
        }

        if soc_dims.iter().any(|&d| d < 2) {
            return Err(SolverError::BadConeSize);
        }
        let conedim: usize = soc_dims.iter().sum();
        if conedim > m {
            return Err(SolverError::BadConePartition);
        }
        let l = m - conedim;

        if !(c.is_finite()
            && h.is_finite()
            && b.is_finite()
            && G.nzval.is_finite()
            && A.nzval.is_finite())
        {
            return Err(SolverError::NonFiniteData);
        }

        // internal copies: the solver scales its data in place
        let mut A = A.clone();
        if A.ncols() == 0 {
            // allow an empty A to be passed as 0 x 0
            A.n = n;
            A.colptr = vec![0; n + 1];
        }

        Ok(Self {
            c: c.to_vec(),
            A,
            b: b.to_vec(),
            G: G.clone(),
            h: h.to_vec(),
            n,
            p,
            m,
            l,
            soc_dims: soc_dims.to_vec(),
            equilibration: EquilibrationData::new(n, p, m),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        let G = CscMatrix::from(&[[1., 0.], [0., 1.]]);
        let A = CscMatrix::<f64>::zeros(0, 0);

        //consistent data
        assert!(ProblemData::new(&G, &A, &[1., 1.], &[1., 1.], &[], &[]).is_ok());

        //c is the wrong length
        assert!(matches!(
            ProblemData::new(&G, &A, &[1.], &[1., 1.], &[], &[]),
            Err(SolverError::BadVectorDimension)
        ));

        //cone of dimension 1
        assert!(matches!(
            ProblemData::new(&G, &A, &[1., 1.], &[1., 1.], &[], &[1]),
            Err(SolverError::BadConeSize)
        ));

        //cones larger than G
        assert!(matches!(
            ProblemData::new(&G, &A, &[1., 1.], &[1., 1.], &[], &[3]),
            Err(SolverError::BadConePartition)
        ));

        //non-finite entries
        assert!(matches!(
            ProblemData::new(&G, &A, &[1., f64::NAN], &[1., 1.], &[], &[]),
            Err(SolverError::NonFiniteData)
        ));
    }
}
