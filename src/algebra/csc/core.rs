#![allow(non_snake_case)]

use crate::algebra::{FloatT, SparseFormatError};

/// Sparse matrix in standard Compressed Sparse Column (CSC) format.
///
/// __Example usage__ : to construct the 3 x 3 matrix
/// ```text
/// A = [1.  3.  5.]
///     [2.  0.  6.]
///     [0.  4.  7.]
/// ```
///
/// ```no_run
/// use lorentz::algebra::CscMatrix;
///
/// let A : CscMatrix<f64> = CscMatrix::new(
///    3,                                // m
///    3,                                // n
///    vec![0, 2, 4, 7],                 // colptr
///    vec![0, 1, 0, 2, 0, 1, 2],        // rowval
///    vec![1., 2., 3., 4., 5., 6., 7.], // nzval
///  );
///
/// // optional correctness check
/// assert!(A.check_format().is_ok());
/// ```

#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix<T = f64> {
    /// number of rows
    pub m: usize,
    /// number of columns
    pub n: usize,
    /// CSC format column pointer.
    ///
    /// This field should have length `n+1`. The last entry corresponds
    /// to the number of nonzeros and should agree with the lengths of
    /// the `rowval` and `nzval` fields.
    pub colptr: Vec<usize>,
    /// vector of row indices
    pub rowval: Vec<usize>,
    /// vector of non-zero matrix elements
    pub nzval: Vec<T>,
}

/// Borrowed transpose of a [`CscMatrix`](crate::algebra::CscMatrix),
/// produced by [`t`](crate::algebra::CscMatrix::t).
pub struct Adjoint<'a, M> {
    pub src: &'a M,
}

/// Borrowed symmetric view of a triu [`CscMatrix`](crate::algebra::CscMatrix),
/// produced by [`sym`](crate::algebra::CscMatrix::sym).
pub struct Symmetric<'a, M> {
    pub src: &'a M,
}

impl<T> CscMatrix<T>
where
    T: FloatT,
{
    /// `CscMatrix` constructor.
    ///
    /// # Panics
    /// Makes rudimentary dimensional compatibility checks and panics on
    /// failure.  This constructor does __not__ ensure that row indices
    /// are in bounds or sorted within each column; use
    /// [`check_format`](CscMatrix::check_format) for a full check.
    pub fn new(m: usize, n: usize, colptr: Vec<usize>, rowval: Vec<usize>, nzval: Vec<T>) -> Self {
        assert_eq!(rowval.len(), nzval.len());
        assert_eq!(colptr.len(), n + 1);
        assert_eq!(colptr[n], rowval.len());
        CscMatrix {
            m,
            n,
            colptr,
            rowval,
            nzval,
        }
    }

    /// Allocate space for an `m` x `n` sparse matrix with `nnz` elements.
    pub fn spalloc(m: usize, n: usize, nnz: usize) -> Self {
        let mut colptr = vec![0; n + 1];
        let rowval = vec![0; nnz];
        let nzval = vec![T::zero(); nnz];
        colptr[n] = nnz;

        CscMatrix::new(m, n, colptr, rowval, nzval)
    }

    /// An `m` x `n` matrix of (structural) zeros.
    pub fn zeros(m: usize, n: usize) -> Self {
        CscMatrix::spalloc(m, n, 0)
    }

    /// Identity matrix of size `n`.
    pub fn identity(n: usize) -> Self {
        let colptr = (0usize..=n).collect();
        let rowval = (0usize..n).collect();
        let nzval = vec![T::one(); n];

        CscMatrix::new(n, n, colptr, rowval, nzval)
    }

    /// number of rows
    pub fn nrows(&self) -> usize {
        self.m
    }
    /// number of columns
    pub fn ncols(&self) -> usize {
        self.n
    }
    /// dimensions as a `(rows, cols)` tuple
    pub fn size(&self) -> (usize, usize) {
        (self.m, self.n)
    }
    /// number of nonzeros
    pub fn nnz(&self) -> usize {
        self.colptr[self.n]
    }
    /// true if `self.nrows() == self.ncols()`
    pub fn is_square(&self) -> bool {
        self.m == self.n
    }

    /// true if the matrix has entries on or above the diagonal only
    pub fn is_triu(&self) -> bool {
        for col in 0..self.n {
            for j in self.colptr[col]..self.colptr[col + 1] {
                if self.rowval[j] > col {
                    return false;
                }
            }
        }
        true
    }

    /// Borrowed transpose.
    pub fn t(&self) -> Adjoint<'_, Self> {
        Adjoint { src: self }
    }

    /// Borrowed symmetric view.  The source data must be triu.
    pub fn sym(&self) -> Symmetric<'_, Self> {
        debug_assert!(self.is_triu());
        Symmetric { src: self }
    }

    /// Checks the internal CSC representation for consistency: array
    /// lengths, monotone column pointers, in-bounds and strictly
    /// ascending row indices within every column.
    pub fn check_format(&self) -> Result<(), SparseFormatError> {
        if self.rowval.len() != self.nzval.len()
            || self.colptr.len() != self.n + 1
            || self.colptr[self.n] != self.rowval.len()
        {
            return Err(SparseFormatError::IncompatibleDimension);
        }

        if self.colptr.windows(2).any(|c| c[0] > c[1]) {
            return Err(SparseFormatError::BadColptr);
        }

        for col in 0..self.n {
            let rows = &self.rowval[self.colptr[col]..self.colptr[col + 1]];
            if rows.iter().any(|&r| r >= self.m) {
                return Err(SparseFormatError::BadRowval);
            }
            if rows.windows(2).any(|w| w[0] >= w[1]) {
                return Err(SparseFormatError::BadRowOrdering);
            }
        }
        Ok(())
    }
}

/// Construct a `CscMatrix` from a dense array of arrays, dropping zero
/// entries.  Mainly useful for building small test fixtures.
impl<T, const R: usize, const C: usize> From<&[[T; C]; R]> for CscMatrix<T>
where
    T: FloatT,
{
    fn from(rows: &[[T; C]; R]) -> Self {
        let mut colptr = Vec::with_capacity(C + 1);
        let mut rowval = Vec::new();
        let mut nzval = Vec::new();

        colptr.push(0);
        for c in 0..C {
            for (r, row) in rows.iter().enumerate() {
                if row[c] != T::zero() {
                    rowval.push(r);
                    nzval.push(row[c]);
                }
            }
            colptr.push(rowval.len());
        }

        CscMatrix::new(R, C, colptr, rowval, nzval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dense() {
        let A = CscMatrix::from(&[
            [1., 0.], //
            [2., 3.], //
        ]);
        assert_eq!(A.size(), (2, 2));
        assert_eq!(A.colptr, vec![0, 2, 3]);
        assert_eq!(A.rowval, vec![0, 1, 1]);
        assert_eq!(A.nzval, vec![1., 2., 3.]);
        assert!(A.check_format().is_ok());
    }

    #[test]
    fn test_is_triu() {
        let A = CscMatrix::from(&[
            [1., 4.], //
            [0., 3.], //
        ]);
        assert!(A.is_triu());

        let B = CscMatrix::from(&[
            [1., 0.], //
            [2., 3.], //
        ]);
        assert!(!B.is_triu());
    }

    #[test]
    fn test_check_format() {
        let mut A = CscMatrix::<f64>::identity(3);
        assert!(A.check_format().is_ok());

        A.rowval[2] = 5; //out of bounds
        assert!(matches!(
            A.check_format(),
            Err(SparseFormatError::BadRowval)
        ));
    }
}
