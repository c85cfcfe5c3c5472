//---------------------------------------------------------
// low-level internal utilities for counting / filling entries
// in block partitioned sparse matrices.   Used by the KKT
// assembler, which builds its triu matrix column by column
// with per-column write cursors held in `colptr`.
//---------------------------------------------------------

use crate::algebra::{CscMatrix, FloatT};
use std::iter::zip;

impl<T> CscMatrix<T>
where
    T: FloatT,
{
    // increment self.colptr by the number of nonzeros
    // in a square diagonal block starting at `initcol`.
    pub(crate) fn colcount_diag(&mut self, initcol: usize, blockcols: usize) {
        let cols = self.colptr[initcol..(initcol + blockcols)].iter_mut();
        cols.for_each(|x| *x += 1);
    }

    // increment self.colptr by a number of nonzeros, accounting
    // for a vector that partially populates one column.
    pub(crate) fn colcount_colvec(&mut self, n: usize, firstcol: usize) {
        self.colptr[firstcol] += n;
    }

    // increment self.colptr by the entries of M', with the entry at
    // row r of M landing in destination column colmap[r].  Produces
    // the column counts of a transposed block placed at an arbitrary
    // (possibly non-contiguous) set of destination columns.
    pub(crate) fn colcount_block_t(&mut self, M: &CscMatrix<T>, colmap: &[usize]) {
        for row in M.rowval.iter() {
            self.colptr[colmap[*row]] += 1;
        }
    }

    // cumsum the column counts into colptr form, shifted by one
    // position so that each entry is a write cursor for its column.
    pub(crate) fn colcount_to_colptr(&mut self) {
        let mut currentptr = 0;
        for p in self.colptr.iter_mut() {
            let count = *p;
            *p = currentptr;
            currentptr += count;
        }
    }

    // populate a transposed block using self.colptr as per-column
    // write cursors.  The entry of M at (r, c) is written to
    // destination (row c, column colmap[r]).  Sweeping M in CSC
    // order guarantees ascending row indices in each destination
    // column.
    pub(crate) fn fill_block_t(&mut self, M: &CscMatrix<T>, colmap: &[usize]) {
        for i in 0..M.n {
            for j in M.colptr[i]..M.colptr[i + 1] {
                let col = colmap[M.rowval[j]];
                let dest = self.colptr[col];
                self.rowval[dest] = i;
                self.nzval[dest] = M.nzval[j];
                self.colptr[col] += 1;
            }
        }
    }

    // populate a partial column with structural zeros using the
    // self.colptr write cursor, recording the nzval index of each
    // entry into `vtok`.
    pub(crate) fn fill_colvec(&mut self, vtok: &mut [usize], initrow: usize, initcol: usize) {
        for (i, v) in vtok.iter_mut().enumerate() {
            let dest = self.colptr[initcol];
            self.rowval[dest] = initrow + i;
            self.nzval[dest] = T::zero();
            *v = dest;
            self.colptr[initcol] += 1;
        }
    }

    // populate a diagonal block with structural zeros, recording the
    // nzval index of each diagonal entry into `dtok`.  Must be called
    // after all off-diagonal fills for these columns (triu form puts
    // the diagonal last in each column).
    pub(crate) fn fill_diag(&mut self, dtok: &mut [usize], initcol: usize) {
        for (i, d) in dtok.iter_mut().enumerate() {
            let col = initcol + i;
            let dest = self.colptr[col];
            self.rowval[dest] = col;
            self.nzval[dest] = T::zero();
            *d = dest;
            self.colptr[col] += 1;
        }
    }

    // the fill functions above advanced each colptr entry to the end
    // of its column.  Shift them all back down one position to recover
    // the standard CSC colptr.
    pub(crate) fn backshift_colptrs(&mut self) {
        let mut prev = 0;
        for p in self.colptr.iter_mut() {
            std::mem::swap(&mut prev, p);
        }
        debug_assert!(zip(&self.colptr[..], &self.colptr[1..]).all(|(a, b)| a <= b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transposed_block_fill() {
        // destination holds M' for a 2x3 M, with identity column map
        let M = CscMatrix::from(&[
            [1., 0., 3.], //
            [0., 2., 4.], //
        ]);
        let colmap = [0, 1];

        let mut K = CscMatrix::<f64>::spalloc(3, 2, M.nnz());
        K.colptr.fill(0);
        K.colcount_block_t(&M, &colmap);
        K.colcount_to_colptr();
        K.fill_block_t(&M, &colmap);
        K.backshift_colptrs();

        let Mt = CscMatrix::from(&[
            [1., 0.], //
            [0., 2.], //
            [3., 4.], //
        ]);
        assert_eq!(K, Mt);
    }

    #[test]
    fn test_diag_and_colvec_fill() {
        //build  [ 10  0  v0 ]
        //       [  0 20  v1 ]
        //       [  0  0  30 ]   with v recorded for later writing
        let mut K = CscMatrix::<f64>::spalloc(3, 3, 5);
        K.colptr.fill(0);
        K.colcount_diag(0, 3);
        K.colcount_colvec(2, 2);
        K.colcount_to_colptr();

        let mut vmap = [0usize; 2];
        let mut dmap = [0usize; 3];
        K.fill_colvec(&mut vmap, 0, 2);
        K.fill_diag(&mut dmap, 0);
        K.backshift_colptrs();

        for (i, &di) in dmap.iter().enumerate() {
            K.nzval[di] = (10 * (i + 1)) as f64;
        }
        K.nzval[vmap[0]] = 1.;
        K.nzval[vmap[1]] = 2.;

        let target = CscMatrix::from(&[
            [10., 0., 1.],  //
            [0., 20., 2.],  //
            [0., 0., 30.], //
        ]);
        assert_eq!(K, target);
        assert!(K.check_format().is_ok());
    }
}
