#![allow(non_snake_case)]
use super::DirectLdlSolver;
use crate::algebra::*;
use derive_builder::Builder;
use std::cmp::{max, min};
use std::iter::zip;
use thiserror::Error;

/// Error codes returnable from [`LdlFactorization`](LdlFactorization)
/// factor operations.

#[derive(Error, Debug)]
pub enum LdlError {
    #[error("Matrix dimension fields are incompatible")]
    IncompatibleDimension,
    #[error("Matrix has a zero column")]
    EmptyColumn,
    #[error("Matrix is not upper triangular")]
    NotUpperTriangular,
    #[error("Matrix factorization produced a zero pivot")]
    ZeroPivot,
}

/// Settings for [`LdlFactorization`](LdlFactorization).

#[derive(Builder, Debug, Clone)]
pub struct LdlSettings<T: FloatT> {
    /// scaling applied to the AMD dense-row threshold.  KKT systems
    /// with sparse SOC expansion blocks are artificially "big", so a
    /// slightly more generous threshold than the AMD default helps.
    #[builder(default = "1.5")]
    pub amd_dense_scale: f64,

    /// expected signs of D in K = LDLᵀ, one per column
    #[builder(default = "None", setter(strip_option))]
    pub dsigns: Option<Vec<i8>>,

    /// dynamic regularization enable
    #[builder(default = "true")]
    pub regularize_enable: bool,

    /// pivots with `D[k]*sign` below this threshold are regularized
    #[builder(default = "(1e-13).as_T()")]
    pub regularize_eps: T,

    /// replacement magnitude for regularized pivots
    #[builder(default = "(2e-7).as_T()")]
    pub regularize_delta: T,
}

impl<T> Default for LdlSettings<T>
where
    T: FloatT,
{
    fn default() -> LdlSettings<T> {
        LdlSettingsBuilder::<T>::default().build().unwrap()
    }
}

/// LDLᵀ factorization of a sparse symmetric quasidefinite matrix with
/// upper-triangular storage.
///
/// Construction performs the symbolic analysis (fill-reducing ordering,
/// elimination tree, allocation of the factor); repeated calls to
/// [`factor`](LdlFactorization::factor) then refactor numerically
/// against new values with the same pattern.

#[derive(Debug)]
pub struct LdlFactorization<T = f64> {
    // fill reducing permutation and its inverse
    perm: Vec<usize>,
    #[allow(dead_code)] //unused because solve inverts through perm. Keep anyway.
    iperm: Vec<usize>,

    // lower triangular factor
    L: CscMatrix<T>,

    // D and its inverse for K = LDL^T
    D: Vec<T>,
    pub(crate) Dinv: Vec<T>,

    // the permuted triu matrix to be factored, and the mapping from
    // the entries of the input matrix into it.  Numeric refactors
    // scatter new input values through this map.
    permK: CscMatrix<T>,
    KtoPKP: Vec<usize>,

    // elimination tree and column counts of L
    etree: Vec<usize>,
    Lnz: Vec<usize>,

    // permuted pivot signs and regularization parameters
    dsigns: Vec<i8>,
    regularize_enable: bool,
    regularize_eps: T,
    regularize_delta: T,

    // working memory for factor and solve
    iwork: Vec<usize>,
    bwork: Vec<bool>,
    fwork: Vec<T>,
}

impl<T> LdlFactorization<T>
where
    T: FloatT,
{
    /// Symbolic setup for the matrix `K`, which must be square, upper
    /// triangular, and structurally nonsingular (no empty columns).
    pub fn new(K: &CscMatrix<T>, opts: Option<LdlSettings<T>>) -> Result<Self, LdlError> {
        _check_structure(K)?;

        let n = K.nrows();
        let opts = opts.unwrap_or_default();

        let (perm, iperm) = _amd_ordering(K, opts.amd_dense_scale);

        //permute to (another) upper triangular matrix and store the
        //index mapping the input's entries to the permutation's entries
        let (permK, KtoPKP) = _permute_symmetric(K, &iperm);

        // permuted copy of the pivot signs, defaulting to positive
        let mut dsigns = vec![1_i8; n];
        if let Some(ds) = opts.dsigns {
            _permute(&mut dsigns, &ds, &perm);
        }

        // elimination tree and column counts of L
        let mut etree = vec![0; n];
        let mut Lnz = vec![0; n];
        let mut iwork = vec![0; 3 * n];
        _etree(n, &permK.colptr, &permK.rowval, &mut iwork, &mut Lnz, &mut etree);

        let sumLnz = Lnz.iter().sum();
        let L = CscMatrix::spalloc(n, n, sumLnz);

        Ok(Self {
            perm,
            iperm,
            L,
            D: vec![T::zero(); n],
            Dinv: vec![T::zero(); n],
            permK,
            KtoPKP,
            etree,
            Lnz,
            dsigns,
            regularize_enable: opts.regularize_enable,
            regularize_eps: opts.regularize_eps,
            regularize_delta: opts.regularize_delta,
            iwork,
            bwork: vec![false; n],
            fwork: vec![T::zero(); n],
        })
    }

    /// Numeric factorization against the values of `K`, whose pattern
    /// must agree with the matrix passed at construction.
    pub fn factor(&mut self, K: &CscMatrix<T>) -> Result<(), LdlError> {
        // scatter the (unpermuted) input values into our permuted copy
        for (val, &idx) in zip(&K.nzval, &self.KtoPKP) {
            self.permK.nzval[idx] = *val;
        }

        _factor_numeric(
            &self.permK,
            &mut self.L,
            &mut self.D,
            &mut self.Dinv,
            &self.Lnz,
            &self.etree,
            &mut self.bwork,
            &mut self.iwork,
            &mut self.fwork,
            &self.dsigns,
            self.regularize_enable,
            self.regularize_eps,
            self.regularize_delta,
        )
    }

    /// Solves `Kx = b` in place using the current factors, where `x`
    /// enters holding `b`.
    pub fn solve_in_place(&mut self, x: &mut [T]) {
        assert_eq!(x.len(), self.D.len());

        // permute into workspace, triangular solves, permute back
        let tmp = &mut self.fwork;
        _permute(tmp, x, &self.perm);

        _lsolve(&self.L.colptr, &self.L.rowval, &self.L.nzval, tmp);
        tmp.hadamard(&self.Dinv);
        _ltsolve(&self.L.colptr, &self.L.rowval, &self.L.nzval, tmp);

        _ipermute(x, tmp, &self.perm);
    }

}

impl<T> DirectLdlSolver<T> for LdlFactorization<T>
where
    T: FloatT,
{
    fn factor(&mut self, kkt: &CscMatrix<T>) -> bool {
        LdlFactorization::factor(self, kkt).is_ok() && self.Dinv.is_finite()
    }

    fn solve(&mut self, x: &mut [T], b: &[T]) {
        x.copy_from(b);
        self.solve_in_place(x);
    }
}

fn _check_structure<T: FloatT>(A: &CscMatrix<T>) -> Result<(), LdlError> {
    if !A.is_square() {
        return Err(LdlError::IncompatibleDimension);
    }

    if !A.is_triu() {
        return Err(LdlError::NotUpperTriangular);
    }

    //Error if A doesn't have at least one entry in every column
    if !A.colptr.windows(2).all(|c| c[0] < c[1]) {
        return Err(LdlError::EmptyColumn);
    }

    Ok(())
}

// ---------------------------------------------------------
// fill reducing ordering via AMD
// ---------------------------------------------------------

fn _amd_ordering<T: FloatT>(A: &CscMatrix<T>, dense_scale: f64) -> (Vec<usize>, Vec<usize>) {
    let mut control = amd::Control::default();
    control.dense *= dense_scale;
    let (perm, iperm, _info) = amd::order(A.nrows(), &A.colptr, &A.rowval, &control).unwrap();
    (perm, iperm)
}

// internal permutation and inverse permutation
// functions that require no memory allocations

fn _permute<V: Copy>(x: &mut [V], b: &[V], p: &[usize]) {
    zip(p, x).for_each(|(p, x)| *x = b[*p]);
}

fn _ipermute<V: Copy>(x: &mut [V], b: &[V], p: &[usize]) {
    zip(p, b).for_each(|(p, b)| x[*p] = *b);
}

// Given a sparse symmetric matrix `A` (with only upper triangular
// entries), return the permuted sparse symmetric matrix `P` (also
// upper triangular) given the inverse permutation vector `iperm`,
// together with the entry mapping from `A` into `P`.
fn _permute_symmetric<T: FloatT>(A: &CscMatrix<T>, iperm: &[usize]) -> (CscMatrix<T>, Vec<usize>) {
    let n = A.ncols();
    let mut P = CscMatrix::<T>::spalloc(n, n, A.nnz());
    let mut AtoPAPt = vec![0; A.nnz()];

    // 1. count the number of entries each column of P will have
    let mut num_entries = vec![0; n];
    for colA in 0..n {
        let colP = iperm[colA];
        for rowA in &A.rowval[A.colptr[colA]..A.colptr[colA + 1]] {
            let rowP = iperm[*rowA];
            // destination column is the max of the permuted pair,
            // keeping the entry in the upper triangle
            num_entries[max(rowP, colP)] += 1;
        }
    }

    // 2. cumsum to get the permuted colptr
    P.colptr[0] = 0;
    let mut acc = 0;
    for (Pckp1, ne) in zip(&mut P.colptr[1..], &num_entries) {
        *Pckp1 = acc + ne;
        acc = *Pckp1;
    }

    // reuse this memory to track the next free slot in each column
    num_entries.copy_from_slice(&P.colptr[0..n]);
    let mut row_starts = num_entries;

    // 3. permute the entries, recording the mapping.  Note that the
    // resulting columns are not sorted by row index; the numeric
    // factorization does not require them to be.
    for colA in 0..n {
        let colP = iperm[colA];
        for idxA in A.colptr[colA]..A.colptr[colA + 1] {
            let rowP = iperm[A.rowval[idxA]];

            let col_idx = max(colP, rowP);
            let idxP = row_starts[col_idx];

            P.rowval[idxP] = min(colP, rowP);
            P.nzval[idxP] = A.nzval[idxA];
            AtoPAPt[idxA] = idxP;

            row_starts[col_idx] += 1;
        }
    }

    (P, AtoPAPt)
}

// ---------------------------------------------------------
// elimination tree and numeric factorization.  These follow the
// standard quasidefinite LDL^T elimination scheme for triu input.
// ---------------------------------------------------------

const UNKNOWN: usize = usize::MAX;

// Compute the elimination tree and per-column nonzero counts of L
// for a quasidefinite matrix in triu CSC form.
fn _etree(
    n: usize,
    Ap: &[usize],
    Ai: &[usize],
    work: &mut [usize],
    Lnz: &mut [usize],
    etree: &mut [usize],
) {
    work[..n].fill(0);
    Lnz.fill(0);
    etree.fill(UNKNOWN);

    for j in 0..n {
        work[j] = j;
        for istart in Ai.iter().take(Ap[j + 1]).skip(Ap[j]) {
            let mut i = *istart;

            while work[i] != j {
                if etree[i] == UNKNOWN {
                    etree[i] = j;
                }
                Lnz[i] += 1; // nonzeros in this column of L
                work[i] = j;
                i = etree[i];
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn _factor_numeric<T: FloatT>(
    A: &CscMatrix<T>,
    L: &mut CscMatrix<T>,
    D: &mut [T],
    Dinv: &mut [T],
    Lnz: &[usize],
    etree: &[usize],
    bwork: &mut [bool],
    iwork: &mut [usize],
    fwork: &mut [T],
    dsigns: &[i8],
    regularize_enable: bool,
    regularize_eps: T,
    regularize_delta: T,
) -> Result<(), LdlError> {
    let n = A.ncols();
    let (Ap, Ai, Ax) = (&A.colptr, &A.rowval, &A.nzval);

    // partition working memory into pieces
    let y_markers = bwork;
    let (y_idx, iwork) = iwork.split_at_mut(n);
    let (elim_buffer, next_colspace) = iwork.split_at_mut(n);
    let y_vals = fwork;

    //set L.colptr to cumsum(Lnz), starting from zero
    L.colptr[0] = 0;
    let mut acc = 0;
    for (Lp, Lnz) in zip(&mut L.colptr[1..], Lnz) {
        *Lp = acc + Lnz;
        acc = *Lp;
    }

    y_markers.fill(false);
    y_vals.fill(T::zero());
    D.fill(T::zero());
    next_colspace.copy_from_slice(&L.colptr[0..n]);

    // first element of D.  The upper left corner of L is trivially
    // empty since only the subdiagonal part is computed
    D[0] = Ax[0];
    _regularize_pivot(
        &mut D[0],
        dsigns[0],
        regularize_enable,
        regularize_eps,
        regularize_delta,
    );
    if D[0] == T::zero() {
        return Err(LdlError::ZeroPivot);
    }
    Dinv[0] = T::recip(D[0]);

    // for each k, solve y = L(0:k-1, 0:k-1)\b, where b is the strictly
    // upper part of the kth column of A.  The solution y is then the
    // kth row of L, with an implied unit diagonal.
    for k in 1..n {
        let mut nnz_y = 0; // number of nonzeros in this row of L

        // first pass determines where the nonzeros go, walking the
        // elimination tree from each entry of b
        for i in Ap[k]..Ap[k + 1] {
            let bidx = Ai[i];

            // the diagonal entry of this column seeds D[k] and takes
            // no part in the elimination below
            if bidx == k {
                D[k] = Ax[i];
                continue;
            }

            y_vals[bidx] = Ax[i];

            if !y_markers[bidx] {
                y_markers[bidx] = true;
                elim_buffer[0] = bidx;
                let mut nnz_e = 1; //length of unvisited elimination path

                let mut next_idx = etree[bidx];
                while next_idx != UNKNOWN && next_idx < k {
                    if y_markers[next_idx] {
                        break;
                    }
                    y_markers[next_idx] = true;
                    elim_buffer[nnz_e] = next_idx;
                    next_idx = etree[next_idx];
                    nnz_e += 1;
                }

                // put the buffered elimination path into the current
                // ordering in reverse
                while nnz_e != 0 {
                    nnz_e -= 1;
                    y_idx[nnz_y] = elim_buffer[nnz_e];
                    nnz_y += 1;
                }
            }
        }

        // second pass places the values in the kth row of L
        for i in (0..nnz_y).rev() {
            let cidx = y_idx[i];
            let tmp_idx = next_colspace[cidx];

            let y_vals_cidx = y_vals[cidx];
            for j in L.colptr[cidx]..tmp_idx {
                y_vals[L.rowval[j]] -= L.nzval[j] * y_vals_cidx;
            }

            L.nzval[tmp_idx] = y_vals_cidx * Dinv[cidx];
            D[k] -= y_vals_cidx * L.nzval[tmp_idx];

            L.rowval[tmp_idx] = k;
            next_colspace[cidx] += 1;

            // reset for the next row
            y_vals[cidx] = T::zero();
            y_markers[cidx] = false;
        }

        _regularize_pivot(
            &mut D[k],
            dsigns[k],
            regularize_enable,
            regularize_eps,
            regularize_delta,
        );
        if D[k] == T::zero() {
            return Err(LdlError::ZeroPivot);
        }
        Dinv[k] = T::recip(D[k]);
    }

    Ok(())
}

#[inline]
fn _regularize_pivot<T: FloatT>(d: &mut T, sign: i8, enable: bool, eps: T, delta: T) {
    if enable {
        let sign = T::from_i8(sign).unwrap();
        if *d * sign < eps {
            *d = delta * sign;
        }
    }
}

// Solves (L+I)x = b, with x replacing b
fn _lsolve<T: FloatT>(Lp: &[usize], Li: &[usize], Lx: &[T], x: &mut [T]) {
    for i in 0..x.len() {
        let xi = x[i];
        let (f, l) = (Lp[i], Lp[i + 1]);
        for (&Lij, &Lxj) in zip(&Li[f..l], &Lx[f..l]) {
            x[Lij] -= Lxj * xi;
        }
    }
}

// Solves (L+I)'x = b, with x replacing b
fn _ltsolve<T: FloatT>(Lp: &[usize], Li: &[usize], Lx: &[T], x: &mut [T]) {
    for i in (0..x.len()).rev() {
        let mut s = T::zero();
        let (f, l) = (Lp[i], Lp[i + 1]);
        for (&Lij, &Lxj) in zip(&Li[f..l], &Lx[f..l]) {
            s += Lxj * x[Lij];
        }
        x[i] -= s;
    }
}

// -------------
// testing

#[cfg(test)]
mod tests {
    use super::*;

    fn test_quasidefinite() -> (CscMatrix<f64>, Vec<i8>) {
        // [ 4  1  2 ]
        // [ 1 -3  0 ]
        // [ 2  0 -5 ]  in triu form
        let K = CscMatrix::from(&[
            [4., 1., 2.],  //
            [0., -3., 0.], //
            [0., 0., -5.], //
        ]);
        let dsigns = vec![1, -1, -1];
        (K, dsigns)
    }

    #[test]
    fn test_factor_solve() {
        let (K, dsigns) = test_quasidefinite();

        let opts = LdlSettingsBuilder::default()
            .dsigns(dsigns)
            .build()
            .unwrap();

        let mut ldl = LdlFactorization::new(&K, Some(opts)).unwrap();
        ldl.factor(&K).unwrap();

        // solve against K*xtrue with xtrue = [1,2,3]
        let xtrue = [1., 2., 3.];
        let mut b = vec![0.; 3];
        K.sym().symv(&mut b, &xtrue, 1., 0.);

        let mut x = b;
        ldl.solve_in_place(&mut x);

        assert!(x.dist(&xtrue) <= 1e-12);
    }

    #[test]
    fn test_refactor_with_new_values() {
        let (K, dsigns) = test_quasidefinite();

        let opts = LdlSettingsBuilder::default()
            .dsigns(dsigns)
            .build()
            .unwrap();
        let mut ldl = LdlFactorization::new(&K, Some(opts)).unwrap();

        //same pattern, new values
        let mut K2 = K.clone();
        K2.nzval.iter_mut().for_each(|v| *v *= 2.);
        ldl.factor(&K2).unwrap();

        let xtrue = [-1., 0.5, 2.];
        let mut b = vec![0.; 3];
        K2.sym().symv(&mut b, &xtrue, 1., 0.);

        let mut x = b;
        ldl.solve_in_place(&mut x);
        assert!(x.dist(&xtrue) <= 1e-12);
    }

    #[test]
    fn test_rejects_non_triu() {
        let K = CscMatrix::from(&[
            [4., 1.], //
            [1., 3.], //
        ]);
        assert!(matches!(
            LdlFactorization::new(&K, None),
            Err(LdlError::NotUpperTriangular)
        ));
    }

    #[test]
    fn test_regularized_zero_pivot() {
        // structurally present but numerically zero pivot in column 1.
        // built by hand since the dense conversion drops explicit zeros
        let K = CscMatrix::new(
            2,
            2,
            vec![0, 1, 3],
            vec![0, 0, 1],
            vec![1., 1., 0.],
        );
        let opts = LdlSettingsBuilder::default()
            .dsigns(vec![1, -1])
            .build()
            .unwrap();
        let mut ldl = LdlFactorization::new(&K, Some(opts)).unwrap();

        //dynamic regularization turns the zero pivot into -delta
        assert!(ldl.factor(&K).is_ok());
    }
}
