use std::collections::BTreeMap;

use crate::arithmetic::errors::ExpressionError;

/// `(multiply, add)` operator pair used by [`SparseMatrix::multiply`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Semiring {
    /// Boolean reachability: any stored pair yields `1`.
    AnyPair,
    /// Conventional arithmetic with wrapping overflow.
    PlusTimes,
    /// Multiply selects the right operand, add keeps the minimum.
    MinSecond,
}

impl Semiring {
    fn multiply(self, left: u64, right: u64) -> u64 {
        match self {
            Semiring::AnyPair => 1,
            Semiring::PlusTimes => left.wrapping_mul(right),
            Semiring::MinSecond => right,
        }
    }

    fn add(self, acc: u64, value: u64) -> u64 {
        match self {
            Semiring::AnyPair => 1,
            Semiring::PlusTimes => acc.wrapping_add(value),
            Semiring::MinSecond => acc.min(value),
        }
    }
}

/// Coordinate-format sparse matrix with `u64` entries.
///
/// Entries are kept ordered by `(row, col)`, so tuple extraction is
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SparseMatrix {
    nrows: u64,
    ncols: u64,
    entries: BTreeMap<(u64, u64), u64>,
}

impl SparseMatrix {
    /// Creates an empty `nrows x ncols` matrix.
    pub fn new(nrows: u64, ncols: u64) -> Self {
        Self {
            nrows,
            ncols,
            entries: BTreeMap::new(),
        }
    }

    /// Square diagonal matrix with `1` at each listed index.
    pub fn diagonal<I>(n: u64, indices: I) -> Result<Self, ExpressionError>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut m = Self::new(n, n);
        for idx in indices {
            m.set_element(1, idx, idx)?;
        }
        Ok(m)
    }

    /// Number of rows.
    pub fn nrows(&self) -> u64 {
        self.nrows
    }

    /// Number of columns.
    pub fn ncols(&self) -> u64 {
        self.ncols
    }

    /// Number of stored entries.
    pub fn nvals(&self) -> usize {
        self.entries.len()
    }

    /// Stores `value` at `(row, col)`, replacing any previous entry.
    pub fn set_element(&mut self, value: u64, row: u64, col: u64) -> Result<(), ExpressionError> {
        if row >= self.nrows || col >= self.ncols {
            return Err(ExpressionError::IndexOutOfBounds {
                row,
                col,
                nrows: self.nrows,
                ncols: self.ncols,
            });
        }
        self.entries.insert((row, col), value);
        Ok(())
    }

    /// Entry at `(row, col)`, if stored.
    pub fn get(&self, row: u64, col: u64) -> Option<u64> {
        self.entries.get(&(row, col)).copied()
    }

    /// Stored entries as parallel `(rows, cols, values)` arrays in row-major
    /// order.
    pub fn extract_tuples(&self) -> (Vec<u64>, Vec<u64>, Vec<u64>) {
        let mut rows = Vec::with_capacity(self.entries.len());
        let mut cols = Vec::with_capacity(self.entries.len());
        let mut values = Vec::with_capacity(self.entries.len());
        for (&(row, col), &value) in &self.entries {
            rows.push(row);
            cols.push(col);
            values.push(value);
        }
        (rows, cols, values)
    }

    /// Returns the transpose.
    pub fn transpose(&self) -> Self {
        Self {
            nrows: self.ncols,
            ncols: self.nrows,
            entries: self
                .entries
                .iter()
                .map(|(&(row, col), &value)| ((col, row), value))
                .collect(),
        }
    }

    /// `self ⊕.⊗ other` under the given semiring.
    pub fn multiply(&self, other: &SparseMatrix, semiring: Semiring) -> Result<Self, ExpressionError> {
        if self.ncols != other.nrows {
            return Err(self.shape_mismatch(other));
        }
        let mut by_row: BTreeMap<u64, Vec<(u64, u64)>> = BTreeMap::new();
        for (&(row, col), &value) in &other.entries {
            by_row.entry(row).or_default().push((col, value));
        }
        let mut out = Self::new(self.nrows, other.ncols);
        for (&(i, k), &a) in &self.entries {
            let Some(row) = by_row.get(&k) else {
                continue;
            };
            for &(j, b) in row {
                let product = semiring.multiply(a, b);
                out.entries
                    .entry((i, j))
                    .and_modify(|acc| *acc = semiring.add(*acc, product))
                    .or_insert(product);
            }
        }
        Ok(out)
    }

    /// Element-wise minimum over the union of both patterns.
    pub fn ewise_min(&self, other: &SparseMatrix) -> Result<Self, ExpressionError> {
        if self.nrows != other.nrows || self.ncols != other.ncols {
            return Err(self.shape_mismatch(other));
        }
        let mut out = self.clone();
        for (&key, &value) in &other.entries {
            out.entries
                .entry(key)
                .and_modify(|acc| *acc = (*acc).min(value))
                .or_insert(value);
        }
        Ok(out)
    }

    fn shape_mismatch(&self, other: &SparseMatrix) -> ExpressionError {
        ExpressionError::ShapeMismatch {
            left_rows: self.nrows,
            left_cols: self.ncols,
            right_rows: other.nrows,
            right_cols: other.ncols,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path3() -> SparseMatrix {
        let mut m = SparseMatrix::new(3, 3);
        m.set_element(7, 0, 1).unwrap();
        m.set_element(9, 1, 2).unwrap();
        m
    }

    #[test]
    fn set_element_checks_bounds() {
        let mut m = SparseMatrix::new(2, 2);
        let err = m.set_element(1, 2, 0).unwrap_err();
        assert_eq!(err.code(), "IndexOutOfBounds");
        m.set_element(4, 1, 1).unwrap();
        assert_eq!(m.get(1, 1), Some(4));
        assert_eq!(m.nvals(), 1);
    }

    #[test]
    fn boolean_product_reaches_two_hops() {
        let m = path3();
        let two_hop = m.multiply(&m, Semiring::AnyPair).unwrap();
        assert_eq!(two_hop.extract_tuples(), (vec![0], vec![2], vec![1]));
    }

    #[test]
    fn plus_times_and_min_second_combine_values() {
        let mut a = SparseMatrix::new(1, 2);
        a.set_element(2, 0, 0).unwrap();
        a.set_element(3, 0, 1).unwrap();
        let mut b = SparseMatrix::new(2, 1);
        b.set_element(5, 0, 0).unwrap();
        b.set_element(4, 1, 0).unwrap();
        assert_eq!(a.multiply(&b, Semiring::PlusTimes).unwrap().get(0, 0), Some(22));
        assert_eq!(a.multiply(&b, Semiring::MinSecond).unwrap().get(0, 0), Some(4));
    }

    #[test]
    fn transpose_swaps_coordinates() {
        let t = path3().transpose();
        assert_eq!(t.get(1, 0), Some(7));
        assert_eq!(t.get(2, 1), Some(9));
        assert_eq!(t.get(0, 1), None);
    }

    #[test]
    fn shape_errors_are_reported() {
        let a = SparseMatrix::new(2, 3);
        let b = SparseMatrix::new(2, 3);
        assert_eq!(a.multiply(&b, Semiring::AnyPair).unwrap_err().code(), "ShapeMismatch");
        assert!(a.ewise_min(&SparseMatrix::new(3, 3)).is_err());
        let mut c = SparseMatrix::new(2, 3);
        c.set_element(8, 0, 0).unwrap();
        let mut d = SparseMatrix::new(2, 3);
        d.set_element(3, 0, 0).unwrap();
        d.set_element(1, 1, 2).unwrap();
        let min = c.ewise_min(&d).unwrap();
        assert_eq!(min.get(0, 0), Some(3));
        assert_eq!(min.get(1, 2), Some(1));
    }
}
