//! Compressed sparse row matrices for document-term statistics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            indptr: vec![0; n_rows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Build from coordinate triplets; duplicate entries are summed and
    /// column indices end up sorted within each row. `values = None` means
    /// every entry is 1.
    ///
    /// # Panics
    /// If a coordinate falls outside `shape` or the slices differ in length.
    pub fn from_triplets(
        rows: &[usize],
        cols: &[usize],
        values: Option<&[f64]>,
        shape: (usize, usize),
    ) -> Self {
        assert_eq!(rows.len(), cols.len(), "row and column index lengths differ");
        if let Some(v) = values {
            assert_eq!(v.len(), rows.len(), "value length differs from index length");
        }
        let (n_rows, n_cols) = shape;

        let mut entries: Vec<(usize, usize, f64)> = rows
            .iter()
            .zip(cols)
            .enumerate()
            .map(|(k, (&r, &c))| {
                assert!(r < n_rows && c < n_cols, "entry ({}, {}) outside {:?}", r, c, shape);
                (r, c, values.map_or(1.0, |v| v[k]))
            })
            .collect();
        entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut indptr = vec![0usize; n_rows + 1];
        let mut indices = Vec::with_capacity(entries.len());
        let mut data = Vec::with_capacity(entries.len());
        let mut last: Option<(usize, usize)> = None;

        for (r, c, v) in entries {
            if last == Some((r, c)) {
                if let Some(d) = data.last_mut() {
                    *d += v;
                }
                continue;
            }
            indices.push(c);
            data.push(v);
            indptr[r + 1] += 1;
            last = Some((r, c));
        }
        for r in 0..n_rows {
            indptr[r + 1] += indptr[r];
        }

        Self { n_rows, n_cols, indptr, indices, data }
    }

    /// Build from per-row `(column, value)` lists that are already sorted by column
    pub(crate) fn from_sorted_rows(rows: Vec<Vec<(usize, f64)>>, n_cols: usize) -> Self {
        let n_rows = rows.len();
        let mut indptr = Vec::with_capacity(n_rows + 1);
        indptr.push(0);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        for row in rows {
            for (c, v) in row {
                indices.push(c);
                data.push(v);
            }
            indptr.push(indices.len());
        }
        Self { n_rows, n_cols, indptr, indices, data }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Non-zero `(column, value)` pairs of one row, by increasing column
    pub fn row(&self, r: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = self.indptr[r]..self.indptr[r + 1];
        self.indices[span.clone()].iter().copied().zip(self.data[span].iter().copied())
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        let span = self.indptr[r]..self.indptr[r + 1];
        match self.indices[span.clone()].binary_search(&c) {
            Ok(k) => self.data[span.start + k],
            Err(_) => 0.0,
        }
    }

    pub(crate) fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub(crate) fn row_span(&self, r: usize) -> std::ops::Range<usize> {
        self.indptr[r]..self.indptr[r + 1]
    }

    pub(crate) fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Sparse product `self × other`, returning `None` when the inner
    /// dimensions disagree.
    pub fn matmul(&self, other: &CsrMatrix) -> Option<CsrMatrix> {
        if self.n_cols != other.n_rows {
            return None;
        }

        // Gustavson: accumulate each output row in a dense scratch buffer
        let mut acc = vec![0.0f64; other.n_cols];
        let mut touched = vec![false; other.n_cols];
        let mut cols_in_row = Vec::new();
        let mut rows = Vec::with_capacity(self.n_rows);

        for r in 0..self.n_rows {
            for (k, a) in self.row(r) {
                for (c, b) in other.row(k) {
                    if !touched[c] {
                        touched[c] = true;
                        cols_in_row.push(c);
                    }
                    acc[c] += a * b;
                }
            }

            cols_in_row.sort_unstable();
            let mut row = Vec::with_capacity(cols_in_row.len());
            for &c in &cols_in_row {
                if acc[c] != 0.0 {
                    row.push((c, acc[c]));
                }
                acc[c] = 0.0;
                touched[c] = false;
            }
            cols_in_row.clear();
            rows.push(row);
        }

        Some(Self::from_sorted_rows(rows, other.n_cols))
    }
}
