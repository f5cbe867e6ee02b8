// ItemTagMatrix: the document-by-tag table every pipeline stage hands on.
//
// Rows are documents keyed by a unique identifier (the article title by
// convention), columns are tag names, and each cell holds a non-negative
// presence flag or count. Stages never mutate a matrix they were given: the
// public API only returns new owned matrices, and the crate-internal mutators
// are used on fresh copies inside a single stage.

pub mod io;

use std::collections::HashSet;

use anyhow::Result;
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, Axis};

/// Default name of the identifier column in exported keyword matrices.
pub const DEFAULT_ID_COLUMN: &str = "Article Title";

/// A binary (or count) item-by-tag matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTagMatrix {
    id_column: String,
    ids: Vec<String>,
    tags: Vec<String>,
    values: Array2<f64>,
}

impl ItemTagMatrix {
    /// Build a matrix from row identifiers, tag names and a rows × tags array.
    ///
    /// Fails if the shapes disagree, a tag name repeats, or a cell is
    /// negative or not finite.
    pub fn new(
        id_column: impl Into<String>,
        ids: Vec<String>,
        tags: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self> {
        if values.nrows() != ids.len() || values.ncols() != tags.len() {
            anyhow::bail!(
                "Matrix shape {}x{} does not match {} identifiers and {} tags",
                values.nrows(),
                values.ncols(),
                ids.len(),
                tags.len()
            );
        }

        let mut seen = HashSet::with_capacity(tags.len());
        for tag in &tags {
            if !seen.insert(tag.as_str()) {
                anyhow::bail!("Duplicate tag column: {tag:?}");
            }
        }

        if let Some(((row, col), value)) = values
            .indexed_iter()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            anyhow::bail!(
                "Invalid value {value} for tag {:?} in row {:?}: entries must be non-negative",
                tags[col],
                ids[row]
            );
        }

        Ok(Self {
            id_column: id_column.into(),
            ids,
            tags,
            values,
        })
    }

    /// Build a matrix from `(tag, column values)` pairs. Handy for small,
    /// hand-written matrices.
    pub fn from_columns(
        id_column: impl Into<String>,
        ids: Vec<String>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let n_rows = ids.len();
        let mut values = Array2::zeros((n_rows, columns.len()));
        let mut tags = Vec::with_capacity(columns.len());

        for (j, (tag, column)) in columns.into_iter().enumerate() {
            if column.len() != n_rows {
                anyhow::bail!(
                    "Column {tag:?} has {} values but there are {n_rows} rows",
                    column.len()
                );
            }
            values.column_mut(j).assign(&Array1::from(column));
            tags.push(tag);
        }

        Self::new(id_column, ids, tags, values)
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.ids.len()
    }

    pub fn n_tags(&self) -> usize {
        self.tags.len()
    }

    pub fn tag_index(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_index(tag).is_some()
    }

    /// The values of one tag across all documents, if the tag exists.
    pub fn column(&self, tag: &str) -> Option<ArrayView1<'_, f64>> {
        self.tag_index(tag).map(|j| self.values.column(j))
    }

    /// Keep only the tag columns at the given indices, in that order.
    pub fn select_tags(&self, keep: &[usize]) -> Self {
        Self {
            id_column: self.id_column.clone(),
            ids: self.ids.clone(),
            tags: keep.iter().map(|&j| self.tags[j].clone()).collect(),
            values: self.values.select(Axis(1), keep),
        }
    }

    /// Keep only the first `n` documents.
    pub fn head(&self, n: usize) -> Self {
        let rows: Vec<usize> = (0..n.min(self.n_rows())).collect();
        Self {
            id_column: self.id_column.clone(),
            ids: rows.iter().map(|&i| self.ids[i].clone()).collect(),
            tags: self.tags.clone(),
            values: self.values.select(Axis(0), &rows),
        }
    }

    /// Swap rows and columns: tags become rows keyed under `id_column`,
    /// documents become columns.
    ///
    /// Fails if two documents share an identifier, since identifiers become
    /// column names.
    pub fn transpose(&self, id_column: &str) -> Result<Self> {
        Self::new(
            id_column,
            self.tags.clone(),
            self.ids.clone(),
            self.values.t().to_owned(),
        )
    }

    pub(crate) fn column_mut(&mut self, index: usize) -> ArrayViewMut1<'_, f64> {
        self.values.column_mut(index)
    }

    /// Remove one tag column in place.
    pub(crate) fn remove_tag(&mut self, index: usize) {
        let keep: Vec<usize> = (0..self.n_tags()).filter(|&j| j != index).collect();
        self.values = self.values.select(Axis(1), &keep);
        self.tags.remove(index);
    }
}
