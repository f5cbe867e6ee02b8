// CSV reading and writing for item-by-tag matrices.
//
// The external ingestion step exports one identifier column plus one column
// per tag. Cells are 0/1 flags or counts; pandas-style exports may also write
// booleans as True/False and include an unnamed index column, both of which
// are accepted here.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array2;
use tracing::{debug, info};

use super::ItemTagMatrix;

/// Read an item-by-tag matrix from a comma-separated file.
///
/// `records` keeps only the first N documents when set.
pub fn read_matrix(path: &Path, id_column: &str, records: Option<usize>) -> Result<ItemTagMatrix> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open matrix file {}", path.display()))?;
    let matrix = read_matrix_from(file, id_column, records)
        .with_context(|| format!("Failed to read matrix from {}", path.display()))?;

    info!(
        path = %path.display(),
        rows = matrix.n_rows(),
        tags = matrix.n_tags(),
        "Loaded item-by-tag matrix"
    );
    Ok(matrix)
}

/// Read an item-by-tag matrix from any reader producing comma-separated text.
pub fn read_matrix_from<R: Read>(
    reader: R,
    id_column: &str,
    records: Option<usize>,
) -> Result<ItemTagMatrix> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let id_index = headers
        .iter()
        .position(|h| h.trim() == id_column)
        .with_context(|| format!("Identifier column {id_column:?} not found in header"))?;

    // Unnamed columns are row indexes written by dataframe exports.
    let tag_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != id_index && !h.trim().is_empty())
        .map(|(i, h)| (i, h.trim().to_string()))
        .collect();
    let skipped = headers.len() - tag_columns.len() - 1;
    if skipped > 0 {
        debug!(skipped, "Ignoring unnamed columns");
    }

    let limit = records.unwrap_or(usize::MAX);
    let mut ids = Vec::new();
    let mut cells = Vec::new();

    for (row, record) in csv_reader.records().enumerate() {
        if row >= limit {
            break;
        }
        let record = record.with_context(|| format!("Malformed row {}", row + 1))?;
        let id = record.get(id_index).unwrap_or_default().to_string();

        for (col, tag) in &tag_columns {
            let raw = record.get(*col).unwrap_or_default();
            let value = parse_cell(raw).with_context(|| {
                format!("Invalid value {raw:?} for tag {tag:?} in row {}", row + 1)
            })?;
            cells.push(value);
        }
        ids.push(id);
    }

    let values = Array2::from_shape_vec((ids.len(), tag_columns.len()), cells)?;
    let tags = tag_columns.into_iter().map(|(_, tag)| tag).collect();
    ItemTagMatrix::new(id_column, ids, tags, values)
}

/// Write a matrix as comma-separated text: identifier column first, then one
/// column per tag.
pub fn write_matrix(matrix: &ItemTagMatrix, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create matrix file {}", path.display()))?;
    write_matrix_to(matrix, file)
        .with_context(|| format!("Failed to write matrix to {}", path.display()))?;

    info!(
        path = %path.display(),
        rows = matrix.n_rows(),
        tags = matrix.n_tags(),
        "Saved deduplicated matrix"
    );
    Ok(())
}

pub fn write_matrix_to<W: Write>(matrix: &ItemTagMatrix, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(matrix.n_tags() + 1);
    header.push(matrix.id_column().to_string());
    header.extend(matrix.tags().iter().cloned());
    csv_writer.write_record(&header)?;

    for (id, row) in matrix.ids().iter().zip(matrix.values().rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(id.clone());
        record.extend(row.iter().map(|v| v.to_string()));
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

fn parse_cell(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return Ok(1.0);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Ok(0.0);
    }
    let value: f64 = trimmed.parse()?;
    if !value.is_finite() || value < 0.0 {
        anyhow::bail!("entries must be non-negative numbers");
    }
    Ok(value)
}
