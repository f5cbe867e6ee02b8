// Cluster artifacts: cluster members joined back to the raw metadata export.
//
// The metadata export (semicolon-separated in the usual bibliographic dumps)
// carries at least the identifier column. Each cluster's documents are inner
// joined against it by identifier, so documents without a metadata row are
// dropped and documents with several rows appear once per row.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cluster::engine::ClusterAssignment;

/// Column appended to the merged artifact.
pub const CLUSTER_COLUMN: &str = "Cluster";

/// Raw metadata table loaded for the final join.
#[derive(Debug, Clone)]
pub struct MetadataTable {
    id_column: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    id_index: usize,
    by_id: HashMap<String, Vec<usize>>,
}

impl MetadataTable {
    pub fn read(path: &Path, delimiter: u8, id_column: &str) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open metadata file {}", path.display()))?;
        let table = Self::read_from(file, delimiter, id_column)
            .with_context(|| format!("Failed to read metadata from {}", path.display()))?;
        info!(path = %path.display(), rows = table.rows.len(), "Loaded document metadata");
        Ok(table)
    }

    pub fn read_from<R: Read>(reader: R, delimiter: u8, id_column: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let id_index = headers
            .iter()
            .position(|h| h == id_column)
            .with_context(|| format!("Identifier column {id_column:?} not found in metadata header"))?;

        let mut rows = Vec::new();
        let mut by_id: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, record) in csv_reader.records().enumerate() {
            let record = record.with_context(|| format!("Malformed metadata row {}", i + 1))?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            by_id.entry(row[id_index].clone()).or_default().push(rows.len());
            rows.push(row);
        }

        Ok(Self {
            id_column: id_column.to_string(),
            headers,
            rows,
            id_index,
            by_id,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Output header: the identifier first, then the other metadata columns.
    pub fn joined_headers(&self) -> Vec<String> {
        let mut headers = vec![self.id_column.clone()];
        headers.extend(
            self.headers
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != self.id_index)
                .map(|(_, h)| h.clone()),
        );
        headers
    }

    /// Inner join: every metadata row whose identifier is in `ids`, in the
    /// order of `ids`, laid out as [`Self::joined_headers`].
    pub fn join(&self, ids: &[&str]) -> Vec<Vec<String>> {
        let mut joined = Vec::new();
        for id in ids {
            let Some(matches) = self.by_id.get(*id) else {
                debug!(id, "No metadata row for document");
                continue;
            };
            for &r in matches {
                let row = &self.rows[r];
                let mut out = vec![row[self.id_index].clone()];
                out.extend(
                    row.iter()
                        .enumerate()
                        .filter(|(i, _)| *i != self.id_index)
                        .map(|(_, v)| v.clone()),
                );
                joined.push(out);
            }
        }
        joined
    }
}

/// Which cluster files to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// One `<basename>_cluster_<n>.csv` per cluster.
    Separate,
    /// A single `<basename>_all_clusters.csv` with a Cluster column.
    Merged,
    /// Both of the above.
    All,
    /// Nothing is written.
    None,
}

impl SaveMode {
    pub fn writes_separate(self) -> bool {
        matches!(self, SaveMode::Separate | SaveMode::All)
    }

    pub fn writes_merged(self) -> bool {
        matches!(self, SaveMode::Merged | SaveMode::All)
    }
}

impl FromStr for SaveMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "separate" => Ok(SaveMode::Separate),
            "merged" => Ok(SaveMode::Merged),
            "all" => Ok(SaveMode::All),
            "none" => Ok(SaveMode::None),
            other => anyhow::bail!(
                "Unknown save mode {other:?} (expected separate, merged, all or none)"
            ),
        }
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveMode::Separate => "separate",
            SaveMode::Merged => "merged",
            SaveMode::All => "all",
            SaveMode::None => "none",
        };
        f.write_str(name)
    }
}

/// Path of the file for 1-based cluster `number`.
pub fn cluster_file_name(dir: &Path, basename: &str, number: usize) -> PathBuf {
    dir.join(format!("{basename}_cluster_{number}.csv"))
}

pub fn merged_file_name(dir: &Path, basename: &str) -> PathBuf {
    dir.join(format!("{basename}_all_clusters.csv"))
}

/// Write the cluster artifacts selected by `mode`. Returns the files written.
///
/// Clusters are numbered from 1 in file names and in the Cluster column.
pub fn write_cluster_artifacts(
    assignment: &ClusterAssignment,
    metadata: &MetadataTable,
    dir: &Path,
    basename: &str,
    mode: SaveMode,
) -> Result<Vec<PathBuf>> {
    if mode == SaveMode::None {
        return Ok(Vec::new());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let headers = metadata.joined_headers();
    let mut written = Vec::new();
    let mut merged_rows: Vec<Vec<String>> = Vec::new();

    for label in 0..assignment.n_clusters {
        let number = label + 1;
        let rows = metadata.join(&assignment.members(label));

        if mode.writes_separate() {
            let path = cluster_file_name(dir, basename, number);
            write_table(&path, &headers, &rows)?;
            info!(cluster = number, rows = rows.len(), path = %path.display(), "Wrote cluster file");
            written.push(path);
        }

        if mode.writes_merged() {
            merged_rows.extend(rows.into_iter().map(|mut row| {
                row.push(number.to_string());
                row
            }));
        }
    }

    if mode.writes_merged() {
        let mut merged_headers = headers;
        merged_headers.push(CLUSTER_COLUMN.to_string());
        let path = merged_file_name(dir, basename);
        write_table(&path, &merged_headers, &merged_rows)?;
        info!(rows = merged_rows.len(), path = %path.display(), "Wrote merged cluster file");
        written.push(path);
    }

    Ok(written)
}

fn write_table(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = "\
Authors;Article Title;Year
Smith;Paper A;2020
Jones;Paper B;2021
Lee;Paper A;2022
";

    #[test]
    fn test_joined_headers_put_identifier_first() {
        let table = MetadataTable::read_from(METADATA.as_bytes(), b';', "Article Title").unwrap();
        assert_eq!(table.joined_headers(), vec!["Article Title", "Authors", "Year"]);
    }

    #[test]
    fn test_join_is_inner_and_keeps_id_order() {
        let table = MetadataTable::read_from(METADATA.as_bytes(), b';', "Article Title").unwrap();
        let rows = table.join(&["Paper B", "Missing", "Paper A"]);
        assert_eq!(
            rows,
            vec![
                vec!["Paper B", "Jones", "2021"],
                vec!["Paper A", "Smith", "2020"],
                vec!["Paper A", "Lee", "2022"],
            ]
        );
    }

    #[test]
    fn test_save_mode_parsing() {
        assert_eq!("Separate".parse::<SaveMode>().unwrap(), SaveMode::Separate);
        assert_eq!("all".parse::<SaveMode>().unwrap(), SaveMode::All);
        assert!("everything".parse::<SaveMode>().is_err());
        assert!(SaveMode::All.writes_merged() && SaveMode::All.writes_separate());
        assert!(!SaveMode::None.writes_merged() && !SaveMode::None.writes_separate());
    }

    #[test]
    fn test_file_names() {
        let dir = Path::new("out");
        assert_eq!(cluster_file_name(dir, "recs", 2), Path::new("out/recs_cluster_2.csv"));
        assert_eq!(merged_file_name(dir, "recs"), Path::new("out/recs_all_clusters.csv"));
    }
}
