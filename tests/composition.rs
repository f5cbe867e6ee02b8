// Composition tests: verifying that the pipeline stages chain together.
//
// These tests exercise the data flow between modules:
//   CSV matrix -> Deduplication -> Filters -> PCA -> k-means -> Artifacts
// with scripted decisions instead of a console. Files are written to
// temporary directories only.

use std::fs;
use std::path::{Path, PathBuf};

use tagclust::cluster::engine::ClusterOptions;
use tagclust::decision::scripted::ScriptedDecisions;
use tagclust::matrix::io::read_matrix;
use tagclust::output::artifacts::{MetadataTable, SaveMode};
use tagclust::pipeline::clusters::{self, analyze_components, basename_of, ClusterRunOptions};
use tagclust::pipeline::dedup::{self, load_matrix, DedupOptions};

// Two topics: soil science (Papers 0-3) and reefs (Papers 4-7). "soil" is a
// conjugation of "soils", "note" is observed once, "empty" never.
const MATRIX_CSV: &str = "\
Article Title,soil,root,soils,ocean,coral,reef,note,empty
Paper 0,1,1,1,0,0,0,0,0
Paper 1,1,1,1,0,0,0,0,0
Paper 2,1,0,1,0,0,0,0,0
Paper 3,0,1,1,0,0,0,0,0
Paper 4,0,0,0,1,1,0,0,0
Paper 5,0,0,0,1,0,1,0,0
Paper 6,0,0,0,1,1,1,0,0
Paper 7,0,0,0,0,1,1,1,0
";

// Paper 7 has no metadata row.
const METADATA_CSV: &str = "\
Authors;Article Title;Year
Alves;Paper 0;2019
Brook;Paper 1;2020
Chen;Paper 2;2020
Diaz;Paper 3;2021
Evans;Paper 4;2018
Fox;Paper 5;2022
Gupta;Paper 6;2023
";

fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let matrix = dir.join("savedrecs.csv");
    let metadata = dir.join("savedrecs_raw.csv");
    fs::write(&matrix, MATRIX_CSV).unwrap();
    fs::write(&metadata, METADATA_CSV).unwrap();
    (matrix, metadata)
}

fn run_options(dir: &Path, save: SaveMode) -> ClusterRunOptions {
    ClusterRunOptions {
        cluster: ClusterOptions {
            max_clusters: 4,
            ..ClusterOptions::default()
        },
        save,
        output_dir: dir.join("out"),
        basename: "savedrecs".to_string(),
    }
}

// ============================================================
// Chain: CSV -> Deduplication
// ============================================================

#[test]
fn loading_drops_zero_columns() {
    let dir = tempfile::tempdir().unwrap();
    let (matrix_path, _) = write_inputs(dir.path());

    let m = load_matrix(&matrix_path, "Article Title", None).unwrap();
    assert!(!m.has_tag("empty"));
    assert_eq!(m.n_tags(), 7);
    assert_eq!(m.n_rows(), 8);
}

#[test]
fn dedup_folds_conjugation_and_writes_result() {
    let dir = tempfile::tempdir().unwrap();
    let (matrix_path, _) = write_inputs(dir.path());
    let output = dir.path().join("deduped").join("savedrecs_dedup.csv");

    let options = DedupOptions {
        output: Some(output.clone()),
        ..DedupOptions::default()
    };
    let (deduped, report) = dedup::run(&matrix_path, &options, None).unwrap();

    assert!(!deduped.has_tag("soil"));
    assert!(deduped.has_tag("soils"));
    assert_eq!(report.phases[0].tags_before, 7);
    assert_eq!(report.phases[0].tags_after, 6);

    let reread = read_matrix(&output, "Article Title", None).unwrap();
    assert_eq!(reread, deduped);
}

#[test]
fn record_limit_flows_through_dedup() {
    let dir = tempfile::tempdir().unwrap();
    let (matrix_path, _) = write_inputs(dir.path());

    let options = DedupOptions {
        records: Some(4),
        ..DedupOptions::default()
    };
    let (deduped, _) = dedup::run(&matrix_path, &options, None).unwrap();

    assert_eq!(deduped.n_rows(), 4);
    // The reef tags are never observed in the first four papers.
    assert!(!deduped.has_tag("ocean"));
}

// ============================================================
// Chain: Deduplication -> PCA -> k-means -> Artifacts
// ============================================================

#[test]
fn full_pipeline_writes_cluster_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let (matrix_path, metadata_path) = write_inputs(dir.path());

    let (deduped, report) = dedup::run(&matrix_path, &DedupOptions::default(), None).unwrap();
    let analysis = analyze_components(&deduped, false).unwrap();
    assert!(!analysis.matrix.has_tag("note"));

    let metadata = MetadataTable::read(&metadata_path, b';', "Article Title").unwrap();
    let options = run_options(dir.path(), SaveMode::All);
    let mut decisions = ScriptedDecisions::new().with_cluster_count(2);
    let run = clusters::run(&analysis, &metadata, &report, &options, &mut decisions).unwrap();

    // Topics land in separate clusters.
    let labels = &run.assignment.labels;
    assert!(labels[..4].iter().all(|&l| l == labels[0]));
    assert!(labels[4..].iter().all(|&l| l == labels[4]));
    assert_ne!(labels[0], labels[4]);
    assert_eq!(run.assignment.inertia.len(), 4);

    let out = dir.path().join("out");
    assert_eq!(
        run.written,
        vec![
            out.join("savedrecs_cluster_1.csv"),
            out.join("savedrecs_cluster_2.csv"),
            out.join("savedrecs_all_clusters.csv"),
            out.join("savedrecs_summary.json"),
        ]
    );

    let mut reader = csv::Reader::from_path(out.join("savedrecs_all_clusters.csv")).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["Article Title", "Authors", "Year", "Cluster"]);

    let rows: Vec<Vec<String>> = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    // Inner join: Paper 7 has no metadata.
    assert_eq!(rows.len(), 7);
    assert!(rows.iter().all(|r| r[0] != "Paper 7"));

    let cluster_of = |title: &str| {
        rows.iter()
            .find(|r| r[0] == title)
            .map(|r| r[3].clone())
            .unwrap()
    };
    assert_eq!(cluster_of("Paper 0"), cluster_of("Paper 3"));
    assert_ne!(cluster_of("Paper 0"), cluster_of("Paper 4"));
    assert!(rows.iter().all(|r| r[3] == "1" || r[3] == "2"));

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("savedrecs_summary.json")).unwrap()).unwrap();
    assert_eq!(summary["clusters"], 2);
    assert_eq!(summary["sizes"].as_array().unwrap().len(), 2);
    assert_eq!(summary["dedup"]["phases"].as_array().unwrap().len(), 3);
}

#[test]
fn separate_files_hold_one_cluster_each() {
    let dir = tempfile::tempdir().unwrap();
    let (matrix_path, metadata_path) = write_inputs(dir.path());

    let (deduped, report) = dedup::run(&matrix_path, &DedupOptions::default(), None).unwrap();
    let analysis = analyze_components(&deduped, false).unwrap();
    let metadata = MetadataTable::read(&metadata_path, b';', "Article Title").unwrap();
    let options = run_options(dir.path(), SaveMode::Separate);
    let mut decisions = ScriptedDecisions::new().with_cluster_count(2);
    let run = clusters::run(&analysis, &metadata, &report, &options, &mut decisions).unwrap();

    let out = dir.path().join("out");
    assert!(!out.join("savedrecs_all_clusters.csv").exists());

    let mut total = 0;
    for number in 1..=2 {
        let text = fs::read_to_string(out.join(format!("savedrecs_cluster_{number}.csv"))).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Article Title,Authors,Year"));
        total += lines.count();
    }
    assert_eq!(total, 7);
    assert_eq!(run.assignment.sizes().iter().sum::<usize>(), 8);
}

#[test]
fn save_none_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (matrix_path, metadata_path) = write_inputs(dir.path());

    let (deduped, report) = dedup::run(&matrix_path, &DedupOptions::default(), None).unwrap();
    let analysis = analyze_components(&deduped, false).unwrap();
    let metadata = MetadataTable::read(&metadata_path, b';', "Article Title").unwrap();
    let options = run_options(dir.path(), SaveMode::None);
    let mut decisions = ScriptedDecisions::new().with_cluster_count(3);
    let run = clusters::run(&analysis, &metadata, &report, &options, &mut decisions).unwrap();

    assert_eq!(run.assignment.n_clusters, 3);
    assert!(run.written.is_empty());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn transposed_run_clusters_tags_and_skips_join() {
    let dir = tempfile::tempdir().unwrap();
    let (matrix_path, metadata_path) = write_inputs(dir.path());

    let (deduped, report) = dedup::run(&matrix_path, &DedupOptions::default(), None).unwrap();
    let analysis = analyze_components(&deduped, true).unwrap();
    assert_eq!(analysis.matrix.n_rows(), 5);

    let metadata = MetadataTable::read(&metadata_path, b';', "Article Title").unwrap();
    let options = run_options(dir.path(), SaveMode::All);
    let mut decisions = ScriptedDecisions::new().with_cluster_count(2);
    let run = clusters::run(&analysis, &metadata, &report, &options, &mut decisions).unwrap();

    assert_eq!(run.assignment.ids.len(), 5);
    assert_eq!(run.written, vec![dir.path().join("out").join("savedrecs_summary.json")]);
}

#[test]
fn artifact_basename_comes_from_input_file() {
    let dir = tempfile::tempdir().unwrap();
    let (matrix_path, _) = write_inputs(dir.path());
    assert_eq!(basename_of(&matrix_path), "savedrecs");
}
