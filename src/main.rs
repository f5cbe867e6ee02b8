use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use tagclust::cluster::engine::ClusterOptions;
use tagclust::cluster::kmeans::KMeansConfig;
use tagclust::config::{validate_threshold, Config};
use tagclust::decision::console::ConsoleDecisions;
use tagclust::decision::scripted::ScriptedDecisions;
use tagclust::decision::traits::DecisionSource;
use tagclust::dedup::phases::DedupReport;
use tagclust::matrix::ItemTagMatrix;
use tagclust::output::artifacts::{MetadataTable, SaveMode};
use tagclust::output::{plots, terminal};
use tagclust::pipeline::{self, clusters::ClusterRunOptions, dedup::DedupOptions};
use tagclust::reduce::filter::count_tag_occurrence;
use tagclust::reduce::variance::ReducedSpace;

/// tagclust: deduplicate bibliographic keyword tags and cluster documents.
///
/// Converges conjugated and co-occurring duplicate tags in an item-by-tag
/// matrix, reduces the tag space with PCA, and groups documents with k-means.
#[derive(Parser)]
#[command(name = "tagclust", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Input and deduplication flags shared by every pipeline command.
#[derive(Args)]
struct DedupArgs {
    /// Item-by-tag matrix (comma-separated, one identifier column)
    #[arg(long)]
    input: PathBuf,

    /// Similarity threshold for grouping tags (default: TAGCLUST_THRESHOLD or 0.6)
    #[arg(long)]
    threshold: Option<f64>,

    /// Only read the first N documents
    #[arg(long)]
    records: Option<usize>,

    /// Review the remaining duplicate pairs interactively
    #[arg(long)]
    manual: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Converge duplicate tags and optionally write the deduplicated matrix
    Dedup {
        #[command(flatten)]
        dedup: DedupArgs,

        /// Write the deduplicated matrix here
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Count tag occurrences, most frequent first
    Tags {
        /// Item-by-tag matrix (comma-separated, one identifier column)
        #[arg(long)]
        input: PathBuf,

        /// Only show the N most frequent tags
        #[arg(long)]
        top: Option<usize>,
    },

    /// Deduplicate, filter, and report the principal component profile
    Components {
        #[command(flatten)]
        dedup: DedupArgs,

        /// Number of leading components to report contributing tags for (none by default)
        #[arg(long)]
        components: Option<usize>,

        /// Charts to show, joined by "and": loading, scree, saturation, all
        #[arg(long, default_value = "")]
        plots: String,
    },

    /// Run the full pipeline and write cluster files
    Cluster {
        #[command(flatten)]
        dedup: DedupArgs,

        /// Raw metadata export to join clusters against
        #[arg(long)]
        metadata: PathBuf,

        /// Number of clusters; prompts after showing the inertia curve when omitted
        #[arg(long)]
        clusters: Option<usize>,

        /// Largest cluster count to try (default: TAGCLUST_MAX_CLUSTERS or 20)
        #[arg(long)]
        max_clusters: Option<usize>,

        /// Which cluster files to write: separate, merged, all, none
        #[arg(long, default_value = "separate")]
        save: SaveMode,

        /// Directory for cluster files (default: TAGCLUST_OUTPUT_DIR or output/csv)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Charts to show, joined by "and": loading, scree, saturation, all
        #[arg(long, default_value = "")]
        plots: String,

        /// Cluster tags instead of documents
        #[arg(long)]
        transpose: bool,
    },
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tagclust=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Dedup { dedup, output } => {
            let (_, report) = run_dedup(&dedup, &config, output)?;
            terminal::display_dedup_report(&report);
        }

        Commands::Tags { input, top } => {
            let matrix = pipeline::dedup::load_matrix(&input, &config.id_column, None)?;
            terminal::display_tag_counts(&count_tag_occurrence(&matrix), top);
        }

        Commands::Components {
            dedup,
            components,
            plots: selector,
        } => {
            let selected = plots::parse_plot_selection(&selector)?;
            let (deduped, report) = run_dedup(&dedup, &config, None)?;
            terminal::display_dedup_report(&report);

            let analysis = pipeline::clusters::analyze_components(&deduped, false)?;
            show_components(&analysis.space, components, &selected);
        }

        Commands::Cluster {
            dedup,
            metadata,
            clusters,
            max_clusters,
            save,
            output_dir,
            plots: selector,
            transpose,
        } => {
            let selected = plots::parse_plot_selection(&selector)?;
            let metadata_table =
                MetadataTable::read(&metadata, config.metadata_delimiter, &config.id_column)?;

            let (deduped, report) = run_dedup(&dedup, &config, None)?;
            terminal::display_dedup_report(&report);

            let analysis = pipeline::clusters::analyze_components(&deduped, transpose)?;
            show_components(&analysis.space, None, &selected);

            let options = ClusterRunOptions {
                cluster: ClusterOptions {
                    max_clusters: max_clusters.unwrap_or(config.max_clusters),
                    kmeans: KMeansConfig {
                        seed: config.seed,
                        ..KMeansConfig::default()
                    },
                },
                save,
                output_dir: output_dir.unwrap_or_else(|| config.output_dir.clone()),
                basename: pipeline::clusters::basename_of(&dedup.input),
            };

            let run = match clusters {
                Some(count) => {
                    let mut scripted = ScriptedDecisions::new().with_cluster_count(count);
                    pipeline::clusters::run(&analysis, &metadata_table, &report, &options, &mut scripted)?
                }
                None => {
                    let mut console = ConsoleDecisions::stdio();
                    pipeline::clusters::run(&analysis, &metadata_table, &report, &options, &mut console)?
                }
            };

            terminal::display_cluster_summary(&run.assignment);
            if !run.written.is_empty() {
                println!();
                for path in &run.written {
                    println!("  {} {}", "wrote".green(), path.display());
                }
            }
        }
    }

    Ok(())
}

/// Run the deduplication pipeline with config defaults and CLI overrides.
/// With `--manual`, stdin is held only for the review itself.
fn run_dedup(
    args: &DedupArgs,
    config: &Config,
    output: Option<PathBuf>,
) -> Result<(ItemTagMatrix, DedupReport)> {
    let threshold = args.threshold.unwrap_or(config.threshold);
    validate_threshold(threshold)?;

    let options = DedupOptions {
        id_column: config.id_column.clone(),
        threshold,
        records: args.records,
        output,
    };
    info!(input = %args.input.display(), threshold, manual = args.manual, "Starting deduplication");

    if args.manual {
        let mut console = ConsoleDecisions::stdio();
        pipeline::dedup::run(&args.input, &options, Some(&mut console as &mut dyn DecisionSource))
    } else {
        pipeline::dedup::run(&args.input, &options, None)
    }
}

fn show_components(space: &ReducedSpace, components: Option<usize>, selected: &[plots::PlotKind]) {
    let contributing = space.requested_contributing_tags(components);
    terminal::display_reduced_space(space, &contributing);

    for kind in selected {
        println!("\n{}", plots::render(*kind, space));
    }
}
