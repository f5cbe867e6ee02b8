// Colored terminal output for deduplication, variance and cluster results.
//
// This module handles all terminal-specific formatting: colors and tables.
// The main.rs command handlers delegate here.

use colored::Colorize;

use super::truncate_chars;
use crate::cluster::engine::ClusterAssignment;
use crate::dedup::phases::DedupReport;
use crate::reduce::variance::ReducedSpace;

/// Members listed per cluster before the preview is cut off.
const MEMBER_PREVIEW: usize = 3;
const ID_PREVIEW_CHARS: usize = 60;

/// Display the per-phase summary of a deduplication run.
pub fn display_dedup_report(report: &DedupReport) {
    println!(
        "\n{}",
        format!("=== Tag Deduplication (threshold {:.2}) ===", report.threshold).bold()
    );
    println!();

    println!(
        "  {:>5}  {:>6}  {:>6}  {:>7}  {:>7}",
        "Phase".dimmed(),
        "Groups".dimmed(),
        "Pairs".dimmed(),
        "Before".dimmed(),
        "After".dimmed(),
    );
    println!("  {}", "-".repeat(41).dimmed());

    for phase in &report.phases {
        let removed = phase.tags_before.saturating_sub(phase.tags_after);
        let after = if removed > 0 {
            format!("{:>7}", phase.tags_after).green()
        } else {
            format!("{:>7}", phase.tags_after).normal()
        };
        println!(
            "  {:>5}  {:>6}  {:>6}  {:>7}  {}",
            phase.phase, phase.groups, phase.pairs, phase.tags_before, after
        );
    }
    println!();

    match &report.manual {
        Some(outcome) => {
            println!(
                "  Manual review: {} merged, {} skipped{}",
                outcome.merged,
                outcome.skipped,
                if outcome.aborted { " (aborted)".yellow().to_string() } else { String::new() }
            );
        }
        None if !report.remaining.is_empty() => {
            println!(
                "  {} {} possible duplicate pairs left (rerun with --manual to review)",
                "~".yellow(),
                report.remaining.len()
            );
        }
        None => println!("  {} No duplicates left", "ok".green()),
    }
}

/// Display tag totals, largest first. `top` limits the rows shown.
pub fn display_tag_counts(counts: &[(String, f64)], top: Option<usize>) {
    if counts.is_empty() {
        println!("No tags with observations.");
        return;
    }

    let shown = top.unwrap_or(counts.len()).min(counts.len());
    println!(
        "\n{}",
        format!("=== Tag Occurrence ({} of {} tags) ===", shown, counts.len()).bold()
    );
    println!();
    println!("  {:>4}  {:<40} {:>8}", "Rank".dimmed(), "Tag".dimmed(), "Count".dimmed());
    println!("  {}", "-".repeat(56).dimmed());

    for (i, (tag, total)) in counts.iter().take(shown).enumerate() {
        println!("  {:>4}. {:<40} {:>8}", i + 1, truncate_chars(tag, 37), total);
    }
}

/// Display k80/k95 and the tags driving the leading components.
pub fn display_reduced_space(space: &ReducedSpace, contributing: &[String]) {
    println!(
        "\n{}",
        format!("=== Principal Components ({} tags) ===", space.tags.len()).bold()
    );
    println!();
    println!("  Components fitted:  {}", space.pca.n_components());
    println!("  80% variance (k80): {}", space.k80.to_string().bold());
    println!("  95% variance (k95): {}", space.k95.to_string().bold());

    if !contributing.is_empty() {
        println!();
        println!("  {}", "Top contributing tags:".dimmed());
        for tag in contributing {
            println!("    {tag}");
        }
    }
}

/// Display each cluster's size and a preview of its members.
pub fn display_cluster_summary(assignment: &ClusterAssignment) {
    println!(
        "\n{}",
        format!(
            "=== Clusters ({} clusters, {} rows) ===",
            assignment.n_clusters,
            assignment.ids.len()
        )
        .bold()
    );
    println!();

    for (label, size) in assignment.sizes().iter().enumerate() {
        println!(
            "  {:>3}. {} {}",
            label + 1,
            format!("{size} members").bold(),
            "-".dimmed()
        );
        let members = assignment.members(label);
        for id in members.iter().take(MEMBER_PREVIEW) {
            println!("       {}", truncate_chars(id, ID_PREVIEW_CHARS).dimmed());
        }
        if members.len() > MEMBER_PREVIEW {
            println!("       {}", format!("... and {} more", members.len() - MEMBER_PREVIEW).dimmed());
        }
    }
}
