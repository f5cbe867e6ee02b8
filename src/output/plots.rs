// Terminal charts for the variance profile and the k-means elbow.
//
// Charts are rendered to strings of text bars so callers decide where they
// go: the CLI prints them, the console decision source writes the inertia
// chart to its own output before asking for a cluster count.

use std::fmt::Write as _;

use anyhow::Result;
use colored::Colorize;

use crate::reduce::variance::{ReducedSpace, VARIANCE_TARGET_95};

const BAR_WIDTH: usize = 30;
const VALID_KEYS: &str = "loading, scree, saturation, all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    /// Explained variance ratio per component.
    Scree,
    /// Cumulative explained variance, marked at k95.
    Saturation,
    /// Per-tag loadings on the first two components.
    Loading,
}

impl PlotKind {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "scree" => Some(PlotKind::Scree),
            "saturation" => Some(PlotKind::Saturation),
            "loading" => Some(PlotKind::Loading),
            _ => None,
        }
    }
}

/// Parse a selector such as `"scree and saturation"`.
///
/// Keys are joined by the word `and`; `all` expands to loading, scree and
/// saturation. An empty selector selects nothing. Repeated keys render once.
pub fn parse_plot_selection(selector: &str) -> Result<Vec<PlotKind>> {
    let mut kinds = Vec::new();
    for key in selector.split_whitespace().filter(|w| *w != "and") {
        let key = key.to_lowercase();
        let expanded = if key == "all" {
            vec![PlotKind::Loading, PlotKind::Scree, PlotKind::Saturation]
        } else {
            match PlotKind::from_key(&key) {
                Some(kind) => vec![kind],
                None => anyhow::bail!("Unknown plot {key:?} (valid keys: {VALID_KEYS})"),
            }
        };
        for kind in expanded {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
    }
    Ok(kinds)
}

/// Render one chart for a reduced tag space.
pub fn render(kind: PlotKind, space: &ReducedSpace) -> String {
    match kind {
        PlotKind::Scree => render_scree(space),
        PlotKind::Saturation => render_saturation(space),
        PlotKind::Loading => render_loading(space),
    }
}

fn bar(fraction: f64, width: usize) -> String {
    let filled = ((fraction.clamp(0.0, 1.0)) * width as f64).round() as usize;
    format!("[{}{}]", "=".repeat(filled), " ".repeat(width.saturating_sub(filled)))
}

fn render_scree(space: &ReducedSpace) -> String {
    let ratios = space.explained_variance_ratio();
    let top = ratios.iter().cloned().fold(0.0_f64, f64::max);
    let mut out = format!("{}\n", "=== Scree plot (explained variance per component) ===".bold());

    for (i, ratio) in ratios.iter().enumerate() {
        let scaled = if top > 0.0 { ratio / top } else { 0.0 };
        let _ = writeln!(out, "  PC{:<3} {} {:.3}", i + 1, bar(scaled, BAR_WIDTH).bright_blue(), ratio);
    }
    out
}

fn render_saturation(space: &ReducedSpace) -> String {
    let mut out = format!("{}\n", "=== Variance saturation (cumulative) ===".bold());

    for (i, total) in space.cumulative_variance.iter().enumerate() {
        let n = i + 1;
        let rendered = bar(*total, BAR_WIDTH);
        let rendered = if *total >= VARIANCE_TARGET_95 {
            rendered.bright_green()
        } else {
            rendered.bright_yellow()
        };
        let marker = if n == space.k95 { "  <- k95" } else { "" };
        let _ = writeln!(out, "  {:>3} {} {:.3}{}", n, rendered, total, marker);
    }
    out
}

fn render_loading(space: &ReducedSpace) -> String {
    let loadings = space.pca.loadings();
    let shown = loadings.ncols().min(2);
    let half = BAR_WIDTH / 2;
    let mut out = format!("{}\n", "=== Tag loadings ===".bold());

    let width = space.tags.iter().map(|t| t.chars().count()).max().unwrap_or(0);
    for (t, tag) in space.tags.iter().enumerate() {
        let mut line = format!("  {:<width$}", tag);
        for c in 0..shown {
            let value = loadings[[t, c]];
            // Bars grow left of the axis for negative loadings.
            let filled = ((value.abs().min(1.0)) * half as f64).round() as usize;
            let (left, right) = if value < 0.0 {
                (format!("{}{}", " ".repeat(half - filled), "=".repeat(filled)), " ".repeat(half))
            } else {
                (" ".repeat(half), format!("{}{}", "=".repeat(filled), " ".repeat(half - filled)))
            };
            let _ = write!(line, "  PC{} [{}|{}] {:>6.3}", c + 1, left, right, value);
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Render the elbow chart of k-means inertia for k = 1, 2, ...
pub fn render_inertia(inertia: &[f64]) -> String {
    let top = inertia.iter().cloned().fold(0.0_f64, f64::max);
    let mut out = format!("{}\n", "=== Inertia by number of clusters ===".bold());

    for (i, value) in inertia.iter().enumerate() {
        let scaled = if top > 0.0 { value / top } else { 0.0 };
        let _ = writeln!(out, "  k={:<3} {} {:.3}", i + 1, bar(scaled, BAR_WIDTH), value);
    }
    out
}
