// Unit tests for column filtering and variance reduction.
//
// Tests the filters in their required order, tag occurrence counts, the
// variance profile (monotone cumulative share, k80/k95 as first crossings),
// and the algebraic properties of the fitted PCA.

use ndarray::{Array2, Axis};

use tagclust::matrix::io::read_matrix_from;
use tagclust::matrix::{ItemTagMatrix, DEFAULT_ID_COLUMN};
use tagclust::reduce::filter::{count_tag_occurrence, drop_unique_columns, drop_zero_columns};
use tagclust::reduce::pca::{standardize, Pca};
use tagclust::reduce::variance::{components_for_variance, reduce_variance};

const MATRIX_CSV: &str = "\
Article Title,soil,water,carbon,root,lonely,unused
Paper 0,1,0,1,0,0,0
Paper 1,1,1,0,0,0,0
Paper 2,0,1,1,1,1,0
Paper 3,1,0,1,0,0,0
Paper 4,0,1,0,1,0,0
Paper 5,0,0,1,1,0,0
";

fn sample() -> ItemTagMatrix {
    read_matrix_from(MATRIX_CSV.as_bytes(), DEFAULT_ID_COLUMN, None).unwrap()
}

fn filtered() -> ItemTagMatrix {
    drop_unique_columns(&drop_zero_columns(&sample()))
}

// ============================================================
// Column filters
// ============================================================

#[test]
fn zero_column_is_always_removed() {
    let m = drop_zero_columns(&sample());
    assert!(!m.has_tag("unused"));
    assert!(m.has_tag("lonely"));
}

#[test]
fn unique_column_removed_after_zero_columns() {
    let m = filtered();
    assert_eq!(m.tags(), ["soil", "water", "carbon", "root"]);
    assert_eq!(m.n_rows(), 6);
}

#[test]
fn filters_do_not_touch_the_input() {
    let original = sample();
    let _ = filtered();
    assert_eq!(original.n_tags(), 6);
    assert_eq!(sample(), original);
}

#[test]
fn occurrence_counts_skip_unobserved_tags() {
    let counts = count_tag_occurrence(&sample());
    let tags: Vec<&str> = counts.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(tags, vec!["carbon", "soil", "water", "root", "lonely"]);
    assert_eq!(counts[0].1, 4.0);
}

#[test]
fn record_limit_keeps_leading_rows() {
    let m = read_matrix_from(MATRIX_CSV.as_bytes(), DEFAULT_ID_COLUMN, Some(2)).unwrap();
    assert_eq!(m.ids(), ["Paper 0", "Paper 1"]);
    // Columns are kept even when the limited rows never observe them.
    assert!(m.has_tag("root"));
}

// ============================================================
// Variance reducer
// ============================================================

#[test]
fn cumulative_variance_is_non_decreasing_and_reaches_one() {
    let space = reduce_variance(&filtered()).unwrap();
    let cumulative = &space.cumulative_variance;

    for pair in cumulative.to_vec().windows(2) {
        assert!(pair[1] >= pair[0] - 1e-12);
    }
    let last = cumulative[cumulative.len() - 1];
    assert!((last - 1.0).abs() < 1e-9);
}

#[test]
fn k80_and_k95_are_first_crossings() {
    let space = reduce_variance(&filtered()).unwrap();
    let cumulative = space.cumulative_variance.to_vec();

    assert!(space.k80 >= 1 && space.k80 <= space.k95);
    assert!(cumulative[space.k80 - 1] >= 0.80 - 1e-12);
    if space.k80 > 1 {
        assert!(cumulative[space.k80 - 2] < 0.80);
    }
    assert!(cumulative[space.k95 - 1] >= 0.95 - 1e-12);
    if space.k95 > 1 {
        assert!(cumulative[space.k95 - 2] < 0.95);
    }
}

#[test]
fn components_for_variance_picks_smallest_count() {
    assert_eq!(components_for_variance(&[0.6, 0.85, 0.97, 1.0], 0.80), 2);
    assert_eq!(components_for_variance(&[0.6, 0.85, 0.97, 1.0], 0.95), 3);
    assert_eq!(components_for_variance(&[0.8, 1.0], 0.80), 1);
}

#[test]
fn contributing_tags_are_sorted_and_unique() {
    let space = reduce_variance(&filtered()).unwrap();
    let tags = space.contributing_tags(space.pca.n_components());

    assert!(!tags.is_empty());
    assert!(tags.len() <= space.pca.n_components());
    assert!(tags.windows(2).all(|w| w[0] < w[1]));
    assert!(tags.iter().all(|t| space.tags.contains(t)));
}

#[test]
fn contributing_tags_only_reported_on_request() {
    let space = reduce_variance(&filtered()).unwrap();

    assert!(space.requested_contributing_tags(None).is_empty());
    assert!(space.requested_contributing_tags(Some(0)).is_empty());
    assert_eq!(
        space.requested_contributing_tags(Some(1)),
        space.contributing_tags(1)
    );
    assert_eq!(space.requested_contributing_tags(Some(1)).len(), 1);
}

#[test]
fn summary_matches_space() {
    let space = reduce_variance(&filtered()).unwrap();
    let summary = space.summary();
    assert_eq!(summary.k80, space.k80);
    assert_eq!(summary.k95, space.k95);
    assert_eq!(summary.components, 4);
    assert_eq!(summary.explained_variance_ratio.len(), 4);
}

// ============================================================
// PCA properties
// ============================================================

#[test]
fn standardized_columns_have_zero_mean_unit_variance() {
    let scaled = standardize(filtered().values());
    let n = scaled.nrows() as f64;
    for column in scaled.columns() {
        let mean = column.sum() / n;
        let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 1e-12);
        assert!((variance - 1.0).abs() < 1e-9);
    }
}

#[test]
fn components_are_orthonormal() {
    let pca = Pca::fit(&standardize(filtered().values()), None).unwrap();
    let gram = pca.components.dot(&pca.components.t());
    let identity = Array2::<f64>::eye(pca.n_components());
    for (a, b) in gram.iter().zip(identity.iter()) {
        assert!((a - b).abs() < 1e-8);
    }
}

#[test]
fn score_variance_matches_explained_variance() {
    let data = filtered().values().clone();
    let pca = Pca::fit(&data, Some(2)).unwrap();
    let scores = pca.transform(&data);

    assert_eq!(scores.dim(), (6, 2));
    let variances = scores.var_axis(Axis(0), 1.0);
    for (got, want) in variances.iter().zip(pca.explained_variance.iter()) {
        assert!((got - want).abs() < 1e-8);
    }
    assert!(pca.explained_variance[0] >= pca.explained_variance[1]);
}

#[test]
fn pca_rejects_degenerate_input() {
    let one_row = Array2::<f64>::ones((1, 3));
    assert!(Pca::fit(&one_row, None).is_err());

    let constant = Array2::<f64>::ones((4, 2));
    assert!(Pca::fit(&constant, None).is_err());

    let data = filtered().values().clone();
    assert!(Pca::fit(&data, Some(5)).is_err());
}
