// Average-linkage agglomerative clustering over a precomputed dissimilarity
// matrix, used to find candidate duplicate tags.
//
// There is no target cluster count. Clusters keep merging while the closest
// pair (mean pairwise distance between their members) is strictly below the
// threshold. Ties go to the first pair in current cluster order: a merged
// cluster takes the slot of its lower-positioned half.

use ndarray::Array2;

use super::dissimilarity::DissimilarityMatrix;

/// Default merge cutoff for tag grouping.
pub const DEFAULT_GROUP_THRESHOLD: f64 = 0.5;

/// A set of at least two tags judged mutually similar.
pub type TagGroup = Vec<String>;

/// Group tags whose columns are similar enough to be duplicate candidates.
///
/// Singleton clusters are discarded. Groups are ordered by their lowest column
/// index and list their members in column order.
pub fn group_tags_by_dissimilarity(
    dissimilarity: &DissimilarityMatrix,
    threshold: f64,
) -> Vec<TagGroup> {
    average_linkage(dissimilarity.values(), threshold)
        .into_iter()
        .filter(|members| members.len() >= 2)
        .map(|members| {
            members
                .into_iter()
                .map(|i| dissimilarity.tags()[i].clone())
                .collect()
        })
        .collect()
}

/// Cluster the items of a square distance matrix with average linkage.
///
/// Returns every cluster (singletons included) as sorted index lists, ordered
/// by their smallest index.
pub fn average_linkage(distances: &Array2<f64>, threshold: f64) -> Vec<Vec<usize>> {
    let n = distances.nrows();
    if n == 0 {
        return Vec::new();
    }

    // Lance-Williams update keeps the cluster-to-cluster averages in `linkage`,
    // indexed by the slot of each cluster's first member.
    let mut linkage = distances.to_owned();
    let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let mut active: Vec<usize> = (0..n).collect();

    while active.len() > 1 {
        let mut best: Option<(usize, usize, f64)> = None;
        for a in 0..active.len() {
            for b in (a + 1)..active.len() {
                let d = linkage[[active[a], active[b]]];
                if best.map_or(true, |(_, _, best_d)| d < best_d) {
                    best = Some((a, b, d));
                }
            }
        }

        let Some((a, b, d)) = best else { break };
        if d >= threshold {
            break;
        }

        let keep = active[a];
        let gone = active[b];
        let size_keep = clusters[keep].len() as f64;
        let size_gone = clusters[gone].len() as f64;

        for &other in &active {
            if other == keep || other == gone {
                continue;
            }
            let merged = (size_keep * linkage[[keep, other]] + size_gone * linkage[[gone, other]])
                / (size_keep + size_gone);
            linkage[[keep, other]] = merged;
            linkage[[other, keep]] = merged;
        }

        let absorbed = std::mem::take(&mut clusters[gone]);
        clusters[keep].extend(absorbed);
        active.remove(b);
    }

    let mut result: Vec<Vec<usize>> = active
        .into_iter()
        .map(|slot| {
            let mut members = std::mem::take(&mut clusters[slot]);
            members.sort_unstable();
            members
        })
        .collect();
    result.sort_by_key(|members| members[0]);
    result
}
