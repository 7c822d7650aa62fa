//! Grouping of seeds into jointly-fit clusters.
//!
//! Two seeds whose ellipsoid extents intersect cannot be fit independently:
//! their intensity contributions superpose. Overlap-connected seeds
//! (transitively) form one cluster; isolated seeds become singleton
//! clusters. Keeping clusters minimal bounds the dimensionality of each
//! least-squares subproblem and lets clusters be fit in parallel.

use crate::seed::Seed;

/// A set of seed tags that must be fit jointly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Tags of the member seeds, in input-seed order.
    pub tags: Vec<usize>,
}

/// Partition seeds into overlap-connected clusters.
///
/// Returns the connected components of the pairwise overlap graph: every
/// input seed lands in exactly one cluster, and the union of all cluster
/// tags equals the input tag set.
pub fn partition(seeds: &[Seed]) -> Vec<Cluster> {
    let n = seeds.len();
    let mut assigned = vec![false; n];
    let mut clusters = Vec::new();

    for start in 0..n {
        if assigned[start] {
            continue;
        }
        assigned[start] = true;
        let mut members = vec![start];
        let mut frontier = vec![start];
        while let Some(i) = frontier.pop() {
            for j in 0..n {
                if !assigned[j] && seeds[i].overlaps(&seeds[j]) {
                    assigned[j] = true;
                    members.push(j);
                    frontier.push(j);
                }
            }
        }
        members.sort_unstable();
        clusters.push(Cluster {
            tags: members.into_iter().map(|i| seeds[i].tag).collect(),
        });
    }
    clusters
}
