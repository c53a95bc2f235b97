//! Iterative centroid clustering used to split large unit pools into
//! squads of manageable size.

use crate::game::{AgentId, CellPos};

/// Result of clustering: `groups[i]` holds the ids assigned to
/// `centroids[i]`. Every group is non-empty and the groups partition the
/// input exactly.
#[derive(Clone, Debug)]
pub struct Clustering {
    pub groups: Vec<Vec<AgentId>>,
    pub centroids: Vec<CellPos>,
}

/// Partition agents into `k` groups by position. Deterministic: seeding
/// is by input order (`i * (n / k)`), not random, and re-running on an
/// unchanged population yields identical groups.
///
/// With `n <= k` the request is degenerate and `k` clamps to 1.
/// Iteration is capped at the population size so pathological inputs
/// (e.g. everyone stacked on one cell) still terminate.
///
/// Returns `None` only for an empty input.
pub fn cluster_agents(agents: &[(AgentId, CellPos)], k: usize) -> Option<Clustering> {
    let n = agents.len();
    if n == 0 {
        return None;
    }

    let k = if n <= k.max(1) { 1 } else { k.max(1) };
    let step = n / k;

    let mut centroids: Vec<CellPos> = (0..k).map(|i| agents[i * step].1).collect();
    let mut assignment: Vec<usize> = vec![0; n];

    for _ in 0..n {
        let mut dirty = false;

        for (i, (_, pos)) in agents.iter().enumerate() {
            let nearest = closest_centroid(*pos, &centroids);
            if nearest != assignment[i] {
                dirty = true;
                assignment[i] = nearest;
            }
        }

        // Nearest-centroid assignment can strip a centroid of every agent
        // (colocated seeds, collapsing clusters). Pin each orphaned
        // centroid's own seed agent back so the integer-average below is
        // always defined and no group ends up empty.
        repair_empty_clusters(&mut assignment, k, step, &mut dirty);

        if !dirty {
            break;
        }

        centroids = compute_centroids(agents, &assignment, k);
    }

    let mut final_fixups = false;
    repair_empty_clusters(&mut assignment, k, step, &mut final_fixups);

    let mut groups: Vec<Vec<AgentId>> = vec![Vec::new(); k];
    for (i, (id, _)) in agents.iter().enumerate() {
        groups[assignment[i]].push(*id);
    }

    Some(Clustering { groups, centroids })
}

fn closest_centroid(pos: CellPos, centroids: &[CellPos]) -> usize {
    let mut best_index = 0;
    let mut best_dist = pos.distance_squared(centroids[0]);
    for (i, c) in centroids.iter().enumerate().skip(1) {
        let dist = pos.distance_squared(*c);
        if dist < best_dist {
            best_dist = dist;
            best_index = i;
        }
    }
    best_index
}

fn compute_centroids(
    agents: &[(AgentId, CellPos)],
    assignment: &[usize],
    k: usize,
) -> Vec<CellPos> {
    let mut sum_x = vec![0i64; k];
    let mut sum_y = vec![0i64; k];
    let mut count = vec![0i64; k];

    for (i, (_, pos)) in agents.iter().enumerate() {
        let cluster = assignment[i];
        sum_x[cluster] += pos.x as i64;
        sum_y[cluster] += pos.y as i64;
        count[cluster] += 1;
    }

    (0..k)
        .map(|i| {
            // Guaranteed non-zero by the empty-cluster repair pass.
            CellPos::new(
                (sum_x[i] / count[i]) as i32,
                (sum_y[i] / count[i]) as i32,
            )
        })
        .collect()
}

fn repair_empty_clusters(assignment: &mut [usize], k: usize, step: usize, dirty: &mut bool) {
    // A pinned seed can in turn orphan the cluster it was stolen from, so
    // iterate; each pass pins seeds to their own clusters, which is
    // monotone, so k passes always suffice.
    for _ in 0..k {
        let mut count = vec![0usize; k];
        for &c in assignment.iter() {
            count[c] += 1;
        }
        let mut fixed_any = false;
        for cluster in 0..k {
            if count[cluster] == 0 {
                let seed = cluster * step;
                count[assignment[seed]] -= 1;
                assignment[seed] = cluster;
                count[cluster] += 1;
                fixed_any = true;
                *dirty = true;
            }
        }
        if !fixed_any {
            break;
        }
    }
}
