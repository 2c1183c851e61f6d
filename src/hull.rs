//! Selection of potentially optimal regions.
//!
//! A region is potentially optimal when, for some Lipschitz constant `K`,
//! its optimistic bound `value - K * size` is the lowest of all regions.
//! Those regions are exactly the vertices of the lower convex hull of the
//! `(size, value)` points, taken from the best value to the largest size.
//!
//! On top of the hull, a lower-bound admissibility test keeps a vertex only
//! if it could improve the incumbent by at least the tolerance:
//!
//! ```text
//! value - K * size <= global_min - tolerance
//! ```
//!
//! With an assumed Lipschitz constant `K` is that constant. Without one,
//! `K` is the slope of the hull edge leaving the vertex towards larger
//! sizes (`+inf` for the last vertex), which is vanilla DIRECT.

use crate::partition::RegionId;

/// A selectable leaf: valid value and depth below the cap.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Candidate {
    pub(crate) id: RegionId,
    pub(crate) size: f64,
    pub(crate) value: f64,
}

/// Regions chosen for subdivision in one round.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Selection {
    /// Selected ids, ascending.
    pub(crate) ids: Vec<RegionId>,
    /// `true` when nothing passed the lower-bound test and the best-value
    /// leaf was taken instead.
    pub(crate) fell_back: bool,
    /// Steepest finite hull edge of this round, `0.0` without edges.
    pub(crate) largest_slope: f64,
}

/// All candidates sharing one `(size, minimum value)` point.
struct Group {
    size: f64,
    value: f64,
    members: Vec<RegionId>,
}

/// Groups candidates by size, keeping only those at the minimum value of
/// their size. Sorted by ascending size.
fn group_by_size(candidates: &[Candidate]) -> Vec<Group> {
    let mut sorted: Vec<&Candidate> = candidates.iter().collect();
    sorted.sort_by(|a, b| {
        a.size
            .total_cmp(&b.size)
            .then(a.value.total_cmp(&b.value))
            .then(a.id.cmp(&b.id))
    });

    let mut groups: Vec<Group> = Vec::new();
    for c in sorted {
        match groups.last_mut() {
            Some(g) if g.size == c.size => {
                if g.value == c.value {
                    g.members.push(c.id);
                }
            }
            _ => groups.push(Group {
                size: c.size,
                value: c.value,
                members: vec![c.id],
            }),
        }
    }
    groups
}

/// `> 0` for a counter-clockwise turn `o -> a -> b`.
fn cross(o: &Group, a: &Group, b: &Group) -> f64 {
    (a.size - o.size) * (b.value - o.value) - (a.value - o.value) * (b.size - o.size)
}

/// Lower convex hull starting at the best group (ties to the larger size).
/// Collinear vertices are kept.
fn lower_hull(groups: &[Group]) -> Vec<&Group> {
    let mut start = 0;
    for (i, g) in groups.iter().enumerate() {
        if g.value <= groups[start].value {
            start = i;
        }
    }

    let mut hull: Vec<&Group> = Vec::new();
    for g in &groups[start..] {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], g) < 0.0 {
            hull.pop();
        }
        hull.push(g);
    }
    hull
}

/// Slope of each hull edge, towards larger sizes.
fn edge_slopes(hull: &[&Group]) -> Vec<f64> {
    hull.windows(2)
        .map(|w| (w[1].value - w[0].value) / (w[1].size - w[0].size))
        .collect()
}

/// The single best-value candidate, ties to the larger size then lower id.
pub(crate) fn best_candidate(candidates: &[Candidate]) -> Option<&Candidate> {
    candidates.iter().min_by(|a, b| {
        a.value
            .total_cmp(&b.value)
            .then(b.size.total_cmp(&a.size))
            .then(a.id.cmp(&b.id))
    })
}

/// Selects the potentially optimal regions that pass the lower-bound test.
///
/// Falls back to the best-value candidate when none passes, so a round
/// always makes progress while candidates remain.
pub(crate) fn potentially_optimal(
    candidates: &[Candidate],
    global_min: f64,
    tolerance: f64,
    lipschitz: Option<f64>,
) -> Selection {
    if candidates.is_empty() {
        return Selection::default();
    }
    let groups = group_by_size(candidates);
    let hull = lower_hull(&groups);
    let slopes = edge_slopes(&hull);
    let largest_slope = slopes.iter().copied().fold(0.0, f64::max);

    let threshold = global_min - tolerance;
    let mut ids: Vec<RegionId> = Vec::new();
    for (i, vertex) in hull.iter().enumerate() {
        let k = lipschitz.unwrap_or_else(|| slopes.get(i).copied().unwrap_or(f64::INFINITY));
        if vertex.value - k * vertex.size <= threshold {
            ids.extend_from_slice(&vertex.members);
        }
    }

    if ids.is_empty() {
        let fallback = best_candidate(candidates).map(|c| c.id);
        return Selection {
            ids: fallback.into_iter().collect(),
            fell_back: true,
            largest_slope,
        };
    }
    ids.sort_unstable();
    Selection {
        ids,
        fell_back: false,
        largest_slope,
    }
}

/// Smallest optimistic bound `value - k * size` over the candidates.
pub(crate) fn lower_bound(candidates: &[Candidate], k: f64) -> f64 {
    candidates
        .iter()
        .map(|c| c.value - k * c.size)
        .fold(f64::INFINITY, f64::min)
}
