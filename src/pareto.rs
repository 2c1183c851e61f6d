//! Pareto frontier of regions for batched selection.
//!
//! The poset engine orders regions by two objectives at once: a larger
//! size is better (less explored), a smaller value is better (more
//! promising). Region `A` dominates region `B` when it is at least as good
//! in both and strictly better in one. The non-dominated set is a superset
//! of the convex-hull vertices used by the sequential engine, so it also
//! picks up regions in the non-convex dents of the `(size, value)` cloud.
//!
//! The frontier can be large, so it is truncated to a fixed number of
//! members per round. Members are ranked by their optimistic bound
//! `value - K * size` (most promising first), ties going to the larger
//! size, then the smaller value, then the lower id.

use crate::hull::{Candidate, Selection, best_candidate};
use crate::partition::RegionId;
use crate::types::Direction;

/// Objective directions of a `[size, value]` pair.
const SIZE_VALUE: [Direction; 2] = [Direction::Maximize, Direction::Minimize];

/// Returns `true` if solution `a` Pareto-dominates solution `b`.
///
/// A solution dominates another if it is at least as good in all objectives
/// and strictly better in at least one, respecting the given directions.
pub(crate) fn dominates(a: &[f64], b: &[f64], directions: &[Direction]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), directions.len());

    let mut strictly_better = false;
    for ((&av, &bv), dir) in a.iter().zip(b.iter()).zip(directions.iter()) {
        let (better, worse) = match dir {
            Direction::Minimize => (av < bv, av > bv),
            Direction::Maximize => (av > bv, av < bv),
        };
        if worse {
            return false;
        }
        if better {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Returns `true` if region `a` dominates region `b` in `(size, value)`.
pub(crate) fn region_dominates(a: &Candidate, b: &Candidate) -> bool {
    dominates(&[a.size, a.value], &[b.size, b.value], &SIZE_VALUE)
}

/// Non-dominated candidates, sorted by descending size.
///
/// Sweeps sizes from largest to smallest while tracking the lead: the
/// first candidate seen with the lowest value so far. Anything dominated
/// at all is dominated by the lead, so one comparison per candidate is
/// enough. Exact duplicates all survive.
pub(crate) fn frontier(candidates: &[Candidate]) -> Vec<Candidate> {
    let mut sorted: Vec<Candidate> = candidates.to_vec();
    sorted.sort_by(|a, b| {
        b.size
            .total_cmp(&a.size)
            .then(a.value.total_cmp(&b.value))
            .then(a.id.cmp(&b.id))
    });

    let mut front = Vec::new();
    let mut lead: Option<Candidate> = None;
    for candidate in sorted {
        if !lead.is_some_and(|l| region_dominates(&l, &candidate)) {
            front.push(candidate);
        }
        if lead.is_none_or(|l| candidate.value < l.value) {
            lead = Some(candidate);
        }
    }
    front
}

/// Keeps at most `limit` frontier members, most promising first.
///
/// Members listed in `priority` rank ahead of all others; within each
/// class the order is by `value - k * size`.
pub(crate) fn truncate(
    mut front: Vec<Candidate>,
    priority: &[RegionId],
    limit: usize,
    k: f64,
) -> Vec<Candidate> {
    let bound = |c: &Candidate| c.value - k * c.size;
    let later = |c: &Candidate| !priority.contains(&c.id);
    front.sort_by(|a, b| {
        later(a)
            .cmp(&later(b))
            .then(bound(a).total_cmp(&bound(b)))
            .then(b.size.total_cmp(&a.size))
            .then(a.value.total_cmp(&b.value))
            .then(a.id.cmp(&b.id))
    });
    front.truncate(limit);
    front
}

/// Selects the regions a poset round subdivides, in rank order.
///
/// `priority` holds the regions the hull selection picks on the same
/// leaves; they lead the ranking so a wide enough frontier always covers
/// them. `rank_slope` is the `K` used for ranking the rest. With an assumed
/// Lipschitz constant, members failing
/// `value - K * size <= global_min - tolerance` are dropped. Falls back to
/// the best-value candidate when nothing is left.
pub(crate) fn poset_selection(
    candidates: &[Candidate],
    priority: &[RegionId],
    limit: usize,
    rank_slope: f64,
    global_min: f64,
    tolerance: f64,
    lipschitz: Option<f64>,
) -> Selection {
    if candidates.is_empty() {
        return Selection::default();
    }
    let mut members = truncate(frontier(candidates), priority, limit, rank_slope);
    if let Some(k) = lipschitz {
        members.retain(|c| c.value - k * c.size <= global_min - tolerance);
    }
    if members.is_empty() {
        let fallback: Vec<RegionId> = best_candidate(candidates).map(|c| c.id).into_iter().collect();
        return Selection {
            ids: fallback,
            fell_back: true,
            largest_slope: 0.0,
        };
    }
    Selection {
        ids: members.iter().map(|c| c.id).collect(),
        fell_back: false,
        largest_slope: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hull::potentially_optimal;

    fn c(id: usize, size: f64, value: f64) -> Candidate {
        Candidate {
            id: RegionId(id),
            size,
            value,
        }
    }

    fn ids(front: &[Candidate]) -> Vec<usize> {
        let mut ids: Vec<usize> = front.iter().map(|c| c.id.index()).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_dominates_basic() {
        let dirs = [Direction::Minimize, Direction::Minimize];
        assert!(dominates(&[1.0, 1.0], &[2.0, 2.0], &dirs));
        assert!(!dominates(&[2.0, 2.0], &[1.0, 1.0], &dirs));
        assert!(!dominates(&[1.0, 1.0], &[1.0, 1.0], &dirs));
    }

    #[test]
    fn test_dominates_size_value() {
        // larger and better
        assert!(region_dominates(&c(0, 0.5, 1.0), &c(1, 0.3, 2.0)));
        // same size, better value
        assert!(region_dominates(&c(0, 0.5, 1.0), &c(1, 0.5, 2.0)));
        // same value, larger size
        assert!(region_dominates(&c(0, 0.5, 1.0), &c(1, 0.3, 1.0)));
        // trade-off
        assert!(!region_dominates(&c(0, 0.5, 2.0), &c(1, 0.3, 1.0)));
        assert!(!region_dominates(&c(1, 0.3, 1.0), &c(0, 0.5, 2.0)));
    }

    #[test]
    fn frontier_includes_non_convex_members() {
        // (0.3, 0.9) sits above the hull through (0.1, 0) and (0.5, 1.0)
        // but nothing dominates it
        let candidates = [c(0, 0.1, 0.0), c(1, 0.3, 0.9), c(2, 0.5, 1.0), c(3, 0.3, 1.5)];
        assert_eq!(ids(&frontier(&candidates)), vec![0, 1, 2]);
    }

    #[test]
    fn frontier_matches_pairwise_definition() {
        let mut rng = fastrand::Rng::with_seed(7);
        let sizes = [0.05, 0.1, 0.2, 0.4, 0.8];
        for _ in 0..50 {
            let candidates: Vec<Candidate> = (0..30)
                .map(|i| c(i, sizes[rng.usize(..sizes.len())], f64::from(rng.u8(..10))))
                .collect();
            let expected: Vec<usize> = candidates
                .iter()
                .filter(|b| !candidates.iter().any(|a| region_dominates(a, b)))
                .map(|b| b.id.index())
                .collect();
            assert_eq!(ids(&frontier(&candidates)), expected);
        }
    }

    #[test]
    fn exact_duplicates_both_survive() {
        let candidates = [c(0, 0.5, 1.0), c(1, 0.5, 1.0), c(2, 0.2, 1.0)];
        assert_eq!(ids(&frontier(&candidates)), vec![0, 1]);
    }

    #[test]
    fn truncation_ranks_by_optimistic_bound() {
        let front = vec![c(0, 0.1, 0.0), c(1, 0.3, 0.9), c(2, 0.5, 1.0)];
        // k = 0: pure value ranking
        let kept = truncate(front.clone(), &[], 2, 0.0);
        assert_eq!(kept.iter().map(|c| c.id.index()).collect::<Vec<_>>(), vec![0, 1]);
        // k = 10: bounds -1.0, -2.1, -4.0
        let kept = truncate(front, &[], 2, 10.0);
        assert_eq!(kept.iter().map(|c| c.id.index()).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn truncation_ties_prefer_larger_size() {
        let front = vec![c(0, 0.1, 1.0), c(1, 0.3, 1.2), c(2, 0.5, 1.4)];
        // k = 1: all bounds equal 0.9
        let kept = truncate(front, &[], 1, 1.0);
        assert_eq!(kept[0].id.index(), 2);
    }

    #[test]
    fn poset_selection_falls_back_under_tight_lipschitz() {
        let candidates = [c(0, 0.1, 1.0), c(1, 0.5, 2.0)];
        let s = poset_selection(&candidates, &[], 4, 0.0, 1.0, 0.05, Some(0.1));
        assert!(s.fell_back);
        assert_eq!(s.ids, vec![RegionId(0)]);

        let s = poset_selection(&candidates, &[], 4, 0.0, 1.0, 0.05, None);
        assert!(!s.fell_back);
        assert_eq!(s.ids, vec![RegionId(0), RegionId(1)]);
    }

    #[test]
    fn priority_members_lead_the_ranking() {
        let front = vec![c(0, 0.1, 0.0), c(1, 0.3, 0.9), c(2, 0.5, 1.0)];
        // k = 10 ranks 2 first, but 0 is a priority member
        let kept = truncate(front, &[RegionId(0)], 2, 10.0);
        assert_eq!(kept.iter().map(|c| c.id.index()).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn wide_frontier_covers_the_hull_selection() {
        let mut rng = fastrand::Rng::with_seed(23);
        let sizes = [0.02, 0.06, 0.15, 0.3, 0.6];
        for _ in 0..200 {
            let n = rng.usize(1..25);
            let candidates: Vec<Candidate> = (0..n)
                .map(|i| c(i, sizes[rng.usize(..sizes.len())], rng.f64() * 4.0 - 1.0))
                .collect();
            let global_min = candidates.iter().map(|c| c.value).fold(f64::INFINITY, f64::min);
            let lipschitz = if rng.bool() { Some(rng.f64() * 20.0) } else { None };
            let hull = potentially_optimal(&candidates, global_min, 1e-4, lipschitz);

            let limit = hull.ids.len() + rng.usize(0..4);
            let slope = rng.f64() * 10.0;
            let poset =
                poset_selection(&candidates, &hull.ids, limit, slope, global_min, 1e-4, lipschitz);
            if hull.fell_back {
                assert!(poset.ids.contains(&hull.ids[0]) || poset.fell_back);
                continue;
            }
            assert!(!poset.fell_back);
            for id in &hull.ids {
                assert!(poset.ids.contains(id), "hull member {id} missing from the batch");
            }
            assert!(poset.ids[..hull.ids.len()].iter().all(|id| hull.ids.contains(id)));
        }
    }
}
