//! Recursive trisection of the unit hypercube.
//!
//! Regions live in an arena indexed by [`RegionId`]; the set of active leaf
//! ids is the only structural state, so no parent/child pointers are kept.
//! A region's geometry is fully described by its division-count vector: the
//! side along a free axis `i` is exactly `3^-k_i`, which keeps sizes and
//! volumes free of accumulated rounding. Fixed (zero-width) axes keep side 1
//! and coordinate 0.5 forever.
//!
//! Subdividing a region is split into two steps so the poset engine can
//! evaluate many plans as one batch before merging:
//! 1. [`Partition::plan`] picks the longest free axes and lists the sample
//!    points `c ± side/3` along each.
//! 2. [`Partition::divide`] receives the sampled values, trisects the axes in
//!    order of their best sample and replaces the parent by `2m + 1` leaves.

use core::fmt;
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::hull::Candidate;

/// Identifier of a region in the partition arena.
///
/// Ids are handed out in creation order, so sorting by id gives the
/// canonical merge order used by the engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegionId(pub(crate) usize);

impl RegionId {
    /// The root region covering the whole cube.
    pub const ROOT: Self = Self(0);

    /// Position of the region in creation order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// `3^-k`, computed the same way everywhere so equal shapes compare equal.
fn third_power(k: u32) -> f64 {
    3.0_f64.powi(-i32::try_from(k).unwrap_or(i32::MAX))
}

/// A hyperrectangle of the partition.
#[derive(Clone, Debug)]
pub(crate) struct Region {
    pub(crate) id: RegionId,
    pub(crate) divisions: Vec<u32>,
    pub(crate) center: Vec<f64>,
    /// Oracle value at the center; `None` when the evaluation failed.
    pub(crate) value: Option<f64>,
    /// Half diagonal over the free axes.
    pub(crate) size: f64,
    /// Smallest division count over the free axes.
    pub(crate) depth: u32,
}

/// Sample points needed to subdivide one region.
#[derive(Clone, Debug)]
pub(crate) struct DivisionPlan {
    pub(crate) parent: RegionId,
    /// The tied longest free axes, ascending.
    pub(crate) axes: Vec<usize>,
    /// `2 * axes.len()` points: minus then plus sample for each axis.
    pub(crate) points: Vec<Vec<f64>>,
}

#[derive(Debug)]
pub(crate) struct Partition {
    free: Vec<bool>,
    regions: Vec<Region>,
    leaves: BTreeSet<RegionId>,
}

impl Partition {
    /// The center of the root region: 0.5 on every axis.
    pub(crate) fn root_center(dim: usize) -> Vec<f64> {
        vec![0.5; dim]
    }

    /// Creates a partition holding only the root region.
    pub(crate) fn new(free: Vec<bool>, root_value: Option<f64>) -> Self {
        debug_assert!(free.iter().any(|&f| f), "at least one axis must be free");
        let mut partition = Self {
            regions: Vec::new(),
            leaves: BTreeSet::new(),
            free,
        };
        let dim = partition.free.len();
        partition.push(Self::root_center(dim), vec![0; dim], root_value);
        partition
    }

    pub(crate) fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.0]
    }

    pub(crate) fn n_leaves(&self) -> usize {
        self.leaves.len()
    }

    /// Leaves in ascending id order.
    pub(crate) fn leaves(&self) -> impl Iterator<Item = &Region> {
        self.leaves.iter().map(|id| &self.regions[id.0])
    }

    pub(crate) fn is_leaf(&self, id: RegionId) -> bool {
        self.leaves.contains(&id)
    }

    /// Volume of a region: the product of its free sides.
    pub(crate) fn volume(&self, id: RegionId) -> f64 {
        let total: u32 = self
            .region(id)
            .divisions
            .iter()
            .zip(&self.free)
            .filter(|&(_, &free)| free)
            .map(|(&k, _)| k)
            .sum();
        third_power(total)
    }

    /// Sum of the leaf volumes; 1 up to rounding at all times.
    pub(crate) fn leaf_volume(&self) -> f64 {
        self.leaves.iter().map(|&id| self.volume(id)).sum()
    }

    /// Leaves that may still be selected: valid value and depth below the cap.
    pub(crate) fn eligible(&self, max_deep: u32) -> Vec<Candidate> {
        self.leaves()
            .filter(|r| r.depth < max_deep)
            .filter_map(|r| {
                r.value.map(|value| Candidate {
                    id: r.id,
                    size: r.size,
                    value,
                })
            })
            .collect()
    }

    /// Returns `true` if every leaf failed its evaluation.
    pub(crate) fn all_invalid(&self) -> bool {
        self.leaves().all(|r| r.value.is_none())
    }

    /// Lists the samples needed to trisect every longest free axis of `id`.
    pub(crate) fn plan(&self, id: RegionId) -> DivisionPlan {
        debug_assert!(self.is_leaf(id), "only leaves can be subdivided");
        let region = self.region(id);
        let widest = region
            .divisions
            .iter()
            .zip(&self.free)
            .filter(|&(_, &free)| free)
            .map(|(&k, _)| k)
            .min()
            .unwrap_or(0);
        let axes: Vec<usize> = (0..self.free.len())
            .filter(|&i| self.free[i] && region.divisions[i] == widest)
            .collect();
        let delta = third_power(widest + 1);

        let mut points = Vec::with_capacity(2 * axes.len());
        for &axis in &axes {
            for sign in [-1.0, 1.0] {
                let mut point = region.center.clone();
                point[axis] += sign * delta;
                points.push(point);
            }
        }
        DivisionPlan {
            parent: id,
            axes,
            points,
        }
    }

    /// Replaces the parent of `plan` by its children and returns their ids.
    ///
    /// `values` holds one entry per plan point. Axes are trisected in order
    /// of `min(f(c - δe_i), f(c + δe_i))`, failed samples counting as
    /// `+inf` and ties going to the lower axis, so the axis with the best
    /// sample ends up with the widest children. The last child keeps the
    /// parent's center and value.
    pub(crate) fn divide(&mut self, plan: &DivisionPlan, values: &[Option<f64>]) -> Vec<RegionId> {
        debug_assert_eq!(values.len(), plan.points.len());
        debug_assert!(self.leaves.contains(&plan.parent));

        let parent = self.region(plan.parent);
        let mut divisions = parent.divisions.clone();
        let parent_center = parent.center.clone();
        let parent_value = parent.value;

        let best = |k: usize| -> f64 {
            let lo = values[2 * k].unwrap_or(f64::INFINITY);
            let hi = values[2 * k + 1].unwrap_or(f64::INFINITY);
            lo.min(hi)
        };
        let mut order: Vec<usize> = (0..plan.axes.len()).collect();
        order.sort_by(|&a, &b| best(a).total_cmp(&best(b)).then(a.cmp(&b)));

        self.leaves.remove(&plan.parent);
        let mut children = Vec::with_capacity(plan.points.len() + 1);
        for k in order {
            divisions[plan.axes[k]] += 1;
            for j in [2 * k, 2 * k + 1] {
                let id = self.push(plan.points[j].clone(), divisions.clone(), values[j]);
                children.push(id);
            }
        }
        children.push(self.push(parent_center, divisions, parent_value));
        children
    }

    fn push(&mut self, center: Vec<f64>, divisions: Vec<u32>, value: Option<f64>) -> RegionId {
        let mut free_counts: Vec<u32> = divisions
            .iter()
            .zip(&self.free)
            .filter(|&(_, &free)| free)
            .map(|(&k, _)| k)
            .collect();
        free_counts.sort_unstable();
        let depth = free_counts.first().copied().unwrap_or(0);
        let size = 0.5
            * free_counts
                .iter()
                .map(|&k| third_power(2 * k))
                .sum::<f64>()
                .sqrt();

        let id = RegionId(self.regions.len());
        self.regions.push(Region {
            id,
            divisions,
            center,
            value,
            size,
            depth,
        });
        self.leaves.insert(id);
        id
    }
}
