use crate::network::{MoleculeId, Reaction};

/// Binary sum tree over reaction propensities.
///
/// Leaves sit at `nodes[leaves..]`, padded with zeros up to a power of two;
/// every inner node holds the sum of its two children and `nodes[1]` the
/// total.
#[derive(Clone, Debug)]
pub(crate) struct PropensityTree {
    leaves: usize,
    nodes: Vec<f64>,
}

impl PropensityTree {
    pub(crate) fn new(len: usize) -> Self {
        let leaves = len.max(1).next_power_of_two();
        Self {
            leaves,
            nodes: vec![0.0; 2 * leaves],
        }
    }

    pub(crate) fn rebuild(&mut self, values: &[f64]) {
        debug_assert!(values.len() <= self.leaves);
        let leaves = &mut self.nodes[self.leaves..];
        leaves.fill(0.0);
        leaves[..values.len()].copy_from_slice(values);
        for node in (1..self.leaves).rev() {
            self.nodes[node] = self.nodes[2 * node] + self.nodes[2 * node + 1];
        }
    }

    pub(crate) fn total(&self) -> f64 {
        self.nodes[1]
    }

    pub(crate) fn update(&mut self, idx: usize, value: f64) {
        let mut node = self.leaves + idx;
        self.nodes[node] = value;
        while node > 1 {
            node /= 2;
            self.nodes[node] = self.nodes[2 * node] + self.nodes[2 * node + 1];
        }
    }

    /// Leaf whose cumulative range contains `target`. A target at or past
    /// the total may end on a padding leaf, i.e. an index past the values.
    pub(crate) fn select(&self, mut target: f64) -> usize {
        let mut node = 1;
        while node < self.leaves {
            let left = self.nodes[2 * node];
            node = if left > 0.0 && target <= left {
                2 * node
            } else {
                target -= left;
                2 * node + 1
            };
        }
        node - self.leaves
    }
}

impl Default for PropensityTree {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Cached propensities plus the bookkeeping needed to refresh them
/// selectively.
#[derive(Clone, Debug, Default)]
pub(crate) struct PropensityCache {
    pub(crate) values: Vec<f64>,
    pub(crate) tree: PropensityTree,
    /// For each reaction, the reactions to recompute after it fires.
    pub(crate) dependencies: Vec<Vec<usize>>,
    /// Reactions whose rate or guard reads the environment or parameters.
    pub(crate) external: Vec<usize>,
}

impl PropensityCache {
    pub(crate) fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
        self.dependencies.clear();
        self.external.clear();
        self.tree = PropensityTree::default();
    }

    pub(crate) fn total(&self) -> f64 {
        self.tree.total()
    }

    pub(crate) fn set(&mut self, idx: usize, value: f64) {
        self.values[idx] = value;
        self.tree.update(idx, value);
    }

    /// Weighted choice for `target` in `[0, total)`. Never returns a reaction
    /// with zero propensity while the total is positive.
    pub(crate) fn select(&self, target: f64) -> usize {
        let chosen = self.tree.select(target);
        if self.values.get(chosen).is_some_and(|&value| value > 0.0) {
            return chosen;
        }
        // rounding at the right edge of the tree can land on an empty leaf
        self.values
            .iter()
            .rposition(|&value| value > 0.0)
            .unwrap_or(0)
    }
}

/// Number of ordered ways to pick `count` molecules out of `value`:
/// `value * (value - 1) * ... * (value - count + 1)`.
#[inline]
pub(crate) fn falling_factorial(value: u64, count: u32) -> f64 {
    match count {
        0 => 1.0,
        1 => value as f64,
        _ if value < count as u64 => 0.0,
        2 => value as f64 * (value - 1) as f64,
        _ => {
            let mut acc = 1.0;
            for i in 0..count as u64 {
                acc *= (value - i) as f64;
            }
            acc
        }
    }
}

/// Builds, for every reaction, the list of reactions whose propensity may
/// change when it fires: those that require, inhibit on, or read in their
/// expressions a molecule the reaction changes.
pub(crate) fn build_dependency_graph(
    n_molecules: usize,
    reactions: &[Reaction],
    expression_refs: &[Vec<MoleculeId>],
) -> Vec<Vec<usize>> {
    let mut molecule_dependents: Vec<Vec<usize>> = vec![Vec::new(); n_molecules];
    for (idx, reaction) in reactions.iter().enumerate() {
        for (id, entry) in reaction.entries() {
            if entry.requirement > 0 || entry.must_not_have {
                molecule_dependents[id.index()].push(idx);
            }
        }
        for id in &expression_refs[idx] {
            molecule_dependents[id.index()].push(idx);
        }
    }

    let mut dependencies = vec![Vec::new(); reactions.len()];
    let mut visit_markers = vec![0usize; reactions.len()];
    for (r, deps) in dependencies.iter_mut().enumerate() {
        let mark = r + 1;
        for (id, entry) in reactions[r].entries() {
            if entry.net_change() == 0 {
                continue;
            }
            for &dep in &molecule_dependents[id.index()] {
                if visit_markers[dep] != mark {
                    visit_markers[dep] = mark;
                    deps.push(dep);
                }
            }
        }
    }
    dependencies
}
