//! Dependency graph for formula cells.
//!
//! Tracks precedents (cells a formula reads) and dependents (cells whose
//! formulas read a given cell) for incremental recomputation.
//!
//! # Edge Direction
//!
//! ```text
//! A → B  means  "B depends on A"  (A is a precedent of B)
//! ```
//!
//! This makes "what must re-evaluate if X changes?" a walk over outgoing
//! edges.
//!
//! # Invariants
//!
//! 1. **Bidirectional consistency:** If A ∈ preds[B] then B ∈ succs[A], and
//!    vice versa.
//! 2. **No dangling entries:** Empty sets are removed, not stored.
//! 3. **No duplicate edges:** Set semantics enforced by `FxHashSet`.
//! 4. **Atomic updates:** `replace_edges` is the only mutator that touches
//!    both maps.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell_id::CellId;

/// Persistent dependency graph for formula cells.
#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// Precedents: for each formula cell B, the cells A it reads.
    preds: FxHashMap<CellId, FxHashSet<CellId>>,

    /// Dependents: for each referenced cell A, the formula cells B reading it.
    succs: FxHashMap<CellId, FxHashSet<CellId>>,
}

impl DepGraph {
    /// Create an empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cells this formula cell reads (precedents).
    pub fn precedents(&self, cell: CellId) -> impl Iterator<Item = CellId> + '_ {
        self.preds
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Returns the cells whose formulas read this cell (dependents).
    pub fn dependents(&self, cell: CellId) -> impl Iterator<Item = CellId> + '_ {
        self.succs
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Replace all edges for a formula cell atomically.
    ///
    /// Removes the cell from its old precedents' dependent sets, then
    /// installs the new precedent set and its dual edges. Pass an empty set
    /// to clear all edges for the cell.
    pub fn replace_edges(&mut self, formula_cell: CellId, new_preds: FxHashSet<CellId>) {
        if let Some(old_preds) = self.preds.remove(&formula_cell) {
            for pred in old_preds {
                if let Some(deps) = self.succs.get_mut(&pred) {
                    deps.remove(&formula_cell);
                    if deps.is_empty() {
                        self.succs.remove(&pred);
                    }
                }
            }
        }

        if new_preds.is_empty() {
            return;
        }

        for pred in &new_preds {
            self.succs.entry(*pred).or_default().insert(formula_cell);
        }
        self.preds.insert(formula_cell, new_preds);
    }

    /// Check whether the installed edges contain a cycle through `start`.
    ///
    /// Iterative DFS from `start` along precedent edges with a fresh visited
    /// set; true iff `start` is reached again. The check only needs to run
    /// from the just-edited cell: the pre-existing graph was acyclic, so any
    /// new cycle passes through the new edges out of `start`.
    pub fn has_cycle_through(&self, start: CellId) -> bool {
        let mut visited: FxHashSet<CellId> = FxHashSet::default();
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            for pred in self.precedents(current) {
                if pred == start {
                    return true;
                }
                if visited.insert(pred) {
                    stack.push(pred);
                }
            }
        }
        false
    }

    /// All cells transitively reachable from `start` along dependent edges,
    /// excluding `start` itself.
    ///
    /// This is the set of cells that must re-evaluate after `start` changes.
    pub fn affected_set(&self, start: CellId) -> FxHashSet<CellId> {
        let mut visited: FxHashSet<CellId> = FxHashSet::default();
        visited.insert(start);
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            for dep in self.dependents(current) {
                if visited.insert(dep) {
                    stack.push(dep);
                }
            }
        }

        visited.remove(&start);
        visited
    }

    /// Check all invariants. Panics if any are violated.
    ///
    /// Only available in test builds.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (formula_cell, preds) in &self.preds {
            for pred in preds {
                assert!(
                    self.succs.get(pred).map_or(false, |s| s.contains(formula_cell)),
                    "Missing succ edge: {:?} should have {:?} in dependents",
                    pred,
                    formula_cell
                );
            }
        }

        for (cell, dependents) in &self.succs {
            for dep in dependents {
                assert!(
                    self.preds.get(dep).map_or(false, |s| s.contains(cell)),
                    "Missing pred edge: {:?} should have {:?} in precedents",
                    dep,
                    cell
                );
            }
        }

        for (cell, preds) in &self.preds {
            assert!(!preds.is_empty(), "Empty preds set stored for {:?}", cell);
        }
        for (cell, succs) in &self.succs {
            assert!(!succs.is_empty(), "Empty succs set stored for {:?}", cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(row: usize, col: usize) -> CellId {
        CellId::new(row, col)
    }

    fn set(cells: &[CellId]) -> FxHashSet<CellId> {
        cells.iter().copied().collect()
    }

    #[test]
    fn test_empty_graph() {
        let graph = DepGraph::new();

        assert_eq!(graph.precedents(cell(0, 0)).count(), 0);
        assert_eq!(graph.dependents(cell(0, 0)).count(), 0);
        assert!(!graph.has_cycle_through(cell(0, 0)));
        assert!(graph.affected_set(cell(0, 0)).is_empty());

        graph.assert_consistent();
    }

    #[test]
    fn test_single_edge() {
        // B1 = A1
        let mut graph = DepGraph::new();
        let a1 = cell(0, 0);
        let b1 = cell(0, 1);

        graph.replace_edges(b1, set(&[a1]));
        graph.assert_consistent();

        assert_eq!(graph.precedents(b1).collect::<Vec<_>>(), vec![a1]);
        assert_eq!(graph.dependents(a1).collect::<Vec<_>>(), vec![b1]);
        assert_eq!(graph.precedents(a1).count(), 0);
    }

    #[test]
    fn test_multiple_precedents() {
        // C1 = A1 + B1
        let mut graph = DepGraph::new();
        let a1 = cell(0, 0);
        let b1 = cell(0, 1);
        let c1 = cell(0, 2);

        graph.replace_edges(c1, set(&[a1, b1]));
        graph.assert_consistent();

        let mut preds: Vec<_> = graph.precedents(c1).collect();
        preds.sort_unstable();
        assert_eq!(preds, vec![a1, b1]);

        assert_eq!(graph.dependents(a1).collect::<Vec<_>>(), vec![c1]);
        assert_eq!(graph.dependents(b1).collect::<Vec<_>>(), vec![c1]);
    }

    #[test]
    fn test_rewiring() {
        // B1 = A1, then change to B1 = A2
        let mut graph = DepGraph::new();
        let a1 = cell(0, 0);
        let a2 = cell(1, 0);
        let b1 = cell(0, 1);

        graph.replace_edges(b1, set(&[a1]));
        graph.replace_edges(b1, set(&[a2]));
        graph.assert_consistent();

        assert_eq!(graph.precedents(b1).collect::<Vec<_>>(), vec![a2]);
        assert_eq!(graph.dependents(a2).collect::<Vec<_>>(), vec![b1]);
        assert_eq!(graph.dependents(a1).count(), 0);
    }

    #[test]
    fn test_unwiring() {
        let mut graph = DepGraph::new();
        let a1 = cell(0, 0);
        let b1 = cell(0, 1);

        graph.replace_edges(b1, set(&[a1]));
        graph.replace_edges(b1, FxHashSet::default());
        graph.assert_consistent();

        assert_eq!(graph.precedents(b1).count(), 0);
        assert_eq!(graph.dependents(a1).count(), 0);
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        // X1 = X1 + 1
        let mut graph = DepGraph::new();
        let x1 = cell(0, 23);

        graph.replace_edges(x1, set(&[x1]));
        graph.assert_consistent();

        assert!(graph.has_cycle_through(x1));
    }

    #[test]
    fn test_two_cell_cycle() {
        // O1 = P1, then P1 = O1
        let mut graph = DepGraph::new();
        let o1 = cell(0, 14);
        let p1 = cell(0, 15);

        graph.replace_edges(o1, set(&[p1]));
        assert!(!graph.has_cycle_through(o1));

        graph.replace_edges(p1, set(&[o1]));
        assert!(graph.has_cycle_through(p1));
        assert!(graph.has_cycle_through(o1));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        //     A1
        //    /  \
        //   B1   C1
        //    \  /
        //     D1
        let mut graph = DepGraph::new();
        let a1 = cell(0, 0);
        let b1 = cell(0, 1);
        let c1 = cell(0, 2);
        let d1 = cell(0, 3);

        graph.replace_edges(b1, set(&[a1]));
        graph.replace_edges(c1, set(&[a1]));
        graph.replace_edges(d1, set(&[b1, c1]));
        graph.assert_consistent();

        assert!(!graph.has_cycle_through(b1));
        assert!(!graph.has_cycle_through(c1));
        assert!(!graph.has_cycle_through(d1));

        let affected = graph.affected_set(a1);
        assert_eq!(affected, set(&[b1, c1, d1]));
    }

    #[test]
    fn test_affected_set_excludes_start_and_unrelated() {
        let mut graph = DepGraph::new();
        let a1 = cell(0, 0);
        let b1 = cell(0, 1);
        let c1 = cell(0, 2);
        let z9 = cell(8, 25);

        graph.replace_edges(b1, set(&[a1]));
        graph.replace_edges(c1, set(&[b1]));
        graph.replace_edges(z9, set(&[cell(7, 0)]));

        let affected = graph.affected_set(a1);
        assert_eq!(affected, set(&[b1, c1]));
        assert!(!affected.contains(&a1));
        assert!(!affected.contains(&z9));
    }

    #[test]
    fn test_rollback_round_trip_restores_edges() {
        // Snapshot precedents, rewire, then restore: graph must be identical.
        let mut graph = DepGraph::new();
        let a1 = cell(0, 0);
        let b1 = cell(0, 1);
        let c1 = cell(0, 2);

        graph.replace_edges(c1, set(&[a1]));
        let snapshot: FxHashSet<CellId> = graph.precedents(c1).collect();

        graph.replace_edges(c1, set(&[b1, c1]));
        graph.replace_edges(c1, snapshot);
        graph.assert_consistent();

        assert_eq!(graph.precedents(c1).collect::<Vec<_>>(), vec![a1]);
        assert_eq!(graph.dependents(a1).collect::<Vec<_>>(), vec![c1]);
        assert_eq!(graph.dependents(b1).count(), 0);
        assert_eq!(graph.dependents(c1).count(), 0);
    }
}
