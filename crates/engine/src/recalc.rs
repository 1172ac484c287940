//! Selective recalculation of the cells affected by an edit.
//!
//! After a successful edit, only the transitive dependents of the edited
//! cell re-evaluate. The affected set is an induced acyclic subgraph, so a
//! local Kahn pass (indegrees counted within the set only) visits every
//! affected cell exactly once, precedents before dependents.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::cell::CellStatus;
use crate::cell_id::CellId;
use crate::formula::eval::{self, EvalError};
use crate::sheet::{EditStatus, Spreadsheet};

impl Spreadsheet {
    /// Re-evaluate every transitive dependent of `start` in topological
    /// order. `start` itself was already evaluated by the edit transaction.
    ///
    /// Queue order is FIFO with (row, col)-sorted ties, which fixes the
    /// order of `SLEEP` side effects; it is otherwise unobservable.
    pub(crate) fn recalc_affected(&mut self, start: CellId) -> EditStatus {
        let affected = self.graph.affected_set(start);
        if affected.is_empty() {
            return EditStatus::Ok;
        }

        let mut indegree: FxHashMap<CellId, usize> = FxHashMap::default();
        for &id in &affected {
            let local = self
                .graph
                .precedents(id)
                .filter(|p| affected.contains(p))
                .count();
            indegree.insert(id, local);
        }

        let mut ready: Vec<CellId> = indegree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&id, _)| id)
            .collect();
        ready.sort_unstable();
        let mut queue: VecDeque<CellId> = ready.into();

        while let Some(id) = queue.pop_front() {
            if let Some(formula) = self.cell(id).formula.clone() {
                match eval::evaluate(&formula, self) {
                    Ok(value) => {
                        let idx = self.index(id);
                        self.cells[idx].value = value;
                        self.cells[idx].status = CellStatus::Ok;
                    }
                    Err(EvalError::DivByZero) | Err(EvalError::Propagated) => {
                        // Descendants stay in the affected set; they will
                        // evaluate against this error cell and propagate.
                        let idx = self.index(id);
                        self.cells[idx].status = CellStatus::Error;
                        self.cells[idx].value = 0;
                    }
                    Err(EvalError::BadRange) => return EditStatus::InvalidRange,
                    Err(EvalError::Syntax) => return EditStatus::InvalidFormula,
                    Err(EvalError::OutOfBounds) => return EditStatus::RangeOutOfBounds,
                }
            }

            let mut unlocked: Vec<CellId> = Vec::new();
            for dep in self.graph.dependents(id) {
                if let Some(degree) = indegree.get_mut(&dep) {
                    *degree -= 1;
                    if *degree == 0 {
                        unlocked.push(dep);
                    }
                }
            }
            unlocked.sort_unstable();
            queue.extend(unlocked);
        }

        EditStatus::Ok
    }
}
