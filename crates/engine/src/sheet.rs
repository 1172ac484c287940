//! The spreadsheet: dense cell store plus the edit transaction.
//!
//! All cells exist from creation and are never allocated or freed per write.
//! `set_formula` is the single mutation entry point; it is a transaction
//! with rollback on cycle detection, so between commands the graph is always
//! acyclic and edge-symmetric.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::cell::{Cell, CellStatus};
use crate::cell_id::CellId;
use crate::dep_graph::DepGraph;
use crate::formula::analyze;
use crate::formula::eval::{self, CellRead, EvalError};
use crate::formula::refs;

/// Outcome of one edit transaction, surfaced to the REPL status slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditStatus {
    Ok,
    /// The formula failed surface validation; nothing was changed.
    Unrecognized,
    InvalidFormula,
    InvalidRange,
    /// A reference pointed outside the grid during evaluation. The edit
    /// persists, but the cell value is untouched and no cascade runs.
    RangeOutOfBounds,
    /// Installing the formula would create a cycle; the edit was rolled back.
    Circular(CellId),
}

impl fmt::Display for EditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditStatus::Ok => write!(f, "ok"),
            EditStatus::Unrecognized => write!(f, "Unrecognized"),
            EditStatus::InvalidFormula => write!(f, "Invalid formula"),
            EditStatus::InvalidRange => write!(f, "Invalid range"),
            EditStatus::RangeOutOfBounds => write!(f, "Range out of bounds"),
            EditStatus::Circular(cell) => {
                write!(f, "Circular dependency detected in cell {}", cell)
            }
        }
    }
}

/// A fixed-size grid of integer cells with a dependency graph.
pub struct Spreadsheet {
    rows: usize,
    cols: usize,
    pub(crate) cells: Vec<Cell>,
    pub(crate) graph: DepGraph,
}

impl CellRead for Spreadsheet {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn value(&self, id: CellId) -> i32 {
        self.cells[self.index(id)].value
    }

    fn status(&self, id: CellId) -> CellStatus {
        self.cells[self.index(id)].status
    }
}

impl Spreadsheet {
    /// Create a sheet of the given dimensions; every cell starts as a
    /// zero-valued `Ok` cell with no formula.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::default(); rows * cols],
            graph: DepGraph::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn in_bounds(&self, id: CellId) -> bool {
        id.row < self.rows && id.col < self.cols
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[self.index(id)]
    }

    /// The dependency graph (read-only; mutated only through edits).
    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    #[inline]
    pub(crate) fn index(&self, id: CellId) -> usize {
        id.row * self.cols + id.col
    }

    /// Apply one `cell = formula` edit. `target` must be in bounds.
    ///
    /// The transaction: validate the surface syntax, snapshot the old deps
    /// and formula, rewire edges from the lexical extractor, check for
    /// cycles (rolling back completely on detection), evaluate, and cascade
    /// to the affected dependents.
    pub fn set_formula(&mut self, target: CellId, formula: &str) -> EditStatus {
        let formula = formula.trim();
        if !analyze::validate_formula(formula, self.rows, self.cols) {
            return EditStatus::Unrecognized;
        }

        let idx = self.index(target);
        let old_deps: FxHashSet<CellId> = self.graph.precedents(target).collect();
        let old_formula = self.cells[idx].formula.take();

        let new_deps = refs::extract_refs(formula, self.rows, self.cols);
        self.graph.replace_edges(target, new_deps);
        self.cells[idx].formula = Some(formula.to_string());

        if self.graph.has_cycle_through(target) {
            self.cells[idx].formula = old_formula;
            self.graph.replace_edges(target, old_deps);
            return EditStatus::Circular(target);
        }

        match eval::evaluate(formula, self) {
            Err(EvalError::DivByZero) | Err(EvalError::Propagated) => {
                self.mark_error_cascade(target);
                EditStatus::Ok
            }
            Err(EvalError::OutOfBounds) => EditStatus::RangeOutOfBounds,
            Err(EvalError::Syntax) => EditStatus::InvalidFormula,
            Err(EvalError::BadRange) => EditStatus::InvalidRange,
            Ok(value) => {
                let cell = &mut self.cells[idx];
                cell.value = value;
                cell.status = CellStatus::Ok;
                self.recalc_affected(target)
            }
        }
    }

    /// Poison `start` and every transitive dependent: `status = Error`,
    /// `value = 0`. Already-poisoned cells terminate their branch.
    fn mark_error_cascade(&mut self, start: CellId) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let idx = self.index(id);
            if self.cells[idx].status == CellStatus::Error {
                continue;
            }
            self.cells[idx].status = CellStatus::Error;
            self.cells[idx].value = 0;
            stack.extend(self.graph.dependents(id));
        }
    }
}
