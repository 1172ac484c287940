//! Surface validation of edit-transaction formulas.
//!
//! A fast, shallow check run before any graph mutation. Accepts exactly the
//! shapes the edit command supports:
//!
//! 1. a single in-bounds cell reference;
//! 2. a single integer literal;
//! 3. `MIN|MAX|SUM|AVG|STDEV(r1:r2)` with both endpoints well-formed, in
//!    bounds, and `r1` top-left of `r2`;
//! 4. `SLEEP(x)` with `x` an integer literal or an in-bounds cell reference;
//! 5. a binary expression whose sides are each an integer literal or a
//!    syntactically valid cell name.
//!
//! Binary-expression sides are deliberately not bounds-checked: out-of-grid
//! references there surface during evaluation as `Range out of bounds`.

use crate::cell_id::CellId;

/// Formulas longer than this are rejected outright.
pub const MAX_FORMULA_LEN: usize = 256;

const RANGE_FUNCTIONS: [&str; 5] = ["MIN(", "MAX(", "SUM(", "AVG(", "STDEV("];

/// True if the formula has one of the supported surface shapes.
pub fn validate_formula(formula: &str, rows: usize, cols: usize) -> bool {
    if formula.is_empty() || formula.len() > MAX_FORMULA_LEN {
        return false;
    }

    if let Some(id) = CellId::parse(formula) {
        return in_bounds(id, rows, cols);
    }

    if formula.parse::<i32>().is_ok() {
        return true;
    }

    for prefix in RANGE_FUNCTIONS {
        if let Some(rest) = formula.strip_prefix(prefix) {
            return validate_range(rest, rows, cols);
        }
    }

    if let Some(rest) = formula.strip_prefix("SLEEP(") {
        return validate_sleep_arg(rest, rows, cols);
    }

    validate_binary(formula)
}

fn in_bounds(id: CellId, rows: usize, cols: usize) -> bool {
    id.row < rows && id.col < cols
}

/// `rest` is everything after `FUNC(`; expects `r1:r2)`.
fn validate_range(rest: &str, rows: usize, cols: usize) -> bool {
    let Some(inner) = rest.strip_suffix(')') else {
        return false;
    };
    let Some((first, second)) = inner.split_once(':') else {
        return false;
    };
    let (Some(a), Some(b)) = (CellId::parse(first.trim()), CellId::parse(second.trim())) else {
        return false;
    };
    in_bounds(a, rows, cols)
        && in_bounds(b, rows, cols)
        && a.row <= b.row
        && a.col <= b.col
}

/// `rest` is everything after `SLEEP(`; expects an integer or cell name, `)`.
fn validate_sleep_arg(rest: &str, rows: usize, cols: usize) -> bool {
    let Some(inner) = rest.strip_suffix(')') else {
        return false;
    };
    let inner = inner.trim();
    if inner.parse::<i32>().is_ok() {
        return true;
    }
    CellId::parse(inner).is_some_and(|id| in_bounds(id, rows, cols))
}

/// `lhs op rhs` with `op` the first operator after an optional leading `-`.
fn validate_binary(formula: &str) -> bool {
    let search_from = usize::from(formula.starts_with('-'));
    let Some(offset) = formula[search_from..].find(['+', '-', '*', '/']) else {
        return false;
    };
    let op = search_from + offset;

    let side_ok = |side: &str| side.parse::<i32>().is_ok() || CellId::parse(side).is_some();
    side_ok(formula[..op].trim()) && side_ok(formula[op + 1..].trim())
}
