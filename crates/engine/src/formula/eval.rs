//! Formula evaluator.
//!
//! Direct recursive descent over the formula text, producing a value without
//! building an AST. Grammar, loosest to tightest:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := IDENT '(' args ')'     -- function call
//!         | IDENT                  -- cell reference
//!         | ['-'] DIGITS           -- integer literal
//!         | '(' expr ')'
//! args   := range | expr
//! range  := IDENT ':' IDENT
//! ```
//!
//! Whitespace is skipped between tokens. Arithmetic is signed 32-bit with
//! wrap-around on overflow; division truncates toward zero.

use std::thread;
use std::time::Duration;

use crate::cell::CellStatus;
use crate::cell_id::CellId;

/// Read access the evaluator needs from the cell store.
///
/// Kept as a trait so the evaluator can be exercised against a plain grid
/// fixture without a full spreadsheet.
pub trait CellRead {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    fn value(&self, id: CellId) -> i32;
    fn status(&self, id: CellId) -> CellStatus;

    fn in_bounds(&self, id: CellId) -> bool {
        id.row < self.rows() && id.col < self.cols()
    }
}

/// Why an evaluation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalError {
    /// Syntactic junk, missing parenthesis, truncated token.
    Syntax,
    /// Range endpoints not in top-left / bottom-right order.
    BadRange,
    /// Division by zero.
    DivByZero,
    /// A referenced cell is itself in error state.
    Propagated,
    /// A referenced coordinate lies outside the grid.
    OutOfBounds,
}

/// Evaluate a formula against the current cell state.
///
/// The whole input must be consumed; trailing junk is a syntax error.
pub fn evaluate<S: CellRead>(formula: &str, sheet: &S) -> Result<i32, EvalError> {
    let mut cursor = Cursor::new(formula);
    let value = cursor.expr(sheet)?;
    cursor.skip_spaces();
    if !cursor.at_end() {
        return Err(EvalError::Syntax);
    }
    Ok(value)
}

/// Range aggregate selector.
#[derive(Clone, Copy, Debug)]
enum Agg {
    Min,
    Max,
    Sum,
    Avg,
    Stdev,
}

impl Agg {
    fn from_name(name: &str) -> Option<Agg> {
        match name {
            "MIN" => Some(Agg::Min),
            "MAX" => Some(Agg::Max),
            "SUM" => Some(Agg::Sum),
            "AVG" => Some(Agg::Avg),
            "STDEV" => Some(Agg::Stdev),
            _ => None,
        }
    }

    /// Apply the aggregate to a non-empty value slice.
    fn apply(self, values: &[i32]) -> i32 {
        match self {
            Agg::Min => values.iter().copied().min().unwrap_or(0),
            Agg::Max => values.iter().copied().max().unwrap_or(0),
            Agg::Sum => values.iter().map(|&v| v as i64).sum::<i64>() as i32,
            Agg::Avg => {
                let sum: i64 = values.iter().map(|&v| v as i64).sum();
                (sum / values.len() as i64) as i32
            }
            Agg::Stdev => {
                // Population standard deviation with an f64 mean, rounded
                // half away from zero.
                let n = values.len() as f64;
                let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
                let variance = values
                    .iter()
                    .map(|&v| {
                        let d = v as f64 - mean;
                        d * d
                    })
                    .sum::<f64>()
                    / n;
                variance.sqrt().round() as i32
            }
        }
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.bump();
        }
    }

    fn expr<S: CellRead>(&mut self, sheet: &S) -> Result<i32, EvalError> {
        let mut value = self.term(sheet)?;
        loop {
            self.skip_spaces();
            match self.peek() {
                Some(b'+') => {
                    self.bump();
                    value = value.wrapping_add(self.term(sheet)?);
                }
                Some(b'-') => {
                    self.bump();
                    value = value.wrapping_sub(self.term(sheet)?);
                }
                _ => return Ok(value),
            }
        }
    }

    fn term<S: CellRead>(&mut self, sheet: &S) -> Result<i32, EvalError> {
        let mut value = self.factor(sheet)?;
        loop {
            self.skip_spaces();
            match self.peek() {
                Some(b'*') => {
                    self.bump();
                    value = value.wrapping_mul(self.factor(sheet)?);
                }
                Some(b'/') => {
                    self.bump();
                    let divisor = self.factor(sheet)?;
                    if divisor == 0 {
                        return Err(EvalError::DivByZero);
                    }
                    value = value.wrapping_div(divisor);
                }
                _ => return Ok(value),
            }
        }
    }

    fn factor<S: CellRead>(&mut self, sheet: &S) -> Result<i32, EvalError> {
        self.skip_spaces();
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() => self.ident_factor(sheet),
            Some(b) if b.is_ascii_digit() => self.number(),
            Some(b'-') if matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()) => {
                self.bump();
                Ok(self.number()?.wrapping_neg())
            }
            Some(b'(') => {
                self.bump();
                let value = self.expr(sheet)?;
                self.skip_spaces();
                if !self.eat(b')') {
                    return Err(EvalError::Syntax);
                }
                Ok(value)
            }
            _ => Err(EvalError::Syntax),
        }
    }

    /// A factor starting with a letter: function call or cell reference.
    fn ident_factor<S: CellRead>(&mut self, sheet: &S) -> Result<i32, EvalError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphabetic()) {
            self.bump();
        }
        let ident_end = self.pos;

        self.skip_spaces();
        if self.eat(b'(') {
            let name = std::str::from_utf8(&self.bytes[start..ident_end])
                .map_err(|_| EvalError::Syntax)?;
            if name == "SLEEP" {
                return self.sleep_call(sheet);
            }
            if let Some(agg) = Agg::from_name(name) {
                return self.range_call(agg, sheet);
            }
            // Unknown function: consume through the matching ')', yield 0.
            self.skip_unknown_call()?;
            return Ok(0);
        }

        // Cell reference: rewind and re-scan letters + digits.
        self.pos = start;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphabetic()) {
            self.bump();
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.bump();
        }
        let name = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| EvalError::Syntax)?;
        let id = CellId::parse(name).ok_or(EvalError::Syntax)?;
        self.read_cell(id, sheet)
    }

    fn read_cell<S: CellRead>(&self, id: CellId, sheet: &S) -> Result<i32, EvalError> {
        if !sheet.in_bounds(id) {
            return Err(EvalError::OutOfBounds);
        }
        if sheet.status(id) == CellStatus::Error {
            return Err(EvalError::Propagated);
        }
        Ok(sheet.value(id))
    }

    /// `SLEEP(expr)`: evaluate, sleep that many seconds when non-negative,
    /// return the argument either way.
    fn sleep_call<S: CellRead>(&mut self, sheet: &S) -> Result<i32, EvalError> {
        let seconds = self.expr(sheet)?;
        self.skip_spaces();
        if !self.eat(b')') {
            return Err(EvalError::Syntax);
        }
        if seconds >= 0 {
            thread::sleep(Duration::from_secs(seconds as u64));
        }
        Ok(seconds)
    }

    /// `MIN|MAX|SUM|AVG|STDEV(r1:r2)`.
    fn range_call<S: CellRead>(&mut self, agg: Agg, sheet: &S) -> Result<i32, EvalError> {
        let first = self.cell_name()?;
        self.skip_spaces();
        if !self.eat(b':') {
            return Err(EvalError::Syntax);
        }
        let second = self.cell_name()?;
        self.skip_spaces();
        if !self.eat(b')') {
            return Err(EvalError::Syntax);
        }

        if !sheet.in_bounds(first) || !sheet.in_bounds(second) {
            return Err(EvalError::OutOfBounds);
        }
        if first.row > second.row || first.col > second.col {
            return Err(EvalError::BadRange);
        }

        let mut values =
            Vec::with_capacity((second.row - first.row + 1) * (second.col - first.col + 1));
        for row in first.row..=second.row {
            for col in first.col..=second.col {
                let id = CellId::new(row, col);
                if sheet.status(id) == CellStatus::Error {
                    return Err(EvalError::Propagated);
                }
                values.push(sheet.value(id));
            }
        }
        Ok(agg.apply(&values))
    }

    fn cell_name(&mut self) -> Result<CellId, EvalError> {
        self.skip_spaces();
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphabetic()) {
            self.bump();
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.bump();
        }
        let name = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| EvalError::Syntax)?;
        CellId::parse(name).ok_or(EvalError::Syntax)
    }

    /// Skip an unknown function's arguments through the matching ')'.
    fn skip_unknown_call(&mut self) -> Result<(), EvalError> {
        let mut depth = 1usize;
        while let Some(b) = self.peek() {
            self.bump();
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(EvalError::Syntax)
    }

    fn number(&mut self) -> Result<i32, EvalError> {
        let mut value: i32 = 0;
        let mut any = false;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                value = value.wrapping_mul(10).wrapping_add((b - b'0') as i32);
                self.bump();
                any = true;
            } else {
                break;
            }
        }
        if any {
            Ok(value)
        } else {
            Err(EvalError::Syntax)
        }
    }
}
