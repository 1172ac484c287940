//! REPL command dispatch.
//!
//! One line in, one status out. Edits are split at the first `=`; the cell
//! name is resolved here and the formula handed to the engine's edit
//! transaction.

use std::borrow::Cow;

use calcgrid_engine::cell_id::CellId;
use calcgrid_engine::sheet::Spreadsheet;

use crate::viewport::Viewport;

const OK: &str = "ok";

/// Apply one command line and return the status for the prompt.
pub fn execute(cmd: &str, sheet: &mut Spreadsheet, view: &mut Viewport) -> Cow<'static, str> {
    match cmd {
        "w" => {
            view.page_up();
            OK.into()
        }
        "s" => {
            view.page_down(sheet.rows());
            OK.into()
        }
        "a" => {
            view.page_left();
            OK.into()
        }
        "d" => {
            view.page_right(sheet.cols());
            OK.into()
        }
        "disable_output" => {
            view.output_enabled = false;
            OK.into()
        }
        "enable_output" => {
            view.output_enabled = true;
            OK.into()
        }
        _ => {
            if let Some(rest) = cmd.strip_prefix("scroll_to") {
                scroll_to(rest, sheet, view)
            } else if let Some((name, formula)) = cmd.split_once('=') {
                edit_cell(name, formula, sheet)
            } else {
                "unrecognized cmd".into()
            }
        }
    }
}

fn scroll_to(rest: &str, sheet: &Spreadsheet, view: &mut Viewport) -> Cow<'static, str> {
    let target = rest.trim();
    if target.is_empty() {
        return "Invalid command".into();
    }
    match CellId::parse(target) {
        None => "Invalid cell".into(),
        Some(id) if !sheet.in_bounds(id) => "Cell reference out of bounds".into(),
        Some(id) => {
            view.scroll_to(id);
            OK.into()
        }
    }
}

fn edit_cell(name: &str, formula: &str, sheet: &mut Spreadsheet) -> Cow<'static, str> {
    match CellId::parse(name) {
        None => "Invalid cell".into(),
        Some(id) if !sheet.in_bounds(id) => "Cell out of bounds".into(),
        Some(id) => sheet.set_formula(id, formula).to_string().into(),
    }
}
