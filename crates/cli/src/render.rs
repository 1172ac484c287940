//! Plain-stdout grid renderer.
//!
//! Fixed format: a 5-space gutter, column letters left-aligned in 12-wide
//! columns, then one line per row with a 1-based row number and the cell
//! values (`ERR` for error cells).

use std::io::{self, Write};

use calcgrid_engine::cell::CellStatus;
use calcgrid_engine::cell_id::{col_to_letters, CellId};
use calcgrid_engine::sheet::Spreadsheet;

use crate::viewport::{Viewport, PAGE};

const CELL_WIDTH: usize = 12;

/// Print the viewport window, truncated at the grid edges.
pub fn draw_grid(out: &mut impl Write, sheet: &Spreadsheet, view: &Viewport) -> io::Result<()> {
    let end_row = (view.top_row + PAGE).min(sheet.rows());
    let end_col = (view.left_col + PAGE).min(sheet.cols());

    write!(out, "     ")?;
    for col in view.left_col..end_col {
        write!(out, "{:<CELL_WIDTH$}", col_to_letters(col))?;
    }
    writeln!(out)?;

    for row in view.top_row..end_row {
        write!(out, "{:<4} ", row + 1)?;
        for col in view.left_col..end_col {
            let cell = sheet.cell(CellId::new(row, col));
            match cell.status {
                CellStatus::Error => write!(out, "{:<CELL_WIDTH$}", "ERR")?,
                CellStatus::Ok => write!(out, "{:<CELL_WIDTH$}", cell.value)?,
            }
        }
        writeln!(out)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> CellId {
        CellId::parse(name).unwrap()
    }

    fn rendered(sheet: &Spreadsheet, view: &Viewport) -> String {
        let mut buffer = Vec::new();
        draw_grid(&mut buffer, sheet, view).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_small_grid_layout() {
        let mut sheet = Spreadsheet::new(2, 3);
        sheet.set_formula(id("A1"), "7");
        sheet.set_formula(id("C2"), "-12");
        let text = rendered(&sheet, &Viewport::new());

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "     A           B           C           ");
        assert_eq!(lines[1], "1    7           0           0           ");
        assert_eq!(lines[2], "2    0           0           -12         ");
    }

    #[test]
    fn test_error_cells_render_as_err() {
        let mut sheet = Spreadsheet::new(1, 2);
        sheet.set_formula(id("A1"), "1/0");
        let text = rendered(&sheet, &Viewport::new());
        assert!(text.contains("ERR"));
    }

    #[test]
    fn test_window_truncates_at_grid_edge() {
        let sheet = Spreadsheet::new(30, 30);
        let mut view = Viewport::new();
        view.scroll_to(id("Y25"));
        let text = rendered(&sheet, &view);

        let lines: Vec<&str> = text.lines().collect();
        // Rows 25..30 and columns Y..AD (6 of each).
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("     Y           Z           AA"));
        assert!(lines[1].starts_with("25   "));
        assert!(lines[6].starts_with("30   "));
    }

    #[test]
    fn test_origin_past_the_edge_renders_header_only() {
        let sheet = Spreadsheet::new(10, 10);
        let mut view = Viewport::new();
        view.scroll_to(CellId::new(50, 50));
        let text = rendered(&sheet, &view);
        assert_eq!(text, "     \n");
    }
}
