// calcgrid - interactive terminal spreadsheet
//
// Reads commands line by line from stdin; after every command prints the
// viewport grid (unless output is disabled) and a status/prompt line:
//
//   [<elapsed seconds>] (<status>) >

use std::io::{self, BufRead, Write};
use std::time::Instant;

use clap::Parser;

use calcgrid_engine::sheet::Spreadsheet;

mod commands;
mod render;
mod viewport;

use viewport::Viewport;

/// Terminal-driven integer spreadsheet.
#[derive(Parser)]
#[command(name = "cgrid", version, about = "Terminal-driven integer spreadsheet")]
struct Args {
    /// Grid height in rows
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    rows: u32,

    /// Grid width in columns
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    cols: u32,
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let mut sheet = Spreadsheet::new(args.rows as usize, args.cols as usize);
    let mut view = Viewport::new();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    render::draw_grid(&mut out, &sheet, &view)?;
    write!(out, "[0.0] (ok) > ")?;
    out.flush()?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let cmd = line.trim_end_matches('\r');
        if cmd == "q" {
            break;
        }

        let started = Instant::now();
        let status = commands::execute(cmd, &mut sheet, &mut view);
        let elapsed = started.elapsed().as_secs_f64();

        if view.output_enabled {
            render::draw_grid(&mut out, &sheet, &view)?;
        }
        write!(out, "[{:.1}] ({}) > ", elapsed, status)?;
        out.flush()?;
    }

    Ok(())
}
