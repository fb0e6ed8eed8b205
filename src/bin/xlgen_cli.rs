//! CLI tool for xlgen - writes XLSX files
//!
//! Usage:
//!   xlgen_cli <output.xlsx> < data.json           # Export a JSON dataset from stdin
//!   xlgen_cli --insert <file.xlsx> <text>         # Write text to A1 of the first sheet
//!   xlgen_cli --insert-sheet <file.xlsx> <text>   # Write text to A1 of a new sheet
//!   xlgen_cli --catalog <file.xlsx>               # Print the sheet catalog as JSON

#![allow(clippy::exit)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::io::{self, Write};
use xlgen::{assembler, catalog_json, Dataset};

const USAGE: &str = "Usage:
  xlgen_cli <output.xlsx> < data.json
  xlgen_cli --insert <file.xlsx> <text>
  xlgen_cli --insert-sheet <file.xlsx> <text>
  xlgen_cli --catalog <file.xlsx>";

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("Error {context}: {err}");
    std::process::exit(1);
}

fn usage() -> ! {
    eprintln!("{USAGE}");
    std::process::exit(1);
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage();
    }

    match args[1].as_str() {
        "--insert" | "--insert-sheet" => {
            if args.len() != 4 {
                usage();
            }
            let (path, text) = (&args[2], &args[3]);
            let result = if args[1] == "--insert" {
                assembler::insert_text(path, text)
            } else {
                assembler::insert_text_in_new_sheet(path, text)
            };
            if let Err(e) = result {
                fail(&format!("updating {path}"), e);
            }
            eprintln!("Updated: {path}");
        }
        "--catalog" => {
            if args.len() != 3 {
                usage();
            }
            let path = &args[2];
            let data = fs::read(path).unwrap_or_else(|e| fail(&format!("reading {path}"), e));
            let json = catalog_json(&data).unwrap_or_else(|e| fail("reading catalog", e));
            let mut stdout = io::stdout();
            if let Err(e) = writeln!(stdout, "{json}") {
                fail("writing output", e);
            }
        }
        flag if flag.starts_with('-') => usage(),
        _ => {
            if args.len() != 2 {
                usage();
            }
            let output_path = &args[1];
            let dataset = Dataset::from_json_reader(io::stdin().lock())
                .unwrap_or_else(|e| fail("reading dataset", e));
            if let Err(e) = assembler::export_to_file(output_path, &dataset) {
                fail(&format!("writing {output_path}"), e);
            }
            eprintln!("Written: {output_path}");
        }
    }
}
