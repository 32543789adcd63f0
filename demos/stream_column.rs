//! Stream Column Example
//!
//! This example demonstrates pulling cells from an Excel worksheet one value at a time.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example stream_column -- input.xlsx Sheet1 B
//! cargo run --example stream_column -- input.xlsx Sheet1 A10:C99
//! cargo run --example stream_column -- input.xlsx Sheet1 A C
//! ```

use std::process;
use xlsxstream::{ErrorCategory, ReaderBuilder, UnknownCellPolicy, XlsxReader};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 4 {
        eprintln!("Usage: {} <input.xlsx> <sheet> <column|range> [<to-column>]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} input.xlsx Sheet1 B", args[0]);
        eprintln!("  {} input.xlsx Sheet1 A10:C99", args[0]);
        eprintln!("  {} input.xlsx Sheet1 A C", args[0]);
        process::exit(1);
    }

    let mut reader = match ReaderBuilder::new()
        .with_unknown_cell_policy(UnknownCellPolicy::Surface)
        .open(&args[1], &args[2])
    {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("Error: Could not open '{}': {}", args[1], e);
            process::exit(1);
        }
    };

    let pull = |reader: &mut XlsxReader| match args.get(4) {
        Some(to) => reader.read_columns(&args[3], to),
        None if args[3].contains(':') => reader.read_range(&args[3]),
        None => reader.read_column(&args[3]),
    };

    let mut count = 0usize;
    loop {
        match pull(&mut reader) {
            Ok(Some(value)) => {
                count += 1;
                let kind = format!("{:?}", value.kind);
                if value.format.is_empty() {
                    println!("{:>8}  {:<7} {}", value.cell.to_string(), kind, value.text);
                } else {
                    println!(
                        "{:>8}  {:<7} {}  [{}]",
                        value.cell.to_string(),
                        kind,
                        value.text,
                        value.format
                    );
                }
            }
            Ok(None) => break,
            // セル単位のエラーは報告して続行
            Err(e) if e.category() == ErrorCategory::DataIntegrity => {
                eprintln!("Warning: {}", e);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }

    println!("\n{} values read", count);
    reader.close();
}
