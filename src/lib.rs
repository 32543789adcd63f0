//! xlsxstream - Pull-based streaming reader for XLSX worksheet columns and ranges
//!
//! This crate exposes the cells of one worksheet as a pull-driven sequence of
//! resolved values. The worksheet is never materialized: a background scanner walks
//! the worksheet markup forward and hands over one value per pull, so memory use
//! does not grow with the size of the sheet.
//!
//! Each value is classified as text, date, time or number and rendered through the
//! workbook's display format.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xlsxstream::XlsxReader;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut reader = XlsxReader::open("example.xlsx", "Sheet1")?;
//!
//!     // Pull column B top to bottom
//!     while let Some(value) = reader.read_column("B")? {
//!         println!("{} [{:?}] {}", value.cell, value.kind, value.text);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Columns and Ranges
//!
//! Multi-column selections are walked column by column: every value of the first
//! column, then every value of the next one.
//!
//! ```rust,no_run
//! use xlsxstream::XlsxReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = XlsxReader::open("example.xlsx", "Sheet1")?;
//! while let Some(value) = reader.read_range("A10:C99")? {
//!     println!("{} = {}", value.cell, value.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Iterator Interface
//!
//! ```rust,no_run
//! use xlsxstream::{Selection, XlsxReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = XlsxReader::open("example.xlsx", "Sheet1")?;
//! let totals: Vec<String> = reader
//!     .stream(Selection::column("D")?)
//!     .filter_map(Result::ok)
//!     .map(|v| v.text)
//!     .collect();
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use xlsxstream::{FormatKind, ReaderBuilder, UnknownCellPolicy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = ReaderBuilder::new()
//!     .with_format(14, FormatKind::Date, "%Y年%m月%d日")  // Japanese date format
//!     .with_unknown_cell_policy(UnknownCellPolicy::Surface)  // Keep booleans etc.
//!     .open("example.xlsx", "Sheet1")?;
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod classifier;
mod cursor;
mod error;
mod filter;
mod format;
mod package;
mod parser;
mod reader;
mod rendezvous;
mod scanner;
mod security;
mod types;

// 公開API
pub use api::{FormatKind, Selection, UnknownCellPolicy, ValueKind};
pub use builder::{ReaderBuilder, ReaderConfig};
pub use cursor::StreamCursor;
pub use error::{ErrorCategory, Result, XlsxStreamError};
pub use format::{FormatCatalog, FormatEntry};
pub use reader::XlsxReader;
pub use types::{next_column, CellRange, CellRef, Column, ResolvedValue};
