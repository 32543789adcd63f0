//! Format Module
//!
//! Excel Number Format Stringの解析、描画用語彙への変換、書式カタログを提供します。

mod catalog;
pub(crate) mod datetime;
mod number;
mod sections;
mod tokens;

pub use catalog::{FormatCatalog, FormatEntry};
