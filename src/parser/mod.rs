//! Parser Module
//!
//! quick-xmlを使用したワークブック各パートの解析。
//! ワークシート本体は前方向のウォーカーで1要素ずつ読み込みます。

mod shared_strings;
mod sheet;
mod styles;
mod workbook;

pub(crate) use shared_strings::SharedStringTable;
pub(crate) use sheet::{SheetEvent, SheetWalker};
pub(crate) use styles::{parse_styles, CustomFormat, StyleTable};
pub(crate) use workbook::WorkbookInfo;

use crate::error::Result;

/// 属性値を`u32`として解析
pub(crate) fn parse_u32(value: &[u8]) -> Result<u32> {
    Ok(std::str::from_utf8(value)?.trim().parse()?)
}
