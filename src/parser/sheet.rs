//! Sheet Walker
//!
//! ワークシートXMLを前方向にのみ走査する要素ウォーカー。
//! 行とセルを1つずつ返し、セルの値は必要な場合にのみ読み込みます。
//! メモリ使用量はワークシートの大きさに依存しません。

use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use std::io::BufRead;

use super::parse_u32;
use crate::error::{Result, XlsxStreamError};
use crate::types::{CellRef, CellType, Column, RawCell};

/// ウォーカーが返すイベント
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SheetEvent {
    /// 行の開始（行番号）
    Row(u32),
    /// セルの開始（属性のみ、値は未読み込み）
    Cell(CellStart),
    /// ワークシートの終端
    Eof,
}

/// セルの開始タグから読み取った属性
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CellStart {
    /// セル参照
    pub cell: CellRef,
    /// 宣言された型
    pub cell_type: CellType,
    /// スタイルインデックス
    pub style: Option<u32>,
    /// 子要素を持つ場合の要素名（`<c/>`の場合は`None`）
    body: Option<Vec<u8>>,
}

/// ワークシートの前方向ウォーカー
pub(crate) struct SheetWalker<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    skip_buf: Vec<u8>,
    row: u32,
    column: u32,
    /// 開いている`<row>`の要素名
    open_row: Option<Vec<u8>>,
}

impl<R: BufRead> SheetWalker<R> {
    /// 新しいウォーカーを生成
    pub fn new(source: R) -> Self {
        Self {
            reader: Reader::from_reader(source),
            buf: Vec::new(),
            skip_buf: Vec::new(),
            row: 0,
            column: 0,
            open_row: None,
        }
    }

    /// 次の行またはセルまで進む
    ///
    /// セルの値を読む場合は、次の呼び出しの前に[`SheetWalker::load_cell`]を呼び出します。
    /// 呼び出さなかった場合、セルの子要素は読み飛ばされます。
    pub fn next_event(&mut self) -> Result<SheetEvent> {
        loop {
            self.buf.clear();
            let event = self.reader.read_event_into(&mut self.buf)?;
            let (start, has_body) = match event {
                Event::Start(e) => (e, true),
                Event::Empty(e) => (e, false),
                Event::End(e) => {
                    if e.local_name().as_ref() == b"row" {
                        self.open_row = None;
                    }
                    continue;
                }
                Event::Eof => return Ok(SheetEvent::Eof),
                _ => continue,
            };

            match start.local_name().as_ref() {
                b"row" => {
                    let row = row_number(&start)?.unwrap_or(self.row + 1);
                    self.row = row;
                    self.column = 0;
                    self.open_row = has_body.then(|| start.name().as_ref().to_vec());
                    return Ok(SheetEvent::Row(row));
                }
                b"c" => {
                    let cell = cell_start(&start, has_body, self.row, self.column)?;
                    self.row = cell.cell.row;
                    self.column = cell.cell.column.index();
                    return Ok(SheetEvent::Cell(cell));
                }
                _ => {}
            }
        }
    }

    /// セルの値を読み込む
    ///
    /// `<v>`の内容、またはインライン文字列（`<is>`）のテキストを返します。
    /// 値の要素を持たないセルは`None`です。
    pub fn load_cell(&mut self, start: CellStart) -> Result<RawCell> {
        let text = match start.body {
            Some(_) => self.read_cell_text()?,
            None => None,
        };
        Ok(RawCell {
            cell: start.cell,
            cell_type: start.cell_type,
            style: start.style,
            text,
        })
    }

    /// セルの子要素を読み飛ばす
    pub fn skip_cell(&mut self, start: &CellStart) -> Result<()> {
        if let Some(name) = &start.body {
            self.skip_buf.clear();
            self.reader.read_to_end_into(QName(name), &mut self.skip_buf)?;
        }
        Ok(())
    }

    /// 現在の行の残りを読み飛ばす
    pub fn skip_row(&mut self) -> Result<()> {
        if let Some(name) = self.open_row.take() {
            self.skip_buf.clear();
            self.reader.read_to_end_into(QName(&name), &mut self.skip_buf)?;
        }
        Ok(())
    }

    fn read_cell_text(&mut self) -> Result<Option<String>> {
        let mut text: Option<String> = None;
        let mut in_value = false;
        let mut phonetic_depth = 0usize;

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"v" | b"t" if phonetic_depth == 0 => {
                        in_value = true;
                        text.get_or_insert_with(String::new);
                    }
                    b"rPh" => phonetic_depth += 1,
                    _ => {}
                },
                Event::Empty(e) => {
                    if matches!(e.local_name().as_ref(), b"v" | b"t") && phonetic_depth == 0 {
                        text.get_or_insert_with(String::new);
                    }
                }
                Event::Text(e) if in_value => {
                    if let Some(t) = text.as_mut() {
                        t.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) if in_value => {
                    if let Some(t) = text.as_mut() {
                        t.push_str(std::str::from_utf8(&e.into_inner())?);
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"v" | b"t" => in_value = false,
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    b"c" => return Ok(text),
                    _ => {}
                },
                Event::Eof => {
                    return Err(XlsxStreamError::Xml(
                        "Unexpected end of worksheet inside a cell".to_string(),
                    ))
                }
                _ => {}
            }
        }
    }
}

/// `<row>`の`r`属性を読み取る
fn row_number(start: &BytesStart<'_>) -> Result<Option<u32>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == b"r" {
            return Ok(Some(parse_u32(&attr.value)?));
        }
    }
    Ok(None)
}

/// `<c>`の属性を読み取る
///
/// `r`属性がない場合は、同じ行の直前のセルの次の列とみなします。
fn cell_start(
    start: &BytesStart<'_>,
    has_body: bool,
    row: u32,
    previous_column: u32,
) -> Result<CellStart> {
    let mut cell = None;
    let mut cell_type = CellType::default();
    let mut style = None;

    for attr in start.attributes() {
        let attr = attr?;
        match attr.key.local_name().as_ref() {
            b"r" => {
                let parsed = CellRef::parse_bytes(&attr.value).ok_or_else(|| {
                    XlsxStreamError::Xml(format!(
                        "Invalid cell reference '{}'",
                        String::from_utf8_lossy(&attr.value)
                    ))
                })?;
                cell = Some(parsed);
            }
            b"t" => {
                cell_type = CellType::from_attribute(&attr.value);
                if cell_type == CellType::Other && &*attr.value != b"d" {
                    warn!(
                        "Unknown cell type '{}', treated as untyped",
                        String::from_utf8_lossy(&attr.value)
                    );
                }
            }
            b"s" => style = Some(parse_u32(&attr.value)?),
            _ => {}
        }
    }

    let cell = match cell {
        Some(cell) => cell,
        None => {
            let column = Column::from_index(previous_column + 1).ok_or_else(|| {
                XlsxStreamError::Xml(format!("Too many cells in row {}", row))
            })?;
            CellRef::new(column, row.max(1))
        }
    };

    Ok(CellStart {
        cell,
        cell_type,
        style,
        body: has_body.then(|| start.name().as_ref().to_vec()),
    })
}
