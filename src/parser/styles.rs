//! Styles Parser
//!
//! `xl/styles.xml`を解析し、カスタム数値書式とセル書式（cellXfs）を取得します。

use log::warn;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::parse_u32;
use crate::error::Result;

/// ワークブックで定義されたカスタム数値書式（`<numFmt>`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CustomFormat {
    /// 書式ID
    pub id: u32,
    /// Excelの書式文字列
    pub code: String,
}

/// スタイルインデックス（セルの`s`属性）から書式IDへの対応表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StyleTable {
    num_fmt_ids: Vec<u32>,
}

impl StyleTable {
    /// スタイルインデックスから書式IDを取得
    pub fn format_id(&self, style: u32) -> Option<u32> {
        self.num_fmt_ids.get(style as usize).copied()
    }

    /// 登録されているセル書式の数
    pub fn len(&self) -> usize {
        self.num_fmt_ids.len()
    }
}

/// `xl/styles.xml`を解析
///
/// # 引数
///
/// * `xml` - `xl/styles.xml`の内容
///
/// # 戻り値
///
/// * `Ok((Vec<CustomFormat>, StyleTable))` - カスタム書式（定義順）とセル書式の対応表
/// * `Err(XlsxStreamError)` - XMLまたは属性値が不正な場合
pub(crate) fn parse_styles(xml: &[u8]) -> Result<(Vec<CustomFormat>, StyleTable)> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut formats = Vec::new();
    let mut num_fmt_ids = Vec::new();
    let mut in_num_fmts = false;
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            // 空要素（<cellXfs/>）には終了イベントがないため、開始タグのみでフラグを立てる
            Event::Start(e) if e.local_name().as_ref() == b"numFmts" => in_num_fmts = true,
            Event::Start(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"numFmt" if in_num_fmts => {
                    // <numFmt numFmtId="165" formatCode="0.000"/>
                    let mut id = None;
                    let mut code = None;
                    for attr in e.attributes() {
                        let attr = attr?;
                        match attr.key.local_name().as_ref() {
                            b"numFmtId" => id = Some(parse_u32(&attr.value)?),
                            b"formatCode" => code = Some(attr.unescape_value()?.into_owned()),
                            _ => {}
                        }
                    }
                    match (id, code) {
                        (Some(id), Some(code)) => formats.push(CustomFormat { id, code }),
                        (Some(id), None) => warn!("numFmt {} has no formatCode, ignored", id),
                        _ => warn!("numFmt without numFmtId, ignored"),
                    }
                }
                b"xf" if in_cell_xfs => {
                    // <xf numFmtId="165" fontId="0" fillId="0" borderId="0"/>
                    let mut num_fmt_id = 0u32;
                    for attr in e.attributes() {
                        let attr = attr?;
                        if attr.key.local_name().as_ref() == b"numFmtId" {
                            num_fmt_id = parse_u32(&attr.value)?;
                        }
                    }
                    num_fmt_ids.push(num_fmt_id);
                }
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"numFmts" => in_num_fmts = false,
                b"cellXfs" => in_cell_xfs = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((formats, StyleTable { num_fmt_ids }))
}
