//! Workbook Parser
//!
//! `xl/workbook.xml`と`xl/_rels/workbook.xml.rels`を解析し、
//! シート名からワークシートのパートへの対応と日付システムを取得します。

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

use crate::error::{Result, XlsxStreamError};

/// ワークブック内のシート
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetEntry {
    /// シート名
    pub name: String,
    /// ZIPアーカイブ内のパート名（例: "xl/worksheets/sheet1.xml"）
    pub path: String,
}

/// ワークブックレベルの情報
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct WorkbookInfo {
    /// シート（ワークブック内の順序）
    pub sheets: Vec<SheetEntry>,
    /// 1904年エポックを使用するか
    pub is_1904: bool,
}

impl WorkbookInfo {
    /// ワークブックとリレーションシップのXMLから情報を構築
    ///
    /// # 引数
    ///
    /// * `workbook_xml` - `xl/workbook.xml`の内容
    /// * `rels_xml` - `xl/_rels/workbook.xml.rels`の内容
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookInfo)` - 解析成功
    /// * `Err(XlsxStreamError)` - XMLが不正な場合
    pub fn parse(workbook_xml: &[u8], rels_xml: &[u8]) -> Result<Self> {
        let relationships = parse_relationships(rels_xml)?;

        let mut reader = Reader::from_reader(workbook_xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut info = WorkbookInfo::default();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"workbookPr" => {
                        // <workbookPr date1904="true"/>
                        for attr in e.attributes() {
                            let attr = attr?;
                            if attr.key.local_name().as_ref() == b"date1904" {
                                let value = std::str::from_utf8(&attr.value)?;
                                info.is_1904 = value == "1" || value == "true";
                            }
                        }
                    }
                    b"sheet" => {
                        // <sheet name="Sheet1" sheetId="1" r:id="rId1"/>
                        let mut name = None;
                        let mut rel_id = None;
                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.local_name().as_ref() {
                                b"name" => name = Some(attr.unescape_value()?.into_owned()),
                                // r:id（sheetIdとは別）
                                b"id" => rel_id = Some(std::str::from_utf8(&attr.value)?.to_string()),
                                _ => {}
                            }
                        }
                        if let (Some(name), Some(rel_id)) = (name, rel_id) {
                            if let Some(target) = relationships.get(&rel_id) {
                                info.sheets.push(SheetEntry {
                                    name,
                                    path: resolve_target(target),
                                });
                            }
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(info)
    }

    /// シート名からワークシートのパート名を取得
    ///
    /// # 戻り値
    ///
    /// * `Ok(&str)` - パート名
    /// * `Err(XlsxStreamError::SheetNotFound)` - 指定された名前のシートが存在しない
    pub fn sheet_path(&self, name: &str) -> Result<&str> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.path.as_str())
            .ok_or_else(|| XlsxStreamError::SheetNotFound(name.to_string()))
    }

    /// シート名の一覧
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }
}

/// リレーションシップファイルを解析（Id -> Target）
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            // Event::Emptyは自己終了タグの場合に発生
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => id = Some(std::str::from_utf8(&attr.value)?.to_string()),
                        b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    relationships.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// リレーションシップのターゲットをZIP内のパート名に変換
///
/// 絶対パス（"/xl/worksheets/sheet1.xml"）は先頭の'/'を除き、
/// 相対パス（"worksheets/sheet1.xml"）は"xl/"からの相対として解決します。
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = vec!["xl"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKBOOK: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <workbookPr date1904="1"/>
  <sheets>
    <sheet name="Data" sheetId="1" r:id="rId1"/>
    <sheet name="R&amp;D" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    #[test]
    fn test_parse_workbook() {
        let info = WorkbookInfo::parse(WORKBOOK, RELS).unwrap();
        assert!(info.is_1904);
        assert_eq!(info.sheet_names(), vec!["Data", "R&D"]);
        assert_eq!(info.sheet_path("Data").unwrap(), "xl/worksheets/sheet1.xml");
        assert_eq!(info.sheet_path("R&D").unwrap(), "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn test_sheet_not_found() {
        let info = WorkbookInfo::parse(WORKBOOK, RELS).unwrap();
        let err = info.sheet_path("Missing").unwrap_err();
        assert!(matches!(err, XlsxStreamError::SheetNotFound(name) if name == "Missing"));
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("./worksheets/a.xml"), "xl/worksheets/a.xml");
        assert_eq!(resolve_target("../xl/worksheets/a.xml"), "xl/worksheets/a.xml");
    }
}
