//! Cell Classifier Module
//!
//! 生のセル（型・スタイル・テキスト）から値の種類を決定し、表示文字列を生成します。
//!
//! 分類は固定の優先順位で行われます:
//!
//! 1. テキスト（共有文字列・インライン文字列・数式の文字列結果）
//! 2. 時刻（時刻書式カタログに登録されたスタイル）
//! 3. 日付（日付書式カタログに登録されたスタイル）
//! 4. 数値
//!
//! どの規則にも一致しないセルは、[`UnknownCellPolicy`]に従って除外または出力されます。

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::api::{FormatKind, UnknownCellPolicy, ValueKind};
use crate::error::{Result, XlsxStreamError};
use crate::format::datetime::serial_to_datetime;
use crate::format::{FormatCatalog, FormatEntry};
use crate::parser::{SharedStringTable, StyleTable};
use crate::types::{CellType, RawCell, ResolvedValue};

/// 分類規則（評価順）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Text,
    Time,
    Date,
    Number,
}

const RULES: [Rule; 4] = [Rule::Text, Rule::Time, Rule::Date, Rule::Number];

/// セッション単位の分類コンテキスト
///
/// 書式カタログ・共有文字列テーブル・スタイル表を保持します。
/// セッション開始時に一度だけ構築され、以降は読み取り専用のため、
/// スキャナースレッド間で`Arc`により共有されます。
#[derive(Debug)]
pub(crate) struct CellClassifier {
    catalog: FormatCatalog,
    strings: SharedStringTable,
    styles: StyleTable,
    is_1904: bool,
    policy: UnknownCellPolicy,
}

impl CellClassifier {
    /// 新しい分類コンテキストを生成
    pub fn new(
        catalog: FormatCatalog,
        strings: SharedStringTable,
        styles: StyleTable,
        is_1904: bool,
        policy: UnknownCellPolicy,
    ) -> Self {
        Self {
            catalog,
            strings,
            styles,
            is_1904,
            policy,
        }
    }

    /// セルを分類して値を解決
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(ResolvedValue))` - 値が解決された
    /// * `Ok(None)` - どの規則にも一致せず、ストリームから除外する
    /// * `Err(XlsxStreamError)` - 宣言された型と値が矛盾する（データ整合性エラー）
    pub fn classify(&self, cell: &RawCell) -> Result<Option<ResolvedValue>> {
        for rule in RULES {
            let resolved = match rule {
                Rule::Text => self.resolve_text(cell)?,
                Rule::Time => self.resolve_datetime(cell, FormatKind::Time),
                Rule::Date => self.resolve_datetime(cell, FormatKind::Date),
                Rule::Number => self.resolve_number(cell)?,
            };
            if resolved.is_some() {
                return Ok(resolved);
            }
        }

        Ok(match self.policy {
            UnknownCellPolicy::Skip => None,
            UnknownCellPolicy::Surface => cell.text.as_ref().map(|text| ResolvedValue {
                kind: ValueKind::Unknown,
                text: text.clone(),
                format: String::new(),
                cell: cell.cell,
            }),
        })
    }

    /// セルのスタイルから、指定されたサブカタログの書式を取得
    fn format_entry(&self, cell: &RawCell, kind: FormatKind) -> Option<&FormatEntry> {
        let id = self.styles.format_id(cell.style?)?;
        self.catalog
            .entry(id)
            .filter(|entry| entry.kind() == kind)
    }

    fn resolve_text(&self, cell: &RawCell) -> Result<Option<ResolvedValue>> {
        let text = match cell.cell_type {
            CellType::SharedString => {
                let Some(raw) = cell.value() else {
                    return Ok(None);
                };
                let index: usize = raw.trim().parse().map_err(|_| {
                    XlsxStreamError::MalformedSharedStringIndex {
                        cell: cell.cell.to_string(),
                        text: raw.to_string(),
                    }
                })?;
                self.strings
                    .get(index)
                    .ok_or_else(|| XlsxStreamError::MissingSharedString {
                        index,
                        cell: cell.cell.to_string(),
                    })?
                    .to_string()
            }
            CellType::InlineString | CellType::FormulaString => match &cell.text {
                Some(text) => text.clone(),
                None => return Ok(None),
            },
            _ => return Ok(None),
        };

        Ok(Some(ResolvedValue {
            kind: ValueKind::Text,
            text,
            format: String::new(),
            cell: cell.cell,
        }))
    }

    /// 日付・時刻の規則
    ///
    /// 値をシリアル値として解析できない場合はエラーにせず、次の規則に委ねます。
    fn resolve_datetime(&self, cell: &RawCell, kind: FormatKind) -> Option<ResolvedValue> {
        if !cell.cell_type.is_numeric() {
            return None;
        }
        let entry = self.format_entry(cell, kind)?;
        let serial: f64 = cell.value()?.trim().parse().ok()?;
        let datetime = serial_to_datetime(serial, self.is_1904)?;
        let text = entry.render_datetime(&datetime)?;

        Some(ResolvedValue {
            kind: if kind == FormatKind::Time {
                ValueKind::Time
            } else {
                ValueKind::Date
            },
            text,
            format: entry.pattern().to_string(),
            cell: cell.cell,
        })
    }

    /// 数値の規則
    ///
    /// 数値型として宣言されたセル、または数値書式のスタイルを持つセルが対象です。
    /// 数値型として宣言されているのに10進数として解析できない場合はエラーです。
    fn resolve_number(&self, cell: &RawCell) -> Result<Option<ResolvedValue>> {
        let entry = self.format_entry(cell, FormatKind::Number);
        let declared = cell.cell_type.is_numeric();
        let styled = entry.is_some()
            && !matches!(cell.cell_type, CellType::Boolean | CellType::Error);
        if !declared && !styled {
            return Ok(None);
        }
        let Some(raw) = cell.value() else {
            return Ok(None);
        };

        let value = match parse_number(raw) {
            Some(ParsedNumber::Decimal(value)) => value,
            // 10進数の範囲外の値は書式を適用せずに出力
            Some(ParsedNumber::Float(value)) => {
                return Ok(Some(ResolvedValue {
                    kind: ValueKind::Number,
                    text: value.to_string(),
                    format: String::new(),
                    cell: cell.cell,
                }))
            }
            None if declared => {
                return Err(XlsxStreamError::NumberFormatParse {
                    cell: cell.cell.to_string(),
                    text: raw.to_string(),
                })
            }
            None => return Ok(None),
        };

        let (text, format) = match entry.and_then(|e| Some((e.render_number(value)?, e))) {
            Some((text, entry)) => (text, entry.pattern().to_string()),
            None => (value.to_string(), String::new()),
        };

        Ok(Some(ResolvedValue {
            kind: ValueKind::Number,
            text,
            format,
            cell: cell.cell,
        }))
    }
}

/// 数値セルの値
#[derive(Debug, Clone, Copy, PartialEq)]
enum ParsedNumber {
    Decimal(Decimal),
    /// `Decimal`の最大値を超える値
    Float(f64),
}

/// 数値を解析（小数点はピリオド、指数表記可）
///
/// 小数点以下28桁より小さい部分は丸められます（例: `1E-30`は0）。
fn parse_number(raw: &str) -> Option<ParsedNumber> {
    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if unsigned.is_empty() {
        return None;
    }
    if let Ok(value) = Decimal::from_str(unsigned).or_else(|_| Decimal::from_scientific(unsigned)) {
        return Some(ParsedNumber::Decimal(value));
    }

    let float: f64 = unsigned.parse().ok().filter(|v: &f64| v.is_finite())?;
    if float.abs() < 1e-28 {
        return Some(ParsedNumber::Decimal(Decimal::ZERO));
    }
    Some(match Decimal::from_f64(float) {
        Some(value) => ParsedNumber::Decimal(value.round_dp(28)),
        None => ParsedNumber::Float(float),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_styles;
    use crate::types::CellRef;

    const STYLES: &[u8] = br##"<styleSheet>
  <numFmts count="3">
    <numFmt numFmtId="164" formatCode="[$-F800]dd mmmm\,\ yyyy"/>
    <numFmt numFmtId="165" formatCode="[$-F400]h:mm:ss\ AM/PM"/>
    <numFmt numFmtId="166" formatCode="#,##0;(#,##0)"/>
  </numFmts>
  <cellXfs count="5">
    <xf numFmtId="0"/>
    <xf numFmtId="164"/>
    <xf numFmtId="165"/>
    <xf numFmtId="166"/>
    <xf numFmtId="4"/>
  </cellXfs>
</styleSheet>"##;

    const STRINGS: &[u8] = br#"<sst><si><t>alpha</t></si><si><t>beta</t></si></sst>"#;

    fn classifier(policy: UnknownCellPolicy) -> CellClassifier {
        let (formats, styles) = parse_styles(STYLES).unwrap();
        let mut catalog = FormatCatalog::new();
        for f in formats {
            catalog.register_custom(f.id, &f.code, false).unwrap();
        }
        let strings = SharedStringTable::parse(STRINGS).unwrap();
        CellClassifier::new(catalog, strings, styles, false, policy)
    }

    fn raw(cell: &str, cell_type: CellType, style: Option<u32>, text: Option<&str>) -> RawCell {
        RawCell {
            cell: cell.parse::<CellRef>().unwrap(),
            cell_type,
            style,
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn test_shared_string_is_text_with_empty_format() {
        let c = classifier(UnknownCellPolicy::Skip);
        let value = c
            .classify(&raw("A1", CellType::SharedString, Some(3), Some("1")))
            .unwrap()
            .unwrap();
        assert_eq!(value.kind, ValueKind::Text);
        assert_eq!(value.text, "beta");
        assert_eq!(value.format, "");
        assert_eq!(value.cell.to_string(), "A1");
    }

    #[test]
    fn test_missing_shared_string_is_error() {
        let c = classifier(UnknownCellPolicy::Skip);
        let err = c
            .classify(&raw("B2", CellType::SharedString, None, Some("7")))
            .unwrap_err();
        assert!(matches!(
            err,
            XlsxStreamError::MissingSharedString { index: 7, ref cell } if cell == "B2"
        ));

        let err = c
            .classify(&raw("B3", CellType::SharedString, None, Some("x")))
            .unwrap_err();
        assert!(matches!(err, XlsxStreamError::MalformedSharedStringIndex { .. }));
    }

    #[test]
    fn test_inline_and_formula_strings() {
        let c = classifier(UnknownCellPolicy::Skip);
        let value = c
            .classify(&raw("A1", CellType::InlineString, None, Some("inline")))
            .unwrap()
            .unwrap();
        assert_eq!((value.kind, value.text.as_str()), (ValueKind::Text, "inline"));

        let value = c
            .classify(&raw("A2", CellType::FormulaString, Some(4), Some("ab")))
            .unwrap()
            .unwrap();
        assert_eq!((value.kind, value.text.as_str()), (ValueKind::Text, "ab"));
    }

    #[test]
    fn test_long_date_format() {
        let c = classifier(UnknownCellPolicy::Skip);
        // 45356 = 2024-03-05
        let value = c
            .classify(&raw("A1", CellType::Number, Some(1), Some("45356")))
            .unwrap()
            .unwrap();
        assert_eq!(value.kind, ValueKind::Date);
        assert_eq!(value.text, "05 March, 2024");
        assert_eq!(value.format, "%d %B, %Y");
    }

    #[test]
    fn test_time_format() {
        let c = classifier(UnknownCellPolicy::Skip);
        let value = c
            .classify(&raw("A1", CellType::Number, Some(2), Some("0.75")))
            .unwrap()
            .unwrap();
        assert_eq!(value.kind, ValueKind::Time);
        // AM/PMはロケール部分とともに破棄されるため24時間表記
        assert_eq!(value.text, "18:00:00");
        assert_eq!(value.format, "%-H:%M:%S");
    }

    #[test]
    fn test_number_with_and_without_format() {
        let c = classifier(UnknownCellPolicy::Skip);
        let value = c
            .classify(&raw("A1", CellType::Number, Some(3), Some("1234567")))
            .unwrap()
            .unwrap();
        assert_eq!(value.kind, ValueKind::Number);
        assert_eq!(value.text, "1,234,567");
        assert_eq!(value.format, "#,##0");

        let value = c
            .classify(&raw("A2", CellType::Number, Some(0), Some("0.1")))
            .unwrap()
            .unwrap();
        assert_eq!(value.text, "0.1");
        assert_eq!(value.format, "");

        let value = c
            .classify(&raw("A3", CellType::Number, None, Some("1.5E-3")))
            .unwrap()
            .unwrap();
        assert_eq!(value.text, "0.0015");
    }

    #[test]
    fn test_unparsable_number_is_error() {
        let c = classifier(UnknownCellPolicy::Skip);
        let err = c
            .classify(&raw("C4", CellType::Number, None, Some("12,5")))
            .unwrap_err();
        assert!(matches!(err, XlsxStreamError::NumberFormatParse { .. }));
    }

    #[test]
    fn test_unparsable_date_falls_through_to_number() {
        let c = classifier(UnknownCellPolicy::Skip);
        // 日付として解析できない値は数値の規則に委ねられ、数値としても不正なためエラー
        let err = c
            .classify(&raw("A1", CellType::Number, Some(1), Some("abc")))
            .unwrap_err();
        assert!(matches!(err, XlsxStreamError::NumberFormatParse { .. }));
    }

    #[test]
    fn test_unmatched_cells_follow_policy() {
        let boolean = raw("A1", CellType::Boolean, None, Some("1"));
        let empty = raw("A2", CellType::Number, Some(3), None);

        let skip = classifier(UnknownCellPolicy::Skip);
        assert_eq!(skip.classify(&boolean).unwrap(), None);
        assert_eq!(skip.classify(&empty).unwrap(), None);

        let surface = classifier(UnknownCellPolicy::Surface);
        let value = surface.classify(&boolean).unwrap().unwrap();
        assert_eq!(value.kind, ValueKind::Unknown);
        assert_eq!(value.text, "1");
        assert_eq!(surface.classify(&empty).unwrap(), None);
    }

    #[test]
    fn test_boolean_with_number_style_is_not_number() {
        let c = classifier(UnknownCellPolicy::Skip);
        assert_eq!(
            c.classify(&raw("A1", CellType::Boolean, Some(4), Some("1")))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_1904_epoch() {
        let (formats, styles) = parse_styles(STYLES).unwrap();
        let mut catalog = FormatCatalog::new();
        for f in formats {
            catalog.register_custom(f.id, &f.code, false).unwrap();
        }
        let c = CellClassifier::new(
            catalog,
            SharedStringTable::default(),
            styles,
            true,
            UnknownCellPolicy::Skip,
        );
        // 1904年エポックでは 0 = 1904-01-01
        let value = c
            .classify(&raw("A1", CellType::Number, Some(1), Some("0")))
            .unwrap()
            .unwrap();
        assert_eq!(value.text, "01 January, 1904");
    }

    fn decimal(raw: &str) -> String {
        match parse_number(raw) {
            Some(ParsedNumber::Decimal(value)) => value.to_string(),
            other => panic!("{} parsed as {:?}", raw, other),
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(decimal("+3"), "3");
        assert_eq!(decimal(" -2.50 "), "-2.50");
        assert!(parse_number("").is_none());
        assert!(parse_number("1,5").is_none());
        assert!(parse_number("NaN").is_none());
        assert!(parse_number("inf").is_none());
    }

    #[test]
    fn test_parse_number_outside_decimal_range() {
        assert!(decimal("1E-30").parse::<Decimal>().unwrap().is_zero());
        assert!(decimal("-4.9E-324").parse::<Decimal>().unwrap().is_zero());
        assert!(decimal("1.1102230246251565E-16").starts_with("0.000000000000000111022302462"));
        assert_eq!(parse_number("1.23E+30"), Some(ParsedNumber::Float(1.23e30)));
    }

    #[test]
    fn test_extreme_numbers_are_not_errors() {
        let c = classifier(UnknownCellPolicy::Skip);

        let tiny = c
            .classify(&raw("A1", CellType::Number, Some(3), Some("1E-30")))
            .unwrap()
            .unwrap();
        assert_eq!((tiny.text.as_str(), tiny.format.as_str()), ("0", "#,##0"));

        let huge = c
            .classify(&raw("A2", CellType::Number, Some(3), Some("1.23E+30")))
            .unwrap()
            .unwrap();
        assert_eq!(huge.kind, ValueKind::Number);
        assert_eq!(huge.text, "1230000000000000000000000000000");
        assert_eq!(huge.format, "");

        let small = c
            .classify(&raw("A3", CellType::Number, None, Some("1.1102230246251565E-16")))
            .unwrap()
            .unwrap();
        assert!(small.text.starts_with("0.000000000000000111022302462"));
    }
}
