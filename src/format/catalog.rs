//! FormatCatalog Module
//!
//! 書式ID（`numFmtId`）から描画用の書式へのマッピングを保持します。
//!
//! カタログは組み込み書式で初期化され、ワークブックのスタイル定義に含まれる
//! カスタム書式で拡張されます。セッション開始後は読み取り専用です。

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::datetime::{self, LONG_DATE_MARKER, LONG_TIME_MARKER};
use super::number::NumberFormat;
use super::sections::{first_section, trim_fill};
use crate::api::FormatKind;
use crate::error::{Result, XlsxStreamError};

/// テキスト書式を表すリテラル
const TEXT_FORMAT: &str = "@";

/// 組み込みの数値書式（Excel表記）
const BUILTIN_NUMBER: &[(u32, &str)] = &[
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (5, "$#,##0_);($#,##0)"),
    (6, "$#,##0_);[Red]($#,##0)"),
    (7, "$#,##0.00_);($#,##0.00)"),
    (8, "$#,##0.00_);[Red]($#,##0.00)"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (48, "##0.0E+0"),
];

/// 組み込みの日付書式（Excel表記）
const BUILTIN_DATE: &[(u32, &str)] = &[
    (14, "m/d/yyyy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (22, "m/d/yyyy h:mm"),
];

/// 組み込みの時刻書式（Excel表記）
const BUILTIN_TIME: &[(u32, &str)] = &[
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (45, "mm:ss"),
];

/// 組み込みのテキスト書式
const BUILTIN_TEXT: &[(u32, &str)] = &[(49, TEXT_FORMAT)];

/// 組み込み書式を描画用の語彙に変換して列挙
fn builtin_patterns() -> impl Iterator<Item = (u32, FormatKind, String)> {
    [
        (FormatKind::Number, BUILTIN_NUMBER),
        (FormatKind::Date, BUILTIN_DATE),
        (FormatKind::Time, BUILTIN_TIME),
        (FormatKind::Text, BUILTIN_TEXT),
    ]
    .into_iter()
    .flat_map(|(kind, table)| {
        table
            .iter()
            .map(move |&(id, code)| (id, kind, translate(kind, code)))
    })
}

/// カタログの1エントリ
///
/// `pattern`は描画用の語彙で保持されます。日付・時刻はstrftime形式、
/// 数値はExcel数値書式の正数セクションです。
#[derive(Debug, Clone, PartialEq)]
pub struct FormatEntry {
    id: u32,
    kind: FormatKind,
    pattern: String,
    number: Option<NumberFormat>,
}

impl FormatEntry {
    fn new(id: u32, kind: FormatKind, pattern: String) -> Result<Self> {
        let number = match kind {
            FormatKind::Number => Some(NumberFormat::parse(&pattern)),
            FormatKind::Date | FormatKind::Time => {
                if !datetime::is_valid_pattern(&pattern) {
                    return Err(XlsxStreamError::Config(format!(
                        "Invalid date/time pattern for format id {}: '{}'",
                        id, pattern
                    )));
                }
                None
            }
            FormatKind::Text => None,
        };
        Ok(Self {
            id,
            kind,
            pattern,
            number,
        })
    }

    /// 書式ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// 書式の種類
    pub fn kind(&self) -> FormatKind {
        self.kind
    }

    /// 描画用の書式文字列
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// 数値を描画（数値書式以外では`None`）
    pub(crate) fn render_number(&self, value: Decimal) -> Option<String> {
        self.number.as_ref().map(|n| n.format(value))
    }

    /// 日時を描画（日付・時刻書式以外では`None`）
    pub(crate) fn render_datetime(&self, value: &NaiveDateTime) -> Option<String> {
        match self.kind {
            FormatKind::Date | FormatKind::Time => datetime::render(&self.pattern, value),
            _ => None,
        }
    }
}

/// 書式カタログ
///
/// IDはカタログ全体で一意です。同じIDの二重登録は`DuplicateFormatId`になります。
///
/// # 使用例
///
/// ```rust
/// use xlsxstream::{FormatCatalog, FormatKind};
///
/// let mut catalog = FormatCatalog::new();
/// catalog.register(200, FormatKind::Date, "%Y/%m/%d").unwrap();
/// assert_eq!(catalog.lookup(200), Some("%Y/%m/%d"));
/// assert!(catalog.register(200, FormatKind::Number, "0").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FormatCatalog {
    entries: HashMap<u32, FormatEntry>,
}

impl FormatCatalog {
    /// 組み込み書式で初期化されたカタログを生成
    pub fn new() -> Self {
        let mut catalog = Self::empty();
        for (id, kind, pattern) in builtin_patterns() {
            match FormatEntry::new(id, kind, pattern) {
                Ok(entry) => {
                    catalog.entries.insert(id, entry);
                }
                Err(e) => debug_assert!(false, "built-in format {} is invalid: {}", id, e),
            }
        }
        catalog
    }

    /// 空のカタログを生成
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// 書式を登録
    ///
    /// # 引数
    ///
    /// * `id` - 書式ID
    /// * `kind` - 登録先のサブカタログ
    /// * `pattern` - 描画用の書式（日付・時刻はstrftime形式）
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - 登録成功
    /// * `Err(XlsxStreamError::DuplicateFormatId)` - 同じIDが既に登録されている
    /// * `Err(XlsxStreamError::Config)` - 日付・時刻書式が解釈できない
    pub fn register(&mut self, id: u32, kind: FormatKind, pattern: &str) -> Result<()> {
        if self.entries.contains_key(&id) {
            return Err(XlsxStreamError::DuplicateFormatId(id));
        }
        let entry = FormatEntry::new(id, kind, pattern.to_string())?;
        self.entries.insert(id, entry);
        Ok(())
    }

    /// 書式を登録（既存のエントリを置き換える）
    ///
    /// ビルダーで指定された上書き設定を組み込み書式に適用するために使用します。
    pub(crate) fn replace(&mut self, id: u32, kind: FormatKind, pattern: &str) -> Result<()> {
        let entry = FormatEntry::new(id, kind, pattern.to_string())?;
        self.entries.insert(id, entry);
        Ok(())
    }

    /// ワークブックのカスタム書式（Excel表記）を分類して登録
    ///
    /// # 引数
    ///
    /// * `id` - 書式ID
    /// * `code` - Excelの書式文字列
    /// * `detect_datetime` - マーカーのない日付・時刻書式を検出するか
    ///
    /// # 戻り値
    ///
    /// 登録先のサブカタログ
    pub fn register_custom(
        &mut self,
        id: u32,
        code: &str,
        detect_datetime: bool,
    ) -> Result<FormatKind> {
        let kind = classify_code(code, detect_datetime);
        let pattern = translate(kind, code);
        self.register(id, kind, &pattern)?;
        Ok(kind)
    }

    /// 書式IDから書式文字列を検索
    pub fn lookup(&self, id: u32) -> Option<&str> {
        self.entries.get(&id).map(|e| e.pattern.as_str())
    }

    /// 書式IDからエントリを検索
    pub fn entry(&self, id: u32) -> Option<&FormatEntry> {
        self.entries.get(&id)
    }

    /// 書式IDが指定されたサブカタログに登録されているか
    pub fn contains(&self, kind: FormatKind, id: u32) -> bool {
        self.entries.get(&id).is_some_and(|e| e.kind == kind)
    }

    /// 登録されている書式の数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// カタログが空かどうか
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Excelの書式文字列から登録先のサブカタログを決定
fn classify_code(code: &str, detect_datetime: bool) -> FormatKind {
    if code == TEXT_FORMAT {
        return FormatKind::Text;
    }
    if code.starts_with(LONG_DATE_MARKER) {
        return FormatKind::Date;
    }
    if code.starts_with(LONG_TIME_MARKER) {
        return FormatKind::Time;
    }
    if detect_datetime {
        if let Some(kind) = datetime::detect_kind(code) {
            return kind;
        }
    }
    FormatKind::Number
}

/// Excelの書式文字列を描画用の語彙に変換
fn translate(kind: FormatKind, code: &str) -> String {
    match kind {
        FormatKind::Text => code.to_string(),
        FormatKind::Date if code.starts_with(LONG_DATE_MARKER) => {
            datetime::translate_long_date(code)
        }
        FormatKind::Time if code.starts_with(LONG_TIME_MARKER) => {
            datetime::translate_long_time(code)
        }
        FormatKind::Date | FormatKind::Time => datetime::to_strftime(code),
        FormatKind::Number => {
            let section = first_section(code);
            if section.len() < code.len() {
                trim_fill(section).to_string()
            } else {
                code.to_string()
            }
        }
    }
}
