//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。
//! 列・セル参照・範囲はすべて1始まりのExcel座標で保持します。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::api::ValueKind;
use crate::error::{Result, XlsxStreamError};

/// ワークシートの列（1始まり、A=1, Z=26, AA=27, ..., XFD=16384）
///
/// 順序は列インデックスの大小で決まるため、"J" < "AA" が成り立ちます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column(u32);

impl Column {
    /// Excelの最大列数（XFD）
    pub const MAX: u32 = 16_384;

    /// 列インデックス（1始まり）から列を生成
    ///
    /// 0または`Column::MAX`を超える場合は`None`を返します。
    pub fn from_index(index: u32) -> Option<Self> {
        (1..=Self::MAX).contains(&index).then_some(Column(index))
    }

    /// 列インデックス（1始まり）
    pub fn index(self) -> u32 {
        self.0
    }

    /// 次の列（例: "Z" -> "AA", "AZ" -> "BA"）
    ///
    /// 最大列（XFD）の次は`None`です。
    pub fn next_column(self) -> Option<Self> {
        Self::from_index(self.0 + 1)
    }

    /// 列名の英字部分を列インデックスに変換（大文字小文字を区別しない）
    fn parse_letters(letters: &[u8]) -> Option<u32> {
        if letters.is_empty() {
            return None;
        }
        let mut index: u32 = 0;
        for &b in letters {
            let digit = match b {
                b'A'..=b'Z' => b - b'A' + 1,
                b'a'..=b'z' => b - b'a' + 1,
                _ => return None,
            };
            index = index.checked_mul(26)?.checked_add(digit as u32)?;
            if index > Self::MAX {
                return None;
            }
        }
        Some(index)
    }
}

impl FromStr for Column {
    type Err = XlsxStreamError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_letters(s.as_bytes())
            .map(Column)
            .ok_or_else(|| XlsxStreamError::InvalidColumn(s.to_string()))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 列インデックスを文字列に変換（1 -> "A", 26 -> "Z", 27 -> "AA"）
        let mut letters = [0u8; 3];
        let mut pos = letters.len();
        let mut n = self.0;
        while n > 0 {
            let rem = (n - 1) % 26;
            pos -= 1;
            letters[pos] = b'A' + rem as u8;
            n = (n - 1) / 26;
        }
        // 英大文字のみなのでUTF-8として常に有効
        f.write_str(std::str::from_utf8(&letters[pos..]).map_err(|_| fmt::Error)?)
    }
}

impl Serialize for Column {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 列名を受け取り、次の列名を返す（例: "AB" -> "AC", "Z" -> "AA"）
///
/// # 戻り値
///
/// * `Ok(String)` - 次の列名（大文字）
/// * `Err(XlsxStreamError::InvalidColumn)` - 列名が不正、または最大列の次を要求した場合
pub fn next_column(column: &str) -> Result<String> {
    let col: Column = column.parse()?;
    col.next_column()
        .map(|c| c.to_string())
        .ok_or_else(|| XlsxStreamError::InvalidColumn(format!("{} has no successor", column)))
}

/// セル参照（例: "AB123" -> 列AB, 行123）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    /// 列
    pub column: Column,
    /// 行番号（1始まり）
    pub row: u32,
}

impl CellRef {
    /// Excelの最大行数
    pub const MAX_ROW: u32 = 1_048_576;

    /// 新しいセル参照を生成
    pub fn new(column: Column, row: u32) -> Self {
        Self { column, row }
    }

    /// `r`属性のバイト列からセル参照を解析（例: b"B7"）
    pub(crate) fn parse_bytes(bytes: &[u8]) -> Option<Self> {
        let split = bytes.iter().position(|b| b.is_ascii_digit())?;
        let (letters, digits) = bytes.split_at(split);
        let column = Column::parse_letters(letters)?;
        let row = parse_row(digits)?;
        Some(Self {
            column: Column(column),
            row,
        })
    }
}

/// 行番号（1以上）を解析
fn parse_row(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let row: u32 = std::str::from_utf8(digits).ok()?.parse().ok()?;
    (1..=CellRef::MAX_ROW).contains(&row).then_some(row)
}

impl FromStr for CellRef {
    type Err = XlsxStreamError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_bytes(s.as_bytes()).ok_or_else(|| XlsxStreamError::InvalidCellRef(s.to_string()))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column, self.row)
    }
}

impl Serialize for CellRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

static RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]+)([0-9]*):([A-Za-z]+)([0-9]*)$").expect("range pattern is valid")
});

/// セル範囲（例: "A10:C99"）
///
/// 不変条件: `from.column <= to.column`
///
/// 範囲の判定は読み取り順序に従います。最初の列では`from.row`以降、
/// 最後の列では`to.row`以前のセルが対象となり、中間の列には行の制限がありません。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    /// 開始セル
    pub from: CellRef,
    /// 終了セル
    pub to: CellRef,
}

impl CellRange {
    /// 新しい範囲を生成
    ///
    /// 開始列が終了列より右にある場合は`InvalidRange`を返します。
    pub fn new(from: CellRef, to: CellRef) -> Result<Self> {
        if from.column > to.column {
            return Err(XlsxStreamError::InvalidRange(format!("{}:{}", from, to)));
        }
        Ok(Self { from, to })
    }

    /// 指定されたセルが範囲内にあるかを判定
    pub fn contains(&self, cell: &CellRef) -> bool {
        if cell.column < self.from.column || cell.column > self.to.column {
            return false;
        }
        if cell.column == self.from.column && cell.row < self.from.row {
            return false;
        }
        if cell.column == self.to.column && cell.row > self.to.row {
            return false;
        }
        true
    }
}

impl FromStr for CellRange {
    type Err = XlsxStreamError;

    /// 範囲式を解析
    ///
    /// 行番号を省略した場合（例: "A:C"）は、開始行が1、終了行が最大行となります。
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || XlsxStreamError::InvalidRange(s.to_string());
        let caps = RANGE_PATTERN.captures(s).ok_or_else(invalid)?;

        let from_col: Column = caps[1].parse().map_err(|_| invalid())?;
        let to_col: Column = caps[3].parse().map_err(|_| invalid())?;
        let from_row = match &caps[2] {
            "" => 1,
            digits => parse_row(digits.as_bytes()).ok_or_else(invalid)?,
        };
        let to_row = match &caps[4] {
            "" => CellRef::MAX_ROW,
            digits => parse_row(digits.as_bytes()).ok_or_else(invalid)?,
        };

        Self::new(CellRef::new(from_col, from_row), CellRef::new(to_col, to_row))
            .map_err(|_| invalid())
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.from, self.to)
    }
}

/// セルの`t`属性で宣言された型
///
/// `t`属性が省略された場合、OOXMLの既定値である数値（"n"）になります。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum CellType {
    /// 共有文字列（"s"）
    SharedString,
    /// 数値（"n"、または省略）
    #[default]
    Number,
    /// インライン文字列（"inlineStr"）
    InlineString,
    /// 数式の文字列結果（"str"）
    FormulaString,
    /// 論理値（"b"）
    Boolean,
    /// エラー値（"e"）
    Error,
    /// その他（"d"など）
    Other,
}

impl CellType {
    /// `t`属性の値から型を判定
    pub fn from_attribute(value: &[u8]) -> Self {
        match value {
            b"s" => CellType::SharedString,
            b"n" => CellType::Number,
            b"inlineStr" => CellType::InlineString,
            b"str" => CellType::FormulaString,
            b"b" => CellType::Boolean,
            b"e" => CellType::Error,
            _ => CellType::Other,
        }
    }

    /// 数値として解釈できる型かどうか
    pub fn is_numeric(self) -> bool {
        matches!(self, CellType::Number)
    }
}

/// ワークシートから読み込んだ生のセル
///
/// スキャナーが1セルずつ所有し、pullをまたいで保持されることはありません。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawCell {
    /// セル参照
    pub cell: CellRef,
    /// 宣言された型
    pub cell_type: CellType,
    /// スタイルインデックス（`s`属性）
    pub style: Option<u32>,
    /// 値のテキスト（`<v>`または`<is>`の内容）
    pub text: Option<String>,
}

impl RawCell {
    /// 値のテキストが空でない場合にそれを返す
    pub fn value(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// 解決済みのセル値
///
/// ランデブー境界を越えてカーソルに渡される出力単位です。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedValue {
    /// 値の種類
    pub kind: ValueKind,
    /// 書式適用後の表示文字列
    pub text: String,
    /// 適用した書式（テキスト値や書式なしの数値では空文字列）
    pub format: String,
    /// セル参照
    pub cell: CellRef,
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(s: &str) -> Column {
        s.parse().unwrap()
    }

    #[test]
    fn test_column_round_trip() {
        assert_eq!(col("A").index(), 1);
        assert_eq!(col("Z").index(), 26);
        assert_eq!(col("AA").index(), 27);
        assert_eq!(col("XFD").index(), 16_384);
        assert_eq!(col("ab").to_string(), "AB");
        assert_eq!(Column::from_index(703).unwrap().to_string(), "AAA");
    }

    #[test]
    fn test_column_rejects_invalid_names() {
        assert!("".parse::<Column>().is_err());
        assert!("A1".parse::<Column>().is_err());
        assert!("A-B".parse::<Column>().is_err());
        assert!("XFE".parse::<Column>().is_err());
        assert!("Ä".parse::<Column>().is_err());
    }

    #[test]
    fn test_next_column() {
        assert_eq!(next_column("A").unwrap(), "B");
        assert_eq!(next_column("Z").unwrap(), "AA");
        assert_eq!(next_column("AZ").unwrap(), "BA");
        assert_eq!(next_column("AAZ").unwrap(), "ABA");
        assert_eq!(next_column("ZZ").unwrap(), "AAA");
        assert!(next_column("XFD").is_err());
        assert!(next_column("1").is_err());
    }

    #[test]
    fn test_next_column_26_times_from_a() {
        let mut c = "A".to_string();
        for _ in 0..26 {
            c = next_column(&c).unwrap();
        }
        assert_eq!(c, "AA");
    }

    #[test]
    fn test_column_ordering_is_positional() {
        assert!(col("J") < col("AA"));
        assert!(col("Z") < col("AA"));
        assert!(col("AZ") < col("BA"));
        assert!(col("B") > col("A"));
    }

    #[test]
    fn test_cell_ref_parse() {
        let r: CellRef = "AB123".parse().unwrap();
        assert_eq!(r.column.to_string(), "AB");
        assert_eq!(r.row, 123);
        assert_eq!(r.to_string(), "AB123");

        assert!("A0".parse::<CellRef>().is_err());
        assert!("A1048577".parse::<CellRef>().is_err());
        assert!("123".parse::<CellRef>().is_err());
        assert!("A".parse::<CellRef>().is_err());
        assert!("A1B".parse::<CellRef>().is_err());
    }

    #[test]
    fn test_range_parse() {
        let range: CellRange = "A10:C99".parse().unwrap();
        assert_eq!(range.from.to_string(), "A10");
        assert_eq!(range.to.to_string(), "C99");

        let whole: CellRange = "b:d".parse().unwrap();
        assert_eq!(whole.from.row, 1);
        assert_eq!(whole.to.row, CellRef::MAX_ROW);

        assert!("A1".parse::<CellRange>().is_err());
        assert!("A1:".parse::<CellRange>().is_err());
        assert!("1:2".parse::<CellRange>().is_err());
        assert!("C1:A5".parse::<CellRange>().is_err());
        assert!("A1 :B2".parse::<CellRange>().is_err());
    }

    #[test]
    fn test_range_contains() {
        let range: CellRange = "B2:C3".parse().unwrap();
        let inside = ["B2", "B3", "C2", "C3"];
        let outside = ["A1", "B1", "D1", "C4"];
        for r in inside {
            assert!(range.contains(&r.parse().unwrap()), "{} should be in range", r);
        }
        for r in outside {
            assert!(!range.contains(&r.parse().unwrap()), "{} should be out of range", r);
        }

        // 中間の列は行で制限されない
        let wide: CellRange = "A10:C99".parse().unwrap();
        assert!(wide.contains(&"B1".parse().unwrap()));
        assert!(wide.contains(&"B5000".parse().unwrap()));
        assert!(wide.contains(&"A5000".parse().unwrap()));
        assert!(!wide.contains(&"C100".parse().unwrap()));
    }

    #[test]
    fn test_range_contains_past_z() {
        let range: CellRange = "Y1:AB10".parse().unwrap();
        assert!(range.contains(&"Z5".parse().unwrap()));
        assert!(range.contains(&"AA5".parse().unwrap()));
        assert!(!range.contains(&"J5".parse().unwrap()));
        assert!(!range.contains(&"AC5".parse().unwrap()));
    }

    #[test]
    fn test_cell_type_from_attribute() {
        assert_eq!(CellType::from_attribute(b"s"), CellType::SharedString);
        assert_eq!(CellType::from_attribute(b"n"), CellType::Number);
        assert_eq!(CellType::from_attribute(b"inlineStr"), CellType::InlineString);
        assert_eq!(CellType::from_attribute(b"d"), CellType::Other);
        assert_eq!(CellType::default(), CellType::Number);
    }

    #[test]
    fn test_raw_cell_value_ignores_empty_text() {
        let cell = RawCell {
            cell: "A1".parse().unwrap(),
            cell_type: CellType::Number,
            style: None,
            text: Some(String::new()),
        };
        assert_eq!(cell.value(), None);
    }

    // プロパティベーステスト
    #[allow(unused_doc_comments)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_column_letters_round_trip(index in 1u32..=Column::MAX) {
                let column = Column::from_index(index).unwrap();
                let letters = column.to_string();
                prop_assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
                prop_assert_eq!(letters.parse::<Column>().unwrap(), column);
            }

            #[test]
            fn test_next_column_is_successor(index in 1u32..Column::MAX) {
                let column = Column::from_index(index).unwrap();
                let next = next_column(&column.to_string()).unwrap();
                prop_assert_eq!(next.parse::<Column>().unwrap().index(), index + 1);
            }

            #[test]
            fn test_ordering_matches_index(a in 1u32..=Column::MAX, b in 1u32..=Column::MAX) {
                let ca = Column::from_index(a).unwrap();
                let cb = Column::from_index(b).unwrap();
                prop_assert_eq!(ca.cmp(&cb), a.cmp(&b));
            }
        }
    }
}
