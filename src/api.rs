//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::types::{CellRange, Column};

/// 解決済みセル値の種類
///
/// 分類は固定の優先順位（テキスト → 時刻 → 日付 → 数値）で行われます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ValueKind {
    /// 共有文字列・インライン文字列・数式の文字列結果
    Text,
    /// 日付（日付書式カタログに登録されたスタイル）
    Date,
    /// 時刻（時刻書式カタログに登録されたスタイル）
    Time,
    /// 数値（10進数として厳密に解析）
    Number,
    /// どの規則にも一致しなかったセル
    ///
    /// `UnknownCellPolicy::Surface`の場合のみ出力されます。
    Unknown,
}

/// 書式カタログ内のサブカタログ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// テキスト書式（"@"）
    Text,
    /// 日付書式（strftime形式で保持）
    Date,
    /// 時刻書式（strftime形式で保持）
    Time,
    /// 数値書式（Excel Number Format Stringの正数セクション）
    Number,
}

/// どの分類規則にも一致しないセルの扱い
///
/// 空セル、キャッシュ値のない数式セル、論理値セルなどが該当します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownCellPolicy {
    /// ストリームから除外する（デフォルト）
    #[default]
    Skip,

    /// 生のテキストを`ValueKind::Unknown`として出力する
    ///
    /// 値を持たないセル（`<v>`要素がないセル）は常に除外されます。
    Surface,
}

/// ストリーミング対象の選択範囲
///
/// 1つのセッションで使用される選択範囲は、最初のpullで確定します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// 単一列（例: "A"）
    Column(Column),

    /// 連続した複数列（両端を含む）。列ごとに上から下へ走査されます。
    Columns {
        /// 開始列
        from: Column,
        /// 終了列
        to: Column,
    },

    /// 範囲（例: "A10:C99"）
    ///
    /// 最初の列は開始行以降、最後の列は終了行以前に制限されます。
    /// 中間の列には行の制限がありません。
    Range(CellRange),
}

impl Selection {
    /// 列名から単一列の選択範囲を生成
    pub fn column(column: &str) -> Result<Self> {
        Ok(Selection::Column(column.parse()?))
    }

    /// 列名の組から複数列の選択範囲を生成
    ///
    /// `from`が`to`より右にある場合は`InvalidRange`を返します。
    pub fn columns(from: &str, to: &str) -> Result<Self> {
        let from: Column = from.parse()?;
        let to: Column = to.parse()?;
        if from > to {
            return Err(crate::error::XlsxStreamError::InvalidRange(format!(
                "{}:{}",
                from, to
            )));
        }
        Ok(Selection::Columns { from, to })
    }

    /// 範囲式（例: "A10:C99"）から選択範囲を生成
    pub fn range(expression: &str) -> Result<Self> {
        Ok(Selection::Range(expression.parse()?))
    }

    /// 最初に走査する列
    pub(crate) fn first_column(&self) -> Column {
        match self {
            Selection::Column(c) => *c,
            Selection::Columns { from, .. } => *from,
            Selection::Range(range) => range.from.column,
        }
    }

    /// 最後に走査する列
    pub(crate) fn last_column(&self) -> Column {
        match self {
            Selection::Column(c) => *c,
            Selection::Columns { to, .. } => *to,
            Selection::Range(range) => range.to.column,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Column(c) => write!(f, "column {}", c),
            Selection::Columns { from, to } => write!(f, "columns {}:{}", from, to),
            Selection::Range(range) => write!(f, "range {}", range),
        }
    }
}
