//! Range Filter Module
//!
//! 選択範囲に基づいて、ワークシートを走査中のセルが対象かどうかを判定します。
//!
//! 走査は列ごとに行われます。1回の走査（パス）では対象列が1つに固定され、
//! ワークシートの終端に達すると次の列で走査をやり直します。

use crate::api::Selection;
use crate::types::{CellRef, Column};

/// 行に対する判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RowVerdict {
    /// 行内のセルを走査する
    Scan,
    /// 行全体を読み飛ばす（開始行より前）
    Skip,
    /// このパスを終了する（終了行を超えた）
    EndPass,
}

/// セルに対する判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellVerdict {
    /// 対象セル
    Take,
    /// このセルを読み飛ばす
    Skip,
    /// 行の残りを読み飛ばす（対象列を過ぎた）
    SkipRow,
}

/// パスごとの行の範囲（両端を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowBounds {
    pub min: u32,
    pub max: u32,
}

/// 選択範囲による走査フィルター
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RangeFilter {
    selection: Selection,
}

impl RangeFilter {
    /// 選択範囲からフィルターを生成
    pub fn new(selection: Selection) -> Self {
        Self { selection }
    }

    /// 選択範囲
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// 最初のパスの対象列
    pub fn first_target(&self) -> Column {
        self.selection.first_column()
    }

    /// 次のパスの対象列
    ///
    /// 最後の列を走査し終えた場合は`None`を返します。
    pub fn next_target(&self, current: Column) -> Option<Column> {
        if current >= self.selection.last_column() {
            return None;
        }
        current.next_column()
    }

    /// 対象列のパスにおける行の範囲
    ///
    /// 範囲指定では、最初の列は開始行以降、最後の列は終了行以前に制限されます。
    pub fn bounds(&self, target: Column) -> RowBounds {
        match &self.selection {
            Selection::Range(range) => RowBounds {
                min: if target == range.from.column {
                    range.from.row
                } else {
                    1
                },
                max: if target == range.to.column {
                    range.to.row
                } else {
                    CellRef::MAX_ROW
                },
            },
            Selection::Column(_) | Selection::Columns { .. } => RowBounds {
                min: 1,
                max: CellRef::MAX_ROW,
            },
        }
    }

    /// 行番号を判定
    pub fn check_row(&self, target: Column, row: u32) -> RowVerdict {
        let bounds = self.bounds(target);
        if row > bounds.max {
            RowVerdict::EndPass
        } else if row < bounds.min {
            RowVerdict::Skip
        } else {
            RowVerdict::Scan
        }
    }

    /// セルを判定
    pub fn check_cell(&self, target: Column, cell: &CellRef) -> CellVerdict {
        if cell.column > target {
            return CellVerdict::SkipRow;
        }
        if cell.column == target && self.in_scope(cell) {
            CellVerdict::Take
        } else {
            CellVerdict::Skip
        }
    }

    /// セルが選択範囲に含まれるか（パスによらない判定）
    pub fn in_scope(&self, cell: &CellRef) -> bool {
        match &self.selection {
            Selection::Column(c) => cell.column == *c,
            Selection::Columns { from, to } => (*from..=*to).contains(&cell.column),
            Selection::Range(range) => range.contains(cell),
        }
    }
}
