//! Worksheet Scanner Module
//!
//! バックグラウンドスレッドでワークシートを前方向に走査し、
//! 選択範囲に含まれるセルの値をランデブー経由でカーソルに渡します。
//!
//! 走査は対象列ごとのパスで構成されます。各パスはパッケージから新しいハンドルで
//! ワークシートを開き直し、先頭から終端（または範囲の終了行）まで読み進めます。

use log::{debug, trace};
use std::sync::Arc;

use crate::classifier::CellClassifier;
use crate::error::Result;
use crate::filter::{CellVerdict, RangeFilter, RowVerdict};
use crate::package::Package;
use crate::parser::{SheetEvent, SheetWalker};
use crate::rendezvous::{Message, Producer};
use crate::types::Column;

/// スキャナーのみが所有する走査状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScanState {
    /// 現在の行
    pub row: u32,
    /// 直前に読んだセルの列
    pub column: Option<Column>,
    /// 現在のパスの対象列（全パス終了後は`None`）
    pub target: Option<Column>,
    /// ストリームの終端に達したか
    pub exhausted: bool,
}

impl ScanState {
    fn new(first_target: Column) -> Self {
        Self {
            row: 0,
            column: None,
            target: Some(first_target),
            exhausted: false,
        }
    }
}

/// パスの終わり方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassEnd {
    /// ワークシートの終端、または範囲の終了行に達した
    Completed,
    /// カーソルが破棄された
    Cancelled,
}

/// ワークシートスキャナー（生産者）
pub(crate) struct WorksheetScanner {
    package: Package,
    sheet_part: String,
    classifier: Arc<CellClassifier>,
    filter: RangeFilter,
}

impl WorksheetScanner {
    pub fn new(
        package: Package,
        sheet_part: String,
        classifier: Arc<CellClassifier>,
        filter: RangeFilter,
    ) -> Self {
        Self {
            package,
            sheet_part,
            classifier,
            filter,
        }
    }

    /// 選択範囲
    pub fn filter(&self) -> &RangeFilter {
        &self.filter
    }

    /// スキャナーを実行（バックグラウンドスレッドの本体）
    ///
    /// 最初の要求を受け取るまで走査を開始しません。
    /// カーソルが破棄されると、次の待機点で走査を打ち切ってアーカイブを解放します。
    pub fn run(self, producer: Producer) {
        if !producer.wait_for_demand() {
            debug!("Scanner for {} cancelled before the first pull", self.sheet_part);
            return;
        }

        let mut state = ScanState::new(self.filter.first_target());
        while !state.exhausted {
            let Some(target) = state.target else {
                state.exhausted = true;
                break;
            };
            debug!(
                "Scanning column {} of {} ({})",
                target,
                self.sheet_part,
                self.filter.selection()
            );
            match self.walk_pass(target, &mut state, &producer) {
                Ok(PassEnd::Completed) => state.target = self.filter.next_target(target),
                Ok(PassEnd::Cancelled) => {
                    debug!(
                        "Scanner for {} cancelled at {}{}",
                        self.sheet_part,
                        state.column.map(|c| c.to_string()).unwrap_or_default(),
                        state.row
                    );
                    return;
                }
                Err(e) => {
                    debug!("Scanner for {} aborted: {}", self.sheet_part, e);
                    producer.publish(Message::Aborted(e));
                    return;
                }
            }
        }

        debug!("Scanner for {} exhausted", self.sheet_part);
        producer.publish(Message::Exhausted);
    }

    /// 対象列について1回のパスを実行
    fn walk_pass(
        &self,
        target: Column,
        state: &mut ScanState,
        producer: &Producer,
    ) -> Result<PassEnd> {
        let mut archive = self.package.archive()?;
        let mut walker = SheetWalker::new(archive.open_part(&self.sheet_part)?);

        loop {
            match walker.next_event()? {
                SheetEvent::Eof => return Ok(PassEnd::Completed),
                SheetEvent::Row(row) => {
                    state.row = row;
                    state.column = None;
                    match self.filter.check_row(target, row) {
                        RowVerdict::Scan => {}
                        RowVerdict::Skip => {
                            trace!("Skipping row {} (before the range)", row);
                            walker.skip_row()?;
                        }
                        RowVerdict::EndPass => {
                            trace!("Row {} is past the range, column {} done", row, target);
                            return Ok(PassEnd::Completed);
                        }
                    }
                }
                SheetEvent::Cell(start) => {
                    state.row = start.cell.row;
                    state.column = Some(start.cell.column);
                    match self.filter.check_cell(target, &start.cell) {
                        CellVerdict::Skip => walker.skip_cell(&start)?,
                        CellVerdict::SkipRow => {
                            walker.skip_cell(&start)?;
                            walker.skip_row()?;
                        }
                        CellVerdict::Take => {
                            let raw = walker.load_cell(start)?;
                            let message = match self.classifier.classify(&raw) {
                                Ok(Some(value)) => Message::Value(value),
                                Ok(None) => continue,
                                Err(e) => Message::CellFailed(e),
                            };
                            // 値を渡したら、次の要求まで走査を止める
                            if !producer.publish(message) || !producer.wait_for_demand() {
                                return Ok(PassEnd::Cancelled);
                            }
                        }
                    }
                }
            }
        }
    }
}
