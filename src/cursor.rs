//! Stream Cursor Module
//!
//! 呼び出し側が使用するpull型のハンドル。
//!
//! カーソルは最初のpullでスキャナースレッドを起動し、以降のpullごとに
//! スキャナーが次の値（またはエラー、終端）を渡すまでブロックします。
//! カーソルを破棄するとスキャナーは次の待機点で停止し、スレッドは回収されます。

use log::debug;
use std::any::Any;
use std::thread::{self, JoinHandle};

use crate::api::Selection;
use crate::error::{Result, XlsxStreamError};
use crate::rendezvous::{rendezvous, Consumer, Message};
use crate::scanner::WorksheetScanner;
use crate::types::{CellRef, Column, ResolvedValue};

/// 実行中のスキャナー
struct Running {
    consumer: Consumer,
    handle: JoinHandle<()>,
}

/// ストリーミングカーソル
///
/// `Iterator<Item = Result<ResolvedValue>>`を実装しています。
/// データ整合性エラー（例: 存在しない共有文字列）はそのセルのみの失敗として返され、
/// 次の要素から走査が続きます。XMLやI/Oのエラーは一度だけ返され、その後ストリームは終了します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxstream::{Selection, XlsxReader};
///
/// # fn main() -> Result<(), xlsxstream::XlsxStreamError> {
/// let reader = XlsxReader::open("report.xlsx", "Sheet1")?;
/// for value in reader.stream(Selection::range("A2:C100")?) {
///     let value = value?;
///     println!("{} = {} ({:?})", value.cell, value.text, value.kind);
/// }
/// # Ok(())
/// # }
/// ```
pub struct StreamCursor {
    selection: Selection,
    /// 最初のpullまで起動を遅延するスキャナー
    pending: Option<WorksheetScanner>,
    running: Option<Running>,
    finished: bool,
    current: Option<CellRef>,
}

impl StreamCursor {
    pub(crate) fn new(scanner: WorksheetScanner) -> Self {
        Self {
            selection: scanner.filter().selection().clone(),
            pending: Some(scanner),
            running: None,
            finished: false,
            current: None,
        }
    }

    /// 次の値を取得
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(ResolvedValue))` - 次の値
    /// * `Ok(None)` - ストリームの終端（以降も`Ok(None)`を返し続ける）
    /// * `Err(XlsxStreamError)` - スキャナーから転送されたエラー
    pub fn next_value(&mut self) -> Result<Option<ResolvedValue>> {
        if self.finished {
            return Ok(None);
        }
        if let Some(scanner) = self.pending.take() {
            self.start(scanner)?;
        }

        let Some(message) = self.running.as_ref().and_then(|r| r.consumer.pull()) else {
            return Err(self.scanner_failure());
        };
        if message.is_terminal() {
            self.shutdown();
        }
        match message {
            Message::Value(value) => {
                self.current = Some(value.cell);
                Ok(Some(value))
            }
            Message::CellFailed(e) | Message::Aborted(e) => Err(e),
            Message::Exhausted => Ok(None),
        }
    }

    /// ストリーミング対象の選択範囲
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// 直前に返した値のセル
    pub fn current_cell(&self) -> Option<CellRef> {
        self.current
    }

    /// 直前に返した値の列
    pub fn current_column(&self) -> Option<Column> {
        self.current.map(|c| c.column)
    }

    /// 直前に返した値の行
    pub fn current_row(&self) -> Option<u32> {
        self.current.map(|c| c.row)
    }

    /// ストリームが終了したか
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// カーソルを閉じ、スキャナーを停止する
    ///
    /// 破棄と同じ動作です。終端に達する前に呼び出しても、エラーにはなりません。
    pub fn close(mut self) {
        self.shutdown();
    }

    fn start(&mut self, scanner: WorksheetScanner) -> Result<()> {
        let (producer, consumer) = rendezvous();
        let handle = thread::Builder::new()
            .name("xlsxstream-scanner".to_string())
            .spawn(move || scanner.run(producer))
            .map_err(|e| {
                self.finished = true;
                XlsxStreamError::Io(e)
            })?;
        self.running = Some(Running { consumer, handle });
        Ok(())
    }

    /// スキャナーを停止し、スレッドを回収
    fn shutdown(&mut self) {
        self.finished = true;
        self.pending = None;
        if let Some(Running { consumer, handle }) = self.running.take() {
            // 要求チャネルを閉じると、スキャナーは待機点で停止する
            drop(consumer);
            if handle.join().is_err() {
                debug!("Scanner thread panicked during shutdown");
            }
        }
    }

    /// スキャナーが終端を通知せずに終了した場合のエラー
    fn scanner_failure(&mut self) -> XlsxStreamError {
        self.finished = true;
        let reason = match self.running.take() {
            Some(Running { handle, .. }) => match handle.join() {
                Err(payload) => panic_message(payload.as_ref()),
                Ok(()) => "scanner exited without reaching the end of the stream".to_string(),
            },
            None => "scanner is not running".to_string(),
        };
        XlsxStreamError::ScannerFailed(reason)
    }
}

/// パニックのペイロードからメッセージを取り出す
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "scanner thread panicked".to_string()
    }
}

impl Iterator for StreamCursor {
    type Item = Result<ResolvedValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_value().transpose()
    }
}

impl Drop for StreamCursor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for StreamCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCursor")
            .field("selection", &self.selection)
            .field("started", &(self.pending.is_none()))
            .field("finished", &self.finished)
            .field("current", &self.current)
            .finish()
    }
}
