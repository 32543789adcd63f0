//! Rendezvous Module
//!
//! スキャナー（生産者）とカーソル（消費者）の2者間で、値を1つずつ受け渡す同期点。
//!
//! 容量0の同期チャネルを2本使用します。
//!
//! - 要求チャネル（カーソル → スキャナー）: 次の値を要求する
//! - 値チャネル（スキャナー → カーソル）: 解決済みの値、エラー、終端を届ける
//!
//! スキャナーは要求を受け取るまで走査を開始せず、値を渡すと次の要求まで停止します。
//! どちらの待機もチャネルの受信によるブロッキングで、ビジーループは使用しません。
//! 受け渡し中の値は常に高々1つです。

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};

use crate::error::XlsxStreamError;
use crate::types::ResolvedValue;

/// スキャナーからカーソルへ届くメッセージ
#[derive(Debug)]
pub(crate) enum Message {
    /// 解決済みの値
    Value(ResolvedValue),
    /// このセルのみの失敗（データ整合性エラー）。走査は継続する
    CellFailed(XlsxStreamError),
    /// 走査を継続できない失敗。以降は終端として扱う
    Aborted(XlsxStreamError),
    /// ストリームの終端
    Exhausted,
}

impl Message {
    /// このメッセージの後にスキャナーが停止するか
    pub fn is_terminal(&self) -> bool {
        matches!(self, Message::Aborted(_) | Message::Exhausted)
    }
}

/// 2者間のランデブーを生成
pub(crate) fn rendezvous() -> (Producer, Consumer) {
    let (demand_tx, demand_rx) = sync_channel(0);
    let (value_tx, value_rx) = sync_channel(0);
    (
        Producer {
            demand: demand_rx,
            values: value_tx,
        },
        Consumer {
            demand: demand_tx,
            values: value_rx,
        },
    )
}

/// スキャナー側のハンドル
pub(crate) struct Producer {
    demand: Receiver<()>,
    values: SyncSender<Message>,
}

impl Producer {
    /// カーソルからの要求を待つ
    ///
    /// カーソルが破棄された場合は`false`を返します。スキャナーはその時点で停止します。
    pub fn wait_for_demand(&self) -> bool {
        self.demand.recv().is_ok()
    }

    /// メッセージを渡し、カーソルが受け取るまで待つ
    ///
    /// カーソルが破棄された場合は`false`を返します。
    pub fn publish(&self, message: Message) -> bool {
        self.values.send(message).is_ok()
    }
}

/// カーソル側のハンドル
pub(crate) struct Consumer {
    demand: SyncSender<()>,
    values: Receiver<Message>,
}

impl Consumer {
    /// 次のメッセージを要求し、届くまで待つ
    ///
    /// スキャナーがメッセージを渡さずに終了した場合は`None`を返します。
    pub fn pull(&self) -> Option<Message> {
        self.demand.send(()).ok()?;
        self.values.recv().ok()
    }
}
