//! FormatToken Module
//!
//! Excel Number Format Stringのトークン定義を提供します。

/// 数字プレースホルダーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placeholder {
    /// "0": 桁がなければ0で埋める
    Zero,
    /// "#": 桁がなければ何も出力しない
    Hash,
    /// "?": 桁がなければ空白で埋める
    Question,
}

/// フォーマットトークン
///
/// Excel Number Format Stringを解析した際に生成されるトークンです。
/// 日付・時刻トークンと数値トークンは、解析モードによってどちらか一方のみが生成されます。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FormatToken {
    /// 年（例: "yyyy" -> 4桁, "yy" -> 2桁）
    Year(usize),

    /// 月（例: "mm" -> 2桁, "m" -> 1桁, "mmm" -> 略称, "mmmm" -> 名称）
    Month(usize),

    /// 日（例: "dd" -> 2桁, "d" -> 1桁, "ddd" -> 曜日略称, "dddd" -> 曜日名）
    Day(usize),

    /// 時（例: "hh" -> 2桁, "h" -> 1桁）
    Hour(usize),

    /// 分（例: "mm" -> 2桁, "m" -> 1桁）
    /// 注意: 日付書式では"mm"は月、時刻書式では"mm"は分
    Minute(usize),

    /// 秒（例: "ss" -> 2桁, "s" -> 1桁）
    Second(usize),

    /// 午前・午後（"AM/PM", "A/P"）
    AmPm,

    /// 数字プレースホルダー
    Digit(Placeholder),

    /// 小数点
    DecimalPoint,

    /// カンマ（位置によって千の位区切り、または1000単位のスケーリング）
    ThousandSeparator,

    /// パーセント記号
    Percent,

    /// 指数表記（"E+"は常に符号を表示、"E-"は負の場合のみ）
    Exponent {
        /// 正の指数にも"+"を表示するか
        always_sign: bool,
    },

    /// リテラル文字列（例: "$", "-", " "）
    Literal(String),

    /// 色指定・条件（例: "[Red]", "[>100]"）。描画時には無視されます
    Color(String),

    /// テキストプレースホルダー（例: "@"）
    TextPlaceholder,

    /// "General"書式
    General,
}

impl FormatToken {
    /// トークンが日付関連かどうかを判定
    pub fn is_date(&self) -> bool {
        matches!(
            self,
            FormatToken::Year(_) | FormatToken::Month(_) | FormatToken::Day(_)
        )
    }

    /// トークンが時刻関連かどうかを判定
    pub fn is_time(&self) -> bool {
        matches!(
            self,
            FormatToken::Hour(_) | FormatToken::Minute(_) | FormatToken::Second(_) | FormatToken::AmPm
        )
    }

    /// トークンが日付・時刻関連かどうかを判定
    pub fn is_datetime(&self) -> bool {
        self.is_date() || self.is_time()
    }
}
