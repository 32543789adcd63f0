//! Date/Time Format Module
//!
//! Excelの日付・時刻書式を`chrono`のstrftime形式に変換し、
//! シリアル値を日時に変換する機能を提供します。

use chrono::format::{Item, StrftimeItems};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

use super::sections::{first_section, FormatSection, LexMode};
use super::tokens::FormatToken;
use crate::api::FormatKind;

/// 長い日付形式のロケールマーカー
pub(crate) const LONG_DATE_MARKER: &str = "[$-F800]";

/// 長い時刻形式のロケールマーカー
pub(crate) const LONG_TIME_MARKER: &str = "[$-F400]";

/// 1日のミリ秒数
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Excelが扱える最大のシリアル値（9999-12-31 23:59:59.999）
const MAX_SERIAL: f64 = 2_958_466.0;

static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\w+:\w+:\w+").expect("time pattern is valid"));

/// Excelの日付・時刻書式をstrftime形式に変換
///
/// # 引数
///
/// * `code` - Excelの書式文字列（ロケールマーカーを含んでもよい）
///
/// # 戻り値
///
/// strftime形式の書式文字列
///
/// # 例
///
/// `dd mmmm\,\ yyyy` は `%d %B, %Y` に変換されます。
pub(crate) fn to_strftime(code: &str) -> String {
    let section = FormatSection::parse(first_section(code), LexMode::DateTime);
    let twelve_hour = section.tokens.contains(&FormatToken::AmPm);

    let mut out = String::new();
    for token in &section.tokens {
        match token {
            FormatToken::Year(n) if *n <= 2 => out.push_str("%y"),
            FormatToken::Year(_) => out.push_str("%Y"),
            FormatToken::Month(1) => out.push_str("%-m"),
            FormatToken::Month(2) => out.push_str("%m"),
            FormatToken::Month(4) => out.push_str("%B"),
            FormatToken::Month(_) => out.push_str("%b"),
            FormatToken::Day(1) => out.push_str("%-d"),
            FormatToken::Day(2) => out.push_str("%d"),
            FormatToken::Day(3) => out.push_str("%a"),
            FormatToken::Day(_) => out.push_str("%A"),
            FormatToken::Hour(n) => match (twelve_hour, *n >= 2) {
                (true, true) => out.push_str("%I"),
                (true, false) => out.push_str("%-I"),
                (false, true) => out.push_str("%H"),
                (false, false) => out.push_str("%-H"),
            },
            FormatToken::Minute(n) if *n >= 2 => out.push_str("%M"),
            FormatToken::Minute(_) => out.push_str("%-M"),
            FormatToken::Second(n) if *n >= 2 => out.push_str("%S"),
            FormatToken::Second(_) => out.push_str("%-S"),
            FormatToken::AmPm => out.push_str("%p"),
            FormatToken::Literal(s) => out.push_str(&s.replace('%', "%%")),
            _ => {}
        }
    }
    out
}

/// 長い日付形式（`[$-F800]`）の書式をstrftime形式に変換
///
/// ロケールマーカーを取り除き、エスケープされた文字をリテラルとして扱います。
pub(crate) fn translate_long_date(code: &str) -> String {
    to_strftime(code.trim_start_matches(LONG_DATE_MARKER))
}

/// 長い時刻形式（`[$-F400]`）の書式をstrftime形式に変換
///
/// `h:mm:ss`の形をした部分のみを取り出し、ロケール部分は破棄します。AM/PMも破棄されるため24時間表記になります。
/// 該当する部分がない場合は書式全体を変換します。
pub(crate) fn translate_long_time(code: &str) -> String {
    match TIME_PATTERN.find(code) {
        Some(m) => to_strftime(m.as_str()),
        None => to_strftime(code.trim_start_matches(LONG_TIME_MARKER)),
    }
}

/// マーカーのない書式が日付・時刻書式かどうかを判定
///
/// 年・月・日のトークンを含めば日付、時・分・秒のみであれば時刻とみなします。
pub(crate) fn detect_kind(code: &str) -> Option<FormatKind> {
    let section = FormatSection::parse(first_section(code), LexMode::DateTime);
    if section.has_date() {
        Some(FormatKind::Date)
    } else if section.has_time() {
        Some(FormatKind::Time)
    } else {
        None
    }
}

/// strftime形式の書式が`chrono`で解釈可能かどうか
pub(crate) fn is_valid_pattern(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// 日時をstrftime形式の書式で描画
///
/// 描画に失敗した場合は`None`を返します。
pub(crate) fn render(pattern: &str, datetime: &NaiveDateTime) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", datetime.format(pattern)).ok()?;
    Some(out)
}

/// Excelシリアル値を日時に変換
///
/// # 引数
///
/// * `serial` - シリアル値（整数部が日数、小数部が時刻）
/// * `is_1904` - 1904年エポックを使用するか
///
/// # 戻り値
///
/// * `Some(NaiveDateTime)` - 変換成功（時刻はミリ秒単位で丸められる）
/// * `None` - 負の値、非有限値、または範囲外の値
///
/// # 注意
///
/// 1900年エポックでは、Excelが1900年2月29日を存在するものとして扱うため、
/// シリアル値60未満は1日ずれたエポックで計算します。
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial >= MAX_SERIAL {
        return None;
    }

    let total_millis = (serial * MILLIS_PER_DAY).round() as i64;
    let days = total_millis.div_euclid(MILLIS_PER_DAY as i64);
    let millis = total_millis.rem_euclid(MILLIS_PER_DAY as i64);

    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let date = epoch.checked_add_signed(Duration::days(days))?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(
        (millis / 1000) as u32,
        ((millis % 1000) * 1_000_000) as u32,
    )?;
    Some(NaiveDateTime::new(date, time))
}
