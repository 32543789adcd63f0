//! FormatSection Module
//!
//! Excel Number Format Stringのセクション分割と字句解析を提供します。
//!
//! 書式文字列は';'で最大4つのセクション（正数、負数、ゼロ、テキスト）に分割されますが、
//! このクレートでは正数セクションのみを使用します。

use super::tokens::{FormatToken, Placeholder};

/// 字句解析のモード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LexMode {
    /// 数値書式（"0", "#", "?", ".", ",", "%", "E+"）
    Number,
    /// 日付・時刻書式（"y", "m", "d", "h", "s", "AM/PM"）
    DateTime,
}

/// 書式文字列の最初の（正数）セクションを返す
///
/// 引用符内、'['と']'の内部、エスケープされた';'は区切りとして扱いません。
pub(crate) fn first_section(code: &str) -> &str {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;

    for (idx, ch) in code.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if !in_quotes => escaped = true,
            '"' if !in_brackets => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            ';' if !in_quotes && !in_brackets => return &code[..idx],
            _ => {}
        }
    }
    code
}

/// 先頭と末尾の埋め文字（'_', '-', '*', ' '）を取り除く
pub(crate) fn trim_fill(section: &str) -> &str {
    section.trim_matches(|c| matches!(c, '_' | '-' | '*' | ' '))
}

/// フォーマットのセクション
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct FormatSection {
    /// フォーマットトークン
    pub tokens: Vec<FormatToken>,
}

impl FormatSection {
    /// セクション文字列を字句解析
    ///
    /// # 引数
    ///
    /// * `section` - セクション文字列（';'を含まないこと）
    /// * `mode` - 字句解析のモード
    ///
    /// # 戻り値
    ///
    /// 解析されたセクション。未知の文字はリテラルとして扱われるため、失敗しません。
    pub fn parse(section: &str, mode: LexMode) -> Self {
        let mut lexer = Lexer {
            section: FormatSection::default(),
            mode,
        };
        lexer.run(section);
        if mode == LexMode::DateTime {
            lexer.section.resolve_minutes();
        }
        lexer.section
    }

    /// セクションが日付トークンを含むかどうか
    pub fn has_date(&self) -> bool {
        self.tokens.iter().any(FormatToken::is_date)
    }

    /// セクションが時刻トークンを含むかどうか
    pub fn has_time(&self) -> bool {
        self.tokens.iter().any(FormatToken::is_time)
    }

    /// リテラルを追加（直前のリテラルと結合する）
    fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(FormatToken::Literal(last)) = self.tokens.last_mut() {
            last.push_str(text);
        } else {
            self.tokens.push(FormatToken::Literal(text.to_string()));
        }
    }

    /// 曖昧な"m"/"mm"を分として解釈し直す
    ///
    /// 直前の日時トークンが時、または直後の日時トークンが秒の場合は分になります。
    fn resolve_minutes(&mut self) {
        let datetime_positions: Vec<usize> = self
            .tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_datetime())
            .map(|(i, _)| i)
            .collect();

        for (n, &pos) in datetime_positions.iter().enumerate() {
            let FormatToken::Month(count) = self.tokens[pos] else {
                continue;
            };
            if count > 2 {
                continue;
            }
            let after_hour = n > 0
                && matches!(self.tokens[datetime_positions[n - 1]], FormatToken::Hour(_));
            let before_second = datetime_positions
                .get(n + 1)
                .is_some_and(|&next| matches!(self.tokens[next], FormatToken::Second(_)));
            if after_hour || before_second {
                self.tokens[pos] = FormatToken::Minute(count);
            }
        }
    }
}

struct Lexer {
    section: FormatSection,
    mode: LexMode,
}

impl Lexer {
    fn run(&mut self, input: &str) {
        let chars: Vec<char> = input.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            i += 1;
            match ch {
                '"' => {
                    let start = i;
                    while i < chars.len() && chars[i] != '"' {
                        i += 1;
                    }
                    let text: String = chars[start..i].iter().collect();
                    self.section.push_literal(&text);
                    i += 1;
                }
                '\\' => {
                    if let Some(&next) = chars.get(i) {
                        self.section.push_literal(&next.to_string());
                        i += 1;
                    }
                }
                '_' => {
                    // 次の文字の幅の空白
                    self.section.push_literal(" ");
                    i += 1;
                }
                '*' => {
                    // 繰り返し文字（セル幅に依存するため出力しない）
                    i += 1;
                }
                '[' => {
                    let start = i;
                    while i < chars.len() && chars[i] != ']' {
                        i += 1;
                    }
                    let content: String = chars[start..i].iter().collect();
                    i += 1;
                    self.bracket(&content);
                }
                _ => match self.mode {
                    LexMode::Number => i = self.number_char(&chars, i - 1),
                    LexMode::DateTime => i = self.datetime_char(&chars, i - 1),
                },
            }
        }
    }

    /// '['と']'で囲まれた内容を処理
    fn bracket(&mut self, content: &str) {
        if let Some(currency) = content.strip_prefix('$') {
            // ロケール付き通貨記号（例: [$€-407]）。ロケール部分は出力しない
            let symbol = currency.split('-').next().unwrap_or("");
            self.section.push_literal(symbol);
            return;
        }

        if self.mode == LexMode::DateTime {
            // 経過時間（例: [h], [mm], [ss]）
            let lower = content.to_ascii_lowercase();
            let count = lower.len();
            if count > 0 && lower.chars().all(|c| c == 'h') {
                self.section.tokens.push(FormatToken::Hour(count));
                return;
            }
            if count > 0 && lower.chars().all(|c| c == 'm') {
                self.section.tokens.push(FormatToken::Minute(count));
                return;
            }
            if count > 0 && lower.chars().all(|c| c == 's') {
                self.section.tokens.push(FormatToken::Second(count));
                return;
            }
        }

        // 色指定・条件は描画時に無視される
        self.section.tokens.push(FormatToken::Color(content.to_string()));
    }

    /// 数値モードで1文字（または1トークン）を処理し、次の位置を返す
    fn number_char(&mut self, chars: &[char], i: usize) -> usize {
        let ch = chars[i];
        match ch {
            '0' => self.section.tokens.push(FormatToken::Digit(Placeholder::Zero)),
            '#' => self.section.tokens.push(FormatToken::Digit(Placeholder::Hash)),
            '?' => self.section.tokens.push(FormatToken::Digit(Placeholder::Question)),
            '.' => self.section.tokens.push(FormatToken::DecimalPoint),
            ',' => self.section.tokens.push(FormatToken::ThousandSeparator),
            '%' => self.section.tokens.push(FormatToken::Percent),
            '@' => self.section.tokens.push(FormatToken::TextPlaceholder),
            'E' | 'e' if matches!(chars.get(i + 1), Some('+') | Some('-')) => {
                self.section.tokens.push(FormatToken::Exponent {
                    always_sign: chars[i + 1] == '+',
                });
                return i + 2;
            }
            'G' | 'g' if starts_with_ignore_case(&chars[i..], "general") => {
                self.section.tokens.push(FormatToken::General);
                return i + "general".len();
            }
            _ => self.section.push_literal(&ch.to_string()),
        }
        i + 1
    }

    /// 日付・時刻モードで1トークンを処理し、次の位置を返す
    fn datetime_char(&mut self, chars: &[char], i: usize) -> usize {
        let ch = chars[i];

        if matches!(ch, 'A' | 'a') {
            if starts_with_ignore_case(&chars[i..], "am/pm") {
                self.section.tokens.push(FormatToken::AmPm);
                return i + "am/pm".len();
            }
            if starts_with_ignore_case(&chars[i..], "a/p") {
                self.section.tokens.push(FormatToken::AmPm);
                return i + "a/p".len();
            }
        }

        let lower = ch.to_ascii_lowercase();
        if matches!(lower, 'y' | 'm' | 'd' | 'h' | 's') {
            let count = chars[i..]
                .iter()
                .take_while(|c| c.to_ascii_lowercase() == lower)
                .count();
            let token = match lower {
                'y' => FormatToken::Year(count),
                'm' => FormatToken::Month(count),
                'd' => FormatToken::Day(count),
                'h' => FormatToken::Hour(count),
                _ => FormatToken::Second(count),
            };
            self.section.tokens.push(token);
            return i + count;
        }

        self.section.push_literal(&ch.to_string());
        i + 1
    }
}

fn starts_with_ignore_case(chars: &[char], pattern: &str) -> bool {
    let len = pattern.chars().count();
    chars.len() >= len
        && chars
            .iter()
            .zip(pattern.chars())
            .all(|(a, b)| a.to_ascii_lowercase() == b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_section() {
        assert_eq!(first_section("0;0;0;@"), "0");
        assert_eq!(first_section("0.00"), "0.00");
        assert_eq!(first_section("#,##0;(#,##0)"), "#,##0");
        assert_eq!(first_section("\"a;b\"0;0"), "\"a;b\"0");
        assert_eq!(first_section("0\\;0;1"), "0\\;0");
    }

    #[test]
    fn test_trim_fill() {
        assert_eq!(trim_fill("#,##0 "), "#,##0");
        assert_eq!(trim_fill("_-* #,##0_-"), "#,##0");
        assert_eq!(trim_fill("#,##0_)"), "#,##0_)");
    }

    #[test]
    fn test_parse_number_tokens() {
        let section = FormatSection::parse("#,##0.00", LexMode::Number);
        assert_eq!(
            section.tokens,
            vec![
                FormatToken::Digit(Placeholder::Hash),
                FormatToken::ThousandSeparator,
                FormatToken::Digit(Placeholder::Hash),
                FormatToken::Digit(Placeholder::Hash),
                FormatToken::Digit(Placeholder::Zero),
                FormatToken::DecimalPoint,
                FormatToken::Digit(Placeholder::Zero),
                FormatToken::Digit(Placeholder::Zero),
            ]
        );
    }

    #[test]
    fn test_parse_literals_and_brackets() {
        let section = FormatSection::parse("[Red][$€-407]\"total \"0\\x_)", LexMode::Number);
        assert_eq!(
            section.tokens,
            vec![
                FormatToken::Color("Red".to_string()),
                FormatToken::Literal("€total ".to_string()),
                FormatToken::Digit(Placeholder::Zero),
                FormatToken::Literal("x ".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_exponent_and_general() {
        let section = FormatSection::parse("0.00E+00", LexMode::Number);
        assert!(section
            .tokens
            .contains(&FormatToken::Exponent { always_sign: true }));

        let section = FormatSection::parse("General", LexMode::Number);
        assert_eq!(section.tokens, vec![FormatToken::General]);
    }

    #[test]
    fn test_parse_datetime_month_vs_minute() {
        let section = FormatSection::parse("m/d/yyyy h:mm", LexMode::DateTime);
        assert_eq!(section.tokens[0], FormatToken::Month(1));
        assert_eq!(section.tokens.last(), Some(&FormatToken::Minute(2)));

        let section = FormatSection::parse("mm:ss", LexMode::DateTime);
        assert_eq!(section.tokens[0], FormatToken::Minute(2));

        let section = FormatSection::parse("mmmm", LexMode::DateTime);
        assert_eq!(section.tokens[0], FormatToken::Month(4));
    }

    #[test]
    fn test_parse_am_pm_and_elapsed() {
        let section = FormatSection::parse("h:mm AM/PM", LexMode::DateTime);
        assert_eq!(section.tokens.last(), Some(&FormatToken::AmPm));
        assert!(section.has_time());
        assert!(!section.has_date());

        let section = FormatSection::parse("[h]:mm:ss", LexMode::DateTime);
        assert_eq!(section.tokens[0], FormatToken::Hour(1));
    }
}
