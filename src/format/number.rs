//! NumberFormat Module
//!
//! Excel数値書式（正数セクション）を`rust_decimal::Decimal`に適用します。
//! 浮動小数点を経由しないため、"0.1"のような値も丸め誤差なく描画されます。

use rust_decimal::{Decimal, RoundingStrategy};

use super::sections::{first_section, FormatSection, LexMode};
use super::tokens::{FormatToken, Placeholder};

/// 解析済みの数値書式
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NumberFormat {
    section: FormatSection,
}

/// トークン列から読み取った書式の構造
#[derive(Debug, Default)]
struct Layout {
    /// 整数部のプレースホルダー（左から順）
    integer: Vec<Placeholder>,
    /// 小数部のプレースホルダー
    fraction: Vec<Placeholder>,
    /// 指数部のプレースホルダー
    exponent: Vec<Placeholder>,
    /// 指数表記の符号表示
    exponent_sign: Option<bool>,
    /// 千の位区切りを行うか
    grouping: bool,
    /// 1000で割る回数（末尾のカンマ）
    scaling: u32,
    /// パーセント記号の数
    percent: u32,
}

/// プレースホルダーごとの出力
///
/// トークン列を左から走査しながら、各プレースホルダーの位置にこの内容を出力します。
struct Rendered {
    sign: &'static str,
    integer: Vec<String>,
    /// 整数部のプレースホルダーがない場合に小数点の前に出力する桁
    bare_integer: String,
    fraction: Vec<String>,
    exponent: Vec<String>,
    exponent_sign: &'static str,
}

impl NumberFormat {
    /// 書式文字列を解析
    ///
    /// 複数セクションを含む場合は最初のセクションのみを使用します。
    pub fn parse(pattern: &str) -> Self {
        Self {
            section: FormatSection::parse(first_section(pattern), LexMode::Number),
        }
    }

    /// 数値を書式に従って描画
    ///
    /// # 引数
    ///
    /// * `value` - 描画する10進数
    ///
    /// # 戻り値
    ///
    /// 描画された文字列。負数には先頭に"-"が付きます。
    pub fn format(&self, value: Decimal) -> String {
        let layout = self.layout();

        if self.section.tokens.contains(&FormatToken::General)
            || (layout.integer.is_empty() && layout.fraction.is_empty())
        {
            return self.format_general(value);
        }

        let scaled = match Self::scale(value, &layout) {
            Some(v) => v,
            None => return value.normalize().to_string(),
        };

        let rendered = match layout.exponent_sign {
            Some(always_sign) => Self::render_scientific(scaled, &layout, always_sign),
            None => Some(Self::render_fixed(scaled, &layout)),
        };

        match rendered {
            Some(rendered) => self.assemble(&rendered),
            None => value.normalize().to_string(),
        }
    }

    /// "General"書式、またはプレースホルダーのない書式
    fn format_general(&self, value: Decimal) -> String {
        let mut out = String::new();
        let mut has_general = false;
        for token in &self.section.tokens {
            match token {
                FormatToken::General => {
                    has_general = true;
                    out.push_str(&value.normalize().to_string());
                }
                FormatToken::Literal(s) => out.push_str(s),
                FormatToken::Percent => out.push('%'),
                _ => {}
            }
        }
        if !has_general && out.is_empty() {
            return value.normalize().to_string();
        }
        out
    }

    fn layout(&self) -> Layout {
        let mut layout = Layout::default();
        let mut seen_point = false;
        let mut pending_commas = 0u32;

        for token in &self.section.tokens {
            match token {
                FormatToken::Digit(p) => {
                    if layout.exponent_sign.is_some() {
                        layout.exponent.push(*p);
                    } else if seen_point {
                        layout.fraction.push(*p);
                    } else {
                        if pending_commas > 0 && !layout.integer.is_empty() {
                            layout.grouping = true;
                        }
                        layout.integer.push(*p);
                    }
                    pending_commas = 0;
                }
                FormatToken::ThousandSeparator => {
                    if layout.exponent_sign.is_none() && !layout.integer.is_empty() {
                        pending_commas += 1;
                    }
                }
                FormatToken::DecimalPoint => {
                    layout.scaling += pending_commas;
                    pending_commas = 0;
                    seen_point = true;
                }
                FormatToken::Exponent { always_sign } => {
                    layout.scaling += pending_commas;
                    pending_commas = 0;
                    layout.exponent_sign = Some(*always_sign);
                }
                FormatToken::Percent => layout.percent += 1,
                _ => {}
            }
        }
        layout.scaling += pending_commas;
        layout
    }

    /// パーセントとカンマによるスケーリングを適用
    fn scale(value: Decimal, layout: &Layout) -> Option<Decimal> {
        let mut v = value;
        for _ in 0..layout.percent {
            v = v.checked_mul(Decimal::ONE_HUNDRED)?;
        }
        for _ in 0..layout.scaling {
            v = v.checked_div(Decimal::ONE_THOUSAND)?;
        }
        Some(v)
    }

    fn render_fixed(value: Decimal, layout: &Layout) -> Rendered {
        let rounded = value.round_dp_with_strategy(
            layout.fraction.len() as u32,
            RoundingStrategy::MidpointAwayFromZero,
        );
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let (int_digits, frac_digits) = split_digits(rounded.abs(), layout.fraction.len());
        let (integer, bare_integer) = fill_integer(&int_digits, &layout.integer, layout.grouping);

        Rendered {
            sign,
            integer,
            bare_integer,
            fraction: fill_fraction(&frac_digits, &layout.fraction),
            exponent: Vec::new(),
            exponent_sign: "",
        }
    }

    fn render_scientific(value: Decimal, layout: &Layout, always_sign: bool) -> Option<Rendered> {
        let width = layout.integer.len().max(1) as i64;
        let engineering = layout.integer.iter().any(|p| *p != Placeholder::Zero) && width > 1;
        let abs = value.abs();

        let mut exp = if abs.is_zero() {
            0
        } else {
            let digits = abs.mantissa().unsigned_abs().to_string().len() as i64;
            let magnitude = digits - 1 - abs.scale() as i64;
            if engineering {
                magnitude.div_euclid(width) * width
            } else {
                magnitude - (width - 1)
            }
        };

        let frac_len = layout.fraction.len() as u32;
        let mut mantissa = shift(abs, -exp)?
            .round_dp_with_strategy(frac_len, RoundingStrategy::MidpointAwayFromZero);
        let limit = pow10(width as u32)?;
        if mantissa >= limit {
            let step = if engineering { width } else { 1 };
            exp += step;
            mantissa = shift(abs, -exp)?
                .round_dp_with_strategy(frac_len, RoundingStrategy::MidpointAwayFromZero);
        }

        let sign = if value.is_sign_negative() && !mantissa.is_zero() {
            "-"
        } else {
            ""
        };
        let (int_digits, frac_digits) = split_digits(mantissa, layout.fraction.len());
        let (integer, bare_integer) = fill_integer(&int_digits, &layout.integer, false);

        let exp_digits = exp.unsigned_abs().to_string();
        let exp_digits = if exp_digits == "0" { String::new() } else { exp_digits };
        let (exponent, _) = fill_integer(&exp_digits, &layout.exponent, false);
        let exponent_sign = match (exp < 0, always_sign) {
            (true, _) => "-",
            (false, true) => "+",
            (false, false) => "",
        };

        Some(Rendered {
            sign,
            integer,
            bare_integer,
            fraction: fill_fraction(&frac_digits, &layout.fraction),
            exponent,
            exponent_sign,
        })
    }

    /// トークン列を走査して出力文字列を組み立てる
    fn assemble(&self, rendered: &Rendered) -> String {
        let mut out = String::from(rendered.sign);
        let mut int_idx = 0;
        let mut frac_idx = 0;
        let mut exp_idx = 0;
        let mut seen_point = false;
        let mut seen_exponent = false;

        for token in &self.section.tokens {
            match token {
                FormatToken::Digit(_) => {
                    if seen_exponent {
                        if let Some(s) = rendered.exponent.get(exp_idx) {
                            out.push_str(s);
                        }
                        exp_idx += 1;
                    } else if seen_point {
                        if let Some(s) = rendered.fraction.get(frac_idx) {
                            out.push_str(s);
                        }
                        frac_idx += 1;
                    } else {
                        if let Some(s) = rendered.integer.get(int_idx) {
                            out.push_str(s);
                        }
                        int_idx += 1;
                    }
                }
                FormatToken::DecimalPoint if !seen_exponent => {
                    if rendered.integer.is_empty() {
                        out.push_str(&rendered.bare_integer);
                    }
                    seen_point = true;
                    out.push('.');
                }
                FormatToken::Exponent { .. } => {
                    seen_exponent = true;
                    out.push('E');
                    out.push_str(rendered.exponent_sign);
                }
                FormatToken::Percent => out.push('%'),
                FormatToken::Literal(s) => out.push_str(s),
                _ => {}
            }
        }
        out
    }
}

/// 10進数を整数部の桁と小数部の桁（`frac_len`桁にゼロ埋め）に分割
///
/// 整数部が0の場合、整数部の桁は空文字列になります。
fn split_digits(abs: Decimal, frac_len: usize) -> (String, String) {
    let int_part = abs.trunc().normalize().to_string();
    let int_digits = if int_part == "0" {
        String::new()
    } else {
        int_part
    };

    let fract = (abs - abs.trunc()).to_string();
    let mut frac_digits: String = fract
        .split_once('.')
        .map(|(_, f)| f.to_string())
        .unwrap_or_default();
    frac_digits.truncate(frac_len);
    while frac_digits.len() < frac_len {
        frac_digits.push('0');
    }
    (int_digits, frac_digits)
}

/// 整数部の桁をプレースホルダーに割り当てる
///
/// 桁はプレースホルダーに右から割り当てられ、余った上位の桁は最初のプレースホルダーに出力されます。
/// プレースホルダーがない場合は、すべての桁を2つ目の戻り値として返します。
fn fill_integer(digits: &str, placeholders: &[Placeholder], grouping: bool) -> (Vec<String>, String) {
    let digits: Vec<char> = digits.chars().collect();
    if placeholders.is_empty() {
        return (Vec::new(), digits.iter().collect());
    }

    let mut slots = vec![String::new(); placeholders.len()];
    let mut remaining = digits.len();
    let mut position = 0usize;

    let emit = |slot: &mut String, ch: char, position: usize| {
        slot.push(ch);
        if grouping && ch.is_ascii_digit() && position > 0 && position % 3 == 0 {
            slot.push(',');
        }
    };

    for (k, placeholder) in placeholders.iter().enumerate().rev() {
        let ch = if remaining > 0 {
            remaining -= 1;
            Some(digits[remaining])
        } else {
            match placeholder {
                Placeholder::Zero => Some('0'),
                Placeholder::Question => Some(' '),
                Placeholder::Hash => None,
            }
        };
        if let Some(ch) = ch {
            let mut slot = String::new();
            emit(&mut slot, ch, position);
            slots[k] = slot;
            position += 1;
        }
    }

    if remaining > 0 {
        let mut overflow = String::new();
        for (i, &ch) in digits[..remaining].iter().enumerate() {
            emit(&mut overflow, ch, position + remaining - 1 - i);
        }
        slots[0].insert_str(0, &overflow);
    }

    (slots, String::new())
}

/// 小数部の桁をプレースホルダーに割り当てる
fn fill_fraction(digits: &str, placeholders: &[Placeholder]) -> Vec<String> {
    let significant = digits.trim_end_matches('0').len();
    placeholders
        .iter()
        .zip(digits.chars())
        .enumerate()
        .map(|(i, (placeholder, ch))| {
            if i < significant {
                ch.to_string()
            } else {
                match placeholder {
                    Placeholder::Zero => "0".to_string(),
                    Placeholder::Question => " ".to_string(),
                    Placeholder::Hash => String::new(),
                }
            }
        })
        .collect()
}

fn pow10(exp: u32) -> Option<Decimal> {
    let mut v = Decimal::ONE;
    for _ in 0..exp {
        v = v.checked_mul(Decimal::TEN)?;
    }
    Some(v)
}

/// `value * 10^exp`
fn shift(value: Decimal, exp: i64) -> Option<Decimal> {
    let factor = pow10(u32::try_from(exp.unsigned_abs()).ok()?)?;
    if exp >= 0 {
        value.checked_mul(factor)
    } else {
        value.checked_div(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn fmt(pattern: &str, value: &str) -> String {
        NumberFormat::parse(pattern).format(Decimal::from_str(value).unwrap())
    }

    #[test]
    fn test_format_integer() {
        assert_eq!(fmt("0", "123"), "123");
        assert_eq!(fmt("0", "0"), "0");
        assert_eq!(fmt("0", "2.5"), "3");
        assert_eq!(fmt("000", "7"), "007");
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(fmt("0.00", "123.456"), "123.46");
        assert_eq!(fmt("0.00", "0.1"), "0.10");
        assert_eq!(fmt("0.00", "999.999"), "1000.00");
        assert_eq!(fmt("0.00", "-1.005"), "-1.01");
    }

    #[test]
    fn test_format_grouping() {
        assert_eq!(fmt("#,##0", "1234567"), "1,234,567");
        assert_eq!(fmt("#,##0", "999"), "999");
        assert_eq!(fmt("#,##0", "0"), "0");
        assert_eq!(fmt("#,##0.00", "1234.5"), "1,234.50");
        assert_eq!(fmt("#,##0", "-1234"), "-1,234");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(fmt("0%", "0.25"), "25%");
        assert_eq!(fmt("0.00%", "0.12345"), "12.35%");
    }

    #[test]
    fn test_format_scaling() {
        assert_eq!(fmt("#,##0,", "1234567"), "1,235");
        assert_eq!(fmt("0.0,,", "1234567"), "1.2");
    }

    #[test]
    fn test_format_scientific() {
        assert_eq!(fmt("0.00E+00", "12345"), "1.23E+04");
        assert_eq!(fmt("0.00E+00", "0.00012"), "1.20E-04");
        assert_eq!(fmt("0.00E+00", "0"), "0.00E+00");
        assert_eq!(fmt("0.00E+00", "9.999"), "1.00E+01");
        assert_eq!(fmt("##0.0E+0", "12345"), "12.3E+3");
    }

    #[test]
    fn test_format_optional_digits() {
        assert_eq!(fmt("#.##", "1.5"), "1.5");
        assert_eq!(fmt("#.##", "0.25"), ".25");
        assert_eq!(fmt("0.0#", "2"), "2.0");
        assert_eq!(fmt("?.??", "1.5"), "1.5 ");
    }

    #[test]
    fn test_format_literals() {
        assert_eq!(fmt("\"$\"#,##0.00", "1234.5"), "$1,234.50");
        assert_eq!(fmt("0 \"items\"", "3"), "3 items");
        assert_eq!(fmt("[Red]0.0", "1.25"), "1.3");
        assert_eq!(fmt("#,##0_)", "5"), "5 ");
        assert_eq!(fmt("[$€-407]#,##0", "1000"), "€1,000");
    }

    #[test]
    fn test_format_general() {
        assert_eq!(fmt("General", "1.50"), "1.5");
        assert_eq!(fmt("General", "-42"), "-42");
    }

    #[test]
    fn test_only_first_section_is_used() {
        assert_eq!(fmt("#,##0;(#,##0)", "-1234"), "-1,234");
    }

    #[test]
    fn test_bare_fraction_keeps_integer_digits() {
        assert_eq!(fmt(".00", "12.5"), "12.50");
    }
}
