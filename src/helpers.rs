//! Value helpers available to fill scripts.
//!
//! Seven pure functions usable as bare identifiers inside expressions
//! (`strNoDash(ctx.ssn)`) and as suffix transforms on friendly keys
//! (`total.currency`). Number formatting is locale aware; the default locale
//! groups thousands with `,` and uses `.` as the decimal separator.

use crate::value::Value;
use lazy_static::lazy_static;
use std::collections::HashMap;

/// Locale tag used when none is configured.
pub const DEFAULT_LOCALE: &str = "en-IE";

lazy_static! {
    /// Grouping and decimal separators per supported locale tag.
    static ref LOCALE_SEPARATORS: HashMap<&'static str, (char, char)> = {
        let mut m = HashMap::new();
        m.insert("en-IE", (',', '.'));
        m.insert("en-GB", (',', '.'));
        m.insert("en-US", (',', '.'));
        m.insert("de-DE", ('.', ','));
        m.insert("fr-FR", ('\u{202F}', ','));
        m.insert("de-CH", ('\u{2019}', '.'));
        m
    };
}

/// Number separators for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberLocale {
    /// Locale tag, e.g. `en-IE`
    pub tag: String,
    /// Thousands grouping separator
    pub grouping: char,
    /// Decimal separator
    pub decimal: char,
}

impl Default for NumberLocale {
    fn default() -> Self {
        Self {
            tag: DEFAULT_LOCALE.to_string(),
            grouping: ',',
            decimal: '.',
        }
    }
}

impl NumberLocale {
    /// Resolve a locale tag; unknown tags fall back to the default locale.
    pub fn from_tag(tag: &str) -> Self {
        match LOCALE_SEPARATORS.get(tag) {
            Some(&(grouping, decimal)) => Self {
                tag: tag.to_string(),
                grouping,
                decimal,
            },
            None => {
                log::warn!("unsupported locale '{}', using {}", tag, DEFAULT_LOCALE);
                Self::default()
            },
        }
    }
}

/// The built-in helper functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Helper {
    /// `currency(n)`: grouped, two decimal places
    Currency,
    /// `currencyDec(n)`: the two fractional digits of `currency(n)`
    CurrencyDec,
    /// `currencyWhole(n)`: grouped, rounded to a whole number
    CurrencyWhole,
    /// `parseCurrency(s)`: localized text back to a number
    ParseCurrency,
    /// `strCapitalize(s)`: uppercase first character
    StrCapitalize,
    /// `strNoDash(s)`: remove every `-`
    StrNoDash,
    /// `strTrim(s)`: trim surrounding whitespace
    StrTrim,
}

impl Helper {
    /// All helpers, in registration order.
    pub const ALL: [Helper; 7] = [
        Helper::Currency,
        Helper::CurrencyDec,
        Helper::CurrencyWhole,
        Helper::ParseCurrency,
        Helper::StrCapitalize,
        Helper::StrNoDash,
        Helper::StrTrim,
    ];

    /// Identifier used in expressions.
    pub fn name(&self) -> &'static str {
        match self {
            Helper::Currency => "currency",
            Helper::CurrencyDec => "currencyDec",
            Helper::CurrencyWhole => "currencyWhole",
            Helper::ParseCurrency => "parseCurrency",
            Helper::StrCapitalize => "strCapitalize",
            Helper::StrNoDash => "strNoDash",
            Helper::StrTrim => "strTrim",
        }
    }

    /// Look a helper up by its expression identifier.
    pub fn from_name(name: &str) -> Option<Helper> {
        Helper::ALL.iter().copied().find(|h| h.name() == name)
    }
}

/// Helper implementations bound to a number locale.
#[derive(Debug, Clone, Default)]
pub struct Helpers {
    locale: NumberLocale,
}

impl Helpers {
    /// Create helpers for the given locale.
    pub fn new(locale: NumberLocale) -> Self {
        Self { locale }
    }

    /// The locale numbers are formatted with.
    pub fn locale(&self) -> &NumberLocale {
        &self.locale
    }

    /// Invoke a helper. Only the first argument is used.
    pub fn call(&self, helper: Helper, arg: &Value) -> Value {
        log::trace!("  {}({})", helper.name(), arg);
        match helper {
            Helper::Currency => Value::String(self.currency(arg)),
            Helper::CurrencyDec => Value::String(self.currency_dec(arg)),
            Helper::CurrencyWhole => Value::String(self.currency_whole(arg)),
            Helper::ParseCurrency => self.parse_currency(arg),
            Helper::StrCapitalize => str_capitalize(arg),
            Helper::StrNoDash => str_no_dash(arg),
            Helper::StrTrim => str_trim(arg),
        }
    }

    /// Format as a grouped number with exactly two decimal places.
    pub fn currency(&self, value: &Value) -> String {
        match value {
            Value::Undefined => "0.00".to_string(),
            other => self.format_fixed(self.numeric(other), 2),
        }
    }

    /// The fractional digits of [`currency`](Self::currency).
    pub fn currency_dec(&self, value: &Value) -> String {
        let cur = self.currency(value);
        if cur == "NaN" {
            return cur;
        }
        let chars: Vec<char> = cur.chars().collect();
        chars[chars.len().saturating_sub(2)..].iter().collect()
    }

    /// Format as a grouped whole number, rounding to nearest.
    pub fn currency_whole(&self, value: &Value) -> String {
        match value {
            Value::Undefined => "0".to_string(),
            other => self.format_fixed(self.numeric(other), 0),
        }
    }

    /// Parse localized currency text back into a number.
    ///
    /// Empty and missing values are `0`; non-strings pass through unchanged.
    pub fn parse_currency(&self, value: &Value) -> Value {
        match value {
            Value::Undefined | Value::Null => Value::Number(0.0),
            Value::String(s) if s.is_empty() => Value::Number(0.0),
            Value::String(s) => Value::Number(self.parse_currency_str(s)),
            other => other.clone(),
        }
    }

    fn parse_currency_str(&self, s: &str) -> f64 {
        let stripped: String = s.chars().filter(|&c| c != self.locale.grouping).collect();
        if s.contains(self.locale.decimal) {
            let normalized: String = stripped
                .chars()
                .map(|c| if c == self.locale.decimal { '.' } else { c })
                .collect();
            parse_float_prefix(&normalized)
        } else {
            parse_int_prefix(&stripped)
        }
    }

    fn numeric(&self, value: &Value) -> f64 {
        match value {
            Value::String(s) if s.is_empty() => 0.0,
            Value::String(s) => self.parse_currency_str(s),
            other => other.to_number(),
        }
    }

    /// Format `n` with `digits` fraction digits, rounding half away from zero
    /// on the shortest decimal representation of `n`.
    pub fn format_fixed(&self, n: f64, digits: usize) -> String {
        if n.is_nan() {
            return "NaN".to_string();
        }
        if n.is_infinite() {
            return if n > 0.0 { "∞" } else { "-∞" }.to_string();
        }

        let (int_digits, frac_digits) = round_decimal(&format!("{}", n.abs()), digits);
        let is_zero = int_digits.bytes().all(|b| b == b'0') && frac_digits.bytes().all(|b| b == b'0');

        let mut out = String::new();
        if n < 0.0 && !is_zero {
            out.push('-');
        }
        out.push_str(&group_digits(&int_digits, self.locale.grouping));
        if digits > 0 {
            out.push(self.locale.decimal);
            out.push_str(&frac_digits);
        }
        out
    }
}

/// Round a plain decimal string (`"1234.5678"`) to `digits` fraction digits.
///
/// Returns the integer and fraction digit strings.
fn round_decimal(plain: &str, digits: usize) -> (String, String) {
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain, ""));
    let mut all: Vec<u8> = int_part.bytes().collect();
    let int_len = all.len();

    let frac_bytes = frac_part.as_bytes();
    for i in 0..digits {
        all.push(*frac_bytes.get(i).unwrap_or(&b'0'));
    }

    if frac_bytes.get(digits).is_some_and(|&b| b >= b'5') {
        let mut i = all.len();
        loop {
            if i == 0 {
                all.insert(0, b'1');
                break;
            }
            i -= 1;
            if all[i] == b'9' {
                all[i] = b'0';
            } else {
                all[i] += 1;
                break;
            }
        }
    }

    let split = all.len() - digits;
    debug_assert!(split >= int_len);
    let int_digits = String::from_utf8_lossy(&all[..split]).into_owned();
    let frac_digits = String::from_utf8_lossy(&all[split..]).into_owned();
    (int_digits, frac_digits)
}

fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

/// Parse the longest numeric prefix, like `parseFloat`.
pub fn parse_float_prefix(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
    }

    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;
    if bytes.get(end) == Some(&b'.') {
        let dot = end;
        end += 1;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        mantissa_digits += end - dot - 1;
        if mantissa_digits == 0 {
            end = dot;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// Parse the leading decimal integer, like `parseInt(s, 10)`.
pub fn parse_int_prefix(s: &str) -> f64 {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let digits_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if end == digits_start {
        return f64::NAN;
    }
    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// Uppercase the first character of a string.
pub fn str_capitalize(value: &Value) -> Value {
    match value {
        Value::String(s) if !s.is_empty() => {
            let mut chars = s.chars();
            let first: String = chars.next().map(|c| c.to_uppercase().collect()).unwrap_or_default();
            Value::String(first + chars.as_str())
        },
        other => other.clone(),
    }
}

/// Remove every dash from a string.
pub fn str_no_dash(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace('-', "")),
        other => other.clone(),
    }
}

/// Trim leading and trailing whitespace from a string.
pub fn str_trim(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helpers() -> Helpers {
        Helpers::new(NumberLocale::from_tag("en-GB"))
    }

    #[test]
    fn test_helper_names_round_trip() {
        for helper in Helper::ALL {
            assert_eq!(Helper::from_name(helper.name()), Some(helper));
        }
        assert_eq!(Helper::from_name("badFunc"), None);
    }

    #[test]
    fn test_currency() {
        let h = helpers();
        assert_eq!(h.currency(&Value::Number(1234.56)), "1,234.56");
        assert_eq!(h.currency(&Value::Number(1234.0)), "1,234.00");
        assert_eq!(h.currency(&Value::from("1234.56")), "1,234.56");
        assert_eq!(h.currency(&Value::from("1234")), "1,234.00");
        assert_eq!(h.currency(&Value::Null), "0.00");
        assert_eq!(h.currency(&Value::Undefined), "0.00");
        assert_eq!(h.currency(&Value::from("")), "0.00");
        assert_eq!(h.currency(&Value::Number(0.0)), "0.00");
        assert_eq!(h.currency(&Value::from("foo")), "NaN");
    }

    #[test]
    fn test_currency_rounding() {
        let h = helpers();
        assert_eq!(h.currency(&Value::Number(1.005)), "1.01");
        assert_eq!(h.currency(&Value::Number(0.999)), "1.00");
        assert_eq!(h.currency(&Value::Number(999999.995)), "1,000,000.00");
        assert_eq!(h.currency(&Value::Number(-1234.5)), "-1,234.50");
        assert_eq!(h.currency(&Value::Number(-0.001)), "0.00");
    }

    #[test]
    fn test_currency_dec() {
        let h = helpers();
        assert_eq!(h.currency_dec(&Value::Number(1234.56)), "56");
        assert_eq!(h.currency_dec(&Value::Number(1234.0)), "00");
        assert_eq!(h.currency_dec(&Value::from("1234.56")), "56");
        assert_eq!(h.currency_dec(&Value::Null), "00");
        assert_eq!(h.currency_dec(&Value::Undefined), "00");
        assert_eq!(h.currency_dec(&Value::from("")), "00");
        assert_eq!(h.currency_dec(&Value::from("foo")), "NaN");
    }

    #[test]
    fn test_currency_whole() {
        let h = helpers();
        assert_eq!(h.currency_whole(&Value::Number(1234.56)), "1,235");
        assert_eq!(h.currency_whole(&Value::Number(1234.0)), "1,234");
        assert_eq!(h.currency_whole(&Value::from("1234.56")), "1,235");
        assert_eq!(h.currency_whole(&Value::from("1234")), "1,234");
        assert_eq!(h.currency_whole(&Value::Null), "0");
        assert_eq!(h.currency_whole(&Value::Undefined), "0");
        assert_eq!(h.currency_whole(&Value::from("")), "0");
        assert_eq!(h.currency_whole(&Value::from("foo")), "NaN");
    }

    #[test]
    fn test_parse_currency() {
        let h = helpers();
        assert_eq!(h.parse_currency(&Value::from("1234.56")), Value::Number(1234.56));
        assert_eq!(h.parse_currency(&Value::from("1,234.56")), Value::Number(1234.56));
        assert_eq!(h.parse_currency(&Value::from("1,234,567.89")), Value::Number(1234567.89));
        assert_eq!(h.parse_currency(&Value::from("1234")), Value::Number(1234.0));
        assert_eq!(h.parse_currency(&Value::from("0")), Value::Number(0.0));
        assert_eq!(h.parse_currency(&Value::Null), Value::Number(0.0));
        assert_eq!(h.parse_currency(&Value::Undefined), Value::Number(0.0));
        assert_eq!(h.parse_currency(&Value::from("")), Value::Number(0.0));
        assert_eq!(h.parse_currency(&Value::Number(7.0)), Value::Number(7.0));
        assert!(h.parse_currency(&Value::from("foo")).to_number().is_nan());
    }

    #[test]
    fn test_german_locale() {
        let h = Helpers::new(NumberLocale::from_tag("de-DE"));
        assert_eq!(h.currency(&Value::Number(1234.56)), "1.234,56");
        assert_eq!(h.parse_currency(&Value::from("1.234,56")), Value::Number(1234.56));
        assert_eq!(h.currency_whole(&Value::Number(1234567.0)), "1.234.567");
    }

    #[test]
    fn test_unknown_locale_falls_back() {
        assert_eq!(NumberLocale::from_tag("xx-XX"), NumberLocale::default());
    }

    #[test]
    fn test_str_capitalize() {
        assert_eq!(str_capitalize(&Value::from("dublin")), Value::from("Dublin"));
        assert_eq!(str_capitalize(&Value::from("d")), Value::from("D"));
        assert_eq!(str_capitalize(&Value::from("")), Value::from(""));
        assert_eq!(str_capitalize(&Value::Null), Value::Null);
        assert_eq!(str_capitalize(&Value::Undefined), Value::Undefined);
        assert_eq!(str_capitalize(&Value::Number(1234.0)), Value::Number(1234.0));
    }

    #[test]
    fn test_str_no_dash() {
        assert_eq!(str_no_dash(&Value::from("d-u-b-l-i-n")), Value::from("dublin"));
        assert_eq!(str_no_dash(&Value::from("-dublin-")), Value::from("dublin"));
        assert_eq!(str_no_dash(&Value::from("")), Value::from(""));
        assert_eq!(str_no_dash(&Value::Null), Value::Null);
        assert_eq!(str_no_dash(&Value::Number(1234.0)), Value::Number(1234.0));
    }

    #[test]
    fn test_str_trim() {
        assert_eq!(str_trim(&Value::from(" dublin ")), Value::from("dublin"));
        assert_eq!(str_trim(&Value::from("  ")), Value::from(""));
        assert_eq!(str_trim(&Value::Undefined), Value::Undefined);
        assert_eq!(str_trim(&Value::Number(1234.0)), Value::Number(1234.0));
    }

    #[test]
    fn test_parse_prefixes() {
        assert_eq!(parse_float_prefix("12.5abc"), 12.5);
        assert_eq!(parse_float_prefix("  -3"), -3.0);
        assert_eq!(parse_float_prefix("1e3x"), 1000.0);
        assert!(parse_float_prefix(".").is_nan());
        assert_eq!(parse_int_prefix("42px"), 42.0);
        assert!(parse_int_prefix("abc").is_nan());
    }
}
