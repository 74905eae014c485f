//! Monetary string → standardized number.
use regex::Regex;
use std::sync::LazyLock;

static CURRENCY_AND_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)R\$|US\$|€|\$|\s").expect("static currency pattern"));

/// Lower-cased multiplier words, Portuguese and English.
const MULTIPLIERS: &[(&str, f64)] = &[
    ("k", 1e3),
    ("mil", 1e3),
    ("thousand", 1e3),
    ("m", 1e6),
    ("mi", 1e6),
    ("milhão", 1e6),
    ("milhões", 1e6),
    ("million", 1e6),
    ("b", 1e9),
    ("bi", 1e9),
    ("bilhão", 1e9),
    ("bilhões", 1e9),
    ("billion", 1e9),
    ("t", 1e12),
    ("tri", 1e12),
    ("trilhão", 1e12),
    ("trilhões", 1e12),
    ("trillion", 1e12),
];

fn multiplier_for(token: &str) -> f64 {
    MULTIPLIERS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, m)| *m)
        .unwrap_or(1.0)
}

/// Convert a raw figure such as `"R$ 2,3 bi"` or `"$500 million"` to a plain
/// number. Returns `None` when no number can be read.
///
/// When both `.` and `,` appear the string is read European-style
/// (`123.456,78`); otherwise `,` is the decimal point.
///
/// ```
/// use aum_pipeline::normalize::normalize_aum_value;
///
/// assert_eq!(normalize_aum_value("R$ 2,3 bi"), Some(2.3e9));
/// assert_eq!(normalize_aum_value("Invalid Text"), None);
/// ```
pub fn normalize_aum_value(raw: &str) -> Option<f64> {
    let text = raw.to_lowercase();
    if !text.is_empty() && text.chars().all(char::is_alphabetic) {
        return None;
    }

    let stripped = CURRENCY_AND_SPACE.replace_all(&text, "");
    let decimal = if stripped.contains('.') && stripped.contains(',') {
        stripped.replace('.', "").replace(',', ".")
    } else {
        stripped.replace(',', ".")
    };

    let (number, multiplier): (String, String) = decimal
        .chars()
        .partition(|c| c.is_ascii_digit() || *c == '.');

    let value: f64 = number.parse().ok()?;
    Some(value * multiplier_for(&multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_fixtures() {
        let cases: [(&str, Option<f64>); 7] = [
            ("R$ 2,3 bi", Some(2.3e9)),
            ("$500 million", Some(5.0e8)),
            ("1.5 trilhão", Some(1.5e12)),
            ("US$ 100,5 mil", Some(1.005e5)),
            ("€ 123.456,78", Some(123456.78)),
            ("25b", Some(2.5e10)),
            ("Invalid Text", None),
        ];
        for (raw, expected) in cases {
            assert_eq!(normalize_aum_value(raw), expected, "input {raw:?}");
        }
    }

    #[test]
    fn unknown_suffix_keeps_the_number() {
        assert_eq!(normalize_aum_value("42 dólares"), Some(42.0));
        assert_eq!(normalize_aum_value("R$ 500 milhões"), Some(5.0e8));
    }

    #[test]
    fn unreadable_numbers() {
        assert_eq!(normalize_aum_value(""), None);
        assert_eq!(normalize_aum_value("NAO_DISPONIVEL"), None);
        assert_eq!(normalize_aum_value("1.2.3 bi"), None);
        assert_eq!(normalize_aum_value("bilhões"), None);
    }
}
