//! Number and text formatting utilities.

/// Format an amount in the given currency.
///
/// USD gets a `$` prefix, anything else a trailing ISO code.
#[must_use]
pub fn format_money(value: f64, currency: &str) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    match currency {
        "" | "USD" => format!("{sign}${abs:.2}"),
        other => format!("{sign}{abs:.2} {other}"),
    }
}

/// Shorten text to at most `max` characters, marking the cut with `…`.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_money_usd() {
        assert_eq!(format_money(70.08, "USD"), "$70.08");
        assert_eq!(format_money(0.0, ""), "$0.00");
        assert_eq!(format_money(-3.5, "USD"), "-$3.50");
    }

    #[test]
    fn format_money_other_currency() {
        assert_eq!(format_money(12.0, "EUR"), "12.00 EUR");
    }

    #[test]
    fn truncate_long_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("abc", 0), "");
    }
}
