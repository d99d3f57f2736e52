//! Unit conversion and display helpers.
//!
//! Amounts are carried as decimal strings of the smallest unit and only
//! converted with exact integer arithmetic. USD values are advisory and use
//! floating point.

use alloy::primitives::U256;

/// Parse a raw amount (base-10 integer string) into a `U256`.
///
/// Returns `None` for empty strings, signs, fractions or values above 2^256-1.
pub fn parse_raw_amount(amount_raw: &str) -> Option<U256> {
    let trimmed = amount_raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(trimmed, 10).ok()
}

/// Format a raw amount with proper decimal places, e.g. `("1500000", 6)` -> `"1.5"`.
///
/// Unparseable input formats as `"0"`.
pub fn format_amount(amount_raw: &str, decimals: u8) -> String {
    let digits = parse_raw_amount(amount_raw)
        .unwrap_or(U256::ZERO)
        .to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let (whole, fractional) = if digits.len() > decimals {
        let (w, f) = digits.split_at(digits.len() - decimals);
        (w.to_string(), f.to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };

    let trimmed = fractional.trim_end_matches('0');
    if trimmed.is_empty() {
        whole
    } else {
        format!("{}.{}", whole, trimmed)
    }
}

/// USD value of a human-readable amount. Display only.
pub fn usd_value(amount: &str, price_usd: f64) -> f64 {
    if !price_usd.is_finite() {
        return 0.0;
    }
    match amount.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() => amount * price_usd,
        _ => 0.0,
    }
}

/// Render a dollar amount with a magnitude suffix for very large values.
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() || value == 0.0 {
        return "$0.00".to_string();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();

    if abs < 0.000_001 {
        return format!("{sign}${abs:.2e}");
    }
    if abs < 0.01 {
        return format!("{sign}${abs:.6}");
    }

    const SUFFIXES: [(f64, &str); 6] = [
        (1e18, "Qi"),
        (1e15, "Qa"),
        (1e12, "T"),
        (1e9, "B"),
        (1e6, "M"),
        (1e3, "K"),
    ];
    for (scale, suffix) in SUFFIXES {
        if abs >= scale {
            return format!("{sign}${}{suffix}", group_fixed(abs / scale, 2));
        }
    }

    format!("{sign}${}", group_fixed(abs, 2))
}

/// Shorten a human-readable amount for tables: six fractional digits for
/// values of at least one, eight below that, trailing zeros dropped and
/// thousands separated. Works on the string, so nothing is rounded through
/// floating point.
pub fn format_quantity(amount: &str) -> String {
    let amount = amount.trim();
    let (whole, fractional) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return amount.to_string();
    }

    let whole = whole.trim_start_matches('0');
    let whole = if whole.is_empty() { "0" } else { whole };
    let precision = if whole == "0" { 8 } else { 6 };
    let fractional: String = fractional.chars().take(precision).collect();
    let fractional = fractional.trim_end_matches('0');

    if fractional.is_empty() {
        group_thousands(whole)
    } else {
        format!("{}.{}", group_thousands(whole), fractional)
    }
}

fn group_fixed(value: f64, precision: usize) -> String {
    let rendered = format!("{value:.precision$}");
    match rendered.split_once('.') {
        Some((whole, fractional)) => format!("{}.{}", group_thousands(whole), fractional),
        None => group_thousands(&rendered),
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
