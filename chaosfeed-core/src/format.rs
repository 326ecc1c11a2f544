//! Display formatting shared by logs and the command line.

/// Four decimals below 10, two otherwise.
pub fn format_price(price: f64) -> String {
    if price.abs() < 10.0 {
        format!("{price:.4}")
    } else {
        format!("{price:.2}")
    }
}

pub fn format_token_price(price: f64) -> String {
    format!("{price:.8}")
}

/// Two decimals with thousands separators, sign first: `-1,234.50`.
pub fn format_money(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}
