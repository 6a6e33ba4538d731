/// Drop the trailing `\n` / `\r\n` a line reader leaves in place.
pub fn trim_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Parse a decimal written with a comma separator (`"1234,56"`).
/// Surrounding whitespace from fixed-width padding is ignored. `nan` and
/// `inf` spellings are not amounts.
pub fn parse_comma_decimal(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Shortest text that round-trips `value`; integral values keep a trailing `.0`
/// (`1500.0`, `0.1`, `102750.0`). Very small or large values use a signed,
/// two-digit exponent (`1e-05`, `1.5e+16`).
pub fn format_amount(value: f64) -> String {
    let repr = format!("{:?}", value);
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}
