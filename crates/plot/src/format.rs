/// Formats a value for axis ticks and tooltips.
///
/// - `|v| >= 1e6` after rounding: millions with an `M` suffix (`2.5M`)
/// - `|v| >= 1e3` after rounding: thousands with a `k` suffix (`12.3k`)
/// - `0 < |v| < 0.01`: scientific notation, one decimal (`4.2e-3`)
/// - otherwise: at most one decimal, thousands grouped with `,`
///
/// Non-finite values render as an em dash.
pub fn format_value(v: f64) -> String {
    if !v.is_finite() {
        return "\u{2014}".to_string();
    }
    let a = v.abs();
    // Unit follows the rounded magnitude: 999_999 reads 1M.
    if round_tenths(a / 1e3) >= 1e3 {
        format!("{}M", grouped(v / 1e6))
    } else if round_tenths(a) >= 1e3 {
        format!("{}k", grouped(v / 1e3))
    } else if a < 0.01 && v != 0.0 {
        format!("{v:.1e}")
    } else {
        grouped(v)
    }
}

fn round_tenths(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// One decimal at most, trailing `.0` dropped, `,` between thousands.
fn grouped(v: f64) -> String {
    let tenths = (v.abs() * 10.0).round() as u64;
    let whole = tenths / 10;
    let frac = tenths % 10;

    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 3);
    if v < 0.0 && tenths > 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if frac != 0 {
        out.push('.');
        out.push(char::from(b'0' + frac as u8));
    }
    out
}
