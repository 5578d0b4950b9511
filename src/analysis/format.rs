//! Rounding policy and es-CL number formatting.
//!
//! Every displayed value goes through [`display_round`]; percentage math always
//! uses raw sums. Rounding is half away from zero throughout.

/// Values this close to an integer are displayed as that integer.
pub const INTEGER_TOLERANCE: f64 = 1e-6;

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub fn display_round(value: f64) -> f64 {
    let nearest = value.round();
    if (value - nearest).abs() < INTEGER_TOLERANCE {
        nearest
    } else {
        round_to(value, 1)
    }
}

pub fn is_integral(value: f64) -> bool {
    (value - value.round()).abs() < INTEGER_TOLERANCE
}

/// `value / denominator * 100` rounded to one decimal, or `None` when the
/// denominator is zero or not finite.
pub fn percentage(value: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !value.is_finite() {
        return None;
    }
    Some(round_to(value / denominator * 100.0, 1))
}

/// Formats a number with `.` thousands separators and a `,` decimal mark.
pub fn format_number(value: f64) -> String {
    let rounded = display_round(value);
    let negative = rounded < 0.0;
    let magnitude = rounded.abs();

    let body = if is_integral(magnitude) {
        group_thousands(&format!("{magnitude:.0}"))
    } else {
        let fixed = format!("{magnitude:.1}");
        match fixed.split_once('.') {
            Some((int_part, frac_part)) => format!("{},{}", group_thousands(int_part), frac_part),
            None => group_thousands(&fixed),
        }
    };

    if negative && body != "0" {
        format!("-{body}")
    } else {
        body
    }
}

/// One decimal, decimal comma, trailing `%`.
pub fn format_percentage(pct: f64) -> String {
    let fixed = format!("{:.1}", round_to(pct, 1));
    format!("{}%", fixed.replace('.', ","))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_integers_collapse() {
        assert_eq!(display_round(40.0000001), 40.0);
        assert_eq!(display_round(12.34), 12.3);
        assert_eq!(display_round(12.25), 12.3);
        assert_eq!(display_round(-2.25), -2.3);
    }

    #[test]
    fn percentage_guards_zero_denominator() {
        assert_eq!(percentage(5.0, 0.0), None);
        assert_eq!(percentage(1.0, 3.0), Some(33.3));
        assert_eq!(percentage(2.0, 3.0), Some(66.7));
    }

    #[test]
    fn formats_with_spanish_separators() {
        assert_eq!(format_number(1234567.0), "1.234.567");
        assert_eq!(format_number(1234.56), "1.234,6");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(-1500.0), "-1.500");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_percentage(25.0), "25,0%");
        assert_eq!(format_percentage(7.25), "7,3%");
    }
}
