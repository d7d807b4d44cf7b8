// 🔤 Display formatting for UF and CLP amounts (es-CL conventions)

/// UF amount with exactly three decimals: `1` → `"1.000 UF"`.
/// Non-finite values (NaN, or a product that overflowed to infinity) print
/// as zero rather than `inf UF`.
pub fn format_uf(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    format!("{:.3} UF", value)
}

/// Peso amount, no decimals, `.` as thousands separator: `3942800` → `"$3.942.800"`.
/// Non-finite values print as `"$0"`, same as [`format_uf`].
pub fn format_clp(value: f64) -> String {
    let value = if value.is_finite() { value.round() } else { 0.0 };
    let digits = format!("{:.0}", value.abs());
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}", sign, group_thousands(&digits, '.'))
}

/// Plain number as typed in the form (`100`, `37.5`)
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}

fn group_thousands(digits: &str, separator: char) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uf_always_three_decimals() {
        assert_eq!(format_uf(1.0), "1.000 UF");
        assert_eq!(format_uf(108.0), "108.000 UF");
        assert_eq!(format_uf(0.525), "0.525 UF");
        assert_eq!(format_uf(12.34567), "12.346 UF");
        assert_eq!(format_uf(f64::NAN), "0.000 UF");
    }

    #[test]
    fn test_clp_grouping() {
        assert_eq!(format_clp(3_942_800.0), "$3.942.800");
        assert_eq!(format_clp(60_000_000.0), "$60.000.000");
        assert_eq!(format_clp(999.0), "$999");
        assert_eq!(format_clp(1000.0), "$1.000");
        assert_eq!(format_clp(0.0), "$0");
    }

    #[test]
    fn test_clp_rounds_to_whole_pesos() {
        assert_eq!(format_clp(1234.5), "$1.235");
        assert_eq!(format_clp(1234.49), "$1.234");
        assert_eq!(format_clp(-1500.0), "-$1.500");
        assert_eq!(format_clp(f64::INFINITY), "$0");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(37.5), "37.5");
    }

    #[test]
    fn test_overflowed_estimates_print_as_zero() {
        let e = crate::FeeEngine::new(crate::RateTable::builtin());
        let est = e.compute_estimates("Vivienda unifamiliar", f64::MAX, f64::MAX, 0.0).unwrap();

        assert!(est.high.total_currency.is_infinite());
        assert_eq!(format_clp(est.high.total_currency), "$0");
        assert_eq!(format_uf(f64::MAX * 10.0), "0.000 UF");
    }
}
