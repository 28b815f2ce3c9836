// Lacs / rupee helpers

/// 1 Lac = 100,000 rupees.
pub const RUPEES_PER_LAC: f64 = 100_000.0;

pub fn lacs_to_rupees(lacs: f64) -> f64 {
    lacs * RUPEES_PER_LAC
}

/// Indian digit grouping, rounded to whole rupees: 12345678 -> "1,23,45,678".
pub fn format_inr(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let sign = if rounded < 0 { "-" } else { "" };
    let digits = rounded.unsigned_abs().to_string();

    if digits.len() <= 3 {
        return format!("{}{}", sign, digits);
    }

    let (rest, last3) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = rest;
    while rest.len() > 2 {
        let (head, tail) = rest.split_at(rest.len() - 2);
        groups.push(tail);
        rest = head;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();

    format!("{}{},{}", sign, groups.join(","), last3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_inr_grouping() {
        assert_eq!(format_inr(0.0), "0");
        assert_eq!(format_inr(999.0), "999");
        assert_eq!(format_inr(1000.0), "1,000");
        assert_eq!(format_inr(100000.0), "1,00,000");
        assert_eq!(format_inr(12345678.0), "1,23,45,678");
        assert_eq!(format_inr(6250000.4), "62,50,000");
        assert_eq!(format_inr(-1234567.0), "-12,34,567");
    }

    #[test]
    fn test_lacs_conversion() {
        assert_eq!(lacs_to_rupees(62.5), 6_250_000.0);
    }
}
