//! Card expiry helpers for the visible `MM/YY` input.
//!
//! The widget only renders the card number and CVV fields; the expiry lives in a
//! plain input on the merchant form, so its formatting and validation happen here.

/// Normalise raw expiry input into `MM/YY` shape.
///
/// Non-digits are dropped, at most four digits are kept and a `/` is inserted
/// once a third digit is present. Applying it twice gives the same result.
pub fn format_expiry(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).take(4).collect();

    if digits.len() <= 2 {
        return digits;
    }

    format!("{}/{}", &digits[..2], &digits[2..])
}

/// Build an `MM/YY` value from widget autofill data.
///
/// Returns an empty string when either part is missing.
pub fn pad_expiry(month: &str, year: &str) -> String {
    let month = month.trim();
    let year = year.trim();
    if month.is_empty() || year.is_empty() {
        return String::new();
    }

    let padded = format!("0{month}");
    let mm = last_chars(&padded, 2);
    let yy = last_chars(year, 2);
    format!("{mm}/{yy}")
}

/// `true` iff `value` is exactly `MM/YY` with a month between 01 and 12.
pub fn is_expiry_valid(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b'/' {
        return false;
    }
    if ![0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit()) {
        return false;
    }

    let month = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
    (1..=12).contains(&month)
}

/// Split a formatted expiry into `(month, year)` for tokenization.
pub(crate) fn split_expiry(value: &str) -> (String, String) {
    let mut parts = value.split('/');
    let month = parts.next().unwrap_or_default().to_string();
    let year = parts.next().unwrap_or_default().to_string();
    (month, year)
}

fn last_chars(value: &str, n: usize) -> &str {
    let count = value.chars().count();
    match value.char_indices().nth(count.saturating_sub(n)) {
        Some((idx, _)) => &value[idx..],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "")]
    #[case("1", "1")]
    #[case("12", "12")]
    #[case("123", "12/3")]
    #[case("1234", "12/34")]
    #[case("123456", "12/34")]
    #[case("12/34", "12/34")]
    #[case("ab0 9-2x7", "09/27")]
    #[case("/", "")]
    fn formats_expiry(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_expiry(raw), expected);
    }

    #[test]
    fn format_is_idempotent_and_bounded() {
        let samples = ["", "0", "07", "072", "0725", "07255", "99999999", "1/2/3/4", "x1y"];
        for raw in samples {
            let once = format_expiry(raw);
            assert!(once.len() <= 5, "{raw:?} -> {once:?}");
            assert_eq!(format_expiry(&once), once);
        }
    }

    #[rstest]
    #[case("7", "2027", "07/27")]
    #[case("12", "27", "12/27")]
    #[case("01", "2030", "01/30")]
    #[case("", "2027", "")]
    #[case("7", "", "")]
    #[case(" ", " ", "")]
    fn pads_autofill_expiry(#[case] month: &str, #[case] year: &str, #[case] expected: &str) {
        assert_eq!(pad_expiry(month, year), expected);
    }

    #[rstest]
    #[case("07/25", true)]
    #[case("01/00", true)]
    #[case("12/99", true)]
    #[case("13/25", false)]
    #[case("00/25", false)]
    #[case("7/25", false)]
    #[case("07/2025", false)]
    #[case("07-25", false)]
    #[case("0a/25", false)]
    #[case("", false)]
    fn validates_expiry(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(is_expiry_valid(value), valid);
    }

    #[test]
    fn splits_expiry_parts() {
        assert_eq!(split_expiry("09/27"), ("09".into(), "27".into()));
        assert_eq!(split_expiry("09"), ("09".into(), String::new()));
        assert_eq!(split_expiry(""), (String::new(), String::new()));
    }
}
