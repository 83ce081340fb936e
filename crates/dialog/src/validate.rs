//! Input validators shared by dialog handlers.
//!
//! A failed validation re-prompts in the same state; none of these touch
//! the session.

/// Country calling code prefixed to national numbers.
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Digits in a one-time password.
pub const DEFAULT_OTP_LEN: usize = 6;

const PHONE_MIN_DIGITS: usize = 8;
const PHONE_MAX_DIGITS: usize = 15;
const NATIONAL_DIGITS: usize = 10;

/// Normalize a phone number to `+<digits>`.
///
/// Spaces, dashes, dots and parentheses are dropped.  A leading `+` marks
/// an international number; otherwise a national trunk `0` is removed and
/// `country_code` is prefixed, unless the digits already carry it.
/// Returns `None` unless the result has 8 to 15 digits.
pub fn normalize_phone(input: &str, country_code: &str) -> Option<String> {
    let compact: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let (international, digits) = match compact.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, compact.as_str()),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let full = if international {
        digits.to_string()
    } else if digits.len() > NATIONAL_DIGITS && digits.starts_with(country_code) {
        digits.to_string()
    } else {
        let national = digits.strip_prefix('0').unwrap_or(digits);
        format!("{country_code}{national}")
    };

    (PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS)
        .contains(&full.len())
        .then(|| format!("+{full}"))
}

/// Exactly `len` ASCII digits, surrounding whitespace ignored.
pub fn validate_otp(input: &str, len: usize) -> bool {
    let otp = input.trim();
    otp.len() == len && otp.chars().all(|c| c.is_ascii_digit())
}

/// Card / booking / ticket reference: 4 to 20 ASCII alphanumerics.
pub fn is_valid_reference(input: &str) -> bool {
    let reference = input.trim();
    (4..=20).contains(&reference.len()) && reference.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn national_number_gets_country_code() {
        assert_eq!(
            normalize_phone("9876543210", DEFAULT_COUNTRY_CODE).as_deref(),
            Some("+919876543210")
        );
        assert_eq!(
            normalize_phone("098765 43210", DEFAULT_COUNTRY_CODE).as_deref(),
            Some("+919876543210")
        );
    }

    #[test]
    fn formatting_characters_are_ignored() {
        assert_eq!(
            normalize_phone(" (987) 654-3210 ", "91").as_deref(),
            Some("+919876543210")
        );
    }

    #[test]
    fn international_number_is_kept() {
        assert_eq!(
            normalize_phone("+44 20 7946 0958", "91").as_deref(),
            Some("+442079460958")
        );
        assert_eq!(
            normalize_phone("919876543210", "91").as_deref(),
            Some("+919876543210")
        );
    }

    #[test]
    fn length_bounds_are_enforced() {
        assert!(normalize_phone("12", "91").is_none());
        assert!(normalize_phone("+1234567", "91").is_none());
        assert!(normalize_phone("+12345678", "91").is_some());
        assert!(normalize_phone("+1234567890123456", "91").is_none());
    }

    #[test]
    fn letters_are_rejected() {
        assert!(normalize_phone("98765abc10", "91").is_none());
        assert!(normalize_phone("", "91").is_none());
        assert!(normalize_phone("+", "91").is_none());
    }

    #[test]
    fn otp_must_have_exact_length() {
        assert!(validate_otp("123456", DEFAULT_OTP_LEN));
        assert!(validate_otp(" 123456 ", DEFAULT_OTP_LEN));
        assert!(!validate_otp("12345", DEFAULT_OTP_LEN));
        assert!(!validate_otp("12345a", DEFAULT_OTP_LEN));
        assert!(validate_otp("1234", 4));
    }

    #[test]
    fn references() {
        assert!(is_valid_reference("PNR4X9"));
        assert!(!is_valid_reference("AB1"));
        assert!(!is_valid_reference("AB-1234"));
        assert!(!is_valid_reference(&"A".repeat(21)));
    }
}
