//! Structured contract reference numbers
//!
//! A reference is a 10 digit base number followed by a 2 digit mod-97 check,
//! printed as `+++ddd/dddd/dddcc+++`. A remainder of 0 is written as 97.

use crate::error::{CalcResult, CalculationError};

const BASE_DIGITS: usize = 10;
const MAX_BASE: u64 = 9_999_999_999;

fn check_digits(number: u64) -> u64 {
    match number % 97 {
        0 => 97,
        r => r,
    }
}

fn invalid(value: &str, reason: impl Into<String>) -> CalculationError {
    CalculationError::InvalidReference {
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Format `number` as a structured reference
pub fn contract_reference_number(number: u64) -> CalcResult<String> {
    if number > MAX_BASE {
        return Err(invalid(&number.to_string(), "more than 10 digits"));
    }

    let digits = format!("{:010}{:02}", number, check_digits(number));
    Ok(format!("+++{}/{}/{}+++", &digits[0..3], &digits[3..7], &digits[7..12]))
}

/// Base number of a structured reference, after checking its check digits
///
/// The `+++` markers and slashes are optional; surrounding whitespace is ignored.
pub fn parse_contract_reference(reference: &str) -> CalcResult<u64> {
    let trimmed = reference.trim();
    let inner = trimmed
        .strip_prefix("+++")
        .and_then(|s| s.strip_suffix("+++"))
        .unwrap_or(trimmed);
    let digits: String = inner.chars().filter(|c| *c != '/').collect();

    if digits.len() != BASE_DIGITS + 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid(reference, "expected 12 digits"));
    }

    let (base, check) = digits.split_at(BASE_DIGITS);
    let base: u64 = base.parse().map_err(|_| invalid(reference, "bad base number"))?;
    let check: u64 = check.parse().map_err(|_| invalid(reference, "bad check digits"))?;

    let expected = check_digits(base);
    if check != expected {
        return Err(invalid(
            reference,
            format!("check digits {:02}, expected {:02}", check, expected),
        ));
    }
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_reference() {
        // 123456789 % 97 = 39
        assert_eq!(contract_reference_number(123_456_789).unwrap(), "+++012/3456/78939+++");
        assert_eq!(contract_reference_number(1).unwrap(), "+++000/0000/00101+++");
    }

    #[test]
    fn test_remainder_zero_uses_97() {
        assert_eq!(contract_reference_number(97).unwrap(), "+++000/0000/09797+++");
        assert_eq!(contract_reference_number(0).unwrap(), "+++000/0000/00097+++");
    }

    #[test]
    fn test_check_digits_survive_formatting() {
        for number in [1, 96, 97, 194, 4_242_424_242, MAX_BASE] {
            let reference = contract_reference_number(number).unwrap();
            let digits: String = reference.chars().filter(|c| c.is_ascii_digit()).collect();
            let check: u64 = digits[10..].parse().unwrap();
            assert_eq!(check, if number % 97 == 0 { 97 } else { number % 97 });
            assert_eq!(parse_contract_reference(&reference).unwrap(), number);
        }
    }

    #[test]
    fn test_parse_rejects_bad_references() {
        assert!(contract_reference_number(MAX_BASE + 1).is_err());
        assert!(parse_contract_reference("+++000/1234/56780+++").is_err());
        assert!(parse_contract_reference("+++000/1234/567+++").is_err());
        assert!(parse_contract_reference("+++000/12a4/56789+++").is_err());
        assert_eq!(parse_contract_reference(" 012345678939 ").unwrap(), 123_456_789);
    }
}
