//! Balance reconciliation: currency-aware parsing, signed differences and
//! exact equality checks between the ledger's computed closing balance and
//! the balance the statement reports.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Cannot parse balance from '{0}'")]
    InvalidBalance(String),

    #[error("Currency mismatch: '{left}' vs '{right}'")]
    CurrencyMismatch { left: String, right: String },
}

/// A balance split into currency code (possibly empty) and exact amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBalance {
    pub currency: String,
    pub amount: Decimal,
}

/// Accepts `CCC 123.45`, `123.45 CCC`, `CCC123.45` and bare `123.45`;
/// comma thousands-separators are stripped, negative amounts allowed.
pub fn parse_balance(input: &str) -> Result<ParsedBalance, ReconcileError> {
    let cleaned = input.trim().replace(',', "");
    if cleaned.is_empty() {
        return Err(ReconcileError::InvalidBalance(input.to_string()));
    }

    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    match tokens.as_slice() {
        [single] => parse_single_token(single, input),
        [first, second] => {
            if let Ok(amount) = parse_amount(second) {
                Ok(ParsedBalance {
                    currency: first.to_string(),
                    amount,
                })
            } else if let Ok(amount) = parse_amount(first) {
                Ok(ParsedBalance {
                    currency: second.to_string(),
                    amount,
                })
            } else {
                Err(ReconcileError::InvalidBalance(input.to_string()))
            }
        }
        _ => Err(ReconcileError::InvalidBalance(input.to_string())),
    }
}

fn parse_single_token(token: &str, original: &str) -> Result<ParsedBalance, ReconcileError> {
    if let Ok(amount) = parse_amount(token) {
        return Ok(ParsedBalance {
            currency: String::new(),
            amount,
        });
    }

    // Prefixed form like `CHF123.45`: alphabetic run followed by the amount.
    let split = token
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    if split == 0 || split == token.len() {
        return Err(ReconcileError::InvalidBalance(original.to_string()));
    }

    let (currency, rest) = token.split_at(split);
    let amount =
        parse_amount(rest).map_err(|_| ReconcileError::InvalidBalance(original.to_string()))?;
    Ok(ParsedBalance {
        currency: currency.to_string(),
        amount,
    })
}

fn parse_amount(token: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str_exact(token)
}

/// Returns the shared currency of two balances, or a mismatch error when
/// both name different non-empty currencies. Never coerced silently.
fn common_currency<'a>(
    a: &'a ParsedBalance,
    b: &'a ParsedBalance,
) -> Result<&'a str, ReconcileError> {
    match (a.currency.is_empty(), b.currency.is_empty()) {
        (true, _) => Ok(b.currency.as_str()),
        (_, true) => Ok(a.currency.as_str()),
        _ if a.currency == b.currency => Ok(a.currency.as_str()),
        _ => Err(ReconcileError::CurrencyMismatch {
            left: a.currency.clone(),
            right: b.currency.clone(),
        }),
    }
}

/// Formats the signed difference `actual - expected`, e.g. `CHF +5.50`.
pub fn difference(expected: &str, actual: &str) -> Result<String, ReconcileError> {
    let expected = parse_balance(expected)?;
    let actual = parse_balance(actual)?;
    let currency = common_currency(&expected, &actual)?;

    let delta = actual.amount - expected.amount;
    let sign = if delta.is_sign_negative() { "-" } else { "+" };
    if currency.is_empty() {
        Ok(format!("{}{}", sign, delta.abs()))
    } else {
        Ok(format!("{} {}{}", currency, sign, delta.abs()))
    }
}

/// Exact equality only; no tolerance.
pub fn matches(a: &str, b: &str) -> Result<bool, ReconcileError> {
    let a = parse_balance(a)?;
    let b = parse_balance(b)?;
    common_currency(&a, &b)?;
    Ok(a.amount == b.amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_supported_formats() {
        for input in ["CHF 123.45", "123.45 CHF", "CHF123.45"] {
            let parsed = parse_balance(input).unwrap();
            assert_eq!(parsed.currency, "CHF", "input: {input}");
            assert_eq!(parsed.amount, Decimal::new(12345, 2), "input: {input}");
        }

        let bare = parse_balance("123.45").unwrap();
        assert_eq!(bare.currency, "");
        assert_eq!(bare.amount, Decimal::new(12345, 2));
    }

    #[test]
    fn test_parse_strips_thousands_separators() {
        let parsed = parse_balance("CHF 1,234,567.89").unwrap();
        assert_eq!(parsed.amount, Decimal::new(123456789, 2));
    }

    #[test]
    fn test_parse_negative_amount() {
        let parsed = parse_balance("-250.00 EUR").unwrap();
        assert_eq!(parsed.currency, "EUR");
        assert_eq!(parsed.amount, Decimal::new(-25000, 2));
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_balance("").is_err());
        assert!(parse_balance("CHF").is_err());
        assert!(parse_balance("one two three").is_err());
        assert!(parse_balance("12.3.4").is_err());
    }

    #[test]
    fn test_difference_positive_and_negative() {
        assert_eq!(difference("CHF 100.00", "CHF 105.50").unwrap(), "CHF +5.50");
        assert_eq!(difference("CHF 100.00", "CHF 95.00").unwrap(), "CHF -5.00");
    }

    #[test]
    fn test_difference_zero_keeps_plus_sign() {
        assert_eq!(difference("CHF 50.00", "CHF 50.00").unwrap(), "CHF +0.00");
    }

    #[test]
    fn test_difference_adopts_single_named_currency() {
        assert_eq!(difference("100.00", "CHF 105.00").unwrap(), "CHF +5.00");
        assert_eq!(difference("100.00", "105.00").unwrap(), "+5.00");
    }

    #[test]
    fn test_currency_mismatch_is_hard_error() {
        let err = difference("CHF 100.00", "EUR 100.00").unwrap_err();
        assert_eq!(
            err,
            ReconcileError::CurrencyMismatch {
                left: "CHF".to_string(),
                right: "EUR".to_string(),
            }
        );

        // Mismatch fires regardless of amounts being equal.
        assert!(matches("CHF 1.00", "EUR 1.00").is_err());
    }

    #[test]
    fn test_matches_exact_equality_only() {
        assert!(matches("CHF 100.00", "CHF 100.00").unwrap());
        assert!(!matches("CHF 100.00", "CHF 100.01").unwrap());
        assert!(matches("CHF 100.00", "100.00").unwrap());
    }
}
