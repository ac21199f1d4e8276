use {
    super::error::EngineError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Amount in minor units (cents). Never negative: direction lives in the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub const ZERO: MoneyAmount = MoneyAmount(0);

    pub fn new(cents: i64) -> Result<Self, EngineError> {
        if cents < 0 {
            return Err(EngineError::Validation(format!(
                "MoneyAmount cannot be negative, got: {cents}"
            )));
        }
        Ok(Self(cents))
    }

    /// Gateways that report decimal major units (Mercado Pago: `49.9`).
    pub fn from_major(major: f64) -> Result<Self, EngineError> {
        if !major.is_finite() {
            return Err(EngineError::Validation(format!(
                "MoneyAmount must be finite, got: {major}"
            )));
        }
        let cents = (major * 100.0).round();
        if cents > i64::MAX as f64 {
            return Err(EngineError::Validation(format!(
                "MoneyAmount overflow: {major}"
            )));
        }
        Self::new(cents as i64)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 code, stored upper-case. No conversion happens anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, EngineError> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(EngineError::Validation(format!(
                "currency must be a 3-letter code, got: {code}"
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amount_rejected() {
        assert!(MoneyAmount::new(-1).is_err());
        assert_eq!(MoneyAmount::new(0).unwrap(), MoneyAmount::ZERO);
    }

    #[test]
    fn major_units_round_to_cents() {
        assert_eq!(MoneyAmount::from_major(49.9).unwrap().cents(), 4990);
        assert_eq!(MoneyAmount::from_major(0.015).unwrap().cents(), 2);
        assert!(MoneyAmount::from_major(f64::NAN).is_err());
        assert!(MoneyAmount::from_major(-3.0).is_err());
    }

    #[test]
    fn currency_is_normalized_to_upper_case() {
        assert_eq!(Currency::new("brl").unwrap().as_str(), "BRL");
        assert!(Currency::new("reais").is_err());
        assert!(Currency::new("u$d").is_err());
    }
}
