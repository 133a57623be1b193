use {
    super::error::SettlementError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Monetary value in minor units (cents). Always non-negative; all arithmetic
/// is checked so a misconfigured price can never wrap into a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(cents: i64) -> Result<Self, SettlementError> {
        if cents < 0 {
            return Err(SettlementError::Validation(format!(
                "MoneyAmount cannot be negative, got: {cents}"
            )));
        }
        Ok(Self(cents))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn checked_add(self, other: MoneyAmount) -> Option<MoneyAmount> {
        self.0.checked_add(other.0).map(MoneyAmount)
    }

    /// Subtraction clamped at zero — a discount can never push a total negative.
    pub fn saturating_sub(self, other: MoneyAmount) -> MoneyAmount {
        MoneyAmount((self.0 - other.0).max(0))
    }

    /// floor(self * numerator / 100), integer-only. Used for percent discounts
    /// and tax so re-running with the same inputs is byte-identical.
    pub fn percent_floor(self, numerator: i64) -> Option<MoneyAmount> {
        self.0
            .checked_mul(numerator)
            .map(|v| MoneyAmount(v / 100))
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Krw,
    Usd,
    Eur,
    Jpy,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Krw => "KRW",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Jpy => "JPY",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Currency {
    type Error = SettlementError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "KRW" => Ok(Self::Krw),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "JPY" => Ok(Self::Jpy),
            other => Err(SettlementError::Validation(format!(
                "unknown currency: {other}"
            ))),
        }
    }
}
