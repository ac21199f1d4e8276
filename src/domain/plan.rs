use {
    super::{error::EngineError, gateway::Gateway, money::Currency},
    chrono::TimeDelta,
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyType {
    Day,
    Week,
    Month,
    Quarter,
    SemiAnnual,
    Year,
}

impl FrequencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::SemiAnnual => "semi_annual",
            Self::Year => "year",
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::SemiAnnual => 182,
            Self::Year => 365,
        }
    }
}

impl fmt::Display for FrequencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for FrequencyType {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "quarter" => Ok(Self::Quarter),
            "semi_annual" => Ok(Self::SemiAnnual),
            "year" => Ok(Self::Year),
            other => Err(EngineError::Validation(format!(
                "unknown frequency type: {other}"
            ))),
        }
    }
}

/// Billing period length. A non-positive amount yields zero days.
pub fn frequency_in_days(frequency: FrequencyType, amount: i32) -> i64 {
    if amount <= 0 {
        return 0;
    }
    frequency.days() * i64::from(amount)
}

/// Catalog entry a subscription or credit purchase is bought against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub id: i64,
    pub name: String,
    pub gateway: Gateway,
    pub external_id: Option<String>,
    pub currency: Currency,
    pub price_cents: i64,
    pub credits: i64,
    pub bonus: i64,
    pub frequency_type: FrequencyType,
    pub frequency_amount: i32,
}

impl Plan {
    pub fn frequency_in_days(&self) -> i64 {
        frequency_in_days(self.frequency_type, self.frequency_amount)
    }

    /// One billing period as a time span.
    pub fn period(&self) -> Result<TimeDelta, EngineError> {
        TimeDelta::try_days(self.frequency_in_days()).ok_or_else(|| self.period_error())
    }

    pub(crate) fn period_error(&self) -> EngineError {
        EngineError::Validation(format!(
            "plan {} period of {} x {} is out of range",
            self.id, self.frequency_amount, self.frequency_type
        ))
    }
}
