use {
    super::error::EngineError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Initial,
    Analysis,
    Active,
    Suspended,
    Canceled,
    Failed,
    Rejected,
    ChargedBack,
    Refunded,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 9] = [
        Self::Initial,
        Self::Analysis,
        Self::Active,
        Self::Suspended,
        Self::Canceled,
        Self::Failed,
        Self::Rejected,
        Self::ChargedBack,
        Self::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Analysis => "analysis",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
            Self::ChargedBack => "charged_back",
            Self::Refunded => "refunded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Canceled | Self::Rejected | Self::ChargedBack | Self::Refunded
        )
    }

    /// Statuses that hold a grant a refund or charge-back can reverse.
    pub fn holds_grant(&self) -> bool {
        matches!(self, Self::Active | Self::Suspended)
    }

    /// `Active -> Active` is allowed: it is a renewal.
    pub fn can_transition_to(&self, next: &SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;

        match self {
            Initial => matches!(next, Analysis | Active | Failed),
            Analysis => matches!(next, Active | Failed | Rejected | Canceled | Suspended),
            Active => matches!(next, Active | Suspended | Canceled | ChargedBack | Refunded),
            Failed => matches!(next, Analysis | Active | Rejected | Canceled),
            Suspended => matches!(next, Active | Canceled | ChargedBack | Refunded),
            Canceled | Rejected | ChargedBack | Refunded => false,
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for SubscriptionStatus {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| EngineError::Validation(format!("unknown subscription status: {s}")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CreditPurchaseStatus {
    Initial,
    Analysis,
    Approved,
    Rejected,
    Canceled,
    Failed,
    ChargedBack,
    Refunded,
}

impl CreditPurchaseStatus {
    pub const ALL: [CreditPurchaseStatus; 8] = [
        Self::Initial,
        Self::Analysis,
        Self::Approved,
        Self::Rejected,
        Self::Canceled,
        Self::Failed,
        Self::ChargedBack,
        Self::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Analysis => "analysis",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
            Self::ChargedBack => "charged_back",
            Self::Refunded => "refunded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Canceled | Self::ChargedBack | Self::Refunded
        )
    }

    pub fn holds_grant(&self) -> bool {
        *self == Self::Approved
    }

    /// `Approved` only moves on to a refund or a charge-back.
    pub fn can_transition_to(&self, next: &CreditPurchaseStatus) -> bool {
        use CreditPurchaseStatus::*;

        match self {
            Initial => matches!(next, Analysis | Approved | Failed),
            Analysis => matches!(next, Approved | Rejected | Canceled | Failed),
            Failed => matches!(next, Analysis | Approved | Rejected | Canceled),
            Approved => matches!(next, Refunded | ChargedBack),
            Rejected | Canceled | ChargedBack | Refunded => false,
        }
    }
}

impl fmt::Display for CreditPurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for CreditPurchaseStatus {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                EngineError::Validation(format!("unknown credit purchase status: {s}"))
            })
    }
}

/// Internal status a normalized event asks its entity to move to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    Subscription(SubscriptionStatus),
    CreditPurchase(CreditPurchaseStatus),
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscription(s) => s.as_str(),
            Self::CreditPurchase(s) => s.as_str(),
        }
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
