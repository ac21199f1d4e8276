use {
    super::error::EngineError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Tag stored next to an `object_id` in the ledger and event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectType {
    General,
    Unknown,
    Bonus,
    Subscription,
    CreditPurchase,
    Voucher,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Unknown => "unknown",
            Self::Bonus => "bonus",
            Self::Subscription => "subscription",
            Self::CreditPurchase => "credit-purchase",
            Self::Voucher => "voucher",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "general" => Ok(Self::General),
            "unknown" => Ok(Self::Unknown),
            "bonus" => Ok(Self::Bonus),
            "subscription" => Ok(Self::Subscription),
            "credit-purchase" => Ok(Self::CreditPurchase),
            "voucher" => Ok(Self::Voucher),
            other => Err(EngineError::Validation(format!(
                "unknown object type: {other}"
            ))),
        }
    }
}

/// Polymorphic back-reference carried by ledger and event rows.
///
/// There is no foreign key behind it: the referenced entity may be gone
/// while its log rows stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    Subscription(i64),
    CreditPurchase(i64),
    /// Bonus grant, optionally tied to the subscription or purchase id that produced it.
    Bonus(Option<i64>),
    /// Voucher grant, optionally tied to the plan id.
    Voucher(Option<i64>),
    General,
    Unknown,
}

impl ObjectRef {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Subscription(_) => ObjectType::Subscription,
            Self::CreditPurchase(_) => ObjectType::CreditPurchase,
            Self::Bonus(_) => ObjectType::Bonus,
            Self::Voucher(_) => ObjectType::Voucher,
            Self::General => ObjectType::General,
            Self::Unknown => ObjectType::Unknown,
        }
    }

    pub fn object_id(&self) -> Option<i64> {
        match self {
            Self::Subscription(id) | Self::CreditPurchase(id) => Some(*id),
            Self::Bonus(id) | Self::Voucher(id) => *id,
            Self::General | Self::Unknown => None,
        }
    }

    /// Rebuild from the stored `(object_type, object_id)` pair.
    pub fn from_parts(object_type: ObjectType, object_id: Option<i64>) -> Result<Self, EngineError> {
        match (object_type, object_id) {
            (ObjectType::Subscription, Some(id)) => Ok(Self::Subscription(id)),
            (ObjectType::CreditPurchase, Some(id)) => Ok(Self::CreditPurchase(id)),
            (ObjectType::Subscription | ObjectType::CreditPurchase, None) => Err(
                EngineError::Validation(format!("{object_type} reference requires an id")),
            ),
            (ObjectType::Bonus, id) => Ok(Self::Bonus(id)),
            (ObjectType::Voucher, id) => Ok(Self::Voucher(id)),
            (ObjectType::General, _) => Ok(Self::General),
            (ObjectType::Unknown, _) => Ok(Self::Unknown),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object_id() {
            Some(id) => write!(f, "{}.{id}", self.object_type()),
            None => write!(f, "{}", self.object_type()),
        }
    }
}
