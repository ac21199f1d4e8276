use {
    super::{id::GatewayNativeId, object_ref::ObjectRef},
    chrono::{DateTime, Utc},
    derive_more::Display,
    serde::Serialize,
    uuid::Uuid,
};

/// Idempotency key of one ledger row: object reference, gateway-native id,
/// and whether the row reverses a grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn new(object: ObjectRef, native_id: &GatewayNativeId, is_refund: bool) -> Self {
        let mut key = format!("{object}:{native_id}");
        if is_refund {
            key.push_str(":refund");
        }
        Self(key)
    }

    /// Bonus rows key on the entity that produced them, not on their own ref.
    pub fn bonus(parent: ObjectRef, native_id: &GatewayNativeId, is_refund: bool) -> Self {
        let mut key = format!("{parent}:{native_id}:bonus");
        if is_refund {
            key.push_str(":refund");
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One signed delta the LedgerAccountant is asked to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRequest {
    pub customer_id: i64,
    pub amount: i64,
    pub object: ObjectRef,
    pub is_refund: bool,
    pub dedup_key: Option<DedupKey>,
    pub description: Option<String>,
}

impl LedgerRequest {
    /// Delta produced by a gateway event, keyed for re-delivery suppression.
    pub fn keyed(
        customer_id: i64,
        amount: i64,
        object: ObjectRef,
        is_refund: bool,
        native_id: &GatewayNativeId,
    ) -> Self {
        Self {
            customer_id,
            amount,
            object,
            is_refund,
            dedup_key: Some(DedupKey::new(object, native_id, is_refund)),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    Applied { entry_id: Uuid, balance_after: i64 },
    /// Debit would push the balance below zero; nothing was written.
    InsufficientBalance { balance: i64 },
    /// A row with the same dedup key already exists for this customer.
    DuplicateSuppressed,
}

impl LedgerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::DuplicateSuppressed => "duplicate_suppressed",
        }
    }
}

/// Stored ledger row.
#[derive(Debug, Clone, Serialize)]
pub struct CreditLogEntry {
    pub id: Uuid,
    pub customer_id: i64,
    pub amount: i64,
    pub object_type: String,
    pub object_id: Option<i64>,
    pub is_refund: bool,
    pub dedup_key: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
