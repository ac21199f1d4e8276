use {
    super::{
        gateway::Gateway,
        id::{CorrelationToken, GatewayNativeId},
        money::{Currency, MoneyAmount},
        object_ref::{ObjectRef, ObjectType},
        status::TargetStatus,
    },
    uuid::Uuid,
};

/// How the dispatcher finds the subscription or purchase an event is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    Token(CorrelationToken),
    /// Gateway-side subscription id, matched against `subscriptions.external_id`.
    ExternalSubscription(String),
}

impl Correlation {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Token(token) => token.object_type(),
            Self::ExternalSubscription(_) => ObjectType::Subscription,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Token(token) => token.as_str(),
            Self::ExternalSubscription(id) => id,
        }
    }
}

/// Gateway-agnostic view of one webhook delivery.
#[derive(Debug, Clone)]
pub struct NormalizedEvent {
    pub gateway: Gateway,
    /// `type` for Stripe, topic for Mercado Pago.
    pub gateway_event_type: String,
    /// Status word in the gateway's own vocabulary.
    pub gateway_status: String,
    /// `None` for informational events that never move an entity.
    pub target: Option<TargetStatus>,
    pub amount: MoneyAmount,
    pub currency: Option<Currency>,
    pub correlation: Option<Correlation>,
    pub native_id: GatewayNativeId,
    /// Gateway subscription id to bind onto a subscription still missing one.
    pub subscription_external_id: Option<String>,
    pub raw: serde_json::Value,
}

impl NormalizedEvent {
    pub fn object_type(&self) -> ObjectType {
        self.correlation
            .as_ref()
            .map(Correlation::object_type)
            .unwrap_or(ObjectType::Unknown)
    }

    /// Status recorded in the event log: the internal status when mapped,
    /// the gateway's word otherwise.
    pub fn log_status(&self) -> String {
        match self.target {
            Some(target) => target.as_str().to_string(),
            None => self.gateway_status.clone(),
        }
    }
}

/// Append-only audit row.
#[derive(Debug, Clone)]
pub struct NewEventLog {
    pub id: Uuid,
    pub gateway: Option<Gateway>,
    pub customer_id: Option<i64>,
    pub object: ObjectRef,
    pub status: String,
    pub currency: Option<Currency>,
    pub amount: MoneyAmount,
    pub description: String,
    pub payload: Option<serde_json::Value>,
}

impl NewEventLog {
    /// Row for a delivery that could not be tied to any entity.
    pub fn unknown(
        gateway: Option<Gateway>,
        status: impl Into<String>,
        description: impl Into<String>,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            gateway,
            customer_id: None,
            object: ObjectRef::Unknown,
            status: status.into(),
            currency: None,
            amount: MoneyAmount::ZERO,
            description: description.into(),
            payload,
        }
    }

    /// Row for a normalized event, linked to its entity when one was resolved.
    pub fn for_event(
        event: &NormalizedEvent,
        entity: Option<(ObjectRef, i64)>,
        description: impl Into<String>,
    ) -> Self {
        let (object, customer_id) = match entity {
            Some((object, customer_id)) => (object, Some(customer_id)),
            None => (ObjectRef::Unknown, None),
        };

        Self {
            id: Uuid::now_v7(),
            gateway: Some(event.gateway),
            customer_id,
            object,
            status: event.log_status(),
            currency: event.currency.clone(),
            amount: event.amount,
            description: description.into(),
            payload: Some(event.raw.clone()),
        }
    }
}
