use {
    super::{error::EngineError, object_ref::ObjectType},
    derive_more::Display,
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

/// Opaque reference echoed back by the gateway: `"<object-type-slug>.<uuid4>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Mint a fresh token for a subscription or credit purchase.
    pub fn generate(object_type: ObjectType) -> Self {
        Self(format!("{}.{}", object_type.as_str(), Uuid::new_v4()))
    }

    pub fn parse(raw: impl Into<String>) -> Result<Self, EngineError> {
        let raw = raw.into();
        let (slug, uuid) = raw.split_once('.').ok_or_else(|| {
            EngineError::Validation(format!("correlation token must be <type>.<uuid>, got: {raw}"))
        })?;

        match ObjectType::try_from(slug)? {
            ObjectType::Subscription | ObjectType::CreditPurchase => {}
            other => {
                return Err(EngineError::Validation(format!(
                    "correlation token cannot reference {other}"
                )));
            }
        }

        Uuid::parse_str(uuid)
            .map_err(|e| EngineError::Validation(format!("invalid token uuid {uuid}: {e}")))?;

        Ok(Self(raw))
    }

    pub fn object_type(&self) -> ObjectType {
        // parse() guarantees a known slug before the first dot.
        self.0
            .split_once('.')
            .and_then(|(slug, _)| ObjectType::try_from(slug).ok())
            .unwrap_or(ObjectType::Unknown)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Gateway-side id of the charge/invoice/preapproval cycle an event reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayNativeId(String);

impl GatewayNativeId {
    pub fn new(id: impl Into<String>) -> Result<Self, EngineError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(EngineError::MalformedPayload(
                "gateway native id must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_parses_back() {
        let token = CorrelationToken::generate(ObjectType::Subscription);
        let parsed = CorrelationToken::parse(token.as_str()).unwrap();
        assert_eq!(parsed, token);
        assert_eq!(parsed.object_type(), ObjectType::Subscription);
    }

    #[test]
    fn credit_purchase_token() {
        let token =
            CorrelationToken::parse("credit-purchase.3fae1c2e-8b4a-4c1e-9d6f-2a7b9c0d1e2f").unwrap();
        assert_eq!(token.object_type(), ObjectType::CreditPurchase);
    }

    #[test]
    fn rejects_bogus_tokens() {
        assert!(CorrelationToken::parse("bogus").is_err());
        assert!(CorrelationToken::parse("subscription.not-a-uuid").is_err());
        assert!(
            CorrelationToken::parse("bonus.3fae1c2e-8b4a-4c1e-9d6f-2a7b9c0d1e2f").is_err()
        );
    }

    #[test]
    fn native_id_must_not_be_blank() {
        assert!(GatewayNativeId::new("  ").is_err());
        assert_eq!(GatewayNativeId::new("pi_123").unwrap().as_str(), "pi_123");
    }
}
