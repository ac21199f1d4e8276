use {
    super::{error::EngineError, event::NormalizedEvent},
    axum::http::HeaderMap,
    serde::{Deserialize, Serialize},
    std::{fmt, future::Future, pin::Pin},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gateway {
    Stripe,
    MercadoPago,
}

impl Gateway {
    /// Storage value, as in `plans.gateway`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::MercadoPago => "mercado_pago",
        }
    }

    /// Path segment of the webhook route.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::MercadoPago => "mercado-pago",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "stripe" => Some(Self::Stripe),
            "mercado-pago" | "mercado_pago" | "mercadopago" => Some(Self::MercadoPago),
            _ => None,
        }
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Gateway {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::from_slug(s)
            .ok_or_else(|| EngineError::Validation(format!("unknown gateway: {s}")))
    }
}

/// The request as it reached the webhook route.
#[derive(Debug, Clone)]
pub struct RawWebhook {
    pub headers: HeaderMap,
    pub body: String,
}

/// What the gateway expects back when an event matches no local entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvedPolicy {
    /// Answer 2xx so the gateway stops re-delivering noise.
    Acknowledge,
    /// Answer 404.
    NotFound,
}

/// Per-gateway parsing, authentication and status mapping.
///
/// Implementations may call the gateway API to re-fetch resources but never
/// touch local storage.
pub trait GatewayNormalizer: Send + Sync {
    fn gateway(&self) -> Gateway;

    fn normalize<'a>(
        &'a self,
        raw: &'a RawWebhook,
    ) -> Pin<Box<dyn Future<Output = Result<NormalizedEvent, EngineError>> + Send + 'a>>;

    fn unresolved_policy(&self) -> UnresolvedPolicy;
}
