use {
    crate::domain::money::Currency,
    std::{env, net::SocketAddr, time::Duration},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub webhook_secret: String,
    pub secret_key: String,
    pub signature_tolerance_secs: i64,
}

#[derive(Debug, Clone)]
pub struct MercadoPagoConfig {
    pub access_token: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

/// Immutable process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// `None` keeps the Stripe route unregistered.
    pub stripe: Option<StripeConfig>,
    pub mercado_pago: Option<MercadoPagoConfig>,
    pub webhook_timeout: Duration,
    pub system_log_api_enabled: bool,
    pub default_currency: Currency,
    pub email: Option<EmailConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_addr = parse_or(&get, "BIND_ADDR", "0.0.0.0:3000".parse::<SocketAddr>().ok())?;

        let stripe = match get("STRIPE_WEBHOOK_SECRET") {
            Some(webhook_secret) => Some(StripeConfig {
                webhook_secret,
                secret_key: get("STRIPE_SECRET_KEY")
                    .ok_or(ConfigError::Missing("STRIPE_SECRET_KEY"))?,
                signature_tolerance_secs: parse_or(
                    &get,
                    "STRIPE_SIGNATURE_TOLERANCE_SECS",
                    Some(300),
                )?,
            }),
            None => None,
        };

        let mercado_pago = get("MERCADO_PAGO_ACCESS_TOKEN").map(|access_token| MercadoPagoConfig {
            access_token,
            api_url: get("MERCADO_PAGO_API_URL")
                .unwrap_or_else(|| "https://api.mercadopago.com".to_string()),
        });

        let timeout_ms: u64 = parse_or(&get, "WEBHOOK_TIMEOUT_MS", Some(8000))?;

        let system_log_api_enabled = match get("SYSTEM_LOG_API_ENABLED") {
            Some(v) => parse_bool("SYSTEM_LOG_API_ENABLED", &v)?,
            None => false,
        };

        let default_currency = {
            let raw = get("DEFAULT_CURRENCY").unwrap_or_else(|| "USD".to_string());
            Currency::new(&raw).map_err(|e| ConfigError::Invalid {
                key: "DEFAULT_CURRENCY",
                value: raw.clone(),
                reason: e.to_string(),
            })?
        };

        let email = match (get("EMAIL_API_URL"), get("EMAIL_API_KEY")) {
            (Some(api_url), Some(api_key)) => Some(EmailConfig {
                api_url,
                api_key,
                from: get("EMAIL_FROM").ok_or(ConfigError::Missing("EMAIL_FROM"))?,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            bind_addr,
            stripe,
            mercado_pago,
            webhook_timeout: Duration::from_millis(timeout_ms),
            system_log_api_enabled,
            default_currency,
            email,
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => default.ok_or(ConfigError::Missing(key)),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected a boolean".into(),
        }),
    }
}
