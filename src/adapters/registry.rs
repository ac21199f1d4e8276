use {
    super::{
        mercado_pago::{MercadoPagoNormalizer, client::MercadoPagoApi},
        stripe::{StripeNormalizer, client::StripeApi, signature::SignatureVerifier},
    },
    crate::{
        config::Config,
        domain::{
            error::EngineError,
            gateway::{Gateway, GatewayNormalizer},
        },
    },
    std::{collections::HashMap, sync::Arc},
};

/// Static map from gateway to its normalizer, fixed at startup.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    normalizers: HashMap<Gateway, Arc<dyn GatewayNormalizer>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, normalizer: Arc<dyn GatewayNormalizer>) -> Self {
        self.normalizers.insert(normalizer.gateway(), normalizer);
        self
    }

    /// Registers every gateway whose credentials are configured.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let mut registry = Self::new();

        if let Some(stripe) = &config.stripe {
            registry = registry.with(Arc::new(StripeNormalizer::new(
                SignatureVerifier::new(&stripe.webhook_secret, stripe.signature_tolerance_secs),
                Arc::new(StripeApi::new(&stripe.secret_key)),
                config.default_currency.clone(),
            )));
        }

        if let Some(mp) = &config.mercado_pago {
            let api = MercadoPagoApi::new(&mp.api_url, &mp.access_token, config.webhook_timeout)?;
            registry = registry.with(Arc::new(MercadoPagoNormalizer::new(
                Arc::new(api),
                config.default_currency.clone(),
            )));
        }

        Ok(registry)
    }

    /// Lookup by route slug; unknown and unconfigured gateways both miss.
    pub fn resolve(&self, slug: &str) -> Option<Arc<dyn GatewayNormalizer>> {
        let gateway = Gateway::from_slug(slug)?;
        self.normalizers.get(&gateway).cloned()
    }

    pub fn gateways(&self) -> Vec<Gateway> {
        let mut gateways: Vec<_> = self.normalizers.keys().copied().collect();
        gateways.sort_by_key(|g| g.as_str());
        gateways
    }
}
