use {
    crate::{
        adapters::registry::GatewayRegistry,
        domain::{
            billing::Billable,
            error::EngineError,
            event::{NewEventLog, NormalizedEvent},
            gateway::{Gateway, GatewayNormalizer, RawWebhook, UnresolvedPolicy},
        },
        infra::postgres::{self, billing_repo, event_repo},
        services::{
            notifier::{self, CreditNotice, Notifier},
            state_machine::{self, TransitionInput, TransitionOutcome},
        },
    },
    chrono::Utc,
    serde_json::{Value, json},
    sqlx::PgPool,
    std::{sync::Arc, time::Duration},
};

/// Successful webhook outcomes. Failures come back as `EngineError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookReply {
    /// Event reached its entity; carries the transition outcome.
    Processed(&'static str),
    /// No entity matched and the gateway expects a 2xx anyway.
    Ignored,
}

impl WebhookReply {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Processed(outcome) => outcome,
            Self::Ignored => "ignored",
        }
    }
}

pub struct WebhookDispatcher {
    pool: PgPool,
    registry: GatewayRegistry,
    notifier: Arc<dyn Notifier>,
    budget: Duration,
}

impl WebhookDispatcher {
    pub fn new(
        pool: PgPool,
        registry: GatewayRegistry,
        notifier: Arc<dyn Notifier>,
        budget: Duration,
    ) -> Self {
        Self {
            pool,
            registry,
            notifier,
            budget,
        }
    }

    /// One delivery, start to finish, within the wall-clock budget.
    ///
    /// Network re-fetches happen before the transaction opens. Hitting the
    /// budget drops whatever is in flight, including an open transaction,
    /// which rolls it back.
    #[tracing::instrument(
        name = "webhook.dispatch",
        skip_all,
        fields(
            gateway = slug,
            event_type = tracing::field::Empty,
            native_id = tracing::field::Empty,
        )
    )]
    pub async fn handle(&self, slug: &str, raw: RawWebhook) -> Result<WebhookReply, EngineError> {
        let normalizer = self
            .registry
            .resolve(slug)
            .ok_or_else(|| EngineError::NotFound(format!("gateway {slug}")))?;

        match tokio::time::timeout(self.budget, self.process(normalizer.as_ref(), &raw)).await {
            Ok(result) => result,
            Err(_) => {
                let ms = u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(budget_ms = ms, "webhook budget exceeded, gateway will retry");
                Err(EngineError::Timeout(ms))
            }
        }
    }

    async fn process(
        &self,
        normalizer: &dyn GatewayNormalizer,
        raw: &RawWebhook,
    ) -> Result<WebhookReply, EngineError> {
        let gateway = normalizer.gateway();

        let event = match normalizer.normalize(raw).await {
            Ok(event) => event,
            Err(EngineError::Authentication(msg)) => {
                tracing::warn!("webhook rejected: {msg}");
                return Err(EngineError::Authentication(msg));
            }
            Err(EngineError::MalformedPayload(msg)) => {
                tracing::warn!("malformed webhook payload: {msg}");
                let entry = NewEventLog::unknown(
                    Some(gateway),
                    "malformed",
                    format!("malformed payload: {msg}"),
                    Some(raw_payload(&raw.body)),
                );
                event_repo::append(&self.pool, &entry).await?;
                return Err(EngineError::MalformedPayload(msg));
            }
            Err(EngineError::Gateway(msg)) => {
                tracing::error!("gateway re-fetch failed: {msg}");
                let entry = NewEventLog::unknown(
                    Some(gateway),
                    "error",
                    format!("failed to re-fetch from {gateway}: {msg}"),
                    Some(raw_payload(&raw.body)),
                );
                event_repo::append(&self.pool, &entry).await?;
                return Err(EngineError::Gateway(msg));
            }
            Err(e) => return Err(e),
        };

        tracing::Span::current()
            .record("event_type", tracing::field::display(&event.gateway_event_type))
            .record("native_id", tracing::field::display(&event.native_id));

        let policy = normalizer.unresolved_policy();
        let Some(correlation) = &event.correlation else {
            return self.unresolved(policy, &event, "no correlation reference").await;
        };

        let entity = match billing_repo::find_by_correlation(&self.pool, correlation).await? {
            Some(entity) if entity.plan().gateway == gateway => entity,
            Some(entity) => {
                let reason = format!(
                    "{} belongs to a {} plan",
                    entity.object_ref(),
                    entity.plan().gateway
                );
                return self.unresolved(policy, &event, &reason).await;
            }
            None => {
                let reason = format!("no entity for {}", correlation.as_str());
                return self.unresolved(policy, &event, &reason).await;
            }
        };

        let mut tx = postgres::begin(&self.pool).await?;
        let (entity, outcome) = state_machine::transition(
            &mut tx,
            entity.object_ref(),
            TransitionInput::from(&event),
            Utc::now(),
        )
        .await?;

        let entry = NewEventLog::for_event(
            &event,
            Some((entity.object_ref(), entity.customer_id())),
            describe(&event, &entity, &outcome),
        );
        event_repo::append(&mut *tx, &entry).await?;
        tx.commit().await?;

        if let TransitionOutcome::Advanced { ledger, .. } = &outcome {
            let notices = ledger
                .iter()
                .filter_map(|(request, result)| CreditNotice::from_outcome(request, result))
                .collect();
            notifier::dispatch(&self.notifier, notices);
        }

        Ok(WebhookReply::Processed(outcome.as_str()))
    }

    async fn unresolved(
        &self,
        policy: UnresolvedPolicy,
        event: &NormalizedEvent,
        reason: &str,
    ) -> Result<WebhookReply, EngineError> {
        tracing::info!(reason, "webhook matched no entity");
        let entry = NewEventLog::for_event(
            event,
            None,
            format!("{} {}: unresolved, {reason}", event.gateway, event.gateway_event_type),
        );
        event_repo::append(&self.pool, &entry).await?;

        match policy {
            UnresolvedPolicy::Acknowledge => Ok(WebhookReply::Ignored),
            UnresolvedPolicy::NotFound => Err(EngineError::NotFound(reason.to_string())),
        }
    }

    pub fn gateways(&self) -> Vec<Gateway> {
        self.registry.gateways()
    }
}

/// Body kept for forensics even when it is not JSON.
fn raw_payload(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| json!({ "body": body }))
}

fn describe(event: &NormalizedEvent, entity: &Billable, outcome: &TransitionOutcome) -> String {
    let head = format!(
        "{} {} for {} ({})",
        event.gateway,
        event.gateway_event_type,
        entity.object_ref(),
        event.gateway_status
    );

    match outcome {
        TransitionOutcome::Advanced { from, to, ledger } => {
            let mut text = format!("{head}: {from} -> {to}, {} ledger row(s)", ledger.len());
            for (requested, balance) in outcome.shortfalls() {
                text.push_str(&format!(
                    "; debit of {requested} refused, balance {balance}"
                ));
            }
            text
        }
        TransitionOutcome::SameStatus => format!("{head}: already {}", entity.status_str()),
        TransitionOutcome::Ignored => format!("{head}: informational"),
        TransitionOutcome::Anomaly { from, to } => {
            format!("{head}: anomaly, {from} -> {to} not allowed")
        }
    }
}
