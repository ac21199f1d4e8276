use {
    crate::{
        domain::{
            billing::{Billable, Decision},
            error::EngineError,
            event::NormalizedEvent,
            id::GatewayNativeId,
            ledger::{LedgerOutcome, LedgerRequest},
            object_ref::ObjectRef,
            status::{SubscriptionStatus, TargetStatus},
        },
        infra::postgres::billing_repo,
        services::ledger,
    },
    chrono::{DateTime, Utc},
};

type Tx<'c> = sqlx::Transaction<'c, sqlx::Postgres>;

/// What a caller asks of one entity.
#[derive(Debug, Clone, Copy)]
pub struct TransitionInput<'a> {
    pub target: Option<TargetStatus>,
    /// Keys the ledger rows this transition may produce.
    pub native_id: &'a GatewayNativeId,
    /// Gateway subscription id to bind when the entity has none.
    pub external_id: Option<&'a str>,
}

impl<'a> From<&'a NormalizedEvent> for TransitionInput<'a> {
    fn from(event: &'a NormalizedEvent) -> Self {
        Self {
            target: event.target,
            native_id: &event.native_id,
            external_id: event.subscription_external_id.as_deref(),
        }
    }
}

#[derive(Debug)]
pub enum TransitionOutcome {
    /// Status moved; every ledger request is paired with what the ledger did with it.
    Advanced {
        from: &'static str,
        to: TargetStatus,
        ledger: Vec<(LedgerRequest, LedgerOutcome)>,
    },
    /// Already in the requested status.
    SameStatus,
    /// No status carried for this entity (informational event).
    Ignored,
    /// Transition not allowed; nothing changed.
    Anomaly { from: &'static str, to: &'static str },
}

impl TransitionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advanced { .. } => "processed",
            Self::SameStatus => "unchanged",
            Self::Ignored => "logged",
            Self::Anomaly { .. } => "anomaly",
        }
    }

    /// Refused debits, as `(requested amount, balance at the time)`.
    pub fn shortfalls(&self) -> Vec<(i64, i64)> {
        match self {
            Self::Advanced { ledger, .. } => ledger
                .iter()
                .filter_map(|(req, out)| match out {
                    LedgerOutcome::InsufficientBalance { balance } => Some((req.amount, *balance)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Move one subscription or credit purchase, inside the caller's transaction.
///
/// The entity is re-read under `FOR UPDATE`, so two deliveries for the same
/// entity decide one after the other against fresh state.
#[tracing::instrument(name = "state_machine.transition", skip_all, fields(object = %object))]
pub async fn transition(
    tx: &mut Tx<'_>,
    object: ObjectRef,
    input: TransitionInput<'_>,
    now: DateTime<Utc>,
) -> Result<(Billable, TransitionOutcome), EngineError> {
    let entity = billing_repo::lock(tx, object)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("{object}")))?;

    if let (Billable::Subscription(sub), Some(external_id)) =
        (&entity, entity.external_id_to_bind(input.external_id))
    {
        if billing_repo::bind_external_id(tx, sub.id, external_id).await? {
            tracing::info!(external_id, "gateway subscription id bound");
        }
    }

    let outcome = match entity.decide(input.target, input.native_id, now)? {
        Decision::Ignore => TransitionOutcome::Ignored,
        Decision::SameStatus => {
            tracing::debug!(status = entity.status_str(), "status unchanged");
            TransitionOutcome::SameStatus
        }
        Decision::Anomaly { from, to } => {
            tracing::warn!(from, to, "invalid status transition, logged as anomaly");
            TransitionOutcome::Anomaly { from, to }
        }
        Decision::Advance(plan) => {
            let ledger = ledger::apply_batch(tx, plan.ledger).await?;
            for (request, outcome) in &ledger {
                if let LedgerOutcome::InsufficientBalance { balance } = outcome {
                    tracing::warn!(
                        requested = request.amount,
                        balance,
                        "status moves on while the debit is refused"
                    );
                }
            }

            // A re-delivered renewal finds every grant already written; expiry stays put.
            if is_replayed_renewal(plan.from, plan.to, &ledger) {
                tracing::debug!("renewal already applied, expiry unchanged");
                return Ok((entity, TransitionOutcome::SameStatus));
            }

            match (&entity, plan.to) {
                (Billable::Subscription(sub), TargetStatus::Subscription(status)) => {
                    billing_repo::update_subscription(tx, sub.id, status, plan.expire_at).await?;
                    if let Some(expire_at) = plan.expire_at {
                        if expire_at < now && ledger.iter().any(|(r, _)| r.is_refund) {
                            tracing::warn!(%expire_at, "refund moved expiry into the past");
                        }
                    }
                }
                (Billable::CreditPurchase(purchase), TargetStatus::CreditPurchase(status)) => {
                    billing_repo::update_purchase_status(tx, purchase.id, status).await?;
                }
                _ => {
                    return Err(EngineError::Validation(format!(
                        "{} cannot take status {}",
                        entity.object_ref(),
                        plan.to
                    )));
                }
            }

            tracing::info!(from = plan.from, to = %plan.to, "status advanced");
            TransitionOutcome::Advanced {
                from: plan.from,
                to: plan.to,
                ledger,
            }
        }
    };

    Ok((entity, outcome))
}

fn is_replayed_renewal(
    from: &str,
    to: TargetStatus,
    ledger: &[(LedgerRequest, LedgerOutcome)],
) -> bool {
    to == TargetStatus::Subscription(SubscriptionStatus::Active)
        && from == SubscriptionStatus::Active.as_str()
        && !ledger.is_empty()
        && ledger
            .iter()
            .all(|(_, outcome)| *outcome == LedgerOutcome::DuplicateSuppressed)
}
