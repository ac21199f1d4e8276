//! Operator-side entry points. They go through the same ledger and state
//! machine as webhooks, so the admin UI gets the same guarantees.

use {
    crate::{
        domain::{
            error::EngineError,
            event::NewEventLog,
            id::GatewayNativeId,
            ledger::{LedgerOutcome, LedgerRequest},
            money::MoneyAmount,
            object_ref::ObjectRef,
            status::TargetStatus,
        },
        infra::postgres::{self, event_repo},
        services::{
            ledger,
            notifier::{self, CreditNotice, Notifier},
            state_machine::{self, TransitionInput, TransitionOutcome},
        },
    },
    chrono::Utc,
    sqlx::PgPool,
    std::sync::Arc,
    uuid::Uuid,
};

/// Manual credit log entry, positive or negative. Debits obey the non-negative balance rule.
pub async fn record_manual_credit(
    pool: &PgPool,
    notifier: &Arc<dyn Notifier>,
    customer_id: i64,
    amount: i64,
    description: Option<String>,
) -> Result<LedgerOutcome, EngineError> {
    let request = LedgerRequest {
        customer_id,
        amount,
        object: ObjectRef::General,
        is_refund: false,
        dedup_key: None,
        description,
    };
    apply_and_notify(pool, notifier, request).await
}

/// Bonus credits without a plan behind them.
pub async fn add_bonus_credits(
    pool: &PgPool,
    notifier: &Arc<dyn Notifier>,
    customer_id: i64,
    amount: i64,
) -> Result<LedgerOutcome, EngineError> {
    if amount <= 0 {
        return Err(EngineError::Validation(format!(
            "bonus amount must be positive, got {amount}"
        )));
    }
    let request = LedgerRequest {
        customer_id,
        amount,
        object: ObjectRef::Bonus(None),
        is_refund: false,
        dedup_key: None,
        description: Some("bonus credits".into()),
    };
    apply_and_notify(pool, notifier, request).await
}

/// Operator-forced status change. `reference` keys any ledger rows, so
/// repeating a call with the same reference never grants twice.
pub async fn set_status(
    pool: &PgPool,
    notifier: &Arc<dyn Notifier>,
    object: ObjectRef,
    target: TargetStatus,
    reference: &str,
) -> Result<TransitionOutcome, EngineError> {
    let native_id = GatewayNativeId::new(format!("admin.{reference}"))?;

    let mut tx = postgres::begin(pool).await?;
    let (entity, outcome) = state_machine::transition(
        &mut tx,
        object,
        TransitionInput {
            target: Some(target),
            native_id: &native_id,
            external_id: None,
        },
        Utc::now(),
    )
    .await?;

    let entry = NewEventLog {
        id: Uuid::now_v7(),
        gateway: None,
        customer_id: Some(entity.customer_id()),
        object,
        status: target.as_str().to_string(),
        currency: Some(entity.plan().currency.clone()),
        amount: MoneyAmount::ZERO,
        description: format!(
            "admin {reference}: {} -> {target} ({})",
            entity.status_str(),
            outcome.as_str()
        ),
        payload: None,
    };
    event_repo::append(&mut *tx, &entry).await?;
    tx.commit().await?;

    if let TransitionOutcome::Advanced { ledger, .. } = &outcome {
        let notices = ledger
            .iter()
            .filter_map(|(req, out)| CreditNotice::from_outcome(req, out))
            .collect();
        notifier::dispatch(notifier, notices);
    }

    Ok(outcome)
}

async fn apply_and_notify(
    pool: &PgPool,
    notifier: &Arc<dyn Notifier>,
    request: LedgerRequest,
) -> Result<LedgerOutcome, EngineError> {
    let outcome = ledger::apply_standalone(pool, &request).await?;
    if let Some(notice) = CreditNotice::from_outcome(&request, &outcome) {
        notifier::dispatch(notifier, vec![notice]);
    }
    Ok(outcome)
}
