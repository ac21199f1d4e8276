use {
    crate::{
        domain::{
            error::EngineError,
            ledger::{LedgerOutcome, LedgerRequest},
        },
        infra::postgres::{self, ledger_repo},
    },
    sqlx::PgPool,
    std::collections::BTreeMap,
    uuid::Uuid,
};

/// Apply one signed delta inside the caller's transaction.
///
/// Order matters: the customer row is locked first, so the dedup check and
/// the conditional balance update cannot interleave with another writer for
/// the same customer. Nothing is written unless the outcome is `Applied`.
#[tracing::instrument(
    name = "ledger.apply",
    skip_all,
    fields(customer_id = request.customer_id, amount = request.amount, object = %request.object)
)]
pub async fn apply(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    request: &LedgerRequest,
) -> Result<LedgerOutcome, EngineError> {
    if request.amount == 0 {
        return Err(EngineError::Validation("ledger delta must not be zero".into()));
    }

    let balance = ledger_repo::lock_balance(tx, request.customer_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("customer {}", request.customer_id)))?;

    if let Some(key) = &request.dedup_key {
        if ledger_repo::dedup_key_exists(tx, request.customer_id, key.as_str()).await? {
            tracing::debug!(dedup_key = %key, "ledger delta already applied");
            return Ok(LedgerOutcome::DuplicateSuppressed);
        }
    }

    let Some(balance_after) = ledger_repo::apply_delta(tx, request.customer_id, request.amount).await?
    else {
        tracing::warn!(balance, "debit refused, balance would go negative");
        return Ok(LedgerOutcome::InsufficientBalance { balance });
    };

    let entry_id = Uuid::now_v7();
    ledger_repo::insert_entry(tx, entry_id, request).await?;

    tracing::info!(%entry_id, balance_after, "ledger delta applied");
    Ok(LedgerOutcome::Applied {
        entry_id,
        balance_after,
    })
}

/// Apply the requests of one transition as a unit.
///
/// Customers are locked and dedup keys checked up front. If the rows not yet
/// booked would take any customer below zero, nothing is written: already
/// booked rows report `DuplicateSuppressed`, the rest `InsufficientBalance`.
pub async fn apply_batch(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    requests: Vec<LedgerRequest>,
) -> Result<Vec<(LedgerRequest, LedgerOutcome)>, EngineError> {
    // customer -> (balance, net delta still to book)
    let mut pending: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
    let mut booked = Vec::with_capacity(requests.len());

    for request in &requests {
        if !pending.contains_key(&request.customer_id) {
            let balance = ledger_repo::lock_balance(tx, request.customer_id)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("customer {}", request.customer_id)))?;
            pending.insert(request.customer_id, (balance, 0));
        }
        let seen = match &request.dedup_key {
            Some(key) => ledger_repo::dedup_key_exists(tx, request.customer_id, key.as_str()).await?,
            None => false,
        };
        if !seen {
            if let Some((_, delta)) = pending.get_mut(&request.customer_id) {
                *delta += request.amount;
            }
        }
        booked.push(seen);
    }

    let overdrawn = pending
        .iter()
        .any(|(_, (balance, delta))| balance + delta < 0);
    if overdrawn {
        for (customer_id, (balance, delta)) in &pending {
            tracing::warn!(customer_id, balance, delta, "batch refused, balance would go negative");
        }
        return Ok(requests
            .into_iter()
            .zip(booked)
            .map(|(request, seen)| {
                let outcome = if seen {
                    LedgerOutcome::DuplicateSuppressed
                } else {
                    let balance = pending.get(&request.customer_id).map_or(0, |(b, _)| *b);
                    LedgerOutcome::InsufficientBalance { balance }
                };
                (request, outcome)
            })
            .collect());
    }

    let mut applied = Vec::with_capacity(requests.len());
    for request in requests {
        let outcome = apply(tx, &request).await?;
        applied.push((request, outcome));
    }
    Ok(applied)
}

/// Same as [`apply`], in a transaction of its own.
pub async fn apply_standalone(
    pool: &PgPool,
    request: &LedgerRequest,
) -> Result<LedgerOutcome, EngineError> {
    let mut tx = postgres::begin(pool).await?;
    let outcome = apply(&mut tx, request).await?;
    tx.commit().await?;
    Ok(outcome)
}
