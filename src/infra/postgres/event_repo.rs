use {
    crate::domain::{error::EngineError, event::NewEventLog},
    sqlx::PgExecutor,
};

/// Pure insert. Runs inside the webhook transaction when an entity was
/// resolved, on the pool for rows written outside one.
pub async fn append(executor: impl PgExecutor<'_>, entry: &NewEventLog) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        INSERT INTO event_log
            (id, gateway, customer_id, object_type, object_id, status,
             currency, amount, description, payload)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(entry.id)
    .bind(entry.gateway.map(|g| g.as_str()))
    .bind(entry.customer_id)
    .bind(entry.object.object_type().as_str())
    .bind(entry.object.object_id())
    .bind(&entry.status)
    .bind(entry.currency.as_ref().map(|c| c.as_str()))
    .bind(entry.amount.cents())
    .bind(&entry.description)
    .bind(&entry.payload)
    .execute(executor)
    .await?;

    Ok(())
}
