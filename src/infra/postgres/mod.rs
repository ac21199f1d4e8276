pub mod billing_repo;
pub mod customer_repo;
pub mod event_repo;
pub mod ledger_repo;
pub mod system_log_repo;

use {crate::domain::error::EngineError, sqlx::PgPool};

/// Opens a transaction that gives up on row locks after 5 s instead of queueing forever.
pub async fn begin(pool: &PgPool) -> Result<sqlx::Transaction<'static, sqlx::Postgres>, EngineError> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET LOCAL lock_timeout = '5s'")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}
