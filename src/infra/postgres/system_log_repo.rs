use {
    crate::domain::{error::EngineError, system_log::NewSystemLog},
    sqlx::PgExecutor,
};

pub async fn insert(executor: impl PgExecutor<'_>, entry: &NewSystemLog) -> Result<(), EngineError> {
    sqlx::query(
        "INSERT INTO system_log (id, level, category, description) VALUES ($1, $2, $3, $4)",
    )
    .bind(entry.id)
    .bind(entry.level.as_str())
    .bind(entry.category.as_deref())
    .bind(&entry.description)
    .execute(executor)
    .await?;

    Ok(())
}
