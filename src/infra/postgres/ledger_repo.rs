use {
    crate::domain::{
        error::EngineError,
        ledger::{CreditLogEntry, LedgerRequest},
    },
    chrono::{DateTime, Utc},
    sqlx::PgExecutor,
    uuid::Uuid,
};

type Tx<'c> = sqlx::Transaction<'c, sqlx::Postgres>;

/// Row-locks the customer and returns the current balance.
/// Concurrent ledger writes for one customer serialize here; other customers are unaffected.
pub async fn lock_balance(tx: &mut Tx<'_>, customer_id: i64) -> Result<Option<i64>, EngineError> {
    let balance = sqlx::query_scalar::<_, i64>(
        "SELECT credits FROM customers WHERE id = $1 FOR UPDATE",
    )
    .bind(customer_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(balance)
}

pub async fn dedup_key_exists(
    tx: &mut Tx<'_>,
    customer_id: i64,
    dedup_key: &str,
) -> Result<bool, EngineError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM credit_log WHERE customer_id = $1 AND dedup_key = $2)",
    )
    .bind(customer_id)
    .bind(dedup_key)
    .fetch_one(&mut **tx)
    .await?;

    Ok(exists)
}

/// Single conditional update: the balance moves only if it stays non-negative.
/// Returns the new balance, or `None` when the debit was refused.
pub async fn apply_delta(
    tx: &mut Tx<'_>,
    customer_id: i64,
    amount: i64,
) -> Result<Option<i64>, EngineError> {
    let balance = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE customers
        SET credits = credits + $2, updated_at = now()
        WHERE id = $1 AND credits + $2 >= 0
        RETURNING credits
        "#,
    )
    .bind(customer_id)
    .bind(amount)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(balance)
}

pub async fn insert_entry(
    tx: &mut Tx<'_>,
    id: Uuid,
    request: &LedgerRequest,
) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        INSERT INTO credit_log
            (id, customer_id, amount, object_type, object_id, is_refund, dedup_key, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(request.customer_id)
    .bind(request.amount)
    .bind(request.object.object_type().as_str())
    .bind(request.object.object_id())
    .bind(request.is_refund)
    .bind(request.dedup_key.as_ref().map(|k| k.as_str()))
    .bind(request.description.as_deref())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

#[derive(sqlx::FromRow)]
struct CreditLogRow {
    id: Uuid,
    customer_id: i64,
    amount: i64,
    object_type: String,
    object_id: Option<i64>,
    is_refund: bool,
    dedup_key: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CreditLogRow> for CreditLogEntry {
    fn from(row: CreditLogRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            amount: row.amount,
            object_type: row.object_type,
            object_id: row.object_id,
            is_refund: row.is_refund,
            dedup_key: row.dedup_key,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

pub async fn entries_for_customer(
    executor: impl PgExecutor<'_>,
    customer_id: i64,
) -> Result<Vec<CreditLogEntry>, EngineError> {
    let rows = sqlx::query_as::<_, CreditLogRow>(
        r#"
        SELECT id, customer_id, amount, object_type, object_id, is_refund,
               dedup_key, description, created_at
        FROM credit_log
        WHERE customer_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(customer_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(CreditLogEntry::from).collect())
}

/// Sum of all ledger rows; equals `customers.credits` whenever the ledger is consistent.
pub async fn ledger_sum(executor: impl PgExecutor<'_>, customer_id: i64) -> Result<i64, EngineError> {
    let sum = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM credit_log WHERE customer_id = $1",
    )
    .bind(customer_id)
    .fetch_one(executor)
    .await?;

    Ok(sum)
}
