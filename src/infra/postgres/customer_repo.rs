use {
    crate::domain::{
        customer::{Customer, CustomerDirectory},
        error::EngineError,
    },
    sqlx::{PgExecutor, PgPool},
    std::{future::Future, pin::Pin},
};

pub async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<Customer>, EngineError> {
    let row = sqlx::query_as::<_, (i64, String, Option<String>, i64)>(
        "SELECT id, email, name, credits FROM customers WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|(id, email, name, credits)| Customer {
        id,
        email,
        name,
        credits,
    }))
}

pub async fn credit_balance(
    executor: impl PgExecutor<'_>,
    id: i64,
) -> Result<Option<i64>, EngineError> {
    let credits = sqlx::query_scalar::<_, i64>("SELECT credits FROM customers WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(credits)
}

/// `CustomerDirectory` backed by the `customers` table.
#[derive(Clone)]
pub struct PgCustomerDirectory {
    pool: PgPool,
}

impl PgCustomerDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CustomerDirectory for PgCustomerDirectory {
    fn find_by_id(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Customer>, EngineError>> + Send + '_>> {
        Box::pin(find_by_id(&self.pool, id))
    }

    fn credit_balance(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<i64>, EngineError>> + Send + '_>> {
        Box::pin(credit_balance(&self.pool, id))
    }
}
