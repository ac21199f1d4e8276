use {
    crate::domain::{
        billing::{Billable, CreditPurchase, Subscription},
        error::EngineError,
        event::Correlation,
        gateway::Gateway,
        id::CorrelationToken,
        money::Currency,
        object_ref::{ObjectRef, ObjectType},
        plan::{FrequencyType, Plan},
        status::{CreditPurchaseStatus, SubscriptionStatus},
    },
    chrono::{DateTime, Utc},
    sqlx::PgExecutor,
};

type Tx<'c> = sqlx::Transaction<'c, sqlx::Postgres>;

const PLAN_COLUMNS: &str = r#"
    p.id AS plan_id, p.name AS plan_name, p.gateway AS plan_gateway,
    p.external_id AS plan_external_id, p.currency AS plan_currency,
    p.price_cents, p.credits, p.bonus, p.frequency_type, p.frequency_amount
"#;

#[derive(sqlx::FromRow)]
struct PlanColumns {
    plan_id: i64,
    plan_name: String,
    plan_gateway: String,
    plan_external_id: Option<String>,
    plan_currency: String,
    price_cents: i64,
    credits: i64,
    bonus: i64,
    frequency_type: String,
    frequency_amount: i32,
}

impl TryFrom<PlanColumns> for Plan {
    type Error = EngineError;

    fn try_from(row: PlanColumns) -> Result<Self, Self::Error> {
        Ok(Plan {
            id: row.plan_id,
            name: row.plan_name,
            gateway: Gateway::try_from(row.plan_gateway.as_str())?,
            external_id: row.plan_external_id,
            currency: Currency::new(&row.plan_currency)?,
            price_cents: row.price_cents,
            credits: row.credits,
            bonus: row.bonus,
            frequency_type: FrequencyType::try_from(row.frequency_type.as_str())?,
            frequency_amount: row.frequency_amount,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: i64,
    customer_id: i64,
    token: String,
    external_id: Option<String>,
    status: String,
    expire_at: Option<DateTime<Utc>>,
    #[sqlx(flatten)]
    plan: PlanColumns,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = EngineError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: row.id,
            customer_id: row.customer_id,
            plan: Plan::try_from(row.plan)?,
            token: CorrelationToken::parse(row.token)?,
            external_id: row.external_id,
            status: SubscriptionStatus::try_from(row.status.as_str())?,
            expire_at: row.expire_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CreditPurchaseRow {
    id: i64,
    customer_id: i64,
    token: String,
    status: String,
    #[sqlx(flatten)]
    plan: PlanColumns,
}

impl TryFrom<CreditPurchaseRow> for CreditPurchase {
    type Error = EngineError;

    fn try_from(row: CreditPurchaseRow) -> Result<Self, Self::Error> {
        Ok(CreditPurchase {
            id: row.id,
            customer_id: row.customer_id,
            plan: Plan::try_from(row.plan)?,
            token: CorrelationToken::parse(row.token)?,
            status: CreditPurchaseStatus::try_from(row.status.as_str())?,
        })
    }
}

fn subscription_query(filter: &str, lock: bool) -> String {
    format!(
        r#"
        SELECT s.id, s.customer_id, s.token, s.external_id, s.status, s.expire_at, {PLAN_COLUMNS}
        FROM subscriptions s
        JOIN plans p ON p.id = s.plan_id
        WHERE {filter}
        {}
        "#,
        if lock { "FOR UPDATE OF s" } else { "" }
    )
}

fn purchase_query(filter: &str, lock: bool) -> String {
    format!(
        r#"
        SELECT c.id, c.customer_id, c.token, c.status, {PLAN_COLUMNS}
        FROM credit_purchases c
        JOIN plans p ON p.id = c.plan_id
        WHERE {filter}
        {}
        "#,
        if lock { "FOR UPDATE OF c" } else { "" }
    )
}

async fn fetch_subscription(
    executor: impl PgExecutor<'_>,
    filter: &str,
    value: &str,
) -> Result<Option<Subscription>, EngineError> {
    sqlx::query_as::<_, SubscriptionRow>(&subscription_query(filter, false))
        .bind(value)
        .fetch_optional(executor)
        .await?
        .map(Subscription::try_from)
        .transpose()
}

/// Resolve the entity a correlation points at. Read-only, runs before the
/// webhook transaction opens.
pub async fn find_by_correlation(
    executor: impl PgExecutor<'_>,
    correlation: &Correlation,
) -> Result<Option<Billable>, EngineError> {
    match correlation {
        Correlation::ExternalSubscription(external_id) => {
            Ok(fetch_subscription(executor, "s.external_id = $1", external_id)
                .await?
                .map(Billable::Subscription))
        }
        Correlation::Token(token) => match token.object_type() {
            ObjectType::Subscription => Ok(fetch_subscription(executor, "s.token = $1", token.as_str())
                .await?
                .map(Billable::Subscription)),
            ObjectType::CreditPurchase => {
                let purchase = sqlx::query_as::<_, CreditPurchaseRow>(&purchase_query("c.token = $1", false))
                    .bind(token.as_str())
                    .fetch_optional(executor)
                    .await?
                    .map(CreditPurchase::try_from)
                    .transpose()?;
                Ok(purchase.map(Billable::CreditPurchase))
            }
            _ => Ok(None),
        },
    }
}

/// Re-read under `FOR UPDATE` so concurrent deliveries for one entity serialize.
pub async fn lock(tx: &mut Tx<'_>, object: ObjectRef) -> Result<Option<Billable>, EngineError> {
    match object {
        ObjectRef::Subscription(id) => {
            let sub = sqlx::query_as::<_, SubscriptionRow>(&subscription_query("s.id = $1", true))
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?
                .map(Subscription::try_from)
                .transpose()?;
            Ok(sub.map(Billable::Subscription))
        }
        ObjectRef::CreditPurchase(id) => {
            let purchase = sqlx::query_as::<_, CreditPurchaseRow>(&purchase_query("c.id = $1", true))
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?
                .map(CreditPurchase::try_from)
                .transpose()?;
            Ok(purchase.map(Billable::CreditPurchase))
        }
        other => Err(EngineError::Validation(format!(
            "{other} is not a billable entity"
        ))),
    }
}

pub async fn update_subscription(
    tx: &mut Tx<'_>,
    id: i64,
    status: SubscriptionStatus,
    expire_at: Option<DateTime<Utc>>,
) -> Result<(), EngineError> {
    sqlx::query(
        "UPDATE subscriptions SET status = $1, expire_at = $2, updated_at = now() WHERE id = $3",
    )
    .bind(status.as_str())
    .bind(expire_at)
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Stores the gateway subscription id unless one is already set.
pub async fn bind_external_id(
    tx: &mut Tx<'_>,
    id: i64,
    external_id: &str,
) -> Result<bool, EngineError> {
    let result = sqlx::query(
        r#"
        UPDATE subscriptions SET external_id = $1, updated_at = now()
        WHERE id = $2 AND external_id IS NULL
        "#,
    )
    .bind(external_id)
    .bind(id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn update_purchase_status(
    tx: &mut Tx<'_>,
    id: i64,
    status: CreditPurchaseStatus,
) -> Result<(), EngineError> {
    sqlx::query("UPDATE credit_purchases SET status = $1, updated_at = now() WHERE id = $2")
        .bind(status.as_str())
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}
