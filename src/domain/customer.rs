use {
    super::error::EngineError,
    serde::Serialize,
    std::{future::Future, pin::Pin},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    /// Never negative; moved only by the ledger.
    pub credits: i64,
}

/// Read-only customer lookups owned by the CRUD side of the system.
pub trait CustomerDirectory: Send + Sync {
    fn find_by_id(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Customer>, EngineError>> + Send + '_>>;

    fn credit_balance(
        &self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<i64>, EngineError>> + Send + '_>>;
}
