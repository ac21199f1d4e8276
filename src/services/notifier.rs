use {
    crate::{
        config::EmailConfig,
        domain::{
            customer::CustomerDirectory,
            error::EngineError,
            ledger::{LedgerOutcome, LedgerRequest},
            object_ref::ObjectRef,
        },
    },
    std::{future::Future, pin::Pin, sync::Arc, time::Duration},
};

/// A ledger row that was actually written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditNotice {
    pub customer_id: i64,
    pub amount: i64,
    pub balance_after: i64,
    pub object: ObjectRef,
    pub is_refund: bool,
}

impl CreditNotice {
    /// `None` unless the outcome is `Applied`.
    pub fn from_outcome(request: &LedgerRequest, outcome: &LedgerOutcome) -> Option<Self> {
        match outcome {
            LedgerOutcome::Applied { balance_after, .. } => Some(Self {
                customer_id: request.customer_id,
                amount: request.amount,
                balance_after: *balance_after,
                object: request.object,
                is_refund: request.is_refund,
            }),
            _ => None,
        }
    }

    fn subject(&self) -> String {
        if self.amount >= 0 {
            format!("{} credits added to your account", self.amount)
        } else {
            format!("{} credits removed from your account", -self.amount)
        }
    }

    fn text(&self) -> String {
        let reason = match self.object {
            ObjectRef::Subscription(_) => "your subscription",
            ObjectRef::CreditPurchase(_) => "your credit purchase",
            ObjectRef::Bonus(_) => "a bonus",
            ObjectRef::Voucher(_) => "a voucher",
            ObjectRef::General | ObjectRef::Unknown => "an account adjustment",
        };
        let verb = if self.is_refund { "reversed for" } else { "applied for" };
        format!(
            "A change of {} credits was {verb} {reason}. Your balance is now {} credits.",
            self.amount, self.balance_after
        )
    }
}

pub trait Notifier: Send + Sync {
    fn notify<'a>(
        &'a self,
        notice: &'a CreditNotice,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>>;
}

/// Fire-and-forget delivery, one task per notice. Only call after commit.
pub fn dispatch(notifier: &Arc<dyn Notifier>, notices: Vec<CreditNotice>) {
    for notice in notices {
        let notifier = Arc::clone(notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&notice).await {
                tracing::warn!(customer_id = notice.customer_id, "credit notification failed: {e}");
            }
        });
    }
}

/// Writes notices to the trace log only.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify<'a>(
        &'a self,
        notice: &'a CreditNotice,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::info!(
                customer_id = notice.customer_id,
                amount = notice.amount,
                balance_after = notice.balance_after,
                object = %notice.object,
                "credit notice"
            );
            Ok(())
        })
    }
}

/// Sends notices through a transactional email HTTP API (Resend-style JSON body).
pub struct EmailApiNotifier {
    http: reqwest::Client,
    config: EmailConfig,
    customers: Arc<dyn CustomerDirectory>,
}

impl EmailApiNotifier {
    pub fn new(config: EmailConfig, customers: Arc<dyn CustomerDirectory>) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EngineError::Gateway(format!("http client: {e}")))?;
        Ok(Self {
            http,
            config,
            customers,
        })
    }

    async fn send(&self, notice: &CreditNotice) -> Result<(), EngineError> {
        let customer = self
            .customers
            .find_by_id(notice.customer_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("customer {}", notice.customer_id)))?;

        let body = serde_json::json!({
            "from": self.config.from,
            "to": [customer.email],
            "subject": notice.subject(),
            "text": notice.text(),
        });

        let resp = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Gateway(format!("email api: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::Gateway(format!("email api answered {status}: {text}")));
        }
        Ok(())
    }
}

impl Notifier for EmailApiNotifier {
    fn notify<'a>(
        &'a self,
        notice: &'a CreditNotice,
    ) -> Pin<Box<dyn Future<Output = Result<(), EngineError>> + Send + 'a>> {
        Box::pin(self.send(notice))
    }
}
