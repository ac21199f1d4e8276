use {
    super::{
        id::{CorrelationToken, GatewayNativeId},
        ledger::{DedupKey, LedgerRequest},
        object_ref::ObjectRef,
        plan::Plan,
        error::EngineError,
        status::{CreditPurchaseStatus, SubscriptionStatus, TargetStatus},
    },
    chrono::{DateTime, Utc},
    serde::Serialize,
};

#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub id: i64,
    pub customer_id: i64,
    pub plan: Plan,
    pub token: CorrelationToken,
    pub external_id: Option<String>,
    pub status: SubscriptionStatus,
    pub expire_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditPurchase {
    pub id: i64,
    pub customer_id: i64,
    pub plan: Plan,
    pub token: CorrelationToken,
    pub status: CreditPurchaseStatus,
}

/// Entity a webhook can move: a subscription or a one-off credit purchase.
#[derive(Debug, Clone, Serialize)]
pub enum Billable {
    Subscription(Subscription),
    CreditPurchase(CreditPurchase),
}

/// Effects of one accepted transition, computed before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub from: &'static str,
    pub to: TargetStatus,
    /// Resulting `expire_at`; always `None` for credit purchases.
    pub expire_at: Option<DateTime<Utc>>,
    pub ledger: Vec<LedgerRequest>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Event carries no status for this entity.
    Ignore,
    /// Entity already sits in the requested status.
    SameStatus,
    /// Transition not allowed from the current status.
    Anomaly { from: &'static str, to: &'static str },
    Advance(TransitionPlan),
}

impl Billable {
    pub fn object_ref(&self) -> ObjectRef {
        match self {
            Self::Subscription(s) => ObjectRef::Subscription(s.id),
            Self::CreditPurchase(p) => ObjectRef::CreditPurchase(p.id),
        }
    }

    pub fn customer_id(&self) -> i64 {
        match self {
            Self::Subscription(s) => s.customer_id,
            Self::CreditPurchase(p) => p.customer_id,
        }
    }

    pub fn plan(&self) -> &Plan {
        match self {
            Self::Subscription(s) => &s.plan,
            Self::CreditPurchase(p) => &p.plan,
        }
    }

    pub fn status_str(&self) -> &'static str {
        match self {
            Self::Subscription(s) => s.status.as_str(),
            Self::CreditPurchase(p) => p.status.as_str(),
        }
    }

    /// Gateway subscription id to store, when the entity has none yet.
    pub fn external_id_to_bind<'e>(&self, offered: Option<&'e str>) -> Option<&'e str> {
        match self {
            Self::Subscription(s) if s.external_id.is_none() => offered,
            _ => None,
        }
    }

    pub fn decide(
        &self,
        target: Option<TargetStatus>,
        native_id: &GatewayNativeId,
        now: DateTime<Utc>,
    ) -> Result<Decision, EngineError> {
        match (self, target) {
            (_, None) => Ok(Decision::Ignore),
            (Self::Subscription(s), Some(TargetStatus::Subscription(target))) => {
                s.decide(target, native_id, now)
            }
            (Self::CreditPurchase(p), Some(TargetStatus::CreditPurchase(target))) => {
                Ok(p.decide(target, native_id))
            }
            (_, Some(target)) => Ok(Decision::Anomaly {
                from: self.status_str(),
                to: target.as_str(),
            }),
        }
    }
}

impl Subscription {
    /// Fails only when the plan period cannot be added to a timestamp.
    pub fn decide(
        &self,
        target: SubscriptionStatus,
        native_id: &GatewayNativeId,
        now: DateTime<Utc>,
    ) -> Result<Decision, EngineError> {
        // Active -> Active is a renewal, every other repeat is a no-op.
        if target == self.status && target != SubscriptionStatus::Active {
            return Ok(Decision::SameStatus);
        }
        if !self.status.can_transition_to(&target) {
            return Ok(Decision::Anomaly {
                from: self.status.as_str(),
                to: target.as_str(),
            });
        }

        let (expire_at, ledger) = match target {
            SubscriptionStatus::Active => {
                let from = match self.expire_at {
                    Some(current) if current > now => current,
                    _ => now,
                };
                let expire_at = from
                    .checked_add_signed(self.plan.period()?)
                    .ok_or_else(|| self.plan.period_error())?;
                (Some(expire_at), self.credit_requests(native_id, false))
            }
            SubscriptionStatus::Refunded | SubscriptionStatus::ChargedBack => {
                let expire_at = self
                    .expire_at
                    .unwrap_or(now)
                    .checked_sub_signed(self.plan.period()?)
                    .ok_or_else(|| self.plan.period_error())?;
                // Only a granted status has credits to take back.
                let ledger = if self.status.holds_grant() {
                    self.credit_requests(native_id, true)
                } else {
                    Vec::new()
                };
                (Some(expire_at), ledger)
            }
            _ => (self.expire_at, Vec::new()),
        };

        Ok(Decision::Advance(TransitionPlan {
            from: self.status.as_str(),
            to: TargetStatus::Subscription(target),
            expire_at,
            ledger,
        }))
    }

    fn credit_requests(&self, native_id: &GatewayNativeId, is_refund: bool) -> Vec<LedgerRequest> {
        plan_credit_requests(
            &self.plan,
            self.customer_id,
            ObjectRef::Subscription(self.id),
            native_id,
            is_refund,
        )
    }
}

impl CreditPurchase {
    pub fn decide(&self, target: CreditPurchaseStatus, native_id: &GatewayNativeId) -> Decision {
        if target == self.status {
            return Decision::SameStatus;
        }
        if !self.status.can_transition_to(&target) {
            return Decision::Anomaly {
                from: self.status.as_str(),
                to: target.as_str(),
            };
        }

        let object = ObjectRef::CreditPurchase(self.id);
        let ledger = match target {
            CreditPurchaseStatus::Approved => {
                plan_credit_requests(&self.plan, self.customer_id, object, native_id, false)
            }
            CreditPurchaseStatus::Refunded | CreditPurchaseStatus::ChargedBack
                if self.status.holds_grant() =>
            {
                plan_credit_requests(&self.plan, self.customer_id, object, native_id, true)
            }
            _ => Vec::new(),
        };

        Decision::Advance(TransitionPlan {
            from: self.status.as_str(),
            to: TargetStatus::CreditPurchase(target),
            expire_at: None,
            ledger,
        })
    }
}

/// Base credits and bonus credits as two independent rows; debits when reversing.
fn plan_credit_requests(
    plan: &Plan,
    customer_id: i64,
    object: ObjectRef,
    native_id: &GatewayNativeId,
    is_refund: bool,
) -> Vec<LedgerRequest> {
    let sign = if is_refund { -1 } else { 1 };
    let mut requests = Vec::with_capacity(2);

    if plan.credits > 0 {
        requests.push(LedgerRequest::keyed(
            customer_id,
            sign * plan.credits,
            object,
            is_refund,
            native_id,
        ));
    }
    if plan.bonus > 0 {
        let mut bonus = LedgerRequest::keyed(
            customer_id,
            sign * plan.bonus,
            ObjectRef::Bonus(object.object_id()),
            is_refund,
            native_id,
        );
        // The bonus ref drops the parent type, so the key is built on the parent.
        bonus.dedup_key = Some(DedupKey::bonus(object, native_id, is_refund));
        requests.push(bonus);
    }

    requests
}
