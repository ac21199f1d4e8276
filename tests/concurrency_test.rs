mod common;

use {
    common::*,
    credit_sync::{
        domain::{
            gateway::Gateway,
            id::GatewayNativeId,
            ledger::{LedgerOutcome, LedgerRequest},
            object_ref::ObjectRef,
        },
        services::{dispatcher::WebhookReply, ledger},
    },
    std::sync::Arc,
};

const DB: &str = "credit_sync_test_concurrency";

// ── 1. concurrent_redelivery_grants_once ───────────────────────────────────
// 10 tasks deliver the same preapproval cycle. One activates, the rest see it done.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redelivery_grants_once() {
    let Some(pool) = setup_pool(DB).await else { return };
    let customer = create_customer(&pool, 0).await;
    let plan = create_plan(&pool, Gateway::MercadoPago, 30, 5).await;
    let (sub_id, token) = create_subscription(&pool, customer, plan, "initial", None).await;

    let lookup = Arc::new(StubMercadoPago::default());
    let pre_id = unique("pre");
    lookup.put_preapproval(preapproval(&pre_id, &token, "authorized", "2026-11-01"));
    let dispatcher = Arc::new(mercado_pago_dispatcher(
        &pool,
        lookup,
        Arc::new(RecordingNotifier::default()),
    ));

    let mut handles = Vec::new();
    for _ in 0..10 {
        let dispatcher = dispatcher.clone();
        let pre_id = pre_id.clone();
        handles.push(tokio::spawn(async move {
            dispatcher
                .handle("mercado-pago", notification("subscription_preapproval", &pre_id))
                .await
                .unwrap()
        }));
    }

    let mut processed = 0;
    let mut unchanged = 0;
    for h in handles {
        match h.await.unwrap() {
            WebhookReply::Processed("processed") => processed += 1,
            WebhookReply::Processed("unchanged") => unchanged += 1,
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    assert_eq!(processed, 1, "exactly 1 activation");
    assert_eq!(unchanged, 9, "9 replays");
    assert_eq!(balance(&pool, customer).await, 35);
    assert_eq!(ledger_rows(&pool, customer).await.len(), 2);
    assert_eq!(events_for(&pool, "subscription", sub_id).await.len(), 10);
}

// ── 2. concurrent_purchases_one_customer ───────────────────────────────────
// 8 purchases for one customer, each delivered twice at once. The customer row
// serializes them; every purchase lands exactly once.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_one_customer() {
    let Some(pool) = setup_pool(DB).await else { return };
    let customer = create_customer(&pool, 0).await;
    let plan = create_plan(&pool, Gateway::MercadoPago, 100, 10).await;

    let lookup = Arc::new(StubMercadoPago::default());
    let mut payments = Vec::new();
    for _ in 0..8 {
        let (_, token) = create_purchase(&pool, customer, plan, "initial").await;
        let pay_id = unique("pay");
        lookup.put_payment(payment(&pay_id, token.as_str(), "approved"));
        payments.push(pay_id);
    }
    let dispatcher = Arc::new(mercado_pago_dispatcher(
        &pool,
        lookup,
        Arc::new(RecordingNotifier::default()),
    ));

    let mut handles = Vec::new();
    for pay_id in payments.iter().chain(payments.iter()).cloned() {
        let dispatcher = dispatcher.clone();
        handles.push(tokio::spawn(async move {
            dispatcher
                .handle("mercado-pago", notification("payment", &pay_id))
                .await
                .unwrap()
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(balance(&pool, customer).await, 8 * 110);
    assert_eq!(ledger_rows(&pool, customer).await.len(), 16);
    assert_eq!(ledger_total(&pool, customer).await, balance(&pool, customer).await);
}

// ── 3. racing_debits_keep_balance_consistent ───────────────────────────────
// Grants and debits race for one customer. The balance never goes negative and
// always equals the ledger sum.

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_debits_keep_balance_consistent() {
    let Some(pool) = setup_pool(DB).await else { return };
    let customer = create_customer(&pool, 0).await;

    let mut handles = Vec::new();
    for i in 0..20 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let amount = if i % 2 == 0 { 10 } else { -15 };
            let request = LedgerRequest::keyed(
                customer,
                amount,
                ObjectRef::CreditPurchase(i),
                amount < 0,
                &GatewayNativeId::new(format!("pi_race_{i}")).unwrap(),
            );
            ledger::apply_standalone(&pool, &request).await.unwrap()
        }));
    }

    let mut applied = 0;
    let mut refused = 0;
    for h in handles {
        match h.await.unwrap() {
            LedgerOutcome::Applied { balance_after, .. } => {
                assert!(balance_after >= 0);
                applied += 1;
            }
            LedgerOutcome::InsufficientBalance { balance } => {
                assert!(balance < 15);
                refused += 1;
            }
            LedgerOutcome::DuplicateSuppressed => panic!("keys are distinct"),
        }
    }

    let final_balance = balance(&pool, customer).await;
    assert!(final_balance >= 0);
    assert_eq!(ledger_total(&pool, customer).await, final_balance);
    assert_eq!(applied + refused, 20);
    assert_eq!(ledger_rows(&pool, customer).await.len(), applied);
}
