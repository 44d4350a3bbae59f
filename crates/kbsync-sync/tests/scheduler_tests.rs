//! Scheduler isolation, concurrency bound and shutdown

mod common;

use std::sync::Arc;
use std::time::Duration;

use kbsync_core::domain::{ParentKind, Provider, UserId};
use kbsync_sync::{Scheduler, SyncTarget};
use tokio_util::sync::CancellationToken;

use common::{root_page, FakeSource, Harness};

fn healthy_source() -> Arc<FakeSource> {
    let source = FakeSource::notion();
    source.put(root_page("page", 2));
    Arc::new(source)
}

#[tokio::test]
async fn test_failing_pair_does_not_block_others() {
    let h = Harness::new().await;
    let ok_user = UserId::new();
    let bad_user = UserId::new();

    let broken = FakeSource::new(Provider::GitHub, &[ParentKind::Workspace]);
    broken.fail_listing("401 Bad credentials");

    let scheduler = Scheduler::new(
        h.reconciler.clone(),
        vec![
            SyncTarget::new(bad_user, Arc::new(broken)),
            SyncTarget::new(ok_user, healthy_source()),
        ],
        Duration::from_secs(60),
        2,
    );

    let summaries = scheduler.run_once().await;

    assert_eq!(summaries.len(), 2);
    let ok = summaries.iter().find(|s| s.user_id == ok_user).unwrap();
    let bad = summaries.iter().find(|s| s.user_id == bad_user).unwrap();
    assert!(ok.success);
    assert_eq!(ok.created_count, 1);
    assert!(!bad.success);
    assert_eq!(bad.provider, Provider::GitHub);
    assert_eq!(h.rows(Provider::Notion, ok_user).await.len(), 1);
}

#[tokio::test]
async fn test_panicking_pair_yields_failed_summary() {
    let h = Harness::new().await;
    let ok_user = UserId::new();
    let bad_user = UserId::new();

    let exploding = FakeSource::new(Provider::Dropbox, &[ParentKind::Drive]);
    exploding.panic_on_list();

    let scheduler = Scheduler::new(
        h.reconciler.clone(),
        vec![
            SyncTarget::new(bad_user, Arc::new(exploding)),
            SyncTarget::new(ok_user, healthy_source()),
        ],
        Duration::from_secs(60),
        2,
    );

    let summaries = scheduler.run_once().await;

    assert_eq!(summaries.len(), 2);
    let bad = summaries.iter().find(|s| s.user_id == bad_user).unwrap();
    assert!(!bad.success);
    assert_eq!(bad.provider, Provider::Dropbox);
    assert!(bad.error.as_deref().unwrap().contains("reconciliation task failed"));
    assert!(summaries.iter().any(|s| s.user_id == ok_user && s.success));
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let h = Harness::new().await;
    let source = Arc::new(FakeSource::notion());
    source.put(root_page("page", 2));
    source.set_list_delay(Duration::from_millis(50));

    let targets = (0..4)
        .map(|_| SyncTarget::new(UserId::new(), source.clone()))
        .collect();
    let scheduler = Scheduler::new(h.reconciler.clone(), targets, Duration::from_secs(60), 1);

    let summaries = scheduler.run_once().await;

    assert_eq!(summaries.len(), 4);
    assert!(summaries.iter().all(|s| s.success));
    assert_eq!(source.max_active(), 1);
}

#[tokio::test]
async fn test_run_ticks_until_cancelled() {
    let h = Harness::new().await;
    let user = UserId::new();
    let source = healthy_source();

    let scheduler = Arc::new(Scheduler::new(
        h.reconciler.clone(),
        vec![SyncTarget::new(user, source.clone())],
        Duration::from_millis(20),
        1,
    ));

    let cancel = CancellationToken::new();
    let handle = {
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler should stop after cancellation")
        .unwrap();

    assert!(source.list_calls() >= 2);
    let log = h.notifications.recent(100, Some(&user), None).await.unwrap();
    assert!(log.len() >= 2);
    assert_eq!(log.iter().map(|s| s.created_count).sum::<u64>(), 1);
}

#[tokio::test]
async fn test_cancel_aborts_in_flight_invocation() {
    let h = Harness::new().await;
    let user = UserId::new();
    let source = Arc::new(FakeSource::notion());
    source.put(root_page("page", 2));
    source.set_fetch_delay(Duration::from_secs(30));

    let scheduler = Scheduler::new(
        h.reconciler.clone(),
        vec![SyncTarget::new(user, source)],
        Duration::from_secs(60),
        1,
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    tokio::time::timeout(Duration::from_secs(5), scheduler.run(cancel))
        .await
        .expect("cancellation should not wait for the invocation");

    // Give the aborted task a moment to release its connection
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.rows(Provider::Notion, user).await.is_empty());
}
