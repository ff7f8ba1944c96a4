//! Integration tests for managers competing for one entry directory
//!
//! Each `sysdumpd` invocation opens its own manager, so overlapping runs
//! must take turns instead of allocating the same id twice.

use std::sync::Arc;
use std::time::Duration;

use super::common::TestEnv;
use sysdump::core::NotifyOutcome;
use sysdump::data::PersistenceError;

#[tokio::test]
async fn test_second_manager_is_locked_out() {
    let env = TestEnv::new();
    let (first, _) = env.open();

    assert!(matches!(env.try_open(), Err(PersistenceError::Locked(_))));

    first.notify(100, 1).await.unwrap();
    drop(first);

    let (second, report) = env.try_open().unwrap();
    assert_eq!(report.restored, vec![1]);

    let outcome = second.notify(200, 2).await.unwrap();
    assert!(matches!(outcome, NotifyOutcome::Created(ref e) if e.id == 2));
    assert_eq!(
        second.notify(100, 1).await,
        Some(NotifyOutcome::Duplicate { entry_id: 1 })
    );
}

#[test]
fn test_waiting_manager_sees_earlier_writes() {
    let env = Arc::new(TestEnv::new());
    let (first, _) = env.open();

    let waiter = {
        let env = Arc::clone(&env);
        std::thread::spawn(move || {
            let (second, _) = env.open();
            let outcome = tokio_test::block_on(second.notify(200, 2));
            (outcome, second.entries())
        })
    };

    tokio_test::block_on(first.notify(100, 1)).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert!(!waiter.is_finished());
    drop(first);

    let (outcome, entries) = waiter.join().unwrap();
    assert!(matches!(outcome, Some(NotifyOutcome::Created(ref e)) if e.id == 2));
    let sources: Vec<(u32, u32)> = entries.iter().map(|e| (e.id, e.source_id)).collect();
    assert_eq!(sources, vec![(1, 100), (2, 200)]);

    let (reopened, _) = env.open();
    assert_eq!(reopened.entries(), entries);
    assert_eq!(
        tokio_test::block_on(reopened.notify(100, 1)),
        Some(NotifyOutcome::Duplicate { entry_id: 1 })
    );
}
