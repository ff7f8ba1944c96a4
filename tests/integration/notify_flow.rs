//! Integration tests for capture-complete notifications
//!
//! Covers correlation with a pending request, direct host-initiated
//! captures, duplicate suppression and the diagnostic log trail.

use super::common::TestEnv;
use sysdump::core::{CreateParams, NotifyOutcome};
use sysdump::data::{OperationStatus, OriginatorType, INVALID_SOURCE_ID};
use sysdump::host::DumpLogEvent;

#[tokio::test]
async fn test_notification_completes_pending_request() {
    let env = TestEnv::new();
    let (manager, _) = env.open();

    let params = CreateParams::new().with_originator("redfish-42", OriginatorType::Client);
    let path = manager.create_dump(params).await.unwrap();
    assert_eq!(path.as_str(), "/xyz/openbmc_project/dump/system/entry/1");

    let pending = manager.entry(1).unwrap();
    assert_eq!(pending.source_id, INVALID_SOURCE_ID);
    assert_eq!(pending.status, OperationStatus::InProgress);

    let outcome = manager.notify(0x2000_0001, 4096).await.unwrap();
    let entry = match outcome {
        NotifyOutcome::Updated(entry) => entry,
        other => panic!("expected update, got {:?}", other),
    };

    assert_eq!(entry.id, 1);
    assert_eq!(entry.source_id, 0x2000_0001);
    assert_eq!(entry.size, 4096);
    assert_eq!(entry.status, OperationStatus::Completed);
    assert_eq!(entry.originator_id, "redfish-42");
    assert_eq!(entry.originator_type, OriginatorType::Client);
    assert!(entry.timestamp >= pending.timestamp);

    // The record on disk matches what the manager holds
    let record = env.read_record(1);
    assert_eq!(record.source_id, 0x2000_0001);
    assert_eq!(record.status, OperationStatus::Completed);
    assert_eq!(record.originator_id, "redfish-42");
}

#[tokio::test]
async fn test_host_initiated_capture_creates_entry() {
    let env = TestEnv::new();
    let (manager, _) = env.open();

    let outcome = manager.notify(77, 512).await.unwrap();
    let entry = match outcome {
        NotifyOutcome::Created(entry) => entry,
        other => panic!("expected new entry, got {:?}", other),
    };

    assert_eq!(entry.id, 1);
    assert_eq!(entry.status, OperationStatus::Completed);
    assert_eq!(entry.originator_id, "");
    assert_eq!(entry.originator_type, OriginatorType::Internal);
    assert_eq!(manager.next_id(), 2);
    assert_eq!(env.publisher.added_ids(), vec![1]);
    assert!(env.entries_dir().join("1").exists());
}

#[tokio::test]
async fn test_repeated_notification_is_ignored() {
    let env = TestEnv::new();
    let (manager, _) = env.open();

    manager.notify(77, 512).await.unwrap();
    let before = manager.entries();

    let outcome = manager.notify(77, 9999).await;

    assert_eq!(outcome, Some(NotifyOutcome::Duplicate { entry_id: 1 }));
    assert_eq!(manager.entries(), before);
    assert_eq!(manager.next_id(), 2);
    manager.flush_diagnostics().await;
    assert_eq!(env.host.logged_events().len(), 1);
}

#[tokio::test]
async fn test_invalid_source_id_is_rejected() {
    let env = TestEnv::new();
    let (manager, _) = env.open();

    assert!(manager.notify(INVALID_SOURCE_ID, 10).await.is_none());
    assert!(manager.entries().is_empty());
    assert_eq!(manager.next_id(), 1);
}

#[tokio::test]
async fn test_notification_without_request_leaves_placeholder_alone() {
    let env = TestEnv::new();
    let (manager, _) = env.open();

    // Host reports a capture while a user request is pending: the
    // placeholder absorbs it
    manager.create_dump(CreateParams::new()).await.unwrap();
    manager.notify(10, 100).await.unwrap();

    // Subsequent host-initiated captures get fresh entries
    let outcome = manager.notify(11, 200).await.unwrap();
    assert!(matches!(outcome, NotifyOutcome::Created(ref e) if e.id == 2));

    let ids: Vec<u32> = manager.entries().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(manager.in_progress().is_none());
}

#[tokio::test]
async fn test_completed_entries_produce_log_events() {
    let env = TestEnv::new();
    let (manager, _) = env.open();

    manager.create_dump(CreateParams::new()).await.unwrap();
    assert!(env.host.logged_events().is_empty());

    manager.notify(10, 100).await.unwrap();
    manager.notify(11, 200).await.unwrap();
    manager.flush_diagnostics().await;

    assert_eq!(
        env.host.logged_events(),
        vec![
            DumpLogEvent::system_dump(1, env.dumps_dir().join("1")),
            DumpLogEvent::system_dump(2, env.dumps_dir().join("2")),
        ]
    );
    assert!(env
        .host
        .logged_events()
        .iter()
        .all(|event| event.file_type == "System Dump"));
}
