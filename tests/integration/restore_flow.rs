//! Integration tests for restart recovery
//!
//! A manager is opened, mutated and dropped; a second manager over the
//! same directory must see the same entries and continue numbering.

use super::common::TestEnv;
use sysdump::core::{CreateParams, NotifyOutcome};
use sysdump::data::{OperationStatus, OriginatorType, INVALID_SOURCE_ID};

#[tokio::test]
async fn test_entries_survive_restart() {
    let env = TestEnv::new();
    let before = {
        let (manager, _) = env.open();
        manager.notify(100, 1000).await.unwrap();
        manager.notify(101, 2000).await.unwrap();
        manager
            .create_dump(CreateParams::new().with_originator("bmcweb", OriginatorType::Client))
            .await
            .unwrap();
        manager.entries()
    };

    let (manager, report) = env.open();

    assert_eq!(report.restored, vec![1, 2, 3]);
    assert!(report.skipped.is_empty());
    assert_eq!(manager.entries(), before);
    assert_eq!(manager.next_id(), 4);
}

#[tokio::test]
async fn test_pending_request_completes_after_restart() {
    let env = TestEnv::new();
    {
        let (manager, _) = env.open();
        manager.create_dump(CreateParams::new()).await.unwrap();
    }

    let (manager, _) = env.open();
    let pending = manager.in_progress().unwrap();
    assert_eq!(pending.id, 1);
    assert_eq!(pending.source_id, INVALID_SOURCE_ID);

    let outcome = manager.notify(55, 5).await.unwrap();
    assert!(matches!(outcome, NotifyOutcome::Updated(ref e) if e.id == 1));

    // Still rejected as a duplicate after another restart
    drop(manager);
    let (manager, _) = env.open();
    assert_eq!(
        manager.notify(55, 5).await,
        Some(NotifyOutcome::Duplicate { entry_id: 1 })
    );
}

#[tokio::test]
async fn test_unreadable_records_are_skipped() {
    let env = TestEnv::new();
    {
        let (manager, _) = env.open();
        manager.notify(1, 10).await.unwrap();
        manager.notify(2, 20).await.unwrap();
        manager.notify(3, 30).await.unwrap();
    }
    env.write_record("2", "{ not json");
    env.write_record("notes.txt", "left by an operator");
    env.write_record("0", "{}");
    env.write_record(".entry-abc123", "partial write");

    let (manager, report) = env.open();

    assert_eq!(report.restored, vec![1, 3]);
    let mut skipped: Vec<&str> = report.skipped.iter().map(|s| s.key.as_str()).collect();
    skipped.sort();
    assert_eq!(skipped, vec!["0", "2", "notes.txt"]);

    let ids: Vec<u32> = manager.entries().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(manager.next_id(), 4);
    assert!(!env.entries_dir().join(".entry-abc123").exists());
}

#[tokio::test]
async fn test_ids_resume_after_highest_restored() {
    let env = TestEnv::new();
    for (id, source) in [(3, 30), (7, 70)] {
        env.write_record(
            &id.to_string(),
            &format!(
                r#"{{"version":1,"timestamp":1700000000000000,"size":1,"source_id":{},"status":"completed","originator_id":"","originator_type":"Internal"}}"#,
                source
            ),
        );
    }
    env.write_record("5", "garbage");

    let (manager, report) = env.open();
    assert_eq!(report.restored, vec![3, 7]);

    let outcome = manager.notify(99, 9).await.unwrap();
    assert!(matches!(outcome, NotifyOutcome::Created(ref e) if e.id == 8));
}

#[tokio::test]
async fn test_record_without_originator_id_loads() {
    let env = TestEnv::new();
    env.write_record(
        "4",
        r#"{"version":1,"timestamp":5,"size":64,"source_id":9,"status":"completed","originator_type":"Client"}"#,
    );

    let (manager, _) = env.open();
    let entry = manager.entry(4).unwrap();

    assert_eq!(entry.originator_id, "");
    assert_eq!(entry.originator_type, OriginatorType::Client);
    assert_eq!(entry.status, OperationStatus::Completed);
    assert_eq!(
        entry.object_path.as_str(),
        "/xyz/openbmc_project/dump/system/entry/4"
    );
}

#[tokio::test]
async fn test_newer_record_version_is_kept_intact() {
    let env = TestEnv::new();
    let newer = r#"{"version":2,"timestamp":5,"size":555,"source_id":50,"status":"completed","originator_type":"Client"}"#;
    env.write_record(
        "3",
        r#"{"version":1,"timestamp":5,"size":64,"source_id":9,"status":"completed","originator_type":"Client"}"#,
    );
    env.write_record("5", newer);

    let (manager, report) = env.open();

    assert_eq!(report.restored, vec![3]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].key, "5");
    assert_eq!(manager.next_id(), 6);

    manager.notify(40, 3).await.unwrap();
    manager.notify(41, 4).await.unwrap();

    let ids: Vec<u32> = manager.entries().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![3, 6, 7]);
    let on_disk = std::fs::read_to_string(env.entries_dir().join("5")).unwrap();
    assert_eq!(on_disk, newer);
}

#[tokio::test]
async fn test_corrupt_highest_record_is_not_reused() {
    let env = TestEnv::new();
    {
        let (manager, _) = env.open();
        manager.notify(1, 10).await.unwrap();
        manager.notify(2, 20).await.unwrap();
    }
    env.write_record("2", "{ torn");

    let (manager, report) = env.open();
    assert_eq!(report.restored, vec![1]);

    let outcome = manager.notify(3, 30).await.unwrap();
    assert!(matches!(outcome, NotifyOutcome::Created(ref e) if e.id == 3));
    let on_disk = std::fs::read_to_string(env.entries_dir().join("2")).unwrap();
    assert_eq!(on_disk, "{ torn");
}

#[tokio::test]
async fn test_restore_publishes_every_entry() {
    let env = TestEnv::new();
    {
        let (manager, _) = env.open();
        manager.notify(1, 1).await.unwrap();
        manager.notify(2, 2).await.unwrap();
    }
    assert_eq!(env.publisher.added_ids(), vec![1, 2]);

    let _ = env.open();
    assert_eq!(env.publisher.added_ids(), vec![1, 2, 1, 2]);
    assert!(env.root().join("entries").is_dir());
}
