//! Property tests over arbitrary request/notification sequences

use proptest::prelude::*;

use super::common::TestEnv;
use sysdump::core::CreateParams;
use sysdump::data::{OperationStatus, INVALID_SOURCE_ID};

#[derive(Debug, Clone)]
enum Op {
    Create,
    Notify { source_id: u32, size: u64 },
    Restart,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::Create),
        3 => (0u32..6, 0u64..4096).prop_map(|(source_id, size)| Op::Notify { source_id, size }),
        1 => Just(Op::Restart),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn store_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let env = TestEnv::new();
        let (mut manager, _) = env.open();
        let mut highest_seen = 0u32;

        for op in ops {
            match op {
                Op::Create => {
                    let _ = tokio_test::block_on(manager.create_dump(CreateParams::new()));
                }
                Op::Notify { source_id, size } => {
                    let _ = tokio_test::block_on(manager.notify(source_id, size));
                }
                Op::Restart => {
                    drop(manager);
                    manager = env.open().0;
                }
            }

            let entries = manager.entries();

            let pending = entries.iter().filter(|e| e.is_pending_placeholder()).count();
            prop_assert!(pending <= 1);

            // Completed entries carry distinct, real source ids
            let mut sources: Vec<u32> = entries
                .iter()
                .filter(|e| e.status == OperationStatus::Completed)
                .map(|e| e.source_id)
                .collect();
            prop_assert!(sources.iter().all(|s| *s != INVALID_SOURCE_ID));
            let total = sources.len();
            sources.sort_unstable();
            sources.dedup();
            prop_assert_eq!(sources.len(), total);

            // Ids are never reused and the counter stays ahead of them
            let max_id = entries.iter().map(|e| e.id).max().unwrap_or(0);
            prop_assert!(max_id >= highest_seen);
            highest_seen = max_id;
            prop_assert!(manager.next_id() > max_id);
            prop_assert!(entries.iter().all(|e| e.id >= 1));
        }
    }
}
