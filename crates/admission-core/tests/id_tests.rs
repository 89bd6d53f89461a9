use admission_core::{Clock, IdGenerator, MemoryRecordStore, ProtocolId, RecordStore, SequencePolicy};
use admission_test_utils::{
    date, datetime, form_for, stored_request, workflow_with_store, FixedClock, RecordingNotifier,
    MANAGER_EMAIL,
};
use proptest::prelude::*;
use std::sync::Arc;

fn store_with(ids: &[(i32, u32)]) -> Arc<MemoryRecordStore> {
    let records = ids
        .iter()
        .map(|&(year, seq)| stored_request(ProtocolId::new(year, seq), datetime(year, 3, 1)))
        .collect();
    Arc::new(MemoryRecordStore::with_records(records))
}

fn generator(
    store: Arc<MemoryRecordStore>,
    clock: Arc<FixedClock>,
    policy: SequencePolicy,
) -> IdGenerator {
    let store: Arc<dyn RecordStore> = store;
    let clock: Arc<dyn Clock> = clock;
    IdGenerator::new(store, clock).with_policy(policy)
}

#[tokio::test]
async fn test_row_count_keeps_counting_across_years() {
    let store = store_with(&[(2024, 1), (2024, 2), (2024, 3)]);
    let clock = Arc::new(FixedClock::on(2025, 1, 2));

    let next = generator(store, clock, SequencePolicy::RowCount).next_id().await.unwrap();
    assert_eq!(next.to_string(), "ADM-2025-00004");
}

#[tokio::test]
async fn test_year_max_restarts_in_new_year() {
    let store = store_with(&[(2024, 1), (2024, 2), (2024, 3)]);
    let clock = Arc::new(FixedClock::on(2025, 1, 2));

    let next = generator(store, clock, SequencePolicy::YearMax).next_id().await.unwrap();
    assert_eq!(next.to_string(), "ADM-2025-00001");
}

#[tokio::test]
async fn test_year_max_through_workflow_across_new_year() {
    let clock = Arc::new(FixedClock::on(2024, 12, 30));
    let harness = workflow_with_store(
        Arc::new(RecordingNotifier::new()),
        clock.clone(),
        Arc::new(MemoryRecordStore::new()),
    );
    let workflow = harness.workflow.with_sequence_policy(SequencePolicy::YearMax);

    let december = workflow
        .submit(&form_for(MANAGER_EMAIL, date(2024, 12, 30)))
        .await
        .unwrap();
    assert_eq!(december.protocol_id(), Some(ProtocolId::new(2024, 1)));

    clock.set(datetime(2025, 1, 2));
    let january = workflow
        .submit(&form_for(MANAGER_EMAIL, date(2025, 1, 2)))
        .await
        .unwrap();
    assert_eq!(january.protocol_id(), Some(ProtocolId::new(2025, 1)));
    assert_eq!(harness.store.len().await.unwrap(), 2);
}

#[tokio::test]
async fn test_row_count_ignores_gaps_that_year_max_skips() {
    // Row counting only sees how many rows exist, not which IDs they hold.
    let store = store_with(&[(2025, 1), (2025, 7)]);
    let clock = Arc::new(FixedClock::on(2025, 6, 1));

    let row_count = generator(store.clone(), clock.clone(), SequencePolicy::RowCount)
        .next_id()
        .await
        .unwrap();
    let year_max = generator(store, clock, SequencePolicy::YearMax)
        .next_id()
        .await
        .unwrap();

    assert_eq!(row_count, ProtocolId::new(2025, 3));
    assert_eq!(year_max, ProtocolId::new(2025, 8));
}

proptest! {
    #[test]
    fn prop_kth_record_of_year(k in 1u32..500) {
        let existing: Vec<_> = (1..k).map(|seq| (2025, seq)).collect();
        let store = store_with(&existing);
        let clock = Arc::new(FixedClock::on(2025, 8, 15));

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let next = runtime
            .block_on(generator(store, clock, SequencePolicy::RowCount).next_id())
            .unwrap();
        prop_assert_eq!(next.to_string(), format!("ADM-2025-{k:05}"));
    }
}
