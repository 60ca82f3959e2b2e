use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::common::*;
use crate::workflows::risk::batch::{BatchOptions, BatchRecalculator, BatchTarget};
use crate::workflows::risk::domain::{AnimalId, AnimalStatus, MedicalRecord};
use crate::workflows::risk::repository::RiskProfileStore;

fn options(concurrency: usize) -> BatchOptions {
    BatchOptions {
        concurrency,
        item_timeout: Duration::from_secs(5),
    }
}

fn ids(raw: &[&str]) -> Vec<AnimalId> {
    raw.iter().map(|id| animal_id(id)).collect()
}

fn profile_missing(store: &MemoryStore, raw_id: &str) -> bool {
    store
        .get(&animal_id(raw_id))
        .expect("memory store reads")
        .is_none()
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_animal_is_reported_without_aborting_the_run() {
    let provider =
        MemoryProvider::with_animals(["a-1", "a-2", "a-4", "a-5"].into_iter().map(dog));
    let (service, _, store, _) = build_service(provider);
    let batch = BatchRecalculator::new(service, options(2));

    let summary = batch
        .run_at(
            BatchTarget::Animals(ids(&["a-1", "a-2", "a-3", "a-4", "a-5"])),
            as_of(),
            CancellationToken::new(),
        )
        .await
        .expect("batch runs");

    assert_eq!(summary.total, 5);
    assert_eq!(summary.updated, 4);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].animal_id, animal_id("a-3"));
    assert!(summary.errors[0].error.contains("not found"));
    assert!(!summary.cancelled);
    assert_eq!(store.len(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn rerunning_a_batch_is_idempotent() {
    let provider = MemoryProvider::with_animals(["a-1", "a-2", "a-3"].into_iter().map(dog));
    let (service, _, store, alerts) = build_service(provider);
    let batch = BatchRecalculator::new(service.clone(), options(4));
    let target = BatchTarget::Organization(organization());

    let first = batch
        .run_at(target.clone(), as_of(), CancellationToken::new())
        .await
        .expect("first run");
    let snapshot = service.profile(&animal_id("a-2")).expect("profile stored");
    let second = batch
        .run_at(target, as_of(), CancellationToken::new())
        .await
        .expect("second run");

    assert_eq!(first, second);
    assert_eq!(second.updated, 3);
    assert_eq!(store.len(), 3);
    assert_eq!(
        service.profile(&animal_id("a-2")).expect("profile stored"),
        snapshot
    );
    assert!(alerts.events().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn organization_target_skips_inactive_animals() {
    let mut adopted = dog("a-2");
    adopted.status = AnimalStatus::Adopted;
    let mut elsewhere = dog("b-1");
    elsewhere.organization_id.0 = "org-hillside".to_string();
    let provider = MemoryProvider::with_animals([dog("a-1"), adopted, dog("a-3"), elsewhere]);
    let (service, _, store, _) = build_service(provider);
    let batch = BatchRecalculator::new(service, options(4));

    let summary = batch
        .run_at(
            BatchTarget::Organization(organization()),
            as_of(),
            CancellationToken::new(),
        )
        .await
        .expect("batch runs");

    assert_eq!(summary.total, 2);
    assert_eq!(summary.updated, 2);
    assert!(summary.errors.is_empty());
    assert_eq!(store.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn explicit_inactive_animals_are_ineligible() {
    let mut adopted = dog("a-2");
    adopted.status = AnimalStatus::Adopted;
    let (service, _, store, _) = build_service(MemoryProvider::with_animals([dog("a-1"), adopted]));
    let batch = BatchRecalculator::new(service, options(4));

    let summary = batch
        .run_at(
            BatchTarget::Animals(ids(&["a-1", "a-2"])),
            as_of(),
            CancellationToken::new(),
        )
        .await
        .expect("batch runs");

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].animal_id, animal_id("a-2"));
    assert!(summary.errors[0].error.contains("adopted"));
    assert_eq!(store.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_ids_are_scored_once() {
    let (service, _, _, _) =
        build_service(MemoryProvider::with_animals([dog("a-1"), dog("a-2")]));
    let batch = BatchRecalculator::new(service, options(4));

    let summary = batch
        .run_at(
            BatchTarget::Animals(ids(&["a-1", "a-2", "a-1", "a-2", "a-1"])),
            as_of(),
            CancellationToken::new(),
        )
        .await
        .expect("batch runs");

    assert_eq!(summary.total, 2);
    assert_eq!(summary.updated, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelled_batch_enqueues_nothing() {
    let provider = MemoryProvider::with_animals(["a-1", "a-2", "a-3"].into_iter().map(dog));
    let (service, _, store, _) = build_service(provider);
    let batch = BatchRecalculator::new(service, options(1));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = batch
        .run_at(BatchTarget::Organization(organization()), as_of(), cancel)
        .await
        .expect("batch settles");

    assert!(summary.cancelled);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.updated, 0);
    assert!(summary.errors.is_empty());
    assert_eq!(store.len(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_items_time_out_individually() {
    let provider = MemoryProvider::with_animals(["a-1", "a-2", "a-3"].into_iter().map(dog));
    provider.stall(&animal_id("a-2"), Duration::from_millis(300));
    let (service, _, store, _) = build_service(provider);
    let batch = BatchRecalculator::new(
        service,
        BatchOptions {
            concurrency: 3,
            item_timeout: Duration::from_millis(25),
        },
    );

    let summary = batch
        .run_at(
            BatchTarget::Organization(organization()),
            as_of(),
            CancellationToken::new(),
        )
        .await
        .expect("batch runs");

    assert_eq!(summary.updated, 2);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].animal_id, animal_id("a-2"));
    assert_eq!(summary.errors[0].error, "timed out after 25ms");

    // The stalled lookup finishes later but its profile is never written.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(store.len(), 2);
    assert!(profile_missing(&store, "a-2"));
}

#[tokio::test(flavor = "multi_thread")]
async fn timed_out_items_keep_their_permit_until_the_work_returns() {
    let animals = ["a-1", "a-2", "a-3", "a-4"];
    let provider = MemoryProvider::with_animals(animals.into_iter().map(dog));
    for id in animals {
        provider.stall(&animal_id(id), Duration::from_millis(100));
    }
    let (service, provider, store, alerts) = build_service(provider);
    let batch = BatchRecalculator::new(
        service,
        BatchOptions {
            concurrency: 1,
            item_timeout: Duration::from_millis(25),
        },
    );

    let summary = batch
        .run_at(
            BatchTarget::Animals(ids(&animals)),
            as_of(),
            CancellationToken::new(),
        )
        .await
        .expect("batch runs");

    assert_eq!(summary.updated, 0);
    assert_eq!(summary.errors.len(), 4);
    assert!(summary
        .errors
        .iter()
        .all(|item| item.error == "timed out after 25ms"));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(provider.peak_in_flight(), 1);
    assert_eq!(store.len(), 0);
    assert!(alerts.events().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn alerts_are_counted_per_item() {
    let provider = MemoryProvider::with_animals(["a-1", "a-2", "a-3"].into_iter().map(dog));
    let (service, provider, _, alerts) = build_service(provider);
    let batch = BatchRecalculator::new(service, options(2));
    let target = BatchTarget::Organization(organization());

    let baseline = batch
        .run_at(target.clone(), as_of(), CancellationToken::new())
        .await
        .expect("baseline run");
    assert_eq!(baseline.alerts_raised, 0);

    // Everyone feels the crowding; only a-1 crosses into the high tier.
    provider.set_population(None, 110, 100);
    provider.update(&animal_id("a-1"), |fixture| {
        if let Some(snapshot) = fixture.snapshot.as_mut() {
            snapshot.intake_date = date(2025, 1, 1);
            snapshot.primary_color = Some("black".to_string());
        }
        fixture.medical.push(MedicalRecord {
            recorded_on: date(2025, 5, 20),
            diagnosis: "chronic kidney disease".to_string(),
            follow_up_required: true,
            follow_up_date: None,
            affects_adoptability: true,
            is_treatable: false,
        });
    });

    let rescored = batch
        .run_at(target, as_of(), CancellationToken::new())
        .await
        .expect("second run");

    assert_eq!(rescored.updated, 3);
    assert_eq!(rescored.alerts_raised, 1);
    let events = alerts.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].animal_id, animal_id("a-1"));
    assert_eq!(events[0].new_score, 61);
}
