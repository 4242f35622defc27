use service_area_sync::{
    CityLocation, CityLocationId, MemoryContentSource, Purger, ReconcileOptions, Reconciler,
    Service, ServiceId, Stage, Summary,
};

fn services(n: usize) -> Vec<Service> {
    (1..=n)
        .map(|i| Service {
            id: ServiceId::new(format!("s{}", i)),
            name: format!("Service {}", i),
            slug: format!("service-{}", i),
        })
        .collect()
}

fn cities(n: usize) -> Vec<CityLocation> {
    (1..=n)
        .map(|i| CityLocation {
            id: CityLocationId::new(format!("c{}", i)),
            city: format!("City {}", i),
            slug: format!("city-{}", i),
        })
        .collect()
}

fn source(n_services: usize, n_cities: usize) -> MemoryContentSource {
    MemoryContentSource::new()
        .with_services(services(n_services))
        .with_cities(cities(n_cities))
}

fn dry_run() -> ReconcileOptions {
    ReconcileOptions {
        dry_run: true,
        ..ReconcileOptions::default()
    }
}

#[tokio::test]
async fn second_run_converges_to_all_skipped() {
    let source = source(3, 4);
    let reconciler = Reconciler::new(&source, ReconcileOptions::default());

    let first = reconciler.run().await.unwrap();
    let second = reconciler.run().await.unwrap();

    assert_eq!(first.created, 12);
    assert_eq!(second.created, 0);
    assert_eq!(second.errors, 0);
    assert_eq!(second.skipped, 12);
    assert_eq!(source.locations().await.len(), 12);
}

#[tokio::test]
async fn every_pair_ends_with_one_published_record() {
    let source = source(3, 3).with_existing("s2", "c2", Stage::Draft);
    let reconciler = Reconciler::new(&source, ReconcileOptions::default());

    let summary = reconciler.run().await.unwrap();
    assert_eq!(summary.errors, 0);

    for service in services(3) {
        for city in cities(3) {
            let records = source
                .locations_for(service.id.as_str(), city.id.as_str())
                .await;
            assert_eq!(records.len(), 1, "{} / {}", service.id, city.id);
            assert!(records[0].is_published());
        }
    }
}

#[tokio::test]
async fn dry_run_issues_no_mutations() {
    let source = source(4, 5)
        .with_existing("s1", "c1", Stage::Draft)
        .with_existing("s4", "c5", Stage::Published);
    let reconciler = Reconciler::new(&source, dry_run());

    let summary = reconciler.run().await.unwrap();

    let calls = source.calls().await;
    assert_eq!(calls.create, 0);
    assert_eq!(calls.publish, 0);
    assert_eq!(calls.find, 20);
    assert_eq!(summary.created + summary.skipped, 20);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.published, summary.created);
    assert!(!source.locations_for("s1", "c1").await[0].is_published());
}

#[tokio::test]
async fn one_failing_pair_does_not_stop_the_run() {
    let source = source(3, 4).with_failing_pair("s2", "c3");
    let reconciler = Reconciler::new(&source, ReconcileOptions::default());

    let summary = reconciler.run().await.unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.created, 11);
    assert_eq!(source.calls().await.find, 12);

    let published = source
        .locations()
        .await
        .into_iter()
        .filter(|l| l.is_published())
        .count();
    assert_eq!(published, 11);
}

#[tokio::test]
async fn purge_deletes_what_seeding_created() {
    let source = source(2, 3);
    Reconciler::new(&source, ReconcileOptions::default())
        .run()
        .await
        .unwrap();
    source.reset_calls().await;

    let deleted = Purger::new(&source, false).purge_all().await.unwrap();

    assert_eq!(deleted, 6);
    assert_eq!(source.calls().await.delete, 6);
    assert!(source.locations().await.is_empty());
}

#[tokio::test]
async fn empty_collections_only_cost_the_list_calls() {
    let source = MemoryContentSource::new();
    let reconciler = Reconciler::new(&source, ReconcileOptions::default());

    let summary = reconciler.run().await.unwrap();

    assert_eq!(summary, Summary::default());
    let calls = source.calls().await;
    assert_eq!(calls.list_services, 1);
    assert_eq!(calls.list_city_locations, 1);
    assert_eq!(calls.find, 0);
    assert_eq!(calls.mutations(), 0);
}

#[tokio::test]
async fn services_without_cities_is_a_no_op() {
    let source = source(3, 0);
    let summary = Reconciler::new(&source, ReconcileOptions::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.total_pairs(), 0);
    assert_eq!(source.calls().await.find, 0);
}

#[tokio::test]
async fn reconciler_accepts_a_trait_object() {
    let source = source(1, 2);
    let dyn_source: &dyn service_area_sync::ContentSource = &source;

    let summary = Reconciler::new(dyn_source, ReconcileOptions::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.created, 2);
}
