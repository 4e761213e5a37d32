use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Actor, CreateCompanyCmd, CreateDeedCmd, CreateEntryCmd, CreateEntryTypeCmd, DeedFilter,
    DeleteCmd, DeletedWindow, DistributeStrategy, DistributionSpec, DrainFilter, Engine,
    EngineError, Power, Quantity, UpdateDeedCmd,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, 9, 0, 0).unwrap()
}

fn qty(raw: &str) -> Quantity {
    raw.parse().unwrap()
}

/// One company owned by alice with entry type ET1 holding E1 (100, oldest)
/// and E2 (50, newest).
struct Fixture {
    engine: Engine,
    _db: DatabaseConnection,
    alice: Actor,
    company: Uuid,
    et1: Uuid,
    e1: Uuid,
    e2: Uuid,
}

impl Fixture {
    async fn new() -> Self {
        let (engine, db) = engine_with_db().await;
        let alice = Actor::owner("alice");
        let company = engine
            .create_company(&alice, CreateCompanyCmd::new("Acme S.p.A.", "IT0001", "MI-1"))
            .await
            .unwrap()
            .id;
        let et1 = engine
            .create_entry_type(&alice, CreateEntryTypeCmd::new("ET1", "kg"))
            .await
            .unwrap()
            .id;
        let e1 = engine
            .create_entry(
                &alice,
                CreateEntryCmd::new(company, et1, Quantity::from_units(100)).date_added(day(1)),
            )
            .await
            .unwrap()
            .id;
        let e2 = engine
            .create_entry(
                &alice,
                CreateEntryCmd::new(company, et1, Quantity::from_units(50)).date_added(day(2)),
            )
            .await
            .unwrap()
            .id;
        Self {
            engine,
            _db: db,
            alice,
            company,
            et1,
            e1,
            e2,
        }
    }

    async fn available(&self) -> BTreeMap<Uuid, Quantity> {
        self.engine
            .available_for_entries(&self.alice, self.company, &[self.e1, self.e2])
            .await
            .unwrap()
    }

    async fn create(&self, spec: DistributionSpec) -> Result<engine::Deed, EngineError> {
        self.engine
            .create_deed(
                &self.alice,
                CreateDeedCmd::new(self.company, "Shipment", Quantity::from_units(1), "kg", spec),
            )
            .await
    }

    async fn drains(&self, include_reversed: bool) -> usize {
        self.engine
            .find_drain(
                &self.alice,
                &DrainFilter {
                    include_reversed,
                    ..DrainFilter::default()
                },
            )
            .await
            .unwrap()
            .len()
    }
}

#[tokio::test]
async fn oldest_most_remaining_first_drains_oldest_entry() {
    let fx = Fixture::new().await;

    let deed = fx
        .create(DistributionSpec::by_entry_type(
            [(fx.et1, Quantity::from_units(120))],
            DistributeStrategy::OldMany,
        ))
        .await
        .unwrap();

    assert_eq!(
        deed.distribution,
        BTreeMap::from([
            (fx.e1, Quantity::from_units(100)),
            (fx.e2, Quantity::from_units(20)),
        ])
    );
    assert_eq!(
        fx.available().await,
        BTreeMap::from([(fx.e1, Quantity::ZERO), (fx.e2, Quantity::from_units(30))])
    );
}

#[tokio::test]
async fn newest_most_remaining_first_drains_newest_entry() {
    let fx = Fixture::new().await;

    let deed = fx
        .create(DistributionSpec::by_entry_type(
            [(fx.et1, Quantity::from_units(120))],
            DistributeStrategy::NewMany,
        ))
        .await
        .unwrap();

    assert_eq!(
        deed.distribution,
        BTreeMap::from([
            (fx.e1, Quantity::from_units(70)),
            (fx.e2, Quantity::from_units(50)),
        ])
    );
}

#[tokio::test]
async fn insufficient_entry_type_reports_shortfall_and_writes_nothing() {
    let fx = Fixture::new().await;

    let err = fx
        .create(DistributionSpec::by_entry_type(
            [(fx.et1, Quantity::from_units(200))],
            DistributeStrategy::OldMany,
        ))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::Conflict {
            message: "not enough quantity".to_string(),
            shortfall: BTreeMap::from([(fx.et1, Quantity::from_units(50))]),
        }
    );
    assert_eq!(fx.drains(true).await, 0);
    let (deeds, total) = fx
        .engine
        .find_deed(&fx.alice, &DeedFilter::default())
        .await
        .unwrap();
    assert!(deeds.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn explicit_distribution_on_foreign_entry_is_unauthorized() {
    let fx = Fixture::new().await;
    let other = fx
        .engine
        .create_company(&fx.alice, CreateCompanyCmd::new("Other S.r.l.", "IT0002", "TO-2"))
        .await
        .unwrap()
        .id;
    let foreign = fx
        .engine
        .create_entry(
            &fx.alice,
            CreateEntryCmd::new(other, fx.et1, Quantity::from_units(10)).date_added(day(3)),
        )
        .await
        .unwrap()
        .id;

    let err = fx
        .create(DistributionSpec::explicit([
            (fx.e1, Quantity::from_units(5)),
            (foreign, Quantity::from_units(5)),
        ]))
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::Unauthorized("foreign entry".to_string()));
    assert_eq!(fx.drains(true).await, 0);
    assert_eq!(
        fx.available().await[&fx.e1],
        Quantity::from_units(100)
    );
}

#[tokio::test]
async fn replacing_distribution_releases_old_entries() {
    let fx = Fixture::new().await;
    let deed = fx
        .create(DistributionSpec::explicit([(fx.e1, Quantity::from_units(100))]))
        .await
        .unwrap();
    assert_eq!(fx.available().await[&fx.e1], Quantity::ZERO);

    let updated = fx
        .engine
        .update_deed(
            &fx.alice,
            UpdateDeedCmd::new(deed.id)
                .distribution(DistributionSpec::explicit([(fx.e2, Quantity::from_units(50))])),
        )
        .await
        .unwrap();

    assert_eq!(
        updated.distribution,
        BTreeMap::from([(fx.e2, Quantity::from_units(50))])
    );
    assert_eq!(
        fx.available().await,
        BTreeMap::from([(fx.e1, Quantity::from_units(100)), (fx.e2, Quantity::ZERO)])
    );
    let stale = fx
        .engine
        .find_drain(
            &fx.alice,
            &DrainFilter {
                entry_id: Some(fx.e1),
                include_reversed: true,
                ..DrainFilter::default()
            },
        )
        .await
        .unwrap();
    assert!(stale.is_empty());
}

#[tokio::test]
async fn replanning_can_reuse_the_deeds_own_quantity() {
    let fx = Fixture::new().await;
    let deed = fx
        .create(DistributionSpec::explicit([(fx.e1, Quantity::from_units(100))]))
        .await
        .unwrap();

    let updated = fx
        .engine
        .update_deed(
            &fx.alice,
            UpdateDeedCmd::new(deed.id).title("Shipment #2").distribution(
                DistributionSpec::by_entry_type(
                    [(fx.et1, Quantity::from_units(150))],
                    DistributeStrategy::OldFew,
                ),
            ),
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Shipment #2");
    assert_eq!(
        updated.distribution,
        BTreeMap::from([
            (fx.e1, Quantity::from_units(100)),
            (fx.e2, Quantity::from_units(50)),
        ])
    );
}

#[tokio::test]
async fn failed_update_keeps_previous_drains() {
    let fx = Fixture::new().await;
    let deed = fx
        .create(DistributionSpec::explicit([(fx.e1, Quantity::from_units(40))]))
        .await
        .unwrap();

    let err = fx
        .engine
        .update_deed(
            &fx.alice,
            UpdateDeedCmd::new(deed.id)
                .title("renamed")
                .distribution(DistributionSpec::explicit([(fx.e2, Quantity::from_units(60))])),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::Conflict {
            message: "not enough entries".to_string(),
            shortfall: BTreeMap::from([(fx.e2, Quantity::from_units(10))]),
        }
    );
    let (deeds, _) = fx
        .engine
        .find_deed(&fx.alice, &DeedFilter::default())
        .await
        .unwrap();
    assert_eq!(deeds[0].title, "Shipment");
    assert_eq!(
        deeds[0].distribution,
        BTreeMap::from([(fx.e1, Quantity::from_units(40))])
    );
}

#[tokio::test]
async fn undrain_round_trip_restores_availability() {
    let fx = Fixture::new().await;
    let before = fx.available().await;
    let deed = fx
        .create(DistributionSpec::by_entry_type(
            [(fx.et1, qty("123.45678"))],
            DistributeStrategy::FewOld,
        ))
        .await
        .unwrap();
    assert_ne!(fx.available().await, before);

    let affected = fx
        .engine
        .delete_deed(&fx.alice, DeleteCmd::soft(deed.id).undrain())
        .await
        .unwrap();

    assert_eq!(affected, 1);
    assert_eq!(fx.available().await, before);
    assert_eq!(fx.drains(false).await, 0);
    assert_eq!(fx.drains(true).await, 2);
}

#[tokio::test]
async fn soft_delete_without_undrain_keeps_quantity_consumed() {
    let fx = Fixture::new().await;
    let deed = fx
        .create(DistributionSpec::explicit([(fx.e2, Quantity::from_units(50))]))
        .await
        .unwrap();

    fx.engine
        .delete_deed(&fx.alice, DeleteCmd::soft(deed.id))
        .await
        .unwrap();

    assert_eq!(fx.available().await[&fx.e2], Quantity::ZERO);
    let again = fx
        .engine
        .delete_deed(&fx.alice, DeleteCmd::soft(deed.id))
        .await
        .unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
async fn undrain_on_already_deleted_deed_leaves_drains_active() {
    let fx = Fixture::new().await;
    let deed = fx
        .create(DistributionSpec::explicit([(fx.e2, Quantity::from_units(50))]))
        .await
        .unwrap();
    fx.engine
        .delete_deed(&fx.alice, DeleteCmd::soft(deed.id))
        .await
        .unwrap();

    let affected = fx
        .engine
        .delete_deed(&fx.alice, DeleteCmd::soft(deed.id).undrain())
        .await
        .unwrap();

    assert_eq!(affected, 0);
    assert_eq!(fx.available().await[&fx.e2], Quantity::ZERO);
}

#[tokio::test]
async fn requesting_exact_total_succeeds_and_epsilon_more_conflicts() {
    let fx = Fixture::new().await;

    let err = fx
        .create(DistributionSpec::by_entry_type(
            [(fx.et1, qty("150.00001"))],
            DistributeStrategy::NewFew,
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err.shortfall(),
        Some(&BTreeMap::from([(fx.et1, Quantity::from_minor(1))]))
    );

    fx.create(DistributionSpec::by_entry_type(
        [(fx.et1, Quantity::from_units(150))],
        DistributeStrategy::NewFew,
    ))
    .await
    .unwrap();
    assert_eq!(
        fx.available().await,
        BTreeMap::from([(fx.e1, Quantity::ZERO), (fx.e2, Quantity::ZERO)])
    );
}

#[tokio::test]
async fn unknown_strategy_name_is_rejected() {
    let err = "oldest".parse::<DistributeStrategy>().unwrap_err();
    assert_eq!(
        err,
        EngineError::Invalid("unknown distribute strategy: oldest".to_string())
    );
}

#[tokio::test]
async fn resurrect_with_undrain_rechecks_availability() {
    let fx = Fixture::new().await;
    let first = fx
        .create(DistributionSpec::explicit([(fx.e1, Quantity::from_units(100))]))
        .await
        .unwrap();
    fx.engine
        .delete_deed(&fx.alice, DeleteCmd::soft(first.id).undrain())
        .await
        .unwrap();
    fx.create(DistributionSpec::explicit([(fx.e1, Quantity::from_units(60))]))
        .await
        .unwrap();

    let err = fx
        .engine
        .delete_deed(&fx.alice, DeleteCmd::resurrect(first.id).undrain())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::Conflict {
            message: "not enough entries".to_string(),
            shortfall: BTreeMap::from([(fx.e1, Quantity::from_units(60))]),
        }
    );
    // Still deleted, still released.
    let (live, _) = fx
        .engine
        .find_deed(
            &fx.alice,
            &DeedFilter {
                ids: vec![first.id],
                ..DeedFilter::default()
            },
        )
        .await
        .unwrap();
    assert!(live.is_empty());
    assert_eq!(fx.available().await[&fx.e1], Quantity::from_units(40));
}

#[tokio::test]
async fn resurrect_with_undrain_claims_quantity_again() {
    let fx = Fixture::new().await;
    let deed = fx
        .create(DistributionSpec::explicit([(fx.e1, Quantity::from_units(30))]))
        .await
        .unwrap();
    fx.engine
        .delete_deed(&fx.alice, DeleteCmd::soft(deed.id).undrain())
        .await
        .unwrap();

    let affected = fx
        .engine
        .delete_deed(&fx.alice, DeleteCmd::resurrect(deed.id).undrain())
        .await
        .unwrap();

    assert_eq!(affected, 1);
    assert_eq!(fx.available().await[&fx.e1], Quantity::from_units(70));
    let (deeds, _) = fx
        .engine
        .find_deed(&fx.alice, &DeedFilter::default())
        .await
        .unwrap();
    assert_eq!(
        deeds[0].distribution,
        BTreeMap::from([(fx.e1, Quantity::from_units(30))])
    );
}

#[tokio::test]
async fn hard_delete_is_guarded_by_active_drains() {
    let fx = Fixture::new().await;
    let deed = fx
        .create(DistributionSpec::explicit([(fx.e1, Quantity::from_units(10))]))
        .await
        .unwrap();

    let blocked = fx
        .engine
        .delete_deed(&fx.alice, DeleteCmd::hard(deed.id))
        .await
        .unwrap();
    assert_eq!(blocked, 0);
    assert_eq!(fx.drains(false).await, 1);

    fx.engine
        .delete_deed(&fx.alice, DeleteCmd::soft(deed.id).undrain())
        .await
        .unwrap();
    let removed = fx
        .engine
        .delete_deed(&fx.alice, DeleteCmd::hard(deed.id))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(fx.drains(true).await, 0);

    let err = fx
        .engine
        .delete_deed(&fx.alice, DeleteCmd::hard(deed.id))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("deed".to_string()));
}

#[tokio::test]
async fn deleted_window_lists_only_deeds_deleted_inside_it() {
    let fx = Fixture::new().await;
    let early = fx
        .create(DistributionSpec::explicit(BTreeMap::new()))
        .await
        .unwrap();
    let late = fx
        .create(DistributionSpec::explicit(BTreeMap::new()))
        .await
        .unwrap();
    let live = fx
        .create(DistributionSpec::explicit(BTreeMap::new()))
        .await
        .unwrap();
    fx.engine
        .delete_deed(&fx.alice, DeleteCmd::soft(early.id).at(day(5)))
        .await
        .unwrap();
    fx.engine
        .delete_deed(&fx.alice, DeleteCmd::soft(late.id).at(day(10)))
        .await
        .unwrap();

    let (rows, total) = fx
        .engine
        .find_deed(&fx.alice, &DeedFilter::default())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].id, live.id);

    let window = |from, to| DeedFilter {
        deleted: DeletedWindow { from, to },
        ..DeedFilter::default()
    };
    let (rows, _) = fx
        .engine
        .find_deed(&fx.alice, &window(Some(day(1)), Some(day(10))))
        .await
        .unwrap();
    assert_eq!(rows.iter().map(|d| d.id).collect::<Vec<_>>(), vec![early.id]);

    let (_, total) = fx
        .engine
        .find_deed(&fx.alice, &window(Some(day(5)), None))
        .await
        .unwrap();
    assert_eq!(total, 2);

    let err = fx
        .engine
        .find_deed(&fx.alice, &window(Some(day(10)), Some(day(5))))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Invalid(_)));
}

#[tokio::test]
async fn find_deed_filters_and_pages() {
    let fx = Fixture::new().await;
    for title in ["Charlie", "Alpha", "Bravo"] {
        fx.engine
            .create_deed(
                &fx.alice,
                CreateDeedCmd::new(
                    fx.company,
                    title,
                    Quantity::from_units(1),
                    "kg",
                    DistributionSpec::explicit(BTreeMap::new()),
                )
                .unit_price_minor(250),
            )
            .await
            .unwrap();
    }

    let page = DeedFilter {
        page: engine::Page {
            limit: 2,
            offset: 1,
        },
        ..DeedFilter::default()
    };
    let (rows, total) = fx.engine.find_deed(&fx.alice, &page).await.unwrap();
    assert_eq!(total, 3);
    assert_eq!(
        rows.iter().map(|d| d.title.as_str()).collect::<Vec<_>>(),
        vec!["Bravo", "Charlie"]
    );

    let by_title = DeedFilter {
        title: Some("Alpha".to_string()),
        ..DeedFilter::default()
    };
    let (rows, total) = fx.engine.find_deed(&fx.alice, &by_title).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows[0].unit_price_minor, 250);

    let bob = Actor::owner("bob");
    let (rows, total) = fx.engine.find_deed(&bob, &DeedFilter::default()).await.unwrap();
    assert!(rows.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn foreign_company_and_missing_power_are_unauthorized() {
    let fx = Fixture::new().await;
    let bob = Actor::owner("bob");

    let err = fx
        .engine
        .create_deed(
            &bob,
            CreateDeedCmd::new(
                fx.company,
                "steal",
                Quantity::from_units(1),
                "kg",
                DistributionSpec::explicit([(fx.e1, Quantity::from_units(1))]),
            ),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Unauthorized("foreign company".to_string()));

    let deed = fx
        .create(DistributionSpec::explicit([(fx.e1, Quantity::from_units(1))]))
        .await
        .unwrap();
    let err = fx
        .engine
        .delete_deed(&bob, DeleteCmd::soft(deed.id))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Unauthorized("foreign deed".to_string()));

    let reader = Actor::new("alice", [Power::ReadOwn]);
    let err = fx
        .engine
        .delete_deed(&reader, DeleteCmd::soft(deed.id))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Unauthorized("missing power delete_own".to_string())
    );

    let admin = Actor::new("root", [Power::DoAnything]);
    let affected = fx
        .engine
        .delete_deed(&admin, DeleteCmd::soft(deed.id).undrain())
        .await
        .unwrap();
    assert_eq!(affected, 1);
}

#[tokio::test]
async fn moving_deed_to_another_company_requires_new_distribution() {
    let fx = Fixture::new().await;
    let deed = fx
        .create(DistributionSpec::explicit([(fx.e1, Quantity::from_units(25))]))
        .await
        .unwrap();
    let other = fx
        .engine
        .create_company(&fx.alice, CreateCompanyCmd::new("Other S.r.l.", "IT0002", "TO-2"))
        .await
        .unwrap()
        .id;
    let e3 = fx
        .engine
        .create_entry(
            &fx.alice,
            CreateEntryCmd::new(other, fx.et1, Quantity::from_units(10)).date_added(day(4)),
        )
        .await
        .unwrap()
        .id;

    let err = fx
        .engine
        .update_deed(&fx.alice, UpdateDeedCmd::new(deed.id).company_id(other))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Invalid(_)));

    let moved = fx
        .engine
        .update_deed(
            &fx.alice,
            UpdateDeedCmd::new(deed.id)
                .company_id(other)
                .distribution(DistributionSpec::explicit([(e3, Quantity::from_units(10))])),
        )
        .await
        .unwrap();

    assert_eq!(moved.company_id, other);
    assert_eq!(moved.distribution, BTreeMap::from([(e3, Quantity::from_units(10))]));
    assert_eq!(fx.available().await[&fx.e1], Quantity::from_units(100));
}

#[tokio::test]
async fn invalid_deed_input_is_rejected_before_writing() {
    let fx = Fixture::new().await;

    let err = fx
        .engine
        .create_deed(
            &fx.alice,
            CreateDeedCmd::new(
                fx.company,
                "  ",
                Quantity::from_units(1),
                "kg",
                DistributionSpec::explicit(BTreeMap::new()),
            ),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Invalid("title is empty".to_string()));

    let err = fx
        .create(DistributionSpec::explicit([(fx.e1, Quantity::ZERO)]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Invalid("drain quantity must be > 0".to_string())
    );

    let err = fx
        .create(DistributionSpec::explicit([(Uuid::new_v4(), Quantity::from_units(1))]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let (_, total) = fx
        .engine
        .find_deed(&fx.alice, &DeedFilter::default())
        .await
        .unwrap();
    assert_eq!(total, 0);
}
