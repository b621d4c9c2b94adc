use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use sea_orm::{Database, DatabaseConnection};
use serde_json::{Value, json};

use engine::{
    CostInputs, CreditTransferCmd, DateRange, Engine, EngineError, Money, PaymentCmd,
    PaymentMethod, PlanSessionCmd, Quantity, RecordSessionCmd,
    backup::{Archive, CancelFlag, ConflictMode, ExportOptions, ExportType, ImportOptions},
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

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 8, d).unwrap()
}

fn costs() -> CostInputs {
    CostInputs {
        court_hours: Quantity::whole(2),
        court_rate: Money::new(25_00),
        shuttlecock_count: 3,
        shuttlecock_rate: Money::new(8_00),
        other_costs: Money::ZERO,
    }
}

/// Organizer with four players, one location, two sessions, two payments
/// and one credit transfer (Ann gives Bo 5.00).
async fn seeded(engine: &Engine) -> (String, Vec<Uuid>) {
    let org = engine.new_organizer("Weekend league").await.unwrap();
    engine
        .new_location(&org, "Sports Hall", Some("1 Court Rd"), None)
        .await
        .unwrap();
    let mut players = Vec::new();
    for name in ["Ann", "Bo", "Cy", "Di"] {
        players.push(engine.new_player(&org, name, None, None).await.unwrap());
    }
    engine
        .record_session(
            RecordSessionCmd::new(&org, day(3), costs())
                .participants(players.clone())
                .location("Sports Hall"),
        )
        .await
        .unwrap();
    engine
        .record_session(RecordSessionCmd::new(&org, day(10), costs()).participants(players[..2].to_vec()))
        .await
        .unwrap();
    engine
        .record_payment(PaymentCmd::new(&org, players[0], Money::new(40_00), day(4)))
        .await
        .unwrap();
    engine
        .record_payment(PaymentCmd::new(&org, players[2], Money::new(18_50), day(11)))
        .await
        .unwrap();
    engine
        .transfer_credit(CreditTransferCmd::new(&org, players[0], players[1], Money::new(5_00), day(12)))
        .await
        .unwrap();
    (org, players)
}

fn document(data: Value) -> Value {
    json!({
        "metadata": {
            "export_date": "2024-08-20T10:00:00Z",
            "app_version": "0.1.0",
            "organizer_id": "somewhere-else",
            "total_records": 0,
            "export_type": "full_backup"
        },
        "data": data
    })
}

async fn balance_by_name(engine: &Engine, org: &str, name: &str) -> Money {
    let players = engine.players(org, true).await.unwrap();
    let player = players.iter().find(|p| p.name == name).unwrap();
    engine
        .player_balance(org, player.id)
        .await
        .unwrap()
        .current_balance
}

#[tokio::test]
async fn export_contains_every_record_and_statistics() {
    let (engine, _db) = engine_with_db().await;
    let (org, _) = seeded(&engine).await;

    let archive = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();
    assert_eq!(archive.metadata.organizer_id, org);
    assert_eq!(archive.metadata.export_type, ExportType::FullBackup);
    assert_eq!(archive.data.locations.len(), 1);
    assert_eq!(archive.data.players.len(), 4);
    assert_eq!(archive.data.sessions.len(), 2);
    assert_eq!(archive.data.session_participants.len(), 6);
    assert_eq!(archive.data.payments.len(), 4);
    assert_eq!(archive.data.player_balances.len(), 4);
    assert_eq!(archive.metadata.total_records, 21);

    let stats = &archive.statistics;
    assert_eq!(stats.date_range.earliest_session, Some(day(3)));
    assert_eq!(stats.date_range.latest_session, Some(day(10)));
    assert_eq!(stats.totals.total_sessions, 2);
    assert_eq!(stats.totals.total_players, 4);
    assert_eq!(stats.totals.total_payments, 4);
}

#[tokio::test]
async fn export_by_range_or_selection() {
    let (engine, _db) = engine_with_db().await;
    let (org, _) = seeded(&engine).await;

    let ranged = engine
        .export_archive(
            &org,
            &ExportOptions {
                range: DateRange::new(Some(day(5)), None),
                session_ids: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(ranged.metadata.export_type, ExportType::DateRange);
    assert_eq!(ranged.data.sessions.len(), 1);
    assert_eq!(ranged.data.sessions[0].date, day(10));
    assert_eq!(ranged.data.session_participants.len(), 2);
    assert_eq!(ranged.data.payments.len(), 3);
    assert_eq!(ranged.data.players.len(), 4);

    let first = engine.sessions(&org, Default::default()).await.unwrap();
    let oldest = first.last().unwrap().id;
    let selected = engine
        .export_archive(
            &org,
            &ExportOptions {
                range: DateRange::default(),
                session_ids: Some(vec![oldest]),
            },
        )
        .await
        .unwrap();
    assert_eq!(selected.metadata.export_type, ExportType::Selective);
    assert_eq!(selected.data.sessions.len(), 1);
    assert_eq!(selected.data.sessions[0].date, day(3));
    assert_eq!(selected.data.session_participants.len(), 4);
}

#[tokio::test]
async fn round_trip_into_a_fresh_organizer() {
    let (engine, _db) = engine_with_db().await;
    let (org, _) = seeded(&engine).await;
    let archive = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();

    let target = engine.new_organizer("New season").await.unwrap();
    let report = engine
        .import_archive(
            &target,
            serde_json::to_value(&archive).unwrap(),
            &ImportOptions::default(),
        )
        .await
        .unwrap();
    assert!(report.success, "{report:?}");
    assert!(report.errors.is_empty());
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.counts.locations.created, 1);
    assert_eq!(report.counts.players.created, 4);
    assert_eq!(report.counts.sessions.created, 2);
    assert_eq!(report.counts.session_participants.created, 6);
    assert_eq!(report.counts.payments.created, 4);
    // Balances were already derived while participants and payments landed.
    assert_eq!(report.counts.player_balances.skipped, 4);

    for name in ["Ann", "Bo", "Cy", "Di"] {
        assert_eq!(
            balance_by_name(&engine, &target, name).await,
            balance_by_name(&engine, &org, name).await,
            "{name}"
        );
    }

    // Every record got a fresh id.
    let imported = engine
        .export_archive(&target, &ExportOptions::default())
        .await
        .unwrap();
    for player in &imported.data.players {
        assert!(archive.data.players.iter().all(|p| p.id != player.id));
        assert_eq!(player.organizer_id, target);
    }
    assert!(engine.verify_credit_transfers(&target).await.unwrap().is_empty());
}

/// Archive contents with ids and organizer ids stripped. Players are named,
/// sessions are keyed by date, and every list is sorted.
fn by_natural_keys(archive: &Archive) -> Value {
    let data = &archive.data;
    let names: HashMap<&str, &str> = data
        .players
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();
    let dates: HashMap<&str, NaiveDate> = data
        .sessions
        .iter()
        .map(|s| (s.id.as_str(), s.date))
        .collect();
    let sorted = |mut values: Vec<Value>| {
        values.sort_by_key(|v| v.to_string());
        Value::Array(values)
    };

    json!({
        "locations": sorted(data.locations.iter().map(|l| json!({
            "name": l.name, "address": l.address, "notes": l.notes, "created_at": l.created_at
        }))
        .collect()),
        "players": sorted(data.players.iter().map(|p| json!({
            "name": p.name, "phone": p.phone, "is_temporary": p.is_temporary,
            "is_active": p.is_active, "notes": p.notes,
            "created_at": p.created_at, "updated_at": p.updated_at
        }))
        .collect()),
        "sessions": sorted(data.sessions.iter().map(|s| json!({
            "date": s.date, "start_time": s.start_time, "end_time": s.end_time,
            "location": s.location, "court_cost": s.court_cost,
            "shuttlecock_cost": s.shuttlecock_cost, "other_costs": s.other_costs,
            "participant_count": s.participant_count, "status": s.status, "notes": s.notes,
            "created_at": s.created_at, "updated_at": s.updated_at
        }))
        .collect()),
        "session_participants": sorted(data.session_participants.iter().map(|sp| json!({
            "session": dates[sp.session_id.as_str()], "player": names[sp.player_id.as_str()],
            "amount_owed": sp.amount_owed, "created_at": sp.created_at
        }))
        .collect()),
        "payments": sorted(data.payments.iter().map(|p| json!({
            "player": names[p.player_id.as_str()], "amount": p.amount, "method": p.method,
            "payment_date": p.payment_date, "reference_number": p.reference_number,
            "notes": p.notes, "created_at": p.created_at
        }))
        .collect()),
        "player_balances": sorted(data.player_balances.iter().map(|b| json!({
            "player": names[b.player_id.as_str()], "total_owed": b.total_owed,
            "total_paid": b.total_paid, "current_balance": b.current_balance,
            "last_session_date": b.last_session_date, "last_payment_date": b.last_payment_date
        }))
        .collect()),
    })
}

#[tokio::test]
async fn identical_payments_survive_a_round_trip() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Weekend league").await.unwrap();
    let ann = engine.new_player(&org, "Ann", None, None).await.unwrap();
    for _ in 0..2 {
        engine
            .record_payment(PaymentCmd::new(&org, ann, Money::new(10_00), day(4)))
            .await
            .unwrap();
    }
    let archive = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();
    assert_eq!(archive.data.payments.len(), 2);

    let target = engine.new_organizer("New season").await.unwrap();
    let report = engine
        .import_archive(
            &target,
            serde_json::to_value(&archive).unwrap(),
            &ImportOptions::default(),
        )
        .await
        .unwrap();
    assert!(report.success, "{report:?}");
    assert_eq!(report.counts.payments.created, 2);
    assert_eq!(report.counts.payments.skipped, 0);
    assert_eq!(
        engine
            .payments(&target, None, DateRange::default())
            .await
            .unwrap()
            .len(),
        2
    );
    assert_eq!(balance_by_name(&engine, &target, "Ann").await, Money::new(-20_00));

    // Importing the same archive again matches each stored payment once.
    let report = engine
        .import_archive(
            &target,
            serde_json::to_value(&archive).unwrap(),
            &ImportOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(report.counts.payments.skipped, 2);
    assert_eq!(report.counts.payments.created, 0);
    assert_eq!(balance_by_name(&engine, &target, "Ann").await, Money::new(-20_00));
}

#[tokio::test]
async fn round_trip_preserves_every_field() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Weekend league").await.unwrap();
    engine
        .new_location(&org, "Sports Hall", Some("1 Court Rd"), Some("north entrance"))
        .await
        .unwrap();
    let ann = engine
        .new_player(&org, "Ann", Some("+65 5555 0001"), Some("captain"))
        .await
        .unwrap();
    let bo = engine.new_player(&org, "Bo", None, None).await.unwrap();
    let cy = engine.new_player(&org, "Cy", None, None).await.unwrap();
    engine
        .new_player(&org, "Di", Some("+65 5555 0004"), None)
        .await
        .unwrap();

    let evening = (
        NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
    );
    engine
        .record_session(
            RecordSessionCmd::new(&org, day(3), costs())
                .participants([ann, bo, cy])
                .drop_in("Eve")
                .location("Sports Hall")
                .times(evening.0, evening.1)
                .notes("league night"),
        )
        .await
        .unwrap();
    let rained_out = engine
        .record_session(RecordSessionCmd::new(&org, day(14), costs()).participants([ann, cy]))
        .await
        .unwrap()
        .session_id;
    engine.cancel_session(&org, rained_out).await.unwrap();
    engine.set_player_active(&org, cy, false).await.unwrap();
    engine
        .plan_session(
            PlanSessionCmd::new(&org, day(17))
                .expected([ann, bo])
                .notes("finals"),
        )
        .await
        .unwrap();

    for _ in 0..2 {
        engine
            .record_payment(PaymentCmd::new(&org, bo, Money::new(10_00), day(5)))
            .await
            .unwrap();
    }
    engine
        .record_payment(
            PaymentCmd::new(&org, ann, Money::new(30_00), day(6))
                .method(PaymentMethod::Paynow)
                .reference_number("PN-1")
                .notes("august"),
        )
        .await
        .unwrap();
    engine
        .transfer_credit(CreditTransferCmd::new(&org, ann, bo, Money::new(2_00), day(7)))
        .await
        .unwrap();

    let source = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();
    assert_eq!(source.data.players.len(), 5);
    assert_eq!(source.data.sessions.len(), 3);
    assert_eq!(source.data.payments.len(), 5);
    assert!(
        source
            .data
            .session_participants
            .iter()
            .any(|sp| sp.amount_owed.is_none())
    );

    let target = engine.new_organizer("New season").await.unwrap();
    let report = engine
        .import_archive(
            &target,
            serde_json::to_value(&source).unwrap(),
            &ImportOptions::default(),
        )
        .await
        .unwrap();
    assert!(report.success, "{report:?}");
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let imported = engine
        .export_archive(&target, &ExportOptions::default())
        .await
        .unwrap();
    assert_eq!(imported.metadata.total_records, source.metadata.total_records);
    assert_eq!(by_natural_keys(&imported), by_natural_keys(&source));
}

#[tokio::test]
async fn reimport_with_skip_changes_nothing() {
    let (engine, _db) = engine_with_db().await;
    let (org, players) = seeded(&engine).await;
    let archive = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();
    let before = engine.player_balance(&org, players[0]).await.unwrap();

    let report = engine
        .import_archive(
            &org,
            serde_json::to_value(&archive).unwrap(),
            &ImportOptions::default(),
        )
        .await
        .unwrap();
    assert!(report.success);
    let total = report.counts.total();
    assert_eq!(total.created, 0);
    assert_eq!(report.counts.players.skipped, 4);
    assert_eq!(report.counts.sessions.skipped, 2);
    assert_eq!(report.counts.session_participants.skipped, 6);
    assert_eq!(report.counts.payments.skipped, 4);
    assert_eq!(report.counts.player_balances.skipped, 4);

    let after = engine.player_balance(&org, players[0]).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(engine.players(&org, true).await.unwrap().len(), 4);
}

#[tokio::test]
async fn replace_mode_overwrites_duplicates() {
    let (engine, _db) = engine_with_db().await;
    let (org, players) = seeded(&engine).await;
    let mut archive = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();
    let ann_id = players[0].to_string();
    for participant in archive
        .data
        .session_participants
        .iter_mut()
        .filter(|p| p.player_id == ann_id)
    {
        participant.amount_owed = Some(Money::new(20_00));
    }

    let report = engine
        .import_archive(
            &org,
            serde_json::to_value(&archive).unwrap(),
            &ImportOptions {
                conflict: ConflictMode::ReplaceDuplicates,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(report.success, "{report:?}");
    assert_eq!(report.counts.session_participants.updated, 2);
    assert_eq!(report.counts.session_participants.skipped, 4);

    let ann = engine.player_balance(&org, players[0]).await.unwrap();
    assert_eq!(ann.total_owed, Money::new(40_00));
    // The archive still carries the old balance for Ann.
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.contains(&ann_id) && w.contains("differs"))
    );
}

#[tokio::test]
async fn merge_mode_fills_only_empty_fields() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Weekend league").await.unwrap();
    let ann = engine
        .new_player(&org, "Ann", None, Some("captain"))
        .await
        .unwrap();

    let doc = document(json!({
        "players": [{
            "id": "old-ann", "organizer_id": "somewhere-else", "name": "ANN",
            "phone": "+65 5555 0000", "notes": "imported"
        }]
    }));
    let report = engine
        .import_archive(
            &org,
            doc,
            &ImportOptions {
                conflict: ConflictMode::MergeData,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(report.success);
    assert_eq!(report.counts.players.updated, 1);

    let player = engine.player(&org, ann).await.unwrap();
    assert_eq!(player.name, "Ann");
    assert_eq!(player.phone.as_deref(), Some("+65 5555 0000"));
    assert_eq!(player.notes.as_deref(), Some("captain"));
}

#[tokio::test]
async fn dangling_references_are_skipped_with_a_warning() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Weekend league").await.unwrap();

    let doc = document(json!({
        "players": [{ "id": "p1", "organizer_id": "x", "name": "Ann" }],
        "sessions": [{
            "id": "s1", "organizer_id": "x", "date": "2024-08-03",
            "court_cost": 50.0, "shuttlecock_cost": 24.0, "participant_count": 1,
            "status": "completed"
        }],
        "session_participants": [
            { "id": "sp1", "session_id": "s1", "player_id": "p1", "amount_owed": 74.0 },
            { "id": "sp2", "session_id": "s-missing", "player_id": "p1", "amount_owed": 10.0 },
            { "id": "sp3", "session_id": "s1", "player_id": "p-missing", "amount_owed": 10.0 }
        ],
        "payments": [
            { "id": "pay1", "organizer_id": "x", "player_id": "p-missing", "amount": 5.0, "payment_date": "2024-08-04" }
        ]
    }));
    let report = engine
        .import_archive(&org, doc, &ImportOptions::default())
        .await
        .unwrap();
    assert!(report.success, "{report:?}");
    assert_eq!(report.counts.session_participants.created, 1);
    assert_eq!(report.counts.session_participants.skipped, 2);
    assert_eq!(report.counts.payments.skipped, 1);
    assert_eq!(report.warnings.len(), 3);
    assert!(report.warnings[0].starts_with("session_participants[sp2]: skipped"));

    assert_eq!(balance_by_name(&engine, &org, "Ann").await, Money::new(74_00));
}

#[tokio::test]
async fn validate_only_reports_without_writing() {
    let (engine, _db) = engine_with_db().await;
    let (org, _) = seeded(&engine).await;
    let archive = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();
    let target = engine.new_organizer("Dry run").await.unwrap();

    let report = engine
        .import_archive(
            &target,
            serde_json::to_value(&archive).unwrap(),
            &ImportOptions {
                validate_only: true,
                clear_existing_data: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(report.validate_only);
    assert!(report.message.starts_with("validation passed"));
    assert_eq!(report.counts.players.created, 4);
    assert_eq!(report.counts.payments.created, 4);

    assert!(engine.players(&target, true).await.unwrap().is_empty());
    assert!(
        engine
            .sessions(&target, Default::default())
            .await
            .unwrap()
            .is_empty()
    );
    // The source organizer is untouched too.
    assert_eq!(engine.players(&org, true).await.unwrap().len(), 4);
}

#[tokio::test]
async fn clear_existing_data_replaces_the_organizer_contents() {
    let (engine, _db) = engine_with_db().await;
    let (org, _) = seeded(&engine).await;
    let archive = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();
    engine.new_player(&org, "Zed", None, None).await.unwrap();

    let report = engine
        .import_archive(
            &org,
            serde_json::to_value(&archive).unwrap(),
            &ImportOptions {
                clear_existing_data: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(report.success, "{report:?}");
    assert!(report.warnings[0].starts_with("cleared"));
    assert_eq!(report.counts.players.created, 4);

    let names: Vec<String> = engine
        .players(&org, true)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Ann", "Bo", "Cy", "Di"]);
    assert_eq!(balance_by_name(&engine, &org, "Ann").await, Money::new(20_50));
}

#[tokio::test]
async fn cancelled_import_stops_before_writing() {
    let (engine, _db) = engine_with_db().await;
    let (org, _) = seeded(&engine).await;
    let archive = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();
    let target = engine.new_organizer("Cancelled").await.unwrap();

    let cancel = CancelFlag::new();
    cancel.cancel();
    let report = engine
        .import_archive(
            &target,
            serde_json::to_value(&archive).unwrap(),
            &ImportOptions {
                cancel: Some(cancel),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!report.success);
    assert!(report.message.starts_with("import aborted"));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.counts.total().created, 0);
    assert!(engine.players(&target, true).await.unwrap().is_empty());
}

#[tokio::test]
async fn defective_archive_is_rejected_whole() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Weekend league").await.unwrap();

    let doc = document(json!({
        "players": [{ "id": "p1", "organizer_id": "x", "name": "Ann" }, { "id": "p2", "organizer_id": "x" }],
        "payments": [{ "id": "pay", "organizer_id": "x", "player_id": "p1", "amount": "lots", "payment_date": "2024-08-04" }]
    }));
    let report = engine
        .import_archive(&org, doc, &ImportOptions::default())
        .await
        .unwrap();
    assert!(!report.success);
    assert_eq!(
        report.errors,
        vec!["players[1]: missing name", "payments[0]: amount must be a number"]
    );
    assert!(engine.players(&org, true).await.unwrap().is_empty());

    let err = engine
        .import_archive_str(&org, "{ not json", &ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidArchive(_)));

    let err = engine
        .import_archive("missing", document(json!({})), &ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn null_table_is_rejected_before_writing() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Weekend league").await.unwrap();

    let doc = document(json!({
        "players": [{ "id": "p1", "organizer_id": "x", "name": "Ann" }],
        "sessions": null
    }));
    let report = engine
        .import_archive(&org, doc, &ImportOptions::default())
        .await
        .unwrap();
    assert!(!report.success);
    assert_eq!(report.errors, vec!["data.sessions must be an array"]);
    assert!(engine.players(&org, true).await.unwrap().is_empty());
}

#[tokio::test]
async fn unpaired_transfer_is_reported() {
    let (engine, _db) = engine_with_db().await;
    let (org, players) = seeded(&engine).await;
    let mut archive = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();
    let bo_id = players[1].to_string();
    archive.data.players.retain(|p| p.id != bo_id);

    let target = engine.new_organizer("Without Bo").await.unwrap();
    let report = engine
        .import_archive(
            &target,
            serde_json::to_value(&archive).unwrap(),
            &ImportOptions::default(),
        )
        .await
        .unwrap();
    assert!(report.success, "{report:?}");
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.starts_with("credit transfer CT-") && w.contains("1 leg(s)"))
    );
    assert_eq!(engine.verify_credit_transfers(&target).await.unwrap().len(), 1);
}

#[tokio::test]
async fn export_pages_through_large_tables() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Busy club").await.unwrap();
    let ann = engine.new_player(&org, "Ann", None, None).await.unwrap();
    for i in 0..1_005 {
        engine
            .record_payment(PaymentCmd::new(&org, ann, Money::new(1_00), day(1 + i % 28)))
            .await
            .unwrap();
    }

    let archive = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();
    assert_eq!(archive.data.payments.len(), 1_005);
    assert_eq!(archive.statistics.totals.total_payments, 1_005);
    assert_eq!(
        archive.statistics.totals.total_amount_handled,
        Money::new(1_005_00)
    );
    let mut ids: Vec<&str> = archive.data.payments.iter().map(|p| p.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 1_005);
}

#[tokio::test]
async fn reset_removes_every_row_of_the_organizer() {
    let (engine, _db) = engine_with_db().await;
    let (org, _) = seeded(&engine).await;
    let (other, _) = seeded(&engine).await;

    let removed = engine.reset_organizer_data(&org).await.unwrap();
    assert_eq!(removed, 21);
    let archive = engine
        .export_archive(&org, &ExportOptions::default())
        .await
        .unwrap();
    assert_eq!(archive.metadata.total_records, 0);
    assert_eq!(engine.players(&other, true).await.unwrap().len(), 4);
}
