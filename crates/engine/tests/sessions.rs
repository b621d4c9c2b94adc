use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    CostInputs, Engine, EngineError, Money, PlanSessionCmd, PlayerUpdate, Quantity,
    RecordSessionCmd, SessionStatus, UpdateSessionCmd,
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
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

/// 2h of court at 20.00 plus 4 shuttlecocks at 8.50: 74.00 in total.
fn evening_costs() -> CostInputs {
    CostInputs {
        court_hours: Quantity::whole(2),
        court_rate: Money::new(20_00),
        shuttlecock_count: 4,
        shuttlecock_rate: Money::new(8_50),
        other_costs: Money::ZERO,
    }
}

async fn roster(engine: &Engine, organizer_id: &str, names: &[&str]) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for name in names {
        ids.push(
            engine
                .new_player(organizer_id, name, None, None)
                .await
                .unwrap(),
        );
    }
    ids
}

#[tokio::test]
async fn record_session_bills_each_participant_an_even_share() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Tuesday club").await.unwrap();
    let players = roster(&engine, &org, &["Ann", "Bo", "Cy", "Di"]).await;

    let recorded = engine
        .record_session(
            RecordSessionCmd::new(&org, day(4), evening_costs())
                .participants(players.clone())
                .location("Sports Hall"),
        )
        .await
        .unwrap();
    assert_eq!(recorded.allocation.total, Money::new(74_00));
    assert_eq!(recorded.allocation.cost_per_player, Money::new(18_50));

    let detail = engine.session(&org, recorded.session_id).await.unwrap();
    assert_eq!(detail.session.status, SessionStatus::Completed);
    assert_eq!(detail.session.total_cost(), Money::new(74_00));
    assert_eq!(detail.session.cost_per_player(), Money::new(18_50));
    assert_eq!(detail.session.location.as_deref(), Some("Sports Hall"));
    assert_eq!(detail.participants.len(), 4);
    assert!(
        detail
            .participants
            .iter()
            .all(|p| p.amount_owed == Some(Money::new(18_50)))
    );

    for player in players {
        let balance = engine.player_balance(&org, player).await.unwrap();
        assert_eq!(balance.total_owed, Money::new(18_50));
        assert_eq!(balance.current_balance, Money::new(18_50));
        assert_eq!(balance.last_session_date, Some(day(4)));
    }
}

#[tokio::test]
async fn drop_ins_become_temporary_players() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Tuesday club").await.unwrap();
    let players = roster(&engine, &org, &["Ann", "Bo"]).await;

    let recorded = engine
        .record_session(
            RecordSessionCmd::new(&org, day(4), evening_costs())
                .participants(players)
                .drop_in("Eve")
                .drop_in("  ann "),
        )
        .await
        .unwrap();

    // "ann" matches the existing Ann and is not billed twice.
    assert_eq!(recorded.drop_in_player_ids.len(), 1);
    assert_eq!(recorded.allocation.participants, 3);
    assert_eq!(recorded.allocation.cost_per_player, Money::new(24_70));

    let eve = engine
        .player(&org, recorded.drop_in_player_ids[0])
        .await
        .unwrap();
    assert_eq!(eve.name, "Eve");
    assert!(eve.is_temporary);

    let promoted = engine
        .update_player(
            &org,
            eve.id,
            PlayerUpdate {
                is_temporary: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!promoted.is_temporary);
}

#[tokio::test]
async fn invalid_participant_lists_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Tuesday club").await.unwrap();
    let players = roster(&engine, &org, &["Ann", "Bo"]).await;

    let err = engine
        .record_session(
            RecordSessionCmd::new(&org, day(4), evening_costs())
                .participants([players[0], players[0]]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSession(_)));

    engine
        .set_player_active(&org, players[1], false)
        .await
        .unwrap();
    let err = engine
        .record_session(
            RecordSessionCmd::new(&org, day(4), evening_costs()).participants([players[1]]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSession(_)));

    let mut negative = evening_costs();
    negative.other_costs = Money::new(-1_00);
    let err = engine
        .record_session(RecordSessionCmd::new(&org, day(4), negative).participants([players[0]]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    assert!(
        engine
            .sessions(&org, Default::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn session_without_participants_bills_nobody() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Tuesday club").await.unwrap();

    let recorded = engine
        .record_session(RecordSessionCmd::new(&org, day(4), evening_costs()))
        .await
        .unwrap();
    assert_eq!(recorded.allocation.total, Money::new(74_00));
    assert_eq!(recorded.allocation.cost_per_player, Money::ZERO);
    let summary = engine.financial_summary(&org).await.unwrap();
    assert_eq!(summary.total_outstanding, Money::ZERO);
}

#[tokio::test]
async fn oversized_costs_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Tuesday club").await.unwrap();
    let players = roster(&engine, &org, &["Ann", "Bo"]).await;

    let mut costs = evening_costs();
    costs.court_rate = Money::new(i64::MAX / 100);
    costs.court_hours = Quantity::whole(200);
    let err = engine
        .record_session(RecordSessionCmd::new(&org, day(4), costs).participants(players.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let mut costs = evening_costs();
    costs.shuttlecock_rate = Money::new(i64::MAX / 2);
    costs.shuttlecock_count = 3;
    let err = engine
        .record_session(RecordSessionCmd::new(&org, day(4), costs).participants(players.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    // Large but representable: 2h at i64::MAX / 100 fits once multiplied.
    let mut costs = evening_costs();
    costs.court_rate = Money::new(i64::MAX / 100);
    costs.shuttlecock_count = 0;
    let recorded = engine
        .record_session(RecordSessionCmd::new(&org, day(4), costs).participants(players))
        .await
        .unwrap();
    assert_eq!(
        recorded.allocation.court_cost,
        Money::new(i64::MAX / 100 * 2).round_to_tenth()
    );
    assert_eq!(engine.sessions(&org, Default::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_session_removes_charges_of_dropped_players() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Tuesday club").await.unwrap();
    let players = roster(&engine, &org, &["Ann", "Bo", "Cy", "Di"]).await;

    let recorded = engine
        .record_session(
            RecordSessionCmd::new(&org, day(4), evening_costs()).participants(players.clone()),
        )
        .await
        .unwrap();

    let allocation = engine
        .update_session(
            UpdateSessionCmd::new(&org, recorded.session_id, evening_costs())
                .participants(players[..2].to_vec())
                .date(day(5)),
        )
        .await
        .unwrap()
        .allocation;
    assert_eq!(allocation.cost_per_player, Money::new(37_00));

    let ann = engine.player_balance(&org, players[0]).await.unwrap();
    assert_eq!(ann.current_balance, Money::new(37_00));
    assert_eq!(ann.last_session_date, Some(day(5)));
    let di = engine.player_balance(&org, players[3]).await.unwrap();
    assert_eq!(di.current_balance, Money::ZERO);
    assert_eq!(di.last_session_date, None);
}

#[tokio::test]
async fn planned_session_is_billed_only_once_completed() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Tuesday club").await.unwrap();
    let players = roster(&engine, &org, &["Ann", "Bo"]).await;

    let session_id = engine
        .plan_session(PlanSessionCmd::new(&org, day(10)).expected(players.clone()))
        .await
        .unwrap();
    let detail = engine.session(&org, session_id).await.unwrap();
    assert_eq!(detail.session.status, SessionStatus::Planned);
    assert!(detail.participants.iter().all(|p| p.amount_owed.is_none()));
    assert_eq!(
        engine
            .player_balance(&org, players[0])
            .await
            .unwrap()
            .current_balance,
        Money::ZERO
    );

    let allocation = engine
        .complete_session(&org, session_id, evening_costs())
        .await
        .unwrap();
    assert_eq!(allocation.cost_per_player, Money::new(37_00));
    assert_eq!(
        engine
            .player_balance(&org, players[1])
            .await
            .unwrap()
            .current_balance,
        Money::new(37_00)
    );

    let err = engine
        .complete_session(&org, session_id, evening_costs())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSession(_)));
}

#[tokio::test]
async fn cancel_and_delete_release_charges() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Tuesday club").await.unwrap();
    let players = roster(&engine, &org, &["Ann", "Bo"]).await;

    let first = engine
        .record_session(
            RecordSessionCmd::new(&org, day(4), evening_costs()).participants(players.clone()),
        )
        .await
        .unwrap();
    let second = engine
        .record_session(
            RecordSessionCmd::new(&org, day(11), evening_costs()).participants(players.clone()),
        )
        .await
        .unwrap();
    assert_eq!(
        engine
            .player_balance(&org, players[0])
            .await
            .unwrap()
            .current_balance,
        Money::new(74_00)
    );

    engine.cancel_session(&org, first.session_id).await.unwrap();
    let detail = engine.session(&org, first.session_id).await.unwrap();
    assert_eq!(detail.session.status, SessionStatus::Cancelled);
    assert_eq!(detail.participants.len(), 2);
    assert_eq!(
        engine
            .player_balance(&org, players[0])
            .await
            .unwrap()
            .current_balance,
        Money::new(37_00)
    );

    engine.delete_session(&org, second.session_id).await.unwrap();
    let err = engine.session(&org, second.session_id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert_eq!(
        engine
            .player_balance(&org, players[0])
            .await
            .unwrap()
            .current_balance,
        Money::ZERO
    );
}

#[tokio::test]
async fn sessions_are_listed_newest_first_within_range() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Tuesday club").await.unwrap();
    for d in [3, 17, 10] {
        engine
            .record_session(RecordSessionCmd::new(&org, day(d), evening_costs()))
            .await
            .unwrap();
    }
    let all = engine.sessions(&org, Default::default()).await.unwrap();
    let dates: Vec<_> = all.iter().map(|s| s.date).collect();
    assert_eq!(dates, vec![day(17), day(10), day(3)]);

    let some = engine
        .sessions(&org, engine::DateRange::new(Some(day(4)), Some(day(10))))
        .await
        .unwrap();
    assert_eq!(some.len(), 1);
    assert_eq!(some[0].date, day(10));
}

#[tokio::test]
async fn other_organizers_rows_are_forbidden() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Tuesday club").await.unwrap();
    let other = engine.new_organizer("Friday club").await.unwrap();
    let players = roster(&engine, &org, &["Ann"]).await;
    let recorded = engine
        .record_session(RecordSessionCmd::new(&org, day(4), evening_costs()).participants(players.clone()))
        .await
        .unwrap();

    let err = engine.session(&other, recorded.session_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    let err = engine
        .record_session(RecordSessionCmd::new(&other, day(5), evening_costs()).participants(players))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .sessions("no-such-organizer", Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn players_with_history_can_only_be_deactivated() {
    let (engine, _db) = engine_with_db().await;
    let org = engine.new_organizer("Tuesday club").await.unwrap();
    let players = roster(&engine, &org, &["Ann", "Bo"]).await;
    engine
        .record_session(RecordSessionCmd::new(&org, day(4), evening_costs()).participants([players[0]]))
        .await
        .unwrap();

    let err = engine.delete_player(&org, players[0]).await.unwrap_err();
    assert_eq!(err, EngineError::PlayerHasHistory("Ann".to_string()));
    engine
        .set_player_active(&org, players[0], false)
        .await
        .unwrap();
    assert_eq!(engine.players(&org, false).await.unwrap().len(), 1);
    assert_eq!(engine.players(&org, true).await.unwrap().len(), 2);

    engine.delete_player(&org, players[1]).await.unwrap();
    let err = engine.player(&org, players[1]).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .new_player(&org, "ANN", None, None)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("ANN".to_string()));
}
