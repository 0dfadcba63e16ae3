use mealroutine_core::db::{open_db_with_options, DbOptions};
use mealroutine_core::{
    DailyMeal, LifecycleError, LifecycleService, LifecycleState, MealAssignment, MealRepository,
    MealSelectionError, MealSelectionService, MealState, MealType, RepoError, Routine,
    RoutineRepository, SqliteMealRepository, SqliteRoutineRepository,
};
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::time::{Duration, Instant};

const NOW: i64 = 1_700_000_000_000;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const BUSY_TIMEOUT: Duration = Duration::from_millis(200);

fn open(path: &Path) -> Connection {
    open_db_with_options(
        path,
        DbOptions {
            busy_timeout: BUSY_TIMEOUT,
        },
    )
    .unwrap()
}

fn is_busy(err: &RepoError) -> bool {
    matches!(err, RepoError::Db(db) if db.is_busy())
}

fn meal_rows(conn: &Connection) -> Vec<(String, String, Option<String>)> {
    let mut stmt = conn
        .prepare("SELECT id, meal_state, recipe_id FROM meals ORDER BY id;")
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap();
    let collected: rusqlite::Result<Vec<_>> = rows.collect();
    collected.unwrap()
}

#[test]
fn locked_store_fails_resolution_and_removal_after_busy_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("busy.sqlite3");

    let routine = Routine::new("u1", NOW - DAY_MS, NOW + DAY_MS, 0)
        .with_state(LifecycleState::SelectingMeals);
    let day = DailyMeal::new(routine.id, NOW, "Monday");
    let slot = MealAssignment::with_recipe(day.id, MealType::Lunch, "salad", MealState::PendingReview);

    let mut reader = open(&path);
    let mut writer = open(&path);
    let mut holder = open(&path);
    {
        let repo = SqliteRoutineRepository::try_new(&mut holder).unwrap();
        repo.create_routine(&routine).unwrap();
        repo.create_daily_meal(&day).unwrap();
    }
    {
        let repo = SqliteMealRepository::try_new(&mut holder).unwrap();
        repo.create_assignment(&slot).unwrap();
    }
    let before = meal_rows(&holder);

    // Schema checks run before the lock so the failure comes from the operations.
    let lifecycle = LifecycleService::new(SqliteRoutineRepository::try_new(&mut reader).unwrap());
    let mut selection =
        MealSelectionService::new(SqliteMealRepository::try_new(&mut writer).unwrap());

    let lock = holder
        .transaction_with_behavior(TransactionBehavior::Exclusive)
        .unwrap();

    let started_at = Instant::now();
    let resolved = lifecycle.resolve_lifecycle_state("u1", NOW);
    let resolve_elapsed = started_at.elapsed();
    match resolved {
        Err(LifecycleError::Repo(err)) => assert!(is_busy(&err), "unexpected error: {err}"),
        other => panic!("expected busy store error, got {other:?}"),
    }
    assert!(resolve_elapsed >= BUSY_TIMEOUT / 2);
    assert!(resolve_elapsed < Duration::from_secs(3));

    let started_at = Instant::now();
    let removed = selection.remove_assignment(&slot, &[slot.clone()]);
    let remove_elapsed = started_at.elapsed();
    match removed {
        Err(MealSelectionError::Store(err)) => assert!(is_busy(&err), "unexpected error: {err}"),
        other => panic!("expected busy store error, got {other:?}"),
    }
    assert!(remove_elapsed >= BUSY_TIMEOUT / 2);
    assert!(remove_elapsed < Duration::from_secs(3));

    lock.rollback().unwrap();
    assert_eq!(meal_rows(&holder), before);
    assert_eq!(
        lifecycle.resolve_lifecycle_state("u1", NOW).unwrap(),
        LifecycleState::SelectingMeals
    );
}
