//! Integration tests for [`storage::SqlitePlanRepository`].

use chrono::NaiveDate;
use storage::{
    DayPlan, MealPlan, PlanRepository, PlanStatus, SqlitePlanRepository, SqlitePoolManager,
    StorageError,
};

fn week() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

fn draft(user_id: i64, week_start: NaiveDate, title: &str) -> MealPlan {
    MealPlan::new_draft(
        user_id,
        week_start,
        vec![DayPlan {
            day: "Monday".to_string(),
            recipe_id: Some("r1".to_string()),
            recipe_title: title.to_string(),
            prep_time: "30 min".to_string(),
            note: String::new(),
        }],
        "something quick",
    )
}

async fn repo() -> SqlitePlanRepository {
    SqlitePlanRepository::new(SqlitePoolManager::in_memory().await.unwrap())
}

/// **Test: A second occupying plan for the same week is rejected**
///
/// **Setup:** Save a draft for (user 1, week).
///
/// **Action:** Save another draft for the same user/week, and one for another week.
///
/// **Expected:** `Conflict` for the same week; the other week succeeds.
#[tokio::test]
async fn test_weekly_uniqueness() {
    let repo = repo().await;
    assert!(!repo.exists_for_week(1, week()).await.unwrap());

    repo.save(&draft(1, week(), "Cook: Pasta")).await.unwrap();
    assert!(repo.exists_for_week(1, week()).await.unwrap());

    let err = repo.save(&draft(1, week(), "Cook: Soup")).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));

    let next_week = week() + chrono::Duration::days(7);
    repo.save(&draft(1, next_week, "Cook: Soup")).await.unwrap();
    repo.save(&draft(2, week(), "Cook: Soup")).await.unwrap();
}

/// **Test: Replacing a week supersedes the old plan atomically**
#[tokio::test]
async fn test_save_replacing_week() {
    let repo = repo().await;
    let first = repo.save(&draft(1, week(), "Cook: Pasta")).await.unwrap();

    let second = repo
        .save_replacing_week(&draft(1, week(), "Cook: Curry"))
        .await
        .unwrap();

    let old = repo.get_by_id(first).await.unwrap().unwrap();
    let new = repo.get_by_id(second).await.unwrap().unwrap();
    assert_eq!(old.status, PlanStatus::Superseded);
    assert_eq!(new.status, PlanStatus::Draft);
    assert_eq!(new.days[0].recipe_title, "Cook: Curry");
    assert!(repo.exists_for_week(1, week()).await.unwrap());

    let recent = repo.list_recent_by_user_id(1, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, Some(second));
}

/// **Test: finalize attaches the list, marks Final and records a shopping list**
#[tokio::test]
async fn test_finalize_draft() {
    let repo = repo().await;
    let id = repo.save(&draft(7, week(), "Cook: Pasta")).await.unwrap();
    let items = vec!["Pasta".to_string(), "Tomato".to_string()];

    repo.finalize(id, &items).await.unwrap();

    let plan = repo.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Final);
    assert_eq!(plan.shopping_list, Some(items.clone()));
    let list = repo.get_shopping_list(id).await.unwrap().unwrap();
    assert_eq!(list.user_id, 7);
    assert_eq!(list.items, items);

    let again = repo.finalize(id, &items).await.unwrap_err();
    assert!(matches!(again, StorageError::NotFound(_)));
}

#[tokio::test]
async fn test_update_status_missing_plan() {
    let repo = repo().await;
    let err = repo.update_status(999, PlanStatus::Final).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}
