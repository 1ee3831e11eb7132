//! Plans, sessions and usage records survive reopening the database file.

mod common;

use chrono::{Duration, NaiveDate, Utc};
use common::{vector_search, KeywordEmbedder, TestApp};
use meal_planner::planner::Household;
use meal_planner::session::AdjustContext;
use storage::{MetricsSink, PlanStatus, SqlitePoolManager};

fn week() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 17).unwrap()
}

async fn open(path: &str) -> TestApp {
    let pool = SqlitePoolManager::new(path).await.unwrap();
    TestApp::on_pool(
        pool,
        KeywordEmbedder::new(vec![("pasta", vec![1.0, 0.0])], vec![0.7, 0.7]),
        vector_search(),
    )
}

/// **Test: a draft and its open adjustment are still there after a restart**
///
/// **Setup:** A database file in a temp dir (in a nested directory that does not exist yet).
///
/// **Action:** Draft a plan, start an adjustment, record usage; reopen the file with a new pool.
///
/// **Expected:** The reopened app sees the Adjusting plan, the session and the usage; the week
/// stays occupied, and a metrics cleanup with zero retention removes the usage.
#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("meal_planner.db");
    let path = path.to_str().unwrap();

    let plan_id = {
        let app = open(path).await;
        app.seed(common::recipe("pasta", "Pasta", &["Pasta", "Tomato"]), vec![1.0, 0.0])
            .await;
        app.script_pasta_plan();
        let generated = app
            .planner
            .generate_plan(7, "I want pasta", &Household::default(), week())
            .await
            .unwrap();
        app.metrics.record_all(&generated.metas).await;
        let draft = app.lifecycle.create_draft(generated.plan).await.unwrap();
        let plan_id = draft.id.unwrap();
        app.lifecycle.begin_adjustment(plan_id).await.unwrap();
        app.sessions
            .start(
                7,
                &AdjustContext {
                    plan_id,
                    original_request: "I want pasta".to_string(),
                },
            )
            .await
            .unwrap();
        plan_id
    };

    let app = open(path).await;
    let plan = app.lifecycle.get_by_id(plan_id).await.unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Adjusting);
    assert_eq!(plan.week_start, week());
    assert!(app.lifecycle.exists_for_week(7, week()).await.unwrap());

    let active = app.sessions.active_adjustment(7).await.unwrap().unwrap();
    assert_eq!(active.context.plan_id, plan_id);

    let usage = app
        .metrics_store
        .daily_usage(Utc::now() - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(usage.iter().map(|d| d.executions).sum::<i64>(), 2);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let removed = app.metrics.cleanup(0).await.unwrap();
    assert_eq!(removed, 2);
}
