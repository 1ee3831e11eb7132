//! Integration tests for [`meal_planner::session::AdjustmentSessions`].

mod common;

use chrono::{Duration, Utc};
use common::{KeywordEmbedder, TestApp};
use meal_planner::core::SessionError;
use meal_planner::recipe::RetrieverConfig;
use meal_planner::session::{AdjustContext, ADJUST_PLAN, AWAITING_FEEDBACK};
use serde_json::json;
use storage::SessionRepository;

async fn app() -> TestApp {
    TestApp::new(KeywordEmbedder::new(Vec::new(), vec![1.0]), RetrieverConfig::default()).await
}

fn context(plan_id: i64) -> AdjustContext {
    AdjustContext {
        plan_id,
        original_request: "quick dinners".to_string(),
    }
}

/// **Test: a session lives for its TTL and is gone once finished**
///
/// **Setup:** TTL 900 s; session started at `now`.
///
/// **Expected:** Active at now + 899 s, inactive at now + 901 s; after `finish` nothing is
/// active even within the TTL.
#[tokio::test]
async fn test_session_ttl_and_finish() {
    let app = app().await;
    let now = Utc::now();

    let id = app.sessions.start_at(4, &context(11), now).await.unwrap();

    let active = app
        .sessions
        .active_adjustment_at(4, now + Duration::seconds(899))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.session_id, id);
    assert_eq!(active.context, context(11));
    assert!(app
        .sessions
        .active_adjustment_at(4, now + Duration::seconds(901))
        .await
        .unwrap()
        .is_none());
    assert!(app.sessions.active_adjustment_at(5, now).await.unwrap().is_none());

    app.sessions.finish(id).await.unwrap();
    assert!(app.sessions.active_adjustment_at(4, now).await.unwrap().is_none());
}

#[tokio::test]
async fn test_other_session_types_are_ignored() {
    let app = app().await;
    let expires = Utc::now() + Duration::minutes(5);
    app.session_repo
        .create(4, "onboarding", AWAITING_FEEDBACK, &json!({}), expires)
        .await
        .unwrap();

    assert!(app.sessions.active_adjustment(4).await.unwrap().is_none());
}

/// **Test: an unreadable context is reported and the session removed**
#[tokio::test]
async fn test_unreadable_context_is_dropped() {
    let app = app().await;
    let expires = Utc::now() + Duration::minutes(5);
    let id = app
        .session_repo
        .create(4, ADJUST_PLAN, AWAITING_FEEDBACK, &json!({"plan": "x"}), expires)
        .await
        .unwrap();

    let err = app.sessions.active_adjustment(4).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidContext { session_id, .. } if session_id == id));

    assert!(app.sessions.active_adjustment(4).await.unwrap().is_none());
    assert!(!app.session_repo.delete(id).await.unwrap());
}

#[tokio::test]
async fn test_cleanup_removes_only_expired() {
    let app = app().await;
    let now = Utc::now();
    app.sessions
        .start_at(4, &context(1), now - Duration::hours(1))
        .await
        .unwrap();
    app.sessions.start_at(5, &context(2), now).await.unwrap();

    let removed = app.sessions.cleanup_expired().await.unwrap();

    assert_eq!(removed, 1);
    assert!(app.sessions.active_adjustment(5).await.unwrap().is_some());
}
