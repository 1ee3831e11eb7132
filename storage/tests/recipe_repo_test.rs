//! Integration tests for [`storage::SqliteRecipeRepository`] on an on-disk database.

use chrono::{TimeZone, Utc};
use storage::{Recipe, RecipeRepository, SqlitePoolManager, SqliteRecipeRepository};
use tempfile::TempDir;

fn recipe(id: &str, title: &str) -> Recipe {
    Recipe {
        id: id.to_string(),
        title: title.to_string(),
        ingredients: vec!["salt".to_string()],
        instructions: vec!["Cook.".to_string()],
        tags: vec!["quick".to_string()],
        prep_time: "20 min".to_string(),
        servings: "4".to_string(),
        source_updated_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
    }
}

async fn repo(dir: &TempDir) -> SqliteRecipeRepository {
    let path = dir.path().join("data").join("recipes.db");
    let pool = SqlitePoolManager::new(path.to_str().unwrap())
        .await
        .expect("Failed to open database");
    SqliteRecipeRepository::new(pool)
}

/// **Test: get_by_ids preserves the requested order and skips unknown ids**
#[tokio::test]
async fn test_get_by_ids_preserves_order() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repo(&dir).await;
    for (id, title) in [("a", "Apple pie"), ("b", "Bean stew"), ("c", "Carrot cake")] {
        repo.save(&recipe(id, title)).await.unwrap();
    }

    let ids = vec!["c".to_string(), "missing".to_string(), "a".to_string()];
    let found = repo.get_by_ids(&ids).await.unwrap();

    let titles: Vec<&str> = found.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Carrot cake", "Apple pie"]);
}

#[tokio::test]
async fn test_list_excludes_and_count() {
    let dir = tempfile::tempdir().unwrap();
    let repo = repo(&dir).await;
    for id in ["r1", "r2", "r3"] {
        repo.save(&recipe(id, id)).await.unwrap();
    }

    assert_eq!(repo.count().await.unwrap(), 3);
    let listed = repo.list(&["r2".to_string()]).await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r3"]);
}

/// **Test: Saving again replaces the stored recipe and survives reopening**
#[tokio::test]
async fn test_save_replaces_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    {
        let repo = repo(&dir).await;
        repo.save(&recipe("r1", "Old title")).await.unwrap();
        repo.save(&recipe("r1", "New title")).await.unwrap();
    }

    let reopened = repo(&dir).await;
    let stored = reopened.get("r1").await.unwrap().expect("recipe persisted");
    assert_eq!(stored.title, "New title");
    assert_eq!(stored.source_updated_at, recipe("r1", "").source_updated_at);
    assert_eq!(reopened.count().await.unwrap(), 1);
}
