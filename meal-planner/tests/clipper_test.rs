//! Integration tests for [`meal_planner::clipper::RecipeClipper`] against a local web page.

mod common;

use common::{KeywordEmbedder, RecordingPublisher, TestApp, EXTRACTOR};
use meal_planner::clipper::ClipRequest;
use meal_planner::recipe::RetrieverConfig;
use meal_planner::ClipError;
use storage::{RecipeRepository, VectorStore};

const PAGE: &str = r#"<html><head><script>track()</script></head><body>
    <nav>Home</nav><h1>Grandma's Tomato Soup</h1>
    <ul><li>6 tomatoes</li><li>1 onion</li></ul><p>Simmer for 20 minutes.</p>
    <footer>Subscribe!</footer></body></html>"#;

const EXTRACTED: &str = r#"{
    "title": "Tomato Soup",
    "ingredients": ["6 tomatoes", "1 onion"],
    "instructions": ["Chop.", "Simmer for 20 minutes."],
    "tags": ["soup"],
    "prep_time": "30 min",
    "servings": "4"
}"#;

async fn app() -> TestApp {
    TestApp::new(KeywordEmbedder::new(Vec::new(), vec![0.5, 0.5]), RetrieverConfig::default()).await
}

async fn page_server(status: usize, body: &str) -> mockito::ServerGuard {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/soup")
        .with_status(status)
        .with_header("content-type", "text/html")
        .with_body(body)
        .create_async()
        .await;
    server
}

/// **Test: a link becomes a published post and a searchable recipe**
///
/// **Setup:** A page with a recipe between navigation, script and footer noise; the extractor
/// is scripted; the request carries the tag "weeknight".
///
/// **Expected:** The extractor sees the page text without the noise; the post is published
/// with the recipe's HTML and merged tags; the recipe is stored and embedded under the post id.
#[tokio::test]
async fn test_clip_publishes_and_indexes() {
    let app = app().await;
    app.generator.reply(EXTRACTOR, EXTRACTED);
    let server = page_server(200, PAGE).await;
    let publisher = RecordingPublisher::new();
    let clipper = app.clipper(publisher.clone());

    let url = format!("{}/soup", server.url());
    let clipped = clipper
        .clip(&ClipRequest {
            url: url.clone(),
            tags: vec!["Weeknight".to_string()],
        })
        .await
        .unwrap();

    let prompt = app.generator.last_prompt(EXTRACTOR).unwrap();
    assert!(prompt.contains("Grandma's Tomato Soup 6 tomatoes 1 onion Simmer for 20 minutes."));
    assert!(!prompt.contains("track()"));
    assert!(!prompt.contains("Subscribe!"));

    let published = publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].title, "Tomato Soup");
    assert_eq!(published[0].tags, vec!["weeknight", "soup"]);
    assert!(published[0].html.contains(&format!("<a href=\"{}\">", url)));
    assert!(published[0].html.contains("<li>6 tomatoes</li>"));

    assert_eq!(clipped.post.id, "clip-1");
    let stored = app.recipes.get("clip-1").await.unwrap().unwrap();
    assert_eq!(stored.title, "Tomato Soup");
    assert_eq!(stored.source_updated_at, clipped.post.updated_at);
    assert!(app.vectors.get("clip-1").await.unwrap().is_some());
    assert_eq!(app.embedder.calls(), 1);
}

#[tokio::test]
async fn test_missing_page_is_not_extracted() {
    let app = app().await;
    app.generator.reply(EXTRACTOR, EXTRACTED);
    let server = page_server(404, "gone").await;
    let publisher = RecordingPublisher::new();
    let clipper = app.clipper(publisher.clone());

    let err = clipper
        .clip(&ClipRequest {
            url: format!("{}/soup", server.url()),
            tags: Vec::new(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClipError::Status { status: 404, .. }));
    assert_eq!(app.generator.calls(EXTRACTOR), 0);
    assert!(publisher.published().is_empty());
}

/// **Test: a page without a recipe, or a blog that refuses the post, stores nothing**
#[tokio::test]
async fn test_failed_clip_stores_nothing() {
    let app = app().await;
    let server = page_server(200, "<p>Just a travel blog.</p>").await;
    let url = format!("{}/soup", server.url());
    let publisher = RecordingPublisher::new();
    let clipper = app.clipper(publisher.clone());

    app.generator
        .reply(EXTRACTOR, r#"{"title": "Travel notes", "ingredients": []}"#);
    let err = clipper
        .clip(&ClipRequest {
            url: url.clone(),
            tags: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClipError::NoRecipe(_)));
    assert!(publisher.published().is_empty());

    app.generator.reply(EXTRACTOR, EXTRACTED);
    publisher.fail();
    let err = clipper
        .clip(&ClipRequest { url, tags: Vec::new() })
        .await
        .unwrap_err();
    assert!(matches!(err, ClipError::Publish(_)));

    assert_eq!(app.recipes.count().await.unwrap(), 0);
    assert_eq!(app.embedder.calls(), 0);
}
