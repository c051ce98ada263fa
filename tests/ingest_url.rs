//! URL ingestion against a local mock HTTP server.

use std::sync::Arc;

use httpmock::prelude::*;
use ragline::engine::KnowledgeEngine;
use ragline::ingestion::{PageCache, load_url};
use ragline::stores::MemoryChunkStore;
use ragline::testing::{DeterministicEmbedding, ScriptedChatModel};
use url::Url;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Reference</title></head>
<body>
  <h1>Reference Page</h1>
  <p>Fact A [1]. Fact B [edit]. Fact A [1].</p>
  <script>console.log("tracking");</script>
</body>
</html>"#;

#[tokio::test]
async fn ingests_a_web_page_end_to_end() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/reference");
            then.status(200)
                .header("content-type", "text/html")
                .body(PAGE);
        })
        .await;

    let client = reqwest::Client::builder().build().unwrap();
    let url = Url::parse(&server.url("/reference")).unwrap();

    let document = load_url(&client, &url, None).await.unwrap();
    mock.assert_async().await;
    assert_eq!(document.source, url.to_string());
    assert!(document.text.contains("Fact A"));
    assert!(!document.text.contains("tracking"));

    let chat = Arc::new(ScriptedChatModel::replying("Fact A holds."));
    let store = Arc::new(MemoryChunkStore::new(DeterministicEmbedding::default()));
    let engine = KnowledgeEngine::new(store, chat);

    let stored = engine.ingest_documents(vec![document]).await.unwrap();
    assert!(stored >= 1);

    let outcome = engine.ask("Fact A", &[]).await.unwrap();
    assert!(outcome.evidence.iter().any(|text| text.contains("Fact A")));
}

#[tokio::test]
async fn cached_page_skips_the_network_on_second_fetch() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/cached");
            then.status(200)
                .header("content-type", "text/html")
                .body(PAGE);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = PageCache::new(dir.path());
    let client = reqwest::Client::builder().build().unwrap();
    let url = Url::parse(&server.url("/cached")).unwrap();

    let first = load_url(&client, &url, Some(&cache)).await.unwrap();
    let second = load_url(&client, &url, Some(&cache)).await.unwrap();

    assert_eq!(first.text, second.text);
    // Only the first load hit the server.
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn http_error_surfaces_as_request_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        })
        .await;

    let client = reqwest::Client::builder().build().unwrap();
    let url = Url::parse(&server.url("/missing")).unwrap();

    let err = load_url(&client, &url, None).await.unwrap_err();
    assert!(matches!(err, ragline::types::RagError::Http(_)));
}
