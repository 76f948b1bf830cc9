//! End-to-end session lifecycle over HTTP.

mod common;

use std::time::Duration;

use anyhow::Result;
use futures::StreamExt;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use common::{TestServer, initialize_request};

const PAGE: &str = "<html><head><title>Guide</title></head><body><main>\
    <h1>Guide</h1><p>First paragraph.</p><h2>Install</h2><p>Run it.</p>\
    </main></body></html>";

#[tokio::test]
async fn test_handshake_registers_one_session() -> Result<()> {
    let server = TestServer::start().await?;
    assert_eq!(server.sessions.len(), 0);

    let session_id = server.initialize().await?;
    assert_eq!(server.sessions.len(), 1);
    assert!(server.sessions.contains(&session_id.as_str().into()));

    let health: Value = server
        .client
        .get(format!("{}/health", server.base_url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(health["sessions"], 1);

    Ok(())
}

#[tokio::test]
async fn test_non_initialize_without_session_leaves_registry_unchanged() -> Result<()> {
    let server = TestServer::start().await?;
    let existing = server.initialize().await?;

    let response = server
        .post(None, &json!({"jsonrpc": "2.0", "id": 7, "method": "tools/list"}))
        .await?;
    assert_eq!(response.status().as_u16(), 400);

    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], -32000);
    assert_eq!(
        body["error"]["message"],
        "Bad Request: No valid session ID provided"
    );
    assert!(body["id"].is_null());

    assert_eq!(server.sessions.len(), 1);
    assert!(server.sessions.contains(&existing.as_str().into()));
    Ok(())
}

#[tokio::test]
async fn test_initialize_with_session_header_is_not_a_new_session() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .post(Some("made-up"), &initialize_request(1))
        .await?;
    assert_eq!(response.status().as_u16(), 400);
    assert_eq!(server.sessions.len(), 0);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_share_one_transport_and_one_fetch() -> Result<()> {
    let server = TestServer::start().await?;
    Mock::given(method("GET"))
        .and(path("/guide"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html"))
        .expect(1)
        .mount(&server.upstream)
        .await;

    let session_id = server.initialize().await?;
    let url = format!("{}/guide", server.upstream.uri());

    let calls = (0..5).map(|i| {
        let arguments = json!({"url": url, "startChar": i, "maxLength": 20});
        let server = &server;
        let session_id = session_id.as_str();
        async move { server.call_tool(session_id, 100 + i, "web_url_read", arguments).await }
    });
    let responses = futures::future::join_all(calls).await;

    for (i, response) in responses.into_iter().enumerate() {
        let body = response?;
        assert_eq!(body["id"], 100 + i as i64);
        assert!(body["error"].is_null(), "call {i} failed: {body}");
        let text = body["result"]["content"][0]["text"].as_str().unwrap_or_default();
        assert!(!text.is_empty());
    }

    assert_eq!(server.sessions.len(), 1);
    assert_eq!(server.cache.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_pagination_reuses_cached_document() -> Result<()> {
    let server = TestServer::start().await?;
    Mock::given(method("GET"))
        .and(path("/guide"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html"))
        .expect(1)
        .mount(&server.upstream)
        .await;

    let session_id = server.initialize().await?;
    let url = format!("{}/guide", server.upstream.uri());

    let headings = server
        .call_tool(&session_id, 2, "web_url_read", json!({"url": url, "readHeadings": true}))
        .await?;
    assert_eq!(
        headings["result"]["content"][0]["text"],
        "# Guide\n## Install"
    );

    let section = server
        .call_tool(&session_id, 3, "web_url_read", json!({"url": url, "section": "install"}))
        .await?;
    assert_eq!(
        section["result"]["content"][0]["text"],
        "## Install\n\nRun it."
    );

    let stats = server.cache.stats();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.entries[0].key, url);
    Ok(())
}

#[tokio::test]
async fn test_search_tool() -> Result<()> {
    let server = TestServer::start().await?;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"title": "Rust", "url": "https://www.rust-lang.org/", "content": "A language", "score": 1.5}
            ]
        })))
        .mount(&server.upstream)
        .await;

    let session_id = server.initialize().await?;
    let body = server
        .call_tool(&session_id, 2, "searxng_web_search", json!({"query": "rust"}))
        .await?;

    let text = body["result"]["content"][0]["text"].as_str().unwrap_or_default();
    assert!(text.contains("Title: Rust"));
    assert!(text.contains("URL: https://www.rust-lang.org/"));
    Ok(())
}

#[tokio::test]
async fn test_failed_tool_call_is_streamed_as_log_message() -> Result<()> {
    let server = TestServer::start().await?;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server.upstream)
        .await;

    let session_id = server.initialize().await?;
    let stream = server.open_stream(Some(&session_id)).await?;
    assert!(stream.status().is_success());
    assert!(
        stream.headers()["content-type"]
            .to_str()?
            .starts_with("text/event-stream")
    );

    let url = format!("{}/missing", server.upstream.uri());
    let body = server
        .call_tool(&session_id, 2, "web_url_read", json!({"url": url}))
        .await?;
    assert_eq!(body["error"]["code"], -32603);

    let mut events = stream.bytes_stream();
    let mut received = String::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(chunk) = events.next().await {
            received.push_str(&String::from_utf8_lossy(&chunk?));
            if received.contains("notifications/message") {
                break;
            }
        }
        anyhow::Ok(())
    })
    .await??;

    assert!(received.contains("event: message"));
    assert!(received.contains("\"level\":\"error\""));

    // Closing the session ends the stream
    assert_eq!(server.delete(Some(&session_id)).await?.status().as_u16(), 200);
    let ended = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(chunk) = events.next().await {
            chunk?;
        }
        anyhow::Ok(())
    })
    .await;
    assert!(ended.is_ok(), "stream did not end after close");
    Ok(())
}

#[tokio::test]
async fn test_close_then_stale_session() -> Result<()> {
    let server = TestServer::start().await?;
    let first = server.initialize().await?;
    let second = server.initialize().await?;
    assert_eq!(server.sessions.len(), 2);

    let response = server.delete(Some(&first)).await?;
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(server.sessions.len(), 1);

    // The closed id is now missing-or-invalid for GET and DELETE
    for response in [
        server.open_stream(Some(&first)).await?,
        server.delete(Some(&first)).await?,
    ] {
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await?;
        assert_eq!(body["code"], "invalid_session");
        assert_eq!(body["message"], "Invalid or missing session ID");
    }

    // ...and malformed for POST
    let response = server
        .post(Some(&first), &json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
        .await?;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await?;
    assert_eq!(body["error"]["code"], -32000);

    // The other session is untouched
    assert_eq!(server.sessions.len(), 1);
    let response = server
        .post(Some(&second), &json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
        .await?;
    assert!(response.status().is_success());
    Ok(())
}

#[tokio::test]
async fn test_missing_session_header_on_get_and_delete() -> Result<()> {
    let server = TestServer::start().await?;
    for response in [server.open_stream(None).await?, server.delete(None).await?] {
        assert_eq!(response.status().as_u16(), 400);
        let body: Value = response.json().await?;
        assert_eq!(body["code"], "invalid_session");
    }
    Ok(())
}

#[tokio::test]
async fn test_graceful_shutdown_closes_sessions() -> Result<()> {
    let server = TestServer::start().await?;
    let session_id = server.initialize().await?;
    let _stream = server.open_stream(Some(&session_id)).await?;

    let sessions = server.sessions.clone();
    let cache = server.cache.clone();
    assert!(cache.is_sweeping());

    server.shutdown().await?;
    assert!(sessions.is_empty());
    assert!(!cache.is_sweeping());
    Ok(())
}
