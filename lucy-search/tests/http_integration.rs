//! Search and page fetch against a local mock server.

use lucy_search::{fetch_page_content, search, SearchConfig, SearchError};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> SearchConfig {
    SearchConfig {
        endpoint: format!("{}/html/", server.uri()),
        timeout_seconds: 5,
        user_agent: Some("lucy-search-tests".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn search_posts_query_and_parses_results() {
    let server = MockServer::start().await;
    let page = r#"<html><body>
        <div class="result web-result">
          <a class="result__a" href="https://example.com/one">First</a>
          <div class="result__snippet">Snippet one</div>
        </div>
        <div class="result web-result">
          <a class="result__a" href="https://example.com/two">Second</a>
          <div class="result__snippet">Snippet two</div>
        </div>
    </body></html>"#;

    Mock::given(method("POST"))
        .and(path("/html/"))
        .and(body_string_contains("q=rust"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .expect(1)
        .mount(&server)
        .await;

    let results = search("rust", &config_for(&server)).await.expect("search");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "First");
    assert_eq!(results[1].url, "https://example.com/two");
}

#[tokio::test]
async fn search_maps_server_error_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = search("rust", &config_for(&server)).await.unwrap_err();
    assert!(matches!(err, SearchError::Status(503)), "got {err:?}");
}

#[tokio::test]
async fn fetch_extracts_readable_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Nota</title></head><body><nav>menu</nav><article><p>Texto principal.</p></article></body></html>",
        ))
        .mount(&server)
        .await;

    let url = format!("{}/article", server.uri());
    let page = fetch_page_content(&url, &config_for(&server))
        .await
        .expect("fetch");
    assert_eq!(page.title, "Nota");
    assert_eq!(page.text, "Texto principal.");
}

#[tokio::test]
async fn fetch_maps_not_found_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing", server.uri());
    let err = fetch_page_content(&url, &config_for(&server))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::Status(404)));
}

#[tokio::test]
async fn requests_prefer_spanish_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("accept-language", "es-AR,es;q=0.9,en;q=0.6"))
        .and(header("user-agent", "lucy-search-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let results = search("clima", &config_for(&server)).await.expect("search");
    assert!(results.is_empty());
}
