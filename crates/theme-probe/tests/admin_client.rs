//! Admin API client tests against a mock HTTP server.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use theme_probe::*;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_ROOT: &str = "/admin/api/2024-10";
const TOKEN: &str = "shpat_test";

fn client(server: &MockServer) -> AdminClient {
    AdminClient::with_base_url(format!("{}{API_ROOT}", server.uri()), TOKEN, 5000)
        .with_retry_base(Duration::from_millis(5))
}

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/{route}")))
        .and(header("X-Shopify-Access-Token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_asset(server: &MockServer, theme_id: u64, key: &str, value: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/themes/{theme_id}/assets.json")))
        .and(query_param("asset[key]", key))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "asset": { "key": key, "value": value, "theme_id": theme_id }
            })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_list_themes() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "themes.json",
        json!({
            "themes": [
                { "id": 11, "name": "Debut", "role": "unpublished", "previewable": true },
                { "id": 12, "name": "Dawn", "role": "main", "previewable": true }
            ]
        }),
    )
    .await;

    let themes = client(&server).list_themes().await.unwrap();

    assert_eq!(themes.len(), 2);
    assert_eq!(themes[1].role, ThemeRole::Main);
    assert_eq!(resolve_published(&themes).unwrap().id, 12);
}

#[tokio::test]
async fn test_list_asset_keys_and_content() {
    let server = MockServer::start().await;
    mount_asset(
        &server,
        12,
        "templates/product.json",
        r#"{"sections":{"main":{"type":"main-product"}}}"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/themes/12/assets.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assets": [
                { "key": "templates/product.json", "content_type": "application/json" },
                { "key": "sections/main-product.liquid", "content_type": "text/x-liquid" }
            ]
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let keys = client.list_asset_keys(12).await.unwrap();
    let content = client
        .get_asset_content(12, "templates/product.json")
        .await
        .unwrap();

    assert_eq!(keys, vec!["templates/product.json", "sections/main-product.liquid"]);
    assert_eq!(
        main_section_type(&content).unwrap().as_deref(),
        Some("main-product")
    );
}

#[tokio::test]
async fn test_missing_asset_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/themes/12/assets.json")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "errors": "Not Found" })))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_asset_content(12, "sections/nope.liquid")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_binary_asset_without_value_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/themes/12/assets.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "asset": { "key": "assets/logo.png", "attachment": "iVBORw0KGgo=" }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_asset_content(12, "assets/logo.png")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_unauthorized_is_remote_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/themes.json")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server).list_themes().await.unwrap_err();

    assert!(matches!(err, ProbeError::RemoteUnavailable(_)));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/themes.json")))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_json(
        &server,
        "themes.json",
        json!({ "themes": [{ "id": 3, "name": "Dawn", "role": "main" }] }),
    )
    .await;

    let themes = client(&server).list_themes().await.unwrap();

    assert_eq!(themes[0].id, 3);
}

#[tokio::test]
async fn test_persistent_rate_limit_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/themes.json")))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0.01"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server).list_themes().await.unwrap_err();

    assert!(matches!(err, ProbeError::RemoteUnavailable(_)));
}

#[tokio::test]
async fn test_published_items_via_graphql() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API_ROOT}/graphql.json")))
        .and(body_string_contains("published_status:published"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "products": {
                    "edges": [
                        { "node": { "id": "gid://shopify/Product/7", "title": "Tee", "handle": "tee" } }
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    let items = client(&server).list_published_items(1).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].handle, "tee");
}

#[tokio::test]
async fn test_graphql_errors_are_remote_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{API_ROOT}/graphql.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "message": "Access denied for products field." }]
        })))
        .mount(&server)
        .await;

    let err = client(&server).list_published_items(1).await.unwrap_err();

    assert!(matches!(err, ProbeError::RemoteUnavailable(m) if m.contains("Access denied")));
}

#[tokio::test]
async fn test_full_probe_over_http() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "themes.json",
        json!({ "themes": [{ "id": 12, "name": "Dawn", "role": "main" }] }),
    )
    .await;
    mount_asset(
        &server,
        12,
        "templates/product.json",
        r#"{"sections":{"main":{"type":"main-product"}}}"#,
    )
    .await;
    mount_asset(
        &server,
        12,
        "sections/main-product.liquid",
        r#"{% schema %}{"blocks":[{"type":"@app"}]}{% endschema %}"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path(format!("{API_ROOT}/themes/12/assets.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assets": [
                { "key": "templates/product.json" },
                { "key": "sections/main-product.liquid" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{API_ROOT}/graphql.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "products": { "edges": [] } }
        })))
        .mount(&server)
        .await;

    let orchestrator = ProbeOrchestrator::new(Arc::new(client(&server)), ProbeConfig::default());
    let run = orchestrator
        .probe(&ShopContext::new("demo.myshopify.com", TOKEN))
        .await
        .unwrap();

    assert!(run.report.supports_app_blocks);
    assert_eq!(run.report.contains_block.unwrap()["@app"], true);
    assert_eq!(run.report.preview_url, None);
}
