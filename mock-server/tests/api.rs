use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::HOST, "example.test")
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- verbose (v2) ---

#[tokio::test]
async fn verbose_first_page_has_relative_next_and_string_count() {
    let resp = app()
        .oneshot(get("/v2/Products?%24inlinecount=allpages"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["d"]["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["d"]["__next"], "Products?$skiptoken=2");
    assert_eq!(body["d"]["__count"], "5");
    assert_eq!(body["d"]["results"][0]["Released"], "/Date(1365984000000)/");
}

#[tokio::test]
async fn verbose_last_page_has_no_next() {
    let resp = app().oneshot(get("/v2/Products?$skiptoken=4")).await.unwrap();

    let body = body_json(resp).await;
    assert_eq!(body["d"]["results"].as_array().unwrap().len(), 1);
    assert!(body["d"].get("__next").is_none());
    assert!(body["d"].get("__count").is_none());
}

#[tokio::test]
async fn faulty_returns_error_body_with_success_status() {
    let resp = app().oneshot(get("/v2/Faulty")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(
        body["error"]["innererror"]["internalexception"]["internalexception"]["message"],
        "Violation of PRIMARY KEY constraint 'PK_Products'."
    );
}

// --- light (v4) ---

#[tokio::test]
async fn light_next_link_is_absolute_on_request_host() {
    let resp = app().oneshot(get("/v4/Products?$count=true")).await.unwrap();

    let body = body_json(resp).await;
    assert_eq!(body["value"].as_array().unwrap().len(), 2);
    assert_eq!(body["@odata.nextLink"], "http://example.test/v4/Products?$skiptoken=2");
    assert_eq!(body["@odata.count"], 5);
    assert_eq!(body["value"][0]["Released"], "2013-04-15T00:00:00Z");
}

#[tokio::test]
async fn get_product_by_key() {
    let resp = app()
        .oneshot(get("/v4/Products(00000000-0000-0000-0000-000000000002)"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["Name"], "Chang");
}

#[tokio::test]
async fn missing_product_returns_odata_error() {
    let resp = app()
        .oneshot(get("/v4/Products(00000000-0000-0000-0000-0000000000ff)"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "404");
    assert_eq!(body["error"]["message"], "Product not found");
}

#[tokio::test]
async fn bad_key_returns_400() {
    let resp = app().oneshot(get("/v4/Products(7)")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_product_returns_201() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/v4/Products",
            r#"{"Name":"Tofu","Price":23.25,"Released":"2021-05-06T07:08:09Z"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["Name"], "Tofu");
    assert_eq!(body["Released"], "2021-05-06T07:08:09Z");
    assert!(body["ID"].as_str().is_some());
}

#[tokio::test]
async fn create_product_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/v4/Products", r#"{"Price":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn delete_product_then_get_returns_404() {
    let app = app();
    let uri = "/v4/Products(00000000-0000-0000-0000-000000000001)";

    let resp = app
        .clone()
        .oneshot(Request::builder().method("DELETE").uri(uri).body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = app.oneshot(get(uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
