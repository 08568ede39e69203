//! Shared helpers for the HTTP-level tests.
#![allow(dead_code)]

use std::sync::Arc;

pub use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use receiptbook::{app::build_app, memory::MemoryStore, state::AppState};
pub use serde_json::{json, Value};
pub use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is UTF-8")
    }
}

pub fn test_app() -> TestApp {
    let (state, store) = AppState::fake();
    TestApp {
        router: build_app(state),
        store,
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn register(&self, name: &str, email: &str, password: &str) -> TestResponse {
        self.send(json_request(
            "POST",
            "/auth/register",
            &json!({ "name": name, "email": email, "password": password }),
            None,
        ))
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.send(form_request("/auth/token", email, password)).await
    }

    /// Registers a user and returns a bearer token for them.
    pub async fn user_token(&self, email: &str, password: &str) -> String {
        let reg = self.register("Test User", email, password).await;
        assert_eq!(reg.status, StatusCode::CREATED);
        let login = self.login(email, password).await;
        assert_eq!(login.status, StatusCode::OK);
        login.json()["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create_receipt(&self, token: &str, body: &Value) -> TestResponse {
        self.send(json_request("POST", "/receipts/create", body, Some(token)))
            .await
    }

    pub async fn search(&self, token: &str, query: &str, filters: &Value) -> TestResponse {
        let uri = if query.is_empty() {
            "/receipts/search".to_string()
        } else {
            format!("/receipts/search?{query}")
        };
        self.send(json_request("POST", &uri, filters, Some(token))).await
    }
}

pub fn json_request(method: &str, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(t) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn form_request(uri: &str, username: &str, password: &str) -> Request<Body> {
    let body = format!(
        "username={}&password={}",
        username.replace('@', "%40"),
        password
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

pub fn one_item_receipt(price: &str, quantity: &str, kind: &str, amount: &str) -> Value {
    json!({
        "products": [{ "name": "Test Product", "price": price, "quantity": quantity }],
        "payment": { "type": kind, "amount": amount }
    })
}
