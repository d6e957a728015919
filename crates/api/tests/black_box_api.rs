use std::sync::Arc;
use std::time::Duration;

use bilio_api::app::{self, AppServices};
use bilio_auth::Claims;
use bilio_core::UserId;
use bilio_infra::notify::LogSender;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over an in-memory ledger, bound to an ephemeral port.
        let services = Arc::new(AppServices::in_memory(Arc::new(LogSender), "gmail.com"));
        let app = app::build_app(services, JWT_SECRET, Duration::from_secs(5));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api/v1", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt_at(user_id: UserId, issued_at: chrono::DateTime<Utc>, ttl: ChronoDuration) -> String {
    let claims = Claims::new(
        user_id,
        Some("owner@example.com".to_string()),
        issued_at,
        issued_at + ttl,
    );

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn mint_jwt(user_id: UserId) -> String {
    mint_jwt_at(user_id, Utc::now(), ChronoDuration::minutes(10))
}

async fn create_client(http: &reqwest::Client, srv: &TestServer, token: &str, name: &str) -> String {
    let res = http
        .post(srv.url("/clients"))
        .bearer_auth(token)
        .json(&json!({ "name": name, "email": "billing@acme.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn create_invoice(http: &reqwest::Client, srv: &TestServer, token: &str, client_id: &str) -> serde_json::Value {
    let res = http
        .post(srv.url("/invoices"))
        .bearer_auth(token)
        .json(&json!({
            "client_id": client_id,
            "invoice_number": "INV-001",
            "issue_date": "2024-05-01",
            "due_date": "2024-05-31",
            "tax_rate": 10,
            "items": [
                { "description": "Design", "quantity": 2, "unit_price": 50 },
                { "description": "Hosting", "quantity": 1, "unit_price": 25 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let health = srv.base_url.replace("/api/v1", "/health");
    let res = reqwest::get(health).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let http = reqwest::Client::new();

    let res = http.get(srv.url("/clients")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let res = http
        .get(srv.url("/clients"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt_at(
        UserId::new(),
        Utc::now() - ChronoDuration::hours(2),
        ChronoDuration::minutes(10),
    );

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn caller_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let user_id = UserId::new();

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(mint_jwt(user_id))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user_id"].as_str().unwrap(), user_id.to_string());
    assert_eq!(body["email"], "owner@example.com");
}

#[tokio::test]
async fn invoice_lifecycle_create_update_pay() {
    let srv = TestServer::spawn().await;
    let http = reqwest::Client::new();
    let token = mint_jwt(UserId::new());

    let client_id = create_client(&http, &srv, &token, "Acme").await;
    let invoice = create_invoice(&http, &srv, &token, &client_id).await;
    assert_eq!(invoice["subtotal"], json!(125.0));
    assert_eq!(invoice["tax_amount"], json!(12.5));
    assert_eq!(invoice["total"], json!(137.5));
    assert_eq!(invoice["status"], "draft");
    let id = invoice["id"].as_str().unwrap();

    let res = http
        .put(srv.url(&format!("/invoices/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "status": "pending", "currency": "USD", "tax_rate": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["status"], "pending");
    assert_eq!(updated["total"], json!(137.5));
    assert_eq!(updated["items"].as_array().unwrap().len(), 2);

    let res = http
        .post(srv.url(&format!("/invoices/{id}/pay")))
        .bearer_auth(&token)
        .json(&json!({ "amount": 137.5, "payment_method": "card", "payment_date": "2024-06-01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let paid: serde_json::Value = res.json().await.unwrap();
    assert_eq!(paid["status"], "paid");
    assert_eq!(paid["payments"].as_array().unwrap().len(), 1);

    let res = http
        .put(srv.url(&format!("/invoices/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "currency": "USD", "tax_rate": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_state");

    let res = http
        .get(srv.url("/invoices?status=paid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let listed: serde_json::Value = res.json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn out_of_range_amounts_are_a_bad_request() {
    let srv = TestServer::spawn().await;
    let http = reqwest::Client::new();
    let token = mint_jwt(UserId::new());
    let client_id = create_client(&http, &srv, &token, "Acme").await;

    let res = http
        .post(srv.url("/invoices"))
        .bearer_auth(&token)
        .json(&json!({
            "client_id": client_id,
            "invoice_number": "INV-HUGE",
            "issue_date": "2024-05-01",
            "items": [{ "description": "Galaxy", "quantity": 1e20, "unit_price": 1e20 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation");
    assert_eq!(body["message"], "amount out of range");

    let health = srv.base_url.replace("/api/v1", "/health");
    let res = reqwest::get(health).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn records_are_scoped_to_their_owner() {
    let srv = TestServer::spawn().await;
    let http = reqwest::Client::new();
    let owner = mint_jwt(UserId::new());
    let stranger = mint_jwt(UserId::new());

    let client_id = create_client(&http, &srv, &owner, "Acme").await;

    let res = http
        .get(srv.url(&format!("/clients/{client_id}")))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let res = http
        .get(srv.url("/clients/not-a-uuid"))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expenses_feed_reports() {
    let srv = TestServer::spawn().await;
    let http = reqwest::Client::new();
    let token = mint_jwt(UserId::new());

    let client_id = create_client(&http, &srv, &token, "Acme").await;
    let invoice = create_invoice(&http, &srv, &token, &client_id).await;
    let id = invoice["id"].as_str().unwrap();
    http.post(srv.url(&format!("/invoices/{id}/pay")))
        .bearer_auth(&token)
        .json(&json!({ "amount": 137.5, "payment_date": "2024-05-10" }))
        .send()
        .await
        .unwrap();

    let res = http
        .post(srv.url("/expenses"))
        .bearer_auth(&token)
        .json(&json!({
            "client_id": client_id,
            "description": "Stock photos",
            "amount": 37.5,
            "category": "assets",
            "expense_date": "2024-05-12"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = http
        .post(srv.url("/expenses"))
        .bearer_auth(&token)
        .json(&json!({ "description": "Nothing", "amount": 0, "expense_date": "2024-05-12" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let summary: serde_json::Value = http
        .get(srv.url("/reports/summary?from_date=2024-05-01&to_date=2024-05-31"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["total_revenue"], json!(137.5));
    assert_eq!(summary["total_expenses"], json!(37.5));
    assert_eq!(summary["net_profit"], json!(100.0));
    assert_eq!(summary["paid_invoices"], 1);

    let profit: serde_json::Value = http
        .get(srv.url(&format!("/reports/client-profit?client_id={client_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profit["client_name"], "Acme");
    assert_eq!(profit["net_profit"], json!(100.0));

    let res = http
        .get(srv.url("/reports/tax-summary?from_date=2024-01-01"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let tax: serde_json::Value = http
        .get(srv.url("/reports/tax-summary?from_date=2024-01-01&to_date=2024-12-31"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tax["period"], "2024-01 to 2024-12");
    assert_eq!(tax["invoices"].as_array().unwrap().len(), 1);
    assert_eq!(tax["expenses"][0]["category"], "assets");
}

#[tokio::test]
async fn promocode_gates_waitlist() {
    let srv = TestServer::spawn().await;
    let http = reqwest::Client::new();

    let res = http.post(srv.url("/promocode")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let promo: serde_json::Value = res.json().await.unwrap();
    let code = promo["promocode"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 8);

    let res = http
        .post(srv.url("/waitlist"))
        .json(&json!({ "email": "Jane@Gmail.com", "promocode": code.to_lowercase() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let joined: serde_json::Value = res.json().await.unwrap();
    assert_eq!(joined["email"], "jane@gmail.com");
    assert_eq!(joined["already_joined"], false);

    let res = http
        .post(srv.url("/waitlist"))
        .json(&json!({ "email": "someone@gmail.com", "promocode": code }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "promocode already used");

    let res = http
        .post(srv.url("/waitlist"))
        .json(&json!({ "email": "jane@yahoo.com", "promocode": "ABCDEF01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
