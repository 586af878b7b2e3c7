//! End-to-end webhook lifecycle tests.
//!
//! Drives the real router with signed requests against an in-memory
//! session store and a recording relay, covering topic routing, handler
//! idempotence and out-of-order delivery.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use tower::ServiceExt;

use magic_checkout_core::ShopDomain;
use magic_checkout_server::config::{AppConfig, InstallConfig, RelayConfig};
use magic_checkout_server::db::{RepositoryError, SessionStore};
use magic_checkout_server::models::Session;
use magic_checkout_server::routes;
use magic_checkout_server::services::relay::{Relay, RelayMessage};
use magic_checkout_server::state::AppState;

const CLIENT_SECRET: &str = "shpss_test123secret456";
const SHOP: &str = "store1.myshopify.com";

// =============================================================================
// Test doubles
// =============================================================================

/// In-memory session store keyed by shop.
#[derive(Default)]
struct MemoryStore {
    sessions: Mutex<Vec<Session>>,
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find_by_shop(&self, shop: &ShopDomain) -> Result<Option<Session>, RepositoryError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.shop == *shop)
            .cloned())
    }

    async fn upsert(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.retain(|s| s.id != session.id);
        sessions.push(session.clone());
        Ok(())
    }

    async fn update_scope(&self, id: &str, scope: &str) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        // Update-only, like the SQL store: a missing id stays missing.
        if let Some(session) = sessions.iter_mut().find(|s| s.id == id) {
            session.scope = scope.to_string();
        }
        Ok(())
    }

    async fn delete_by_shop(&self, shop: &ShopDomain) -> Result<u64, RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.shop != *shop);
        Ok((before - sessions.len()) as u64)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Relay double that records every dispatched message.
#[derive(Default)]
struct RecordingRelay {
    messages: Mutex<Vec<RelayMessage>>,
}

impl Relay for RecordingRelay {
    fn dispatch(&self, message: RelayMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

// =============================================================================
// Harness
// =============================================================================

fn test_config() -> AppConfig {
    AppConfig {
        install: InstallConfig {
            client_id: "abc".to_string(),
            merchant_id: "m1".to_string(),
            shop_id: "store1".to_string(),
            app_url: "https://localhost:3458".to_string(),
            scopes: "read_products".to_string(),
            redirect_url: "https://x/cb".to_string(),
        },
        host: "127.0.0.1".parse().unwrap(),
        port: 3458,
        database_url: SecretString::from("postgres://localhost/test"),
        client_secret: SecretString::from(CLIENT_SECRET),
        relay: RelayConfig {
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(5),
        },
        sentry_dsn: None,
    }
}

fn test_app() -> (Router, Arc<MemoryStore>, Arc<RecordingRelay>) {
    let store = Arc::new(MemoryStore::default());
    let relay = Arc::new(RecordingRelay::default());
    let state = AppState::from_parts(
        test_config(),
        store.clone() as Arc<dyn SessionStore>,
        relay.clone() as Arc<dyn Relay>,
    )
    .unwrap();
    (routes::routes().with_state(state), store, relay)
}

fn shop() -> ShopDomain {
    ShopDomain::parse(SHOP).unwrap()
}

fn session_with_scope(scope: &str) -> Session {
    Session {
        id: Session::offline_id(&shop()),
        shop: shop(),
        access_token: "shpat_tok".to_string(),
        scope: scope.to_string(),
        expires_at: None,
    }
}

fn sign(body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(CLIENT_SECRET.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

fn webhook_request(topic: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhooks")
        .header("content-type", "application/json")
        .header("x-shopify-topic", topic)
        .header("x-shopify-shop-domain", SHOP)
        .header("x-shopify-hmac-sha256", sign(body))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn deliver(app: &Router, topic: &str, body: &str) -> StatusCode {
    app.clone()
        .oneshot(webhook_request(topic, body))
        .await
        .unwrap()
        .status()
}

fn recorded(relay: &RecordingRelay) -> Vec<RelayMessage> {
    relay.messages.lock().unwrap().clone()
}

// =============================================================================
// Dispatcher
// =============================================================================

#[tokio::test]
async fn unknown_topic_returns_404_and_runs_no_handler() {
    let (app, store, relay) = test_app();
    store.upsert(&session_with_scope("read_products")).await.unwrap();

    let status = deliver(&app, "orders/create", "{}").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(recorded(&relay).is_empty());
    assert!(store.find_by_shop(&shop()).await.unwrap().is_some());
}

#[tokio::test]
async fn invalid_signature_returns_401_and_runs_no_handler() {
    let (app, store, relay) = test_app();
    store.upsert(&session_with_scope("read_products")).await.unwrap();

    let body = "{}";
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks")
        .header("x-shopify-topic", "app/uninstalled")
        .header("x-shopify-shop-domain", SHOP)
        .header("x-shopify-hmac-sha256", sign("different body"))
        .body(Body::from(body))
        .unwrap();

    let status = app.clone().oneshot(request).await.unwrap().status();

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(recorded(&relay).is_empty());
    assert!(store.find_by_shop(&shop()).await.unwrap().is_some());
}

#[tokio::test]
async fn missing_headers_return_400() {
    let (app, _store, _relay) = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/webhooks")
        .body(Body::from("{}"))
        .unwrap();

    let status = app.clone().oneshot(request).await.unwrap().status();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn canonical_topic_form_is_accepted() {
    let (app, store, relay) = test_app();
    store.upsert(&session_with_scope("read_products")).await.unwrap();

    let status = deliver(&app, "APP_UNINSTALLED", "{}").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(recorded(&relay).len(), 1);
}

// =============================================================================
// AppInstalled
// =============================================================================

#[tokio::test]
async fn installed_relays_token_notification() {
    let (app, store, relay) = test_app();
    store
        .upsert(&session_with_scope("read_products,write_products"))
        .await
        .unwrap();

    let status = deliver(&app, "app/installed", "{}").await;
    assert_eq!(status, StatusCode::OK);

    let messages = recorded(&relay);
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        RelayMessage::Token(token) => {
            assert_eq!(token.shop.as_str(), SHOP);
            assert_eq!(token.access_token, "shpat_tok");
            assert_eq!(token.scope, "read_products,write_products");
            assert_eq!(token.token_type, "bearer");
            assert!(token.expires_at.is_none());
        }
        other => panic!("expected token notification, got {other:?}"),
    }
}

#[tokio::test]
async fn installed_defaults_empty_scope_to_write_products() {
    let (app, store, relay) = test_app();
    store.upsert(&session_with_scope("")).await.unwrap();

    let status = deliver(&app, "app/installed", "{}").await;
    assert_eq!(status, StatusCode::OK);

    match &recorded(&relay)[0] {
        RelayMessage::Token(token) => assert_eq!(token.scope, "write_products"),
        other => panic!("expected token notification, got {other:?}"),
    }
}

#[tokio::test]
async fn installed_without_session_acks_without_relay() {
    let (app, _store, relay) = test_app();

    let status = deliver(&app, "app/installed", "{}").await;

    assert_eq!(status, StatusCode::OK);
    assert!(recorded(&relay).is_empty());
}

#[tokio::test]
async fn installed_with_empty_token_acks_without_relay() {
    let (app, store, relay) = test_app();
    let mut session = session_with_scope("read_products");
    session.access_token = String::new();
    store.upsert(&session).await.unwrap();

    let status = deliver(&app, "app/installed", "{}").await;

    assert_eq!(status, StatusCode::OK);
    assert!(recorded(&relay).is_empty());
}

// =============================================================================
// ScopesUpdated
// =============================================================================

#[tokio::test]
async fn scopes_update_overwrites_stored_scope() {
    let (app, store, relay) = test_app();
    store.upsert(&session_with_scope("read_products")).await.unwrap();

    let body = r#"{"current":["read_orders","write_products"]}"#;
    let status = deliver(&app, "app/scopes_update", body).await;
    assert_eq!(status, StatusCode::OK);

    let stored = store.find_by_shop(&shop()).await.unwrap().unwrap();
    assert_eq!(stored.scope, "read_orders,write_products");

    match &recorded(&relay)[0] {
        RelayMessage::Token(token) => assert_eq!(token.scope, "read_orders,write_products"),
        other => panic!("expected token notification, got {other:?}"),
    }
}

#[tokio::test]
async fn scopes_update_is_idempotent() {
    let (app, store, _relay) = test_app();
    store.upsert(&session_with_scope("read_products")).await.unwrap();

    let body = r#"{"current":["read_orders","write_products"]}"#;
    assert_eq!(deliver(&app, "app/scopes_update", body).await, StatusCode::OK);
    let first = store.find_by_shop(&shop()).await.unwrap().unwrap().scope;

    assert_eq!(deliver(&app, "app/scopes_update", body).await, StatusCode::OK);
    let second = store.find_by_shop(&shop()).await.unwrap().unwrap().scope;

    // Pure overwrite: redelivery converges, no duplication or append
    assert_eq!(first, second);
    assert_eq!(second, "read_orders,write_products");
}

#[tokio::test]
async fn scopes_update_without_session_is_noop() {
    let (app, store, relay) = test_app();

    let body = r#"{"current":["read_orders"]}"#;
    let status = deliver(&app, "app/scopes_update", body).await;

    assert_eq!(status, StatusCode::OK);
    assert!(recorded(&relay).is_empty());
    assert!(store.find_by_shop(&shop()).await.unwrap().is_none());
}

#[tokio::test]
async fn scopes_update_with_malformed_payload_is_rejected() {
    let (app, store, _relay) = test_app();
    store.upsert(&session_with_scope("read_products")).await.unwrap();

    let status = deliver(&app, "app/scopes_update", r#"{"current":"oops"}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let stored = store.find_by_shop(&shop()).await.unwrap().unwrap();
    assert_eq!(stored.scope, "read_products");
}

// =============================================================================
// AppUninstalled
// =============================================================================

#[tokio::test]
async fn uninstalled_deletes_all_rows_for_shop() {
    let (app, store, relay) = test_app();
    store.upsert(&session_with_scope("read_products")).await.unwrap();
    // A stale row under a different id must go too
    store
        .upsert(&Session {
            id: "stale_session".to_string(),
            ..session_with_scope("read_products")
        })
        .await
        .unwrap();

    let status = deliver(&app, "app/uninstalled", "{}").await;

    assert_eq!(status, StatusCode::OK);
    assert!(store.find_by_shop(&shop()).await.unwrap().is_none());
    assert!(matches!(
        recorded(&relay).as_slice(),
        [RelayMessage::Uninstalled { shop }] if shop.as_str() == SHOP
    ));
}

#[tokio::test]
async fn duplicate_uninstall_is_noop() {
    let (app, store, relay) = test_app();
    store.upsert(&session_with_scope("read_products")).await.unwrap();

    assert_eq!(deliver(&app, "app/uninstalled", "{}").await, StatusCode::OK);
    assert_eq!(deliver(&app, "app/uninstalled", "{}").await, StatusCode::OK);

    // Only the first delivery found a session to clean up
    assert_eq!(recorded(&relay).len(), 1);
}

#[tokio::test]
async fn stale_scopes_update_after_uninstall_does_not_resurrect_session() {
    let (app, store, relay) = test_app();
    store.upsert(&session_with_scope("read_products")).await.unwrap();

    assert_eq!(deliver(&app, "app/uninstalled", "{}").await, StatusCode::OK);

    let body = r#"{"current":["read_orders"]}"#;
    assert_eq!(deliver(&app, "app/scopes_update", body).await, StatusCode::OK);

    assert!(store.find_by_shop(&shop()).await.unwrap().is_none());
    // Only the uninstall reached the relay
    assert_eq!(recorded(&relay).len(), 1);
}

// =============================================================================
// OAuth entry point
// =============================================================================

#[tokio::test]
async fn home_serves_install_page_with_authorize_url() {
    let (app, _store, _relay) = test_app();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("store1.myshopify.com/admin/oauth/authorize"));
    assert!(html.contains("client_id=abc"));
}

#[tokio::test]
async fn home_with_shop_redirects_to_app() {
    let (app, _store, _relay) = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/?shop=store1.myshopify.com&host=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers().get("location").unwrap().to_str().unwrap();
    assert_eq!(location, "/app?shop=store1.myshopify.com&host=abc");
}

#[tokio::test]
async fn app_page_without_session_redirects_to_install() {
    let (app, _store, _relay) = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/app?shop=store1.myshopify.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get("location").unwrap().to_str().unwrap(),
        "/"
    );
}

#[tokio::test]
async fn app_page_with_session_shows_grant() {
    let (app, store, _relay) = test_app();
    store.upsert(&session_with_scope("read_products")).await.unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/app?shop=store1.myshopify.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("store1.myshopify.com"));
    assert!(html.contains("read_products"));
}

#[tokio::test]
async fn oauth_callback_rejects_state_mismatch() {
    let (app, store, _relay) = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/callback?code=c1&state=wrong&shop=store1.myshopify.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.find_by_shop(&shop()).await.unwrap().is_none());
}

#[tokio::test]
async fn oauth_callback_rejects_missing_code() {
    let (app, _store, _relay) = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/callback?state=m1&shop=store1.myshopify.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
