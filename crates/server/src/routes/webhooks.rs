//! Webhook receiver: verification, topic routing and the session
//! lifecycle handlers.
//!
//! Shopify delivers webhooks at least once and without ordering
//! guarantees, so every handler here is idempotent and treats a missing
//! session as a normal condition, not an error. Relay calls are
//! dispatched fire-and-forget; the 200 ack never waits on them.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;

use magic_checkout_core::{ShopDomain, WebhookTopic};

use crate::db::SessionStore;
use crate::error::Result;
use crate::models::Session;
use crate::services::relay::{Relay, RelayMessage, TokenNotification};
use crate::shopify::webhook::decode_event;
use crate::state::AppState;

/// Scope granted to every install; used when a session carries none.
const DEFAULT_SCOPE: &str = "write_products";

/// Body of an `app/scopes_update` delivery.
#[derive(Debug, Deserialize)]
struct ScopesUpdatePayload {
    /// Scopes granted after the change, in grant order.
    current: Vec<String>,
}

/// Receive, verify and route a webhook delivery.
///
/// Produces `(topic, shop, session, payload)` and hands it to the matching
/// lifecycle handler. Unknown topics get a 404 and no handler runs;
/// handled topics always ack with 200 "OK" once their side effects are
/// dispatched.
///
/// # Route
///
/// `POST /webhooks`
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let event = decode_event(&state.config().client_secret, &headers, &body)?;

    tracing::info!(topic = %event.topic, shop = %event.shop, "Received webhook");

    let session = state.store().find_by_shop(&event.shop).await?;

    match event.topic {
        WebhookTopic::AppInstalled => installed(state.relay(), &event.shop, session),
        WebhookTopic::AppScopesUpdate => {
            let payload: ScopesUpdatePayload = serde_json::from_value(event.payload)
                .map_err(|e| crate::error::AppError::BadRequest(format!("invalid payload: {e}")))?;
            scopes_updated(state.store(), state.relay(), &event.shop, session, payload).await?;
        }
        WebhookTopic::AppUninstalled => {
            uninstalled(state.store(), state.relay(), &event.shop, session).await?;
        }
    }

    Ok((StatusCode::OK, "OK"))
}

/// Handle `app/installed`.
///
/// The OAuth exchange persisted the session before this webhook fired, so
/// there is nothing to write; the job here is pushing the fresh token to
/// the backend. A session without a token is logged and skipped - the
/// delivery still acks so the platform does not retry.
fn installed(relay: &dyn Relay, shop: &ShopDomain, session: Option<Session>) {
    let session = match session {
        Some(s) if !s.access_token.is_empty() => s,
        _ => {
            tracing::warn!(shop = %shop, "No access token found for shop, skipping relay");
            return;
        }
    };

    tracing::info!(shop = %shop, "App installed");

    let scope = if session.scope.is_empty() {
        DEFAULT_SCOPE.to_string()
    } else {
        session.scope
    };

    relay.dispatch(RelayMessage::Token(TokenNotification {
        shop: shop.clone(),
        access_token: session.access_token,
        scope,
        token_type: "bearer".to_string(),
        expires_at: session.expires_at,
    }));
}

/// Handle `app/scopes_update`.
///
/// Overwrites the stored scope with the comma-join of `current`, then
/// pushes the refreshed grant to the backend. A pure overwrite keyed by
/// session id: redelivery converges to the same stored value, and a stale
/// update after an uninstall finds no session and does nothing.
async fn scopes_updated(
    store: &dyn SessionStore,
    relay: &dyn Relay,
    shop: &ShopDomain,
    session: Option<Session>,
    payload: ScopesUpdatePayload,
) -> Result<()> {
    let Some(session) = session else {
        tracing::debug!(shop = %shop, "Scopes update for shop without session, ignoring");
        return Ok(());
    };

    let scope = payload.current.join(",");
    store.update_scope(&session.id, &scope).await?;

    tracing::info!(shop = %shop, scope = %scope, "App scopes updated");

    relay.dispatch(RelayMessage::Token(TokenNotification {
        shop: shop.clone(),
        access_token: session.access_token,
        scope,
        token_type: "bearer".to_string(),
        expires_at: session.expires_at,
    }));

    Ok(())
}

/// Handle `app/uninstalled`.
///
/// Deletes every session row for the shop, then tells the backend to drop
/// its tokens. Shopify can deliver this topic repeatedly and after the
/// session is already gone; the absent-session case is a silent no-op.
async fn uninstalled(
    store: &dyn SessionStore,
    relay: &dyn Relay,
    shop: &ShopDomain,
    session: Option<Session>,
) -> Result<()> {
    if session.is_none() {
        tracing::debug!(shop = %shop, "Uninstall for shop without session, already cleaned up");
        return Ok(());
    }

    let removed = store.delete_by_shop(shop).await?;
    tracing::info!(shop = %shop, removed, "App uninstalled, sessions deleted");

    relay.dispatch(RelayMessage::Uninstalled { shop: shop.clone() });

    Ok(())
}
