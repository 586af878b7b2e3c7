//! Shopify OAuth callback and the authenticated landing page.
//!
//! The install page sends the merchant to Shopify's authorize URL with
//! `state={merchant_id}`; Shopify redirects back here with a one-time
//! code. Exchanging it yields the offline access token, which becomes the
//! shop's session row. The webhook lifecycle assumes this persistence has
//! happened before `app/installed` fires.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use magic_checkout_core::ShopDomain;

use crate::error::{AppError, Result};
use crate::models::Session;
use crate::state::AppState;

/// Query parameters from the Shopify OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for a token.
    pub code: Option<String>,
    /// State parameter echoed back; must match the configured merchant id.
    pub state: Option<String>,
    /// Shop that approved the install.
    pub shop: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

/// Query parameters for the authenticated landing page.
#[derive(Debug, Deserialize)]
pub struct AppQuery {
    /// Shop domain the admin opened the app for.
    pub shop: Option<String>,
}

/// Authenticated landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "app.html")]
pub struct AppTemplate {
    /// The installed shop.
    pub shop: String,
    /// Scopes currently granted.
    pub scope: String,
}

/// Handle the Shopify OAuth callback.
///
/// Validates the `state` parameter, exchanges the authorization code for
/// an offline access token, persists the session and redirects to `/app`.
///
/// # Route
///
/// `GET /auth/callback`
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    // Check for OAuth errors from Shopify
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        tracing::warn!("Shopify OAuth error: {} - {}", error, description);
        return Err(AppError::BadRequest(format!("authorization failed: {error}")));
    }

    let Some(code) = query.code else {
        tracing::warn!("Shopify OAuth callback missing code");
        return Err(AppError::BadRequest("missing code".to_string()));
    };

    let Some(shop_param) = query.shop else {
        tracing::warn!("Shopify OAuth callback missing shop");
        return Err(AppError::BadRequest("missing shop".to_string()));
    };

    // The authorize URL carries the merchant id as `state`; anything else
    // did not originate from our install page.
    if query.state.as_deref() != Some(state.config().install.merchant_id.as_str()) {
        tracing::warn!("Shopify OAuth state mismatch");
        return Err(AppError::Unauthorized("state mismatch".to_string()));
    }

    let shop =
        ShopDomain::parse(&shop_param).map_err(|e| AppError::BadRequest(e.to_string()))?;

    // Exchange code for an offline token
    let token = state.oauth().exchange_code(&shop, &code).await?;

    let session = Session {
        id: Session::offline_id(&shop),
        shop: shop.clone(),
        access_token: token.access_token,
        scope: token.scope,
        expires_at: token
            .expires_in
            .map(|secs| chrono::Utc::now() + chrono::Duration::seconds(secs)),
    };
    state.store().upsert(&session).await?;

    tracing::info!(shop = %shop, scope = %session.scope, "OAuth exchange completed");

    Ok(Redirect::to(&format!("/app?shop={shop}")).into_response())
}

/// Authenticated landing page for an installed shop.
///
/// Looks up the shop's session; without one the merchant is sent back to
/// the install page.
///
/// # Route
///
/// `GET /app`
pub async fn app_home(
    State(state): State<AppState>,
    Query(query): Query<AppQuery>,
) -> Result<Response> {
    let Some(shop_param) = query.shop else {
        return Ok(Redirect::to("/").into_response());
    };
    let Ok(shop) = ShopDomain::parse(&shop_param) else {
        return Ok(Redirect::to("/").into_response());
    };

    match state.store().find_by_shop(&shop).await? {
        Some(session) => Ok(AppTemplate {
            shop: shop.to_string(),
            scope: session.scope,
        }
        .into_response()),
        None => Ok(Redirect::to("/").into_response()),
    }
}
