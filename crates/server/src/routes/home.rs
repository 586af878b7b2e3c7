//! OAuth entry point: the public install page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, RawQuery, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Query parameters the install page reacts to.
#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    /// Shop domain Shopify appends when opening the app from the admin.
    pub shop: Option<String>,
}

/// Install page template.
#[derive(Template, WebTemplate)]
#[template(path = "install.html")]
pub struct InstallTemplate {
    /// The OAuth authorize URL the install button points at.
    pub install_url: String,
}

/// Serve the install page, or forward shop-qualified requests to the app.
///
/// Requests arriving with a `shop` query parameter come from an admin that
/// already installed the app; they are forwarded to `/app` with the query
/// string intact.
///
/// # Route
///
/// `GET /`
pub async fn home(
    State(state): State<AppState>,
    Query(params): Query<HomeQuery>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response> {
    if params.shop.is_some() {
        let query = raw_query.unwrap_or_default();
        return Ok(Redirect::to(&format!("/app?{query}")).into_response());
    }

    let install_url = state
        .config()
        .install
        .authorize_url()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(InstallTemplate {
        install_url: install_url.to_string(),
    }
    .into_response())
}
