//! Authorization-code exchange against the Shopify Admin OAuth endpoint.
//!
//! After the merchant approves the install, Shopify redirects back with a
//! one-time `code`; exchanging it at
//! `https://{shop}/admin/oauth/access_token` yields the offline access
//! token that the session store persists.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to Shopify.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Response body of a successful token exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    /// The offline access token.
    pub access_token: String,
    /// Comma-joined scopes actually granted.
    pub scope: String,
    /// Seconds until expiry; absent for non-expiring offline tokens.
    pub expires_in: Option<i64>,
}

/// Client for the Shopify Admin OAuth token endpoint.
#[derive(Clone)]
pub struct OAuthClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
}

impl OAuthClient {
    /// Create a new OAuth client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(client_id: &str, client_secret: SecretString) -> Result<Self, ShopifyError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            client_id: client_id.to_owned(),
            client_secret,
        })
    }

    /// Exchange an authorization code for an offline access token.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, Shopify rejects the code, or
    /// the response cannot be parsed.
    pub async fn exchange_code(
        &self,
        shop: &magic_checkout_core::ShopDomain,
        code: &str,
    ) -> Result<AccessTokenResponse, ShopifyError> {
        let url = format!("https://{shop}/admin/oauth/access_token");

        let body = serde_json::json!({
            "client_id": self.client_id,
            "client_secret": self.client_secret.expose_secret(),
            "code": code,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<AccessTokenResponse>()
            .await
            .map_err(|e| ShopifyError::Parse(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_parses_offline_grant() {
        let json = r#"{"access_token":"shpat_tok","scope":"write_products,read_orders"}"#;
        let parsed: AccessTokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.access_token, "shpat_tok");
        assert_eq!(parsed.scope, "write_products,read_orders");
        assert!(parsed.expires_in.is_none());
    }

    #[test]
    fn test_token_response_parses_expiring_grant() {
        let json = r#"{"access_token":"shpat_tok","scope":"write_products","expires_in":86399}"#;
        let parsed: AccessTokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.expires_in, Some(86399));
    }
}
