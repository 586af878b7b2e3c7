//! Backend relay: one-way notifier pushing token and order data to an
//! external system.
//!
//! Relay delivery is decoupled from the webhook request-response cycle:
//! `dispatch` hands the message to a detached task and returns
//! immediately. A relay outage must never surface as a failed webhook
//! ack, so failures are logged and swallowed here. Each request carries
//! its own bounded timeout; no ordering is guaranteed between messages
//! for the same shop.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use magic_checkout_core::ShopDomain;

use crate::config::RelayConfig;

/// App name sent with every relay message.
const APP_NAME: &str = "magic-checkout";

/// Errors that can occur when building or using the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The configured base URL is not a valid URL.
    #[error("invalid relay URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The API key cannot be used as an HTTP header value.
    #[error("invalid relay API key: {0}")]
    InvalidApiKey(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Access-token data pushed to the backend after install or scope change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenNotification {
    /// Shop the token belongs to.
    #[serde(rename = "shopDomain")]
    pub shop: ShopDomain,
    /// The offline access token.
    pub access_token: String,
    /// Comma-joined granted scopes.
    #[serde(rename = "scopes")]
    pub scope: String,
    /// Token type, `bearer` for Shopify offline tokens.
    pub token_type: String,
    /// Token expiry; absent for non-expiring tokens.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Order data pushed to the backend for processing.
///
/// Customer and line-item shapes belong to the backend's contract, so they
/// pass through as opaque JSON values.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotification {
    /// Platform order id.
    pub order_id: String,
    /// Shop the order belongs to.
    pub shop: ShopDomain,
    /// Customer details, passed through verbatim.
    pub customer_info: serde_json::Value,
    /// Line items, passed through verbatim.
    pub line_items: serde_json::Value,
    /// Order total as a decimal string.
    pub total_amount: String,
}

/// A message handed to the relay for best-effort delivery.
#[derive(Debug, Clone)]
pub enum RelayMessage {
    /// A new or updated access token.
    Token(TokenNotification),
    /// An order to process.
    Order(OrderNotification),
    /// The app was uninstalled from a shop; the backend should drop its
    /// tokens and stop processing orders for it.
    Uninstalled {
        /// The uninstalling shop.
        shop: ShopDomain,
    },
}

impl RelayMessage {
    /// Shop the message concerns, for logging.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        match self {
            Self::Token(t) => &t.shop,
            Self::Order(o) => &o.shop,
            Self::Uninstalled { shop } => shop,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Token(_) => "token",
            Self::Order(_) => "order",
            Self::Uninstalled { .. } => "uninstall",
        }
    }
}

/// Fire-and-forget delivery of [`RelayMessage`] values.
///
/// `dispatch` must not block and must not fail: implementations own their
/// error handling end to end.
pub trait Relay: Send + Sync {
    /// Hand off a message for asynchronous delivery.
    fn dispatch(&self, message: RelayMessage);
}

/// HTTP relay posting JSON to the configured backend.
#[derive(Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    base_url: Arc<Url>,
}

/// Wire envelope adding app identity and a timestamp to each message.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T: Serialize> {
    #[serde(flatten)]
    message: T,
    app_name: &'static str,
    timestamp: DateTime<Utc>,
}

impl HttpRelay {
    /// Create a relay client for `base_url`.
    ///
    /// The reqwest client carries the bearer key as a default header and a
    /// request timeout of `config.timeout`, so every dispatch is bounded.
    ///
    /// # Errors
    ///
    /// Returns error if `base_url` is invalid, the API key is not a valid
    /// header value, or the HTTP client fails to build.
    pub fn new(base_url: &str, config: &RelayConfig) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let value = format!("Bearer {}", api_key.expose_secret());
            let mut value = HeaderValue::from_str(&value)
                .map_err(|e| RelayError::InvalidApiKey(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert("Authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::new(Url::parse(base_url)?),
        })
    }

    async fn send(client: reqwest::Client, url: Url, message: RelayMessage) -> Result<(), RelayError> {
        let timestamp = Utc::now();
        let response = match &message {
            RelayMessage::Token(token) => {
                client
                    .post(url)
                    .json(&Envelope {
                        message: token,
                        app_name: APP_NAME,
                        timestamp,
                    })
                    .send()
                    .await?
            }
            RelayMessage::Order(order) => {
                client
                    .post(url)
                    .json(&Envelope {
                        message: order,
                        app_name: APP_NAME,
                        timestamp,
                    })
                    .send()
                    .await?
            }
            RelayMessage::Uninstalled { shop } => {
                client
                    .post(url)
                    .json(&Envelope {
                        message: serde_json::json!({ "shopDomain": shop }),
                        app_name: APP_NAME,
                        timestamp,
                    })
                    .send()
                    .await?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RelayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    fn endpoint(&self, message: &RelayMessage) -> Result<Url, url::ParseError> {
        let path = match message {
            RelayMessage::Token(_) => "api/tokens",
            RelayMessage::Order(_) => "api/orders",
            RelayMessage::Uninstalled { .. } => "api/uninstalls",
        };
        self.base_url.join(path)
    }
}

impl Relay for HttpRelay {
    fn dispatch(&self, message: RelayMessage) {
        let url = match self.endpoint(&message) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, kind = message.kind(), "Relay endpoint invalid, dropping message");
                return;
            }
        };

        let client = self.client.clone();
        // Detached: the webhook ack never waits on relay delivery.
        tokio::spawn(async move {
            let shop = message.shop().clone();
            let kind = message.kind();
            match Self::send(client, url, message).await {
                Ok(()) => {
                    tracing::debug!(shop = %shop, kind, "Relay message delivered");
                }
                Err(e) => {
                    tracing::warn!(shop = %shop, kind, error = %e, "Relay delivery failed");
                }
            }
        });
    }
}

/// Logging relay used when no backend URL is configured.
///
/// Stands in for the real backend during development: records what would
/// have been sent, without the token value itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRelay;

impl Relay for LogRelay {
    fn dispatch(&self, message: RelayMessage) {
        match &message {
            RelayMessage::Token(token) => {
                tracing::info!(
                    shop = %token.shop,
                    scope = %token.scope,
                    token_type = %token.token_type,
                    expires_at = ?token.expires_at,
                    "Relay (log-only): would send token notification"
                );
            }
            RelayMessage::Order(order) => {
                tracing::info!(
                    shop = %order.shop,
                    order_id = %order.order_id,
                    total_amount = %order.total_amount,
                    "Relay (log-only): would send order notification"
                );
            }
            RelayMessage::Uninstalled { shop } => {
                tracing::info!(
                    shop = %shop,
                    "Relay (log-only): would send uninstall notification"
                );
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn shop() -> ShopDomain {
        ShopDomain::parse("store1.myshopify.com").unwrap()
    }

    fn relay_config() -> RelayConfig {
        RelayConfig {
            base_url: Some("https://backend.example.com/".to_string()),
            api_key: Some(secrecy::SecretString::from("rzp_test_key")),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_token_envelope_wire_format() {
        let envelope = Envelope {
            message: TokenNotification {
                shop: shop(),
                access_token: "shpat_tok".to_string(),
                scope: "write_products".to_string(),
                token_type: "bearer".to_string(),
                expires_at: None,
            },
            app_name: APP_NAME,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["shopDomain"], "store1.myshopify.com");
        assert_eq!(value["accessToken"], "shpat_tok");
        assert_eq!(value["scopes"], "write_products");
        assert_eq!(value["tokenType"], "bearer");
        assert_eq!(value["appName"], "magic-checkout");
        assert!(value.get("timestamp").is_some());
    }

    #[test]
    fn test_order_envelope_keeps_opaque_fields() {
        let envelope = Envelope {
            message: OrderNotification {
                order_id: "1001".to_string(),
                shop: shop(),
                customer_info: serde_json::json!({"email": "c@example.com"}),
                line_items: serde_json::json!([{"sku": "SKU-1", "qty": 2}]),
                total_amount: "49.99".to_string(),
            },
            app_name: APP_NAME,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["orderId"], "1001");
        assert_eq!(value["customerInfo"]["email"], "c@example.com");
        assert_eq!(value["lineItems"][0]["sku"], "SKU-1");
        assert_eq!(value["totalAmount"], "49.99");
    }

    #[test]
    fn test_endpoints_per_message_kind() {
        let relay = HttpRelay::new("https://backend.example.com/", &relay_config()).unwrap();

        let token = RelayMessage::Token(TokenNotification {
            shop: shop(),
            access_token: "t".to_string(),
            scope: "s".to_string(),
            token_type: "bearer".to_string(),
            expires_at: None,
        });
        let uninstall = RelayMessage::Uninstalled { shop: shop() };

        assert_eq!(
            relay.endpoint(&token).unwrap().as_str(),
            "https://backend.example.com/api/tokens"
        );
        assert_eq!(
            relay.endpoint(&uninstall).unwrap().as_str(),
            "https://backend.example.com/api/uninstalls"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(matches!(
            HttpRelay::new("not a url", &relay_config()),
            Err(RelayError::InvalidUrl(_))
        ));
    }
}
