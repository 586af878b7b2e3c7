//! Shopify platform integration.
//!
//! - [`webhook`] - Signature verification and decoding of webhook deliveries
//! - [`oauth`] - Authorization-code exchange for offline access tokens

pub mod oauth;
pub mod webhook;

pub use oauth::{AccessTokenResponse, OAuthClient, ShopifyError};
pub use webhook::{WebhookError, WebhookEvent, decode_event, verify_signature};
