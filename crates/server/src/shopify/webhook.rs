//! Webhook signature verification and decoding.
//!
//! Shopify signs each delivery with HMAC-SHA256 over the raw body, keyed
//! by the app client secret, and sends the base64 digest in the
//! `X-Shopify-Hmac-Sha256` header. Verification must run on the exact
//! bytes received, before any JSON parsing.

use axum::http::HeaderMap;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use magic_checkout_core::{ShopDomain, ShopDomainError, WebhookTopic};

/// Header carrying the webhook topic in wire form.
pub const TOPIC_HEADER: &str = "x-shopify-topic";
/// Header carrying the base64 HMAC-SHA256 of the body.
pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
/// Header carrying the shop domain the delivery belongs to.
pub const SHOP_HEADER: &str = "x-shopify-shop-domain";

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur while decoding a webhook delivery.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// A required Shopify header is absent or not valid UTF-8.
    #[error("missing or unreadable header: {0}")]
    MissingHeader(&'static str),

    /// The HMAC header does not match the body.
    #[error("signature verification failed")]
    InvalidSignature,

    /// The shop domain header is not a valid shop domain.
    #[error("invalid shop domain: {0}")]
    InvalidShopDomain(#[from] ShopDomainError),

    /// The topic is not one this app handles.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// The body is not valid JSON.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// A verified, decoded webhook delivery.
#[derive(Debug)]
pub struct WebhookEvent {
    /// The event topic.
    pub topic: WebhookTopic,
    /// Shop the event belongs to.
    pub shop: ShopDomain,
    /// Topic-specific body, kept opaque until a handler needs a field.
    pub payload: serde_json::Value,
}

/// Verify the HMAC-SHA256 signature of a webhook body.
///
/// Returns `false` for undecodable signatures rather than erroring; a
/// garbage header is indistinguishable from a forged one.
#[must_use]
pub fn verify_signature(secret: &SecretString, body: &[u8], signature_b64: &str) -> bool {
    let Ok(expected) = BASE64.decode(signature_b64) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(body);
    // verify_slice compares in constant time
    mac.verify_slice(&expected).is_ok()
}

/// Verify and decode an inbound webhook request into a [`WebhookEvent`].
///
/// # Errors
///
/// Returns [`WebhookError`] when headers are missing, the signature does
/// not match, the shop domain is malformed, the topic is unhandled, or the
/// body is not JSON. Signature verification happens before topic routing
/// so unauthenticated callers cannot probe for handled topics.
pub fn decode_event(
    secret: &SecretString,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<WebhookEvent, WebhookError> {
    let signature = header_str(headers, HMAC_HEADER)?;
    if !verify_signature(secret, body, signature) {
        return Err(WebhookError::InvalidSignature);
    }

    let topic_raw = header_str(headers, TOPIC_HEADER)?;
    let topic =
        WebhookTopic::parse(topic_raw).map_err(|e| WebhookError::UnknownTopic(e.0))?;

    let shop = ShopDomain::parse(header_str(headers, SHOP_HEADER)?)?;

    let payload: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

    Ok(WebhookEvent {
        topic,
        shop,
        payload,
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader(name))
}
