//! Session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use magic_checkout_core::ShopDomain;

/// One merchant-shop's authorization grant.
///
/// Created by the OAuth exchange, updated in place on scope changes,
/// deleted on uninstall. At most one row per shop exists at any time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    /// Session id (`offline_{shop}` for offline tokens).
    pub id: String,
    /// Shop the grant belongs to.
    pub shop: ShopDomain,
    /// Opaque access token. Never logged.
    pub access_token: String,
    /// Comma-joined set of granted scope strings.
    pub scope: String,
    /// Expiry of the token; `None` for non-expiring offline tokens.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Session id for a shop's offline token (Shopify SDK convention).
    #[must_use]
    pub fn offline_id(shop: &ShopDomain) -> String {
        format!("offline_{shop}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_id() {
        let shop = ShopDomain::parse("store1.myshopify.com").unwrap();
        assert_eq!(Session::offline_id(&shop), "offline_store1.myshopify.com");
    }
}
