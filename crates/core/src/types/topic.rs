//! Webhook topic type.

use core::fmt;

/// Error returned when a webhook topic string is not recognized.
#[derive(thiserror::Error, Debug, Clone)]
#[error("unknown webhook topic: {0}")]
pub struct UnknownTopic(pub String);

/// Webhook topics handled by the app.
///
/// Shopify delivers the topic in the `X-Shopify-Topic` header in wire form
/// (`app/uninstalled`); webhook management APIs and logs use the canonical
/// form (`APP_UNINSTALLED`). [`WebhookTopic::parse`] accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookTopic {
    /// The app was installed on a shop.
    AppInstalled,
    /// The set of granted access scopes changed.
    AppScopesUpdate,
    /// The app was uninstalled from a shop.
    AppUninstalled,
}

impl WebhookTopic {
    /// Parse a topic from either the wire form or the canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownTopic`] for any topic this app does not handle.
    pub fn parse(s: &str) -> Result<Self, UnknownTopic> {
        // `app/uninstalled` and `APP_UNINSTALLED` normalize to the same key.
        let normalized = s.to_ascii_lowercase().replace('/', "_");
        match normalized.as_str() {
            "app_installed" => Ok(Self::AppInstalled),
            "app_scopes_update" => Ok(Self::AppScopesUpdate),
            "app_uninstalled" => Ok(Self::AppUninstalled),
            _ => Err(UnknownTopic(s.to_owned())),
        }
    }

    /// Returns the canonical form of the topic.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AppInstalled => "APP_INSTALLED",
            Self::AppScopesUpdate => "APP_SCOPES_UPDATE",
            Self::AppUninstalled => "APP_UNINSTALLED",
        }
    }
}

impl fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WebhookTopic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_form() {
        assert_eq!(
            WebhookTopic::parse("app/installed").unwrap(),
            WebhookTopic::AppInstalled
        );
        assert_eq!(
            WebhookTopic::parse("app/scopes_update").unwrap(),
            WebhookTopic::AppScopesUpdate
        );
        assert_eq!(
            WebhookTopic::parse("app/uninstalled").unwrap(),
            WebhookTopic::AppUninstalled
        );
    }

    #[test]
    fn test_parse_canonical_form() {
        assert_eq!(
            WebhookTopic::parse("APP_INSTALLED").unwrap(),
            WebhookTopic::AppInstalled
        );
        assert_eq!(
            WebhookTopic::parse("APP_SCOPES_UPDATE").unwrap(),
            WebhookTopic::AppScopesUpdate
        );
        assert_eq!(
            WebhookTopic::parse("APP_UNINSTALLED").unwrap(),
            WebhookTopic::AppUninstalled
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = WebhookTopic::parse("orders/create").unwrap_err();
        assert_eq!(err.0, "orders/create");
        assert!(WebhookTopic::parse("").is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(WebhookTopic::AppInstalled.to_string(), "APP_INSTALLED");
        assert_eq!(
            WebhookTopic::AppScopesUpdate.to_string(),
            "APP_SCOPES_UPDATE"
        );
        assert_eq!(WebhookTopic::AppUninstalled.to_string(), "APP_UNINSTALLED");
    }

    #[test]
    fn test_roundtrip_through_canonical() {
        for topic in [
            WebhookTopic::AppInstalled,
            WebhookTopic::AppScopesUpdate,
            WebhookTopic::AppUninstalled,
        ] {
            assert_eq!(WebhookTopic::parse(topic.as_str()).unwrap(), topic);
        }
    }
}
