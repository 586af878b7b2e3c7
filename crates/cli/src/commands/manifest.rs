//! Manifest generation: `config.json` -> `shopify.app.toml`.
//!
//! The manifest is what the Shopify CLI deploys; `config.json` is the
//! hand-edited source of truth. This command regenerates the manifest
//! from the config so the two never drift.

use std::path::Path;

use serde::{Deserialize, Serialize};

use magic_checkout_server::config::{ConfigError, InstallConfig};

/// App name written into the manifest.
const APP_NAME: &str = "Magic Checkout";

/// Webhook API version pinned in the manifest.
const WEBHOOK_API_VERSION: &str = "2025-10";

/// Errors from manifest generation.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot serialize manifest: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Cannot write manifest to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The Shopify app manifest (`shopify.app.toml`).
#[derive(Debug, Serialize, Deserialize)]
pub struct AppManifest {
    pub client_id: String,
    pub name: String,
    pub application_url: String,
    pub embedded: bool,
    pub build: BuildSection,
    pub webhooks: WebhooksSection,
    pub access_scopes: AccessScopesSection,
    pub auth: AuthSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BuildSection {
    pub automatically_update_urls_on_dev: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhooksSection {
    pub api_version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessScopesSection {
    pub scopes: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSection {
    pub redirect_urls: Vec<String>,
}

impl AppManifest {
    /// Build a manifest from a validated config.
    #[must_use]
    pub fn from_config(config: &InstallConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            name: APP_NAME.to_string(),
            application_url: config.app_url.clone(),
            embedded: true,
            build: BuildSection {
                automatically_update_urls_on_dev: true,
            },
            webhooks: WebhooksSection {
                api_version: WEBHOOK_API_VERSION.to_string(),
            },
            access_scopes: AccessScopesSection {
                scopes: config.scopes.clone(),
            },
            auth: AuthSection {
                redirect_urls: vec![config.redirect_url.clone()],
            },
        }
    }
}

/// Generate `shopify.app.toml` at `out` from the config file at `config`.
///
/// # Errors
///
/// Returns error if the config file is missing, malformed or incomplete,
/// or the manifest cannot be written.
pub fn generate(config: &Path, out: &Path) -> Result<(), ManifestError> {
    let install = InstallConfig::from_path(config)?;
    tracing::info!(path = %config.display(), "Configuration loaded and validated");

    let manifest = AppManifest::from_config(&install);
    let toml = toml::to_string_pretty(&manifest)?;

    std::fs::write(out, toml).map_err(|source| ManifestError::Io {
        path: out.display().to_string(),
        source,
    })?;

    tracing::info!(
        path = %out.display(),
        client_id = %manifest.client_id,
        application_url = %manifest.application_url,
        scopes = %manifest.access_scopes.scopes,
        "Manifest generated"
    );
    Ok(())
}
