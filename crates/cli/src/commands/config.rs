//! Config seeding: `shopify.app.toml` -> `config.json`.
//!
//! The Shopify CLI rewrites the manifest's `client_id` when an app is
//! created or linked. This command pulls that id back into a fresh
//! `config.json`, filling the remaining fields with local-development
//! defaults that the operator then edits.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Errors from config seeding.
#[derive(Debug, thiserror::Error)]
pub enum ConfigGenError {
    #[error("Cannot read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in manifest {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("client_id not found in manifest {0}")]
    MissingClientId(String),

    #[error("Cannot serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cannot write config to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The slice of the manifest this command needs.
#[derive(Debug, Deserialize)]
struct ManifestHead {
    client_id: Option<String>,
}

/// Shape of the generated `config.json`.
#[derive(Debug, Serialize)]
struct SeededConfig {
    client_id: String,
    merchant_id: &'static str,
    shop_id: &'static str,
    app_url: &'static str,
    scopes: &'static str,
    redirect_url: &'static str,
}

impl SeededConfig {
    fn new(client_id: String) -> Self {
        Self {
            client_id,
            merchant_id: "merchant_id",
            shop_id: "magic-housekeeping",
            app_url: "https://localhost:3458",
            scopes: "read_products",
            redirect_url: "https://localhost:3458/auth/callback",
        }
    }
}

/// Generate `config.json` at `out` from the manifest at `manifest`.
///
/// Only `client_id` is taken from the manifest; every other field gets a
/// development default.
///
/// # Errors
///
/// Returns error if the manifest is missing, malformed or has no
/// `client_id`, or the config cannot be written.
pub fn generate(manifest: &Path, out: &Path) -> Result<(), ConfigGenError> {
    let display = manifest.display().to_string();
    let data = std::fs::read_to_string(manifest).map_err(|source| ConfigGenError::Io {
        path: display.clone(),
        source,
    })?;
    let head: ManifestHead = toml::from_str(&data).map_err(|source| ConfigGenError::Toml {
        path: display.clone(),
        source,
    })?;

    let client_id = head
        .client_id
        .filter(|id| !id.is_empty())
        .ok_or(ConfigGenError::MissingClientId(display))?;

    tracing::info!(client_id = %client_id, "Found client_id in manifest");

    let config = SeededConfig::new(client_id);
    let json = serde_json::to_string_pretty(&config)?;

    std::fs::write(out, json).map_err(|source| ConfigGenError::Write {
        path: out.display().to_string(),
        source,
    })?;

    tracing::info!(path = %out.display(), "Config seeded; edit the defaults before deploying");
    Ok(())
}
