//! Runtime secret resolution.
//!
//! YAML stores environment variable NAMES only. Callers resolve once at
//! startup and pass [`ResolvedSecrets`] into constructors. Errors name the
//! variable, never the value.

use anyhow::{bail, Result};

use crate::BookConfig;

#[derive(Clone)]
pub struct ResolvedSecrets {
    /// `None` if the named variable was absent or blank.
    pub extractor_api_key: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "extractor_api_key",
                &self.extractor_api_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// The extractor key is required only when an endpoint is configured.
pub fn resolve_secrets(cfg: &BookConfig) -> Result<ResolvedSecrets> {
    let extractor_api_key = resolve_env(&cfg.extractor.api_key_env);
    if cfg.extractor.endpoint.is_some() && extractor_api_key.is_none() {
        bail!(
            "SECRETS_MISSING: extractor endpoint is configured but env var '{}' is not set or empty",
            cfg.extractor.api_key_env
        );
    }
    Ok(ResolvedSecrets { extractor_api_key })
}
