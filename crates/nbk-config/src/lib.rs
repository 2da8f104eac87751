//! nbk-config
//!
//! Layered YAML configuration for the book.
//! - docs are deep-merged in order (later overrides earlier) into JSON
//! - leaf strings that look like secret literals are rejected; YAML names
//!   environment variables instead
//! - canonical JSON + SHA-256 hash identifies the effective config
//! - unused-key report per consuming surface
//! - typed [`BookConfig`] view over the merged JSON

mod book;
mod secrets;
mod unused;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

pub use book::{BookConfig, DaemonConfig, ExtractorConfig, IntakeConfig, UpperConfig, DEFAULT_DRAWS};
pub use secrets::{resolve_secrets, ResolvedSecrets};
pub use unused::{consumed_pointers_for, report_unused_keys, ConfigSurface, UnusedKeyPolicy, UnusedKeyReport};

/// Environment variable naming a comma-separated list of YAML layers.
pub const ENV_CONFIG: &str = "NBK_CONFIG";

/// Prefixes of credential formats that must never appear as literal values.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",
    "sk_live",
    "sk_test",
    "AKIA",
    "-----BEGIN",
    "ghp_",
    "gho_",
    "glpat-",
    "xoxb-",
    "xoxp-",
    "AIza",
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view; absent sections take their defaults.
    pub fn book(&self) -> Result<BookConfig> {
        BookConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Layers from `NBK_CONFIG` (comma-separated paths), or defaults only when
/// the variable is unset.
pub fn load_from_env() -> Result<LoadedConfig> {
    match std::env::var(ENV_CONFIG) {
        Ok(v) if !v.trim().is_empty() => {
            let paths: Vec<&str> = v.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
            load_layered_yaml(&paths)
        }
        _ => load_layered_yaml_from_strings(&[]),
    }
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty document parses as null; treat it as an empty layer.
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    unused::collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_override_leaves_only() {
        let base = "upper:\n  commission_pct: 20\n  pair_rate: 80\n";
        let overlay = "upper:\n  pair_rate: 75\n";
        let c = load_layered_yaml_from_strings(&[base, overlay]).unwrap();
        assert_eq!(c.config_json.pointer("/upper/commission_pct").unwrap(), 20);
        assert_eq!(c.config_json.pointer("/upper/pair_rate").unwrap(), 75);
    }

    #[test]
    fn empty_layer_is_ignored() {
        let a = load_layered_yaml_from_strings(&["draws: [GALI]"]).unwrap();
        let b = load_layered_yaml_from_strings(&["draws: [GALI]", ""]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
    }

    #[test]
    fn short_strings_are_not_secrets() {
        assert!(!looks_like_secret("sk-1"));
        assert!(looks_like_secret("sk-abcdefghijk"));
    }
}
