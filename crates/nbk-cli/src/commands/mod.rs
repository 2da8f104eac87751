//! Command handler modules for nbk-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod bet;
pub mod report;

use std::fs;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use nbk_config::{report_unused_keys, BookConfig, ConfigSurface, LoadedConfig, UnusedKeyPolicy};
use nbk_settlement::UpperTerms;
use tracing::warn;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Layered config from `--config` paths, else from `NBK_CONFIG`. Keys the CLI
/// never reads are reported as warnings.
pub fn load_config(paths: &[String]) -> Result<(LoadedConfig, BookConfig)> {
    let loaded = if paths.is_empty() {
        nbk_config::load_from_env()?
    } else {
        let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        nbk_config::load_layered_yaml(&refs)?
    };
    let report = report_unused_keys(ConfigSurface::Cli, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    for pointer in &report.unused_leaf_pointers {
        warn!(pointer = %pointer, "config key not read by the cli");
    }
    let book = loaded.book()?;
    Ok((loaded, book))
}

pub fn upper_terms(cfg: &BookConfig) -> UpperTerms {
    UpperTerms {
        commission_pct: cfg.upper.commission_pct,
        pair_rate: cfg.upper.pair_rate,
    }
}

/// `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

/// Inline `--text` or the contents of `--file` (UTF-8, BOM stripped).
pub fn read_text(text: Option<String>, file: Option<String>) -> Result<String> {
    if let Some(p) = file {
        let bytes = fs::read(&p).with_context(|| format!("read file failed: {p}"))?;
        let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(&bytes);
        return String::from_utf8(bytes.to_vec()).context("file must be UTF-8 text");
    }
    text.context("must provide --text or --file")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_trims_and_rejects_garbage() {
        assert_eq!(
            parse_date(" 2024-03-01 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(parse_date("01/03/2024").is_err());
    }

    #[test]
    fn read_text_needs_a_source() {
        assert!(read_text(None, None).is_err());
        assert_eq!(read_text(Some("12(10)".to_string()), None).unwrap(), "12(10)");
    }
}
