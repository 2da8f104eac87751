use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use nbk_grid::{Amount, Rate};
use nbk_schemas::DrawCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Draw codes used when the config does not list any.
pub const DEFAULT_DRAWS: [&str; 6] = ["DSWR", "FRBD", "GZBD", "GALI", "DLBZ", "SGNS"];

/// Typed view over the merged config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    pub upper: UpperConfig,
    pub draws: Vec<DrawCode>,
    /// IANA zone whose calendar day a submitted bet is booked under.
    pub timezone: String,
    pub intake: IntakeConfig,
    pub extractor: ExtractorConfig,
    pub daemon: DaemonConfig,
}

/// Terms with the upstream book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpperConfig {
    pub commission_pct: Rate,
    pub pair_rate: Rate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Per-directive ceiling; `None` accepts everything.
    pub credit_limit: Option<Amount>,
}

/// Order-extraction collaborator. The key itself lives in the environment
/// variable named by `api_key_env`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub endpoint: Option<String>,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub addr: String,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            upper: UpperConfig::default(),
            draws: DEFAULT_DRAWS
                .iter()
                .filter_map(|d| DrawCode::parse(d).ok())
                .collect(),
            timezone: "UTC".to_string(),
            intake: IntakeConfig::default(),
            extractor: ExtractorConfig::default(),
            daemon: DaemonConfig::default(),
        }
    }
}

impl Default for UpperConfig {
    fn default() -> Self {
        Self {
            commission_pct: Rate::from_units(20),
            pair_rate: Rate::from_units(80),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key_env: "NBK_EXTRACTOR_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8899".to_string(),
        }
    }
}

impl BookConfig {
    pub fn from_json(config_json: &Value) -> Result<Self> {
        let cfg: BookConfig =
            serde_json::from_value(config_json.clone()).context("CONFIG_INVALID: book config")?;
        if !cfg.upper.commission_pct.is_valid_percent() {
            anyhow::bail!(
                "CONFIG_INVALID: upper.commission_pct {} outside 0..=100",
                cfg.upper.commission_pct
            );
        }
        if cfg.draws.is_empty() {
            anyhow::bail!("CONFIG_INVALID: draws must not be empty");
        }
        cfg.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("CONFIG_INVALID: timezone '{}': {e}", cfg.timezone))?;
        Ok(cfg)
    }

    /// Validated in [`BookConfig::from_json`]; falls back to UTC otherwise.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }

    /// Current business day in the configured zone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz()).date_naive()
    }

    pub fn is_known_draw(&self, draw: &DrawCode) -> bool {
        self.draws.contains(draw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;

    #[test]
    fn empty_config_takes_defaults() {
        let c = load_layered_yaml_from_strings(&[]).unwrap().book().unwrap();
        assert_eq!(c, BookConfig::default());
        assert_eq!(c.draws.len(), 6);
        assert_eq!(c.upper.pair_rate, Rate::from_units(80));
    }

    #[test]
    fn partial_sections_fill_in() {
        let yaml = r#"
upper:
  commission_pct: "17.5"
intake:
  credit_limit: 5000
draws: [gali, dswr]
"#;
        let c = load_layered_yaml_from_strings(&[yaml]).unwrap().book().unwrap();
        assert_eq!(c.upper.commission_pct, Rate::parse("17.5").unwrap());
        assert_eq!(c.upper.pair_rate, Rate::from_units(80));
        assert_eq!(c.intake.credit_limit, Some(Amount::from_units(5000)));
        assert!(c.is_known_draw(&DrawCode::parse("GALI").unwrap()));
        assert!(!c.is_known_draw(&DrawCode::parse("FRBD").unwrap()));
    }

    #[test]
    fn timezone_is_validated() {
        let ok = load_layered_yaml_from_strings(&["timezone: Asia/Kolkata\n"]).unwrap();
        assert_eq!(ok.book().unwrap().tz(), chrono_tz::Asia::Kolkata);
        let bad = load_layered_yaml_from_strings(&["timezone: Mars/Olympus\n"]).unwrap();
        assert!(bad.book().is_err());
    }

    #[test]
    fn invalid_commission_rejected() {
        let c = load_layered_yaml_from_strings(&["upper:\n  commission_pct: 120\n"]).unwrap();
        assert!(c.book().is_err());
    }
}
