//! # CLI Configuration
//!
//! Settings for the `niaga` binary: where the ledger lives, which tax
//! regime invoices are computed under, how wide document numbers are
//! padded, and the default log filter.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     NIAGA_DB_PATH=/srv/niaga/ledger.db                                 │
//! │     NIAGA_TAX_REGIME=legacy                                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/niaga/config.toml (Linux)                                │
//! │     ~/Library/Application Support/id.niaga.niaga/config.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     DPP 11/12, VAT 12%, SAR/KW width 4, SPD width 3                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # config.toml
//! [database]
//! path = "/srv/niaga/ledger.db"
//! max_connections = 5
//! allocation_attempts = 5
//!
//! [tax]
//! regime = "custom"      # standard | legacy | custom
//! dpp_ratio = "11/12"    # custom only
//! vat_ratio = "12/100"   # custom only
//!
//! [numbering]
//! sar_width = 4
//! kw_width = 4
//! spd_width = 3
//!
//! [logging]
//! filter = "info,niaga=debug,sqlx=warn"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use niaga_core::{NumberScheme, SchemeKind, TaxPolicy};
use niaga_db::DbConfig;

/// Log filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,niaga=debug,sqlx=warn";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Ledger file. Falls back to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Retries when two writers race for the same document number.
    #[serde(default = "default_allocation_attempts")]
    pub allocation_attempts: u32,
}

fn default_max_connections() -> u32 {
    5
}

fn default_allocation_attempts() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            allocation_attempts: default_allocation_attempts(),
        }
    }
}

// =============================================================================
// Tax Settings
// =============================================================================

/// Which DPP / VAT ratios invoices are computed under.
///
/// ## Regimes
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  STANDARD (Default)   │  LEGACY               │  CUSTOM                 │
/// │  ─────────────────    │  ──────               │  ──────                 │
/// │  DPP = goods × 11/12  │  DPP = goods          │  dpp_ratio from config  │
/// │  VAT = DPP × 12%      │  VAT = DPP × 11%      │  vat_ratio from config  │
/// │                       │                       │                         │
/// │  goods 200.000        │  goods 200.000        │                         │
/// │  → DPP 183.333        │  → DPP 200.000        │                         │
/// │  → VAT  22.000        │  → VAT  22.000        │                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    #[default]
    Standard,
    Legacy,
    Custom,
}

impl std::fmt::Display for TaxRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxRegime::Standard => write!(f, "standard"),
            TaxRegime::Legacy => write!(f, "legacy"),
            TaxRegime::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for TaxRegime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(TaxRegime::Standard),
            "legacy" => Ok(TaxRegime::Legacy),
            "custom" => Ok(TaxRegime::Custom),
            other => Err(ConfigError::Invalid(format!(
                "unknown tax regime '{}', expected standard, legacy or custom",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxSettings {
    #[serde(default)]
    pub regime: TaxRegime,

    /// `"num/den"`, custom regime only.
    #[serde(default)]
    pub dpp_ratio: Option<String>,

    /// `"num/den"`, custom regime only.
    #[serde(default)]
    pub vat_ratio: Option<String>,
}

impl TaxSettings {
    /// Resolves the regime into the ratios the totals pipeline applies.
    pub fn policy(&self) -> ConfigResult<TaxPolicy> {
        match self.regime {
            TaxRegime::Standard | TaxRegime::Legacy if self.has_ratios() => Err(
                ConfigError::Invalid(format!(
                    "tax ratios are only read under the custom regime, not '{}'",
                    self.regime
                )),
            ),
            TaxRegime::Standard => Ok(TaxPolicy::standard()),
            TaxRegime::Legacy => Ok(TaxPolicy::legacy()),
            TaxRegime::Custom => {
                let dpp = required_ratio("tax.dpp_ratio", self.dpp_ratio.as_deref())?;
                let vat = required_ratio("tax.vat_ratio", self.vat_ratio.as_deref())?;
                TaxPolicy::try_new(dpp, vat).map_err(|e| ConfigError::Invalid(e.to_string()))
            }
        }
    }

    fn has_ratios(&self) -> bool {
        self.dpp_ratio.is_some() || self.vat_ratio.is_some()
    }
}

fn required_ratio(field: &str, raw: Option<&str>) -> ConfigResult<(i64, i64)> {
    let raw = raw.ok_or_else(|| {
        ConfigError::Invalid(format!("{} is required for the custom tax regime", field))
    })?;
    parse_ratio(raw)
        .ok_or_else(|| ConfigError::Invalid(format!("{} must look like 11/12, got '{}'", field, raw)))
}

/// Parses `"11/12"` into `(11, 12)`.
pub fn parse_ratio(raw: &str) -> Option<(i64, i64)> {
    let (num, den) = raw.split_once('/')?;
    Some((num.trim().parse().ok()?, den.trim().parse().ok()?))
}

// =============================================================================
// Numbering Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberingSettings {
    #[serde(default = "default_invoice_width")]
    pub sar_width: usize,

    #[serde(default = "default_invoice_width")]
    pub kw_width: usize,

    #[serde(default = "default_spd_width")]
    pub spd_width: usize,
}

fn default_invoice_width() -> usize {
    4
}

fn default_spd_width() -> usize {
    3
}

impl Default for NumberingSettings {
    fn default() -> Self {
        NumberingSettings {
            sar_width: default_invoice_width(),
            kw_width: default_invoice_width(),
            spd_width: default_spd_width(),
        }
    }
}

impl NumberingSettings {
    /// The scheme for `kind` at its configured width.
    pub fn scheme(&self, kind: SchemeKind) -> NumberScheme {
        let width = match kind {
            SchemeKind::Sar => self.sar_width,
            SchemeKind::Kw => self.kw_width,
            SchemeKind::Spd => self.spd_width,
        };
        NumberScheme::new(kind).with_width(width)
    }
}

// =============================================================================
// Logging Settings
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

// =============================================================================
// App Configuration
// =============================================================================

/// Complete CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub tax: TaxSettings,

    #[serde(default)]
    pub numbering: NumberingSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`--config`, else the platform config dir)
    /// 3. `NIAGA_*` environment variables
    ///
    /// An explicit `--config` path must exist; the platform default may not.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Reads and parses one TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies `NIAGA_*` overrides from `lookup`.
    ///
    /// | Variable | Setting |
    /// |---|---|
    /// | `NIAGA_DB_PATH` | `database.path` |
    /// | `NIAGA_DB_MAX_CONNECTIONS` | `database.max_connections` |
    /// | `NIAGA_ALLOCATION_ATTEMPTS` | `database.allocation_attempts` |
    /// | `NIAGA_TAX_REGIME` | `tax.regime` |
    /// | `NIAGA_DPP_RATIO` | `tax.dpp_ratio` |
    /// | `NIAGA_VAT_RATIO` | `tax.vat_ratio` |
    /// | `NIAGA_LOG` | `logging.filter` |
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("NIAGA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("NIAGA_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(m) => self.database.max_connections = m,
                Err(_) => warn!(value = %max, "Ignoring non-numeric NIAGA_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(attempts) = lookup("NIAGA_ALLOCATION_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(a) => self.database.allocation_attempts = a,
                Err(_) => warn!(value = %attempts, "Ignoring non-numeric NIAGA_ALLOCATION_ATTEMPTS"),
            }
        }

        if let Some(regime) = lookup("NIAGA_TAX_REGIME") {
            match regime.parse() {
                Ok(parsed) => {
                    debug!(regime = %regime, "Overriding tax regime from environment");
                    self.tax.regime = parsed;
                }
                Err(_) => warn!(regime = %regime, "Unknown tax regime in environment"),
            }
        }

        if let Some(ratio) = lookup("NIAGA_DPP_RATIO") {
            self.tax.dpp_ratio = Some(ratio);
        }

        if let Some(ratio) = lookup("NIAGA_VAT_RATIO") {
            self.tax.vat_ratio = Some(ratio);
        }

        if let Some(filter) = lookup("NIAGA_LOG") {
            self.logging.filter = Some(filter);
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.allocation_attempts == 0 {
            return Err(ConfigError::Invalid(
                "database.allocation_attempts must be greater than 0".into(),
            ));
        }

        for (field, width) in [
            ("numbering.sar_width", self.numbering.sar_width),
            ("numbering.kw_width", self.numbering.kw_width),
            ("numbering.spd_width", self.numbering.spd_width),
        ] {
            if !(1..=9).contains(&width) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 1 and 9, got {}",
                    field, width
                )));
            }
        }

        self.tax.policy()?;

        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("id", "niaga", "niaga")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Ledger file: configured path, else `niaga.db` in the platform data
    /// directory, else the working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        directories::ProjectDirs::from("id", "niaga", "niaga")
            .map(|dirs| dirs.data_dir().join("niaga.db"))
            .unwrap_or_else(|| PathBuf::from("niaga.db"))
    }

    /// Pool settings for `niaga_db::Database::new`.
    pub fn db_config(&self) -> ConfigResult<DbConfig> {
        Ok(DbConfig::new(self.database_path())
            .max_connections(self.database.max_connections)
            .allocation_attempts(self.database.allocation_attempts)
            .tax_policy(self.tax.policy()?))
    }

    pub fn scheme(&self, kind: SchemeKind) -> NumberScheme {
        self.numbering.scheme(kind)
    }

    pub fn log_filter(&self) -> &str {
        self.logging.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use niaga_core::Ratio;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tax.policy().unwrap(), TaxPolicy::standard());
        assert_eq!(config.scheme(SchemeKind::Sar).format(2026, 1).unwrap(), "0001/SAR/2026");
        assert_eq!(config.scheme(SchemeKind::Spd).format(2026, 1).unwrap(), "SPD/2026/001");
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/ledger.db"

            [numbering]
            spd_width = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.database.allocation_attempts, 5);
        assert_eq!(config.numbering.sar_width, 4);
        assert_eq!(config.scheme(SchemeKind::Spd).format(2026, 7).unwrap(), "SPD/2026/00007");
    }

    #[test]
    fn test_custom_regime() {
        let config: AppConfig = toml::from_str(
            r#"
            [tax]
            regime = "custom"
            dpp_ratio = "1/1"
            vat_ratio = "10/100"
            "#,
        )
        .unwrap();

        let policy = config.tax.policy().unwrap();
        assert_eq!(policy.dpp_ratio, Ratio::one());
        assert_eq!(policy.vat_ratio, Ratio::new(10, 100));
    }

    #[test]
    fn test_custom_regime_needs_both_ratios() {
        let tax = TaxSettings {
            regime: TaxRegime::Custom,
            dpp_ratio: Some("11/12".into()),
            vat_ratio: None,
        };
        assert!(matches!(tax.policy(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_ratios_rejected_outside_custom_regime() {
        let tax = TaxSettings {
            regime: TaxRegime::Legacy,
            dpp_ratio: Some("11/12".into()),
            vat_ratio: None,
        };
        assert!(tax.policy().is_err());
    }

    #[test]
    fn test_bad_ratio_text() {
        assert_eq!(parse_ratio("11/12"), Some((11, 12)));
        assert_eq!(parse_ratio(" 12 / 100 "), Some((12, 100)));
        assert_eq!(parse_ratio("12%"), None);
        assert_eq!(parse_ratio("a/b"), None);

        let tax = TaxSettings {
            regime: TaxRegime::Custom,
            dpp_ratio: Some("11/0".into()),
            vat_ratio: Some("12/100".into()),
        };
        assert!(tax.policy().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("NIAGA_DB_PATH", "/data/niaga.db"),
            ("NIAGA_ALLOCATION_ATTEMPTS", "9"),
            ("NIAGA_DB_MAX_CONNECTIONS", "lots"),
            ("NIAGA_TAX_REGIME", "legacy"),
            ("NIAGA_LOG", "debug"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).cloned());

        assert_eq!(config.database_path(), PathBuf::from("/data/niaga.db"));
        assert_eq!(config.database.allocation_attempts, 9);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.tax.policy().unwrap(), TaxPolicy::legacy());
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.numbering.kw_width = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.allocation_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tax_regime_from_str() {
        assert_eq!("Legacy".parse::<TaxRegime>().unwrap(), TaxRegime::Legacy);
        assert!("flat".parse::<TaxRegime>().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/niaga/config.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
