//! Configuration loading, validation, and management for Chatty.
//!
//! Loads configuration from `~/.chatty/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use chatty_core::strategy::{InjectionPosition, InjectionStrategy, StrategyKind, StrategyParameters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.chatty/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where memories, hooks and rituals live
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Memory injection settings
    #[serde(default)]
    pub injection: InjectionConfig,

    /// Continuity event reporting
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Which ledger implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackend {
    /// JSON-lines file on disk
    #[default]
    File,
    /// Process memory only
    Memory,
    /// Store nothing
    None,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,

    /// Override of the default `~/.chatty/ledger.jsonl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl LedgerConfig {
    /// The ledger file path, honoring the override.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(p) => PathBuf::from(p),
            None => AppConfig::config_dir().join("ledger.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionConfig {
    /// Strategy used when a caller does not name one
    #[serde(default = "default_strategy")]
    pub default_strategy: String,

    /// Token budget used when a caller does not give one
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Per-strategy overrides and additional named strategies
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub strategies: BTreeMap<String, StrategyOverride>,
}

fn default_strategy() -> String {
    "hybrid".into()
}
fn default_max_tokens() -> u32 {
    2048
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            default_strategy: default_strategy(),
            default_max_tokens: default_max_tokens(),
            strategies: BTreeMap::new(),
        }
    }
}

impl InjectionConfig {
    /// Build the full strategy list: the five built-ins with any overrides
    /// applied, followed by every additional named strategy.
    pub fn strategies(&self) -> Result<Vec<InjectionStrategy>, ConfigError> {
        let mut out: Vec<InjectionStrategy> = StrategyKind::all()
            .into_iter()
            .map(InjectionStrategy::builtin)
            .collect();

        for (name, ov) in &self.strategies {
            if let Some(existing) = out.iter_mut().find(|s| &s.name == name) {
                if let Some(kind) = ov.kind {
                    existing.kind = kind;
                }
                existing.parameters = ov.apply(&existing.parameters);
                continue;
            }
            let kind = ov.kind.ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "strategy '{name}' is not built in and needs a `kind`"
                ))
            })?;
            let base = InjectionStrategy::builtin(kind);
            out.push(InjectionStrategy {
                name: name.clone(),
                kind,
                parameters: ov.apply(&base.parameters),
            });
        }
        Ok(out)
    }
}

/// Partial strategy definition. Unset fields inherit from the built-in
/// strategy of the same name, or of `kind` for new names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StrategyKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance_threshold: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memories_per_injection: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_reservation: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection_position: Option<InjectionPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_boost: Option<f32>,
}

impl StrategyOverride {
    pub fn apply(&self, base: &StrategyParameters) -> StrategyParameters {
        StrategyParameters {
            relevance_threshold: self.relevance_threshold.unwrap_or(base.relevance_threshold),
            importance_threshold: self
                .importance_threshold
                .unwrap_or(base.importance_threshold),
            max_memories_per_injection: self
                .max_memories_per_injection
                .unwrap_or(base.max_memories_per_injection),
            token_reservation: self.token_reservation.unwrap_or(base.token_reservation),
            injection_position: self.injection_position.unwrap_or(base.injection_position),
            semantic_boost: self.semantic_boost.unwrap_or(base.semantic_boost),
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let fractions = [
            ("relevance_threshold", self.relevance_threshold),
            ("importance_threshold", self.importance_threshold),
            ("token_reservation", self.token_reservation),
            ("semantic_boost", self.semantic_boost),
        ];
        for (field, value) in fractions {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(ConfigError::ValidationError(format!(
                        "strategies.{name}.{field} must be between 0.0 and 1.0 (got {v})"
                    )));
                }
            }
        }
        if self.max_memories_per_injection == Some(0) {
            return Err(ConfigError::ValidationError(format!(
                "strategies.{name}.max_memories_per_injection must be > 0"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Whether continuity events are emitted
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Capacity of the in-process event bus
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_true() -> bool {
    true
}
fn default_event_buffer() -> usize {
    256
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            event_buffer: default_event_buffer(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.chatty/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `CHATTY_LEDGER_PATH`: ledger file location
    /// - `CHATTY_STRATEGY`: default injection strategy
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(path) = std::env::var("CHATTY_LEDGER_PATH") {
            config.ledger.path = Some(path);
        }

        if let Ok(strategy) = std::env::var("CHATTY_STRATEGY") {
            config.injection.default_strategy = strategy;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatty")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.injection.default_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "injection.default_max_tokens must be > 0".into(),
            ));
        }

        if self.telemetry.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "telemetry.event_buffer must be > 0".into(),
            ));
        }

        for (name, ov) in &self.injection.strategies {
            ov.validate(name)?;
        }

        // An unknown default_strategy is not an error: lookups fall back to hybrid
        self.injection.strategies()?;

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for chatty_core::Error {
    fn from(e: ConfigError) -> Self {
        chatty_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.injection.default_strategy, "hybrid");
        assert_eq!(config.ledger.backend, LedgerBackend::File);
        assert!(config.telemetry.enabled);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.injection.default_strategy, config.injection.default_strategy);
        assert_eq!(parsed.injection.default_max_tokens, 2048);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.injection.default_strategy, "hybrid");
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("hybrid"));
        assert!(toml_str.contains("2048"));
    }

    #[test]
    fn builtin_override_changes_only_given_fields() {
        let toml_str = r#"
[injection.strategies.relevance_based]
token_reservation = 0.5
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        let strategies = config.injection.strategies().unwrap();
        let relevance = strategies
            .iter()
            .find(|s| s.name == "relevance_based")
            .unwrap();
        assert_eq!(relevance.parameters.token_reservation, 0.5);
        assert_eq!(relevance.parameters.relevance_threshold, 0.6);
        assert_eq!(relevance.parameters.max_memories_per_injection, 10);
        assert_eq!(strategies.len(), 5);
    }

    #[test]
    fn custom_strategy_inherits_from_kind() {
        let toml_str = r#"
[injection]
default_strategy = "deep_recall"

[injection.strategies.deep_recall]
kind = "contextual"
max_memories_per_injection = 30
injection_position = "append"
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        let strategies = config.injection.strategies().unwrap();
        let deep = strategies.iter().find(|s| s.name == "deep_recall").unwrap();
        assert_eq!(deep.kind, StrategyKind::Contextual);
        assert_eq!(deep.parameters.max_memories_per_injection, 30);
        assert_eq!(deep.parameters.relevance_threshold, 0.7);
        assert_eq!(deep.parameters.injection_position, InjectionPosition::Append);
    }

    #[test]
    fn custom_strategy_without_kind_rejected() {
        let mut config = AppConfig::default();
        config
            .injection
            .strategies
            .insert("mystery".into(), StrategyOverride::default());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn reservation_out_of_range_rejected() {
        let mut config = AppConfig::default();
        config.injection.strategies.insert(
            "hybrid".into(),
            StrategyOverride {
                token_reservation: Some(1.5),
                ..Default::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("token_reservation"));
    }

    #[test]
    fn unknown_default_strategy_loads() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[injection]\ndefault_strategy = \"telepathy\"").unwrap();
        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.injection.default_strategy, "telepathy");
    }

    #[test]
    fn load_from_file_validates() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "[injection]\ndefault_max_tokens = 0").unwrap();
        let err = AppConfig::load_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn ledger_path_override() {
        let config = LedgerConfig {
            backend: LedgerBackend::File,
            path: Some("/var/lib/chatty/ledger.jsonl".into()),
        };
        assert_eq!(
            config.resolved_path(),
            PathBuf::from("/var/lib/chatty/ledger.jsonl")
        );
    }
}
