use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config as cfg;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::CompositionPolicy;

/// Where the JSON corpus lives, relative to `root`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DataConfig {
    #[serde(default = "DataConfig::default_root")]
    pub root: PathBuf,
    #[serde(default = "DataConfig::default_zhengsu_dir")]
    pub zhengsu_dir: String,
    #[serde(default = "DataConfig::default_zhengxing_dir")]
    pub zhengxing_dir: String,
    #[serde(default = "DataConfig::default_evolution_graph")]
    pub evolution_graph: String,
    #[serde(default = "DataConfig::default_comparison_pairs")]
    pub comparison_pairs: String,
    /// Explicit element files; the directory is listed when empty.
    #[serde(default)]
    pub zhengsu_files: Vec<String>,
    /// Explicit pattern files; the directory is listed when empty.
    #[serde(default)]
    pub zhengxing_files: Vec<String>,
}

impl DataConfig {
    fn default_root() -> PathBuf {
        PathBuf::from("data")
    }

    fn default_zhengsu_dir() -> String {
        "zhengsu".to_string()
    }

    fn default_zhengxing_dir() -> String {
        "zhengxing".to_string()
    }

    fn default_evolution_graph() -> String {
        "indexes/evolution_graph.json".to_string()
    }

    fn default_comparison_pairs() -> String {
        "indexes/comparison_pairs.json".to_string()
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
            zhengsu_dir: Self::default_zhengsu_dir(),
            zhengxing_dir: Self::default_zhengxing_dir(),
            evolution_graph: Self::default_evolution_graph(),
            comparison_pairs: Self::default_comparison_pairs(),
            zhengsu_files: Vec::new(),
            zhengxing_files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MatchConfig {
    /// Appended to inferred pattern names.
    #[serde(default = "MatchConfig::default_pattern_suffix")]
    pub pattern_suffix: String,
    #[serde(default)]
    pub duplicate_compositions: CompositionPolicy,
}

impl MatchConfig {
    fn default_pattern_suffix() -> String {
        "證".to_string()
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            pattern_suffix: Self::default_pattern_suffix(),
            duplicate_compositions: CompositionPolicy::default(),
        }
    }
}

/// What to do with a second edge between the same ordered node pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolicy {
    /// Keep the first edge, drop the rest.
    #[default]
    Dedupe,
    /// Fail the document load.
    Reject,
    /// Keep every edge.
    AllowMulti,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GraphConfig {
    #[serde(default)]
    pub duplicate_edges: EdgePolicy,
    /// Distance between severity rings in the radial layout.
    #[serde(default = "GraphConfig::default_ring_spacing")]
    pub ring_spacing: f64,
}

impl GraphConfig {
    fn default_ring_spacing() -> f64 {
        120.0
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            duplicate_edges: EdgePolicy::default(),
            ring_spacing: Self::default_ring_spacing(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// Log format: "pretty", "compact", "json"
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }

    fn default_format() -> String {
        "pretty".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: Self::default_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    #[serde(default = "Settings::default_env")]
    pub env: String,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Self::default_env(),
            data: DataConfig::default(),
            matching: MatchConfig::default(),
            graph: GraphConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    fn default_env() -> String {
        env::var("APP_ENV")
            .ok()
            .or_else(|| env::var("RUST_ENV").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.data.zhengsu_dir.trim().is_empty(),
            "data.zhengsu_dir cannot be empty"
        );
        anyhow::ensure!(
            !self.data.zhengxing_dir.trim().is_empty(),
            "data.zhengxing_dir cannot be empty"
        );
        anyhow::ensure!(
            !self.data.evolution_graph.trim().is_empty(),
            "data.evolution_graph cannot be empty"
        );
        anyhow::ensure!(
            self.graph.ring_spacing.is_finite() && self.graph.ring_spacing > 0.0,
            "graph.ring_spacing must be > 0"
        );
        anyhow::ensure!(
            matches!(self.logging.format.as_str(), "pretty" | "compact" | "json"),
            "logging.format must be one of pretty, compact, json"
        );
        Ok(())
    }

    /// Config directory: `./config` when present, otherwise the current directory.
    pub fn default_config_dir() -> PathBuf {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let project_config = cwd.join("config");
        if project_config.exists() {
            info!("Using config directory: {:?}", project_config);
            return project_config;
        }
        info!("Using config directory: {:?}", cwd);
        cwd
    }

    /// Layered load: defaults, environment file, local overrides, then
    /// `BIANZHENG__*` environment variables.
    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Settings> {
        let settings: Settings = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("default.toml")).required(false))
            .add_source(cfg::File::from(config_dir.join("default.json")).required(false))
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.toml", env_name))).required(false),
            )
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.json", env_name))).required(false),
            )
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(cfg::Environment::with_prefix("BIANZHENG").separator("__"))
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn load(env_override: Option<String>) -> Result<Settings> {
        let env_name = env_override.unwrap_or_else(Self::default_env);
        Self::load_from_sources(&Self::default_config_dir(), &env_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.matching.pattern_suffix, "證");
        assert_eq!(settings.graph.duplicate_edges, EdgePolicy::Dedupe);
        assert_eq!(settings.data.zhengsu_dir, "zhengsu");
    }

    #[test]
    fn test_layered_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("default.toml"),
            "[graph]\nduplicate_edges = \"reject\"\nring_spacing = 80.0\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("testing.toml"),
            "[matching]\nduplicate_compositions = \"reject\"\n",
        )
        .unwrap();

        let settings = Settings::load_from_sources(tmp.path(), "testing").unwrap();
        assert_eq!(settings.graph.duplicate_edges, EdgePolicy::Reject);
        assert_eq!(settings.graph.ring_spacing, 80.0);
        assert_eq!(
            settings.matching.duplicate_compositions,
            CompositionPolicy::Reject
        );
        // untouched sections keep their defaults
        assert_eq!(settings.data.zhengxing_dir, "zhengxing");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.graph.ring_spacing = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.logging.format = "xml".to_string();
        assert!(settings.validate().is_err());
    }
}
