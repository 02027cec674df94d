use crate::error::{Error, Result};
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Configuration for the classification engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum number of frames the reflective-call tracer reconstructs
    #[serde(default = "default_max_trace_depth")]
    pub max_trace_depth: usize,

    /// Packages treated as the reflection library for tracing purposes
    #[serde(default = "default_reflection_packages")]
    pub reflection_packages: Vec<String>,

    /// Emit SKIP entries for generated files instead of classifying them
    #[serde(default = "default_skip_generated_files")]
    pub skip_generated_files: bool,

    /// Name suffix of generated builder types
    #[serde(default = "default_builder_suffix")]
    pub builder_suffix: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_trace_depth: default_max_trace_depth(),
            reflection_packages: default_reflection_packages(),
            skip_generated_files: default_skip_generated_files(),
            builder_suffix: default_builder_suffix(),
        }
    }
}

impl AnalysisConfig {
    /// True when `package` belongs to the reflection library
    pub fn is_reflection_package(&self, package: &str) -> bool {
        self.reflection_packages.iter().any(|p| p == package)
    }
}

/// Configuration for the entry sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Sink type: "jsonl", "stdout" or "memory"
    #[serde(default = "default_sink_provider")]
    pub provider: String,

    /// Output path for file-backed sinks
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            provider: default_sink_provider(),
            path: None,
        }
    }
}

/// Main configuration structure for the protoscan system
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Analysis configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Loads configuration from a TOML file with environment variable
    /// overrides
    ///
    /// Environment variables are prefixed with `PROTOSCAN_` and use double
    /// underscores for nested values. For example:
    /// - `PROTOSCAN_ANALYSIS__MAX_TRACE_DEPTH=64`
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading configuration");
        let mut builder = ConfigBuilder::builder();

        // Add the config file if it exists
        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        // Add environment variables with PROTOSCAN_ prefix
        builder = builder.add_source(
            Environment::with_prefix("PROTOSCAN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        let valid_providers = ["jsonl", "stdout", "memory"];
        if !valid_providers.contains(&self.output.provider.as_str()) {
            return Err(Error::config(format!(
                "Invalid sink provider '{}'. Must be one of: {valid_providers:?}",
                self.output.provider
            )));
        }

        if self.output.provider == "jsonl" && self.output.path.is_none() {
            return Err(Error::config(
                "Sink provider 'jsonl' requires output.path".to_string(),
            ));
        }

        if self.analysis.max_trace_depth == 0 {
            return Err(Error::config(
                "analysis.max_trace_depth must be at least 1".to_string(),
            ));
        }

        if self.analysis.reflection_packages.is_empty() {
            return Err(Error::config(
                "analysis.reflection_packages must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_max_trace_depth() -> usize {
    32
}

fn default_reflection_packages() -> Vec<String> {
    vec![
        "reflect".to_string(),
        "google.golang.org/protobuf/proto".to_string(),
        "google.golang.org/protobuf/reflect/protoreflect".to_string(),
        "google.golang.org/protobuf/encoding/prototext".to_string(),
        "google.golang.org/protobuf/encoding/protojson".to_string(),
    ]
}

fn default_skip_generated_files() -> bool {
    true
}

fn default_builder_suffix() -> String {
    "_builder".to_string()
}

fn default_sink_provider() -> String {
    "stdout".to_string()
}
