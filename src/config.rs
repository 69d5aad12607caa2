use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for ci-doctor.
///
/// Holds defaults for the GitHub connection, output and the optional
/// summarization service. Command-line flags take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub token (prefer the GITHUB_TOKEN environment variable)
    pub token: Option<String>,

    /// GitHub API base URL
    #[serde(default = "default_github_api_base")]
    pub api_base: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Successful runs sampled for the duration baseline
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    /// Enable the conditional HTTP cache
    #[serde(default)]
    pub cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Directory receiving saved log archives
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AiConfig {
    /// API key for the summarization service (prefer OPENAI_API_KEY)
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_ai_api_base")]
    pub api_base: String,

    #[serde(default = "default_ai_model")]
    pub model: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_github_api_base(),
            timeout_secs: default_timeout_secs(),
            max_samples: default_max_samples(),
            cache: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pretty,
            artifacts_dir: default_artifacts_dir(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_ai_api_base(),
            model: default_ai_model(),
        }
    }
}

fn default_github_api_base() -> String {
    crate::providers::DEFAULT_API_BASE.to_string()
}

fn default_timeout_secs() -> f64 {
    10.0
}

fn default_max_samples() -> usize {
    50
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_ai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./ci-doctor.toml, ./ci-doctor.json, ./ci-doctor.yaml, ./ci-doctor.yml
    /// 3. `<user config dir>/ci-doctor/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let mut candidates: Vec<PathBuf> = [
            "ci-doctor.toml",
            "ci-doctor.json",
            "ci-doctor.yaml",
            "ci-doctor.yml",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();

        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("ci-doctor").join("config.toml"));
        }

        for candidate in &candidates {
            if candidate.exists() {
                log::debug!("Loading config from {}", candidate.display());
                return Self::load_from_path(candidate);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}
