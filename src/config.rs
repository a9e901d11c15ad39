use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::models::{Category, GENERATION_TOP_K_MAX, QUERY_TOP_K_MAX};

/// Main configuration structure for the DMI client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub setup: SetupDefaults,
    #[serde(default)]
    pub query: QueryDefaults,
    #[serde(default)]
    pub generation: GenerationDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the RAG service, e.g. `http://localhost:5000`
    pub base_url: String,
    /// Whole-request timeout. Model loading on `/setup` can be slow.
    pub timeout_seconds: u64,
}

/// Values pre-filled into the setup form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupDefaults {
    pub chat_model: String,
    pub embed_model: String,
    #[serde(default)]
    pub source_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDefaults {
    pub default_top_k: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationDefaults {
    pub default_top_k: u32,
    pub default_category: Category,
}

impl Default for SetupDefaults {
    fn default() -> Self {
        Self {
            chat_model: "llama3.1:8b".to_string(),
            embed_model: "mxbai-embed-large".to_string(),
            source_path: String::new(),
        }
    }
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self { default_top_k: 5 }
    }
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            default_top_k: 1,
            default_category: Category::Npc,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: "http://localhost:5000".to_string(),
                timeout_seconds: 120,
            },
            setup: SetupDefaults::default(),
            query: QueryDefaults::default(),
            generation: GenerationDefaults::default(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::debug!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("DMI_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = Self::from_file(Path::new(&config_path));

        config.apply_env_overrides();

        // Validate configuration - log warnings but don't fail
        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    /// Read a YAML config file, falling back to defaults on any problem.
    pub fn from_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("Config file not found at {} - using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Backend overrides
        if let Some(url) = lookup("DMI_BASE_URL") {
            self.backend.base_url = url;
        }
        if let Some(timeout) = lookup("DMI_TIMEOUT_SECONDS") {
            match timeout.parse() {
                Ok(secs) => self.backend.timeout_seconds = secs,
                Err(_) => tracing::warn!("Ignoring invalid DMI_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        // Setup form overrides
        if let Some(model) = lookup("DMI_CHAT_MODEL") {
            self.setup.chat_model = model;
        }
        if let Some(model) = lookup("DMI_EMBED_MODEL") {
            self.setup.embed_model = model;
        }
        if let Some(path) = lookup("DMI_SOURCE_PATH") {
            self.setup.source_path = path;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.backend.base_url.trim().is_empty() {
            return Err("backend.base_url cannot be empty".into());
        }
        if self.backend.timeout_seconds == 0 {
            return Err("backend.timeout_seconds cannot be 0".into());
        }
        if !(1..=QUERY_TOP_K_MAX).contains(&self.query.default_top_k) {
            return Err(format!(
                "query.default_top_k must be between 1 and {QUERY_TOP_K_MAX}"
            )
            .into());
        }
        if !(1..=GENERATION_TOP_K_MAX).contains(&self.generation.default_top_k) {
            return Err(format!(
                "generation.default_top_k must be between 1 and {GENERATION_TOP_K_MAX}"
            )
            .into());
        }
        Ok(())
    }
}

impl BackendConfig {
    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
