use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_GROQ_API_KEY_ENV, DEFAULT_GROQ_BASE_URL, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_SESSION_TTL_SECS, DEFAULT_SWEEP_INTERVAL_SECS, HTTP_REQUEST_TIMEOUT_SECS,
};

const LOCAL_CONFIG: &str = ".chatrelay/config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Completion provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Stream and consensus session lifetimes
    #[serde(default)]
    pub sessions: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Groq connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Environment variable containing the API key
    pub api_key_env: String,
    /// Whole-request timeout, streaming included
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            api_key_env: DEFAULT_GROQ_API_KEY_ENV.to_string(),
            request_timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unopened sessions older than this are discarded
    pub ttl_secs: u64,
    /// How often the sweeper runs
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

/// Load configuration from multiple sources
///
/// Precedence, lowest first: built-in defaults, the global `config.toml`,
/// `.chatrelay/config.toml` in the working directory, `CHATRELAY_*`
/// environment variables, then the file given with `--config`.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let global_config = get_config_dir()?.join("config.toml");
    let local_config = PathBuf::from(LOCAL_CONFIG);

    build_figment(&global_config, &local_config, explicit, true)
        .extract()
        .context("Failed to load configuration")
}

fn build_figment(
    global_config: &Path,
    local_config: &Path,
    explicit: Option<&Path>,
    with_env: bool,
) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if global_config.exists() {
        figment = figment.merge(Toml::file(global_config));
    }

    if local_config.exists() {
        figment = figment.merge(Toml::file(local_config));
    }

    // CHATRELAY_SERVER__PORT=8080 -> server.port
    if with_env {
        figment = figment.merge(Env::prefixed("CHATRELAY_").split("__"));
    }

    if let Some(path) = explicit {
        figment = figment.merge(Toml::file(path));
    }

    figment
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "chatrelay") {
        Ok(proj_dirs.config_dir().to_path_buf())
    } else {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        Ok(PathBuf::from(home).join(".config").join("chatrelay"))
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist.
///
/// Returns the path and whether a new file was written.
pub fn init_config(path: Option<&Path>) -> Result<(PathBuf, bool)> {
    let config_file = match path {
        Some(p) => p.to_path_buf(),
        None => get_config_dir()?.join("config.toml"),
    };

    if config_file.exists() {
        return Ok((config_file, false));
    }

    save_config(&Config::default(), &config_file)?;
    Ok((config_file, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn extract(global: &Path, local: &Path, explicit: Option<&Path>) -> Config {
        build_figment(global, local, explicit, false).extract().unwrap()
    }

    #[test]
    fn test_defaults_without_files() {
        let dir = TempDir::new().unwrap();
        let config = extract(
            &dir.path().join("missing.toml"),
            &dir.path().join("also-missing.toml"),
            None,
        );
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.provider.base_url, "https://api.groq.com/openai");
    }

    #[test]
    fn test_layer_precedence() {
        let dir = TempDir::new().unwrap();
        let global = dir.path().join("global.toml");
        let local = dir.path().join("local.toml");
        let explicit = dir.path().join("explicit.toml");

        std::fs::write(&global, "[server]\nport = 4000\nhost = \"127.0.0.1\"\n").unwrap();
        std::fs::write(&local, "[server]\nport = 5000\n").unwrap();
        std::fs::write(&explicit, "[sessions]\nttl_secs = 30\n").unwrap();

        let config = extract(&global, &local, Some(&explicit));
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.sessions.ttl_secs, 30);
        assert_eq!(config.sessions.sweep_interval_secs, DEFAULT_SWEEP_INTERVAL_SECS);
    }

    #[test]
    fn test_init_writes_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let (written, created) = init_config(Some(&path)).unwrap();
        assert!(created);
        assert_eq!(written, path);

        let (_, created_again) = init_config(Some(&path)).unwrap();
        assert!(!created_again);

        let round_trip: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(round_trip, Config::default());
    }
}
