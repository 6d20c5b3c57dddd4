use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    /// `config.toml`, then `config.<env>.toml`, then `APP_*` variables (`__` nests).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, env_name })
    }

    pub fn env_name(&self) -> &str { &self.env_name }

    /// Extract and validate the typed settings tree.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
    pub query: QuerySettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub root_dir: String,
    pub extension: String,
}

impl Default for DataSettings {
    fn default() -> Self { Self { root_dir: "./texts".to_string(), extension: "txt".to_string() } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// `host:port`, optionally with a `redis://` scheme.
    pub address: String,
    pub key_prefix: String,
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_string(),
            key_prefix: "embedding:".to_string(),
            connect_timeout_ms: 5_000,
            io_timeout_ms: 10_000,
        }
    }
}

impl StoreSettings {
    pub fn connect_timeout(&self) -> Duration { Duration::from_millis(self.connect_timeout_ms) }

    pub fn io_timeout(&self) -> Duration { Duration::from_millis(self.io_timeout_ms) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub timeout_ms: u64,
    /// Use the deterministic hashing embedder instead of loading a model.
    pub fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self { Self { model_dir: None, max_len: 256, timeout_ms: 120_000, fake: false, fake_dim: 384 } }
}

impl EmbeddingSettings {
    /// `None` when `timeout_ms` is 0 (no deadline).
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub text: String,
    pub limit: Option<usize>,
}

impl Default for QuerySettings {
    fn default() -> Self { Self { text: "console.log()".to_string(), limit: None } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self { Self { level: "info".to_string() } }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.store.address.trim().is_empty() {
            return Err(Error::InvalidConfig("store.address must not be empty".into()));
        }
        if self.store.key_prefix.is_empty() {
            return Err(Error::InvalidConfig("store.key_prefix must not be empty".into()));
        }
        if self.embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.max_len must be positive".into()));
        }
        if self.embedding.fake_dim == 0 {
            return Err(Error::InvalidConfig("embedding.fake_dim must be positive".into()));
        }
        if self.data.extension.trim_start_matches('.').is_empty() {
            return Err(Error::InvalidConfig("data.extension must not be empty".into()));
        }
        Ok(())
    }

    pub fn root_dir(&self) -> PathBuf { expand_path(&self.data.root_dir) }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().expect("defaults validate");
        assert_eq!(settings.store.key_prefix, "embedding:");
        assert_eq!(settings.query.text, "console.log()");
        assert_eq!(settings.embedding.timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn files_and_env_layer_over_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env("RUST_ENV", "test");
            jail.create_file("config.toml", "[store]\naddress = \"10.0.0.5:6379\"\n[query]\nlimit = 3\n")?;
            jail.create_file("config.test.toml", "[embedding]\nfake = true\n")?;
            jail.set_env("APP_STORE__KEY_PREFIX", "doc:");

            let config = Config::load().expect("load");
            let settings = config.settings().expect("settings");
            assert_eq!(config.env_name(), "test");
            assert_eq!(settings.store.address, "10.0.0.5:6379");
            assert_eq!(settings.store.key_prefix, "doc:");
            assert_eq!(settings.query.limit, Some(3));
            assert!(settings.embedding.fake);
            assert_eq!(settings.embedding.max_len, 256);
            Ok(())
        });
    }

    #[test]
    fn zero_timeout_disables_deadline_and_empty_prefix_is_rejected() {
        let mut settings = Settings::default();
        settings.embedding.timeout_ms = 0;
        assert_eq!(settings.embedding.timeout(), None);
        settings.store.key_prefix.clear();
        assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));
    }
}
