use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeaverConfig {
    pub catalog: CatalogConfig,
    pub tempo: TempoConfig,
    pub storage: StorageConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// Bearer access token for the catalog provider; obtaining and
    /// refreshing it happens outside this tool
    pub access_token: Option<String>,
    /// Base URL override, mainly for testing
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TempoConfig {
    /// BPM provider API key; lookups silently return no data without one
    pub api_key: Option<String>,
    /// Base URL override, mainly for testing
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the tempo cache file
    pub cache_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tempo lookups issued concurrently per batch
    pub enrich_batch_size: usize,
    /// Milliseconds to pause between enrichment batches
    pub enrich_pace_ms: u64,
    /// Total attempts for transient provider failures
    pub retry_attempts: u32,
    /// Milliseconds between retry attempts
    pub retry_backoff_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_file: "bpm_cache.db".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enrich_batch_size: 5,
            enrich_pace_ms: 200,
            retry_attempts: 3,
            retry_backoff_ms: 1000,
        }
    }
}

impl WeaverConfig {
    /// Candidate config file locations, most specific first: the working
    /// directory, then the XDG config directory, then dotfiles under `$HOME`
    #[must_use]
    pub fn get_default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("playlist-weaver.toml"),
            PathBuf::from("config/playlist-weaver.toml"),
        ];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("playlist-weaver").join("config.toml"));
            paths.push(
                config_dir
                    .join("playlist-weaver")
                    .join("playlist-weaver.toml"),
            );
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(
                home_dir
                    .join(".config")
                    .join("playlist-weaver")
                    .join("config.toml"),
            );
            paths.push(home_dir.join(".playlist-weaver.toml"));
        }

        paths
    }

    /// Where a freshly written config file should go
    #[must_use]
    pub fn get_preferred_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|config_dir| config_dir.join("playlist-weaver").join("config.toml"))
    }

    /// Load layered configuration. Later sources win: defaults, then the
    /// first config file found, then environment variables; CLI arguments go
    /// on top via [`merge_args`](Self::merge_args).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_file::<&str>(None)
    }

    /// Same layering, but with an explicit config file instead of the
    /// discovered one
    pub fn load_with_file<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        builder = builder.add_source(Config::try_from(&Self::default())?);

        if let Some(file_path) = config_file {
            if file_path.as_ref().exists() {
                builder = builder.add_source(File::from(file_path.as_ref()));
            }
        } else if let Some(config_path) = Self::get_default_config_paths()
            .into_iter()
            .find(|p| p.exists())
        {
            builder = builder.add_source(File::from(config_path));
        }

        // Double-underscore level separator, so two-word leaf fields stay
        // addressable: PLAYLIST_WEAVER_CATALOG__ACCESS_TOKEN,
        // PLAYLIST_WEAVER_STORAGE__CACHE_FILE, ...
        builder = builder.add_source(
            Environment::with_prefix("PLAYLIST_WEAVER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Full load as driven from the CLI: an explicit `--config` path wins
    /// over discovery, then arguments override everything
    pub fn load_from_args(args: &crate::Args) -> Result<Self, ConfigError> {
        let config = if let Some(config_path) = &args.config {
            Self::load_with_file(Some(config_path))?
        } else {
            Self::load()?
        };

        Ok(config.merge_args(args))
    }

    /// Overlay the set CLI arguments; unset ones leave the loaded values
    /// alone
    #[must_use]
    pub fn merge_args(mut self, args: &crate::Args) -> Self {
        if let Some(token) = &args.access_token {
            self.catalog.access_token = Some(token.clone());
        }
        if let Some(api_key) = &args.bpm_api_key {
            self.tempo.api_key = Some(api_key.clone());
        }
        if let Some(cache_file) = &args.cache_file {
            self.storage.cache_file = cache_file.clone();
        }
        if let Some(batch_size) = args.enrich_batch_size {
            self.engine.enrich_batch_size = batch_size;
        }
        if let Some(pace_ms) = args.enrich_pace_ms {
            self.engine.enrich_pace_ms = pace_ms;
        }
        self
    }

    /// Catalog base URL with fallback to the provider default
    #[must_use]
    pub fn catalog_base_url(&self) -> &str {
        self.catalog
            .base_url
            .as_deref()
            .unwrap_or("https://api.spotify.com/v1")
    }

    /// Tempo provider base URL with fallback to the provider default
    #[must_use]
    pub fn tempo_base_url(&self) -> &str {
        self.tempo
            .base_url
            .as_deref()
            .unwrap_or("https://api.getsongbpm.com")
    }
}
