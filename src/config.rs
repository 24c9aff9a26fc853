use {
    log::{debug, info},
    serde::{Deserialize, Serialize},
    std::{fs, path::{Path, PathBuf}},
    yt_dlp_media::{
        DEFAULT_LOCALE, DEFAULT_SUBTITLE_FORMAT,
        utils::{file_system, find_executable},
    },
};

pub const APP_NAME: &str = "ytconvert";
const CONFIG_FILE: &str = "config.toml";

/// Where media records are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[serde(rename = "none")]
    Disabled,
    Memory,
    Sqlite,
}

/// Settings of the tool invocation, read from `config.toml`.
///
/// Missing keys take their default, so a partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub binary_path: PathBuf,
    pub interpreter_path: Option<PathBuf>,
    pub cookie_file: Option<PathBuf>,
    pub locale: String,
    pub subtitle_format: String,
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub retry_delay_ms: u64,
    pub cache: CacheBackend,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from(find_executable("yt-dlp")),
            interpreter_path: None,
            cookie_file: None,
            locale: DEFAULT_LOCALE.to_string(),
            subtitle_format: DEFAULT_SUBTITLE_FORMAT.to_string(),
            timeout_secs: 30,
            max_attempts: 5,
            retry_delay_ms: 1000,
            cache: CacheBackend::Memory,
            cache_dir: None,
        }
    }
}

impl Config {
    /// The default location, `<config dir>/ytconvert/config.toml`.
    pub fn default_path() -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        let config_dir = dirs::config_dir().ok_or("Could not find a valid config directory.")?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Loads the config from its default location.
    pub fn load() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Self::load_from(Self::default_path()?)
    }

    /// Loads the config from a file, falling back to the defaults when it is absent or empty.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let path = path.as_ref();
        if !path.is_file() || fs::metadata(path)?.len() == 0 {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = toml::from_str::<Config>(&content)
            .map_err(|e| format!("Malformed config file {}: {}", path.display(), e))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Writes the default config to `path` so it can be edited.
    ///
    /// An existing file is left alone unless `force` is set. Returns whether a file was written.
    pub fn publish(path: impl AsRef<Path>, force: bool) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let path = path.as_ref();
        if path.exists() && !force {
            info!("Config already present at {}", path.display());
            return Ok(false);
        }

        file_system::create_parent_dir(path)?;
        fs::write(path, toml::to_string_pretty(&Self::default())?)?;
        info!("Configuration saved to: {}", path.display());
        Ok(true)
    }

    /// The directory of the sqlite cache.
    pub fn resolved_cache_dir(&self) -> Result<PathBuf, Box<dyn std::error::Error + Send + Sync>> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let cache_dir = dirs::cache_dir().ok_or("Could not find a valid cache directory.")?;
                Ok(cache_dir.join(APP_NAME))
            }
        }
    }
}
