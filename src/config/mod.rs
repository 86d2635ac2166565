use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::abi::{
    CodecConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ELEMENTS, MAX_DEPTH_LIMIT,
};
use crate::infrastructure::network::DEFAULT_API_URL;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the public API used for transaction lookups
    pub api_url: String,

    pub max_depth: usize,

    pub max_elements: usize,

    pub request_timeout_secs: u64,

    /// Short names for ABI paths or URLs, usable wherever `--abi` is
    pub abis: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_elements: DEFAULT_MAX_ELEMENTS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            abis: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Codec limits; `max_depth` never exceeds [`MAX_DEPTH_LIMIT`]
    pub fn codec_config(&self) -> CodecConfig {
        if self.max_depth > MAX_DEPTH_LIMIT {
            tracing::warn!(
                max_depth = self.max_depth,
                limit = MAX_DEPTH_LIMIT,
                "max_depth clamped"
            );
        }
        CodecConfig {
            max_depth: self.max_depth.min(MAX_DEPTH_LIMIT),
            max_elements: self.max_elements,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Alias lookup; anything unknown is taken as a path or URL
    pub fn resolve_abi<'a>(&'a self, source: &'a str) -> &'a str {
        self.abis
            .get(source)
            .map(String::as_str)
            .unwrap_or(source)
    }
}

pub fn load() -> Config {
    match config_path() {
        Some(path) => load_from(&path),
        None => Config::default(),
    }
}

/// Missing or unreadable files give the defaults
pub fn load_from(path: &Path) -> Config {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Config::default(),
    };
    match toml::from_str::<Config>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
            Config::default()
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("MXABI_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("mxabi").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("mxabi").join("config.toml"));
    }

    directories::ProjectDirs::from("com", "multiversx", "mxabi")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
