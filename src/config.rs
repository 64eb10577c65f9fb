use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::query::CachePolicy;
use crate::search::SearchSettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub search: SearchConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  15
}

impl ApiConfig {
  /// Parse the base URL, forcing a trailing slash so relative joins keep the path prefix.
  pub fn base_url(&self) -> Result<Url> {
    let mut raw = self.url.trim().to_string();
    if !raw.ends_with('/') {
      raw.push('/');
    }
    let url = Url::parse(&raw).map_err(|e| eyre!("Invalid api.url {}: {}", self.url, e))?;
    match url.scheme() {
      "http" | "https" => Ok(url),
      other => Err(eyre!("Unsupported api.url scheme: {}", other)),
    }
  }

  /// Host shown in the header when no title is configured.
  pub fn host(&self) -> String {
    self
      .base_url()
      .ok()
      .and_then(|u| u.host_str().map(String::from))
      .unwrap_or_else(|| self.url.clone())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
  #[serde(default = "default_debounce_ms")]
  pub debounce_ms: u64,
  /// Product rows shown in the live dropdown
  #[serde(default = "default_dropdown_limit")]
  pub dropdown_limit: u32,
  /// Products per page on the full results page
  #[serde(default = "default_page_size")]
  pub page_size: u32,
}

fn default_debounce_ms() -> u64 {
  300
}

fn default_dropdown_limit() -> u32 {
  5
}

fn default_page_size() -> u32 {
  20
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      debounce_ms: default_debounce_ms(),
      dropdown_limit: default_dropdown_limit(),
      page_size: default_page_size(),
    }
  }
}

impl SearchConfig {
  pub fn settings(&self) -> SearchSettings {
    SearchSettings {
      debounce: Duration::from_millis(self.debounce_ms),
      dropdown_limit: self.dropdown_limit.max(1),
      page_size: self.page_size.max(1),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Staleness window for read-mostly resources
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// How long an unobserved entry survives before collection
  #[serde(default = "default_gc_secs")]
  pub gc_secs: u64,
  /// Extra attempts after a failed network load
  #[serde(default = "default_retries")]
  pub retries: u32,
}

fn default_stale_secs() -> u64 {
  60
}

fn default_gc_secs() -> u64 {
  300
}

fn default_retries() -> u32 {
  1
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      gc_secs: default_gc_secs(),
      retries: default_retries(),
    }
  }
}

impl CacheConfig {
  pub fn policy(&self) -> CachePolicy {
    CachePolicy::default()
      .with_default_stale(Duration::from_secs(self.stale_secs))
      .with_gc_delay(Duration::from_secs(self.gc_secs))
      .with_retries(self.retries)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./shelf.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/shelf/config.yaml
  ///
  /// `SHELF_API_URL` overrides `api.url` afterwards.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => match Self::api_url_from_env() {
        // No file, but the environment names an API: run on defaults
        Some(url) => Self::from_url(url),
        None => {
          return Err(eyre!(
            "No configuration file found. Create one at ~/.config/shelf/config.yaml\n\
                 or set SHELF_API_URL."
          ))
        }
      },
    };

    if let Some(url) = Self::api_url_from_env() {
      config.api.url = url;
    }

    config.api.base_url()?;
    Ok(config)
  }

  fn from_url(url: String) -> Self {
    Config {
      api: ApiConfig {
        url,
        timeout_secs: default_timeout_secs(),
      },
      title: None,
      search: SearchConfig::default(),
      cache: CacheConfig::default(),
    }
  }

  fn api_url_from_env() -> Option<String> {
    std::env::var("SHELF_API_URL")
      .ok()
      .filter(|v| !v.trim().is_empty())
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("shelf.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("shelf").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }

  /// Directory for the session database and log files.
  pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("shelf"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse("api:\n  url: https://shop.example.com/api\n").unwrap();
    assert_eq!(config.search.debounce_ms, 300);
    assert_eq!(config.search.dropdown_limit, 5);
    assert_eq!(config.cache.stale_secs, 60);
    assert_eq!(config.api.timeout_secs, 15);
  }

  #[test]
  fn test_base_url_gets_trailing_slash() {
    let config = Config::parse("api:\n  url: https://shop.example.com/api\n").unwrap();
    let base = config.api.base_url().unwrap();
    assert_eq!(base.as_str(), "https://shop.example.com/api/");
    assert_eq!(
      base.join("search").unwrap().as_str(),
      "https://shop.example.com/api/search"
    );
  }

  #[test]
  fn test_rejects_non_http_scheme() {
    let config = Config::parse("api:\n  url: ftp://shop.example.com\n").unwrap();
    assert!(config.api.base_url().is_err());
  }

  #[test]
  fn test_cache_overrides_reach_policy() {
    let yaml = "api:\n  url: http://localhost:4000\ncache:\n  stale_secs: 10\n  retries: 0\n";
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.cache.gc_secs, 300);
    let policy = config.cache.policy();
    assert_eq!(policy.retries(), 0);
    assert_eq!(policy.gc_delay(), Duration::from_secs(300));
  }

  #[test]
  fn test_search_overrides() {
    let yaml = "api:\n  url: http://localhost:4000\nsearch:\n  debounce_ms: 150\n  page_size: 0\n";
    let config = Config::parse(yaml).unwrap();
    let settings = config.search.settings();
    assert_eq!(settings.debounce, Duration::from_millis(150));
    // zero is clamped so the results page never asks for empty pages
    assert_eq!(settings.page_size, 1);
    assert_eq!(config.api.host(), "localhost");
  }
}
