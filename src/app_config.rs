//! Application configuration loading and CLI override merging.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use harvester_core::fetch::{
    CONNECT_TIMEOUT_SECS, DEFAULT_ERROR_PAGE_MARKER, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY,
    HttpSettings, READ_TIMEOUT_SECS, RetryPolicy,
};
use harvester_core::service::{
    DEFAULT_FEED_URL, DEFAULT_ORDER_BY, DEFAULT_ORIGIN, DEFAULT_RESULTS_PER_PAGE, QuerySpec,
    ServiceConfig, default_queries,
};
use serde::Deserialize;

const APP_DIR: &str = "hansard-harvester";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_DATA_DIR: &str = "data";

/// TOML-backed file configuration; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Root of the crawl state and document store.
    pub data_dir: Option<PathBuf>,
    /// RSS search feed endpoint.
    pub feed_url: Option<String>,
    /// Origin for resolving relative landing-page links.
    pub origin: Option<String>,
    /// `orderBy` feed argument.
    pub order_by: Option<String>,
    /// `resCount` feed argument (1..=500).
    pub results_per_page: Option<u32>,
    /// Body substring that marks an error page served with HTTP 200.
    pub error_page_marker: Option<String>,
    /// Connect timeout in seconds (1..=3600).
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout in seconds (1..=3600).
    pub read_timeout_secs: Option<u64>,
    /// Attempts per request including the first (1..=10).
    pub max_attempts: Option<u32>,
    /// Delay between attempts in milliseconds (0..=60000).
    pub retry_delay_ms: Option<u64>,
    /// Query name to expression; replaces the built-in set when present.
    pub queries: Option<BTreeMap<String, String>>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(count) = self.results_per_page
            && !(1..=500).contains(&count)
        {
            bail!("Invalid config value for `results_per_page`: {count}. Expected range: 1..=500");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        if let Some(attempts) = self.max_attempts
            && !(1..=10).contains(&attempts)
        {
            bail!("Invalid config value for `max_attempts`: {attempts}. Expected range: 1..=10");
        }
        if let Some(delay) = self.retry_delay_ms
            && delay > 60_000
        {
            bail!("Invalid config value for `retry_delay_ms`: {delay}. Expected range: 0..=60000");
        }
        if let Some(marker) = &self.error_page_marker
            && marker.is_empty()
        {
            bail!("Invalid config value for `error_page_marker`: must not be empty");
        }
        if let Some(queries) = &self.queries {
            if queries.is_empty() {
                bail!("Invalid config value for `queries`: at least one query is required");
            }
            if let Some((name, _)) = queries.iter().find(|(name, _)| name.trim().is_empty()) {
                bail!("Invalid config value for `queries`: empty query name '{name}'");
            }
        }
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/hansard-harvester/config.toml`
/// 2. `$HOME/.config/hansard-harvester/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join(CONFIG_FILE));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILE),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist. The default path is optional and an absent
/// file yields the defaults.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Effective settings after merging defaults, the config file, and CLI flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub service: ServiceConfig,
    pub http: HttpSettings,
    pub queries: BTreeMap<String, String>,
}

impl Settings {
    /// Merges `file` over the defaults, then applies the CLI data directory.
    pub fn resolve(file: FileConfig, cli_data_dir: Option<PathBuf>) -> Self {
        let service = ServiceConfig {
            feed_url: file.feed_url.unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            origin: file.origin.unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            order_by: file.order_by.unwrap_or_else(|| DEFAULT_ORDER_BY.to_string()),
            results_per_page: file.results_per_page.unwrap_or(DEFAULT_RESULTS_PER_PAGE),
        };
        let retry_delay = file
            .retry_delay_ms
            .map_or(DEFAULT_RETRY_DELAY, Duration::from_millis);
        let http = HttpSettings {
            connect_timeout_secs: file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
            read_timeout_secs: file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
            retry_policy: RetryPolicy::new(
                file.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
                retry_delay,
            ),
            error_page_marker: file
                .error_page_marker
                .unwrap_or_else(|| DEFAULT_ERROR_PAGE_MARKER.to_string()),
        };
        let data_dir = cli_data_dir
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Self {
            data_dir,
            service,
            http,
            queries: file.queries.unwrap_or_else(default_queries),
        }
    }

    /// Looks up `names` in the configured queries; all queries when `names` is empty.
    ///
    /// Fails on the first unknown name.
    pub fn select_queries(&self, names: &[String]) -> Result<Vec<QuerySpec>> {
        if names.is_empty() {
            return Ok(self
                .queries
                .iter()
                .map(|(name, expression)| QuerySpec::new(name, expression))
                .collect());
        }
        names
            .iter()
            .map(|name| match self.queries.get(name) {
                Some(expression) => Ok(QuerySpec::new(name, expression)),
                None => {
                    let known: Vec<&str> = self.queries.keys().map(String::as_str).collect();
                    bail!("Unknown query '{name}'. Known queries: {}", known.join(", "))
                }
            })
            .collect()
    }
}
