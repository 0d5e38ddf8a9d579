//! Runtime configuration.
//!
//! Settings come from, in increasing order of precedence:
//! - the legacy `CALENDAR_URL` variable (source URL only)
//! - an optional TOML file (`$CALSIEVE_CONFIG`, default `./calsieve.toml`)
//! - `CALSIEVE_*` environment variables, e.g. `CALSIEVE_SOURCE_URL`

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File, Map};
use serde::Deserialize;
use url::Url;

use crate::error::{SieveError, SieveResult};
use crate::filter::{CalendarMeta, DEFAULT_PRODID};

pub const ENV_PREFIX: &str = "CALSIEVE";
pub const CONFIG_PATH_VAR: &str = "CALSIEVE_CONFIG";
pub const LEGACY_URL_VAR: &str = "CALENDAR_URL";

static DEFAULT_CONFIG_FILE: &str = "calsieve.toml";

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_prodid() -> String {
    DEFAULT_PRODID.to_string()
}

fn default_calendar_file() -> String {
    "calendar.ics".to_string()
}

fn default_status_page_file() -> String {
    "index.html".to_string()
}

/// Settings as read from the file and environment, before validation.
#[derive(Debug, Deserialize)]
struct RawConfig {
    source_url: Option<String>,

    #[serde(default = "default_output_dir")]
    output_dir: PathBuf,

    calendar_name: Option<String>,

    #[serde(default = "default_prodid")]
    prodid: String,

    #[serde(default = "default_calendar_file")]
    calendar_file: String,

    #[serde(default = "default_status_page_file")]
    status_page_file: String,

    public_url: Option<String>,

    request_timeout: Option<String>,
}

/// Validated configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct SieveConfig {
    /// Feed to fetch (`webcal://` already rewritten to `https://`)
    pub source_url: Url,
    /// Directory receiving the calendar file and the status page
    pub output_dir: PathBuf,
    /// Display name written as X-WR-CALNAME and used as the page title
    pub calendar_name: Option<String>,
    pub prodid: String,
    pub calendar_file: String,
    pub status_page_file: String,
    /// Public base URL of `output_dir`, used for subscription links
    pub public_url: Option<Url>,
    /// Overrides the HTTP client's default timeout
    pub request_timeout: Option<Duration>,
}

impl SieveConfig {
    /// Load configuration from the process environment.
    pub fn load() -> SieveResult<Self> {
        let vars: Map<String, String> = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self::from_vars(vars)
    }

    /// Load configuration from an explicit set of environment variables.
    pub fn from_vars(vars: Map<String, String>) -> SieveResult<Self> {
        let config_path = vars
            .get(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut builder = Config::builder();
        if let Some(url) = vars.get(LEGACY_URL_VAR) {
            builder = builder
                .set_default("source_url", url.as_str())
                .map_err(|e| SieveError::Config(e.to_string()))?;
        }

        let raw: RawConfig = builder
            .add_source(File::from(config_path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
            .build()
            .map_err(|e| SieveError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| SieveError::Config(e.to_string()))?;

        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> SieveResult<Self> {
        let source_url = raw
            .source_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SieveError::Config(format!(
                    "No source URL configured. Set {}_SOURCE_URL or {}",
                    ENV_PREFIX, LEGACY_URL_VAR
                ))
            })?;
        let source_url = parse_feed_url(source_url)?;

        check_file_name("calendar_file", &raw.calendar_file)?;
        check_file_name("status_page_file", &raw.status_page_file)?;
        if raw.calendar_file == raw.status_page_file {
            return Err(SieveError::Config(format!(
                "calendar_file and status_page_file are both '{}'",
                raw.calendar_file
            )));
        }

        let public_url = match raw.public_url.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(
                Url::parse(s)
                    .map_err(|e| SieveError::Config(format!("Invalid public_url '{}': {}", s, e)))?,
            ),
            _ => None,
        };

        let request_timeout = match raw.request_timeout.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(humantime::parse_duration(s).map_err(|e| {
                SieveError::Config(format!("Invalid request_timeout '{}': {}", s, e))
            })?),
            _ => None,
        };

        Ok(SieveConfig {
            source_url,
            output_dir: raw.output_dir,
            calendar_name: raw.calendar_name.filter(|n| !n.trim().is_empty()),
            prodid: raw.prodid,
            calendar_file: raw.calendar_file,
            status_page_file: raw.status_page_file,
            public_url,
            request_timeout,
        })
    }

    pub fn calendar_meta(&self) -> CalendarMeta {
        CalendarMeta {
            prodid: self.prodid.clone(),
            name: self.calendar_name.clone(),
        }
    }
}

/// Parse a feed URL, accepting `webcal://` as an alias for `https://`.
fn parse_feed_url(raw: &str) -> SieveResult<Url> {
    let invalid = |reason: String| SieveError::Config(format!("Invalid source URL '{}': {}", raw, reason));

    let normalized = match raw.get(..9) {
        Some(scheme) if scheme.eq_ignore_ascii_case("webcal://") => format!("https://{}", &raw[9..]),
        _ => raw.to_string(),
    };

    let url = Url::parse(&normalized).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

fn check_file_name(key: &str, name: &str) -> SieveResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(SieveError::Config(format!(
            "{} must be a plain file name, got '{}'",
            key, name
        )));
    }
    Ok(())
}
