use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::fetcher::{ChromeDriver, FetchConfig, WaitUntil};

pub use ::config::ConfigError;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_FILE: &str = "posting_scraper";
pub const ENV_PREFIX: &str = "POSTING";

/// Runtime settings: defaults, then an optional TOML file, then `POSTING_*` env vars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub nav_timeout_ms: u64,
    pub settle_ms: u64,
    pub wait_until: WaitUntil,
    pub headless: bool,
    pub sandbox: bool,
    pub chrome_path: Option<PathBuf>,
    pub raw_text_limit: usize,
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            nav_timeout_ms: 30_000,
            settle_ms: 2_500,
            wait_until: WaitUntil::DomContentLoaded,
            headless: true,
            sandbox: true,
            chrome_path: None,
            raw_text_limit: 15_000,
            concurrency: 4,
        }
    }
}

impl Settings {
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            nav_timeout: Duration::from_millis(self.nav_timeout_ms),
            settle_delay: Duration::from_millis(self.settle_ms),
            wait_until: self.wait_until,
        }
    }

    pub fn chrome_driver(&self) -> ChromeDriver {
        ChromeDriver {
            headless: self.headless,
            sandbox: self.sandbox,
            chrome_path: self.chrome_path.clone(),
            ..Default::default()
        }
    }
}

// ── Tests ──
