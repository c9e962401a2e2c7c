/// `load_config` module: reads the static YAML config and injects the platform credentials
/// from the environment.
///
/// The YAML file never holds secrets. `GDC_USERNAME` and `GDC_PASSWORD` are read from the
/// process environment (a `.env` file is loaded by `main` through `dotenvy`).
///
/// ```yaml
/// platform:
///   server: https://secure.gooddata.com
///   upload_host: secure-di.gooddata.com
/// project: abcd1234
/// load:
///   dataset: dataset.sales
///   data: ./sales.csv
///   incremental: false
///   has_header: true
/// csv:
///   delimiter: ","
///   quote: never
/// ```
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sli_load_core::config::PlatformConfig;
use sli_load_core::contract::Credentials;
use sli_load_core::encode::{CsvEncoder, QuoteStyle};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const ENV_USERNAME: &str = "GDC_USERNAME";
pub const ENV_PASSWORD: &str = "GDC_PASSWORD";

#[derive(Debug)]
pub struct CliConfig {
    pub platform: PlatformConfig,
    pub project: Option<String>,
    pub load: Option<LoadSection>,
    pub csv: CsvSection,
    pub credentials: Credentials,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoadSection {
    pub dataset: String,
    pub data: PathBuf,
    #[serde(default)]
    pub incremental: bool,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CsvSection {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub quote: QuoteStyle,
}

impl Default for CsvSection {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            quote: QuoteStyle::default(),
        }
    }
}

impl CsvSection {
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| format!("CSV delimiter {:?} is not a single ASCII character", self.delimiter))
    }

    pub fn encoder(&self) -> Result<CsvEncoder> {
        Ok(CsvEncoder::new(self.delimiter_byte()?, self.quote))
    }
}

impl CliConfig {
    pub fn require_project(&self) -> Result<&str> {
        self.project
            .as_deref()
            .context("config has no `project`; this command needs a working project")
    }

    pub fn require_load(&self) -> Result<&LoadSection> {
        self.load
            .as_ref()
            .context("config has no `load` section")
    }
}

fn default_has_header() -> bool {
    true
}

fn default_delimiter() -> char {
    ','
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    platform: PlatformConfig,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    load: Option<LoadSection>,
    #[serde(default)]
    csv: CsvSection,
}

/// Loads the YAML config at `path` and the credentials from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let raw: RawConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;
    raw.csv.delimiter_byte()?;
    raw.platform.trace_loaded();

    let credentials = credentials_from_env()?;
    info!(
        config_path = ?path_ref,
        project = ?raw.project,
        dataset = ?raw.load.as_ref().map(|l| &l.dataset),
        "Config loaded"
    );

    Ok(CliConfig {
        platform: raw.platform,
        project: raw.project,
        load: raw.load,
        csv: raw.csv,
        credentials,
    })
}

/// Platform login from `GDC_USERNAME` / `GDC_PASSWORD`. Both must be set and non-empty.
pub fn credentials_from_env() -> Result<Credentials> {
    let read = |name: &str| -> Result<String> {
        match env::var(name) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => {
                error!(variable = name, "Credential missing in environment");
                bail!("{name} must be set in the environment")
            }
        }
    };
    Ok(Credentials {
        username: read(ENV_USERNAME)?,
        secret: read(ENV_PASSWORD)?,
    })
}
