use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::app::DEFAULT_SESSION_WAIT;
use crate::domain::{DataMode, GrbName, PromptBinning, TransientCategory, TransientName};
use crate::error::DataError;
use crate::webdriver::WebDriverSettings;

pub const DEFAULT_CONFIG_FILE: &str = "tdata.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub use_default_directory: Option<bool>,
    #[serde(default)]
    pub webdriver: Option<WebDriverSettings>,
    #[serde(default)]
    pub session_wait_secs: Option<u64>,
    /// Directory holding full `LGRB_table.txt`/`SGRB_table.txt` trigger tables.
    #[serde(default)]
    pub tables_dir: Option<String>,
    #[serde(default)]
    pub afterglows: Vec<AfterglowEntry>,
    #[serde(default)]
    pub xrt: Vec<GrbEntry>,
    #[serde(default)]
    pub prompt: Vec<PromptEntry>,
    #[serde(default)]
    pub transients: Vec<TransientEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum AfterglowEntry {
    Shorthand(String),
    Detailed(AfterglowEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AfterglowEntryObject {
    pub grb: String,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GrbEntry {
    Shorthand(String),
    Detailed { grb: String },
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PromptEntry {
    Shorthand(String),
    Detailed(PromptEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PromptEntryObject {
    pub grb: String,
    #[serde(default)]
    pub bin: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TransientEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AfterglowRequest {
    pub grb: GrbName,
    pub mode: DataMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub grb: GrbName,
    pub binning: PromptBinning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransientRequest {
    pub name: TransientName,
    pub category: TransientCategory,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub use_default_directory: bool,
    pub webdriver: WebDriverSettings,
    pub session_wait: Duration,
    pub tables_dir: Option<Utf8PathBuf>,
    pub afterglows: Vec<AfterglowRequest>,
    pub xrt: Vec<GrbName>,
    pub prompt: Vec<PromptRequest>,
    pub transients: Vec<TransientRequest>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, DataError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(DataError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| DataError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| DataError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    /// Validates every entry up front so a bad name or enum value fails before any fetch.
    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, DataError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(DataError::InvalidConfiguration(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let afterglows = config
            .afterglows
            .into_iter()
            .map(|entry| match entry {
                AfterglowEntry::Shorthand(value) => Ok(AfterglowRequest {
                    grb: value.parse()?,
                    mode: DataMode::Flux,
                }),
                AfterglowEntry::Detailed(obj) => Ok(AfterglowRequest {
                    grb: obj.grb.parse()?,
                    mode: obj
                        .mode
                        .as_deref()
                        .map(str::parse::<DataMode>)
                        .transpose()?
                        .unwrap_or(DataMode::Flux),
                }),
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        let xrt = config
            .xrt
            .into_iter()
            .map(|entry| match entry {
                GrbEntry::Shorthand(grb) | GrbEntry::Detailed { grb } => grb.parse(),
            })
            .collect::<Result<Vec<GrbName>, DataError>>()?;

        let prompt = config
            .prompt
            .into_iter()
            .map(|entry| match entry {
                PromptEntry::Shorthand(value) => Ok(PromptRequest {
                    grb: value.parse()?,
                    binning: PromptBinning::default(),
                }),
                PromptEntry::Detailed(obj) => Ok(PromptRequest {
                    grb: obj.grb.parse()?,
                    binning: obj
                        .bin
                        .as_deref()
                        .map(str::parse::<PromptBinning>)
                        .transpose()?
                        .unwrap_or_default(),
                }),
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        let transients = config
            .transients
            .into_iter()
            .map(|entry| {
                Ok(TransientRequest {
                    name: entry.name.parse()?,
                    category: entry.category.parse()?,
                })
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        Ok(ResolvedConfig {
            schema_version,
            use_default_directory: config.use_default_directory.unwrap_or(false),
            webdriver: config.webdriver.unwrap_or_default(),
            session_wait: config
                .session_wait_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SESSION_WAIT),
            tables_dir: config.tables_dir.map(Utf8PathBuf::from),
            afterglows,
            xrt,
            prompt,
            transients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_config_shorthand() {
        let config: Config = serde_json::from_str(
            r#"{ "afterglows": ["070809"], "prompt": ["GRB050509B"], "xrt": [{"grb": "050509b"}] }"#,
        )
        .unwrap();

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.afterglows[0].mode, DataMode::Flux);
        assert_eq!(resolved.prompt[0].binning, PromptBinning::Ms2);
        assert_eq!(resolved.xrt[0].as_str(), "050509B");
        assert_eq!(resolved.session_wait, DEFAULT_SESSION_WAIT);
        assert!(!resolved.use_default_directory);
        assert_eq!(resolved.tables_dir, None);
    }
}
