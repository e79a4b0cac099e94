use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DataError;

static GRB_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}[A-Z]?$").expect("static GRB name pattern"));

/// What the caller wants out of the afterglow pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DataMode {
    Flux,
    #[value(name = "flux_density")]
    FluxDensity,
    Luminosity,
}

impl DataMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataMode::Flux => "flux",
            DataMode::FluxDensity => "flux_density",
            DataMode::Luminosity => "luminosity",
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DataMode {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "flux" => Ok(DataMode::Flux),
            "flux_density" => Ok(DataMode::FluxDensity),
            "luminosity" => Ok(DataMode::Luminosity),
            other => Err(DataError::InvalidConfiguration(format!(
                "unknown data mode {other:?}; use one of flux, flux_density, luminosity"
            ))),
        }
    }
}

/// BAT prompt light-curve bin sizes published by the Swift BAT catalogue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum PromptBinning {
    #[serde(rename = "1s")]
    #[value(name = "1s")]
    Sec1,
    #[default]
    #[serde(rename = "2ms")]
    #[value(name = "2ms")]
    Ms2,
    #[serde(rename = "8ms")]
    #[value(name = "8ms")]
    Ms8,
    #[serde(rename = "16ms")]
    #[value(name = "16ms")]
    Ms16,
    #[serde(rename = "64ms")]
    #[value(name = "64ms")]
    Ms64,
    #[serde(rename = "256ms")]
    #[value(name = "256ms")]
    Ms256,
}

impl PromptBinning {
    pub const ALL: [PromptBinning; 6] = [
        PromptBinning::Sec1,
        PromptBinning::Ms2,
        PromptBinning::Ms8,
        PromptBinning::Ms16,
        PromptBinning::Ms64,
        PromptBinning::Ms256,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptBinning::Sec1 => "1s",
            PromptBinning::Ms2 => "2ms",
            PromptBinning::Ms8 => "8ms",
            PromptBinning::Ms16 => "16ms",
            PromptBinning::Ms64 => "64ms",
            PromptBinning::Ms256 => "256ms",
        }
    }
}

impl fmt::Display for PromptBinning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PromptBinning {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        PromptBinning::ALL
            .into_iter()
            .find(|bin| bin.as_str() == trimmed)
            .ok_or_else(|| {
                let allowed = PromptBinning::ALL.map(|bin| bin.as_str()).join(", ");
                DataError::InvalidConfiguration(format!(
                    "bin size {trimmed:?} not in allowed bin sizes; use one of: {allowed}"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransientCategory {
    Grb,
    Kilonova,
    Supernova,
    #[value(name = "tidal_disruption_event", alias = "tde")]
    TidalDisruptionEvent,
}

impl TransientCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransientCategory::Grb => "grb",
            TransientCategory::Kilonova => "kilonova",
            TransientCategory::Supernova => "supernova",
            TransientCategory::TidalDisruptionEvent => "tidal_disruption_event",
        }
    }

    /// Only these categories are served by the open transient catalog.
    pub fn has_open_catalog_data(&self) -> bool {
        !matches!(self, TransientCategory::Grb)
    }
}

impl fmt::Display for TransientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransientCategory {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "grb" => Ok(TransientCategory::Grb),
            "kilonova" => Ok(TransientCategory::Kilonova),
            "supernova" => Ok(TransientCategory::Supernova),
            "tidal_disruption_event" | "tde" => Ok(TransientCategory::TidalDisruptionEvent),
            other => Err(DataError::InvalidConfiguration(format!(
                "unknown transient type {other:?}"
            ))),
        }
    }
}

/// GRB designation without the `GRB` prefix, e.g. `050509B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrbName(String);

impl GrbName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn with_prefix(&self) -> String {
        format!("GRB{}", self.0)
    }
}

impl fmt::Display for GrbName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GrbName {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let upper = value.trim().to_uppercase();
        let normalized = upper.strip_prefix("GRB").unwrap_or(&upper).trim();
        if !GRB_NAME.is_match(normalized) {
            return Err(DataError::InvalidConfiguration(format!(
                "invalid GRB name: {value}"
            )));
        }
        Ok(Self(normalized.to_string()))
    }
}

/// Catalog name of a non-GRB transient, e.g. `AT2017gfo`. Used verbatim in paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransientName(String);

impl TransientName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransientName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransientName {
    type Err = DataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && !trimmed.contains("..")
            && !trimmed.chars().any(|ch| matches!(ch, '/' | '\\') || ch.is_control());
        if !is_valid {
            return Err(DataError::InvalidConfiguration(format!(
                "invalid transient name: {value:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransientIdentity {
    pub name: String,
    pub category: TransientCategory,
    pub instrument: Option<String>,
}

impl TransientIdentity {
    pub fn grb(name: &GrbName) -> Self {
        Self {
            name: name.as_str().to_string(),
            category: TransientCategory::Grb,
            instrument: None,
        }
    }

    pub fn grb_instrument(name: &GrbName, instrument: &str) -> Self {
        Self {
            name: name.as_str().to_string(),
            category: TransientCategory::Grb,
            instrument: Some(instrument.to_string()),
        }
    }

    pub fn transient(name: &TransientName, category: TransientCategory) -> Self {
        Self {
            name: name.as_str().to_string(),
            category,
            instrument: None,
        }
    }

    pub fn is_xrt_only(&self) -> bool {
        self.instrument
            .as_deref()
            .map(|value| value.eq_ignore_ascii_case("xrt"))
            .unwrap_or(false)
    }
}
