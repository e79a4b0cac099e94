//! Reference epoch (trigger or merger time) of a transient.

use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::AssociationTable;
use crate::domain::{TransientCategory, TransientIdentity};
use crate::error::DataError;
use crate::store::Store;

/// Time origin of a dataset in MJD, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ReferenceEpoch {
    Metadata { mjd: f64 },
    AssociatedGrb { mjd: f64, grb: String },
    /// Placeholder until an operator supplies the real epoch.
    FirstObservation { mjd: f64 },
    Operator { mjd: f64 },
    Unresolved,
}

impl ReferenceEpoch {
    pub fn mjd(&self) -> Option<f64> {
        match self {
            ReferenceEpoch::Metadata { mjd }
            | ReferenceEpoch::AssociatedGrb { mjd, .. }
            | ReferenceEpoch::FirstObservation { mjd }
            | ReferenceEpoch::Operator { mjd } => Some(*mjd),
            ReferenceEpoch::Unresolved => None,
        }
    }

    pub fn needs_fixup(&self) -> bool {
        matches!(
            self,
            ReferenceEpoch::FirstObservation { .. } | ReferenceEpoch::Unresolved
        )
    }

    /// Days since the epoch; `None` while unresolved.
    pub fn relative_time(&self, time_mjd: f64) -> Option<f64> {
        self.mjd().map(|epoch| time_mjd - epoch)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochResolution {
    pub epoch: ReferenceEpoch,
    pub needs_fixup: bool,
}

impl From<ReferenceEpoch> for EpochResolution {
    fn from(epoch: ReferenceEpoch) -> Self {
        Self {
            needs_fixup: epoch.needs_fixup(),
            epoch,
        }
    }
}

/// The open catalog's per-transient metadata row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransientMetadata {
    pub event: Option<String>,
    pub time_of_merger: Option<f64>,
    pub discover_date: Option<String>,
    pub redshift: Option<f64>,
    pub ra: Option<String>,
    pub dec: Option<String>,
    pub host: Option<String>,
}

impl TransientMetadata {
    /// Parses the first data row of a metadata CSV. Blank cells are absent values.
    pub fn from_csv(text: &str) -> Result<Self, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());
        let headers = reader
            .headers()
            .map_err(|err| DataError::Parse(format!("metadata header: {err}")))?
            .clone();
        let Some(record) = reader.records().next() else {
            return Ok(Self::default());
        };
        let record = record.map_err(|err| DataError::Parse(format!("metadata row: {err}")))?;

        let field = |name: &str| -> Option<String> {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
                .and_then(|index| record.get(index))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        // Multi-valued cells list alternatives separated by commas; the first one is preferred.
        let number = |name: &str| -> Option<f64> {
            field(name)
                .and_then(|value| value.split(',').next().map(|v| v.trim().parse::<f64>()))
                .and_then(Result::ok)
                .filter(|value| value.is_finite())
        };

        Ok(Self {
            event: field("event"),
            time_of_merger: number("timeofmerger"),
            discover_date: field("discoverdate"),
            redshift: number("redshift"),
            ra: field("ra"),
            dec: field("dec"),
            host: field("host"),
        })
    }

    /// A missing file means no metadata, not an error.
    pub fn load(path: &Utf8Path) -> Result<Option<Self>, DataError> {
        if !path.as_std_path().is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(path.as_std_path())
            .map_err(|err| DataError::Filesystem(format!("read {path}: {err}")))?;
        Self::from_csv(&text).map(Some)
    }
}

/// Picks the epoch: metadata first, then (kilonovae only) an associated GRB,
/// then the first observation. Every fallback is announced with a warning.
pub fn resolve_epoch(
    identity: &TransientIdentity,
    metadata: Option<&TransientMetadata>,
    associations: &AssociationTable,
    first_observation: Option<f64>,
) -> EpochResolution {
    if let Some(mjd) = metadata.and_then(|meta| meta.time_of_merger) {
        return ReferenceEpoch::Metadata { mjd }.into();
    }

    if identity.category == TransientCategory::Kilonova {
        warn!(transient = %identity.name, "no time of event in metadata; looking through associated GRBs");
        if let Some(associated) = associations.lookup(&identity.name) {
            info!(transient = %identity.name, grb = %associated.grb, "using trigger time of associated GRB");
            return ReferenceEpoch::AssociatedGrb {
                mjd: associated.trigger_mjd,
                grb: associated.grb.clone(),
            }
            .into();
        }
        warn!(transient = %identity.name, "no associated GRB found; the time origin is unresolved");
        warn!("please run fix_t0_of_transient before any further analysis");
        return ReferenceEpoch::Unresolved.into();
    }

    warn!(transient = %identity.name, "no time of event in metadata");
    match first_observation {
        Some(mjd) => {
            warn!("temporarily using the first data point as a start time");
            warn!("please run fix_t0_of_transient before any further analysis");
            ReferenceEpoch::FirstObservation { mjd }.into()
        }
        None => {
            warn!("no observations to fall back on; please run fix_t0_of_transient");
            ReferenceEpoch::Unresolved.into()
        }
    }
}

/// Sidecar file recording which epoch a processed table was computed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    #[serde(flatten)]
    pub epoch: ReferenceEpoch,
    pub needs_fixup: bool,
    pub recorded_at: String,
}

impl EpochRecord {
    pub fn new(epoch: ReferenceEpoch) -> Self {
        Self {
            needs_fixup: epoch.needs_fixup(),
            epoch,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn write(&self, path: &Utf8Path) -> Result<(), DataError> {
        Store::write_json(path, self)
    }

    pub fn read(path: &Utf8Path) -> Result<Option<Self>, DataError> {
        if !path.as_std_path().is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| DataError::Filesystem(format!("read {path}: {err}")))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| DataError::Parse(format!("epoch record {path}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_are_absent() {
        let meta = TransientMetadata::from_csv(
            "event,timeofmerger,discoverdate,redshift,ra,dec,host\nSN2011fe, ,2011/08/24,\"0.000804,0.0008\",14:03:05.7,+54:16:25,M101\n",
        )
        .unwrap();
        assert_eq!(meta.time_of_merger, None);
        assert_eq!(meta.redshift, Some(0.000804));
        assert_eq!(meta.host.as_deref(), Some("M101"));
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = EpochRecord::new(ReferenceEpoch::AssociatedGrb {
            mjd: 57982.5,
            grb: "170817A".to_string(),
        });
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"source\":\"associated_grb\""));
        let back: EpochRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn unresolved_has_no_relative_time() {
        assert_eq!(ReferenceEpoch::Unresolved.relative_time(58000.0), None);
        assert_eq!(
            ReferenceEpoch::Operator { mjd: 57990.0 }.relative_time(58000.0),
            Some(10.0)
        );
    }
}
