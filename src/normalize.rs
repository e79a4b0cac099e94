//! Open-catalog photometry to the canonical processed table, plus CSV I/O for
//! every processed table the pipelines write.

use std::fs;

use camino::Utf8Path;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::epoch::ReferenceEpoch;
use crate::error::DataError;
use crate::parse::{CurvePoint, PromptRow};
use crate::store::Store;
use crate::units;

/// Bands without a standard magnitude zero-point (clear/unfiltered).
pub const EXCLUDED_BANDS: [&str; 2] = ["C", "W"];

pub const AB_SYSTEM: &str = "AB";

/// A processed table row with a fixed CSV header.
pub trait TableRow: Serialize + DeserializeOwned {
    const HEADER: &'static [&'static str];
}

impl TableRow for CurvePoint {
    const HEADER: &'static [&'static str] =
        &["time", "timepos", "timeneg", "flux", "fluxpos", "fluxneg"];
}

impl TableRow for PromptRow {
    const HEADER: &'static [&'static str] = &[
        "Time [s]",
        "flux_15_25 [counts/s/det]",
        "flux_15_25_err [counts/s/det]",
        "flux_25_50 [counts/s/det]",
        "flux_25_50_err [counts/s/det]",
        "flux_50_100 [counts/s/det]",
        "flux_50_100_err [counts/s/det]",
        "flux_100_350 [counts/s/det]",
        "flux_100_350_err [counts/s/det]",
        "flux_15_350 [counts/s/det]",
        "flux_15_350_err [counts/s/det]",
    ];
}

/// One photometry row as served by the open catalog. Cells that do not parse are `None`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogRow {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub time: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub magnitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub e_magnitude: Option<f64>,
    #[serde(default)]
    pub band: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
}

/// Reads raw catalog photometry; rows that cannot be decoded at all are skipped.
pub fn parse_catalog_rows(text: &str) -> Result<Vec<CatalogRow>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    reader
        .headers()
        .map_err(|err| DataError::Parse(format!("photometry header: {err}")))?;
    Ok(reader
        .deserialize::<CatalogRow>()
        .filter_map(|row| match row {
            Ok(row) => Some(row),
            Err(err) => {
                debug!(error = %err, "skipping photometry row");
                None
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    /// MJD.
    pub time: f64,
    pub magnitude: f64,
    pub e_magnitude: f64,
    pub band: String,
    pub system: String,
    #[serde(rename = "flux_density (mJy)")]
    pub flux_density: f64,
    #[serde(rename = "flux_density_error (mJy)")]
    pub flux_density_error: f64,
    #[serde(rename = "relative_time (days)")]
    pub relative_time: Option<f64>,
}

impl TableRow for ObservationRow {
    const HEADER: &'static [&'static str] = &[
        "time",
        "magnitude",
        "e_magnitude",
        "band",
        "system",
        "flux_density (mJy)",
        "flux_density_error (mJy)",
        "relative_time (days)",
    ];
}

/// AB-system rows outside the excluded bands, converted to flux density.
/// Relative times are left unset.
pub fn select_ab_photometry(raw_rows: &[CatalogRow]) -> Vec<ObservationRow> {
    raw_rows
        .iter()
        .filter(|row| row.system.as_deref() == Some(AB_SYSTEM))
        .filter(|row| {
            row.band
                .as_deref()
                .is_some_and(|band| !EXCLUDED_BANDS.contains(&band))
        })
        .filter_map(|row| {
            let (time, magnitude, e_magnitude) = (row.time?, row.magnitude?, row.e_magnitude?);
            Some(ObservationRow {
                time,
                magnitude,
                e_magnitude,
                band: row.band.clone()?,
                system: AB_SYSTEM.to_string(),
                flux_density: units::flux_density_from_ab_mag(magnitude),
                flux_density_error: units::flux_density_error_from_mag(
                    magnitude,
                    e_magnitude,
                    units::AB_ZERO_POINT_JY,
                ),
                relative_time: None,
            })
        })
        .collect()
}

/// Observations plus the epoch their relative times were computed against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub rows: Vec<ObservationRow>,
    pub epoch: ReferenceEpoch,
}

impl Dataset {
    pub fn new(rows: Vec<ObservationRow>, epoch: ReferenceEpoch) -> Self {
        Self {
            rows,
            epoch: ReferenceEpoch::Unresolved,
        }
        .with_epoch(epoch)
    }

    /// Replaces the epoch and regenerates every relative time from it.
    pub fn with_epoch(mut self, epoch: ReferenceEpoch) -> Self {
        for row in &mut self.rows {
            row.relative_time = epoch.relative_time(row.time);
        }
        self.epoch = epoch;
        self
    }

    pub fn first_observation(&self) -> Option<f64> {
        self.rows.first().map(|row| row.time)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn normalize(raw_rows: &[CatalogRow], epoch: ReferenceEpoch) -> Dataset {
    let dataset = Dataset::new(select_ab_photometry(raw_rows), epoch);
    info!(rows = dataset.len(), "keeping only AB magnitude data");
    dataset
}

/// Writes `rows` under `T::HEADER`. An empty table still gets its header.
pub fn write_table<T: TableRow>(path: &Utf8Path, rows: &[T]) -> Result<(), DataError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(T::HEADER)
        .map_err(|err| DataError::Filesystem(format!("encode {path}: {err}")))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| DataError::Filesystem(format!("encode {path}: {err}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| DataError::Filesystem(format!("encode {path}: {err}")))?;
    Store::write_bytes_atomic(path, &bytes)
}

pub fn read_table<T: TableRow>(path: &Utf8Path) -> Result<Vec<T>, DataError> {
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| DataError::Filesystem(format!("read {path}: {err}")))?;
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    reader
        .deserialize::<T>()
        .enumerate()
        .map(|(index, row)| {
            row.map_err(|err| DataError::Parse(format!("{path} row {}: {err}", index + 1)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTOMETRY: &str = "\
event,time,magnitude,e_magnitude,band,system
AT2017gfo,57983.0,17.5,0.1,i,AB
AT2017gfo,57983.1,17.9,0.2,C,AB
AT2017gfo,57983.2,18.1,0.1,V,Vega
AT2017gfo,57984.0,18.4,0.15,W,AB
AT2017gfo,57985.0,19.0,0.2,r,AB
";

    #[test]
    fn keeps_ab_rows_outside_excluded_bands() {
        let rows = parse_catalog_rows(PHOTOMETRY).unwrap();
        let dataset = normalize(&rows, ReferenceEpoch::Metadata { mjd: 57982.5 });
        let bands: Vec<&str> = dataset.rows.iter().map(|row| row.band.as_str()).collect();
        assert_eq!(bands, vec!["i", "r"]);
        assert_eq!(dataset.rows[1].relative_time, Some(2.5));
    }

    #[test]
    fn epoch_change_regenerates_relative_times() {
        let rows = parse_catalog_rows(PHOTOMETRY).unwrap();
        let dataset = normalize(&rows, ReferenceEpoch::Unresolved);
        assert!(dataset.rows.iter().all(|row| row.relative_time.is_none()));

        let fixed = dataset.with_epoch(ReferenceEpoch::Operator { mjd: 57983.0 });
        assert_eq!(fixed.rows[0].relative_time, Some(0.0));
        assert_eq!(fixed.rows[1].relative_time, Some(2.0));
    }

    #[test]
    fn unparseable_cells_drop_the_row() {
        let rows = parse_catalog_rows("time,magnitude,e_magnitude,band,system\n57983.0,,0.1,i,AB\n")
            .unwrap();
        assert!(select_ab_photometry(&rows).is_empty());
    }

    #[test]
    fn empty_table_keeps_header() {
        let temp = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(temp.path().join("xrt.csv")).unwrap();
        write_table::<CurvePoint>(&path, &[]).unwrap();
        assert_eq!(
            fs::read_to_string(path.as_std_path()).unwrap(),
            "time,timepos,timeneg,flux,fluxpos,fluxneg\n"
        );
        assert!(read_table::<CurvePoint>(&path).unwrap().is_empty());
    }
}
