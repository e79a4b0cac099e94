use std::fs;
use std::time::Duration;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{AssociationTable, GrbCatalog};
use crate::config::ResolvedConfig;
use crate::domain::{
    DataMode, GrbName, PromptBinning, TransientCategory, TransientIdentity, TransientName,
};
use crate::epoch::{EpochRecord, ReferenceEpoch, TransientMetadata, resolve_epoch};
use crate::error::DataError;
use crate::normalize::{self, Dataset, ObservationRow};
use crate::parse::{self, CurvePoint, PromptRow, SectionedFlux};
use crate::remote::{RemoteSource, ensure_available, fetch_via_direct_url};
use crate::session::{BrowserLauncher, fetch_via_session};
use crate::store::{StorageLocation, Store};
use crate::swift;

/// Body text of open-catalog responses for unknown transients.
pub const CATALOG_MISSING_MARKER: &str = "not found";

pub const DEFAULT_SESSION_WAIT: Duration = Duration::from_secs(20);

pub fn photometry_url(name: &TransientName) -> String {
    format!(
        "https://api.astrocats.space/{name}/photometry/time+magnitude+e_magnitude+band+system?e_magnitude&band&time&format=csv&complete"
    )
}

pub fn metadata_url(name: &TransientName) -> String {
    format!(
        "https://api.astrocats.space/{name}/timeofmerger+discoverdate+redshift+ra+dec+host?format=CSV"
    )
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub use_default_directory: bool,
    /// Fixed pause while the remote generates a download.
    pub session_wait: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            use_default_directory: false,
            session_wait: DEFAULT_SESSION_WAIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AfterglowData {
    Flux(SectionedFlux),
    FluxDensity(Vec<CurvePoint>),
}

#[derive(Debug, Clone, Serialize)]
pub struct AfterglowResult {
    pub grb: GrbName,
    pub mode: DataMode,
    pub location: StorageLocation,
    /// `None` when the raw file could not be sorted; the failure has been logged.
    pub data: Option<AfterglowData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct XrtResult {
    pub grb: GrbName,
    pub location: StorageLocation,
    pub points: Vec<CurvePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptResult {
    pub grb: GrbName,
    pub binning: PromptBinning,
    pub location: StorageLocation,
    pub rows: Vec<PromptRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogResult {
    pub name: String,
    pub category: TransientCategory,
    pub location: StorageLocation,
    pub needs_fixup: bool,
    pub dataset: Dataset,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    pub afterglows: Vec<AfterglowResult>,
    pub xrt: Vec<XrtResult>,
    pub prompt: Vec<PromptResult>,
    pub transients: Vec<CatalogResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerResult {
    pub grb: GrbName,
    pub trigger: String,
}

pub struct App<R: RemoteSource, B: BrowserLauncher> {
    store: Store,
    remote: R,
    browser: B,
    catalog: GrbCatalog,
    associations: AssociationTable,
    options: PipelineOptions,
}

impl<R: RemoteSource, B: BrowserLauncher> App<R, B> {
    pub fn new(store: Store, remote: R, browser: B, options: PipelineOptions) -> Self {
        Self {
            store,
            remote,
            browser,
            catalog: GrbCatalog::bundled(),
            associations: AssociationTable::bundled(),
            options,
        }
    }

    pub fn with_tables(mut self, catalog: GrbCatalog, associations: AssociationTable) -> Self {
        self.catalog = catalog;
        self.associations = associations;
        self
    }

    /// Replaces the bundled tables with `LGRB_table.txt`, `SGRB_table.txt` and,
    /// when present, `kilonova_grb_table.txt` from `dir`.
    pub fn with_tables_dir(self, dir: &Utf8Path) -> Result<Self, DataError> {
        let catalog = GrbCatalog::from_dir(dir)?;
        let associations = AssociationTable::from_dir(dir)?;
        info!(%dir, grbs = catalog.len(), "trigger tables loaded");
        Ok(self.with_tables(catalog, associations))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn trigger_number(&self, grb: &GrbName) -> TriggerResult {
        TriggerResult {
            grb: grb.clone(),
            trigger: self.catalog.trigger_number(grb),
        }
    }

    /// Runs every request of a batch file, in file order. The first error stops the batch.
    pub fn sync(&self, config: &ResolvedConfig) -> Result<SyncResult, DataError> {
        let mut result = SyncResult::default();
        for request in &config.afterglows {
            result
                .afterglows
                .push(self.get_afterglow_data_from_swift(&request.grb, request.mode)?);
        }
        for grb in &config.xrt {
            result.xrt.push(self.get_xrt_data_from_swift(grb)?);
        }
        for request in &config.prompt {
            result
                .prompt
                .push(self.get_prompt_data_from_swift(&request.grb, request.binning)?);
        }
        for request in &config.transients {
            result.transients.push(
                self.get_open_transient_catalog_data(&request.name, request.category)?,
            );
        }
        Ok(result)
    }

    /// BAT+XRT integrated flux or XRT flux density from the burst analyser.
    pub fn get_afterglow_data_from_swift(
        &self,
        grb: &GrbName,
        mode: DataMode,
    ) -> Result<AfterglowResult, DataError> {
        if mode == DataMode::Luminosity {
            return Err(DataError::InvalidConfiguration(
                "Swift afterglow data is available as flux or flux_density only".to_string(),
            ));
        }
        let identity = TransientIdentity::grb(grb);
        let location = self.resolve(&identity, mode, None)?;

        if self.should_fetch(&location) {
            let trigger = self.catalog.trigger_number(grb);
            let page_url = swift::burst_analyser_url(&trigger);
            let page = self.remote.get_text(&page_url)?;
            ensure_available(&page, swift::NO_LIGHT_CURVE_MARKER, &page_url)?;
            let script = match mode {
                DataMode::FluxDensity => {
                    swift::flux_density_script(&trigger, self.options.session_wait)
                }
                _ => swift::integrated_flux_script(&trigger, self.options.session_wait),
            };
            fetch_via_session(&self.browser, &self.remote, &script, &location.raw_file);
        }

        let data = if location.processed_exists() {
            warn!(path = %location.processed_file, "processed data already exists");
            Some(load_afterglow(mode, &location.processed_file)?)
        } else {
            require_raw(&location)?;
            info!(grb = %grb, "processing afterglow data");
            match mode {
                DataMode::FluxDensity => {
                    let points = process_curve(&location)?;
                    Some(AfterglowData::FluxDensity(points))
                }
                _ => parse::sort_integrated_flux_data(&location.raw_file, &location.processed_file)
                    .map(AfterglowData::Flux),
            }
        };

        Ok(AfterglowResult {
            grb: grb.clone(),
            mode,
            location,
            data,
        })
    }

    /// XRT-only flux light curve, fetched directly without a browser session.
    pub fn get_xrt_data_from_swift(&self, grb: &GrbName) -> Result<XrtResult, DataError> {
        let identity = TransientIdentity::grb_instrument(grb, "xrt");
        let location = self.resolve(&identity, DataMode::Flux, None)?;

        if self.should_fetch(&location) {
            let trigger = self.catalog.trigger_number(grb);
            let url = swift::xrt_flux_curve_url(&trigger);
            fetch_via_direct_url(
                &self.remote,
                &url,
                swift::NO_LIGHT_CURVE_MARKER,
                &location.raw_file,
            )?;
            info!(%url, path = %location.raw_file, "raw data downloaded");
        }

        let points = if location.processed_exists() {
            warn!(path = %location.processed_file, "processed data already exists");
            normalize::read_table(&location.processed_file)?
        } else {
            require_raw(&location)?;
            process_curve(&location)?
        };

        Ok(XrtResult {
            grb: grb.clone(),
            location,
            points,
        })
    }

    /// BAT prompt count rates at the requested bin size.
    pub fn get_prompt_data_from_swift(
        &self,
        grb: &GrbName,
        binning: PromptBinning,
    ) -> Result<PromptResult, DataError> {
        let identity = TransientIdentity::grb(grb);
        let location = self.resolve(&identity, DataMode::Flux, Some(binning.as_str()))?;

        if self.should_fetch(&location) {
            let script = swift::prompt_script(grb, binning, self.options.session_wait);
            fetch_via_session(&self.browser, &self.remote, &script, &location.raw_file);
        }

        let rows = if location.processed_exists() {
            warn!(path = %location.processed_file, "processed data already exists");
            normalize::read_table(&location.processed_file)?
        } else {
            require_raw(&location)?;
            let text = read_raw(&location.raw_file)?;
            let rows = parse::parse_prompt_curve(&text)?;
            normalize::write_table(&location.processed_file, &rows)?;
            info!(path = %location.processed_file, "processed data file written");
            rows
        };

        Ok(PromptResult {
            grb: grb.clone(),
            binning,
            location,
            rows,
        })
    }

    /// Photometry of a kilonova, supernova or TDE from the open transient catalog.
    pub fn get_open_transient_catalog_data(
        &self,
        name: &TransientName,
        category: TransientCategory,
    ) -> Result<CatalogResult, DataError> {
        if !category.has_open_catalog_data() {
            return Err(DataError::RemoteResourceUnavailable(format!(
                "the open transient catalog has no {category} data"
            )));
        }
        let identity = TransientIdentity::transient(name, category);
        let location = self.resolve(&identity, DataMode::FluxDensity, None)?;
        let record_path = Store::epoch_record_path(&location, name.as_str());

        if self.should_fetch(&location) {
            let url = photometry_url(name);
            fetch_via_direct_url(&self.remote, &url, CATALOG_MISSING_MARKER, &location.raw_file)?;
            info!(transient = %name, path = %location.raw_file, "photometry downloaded");
        }
        // Fetched on its own so a failed metadata request is retried on the next run.
        let metadata_file = location.metadata_file();
        if !location.processed_exists() && !metadata_file.as_std_path().is_file() {
            self.remote.download(&metadata_url(name), &metadata_file)?;
            info!(transient = %name, path = %metadata_file, "metadata downloaded");
        }

        let (dataset, needs_fixup) = if location.processed_exists() {
            warn!(path = %location.processed_file, "processed data already exists");
            load_dataset(&location.processed_file, &record_path)?
        } else {
            require_raw(&location)?;
            info!(transient = %name, "processing data");
            let raw_rows = normalize::parse_catalog_rows(&read_raw(&location.raw_file)?)?;
            let dataset = normalize::normalize(&raw_rows, ReferenceEpoch::Unresolved);
            let metadata = TransientMetadata::load(&metadata_file)?;
            let resolution = resolve_epoch(
                &identity,
                metadata.as_ref(),
                &self.associations,
                dataset.first_observation(),
            );
            let dataset = dataset.with_epoch(resolution.epoch);
            persist_dataset(&location.processed_file, &record_path, &dataset)?;
            info!(path = %location.processed_file, "processed data file written");
            (dataset, resolution.needs_fixup)
        };

        Ok(CatalogResult {
            name: name.as_str().to_string(),
            category,
            location,
            needs_fixup,
            dataset,
        })
    }

    /// Rewrites the relative times of a processed catalog table against `mjd`.
    /// Running it again with the same epoch leaves the table unchanged.
    pub fn fix_t0_of_transient(
        &self,
        name: &TransientName,
        category: TransientCategory,
        mjd: f64,
    ) -> Result<CatalogResult, DataError> {
        if !mjd.is_finite() {
            return Err(DataError::InvalidConfiguration(format!(
                "epoch must be a finite MJD, got {mjd}"
            )));
        }
        let identity = TransientIdentity::transient(name, category);
        let location = self.resolve(&identity, DataMode::FluxDensity, None)?;
        if !location.processed_exists() {
            return Err(DataError::ProcessedDataMissing(
                location.processed_file.clone().into_std_path_buf(),
            ));
        }
        let rows: Vec<ObservationRow> = normalize::read_table(&location.processed_file)?;
        let dataset = Dataset::new(rows, ReferenceEpoch::Operator { mjd });
        let record_path = Store::epoch_record_path(&location, name.as_str());
        persist_dataset(&location.processed_file, &record_path, &dataset)?;
        info!(path = %location.processed_file, mjd, "changed input time");

        Ok(CatalogResult {
            name: name.as_str().to_string(),
            category,
            location,
            needs_fixup: false,
            dataset,
        })
    }

    fn resolve(
        &self,
        identity: &TransientIdentity,
        mode: DataMode,
        binning: Option<&str>,
    ) -> Result<StorageLocation, DataError> {
        self.store
            .resolve(identity, mode, binning, self.options.use_default_directory)
    }

    fn should_fetch(&self, location: &StorageLocation) -> bool {
        match location.cached_file() {
            Some(path) => {
                warn!(%path, "data already exists, skipping download");
                false
            }
            None => true,
        }
    }
}

fn require_raw(location: &StorageLocation) -> Result<(), DataError> {
    if location.raw_exists() {
        return Ok(());
    }
    warn!(path = %location.raw_file, "the raw data does not exist");
    Err(DataError::RawDataMissing(
        location.raw_file.clone().into_std_path_buf(),
    ))
}

fn read_raw(path: &Utf8Path) -> Result<String, DataError> {
    fs::read_to_string(path.as_std_path())
        .map_err(|err| DataError::Filesystem(format!("read {path}: {err}")))
}

fn process_curve(location: &StorageLocation) -> Result<Vec<CurvePoint>, DataError> {
    let points = parse::parse_xrt_curve(&read_raw(&location.raw_file)?)?;
    normalize::write_table(&location.processed_file, &points)?;
    info!(path = %location.processed_file, rows = points.len(), "processed data file written");
    Ok(points)
}

fn load_afterglow(mode: DataMode, processed: &Utf8Path) -> Result<AfterglowData, DataError> {
    Ok(match mode {
        DataMode::FluxDensity => AfterglowData::FluxDensity(normalize::read_table(processed)?),
        _ => AfterglowData::Flux(SectionedFlux::from_processed(&read_raw(processed)?)),
    })
}

fn persist_dataset(
    processed: &Utf8Path,
    record_path: &Utf8Path,
    dataset: &Dataset,
) -> Result<(), DataError> {
    normalize::write_table(processed, &dataset.rows)?;
    EpochRecord::new(dataset.epoch.clone()).write(record_path)
}

/// Cached tables are returned as stored; relative times are not recomputed.
fn load_dataset(processed: &Utf8Path, record_path: &Utf8Path) -> Result<(Dataset, bool), DataError> {
    let rows: Vec<ObservationRow> = normalize::read_table(processed)?;
    match EpochRecord::read(record_path)? {
        Some(record) => Ok((
            Dataset {
                rows,
                epoch: record.epoch,
            },
            record.needs_fixup,
        )),
        None => {
            warn!(path = %record_path, "no epoch record next to the processed data");
            warn!("please run fix_t0_of_transient before any further analysis");
            Ok((
                Dataset {
                    rows,
                    epoch: ReferenceEpoch::Unresolved,
                },
                true,
            ))
        }
    }
}
