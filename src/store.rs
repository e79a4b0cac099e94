use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::Serialize;
use tracing::warn;

use crate::domain::{
    DataMode, GrbName, PromptBinning, TransientCategory, TransientIdentity, TransientName,
};
use crate::error::DataError;

/// Where one transient product lives on disk. Recomputed on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageLocation {
    pub directory: Utf8PathBuf,
    pub raw_file: Utf8PathBuf,
    pub processed_file: Utf8PathBuf,
}

impl StorageLocation {
    pub fn metadata_file(&self) -> Utf8PathBuf {
        self.directory.join("metadata.csv")
    }

    pub fn raw_exists(&self) -> bool {
        self.raw_file.as_std_path().is_file()
    }

    pub fn processed_exists(&self) -> bool {
        self.processed_file.as_std_path().is_file()
    }

    /// The file that makes a download unnecessary, processed output first.
    pub fn cached_file(&self) -> Option<&Utf8Path> {
        if self.processed_exists() {
            Some(self.processed_file.as_path())
        } else if self.raw_exists() {
            Some(self.raw_file.as_path())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    local_root: Utf8PathBuf,
    default_root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, DataError> {
        let cwd = std::env::current_dir().map_err(|err| DataError::Filesystem(err.to_string()))?;
        let local_root = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| DataError::Filesystem("invalid working directory path".to_string()))?;

        let default_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.data_dir().join("transient-data")).ok()
            })
            .ok_or_else(|| {
                DataError::Filesystem("unable to resolve default data directory".to_string())
            })?;

        Ok(Self {
            local_root,
            default_root,
        })
    }

    pub fn new_with_paths(local_root: Utf8PathBuf, default_root: Utf8PathBuf) -> Self {
        Self {
            local_root,
            default_root,
        }
    }

    pub fn local_root(&self) -> &Utf8Path {
        &self.local_root
    }

    pub fn default_root(&self) -> &Utf8Path {
        &self.default_root
    }

    fn root(&self, use_default_directory: bool) -> &Utf8Path {
        if use_default_directory {
            &self.default_root
        } else {
            &self.local_root
        }
    }

    /// Maps an identity to its storage location and makes sure the directory exists.
    ///
    /// GRBs resolve to the prompt layout when `binning` is given, to the XRT-only
    /// afterglow layout when the identity names the `xrt` instrument, and to the
    /// BAT+XRT afterglow layout otherwise. Every other category resolves to the
    /// open-catalog layout, where `binning` is rejected.
    pub fn resolve(
        &self,
        identity: &TransientIdentity,
        data_mode: DataMode,
        binning: Option<&str>,
        use_default_directory: bool,
    ) -> Result<StorageLocation, DataError> {
        let binning = binning.map(str::parse::<PromptBinning>).transpose()?;
        let location = match identity.category {
            TransientCategory::Grb => {
                let grb: GrbName = identity.name.parse()?;
                match binning {
                    Some(bin) => self.prompt_location(&grb, bin, use_default_directory),
                    None => self.afterglow_location(
                        &grb,
                        data_mode,
                        identity.is_xrt_only(),
                        use_default_directory,
                    ),
                }
            }
            category => {
                if binning.is_some() {
                    return Err(DataError::InvalidConfiguration(format!(
                        "binning only applies to GRB prompt data, not {category}"
                    )));
                }
                let name: TransientName = identity.name.parse()?;
                self.transient_location(name.as_str(), category, use_default_directory)
            }
        };
        ensure_dir(&location.directory)?;
        Ok(location)
    }

    fn afterglow_location(
        &self,
        grb: &GrbName,
        data_mode: DataMode,
        xrt_only: bool,
        use_default_directory: bool,
    ) -> StorageLocation {
        let stem = grb.with_prefix();
        let directory = self
            .root(use_default_directory)
            .join("GRBData")
            .join(&stem)
            .join("afterglow")
            .join(data_mode.as_str());
        let (raw, processed) = if xrt_only {
            warn!("only XRT data requested; the tail of the prompt emission may not be captured");
            (
                format!("{stem}_xrt_rawSwiftData.csv"),
                format!("{stem}_xrt.csv"),
            )
        } else {
            warn!("BAT and XRT data requested; the data must be truncated for some models");
            (format!("{stem}_rawSwiftData.csv"), format!("{stem}.csv"))
        };
        StorageLocation {
            raw_file: directory.join(raw),
            processed_file: directory.join(processed),
            directory,
        }
    }

    fn prompt_location(
        &self,
        grb: &GrbName,
        binning: PromptBinning,
        use_default_directory: bool,
    ) -> StorageLocation {
        let directory = self
            .root(use_default_directory)
            .join("GRBData")
            .join(grb.with_prefix())
            .join("prompt");
        StorageLocation {
            raw_file: directory.join(format!("{binning}_lc_ascii.dat")),
            processed_file: directory.join(format!("{binning}_lc.csv")),
            directory,
        }
    }

    fn transient_location(
        &self,
        name: &str,
        category: TransientCategory,
        use_default_directory: bool,
    ) -> StorageLocation {
        let category_dir = if use_default_directory {
            format!("{category}Data")
        } else {
            category.to_string()
        };
        let directory = self
            .root(use_default_directory)
            .join(category_dir)
            .join(name);
        StorageLocation {
            raw_file: directory.join(format!("{name}_rawdata.csv")),
            processed_file: directory.join(format!("{name}_data.csv")),
            directory,
        }
    }

    pub fn epoch_record_path(location: &StorageLocation, name: &str) -> Utf8PathBuf {
        location.directory.join(format!("{name}_epoch.json"))
    }

    /// Writes via a sibling temp file and rename so readers never see a partial file.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), DataError> {
        let parent = path
            .parent()
            .ok_or_else(|| DataError::Filesystem(format!("invalid destination path {path}")))?;
        ensure_dir(parent)?;
        let temp = tempfile::Builder::new()
            .prefix(".tdata-write")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| DataError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), content).map_err(|err| DataError::Filesystem(err.to_string()))?;
        if path.as_std_path().exists() {
            fs::remove_file(path.as_std_path())
                .map_err(|err| DataError::Filesystem(err.to_string()))?;
        }
        temp.persist(path.as_std_path())
            .map_err(|err| DataError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn write_json<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), DataError> {
        let content = serde_json::to_vec_pretty(value)
            .map_err(|err| DataError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }
}

pub fn ensure_dir(path: &Utf8Path) -> Result<(), DataError> {
    fs::create_dir_all(path.as_std_path())
        .map_err(|err| DataError::Filesystem(format!("create {path}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(temp: &tempfile::TempDir) -> Store {
        let local = Utf8PathBuf::from_path_buf(temp.path().join("local")).unwrap();
        let default = Utf8PathBuf::from_path_buf(temp.path().join("default")).unwrap();
        Store::new_with_paths(local, default)
    }

    #[test]
    fn afterglow_layout() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(&temp);
        let grb: GrbName = "070809".parse().unwrap();
        let location = store
            .resolve(&TransientIdentity::grb(&grb), DataMode::Flux, None, false)
            .unwrap();
        assert!(location.directory.ends_with("GRBData/GRB070809/afterglow/flux"));
        assert!(location.raw_file.ends_with("GRB070809_rawSwiftData.csv"));
        assert!(location.processed_file.ends_with("GRB070809.csv"));
        assert!(location.directory.as_std_path().is_dir());
    }

    #[test]
    fn default_directory_uses_data_suffix() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(&temp);
        let identity = TransientIdentity {
            name: "AT2017gfo".to_string(),
            category: TransientCategory::Kilonova,
            instrument: None,
        };
        let location = store
            .resolve(&identity, DataMode::FluxDensity, None, true)
            .unwrap();
        assert!(location.directory.starts_with(store.default_root()));
        assert!(location.directory.ends_with("kilonovaData/AT2017gfo"));
    }

    #[test]
    fn cached_file_prefers_processed_output() {
        let temp = tempfile::tempdir().unwrap();
        let store = store(&temp);
        let grb: GrbName = "070809".parse().unwrap();
        let location = store
            .resolve(&TransientIdentity::grb(&grb), DataMode::Flux, None, false)
            .unwrap();
        assert_eq!(location.cached_file(), None);

        fs::write(location.processed_file.as_std_path(), "## header\n").unwrap();
        assert_eq!(location.cached_file(), Some(location.processed_file.as_path()));

        fs::write(location.raw_file.as_std_path(), "raw").unwrap();
        assert_eq!(location.cached_file(), Some(location.processed_file.as_path()));

        fs::remove_file(location.processed_file.as_std_path()).unwrap();
        assert_eq!(location.cached_file(), Some(location.raw_file.as_path()));
    }
}
