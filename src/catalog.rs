use std::collections::HashMap;
use std::fs;

use camino::Utf8Path;
use tracing::{debug, warn};

use crate::domain::GrbName;
use crate::error::DataError;

const BUNDLED_LONG: &str = include_str!("../tables/LGRB_table.txt");
const BUNDLED_SHORT: &str = include_str!("../tables/SGRB_table.txt");
const BUNDLED_KILONOVA: &str = include_str!("../tables/kilonova_grb_table.txt");

const LONG_FILE: &str = "LGRB_table.txt";
const SHORT_FILE: &str = "SGRB_table.txt";
const KILONOVA_FILE: &str = "kilonova_grb_table.txt";

/// Trigger returned for bursts missing from the tables.
pub const UNKNOWN_TRIGGER: &str = "0";

/// Swift trigger numbers keyed by GRB name, long and short bursts combined.
#[derive(Debug, Clone, Default)]
pub struct GrbCatalog {
    triggers: HashMap<String, String>,
}

impl GrbCatalog {
    pub fn bundled() -> Self {
        Self::from_tables(&[BUNDLED_LONG, BUNDLED_SHORT])
    }

    /// Loads `LGRB_table.txt` and `SGRB_table.txt` from `dir`.
    pub fn from_dir(dir: &Utf8Path) -> Result<Self, DataError> {
        let long = read_table(&dir.join(LONG_FILE))?;
        let short = read_table(&dir.join(SHORT_FILE))?;
        Ok(Self::from_tables(&[&long, &short]))
    }

    /// Earlier tables win on duplicate names.
    pub fn from_tables(tables: &[&str]) -> Self {
        let mut triggers = HashMap::new();
        for table in tables {
            for row in tab_rows(table, &["GRB", "Trigger Number"]) {
                let (Some(name), Some(trigger)) = (row.first(), row.get(1)) else {
                    continue;
                };
                let Ok(name) = name.parse::<GrbName>() else {
                    debug!(name, "skipping unparseable GRB name");
                    continue;
                };
                if trigger.is_empty() {
                    continue;
                }
                triggers
                    .entry(name.as_str().to_string())
                    .or_insert_with(|| trigger.clone());
            }
        }
        Self { triggers }
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn find(&self, grb: &GrbName) -> Option<&str> {
        self.triggers.get(grb.as_str()).map(String::as_str)
    }

    /// Falls back to [`UNKNOWN_TRIGGER`], which produces URLs the remote answers with "no data".
    pub fn trigger_number(&self, grb: &GrbName) -> String {
        match self.find(grb) {
            Some(trigger) => trigger.to_string(),
            None => {
                warn!(grb = %grb, "GRB not found in trigger tables; using trigger {UNKNOWN_TRIGGER}");
                UNKNOWN_TRIGGER.to_string()
            }
        }
    }
}

/// Kilonovae with an associated GRB, and that GRB's trigger epoch (MJD).
#[derive(Debug, Clone, Default)]
pub struct AssociationTable {
    epochs: HashMap<String, AssociatedGrb>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssociatedGrb {
    pub grb: String,
    pub trigger_mjd: f64,
}

impl AssociationTable {
    pub fn bundled() -> Self {
        Self::from_table(BUNDLED_KILONOVA)
    }

    pub fn from_dir(dir: &Utf8Path) -> Result<Self, DataError> {
        let path = dir.join(KILONOVA_FILE);
        if !path.as_std_path().is_file() {
            return Ok(Self::bundled());
        }
        Ok(Self::from_table(&read_table(&path)?))
    }

    pub fn from_table(table: &str) -> Self {
        let mut epochs = HashMap::new();
        for row in tab_rows(table, &["transient", "GRB", "T0 (MJD)"]) {
            let [transient, grb, t0] = row.as_slice() else {
                continue;
            };
            let Ok(trigger_mjd) = t0.parse::<f64>() else {
                continue;
            };
            epochs.insert(
                transient.to_ascii_lowercase(),
                AssociatedGrb {
                    grb: grb.clone(),
                    trigger_mjd,
                },
            );
        }
        Self { epochs }
    }

    pub fn lookup(&self, transient: &str) -> Option<&AssociatedGrb> {
        self.epochs.get(&transient.to_ascii_lowercase())
    }
}

fn read_table(path: &Utf8Path) -> Result<String, DataError> {
    fs::read_to_string(path.as_std_path())
        .map_err(|err| DataError::Filesystem(format!("read {path}: {err}")))
}

/// Selected columns of a tab-delimited table with a header row. Bad lines are skipped.
fn tab_rows(table: &str, columns: &[&str]) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(table.as_bytes());
    let Ok(headers) = reader.headers().cloned() else {
        return Vec::new();
    };
    let Some(indices) = columns
        .iter()
        .map(|column| headers.iter().position(|header| header == *column))
        .collect::<Option<Vec<_>>>()
    else {
        warn!(?columns, "lookup table is missing required columns");
        return Vec::new();
    };

    reader
        .records()
        .filter_map(Result::ok)
        .filter_map(|record| {
            indices
                .iter()
                .map(|&index| record.get(index).map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_tables_resolve_short_and_long() {
        let catalog = GrbCatalog::bundled();
        let short: GrbName = "050509B".parse().unwrap();
        let long: GrbName = "GRB080319B".parse().unwrap();
        assert_eq!(catalog.find(&short), Some("118749"));
        assert_eq!(catalog.find(&long), Some("306757"));
    }

    #[test]
    fn unknown_grb_falls_back_to_zero() {
        let catalog = GrbCatalog::from_tables(&["GRB\tTrigger Number\n"]);
        let grb: GrbName = "991231".parse().unwrap();
        assert_eq!(catalog.trigger_number(&grb), UNKNOWN_TRIGGER);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let table = "GRB\tTrigger Number\tT90\n140903A\t611933\t0.3\nbroken\n050509B\n";
        let catalog = GrbCatalog::from_tables(&[table]);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn association_lookup_is_case_insensitive() {
        let table = AssociationTable::bundled();
        let hit = table.lookup("at2017GFO").unwrap();
        assert_eq!(hit.grb, "170817A");
    }
}
