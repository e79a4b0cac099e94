use camino::Utf8PathBuf;

use transient_data::catalog::AssociationTable;
use transient_data::domain::{TransientCategory, TransientIdentity, TransientName};
use transient_data::epoch::{EpochRecord, ReferenceEpoch, TransientMetadata, resolve_epoch};

fn identity(name: &str, category: TransientCategory) -> TransientIdentity {
    let name: TransientName = name.parse().unwrap();
    TransientIdentity::transient(&name, category)
}

#[test]
fn metadata_epoch_wins() {
    let metadata = TransientMetadata {
        time_of_merger: Some(55796.5),
        ..Default::default()
    };
    let resolution = resolve_epoch(
        &identity("SN2011fe", TransientCategory::Supernova),
        Some(&metadata),
        &AssociationTable::bundled(),
        Some(55800.5),
    );
    assert_eq!(resolution.epoch, ReferenceEpoch::Metadata { mjd: 55796.5 });
    assert!(!resolution.needs_fixup);
}

#[test]
fn kilonova_without_association_is_unresolved() {
    let resolution = resolve_epoch(
        &identity("AT2099zzz", TransientCategory::Kilonova),
        Some(&TransientMetadata::default()),
        &AssociationTable::bundled(),
        Some(60000.0),
    );
    assert_eq!(resolution.epoch, ReferenceEpoch::Unresolved);
    assert!(resolution.needs_fixup);
}

#[test]
fn kilonova_uses_associated_grb_trigger() {
    let resolution = resolve_epoch(
        &identity("AT2017gfo", TransientCategory::Kilonova),
        None,
        &AssociationTable::bundled(),
        Some(57983.0),
    );
    assert_eq!(
        resolution.epoch,
        ReferenceEpoch::AssociatedGrb {
            mjd: 57982.528523,
            grb: "170817A".to_string()
        }
    );
    assert!(!resolution.needs_fixup);
}

#[test]
fn other_categories_fall_back_to_first_observation() {
    let resolution = resolve_epoch(
        &identity("ASASSN-14li", TransientCategory::TidalDisruptionEvent),
        None,
        &AssociationTable::bundled(),
        Some(56983.6),
    );
    assert_eq!(resolution.epoch, ReferenceEpoch::FirstObservation { mjd: 56983.6 });
    assert!(resolution.needs_fixup);
}

#[test]
fn no_observations_leaves_epoch_unresolved() {
    let resolution = resolve_epoch(
        &identity("SN2011fe", TransientCategory::Supernova),
        None,
        &AssociationTable::bundled(),
        None,
    );
    assert_eq!(resolution.epoch, ReferenceEpoch::Unresolved);
    assert!(resolution.needs_fixup);
}

#[test]
fn record_survives_disk_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("SN2011fe_epoch.json")).unwrap();
    assert!(EpochRecord::read(&path).unwrap().is_none());

    let record = EpochRecord::new(ReferenceEpoch::FirstObservation { mjd: 55800.123456789 });
    record.write(&path).unwrap();
    let loaded = EpochRecord::read(&path).unwrap().unwrap();
    assert_eq!(loaded, record);
    assert!(loaded.needs_fixup);

    let json = std::fs::read_to_string(path.as_std_path()).unwrap();
    assert!(json.contains("\"source\": \"first_observation\""));
}

#[test]
fn unresolved_record_has_no_mjd() {
    let record = EpochRecord::new(ReferenceEpoch::Unresolved);
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value["source"], "unresolved");
    assert!(value.get("mjd").is_none());
    assert_eq!(value["needs_fixup"], true);
}
