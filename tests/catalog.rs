use camino::Utf8PathBuf;

use transient_data::catalog::{AssociationTable, GrbCatalog, UNKNOWN_TRIGGER};
use transient_data::domain::GrbName;

#[test]
fn long_table_wins_on_duplicates() {
    let long = "GRB\tTrigger Number\n130603B\t557310\n";
    let short = "GRB\tTrigger Number\n130603B\t999999\n";
    let catalog = GrbCatalog::from_tables(&[long, short]);
    let grb: GrbName = "130603B".parse().unwrap();
    assert_eq!(catalog.trigger_number(&grb), "557310");
}

#[test]
fn bundled_catalog_is_not_empty() {
    let catalog = GrbCatalog::bundled();
    assert!(!catalog.is_empty());
    let grb: GrbName = "GRB130603B".parse().unwrap();
    assert_eq!(catalog.find(&grb), Some("557310"));
}

#[test]
fn unknown_grb_uses_placeholder_trigger() {
    let grb: GrbName = "991231Z".parse().unwrap();
    assert_eq!(GrbCatalog::bundled().trigger_number(&grb), UNKNOWN_TRIGGER);
}

#[test]
fn tables_load_from_directory() {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    std::fs::write(
        dir.join("LGRB_table.txt").as_std_path(),
        "GRB\tT90\tTrigger Number\n061007\t75.3\t232683\n",
    )
    .unwrap();
    std::fs::write(
        dir.join("SGRB_table.txt").as_std_path(),
        "GRB\tTrigger Number\n",
    )
    .unwrap();

    let catalog = GrbCatalog::from_dir(&dir).unwrap();
    assert_eq!(catalog.len(), 1);
    let grb: GrbName = "061007".parse().unwrap();
    assert_eq!(catalog.find(&grb), Some("232683"));

    let associations = AssociationTable::from_dir(&dir).unwrap();
    assert!(associations.lookup("GW170817").is_some());
}
