use std::time::Duration;

use assert_matches::assert_matches;

use transient_data::config::{Config, ConfigLoader};
use transient_data::domain::{DataMode, PromptBinning, TransientCategory};
use transient_data::error::DataError;
use transient_data::webdriver::Browser;

fn parse(json: &str) -> Config {
    serde_json::from_str(json).unwrap()
}

#[test]
fn detailed_entries_resolve() {
    let config = parse(
        r#"{
            "schema_version": 1,
            "use_default_directory": true,
            "webdriver": { "url": "http://127.0.0.1:9515", "browser": "firefox" },
            "session_wait_secs": 5,
            "afterglows": ["070809", {"grb": "050509B", "mode": "flux_density"}],
            "prompt": [{"grb": "GRB050509B", "bin": "64ms"}],
            "transients": [{"name": "AT2017gfo", "type": "kilonova"}]
        }"#,
    );
    let resolved = ConfigLoader::resolve_config(config).unwrap();

    assert!(resolved.use_default_directory);
    assert_eq!(resolved.webdriver.url, "http://127.0.0.1:9515");
    assert_eq!(resolved.webdriver.browser, Browser::Firefox);
    assert!(resolved.webdriver.headless);
    assert_eq!(resolved.session_wait, Duration::from_secs(5));
    assert_eq!(resolved.afterglows[1].mode, DataMode::FluxDensity);
    assert_eq!(resolved.prompt[0].binning, PromptBinning::Ms64);
    assert_eq!(resolved.transients[0].category, TransientCategory::Kilonova);
    assert_eq!(resolved.transients[0].name.as_str(), "AT2017gfo");
}

#[test]
fn tables_dir_is_carried_through() {
    let config = parse(r#"{ "tables_dir": "/data/swift-tables" }"#);
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(
        resolved.tables_dir.as_deref(),
        Some(camino::Utf8Path::new("/data/swift-tables"))
    );
}

#[test]
fn bad_bin_fails_before_anything_runs() {
    let config = parse(r#"{ "prompt": [{"grb": "050509B", "bin": "5ms"}] }"#);
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(DataError::InvalidConfiguration(_))
    );
}

#[test]
fn bad_grb_name_is_rejected() {
    let config = parse(r#"{ "xrt": ["not-a-grb"] }"#);
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(DataError::InvalidConfiguration(_))
    );
}

#[test]
fn explicit_missing_path_is_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("nope.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(DataError::ConfigRead(_))
    );
}

#[test]
fn malformed_json_is_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("tdata.json");
    std::fs::write(&path, "{ \"afterglows\": [").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(DataError::ConfigParse(_))
    );
}
