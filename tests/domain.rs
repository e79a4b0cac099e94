use assert_matches::assert_matches;

use transient_data::domain::{
    DataMode, GrbName, PromptBinning, TransientCategory, TransientIdentity, TransientName,
};
use transient_data::error::DataError;

#[test]
fn grb_names_normalize() {
    let plain: GrbName = "050509b".parse().unwrap();
    let prefixed: GrbName = "GRB050509B".parse().unwrap();
    assert_eq!(plain, prefixed);
    assert_eq!(plain.with_prefix(), "GRB050509B");

    let bare: GrbName = "070809".parse().unwrap();
    assert_eq!(bare.as_str(), "070809");
}

#[test]
fn invalid_grb_names_are_configuration_errors() {
    for value in ["", "GRB", "05050", "0505091", "GRB050509BB", "../050509"] {
        assert_matches!(
            value.parse::<GrbName>(),
            Err(DataError::InvalidConfiguration(_)),
            "{value}"
        );
    }
}

#[test]
fn binning_accepts_only_the_six_published_sizes() {
    let all: Vec<&str> = PromptBinning::ALL.iter().map(|bin| bin.as_str()).collect();
    assert_eq!(all, vec!["1s", "2ms", "8ms", "16ms", "64ms", "256ms"]);
    assert_eq!("64ms".parse::<PromptBinning>().unwrap(), PromptBinning::Ms64);
    assert_eq!(PromptBinning::default(), PromptBinning::Ms2);

    let err = "4ms".parse::<PromptBinning>().unwrap_err();
    assert_matches!(&err, DataError::InvalidConfiguration(message) if message.contains("256ms"));
}

#[test]
fn data_modes_round_trip_through_strings() {
    for mode in [DataMode::Flux, DataMode::FluxDensity, DataMode::Luminosity] {
        assert_eq!(mode.to_string().parse::<DataMode>().unwrap(), mode);
    }
    assert_matches!(
        "counts".parse::<DataMode>(),
        Err(DataError::InvalidConfiguration(_))
    );
}

#[test]
fn categories_parse_aliases() {
    assert_eq!(
        "tde".parse::<TransientCategory>().unwrap(),
        TransientCategory::TidalDisruptionEvent
    );
    assert_eq!(
        "Kilonova".parse::<TransientCategory>().unwrap(),
        TransientCategory::Kilonova
    );
    assert!(!TransientCategory::Grb.has_open_catalog_data());
    assert!(TransientCategory::Supernova.has_open_catalog_data());
}

#[test]
fn transient_names_reject_path_components() {
    assert!("SN2011fe".parse::<TransientName>().is_ok());
    for value in ["", "  ", "../etc", "a/b", "a\\b"] {
        assert_matches!(
            value.parse::<TransientName>(),
            Err(DataError::InvalidConfiguration(_)),
            "{value:?}"
        );
    }
}

#[test]
fn xrt_instrument_marks_identity() {
    let grb: GrbName = "050509B".parse().unwrap();
    assert!(TransientIdentity::grb_instrument(&grb, "XRT").is_xrt_only());
    assert!(!TransientIdentity::grb(&grb).is_xrt_only());
}
