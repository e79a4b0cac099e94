use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use transient_data::parse::{
    FluxSection, SectionedFlux, parse_prompt_curve, parse_xrt_curve, sort_integrated_flux_data,
    tag_lines,
};

fn fixture(name: &str) -> String {
    fs::read_to_string(Utf8Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name))
        .unwrap()
}

#[test]
fn sectioned_file_is_sorted_under_fixed_headers() {
    let temp = tempfile::tempdir().unwrap();
    let raw = Utf8PathBuf::from_path_buf(temp.path().join("raw.csv")).unwrap();
    let processed = Utf8PathBuf::from_path_buf(temp.path().join("processed.csv")).unwrap();
    fs::write(raw.as_std_path(), fixture("integrated_flux_raw.txt")).unwrap();

    let sections = sort_integrated_flux_data(&raw, &processed).unwrap();
    assert_eq!(sections.bat.len(), 2);
    assert_eq!(sections.xrt_wt.len(), 1);
    assert!(sections.xrt_pc.is_empty());

    let expected = "\
## BAT - batSNR4flux
0.5 0.1 -0.1 1e-9 1e-10 -1e-10
1.5 0.1 -0.1 2e-9 1e-10 -1e-10

## XRT - xrtwtflux
60.0 5.0 -5.0 3e-10 1e-11 -1e-11

## XRT - xrtpcflux
";
    assert_eq!(fs::read_to_string(processed.as_std_path()).unwrap(), expected);
}

#[test]
fn processed_file_reloads_into_same_sections() {
    let sections = SectionedFlux::from_raw(&fixture("integrated_flux_raw.txt"));
    let reloaded = SectionedFlux::from_processed(&sections.to_processed());
    assert_eq!(reloaded, sections);

    let points = reloaded.points(FluxSection::Bat).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[1].time, 1.5);
    assert_eq!(points[1].flux, 2e-9);
    assert_eq!(points[1].fluxneg, -1e-10);
}

#[test]
fn missing_raw_file_yields_none_and_no_output() {
    let temp = tempfile::tempdir().unwrap();
    let raw = Utf8PathBuf::from_path_buf(temp.path().join("absent.csv")).unwrap();
    let processed = Utf8PathBuf::from_path_buf(temp.path().join("processed.csv")).unwrap();
    assert!(sort_integrated_flux_data(&raw, &processed).is_none());
    assert!(!processed.as_std_path().exists());
}

#[test]
fn tagging_tracks_active_section() {
    let tagged = tag_lines("stray\n! xrtpcflux\nnote\n7 1 -1 2 1 -1\n");
    let sections: Vec<_> = tagged.iter().map(|line| line.section).collect();
    assert_eq!(
        sections,
        vec![
            None,
            Some(FluxSection::XrtPhotonCounting),
            Some(FluxSection::XrtPhotonCounting),
            Some(FluxSection::XrtPhotonCounting),
        ]
    );
    let valid: Vec<bool> = tagged.iter().map(|line| line.valid).collect();
    assert_eq!(valid, vec![false, false, false, true]);
}

#[test]
fn xrt_curve_drops_zero_positive_error_rows() {
    let points = parse_xrt_curve(&fixture("xrt_flux.qdp")).unwrap();
    let times: Vec<f64> = points.iter().map(|point| point.time).collect();
    assert_eq!(times, vec![92.4, 5000.0]);
    assert_eq!(points[0].flux, 5.2e-10);
    assert_eq!(points[0].fluxpos, 4.0e-11);
    assert_eq!(points[1].timeneg, -250.0);
}

#[test]
fn prompt_curve_maps_band_columns() {
    let rows = parse_prompt_curve(&fixture("prompt_64ms.dat")).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].time, -0.064);
    assert_eq!(rows[1].flux_25_50, 0.08);
    assert_eq!(rows[1].flux_15_350, 0.21);
    assert_eq!(rows[2].flux_15_350_err, 0.04);
}
