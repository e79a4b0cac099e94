//! Raw Swift formats.
//!
//! The burst analyser's integrated-flux download is a QDP-style text file in
//! which lines starting with `!` name the block that follows. The XRT curve
//! and BAT prompt downloads are plain whitespace-delimited numeric tables.

use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DataError;
use crate::store::Store;

pub const SECTION_SENTINEL: char = '!';

/// Comment markers of the XRT/burst-analyser QDP files.
pub const QDP_COMMENT_MARKERS: [&str; 3] = ["!", "READ", "NO"];

pub const PROMPT_COMMENT_MARKERS: [&str; 1] = ["#"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FluxSection {
    Bat,
    XrtWindowedTiming,
    XrtPhotonCounting,
}

impl FluxSection {
    /// Output order of the processed file.
    pub const ORDER: [FluxSection; 3] = [
        FluxSection::Bat,
        FluxSection::XrtWindowedTiming,
        FluxSection::XrtPhotonCounting,
    ];

    pub fn raw_label(&self) -> &'static str {
        match self {
            FluxSection::Bat => "batSNR4flux",
            FluxSection::XrtWindowedTiming => "xrtwtflux",
            FluxSection::XrtPhotonCounting => "xrtpcflux",
        }
    }

    pub fn processed_header(&self) -> &'static str {
        match self {
            FluxSection::Bat => "## BAT - batSNR4flux",
            FluxSection::XrtWindowedTiming => "## XRT - xrtwtflux",
            FluxSection::XrtPhotonCounting => "## XRT - xrtpcflux",
        }
    }

    fn from_label(text: &str) -> Option<Self> {
        FluxSection::ORDER
            .into_iter()
            .find(|section| text.starts_with(section.raw_label()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Header(FluxSection),
    /// A sentinel line naming no known section closes the active one.
    Reset,
    Body,
}

pub fn classify_line(line: &str) -> LineKind {
    match line.strip_prefix(SECTION_SENTINEL) {
        Some(rest) => FluxSection::from_label(rest.trim_start())
            .map(LineKind::Header)
            .unwrap_or(LineKind::Reset),
        None => LineKind::Body,
    }
}

/// Data rows start with a digit; everything else in a section is annotation.
pub fn is_data_row(line: &str) -> bool {
    line.chars().next().is_some_and(|ch| ch.is_ascii_digit())
}

/// One raw line with the section it falls in and whether it is a data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLine<'a> {
    pub text: &'a str,
    pub section: Option<FluxSection>,
    pub valid: bool,
}

/// Tags every line with the section active at that point.
pub fn tag_lines(text: &str) -> Vec<TaggedLine<'_>> {
    let init: (Option<FluxSection>, Vec<TaggedLine>) = (None, Vec::new());
    let (_, tagged) = text.lines().fold(init, |(active, mut tagged), line| {
        let active = match classify_line(line) {
            LineKind::Header(section) => Some(section),
            LineKind::Reset => None,
            LineKind::Body => active,
        };
        tagged.push(TaggedLine {
            text: line,
            section: active,
            valid: is_data_row(line),
        });
        (active, tagged)
    });
    tagged
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionedFlux {
    pub bat: Vec<String>,
    pub xrt_wt: Vec<String>,
    pub xrt_pc: Vec<String>,
}

impl SectionedFlux {
    pub fn section(&self, section: FluxSection) -> &[String] {
        match section {
            FluxSection::Bat => &self.bat,
            FluxSection::XrtWindowedTiming => &self.xrt_wt,
            FluxSection::XrtPhotonCounting => &self.xrt_pc,
        }
    }

    fn section_mut(&mut self, section: FluxSection) -> &mut Vec<String> {
        match section {
            FluxSection::Bat => &mut self.bat,
            FluxSection::XrtWindowedTiming => &mut self.xrt_wt,
            FluxSection::XrtPhotonCounting => &mut self.xrt_pc,
        }
    }

    /// Keeps the data rows of each section; lines outside any section are dropped.
    pub fn from_raw(text: &str) -> Self {
        tag_lines(text)
            .into_iter()
            .filter(|line| line.valid)
            .fold(Self::default(), |mut sections, line| {
                if let Some(section) = line.section {
                    sections.section_mut(section).push(line.text.to_string());
                }
                sections
            })
    }

    /// Reads back the layout written by [`SectionedFlux::to_processed`].
    pub fn from_processed(text: &str) -> Self {
        let mut sections = Self::default();
        let mut active = None;
        for line in text.lines() {
            if line.starts_with("## ") {
                active = FluxSection::ORDER
                    .into_iter()
                    .find(|section| line.trim_end() == section.processed_header());
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            if let Some(section) = active {
                sections.section_mut(section).push(line.to_string());
            }
        }
        sections
    }

    pub fn to_processed(&self) -> String {
        let mut out = String::new();
        for (index, section) in FluxSection::ORDER.into_iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(section.processed_header());
            out.push('\n');
            for row in self.section(section) {
                out.push_str(row);
                out.push('\n');
            }
        }
        out
    }

    pub fn points(&self, section: FluxSection) -> Result<Vec<CurvePoint>, DataError> {
        self.section(section)
            .iter()
            .map(|row| {
                let values = parse_numeric_row(row)?;
                CurvePoint::from_columns(&values).ok_or_else(|| {
                    DataError::Parse(format!("expected 6 columns in {section:?} row {row:?}"))
                })
            })
            .collect()
    }
}

/// Sorts a raw integrated-flux download into its three sections and writes them out.
///
/// Read or write failures are logged and yield `None`; the output is written
/// atomically, so a failure never leaves a truncated file behind.
pub fn sort_integrated_flux_data(
    raw_file: &Utf8Path,
    processed_file: &Utf8Path,
) -> Option<SectionedFlux> {
    let text = match fs::read_to_string(raw_file.as_std_path()) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %raw_file, error = %err, "there was an error opening the file");
            return None;
        }
    };
    let sections = SectionedFlux::from_raw(&text);
    if let Err(err) = Store::write_bytes_atomic(processed_file, sections.to_processed().as_bytes())
    {
        warn!(path = %processed_file, error = %err, "there was an error writing the file");
        return None;
    }
    info!(path = %processed_file, "processed data file written");
    Some(sections)
}

/// Time and flux with asymmetric errors, as in the Swift QDP downloads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub time: f64,
    pub timepos: f64,
    pub timeneg: f64,
    pub flux: f64,
    pub fluxpos: f64,
    pub fluxneg: f64,
}

impl CurvePoint {
    pub fn from_columns(values: &[f64]) -> Option<Self> {
        match values {
            [time, timepos, timeneg, flux, fluxpos, fluxneg, ..] => Some(Self {
                time: *time,
                timepos: *timepos,
                timeneg: *timeneg,
                flux: *flux,
                fluxpos: *fluxpos,
                fluxneg: *fluxneg,
            }),
            _ => None,
        }
    }
}

/// BAT prompt count rates, counts/s/detector in five energy bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PromptRow {
    #[serde(rename = "Time [s]")]
    pub time: f64,
    #[serde(rename = "flux_15_25 [counts/s/det]")]
    pub flux_15_25: f64,
    #[serde(rename = "flux_15_25_err [counts/s/det]")]
    pub flux_15_25_err: f64,
    #[serde(rename = "flux_25_50 [counts/s/det]")]
    pub flux_25_50: f64,
    #[serde(rename = "flux_25_50_err [counts/s/det]")]
    pub flux_25_50_err: f64,
    #[serde(rename = "flux_50_100 [counts/s/det]")]
    pub flux_50_100: f64,
    #[serde(rename = "flux_50_100_err [counts/s/det]")]
    pub flux_50_100_err: f64,
    #[serde(rename = "flux_100_350 [counts/s/det]")]
    pub flux_100_350: f64,
    #[serde(rename = "flux_100_350_err [counts/s/det]")]
    pub flux_100_350_err: f64,
    #[serde(rename = "flux_15_350 [counts/s/det]")]
    pub flux_15_350: f64,
    #[serde(rename = "flux_15_350_err [counts/s/det]")]
    pub flux_15_350_err: f64,
}

impl PromptRow {
    pub const COLUMNS: usize = 11;

    fn from_columns(values: &[f64]) -> Option<Self> {
        let [time, a, ae, b, be, c, ce, d, de, e, ee, ..] = values else {
            return None;
        };
        Some(Self {
            time: *time,
            flux_15_25: *a,
            flux_15_25_err: *ae,
            flux_25_50: *b,
            flux_25_50_err: *be,
            flux_50_100: *c,
            flux_50_100_err: *ce,
            flux_100_350: *d,
            flux_100_350_err: *de,
            flux_15_350: *e,
            flux_15_350_err: *ee,
        })
    }
}

/// Whitespace-delimited numeric rows. Anything from the first comment marker
/// to the end of a line is ignored, as are blank lines.
pub fn load_numeric_table(
    text: &str,
    comment_markers: &[&str],
    min_columns: usize,
) -> Result<Vec<Vec<f64>>, DataError> {
    let mut rows = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let content = strip_comment(line, comment_markers).trim();
        if content.is_empty() {
            continue;
        }
        let values = parse_numeric_row(content)
            .map_err(|err| DataError::Parse(format!("line {}: {err}", number + 1)))?;
        if values.len() < min_columns {
            return Err(DataError::Parse(format!(
                "line {}: expected at least {min_columns} columns, found {}",
                number + 1,
                values.len()
            )));
        }
        rows.push(values);
    }
    Ok(rows)
}

/// XRT flux curve rows; rows with a zero positive flux error are placeholders and dropped.
pub fn parse_xrt_curve(text: &str) -> Result<Vec<CurvePoint>, DataError> {
    Ok(load_numeric_table(text, &QDP_COMMENT_MARKERS, 6)?
        .iter()
        .filter_map(|values| CurvePoint::from_columns(values))
        .filter(|point| point.fluxpos != 0.0)
        .collect())
}

pub fn parse_prompt_curve(text: &str) -> Result<Vec<PromptRow>, DataError> {
    Ok(
        load_numeric_table(text, &PROMPT_COMMENT_MARKERS, PromptRow::COLUMNS)?
            .iter()
            .filter_map(|values| PromptRow::from_columns(values))
            .collect(),
    )
}

fn strip_comment<'a>(line: &'a str, markers: &[&str]) -> &'a str {
    let cut = markers
        .iter()
        .filter_map(|marker| line.find(marker))
        .min()
        .unwrap_or(line.len());
    &line[..cut]
}

fn parse_numeric_row(row: &str) -> Result<Vec<f64>, DataError> {
    row.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| DataError::Parse(format!("not a number: {token:?}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_sentinel_lines() {
        assert_eq!(
            classify_line("! batSNR4flux data"),
            LineKind::Header(FluxSection::Bat)
        );
        assert_eq!(
            classify_line("! xrtpcflux"),
            LineKind::Header(FluxSection::XrtPhotonCounting)
        );
        assert_eq!(classify_line("! something else"), LineKind::Reset);
        assert_eq!(classify_line("1.0 2.0"), LineKind::Body);
    }

    #[test]
    fn lines_before_any_header_are_dropped() {
        let sections = SectionedFlux::from_raw("1 2 3\n! xrtwtflux\n4 5 6\n");
        assert_eq!(sections.xrt_wt, vec!["4 5 6"]);
        assert!(sections.bat.is_empty());
    }

    #[test]
    fn reset_line_closes_section() {
        let raw = "! batSNR4flux\n1 2\n! done\n3 4\n";
        let sections = SectionedFlux::from_raw(raw);
        assert_eq!(sections.bat, vec!["1 2"]);
    }

    #[test]
    fn negative_times_are_not_data_rows() {
        assert!(!is_data_row("-0.5 1 2"));
        assert!(is_data_row("0.5 1 2"));
        assert!(!is_data_row(""));
    }

    #[test]
    fn comment_markers_strip_to_end_of_line() {
        let table = "READ TERR 1 2\n! header\n1 0.1 -0.1 2e-11 1e-12 -1e-12\nNO NO NO NO NO NO\n";
        let rows = load_numeric_table(table, &QDP_COMMENT_MARKERS, 6).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][3], 2e-11);
    }

    #[test]
    fn short_rows_are_rejected() {
        let err = load_numeric_table("1 2 3\n", &PROMPT_COMMENT_MARKERS, 11).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
