use std::io::{self, Write};

use serde::Serialize;

use crate::app::{
    AfterglowData, AfterglowResult, CatalogResult, PromptResult, SyncResult, TriggerResult,
    XrtResult,
};
use crate::parse::FluxSection;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_afterglow(result: &AfterglowResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_xrt(result: &XrtResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_prompt(result: &PromptResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_catalog(result: &CatalogResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_sync(result: &SyncResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_trigger(result: &TriggerResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// One-line summaries for a terminal.
pub struct HumanOutput;

impl HumanOutput {
    pub fn afterglow(result: &AfterglowResult) -> String {
        let detail = match &result.data {
            Some(AfterglowData::Flux(sections)) => FluxSection::ORDER
                .into_iter()
                .map(|section| format!("{}={}", section.raw_label(), sections.section(section).len()))
                .collect::<Vec<_>>()
                .join(" "),
            Some(AfterglowData::FluxDensity(points)) => format!("rows={}", points.len()),
            None => "no data (see warnings)".to_string(),
        };
        format!(
            "GRB{} {}: {} -> {}",
            result.grb, result.mode, detail, result.location.processed_file
        )
    }

    pub fn xrt(result: &XrtResult) -> String {
        format!(
            "GRB{} xrt: rows={} -> {}",
            result.grb,
            result.points.len(),
            result.location.processed_file
        )
    }

    pub fn prompt(result: &PromptResult) -> String {
        format!(
            "GRB{} prompt {}: rows={} -> {}",
            result.grb,
            result.binning,
            result.rows.len(),
            result.location.processed_file
        )
    }

    pub fn catalog(result: &CatalogResult) -> String {
        let epoch = match result.dataset.epoch.mjd() {
            Some(mjd) => format!("t0={mjd}"),
            None => "t0=unresolved".to_string(),
        };
        let fixup = if result.needs_fixup {
            " (needs fix_t0_of_transient)"
        } else {
            ""
        };
        format!(
            "{} {}: rows={} {epoch}{fixup} -> {}",
            result.category,
            result.name,
            result.dataset.len(),
            result.location.processed_file
        )
    }

    pub fn sync(result: &SyncResult) -> Vec<String> {
        result
            .afterglows
            .iter()
            .map(Self::afterglow)
            .chain(result.xrt.iter().map(Self::xrt))
            .chain(result.prompt.iter().map(Self::prompt))
            .chain(result.transients.iter().map(Self::catalog))
            .collect()
    }
}
