use std::time::Duration;

use crate::domain::{GrbName, PromptBinning};
use crate::session::{InteractionScript, Locator};

/// Body text of Swift pages for bursts without a light curve.
pub const NO_LIGHT_CURVE_MARKER: &str = "No Light curve available";

pub fn burst_analyser_url(trigger: &str) -> String {
    format!("http://www.swift.ac.uk/burst_analyser/00{trigger}/")
}

pub fn xrt_flux_curve_url(trigger: &str) -> String {
    format!("https://www.swift.ac.uk/xrt_curves/00{trigger}/flux.qdp")
}

pub fn bat_catalog_url(grb: &GrbName) -> String {
    format!(
        "https://swift.gsfc.nasa.gov/results/batgrbcat/{}/data_product/",
        grb.with_prefix()
    )
}

pub fn prompt_data_file(binning: PromptBinning) -> String {
    format!("{binning}_lc_ascii.dat")
}

/// BAT+XRT integrated flux: SNR-4 BAT binning, no sub-plot, both bands.
pub fn integrated_flux_script(trigger: &str, wait: Duration) -> InteractionScript {
    InteractionScript::new(&burst_analyser_url(trigger))
        .optionally_select("batxrtbin", "SNR 4")
        .optionally_select("batxrtsub", "no")
        .click_if_all_present(vec![
            Locator::id("batxrtband1"),
            Locator::id("batxrtband0"),
        ])
        .click(Locator::id("batxrt_XRTBAND_makeDownload"))
        .await_fixed(wait)
}

pub fn flux_density_script(trigger: &str, wait: Duration) -> InteractionScript {
    InteractionScript::new(&burst_analyser_url(trigger))
        .optionally_select("xrtsub", "no")
        .await_fixed(wait)
        .click(Locator::id("xrt_DENSITY_makeDownload"))
        .await_fixed(wait)
}

pub fn prompt_script(grb: &GrbName, binning: PromptBinning, wait: Duration) -> InteractionScript {
    InteractionScript::new(&bat_catalog_url(grb))
        .click(Locator::PartialLinkText("results".to_string()))
        .await_fixed(wait)
        .click(Locator::LinkText("lc/".to_string()))
        .await_fixed(wait)
        .append_to_location(&prompt_data_file(binning))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStep;

    #[test]
    fn urls_pad_trigger() {
        assert_eq!(
            burst_analyser_url("118749"),
            "http://www.swift.ac.uk/burst_analyser/00118749/"
        );
        assert_eq!(
            xrt_flux_curve_url("118749"),
            "https://www.swift.ac.uk/xrt_curves/00118749/flux.qdp"
        );
    }

    #[test]
    fn integrated_flux_script_ends_with_wait() {
        let script = integrated_flux_script("118749", Duration::from_secs(20));
        assert_eq!(
            script.steps().last(),
            Some(&SessionStep::AwaitFixed(Duration::from_secs(20)))
        );
        assert_eq!(
            script.steps().first(),
            Some(&SessionStep::Navigate(burst_analyser_url("118749")))
        );
    }
}
