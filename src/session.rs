//! Scripted browser sessions for pages that only hand out a download link after
//! a few clicks and some server-side processing.

use std::thread;
use std::time::Duration;

use camino::Utf8Path;
use tracing::{debug, info, warn};

use crate::error::DataError;
use crate::remote::RemoteSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    XPath(String),
    LinkText(String),
    PartialLinkText(String),
}

impl Locator {
    pub fn id(value: &str) -> Self {
        Locator::Id(value.to_string())
    }

    /// The `<option>` with visible text `option` inside `<select name=control>`.
    pub fn select_option(control: &str, option: &str) -> Self {
        Locator::XPath(format!(
            "//select[@name='{control}']/option[text()='{option}']"
        ))
    }
}

pub trait BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<(), DataError>;
    fn exists(&mut self, locator: &Locator) -> Result<bool, DataError>;
    fn click(&mut self, locator: &Locator) -> Result<(), DataError>;
    fn current_location(&mut self) -> Result<String, DataError>;
    fn quit(&mut self) -> Result<(), DataError>;

    /// Picks `option` in the `control` drop-down. A missing control or option is not an error.
    fn optionally_select(&mut self, control: &str, option: &str) -> Result<bool, DataError> {
        let locator = Locator::select_option(control, option);
        if !self.exists(&locator)? {
            debug!(control, option, "optional control not present");
            return Ok(false);
        }
        self.click(&locator)?;
        Ok(true)
    }

    fn await_fixed(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

pub trait BrowserLauncher: Send + Sync {
    type Session: BrowserSession;

    fn launch(&self) -> Result<Self::Session, DataError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStep {
    Navigate(String),
    OptionallySelect { control: String, option: String },
    /// Clicks every locator, but only when all of them are present.
    ClickIfAllPresent(Vec<Locator>),
    Click(Locator),
    AwaitFixed(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionScript {
    steps: Vec<SessionStep>,
    location_suffix: Option<String>,
}

impl InteractionScript {
    pub fn new(entry_url: &str) -> Self {
        Self {
            steps: vec![SessionStep::Navigate(entry_url.to_string())],
            location_suffix: None,
        }
    }

    pub fn optionally_select(mut self, control: &str, option: &str) -> Self {
        self.steps.push(SessionStep::OptionallySelect {
            control: control.to_string(),
            option: option.to_string(),
        });
        self
    }

    pub fn click_if_all_present(mut self, locators: Vec<Locator>) -> Self {
        self.steps.push(SessionStep::ClickIfAllPresent(locators));
        self
    }

    pub fn click(mut self, locator: Locator) -> Self {
        self.steps.push(SessionStep::Click(locator));
        self
    }

    pub fn await_fixed(mut self, duration: Duration) -> Self {
        self.steps.push(SessionStep::AwaitFixed(duration));
        self
    }

    /// The download URL is the final location with `suffix` appended.
    pub fn append_to_location(mut self, suffix: &str) -> Self {
        self.location_suffix = Some(suffix.to_string());
        self
    }

    pub fn steps(&self) -> &[SessionStep] {
        &self.steps
    }

    pub fn run<S: BrowserSession + ?Sized>(&self, session: &mut S) -> Result<String, DataError> {
        for step in &self.steps {
            match step {
                SessionStep::Navigate(url) => session.navigate(url)?,
                SessionStep::OptionallySelect { control, option } => {
                    session.optionally_select(control, option)?;
                }
                SessionStep::ClickIfAllPresent(locators) => {
                    let mut all_present = true;
                    for locator in locators {
                        all_present &= session.exists(locator)?;
                    }
                    if all_present {
                        for locator in locators {
                            session.click(locator)?;
                        }
                    }
                }
                SessionStep::Click(locator) => session.click(locator)?,
                SessionStep::AwaitFixed(duration) => session.await_fixed(*duration),
            }
        }
        let location = session.current_location()?;
        Ok(match &self.location_suffix {
            Some(suffix) => format!("{location}{suffix}"),
            None => location,
        })
    }
}

/// Drives `script` in a fresh session and downloads whatever the final location points at.
///
/// Never fails: any error is logged and `None` returned, leaving `destination`
/// absent for the next pipeline phase to notice.
pub fn fetch_via_session<B, R>(
    launcher: &B,
    remote: &R,
    script: &InteractionScript,
    destination: &Utf8Path,
) -> Option<String>
where
    B: BrowserLauncher + ?Sized,
    R: RemoteSource + ?Sized,
{
    let outcome = resolve_download_url(launcher, script).and_then(|url| {
        remote.download(&url, destination)?;
        Ok(url)
    });
    match outcome {
        Ok(url) => {
            info!(%url, path = %destination, "raw data downloaded");
            Some(url)
        }
        Err(err) => {
            warn!(error = %err, "cannot load the website");
            None
        }
    }
}

fn resolve_download_url<B: BrowserLauncher + ?Sized>(
    launcher: &B,
    script: &InteractionScript,
) -> Result<String, DataError> {
    let mut session = launcher.launch()?;
    let result = script.run(&mut session);
    if let Err(err) = session.quit() {
        debug!(error = %err, "failed to close browser session");
    }
    result
}
