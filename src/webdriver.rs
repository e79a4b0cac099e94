//! Minimal W3C WebDriver client (chromedriver, geckodriver, Selenium).
//!
//! Only the handful of commands the Swift interaction scripts need are
//! implemented.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::DataError;
use crate::session::{BrowserLauncher, BrowserSession, Locator};

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebDriverSettings {
    #[serde(default = "default_webdriver_url")]
    pub url: String,
    #[serde(default)]
    pub browser: Browser,
    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            url: default_webdriver_url(),
            browser: Browser::default(),
            headless: default_headless(),
        }
    }
}

pub fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

#[derive(Clone)]
pub struct WebDriverLauncher {
    client: Client,
    settings: WebDriverSettings,
}

impl WebDriverLauncher {
    pub fn new(settings: WebDriverSettings) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| DataError::Browser(err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn capabilities(&self) -> Value {
        let args: Vec<&str> = if self.settings.headless {
            vec!["--headless"]
        } else {
            Vec::new()
        };
        match self.settings.browser {
            Browser::Chrome => json!({
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args },
            }),
            Browser::Firefox => json!({
                "browserName": "firefox",
                "moz:firefoxOptions": { "args": args },
            }),
        }
    }
}

impl BrowserLauncher for WebDriverLauncher {
    type Session = WebDriverSession;

    fn launch(&self) -> Result<Self::Session, DataError> {
        let base_url = self.settings.url.trim_end_matches('/').to_string();
        let body = json!({ "capabilities": { "alwaysMatch": self.capabilities() } });
        let value = send(&self.client, Method::Post, &format!("{base_url}/session"), Some(body))?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DataError::Browser("new session response without sessionId".to_string()))?
            .to_string();
        debug!(%session_id, "webdriver session started");
        Ok(WebDriverSession {
            client: self.client.clone(),
            base_url,
            session_id,
            closed: false,
        })
    }
}

pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
    closed: bool,
}

impl WebDriverSession {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, path)
    }

    fn find_all(&self, locator: &Locator) -> Result<Vec<String>, DataError> {
        let (using, value) = strategy(locator);
        let found = send(
            &self.client,
            Method::Post,
            &self.endpoint("/elements"),
            Some(json!({ "using": using, "value": value })),
        )?;
        Ok(found
            .as_array()
            .map(|elements| {
                elements
                    .iter()
                    .filter_map(|element| element.get(ELEMENT_KEY).and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl BrowserSession for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<(), DataError> {
        send(
            &self.client,
            Method::Post,
            &self.endpoint("/url"),
            Some(json!({ "url": url })),
        )?;
        Ok(())
    }

    fn exists(&mut self, locator: &Locator) -> Result<bool, DataError> {
        Ok(!self.find_all(locator)?.is_empty())
    }

    fn click(&mut self, locator: &Locator) -> Result<(), DataError> {
        let element = self
            .find_all(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| DataError::Browser(format!("no such element: {locator:?}")))?;
        send(
            &self.client,
            Method::Post,
            &self.endpoint(&format!("/element/{element}/click")),
            Some(json!({})),
        )?;
        Ok(())
    }

    fn current_location(&mut self) -> Result<String, DataError> {
        let value = send(&self.client, Method::Get, &self.endpoint("/url"), None)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DataError::Browser("current URL is not a string".to_string()))
    }

    fn quit(&mut self) -> Result<(), DataError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        send(&self.client, Method::Delete, &self.endpoint(""), None)?;
        Ok(())
    }
}

enum Method {
    Get,
    Post,
    Delete,
}

fn strategy(locator: &Locator) -> (&'static str, String) {
    match locator {
        Locator::Id(id) => ("xpath", format!(".//*[@id='{id}']")),
        Locator::XPath(xpath) => ("xpath", xpath.clone()),
        Locator::LinkText(text) => ("link text", text.clone()),
        Locator::PartialLinkText(text) => ("partial link text", text.clone()),
    }
}

/// Sends one command and unwraps the `value` member of the response.
fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value, DataError> {
    let request = match method {
        Method::Get => client.get(url),
        Method::Post => client.post(url).json(&body.unwrap_or_else(|| json!({}))),
        Method::Delete => client.delete(url),
    };
    let response = request
        .send()
        .map_err(|err| DataError::Browser(err.to_string()))?;
    let status = response.status();
    let payload: Value = response
        .json()
        .map_err(|err| DataError::Browser(err.to_string()))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);
    if !status.is_success() {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| value.get("error").and_then(Value::as_str))
            .unwrap_or("webdriver command failed");
        return Err(DataError::Browser(format!("{}: {message}", status.as_u16())));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_locators_become_xpath() {
        let (using, value) = strategy(&Locator::id("xrt_DENSITY_makeDownload"));
        assert_eq!(using, "xpath");
        assert_eq!(value, ".//*[@id='xrt_DENSITY_makeDownload']");
    }

    #[test]
    fn settings_default_from_empty_json() {
        let settings: WebDriverSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, WebDriverSettings::default());
        assert_eq!(settings.browser, Browser::Chrome);
        assert!(settings.headless);
    }
}
