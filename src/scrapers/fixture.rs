//! In-memory [`PageDriver`] serving static HTML, for exercising the walk
//! without a browser.

use std::collections::HashMap;
use std::time::Duration;

use scraper::{Html, Selector};

use crate::error::DriverError;
use crate::scrapers::traits::{DriverResult, PageDriver};

#[derive(Debug, Default)]
pub struct FixtureDriver {
    pages: HashMap<String, String>,
    clicks: HashMap<(String, String), String>,
    selects: HashMap<(String, String, String), String>,
    current: Option<String>,
    /// Every URL the driver landed on, in order
    pub visited: Vec<String>,
}

impl FixtureDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Clicking `selector` on `from` loads `to`
    pub fn on_click(mut self, from: &str, selector: &str, to: &str) -> Self {
        self.clicks
            .insert((from.to_string(), selector.to_string()), to.to_string());
        self
    }

    /// Choosing `value` in `selector` on `from` loads `to`
    pub fn on_select(mut self, from: &str, selector: &str, value: &str, to: &str) -> Self {
        self.selects.insert(
            (from.to_string(), selector.to_string(), value.to_string()),
            to.to_string(),
        );
        self
    }

    fn land(&mut self, url: &str) -> DriverResult<()> {
        if !self.pages.contains_key(url) {
            return Err(DriverError::new(format!("no page at {url}")));
        }
        self.current = Some(url.to_string());
        self.visited.push(url.to_string());
        Ok(())
    }

    fn current_html(&self) -> DriverResult<&str> {
        self.current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .map(String::as_str)
            .ok_or_else(|| DriverError::new("no page loaded"))
    }

    fn require(&self, selector: &str) -> DriverResult<()> {
        let parsed = Selector::parse(selector)
            .map_err(|e| DriverError::new(format!("bad selector '{selector}': {e:?}")))?;
        let document = Html::parse_document(self.current_html()?);
        if document.select(&parsed).next().is_none() {
            return Err(DriverError::new(format!("element '{selector}' never appeared")));
        }
        Ok(())
    }
}

impl PageDriver for FixtureDriver {
    fn goto(&mut self, url: &str, _timeout: Duration) -> DriverResult<()> {
        self.land(url)
    }

    fn wait_for(&mut self, selector: &str, _timeout: Duration) -> DriverResult<()> {
        self.require(selector)
    }

    fn click(&mut self, selector: &str) -> DriverResult<()> {
        self.require(selector)?;
        let key = (self.current_url(), selector.to_string());
        match self.clicks.get(&key).cloned() {
            Some(target) => self.land(&target),
            None => Ok(()),
        }
    }

    fn click_and_wait(&mut self, selector: &str, _timeout: Duration) -> DriverResult<()> {
        self.require(selector)?;
        let key = (self.current_url(), selector.to_string());
        let target = self
            .clicks
            .get(&key)
            .cloned()
            .ok_or_else(|| DriverError::new("timed out waiting for page reload"))?;
        self.land(&target)
    }

    fn select_and_wait(&mut self, selector: &str, value: &str, _timeout: Duration) -> DriverResult<()> {
        self.require(selector)?;
        let key = (self.current_url(), selector.to_string(), value.to_string());
        let target = self
            .selects
            .get(&key)
            .cloned()
            .ok_or_else(|| DriverError::new("timed out waiting for page reload"))?;
        self.land(&target)
    }

    fn html(&mut self) -> DriverResult<String> {
        self.current_html().map(str::to_string)
    }

    fn current_url(&self) -> String {
        self.current.clone().unwrap_or_default()
    }
}
