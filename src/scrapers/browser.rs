use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info};

use crate::error::DriverError;
use crate::scrapers::traits::{DriverResult, PageDriver};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Window property set before a postback; a fresh document no longer has it.
const RELOAD_MARKER: &str = "__materialScoutPending";

/// [`PageDriver`] backed by a single headless Chrome tab
pub struct ChromeDriver {
    // Chrome shuts down when the handle drops
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeDriver {
    /// Launch Chrome and open the tab the whole run works in.
    ///
    /// `timeout` becomes the tab's default wait, so element lookups and
    /// navigation share the configured ceiling.
    pub fn launch(headless: bool, timeout: Duration) -> DriverResult<Self> {
        info!("Launching {} Chrome...", if headless { "headless" } else { "headed" });

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .build()
            .map_err(|e| DriverError::new(format!("failed to build launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| DriverError::new(format!("failed to launch Chrome: {e}")))?;
        let tab = browser
            .new_tab()
            .map_err(|e| DriverError::new(format!("failed to open tab: {e}")))?;
        tab.set_default_timeout(timeout);

        Ok(Self { _browser: browser, tab })
    }

    fn eval_bool(&self, script: &str) -> DriverResult<bool> {
        let result = self.tab.evaluate(script, false).map_err(DriverError::new)?;
        Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    fn arm_reload_marker(&self) -> DriverResult<()> {
        self.tab
            .evaluate(&format!("window.{RELOAD_MARKER} = true; true"), false)
            .map_err(DriverError::new)?;
        Ok(())
    }

    /// Poll until the marker is gone and the new document is complete.
    fn wait_for_reload(&self, timeout: Duration) -> DriverResult<()> {
        let script = format!(
            "window.{RELOAD_MARKER} === undefined && document.readyState === 'complete'"
        );
        self.poll(timeout, "page reload", &script)
    }

    fn wait_for_ready_state(&self, timeout: Duration) -> DriverResult<()> {
        self.poll(timeout, "document ready", "document.readyState === 'complete'")
    }

    fn poll(&self, timeout: Duration, what: &str, script: &str) -> DriverResult<()> {
        let deadline = deadline_after(timeout);
        loop {
            // Evaluation fails while the old execution context is torn down
            match self.eval_bool(script) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e) => debug!("{what} not observable yet: {e}"),
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(DriverError::new(format!(
                    "timed out after {}s waiting for {what}",
                    timeout.as_secs()
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// `None` when the deadline lies beyond what `Instant` can represent
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

impl PageDriver for ChromeDriver {
    fn goto(&mut self, url: &str, timeout: Duration) -> DriverResult<()> {
        debug!("Navigating to {url}");
        self.tab.set_default_timeout(timeout);
        self.tab.navigate_to(url).map_err(DriverError::new)?;
        self.tab.wait_until_navigated().map_err(DriverError::new)?;
        self.wait_for_ready_state(timeout)
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> DriverResult<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| DriverError::new(format!("element '{selector}' never appeared: {e}")))?;
        Ok(())
    }

    fn click(&mut self, selector: &str) -> DriverResult<()> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|e| DriverError::new(format!("no element matches '{selector}': {e}")))?;
        element
            .click()
            .map_err(|e| DriverError::new(format!("could not click '{selector}': {e}")))?;
        Ok(())
    }

    fn click_and_wait(&mut self, selector: &str, timeout: Duration) -> DriverResult<()> {
        self.arm_reload_marker()?;
        self.click(selector)?;
        self.wait_for_reload(timeout)
    }

    fn select_and_wait(&mut self, selector: &str, value: &str, timeout: Duration) -> DriverResult<()> {
        self.arm_reload_marker()?;

        let selector_js = serde_json::to_string(selector).map_err(DriverError::new)?;
        let value_js = serde_json::to_string(value).map_err(DriverError::new)?;
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({selector_js});
                if (!el) return 'missing';
                if (el.value === {value_js}) return 'unchanged';
                el.value = {value_js};
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return 'changed';
            }})()"#
        );

        let outcome = self.tab.evaluate(&script, false).map_err(DriverError::new)?;
        match outcome.value.as_ref().and_then(|v| v.as_str()) {
            Some("changed") => self.wait_for_reload(timeout),
            Some("unchanged") => {
                debug!("'{selector}' already set to {value}");
                Ok(())
            }
            _ => Err(DriverError::new(format!("no dropdown matches '{selector}'"))),
        }
    }

    fn html(&mut self) -> DriverResult<String> {
        let result = self
            .tab
            .evaluate("document.documentElement.outerHTML", false)
            .map_err(DriverError::new)?;
        result
            .value
            .and_then(|v| v.as_str().map(str::to_string))
            .ok_or_else(|| DriverError::new("page returned no HTML"))
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }
}
