use std::time::Duration;

use crate::error::DriverError;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Browser surface the link collector and detail extractor drive.
///
/// Every wait is condition based and bounded by the timeout passed in.
pub trait PageDriver {
    /// Navigate to `url` and wait until the document has finished loading
    fn goto(&mut self, url: &str, timeout: Duration) -> DriverResult<()>;

    /// Wait until an element matching `selector` is present
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> DriverResult<()>;

    /// Click an element that changes the page in place
    fn click(&mut self, selector: &str) -> DriverResult<()>;

    /// Click an element that reloads the page, and wait for the new page
    fn click_and_wait(&mut self, selector: &str, timeout: Duration) -> DriverResult<()>;

    /// Pick `value` in a dropdown, waiting for the reload if the choice changed
    fn select_and_wait(&mut self, selector: &str, value: &str, timeout: Duration) -> DriverResult<()>;

    /// Serialized markup of the live document
    fn html(&mut self) -> DriverResult<String>;

    fn current_url(&self) -> String;
}
