pub mod browser;
pub mod collector;
pub mod extractor;
#[cfg(test)]
pub mod fixture;
pub mod pipeline;
pub mod traits;
pub mod types;

pub use browser::ChromeDriver;
pub use pipeline::scrape;
pub use types::ScoutConfig;
