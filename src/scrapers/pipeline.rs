use tracing::{info, warn};

use crate::error::Result;
use crate::models::MaterialRecord;
use crate::scrapers::collector::LinkCollector;
use crate::scrapers::extractor::{DetailExtractor, Extraction};
use crate::scrapers::traits::PageDriver;
use crate::scrapers::types::{PageSelectors, ScoutConfig};

/// Collect links, then extract the configured slice of them.
///
/// `on_record` is called after every extracted record with all records so far.
pub fn scrape<D, F>(driver: &mut D, config: &ScoutConfig, on_record: F) -> Result<Extraction>
where
    D: PageDriver,
    F: FnMut(&[MaterialRecord]) -> Result<()>,
{
    let params = &config.run;
    params.validate()?;
    let selectors = PageSelectors::compile(&config.site)?;
    let timeout = params.wait_timeout();

    let links = LinkCollector::new(driver, &config.site, &selectors, timeout)
        .collect(params.target_count())?;

    info!(
        "Extracting links {}..{} of {} collected",
        params.start,
        params.end.min(links.len()),
        links.len()
    );

    let extraction = DetailExtractor::new(driver, &selectors, timeout)
        .continue_on_error(params.continue_on_error)
        .extract_all(&links, params.start..params.end, on_record)?;

    if !extraction.skipped.is_empty() {
        warn!("{} links were skipped after errors", extraction.skipped.len());
    }

    Ok(extraction)
}
