use std::collections::HashSet;
use std::time::Duration;

use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{DriverError, Result, ScrapeError, Step};
use crate::scrapers::traits::PageDriver;
use crate::scrapers::types::{PageSelectors, SiteConfig};

/// State of the listing's next-page control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    Missing,
    Disabled,
    Enabled,
}

/// Walks the category path to the results listing and harvests detail links
pub struct LinkCollector<'a, D: PageDriver> {
    driver: &'a mut D,
    site: &'a SiteConfig,
    selectors: &'a PageSelectors,
    timeout: Duration,
}

impl<'a, D: PageDriver> LinkCollector<'a, D> {
    pub fn new(
        driver: &'a mut D,
        site: &'a SiteConfig,
        selectors: &'a PageSelectors,
        timeout: Duration,
    ) -> Self {
        Self {
            driver,
            site,
            selectors,
            timeout,
        }
    }

    /// Collect detail links until `target_count` is reached or pagination
    /// runs out. The last page is kept whole, so the result may overshoot.
    pub fn collect(&mut self, target_count: usize) -> Result<Vec<String>> {
        self.open_results()?;

        let mut links: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut page = 1;

        loop {
            info!("Extracting material links from results page {page}...");
            let url = self.driver.current_url();
            let html = self
                .driver
                .html()
                .map_err(|e| ScrapeError::navigation(Step::Pagination, &url, e))?;

            let found = extract_links(&html, &url, self.selectors);
            let repeats = found.iter().filter(|link| !seen.insert((*link).clone())).count();
            if repeats > 0 {
                warn!("{repeats} of {} links on page {page} were already collected", found.len());
            }

            let new_count = found.len();
            links.extend(found);
            info!("Found {new_count} new links, total: {}", links.len());

            if links.len() >= target_count {
                debug!("Reached target of {target_count} links");
                break;
            }

            match next_page_state(&html, self.selectors) {
                NextPage::Enabled => {
                    self.driver
                        .click_and_wait(&self.site.next_page, self.timeout)
                        .map_err(|e| ScrapeError::navigation(Step::Pagination, &url, e))?;
                    page += 1;
                }
                NextPage::Disabled | NextPage::Missing => {
                    debug!("No further results pages");
                    break;
                }
            }
        }

        info!("Total materials found: {}", links.len());
        Ok(links)
    }

    fn open_results(&mut self) -> Result<()> {
        let site = self.site;
        let timeout = self.timeout;

        info!("Navigating to {}...", site.search_url);
        self.driver
            .goto(&site.search_url, timeout)
            .map_err(|e| ScrapeError::navigation(Step::Load, &site.search_url, e))?;

        for (i, step) in site.category_path.iter().enumerate() {
            info!("Selecting category step {} ({})...", i + 1, step.selector);
            let url = self.driver.current_url();
            let fail = |e: DriverError| ScrapeError::navigation(Step::Category(i), &url, e);

            self.driver.wait_for(&step.selector, timeout).map_err(fail)?;
            if step.reloads {
                self.driver.click_and_wait(&step.selector, timeout).map_err(fail)?;
            } else {
                self.driver.click(&step.selector).map_err(fail)?;
            }
            if let Some(ready) = &step.wait_for {
                self.driver.wait_for(ready, timeout).map_err(fail)?;
            }
        }

        info!("Submitting search...");
        let url = self.driver.current_url();
        self.driver
            .wait_for(&site.submit, timeout)
            .and_then(|_| self.driver.click_and_wait(&site.submit, timeout))
            .map_err(|e| ScrapeError::navigation(Step::Submit, &url, e))?;

        if let Some(select) = &site.page_size_select {
            info!("Setting results page size to {}...", site.page_size);
            let url = self.driver.current_url();
            self.driver
                .wait_for(select, timeout)
                .and_then(|_| self.driver.select_and_wait(select, &site.page_size, timeout))
                .map_err(|e| ScrapeError::navigation(Step::PageSize, &url, e))?;
        }

        Ok(())
    }
}

/// Absolute detail links from a results page, one per row that has one
pub fn extract_links(html: &str, page_url: &str, selectors: &PageSelectors) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    document
        .select(&selectors.results_rows)
        .filter_map(|row| row.select(&selectors.detail_link_cell).next())
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .map(|href| resolve(base.as_ref(), href.trim()))
        .collect()
}

fn resolve(base: Option<&Url>, href: &str) -> String {
    match base.map(|b| b.join(href)) {
        Some(Ok(url)) => url.to_string(),
        _ => href.to_string(),
    }
}

pub fn next_page_state(html: &str, selectors: &PageSelectors) -> NextPage {
    let document = Html::parse_document(html);
    match document.select(&selectors.next_page).next() {
        None => NextPage::Missing,
        Some(control) if control.value().attr("disabled").is_some() => NextPage::Disabled,
        Some(_) => NextPage::Enabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fixture::FixtureDriver;
    use crate::scrapers::types::NavStep;

    const SEARCH: &str = "https://materials.test/search";
    const RESULTS_1: &str = "https://materials.test/results?page=1";
    const RESULTS_2: &str = "https://materials.test/results?page=2";
    const RESULTS_3: &str = "https://materials.test/results?page=3";

    fn site() -> SiteConfig {
        SiteConfig {
            search_url: SEARCH.to_string(),
            category_path: vec![
                NavStep {
                    selector: "#ceramics".to_string(),
                    wait_for: Some("#ceramics-nodes".to_string()),
                    reloads: false,
                },
                NavStep {
                    selector: "#refractory".to_string(),
                    wait_for: None,
                    reloads: false,
                },
            ],
            submit: "#submit".to_string(),
            page_size_select: Some("#page-size".to_string()),
            page_size: "200".to_string(),
            results_rows: "#tblResults tr".to_string(),
            detail_link_cell: "td:nth-child(3) a".to_string(),
            next_page: "a#next".to_string(),
            ..Default::default()
        }
    }

    fn search_page() -> &'static str {
        r#"<html><body>
            <a id="ceramics">Ceramic</a>
            <div id="ceramics-nodes"><a id="refractory">Refractory</a></div>
            <input id="submit" type="submit">
        </body></html>"#
    }

    fn results_page(ids: &[u32], next: Option<&str>) -> String {
        let rows: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<tr><td>{id}</td><td><input type="checkbox"></td><td><a href="/search/DataSheet.aspx?id={id}">Material {id}</a></td></tr>"#
                )
            })
            .collect();
        let next = match next {
            Some(attrs) => format!(r#"<a id="next" {attrs}>Next</a>"#),
            None => String::new(),
        };
        format!(
            r#"<html><body><select id="page-size"><option>50</option><option>200</option></select>
            <table id="tblResults"><tr><th>#</th><th></th><th>Name</th></tr>{rows}</table>{next}</body></html>"#
        )
    }

    fn driver(pages: &[(&str, String)]) -> FixtureDriver {
        let mut driver = FixtureDriver::new()
            .page(SEARCH, search_page())
            .page("https://materials.test/results?size=50", results_page(&[], None).as_str())
            .on_click(SEARCH, "#submit", "https://materials.test/results?size=50")
            .on_select("https://materials.test/results?size=50", "#page-size", "200", RESULTS_1);
        for (url, html) in pages {
            driver = driver.page(url, html);
        }
        driver
            .on_click(RESULTS_1, "a#next", RESULTS_2)
            .on_click(RESULTS_2, "a#next", RESULTS_3)
    }

    fn collect(driver: &mut FixtureDriver, target: usize) -> Result<Vec<String>> {
        let site = site();
        let selectors = PageSelectors::compile(&site).unwrap();
        LinkCollector::new(driver, &site, &selectors, Duration::from_secs(1)).collect(target)
    }

    #[test]
    fn stops_on_the_page_that_reaches_the_target() {
        let mut driver = driver(&[
            (RESULTS_1, results_page(&[1, 2, 3], Some(""))),
            (RESULTS_2, results_page(&[4, 5, 6], Some(""))),
            (RESULTS_3, results_page(&[7, 8, 9], Some(""))),
        ]);

        let links = collect(&mut driver, 5).unwrap();

        assert_eq!(links.len(), 6);
        assert_eq!(links[0], "https://materials.test/search/DataSheet.aspx?id=1");
        assert_eq!(links[5], "https://materials.test/search/DataSheet.aspx?id=6");
        assert!(!driver.visited.contains(&RESULTS_3.to_string()));
    }

    #[test]
    fn stops_when_next_control_is_disabled() {
        let mut driver = driver(&[
            (RESULTS_1, results_page(&[1, 2], Some(""))),
            (RESULTS_2, results_page(&[3], Some(r#"disabled="disabled""#))),
        ]);

        let links = collect(&mut driver, 100).unwrap();

        assert_eq!(links.len(), 3);
        assert_eq!(driver.visited.last().unwrap(), RESULTS_2);
    }

    #[test]
    fn stops_when_next_control_is_missing() {
        let mut driver = driver(&[(RESULTS_1, results_page(&[1, 2], None))]);

        let links = collect(&mut driver, 100).unwrap();

        assert_eq!(links.len(), 2);
    }

    #[test]
    fn empty_listing_yields_no_links() {
        let mut driver = driver(&[(RESULTS_1, results_page(&[], None))]);

        let links = collect(&mut driver, 5).unwrap();

        assert!(links.is_empty());
    }

    #[test]
    fn repeated_page_keeps_duplicates() {
        let mut driver = driver(&[
            (RESULTS_1, results_page(&[1, 2], Some(""))),
            (RESULTS_2, results_page(&[1, 2], None)),
        ]);

        let links = collect(&mut driver, 100).unwrap();

        assert_eq!(links.len(), 4);
        assert_eq!(links[0], links[2]);
    }

    #[test]
    fn missing_category_names_the_step() {
        let mut driver = FixtureDriver::new().page(SEARCH, "<html><body></body></html>");

        let err = collect(&mut driver, 5).unwrap_err();

        match err {
            ScrapeError::Navigation { step, url, .. } => {
                assert_eq!(step, Step::Category(0));
                assert_eq!(url, SEARCH);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn failed_page_size_selection_names_the_step() {
        let mut driver = FixtureDriver::new()
            .page(SEARCH, search_page())
            .page("https://materials.test/results?size=50", "<html><body></body></html>")
            .on_click(SEARCH, "#submit", "https://materials.test/results?size=50");

        let err = collect(&mut driver, 5).unwrap_err();

        assert!(matches!(err, ScrapeError::Navigation { step: Step::PageSize, .. }));
    }

    #[test]
    fn rows_without_a_detail_anchor_are_skipped() {
        let site = site();
        let selectors = PageSelectors::compile(&site).unwrap();
        let html = r#"<table id="tblResults">
            <tr><td>1</td><td></td><td><a href="https://other.test/a">A</a></td></tr>
            <tr><td>2</td><td></td><td>no link</td></tr>
            <tr><td>3</td><td></td><td><a>no href</a></td></tr>
            <tr><td><a href="/wrong-cell">x</a></td><td></td><td></td></tr>
        </table>"#;

        let links = extract_links(html, RESULTS_1, &selectors);

        assert_eq!(links, vec!["https://other.test/a".to_string()]);
    }
}
