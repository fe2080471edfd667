use std::ops::Range;
use std::time::Duration;

use scraper::node::Element;
use scraper::{ElementRef, Html, Node};
use tracing::{debug, info, warn};

use crate::error::{Result, ScrapeError, Step};
use crate::models::{MaterialRecord, PropertyGroups, PropertyRow};
use crate::scrapers::traits::PageDriver;
use crate::scrapers::types::PageSelectors;

/// Name used when a detail page has no name header
pub const NO_NAME: &str = "No name available";

/// How a property-table row is treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRow {
    /// Starts a new property group
    GroupHeader(String),
    /// Cell texts of a data row, already trimmed
    Data(Vec<String>),
    Other,
}

/// Folds classified rows into ordered property groups.
///
/// Tracks the group opened by the last header row. Data rows seen before any
/// header land in the `""` group. A blank name cell reuses the name of the
/// previous row in the same group.
#[derive(Debug, Default)]
pub struct PropertyTableBuilder {
    current_group: String,
    groups: PropertyGroups,
}

impl PropertyTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: TableRow) {
        match row {
            TableRow::GroupHeader(name) => {
                self.groups.entry(name.clone()).or_default();
                self.current_group = name;
            }
            TableRow::Data(cells) => self.push_data(cells),
            TableRow::Other => {}
        }
    }

    fn push_data(&mut self, cells: Vec<String>) {
        let mut cells = cells.into_iter();
        let mut next = || cells.next().unwrap_or_default();
        let name = next();
        let metric_value = next();
        let english_value = next();
        let comments = next();

        let rows = self.groups.entry(self.current_group.clone()).or_default();
        let property_name = if name.is_empty() {
            rows.last().map(|r| r.property_name.clone()).unwrap_or_default()
        } else {
            name
        };

        rows.push(PropertyRow {
            property_name,
            metric_value,
            english_value,
            comments,
        });
    }

    pub fn finish(self) -> PropertyGroups {
        self.groups
    }
}

/// Elements whose text never shows up in rendered output
const UNRENDERED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

fn is_unrendered(element: &Element) -> bool {
    UNRENDERED_TAGS.contains(&element.name())
        || element.attr("hidden").is_some()
        || element.attr("style").is_some_and(|style| {
            style
                .split(';')
                .filter_map(|decl| decl.split_once(':'))
                .any(|(prop, value)| {
                    prop.trim().eq_ignore_ascii_case("display")
                        && value.trim().eq_ignore_ascii_case("none")
                })
        })
}

/// Visible text of an element with whitespace runs collapsed and ends trimmed.
///
/// Skips script, style and hidden descendants. Hiding through stylesheets is
/// not visible to the parser and still counts as text.
pub fn cell_text(element: ElementRef<'_>) -> String {
    let mut words = Vec::new();
    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != element.id())
            .filter_map(|ancestor| ancestor.value().as_element())
            .any(is_unrendered);
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

fn classify(row: ElementRef<'_>, selectors: &PageSelectors) -> TableRow {
    let class = row.value().attr("class").unwrap_or("");

    if class.is_empty() {
        if let Some(header) = row.select(&selectors.group_header_cell).next() {
            return TableRow::GroupHeader(cell_text(header));
        }
    }

    if row.value().classes().any(|c| c == selectors.data_row_class) {
        let cells = row.select(&selectors.data_cell).take(4).map(cell_text).collect();
        return TableRow::Data(cells);
    }

    TableRow::Other
}

/// Parse one detail page into a [`MaterialRecord`].
///
/// A missing name header falls back to [`NO_NAME`]. A missing property table,
/// or a data row without cells, is a structural error.
pub fn parse_material(html: &str, url: &str, selectors: &PageSelectors) -> Result<MaterialRecord> {
    let document = Html::parse_document(html);

    let name = document
        .select(&selectors.name_header)
        .next()
        .map(cell_text)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| NO_NAME.to_string());

    let mut rows = document.select(&selectors.property_table_rows).peekable();
    if rows.peek().is_none() {
        return Err(ScrapeError::structure(url, "property table not found"));
    }

    let mut table = PropertyTableBuilder::new();
    for (index, row) in rows.enumerate() {
        let row = classify(row, selectors);
        if matches!(&row, TableRow::Data(cells) if cells.is_empty()) {
            return Err(ScrapeError::structure(
                url,
                format!("data row {index} has no cells"),
            ));
        }
        table.push(row);
    }

    Ok(MaterialRecord {
        name,
        properties: table.finish(),
    })
}

/// Records from one extraction pass
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<MaterialRecord>,
    /// Links abandoned under `continue_on_error`, with the reason
    pub skipped: Vec<(String, ScrapeError)>,
}

/// Visits detail pages and parses their property tables
pub struct DetailExtractor<'a, D: PageDriver> {
    driver: &'a mut D,
    selectors: &'a PageSelectors,
    timeout: Duration,
    continue_on_error: bool,
}

impl<'a, D: PageDriver> DetailExtractor<'a, D> {
    pub fn new(driver: &'a mut D, selectors: &'a PageSelectors, timeout: Duration) -> Self {
        Self {
            driver,
            selectors,
            timeout,
            continue_on_error: false,
        }
    }

    /// Log and skip failing links instead of aborting the pass
    pub fn continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    pub fn extract(&mut self, link: &str) -> Result<MaterialRecord> {
        self.driver
            .goto(link, self.timeout)
            .map_err(|e| ScrapeError::navigation(Step::Detail, link, e))?;
        let html = self
            .driver
            .html()
            .map_err(|e| ScrapeError::navigation(Step::Detail, link, e))?;
        parse_material(&html, link, self.selectors)
    }

    /// Extract `links[range]` in order. `on_record` sees the records so far
    /// after each one is added.
    pub fn extract_all<F>(&mut self, links: &[String], range: Range<usize>, mut on_record: F) -> Result<Extraction>
    where
        F: FnMut(&[MaterialRecord]) -> Result<()>,
    {
        let end = range.end.min(links.len());
        let start = range.start.min(end);
        if end < range.end {
            warn!("Requested links up to {} but only {} were collected", range.end, links.len());
        }

        let mut extraction = Extraction::default();
        for link in &links[start..end] {
            info!("Scraping: {link}");
            match self.extract(link) {
                Ok(record) => {
                    info!("Saved material: {} ({} property groups)", record.name, record.properties.len());
                    debug!("{record:#?}");
                    extraction.records.push(record);
                    on_record(&extraction.records)?;
                }
                Err(e) if self.continue_on_error => {
                    warn!("Skipping {link}: {e}");
                    extraction.skipped.push((link.clone(), e));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(extraction)
    }
}
