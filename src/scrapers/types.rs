use std::path::{Path, PathBuf};
use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};

/// One click along the category-selection path
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NavStep {
    /// Element to click
    pub selector: String,
    /// Element that must appear before the walk moves on
    #[serde(default)]
    pub wait_for: Option<String>,
    /// Whether the click posts the page back to the server
    #[serde(default)]
    pub reloads: bool,
}

/// Selector-by-role table for the materials site.
///
/// Defaults reproduce the refractory-ceramics category on MatWeb. Changing
/// the category or following a markup change only touches this table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Search page the walk starts from
    pub search_url: String,
    /// Clicks that select the category, in order
    pub category_path: Vec<NavStep>,
    /// Search form submit control
    pub submit: String,
    /// Results page-size dropdown; `None` keeps the site default
    pub page_size_select: Option<String>,
    /// Option value to pick in the page-size dropdown
    pub page_size: String,
    /// One row per search result
    pub results_rows: String,
    /// Detail-page anchor inside a result row
    pub detail_link_cell: String,
    /// Next-page control on the results listing
    pub next_page: String,
    /// Header cell holding the material name on a detail page
    pub name_header: String,
    /// Rows of the main property table
    pub property_table_rows: String,
    /// Header cell that marks a group-header row
    pub group_header_cell: String,
    /// Class that marks a data row
    pub data_row_class: String,
    /// Value cells inside a data row
    pub data_cell: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.matweb.com/search/MaterialGroupSearch.aspx".to_string(),
            category_path: vec![
                NavStep {
                    selector: "#ctl00_ContentMain_ucMatGroupTree_msTreeViewn1".to_string(),
                    wait_for: Some("#ctl00_ContentMain_ucMatGroupTree_msTreeViewn1Nodes".to_string()),
                    reloads: false,
                },
                NavStep {
                    selector: "#ctl00_ContentMain_ucMatGroupTree_msTreeViewt9".to_string(),
                    wait_for: None,
                    reloads: false,
                },
            ],
            submit: r#"input[name="ctl00$ContentMain$btnSubmit"]"#.to_string(),
            page_size_select: Some(
                r#"select[name="ctl00$ContentMain$UcSearchResults1$drpPageSize2"]"#.to_string(),
            ),
            page_size: "200".to_string(),
            results_rows: "#tblResults tr".to_string(),
            detail_link_cell: "td:nth-child(3) a".to_string(),
            next_page: "a#ctl00_ContentMain_UcSearchResults1_lnkNextPage2".to_string(),
            name_header: "table.tabledataformat.t_ableborder.tableloose.altrow th".to_string(),
            property_table_rows: "table:nth-of-type(2) tr".to_string(),
            group_header_cell: "th".to_string(),
            data_row_class: "datarowSeparator".to_string(),
            data_cell: "td".to_string(),
        }
    }
}

/// Selectors from [`SiteConfig`] parsed once for the HTML side of the walk
#[derive(Debug, Clone)]
pub struct PageSelectors {
    pub results_rows: Selector,
    pub detail_link_cell: Selector,
    pub next_page: Selector,
    pub name_header: Selector,
    pub property_table_rows: Selector,
    pub group_header_cell: Selector,
    pub data_cell: Selector,
    pub data_row_class: String,
}

impl PageSelectors {
    pub fn compile(site: &SiteConfig) -> Result<Self> {
        Ok(Self {
            results_rows: parse_selector("results_rows", &site.results_rows)?,
            detail_link_cell: parse_selector("detail_link_cell", &site.detail_link_cell)?,
            next_page: parse_selector("next_page", &site.next_page)?,
            name_header: parse_selector("name_header", &site.name_header)?,
            property_table_rows: parse_selector("property_table_rows", &site.property_table_rows)?,
            group_header_cell: parse_selector("group_header_cell", &site.group_header_cell)?,
            data_cell: parse_selector("data_cell", &site.data_cell)?,
            data_row_class: site.data_row_class.clone(),
        })
    }
}

fn parse_selector(role: &str, selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Config(format!("invalid {role} selector '{selector}': {e:?}")))
}

/// Upper bound accepted for `wait_timeout_secs`
pub const MAX_WAIT_SECS: u64 = 3600;

/// Parameters for one scrape run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunParams {
    /// First link index to extract (inclusive)
    pub start: usize,
    /// Last link index to extract (exclusive)
    pub end: usize,
    /// Link count at which collection may stop; defaults to `end`
    pub target_count: Option<usize>,
    /// JSON file the records are written to
    pub output: PathBuf,
    /// Ceiling for every condition-based wait, in seconds
    pub wait_timeout_secs: u64,
    pub headless: bool,
    /// Rewrite the output file after every N records
    pub flush_every: Option<usize>,
    /// Skip links that fail to extract instead of aborting the run
    pub continue_on_error: bool,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            start: 0,
            end: 5,
            target_count: None,
            output: PathBuf::from("refractory_ceramics.json"),
            wait_timeout_secs: 30,
            headless: true,
            flush_every: None,
            continue_on_error: false,
        }
    }
}

impl RunParams {
    pub fn target_count(&self) -> usize {
        self.target_count.unwrap_or(self.end)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(ScrapeError::Config(format!(
                "start index {} is past end index {}",
                self.start, self.end
            )));
        }
        if !(1..=MAX_WAIT_SECS).contains(&self.wait_timeout_secs) {
            return Err(ScrapeError::Config(format!(
                "wait timeout must be between 1 and {MAX_WAIT_SECS} seconds"
            )));
        }
        if self.flush_every == Some(0) {
            return Err(ScrapeError::Config("flush interval must be at least one record".to_string()));
        }
        Ok(())
    }
}

/// Contents of a `scout.toml` file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoutConfig {
    pub site: SiteConfig,
    pub run: RunParams,
}

impl ScoutConfig {
    /// Load from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
