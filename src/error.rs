use std::fmt;

use thiserror::Error;

/// The navigation step that was in progress when a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Load,
    Category(usize),
    Submit,
    PageSize,
    Pagination,
    Detail,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Load => write!(f, "page load"),
            Step::Category(n) => write!(f, "category click #{}", n + 1),
            Step::Submit => write!(f, "search submit"),
            Step::PageSize => write!(f, "page-size selection"),
            Step::Pagination => write!(f, "pagination"),
            Step::Detail => write!(f, "detail page load"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{step} failed at {url}: {reason}")]
    Navigation {
        step: Step,
        url: String,
        reason: String,
    },

    #[error("unexpected page structure at {url}: {what}")]
    Structure { url: String, what: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ScrapeError {
    pub fn navigation(step: Step, url: impl Into<String>, reason: impl fmt::Display) -> Self {
        ScrapeError::Navigation {
            step,
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn structure(url: impl Into<String>, what: impl Into<String>) -> Self {
        ScrapeError::Structure {
            url: url.into(),
            what: what.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Failure reported by a page driver, before the caller attaches the step
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DriverError(pub String);

impl DriverError {
    pub fn new(reason: impl fmt::Display) -> Self {
        DriverError(reason.to_string())
    }
}
