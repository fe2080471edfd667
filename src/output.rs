use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::models::MaterialRecord;

/// Pretty-printed JSON array of records
pub fn render(records: &[MaterialRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp: OsString = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Write the records to `path`, replacing any previous file in one rename
pub async fn save(path: &Path, records: &[MaterialRecord]) -> Result<()> {
    let json = render(records)?;
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    info!("💾 Saved {} materials to {}", records.len(), path.display());
    Ok(())
}

/// Blocking variant of [`save`] for use inside the browser walk
pub fn save_blocking(path: &Path, records: &[MaterialRecord]) -> Result<()> {
    let json = render(records)?;
    let tmp = temp_path(path);
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Rewrites the output file every `every` records when enabled
#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
    every: Option<usize>,
}

impl Checkpoint {
    pub fn new(path: impl Into<PathBuf>, every: Option<usize>) -> Self {
        Self {
            path: path.into(),
            every,
        }
    }

    pub fn observe(&self, records: &[MaterialRecord]) -> Result<()> {
        match self.every {
            Some(every) if every > 0 && records.len() % every == 0 => {
                save_blocking(&self.path, records)?;
                debug!("Checkpointed {} materials to {}", records.len(), self.path.display());
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
