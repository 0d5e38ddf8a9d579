//! Writing the output artifacts.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use url::Url;

use crate::config::SieveConfig;
use crate::error::{SieveError, SieveResult};
use crate::status_page::StatusPage;

/// Everything a publisher needs from one pipeline run.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub calendar: Vec<u8>,
    pub included: usize,
    pub generated_at: DateTime<Utc>,
}

pub trait Publisher {
    /// Publish both artifacts, or neither.
    fn publish(&self, artifacts: &Artifacts) -> SieveResult<()>;
}

/// Publishes into a local directory (e.g. one served by a static site host).
#[derive(Debug, Clone)]
pub struct DirPublisher {
    pub output_dir: PathBuf,
    pub calendar_file: String,
    pub status_page_file: String,
    pub title: String,
    pub public_url: Option<Url>,
}

impl DirPublisher {
    /// Publisher writing into `output_dir` with the configured file names.
    pub fn from_config(config: &SieveConfig) -> Self {
        DirPublisher {
            output_dir: config.output_dir.clone(),
            calendar_file: config.calendar_file.clone(),
            status_page_file: config.status_page_file.clone(),
            title: config
                .calendar_name
                .clone()
                .unwrap_or_else(|| "Calendar".to_string()),
            public_url: config.public_url.clone(),
        }
    }

    pub fn calendar_path(&self) -> PathBuf {
        self.output_dir.join(&self.calendar_file)
    }

    pub fn status_page_path(&self) -> PathBuf {
        self.output_dir.join(&self.status_page_file)
    }

    fn render_status_page(&self, artifacts: &Artifacts) -> String {
        StatusPage {
            title: &self.title,
            calendar_file: &self.calendar_file,
            included: artifacts.included,
            updated_at: artifacts.generated_at,
            public_url: self.public_url.as_ref(),
        }
        .render()
    }
}

impl Publisher for DirPublisher {
    fn publish(&self, artifacts: &Artifacts) -> SieveResult<()> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| SieveError::publish(&self.output_dir, e))?;

        let page = self.render_status_page(artifacts);

        // Stage both files before touching either destination
        let calendar_tmp = stage(&self.output_dir, &artifacts.calendar)?;
        let page_tmp = stage(&self.output_dir, page.as_bytes())?;

        let calendar_path = self.calendar_path();
        calendar_tmp
            .persist(&calendar_path)
            .map_err(|e| SieveError::publish(&calendar_path, e.error))?;

        let page_path = self.status_page_path();
        page_tmp
            .persist(&page_path)
            .map_err(|e| SieveError::publish(&page_path, e.error))?;

        Ok(())
    }
}

/// Write `contents` to a temporary file inside `dir`, so the final rename
/// stays on one filesystem.
fn stage(dir: &Path, contents: &[u8]) -> SieveResult<NamedTempFile> {
    let mut file = NamedTempFile::new_in(dir).map_err(|e| SieveError::publish(dir, e))?;
    file.write_all(contents)
        .and_then(|_| file.as_file().sync_all())
        .map_err(|e| SieveError::publish(file.path(), e))?;
    set_readable(&file)?;
    Ok(file)
}

/// Temporary files are created 0600; published files must be world-readable.
#[cfg(unix)]
fn set_readable(file: &NamedTempFile) -> SieveResult<()> {
    use std::os::unix::fs::PermissionsExt;
    file.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o644))
        .map_err(|e| SieveError::publish(file.path(), e))
}

#[cfg(not(unix))]
fn set_readable(_file: &NamedTempFile) -> SieveResult<()> {
    Ok(())
}
