//! Raw data sources
//!
//! The pipeline itself performs no I/O. A [`DataSource`] yields the raw CSV
//! text: fetched over HTTP, read from a local file, or served from an on-disk
//! cache that is populated from another source on first use.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Published location of the motion-direction estimation dataset
pub const DEFAULT_DATA_URL: &str =
    "https://github.com/steevelaquitaine/projInference/raw/gh-pages/data/csv/data01_direction4priors.csv";

/// Default file name of the local raw-data cache
pub const DEFAULT_CACHE_FILE: &str = "data01_direction4priors.csv";

const USER_AGENT: &str = concat!("prior-flux/", env!("CARGO_PKG_VERSION"));

/// Failures while obtaining raw data
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to download data from {url}: {message}. Please contact the dataset maintainer")]
    Unreachable { url: String, message: String },

    #[error("Failed to download data from {url}: server returned HTTP {status}. Please contact the dataset maintainer")]
    Status { url: String, status: u16 },

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Trait for raw data sources
pub trait DataSource {
    /// Short human-readable description for provenance and logs
    fn describe(&self) -> String;

    /// Fetch the complete raw CSV text
    fn fetch(&self) -> Result<String, FetchError>;
}

/// Blocking HTTP download of the raw CSV
pub struct HttpSource {
    url: String,
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_URL)
    }
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn unreachable(&self, err: impl std::fmt::Display) -> FetchError {
        FetchError::Unreachable {
            url: self.url.clone(),
            message: err.to_string(),
        }
    }
}

impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<String, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| self.unreachable(e))?;

        info!(url = %self.url, "downloading raw data");
        let response = client.get(&self.url).send().map_err(|e| {
            warn!(url = %self.url, error = %e, "download failed");
            self.unreachable(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = status.as_u16(), "download rejected");
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(|e| self.unreachable(e))
    }
}

/// Raw CSV stored in a local file
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<String, FetchError> {
        fs::read_to_string(&self.path).map_err(|e| FetchError::io(&self.path, e))
    }
}

/// On-disk cache in front of another source.
///
/// A present cache file is served as-is. On a miss the inner source is
/// fetched and the body written through a temporary sibling file that is
/// renamed into place, so an interrupted or failed write never leaves a
/// partial cache behind.
pub struct CachedSource<S> {
    inner: S,
    cache_path: PathBuf,
}

impl<S: DataSource> CachedSource<S> {
    pub fn new(inner: S, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            cache_path: cache_path.into(),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    pub fn is_cached(&self) -> bool {
        self.cache_path.is_file()
    }

    /// Fetch from the inner source and overwrite the cache
    pub fn refresh(&self) -> Result<String, FetchError> {
        let body = self.inner.fetch()?;
        write_atomic(&self.cache_path, body.as_bytes())?;
        info!(path = %self.cache_path.display(), bytes = body.len(), "raw data cached");
        Ok(body)
    }
}

impl<S: DataSource> DataSource for CachedSource<S> {
    fn describe(&self) -> String {
        format!(
            "{} (cached at {})",
            self.inner.describe(),
            self.cache_path.display()
        )
    }

    fn fetch(&self) -> Result<String, FetchError> {
        if self.is_cached() {
            info!(path = %self.cache_path.display(), "using cached raw data");
            return fs::read_to_string(&self.cache_path)
                .map_err(|e| FetchError::io(&self.cache_path, e));
        }
        self.refresh()
    }
}

fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Write `bytes` to `dest` via a temporary file and rename
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| FetchError::io(parent, e))?;
    }

    let tmp = temp_path(dest);
    let write_result = (|| -> Result<(), FetchError> {
        let mut file = File::create(&tmp).map_err(|e| FetchError::io(&tmp, e))?;
        file.write_all(bytes).map_err(|e| FetchError::io(&tmp, e))?;
        file.flush().map_err(|e| FetchError::io(&tmp, e))?;
        file.sync_all().map_err(|e| FetchError::io(&tmp, e))?;
        fs::rename(&tmp, dest).map_err(|e| FetchError::io(dest, e))
    })();

    if write_result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    write_result
}
