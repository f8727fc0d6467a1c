use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

use crate::domain::{Archive, ProductCategory};

#[derive(Debug, Error, Diagnostic)]
pub enum GnssError {
    #[error("archive {archive} has no route for {category}")]
    #[diagnostic(help("pick another mirror or source archive for this product"))]
    UnknownRoute {
        archive: Archive,
        category: ProductCategory,
    },

    #[error("no naming rule for {category} from {archive}: {detail}")]
    UnsupportedCombination {
        category: ProductCategory,
        archive: Archive,
        detail: String,
    },

    #[error("no compressed or plain artifact matching {pattern} appeared after fetching {url}")]
    FetchFailed { url: String, pattern: String },

    #[error("conversion of {input} failed: {reason}")]
    ConversionFailed { input: Utf8PathBuf, reason: String },

    #[error("invalid site code: {0}")]
    InvalidSiteCode(String),

    #[error("invalid analysis center: {0}")]
    InvalidCenter(String),

    #[error("invalid archive identifier: {0}")]
    InvalidArchive(String),

    #[error("invalid epoch: {0}")]
    InvalidEpoch(String),

    #[error("hour of day out of range: {0}")]
    InvalidHour(u32),

    #[error("invalid file pattern: {0}")]
    InvalidPattern(String),

    #[error("missing config file gnss-fetch.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    #[error("{tool} did not finish within {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("archive returned status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}
