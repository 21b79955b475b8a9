// src/error.rs

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures of a single oracle invocation.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to run {}: {source}", binary.display())]
    Io {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("oracle exited with {status}: {stderr}")]
    Parse { status: String, stderr: String },

    #[error("oracle output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("oracle did not finish within {0:?}")]
    Timeout(Duration),
}

/// Errors building a single `EssenceFile`. Fatal to that file only.
#[derive(Debug, Error)]
pub enum EssenceFileError {
    #[error("Not a valid Essence file: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("Essence file could not be parsed: {}, reason: {source}", path.display())]
    NotParsable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Debug, Error)]
pub enum KeywordError {
    #[error("keyword '{0}' is not used in any file")]
    NoContributingFiles(String),
}

/// Failures synchronizing a local mirror with its remote.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not a valid git repository url: {0}")]
    InvalidUrl(String),

    #[error("git error for {url}: {source}")]
    Git {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures discovering or installing a conjure release.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("releases endpoint {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error("no release matching version '{0}'")]
    NoSuchRelease(String),

    #[error("release {release} has no asset named {asset}")]
    NoSuchAsset { release: String, asset: String },

    #[error("failed to extract archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort a whole statistics pass.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("The provided path '{}' is not a valid directory", .0.display())]
    InvalidDirectory(PathBuf),

    #[error(transparent)]
    InvalidRemote(#[from] RepoError),

    #[error("no conjure binary available in {}", .0.display())]
    OracleUnavailable(PathBuf),

    #[error("failed to query conjure version: {0}")]
    Oracle(#[from] OracleError),
}

/// Invalid or missing settings, named by the environment variable that sets them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {setting}")]
    Missing { setting: &'static str },

    #[error("invalid value for {setting}: {reason}")]
    Invalid { setting: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Must be a valid file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
