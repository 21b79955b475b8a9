// src/config.rs

use crate::cli::OutputFormat;
use crate::error::ConfigError;
use crate::git::parse_repo_url;
use crate::model::{KeywordName, KeywordSort};
use crate::release::ReleaseSource;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A remote Essence corpus and the branch to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSource {
    pub url: String,
    pub branch: String,
    owner: String,
    repo: String,
}

impl RemoteSource {
    /// Parse `url` or `url#branch`.
    pub fn parse(value: &str, default_branch: &str) -> Result<Self, ConfigError> {
        let (url, branch) = match value.trim().split_once('#') {
            Some((url, branch)) if !branch.is_empty() => (url, branch),
            Some((url, _)) => (url, default_branch),
            None => (value.trim(), default_branch),
        };
        let (owner, repo) = parse_repo_url(url).map_err(|e| ConfigError::Invalid {
            setting: "ESSENCE_EXAMPLES_REPO",
            reason: e.to_string(),
        })?;
        Ok(RemoteSource { url: url.to_string(), branch: branch.to_string(), owner, repo })
    }

    /// Where this remote is mirrored under `root`: `root/<owner>/<repo>`.
    pub fn mirror_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.owner).join(&self.repo)
    }
}

/// How to obtain the conjure binary.
#[derive(Debug, Clone)]
pub enum OracleSource {
    /// Use this binary as-is
    Binary(PathBuf),
    /// Use a cached install under `dir`, downloading `release` if there is none
    Release { dir: PathBuf, release: ReleaseSource },
}

/// Everything the corpus aggregator needs, validated up front.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub essence_dir: PathBuf,
    pub remotes: Vec<RemoteSource>,
    pub oracle: OracleSource,
    pub oracle_timeout: Duration,
    pub blocklist: HashSet<KeywordName>,
    pub exclude: Option<Regex>,
    pub max_n_files: Option<usize>,
    /// Clone/pull remotes before scanning
    pub sync: bool,
}

impl StatsConfig {
    /// A config that scans `essence_dir` directly with an existing binary.
    pub fn local(essence_dir: impl Into<PathBuf>, conjure_bin: impl Into<PathBuf>) -> Self {
        StatsConfig {
            essence_dir: essence_dir.into(),
            remotes: Vec::new(),
            oracle: OracleSource::Binary(conjure_bin.into()),
            oracle_timeout: Duration::from_secs(60),
            blocklist: HashSet::new(),
            exclude: None,
            max_n_files: None,
            sync: false,
        }
    }

    /// Directories to scan: one mirror per remote, or the essence dir itself.
    pub fn scan_roots(&self) -> Vec<(PathBuf, Option<&RemoteSource>)> {
        if self.remotes.is_empty() {
            return vec![(self.essence_dir.clone(), None)];
        }
        self.remotes
            .iter()
            .map(|r| (r.mirror_dir(&self.essence_dir), Some(r)))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub output: PathBuf,
    pub format: OutputFormat,
    pub max_n_keywords: usize,
    /// Rows in the HTML heat map
    pub max_n_display_files: Option<usize>,
    pub path_depth: usize,
    pub keyword_sort: KeywordSort,
}

pub fn parse_blocklist<S: AsRef<str>>(entries: &[S]) -> HashSet<KeywordName> {
    entries
        .iter()
        .map(|e| e.as_ref().trim())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_exclude(pattern: Option<&str>) -> Result<Option<Regex>, ConfigError> {
    match pattern.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(None),
        Some(p) => Regex::new(p).map(Some).map_err(|e| ConfigError::Invalid {
            setting: "EXCLUDE_PATHS_REGEX",
            reason: e.to_string(),
        }),
    }
}
