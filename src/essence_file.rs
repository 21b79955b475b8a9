// src/essence_file.rs

use crate::error::EssenceFileError;
use crate::keywords::flat_keys_count;
use crate::model::{FilePath, KeywordName, Tree};
use crate::oracle::AstOracle;
use crate::paths::{count_lines, has_essence_extension, trim_path};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Keyword counts and line count of a single Essence file.
///
/// Built once from the oracle's syntax tree and never modified afterwards.
/// Identity is the canonical path.
#[derive(Debug, Clone)]
pub struct EssenceFile {
    path: PathBuf,
    ast: Tree,
    keyword_counts: BTreeMap<KeywordName, usize>,
    n_lines: usize,
    /// Display name of the mirror this file was found in
    repo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EssenceFileJson<'a> {
    pub path: FilePath,
    pub repo: Option<&'a str>,
    pub ast: &'a Tree,
    pub keyword_counts: &'a BTreeMap<KeywordName, usize>,
    pub n_lines: usize,
}

impl EssenceFile {
    pub fn new(
        path: impl AsRef<Path>,
        oracle: &dyn AstOracle,
        blocklist: &HashSet<KeywordName>,
    ) -> Result<Self, EssenceFileError> {
        let path = path.as_ref();
        let path = match path.canonicalize() {
            Ok(p) if p.is_file() && has_essence_extension(&p) => p,
            _ => return Err(EssenceFileError::InvalidPath(path.to_path_buf())),
        };

        let not_parsable = |source: Box<dyn std::error::Error + Send + Sync>| {
            EssenceFileError::NotParsable { path: path.clone(), source }
        };

        let ast = oracle.parse(&path).map_err(|e| not_parsable(Box::new(e)))?;
        let keyword_counts = flat_keys_count(&ast, blocklist);
        let n_lines = count_lines(&path).map_err(|e| not_parsable(Box::new(e)))?;

        Ok(EssenceFile { path, ast, keyword_counts, n_lines, repo: None })
    }

    /// Tag the file with the display name of the repository it came from.
    pub fn in_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The path as a string, keeping only the last `depth` segments (0 keeps everything).
    pub fn str_path(&self, depth: usize) -> FilePath {
        trim_path(&self.path, depth)
    }

    pub fn ast(&self) -> &Tree {
        &self.ast
    }

    pub fn keyword_counts(&self) -> &BTreeMap<KeywordName, usize> {
        &self.keyword_counts
    }

    pub fn keywords(&self) -> BTreeSet<&str> {
        self.keyword_counts.keys().map(String::as_str).collect()
    }

    pub fn n_lines(&self) -> usize {
        self.n_lines
    }

    pub fn repo_name(&self) -> Option<&str> {
        self.repo.as_deref()
    }

    /// How many times `keyword` occurs in this file.
    pub fn uses(&self, keyword: &str) -> usize {
        self.keyword_counts.get(keyword).copied().unwrap_or(0)
    }

    pub fn as_json(&self, path_depth: usize) -> EssenceFileJson<'_> {
        EssenceFileJson {
            path: self.str_path(path_depth),
            repo: self.repo_name(),
            ast: &self.ast,
            keyword_counts: &self.keyword_counts,
            n_lines: self.n_lines,
        }
    }
}

impl PartialEq for EssenceFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for EssenceFile {}

impl Hash for EssenceFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl fmt::Display for EssenceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EssenceFile({}): {} lines", self.path.display(), self.n_lines)
    }
}
