// src/model.rs

use serde::Serialize;

/// A parsed syntax tree as emitted by `conjure pretty --output-format=astjson`
pub type Tree = serde_json::Value;

/// A structural key observed in a syntax tree
pub type KeywordName = String;

/// The display form of an Essence file's canonical path
pub type FilePath = String;

/// Extension of Essence source files (without the dot)
pub const ESSENCE_EXTENSION: &str = "essence";

/// Version information reported by `conjure --version`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub release: Option<String>,
    /// Git commit hash of the conjure build
    pub commit: Option<String>,
}

/// Ordering applied when listing keywords
#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum KeywordSort {
    /// By total number of uses across all files
    MostUsed,
    /// By average number of uses per file that uses the keyword
    AvgUses,
}

/// Ordering applied when listing files
#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum FileSort {
    /// By number of lines
    MostLines,
}

/// A candidate file that could not be turned into an `EssenceFile`
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: FilePath,
    pub reason: String,
}
