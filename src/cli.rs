// src/cli.rs

use crate::config::{parse_blocklist, parse_exclude, OracleSource, RemoteSource, ReportConfig, StatsConfig};
use crate::error::ConfigError;
use crate::model::KeywordSort;
use crate::release::{ReleaseSource, LATEST};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Collect Essence keyword usage statistics across one or more example repositories.
///
/// Every option can also be set through the environment variable shown next to it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Essence repositories to mirror, as `url` or `url#branch`
    #[arg(long = "essence-repo", env = "ESSENCE_EXAMPLES_REPO", value_delimiter = ',')]
    pub essence_repos: Vec<String>,

    /// Branch used for repositories that do not name one
    #[arg(long, env = "ESSENCE_BRANCH", default_value = "master")]
    pub essence_branch: String,

    /// Directory holding the repository mirrors, or the Essence files themselves when no repository is given
    #[arg(long, env = "ESSENCE_DIR")]
    pub essence_dir: Option<PathBuf>,

    /// Directory where conjure releases are cached
    #[arg(long, env = "CONJURE_DIR")]
    pub conjure_dir: Option<PathBuf>,

    /// Use this conjure binary instead of a downloaded release
    #[arg(long, env = "CONJURE_BIN")]
    pub conjure_bin: Option<PathBuf>,

    /// GitHub repository that publishes conjure releases
    #[arg(long, env = "CONJURE_REPO", default_value = "https://github.com/conjure-cp/conjure")]
    pub conjure_repo: String,

    /// Conjure release name or tag, or `latest`
    #[arg(long, env = "CONJURE_VERSION", default_value = LATEST)]
    pub conjure_version: String,

    /// Platform suffix of the release asset
    #[arg(long, env = "CONJURE_PLATFORM", default_value = "linux")]
    pub conjure_platform: String,

    /// Seconds to wait for a single conjure invocation
    #[arg(long, env = "ORACLE_TIMEOUT_SECS", default_value_t = 60)]
    pub oracle_timeout_secs: u64,

    /// Keywords to leave out of the statistics
    #[arg(long, env = "KEYWORD_BLOCKLIST", value_delimiter = ',')]
    pub keyword_blocklist: Vec<String>,

    /// Skip files whose path matches this regular expression
    #[arg(long, env = "EXCLUDE_PATHS_REGEX")]
    pub exclude_paths_regex: Option<String>,

    /// Stop scanning after this many files
    #[arg(long, env = "MAX_N_FILES")]
    pub max_n_files: Option<usize>,

    /// Number of files shown in the HTML report (all when unset)
    #[arg(long, env = "MAX_N_DISPLAY_FILES")]
    pub max_n_display_files: Option<usize>,

    /// Number of keywords shown in the report
    #[arg(long, env = "MAX_N_KEYWORDS", default_value_t = 200)]
    pub max_n_keywords: usize,

    /// Where to write the report
    #[arg(short, long, env = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    #[arg(long, env = "OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Html)]
    pub format: OutputFormat,

    /// Number of trailing path segments shown for each file
    #[arg(long, env = "PATH_DEPTH", default_value_t = 4)]
    pub path_depth: usize,

    /// Keyword ordering in the HTML report
    #[arg(long, value_enum, default_value_t = KeywordSort::MostUsed)]
    pub keyword_sort: KeywordSort,

    /// Use the existing mirrors without cloning or pulling
    #[arg(long)]
    pub offline: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Heat-map table
    Html,
    /// One row per file, one column per keyword
    Csv,
    /// Full snapshot of files and keywords
    Json,
}

impl Args {
    /// Validate every setting, naming the first one that is missing or invalid.
    pub fn into_config(self) -> Result<(StatsConfig, ReportConfig), ConfigError> {
        let essence_dir = self.essence_dir.ok_or(ConfigError::Missing { setting: "ESSENCE_DIR" })?;
        let output = self.output.ok_or(ConfigError::Missing { setting: "OUTPUT_PATH" })?;

        let remotes = self
            .essence_repos
            .iter()
            .filter(|r| !r.trim().is_empty())
            .map(|r| RemoteSource::parse(r, &self.essence_branch))
            .collect::<Result<Vec<_>, _>>()?;

        let oracle = match (self.conjure_bin, self.conjure_dir) {
            (Some(bin), _) => OracleSource::Binary(bin),
            (None, Some(dir)) => OracleSource::Release {
                dir,
                release: ReleaseSource::new(self.conjure_repo, self.conjure_version, self.conjure_platform),
            },
            (None, None) => return Err(ConfigError::Missing { setting: "CONJURE_DIR" }),
        };

        if self.oracle_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                setting: "ORACLE_TIMEOUT_SECS",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_n_files == Some(0) {
            return Err(ConfigError::Invalid {
                setting: "MAX_N_FILES",
                reason: "must be at least 1".to_string(),
            });
        }

        let stats = StatsConfig {
            essence_dir,
            remotes,
            oracle,
            oracle_timeout: Duration::from_secs(self.oracle_timeout_secs),
            blocklist: parse_blocklist(&self.keyword_blocklist),
            exclude: parse_exclude(self.exclude_paths_regex.as_deref())?,
            max_n_files: self.max_n_files,
            sync: !self.offline,
        };
        let report = ReportConfig {
            output,
            format: self.format,
            max_n_keywords: self.max_n_keywords,
            max_n_display_files: self.max_n_display_files,
            path_depth: self.path_depth,
            keyword_sort: self.keyword_sort,
        };
        Ok((stats, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("essence-stats").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn builds_config_from_flags() {
        let args = parse(&[
            "--essence-dir", "/data/essence",
            "--conjure-dir", "/data/conjure",
            "--essence-repo", "https://github.com/conjure-cp/EssenceCatalog,https://github.com/conjure-cp/conjure#main",
            "--keyword-blocklist", "mInfo, mLanguage",
            "--exclude-paths-regex", "/tests?/",
            "--max-n-files", "50",
            "--format", "csv",
            "-o", "/tmp/out.csv",
        ]);
        let (stats, report) = args.into_config().unwrap();

        assert_eq!(stats.remotes.len(), 2);
        assert_eq!(stats.remotes[0].branch, "master");
        assert_eq!(stats.remotes[1].branch, "main");
        assert!(stats.blocklist.contains("mLanguage"));
        assert!(stats.exclude.is_some());
        assert_eq!(stats.max_n_files, Some(50));
        assert!(stats.sync);
        assert!(matches!(
            &stats.oracle,
            OracleSource::Release { release, .. } if release.version == "latest" && release.platform == "linux"
        ));
        assert_eq!(report.format, OutputFormat::Csv);
        assert_eq!(report.max_n_keywords, 200);
        assert_eq!(report.max_n_display_files, None);
        assert_eq!(report.path_depth, 4);
    }

    #[test]
    fn explicit_binary_wins_over_release() {
        let (stats, _) = parse(&["--essence-dir", "e", "--conjure-bin", "/usr/bin/conjure", "-o", "out.html", "--offline"])
            .into_config()
            .unwrap();
        assert!(matches!(stats.oracle, OracleSource::Binary(_)));
        assert!(!stats.sync);
        assert!(stats.remotes.is_empty());
    }

    #[test]
    fn display_limit_is_separate_from_scan_cap() {
        let (stats, report) = parse(&[
            "--essence-dir", "e", "--conjure-dir", "c", "-o", "out.html",
            "--max-n-files", "500", "--max-n-display-files", "20",
        ])
        .into_config()
        .unwrap();
        assert_eq!(stats.max_n_files, Some(500));
        assert_eq!(report.max_n_display_files, Some(20));
    }

    #[test]
    fn names_missing_settings() {
        let missing = |args: &[&str]| match parse(args).into_config() {
            Err(ConfigError::Missing { setting }) => setting,
            other => panic!("expected missing setting, got {other:?}"),
        };
        assert_eq!(missing(&["--conjure-dir", "c", "-o", "out"]), "ESSENCE_DIR");
        assert_eq!(missing(&["--essence-dir", "e", "--conjure-dir", "c"]), "OUTPUT_PATH");
        assert_eq!(missing(&["--essence-dir", "e", "-o", "out"]), "CONJURE_DIR");
    }

    #[test]
    fn rejects_invalid_values() {
        let invalid = |args: &[&str]| match parse(args).into_config() {
            Err(ConfigError::Invalid { setting, .. }) => setting,
            other => panic!("expected invalid setting, got {other:?}"),
        };
        let base = ["--essence-dir", "e", "--conjure-dir", "c", "-o", "out"];
        let with = |extra: &[&'static str]| base.iter().chain(extra).copied().collect::<Vec<_>>();

        assert_eq!(invalid(&with(&["--max-n-files", "0"])), "MAX_N_FILES");
        assert_eq!(invalid(&with(&["--oracle-timeout-secs", "0"])), "ORACLE_TIMEOUT_SECS");
        assert_eq!(invalid(&with(&["--exclude-paths-regex", "("])), "EXCLUDE_PATHS_REGEX");
        assert_eq!(invalid(&with(&["--essence-repo", "not-a-repo"])), "ESSENCE_EXAMPLES_REPO");
    }
}
