// src/stats.rs

use crate::config::{OracleSource, StatsConfig};
use crate::error::StatsError;
use crate::essence_file::{EssenceFile, EssenceFileJson};
use crate::git::{repo_name, sync_repo};
use crate::index::CorpusIndex;
use crate::keyword::{EssenceKeyword, EssenceKeywordJson};
use crate::model::{FileSort, KeywordSort, SkippedFile, VersionInfo};
use crate::oracle::{AstOracle, ConjureOracle};
use crate::paths::find_essence_files;
use crate::release::download_conjure;
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Keyword usage statistics over every Essence file in the configured corpus.
#[derive(Debug)]
pub struct EssenceStats {
    index: CorpusIndex,
    skipped: Vec<SkippedFile>,
    oracle_version: Option<VersionInfo>,
}

/// A file found during discovery, with the display name of the tree it was found in.
#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    repo: String,
}

#[derive(Debug, Serialize)]
pub struct EssenceStatsJson<'a> {
    pub oracle_version: Option<&'a VersionInfo>,
    pub essence_files: Vec<EssenceFileJson<'a>>,
    pub essence_keywords: Vec<EssenceKeywordJson<'a>>,
    pub skipped_files: &'a [SkippedFile],
}

impl EssenceStats {
    /// Run the full pipeline: sync mirrors, resolve conjure, scan and fold.
    pub fn new(config: &StatsConfig) -> Result<Self, StatsError> {
        if config.sync {
            for remote in &config.remotes {
                sync_repo(&remote.mirror_dir(&config.essence_dir), &remote.url, &remote.branch)?;
            }
        }

        let binary = resolve_conjure(&config.oracle)?;
        let oracle = ConjureOracle::new(binary, config.oracle_timeout);

        let version = match oracle.version() {
            Ok(version) => {
                info!(
                    binary = %oracle.binary().display(),
                    release = version.release.as_deref().unwrap_or("unknown"),
                    commit = version.commit.as_deref().unwrap_or("unknown"),
                    "using conjure"
                );
                Some(version)
            }
            Err(e) => {
                warn!(binary = %oracle.binary().display(), error = %e, "could not query conjure version");
                None
            }
        };

        let mut stats = Self::with_oracle(config, &oracle)?;
        stats.oracle_version = version;
        Ok(stats)
    }

    /// Scan the configured directories as they are on disk, parsing with `oracle`.
    pub fn with_oracle(config: &StatsConfig, oracle: &dyn AstOracle) -> Result<Self, StatsError> {
        let candidates = discover(config)?;
        info!(files = candidates.len(), "parsing essence files");

        let bar = ProgressBar::new(candidates.len() as u64);
        bar.set_message("Parsing essence files");

        // Each worker folds into its own partial index; partials are merged in
        // discovery order, so skipped files keep their traversal order.
        let (index, skipped) = candidates
            .par_iter()
            .progress_with(bar)
            .map(|c| (c, EssenceFile::new(&c.path, oracle, &config.blocklist)))
            .fold(
                || (CorpusIndex::new(), Vec::new()),
                |(index, mut skipped), (candidate, result)| match result {
                    Ok(file) => (index.with_file(file.in_repo(candidate.repo.as_str())), skipped),
                    Err(e) => {
                        warn!(file = %candidate.path.display(), error = %e, "could not process file");
                        skipped.push(SkippedFile {
                            path: candidate.path.display().to_string(),
                            reason: e.to_string(),
                        });
                        (index, skipped)
                    }
                },
            )
            .reduce(
                || (CorpusIndex::new(), Vec::new()),
                |(left, mut left_skipped), (right, right_skipped)| {
                    left_skipped.extend(right_skipped);
                    (left.merge(right), left_skipped)
                },
            );

        info!(
            files = index.n_files(),
            keywords = index.n_keywords(),
            skipped = skipped.len(),
            "essence stats ready"
        );
        Ok(EssenceStats { index, skipped, oracle_version: None })
    }

    pub fn essence_files(&self, sort: Option<FileSort>, reverse: bool) -> Vec<&Arc<EssenceFile>> {
        let mut files: Vec<_> = self.index.files().collect();
        if let Some(FileSort::MostLines) = sort {
            files.sort_by(|a, b| directed(a.n_lines().cmp(&b.n_lines()), reverse));
        }
        files
    }

    pub fn essence_keywords(&self, sort: Option<KeywordSort>, reverse: bool) -> Vec<&EssenceKeyword> {
        let mut keywords: Vec<_> = self.index.keywords().collect();
        match sort {
            Some(KeywordSort::MostUsed) => {
                keywords.sort_by(|a, b| directed(a.total_usages().cmp(&b.total_usages()), reverse));
            }
            Some(KeywordSort::AvgUses) => {
                let avg = |k: &EssenceKeyword| k.average_usage().unwrap_or(0.0);
                keywords.sort_by(|a, b| directed(avg(a).total_cmp(&avg(b)), reverse));
            }
            None => {}
        }
        keywords
    }

    /// Look up a file by its full canonical path.
    pub fn stats_for_file(&self, path: &str) -> Option<&Arc<EssenceFile>> {
        self.index.file(path)
    }

    pub fn stats_for_keyword(&self, keyword: &str) -> Option<&EssenceKeyword> {
        self.index.keyword(keyword)
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn oracle_version(&self) -> Option<&VersionInfo> {
        self.oracle_version.as_ref()
    }

    pub fn as_json(&self, path_depth: usize) -> EssenceStatsJson<'_> {
        EssenceStatsJson {
            oracle_version: self.oracle_version(),
            essence_files: self.essence_files(None, false).into_iter().map(|f| f.as_json(path_depth)).collect(),
            essence_keywords: self.essence_keywords(None, false).into_iter().map(|k| k.as_json(path_depth)).collect(),
            skipped_files: &self.skipped,
        }
    }
}

fn directed(ordering: Ordering, reverse: bool) -> Ordering {
    if reverse {
        ordering.reverse()
    } else {
        ordering
    }
}

fn resolve_conjure(source: &OracleSource) -> Result<PathBuf, StatsError> {
    match source {
        OracleSource::Binary(path) if path.is_file() => Ok(path.clone()),
        OracleSource::Binary(path) => Err(StatsError::OracleUnavailable(path.clone())),
        OracleSource::Release { dir, release } => {
            download_conjure(dir, release).ok_or_else(|| StatsError::OracleUnavailable(dir.clone()))
        }
    }
}

/// Candidate files across all scan roots, in traversal order, minus excluded
/// paths, stopping once `max_n_files` have been collected.
fn discover(config: &StatsConfig) -> Result<Vec<Candidate>, StatsError> {
    let mut candidates = Vec::new();

    'roots: for (root, _) in config.scan_roots() {
        let repo = repo_name(&root);
        for path in find_essence_files(&root)? {
            if config.max_n_files.is_some_and(|max| candidates.len() >= max) {
                break 'roots;
            }
            if config
                .exclude
                .as_ref()
                .is_some_and(|re| re.is_match(&path.to_string_lossy()))
            {
                continue;
            }
            candidates.push(Candidate { path, repo: repo.clone() });
        }
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RemoteSource;
    use crate::oracle::CannedOracle;
    use regex::Regex;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn three_file_corpus() -> (TempDir, CannedOracle) {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.essence", "find x : int\nsuch that true\n");
        touch(dir.path(), "b.essence", "given n : int\nfind y : int\nfind z : int\n");
        touch(dir.path(), "c.essence", "");
        let oracle = CannedOracle::default()
            .with("a.essence", json!({"find": {"Name": "x"}, "such-that": []}))
            .with("b.essence", json!({"find": {}, "given": {}}))
            .with("c.essence", json!({}));
        (dir, oracle)
    }

    #[test]
    fn aggregates_three_file_corpus() {
        let (dir, oracle) = three_file_corpus();
        let config = StatsConfig::local(dir.path(), "/unused");
        let stats = EssenceStats::with_oracle(&config, &oracle).unwrap();

        assert_eq!(stats.essence_files(None, false).len(), 3);
        let find = stats.stats_for_keyword("find").unwrap();
        assert_eq!(find.total_usages(), 2);
        assert_eq!(find.num_files_using_keyword(), 2);
        assert_eq!(find.min_usages(), Some(1));
        assert_eq!(find.max_usages(), Some(1));
        assert_eq!(stats.stats_for_keyword("given").unwrap().total_usages(), 1);
        assert_eq!(stats.stats_for_keyword("such-that").unwrap().total_usages(), 1);

        let c_path = dir.path().join("c.essence").canonicalize().unwrap();
        let c = stats.stats_for_file(&c_path.display().to_string()).unwrap();
        assert!(c.keywords().is_empty());
        assert!(stats.essence_keywords(None, false).iter().all(|k| !k.file_usages().contains_key(c)));
        assert!(stats.skipped().is_empty());
    }

    #[test]
    fn max_n_files_takes_first_in_traversal_order() {
        let dir = TempDir::new().unwrap();
        let mut oracle = CannedOracle::default();
        for name in ["e.essence", "d.essence", "c.essence", "b.essence", "a.essence"] {
            touch(dir.path(), name, "");
            oracle = oracle.with(name, json!({"find": {}}));
        }

        let mut config = StatsConfig::local(dir.path(), "/unused");
        config.max_n_files = Some(2);
        let stats = EssenceStats::with_oracle(&config, &oracle).unwrap();

        let names: Vec<_> = stats.essence_files(None, false).iter().map(|f| f.str_path(1)).collect();
        assert_eq!(names, vec!["a.essence", "b.essence"]);
        assert_eq!(stats.stats_for_keyword("find").unwrap().total_usages(), 2);
    }

    #[test]
    fn max_n_files_spans_all_roots() {
        let dir = TempDir::new().unwrap();
        let mut oracle = CannedOracle::default();
        for (name, file) in [("owner/one/x.essence", "x.essence"), ("owner/one/y.essence", "y.essence"), ("owner/two/z.essence", "z.essence")] {
            touch(dir.path(), name, "");
            oracle = oracle.with(file, json!({}));
        }

        let mut config = StatsConfig::local(dir.path(), "/unused");
        config.max_n_files = Some(2);
        config.remotes = vec![
            RemoteSource::parse("owner/one", "master").unwrap(),
            RemoteSource::parse("owner/two", "master").unwrap(),
        ];

        let stats = EssenceStats::with_oracle(&config, &oracle).unwrap();
        let files = stats.essence_files(None, false);
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.repo_name() == Some("owner/one")));
    }

    #[test]
    fn unparsable_files_are_skipped() {
        let (dir, oracle) = three_file_corpus();
        touch(dir.path(), "broken.essence", "find x :");
        let config = StatsConfig::local(dir.path(), "/unused");

        let stats = EssenceStats::with_oracle(&config, &oracle).unwrap();
        assert_eq!(stats.essence_files(None, false).len(), 3);
        assert_eq!(stats.skipped().len(), 1);
        assert!(stats.skipped()[0].path.ends_with("broken.essence"));
        assert!(stats.essence_files(None, false).iter().all(|f| !f.str_path(0).ends_with("broken.essence")));
        assert!(stats
            .essence_keywords(None, false)
            .iter()
            .all(|k| k.files().all(|f| !f.str_path(0).ends_with("broken.essence"))));
    }

    #[test]
    fn excluded_paths_are_not_scanned() {
        let (dir, oracle) = three_file_corpus();
        let mut config = StatsConfig::local(dir.path(), "/unused");
        config.exclude = Some(Regex::new(r"b\.essence$").unwrap());

        let stats = EssenceStats::with_oracle(&config, &oracle).unwrap();
        assert_eq!(stats.essence_files(None, false).len(), 2);
        assert!(stats.stats_for_keyword("given").is_none());
        assert_eq!(stats.stats_for_keyword("find").unwrap().total_usages(), 1);
    }

    #[test]
    fn blocklist_hides_keywords() {
        let (dir, oracle) = three_file_corpus();
        let mut config = StatsConfig::local(dir.path(), "/unused");
        config.blocklist = ["find".to_string()].into_iter().collect();

        let stats = EssenceStats::with_oracle(&config, &oracle).unwrap();
        assert!(stats.stats_for_keyword("find").is_none());
        assert_eq!(stats.stats_for_keyword("Name").unwrap().total_usages(), 1);
    }

    #[test]
    fn sorted_queries() {
        let (dir, oracle) = three_file_corpus();
        let stats = EssenceStats::with_oracle(&StatsConfig::local(dir.path(), "/unused"), &oracle).unwrap();

        let lines: Vec<_> = stats
            .essence_files(Some(FileSort::MostLines), true)
            .iter()
            .map(|f| f.n_lines())
            .collect();
        assert_eq!(lines, vec![3, 2, 0]);
        let ascending: Vec<_> = stats
            .essence_files(Some(FileSort::MostLines), false)
            .iter()
            .map(|f| f.n_lines())
            .collect();
        assert_eq!(ascending, vec![0, 2, 3]);

        let most_used = stats.essence_keywords(Some(KeywordSort::MostUsed), true);
        assert_eq!(most_used[0].name(), "find");
        let by_avg = stats.essence_keywords(Some(KeywordSort::AvgUses), true);
        assert!(by_avg
            .windows(2)
            .all(|w| w[0].average_usage().unwrap() >= w[1].average_usage().unwrap()));
    }

    #[test]
    fn missing_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = StatsConfig::local(dir.path().join("nope"), "/unused");
        assert!(matches!(
            EssenceStats::with_oracle(&config, &CannedOracle::default()),
            Err(StatsError::InvalidDirectory(_))
        ));
    }

    #[test]
    fn missing_binary_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = StatsConfig::local(dir.path(), dir.path().join("conjure"));
        assert!(matches!(EssenceStats::new(&config), Err(StatsError::OracleUnavailable(_))));
    }

    #[test]
    fn json_snapshot_lists_everything() {
        let (dir, oracle) = three_file_corpus();
        touch(dir.path(), "broken.essence", "");
        let stats = EssenceStats::with_oracle(&StatsConfig::local(dir.path(), "/unused"), &oracle).unwrap();

        let value = serde_json::to_value(stats.as_json(1)).unwrap();
        assert_eq!(value["essence_files"].as_array().unwrap().len(), 3);
        assert_eq!(value["essence_files"][0]["path"], "a.essence");
        let find = value["essence_keywords"]
            .as_array()
            .unwrap()
            .iter()
            .find(|k| k["name"] == "find")
            .unwrap();
        assert_eq!(find["used_in_files"], json!(["a.essence", "b.essence"]));
        assert_eq!(find["avg_usages_per_file"], json!(1.0));
        assert_eq!(value["skipped_files"].as_array().unwrap().len(), 1);
    }

    #[cfg(unix)]
    mod pipeline {
        use super::*;
        use git2::{Commit, Repository, RepositoryInitOptions, Signature};
        use std::os::unix::fs::PermissionsExt;

        /// A conjure stand-in that prints the file it is given, so each
        /// fixture file holds its own syntax tree.
        fn cat_conjure(dir: &Path) -> PathBuf {
            let path = dir.join("conjure");
            fs::write(
                &path,
                "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo 'Release version 2.5.1'; exit 0; fi\ncat \"$3\"\n",
            )
            .unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn commit_all(repo: &Repository, files: &[(&str, &str)]) {
            let workdir = repo.workdir().unwrap();
            let mut index = repo.index().unwrap();
            for (name, content) in files {
                fs::write(workdir.join(name), content).unwrap();
                index.add_path(Path::new(name)).unwrap();
            }
            index.write().unwrap();
            let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
            let sig = Signature::now("Essence Tester", "tester@example.com").unwrap();
            let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
            let parents: Vec<&Commit> = parent.iter().collect();
            repo.commit(Some("HEAD"), &sig, &sig, "corpus", &tree, &parents).unwrap();
        }

        #[test]
        fn syncs_remote_and_parses_with_binary() {
            let tmp = TempDir::new().unwrap();
            let remote_dir = tmp.path().join("remotes/conjure-cp/EssenceCatalog");
            let mut opts = RepositoryInitOptions::new();
            opts.initial_head("master");
            let remote = Repository::init_opts(&remote_dir, &opts).unwrap();
            commit_all(
                &remote,
                &[
                    ("knapsack.essence", "{\"find\": {\"Name\": \"picked\"},\n \"given\": {}}\n"),
                    ("broken.essence", "not json\n"),
                ],
            );

            let mut config = StatsConfig::local(tmp.path().join("cache"), cat_conjure(tmp.path()));
            config.remotes = vec![RemoteSource::parse(remote_dir.to_str().unwrap(), "master").unwrap()];
            config.sync = true;

            let stats = EssenceStats::new(&config).unwrap();
            assert_eq!(stats.oracle_version().unwrap().release.as_deref(), Some("2.5.1"));
            let files = stats.essence_files(None, false);
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].n_lines(), 2);
            assert_eq!(files[0].repo_name(), Some("conjure-cp/EssenceCatalog"));
            assert_eq!(stats.stats_for_keyword("Name").unwrap().total_usages(), 1);
            assert_eq!(stats.skipped().len(), 1);
        }
    }
}
