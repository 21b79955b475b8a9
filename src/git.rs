// src/git.rs

use crate::error::RepoError;
use crate::paths::trim_path;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{FetchOptions, RemoteCallbacks, Repository};
use indicatif::ProgressBar;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const REMOTE_NAME: &str = "origin";

/// Make `dir` a mirror of `branch` of the repository at `url`.
///
/// - missing (or empty) directory: clone
/// - valid repository: fetch and move the branch to the remote head
/// - anything else: delete it and clone again
pub fn sync_repo(dir: &Path, url: &str, branch: &str) -> Result<Repository, RepoError> {
    if dir.is_dir() && is_empty_dir(dir)? {
        fs::remove_dir(dir).map_err(|source| RepoError::Io { path: dir.to_path_buf(), source })?;
    }

    if !dir.exists() {
        return clone(dir, url, branch);
    }

    match Repository::open(dir) {
        Ok(repo) => {
            pull(&repo, branch).map_err(|source| RepoError::Git { url: url.to_string(), source })?;
            info!(%url, dir = %dir.display(), "pulled latest changes");
            Ok(repo)
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "removing invalid repository");
            let removed = if dir.is_dir() { fs::remove_dir_all(dir) } else { fs::remove_file(dir) };
            removed.map_err(|source| RepoError::Io { path: dir.to_path_buf(), source })?;
            clone(dir, url, branch)
        }
    }
}

fn is_empty_dir(dir: &Path) -> Result<bool, RepoError> {
    let mut entries = fs::read_dir(dir).map_err(|source| RepoError::Io { path: dir.to_path_buf(), source })?;
    Ok(entries.next().is_none())
}

fn clone(dir: &Path, url: &str, branch: &str) -> Result<Repository, RepoError> {
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent).map_err(|source| RepoError::Io { path: parent.to_path_buf(), source })?;
    }

    let bar = ProgressBar::new(0);
    bar.set_message(format!("Cloning {url}"));

    let progress = bar.clone();
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(move |stats| {
        progress.set_length(stats.total_objects() as u64);
        progress.set_position(stats.received_objects() as u64);
        true
    });
    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);

    let repo = RepoBuilder::new()
        .branch(branch)
        .fetch_options(fetch_options)
        .clone(url, dir)
        .map_err(|source| RepoError::Git { url: url.to_string(), source })?;

    bar.finish_and_clear();
    info!(%url, dir = %dir.display(), "cloned repository");
    Ok(repo)
}

/// Fetch `branch` from origin and force the local branch, HEAD and worktree to
/// the fetched commit. The mirror is never edited locally, so any local or
/// rewound history is discarded.
fn pull(repo: &Repository, branch: &str) -> Result<(), git2::Error> {
    let mut remote = repo.find_remote(REMOTE_NAME)?;
    remote.fetch(&[branch], None, None)?;

    let fetched = repo.find_reference("FETCH_HEAD")?.peel_to_commit()?.id();
    let refname = format!("refs/heads/{branch}");

    let branch_at_fetched = repo.find_reference(&refname).ok().and_then(|r| r.target()) == Some(fetched);
    let head_on_branch = repo.head().ok().and_then(|h| h.name().map(str::to_string)) == Some(refname.clone());
    if branch_at_fetched && head_on_branch {
        return Ok(());
    }

    repo.reference(&refname, fetched, true, "essence-stats: sync mirror")?;
    repo.set_head(&refname)?;

    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_head(Some(&mut checkout))
}

/// Short display name for a mirror: its last two path segments.
pub fn repo_name(dir: &Path) -> String {
    trim_path(dir, 2)
}

/// Split a GitHub-style remote into `(owner, repo)`.
///
/// Remotes with a host (`https://host/owner/repo(.git)[/...]`,
/// `git@host:owner/repo(.git)`) use the first two path segments. Bare
/// `owner/repo`, local paths and `file://` urls use the last two.
pub fn parse_repo_url(url: &str) -> Result<(String, String), RepoError> {
    let (path, has_host) = if let Some(path) = url.strip_prefix("file://") {
        (path, false)
    } else if let Some((_, rest)) = url.split_once("://") {
        (rest.split_once('/').map(|(_, path)| path).unwrap_or(""), true)
    } else if let Some((_, path)) = url.split_once(':').filter(|_| !url.starts_with('/')) {
        (path, true)
    } else {
        (url, false)
    };

    let segments: Vec<_> = path.split('/').filter(|s| !s.is_empty()).collect();
    let pair = match (has_host, &segments[..]) {
        (true, [owner, repo, ..]) | (false, [.., owner, repo]) => Some((*owner, *repo)),
        _ => None,
    };
    match pair {
        Some((owner, repo)) => {
            let repo = repo.strip_suffix(".git").unwrap_or(repo);
            Ok((owner.to_string(), repo.to_string()))
        }
        None => Err(RepoError::InvalidUrl(url.to_string())),
    }
}
