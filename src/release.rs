// src/release.rs

use crate::error::ReleaseError;
use crate::git::parse_repo_url;
use crate::paths::readable_entry;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const BINARY_NAME: &str = "conjure";
pub const LATEST: &str = "latest";
const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub name: Option<String>,
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

/// Where to get a conjure release from.
#[derive(Debug, Clone)]
pub struct ReleaseSource {
    pub repo_url: String,
    /// A release name or tag, or `latest`
    pub version: String,
    /// Asset platform suffix, e.g. `linux` or `macos`
    pub platform: String,
    pub api_base: String,
}

impl ReleaseSource {
    pub fn new(repo_url: impl Into<String>, version: impl Into<String>, platform: impl Into<String>) -> Self {
        ReleaseSource {
            repo_url: repo_url.into(),
            version: version.into(),
            platform: platform.into(),
            api_base: GITHUB_API.to_string(),
        }
    }
}

/// Locate a previously installed conjure binary under `dir`.
pub fn find_conjure_binary(dir: &Path) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(readable_entry)
        .find(|e| e.file_type().is_file() && e.file_name() == BINARY_NAME)
        .map(|e| e.into_path())
}

/// Install directory of the release tagged `tag`: `dir/<tag>`.
pub fn release_dir(dir: &Path, tag: &str) -> PathBuf {
    dir.join(tag.replace(['/', '\\'], "_"))
}

/// A cached binary that satisfies `version`. A pinned version only matches
/// its own install directory; `latest` accepts any cached release.
pub fn cached_conjure(dir: &Path, version: &str) -> Option<PathBuf> {
    if version == LATEST {
        find_conjure_binary(dir)
    } else {
        find_conjure_binary(&release_dir(dir, version))
    }
}

/// `latest` picks the first (most recent) release; anything else must equal
/// a release's name or tag.
pub fn select_release<'a>(releases: &'a [Release], version: &str) -> Option<&'a Release> {
    if version == LATEST {
        return releases.first();
    }
    releases
        .iter()
        .find(|r| r.tag_name == version || r.name.as_deref() == Some(version))
}

pub fn asset_name(version: &str, platform: &str) -> String {
    format!("conjure-{version}-{platform}.zip")
}

pub fn select_asset<'a>(release: &'a Release, platform: &str) -> Result<&'a Asset, ReleaseError> {
    let wanted = asset_name(&release.tag_name, platform);
    release
        .assets
        .iter()
        .find(|a| a.name == wanted)
        .ok_or_else(|| ReleaseError::NoSuchAsset { release: release.tag_name.clone(), asset: wanted })
}

/// Extract `archive` into `dir` and mark everything extracted as executable.
pub fn install_archive(archive: &Path, dir: &Path) -> Result<(), ReleaseError> {
    fs::create_dir_all(dir)?;
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    zip.extract(dir)?;
    make_executable_recursive(dir)?;
    Ok(())
}

#[cfg(unix)]
pub fn make_executable_recursive(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for entry in WalkDir::new(dir).into_iter().filter_map(readable_entry) {
        if entry.file_type().is_file() {
            let mut perms = entry.metadata()?.permissions();
            perms.set_mode(perms.mode() | 0o111);
            fs::set_permissions(entry.path(), perms)?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn make_executable_recursive(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn client() -> Result<Client, ReleaseError> {
    Ok(Client::builder()
        .user_agent(concat!("essence-stats/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

pub fn fetch_releases(client: &Client, source: &ReleaseSource) -> Result<Vec<Release>, ReleaseError> {
    let (owner, repo) = parse_repo_url(&source.repo_url)?;
    let url = format!("{}/repos/{owner}/{repo}/releases", source.api_base.trim_end_matches('/'));

    let response = client.get(&url).send()?;
    if response.status() != reqwest::StatusCode::OK {
        return Err(ReleaseError::Status { url, status: response.status().as_u16() });
    }
    Ok(response.json()?)
}

fn fetch_and_install(source: &ReleaseSource, dir: &Path) -> Result<PathBuf, ReleaseError> {
    let client = client()?;
    let releases = fetch_releases(&client, source)?;
    let release = select_release(&releases, &source.version)
        .ok_or_else(|| ReleaseError::NoSuchRelease(source.version.clone()))?;
    let target = release_dir(dir, &release.tag_name);
    if let Some(binary) = find_conjure_binary(&target) {
        return Ok(binary);
    }
    let asset = select_asset(release, &source.platform)?;

    info!(release = %release.tag_name, asset = %asset.name, "downloading conjure");
    let mut response = client.get(&asset.browser_download_url).send()?.error_for_status()?;
    let mut archive = tempfile::NamedTempFile::new()?;
    response.copy_to(archive.as_file_mut())?;

    install_archive(archive.path(), &target)?;
    archive.close()?;

    find_conjure_binary(&target).ok_or_else(|| {
        ReleaseError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("archive {} contains no {BINARY_NAME} binary", asset.name),
        ))
    })
}

/// A conjure binary for `source.version` under `dir`, downloading the release
/// into `dir/<tag>` if it is not cached. Download failures are logged and
/// reported as `None`.
pub fn download_conjure(dir: &Path, source: &ReleaseSource) -> Option<PathBuf> {
    if let Some(binary) = cached_conjure(dir, &source.version) {
        info!(binary = %binary.display(), "using cached conjure");
        return Some(binary);
    }

    match fetch_and_install(source, dir) {
        Ok(binary) => {
            info!(binary = %binary.display(), "installed conjure");
            Some(binary)
        }
        Err(e) => {
            warn!(repo = %source.repo_url, version = %source.version, error = %e, "could not download conjure");
            None
        }
    }
}
