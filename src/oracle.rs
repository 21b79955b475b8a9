// src/oracle.rs

use crate::error::OracleError;
use crate::model::{Tree, VersionInfo};
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Something that turns an Essence file into a syntax tree.
pub trait AstOracle: Send + Sync {
    fn parse(&self, path: &Path) -> Result<Tree, OracleError>;

    fn version(&self) -> Result<VersionInfo, OracleError>;
}

/// Shells out to a `conjure` binary.
#[derive(Debug, Clone)]
pub struct ConjureOracle {
    binary: PathBuf,
    timeout: Duration,
}

impl ConjureOracle {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        ConjureOracle { binary: binary.into(), timeout }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Run the binary with `args` and return its stdout. The child is killed
    /// if it outlives the timeout.
    fn run<I, S>(&self, args: I) -> Result<String, OracleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let io_err = |source: std::io::Error| OracleError::Io { binary: self.binary.clone(), source };

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(io_err)?;

        // Drain both pipes off-thread so a large AST cannot fill the pipe buffer and stall the child.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait().map_err(io_err)? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(OracleError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let collect = |handle: Option<thread::JoinHandle<std::io::Result<String>>>| {
            handle
                .map(|h| h.join().unwrap_or_else(|_| Ok(String::new())))
                .unwrap_or_else(|| Ok(String::new()))
        };
        let stdout = collect(stdout).map_err(io_err)?;
        let stderr = collect(stderr).map_err(io_err)?;

        if !status.success() {
            return Err(OracleError::Parse {
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<std::io::Result<String>> {
    thread::spawn(move || {
        let mut buf = String::new();
        pipe.read_to_string(&mut buf)?;
        Ok(buf)
    })
}

impl AstOracle for ConjureOracle {
    fn parse(&self, path: &Path) -> Result<Tree, OracleError> {
        debug!(file = %path.display(), "running conjure pretty");
        let stdout = self.run([
            OsStr::new("pretty"),
            OsStr::new("--output-format=astjson"),
            path.as_os_str(),
        ])?;
        Ok(serde_json::from_str(&stdout)?)
    }

    fn version(&self) -> Result<VersionInfo, OracleError> {
        let stdout = self.run(["--version"])?;
        Ok(parse_version_output(&stdout))
    }
}

/// Extract the release and commit from `conjure --version` output.
pub fn parse_version_output(output: &str) -> VersionInfo {
    let mut info = VersionInfo::default();
    for line in output.lines() {
        let line = line.trim();
        if let Some(release) = line.strip_prefix("Release version ") {
            info.release = Some(release.trim().to_string());
        }
        if let Some(rest) = line.strip_prefix("Repository version ") {
            info.commit = rest.split_whitespace().next().map(str::to_string);
        }
    }
    info
}

/// Returns canned trees keyed by file name. Unknown files fail like a conjure exit status 1.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct CannedOracle {
    trees: std::collections::HashMap<String, Tree>,
}

#[cfg(test)]
impl CannedOracle {
    pub fn with(mut self, file_name: &str, tree: Tree) -> Self {
        self.trees.insert(file_name.to_string(), tree);
        self
    }
}

#[cfg(test)]
impl AstOracle for CannedOracle {
    fn parse(&self, path: &Path) -> Result<Tree, OracleError> {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        self.trees.get(&name).cloned().ok_or_else(|| OracleError::Parse {
            status: "exit status: 1".to_string(),
            stderr: format!("no canned tree for {name}"),
        })
    }

    fn version(&self) -> Result<VersionInfo, OracleError> {
        Ok(VersionInfo {
            release: Some("canned".to_string()),
            commit: None,
        })
    }
}
