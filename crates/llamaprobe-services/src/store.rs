use std::fs::{self, Permissions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use llamaprobe_core::{ResultLog, Result, TestResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// File layout with entries left undecoded, so records this version cannot
/// read are carried through a rewrite untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawLog {
    #[serde(default)]
    test_results: Vec<Value>,
}

#[derive(Debug)]
enum Contents {
    Missing,
    Entries(RawLog),
    /// Not JSON, or not shaped like a result log.
    Malformed(serde_json::Error),
}

/// Append-only JSON log of test results, rewritten whole on every append.
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a malformed log is copied before an append replaces it.
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Missing, unreadable or malformed files load as an empty log. Entries
    /// that do not decode as a result are skipped.
    pub fn load_all(&self) -> ResultLog {
        let raw = match self.read() {
            Ok(Contents::Entries(raw)) => raw,
            Ok(Contents::Missing) => {
                debug!("No results file at {:?}", self.path);
                return ResultLog::default();
            }
            Ok(Contents::Malformed(e)) => {
                warn!("Invalid JSON in results file {:?}: {}", self.path, e);
                return ResultLog::default();
            }
            Err(e) => {
                warn!("Failed to read results file {:?}: {}", self.path, e);
                return ResultLog::default();
            }
        };

        let mut log = ResultLog::default();
        for (index, entry) in raw.test_results.into_iter().enumerate() {
            match serde_json::from_value::<TestResult>(entry) {
                Ok(result) => log.push(result),
                Err(e) => warn!(index, "Skipping unreadable entry in {:?}: {}", self.path, e),
            }
        }

        debug!(count = log.len(), "Loaded results from {:?}", self.path);
        log
    }

    /// Returns the number of entries in the file after the append. Existing
    /// entries are written back as they were read.
    pub fn append(&self, result: &TestResult) -> Result<usize> {
        let mut raw = match self.read()? {
            Contents::Entries(raw) => raw,
            Contents::Missing => RawLog::default(),
            Contents::Malformed(e) => {
                let backup = self.backup_path();
                fs::copy(&self.path, &backup)?;
                warn!(
                    "Results file {:?} is not a valid log ({}); copied to {:?}",
                    self.path, e, backup
                );
                RawLog::default()
            }
        };

        raw.test_results.push(serde_json::to_value(result)?);
        self.write_all(&raw)?;

        info!(count = raw.test_results.len(), "Saved test result to {:?}", self.path);
        Ok(raw.test_results.len())
    }

    fn read(&self) -> std::io::Result<Contents> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Contents::Missing),
            Err(e) => return Err(e),
        };

        Ok(match serde_json::from_slice::<RawLog>(&bytes) {
            Ok(raw) => Contents::Entries(raw),
            Err(e) => Contents::Malformed(e),
        })
    }

    fn write_all(&self, raw: &RawLog) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // Readers never see a half-written file: write beside the target, then rename.
        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, raw)?;
        tmp.write_all(b"\n")?;
        if let Some(perms) = self.target_permissions()? {
            tmp.as_file().set_permissions(perms)?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Keep the existing file's mode; a new file gets 0644 rather than the
    /// temp file's 0600.
    fn target_permissions(&self) -> std::io::Result<Option<Permissions>> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(meta.permissions())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(new_file_permissions()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}
