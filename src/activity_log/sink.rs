use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::NaiveDateTime;
use thiserror::Error;

use super::format::{annotation_line, TIMESTAMP_FORMAT};
use super::prune::{retain_recent, retention_cutoff, PruneReport};
use crate::utils::lock_or_recover;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to append to {path}: {source}")]
    Append { path: PathBuf, source: io::Error },
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to rewrite {path} while pruning: {source}")]
    Rewrite { path: PathBuf, source: io::Error },
}

/// Destination for activity log lines.
pub trait LineSink: Send + Sync {
    fn append(&self, line: &str) -> Result<(), SinkError>;
}

/// Append-mostly text file. Appends and prune rewrites share one lock so a
/// rewrite can never interleave with a write.
pub struct FileLogSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLogSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `header` if the file is missing or empty. Returns whether it did.
    pub fn ensure_header(&self, header: &str) -> Result<bool, SinkError> {
        let _guard = lock_or_recover(&self.lock);
        let is_empty = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(err) if err.kind() == io::ErrorKind::NotFound => true,
            Err(source) => {
                return Err(SinkError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if is_empty {
            self.append_locked(header)?;
        }
        Ok(is_empty)
    }

    /// Every line of the log. Bytes that are not valid UTF-8 are replaced, so
    /// a damaged line reads back as an undated header.
    pub fn read_lines(&self) -> Result<Vec<String>, SinkError> {
        let _guard = lock_or_recover(&self.lock);
        let contents = self.read_locked()?;
        Ok(split_lines(&contents)
            .into_iter()
            .map(|raw| {
                let line = String::from_utf8_lossy(raw);
                line.strip_suffix('\r').unwrap_or(&*line).to_owned()
            })
            .collect())
    }

    /// Drop every dated line older than `retention_days` before `now`, then
    /// note the pass in the log itself. The file is replaced through a temp
    /// file, so a failure leaves the original content untouched.
    pub fn prune(&self, retention_days: u32, now: NaiveDateTime) -> Result<PruneReport, SinkError> {
        let _guard = lock_or_recover(&self.lock);

        let contents = self.read_locked()?;
        let lines = split_lines(&contents);
        let cutoff = retention_cutoff(now, retention_days);
        let (kept, removed) = retain_recent(&lines, cutoff);

        if removed > 0 {
            self.replace_locked(&kept).map_err(|source| SinkError::Rewrite {
                path: self.path.clone(),
                source,
            })?;
        }

        let report = PruneReport {
            removed,
            kept: kept.len(),
            cutoff,
        };
        log_info!(
            "pruned {}: removed {} lines older than {}, kept {}",
            self.path.display(),
            report.removed,
            report.cutoff,
            report.kept
        );

        self.append_locked(&annotation_line(
            now,
            "PRUNE",
            &format!(
                "removed {} lines older than {}, kept {}",
                report.removed,
                report.cutoff.format(TIMESTAMP_FORMAT),
                report.kept
            ),
        ))?;

        Ok(report)
    }

    fn read_locked(&self) -> Result<Vec<u8>, SinkError> {
        match fs::read(&self.path) {
            Ok(contents) => Ok(contents),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(SinkError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn append_locked(&self, line: &str) -> Result<(), SinkError> {
        let write = || -> io::Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            writeln!(file, "{line}")?;
            file.flush()
        };

        write().map_err(|source| SinkError::Append {
            path: self.path.clone(),
            source,
        })
    }

    fn replace_locked(&self, lines: &[&[u8]]) -> io::Result<()> {
        let tmp_path = self.temp_path();
        let result = (|| -> io::Result<()> {
            let mut tmp = BufWriter::new(File::create(&tmp_path)?);
            for line in lines {
                tmp.write_all(line)?;
                tmp.write_all(b"\n")?;
            }
            let tmp = tmp.into_inner().map_err(io::IntoInnerError::into_error)?;
            tmp.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".prune-tmp");
        self.path.with_file_name(name)
    }
}

/// Split file contents on `\n`, without a phantom empty line after the final
/// newline.
fn split_lines(contents: &[u8]) -> Vec<&[u8]> {
    if contents.is_empty() {
        return Vec::new();
    }
    let body = contents.strip_suffix(b"\n").unwrap_or(contents);
    body.split(|&byte| byte == b'\n').collect()
}

impl LineSink for FileLogSink {
    fn append(&self, line: &str) -> Result<(), SinkError> {
        let _guard = lock_or_recover(&self.lock);
        self.append_locked(line)
    }
}
