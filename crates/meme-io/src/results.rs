//! Results Tables
//!
//! Numeric rows written one per line as comma-separated text. Tables are
//! append-only; several processes may append to the same file, so each
//! append holds an advisory exclusive lock on the table file itself. The
//! operating system drops that lock when the holder closes the file or dies.
//! Contended appends retry with exponential backoff and give up after a
//! bounded number of attempts.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use fs2::FileExt;
use meme_core::analysis::MeasuredInfiltration;
use meme_core::experiment::SweepPoint;

use crate::error::{IoError, IoResult};

const LOCK_ATTEMPTS: u32 = 40;
const INITIAL_BACKOFF: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_millis(500);

/// A fixed-width numeric row
pub trait Row: Sized {
    const FIELDS: usize;

    fn to_fields(&self) -> Vec<f64>;

    /// Build from exactly `FIELDS` values
    fn from_fields(fields: &[f64]) -> Self;

    fn to_line(&self) -> String {
        self.to_fields()
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse one line; `line_number` is 1-based and only used in errors
    fn parse_line(line: &str, line_number: usize) -> IoResult<Self> {
        let fields = line
            .split(',')
            .map(|field| {
                field.trim().parse::<f64>().map_err(|e| IoError::MalformedRow {
                    line: line_number,
                    reason: format!("`{}`: {e}", field.trim()),
                })
            })
            .collect::<IoResult<Vec<f64>>>()?;
        if fields.len() != Self::FIELDS {
            return Err(IoError::MalformedRow {
                line: line_number,
                reason: format!("expected {} fields, found {}", Self::FIELDS, fields.len()),
            });
        }
        Ok(Self::from_fields(&fields))
    }
}

/// Targeting comparison at one parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRow {
    pub value: f64,
    pub mean_random: f64,
    pub stderr_random: f64,
    pub mean_preferential: f64,
    pub stderr_preferential: f64,
    pub mean_ratio: f64,
    pub stderr_ratio: f64,
}

impl From<&SweepPoint> for ResultRow {
    fn from(point: &SweepPoint) -> Self {
        let c = &point.comparison;
        Self {
            value: point.value,
            mean_random: c.random.mean,
            stderr_random: c.random.stderr,
            mean_preferential: c.preferential.mean,
            stderr_preferential: c.preferential.stderr,
            mean_ratio: c.ratio.mean,
            stderr_ratio: c.ratio.stderr,
        }
    }
}

impl Row for ResultRow {
    const FIELDS: usize = 7;

    fn to_fields(&self) -> Vec<f64> {
        vec![
            self.value,
            self.mean_random,
            self.stderr_random,
            self.mean_preferential,
            self.stderr_preferential,
            self.mean_ratio,
            self.stderr_ratio,
        ]
    }

    fn from_fields(f: &[f64]) -> Self {
        Self {
            value: f[0],
            mean_random: f[1],
            stderr_random: f[2],
            mean_preferential: f[3],
            stderr_preferential: f[4],
            mean_ratio: f[5],
            stderr_ratio: f[6],
        }
    }
}

/// Steady-state quality of one empirical network
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmpiricalRow {
    pub n_bots: usize,
    pub n_humans: usize,
    pub beta: f64,
    pub gamma: f64,
    pub avg_quality: f64,
}

impl EmpiricalRow {
    pub fn new(measured: &MeasuredInfiltration, avg_quality: f64) -> Self {
        Self {
            n_bots: measured.n_bots,
            n_humans: measured.n_humans,
            beta: measured.beta,
            gamma: measured.gamma,
            avg_quality,
        }
    }
}

impl Row for EmpiricalRow {
    const FIELDS: usize = 5;

    fn to_fields(&self) -> Vec<f64> {
        vec![
            self.n_bots as f64,
            self.n_humans as f64,
            self.beta,
            self.gamma,
            self.avg_quality,
        ]
    }

    fn from_fields(f: &[f64]) -> Self {
        Self {
            n_bots: f[0] as usize,
            n_humans: f[1] as usize,
            beta: f[2],
            gamma: f[3],
            avg_quality: f[4],
        }
    }
}

/// Holds the exclusive lock on an open table file until dropped
struct LockedFile {
    file: File,
}

impl LockedFile {
    fn acquire(file: File, path: &Path, attempts: u32) -> IoResult<Self> {
        let mut backoff = INITIAL_BACKOFF;
        for attempt in 1..=attempts {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file }),
                Err(e) if is_contended(&e) => {
                    tracing::debug!(attempt, path = %path.display(), "results table busy");
                    thread::sleep(backoff);
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => return Err(e.into()),
            }
        }
        tracing::warn!(path = %path.display(), "gave up waiting for results lock");
        Err(IoError::LockTimeout {
            path: path.to_path_buf(),
            attempts,
        })
    }
}

impl Drop for LockedFile {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(error = %e, "failed to release results lock");
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    let contended = fs2::lock_contended_error();
    err.kind() == contended.kind() && err.raw_os_error() == contended.raw_os_error()
}

/// An append-only table of `R` rows
#[derive(Debug, Clone)]
pub struct ResultsTable<R> {
    path: PathBuf,
    lock_attempts: u32,
    _row: PhantomData<R>,
}

impl<R: Row> ResultsTable<R> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_attempts: LOCK_ATTEMPTS,
            _row: PhantomData,
        }
    }

    /// Bound on lock retries before an append fails
    pub fn with_lock_attempts(mut self, attempts: u32) -> Self {
        self.lock_attempts = attempts.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, creating the file and parent directories if needed
    pub fn append(&self, row: &R) -> IoResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut locked = LockedFile::acquire(file, &self.path, self.lock_attempts)?;
        writeln!(locked.file, "{}", row.to_line())?;
        locked.file.flush()?;
        tracing::debug!(path = %self.path.display(), "appended results row");
        Ok(())
    }

    /// Every row in file order; blank lines are skipped. A missing file is an
    /// empty table.
    pub fn read_all(&self) -> IoResult<Vec<R>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut rows = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push(R::parse_line(&line, i + 1)?);
        }
        Ok(rows)
    }
}
