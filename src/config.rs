//! Job configuration loading.
//!
//! Jobs are described in a TOML file with one `[[job]]` table per job:
//!
//! ```toml
//! [[job]]
//! name = "sender"
//! rw = "write"
//! filename = "127.0.0.1:9000"
//! size = "1m"
//! bs = "4k"
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the engine used when a job does not pick one.
pub const DEFAULT_ENGINE: &str = "net";

/// Block size used when a job does not set `bs`.
pub const DEFAULT_BLOCK_SIZE: u64 = 4096;

/// Configured I/O mode of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RwMode {
    /// Read only.
    Read,
    /// Write only.
    Write,
    /// Mixed reads and writes.
    #[serde(alias = "rw")]
    ReadWrite,
}

impl RwMode {
    /// Returns true if the job mixes reads and writes.
    #[must_use]
    pub const fn is_mixed(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

impl fmt::Display for RwMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "readwrite",
        };
        f.write_str(s)
    }
}

/// A byte count that accepts `k`/`m`/`g` suffixes (base 1024).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "SizeRepr", into = "u64")]
pub struct Size(pub u64);

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Int(u64),
    Str(String),
}

impl TryFrom<SizeRepr> for Size {
    type Error = ConfigError;

    fn try_from(repr: SizeRepr) -> Result<Self, Self::Error> {
        match repr {
            SizeRepr::Int(n) => Ok(Self(n)),
            SizeRepr::Str(s) => parse_size(&s).map(Self),
        }
    }
}

impl From<Size> for u64 {
    fn from(size: Size) -> Self {
        size.0
    }
}

/// Parses a size string such as `4096`, `4k`, `1M` or `2g`.
///
/// # Errors
/// `ConfigError::InvalidSize` on an unknown suffix, a missing number or overflow.
pub fn parse_size(value: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidSize {
        value: value.to_string(),
    };

    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split);

    let base: u64 = digits.parse().map_err(|_| invalid())?;
    let shift = match suffix.to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" | "kib" => 10,
        "m" | "mb" | "mib" => 20,
        "g" | "gb" | "gib" => 30,
        _ => return Err(invalid()),
    };

    base.checked_mul(1u64 << shift).ok_or_else(invalid)
}

fn default_engine() -> String {
    DEFAULT_ENGINE.to_string()
}

const fn default_block_size() -> Size {
    Size(DEFAULT_BLOCK_SIZE)
}

/// One job as written in a job file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Job name, used in reports and diagnostics.
    pub name: String,
    /// Engine name looked up in the registry.
    #[serde(default = "default_engine")]
    pub engine: String,
    /// I/O mode.
    pub rw: RwMode,
    /// Single target, `host:port` for network jobs.
    #[serde(default)]
    pub filename: Option<String>,
    /// Additional targets.
    #[serde(default)]
    pub files: Vec<String>,
    /// Total bytes to transfer.
    pub size: Size,
    /// Bytes per I/O unit.
    #[serde(default = "default_block_size")]
    pub bs: Size,
}

impl JobSpec {
    /// Creates a single-target job spec with the default engine and block size.
    #[must_use]
    pub fn new(name: impl Into<String>, rw: RwMode, target: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            engine: default_engine(),
            rw,
            filename: Some(target.into()),
            files: Vec::new(),
            size: Size(size),
            bs: default_block_size(),
        }
    }

    /// Sets the block size.
    #[must_use]
    pub fn with_block_size(mut self, bs: u64) -> Self {
        self.bs = Size(bs);
        self
    }

    /// All targets of this job, `filename` first.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.filename
            .iter()
            .chain(self.files.iter())
            .map(String::as_str)
    }
}

/// A parsed job file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFile {
    /// Jobs in file order.
    #[serde(rename = "job", default)]
    pub jobs: Vec<JobSpec>,
}

impl JobFile {
    /// Parses a job file from TOML text.
    ///
    /// # Errors
    /// `ConfigError::Parse` with the TOML diagnostic.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Reads and parses a job file.
    ///
    /// # Errors
    /// `ConfigError::Parse` if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            message: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml_str(&text)
    }
}
