//! Error types for netio.
//!
//! All errors are strongly typed using thiserror. Each category maps to one
//! phase of a job: configuration and setup errors stop the job before any
//! transfer, validation and transfer errors are attached to a single I/O unit
//! and leave the harness free to continue or abort.

use std::io;

use thiserror::Error;

use crate::config::RwMode;
use crate::io_unit::DataDirection;

/// Configuration errors detected before any socket activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bad network host:port <<{target}>>")]
    MalformedTarget {
        target: String,
    },

    #[error("invalid port '{port}' in target <<{target}>>")]
    InvalidPort {
        target: String,
        port: String,
    },

    #[error("network connections must be read OR write (job '{job}')")]
    MixedDirections {
        job: String,
    },

    #[error("only one file supported for network (job '{job}' has {count})")]
    TooManyFiles {
        job: String,
        count: usize,
    },

    #[error("job '{job}' is configured for {rw}; a listener needs a read job")]
    RoleMismatch {
        job: String,
        rw: RwMode,
    },

    #[error("job '{job}' has no target")]
    MissingTarget {
        job: String,
    },

    #[error("invalid size '{value}'")]
    InvalidSize {
        value: String,
    },

    #[error("failed to parse job file: {message}")]
    Parse {
        message: String,
    },
}

/// Connection errors raised while establishing the job's socket.
///
/// Every variant carries the underlying OS error.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to resolve '{host}': {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("socket: {0}")]
    Socket(#[source] io::Error),

    #[error("setsockopt: {0}")]
    SetOption(#[source] io::Error),

    #[error("bind to port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("listen: {0}")]
    Listen(#[source] io::Error),

    #[error("accept: {0}")]
    Accept(#[source] io::Error),

    #[error("connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
}

impl SetupError {
    /// Returns the underlying I/O error.
    #[must_use]
    pub fn io_error(&self) -> &io::Error {
        match self {
            Self::Resolve { source, .. }
            | Self::Bind { source, .. }
            | Self::Connect { source, .. } => source,
            Self::Socket(e) | Self::SetOption(e) | Self::Listen(e) | Self::Accept(e) => e,
        }
    }

    /// OS error code of the failing step.
    ///
    /// Resolver failures rarely carry an errno; they report `EHOSTUNREACH`.
    /// Any other step without one reports `EIO`.
    #[must_use]
    pub fn os_code(&self) -> i32 {
        self.io_error().raw_os_error().unwrap_or(match self {
            Self::Resolve { .. } => libc::EHOSTUNREACH,
            _ => libc::EIO,
        })
    }
}

/// Per-operation validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{ddir} operation rejected by a {role} job")]
    WrongDirection {
        ddir: DataDirection,
        role: &'static str,
    },

    #[error("offset {offset} is not sequential (expected {expected})")]
    NonSequentialOffset {
        offset: u64,
        expected: u64,
    },
}

/// Per-operation transfer errors. No transfer is ever retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("short transfer: {transferred} of {requested} bytes")]
    Short {
        requested: usize,
        transferred: usize,
    },

    #[error("peer closed the connection")]
    PeerClosed,

    #[error("transfer failed with os error {code}")]
    Os {
        code: i32,
    },
}

/// Violations of the depth-1 lifecycle contract by the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("engine is not configured; call setup first")]
    NotConfigured,

    #[error("previous completion has not been retrieved (depth is 1)")]
    DepthExceeded,

    #[error("completion index {index} out of range (depth is 1)")]
    EventIndex {
        index: usize,
    },

    #[error("requested up to {max} completions (depth is 1)")]
    MaxEventsAboveDepth {
        max: usize,
    },
}

/// Top-level error type for netio.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("contract violation: {0}")]
    Contract(#[from] ContractError),

    #[error("unknown engine '{name}'")]
    UnknownEngine {
        name: String,
    },
}

impl EngineError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a setup (connection) error.
    #[must_use]
    pub const fn is_setup(&self) -> bool {
        matches!(self, Self::Setup(_))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a transfer error.
    #[must_use]
    pub const fn is_transfer(&self) -> bool {
        matches!(self, Self::Transfer(_))
    }

    /// Returns true if this is a contract violation.
    #[must_use]
    pub const fn is_contract(&self) -> bool {
        matches!(self, Self::Contract(_))
    }

    /// The OS error code a C-style harness would report for this error.
    ///
    /// Setup errors carry the code of the failing syscall, validation errors
    /// map to `EINVAL` and short transfers to `EIO`.
    #[must_use]
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::Config(_) | Self::UnknownEngine { .. } => None,
            Self::Setup(e) => Some(e.os_code()),
            Self::Validation(_) | Self::Contract(_) => Some(libc::EINVAL),
            Self::Transfer(TransferError::Os { code }) => Some(*code),
            Self::Transfer(_) => Some(libc::EIO),
        }
    }
}

/// Result type alias for netio operations.
pub type EngineResult<T> = Result<T, EngineError>;
