//! I/O units: the harness-owned transfer requests an engine executes.
//!
//! The engine never allocates or frees units. It reads the request fields,
//! writes the outcome fields (`resid`, `error`) and remembers the [`UnitId`]
//! of the last unit that completed in full.

use std::fmt;

/// Stable handle for an I/O unit, assigned by the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io_u#{}", self.0)
    }
}

/// Direction of a single I/O unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataDirection {
    /// Receive bytes into the buffer.
    Read,
    /// Send the buffer.
    Write,
    /// No-op barrier; never touches the connection.
    Sync,
}

impl fmt::Display for DataDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Sync => "sync",
        };
        f.write_str(s)
    }
}

/// One transfer request.
#[derive(Debug, Clone)]
pub struct IoUnit {
    /// Harness-assigned handle.
    pub id: UnitId,
    /// Transfer direction.
    pub ddir: DataDirection,
    /// Memory window; its length is the requested transfer length.
    pub buf: Vec<u8>,
    /// Expected stream position of the first byte.
    pub offset: u64,
    /// Bytes not transferred, set on a short or failed transfer.
    pub resid: usize,
    /// Raw OS error code recorded by validation or execution.
    pub error: Option<i32>,
}

impl IoUnit {
    /// Creates a unit with a zeroed buffer of `len` bytes.
    #[must_use]
    pub fn new(id: UnitId, ddir: DataDirection, offset: u64, len: usize) -> Self {
        Self::with_buffer(id, ddir, offset, vec![0; len])
    }

    /// Creates a unit around an existing buffer.
    #[must_use]
    pub fn with_buffer(id: UnitId, ddir: DataDirection, offset: u64, buf: Vec<u8>) -> Self {
        Self {
            id,
            ddir,
            buf,
            offset,
            resid: 0,
            error: None,
        }
    }

    /// Creates a sync (no-op) unit.
    #[must_use]
    pub fn sync(id: UnitId, offset: u64) -> Self {
        Self::with_buffer(id, DataDirection::Sync, offset, Vec::new())
    }

    /// Requested transfer length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if the unit requests zero bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes actually moved so far.
    #[must_use]
    pub fn transferred(&self) -> usize {
        self.len() - self.resid.min(self.len())
    }

    /// Stream position right after this unit.
    #[must_use]
    pub fn end_offset(&self) -> u64 {
        self.offset + self.len() as u64
    }

    /// Returns true if no error has been recorded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub(crate) fn fail(&mut self, code: i32, resid: usize) {
        self.error = Some(code);
        self.resid = resid;
    }
}
