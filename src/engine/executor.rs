//! Synchronous executor: one blocking read or write per unit, never retried.

use std::io::{self, Read, Write};

use crate::error::TransferError;
use crate::io_unit::{DataDirection, IoUnit};

/// Issues exactly one `read` or `write` of the unit's full length and
/// classifies the result.
///
/// On failure the outcome is also recorded on the unit: `resid` holds the
/// bytes not moved and `error` the OS error code (`EIO` for short transfers
/// and for a peer that closed the stream).
pub fn transfer<S: Read + Write>(stream: &mut S, unit: &mut IoUnit) -> Result<(), TransferError> {
    let requested = unit.len();
    let result = match unit.ddir {
        DataDirection::Sync => return Ok(()),
        DataDirection::Write => stream.write(&unit.buf),
        DataDirection::Read => stream.read(&mut unit.buf),
    };

    match classify(requested, result) {
        Ok(()) => Ok(()),
        Err(err) => {
            let (code, resid) = match err {
                TransferError::Short {
                    requested,
                    transferred,
                } => (libc::EIO, requested - transferred),
                TransferError::PeerClosed => (libc::EIO, requested),
                TransferError::Os { code } => (code, requested),
            };
            unit.fail(code, resid);
            Err(err)
        }
    }
}

/// Maps the raw syscall outcome onto full, short or failed transfer.
pub fn classify(requested: usize, result: io::Result<usize>) -> Result<(), TransferError> {
    match result {
        Ok(n) if n == requested => Ok(()),
        Ok(0) => Err(TransferError::PeerClosed),
        Ok(n) => Err(TransferError::Short {
            requested,
            transferred: n,
        }),
        Err(e) => Err(TransferError::Os {
            code: e.raw_os_error().unwrap_or(libc::EIO),
        }),
    }
}
