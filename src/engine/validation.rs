//! Per-unit validation.
//!
//! A network job moves bytes in one direction over one stream, so every unit
//! must match the job's direction and start exactly where the previous
//! completed unit ended.

use crate::error::ValidationError;
use crate::io_unit::{DataDirection, IoUnit};
use crate::job::FileState;

/// Rejects units whose direction does not match the job's role.
///
/// Sync units pass in either role.
pub fn validate_direction(send_to_net: bool, ddir: DataDirection) -> Result<(), ValidationError> {
    match (send_to_net, ddir) {
        (true, DataDirection::Read) => Err(ValidationError::WrongDirection {
            ddir,
            role: "send",
        }),
        (false, DataDirection::Write) => Err(ValidationError::WrongDirection {
            ddir,
            role: "receive",
        }),
        _ => Ok(()),
    }
}

/// Rejects units that do not continue the stream at `last_completed_pos`.
pub fn validate_offset(unit: &IoUnit, file: &FileState) -> Result<(), ValidationError> {
    if unit.ddir == DataDirection::Sync || unit.offset == file.last_completed_pos {
        return Ok(());
    }
    Err(ValidationError::NonSequentialOffset {
        offset: unit.offset,
        expected: file.last_completed_pos,
    })
}

/// Runs both checks, direction first.
pub fn validate_unit(send_to_net: bool, unit: &IoUnit, file: &FileState) -> Result<(), ValidationError> {
    validate_direction(send_to_net, unit.ddir)?;
    validate_offset(unit, file)
}
