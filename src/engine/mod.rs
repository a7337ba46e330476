//! I/O engine contract.
//!
//! The harness drives every engine through the same lifecycle:
//! `init` → `setup` → (`submit` → `execute` → `poll_completions` →
//! `take_completion`)* → `cleanup`. Engines are looked up by name in an
//! [`EngineRegistry`].

mod executor;
mod net;
mod registry;
mod validation;

pub use executor::{classify, transfer};
pub use net::NetEngine;
pub use registry::{EngineFactory, EngineRegistry};
pub use validation::{validate_direction, validate_offset, validate_unit};

use std::fmt;

use crate::error::EngineResult;
use crate::io_unit::{IoUnit, UnitId};
use crate::job::Job;

/// Maximum number of outstanding units for the engines in this crate.
pub const MAX_DEPTH: usize = 1;

/// Capabilities an engine advertises to the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineFlags {
    /// `execute` completes the unit before returning.
    pub sync_io: bool,
    /// The target is a network peer rather than a file.
    pub net_io: bool,
}

/// Lifecycle state of an engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// No per-job state allocated.
    #[default]
    Uninitialized,
    /// State allocated, no external resources.
    Initialized,
    /// Connection established and direction locked.
    Configured,
    /// At least one unit accepted.
    Active,
    /// Resources released.
    TornDown,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Configured => "configured",
            Self::Active => "active",
            Self::TornDown => "torn_down",
        };
        f.write_str(s)
    }
}

/// The contract between the harness and an I/O engine.
///
/// Units are owned by the harness. An engine annotates their outcome fields
/// and refers back to them only through [`UnitId`].
pub trait IoEngine: Send {
    /// Registry name of the engine.
    fn name(&self) -> &'static str;

    /// Capabilities of the engine.
    fn flags(&self) -> EngineFlags;

    /// Current lifecycle state.
    fn state(&self) -> EngineState;

    /// Allocates per-job state. Calling it again is a no-op.
    fn init(&mut self) -> EngineResult<()>;

    /// Prepares the engine for `job`, running `init` first if needed.
    fn setup(&mut self, job: &mut Job) -> EngineResult<()>;

    /// Validates a unit before execution.
    ///
    /// A rejected unit carries the error code in `unit.error`; the job may
    /// go on with other units.
    fn submit(&mut self, job: &Job, unit: &mut IoUnit) -> EngineResult<()>;

    /// Executes a validated unit.
    fn execute(&mut self, unit: &mut IoUnit) -> EngineResult<()>;

    /// Number of completions ready for retrieval; `max` may not exceed the depth.
    fn poll_completions(&mut self, min: usize, max: usize) -> EngineResult<usize>;

    /// Retrieves completion `index`.
    fn take_completion(&mut self, index: usize) -> EngineResult<Option<UnitId>>;

    /// Releases resources. Calling it again is a no-op.
    fn cleanup(&mut self);
}
