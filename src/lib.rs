//! # netio - a depth-one TCP transfer engine
//!
//! netio is an execution backend for I/O benchmarking harnesses. A harness
//! hands it one job at a time; the engine opens exactly one TCP connection
//! for that job and moves one block per call, synchronously, with at most one
//! outstanding unit.
//!
//! ## Core Concepts
//!
//! - **Job**: one target, one direction, a byte budget
//! - **IoUnit**: a harness-owned transfer request at a strictly sequential offset
//! - **IoEngine**: the lifecycle contract (`setup`, `submit`, `execute`, completions, `cleanup`)
//! - **EngineRegistry**: explicit name → factory dispatch
//!
//! ## Usage
//!
//! ```rust,no_run
//! use netio::{drive, EngineRegistry, Job, RwMode};
//!
//! let registry = EngineRegistry::with_builtin();
//! let mut engine = registry.create("net")?;
//! let mut job = Job::new("sender", RwMode::Write, "127.0.0.1:9000", 1 << 20);
//!
//! let report = drive(engine.as_mut(), &mut job);
//! println!("{} bytes in {:.3}s", report.bytes, report.elapsed_secs);
//! # Ok::<(), netio::EngineError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod engine;
pub mod error;
pub mod io_unit;
pub mod job;
pub mod runner;
pub mod socket;
pub mod target;

// Re-export primary types at crate root for convenience
pub use config::{parse_size, JobFile, JobSpec, RwMode, Size};
pub use engine::{EngineFlags, EngineRegistry, EngineState, IoEngine, NetEngine, MAX_DEPTH};
pub use error::{
    ConfigError, ContractError, EngineError, EngineResult, SetupError, TransferError,
    ValidationError,
};
pub use io_unit::{DataDirection, IoUnit, UnitId};
pub use job::{ErrorRecord, FileState, Job};
pub use runner::{drive, fill_pattern, run_job, JobReport};
pub use target::Target;
