//! Minimal sequential driver for a single job.
//!
//! The driver plays the harness role for one job: it sets the engine up,
//! issues block-sized units at the current stream position until the byte
//! budget is exhausted, retrieves every completion before issuing the next
//! unit, and always cleans up. The first error ends the job; nothing is
//! retried.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{JobSpec, RwMode};
use crate::engine::{EngineRegistry, IoEngine, MAX_DEPTH};
use crate::error::EngineResult;
use crate::io_unit::{DataDirection, IoUnit, UnitId};
use crate::job::Job;

/// Outcome of one driven job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    /// Job name.
    pub job: String,
    /// Engine that ran the job.
    pub engine: String,
    /// Configured I/O mode.
    pub rw: RwMode,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Bytes moved by fully completed units.
    pub bytes: u64,
    /// Fully completed units.
    pub ops: u64,
    /// Seconds from start to cleanup.
    pub elapsed_secs: f64,
    /// Error that ended the job early, if any.
    pub error: Option<String>,
    /// OS error code of that error, if any.
    pub os_code: Option<i32>,
}

impl JobReport {
    /// Returns true if the job moved its whole budget without error.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Average throughput in bytes per second.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.bytes as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }
}

/// Deterministic payload for write units, keyed by stream position.
#[must_use]
pub fn fill_pattern(offset: u64, len: usize) -> Vec<u8> {
    (0..len as u64)
        .map(|i| ((offset + i) % 251) as u8)
        .collect()
}

/// Drives `job` to completion on `engine`. Cleanup always runs.
pub fn drive(engine: &mut dyn IoEngine, job: &mut Job) -> JobReport {
    let started_at = Utc::now();
    let start = Instant::now();

    let mut report = JobReport {
        job: job.name.clone(),
        engine: engine.name().to_string(),
        rw: job.rw,
        started_at,
        bytes: 0,
        ops: 0,
        elapsed_secs: 0.0,
        error: None,
        os_code: None,
    };

    let outcome = run_units(engine, job, &mut report);
    engine.cleanup();
    report.elapsed_secs = start.elapsed().as_secs_f64();

    if let Err(err) = outcome {
        warn!(job = %job.name, error = %err, "job stopped");
        job.record_error(&err);
        report.error = Some(err.to_string());
        report.os_code = err.os_code();
    }
    report
}

fn run_units(engine: &mut dyn IoEngine, job: &mut Job, report: &mut JobReport) -> EngineResult<()> {
    engine.setup(job)?;

    let ddir = match job.rw {
        RwMode::Read => DataDirection::Read,
        RwMode::Write | RwMode::ReadWrite => DataDirection::Write,
    };

    let mut next_id = 0u64;
    while job.remaining() > 0 {
        let len = job.remaining().min(job.block_size as u64) as usize;
        let offset = job.file().map_or(0, |f| f.last_completed_pos);
        let id = UnitId(next_id);
        next_id += 1;

        let mut unit = match ddir {
            DataDirection::Write => IoUnit::with_buffer(id, ddir, offset, fill_pattern(offset, len)),
            _ => IoUnit::new(id, ddir, offset, len),
        };

        engine.submit(job, &mut unit)?;
        let executed = engine.execute(&mut unit);

        // Retrieve before deciding, so the depth-1 slot is always drained.
        if engine.poll_completions(0, MAX_DEPTH)? > 0 {
            engine.take_completion(0)?;
        }
        executed?;

        job.mark_completed(&unit);
        report.bytes += len as u64;
        report.ops += 1;
    }

    debug!(job = %job.name, bytes = report.bytes, ops = report.ops, "job finished");
    Ok(())
}

/// Builds the job for `spec`, creates its engine and drives it.
///
/// # Errors
/// Configuration errors in the spec and unknown engine names. Failures while
/// the job runs are reported in the returned [`JobReport`].
pub fn run_job(registry: &EngineRegistry, spec: &JobSpec) -> EngineResult<JobReport> {
    let mut job = Job::from_spec(spec)?;
    let mut engine = registry.create(&spec.engine)?;
    Ok(drive(engine.as_mut(), &mut job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NetEngine;

    #[test]
    fn pattern_depends_on_offset() {
        let a = fill_pattern(0, 4);
        let b = fill_pattern(1, 4);
        assert_eq!(a, vec![0, 1, 2, 3]);
        assert_eq!(&a[1..], &b[..3]);
        assert_eq!(fill_pattern(250, 2), vec![250, 0]);
    }

    #[test]
    fn failed_setup_is_reported_and_cleaned_up() {
        let mut engine = NetEngine::new();
        let mut job = Job::new("bad", RwMode::Write, "noport", 4096);

        let report = drive(&mut engine, &mut job);
        assert!(!report.is_ok());
        assert_eq!(report.ops, 0);
        assert!(report.error.unwrap().contains("noport"));
        assert_eq!(engine.state(), crate::engine::EngineState::TornDown);
    }

    #[test]
    fn write_job_streams_whole_budget() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let reader = std::thread::spawn(move || {
            use std::io::Read;
            let (mut conn, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            conn.read_to_end(&mut received).unwrap();
            received
        });

        let spec = JobSpec::new("tx", RwMode::Write, format!("127.0.0.1:{port}"), 10_000)
            .with_block_size(4096);
        let report = run_job(&EngineRegistry::with_builtin(), &spec).unwrap();

        assert!(report.is_ok(), "{:?}", report.error);
        assert_eq!(report.bytes, 10_000);
        assert_eq!(report.ops, 3);

        let received = reader.join().unwrap();
        assert_eq!(received, fill_pattern(0, 10_000));
    }

    #[test]
    fn unknown_engine_fails_before_running() {
        let mut spec = JobSpec::new("x", RwMode::Write, "127.0.0.1:1", 1);
        spec.engine = "sg".to_string();
        assert!(run_job(&EngineRegistry::with_builtin(), &spec).is_err());
    }
}
