//! The `net` engine: one TCP stream per job, depth 1, blocking transfers.
//!
//! A write job connects to its target and only sends; a read job listens on
//! the target's port, accepts one peer and only receives. Each unit is moved
//! with a single syscall and any shortfall is reported, never retried.

use std::net::TcpStream;

use tracing::debug;

use super::executor::transfer;
use super::validation::validate_unit;
use super::{EngineFlags, EngineState, IoEngine, MAX_DEPTH};
use crate::config::RwMode;
use crate::error::{ConfigError, ContractError, EngineError, EngineResult};
use crate::io_unit::{IoUnit, UnitId};
use crate::job::Job;
use crate::socket::{self, Listener};
use crate::target::Target;

/// Registry name of this engine.
pub const NAME: &str = "net";

/// The depth-1 slot: the one unit the harness has not retrieved yet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Slot {
    #[default]
    Empty,
    Submitted(UnitId),
    Executed(UnitId),
}

#[derive(Debug, Default)]
struct NetData {
    send_to_net: bool,
    conn: Option<TcpStream>,
    last_completed: Option<UnitId>,
    slot: Slot,
}

/// Single-connection network engine.
#[derive(Debug, Default)]
pub struct NetEngine {
    state: EngineState,
    data: Option<NetData>,
}

impl NetEngine {
    /// Creates an engine in the uninitialized state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once setup has locked the job to sending.
    #[must_use]
    pub fn sends_to_net(&self) -> bool {
        self.data.as_ref().is_some_and(|d| d.send_to_net)
    }

    /// Handle of the last unit that completed in full.
    #[must_use]
    pub fn last_completed(&self) -> Option<UnitId> {
        self.data.as_ref().and_then(|d| d.last_completed)
    }

    /// Local address of the connection, if one is established.
    #[must_use]
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.connection().and_then(|c| c.local_addr().ok())
    }

    /// Peer address of the connection, if one is established.
    #[must_use]
    pub fn peer_addr(&self) -> Option<std::net::SocketAddr> {
        self.connection().and_then(|c| c.peer_addr().ok())
    }

    fn connection(&self) -> Option<&TcpStream> {
        self.data.as_ref().and_then(|d| d.conn.as_ref())
    }

    /// Sets up a read job on a listener the caller already bound.
    ///
    /// This is the receiving half of [`IoEngine::setup`] split in two, so the
    /// caller can learn the bound port (e.g. after binding port 0) before the
    /// engine blocks in accept.
    ///
    /// # Errors
    /// Configuration errors as for `setup`, `ConfigError::RoleMismatch` if
    /// the job is not a read job, or an accept failure.
    pub fn setup_with_listener(&mut self, job: &mut Job, listener: Listener) -> EngineResult<()> {
        let result = self.setup_listener_inner(job, listener);
        if let Err(err) = &result {
            job.record_error(err);
        }
        result
    }

    fn setup_listener_inner(&mut self, job: &mut Job, listener: Listener) -> EngineResult<()> {
        self.init()?;
        check_job(job)?;
        if job.rw != RwMode::Read {
            return Err(ConfigError::RoleMismatch {
                job: job.name.clone(),
                rw: job.rw,
            }
            .into());
        }
        let (conn, _) = listener.accept_one()?;
        self.finish_setup(job, false, conn);
        Ok(())
    }

    fn setup_inner(&mut self, job: &mut Job) -> EngineResult<()> {
        self.init()?;
        let target = check_job(job)?;

        let send_to_net = job.rw != RwMode::Read;
        let conn = if send_to_net {
            socket::connect(&target)?
        } else {
            socket::listen_accept(target.port)?
        };

        self.finish_setup(job, send_to_net, conn);
        Ok(())
    }

    fn finish_setup(&mut self, job: &mut Job, send_to_net: bool, conn: TcpStream) {
        let data = self.data.get_or_insert_with(NetData::default);
        data.send_to_net = send_to_net;
        data.conn = Some(conn);

        let io_size = job.total_file_size;
        job.io_size = io_size;
        job.total_io_size = io_size;
        if let Some(file) = job.file_mut() {
            file.real_file_size = io_size;
        }

        self.state = EngineState::Configured;
        debug!(job = %job.name, send_to_net, io_size = job.io_size, "net engine configured");
    }

    fn data_mut(&mut self) -> EngineResult<&mut NetData> {
        match self.state {
            EngineState::Configured | EngineState::Active => {}
            _ => return Err(ContractError::NotConfigured.into()),
        }
        self.data
            .as_mut()
            .ok_or_else(|| ContractError::NotConfigured.into())
    }
}

/// Checks the one-direction, one-file model and parses the target.
fn check_job(job: &Job) -> Result<Target, ConfigError> {
    if job.is_mixed() {
        return Err(ConfigError::MixedDirections {
            job: job.name.clone(),
        });
    }
    if job.nr_files() > 1 {
        return Err(ConfigError::TooManyFiles {
            job: job.name.clone(),
            count: job.nr_files(),
        });
    }
    let file = job.file().ok_or_else(|| ConfigError::MissingTarget {
        job: job.name.clone(),
    })?;
    Target::parse(&file.name)
}

impl IoEngine for NetEngine {
    fn name(&self) -> &'static str {
        NAME
    }

    fn flags(&self) -> EngineFlags {
        EngineFlags {
            sync_io: true,
            net_io: true,
        }
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn init(&mut self) -> EngineResult<()> {
        if self.data.is_some() {
            return Ok(());
        }
        self.data = Some(NetData::default());
        self.state = EngineState::Initialized;
        Ok(())
    }

    fn setup(&mut self, job: &mut Job) -> EngineResult<()> {
        let result = self.setup_inner(job);
        if let Err(err) = &result {
            job.record_error(err);
        }
        result
    }

    fn submit(&mut self, job: &Job, unit: &mut IoUnit) -> EngineResult<()> {
        let data = self.data_mut()?;
        if data.slot != Slot::Empty {
            return Err(ContractError::DepthExceeded.into());
        }
        let file = job.file().ok_or_else(|| ConfigError::MissingTarget {
            job: job.name.clone(),
        })?;

        if let Err(err) = validate_unit(data.send_to_net, unit, file) {
            unit.error = Some(libc::EINVAL);
            return Err(err.into());
        }

        data.slot = Slot::Submitted(unit.id);
        self.state = EngineState::Active;
        Ok(())
    }

    fn execute(&mut self, unit: &mut IoUnit) -> EngineResult<()> {
        let data = self.data_mut()?;
        match data.slot {
            Slot::Executed(_) => return Err(ContractError::DepthExceeded.into()),
            Slot::Submitted(id) if id != unit.id => {
                return Err(ContractError::DepthExceeded.into());
            }
            Slot::Submitted(_) | Slot::Empty => {}
        }
        let conn = data.conn.as_mut().ok_or(ContractError::NotConfigured)?;

        // The unit stays outstanding whatever its outcome.
        data.slot = Slot::Executed(unit.id);
        transfer(conn, unit).map_err(EngineError::from)?;
        data.last_completed = Some(unit.id);
        Ok(())
    }

    fn poll_completions(&mut self, _min: usize, max: usize) -> EngineResult<usize> {
        if max > MAX_DEPTH {
            return Err(ContractError::MaxEventsAboveDepth { max }.into());
        }
        let outstanding = self.data.as_ref().is_some_and(|d| d.slot != Slot::Empty);
        Ok(usize::from(outstanding))
    }

    fn take_completion(&mut self, index: usize) -> EngineResult<Option<UnitId>> {
        if index != 0 {
            return Err(ContractError::EventIndex { index }.into());
        }
        let Some(data) = self.data.as_mut() else {
            return Ok(None);
        };
        data.slot = Slot::Empty;
        Ok(data.last_completed)
    }

    fn cleanup(&mut self) {
        if self.data.take().is_some() {
            self.state = EngineState::TornDown;
            debug!("net engine cleaned up");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::io_unit::DataDirection;

    use std::io::{Read, Write};
    use std::thread;

    /// Configures a send engine against a loopback peer; returns the peer's stream.
    fn send_engine() -> (NetEngine, Job, TcpStream) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut job = Job::new("tx", RwMode::Write, format!("127.0.0.1:{port}"), 8192);

        let mut engine = NetEngine::new();
        engine.setup(&mut job).unwrap();
        let (peer, _) = listener.accept().unwrap();
        assert_eq!(engine.peer_addr(), Some(listener.local_addr().unwrap()));
        assert_eq!(engine.local_addr(), peer.peer_addr().ok());
        (engine, job, peer)
    }

    #[test]
    fn init_is_idempotent() {
        let mut engine = NetEngine::new();
        assert_eq!(engine.state(), EngineState::Uninitialized);
        engine.init().unwrap();
        engine.init().unwrap();
        assert_eq!(engine.state(), EngineState::Initialized);
        assert!(engine.last_completed().is_none());
    }

    #[test]
    fn mixed_job_is_rejected_without_socket() {
        let mut engine = NetEngine::new();
        let mut job = Job::new("mix", RwMode::ReadWrite, "127.0.0.1:1", 4096);
        let err = engine.setup(&mut job).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::MixedDirections { .. })));
        assert!(engine.local_addr().is_none());
        assert_eq!(engine.state(), EngineState::Initialized);
        assert!(job.last_error().is_some());
    }

    #[test]
    fn multi_file_job_is_rejected() {
        let mut engine = NetEngine::new();
        let mut job = Job::new("multi", RwMode::Write, "127.0.0.1:1", 4096);
        job.files.push(crate::job::FileState::new("127.0.0.1:2"));
        let err = engine.setup(&mut job).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::TooManyFiles { count: 2, .. })));
    }

    #[test]
    fn malformed_target_is_rejected() {
        let mut engine = NetEngine::new();
        let mut job = Job::new("bad", RwMode::Write, "noport", 4096);
        let err = engine.setup(&mut job).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("noport"));
        assert!(job.last_error().unwrap().message.contains("noport"));
    }

    #[test]
    fn setup_sets_job_sizes() {
        let (engine, job, _peer) = send_engine();
        assert!(engine.sends_to_net());
        assert_eq!(engine.state(), EngineState::Configured);
        assert_eq!(job.io_size, 8192);
        assert_eq!(job.total_io_size, 8192);
        assert_eq!(job.file().unwrap().real_file_size, 8192);
    }

    #[test]
    fn submit_before_setup_is_a_contract_error() {
        let mut engine = NetEngine::new();
        let job = Job::new("tx", RwMode::Write, "127.0.0.1:1", 0);
        let mut unit = IoUnit::new(UnitId(0), DataDirection::Write, 0, 16);
        let err = engine.submit(&job, &mut unit).unwrap_err();
        assert!(matches!(err, EngineError::Contract(ContractError::NotConfigured)));
    }

    #[test]
    fn send_job_rejects_read_and_keeps_last_completed() {
        let (mut engine, mut job, mut peer) = send_engine();

        let mut first = IoUnit::with_buffer(UnitId(1), DataDirection::Write, 0, vec![1; 64]);
        engine.submit(&job, &mut first).unwrap();
        engine.execute(&mut first).unwrap();
        assert_eq!(engine.take_completion(0).unwrap(), Some(UnitId(1)));
        job.mark_completed(&first);

        let mut read = IoUnit::new(UnitId(2), DataDirection::Read, 64, 64);
        let err = engine.submit(&job, &mut read).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::WrongDirection { .. })
        ));
        assert_eq!(read.error, Some(libc::EINVAL));
        assert_eq!(engine.last_completed(), Some(UnitId(1)));
        assert_eq!(engine.poll_completions(0, 1).unwrap(), 0);

        let mut buf = [0u8; 64];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1; 64]);
    }

    #[test]
    fn non_sequential_offset_is_rejected() {
        let (mut engine, job, _peer) = send_engine();
        let mut unit = IoUnit::new(UnitId(0), DataDirection::Write, 512, 16);
        let err = engine.submit(&job, &mut unit).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(engine.state(), EngineState::Configured);
    }

    #[test]
    fn completion_slot_holds_one_unit() {
        let (mut engine, job, _peer) = send_engine();
        assert_eq!(engine.poll_completions(0, 1).unwrap(), 0);

        let mut unit = IoUnit::new(UnitId(7), DataDirection::Write, 0, 128);
        engine.submit(&job, &mut unit).unwrap();
        assert_eq!(engine.state(), EngineState::Active);
        engine.execute(&mut unit).unwrap();

        assert_eq!(engine.poll_completions(1, 1).unwrap(), 1);
        assert!(matches!(
            engine.poll_completions(1, 2),
            Err(EngineError::Contract(ContractError::MaxEventsAboveDepth { max: 2 }))
        ));
        assert!(matches!(
            engine.take_completion(1),
            Err(EngineError::Contract(ContractError::EventIndex { index: 1 }))
        ));

        // Depth is 1: a second execute before retrieval is refused.
        let mut second = IoUnit::new(UnitId(8), DataDirection::Write, 128, 128);
        assert!(matches!(
            engine.execute(&mut second),
            Err(EngineError::Contract(ContractError::DepthExceeded))
        ));

        assert_eq!(engine.take_completion(0).unwrap(), Some(UnitId(7)));
        assert_eq!(engine.poll_completions(0, 1).unwrap(), 0);
    }

    #[test]
    fn submitted_unit_is_outstanding_until_taken() {
        let (mut engine, job, _peer) = send_engine();

        let mut unit = IoUnit::new(UnitId(4), DataDirection::Write, 0, 16);
        engine.submit(&job, &mut unit).unwrap();
        assert_eq!(engine.poll_completions(0, 1).unwrap(), 1);

        let mut other = IoUnit::new(UnitId(5), DataDirection::Write, 0, 16);
        let err = engine.submit(&job, &mut other).unwrap_err();
        assert!(err.is_contract());
        assert!(matches!(err, EngineError::Contract(ContractError::DepthExceeded)));
        assert!(other.is_ok());
        assert!(engine.execute(&mut other).is_err());

        // Nothing has completed yet, but retrieval still frees the slot.
        assert_eq!(engine.take_completion(0).unwrap(), None);
        assert_eq!(engine.poll_completions(0, 1).unwrap(), 0);
        engine.submit(&job, &mut other).unwrap();
        engine.execute(&mut other).unwrap();
        assert_eq!(engine.take_completion(0).unwrap(), Some(UnitId(5)));
    }

    #[test]
    fn sync_unit_completes_without_io() {
        let (mut engine, job, _peer) = send_engine();
        let mut unit = IoUnit::sync(UnitId(3), 4096);
        engine.submit(&job, &mut unit).unwrap();
        engine.execute(&mut unit).unwrap();
        assert_eq!(engine.take_completion(0).unwrap(), Some(UnitId(3)));
    }

    #[test]
    fn receive_job_via_prebound_listener() {
        let listener = socket::bind_listener(0).unwrap();
        let port = listener.local_addr().port();

        let sender = thread::spawn(move || {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
            stream.write_all(&[9; 256]).unwrap();
        });

        let mut job = Job::new("rx", RwMode::Read, format!("0.0.0.0:{port}"), 256);
        let mut engine = NetEngine::new();
        engine.setup_with_listener(&mut job, listener).unwrap();
        assert!(!engine.sends_to_net());
        sender.join().unwrap();

        let mut write = IoUnit::new(UnitId(0), DataDirection::Write, 0, 256);
        assert!(engine.submit(&job, &mut write).is_err());

        let mut read = IoUnit::new(UnitId(1), DataDirection::Read, 0, 256);
        engine.submit(&job, &mut read).unwrap();
        engine.execute(&mut read).unwrap();
        assert_eq!(read.buf, vec![9; 256]);
    }

    #[test]
    fn prebound_listener_refuses_write_job() {
        let listener = socket::bind_listener(0).unwrap();
        let port = listener.local_addr().port();

        // Returns without blocking in accept; nobody ever connects.
        let mut job = Job::new("tx", RwMode::Write, format!("0.0.0.0:{port}"), 256);
        let mut engine = NetEngine::new();
        let err = engine.setup_with_listener(&mut job, listener).unwrap_err();

        assert!(matches!(
            err,
            EngineError::Config(ConfigError::RoleMismatch { rw: RwMode::Write, .. })
        ));
        assert!(engine.peer_addr().is_none());
        assert_ne!(engine.state(), EngineState::Configured);
        let record = job.last_error().unwrap();
        assert_eq!(record.os_code, None);
        assert!(record.message.contains("tx"));
    }

    #[test]
    fn cleanup_is_idempotent() {
        let (mut engine, _job, _peer) = send_engine();
        engine.cleanup();
        assert_eq!(engine.state(), EngineState::TornDown);
        assert!(engine.local_addr().is_none());
        engine.cleanup();
        assert_eq!(engine.state(), EngineState::TornDown);
    }
}
