//! The lifecycle record shared between the host event thread and the
//! application thread, and the run-then-destroy sequence over it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::LifecycleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Destroying,
    Destroyed,
}

pub trait InputQueue: Send {
    fn detach_looper(&mut self);
}

/// Host configuration handle; released once during teardown.
pub trait HostConfiguration: Send {
    fn release(self: Box<Self>) {}
}

struct Record {
    phase: Phase,
    saved_state: Option<Vec<u8>>,
    input_queue: Option<Box<dyn InputQueue>>,
    config: Option<Box<dyn HostConfiguration>>,
}

/// Every field lives behind one lock. The condvar only ever signals the
/// move to [`Phase::Destroyed`].
pub struct LifecycleState {
    record: Mutex<Record>,
    destroyed: Condvar,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleState {
    pub fn new() -> Self {
        Self {
            record: Mutex::new(Record {
                phase: Phase::Running,
                saved_state: None,
                input_queue: None,
                config: None,
            }),
            destroyed: Condvar::new(),
        }
    }

    pub fn with_config(self, config: Box<dyn HostConfiguration>) -> Self {
        self.record.lock().config = Some(config);
        self
    }

    pub fn with_saved_state(self, saved_state: Vec<u8>) -> Self {
        self.record.lock().saved_state = Some(saved_state);
        self
    }

    pub fn phase(&self) -> Phase {
        self.record.lock().phase
    }

    pub fn is_destroyed(&self) -> bool {
        self.phase() == Phase::Destroyed
    }

    pub fn saved_state_size(&self) -> usize {
        self.record.lock().saved_state.as_ref().map_or(0, Vec::len)
    }

    pub fn has_input_queue(&self) -> bool {
        self.record.lock().input_queue.is_some()
    }

    pub fn deliver_saved_state(&self, saved_state: Vec<u8>) -> Result<(), LifecycleError> {
        let mut record = self.running()?;
        record.saved_state = Some(saved_state);
        Ok(())
    }

    pub fn take_saved_state(&self) -> Result<Option<Vec<u8>>, LifecycleError> {
        Ok(self.running()?.saved_state.take())
    }

    pub fn attach_input_queue(&self, queue: Box<dyn InputQueue>) -> Result<(), LifecycleError> {
        let mut record = self.running()?;
        if let Some(mut previous) = record.input_queue.replace(queue) {
            previous.detach_looper();
        }
        Ok(())
    }

    pub fn detach_input_queue(&self) -> Result<bool, LifecycleError> {
        let mut record = self.running()?;
        match record.input_queue.take() {
            Some(mut queue) => {
                queue.detach_looper();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Swaps in a new configuration, releasing the old one. A refused
    /// configuration is released immediately.
    pub fn replace_config(&self, config: Box<dyn HostConfiguration>) -> Result<(), LifecycleError> {
        let mut record = match self.running() {
            Ok(record) => record,
            Err(err) => {
                config.release();
                return Err(err);
            }
        };
        if let Some(previous) = record.config.replace(config) {
            previous.release();
        }
        Ok(())
    }

    pub fn wait_destroyed(&self) {
        let mut record = self.record.lock();
        while record.phase != Phase::Destroyed {
            self.destroyed.wait(&mut record);
        }
    }

    /// Like [`wait_destroyed`](Self::wait_destroyed) but gives up after
    /// `timeout`. Returns whether the record was destroyed.
    pub fn wait_destroyed_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait_destroyed();
            return true;
        };
        let mut record = self.record.lock();
        while record.phase != Phase::Destroyed {
            if self.destroyed.wait_until(&mut record, deadline).timed_out() {
                return record.phase == Phase::Destroyed;
            }
        }
        true
    }

    fn running(&self) -> Result<MutexGuard<'_, Record>, LifecycleError> {
        let record = self.record.lock();
        match record.phase {
            Phase::Running => Ok(record),
            Phase::Destroying => Err(LifecycleError::Destroying),
            Phase::Destroyed => Err(LifecycleError::Destroyed),
        }
    }

    /// First teardown step. Returns `false` if teardown already finished.
    pub(crate) fn release_saved_state(&self) -> bool {
        let mut record = self.record.lock();
        if record.phase == Phase::Destroyed {
            return false;
        }
        record.phase = Phase::Destroying;
        if let Some(saved_state) = record.saved_state.take() {
            debug!(bytes = saved_state.len(), "saved state released");
        }
        true
    }

    /// Second teardown step; the only place that sets `Destroyed`.
    pub(crate) fn finalize_teardown(&self) -> bool {
        let mut record = self.record.lock();
        if record.phase == Phase::Destroyed {
            return false;
        }
        if let Some(mut queue) = record.input_queue.take() {
            queue.detach_looper();
        }
        if let Some(config) = record.config.take() {
            config.release();
        }
        record.phase = Phase::Destroyed;
        self.destroyed.notify_all();
        drop(record);
        true
    }
}

#[derive(Clone)]
pub struct AppContext {
    writable_root: PathBuf,
    lifecycle: Arc<LifecycleState>,
}

impl AppContext {
    pub fn new(writable_root: impl Into<PathBuf>, lifecycle: Arc<LifecycleState>) -> Self {
        Self {
            writable_root: writable_root.into(),
            lifecycle,
        }
    }

    pub fn writable_root(&self) -> &Path {
        &self.writable_root
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleState> {
        &self.lifecycle
    }
}

/// Runs the portable entry point once, then tears the record down.
pub struct AppLifecycleController {
    state: Arc<LifecycleState>,
}

impl AppLifecycleController {
    pub fn new(state: Arc<LifecycleState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<LifecycleState> {
        &self.state
    }

    pub fn run<F>(&self, context: &AppContext, entry: F) -> i32
    where
        F: FnOnce(&AppContext) -> i32,
    {
        info!("entering application main");
        let status = entry(context);
        info!(status, "application main returned");
        status
    }

    /// Releases the saved state, then detaches the input queue, releases
    /// the configuration and marks the record destroyed, waking all waiters.
    /// Each step takes the lock on its own.
    pub fn destroy(self) {
        debug!("destroying lifecycle record");
        self.state.release_saved_state();
        self.state.finalize_teardown();
    }

    pub fn run_and_destroy<F>(self, context: &AppContext, entry: F) -> i32
    where
        F: FnOnce(&AppContext) -> i32,
    {
        let status = self.run(context, entry);
        self.destroy();
        status
    }
}
