//! Host application run by `portctl start`.
//!
//! Either idles until a `stop` arrives, or supervises a child program and
//! kills it on `stop`. Process exit after a `stop` is handed back to the
//! thread blocked in [`ProcessHost::wait`], once the stop has been acknowledged.
//!
//! CHANGELOG:
//! - 10/19/2026 - Child process supervision
//! - 10/19/2026 - Initial implementation

use anyhow::{Context, Result};
use std::process::{Child, Command};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};

use crate::control::server::ControlHost;

/// How often a supervised child is polled for exit.
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Why [`ProcessHost::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostExit {
    /// A stop was acknowledged; exit with this code.
    Stopped(i32),
    /// The supervised program exited on its own with this code.
    ChildExited(i32),
}

#[derive(Default)]
struct HostState {
    exit_code: Option<i32>,
    child: Option<Child>,
}

/// Host application for server mode.
pub struct ProcessHost {
    state: Mutex<HostState>,
    changed: Condvar,
}

impl ProcessHost {
    /// Host with nothing to supervise.
    pub fn idle() -> Self {
        Self {
            state: Mutex::new(HostState::default()),
            changed: Condvar::new(),
        }
    }

    /// Host supervising `program` with `args`.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        let child = Command::new(program)
            .args(args)
            .spawn()
            .with_context(|| format!("Failed to start {}", program))?;
        info!(program = %program, pid = child.id(), "started supervised program");

        Ok(Self {
            state: Mutex::new(HostState {
                exit_code: None,
                child: Some(child),
            }),
            changed: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        // a poisoned lock still holds usable state
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Block until a stop completes or the supervised program exits.
    pub fn wait(&self) -> HostExit {
        let mut state = self.lock();
        loop {
            if let Some(code) = state.exit_code {
                return HostExit::Stopped(code);
            }

            let exited = match state.child.as_mut() {
                Some(child) => match child.try_wait() {
                    Ok(status) => status,
                    Err(e) => {
                        warn!(error = %e, "failed to poll supervised program");
                        None
                    }
                },
                None => None,
            };
            if let Some(status) = exited {
                info!(status = %status, "supervised program exited");
                state.child = None;
                return HostExit::ChildExited(status.code().unwrap_or(1));
            }

            state = if state.child.is_some() {
                self.changed
                    .wait_timeout(state, CHILD_POLL_INTERVAL)
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|poisoned| poisoned.into_inner().0)
            } else {
                self.changed
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
            };
        }
    }
}

impl ControlHost for ProcessHost {
    fn shutdown(&self) {
        let mut state = self.lock();
        if let Some(mut child) = state.child.take() {
            info!(pid = child.id(), "stopping supervised program");
            if let Err(e) = child.kill() {
                warn!(error = %e, "failed to kill supervised program");
            }
            if let Err(e) = child.wait() {
                warn!(error = %e, "failed to reap supervised program");
            }
        }
    }

    fn terminate(&self, code: i32) {
        self.lock().exit_code = Some(code);
        self.changed.notify_all();
    }
}
