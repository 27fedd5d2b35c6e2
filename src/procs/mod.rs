// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

mod router;
mod supervisor;

pub use router::Router;
pub use supervisor::Supervisor;

use std::sync::{Arc, Mutex};

use crate::instance::{InstanceRecord, State};

/// The alphabet of the per-instance command queue.
///
/// Commands for one instance are consumed by a single supervisor task, which
///   is what serializes its transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    /// Carry edited fields into the supervisor without breaking command order
    Refresh(InstanceRecord),
}

/// What to do when an instance exits cleanly on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Start it again immediately
    Always,
    /// Leave it Inactive until an explicit start
    Never,
}

/// Shared, read-only view of one instance's runtime state.
///
/// Written only by the owning supervisor task; the router and any UI read it.
///   The pid is present exactly while the instance is Running.
#[derive(Debug, Clone, Default)]
pub struct StatusCell {
    inner: Arc<Mutex<Status>>,
}

#[derive(Debug, Default)]
struct Status {
    state: State,
    pid: Option<u32>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> State {
        self.inner.lock().expect("status poisoned").state
    }

    pub fn pid(&self) -> Option<u32> {
        self.inner.lock().expect("status poisoned").pid
    }

    pub(crate) fn set(&self, state: State, pid: Option<u32>) {
        let mut status = self.inner.lock().expect("status poisoned");
        status.state = state;
        status.pid = pid;
    }
}
