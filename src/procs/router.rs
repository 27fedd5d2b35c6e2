// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Accept named start/stop requests and serialize them per instance.
//!
//! Rules:
//!   - at most one transition in flight per instance, commands for one
//!     instance go through one queue with one consumer
//!   - the UI collaborator only ever enqueues, it never touches a process
//!   - structural changes (create/edit/remove) go through the Registry and
//!     are reflected back into the supervisor tasks from here

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::channel::mpsc;
use futures::SinkExt;
use log::{debug, warn};
use tokio::spawn;

use crate::instance::{InstanceRecord, State};
use crate::procs::{Command, RestartPolicy, StatusCell, Supervisor};
use crate::registry::Registry;
use crate::ui::{Notify, StatusDisplay};
use crate::{Error, ErrorKind};

/// Command queue depth per instance, an operator is slower than this
const COMMAND_QUEUE_DEPTH: usize = 16;

struct SupervisorHandle {
    sender: mpsc::Sender<Command>,
    status: StatusCell,
}

/// Routes commands from the UI collaborator to the per-instance supervisors
pub struct Router {
    registry: Arc<Registry>,
    notify: Arc<dyn Notify>,
    display: Arc<dyn StatusDisplay>,
    policy: RestartPolicy,
    handles: Mutex<HashMap<String, SupervisorHandle>>,
}

impl Router {
    pub fn new(
        registry: Arc<Registry>,
        notify: Arc<dyn Notify>,
        display: Arc<dyn StatusDisplay>,
        policy: RestartPolicy,
    ) -> Self {
        Self {
            registry,
            notify,
            display,
            policy,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn a supervisor task for every record in the Registry.
    ///
    /// Called once at startup, after `Registry::load`. Every instance starts
    ///   Inactive no matter what was persisted.
    pub fn attach_all(&self) {
        for record in self.registry.snapshot() {
            self.attach(record);
        }

        self.display.set_names(&self.registry.names());
    }

    /// Forward a start or stop to the named instance.
    ///
    /// A start for a Running instance and a stop for an instance that is not
    ///   Running are no-ops. The supervisor task enforces that against the
    ///   state it owns when the command is consumed; checking the shared
    ///   status here would race with commands already in the queue.
    pub async fn dispatch(&self, name: &str, command: Command) -> Result<(), Error> {
        let sender = {
            let handles = self.lock();
            let handle = handles
                .get(name)
                .ok_or_else(|| Error::from(ErrorKind::UnknownInstance(name.to_string())))?;

            handle.sender.clone()
        };

        debug!("dispatching {:?} to instance '{}'", command, name);
        self.send(name, sender, command).await
    }

    /// Append a new Inactive instance, persist, and supervise it
    pub async fn create(&self, name: &str, path: &str, arguments: &str) -> Result<(), Error> {
        let record = InstanceRecord::new(name, path, arguments);

        self.registry.add(record.clone()).await?;
        self.attach(record);
        self.display.set_names(&self.registry.names());
        Ok(())
    }

    /// Replace the editable fields of the instance at `index`.
    ///
    /// The record's supervisor keeps its queue, its state, and any live
    ///   process, it just learns the new fields.
    pub async fn edit(
        &self,
        index: usize,
        name: &str,
        path: &str,
        arguments: &str,
    ) -> Result<(), Error> {
        let (old_name, record) = self.registry.edit(index, name, path, arguments).await?;

        let sender = {
            let mut handles = self.lock();
            match handles.remove(&old_name) {
                Some(handle) => {
                    let sender = handle.sender.clone();
                    handles.insert(record.name.clone(), handle);
                    Some(sender)
                }
                None => None,
            }
        };

        match sender {
            Some(sender) => {
                let new_name = record.name.clone();
                self.send(&new_name, sender, Command::Refresh(record)).await?;
            }
            None => warn!("no supervisor for instance '{}', nothing to refresh", old_name),
        }

        self.display.set_names(&self.registry.names());
        Ok(())
    }

    /// Remove the named instance, killing its process if one is running
    pub async fn remove(&self, name: &str) -> Result<(), Error> {
        self.registry.remove(name).await?;

        // dropping the sender closes the queue, the supervisor task puts the
        // process down and exits
        self.lock().remove(name);

        self.display.set_names(&self.registry.names());
        Ok(())
    }

    pub fn state_of(&self, name: &str) -> Option<State> {
        self.lock().get(name).map(|handle| handle.status.state())
    }

    pub fn pid_of(&self, name: &str) -> Option<u32> {
        self.lock().get(name).and_then(|handle| handle.status.pid())
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }

    fn attach(&self, record: InstanceRecord) {
        let (sender, receiver) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let status = StatusCell::new();
        let name = record.name.clone();

        let supervisor = Supervisor::new(
            record,
            receiver,
            status.clone(),
            self.policy,
            self.notify.clone(),
            self.display.clone(),
        );
        spawn(supervisor.run());

        self.lock().insert(name, SupervisorHandle { sender, status });
    }

    async fn send(
        &self,
        name: &str,
        mut sender: mpsc::Sender<Command>,
        command: Command,
    ) -> Result<(), Error> {
        sender
            .send(command)
            .await
            .map_err(|_| Error::from(ErrorKind::SupervisorGone(name.to_string())))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SupervisorHandle>> {
        self.handles.lock().expect("supervisor handles poisoned")
    }
}
