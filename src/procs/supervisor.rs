// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Launch and monitor one instance's OS process.
//!
//! Rules:
//!   - owns the process handle and the state transitions for its instance
//!   - blocks on the command queue while idle, and on both the queue and the
//!     process exit while running
//!   - distinguishes "could not spawn" from "ran and then exited", the former
//!     is never retried
//!   - a stop is a forced kill, never a graceful shutdown

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use futures::channel::mpsc;
use futures::{select, FutureExt, StreamExt};
use log::{debug, error, info, warn};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::process::{Child, Command as OsCommand};
use tokio::time;

use crate::instance::{InstanceRecord, State};
use crate::procs::{Command, RestartPolicy, StatusCell};
use crate::ui::{Notify, StatusDisplay};
use crate::{Error, ErrorKind};

/// SIGKILL cannot be masked, the reap should be immediate
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

/// The persistent per-instance task that owns the process lifecycle
pub struct Supervisor {
    context: Context,
    commands: mpsc::Receiver<Command>,
}

impl Supervisor {
    pub fn new(
        record: InstanceRecord,
        commands: mpsc::Receiver<Command>,
        status: StatusCell,
        policy: RestartPolicy,
        notify: Arc<dyn Notify>,
        display: Arc<dyn StatusDisplay>,
    ) -> Self {
        Self {
            context: Context {
                record,
                status,
                policy,
                notify,
                display,
            },
            commands,
        }
    }

    /// Run until the command queue is closed, i.e. the instance is removed
    pub async fn run(self) {
        let Supervisor {
            mut context,
            mut commands,
        } = self;

        let mut child: Option<Child> = None;

        loop {
            let event = match child.as_mut() {
                Some(running) => {
                    let mut exited = running.fuse();
                    select! {
                        command = commands.next() => Event::Command(command),
                        status = exited => Event::Exited(status),
                    }
                }
                None => Event::Command(commands.next().await),
            };

            match event {
                Event::Command(Some(Command::Start)) => {
                    if child.is_none() {
                        child = context.spawn();
                    } else {
                        debug!("instance '{}' is already running", context.record.name);
                    }
                }
                Event::Command(Some(Command::Stop)) => match child.take() {
                    Some(mut running) => match context.kill(&mut running).await {
                        Ok(()) => context.transition(State::Inactive, None),
                        Err(err) => {
                            error!("{}", err);
                            context.notify.notify(
                                "Error stopping instance!",
                                &format!(
                                    "There was an error stopping the '{}' instance!",
                                    context.record.name
                                ),
                            );
                            // the process is still alive, keep owning it
                            child = Some(running);
                        }
                    },
                    None => debug!("instance '{}' is not running", context.record.name),
                },
                Event::Command(Some(Command::Refresh(record))) => context.refresh(record),
                Event::Command(None) => {
                    // instance removed, put the process down before leaving
                    if let Some(mut running) = child.take() {
                        if let Err(err) = context.kill(&mut running).await {
                            warn!("{}", err);
                        }
                    }

                    debug!("supervisor for instance '{}' exiting", context.record.name);
                    return;
                }
                Event::Exited(status) => {
                    child = None;
                    if context.observe_exit(status) {
                        child = context.spawn();
                    }
                }
            }
        }
    }
}

enum Event {
    Command(Option<Command>),
    Exited(io::Result<ExitStatus>),
}

struct Context {
    record: InstanceRecord,
    status: StatusCell,
    policy: RestartPolicy,
    notify: Arc<dyn Notify>,
    display: Arc<dyn StatusDisplay>,
}

impl Context {
    /// Spawn the instance's process, transitioning to Running or Errored.
    ///
    /// A spawn failure means the OS refused to create the process at all, it
    ///   is reported once and never retried.
    fn spawn(&self) -> Option<Child> {
        info!("starting instance '{}'", self.record.name);

        let mut command = OsCommand::new(&self.record.path);
        if !self.record.arguments.is_empty() {
            // the argument string is passed through as one verbatim argument
            command.arg(&self.record.arguments);
        }

        command
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        match command.spawn() {
            Ok(child) => {
                debug!("instance '{}' running as pid {}", self.record.name, child.id());
                self.transition(State::Running, Some(child.id()));
                Some(child)
            }
            Err(source) => {
                let err = Error::from(ErrorKind::SpawnFailure {
                    name: self.record.name.clone(),
                    source,
                });
                error!("{}", err);

                self.notify.notify(
                    "Error starting instance!",
                    &format!(
                        "There was an error starting the '{}' instance!",
                        self.record.name
                    ),
                );
                self.transition(State::Errored, None);
                None
            }
        }
    }

    /// Forcibly kill the running process and reap it
    async fn kill(&self, running: &mut Child) -> Result<(), Error> {
        info!("stopping instance '{}'", self.record.name);

        let pid = Pid::from_raw(running.id() as i32);
        kill(pid, Signal::SIGKILL).map_err(|source| ErrorKind::KillFailure {
            name: self.record.name.clone(),
            source,
        })?;

        if time::timeout(REAP_TIMEOUT, &mut *running).await.is_err() {
            warn!(
                "instance '{}' was not reaped within {:?}",
                self.record.name, REAP_TIMEOUT
            );
        }

        Ok(())
    }

    /// Classify an exit the process reached on its own.
    ///
    /// Returns true when the instance should be started again, which is only
    ///   the case for a clean exit under `RestartPolicy::Always`.
    fn observe_exit(&self, status: io::Result<ExitStatus>) -> bool {
        match status {
            Ok(status) if status.success() => {
                info!("instance '{}' exited cleanly", self.record.name);
                self.transition(State::Inactive, None);
                self.policy == RestartPolicy::Always
            }
            Ok(status) => {
                error!("instance '{}' exited badly: {}", self.record.name, status);
                self.notify_exit_error();
                self.transition(State::Errored, None);
                false
            }
            Err(err) => {
                error!("failed waiting on instance '{}': {}", self.record.name, err);
                self.notify_exit_error();
                self.transition(State::Errored, None);
                false
            }
        }
    }

    /// Adopt edited fields, the running process (if any) is left alone
    fn refresh(&mut self, record: InstanceRecord) {
        debug!(
            "instance '{}' reconfigured as '{}'",
            self.record.name, record.name
        );

        self.record = record;
        self.display
            .set_display(&self.record.name, &self.record.title(self.status.state()));
    }

    fn transition(&self, state: State, pid: Option<u32>) {
        self.status.set(state, pid);
        self.display
            .set_display(&self.record.name, &self.record.title(state));
    }

    fn notify_exit_error(&self) {
        self.notify.notify(
            "Error while exiting instance!",
            &format!(
                "There was an error while exiting the '{}' instance!",
                self.record.name
            ),
        );
    }
}
