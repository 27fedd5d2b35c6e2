// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::io;

use thiserror::Error;

/// Every failure point an instance can hit, from persistence through process death
#[derive(Error, Debug)]
pub enum ErrorKind {
    #[error("io error")]
    IoError(#[from] io::Error),
    #[error("persistence error")]
    PersistenceError(#[from] serde_json::Error),
    #[error("failed to spawn instance '{name}'")]
    SpawnFailure {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to kill instance '{name}'")]
    KillFailure {
        name: String,
        #[source]
        source: nix::Error,
    },
    #[error("no instance named '{0}'")]
    UnknownInstance(String),
    #[error("no instance at index {0}")]
    BadIndex(usize),
    #[error("instance name '{0}' is already in use")]
    DuplicateName(String),
    #[error("supervisor for instance '{0}' is gone")]
    SupervisorGone(String),
    #[error("an error occured: {0}")]
    ErrorMsg(String),
    #[error("an error occured: {0}")]
    ErrorStr(&'static str),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    fn from_kind(kind: ErrorKind) -> Self {
        Self(kind)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }
}

impl<E> From<E> for Error
where
    E: Into<ErrorKind>,
{
    fn from(err: E) -> Self {
        Self::from_kind(err.into())
    }
}

impl From<&'static str> for Error {
    fn from(err: &'static str) -> Self {
        Self::from_kind(ErrorKind::ErrorStr(err))
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Self::from_kind(ErrorKind::ErrorMsg(err))
    }
}
