// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Persistence collaborator for the instance Registry.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::instance::InstanceRecord;
use crate::Error;

/// Reads and writes the full instance collection on stable storage.
///
/// Rules:
///   - load and save operate on the whole collection, never a delta
///   - a missing store is not an error, it is an empty collection
///   - anything else that goes wrong is reported, the Registry decides
///     whether to tolerate it
#[async_trait]
pub trait Store: Send + Sync {
    async fn load(&self) -> Result<Vec<InstanceRecord>, Error>;
    async fn save(&self, records: &[InstanceRecord]) -> Result<(), Error>;
}

/// Instance collection stored as a single JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn load(&self) -> Result<Vec<InstanceRecord>, Error> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        if data.is_empty() {
            return Ok(Vec::new());
        }

        let records = serde_json::from_slice(&data)?;
        Ok(records)
    }

    async fn save(&self, records: &[InstanceRecord]) -> Result<(), Error> {
        let json = serde_json::to_vec_pretty(records)?;

        // whole-file truncate and rewrite, concurrent external editors are not supported
        // FIXME: write to a temp file and rename into place once they are
        fs::write(&self.path, json).await?;
        Ok(())
    }
}
