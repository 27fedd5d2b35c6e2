// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The authoritative, ordered collection of instance records.

use std::sync::{Mutex, MutexGuard};

use log::{error, info, warn};

use crate::instance::InstanceRecord;
use crate::store::Store;
use crate::{Error, ErrorKind};

/// Owns the in-memory instance collection and keeps it in sync with the Store.
///
/// Rules:
///   - instance names are unique at all times
///   - every structural mutation is followed by a save of the whole collection
///   - the edit flow replaces the collection in one assignment, a concurrent
///     reader sees either the old collection or the new one, never a mix
pub struct Registry {
    records: Mutex<Vec<InstanceRecord>>,
    store: Box<dyn Store>,
}

impl Registry {
    pub fn new(store: Box<dyn Store>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            store,
        }
    }

    /// Load the collection from the Store, replacing whatever is in memory.
    ///
    /// A load failure must never take the manager down, it falls back to an
    ///   empty collection and logs why.
    pub async fn load(&self) {
        let mut loaded = match self.store.load().await {
            Ok(records) => records,
            Err(err) => {
                warn!("could not load instance configuration, starting empty: {}", err);
                Vec::new()
            }
        };

        for record in &mut loaded {
            record.rebranch();
        }

        info!("loaded {} instance(s)", loaded.len());
        *self.lock() = loaded;
    }

    pub fn snapshot(&self) -> Vec<InstanceRecord> {
        self.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().iter().map(|record| record.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<InstanceRecord> {
        self.lock().iter().find(|record| record.name == name).cloned()
    }

    /// Append a new record and persist the collection
    pub async fn add(&self, mut record: InstanceRecord) -> Result<(), Error> {
        record.rebranch();
        validate(&record)?;

        let snapshot = {
            let mut records = self.lock();
            if records.iter().any(|existing| existing.name == record.name) {
                return Err(ErrorKind::DuplicateName(record.name).into());
            }

            records.push(record);
            records.clone()
        };

        self.save_all(&snapshot).await
    }

    /// Remove the named record and persist the collection
    pub async fn remove(&self, name: &str) -> Result<InstanceRecord, Error> {
        let (removed, snapshot) = {
            let mut records = self.lock();
            let index = records
                .iter()
                .position(|record| record.name == name)
                .ok_or_else(|| Error::from(ErrorKind::UnknownInstance(name.to_string())))?;

            (records.remove(index), records.clone())
        };

        self.save_all(&snapshot).await?;
        Ok(removed)
    }

    /// Replace the whole collection and persist it
    pub async fn replace_all(&self, mut records: Vec<InstanceRecord>) -> Result<(), Error> {
        for record in records.iter_mut() {
            record.rebranch();
            validate(record)?;
        }

        for (index, record) in records.iter().enumerate() {
            if records[..index].iter().any(|earlier| earlier.name == record.name) {
                return Err(ErrorKind::DuplicateName(record.name.clone()).into());
            }
        }

        *self.lock() = records.clone();
        self.save_all(&records).await
    }

    /// Replace the editable fields of the record at `index`, leaving every
    /// other record untouched and the order unchanged.
    ///
    /// Returns the record's previous name (the caller re-keys its supervisor)
    ///   and the new record.
    pub async fn edit(
        &self,
        index: usize,
        name: &str,
        path: &str,
        arguments: &str,
    ) -> Result<(String, InstanceRecord), Error> {
        let replacement = InstanceRecord::new(name, path, arguments);
        validate(&replacement)?;

        let (old_name, snapshot) = {
            let mut records = self.lock();
            let old_name = records
                .get(index)
                .map(|record| record.name.clone())
                .ok_or_else(|| Error::from(ErrorKind::BadIndex(index)))?;

            let collides = records
                .iter()
                .enumerate()
                .any(|(other, record)| other != index && record.name == replacement.name);
            if collides {
                return Err(ErrorKind::DuplicateName(replacement.name).into());
            }

            // build the replacement collection, then swap it in whole
            let mut next = records.clone();
            next[index] = replacement.clone();
            *records = next;

            (old_name, records.clone())
        };

        self.save_all(&snapshot).await?;
        Ok((old_name, replacement))
    }

    async fn save_all(&self, records: &[InstanceRecord]) -> Result<(), Error> {
        if let Err(err) = self.store.save(records).await {
            error!("could not save instance configuration: {}", err);
            return Err(err);
        }

        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<InstanceRecord>> {
        self.records.lock().expect("instance collection poisoned")
    }
}

fn validate(record: &InstanceRecord) -> Result<(), Error> {
    if record.name.is_empty() || record.path.is_empty() {
        return Err(Error::from("instance name and path must be set"));
    }

    Ok(())
}
