//! Durable plate -> owner registrations.
//!
//! The registry is loaded once at startup and rewritten in full after every
//! mutation, before the mutation is acknowledged. Record order is insertion
//! order, both in memory and in the JSON file.
use crate::plate::{Plate, PlateError};
use crate::staging::publish_json;
use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Chat-platform user id of a plate's owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(pub u64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub plate: Plate,
    pub owner: OwnerId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered(Plate),
    /// The caller already owns this plate; nothing was written.
    AlreadyRegistered(Plate),
    LimitReached { max: usize },
    OwnedByOther(Plate),
    InvalidFormat(PlateError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(Plate),
    /// Missing plates and plates owned by someone else are not distinguished.
    NotFoundOrNotOwner,
    InvalidFormat(PlateError),
}

#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    max_plates: usize,
    records: Vec<Registration>,
}

impl Registry {
    /// Load registrations from `path`; a missing file is an empty registry.
    ///
    /// A file that exists but does not parse, or holds a key that is not a
    /// normalized plate, is an error. There is no partial recovery.
    pub fn load(path: &Path, max_plates: usize) -> Result<Self> {
        let records = if path.exists() {
            read_records(path)?
        } else {
            tracing::info!(path = %path.display(), "no registry file; starting empty");
            Vec::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            max_plates,
            records,
        })
    }

    pub fn save(&self) -> Result<()> {
        let mut map = Map::new();
        for record in &self.records {
            map.insert(record.plate.to_string(), Value::from(record.owner.0));
        }
        publish_json(&self.path, &map)
            .with_context(|| format!("save registry {}", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_plates(&self) -> usize {
        self.max_plates
    }

    pub fn register(&mut self, raw: &str, owner: OwnerId) -> Result<RegisterOutcome> {
        let plate = match Plate::parse(raw) {
            Ok(plate) => plate,
            Err(err) => return Ok(RegisterOutcome::InvalidFormat(err)),
        };
        if let Some(existing) = self.owner_of(&plate) {
            return Ok(if existing == owner {
                RegisterOutcome::AlreadyRegistered(plate)
            } else {
                RegisterOutcome::OwnedByOther(plate)
            });
        }
        if self.count_for(owner) >= self.max_plates {
            return Ok(RegisterOutcome::LimitReached {
                max: self.max_plates,
            });
        }

        self.records.push(Registration {
            plate: plate.clone(),
            owner,
        });
        if let Err(err) = self.save() {
            self.records.pop();
            return Err(err);
        }
        tracing::info!(plate = %plate, owner = %owner, "plate registered");
        Ok(RegisterOutcome::Registered(plate))
    }

    pub fn list(&self, owner: OwnerId) -> Vec<Plate> {
        self.records
            .iter()
            .filter(|record| record.owner == owner)
            .map(|record| record.plate.clone())
            .collect()
    }

    pub fn remove(&mut self, raw: &str, owner: OwnerId) -> Result<RemoveOutcome> {
        let plate = match Plate::parse(raw) {
            Ok(plate) => plate,
            Err(err) => return Ok(RemoveOutcome::InvalidFormat(err)),
        };
        let Some(index) = self
            .records
            .iter()
            .position(|record| record.plate == plate && record.owner == owner)
        else {
            return Ok(RemoveOutcome::NotFoundOrNotOwner);
        };

        let removed = self.records.remove(index);
        if let Err(err) = self.save() {
            self.records.insert(index, removed);
            return Err(err);
        }
        tracing::info!(plate = %plate, owner = %owner, "plate removed");
        Ok(RemoveOutcome::Removed(plate))
    }

    /// All registrations in stored order.
    pub fn entries(&self) -> &[Registration] {
        &self.records
    }

    fn owner_of(&self, plate: &Plate) -> Option<OwnerId> {
        self.records
            .iter()
            .find(|record| &record.plate == plate)
            .map(|record| record.owner)
    }

    fn count_for(&self, owner: OwnerId) -> usize {
        self.records
            .iter()
            .filter(|record| record.owner == owner)
            .count()
    }
}

fn read_records(path: &Path) -> Result<Vec<Registration>> {
    let bytes = fs::read(path).with_context(|| format!("read registry {}", path.display()))?;
    let map: Map<String, Value> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse registry JSON {}", path.display()))?;
    let mut records = Vec::with_capacity(map.len());
    for (key, value) in map {
        let plate = Plate::parse_stored(&key)
            .with_context(|| format!("registry {} has an invalid key", path.display()))?;
        let owner = value.as_u64().ok_or_else(|| {
            anyhow!(
                "registry {}: owner for {} must be a non-negative integer (got {})",
                path.display(),
                key,
                value
            )
        })?;
        records.push(Registration {
            plate,
            owner: OwnerId(owner),
        });
    }
    Ok(records)
}

/// The registry behind a mutex, shared by command handlers and the sweep.
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    pub fn register(&self, raw: &str, owner: OwnerId) -> Result<RegisterOutcome> {
        self.lock().register(raw, owner)
    }

    pub fn list(&self, owner: OwnerId) -> Vec<Plate> {
        self.lock().list(owner)
    }

    pub fn remove(&self, raw: &str, owner: OwnerId) -> Result<RemoveOutcome> {
        self.lock().remove(raw, owner)
    }

    pub fn max_plates(&self) -> usize {
        self.lock().max_plates()
    }

    /// Copy of all registrations, taken under the lock.
    pub fn snapshot(&self) -> Vec<Registration> {
        self.lock().entries().to_vec()
    }

    /// Re-read the backing file, picking up writes made by other processes.
    ///
    /// On error the in-memory state is left untouched.
    pub fn reload(&self) -> Result<()> {
        let mut guard = self.lock();
        let fresh = Registry::load(&guard.path, guard.max_plates)?;
        *guard = fresh;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
