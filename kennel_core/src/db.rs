//! Kennel data file persistence with file locking.
//!
//! Every table lives in a single JSON document. Reads take a shared lock,
//! writes go through a locked temp file that is renamed over the original.

use crate::{CalendarEvent, Dog, Error, HeatCycle, HeatLog, Litter, Pregnancy, Reminder, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// File name of the data file inside the data directory
pub const DATA_FILE_NAME: &str = "kennel.json";

/// All kennel tables
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct KennelData {
    #[serde(default)]
    pub dogs: Vec<Dog>,
    #[serde(default)]
    pub litters: Vec<Litter>,
    #[serde(default)]
    pub heat_cycles: Vec<HeatCycle>,
    #[serde(default)]
    pub heat_logs: Vec<HeatLog>,
    #[serde(default)]
    pub calendar_events: Vec<CalendarEvent>,
    #[serde(default)]
    pub pregnancies: Vec<Pregnancy>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    /// Ids of system reminders the user has marked done
    #[serde(default)]
    pub completed_system_reminders: BTreeSet<String>,
    /// Litter milestones the user deleted, keyed by litter id and title
    #[serde(default)]
    pub dismissed_milestones: BTreeSet<String>,
}

impl KennelData {
    /// Load the data file with shared locking
    ///
    /// Returns an empty database if the file doesn't exist. A file that
    /// cannot be parsed is an error: replacing it with defaults would
    /// destroy the kennel's records on the next save.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No data file found at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        let data = serde_json::from_str::<KennelData>(&contents).map_err(|e| {
            tracing::error!("Failed to parse data file {:?}: {}", path, e);
            Error::Store(format!("data file {} is corrupted: {}", path.display(), e))
        })?;

        tracing::debug!(
            "Loaded {} dogs, {} heat cycles, {} events from {:?}",
            data.dogs.len(),
            data.heat_cycles.len(),
            data.calendar_events.len(),
            path
        );
        Ok(data)
    }

    /// Save the data file with exclusive locking
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Store("data path missing parent".into()))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved kennel data to {:?}", path);
        Ok(())
    }

    /// Load the data file, modify it, and save it back
    ///
    /// Nothing is written when the closure fails.
    pub fn update<F, T>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut KennelData) -> Result<T>,
    {
        let mut data = Self::load(path)?;
        let value = f(&mut data)?;
        data.save(path)?;
        Ok(value)
    }

    /// Run `f` against the in-memory tables, restoring the prior state if it fails
    pub fn transaction<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut KennelData) -> Result<T>,
    {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!("Rolling back transaction: {}", e);
                *self = snapshot;
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    pub fn dog(&self, id: Uuid) -> Option<&Dog> {
        self.dogs.iter().find(|d| d.id == id)
    }

    pub fn dog_mut(&mut self, id: Uuid) -> Option<&mut Dog> {
        self.dogs.iter_mut().find(|d| d.id == id)
    }

    /// Find a dog by id or by case-insensitive name
    pub fn resolve_dog(&self, key: &str) -> Result<&Dog> {
        if let Ok(id) = Uuid::parse_str(key) {
            if let Some(dog) = self.dog(id) {
                return Ok(dog);
            }
        }

        let mut matches = self
            .dogs
            .iter()
            .filter(|d| d.name.eq_ignore_ascii_case(key.trim()));
        match (matches.next(), matches.next()) {
            (Some(dog), None) => Ok(dog),
            (Some(_), Some(_)) => Err(Error::Validation(format!(
                "more than one dog is named '{}', use the id instead",
                key
            ))),
            (None, _) => Err(Error::NotFound(format!("dog '{}'", key))),
        }
    }

    pub fn heat_cycle(&self, id: Uuid) -> Option<&HeatCycle> {
        self.heat_cycles.iter().find(|c| c.id == id)
    }

    pub fn pregnancy(&self, id: Uuid) -> Option<&Pregnancy> {
        self.pregnancies.iter().find(|p| p.id == id)
    }

    pub fn dog_name(&self, id: Uuid) -> String {
        self.dog(id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| "Unknown".into())
    }

    // ------------------------------------------------------------------------
    // Calendar table
    // ------------------------------------------------------------------------

    /// Insert a calendar event after checking it against the table rules
    pub fn insert_calendar_event(&mut self, event: CalendarEvent) -> Result<()> {
        if event.title.trim().is_empty() {
            return Err(Error::Validation("calendar event title is empty".into()));
        }
        if let Some(end) = event.end_date {
            if end < event.date {
                return Err(Error::Validation(format!(
                    "calendar event '{}' ends ({}) before it starts ({})",
                    event.title, end, event.date
                )));
            }
        }
        if let Some(dog_id) = event.dog_id {
            if self.dog(dog_id).is_none() {
                return Err(Error::NotFound(format!("dog {} for calendar event", dog_id)));
            }
        }
        if self.calendar_events.iter().any(|e| e.id == event.id) {
            return Err(Error::Validation(format!(
                "calendar event {} already exists",
                event.id
            )));
        }

        tracing::debug!(
            "Inserting {} event '{}' on {}",
            event.event_type.as_str(),
            event.title,
            event.date
        );
        self.calendar_events.push(event);
        Ok(())
    }

    /// Delete calendar events matching `predicate`, returning how many were removed
    pub fn delete_calendar_events<P>(&mut self, predicate: P) -> usize
    where
        P: Fn(&CalendarEvent) -> bool,
    {
        let before = self.calendar_events.len();
        self.calendar_events.retain(|e| !predicate(e));
        before - self.calendar_events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CalendarEventType, Gender};
    use chrono::NaiveDate;

    fn dog(name: &str) -> Dog {
        Dog {
            id: Uuid::new_v4(),
            name: name.into(),
            breed: None,
            gender: Gender::Female,
            birthdate: None,
            vaccination_date: None,
            heat_history: vec![],
            heat_interval_days: None,
            notes: None,
        }
    }

    fn event(title: &str) -> CalendarEvent {
        CalendarEvent {
            id: Uuid::new_v4(),
            title: title.into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            event_type: CalendarEventType::Custom,
            dog_id: None,
            dog_name: None,
            status: None,
            notes: None,
            source_id: None,
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(DATA_FILE_NAME);

        let mut data = KennelData::default();
        data.dogs.push(dog("Bella"));
        data.completed_system_reminders.insert("birthday-x-2024".into());
        data.save(&path).unwrap();

        let loaded = KennelData::load(&path).unwrap();
        assert_eq!(loaded.dogs.len(), 1);
        assert_eq!(loaded.dogs[0].name, "Bella");
        assert!(loaded.completed_system_reminders.contains("birthday-x-2024"));
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data = KennelData::load(&temp_dir.path().join("missing.json")).unwrap();
        assert!(data.dogs.is_empty());
        assert!(data.calendar_events.is_empty());
    }

    #[test]
    fn test_corrupted_file_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(DATA_FILE_NAME);
        std::fs::write(&path, "{ invalid json }").unwrap();

        assert!(matches!(KennelData::load(&path), Err(Error::Store(_))));
    }

    #[test]
    fn test_update_does_not_save_on_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(DATA_FILE_NAME);
        KennelData::default().save(&path).unwrap();

        let result: Result<()> = KennelData::update(&path, |data| {
            data.dogs.push(dog("Luna"));
            Err(Error::Other("boom".into()))
        });
        assert!(result.is_err());

        let loaded = KennelData::load(&path).unwrap();
        assert!(loaded.dogs.is_empty());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(DATA_FILE_NAME);
        KennelData::default().save(&path).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != DATA_FILE_NAME)
            .collect();
        assert!(extras.is_empty(), "unexpected files: {:?}", extras);
    }

    #[test]
    fn test_transaction_restores_snapshot() {
        let mut data = KennelData::default();
        data.insert_calendar_event(event("Keep me")).unwrap();

        let result: Result<()> = data.transaction(|tx| {
            tx.delete_calendar_events(|_| true);
            tx.insert_calendar_event(event(""))
        });

        assert!(result.is_err());
        assert_eq!(data.calendar_events.len(), 1);
        assert_eq!(data.calendar_events[0].title, "Keep me");
    }

    #[test]
    fn test_insert_rejects_inverted_range_and_unknown_dog() {
        let mut data = KennelData::default();

        let mut inverted = event("Inverted");
        inverted.end_date = NaiveDate::from_ymd_opt(2023, 12, 31);
        assert!(matches!(
            data.insert_calendar_event(inverted),
            Err(Error::Validation(_))
        ));

        let mut orphan = event("Orphan");
        orphan.dog_id = Some(Uuid::new_v4());
        assert!(matches!(
            data.insert_calendar_event(orphan),
            Err(Error::NotFound(_))
        ));
        assert!(data.calendar_events.is_empty());
    }

    #[test]
    fn test_resolve_dog_by_name_and_id() {
        let mut data = KennelData::default();
        let bella = dog("Bella");
        let bella_id = bella.id;
        data.dogs.push(bella);

        assert_eq!(data.resolve_dog("bella").unwrap().id, bella_id);
        assert_eq!(data.resolve_dog(&bella_id.to_string()).unwrap().id, bella_id);
        assert!(matches!(data.resolve_dog("Max"), Err(Error::NotFound(_))));

        data.dogs.push(dog("Bella"));
        assert!(matches!(data.resolve_dog("Bella"), Err(Error::Validation(_))));
    }
}
