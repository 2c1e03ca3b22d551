//! Heat cycle store.
//!
//! Structured heat cycles live in `heat_cycles`; older records only exist
//! as dates in each dog's embedded `heat_history`. Both are kept in step by
//! matching on the `YYYY-MM-DD` form of the start date.
//!
//! Store operations log failures and hand back `None`, `false` or an empty
//! list. Callers treat a missing value as "unknown", not "empty". Deleting
//! a cycle is the exception: an unknown id is reported as `Error::NotFound`.

use crate::{
    Dog, Error, Gender, HeatCycle, HeatCyclePatch, HeatHistoryEntry, HeatLog, HeatObservation,
    KennelData, Result,
};
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;
use uuid::Uuid;

/// Length assigned to heats migrated from the legacy history
pub const TYPICAL_HEAT_DURATION_DAYS: i64 = 21;

fn logged<T>(operation: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("{} failed: {}", operation, e);
            None
        }
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn cycle_length(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Add a legacy entry for `date` unless one already exists
fn add_history_entry(dog: &mut Dog, date: NaiveDate) -> bool {
    let key = date_key(date);
    if dog.heat_history.iter().any(|e| date_key(e.date) == key) {
        return false;
    }
    dog.heat_history.push(HeatHistoryEntry { date });
    dog.heat_history.sort_by_key(|e| e.date);
    true
}

/// Remove the legacy entry matching `date`, returning whether one was found
fn remove_history_entry(dog: &mut Dog, date: NaiveDate) -> bool {
    let key = date_key(date);
    let before = dog.heat_history.len();
    dog.heat_history.retain(|e| date_key(e.date) != key);
    dog.heat_history.len() != before
}

// ============================================================================
// Heat cycle CRUD
// ============================================================================

pub fn create_heat_cycle(
    db: &mut KennelData,
    dog_id: Uuid,
    start_date: NaiveDate,
    notes: Option<String>,
) -> Option<HeatCycle> {
    logged(
        "create_heat_cycle",
        try_create_heat_cycle(db, dog_id, start_date, notes),
    )
}

fn try_create_heat_cycle(
    db: &mut KennelData,
    dog_id: Uuid,
    start_date: NaiveDate,
    notes: Option<String>,
) -> Result<HeatCycle> {
    let dog = db
        .dog(dog_id)
        .ok_or_else(|| Error::NotFound(format!("dog {}", dog_id)))?;
    if dog.gender != Gender::Female {
        return Err(Error::Validation(format!("{} is not a female", dog.name)));
    }
    if let Some(active) = db
        .heat_cycles
        .iter()
        .find(|c| c.dog_id == dog_id && c.is_active())
    {
        return Err(Error::Validation(format!(
            "{} already has an active heat cycle started {}",
            dog.name, active.start_date
        )));
    }

    let cycle = HeatCycle {
        id: Uuid::new_v4(),
        dog_id,
        start_date,
        end_date: None,
        cycle_length: None,
        notes,
    };
    db.heat_cycles.push(cycle.clone());

    if let Some(dog) = db.dog_mut(dog_id) {
        if add_history_entry(dog, start_date) {
            tracing::debug!("Added legacy heat entry {} for {}", start_date, dog.name);
        }
    }

    tracing::info!("Started heat cycle {} on {}", cycle.id, start_date);
    Ok(cycle)
}

pub fn update_heat_cycle(
    db: &mut KennelData,
    id: Uuid,
    patch: HeatCyclePatch,
) -> Option<HeatCycle> {
    logged("update_heat_cycle", try_update_heat_cycle(db, id, patch))
}

fn try_update_heat_cycle(
    db: &mut KennelData,
    id: Uuid,
    patch: HeatCyclePatch,
) -> Result<HeatCycle> {
    let previous = db
        .heat_cycle(id)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("heat cycle {}", id)))?;

    let mut updated = previous.clone();
    if let Some(start) = patch.start_date {
        updated.start_date = start;
    }
    if let Some(end) = patch.end_date {
        updated.end_date = Some(end);
    }
    if let Some(notes) = patch.notes {
        updated.notes = Some(notes);
    }
    if let Some(end) = updated.end_date {
        if end < updated.start_date {
            return Err(Error::Validation(format!(
                "heat cycle cannot end ({}) before it starts ({})",
                end, updated.start_date
            )));
        }
        updated.cycle_length = Some(cycle_length(updated.start_date, end));
    }

    if let Some(slot) = db.heat_cycles.iter_mut().find(|c| c.id == id) {
        *slot = updated.clone();
    }

    if previous.start_date != updated.start_date {
        if let Some(dog) = db.dog_mut(updated.dog_id) {
            remove_history_entry(dog, previous.start_date);
            add_history_entry(dog, updated.start_date);
        }
    }

    tracing::info!("Updated heat cycle {}", id);
    Ok(updated)
}

/// End a heat cycle on `end_date`, or on `today` when none is given
pub fn end_heat_cycle(
    db: &mut KennelData,
    id: Uuid,
    end_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<HeatCycle> {
    let final_end = end_date.unwrap_or(today);
    logged(
        "end_heat_cycle",
        try_update_heat_cycle(
            db,
            id,
            HeatCyclePatch {
                end_date: Some(final_end),
                ..Default::default()
            },
        ),
    )
}

/// Delete a cycle with its heat logs, derived calendar events and legacy entry
pub fn delete_heat_cycle(db: &mut KennelData, id: Uuid) -> Result<()> {
    let cycle = db
        .heat_cycle(id)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("heat cycle {}", id)))?;

    let logs_before = db.heat_logs.len();
    db.heat_logs.retain(|l| l.heat_cycle_id != id);
    let logs_removed = logs_before - db.heat_logs.len();

    db.heat_cycles.retain(|c| c.id != id);
    let events_removed = db.delete_calendar_events(|e| e.source_id == Some(id));

    match db.dog_mut(cycle.dog_id) {
        Some(dog) => {
            if !remove_history_entry(dog, cycle.start_date) {
                tracing::warn!(
                    "No legacy heat entry on {} for {} to remove",
                    cycle.start_date,
                    dog.name
                );
            }
        }
        None => tracing::warn!("Heat cycle {} belongs to unknown dog {}", id, cycle.dog_id),
    }

    tracing::info!(
        "Deleted heat cycle {} ({} logs, {} calendar events)",
        id,
        logs_removed,
        events_removed
    );
    Ok(())
}

pub fn get_active_heat_cycle(db: &KennelData, dog_id: Uuid) -> Option<HeatCycle> {
    db.heat_cycles
        .iter()
        .find(|c| c.dog_id == dog_id && c.is_active())
        .cloned()
}

/// All cycles of a dog, newest first
pub fn get_heat_cycles(db: &KennelData, dog_id: Uuid) -> Vec<HeatCycle> {
    let mut cycles: Vec<HeatCycle> = db
        .heat_cycles
        .iter()
        .filter(|c| c.dog_id == dog_id)
        .cloned()
        .collect();
    cycles.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    cycles
}

// ============================================================================
// Legacy history migration
// ============================================================================

/// Create structured cycles for legacy dates that have none, returning how many were created
pub fn sync_heat_history_to_heat_cycles(
    db: &mut KennelData,
    dog_id: Uuid,
    today: NaiveDate,
) -> usize {
    logged(
        "sync_heat_history_to_heat_cycles",
        try_sync_history_to_cycles(db, dog_id, today),
    )
    .unwrap_or(0)
}

fn try_sync_history_to_cycles(
    db: &mut KennelData,
    dog_id: Uuid,
    today: NaiveDate,
) -> Result<usize> {
    let dog = db
        .dog(dog_id)
        .ok_or_else(|| Error::NotFound(format!("dog {}", dog_id)))?;

    let existing: HashSet<String> = db
        .heat_cycles
        .iter()
        .filter(|c| c.dog_id == dog_id)
        .map(|c| date_key(c.start_date))
        .collect();

    let mut missing: Vec<NaiveDate> = dog
        .heat_history
        .iter()
        .map(|e| e.date)
        .filter(|d| !existing.contains(&date_key(*d)))
        .collect();
    missing.sort();
    missing.dedup();

    let newest_known = db
        .heat_cycles
        .iter()
        .filter(|c| c.dog_id == dog_id)
        .map(|c| c.start_date)
        .chain(missing.iter().copied())
        .max();
    let mut may_be_active = get_active_heat_cycle(db, dog_id).is_none();

    let mut created = 0;
    for start in missing.iter().rev().copied() {
        let typical_end = start + Duration::days(TYPICAL_HEAT_DURATION_DAYS);
        let still_running =
            may_be_active && Some(start) == newest_known && start <= today && typical_end >= today;

        let cycle = HeatCycle {
            id: Uuid::new_v4(),
            dog_id,
            start_date: start,
            end_date: if still_running { None } else { Some(typical_end) },
            cycle_length: if still_running {
                None
            } else {
                Some(TYPICAL_HEAT_DURATION_DAYS)
            },
            notes: Some("Migrated from heat history".into()),
        };
        may_be_active = false;

        tracing::debug!("Migrated legacy heat {} into cycle {}", start, cycle.id);
        db.heat_cycles.push(cycle);
        created += 1;
    }

    if created > 0 {
        tracing::info!("Migrated {} legacy heat entries for dog {}", created, dog_id);
    }
    Ok(created)
}

/// Append legacy entries for cycle start dates missing from the history
pub fn sync_heat_cycles_to_heat_history(db: &mut KennelData, dog_id: Uuid) -> usize {
    let starts: Vec<NaiveDate> = db
        .heat_cycles
        .iter()
        .filter(|c| c.dog_id == dog_id)
        .map(|c| c.start_date)
        .collect();

    let Some(dog) = db.dog_mut(dog_id) else {
        tracing::error!("sync_heat_cycles_to_heat_history failed: dog {} not found", dog_id);
        return 0;
    };

    let added = starts
        .into_iter()
        .filter(|start| add_history_entry(dog, *start))
        .count();
    if added > 0 {
        tracing::info!("Added {} legacy heat entries for {}", added, dog.name);
    }
    added
}

// ============================================================================
// Heat logs
// ============================================================================

pub fn add_heat_log(
    db: &mut KennelData,
    heat_cycle_id: Uuid,
    date: NaiveDate,
    observation: HeatObservation,
    progesterone_level: Option<f64>,
    notes: Option<String>,
) -> Option<HeatLog> {
    let check = match db.heat_cycle(heat_cycle_id) {
        None => Err(Error::NotFound(format!("heat cycle {}", heat_cycle_id))),
        Some(cycle) if date < cycle.start_date => Err(Error::Validation(format!(
            "log date {} precedes cycle start {}",
            date, cycle.start_date
        ))),
        Some(_) if matches!(progesterone_level, Some(level) if level < 0.0) => Err(
            Error::Validation("progesterone level must not be negative".into()),
        ),
        Some(_) => Ok(()),
    };

    let result = check.map(|()| {
        let log = HeatLog {
            id: Uuid::new_v4(),
            heat_cycle_id,
            date,
            observation,
            progesterone_level,
            notes,
        };
        db.heat_logs.push(log.clone());
        log
    });
    logged("add_heat_log", result)
}

/// Logs of a cycle, oldest first
pub fn get_heat_logs(db: &KennelData, heat_cycle_id: Uuid) -> Vec<HeatLog> {
    let mut logs: Vec<HeatLog> = db
        .heat_logs
        .iter()
        .filter(|l| l.heat_cycle_id == heat_cycle_id)
        .cloned()
        .collect();
    logs.sort_by_key(|l| l.date);
    logs
}

// ============================================================================
// Prediction
// ============================================================================

/// Every known heat start for a dog, from both stores, ascending and unique
pub fn known_heat_dates(dog: &Dog, cycles: &[HeatCycle]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = cycles
        .iter()
        .filter(|c| c.dog_id == dog.id)
        .map(|c| c.start_date)
        .chain(dog.heat_history.iter().map(|e| e.date))
        .collect();
    dates.sort();
    dates.dedup();
    dates
}

/// Predict the next heat start from the mean interval between known heats
pub fn predict_next_heat(
    dog: &Dog,
    cycles: &[HeatCycle],
    default_interval_days: i64,
) -> Option<NaiveDate> {
    if dog.gender != Gender::Female {
        return None;
    }

    let dates = known_heat_dates(dog, cycles);
    let last = *dates.last()?;

    let interval = if dates.len() >= 2 {
        let total: i64 = dates.windows(2).map(|w| (w[1] - w[0]).num_days()).sum();
        total / (dates.len() as i64 - 1)
    } else {
        dog.heat_interval_days.unwrap_or(default_interval_days)
    };

    Some(last + Duration::days(interval))
}
