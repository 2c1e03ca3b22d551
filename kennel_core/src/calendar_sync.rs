//! Derived calendar events.
//!
//! Heat cycles, pregnancies and birthdays each own a set of calendar events.
//! Derived events are never patched piecemeal: a sync removes the events a
//! source owns and inserts a fresh projection. Each wipe-and-insert runs in a
//! `KennelData::transaction`, so a failed insert leaves the previous events
//! in place.
//!
//! Heat offsets follow canine heat biology: proestrus covers roughly days
//! 0-9, the fertile window days 9-15 and ovulation peaks around day 12.

use crate::dogs::birthday_in_year;
use crate::heat::get_heat_cycles;
use crate::{
    CalendarEvent, CalendarEventType, Dog, Error, EventStatus, HeatCycle, KennelData, Pregnancy,
    PregnancyStatus, Result,
};
use chrono::{Datelike, Duration, NaiveDate};
use uuid::Uuid;

pub const OVULATION_OFFSET_DAYS: i64 = 12;
pub const FERTILITY_WINDOW_START_DAYS: i64 = 9;
pub const FERTILITY_WINDOW_END_DAYS: i64 = 15;

/// Outcome of a full heat resync for one dog
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub cycles_replayed: usize,
    pub events_written: usize,
    /// The dog has exactly one `heat-active` event iff it has an active cycle
    pub verified: bool,
    pub success: bool,
}

fn derived_event(
    title: String,
    event_type: CalendarEventType,
    date: NaiveDate,
    end_date: Option<NaiveDate>,
    dog_id: Uuid,
    dog_name: &str,
    status: EventStatus,
    source_id: Uuid,
) -> CalendarEvent {
    CalendarEvent {
        id: Uuid::new_v4(),
        title,
        date,
        end_date,
        event_type,
        dog_id: Some(dog_id),
        dog_name: Some(dog_name.to_string()),
        status: Some(status),
        notes: None,
        source_id: Some(source_id),
    }
}

fn insert_all(db: &mut KennelData, events: Vec<CalendarEvent>) -> Result<usize> {
    let count = events.len();
    for event in events {
        db.insert_calendar_event(event)?;
    }
    Ok(count)
}

// ============================================================================
// Heat cycles
// ============================================================================

/// The event representing the cycle itself
fn heat_cycle_event(cycle: &HeatCycle, dog_name: &str) -> CalendarEvent {
    let (title, event_type, status) = match cycle.end_date {
        None => (
            format!("{} in heat", dog_name),
            CalendarEventType::HeatActive,
            EventStatus::Active,
        ),
        Some(_) => (
            format!("{} heat", dog_name),
            CalendarEventType::Heat,
            EventStatus::Ended,
        ),
    };

    let mut event = derived_event(
        title,
        event_type,
        cycle.start_date,
        cycle.end_date,
        cycle.dog_id,
        dog_name,
        status,
        cycle.id,
    );
    event.notes = cycle.notes.clone();
    event
}

/// Events projected from a heat cycle; predictions only while it is active
pub fn heat_cycle_events(cycle: &HeatCycle, dog_name: &str) -> Vec<CalendarEvent> {
    let mut events = vec![heat_cycle_event(cycle, dog_name)];

    if cycle.is_active() {
        let start = cycle.start_date;
        events.push(derived_event(
            format!("{} predicted ovulation", dog_name),
            CalendarEventType::OvulationPredicted,
            start + Duration::days(OVULATION_OFFSET_DAYS),
            None,
            cycle.dog_id,
            dog_name,
            EventStatus::Predicted,
            cycle.id,
        ));
        events.push(derived_event(
            format!("{} fertility window", dog_name),
            CalendarEventType::FertilityWindow,
            start + Duration::days(FERTILITY_WINDOW_START_DAYS),
            Some(start + Duration::days(FERTILITY_WINDOW_END_DAYS)),
            cycle.dog_id,
            dog_name,
            EventStatus::Predicted,
            cycle.id,
        ));
    }

    events
}

fn clear_heat_events(db: &mut KennelData, dog_id: Uuid) -> usize {
    db.delete_calendar_events(|e| e.dog_id == Some(dog_id) && e.event_type.is_heat_derived())
}

/// Replace every heat-derived event of the cycle's dog with this cycle's projection
pub fn sync_heat_cycle_to_calendar(db: &mut KennelData, cycle: &HeatCycle, dog_name: &str) -> bool {
    let result = db.transaction(|tx| {
        let removed = clear_heat_events(tx, cycle.dog_id);
        tracing::debug!("Removed {} heat events for dog {}", removed, cycle.dog_id);
        insert_all(tx, heat_cycle_events(cycle, dog_name))
    });

    match result {
        Ok(written) => {
            tracing::info!("Synced heat cycle {} to calendar ({} events)", cycle.id, written);
            true
        }
        Err(e) => {
            tracing::error!("Failed to sync heat cycle {} to calendar: {}", cycle.id, e);
            false
        }
    }
}

/// A changed start date or a cycle that just ended needs a full wipe and recreate
pub fn requires_rebuild(previous: &HeatCycle, updated: &HeatCycle) -> bool {
    previous.start_date != updated.start_date || (previous.is_active() && !updated.is_active())
}

/// Reflect an edited heat cycle on the calendar
pub fn update_calendar_for_heat_cycle(
    db: &mut KennelData,
    previous: &HeatCycle,
    updated: &HeatCycle,
    dog_name: &str,
) -> bool {
    if requires_rebuild(previous, updated) {
        return sync_heat_cycle_to_calendar(db, updated, dog_name);
    }

    let projected = heat_cycle_event(updated, dog_name);
    let mut patched = 0;
    for event in db.calendar_events.iter_mut().filter(|e| {
        e.source_id == Some(updated.id)
            && matches!(
                e.event_type,
                CalendarEventType::Heat | CalendarEventType::HeatActive
            )
    }) {
        event.title = projected.title.clone();
        event.status = projected.status;
        event.end_date = projected.end_date;
        event.notes = projected.notes.clone();
        patched += 1;
    }

    if patched == 0 {
        tracing::warn!(
            "No calendar row for heat cycle {}, recreating heat events",
            updated.id
        );
        return sync_heat_cycle_to_calendar(db, updated, dog_name);
    }

    tracing::debug!("Patched {} calendar rows for heat cycle {}", patched, updated.id);
    true
}

/// Rebuild all heat-derived events of a dog from its cycles and verify the result
///
/// Ended cycles are replayed oldest first, the active cycle last.
pub fn perform_full_sync(db: &mut KennelData, dog_id: Uuid, dog_name: &str) -> SyncReport {
    let mut cycles = get_heat_cycles(db, dog_id);
    cycles.sort_by_key(|c| (c.is_active(), c.start_date));
    let expected_active = cycles.iter().filter(|c| c.is_active()).count().min(1);

    let result = db.transaction(|tx| {
        let removed = clear_heat_events(tx, dog_id);
        tracing::debug!("Full sync removed {} heat events for dog {}", removed, dog_id);

        let mut written = 0;
        for cycle in &cycles {
            written += insert_all(tx, heat_cycle_events(cycle, dog_name))?;
        }
        Ok(written)
    });

    let events_written = match result {
        Ok(written) => written,
        Err(e) => {
            tracing::error!("Full heat sync failed for {}: {}", dog_name, e);
            return SyncReport::default();
        }
    };

    let active_events = db
        .calendar_events
        .iter()
        .filter(|e| e.dog_id == Some(dog_id) && e.event_type == CalendarEventType::HeatActive)
        .count();
    let verified = active_events == expected_active;
    if !verified {
        tracing::error!(
            "Heat sync verification failed for {}: {} heat-active events, expected {}",
            dog_name,
            active_events,
            expected_active
        );
    }

    tracing::info!(
        "Full heat sync for {}: {} cycles, {} events",
        dog_name,
        cycles.len(),
        events_written
    );

    SyncReport {
        cycles_replayed: cycles.len(),
        events_written,
        verified,
        success: verified,
    }
}

// ============================================================================
// Pregnancies
// ============================================================================

pub fn pregnancy_events(pregnancy: &Pregnancy, dog_name: &str) -> Vec<CalendarEvent> {
    let dog_id = pregnancy.female_dog_id;
    let mut events = vec![derived_event(
        format!("{} mated", dog_name),
        CalendarEventType::Mating,
        pregnancy.mating_date,
        None,
        dog_id,
        dog_name,
        EventStatus::Completed,
        pregnancy.id,
    )];

    match pregnancy.status {
        PregnancyStatus::Active => {
            events.push(derived_event(
                format!("{} pregnant", dog_name),
                CalendarEventType::PregnancyPeriod,
                pregnancy.mating_date,
                Some(pregnancy.expected_due_date),
                dog_id,
                dog_name,
                EventStatus::Active,
                pregnancy.id,
            ));
            events.push(derived_event(
                format!("{} due", dog_name),
                CalendarEventType::DueDate,
                pregnancy.expected_due_date,
                None,
                dog_id,
                dog_name,
                EventStatus::Predicted,
                pregnancy.id,
            ));
        }
        PregnancyStatus::Completed => {
            let end = pregnancy
                .actual_birth_date
                .unwrap_or(pregnancy.expected_due_date)
                .max(pregnancy.mating_date);
            events.push(derived_event(
                format!("{} pregnant", dog_name),
                CalendarEventType::PregnancyPeriod,
                pregnancy.mating_date,
                Some(end),
                dog_id,
                dog_name,
                EventStatus::Completed,
                pregnancy.id,
            ));
        }
    }

    events
}

pub fn remove_pregnancy_events(db: &mut KennelData, pregnancy_id: Uuid) -> usize {
    db.delete_calendar_events(|e| e.source_id == Some(pregnancy_id))
}

pub fn sync_pregnancy_to_calendar(
    db: &mut KennelData,
    pregnancy: &Pregnancy,
    dog_name: &str,
) -> bool {
    let result = db.transaction(|tx| {
        remove_pregnancy_events(tx, pregnancy.id);
        insert_all(tx, pregnancy_events(pregnancy, dog_name))
    });

    match result {
        Ok(written) => {
            tracing::info!("Synced pregnancy {} to calendar ({} events)", pregnancy.id, written);
            true
        }
        Err(e) => {
            tracing::error!("Failed to sync pregnancy {} to calendar: {}", pregnancy.id, e);
            false
        }
    }
}

// ============================================================================
// Birthdays
// ============================================================================

/// Replace the dog's birthday events with this year's and next year's
pub fn sync_birthday_events(db: &mut KennelData, dog: &Dog, today: NaiveDate) -> bool {
    let events: Vec<CalendarEvent> = dog
        .birthdate
        .map(|birthdate| {
            [today.year(), today.year() + 1]
                .into_iter()
                .filter_map(|year| {
                    let date = birthday_in_year(birthdate, year)?;
                    let age = year - birthdate.year();
                    Some(derived_event(
                        format!("{} turns {}", dog.name, age),
                        CalendarEventType::Birthday,
                        date,
                        None,
                        dog.id,
                        &dog.name,
                        EventStatus::Planned,
                        dog.id,
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    let result = db.transaction(|tx| {
        tx.delete_calendar_events(|e| {
            e.dog_id == Some(dog.id) && e.event_type == CalendarEventType::Birthday
        });
        insert_all(tx, events)
    });

    match result {
        Ok(_) => true,
        Err(e) => {
            tracing::error!("Failed to sync birthdays for {}: {}", dog.name, e);
            false
        }
    }
}

// ============================================================================
// User-authored events
// ============================================================================

/// Fields for a user-authored event
#[derive(Clone, Debug)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub event_type: CalendarEventType,
    pub dog_id: Option<Uuid>,
    pub notes: Option<String>,
}

pub fn add_calendar_event(db: &mut KennelData, new: NewEvent) -> Result<CalendarEvent> {
    if new.event_type.is_derived() {
        return Err(Error::Validation(format!(
            "{} events are generated automatically",
            new.event_type.as_str()
        )));
    }

    let event = CalendarEvent {
        id: Uuid::new_v4(),
        title: new.title.trim().to_string(),
        date: new.date,
        end_date: new.end_date,
        event_type: new.event_type,
        dog_id: new.dog_id,
        dog_name: new.dog_id.map(|id| db.dog_name(id)),
        status: Some(EventStatus::Planned),
        notes: new.notes,
        source_id: None,
    };
    db.insert_calendar_event(event.clone())?;

    tracing::info!("Added calendar event '{}' on {}", event.title, event.date);
    Ok(event)
}

pub fn delete_calendar_event(db: &mut KennelData, id: Uuid) -> Result<()> {
    let event = db
        .calendar_events
        .iter()
        .find(|e| e.id == id)
        .ok_or_else(|| Error::NotFound(format!("calendar event {}", id)))?;

    if event.event_type.is_derived() {
        return Err(Error::Validation(format!(
            "'{}' is generated from another record; change that record instead",
            event.title
        )));
    }

    db.delete_calendar_events(|e| e.id == id);
    tracing::info!("Deleted calendar event {}", id);
    Ok(())
}

/// Events of one dog, by date
pub fn events_for_dog(db: &KennelData, dog_id: Uuid) -> Vec<CalendarEvent> {
    let mut events: Vec<CalendarEvent> = db
        .calendar_events
        .iter()
        .filter(|e| e.dog_id == Some(dog_id))
        .cloned()
        .collect();
    events.sort_by_key(|e| (e.date, e.event_type.as_str()));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dogs::tests::female;
    use crate::heat::{create_heat_cycle, delete_heat_cycle, end_heat_cycle, update_heat_cycle};
    use crate::{HeatCyclePatch, HeatObservation};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn of_type(db: &KennelData, dog_id: Uuid, t: CalendarEventType) -> Vec<CalendarEvent> {
        db.calendar_events
            .iter()
            .filter(|e| e.dog_id == Some(dog_id) && e.event_type == t)
            .cloned()
            .collect()
    }

    #[test]
    fn test_active_cycle_projects_ovulation_and_fertility() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        let cycle = create_heat_cycle(&mut db, dog.id, d(2024, 1, 1), None).unwrap();

        assert!(sync_heat_cycle_to_calendar(&mut db, &cycle, "Bella"));

        let active = of_type(&db, dog.id, CalendarEventType::HeatActive);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].date, d(2024, 1, 1));
        assert_eq!(active[0].end_date, None);

        let ovulation = of_type(&db, dog.id, CalendarEventType::OvulationPredicted);
        assert_eq!(ovulation.len(), 1);
        assert_eq!(ovulation[0].date, d(2024, 1, 13));

        let fertile = of_type(&db, dog.id, CalendarEventType::FertilityWindow);
        assert_eq!(fertile.len(), 1);
        assert_eq!(fertile[0].date, d(2024, 1, 10));
        assert_eq!(fertile[0].end_date, Some(d(2024, 1, 16)));
    }

    #[test]
    fn test_ended_cycle_projects_single_heat_event() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        let cycle = create_heat_cycle(&mut db, dog.id, d(2024, 1, 1), None).unwrap();
        sync_heat_cycle_to_calendar(&mut db, &cycle, "Bella");
        let ended = end_heat_cycle(&mut db, cycle.id, Some(d(2024, 1, 20)), d(2024, 1, 20)).unwrap();

        assert!(update_calendar_for_heat_cycle(&mut db, &cycle, &ended, "Bella"));

        let events = events_for_dog(&db, dog.id);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, CalendarEventType::Heat);
        assert_eq!(events[0].end_date, Some(d(2024, 1, 20)));
        assert_eq!(events[0].status, Some(EventStatus::Ended));
    }

    #[test]
    fn test_notes_change_patches_in_place() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        let cycle = create_heat_cycle(&mut db, dog.id, d(2024, 1, 1), None).unwrap();
        sync_heat_cycle_to_calendar(&mut db, &cycle, "Bella");
        let ids_before: Vec<Uuid> = db.calendar_events.iter().map(|e| e.id).collect();

        let updated = update_heat_cycle(
            &mut db,
            cycle.id,
            HeatCyclePatch {
                notes: Some("strong flagging".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!requires_rebuild(&cycle, &updated));
        assert!(update_calendar_for_heat_cycle(&mut db, &cycle, &updated, "Bella"));

        let ids_after: Vec<Uuid> = db.calendar_events.iter().map(|e| e.id).collect();
        assert_eq!(ids_before, ids_after);
        let active = of_type(&db, dog.id, CalendarEventType::HeatActive);
        assert_eq!(active[0].notes.as_deref(), Some("strong flagging"));
    }

    #[test]
    fn test_start_change_rebuilds_predictions() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        let cycle = create_heat_cycle(&mut db, dog.id, d(2024, 1, 1), None).unwrap();
        sync_heat_cycle_to_calendar(&mut db, &cycle, "Bella");

        let updated = update_heat_cycle(
            &mut db,
            cycle.id,
            HeatCyclePatch {
                start_date: Some(d(2024, 1, 3)),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(update_calendar_for_heat_cycle(&mut db, &cycle, &updated, "Bella"));

        let ovulation = of_type(&db, dog.id, CalendarEventType::OvulationPredicted);
        assert_eq!(ovulation.len(), 1);
        assert_eq!(ovulation[0].date, d(2024, 1, 15));
    }

    #[test]
    fn test_full_sync_yields_exactly_one_active_event() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        let old = create_heat_cycle(&mut db, dog.id, d(2023, 6, 1), None).unwrap();
        end_heat_cycle(&mut db, old.id, Some(d(2023, 6, 21)), d(2023, 7, 1)).unwrap();
        let active = create_heat_cycle(&mut db, dog.id, d(2024, 1, 1), None).unwrap();

        // Stale duplicates left behind by earlier partial syncs
        sync_heat_cycle_to_calendar(&mut db, &active, "Bella");
        let mut stale = heat_cycle_events(&active, "Bella");
        stale.truncate(1);
        db.insert_calendar_event(stale.remove(0)).unwrap();
        assert_eq!(of_type(&db, dog.id, CalendarEventType::HeatActive).len(), 2);

        let report = perform_full_sync(&mut db, dog.id, "Bella");

        assert!(report.success);
        assert!(report.verified);
        assert_eq!(report.cycles_replayed, 2);
        assert_eq!(report.events_written, 4);
        assert_eq!(of_type(&db, dog.id, CalendarEventType::HeatActive).len(), 1);
        assert_eq!(of_type(&db, dog.id, CalendarEventType::Heat).len(), 1);
    }

    #[test]
    fn test_full_sync_without_active_cycle_has_no_active_event() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        let cycle = create_heat_cycle(&mut db, dog.id, d(2023, 6, 1), None).unwrap();
        sync_heat_cycle_to_calendar(&mut db, &cycle, "Bella");
        end_heat_cycle(&mut db, cycle.id, Some(d(2023, 6, 21)), d(2023, 7, 1)).unwrap();

        let report = perform_full_sync(&mut db, dog.id, "Bella");

        assert!(report.verified);
        assert!(of_type(&db, dog.id, CalendarEventType::HeatActive).is_empty());
        assert!(of_type(&db, dog.id, CalendarEventType::FertilityWindow).is_empty());
    }

    #[test]
    fn test_failed_sync_keeps_previous_events() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        let cycle = create_heat_cycle(&mut db, dog.id, d(2024, 1, 1), None).unwrap();
        sync_heat_cycle_to_calendar(&mut db, &cycle, "Bella");
        let before = db.calendar_events.clone();

        let mut broken = cycle.clone();
        broken.end_date = Some(d(2023, 12, 1));

        assert!(!sync_heat_cycle_to_calendar(&mut db, &broken, "Bella"));
        assert_eq!(db.calendar_events, before);
    }

    #[test]
    fn test_deleting_cycle_leaves_no_orphans() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        let cycle = create_heat_cycle(&mut db, dog.id, d(2024, 1, 1), None).unwrap();
        crate::heat::add_heat_log(&mut db, cycle.id, d(2024, 1, 2), HeatObservation::Bleeding, None, None)
            .unwrap();
        perform_full_sync(&mut db, dog.id, "Bella");
        assert_eq!(db.calendar_events.len(), 3);

        delete_heat_cycle(&mut db, cycle.id).unwrap();

        assert!(db.calendar_events.is_empty());
        assert!(db.heat_logs.is_empty());
        assert!(db.dog(dog.id).unwrap().heat_history.is_empty());
    }

    #[test]
    fn test_pregnancy_events_follow_status() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        let mut pregnancy = Pregnancy {
            id: Uuid::new_v4(),
            female_dog_id: dog.id,
            male_dog_id: None,
            external_male_name: Some("Rex".into()),
            mating_date: d(2024, 3, 1),
            expected_due_date: d(2024, 5, 3),
            actual_birth_date: None,
            status: PregnancyStatus::Active,
            notes: None,
        };

        assert!(sync_pregnancy_to_calendar(&mut db, &pregnancy, "Bella"));
        assert_eq!(db.calendar_events.len(), 3);
        assert_eq!(of_type(&db, dog.id, CalendarEventType::DueDate)[0].date, d(2024, 5, 3));

        pregnancy.status = PregnancyStatus::Completed;
        pregnancy.actual_birth_date = Some(d(2024, 5, 2));
        assert!(sync_pregnancy_to_calendar(&mut db, &pregnancy, "Bella"));

        assert_eq!(db.calendar_events.len(), 2);
        assert!(of_type(&db, dog.id, CalendarEventType::DueDate).is_empty());
        let period = of_type(&db, dog.id, CalendarEventType::PregnancyPeriod);
        assert_eq!(period[0].end_date, Some(d(2024, 5, 2)));

        assert_eq!(remove_pregnancy_events(&mut db, pregnancy.id), 2);
    }

    #[test]
    fn test_birthday_events_for_this_and_next_year() {
        let mut db = KennelData::default();
        let mut dog = female(&mut db, "Bella");
        dog.birthdate = Some(d(2020, 6, 15));
        db.dog_mut(dog.id).unwrap().birthdate = dog.birthdate;

        assert!(sync_birthday_events(&mut db, &dog, d(2024, 1, 1)));
        assert!(sync_birthday_events(&mut db, &dog, d(2024, 1, 1)));

        let birthdays = of_type(&db, dog.id, CalendarEventType::Birthday);
        assert_eq!(birthdays.len(), 2);
        assert_eq!(birthdays[0].date, d(2024, 6, 15));
        assert_eq!(birthdays[0].title, "Bella turns 4");
        assert_eq!(birthdays[1].date, d(2025, 6, 15));
    }

    #[test]
    fn test_derived_events_cannot_be_deleted_directly() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        let cycle = create_heat_cycle(&mut db, dog.id, d(2024, 1, 1), None).unwrap();
        sync_heat_cycle_to_calendar(&mut db, &cycle, "Bella");
        let derived = db.calendar_events[0].id;

        assert!(matches!(
            delete_calendar_event(&mut db, derived),
            Err(Error::Validation(_))
        ));

        let custom = add_calendar_event(
            &mut db,
            NewEvent {
                title: "Show".into(),
                date: d(2024, 2, 10),
                end_date: None,
                event_type: CalendarEventType::Custom,
                dog_id: Some(dog.id),
                notes: None,
            },
        )
        .unwrap();
        assert_eq!(custom.dog_name.as_deref(), Some("Bella"));
        delete_calendar_event(&mut db, custom.id).unwrap();
        assert!(matches!(
            delete_calendar_event(&mut db, custom.id),
            Err(Error::NotFound(_))
        ));
    }
}
