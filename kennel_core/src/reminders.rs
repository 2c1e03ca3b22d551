//! Reminder generation and merging.
//!
//! Two kinds of reminders are shown together:
//! - System reminders (birthdays, vaccinations, expected heats, due dates)
//!   are recomputed on every load and carry deterministic non-UUID ids.
//! - Persisted reminders (litter milestones and user-created ones) live in
//!   the data file under UUID ids.
//!
//! Litter milestones are inserted only after checking the existing rows, so
//! repeated generation never grows the table. Deleted milestones are
//! remembered in `dismissed_milestones` and never inserted again.

use crate::dogs::birthday_in_year;
use crate::heat::{get_active_heat_cycle, predict_next_heat};
use crate::projection::calculate_days_pregnant;
use crate::{
    Config, Error, Gender, KennelData, Reminder, ReminderPriority, ReminderType, Result,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashSet;
use uuid::Uuid;

/// Days after birth, title and priority of each litter milestone
static LITTER_MILESTONES: [(i64, &str, ReminderPriority); 6] = [
    (14, "first deworming", ReminderPriority::High),
    (28, "second deworming", ReminderPriority::High),
    (42, "third deworming", ReminderPriority::High),
    (49, "puppy health check", ReminderPriority::Medium),
    (56, "first vaccination", ReminderPriority::High),
    (56, "puppies ready for new homes", ReminderPriority::Medium),
];

/// Milestones stay relevant for a week after they fall due
const MILESTONE_GRACE_DAYS: i64 = 7;

/// Vaccinations are boosted yearly
const VACCINATION_INTERVAL_DAYS: i64 = 365;

const URGENT_WITHIN_DAYS: i64 = 7;

fn system_reminder(
    id: String,
    title: String,
    description: Option<String>,
    due_date: NaiveDate,
    priority: ReminderPriority,
    reminder_type: ReminderType,
    dog_id: Uuid,
) -> Reminder {
    Reminder {
        id,
        title,
        description,
        due_date,
        priority,
        reminder_type,
        is_completed: false,
        dog_id: Some(dog_id),
        related_id: None,
    }
}

// ============================================================================
// System reminders
// ============================================================================

/// Recompute birthday, vaccination, heat and due-date reminders
pub fn generate_system_reminders(
    db: &KennelData,
    today: NaiveDate,
    config: &Config,
) -> Vec<Reminder> {
    let horizon = today + Duration::days(config.reminders.lookahead_days);
    let mut reminders = Vec::new();

    for dog in &db.dogs {
        if let Some(birthdate) = dog.birthdate {
            let next = birthday_in_year(birthdate, today.year())
                .filter(|date| *date >= today)
                .or_else(|| birthday_in_year(birthdate, today.year() + 1));
            if let Some(date) = next.filter(|date| *date <= horizon) {
                reminders.push(system_reminder(
                    format!("birthday-{}-{}", dog.id, date.year()),
                    format!("{}'s birthday", dog.name),
                    Some(format!("Turns {}", date.year() - birthdate.year())),
                    date,
                    ReminderPriority::Low,
                    ReminderType::Birthday,
                    dog.id,
                ));
            }
        }

        if let Some(vaccinated) = dog.vaccination_date {
            let due = vaccinated + Duration::days(VACCINATION_INTERVAL_DAYS);
            if due <= horizon {
                let priority = if (due - today).num_days() <= URGENT_WITHIN_DAYS {
                    ReminderPriority::High
                } else {
                    ReminderPriority::Medium
                };
                reminders.push(system_reminder(
                    format!("vaccination-{}-{}", dog.id, due),
                    format!("{} vaccination due", dog.name),
                    Some(format!("Last vaccinated {}", vaccinated)),
                    due,
                    priority,
                    ReminderType::Vaccination,
                    dog.id,
                ));
            }
        }

        if dog.gender == Gender::Female && get_active_heat_cycle(db, dog.id).is_none() {
            let expected =
                predict_next_heat(dog, &db.heat_cycles, config.heat.default_interval_days);
            let window_start = today - Duration::days(config.reminders.lookahead_days);
            if let Some(date) = expected.filter(|d| *d >= window_start && *d <= horizon) {
                reminders.push(system_reminder(
                    format!("heat-{}-{}", dog.id, date),
                    format!("{} heat expected", dog.name),
                    Some("Watch for swelling and bleeding".into()),
                    date,
                    ReminderPriority::Medium,
                    ReminderType::Heat,
                    dog.id,
                ));
            }
        }
    }

    for pregnancy in crate::pregnancy::active_pregnancies(db) {
        if pregnancy.expected_due_date > horizon {
            continue;
        }
        let name = db.dog_name(pregnancy.female_dog_id);
        reminders.push(system_reminder(
            format!("due-{}", pregnancy.id),
            format!("{} due to whelp", name),
            Some(format!(
                "Day {} of pregnancy",
                calculate_days_pregnant(pregnancy.mating_date, today)
            )),
            pregnancy.expected_due_date,
            ReminderPriority::High,
            ReminderType::Pregnancy,
            pregnancy.female_dog_id,
        ));
    }

    for reminder in &mut reminders {
        reminder.is_completed = db.completed_system_reminders.contains(&reminder.id);
    }

    tracing::debug!("Generated {} system reminders", reminders.len());
    reminders
}

// ============================================================================
// Persisted litter milestones
// ============================================================================

fn dedup_key(reminder: &Reminder) -> (Option<Uuid>, ReminderType, String) {
    (
        reminder.related_id,
        reminder.reminder_type,
        reminder.title.to_lowercase(),
    )
}

/// Key recorded when a litter milestone is deleted
pub(crate) fn milestone_key(reminder: &Reminder) -> Option<String> {
    match (reminder.reminder_type, reminder.related_id) {
        (ReminderType::LitterMilestone, Some(litter_id)) => {
            Some(format!("{}:{}", litter_id, reminder.title.to_lowercase()))
        }
        _ => None,
    }
}

/// Milestone reminders currently in range for every litter
pub fn litter_milestone_candidates(
    db: &KennelData,
    today: NaiveDate,
    config: &Config,
) -> Vec<Reminder> {
    let earliest = today - Duration::days(MILESTONE_GRACE_DAYS);
    let horizon = today + Duration::days(config.reminders.lookahead_days);

    db.litters
        .iter()
        .flat_map(|litter| {
            LITTER_MILESTONES
                .iter()
                .map(move |(offset, title, priority)| {
                    (litter, litter.date_of_birth + Duration::days(*offset), *title, *priority)
                })
        })
        .filter(|(_, due, _, _)| *due >= earliest && *due <= horizon)
        .map(|(litter, due, title, priority)| Reminder {
            id: Uuid::new_v4().to_string(),
            title: format!("{}: {}", litter.name, title),
            description: Some(format!("{} puppies", litter.puppy_count)),
            due_date: due,
            priority,
            reminder_type: ReminderType::LitterMilestone,
            is_completed: false,
            dog_id: Some(litter.dam_id),
            related_id: Some(litter.id),
        })
        .collect()
}

/// Insert milestone reminders that are not already stored, returning how many were added
pub fn persist_litter_milestones(db: &mut KennelData, today: NaiveDate, config: &Config) -> usize {
    let mut existing: HashSet<_> = db.reminders.iter().map(dedup_key).collect();

    let mut added = 0;
    for candidate in litter_milestone_candidates(db, today, config) {
        let dismissed = milestone_key(&candidate)
            .is_some_and(|key| db.dismissed_milestones.contains(&key));
        if dismissed {
            continue;
        }
        if existing.insert(dedup_key(&candidate)) {
            tracing::debug!("Persisting milestone reminder '{}'", candidate.title);
            db.reminders.push(candidate);
            added += 1;
        }
    }

    if added > 0 {
        tracing::info!("Persisted {} litter milestone reminders", added);
    }
    added
}

// ============================================================================
// Merge and order
// ============================================================================

/// Incomplete first, then priority high to low, then soonest (overdue) due date
pub fn sort_reminders(reminders: &mut [Reminder]) {
    reminders.sort_by(|a, b| {
        a.is_completed
            .cmp(&b.is_completed)
            .then(a.priority.cmp(&b.priority))
            .then(a.due_date.cmp(&b.due_date))
            .then_with(|| a.title.cmp(&b.title))
    });
}

/// System reminders merged with persisted ones, sorted for display
pub fn merged_reminders(db: &KennelData, today: NaiveDate, config: &Config) -> Vec<Reminder> {
    let mut merged = generate_system_reminders(db, today, config);
    merged.extend(db.reminders.iter().cloned());
    sort_reminders(&mut merged);
    merged
}

// ============================================================================
// User actions
// ============================================================================

/// Fields for a user-created reminder
#[derive(Clone, Debug)]
pub struct NewReminder {
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub priority: ReminderPriority,
    pub dog_id: Option<Uuid>,
}

pub fn add_custom_reminder(db: &mut KennelData, new: NewReminder) -> Option<Reminder> {
    if new.title.trim().is_empty() {
        tracing::error!("add_custom_reminder failed: title is empty");
        return None;
    }
    if let Some(dog_id) = new.dog_id {
        if db.dog(dog_id).is_none() {
            tracing::error!("add_custom_reminder failed: dog {} not found", dog_id);
            return None;
        }
    }

    let reminder = Reminder {
        id: Uuid::new_v4().to_string(),
        title: new.title.trim().to_string(),
        description: new.description,
        due_date: new.due_date,
        priority: new.priority,
        reminder_type: ReminderType::Custom,
        is_completed: false,
        dog_id: new.dog_id,
        related_id: None,
    };
    db.reminders.push(reminder.clone());
    tracing::info!("Added reminder '{}' due {}", reminder.title, reminder.due_date);
    Some(reminder)
}

/// Mark a reminder done or not done
///
/// System reminders are recorded by id so the flag survives regeneration.
pub fn set_reminder_completed(db: &mut KennelData, id: &str, completed: bool) -> bool {
    if Uuid::parse_str(id).is_err() {
        if completed {
            db.completed_system_reminders.insert(id.to_string());
        } else {
            db.completed_system_reminders.remove(id);
        }
        return true;
    }

    match db.reminders.iter_mut().find(|r| r.id == id) {
        Some(reminder) => {
            reminder.is_completed = completed;
            true
        }
        None => {
            tracing::error!("set_reminder_completed failed: reminder {} not found", id);
            false
        }
    }
}

/// Delete a persisted reminder; system reminders cannot be deleted
pub fn delete_reminder(db: &mut KennelData, id: &str) -> Result<()> {
    if Uuid::parse_str(id).is_err() {
        return Err(Error::Validation(format!(
            "reminder {} is generated automatically and cannot be deleted",
            id
        )));
    }

    let index = db
        .reminders
        .iter()
        .position(|r| r.id == id)
        .ok_or_else(|| Error::NotFound(format!("reminder {}", id)))?;
    let removed = db.reminders.remove(index);
    if let Some(key) = milestone_key(&removed) {
        db.dismissed_milestones.insert(key);
    }
    tracing::info!("Deleted reminder {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dogs::tests::female;
    use crate::dogs::add_litter;
    use crate::heat::create_heat_cycle;
    use crate::pregnancy::{create_pregnancy, NewPregnancy};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn reminder(title: &str, priority: ReminderPriority, due: NaiveDate, done: bool) -> Reminder {
        Reminder {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            due_date: due,
            priority,
            reminder_type: ReminderType::Custom,
            is_completed: done,
            dog_id: None,
            related_id: None,
        }
    }

    #[test]
    fn test_birthday_and_vaccination_reminders() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        {
            let dog = db.dog_mut(dog.id).unwrap();
            dog.birthdate = Some(d(2020, 6, 20));
            dog.vaccination_date = Some(d(2023, 6, 8));
        }

        let reminders = generate_system_reminders(&db, d(2024, 6, 1), &Config::default());

        let birthday = reminders
            .iter()
            .find(|r| r.reminder_type == ReminderType::Birthday)
            .unwrap();
        assert_eq!(birthday.due_date, d(2024, 6, 20));
        assert_eq!(birthday.id, format!("birthday-{}-2024", dog.id));
        assert_eq!(birthday.description.as_deref(), Some("Turns 4"));
        assert!(!birthday.is_persisted());

        let vaccination = reminders
            .iter()
            .find(|r| r.reminder_type == ReminderType::Vaccination)
            .unwrap();
        assert_eq!(vaccination.due_date, d(2024, 6, 7));
        assert_eq!(vaccination.priority, ReminderPriority::High);
    }

    #[test]
    fn test_birthday_outside_window_skipped() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        db.dog_mut(dog.id).unwrap().birthdate = Some(d(2020, 12, 1));

        let reminders = generate_system_reminders(&db, d(2024, 6, 1), &Config::default());
        assert!(reminders
            .iter()
            .all(|r| r.reminder_type != ReminderType::Birthday));
    }

    #[test]
    fn test_heat_reminder_only_without_active_cycle() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        let cycle = create_heat_cycle(&mut db, dog.id, d(2024, 1, 1), None).unwrap();
        let config = Config::default();

        assert!(generate_system_reminders(&db, d(2024, 6, 20), &config)
            .iter()
            .all(|r| r.reminder_type != ReminderType::Heat));

        crate::heat::end_heat_cycle(&mut db, cycle.id, Some(d(2024, 1, 21)), d(2024, 1, 21));
        let reminders = generate_system_reminders(&db, d(2024, 6, 20), &config);
        let heat = reminders
            .iter()
            .find(|r| r.reminder_type == ReminderType::Heat)
            .unwrap();
        assert_eq!(heat.due_date, d(2024, 6, 29));
    }

    #[test]
    fn test_due_date_reminder_is_high_priority() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        create_pregnancy(
            &mut db,
            NewPregnancy {
                female_dog_id: dog.id,
                male_dog_id: None,
                external_male_name: None,
                mating_date: d(2024, 3, 1),
                notes: None,
            },
        )
        .unwrap();

        let reminders = generate_system_reminders(&db, d(2024, 4, 20), &Config::default());
        let due = reminders
            .iter()
            .find(|r| r.reminder_type == ReminderType::Pregnancy)
            .unwrap();
        assert_eq!(due.due_date, d(2024, 5, 3));
        assert_eq!(due.priority, ReminderPriority::High);
        assert_eq!(due.description.as_deref(), Some("Day 50 of pregnancy"));
    }

    #[test]
    fn test_milestone_generation_is_idempotent() {
        let mut db = KennelData::default();
        let dam = female(&mut db, "Bella");
        add_litter(&mut db, "A-litter", dam.id, None, d(2024, 5, 1), 6).unwrap();
        let config = Config::default();
        let today = d(2024, 5, 20);

        let first = persist_litter_milestones(&mut db, today, &config);
        let count = db.reminders.len();
        let second = persist_litter_milestones(&mut db, today, &config);

        // May 15 is inside the grace week, June 19 is the last day of the window
        assert_eq!(first, 4);
        assert_eq!(second, 0);
        assert_eq!(db.reminders.len(), count);
        assert!(db.reminders.iter().all(|r| r.is_persisted()));
    }

    #[test]
    fn test_milestones_added_as_window_moves() {
        let mut db = KennelData::default();
        let dam = female(&mut db, "Bella");
        add_litter(&mut db, "A-litter", dam.id, None, d(2024, 5, 1), 6).unwrap();
        let config = Config::default();

        persist_litter_milestones(&mut db, d(2024, 5, 20), &config);
        let added = persist_litter_milestones(&mut db, d(2024, 6, 1), &config);

        // both eight-week milestones fall on June 26
        assert_eq!(added, 2);
        assert_eq!(db.reminders.len(), 6);
    }

    #[test]
    fn test_deleted_milestone_stays_deleted() {
        let mut db = KennelData::default();
        let dam = female(&mut db, "Bella");
        add_litter(&mut db, "A-litter", dam.id, None, d(2024, 5, 1), 6).unwrap();
        let config = Config::default();
        let today = d(2024, 5, 20);

        assert_eq!(persist_litter_milestones(&mut db, today, &config), 4);
        let deleted = db.reminders[0].clone();
        delete_reminder(&mut db, &deleted.id).unwrap();

        assert_eq!(persist_litter_milestones(&mut db, today, &config), 0);
        assert_eq!(db.reminders.len(), 3);
        assert!(db.reminders.iter().all(|r| r.title != deleted.title));

        // later milestones of the same litter still arrive
        assert_eq!(persist_litter_milestones(&mut db, d(2024, 6, 1), &config), 2);
    }

    #[test]
    fn test_sort_order() {
        let today = d(2024, 6, 1);
        let mut reminders = vec![
            reminder("low soon", ReminderPriority::Low, today, false),
            reminder("done high", ReminderPriority::High, d(2024, 5, 1), true),
            reminder("high later", ReminderPriority::High, d(2024, 6, 10), false),
            reminder("high overdue", ReminderPriority::High, d(2024, 5, 28), false),
            reminder("medium", ReminderPriority::Medium, d(2024, 6, 2), false),
        ];

        sort_reminders(&mut reminders);

        let titles: Vec<&str> = reminders.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["high overdue", "high later", "medium", "low soon", "done high"]
        );
    }

    #[test]
    fn test_merge_includes_persisted_and_completed_system_ids() {
        let mut db = KennelData::default();
        let dog = female(&mut db, "Bella");
        db.dog_mut(dog.id).unwrap().birthdate = Some(d(2020, 6, 20));
        let custom = add_custom_reminder(
            &mut db,
            NewReminder {
                title: "Order puppy food".into(),
                description: None,
                due_date: d(2024, 6, 5),
                priority: ReminderPriority::Medium,
                dog_id: None,
            },
        )
        .unwrap();
        let today = d(2024, 6, 1);
        let config = Config::default();

        let birthday_id = format!("birthday-{}-2024", dog.id);
        assert!(set_reminder_completed(&mut db, &birthday_id, true));

        let merged = merged_reminders(&db, today, &config);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, custom.id);
        assert_eq!(merged[1].id, birthday_id);
        assert!(merged[1].is_completed);
    }

    #[test]
    fn test_only_persisted_reminders_are_deletable() {
        let mut db = KennelData::default();
        let custom = add_custom_reminder(
            &mut db,
            NewReminder {
                title: "Book vet".into(),
                description: None,
                due_date: d(2024, 6, 5),
                priority: ReminderPriority::High,
                dog_id: None,
            },
        )
        .unwrap();

        assert!(matches!(
            delete_reminder(&mut db, "birthday-x-2024"),
            Err(Error::Validation(_))
        ));
        delete_reminder(&mut db, &custom.id).unwrap();
        assert!(matches!(
            delete_reminder(&mut db, &custom.id),
            Err(Error::NotFound(_))
        ));
        assert!(!set_reminder_completed(&mut db, &custom.id, true));
    }

    #[test]
    fn test_custom_reminder_validation() {
        let mut db = KennelData::default();
        let result = add_custom_reminder(
            &mut db,
            NewReminder {
                title: " ".into(),
                description: None,
                due_date: d(2024, 6, 5),
                priority: ReminderPriority::Low,
                dog_id: None,
            },
        );
        assert!(result.is_none());
        assert!(db.reminders.is_empty());
    }
}
