//! Core domain types for the Kennel system.
//!
//! This module defines the records stored in the kennel data file:
//! - Dogs, with the legacy embedded heat history
//! - Heat cycles and heat logs
//! - Calendar events (user-authored and derived)
//! - Pregnancies and litters
//! - Reminders

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Dogs and Litters
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
}

/// Legacy heat record embedded on the dog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeatHistoryEntry {
    pub date: NaiveDate,
}

/// A dog owned by the kennel
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dog {
    pub id: Uuid,
    pub name: String,
    pub breed: Option<String>,
    pub gender: Gender,
    pub birthdate: Option<NaiveDate>,
    pub vaccination_date: Option<NaiveDate>,
    #[serde(default)]
    pub heat_history: Vec<HeatHistoryEntry>,
    pub heat_interval_days: Option<i64>,
    pub notes: Option<String>,
}

/// A born litter
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Litter {
    pub id: Uuid,
    pub name: String,
    pub dam_id: Uuid,
    pub sire_id: Option<Uuid>,
    pub date_of_birth: NaiveDate,
    pub puppy_count: u32,
}

// ============================================================================
// Heat Cycles
// ============================================================================

/// A structured heat cycle; active while `end_date` is `None`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HeatCycle {
    pub id: Uuid,
    pub dog_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub cycle_length: Option<i64>,
    pub notes: Option<String>,
}

impl HeatCycle {
    pub fn is_active(&self) -> bool {
        self.end_date.is_none()
    }
}

/// Partial update for a heat cycle
#[derive(Clone, Debug, Default)]
pub struct HeatCyclePatch {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HeatObservation {
    Bleeding,
    Swelling,
    Behavior,
    Progesterone,
    Other,
}

/// A daily observation recorded during a heat cycle
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HeatLog {
    pub id: Uuid,
    pub heat_cycle_id: Uuid,
    pub date: NaiveDate,
    pub observation: HeatObservation,
    pub progesterone_level: Option<f64>,
    pub notes: Option<String>,
}

// ============================================================================
// Calendar Events
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CalendarEventType {
    Heat,
    HeatActive,
    OvulationPredicted,
    FertilityWindow,
    DueDate,
    PregnancyPeriod,
    Birthday,
    Mating,
    Vaccination,
    Custom,
}

impl CalendarEventType {
    /// Event types regenerated from heat cycles
    pub const HEAT_DERIVED: [CalendarEventType; 4] = [
        CalendarEventType::Heat,
        CalendarEventType::HeatActive,
        CalendarEventType::OvulationPredicted,
        CalendarEventType::FertilityWindow,
    ];

    pub fn is_heat_derived(self) -> bool {
        Self::HEAT_DERIVED.contains(&self)
    }

    /// Whether events of this type are projected from another record
    pub fn is_derived(self) -> bool {
        !matches!(self, CalendarEventType::Custom | CalendarEventType::Vaccination)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CalendarEventType::Heat => "heat",
            CalendarEventType::HeatActive => "heat-active",
            CalendarEventType::OvulationPredicted => "ovulation-predicted",
            CalendarEventType::FertilityWindow => "fertility-window",
            CalendarEventType::DueDate => "due-date",
            CalendarEventType::PregnancyPeriod => "pregnancy-period",
            CalendarEventType::Birthday => "birthday",
            CalendarEventType::Mating => "mating",
            CalendarEventType::Vaccination => "vaccination",
            CalendarEventType::Custom => "custom",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Active,
    Ended,
    Predicted,
    Planned,
    Completed,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub event_type: CalendarEventType,
    pub dog_id: Option<Uuid>,
    pub dog_name: Option<String>,
    pub status: Option<EventStatus>,
    pub notes: Option<String>,
    /// Record this event was projected from, if derived
    pub source_id: Option<Uuid>,
}

impl CalendarEvent {
    /// Last date covered by the event
    pub fn last_date(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.date)
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.date <= date && date <= self.last_date()
    }
}

// ============================================================================
// Pregnancies
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PregnancyStatus {
    Active,
    Completed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Pregnancy {
    pub id: Uuid,
    pub female_dog_id: Uuid,
    pub male_dog_id: Option<Uuid>,
    pub external_male_name: Option<String>,
    pub mating_date: NaiveDate,
    pub expected_due_date: NaiveDate,
    pub actual_birth_date: Option<NaiveDate>,
    pub status: PregnancyStatus,
    pub notes: Option<String>,
}

// ============================================================================
// Reminders
// ============================================================================

/// Reminder priority; orders `High` first
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReminderPriority {
    High,
    Medium,
    Low,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderType {
    Birthday,
    Vaccination,
    Heat,
    Pregnancy,
    LitterMilestone,
    Custom,
}

/// A reminder; system reminders carry non-UUID ids and are never persisted
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub priority: ReminderPriority,
    pub reminder_type: ReminderType,
    pub is_completed: bool,
    pub dog_id: Option<Uuid>,
    pub related_id: Option<Uuid>,
}

impl Reminder {
    /// Only UUID-identified reminders live in the data file
    pub fn is_persisted(&self) -> bool {
        Uuid::parse_str(&self.id).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_wire_names() {
        let json = serde_json::to_string(&CalendarEventType::OvulationPredicted).unwrap();
        assert_eq!(json, "\"ovulation-predicted\"");
        assert_eq!(
            CalendarEventType::HeatActive.as_str(),
            serde_json::to_string(&CalendarEventType::HeatActive)
                .unwrap()
                .trim_matches('"')
        );
    }

    #[test]
    fn test_priority_orders_high_first() {
        let mut priorities = vec![
            ReminderPriority::Low,
            ReminderPriority::High,
            ReminderPriority::Medium,
        ];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![
                ReminderPriority::High,
                ReminderPriority::Medium,
                ReminderPriority::Low
            ]
        );
    }

    #[test]
    fn test_reminder_persistence_by_id_shape() {
        let mut reminder = Reminder {
            id: "birthday-abc-2024".into(),
            title: "Birthday".into(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            priority: ReminderPriority::Low,
            reminder_type: ReminderType::Birthday,
            is_completed: false,
            dog_id: None,
            related_id: None,
        };
        assert!(!reminder.is_persisted());

        reminder.id = Uuid::new_v4().to_string();
        assert!(reminder.is_persisted());
    }

    #[test]
    fn test_event_covers_range() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let event = CalendarEvent {
            id: Uuid::new_v4(),
            title: "Fertile".into(),
            date: start,
            end_date: NaiveDate::from_ymd_opt(2024, 1, 16),
            event_type: CalendarEventType::FertilityWindow,
            dog_id: None,
            dog_name: None,
            status: None,
            notes: None,
            source_id: None,
        };
        assert!(event.covers(start));
        assert!(event.covers(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()));
        assert!(!event.covers(NaiveDate::from_ymd_opt(2024, 1, 17).unwrap()));
    }
}
