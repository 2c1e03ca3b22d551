//! Month grid aggregation for calendar rendering.
//!
//! Turns a per-date event lookup and a set of pregnancy spans into weeks of
//! day cells. Each cell keeps a bounded list of visible event pills and an
//! overflow count; each week carries the pregnancy bands drawn across it,
//! packed into a fixed number of lanes.

use crate::config::{CalendarConfig, WeekStart};
use crate::projection::{
    calculate_due_date, gestation_week, is_in_due_week, is_pregnancy_active_in_week,
    is_within_due_date_uncertainty, PregnancySpan,
};
use crate::{CalendarEvent, CalendarEventType, Error, Result};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashMap;
use uuid::Uuid;

/// Rendering limits for a grid
#[derive(Clone, Debug)]
pub struct GridOptions {
    pub max_visible_events: usize,
    pub max_pregnancy_lanes: usize,
    pub week_starts_on: WeekStart,
}

impl Default for GridOptions {
    fn default() -> Self {
        (&CalendarConfig::default()).into()
    }
}

impl From<&CalendarConfig> for GridOptions {
    fn from(config: &CalendarConfig) -> Self {
        Self {
            max_visible_events: config.max_visible_events,
            max_pregnancy_lanes: config.max_pregnancy_lanes,
            week_starts_on: config.week_starts_on,
        }
    }
}

/// Styling flags for a single day
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DayFlags {
    pub due_date: bool,
    pub birthday: bool,
    pub due_week: bool,
    pub uncertainty: bool,
    pub heat: bool,
    pub fertility: bool,
    pub ovulation: bool,
    pub today: bool,
    pub in_month: bool,
}

/// Gestation week shown at the start of a grid week
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeekBadge {
    pub pregnancy_id: Uuid,
    pub dog_name: String,
    pub week: u32,
}

#[derive(Clone, Debug)]
pub struct DayCell {
    pub date: NaiveDate,
    pub pills: Vec<CalendarEvent>,
    pub overflow: usize,
    pub flags: DayFlags,
    pub badges: Vec<WeekBadge>,
}

/// Pregnancy band inside one grid week; columns are 0-based and inclusive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PregnancyBand {
    pub pregnancy_id: Uuid,
    pub dog_name: String,
    pub lane: usize,
    pub start_col: usize,
    pub end_col: usize,
}

#[derive(Clone, Debug)]
pub struct WeekRow {
    pub start: NaiveDate,
    pub days: Vec<DayCell>,
    pub bands: Vec<PregnancyBand>,
}

#[derive(Clone, Debug)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<WeekRow>,
}

impl MonthGrid {
    pub fn day(&self, date: NaiveDate) -> Option<&DayCell> {
        self.weeks
            .iter()
            .flat_map(|w| w.days.iter())
            .find(|cell| cell.date == date)
    }
}

fn pill_rank(event_type: CalendarEventType) -> u8 {
    match event_type {
        CalendarEventType::DueDate => 0,
        CalendarEventType::Mating => 1,
        CalendarEventType::Birthday => 2,
        _ => 3,
    }
}

/// Order pills due date first, then mating, then birthday; stable within a rank
pub fn order_pills(events: &mut [CalendarEvent]) {
    events.sort_by_key(|e| pill_rank(e.event_type));
}

/// Pack the spans overlapping a week into lanes
///
/// Each span takes the first lane whose bands do not share a day column with
/// it. Spans that fit no lane once `max_lanes` are in use are left out.
pub fn assign_lanes(
    week_start: NaiveDate,
    spans: &[PregnancySpan],
    max_lanes: usize,
) -> Vec<PregnancyBand> {
    let week_end = week_start + Duration::days(6);
    let mut active: Vec<&PregnancySpan> = spans
        .iter()
        .filter(|s| is_pregnancy_active_in_week(s, week_start, week_end))
        .collect();
    active.sort_by_key(|s| (s.start, s.end));

    let mut lanes: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut bands = Vec::new();

    for span in active {
        let start_col = (span.start.max(week_start) - week_start).num_days() as usize;
        let end_col = (span.end.min(week_end) - week_start).num_days() as usize;
        let overlaps = |&(s, e): &(usize, usize)| s <= end_col && start_col <= e;

        let lane = match lanes.iter().position(|lane| !lane.iter().any(overlaps)) {
            Some(lane) => lane,
            None if lanes.len() < max_lanes => {
                lanes.push(Vec::new());
                lanes.len() - 1
            }
            None => {
                tracing::debug!(
                    "No free lane for pregnancy {} in week of {}",
                    span.pregnancy_id,
                    week_start
                );
                continue;
            }
        };

        lanes[lane].push((start_col, end_col));
        bands.push(PregnancyBand {
            pregnancy_id: span.pregnancy_id,
            dog_name: span.dog_name.clone(),
            lane,
            start_col,
            end_col,
        });
    }

    bands
}

fn day_flags(
    date: NaiveDate,
    events: &[CalendarEvent],
    spans: &[PregnancySpan],
    today: NaiveDate,
    month: u32,
) -> DayFlags {
    let has = |t: CalendarEventType| events.iter().any(|e| e.event_type == t);

    DayFlags {
        due_date: has(CalendarEventType::DueDate),
        birthday: has(CalendarEventType::Birthday),
        due_week: spans.iter().any(|s| is_in_due_week(date, s.mating_date)),
        uncertainty: spans
            .iter()
            .any(|s| is_within_due_date_uncertainty(date, calculate_due_date(s.mating_date))),
        heat: has(CalendarEventType::Heat) || has(CalendarEventType::HeatActive),
        fertility: has(CalendarEventType::FertilityWindow),
        ovulation: has(CalendarEventType::OvulationPredicted),
        today: date == today,
        in_month: date.month() == month,
    }
}

fn week_badges(week_start: NaiveDate, spans: &[PregnancySpan]) -> Vec<WeekBadge> {
    let week_end = week_start + Duration::days(6);
    spans
        .iter()
        .filter(|s| is_pregnancy_active_in_week(s, week_start, week_end))
        .map(|s| WeekBadge {
            pregnancy_id: s.pregnancy_id,
            dog_name: s.dog_name.clone(),
            week: gestation_week(s.mating_date, s.start.max(week_start)),
        })
        .collect()
}

/// Build the weeks covering `year`-`month`
pub fn build_month_grid<F>(
    year: i32,
    month: u32,
    today: NaiveDate,
    events_for_date: F,
    pregnancies: &[PregnancySpan],
    options: &GridOptions,
) -> Result<MonthGrid>
where
    F: Fn(NaiveDate) -> Vec<CalendarEvent>,
{
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::Validation(format!("invalid month {}-{:02}", year, month)))?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| Error::Validation(format!("month {}-{:02} out of range", year, month)))?;
    let last = next_month - Duration::days(1);

    let lead = (first.weekday().num_days_from_monday() + 7
        - options.week_starts_on.weekday().num_days_from_monday())
        % 7;
    let mut week_start = first - Duration::days(lead as i64);
    let mut weeks = Vec::new();

    while week_start <= last {
        let badges = week_badges(week_start, pregnancies);
        let days = (0..7)
            .map(|offset| {
                let date = week_start + Duration::days(offset);
                let mut events = events_for_date(date);
                order_pills(&mut events);
                let flags = day_flags(date, &events, pregnancies, today, month);
                let overflow = events.len().saturating_sub(options.max_visible_events);
                events.truncate(options.max_visible_events);

                DayCell {
                    date,
                    pills: events,
                    overflow,
                    flags,
                    badges: if offset == 0 { badges.clone() } else { vec![] },
                }
            })
            .collect();

        weeks.push(WeekRow {
            start: week_start,
            days,
            bands: assign_lanes(week_start, pregnancies, options.max_pregnancy_lanes),
        });
        week_start += Duration::days(7);
    }

    tracing::debug!("Built {} weeks for {}-{:02}", weeks.len(), year, month);
    Ok(MonthGrid { year, month, weeks })
}

/// Events keyed by every date they cover
#[derive(Clone, Debug, Default)]
pub struct EventIndex {
    by_date: HashMap<NaiveDate, Vec<CalendarEvent>>,
}

impl EventIndex {
    pub fn new(events: &[CalendarEvent]) -> Self {
        let mut by_date: HashMap<NaiveDate, Vec<CalendarEvent>> = HashMap::new();
        for event in events {
            let mut date = event.date;
            while date <= event.last_date() {
                by_date.entry(date).or_default().push(event.clone());
                date += Duration::days(1);
            }
        }
        Self { by_date }
    }

    pub fn events_for_date(&self, date: NaiveDate) -> Vec<CalendarEvent> {
        self.by_date.get(&date).cloned().unwrap_or_default()
    }
}

/// Selected day and event in a calendar view
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CalendarSelection {
    pub date: Option<NaiveDate>,
    pub event: Option<Uuid>,
}

impl CalendarSelection {
    /// Select a day; selecting the selected day again clears the selection
    pub fn select_day(&mut self, date: NaiveDate) {
        if self.date == Some(date) {
            self.clear();
        } else {
            self.date = Some(date);
            self.event = None;
        }
    }

    pub fn select_event(&mut self, event: &CalendarEvent) {
        self.date = Some(event.date);
        self.event = Some(event.id);
    }

    pub fn clear(&mut self) {
        self.date = None;
        self.event = None;
    }
}
