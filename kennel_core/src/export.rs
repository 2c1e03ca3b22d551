//! CSV export of calendar events.

use crate::{CalendarEvent, Result};
use std::fs::File;
use std::path::Path;

/// Column names, in `CsvRow` field order
const CSV_HEADER: [&str; 8] = [
    "id",
    "date",
    "end_date",
    "event_type",
    "title",
    "dog",
    "status",
    "notes",
];

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    date: String,
    end_date: Option<String>,
    event_type: &'static str,
    title: String,
    dog: Option<String>,
    status: Option<String>,
    notes: Option<String>,
}

impl From<&CalendarEvent> for CsvRow {
    fn from(event: &CalendarEvent) -> Self {
        CsvRow {
            id: event.id.to_string(),
            date: event.date.to_string(),
            end_date: event.end_date.map(|d| d.to_string()),
            event_type: event.event_type.as_str(),
            title: event.title.clone(),
            dog: event.dog_name.clone(),
            status: event
                .status
                .and_then(|s| serde_json::to_value(s).ok())
                .and_then(|v| v.as_str().map(str::to_string)),
            notes: event.notes.clone(),
        }
    }
}

/// Write `events` to `path` with a header row, replacing any existing file
///
/// Events are written in date order. Returns the number of rows written.
pub fn export_calendar_csv(events: &[CalendarEvent], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut sorted: Vec<&CalendarEvent> = events.iter().collect();
    sorted.sort_by_key(|e| (e.date, e.last_date()));

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(File::create(path)?);
    writer.write_record(CSV_HEADER)?;
    for event in &sorted {
        writer.serialize(CsvRow::from(*event))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Exported {} calendar events to {:?}", sorted.len(), path);
    Ok(sorted.len())
}
