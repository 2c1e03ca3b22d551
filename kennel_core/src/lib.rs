#![forbid(unsafe_code)]

//! Core domain model and business logic for the kennel breeding calendar.
//!
//! This crate provides:
//! - Domain types (dogs, heat cycles, pregnancies, calendar events, reminders)
//! - Persistence of the kennel data file
//! - Heat cycle store with legacy history migration
//! - Heat and pregnancy projection onto the calendar
//! - Reminder generation and month grid aggregation

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod db;
pub mod projection;
pub mod dogs;
pub mod heat;
pub mod pregnancy;
pub mod calendar_sync;
pub mod reminders;
pub mod calendar_grid;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use db::KennelData;
pub use calendar_sync::{perform_full_sync, SyncReport};
pub use calendar_grid::{build_month_grid, EventIndex, GridOptions, MonthGrid};
pub use reminders::merged_reminders;
pub use export::export_calendar_csv;
