use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use kennel_core::calendar_grid::{DayCell, WeekRow};
use kennel_core::calendar_sync::{self, NewEvent};
use kennel_core::dogs::{self, NewDog};
use kennel_core::pregnancy::{self, NewPregnancy};
use kennel_core::projection::{self, pregnancy_span};
use kennel_core::reminders::{self, NewReminder};
use kennel_core::*;
use kennel_core::{heat, db::DATA_FILE_NAME};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kennel")]
#[command(about = "Heat cycle, pregnancy and breeding calendar tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage dogs
    Dog {
        #[command(subcommand)]
        command: DogCommand,
    },

    /// Record litters
    Litter {
        #[command(subcommand)]
        command: LitterCommand,
    },

    /// Track heat cycles
    Heat {
        #[command(subcommand)]
        command: HeatCommand,
    },

    /// Rebuild derived calendar events and litter reminders
    Sync {
        /// Only this dog (name or id)
        dog: Option<String>,
    },

    /// Track pregnancies
    Pregnancy {
        #[command(subcommand)]
        command: PregnancyCommand,
    },

    /// Add or delete user calendar events
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },

    /// List calendar events
    Events {
        /// Only events of this dog (name or id)
        #[arg(long)]
        dog: Option<String>,

        /// First date to show
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date to show
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Show reminders
    Reminders {
        /// Include completed reminders
        #[arg(long)]
        all: bool,
    },

    /// Manage individual reminders
    Reminder {
        #[command(subcommand)]
        command: ReminderCommand,
    },

    /// Print the calendar grid for a month
    Calendar {
        /// Month to show (YYYY-MM), defaults to the current month
        #[arg(long, value_parser = parse_month)]
        month: Option<(i32, u32)>,
    },

    /// Export calendar events to CSV
    Export {
        /// Output file
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum DogCommand {
    /// Add a dog
    Add {
        name: String,

        #[arg(long, value_enum)]
        gender: GenderArg,

        #[arg(long)]
        breed: Option<String>,

        #[arg(long)]
        birthdate: Option<NaiveDate>,

        /// Date of the last vaccination
        #[arg(long)]
        vaccinated: Option<NaiveDate>,

        /// Typical days between heats
        #[arg(long)]
        heat_interval: Option<i64>,
    },

    /// List dogs
    List,

    /// Remove a dog and all of its records
    Remove { dog: String },
}

#[derive(Subcommand)]
enum LitterCommand {
    /// Record a litter
    Add {
        name: String,

        /// Dam (name or id)
        #[arg(long)]
        dam: String,

        /// Sire (name or id)
        #[arg(long)]
        sire: Option<String>,

        #[arg(long)]
        born: NaiveDate,

        #[arg(long, default_value_t = 0)]
        puppies: u32,
    },
}

#[derive(Subcommand)]
enum HeatCommand {
    /// Start a heat cycle
    Start {
        dog: String,

        /// Start date, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// End the dog's active heat cycle
    End {
        dog: String,

        /// End date, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Edit a heat cycle
    Update {
        cycle: Uuid,

        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a heat cycle with its logs and calendar events
    Delete { cycle: Uuid },

    /// List a dog's heat cycles and the predicted next heat
    List { dog: String },

    /// Log an observation for a heat cycle
    Log {
        cycle: Uuid,

        #[arg(long, value_enum)]
        observation: ObservationArg,

        /// Observation date, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Progesterone level in ng/ml
        #[arg(long)]
        progesterone: Option<f64>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Convert legacy heat history into heat cycles
    Migrate {
        /// Only this dog (name or id)
        dog: Option<String>,
    },
}

#[derive(Subcommand)]
enum PregnancyCommand {
    /// Record a mating
    Add {
        /// Dam (name or id)
        dog: String,

        #[arg(long)]
        mated: NaiveDate,

        /// Sire from this kennel (name or id)
        #[arg(long, conflicts_with = "external_sire")]
        sire: Option<String>,

        /// Name of a sire outside this kennel
        #[arg(long)]
        external_sire: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Record the birth
    Complete {
        pregnancy: Uuid,

        #[arg(long)]
        born: NaiveDate,
    },

    /// Show gestation progress
    Show { pregnancy: Uuid },

    /// List active pregnancies
    List,
}

#[derive(Subcommand)]
enum EventCommand {
    /// Add a calendar event
    Add {
        title: String,

        #[arg(long)]
        date: NaiveDate,

        #[arg(long)]
        end: Option<NaiveDate>,

        /// Dog (name or id)
        #[arg(long)]
        dog: Option<String>,

        #[arg(long, value_enum, default_value_t = EventKindArg::Custom)]
        kind: EventKindArg,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a user calendar event
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum ReminderCommand {
    /// Add a custom reminder
    Add {
        title: String,

        #[arg(long)]
        due: NaiveDate,

        #[arg(long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,

        /// Dog (name or id)
        #[arg(long)]
        dog: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Mark a reminder as done
    Done {
        id: String,

        /// Mark as not done instead
        #[arg(long)]
        undo: bool,
    },

    /// Delete a custom reminder
    Delete { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum GenderArg {
    Female,
    Male,
}

impl From<GenderArg> for Gender {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::Female => Gender::Female,
            GenderArg::Male => Gender::Male,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ObservationArg {
    Bleeding,
    Swelling,
    Behavior,
    Progesterone,
    Other,
}

impl From<ObservationArg> for HeatObservation {
    fn from(arg: ObservationArg) -> Self {
        match arg {
            ObservationArg::Bleeding => HeatObservation::Bleeding,
            ObservationArg::Swelling => HeatObservation::Swelling,
            ObservationArg::Behavior => HeatObservation::Behavior,
            ObservationArg::Progesterone => HeatObservation::Progesterone,
            ObservationArg::Other => HeatObservation::Other,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum EventKindArg {
    Custom,
    Vaccination,
}

impl From<EventKindArg> for CalendarEventType {
    fn from(arg: EventKindArg) -> Self {
        match arg {
            EventKindArg::Custom => CalendarEventType::Custom,
            EventKindArg::Vaccination => CalendarEventType::Vaccination,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorityArg {
    High,
    Medium,
    Low,
}

impl From<PriorityArg> for ReminderPriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::High => ReminderPriority::High,
            PriorityArg::Medium => ReminderPriority::Medium,
            PriorityArg::Low => ReminderPriority::Low,
        }
    }
}

fn parse_month(value: &str) -> std::result::Result<(i32, u32), String> {
    let (year, month) = value
        .split_once('-')
        .ok_or_else(|| format!("expected YYYY-MM, got '{}'", value))?;
    let year: i32 = year
        .parse()
        .map_err(|_| format!("invalid year '{}'", year))?;
    let month: u32 = month
        .parse()
        .map_err(|_| format!("invalid month '{}'", month))?;
    if !(1..=12).contains(&month) {
        return Err(format!("month must be between 1 and 12, got {}", month));
    }
    Ok((year, month))
}

/// Per-invocation settings shared by all commands
struct Context {
    data_path: PathBuf,
    today: NaiveDate,
    config: Config,
}

fn main() -> Result<()> {
    // Keep stdout clean; RUST_LOG raises verbosity
    kennel_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let ctx = Context {
        data_path: data_dir.join(DATA_FILE_NAME),
        today: cli.today.unwrap_or_else(|| Local::now().date_naive()),
        config,
    };
    tracing::debug!("Using data file {:?}, today is {}", ctx.data_path, ctx.today);

    match cli.command {
        Commands::Dog { command } => cmd_dog(&ctx, command),
        Commands::Litter { command } => cmd_litter(&ctx, command),
        Commands::Heat { command } => cmd_heat(&ctx, command),
        Commands::Sync { dog } => cmd_sync(&ctx, dog),
        Commands::Pregnancy { command } => cmd_pregnancy(&ctx, command),
        Commands::Event { command } => cmd_event(&ctx, command),
        Commands::Events { dog, from, to } => cmd_events(&ctx, dog, from, to),
        Commands::Reminders { all } => cmd_reminders(&ctx, all),
        Commands::Reminder { command } => cmd_reminder(&ctx, command),
        Commands::Calendar { month } => cmd_calendar(&ctx, month),
        Commands::Export { out } => cmd_export(&ctx, &out),
    }
}

fn warn_unverified(report: &SyncReport, dog_name: &str) {
    if !report.success {
        eprintln!("warning: calendar sync for {} did not complete", dog_name);
    }
}

fn resolve_optional_dog(db: &KennelData, key: Option<&str>) -> Result<Option<Dog>> {
    key.map(|k| db.resolve_dog(k).cloned()).transpose()
}

// ============================================================================
// Dogs and litters
// ============================================================================

fn cmd_dog(ctx: &Context, command: DogCommand) -> Result<()> {
    match command {
        DogCommand::Add {
            name,
            gender,
            breed,
            birthdate,
            vaccinated,
            heat_interval,
        } => {
            let dog = KennelData::update(&ctx.data_path, |db| {
                let dog = dogs::add_dog(
                    db,
                    NewDog {
                        name,
                        breed,
                        gender: gender.into(),
                        birthdate,
                        vaccination_date: vaccinated,
                        heat_interval_days: heat_interval,
                    },
                )?;
                if !calendar_sync::sync_birthday_events(db, &dog, ctx.today) {
                    eprintln!("warning: birthday events for {} were not created", dog.name);
                }
                Ok(dog)
            })?;
            println!("✓ Added {} ({})", dog.name, dog.id);
        }

        DogCommand::List => {
            let db = KennelData::load(&ctx.data_path)?;
            if db.dogs.is_empty() {
                println!("No dogs yet.");
            }
            for dog in &db.dogs {
                let gender = match dog.gender {
                    Gender::Female => "female",
                    Gender::Male => "male",
                };
                print!("{}  {} ({})", dog.id, dog.name, gender);
                if let Some(breed) = &dog.breed {
                    print!(", {}", breed);
                }
                if let Some(birthdate) = dog.birthdate {
                    print!(", born {}", birthdate);
                }
                if heat::get_active_heat_cycle(&db, dog.id).is_some() {
                    print!("  [in heat]");
                }
                println!();
            }
        }

        DogCommand::Remove { dog } => {
            let name = KennelData::update(&ctx.data_path, |db| {
                let dog = db.resolve_dog(&dog)?.clone();
                dogs::delete_dog(db, dog.id)?;
                Ok(dog.name)
            })?;
            println!("✓ Removed {}", name);
        }
    }
    Ok(())
}

fn cmd_litter(ctx: &Context, command: LitterCommand) -> Result<()> {
    let LitterCommand::Add {
        name,
        dam,
        sire,
        born,
        puppies,
    } = command;

    let (litter, milestones) = KennelData::update(&ctx.data_path, |db| {
        let dam = db.resolve_dog(&dam)?.id;
        let sire = resolve_optional_dog(db, sire.as_deref())?.map(|d| d.id);
        let litter = dogs::add_litter(db, &name, dam, sire, born, puppies)?;
        let milestones = reminders::persist_litter_milestones(db, ctx.today, &ctx.config);
        Ok((litter, milestones))
    })?;

    println!("✓ Recorded litter {} born {} ({})", litter.name, litter.date_of_birth, litter.id);
    if milestones > 0 {
        println!("  {} milestone reminders added", milestones);
    }
    Ok(())
}

// ============================================================================
// Heat cycles
// ============================================================================

fn cmd_heat(ctx: &Context, command: HeatCommand) -> Result<()> {
    match command {
        HeatCommand::Start { dog, date, notes } => {
            let start = date.unwrap_or(ctx.today);
            let (dog, cycle, report) = KennelData::update(&ctx.data_path, |db| {
                let dog = db.resolve_dog(&dog)?.clone();
                let cycle = heat::create_heat_cycle(db, dog.id, start, notes).ok_or_else(|| {
                    Error::Validation(format!("could not start a heat cycle for {}", dog.name))
                })?;
                let report = perform_full_sync(db, dog.id, &dog.name);
                Ok((dog, cycle, report))
            })?;
            warn_unverified(&report, &dog.name);
            println!("✓ Heat started for {} on {} ({})", dog.name, cycle.start_date, cycle.id);
        }

        HeatCommand::End { dog, date } => {
            let (dog, cycle, report) = KennelData::update(&ctx.data_path, |db| {
                let dog = db.resolve_dog(&dog)?.clone();
                let active = heat::get_active_heat_cycle(db, dog.id).ok_or_else(|| {
                    Error::NotFound(format!("active heat cycle for {}", dog.name))
                })?;
                let cycle = heat::end_heat_cycle(db, active.id, date, ctx.today).ok_or_else(
                    || Error::Validation(format!("could not end the heat cycle of {}", dog.name)),
                )?;
                let report = perform_full_sync(db, dog.id, &dog.name);
                Ok((dog, cycle, report))
            })?;
            warn_unverified(&report, &dog.name);
            println!(
                "✓ Heat ended for {} on {} ({} days)",
                dog.name,
                cycle.end_date.unwrap_or(ctx.today),
                cycle.cycle_length.unwrap_or_default()
            );
        }

        HeatCommand::Update {
            cycle,
            start,
            end,
            notes,
        } => {
            let updated = KennelData::update(&ctx.data_path, |db| {
                let previous = db
                    .heat_cycle(cycle)
                    .cloned()
                    .ok_or_else(|| Error::NotFound(format!("heat cycle {}", cycle)))?;
                let patch = HeatCyclePatch {
                    start_date: start,
                    end_date: end,
                    notes,
                };
                let updated = heat::update_heat_cycle(db, cycle, patch).ok_or_else(|| {
                    Error::Validation(format!("could not update heat cycle {}", cycle))
                })?;

                let name = db.dog_name(updated.dog_id);
                let synced = if calendar_sync::requires_rebuild(&previous, &updated) {
                    perform_full_sync(db, updated.dog_id, &name).success
                } else {
                    calendar_sync::update_calendar_for_heat_cycle(db, &previous, &updated, &name)
                };
                if !synced {
                    eprintln!("warning: calendar sync for {} did not complete", name);
                }
                Ok(updated)
            })?;
            println!("✓ Updated heat cycle {}", updated.id);
        }

        HeatCommand::Delete { cycle } => {
            KennelData::update(&ctx.data_path, |db| heat::delete_heat_cycle(db, cycle))?;
            println!("✓ Deleted heat cycle {}", cycle);
        }

        HeatCommand::List { dog } => {
            let db = KennelData::load(&ctx.data_path)?;
            let dog = db.resolve_dog(&dog)?;
            let cycles = heat::get_heat_cycles(&db, dog.id);

            if cycles.is_empty() {
                println!("No heat cycles recorded for {}.", dog.name);
            }
            for cycle in &cycles {
                match cycle.end_date {
                    Some(end) => println!(
                        "{}  {} to {} ({} days)",
                        cycle.id,
                        cycle.start_date,
                        end,
                        cycle.cycle_length.unwrap_or_default()
                    ),
                    None => println!("{}  {} (active)", cycle.id, cycle.start_date),
                }
                for log in heat::get_heat_logs(&db, cycle.id) {
                    let level = log
                        .progesterone_level
                        .map(|l| format!(" {:.1} ng/ml", l))
                        .unwrap_or_default();
                    println!("    {} {:?}{}", log.date, log.observation, level);
                }
            }

            if let Some(next) =
                heat::predict_next_heat(dog, &db.heat_cycles, ctx.config.heat.default_interval_days)
            {
                println!("Next heat expected around {}", next);
            }
        }

        HeatCommand::Log {
            cycle,
            observation,
            date,
            progesterone,
            notes,
        } => {
            let log = KennelData::update(&ctx.data_path, |db| {
                heat::add_heat_log(
                    db,
                    cycle,
                    date.unwrap_or(ctx.today),
                    observation.into(),
                    progesterone,
                    notes,
                )
                .ok_or_else(|| Error::Validation(format!("could not log heat cycle {}", cycle)))
            })?;
            println!("✓ Logged {:?} on {}", log.observation, log.date);
        }

        HeatCommand::Migrate { dog } => {
            let migrated = KennelData::update(&ctx.data_path, |db| {
                let targets: Vec<Dog> = match resolve_optional_dog(db, dog.as_deref())? {
                    Some(dog) => vec![dog],
                    None => db
                        .dogs
                        .iter()
                        .filter(|d| d.gender == Gender::Female)
                        .cloned()
                        .collect(),
                };

                let mut migrated = Vec::new();
                for dog in targets {
                    let created = heat::sync_heat_history_to_heat_cycles(db, dog.id, ctx.today);
                    heat::sync_heat_cycles_to_heat_history(db, dog.id);
                    if created > 0 {
                        warn_unverified(&perform_full_sync(db, dog.id, &dog.name), &dog.name);
                    }
                    migrated.push((dog.name, created));
                }
                Ok(migrated)
            })?;

            for (name, created) in migrated {
                println!("✓ {}: {} heat cycles migrated", name, created);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Sync
// ============================================================================

fn cmd_sync(ctx: &Context, dog: Option<String>) -> Result<()> {
    let (reports, milestones) = KennelData::update(&ctx.data_path, |db| {
        let targets: Vec<Dog> = match resolve_optional_dog(db, dog.as_deref())? {
            Some(dog) => vec![dog],
            None => db.dogs.clone(),
        };

        let mut reports = Vec::new();
        for dog in targets {
            let report = perform_full_sync(db, dog.id, &dog.name);
            calendar_sync::sync_birthday_events(db, &dog, ctx.today);

            let pregnancies: Vec<Pregnancy> = db
                .pregnancies
                .iter()
                .filter(|p| p.female_dog_id == dog.id)
                .cloned()
                .collect();
            for pregnancy in &pregnancies {
                calendar_sync::sync_pregnancy_to_calendar(db, pregnancy, &dog.name);
            }
            reports.push((dog.name, report));
        }

        let milestones = reminders::persist_litter_milestones(db, ctx.today, &ctx.config);
        Ok((reports, milestones))
    })?;

    for (name, report) in &reports {
        warn_unverified(report, name);
        println!(
            "✓ {}: {} heat cycles, {} events",
            name, report.cycles_replayed, report.events_written
        );
    }
    if milestones > 0 {
        println!("✓ {} milestone reminders added", milestones);
    }
    Ok(())
}

// ============================================================================
// Pregnancies
// ============================================================================

fn cmd_pregnancy(ctx: &Context, command: PregnancyCommand) -> Result<()> {
    match command {
        PregnancyCommand::Add {
            dog,
            mated,
            sire,
            external_sire,
            notes,
        } => {
            let (dog, pregnancy) = KennelData::update(&ctx.data_path, |db| {
                let dog = db.resolve_dog(&dog)?.clone();
                let sire = resolve_optional_dog(db, sire.as_deref())?.map(|d| d.id);
                let pregnancy = pregnancy::create_pregnancy(
                    db,
                    NewPregnancy {
                        female_dog_id: dog.id,
                        male_dog_id: sire,
                        external_male_name: external_sire,
                        mating_date: mated,
                        notes,
                    },
                )
                .ok_or_else(|| {
                    Error::Validation(format!("could not record a pregnancy for {}", dog.name))
                })?;
                if !calendar_sync::sync_pregnancy_to_calendar(db, &pregnancy, &dog.name) {
                    eprintln!("warning: calendar sync for {} did not complete", dog.name);
                }
                Ok((dog, pregnancy))
            })?;
            println!(
                "✓ Pregnancy recorded for {}, due {} ({})",
                dog.name, pregnancy.expected_due_date, pregnancy.id
            );
        }

        PregnancyCommand::Complete { pregnancy, born } => {
            let completed = KennelData::update(&ctx.data_path, |db| {
                let completed = pregnancy::complete_pregnancy(db, pregnancy, born).ok_or_else(
                    || Error::Validation(format!("could not complete pregnancy {}", pregnancy)),
                )?;
                let name = db.dog_name(completed.female_dog_id);
                if !calendar_sync::sync_pregnancy_to_calendar(db, &completed, &name) {
                    eprintln!("warning: calendar sync for {} did not complete", name);
                }
                Ok(completed)
            })?;
            println!(
                "✓ Pregnancy {} completed, born {}",
                completed.id,
                completed.actual_birth_date.unwrap_or(born)
            );
        }

        PregnancyCommand::Show { pregnancy } => {
            let db = KennelData::load(&ctx.data_path)?;
            let pregnancy = pregnancy::get_pregnancy(&db, pregnancy)
                .ok_or_else(|| Error::NotFound(format!("pregnancy {}", pregnancy)))?;
            print_pregnancy(&db, &pregnancy, ctx.today);
        }

        PregnancyCommand::List => {
            let db = KennelData::load(&ctx.data_path)?;
            let active = pregnancy::active_pregnancies(&db);
            if active.is_empty() {
                println!("No active pregnancies.");
            }
            for pregnancy in &active {
                let days = projection::calculate_days_pregnant(pregnancy.mating_date, ctx.today);
                println!(
                    "{}  {} due {} (day {})",
                    pregnancy.id,
                    db.dog_name(pregnancy.female_dog_id),
                    pregnancy.expected_due_date,
                    days
                );
            }
        }
    }
    Ok(())
}

fn print_pregnancy(db: &KennelData, pregnancy: &Pregnancy, today: NaiveDate) {
    let dam = db.dog_name(pregnancy.female_dog_id);
    let sire = pregnancy
        .male_dog_id
        .map(|id| db.dog_name(id))
        .or_else(|| pregnancy.external_male_name.clone())
        .unwrap_or_else(|| "unknown".into());

    println!("{} x {}", dam, sire);
    println!("  Mated:    {}", pregnancy.mating_date);
    println!("  Due:      {}", pregnancy.expected_due_date);

    match pregnancy.status {
        PregnancyStatus::Completed => {
            if let Some(born) = pregnancy.actual_birth_date {
                println!("  Born:     {}", born);
            }
        }
        PregnancyStatus::Active => {
            let days = projection::calculate_days_pregnant(pregnancy.mating_date, today);
            println!(
                "  Day {} (week {}), {:.0}% complete",
                days,
                projection::gestation_week(pregnancy.mating_date, today),
                projection::calculate_progress(pregnancy.mating_date, today)
            );
            let span = pregnancy_span(pregnancy, &dam);
            if let Some(band) = projection::week_bands(&span)
                .into_iter()
                .find(|b| b.start <= today && today <= b.end)
            {
                println!("  Week {}: {} to {}", band.number, band.start, band.end);
            }
            if projection::is_in_due_week(today, pregnancy.mating_date) {
                println!("  In the due window");
            }
        }
    }

    if let Some(notes) = &pregnancy.notes {
        println!("  Notes:    {}", notes);
    }
}

// ============================================================================
// Calendar events
// ============================================================================

fn cmd_event(ctx: &Context, command: EventCommand) -> Result<()> {
    match command {
        EventCommand::Add {
            title,
            date,
            end,
            dog,
            kind,
            notes,
        } => {
            let event = KennelData::update(&ctx.data_path, |db| {
                let dog_id = resolve_optional_dog(db, dog.as_deref())?.map(|d| d.id);
                calendar_sync::add_calendar_event(
                    db,
                    NewEvent {
                        title,
                        date,
                        end_date: end,
                        event_type: kind.into(),
                        dog_id,
                        notes,
                    },
                )
            })?;
            println!("✓ Added event '{}' on {} ({})", event.title, event.date, event.id);
        }

        EventCommand::Delete { id } => {
            KennelData::update(&ctx.data_path, |db| calendar_sync::delete_calendar_event(db, id))?;
            println!("✓ Deleted event {}", id);
        }
    }
    Ok(())
}

fn cmd_events(
    ctx: &Context,
    dog: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<()> {
    let db = KennelData::load(&ctx.data_path)?;
    let mut events = match resolve_optional_dog(&db, dog.as_deref())? {
        Some(dog) => calendar_sync::events_for_dog(&db, dog.id),
        None => db.calendar_events.clone(),
    };
    events.retain(|e| from.map_or(true, |f| e.last_date() >= f) && to.map_or(true, |t| e.date <= t));
    events.sort_by_key(|e| (e.date, e.event_type.as_str()));

    if events.is_empty() {
        println!("No calendar events.");
    }
    for event in &events {
        let span = match event.end_date {
            Some(end) if end != event.date => format!("{} to {}", event.date, end),
            _ => event.date.to_string(),
        };
        println!(
            "{}  {:<22} {:<20} {}",
            event.id,
            span,
            event.event_type.as_str(),
            event.title
        );
    }
    Ok(())
}

// ============================================================================
// Reminders
// ============================================================================

fn priority_label(priority: ReminderPriority) -> &'static str {
    match priority {
        ReminderPriority::High => "HIGH",
        ReminderPriority::Medium => "MEDIUM",
        ReminderPriority::Low => "LOW",
    }
}

fn cmd_reminders(ctx: &Context, all: bool) -> Result<()> {
    let merged = KennelData::update(&ctx.data_path, |db| {
        reminders::persist_litter_milestones(db, ctx.today, &ctx.config);
        Ok(merged_reminders(db, ctx.today, &ctx.config))
    })?;

    let shown: Vec<&Reminder> = merged.iter().filter(|r| all || !r.is_completed).collect();
    if shown.is_empty() {
        println!("No reminders.");
    }
    for reminder in shown {
        let overdue = if !reminder.is_completed && reminder.due_date < ctx.today {
            " (overdue)"
        } else {
            ""
        };
        let done = if reminder.is_completed { "✓" } else { " " };
        println!(
            "{} [{:<6}] {}  {}{}  ({})",
            done,
            priority_label(reminder.priority),
            reminder.due_date,
            reminder.title,
            overdue,
            reminder.id
        );
        if let Some(description) = &reminder.description {
            println!("      {}", description);
        }
    }
    Ok(())
}

fn cmd_reminder(ctx: &Context, command: ReminderCommand) -> Result<()> {
    match command {
        ReminderCommand::Add {
            title,
            due,
            priority,
            dog,
            description,
        } => {
            let reminder = KennelData::update(&ctx.data_path, |db| {
                let dog_id = resolve_optional_dog(db, dog.as_deref())?.map(|d| d.id);
                reminders::add_custom_reminder(
                    db,
                    NewReminder {
                        title,
                        description,
                        due_date: due,
                        priority: priority.into(),
                        dog_id,
                    },
                )
                .ok_or_else(|| Error::Validation("could not add reminder".into()))
            })?;
            println!("✓ Added reminder '{}' due {} ({})", reminder.title, reminder.due_date, reminder.id);
        }

        ReminderCommand::Done { id, undo } => {
            KennelData::update(&ctx.data_path, |db| {
                let known = merged_reminders(db, ctx.today, &ctx.config)
                    .iter()
                    .any(|r| r.id == id)
                    || db.completed_system_reminders.contains(&id);
                if !known || !reminders::set_reminder_completed(db, &id, !undo) {
                    return Err(Error::NotFound(format!("reminder {}", id)));
                }
                Ok(())
            })?;
            if undo {
                println!("✓ Reminder {} reopened", id);
            } else {
                println!("✓ Reminder {} done", id);
            }
        }

        ReminderCommand::Delete { id } => {
            KennelData::update(&ctx.data_path, |db| reminders::delete_reminder(db, &id))?;
            println!("✓ Deleted reminder {}", id);
        }
    }
    Ok(())
}

// ============================================================================
// Calendar grid and export
// ============================================================================

fn cmd_calendar(ctx: &Context, month: Option<(i32, u32)>) -> Result<()> {
    let (year, month) = month.unwrap_or((ctx.today.year(), ctx.today.month()));
    let db = KennelData::load(&ctx.data_path)?;

    let index = EventIndex::new(&db.calendar_events);
    let spans: Vec<_> = db
        .pregnancies
        .iter()
        .map(|p| pregnancy_span(p, &db.dog_name(p.female_dog_id)))
        .collect();
    let options = GridOptions::from(&ctx.config.calendar);

    let grid = build_month_grid(
        year,
        month,
        ctx.today,
        |date| index.events_for_date(date),
        &spans,
        &options,
    )?;

    println!("{}-{:02}", grid.year, grid.month);
    for week in &grid.weeks {
        print_week(week);
    }
    Ok(())
}

fn print_week(week: &WeekRow) {
    println!("─── week of {} ───", week.start);
    if let Some(first) = week.days.first() {
        for badge in &first.badges {
            println!("  {} week {}", badge.dog_name, badge.week);
        }
    }
    for band in &week.bands {
        println!(
            "  lane {}: {} {}-{}",
            band.lane + 1,
            band.dog_name,
            week.days[band.start_col].date.format("%a"),
            week.days[band.end_col].date.format("%a")
        );
    }
    for cell in week.days.iter().filter(|c| c.flags.in_month) {
        print_day(cell);
    }
}

fn print_day(cell: &DayCell) {
    let flags = &cell.flags;
    let mut marks = Vec::new();
    if flags.today {
        marks.push("today");
    }
    if flags.due_week {
        marks.push("due week");
    }
    if flags.uncertainty {
        marks.push("due ±2");
    }
    if flags.ovulation {
        marks.push("ovulation");
    }
    if flags.fertility {
        marks.push("fertile");
    }

    if cell.pills.is_empty() && marks.is_empty() {
        return;
    }

    let mut line = format!("  {}", cell.date.format("%a %d"));
    if !marks.is_empty() {
        line.push_str(&format!(" [{}]", marks.join(", ")));
    }
    let titles: Vec<&str> = cell.pills.iter().map(|e| e.title.as_str()).collect();
    if !titles.is_empty() {
        line.push_str("  ");
        line.push_str(&titles.join(" · "));
    }
    if cell.overflow > 0 {
        line.push_str(&format!(" +{} more", cell.overflow));
    }
    println!("{}", line);
}

fn cmd_export(ctx: &Context, out: &Path) -> Result<()> {
    let db = KennelData::load(&ctx.data_path)?;
    let count = export_calendar_csv(&db.calendar_events, out)?;
    println!("✓ Exported {} events to {}", count, out.display());
    Ok(())
}
