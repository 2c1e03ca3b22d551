//! Dog and litter records.

use crate::config::MAX_HEAT_INTERVAL_DAYS;
use crate::{Dog, Error, Gender, KennelData, Litter, Result};
use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

/// Fields for a new dog
#[derive(Clone, Debug)]
pub struct NewDog {
    pub name: String,
    pub breed: Option<String>,
    pub gender: Gender,
    pub birthdate: Option<NaiveDate>,
    pub vaccination_date: Option<NaiveDate>,
    pub heat_interval_days: Option<i64>,
}

pub fn add_dog(db: &mut KennelData, new: NewDog) -> Result<Dog> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::Validation("dog name is empty".into()));
    }
    if matches!(new.heat_interval_days, Some(days) if !(1..=MAX_HEAT_INTERVAL_DAYS).contains(&days)) {
        return Err(Error::Validation(format!(
            "heat interval must be between 1 and {} days",
            MAX_HEAT_INTERVAL_DAYS
        )));
    }

    let dog = Dog {
        id: Uuid::new_v4(),
        name: name.to_string(),
        breed: new.breed,
        gender: new.gender,
        birthdate: new.birthdate,
        vaccination_date: new.vaccination_date,
        heat_history: vec![],
        heat_interval_days: new.heat_interval_days,
        notes: None,
    };

    tracing::info!("Added dog {} ({})", dog.name, dog.id);
    db.dogs.push(dog.clone());
    Ok(dog)
}

/// Remove a dog and every record it owns
pub fn delete_dog(db: &mut KennelData, dog_id: Uuid) -> Result<()> {
    if db.dog(dog_id).is_none() {
        return Err(Error::NotFound(format!("dog {}", dog_id)));
    }

    let cycle_ids: Vec<Uuid> = db
        .heat_cycles
        .iter()
        .filter(|c| c.dog_id == dog_id)
        .map(|c| c.id)
        .collect();
    let pregnancy_ids: Vec<Uuid> = db
        .pregnancies
        .iter()
        .filter(|p| p.female_dog_id == dog_id)
        .map(|p| p.id)
        .collect();
    let litter_ids: Vec<Uuid> = db
        .litters
        .iter()
        .filter(|l| l.dam_id == dog_id)
        .map(|l| l.id)
        .collect();

    db.heat_logs.retain(|l| !cycle_ids.contains(&l.heat_cycle_id));
    db.heat_cycles.retain(|c| c.dog_id != dog_id);
    db.pregnancies.retain(|p| p.female_dog_id != dog_id);
    let events = db.delete_calendar_events(|e| {
        e.dog_id == Some(dog_id)
            || e.source_id.is_some_and(|s| pregnancy_ids.contains(&s))
    });
    db.reminders.retain(|r| {
        r.dog_id != Some(dog_id) && !r.related_id.is_some_and(|id| litter_ids.contains(&id))
    });
    db.dismissed_milestones
        .retain(|key| !litter_ids.iter().any(|id| key.starts_with(&id.to_string())));
    db.litters.retain(|l| l.dam_id != dog_id);

    // the dog may have sired litters or pregnancies of other dams
    for litter in db.litters.iter_mut().filter(|l| l.sire_id == Some(dog_id)) {
        litter.sire_id = None;
    }
    for pregnancy in db
        .pregnancies
        .iter_mut()
        .filter(|p| p.male_dog_id == Some(dog_id))
    {
        pregnancy.male_dog_id = None;
    }
    db.dogs.retain(|d| d.id != dog_id);

    tracing::info!(
        "Deleted dog {} with {} heat cycles, {} pregnancies, {} litters, {} calendar events",
        dog_id,
        cycle_ids.len(),
        pregnancy_ids.len(),
        litter_ids.len(),
        events
    );
    Ok(())
}

/// The dog's birthday in `year`; Feb 29 birthdays fall on Feb 28 in common years
pub fn birthday_in_year(birthdate: NaiveDate, year: i32) -> Option<NaiveDate> {
    if year < birthdate.year() {
        return None;
    }
    birthdate
        .with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, birthdate.month(), 28))
}

pub fn add_litter(
    db: &mut KennelData,
    name: &str,
    dam_id: Uuid,
    sire_id: Option<Uuid>,
    date_of_birth: NaiveDate,
    puppy_count: u32,
) -> Result<Litter> {
    let dam = db
        .dog(dam_id)
        .ok_or_else(|| Error::NotFound(format!("dam {}", dam_id)))?;
    if dam.gender != Gender::Female {
        return Err(Error::Validation(format!("{} is not a female", dam.name)));
    }
    if let Some(sire) = sire_id {
        if db.dog(sire).is_none() {
            return Err(Error::NotFound(format!("sire {}", sire)));
        }
    }

    let litter = Litter {
        id: Uuid::new_v4(),
        name: name.trim().to_string(),
        dam_id,
        sire_id,
        date_of_birth,
        puppy_count,
    };

    tracing::info!("Added litter {} born {}", litter.name, litter.date_of_birth);
    db.litters.push(litter.clone());
    Ok(litter)
}
