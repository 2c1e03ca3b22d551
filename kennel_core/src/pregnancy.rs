//! Pregnancy records.
//!
//! The expected due date is fixed when the pregnancy is recorded and is not
//! recalculated afterwards. Like the heat store, these operations log
//! failures and return `None`; deletion reports unknown ids as errors.

use crate::projection::calculate_due_date;
use crate::{Error, Gender, KennelData, Pregnancy, PregnancyStatus, Result};
use chrono::NaiveDate;
use uuid::Uuid;

/// Fields for a newly confirmed mating
#[derive(Clone, Debug)]
pub struct NewPregnancy {
    pub female_dog_id: Uuid,
    pub male_dog_id: Option<Uuid>,
    pub external_male_name: Option<String>,
    pub mating_date: NaiveDate,
    pub notes: Option<String>,
}

pub fn create_pregnancy(db: &mut KennelData, new: NewPregnancy) -> Option<Pregnancy> {
    match try_create_pregnancy(db, new) {
        Ok(pregnancy) => Some(pregnancy),
        Err(e) => {
            tracing::error!("create_pregnancy failed: {}", e);
            None
        }
    }
}

fn try_create_pregnancy(db: &mut KennelData, new: NewPregnancy) -> Result<Pregnancy> {
    let female = db
        .dog(new.female_dog_id)
        .ok_or_else(|| Error::NotFound(format!("dog {}", new.female_dog_id)))?;
    if female.gender != Gender::Female {
        return Err(Error::Validation(format!("{} is not a female", female.name)));
    }
    if let Some(male_id) = new.male_dog_id {
        match db.dog(male_id) {
            Some(male) if male.gender == Gender::Male => {}
            Some(other) => {
                return Err(Error::Validation(format!("{} is not a male", other.name)))
            }
            None => return Err(Error::NotFound(format!("dog {}", male_id))),
        }
    }
    if db
        .pregnancies
        .iter()
        .any(|p| p.female_dog_id == new.female_dog_id && p.status == PregnancyStatus::Active)
    {
        return Err(Error::Validation(format!(
            "{} already has an active pregnancy",
            female.name
        )));
    }

    let pregnancy = Pregnancy {
        id: Uuid::new_v4(),
        female_dog_id: new.female_dog_id,
        male_dog_id: new.male_dog_id,
        external_male_name: new.external_male_name,
        mating_date: new.mating_date,
        expected_due_date: calculate_due_date(new.mating_date),
        actual_birth_date: None,
        status: PregnancyStatus::Active,
        notes: new.notes,
    };

    tracing::info!(
        "Recorded pregnancy {} (mated {}, due {})",
        pregnancy.id,
        pregnancy.mating_date,
        pregnancy.expected_due_date
    );
    db.pregnancies.push(pregnancy.clone());
    Ok(pregnancy)
}

/// Mark a pregnancy as whelped on `birth_date`
pub fn complete_pregnancy(
    db: &mut KennelData,
    id: Uuid,
    birth_date: NaiveDate,
) -> Option<Pregnancy> {
    let Some(pregnancy) = db.pregnancies.iter_mut().find(|p| p.id == id) else {
        tracing::error!("complete_pregnancy failed: pregnancy {} not found", id);
        return None;
    };
    if birth_date < pregnancy.mating_date {
        tracing::error!(
            "complete_pregnancy failed: birth {} precedes mating {}",
            birth_date,
            pregnancy.mating_date
        );
        return None;
    }

    pregnancy.status = PregnancyStatus::Completed;
    pregnancy.actual_birth_date = Some(birth_date);
    tracing::info!("Pregnancy {} completed on {}", id, birth_date);
    Some(pregnancy.clone())
}

/// Delete a pregnancy together with the calendar events projected from it
pub fn delete_pregnancy(db: &mut KennelData, id: Uuid) -> Result<()> {
    if db.pregnancy(id).is_none() {
        return Err(Error::NotFound(format!("pregnancy {}", id)));
    }
    db.pregnancies.retain(|p| p.id != id);
    let removed = crate::calendar_sync::remove_pregnancy_events(db, id);
    tracing::info!("Deleted pregnancy {} and {} calendar events", id, removed);
    Ok(())
}

pub fn get_pregnancy(db: &KennelData, id: Uuid) -> Option<Pregnancy> {
    db.pregnancy(id).cloned()
}

/// Active pregnancies, soonest due first
pub fn active_pregnancies(db: &KennelData) -> Vec<Pregnancy> {
    let mut active: Vec<Pregnancy> = db
        .pregnancies
        .iter()
        .filter(|p| p.status == PregnancyStatus::Active)
        .cloned()
        .collect();
    active.sort_by_key(|p| p.expected_due_date);
    active
}
