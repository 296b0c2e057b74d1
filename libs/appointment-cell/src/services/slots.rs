// libs/appointment-cell/src/services/slots.rs
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use tracing::{debug, info};
use uuid::Uuid;

use shared_directory::models::Appointment;
use shared_directory::store::DirectoryStore;

use crate::models::SlotError;

/// Generates discrete bookable slots and maintains the per-doctor day-bucket
/// index that groups them by calendar date.
pub struct SlotGeneratorService {
    store: Arc<dyn DirectoryStore>,
}

impl SlotGeneratorService {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Creates open slots for a doctor within a single day's time window,
    /// stepping `duration_minutes` at a time over the half-open interval
    /// `[start, end)`. All generated ids are appended to the doctor's bucket
    /// for `date`, and the doctor document is saved once at the end.
    pub async fn create_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        duration_minutes: i64,
    ) -> Result<Vec<Appointment>, SlotError> {
        debug!(
            "Creating slots for doctor {} on {} from {} to {} every {} minutes",
            doctor_id, date, start_time, end_time, duration_minutes
        );

        if duration_minutes <= 0 {
            return Err(SlotError::Validation(
                "Slot duration must be a positive number of minutes".to_string(),
            ));
        }
        // try_minutes rejects durations a TimeDelta cannot represent, which
        // would otherwise panic on untrusted request input.
        let step = ChronoDuration::try_minutes(duration_minutes).ok_or_else(|| {
            SlotError::Validation(format!(
                "Slot duration of {} minutes is out of range",
                duration_minutes
            ))
        })?;
        if start_time >= end_time {
            return Err(SlotError::Validation(
                "Start time must be before end time".to_string(),
            ));
        }

        let mut doctor = self
            .store
            .find_doctor(doctor_id)
            .await?
            .ok_or_else(|| SlotError::InvalidReference(format!("doctor {}", doctor_id)))?;

        let start = date.and_time(start_time).and_utc();
        let end = date.and_time(end_time).and_utc();

        let mut created = Vec::new();
        let mut time = start;
        while time < end {
            let slot = Appointment::open(doctor_id, time);
            self.store.insert_appointment(&slot).await?;
            created.push(slot);
            // A step past the representable date range cannot reach `end`.
            time = match time.checked_add_signed(step) {
                Some(next) => next,
                None => break,
            };
        }

        doctor.add_slots(date, created.iter().map(|slot| slot.id));
        self.store.save_doctor(&doctor).await?;

        info!(
            "Created {} slots for doctor {} on {}",
            created.len(),
            doctor_id,
            date
        );
        Ok(created)
    }

    /// Lists the slots referenced by a doctor's day-bucket, in chronological
    /// order. With `open_only` set, booked and cancelled slots are dropped.
    pub async fn list_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        open_only: bool,
    ) -> Result<Vec<Appointment>, SlotError> {
        let doctor = self
            .store
            .find_doctor(doctor_id)
            .await?
            .ok_or_else(|| SlotError::InvalidReference(format!("doctor {}", doctor_id)))?;

        let ids = doctor.day_bucket(date).cloned().unwrap_or_default();
        let mut slots = self.store.find_appointments_by_ids(&ids).await?;
        slots.sort_by_key(|slot| slot.time_slot);

        if open_only {
            slots.retain(|slot| slot.is_open());
        }

        debug!(
            "Found {} slots for doctor {} on {} (open_only: {})",
            slots.len(),
            doctor_id,
            date,
            open_only
        );
        Ok(slots)
    }
}
