// libs/appointment-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_directory::models::Appointment;
use shared_directory::store::{DirectoryStore, StoreError};

use crate::models::SlotError;

/// Retires booked slots (reschedule/cancel) and hard-deletes slot records.
/// Every retirement creates a replacement open slot at the original doctor
/// and time, so the doctor's slot inventory for that day stays constant.
pub struct SlotLifecycleService {
    store: Arc<dyn DirectoryStore>,
}

impl SlotLifecycleService {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// Moves a booking from `old_id` to the open slot `new_id` under the same
    /// doctor. The old slot is cancelled (keeping its stale profile reference
    /// for audit), a replacement open slot is created at its original time,
    /// and the new slot is returned bound to the profile.
    pub async fn reschedule(
        &self,
        old_id: Uuid,
        new_id: Uuid,
    ) -> Result<Appointment, SlotError> {
        debug!("Rescheduling appointment {} to {}", old_id, new_id);

        let mut old_slot = self
            .store
            .find_appointment(old_id)
            .await?
            .ok_or(SlotError::NotFound)?;
        if old_slot.cancelled {
            return Err(SlotError::AlreadyCancelled);
        }
        let profile_id = old_slot.profile_id.ok_or_else(|| {
            SlotError::Validation("Appointment is not booked".to_string())
        })?;

        let new_slot = self
            .store
            .find_appointment(new_id)
            .await?
            .ok_or_else(|| SlotError::InvalidReference(format!("appointment {}", new_id)))?;
        if new_slot.is_booked() {
            return Err(SlotError::AlreadyBooked);
        }
        if new_slot.cancelled {
            return Err(SlotError::AlreadyCancelled);
        }
        // All target validation happens before any write, so a rejected
        // reschedule leaves both slots untouched.
        if new_slot.doctor_id != old_slot.doctor_id {
            return Err(SlotError::CrossDoctorReschedule);
        }

        old_slot.cancelled = true;
        old_slot.updated_at = Utc::now();
        self.store.save_appointment(&old_slot).await?;

        let bound = self
            .store
            .bind_profile_if_open(new_id, profile_id)
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => SlotError::AlreadyBooked,
                other => other.into(),
            })?;

        let mut profile = self.store.find_profile(profile_id).await?.ok_or_else(|| {
            SlotError::InconsistentState(format!(
                "profile {} referenced by appointment {} does not exist",
                profile_id, old_id
            ))
        })?;
        profile.add_appointment(new_id);
        self.store.save_profile(&profile).await?;

        self.replace_slot(&old_slot).await?;

        info!(
            "Appointment {} rescheduled to {} for profile {}",
            old_id, new_id, profile_id
        );
        Ok(bound)
    }

    /// Cancels a slot, tops the doctor's day-bucket back up with a
    /// replacement, and releases the booking from the profile's list.
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, SlotError> {
        debug!("Cancelling appointment {}", appointment_id);

        let mut slot = self
            .store
            .find_appointment(appointment_id)
            .await?
            .ok_or(SlotError::NotFound)?;
        if slot.cancelled {
            return Err(SlotError::AlreadyCancelled);
        }

        // The stale profile reference stays on the cancelled record.
        slot.cancelled = true;
        slot.updated_at = Utc::now();
        self.store.save_appointment(&slot).await?;

        self.replace_slot(&slot).await?;

        if let Some(profile_id) = slot.profile_id {
            match self.store.find_profile(profile_id).await? {
                Some(mut profile) => {
                    profile.remove_appointment(appointment_id);
                    self.store.save_profile(&profile).await?;
                }
                None => warn!(
                    "Profile {} referenced by cancelled appointment {} not found",
                    profile_id, appointment_id
                ),
            }
        }

        info!("Appointment {} cancelled", appointment_id);
        Ok(slot)
    }

    /// Hard-deletes a slot record and scrubs its references from the owning
    /// profile and doctor documents. Cleanup is tolerant: a missing target
    /// is logged and the remaining removals still run.
    pub async fn delete(&self, appointment_id: Uuid) -> Result<Appointment, SlotError> {
        debug!("Deleting appointment {}", appointment_id);

        let slot = self
            .store
            .find_appointment(appointment_id)
            .await?
            .ok_or(SlotError::NotFound)?;

        if let Some(profile_id) = slot.profile_id {
            match self.store.find_profile(profile_id).await {
                Ok(Some(mut profile)) => {
                    if profile.remove_appointment(appointment_id) {
                        if let Err(err) = self.store.save_profile(&profile).await {
                            warn!(
                                "Failed to scrub appointment {} from profile {}: {}",
                                appointment_id, profile_id, err
                            );
                        }
                    }
                }
                Ok(None) => warn!(
                    "Profile {} referenced by appointment {} not found during delete",
                    profile_id, appointment_id
                ),
                Err(err) => warn!(
                    "Profile lookup failed during delete of appointment {}: {}",
                    appointment_id, err
                ),
            }
        }

        match self.store.find_doctor(slot.doctor_id).await {
            Ok(Some(mut doctor)) => {
                if doctor.remove_slot(appointment_id) {
                    if let Err(err) = self.store.save_doctor(&doctor).await {
                        warn!(
                            "Failed to scrub appointment {} from doctor {}: {}",
                            appointment_id, slot.doctor_id, err
                        );
                    }
                } else {
                    warn!(
                        "No day-bucket of doctor {} references appointment {}",
                        slot.doctor_id, appointment_id
                    );
                }
            }
            Ok(None) => warn!(
                "Doctor {} owning appointment {} not found during delete",
                slot.doctor_id, appointment_id
            ),
            Err(err) => warn!(
                "Doctor lookup failed during delete of appointment {}: {}",
                appointment_id, err
            ),
        }

        self.store.delete_appointment(appointment_id).await?;

        info!("Appointment {} deleted", appointment_id);
        Ok(slot)
    }

    /// Creates a fresh open slot at the retired slot's doctor and time and
    /// appends it to the matching day-bucket. The bucket must exist: it was
    /// created when the retired slot was generated, so a miss here is a
    /// data-integrity fault.
    async fn replace_slot(&self, retired: &Appointment) -> Result<Appointment, SlotError> {
        let replacement = Appointment::open(retired.doctor_id, retired.time_slot);
        self.store.insert_appointment(&replacement).await?;

        let day = retired.calendar_day();
        let mut doctor = self
            .store
            .find_doctor(retired.doctor_id)
            .await?
            .ok_or_else(|| {
                error!(
                    "Doctor {} owning appointment {} does not exist",
                    retired.doctor_id, retired.id
                );
                SlotError::InconsistentState(format!(
                    "doctor {} referenced by appointment {} does not exist",
                    retired.doctor_id, retired.id
                ))
            })?;

        match doctor.appointment_days.get_mut(&day) {
            Some(bucket) => bucket.push(replacement.id),
            None => {
                error!(
                    "Doctor {} has no day-bucket for {} while replacing slot {}",
                    retired.doctor_id, day, retired.id
                );
                return Err(SlotError::InconsistentState(format!(
                    "doctor {} has no day-bucket for {}",
                    retired.doctor_id, day
                )));
            }
        }

        self.store.save_doctor(&doctor).await?;
        Ok(replacement)
    }
}
