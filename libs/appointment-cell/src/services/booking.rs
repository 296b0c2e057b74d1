// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use shared_directory::models::Appointment;
use shared_directory::store::{DirectoryStore, StoreError};

use crate::models::SlotError;

/// Binds patient profiles to open slots. The slot side of the binding is a
/// conditional store update, so two racing bookings of the same slot cannot
/// both win; the profile side is the second half of the dual-document write.
pub struct BookingService {
    store: Arc<dyn DirectoryStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    pub async fn get_slot(&self, appointment_id: Uuid) -> Result<Appointment, SlotError> {
        self.store
            .find_appointment(appointment_id)
            .await?
            .ok_or(SlotError::NotFound)
    }

    /// Books an open slot for a profile and returns the bound slot.
    pub async fn book(
        &self,
        appointment_id: Uuid,
        profile_id: Uuid,
    ) -> Result<Appointment, SlotError> {
        debug!("Booking slot {} for profile {}", appointment_id, profile_id);

        let slot = self.get_slot(appointment_id).await?;
        if slot.cancelled {
            return Err(SlotError::AlreadyCancelled);
        }
        if slot.is_booked() {
            return Err(SlotError::AlreadyBooked);
        }

        let mut profile = self
            .store
            .find_profile(profile_id)
            .await?
            .ok_or_else(|| SlotError::InvalidReference(format!("profile {}", profile_id)))?;

        let bound = self
            .store
            .bind_profile_if_open(appointment_id, profile_id)
            .await
            .map_err(|err| match err {
                StoreError::Conflict(_) => SlotError::AlreadyBooked,
                other => other.into(),
            })?;

        profile.add_appointment(appointment_id);
        self.store.save_profile(&profile).await?;

        info!(
            "Slot {} booked for profile {}",
            appointment_id, profile_id
        );
        Ok(bound)
    }
}
