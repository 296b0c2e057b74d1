// libs/appointment-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_directory::store::StoreError;

// ==============================================================================
// REQUEST/QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotsRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub profile_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleSlotRequest {
    pub new_appointment_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SlotQueryParams {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

// ==============================================================================
// ENGINE ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Appointment slot is already booked")]
    AlreadyBooked,

    #[error("Appointment slot is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot reschedule an appointment to a different doctor")]
    CrossDoctorReschedule,

    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<StoreError> for SlotError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => SlotError::NotFound,
            StoreError::Conflict(_) => SlotError::AlreadyBooked,
            StoreError::Database(msg) => SlotError::Database(msg),
        }
    }
}
