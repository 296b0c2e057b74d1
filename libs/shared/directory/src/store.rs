use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{Appointment, Doctor, Profile};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conditional update failed: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Persistence boundary for the appointment engine. Doctor, Appointment and
/// Profile are independently persisted documents; callers are responsible
/// for keeping the cross-document references consistent.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError>;
    async fn save_doctor(&self, doctor: &Doctor) -> Result<(), StoreError>;

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;
    async fn find_appointments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Appointment>, StoreError>;
    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;
    async fn save_appointment(&self, appointment: &Appointment) -> Result<(), StoreError>;
    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError>;

    /// Conditionally binds a profile to a slot: succeeds only while the slot
    /// is still unbound and not cancelled, otherwise fails with `Conflict`.
    /// The check and the write are a single atomic step, so two concurrent
    /// bookings of the same slot cannot both succeed.
    async fn bind_profile_if_open(
        &self,
        appointment_id: Uuid,
        profile_id: Uuid,
    ) -> Result<Appointment, StoreError>;

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;
    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError>;
}

/// Shared application state handed to routers and handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DirectoryStore>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn DirectoryStore>) -> Self {
        Self { config, store }
    }
}
