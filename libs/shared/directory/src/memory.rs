use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Appointment, Doctor, Profile};
use crate::store::{DirectoryStore, StoreError};

#[derive(Default)]
struct Tables {
    doctors: HashMap<Uuid, Doctor>,
    appointments: HashMap<Uuid, Appointment>,
    profiles: HashMap<Uuid, Profile>,
}

/// In-memory directory store. Backs the test suite and local development
/// when no database is configured.
#[derive(Default)]
pub struct MemoryDirectoryStore {
    tables: RwLock<Tables>,
}

impl MemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_doctor(&self, doctor: Doctor) {
        self.tables.write().await.doctors.insert(doctor.id, doctor);
    }

    pub async fn insert_profile(&self, profile: Profile) {
        self.tables.write().await.profiles.insert(profile.id, profile);
    }

    pub async fn appointment_count(&self) -> usize {
        self.tables.read().await.appointments.len()
    }
}

#[async_trait]
impl DirectoryStore for MemoryDirectoryStore {
    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError> {
        Ok(self.tables.read().await.doctors.get(&id).cloned())
    }

    async fn save_doctor(&self, doctor: &Doctor) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .doctors
            .insert(doctor.id, doctor.clone());
        Ok(())
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn find_appointments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.read().await;
        let mut slots: Vec<Appointment> = ids
            .iter()
            .filter_map(|id| tables.appointments.get(id).cloned())
            .collect();
        slots.sort_by_key(|slot| slot.time_slot);
        Ok(slots)
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn save_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .appointments
            .insert(appointment.id, appointment.clone());
        Ok(())
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError> {
        self.tables.write().await.appointments.remove(&id);
        Ok(())
    }

    async fn bind_profile_if_open(
        &self,
        appointment_id: Uuid,
        profile_id: Uuid,
    ) -> Result<Appointment, StoreError> {
        // Check and write happen under one write lock, matching the
        // conditional-update semantics of the PostgREST implementation.
        let mut tables = self.tables.write().await;

        let slot = tables
            .appointments
            .get_mut(&appointment_id)
            .ok_or(StoreError::NotFound("appointment"))?;

        if !slot.is_open() {
            return Err(StoreError::Conflict(format!(
                "appointment {} is no longer open",
                appointment_id
            )));
        }

        slot.profile_id = Some(profile_id);
        slot.updated_at = Utc::now();
        Ok(slot.clone())
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.id, profile.clone());
        Ok(())
    }
}
