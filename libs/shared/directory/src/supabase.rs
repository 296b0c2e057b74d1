use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{Appointment, Doctor, Profile};
use crate::store::{DirectoryStore, StoreError};

/// PostgREST-backed directory store. All documents live in the `doctors`,
/// `appointments` and `profiles` tables; `appointment_days` is a jsonb
/// column on the doctor row.
pub struct SupabaseDirectoryStore {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseDirectoryStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn headers(&self, returning: bool) -> Result<HeaderMap, StoreError> {
        let mut headers = HeaderMap::new();

        let key = HeaderValue::from_str(&self.anon_key)
            .map_err(|e| StoreError::Database(format!("Invalid api key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.anon_key))
            .map_err(|e| StoreError::Database(format!("Invalid api key: {}", e)))?;

        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if returning {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }

        Ok(headers)
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        returning: bool,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.headers(returning)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req
            .send()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unreadable response body".to_string());
            error!("API error ({}): {}", status, error_text);
            return Err(StoreError::Database(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn find_one<T>(&self, path: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.request(Method::GET, path, None, false).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl DirectoryStore for SupabaseDirectoryStore {
    async fn find_doctor(&self, id: Uuid) -> Result<Option<Doctor>, StoreError> {
        self.find_one(&format!("/rest/v1/doctors?id=eq.{}", id)).await
    }

    async fn save_doctor(&self, doctor: &Doctor) -> Result<(), StoreError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor.id);
        let body = serde_json::to_value(doctor)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let _: Vec<Value> = self.request(Method::PATCH, &path, Some(body), true).await?;
        Ok(())
    }

    async fn find_appointment(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        self.find_one(&format!("/rest/v1/appointments?id=eq.{}", id))
            .await
    }

    async fn find_appointments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Appointment>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let id_list = ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/appointments?id=in.({})&order=time_slot.asc",
            id_list
        );
        self.request(Method::GET, &path, None, false).await
    }

    async fn insert_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let body = serde_json::to_value(appointment)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let _: Vec<Value> = self
            .request(Method::POST, "/rest/v1/appointments", Some(body), true)
            .await?;
        Ok(())
    }

    async fn save_appointment(&self, appointment: &Appointment) -> Result<(), StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let body = serde_json::to_value(appointment)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let _: Vec<Value> = self.request(Method::PATCH, &path, Some(body), true).await?;
        Ok(())
    }

    async fn delete_appointment(&self, id: Uuid) -> Result<(), StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let _: Vec<Value> = self.request(Method::DELETE, &path, None, true).await?;
        Ok(())
    }

    async fn bind_profile_if_open(
        &self,
        appointment_id: Uuid,
        profile_id: Uuid,
    ) -> Result<Appointment, StoreError> {
        // The row filter is the compare-and-set: the update only matches while
        // the slot is unbound and not cancelled, so a lost booking comes back
        // as an empty representation instead of overwriting the winner.
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&profile_id=is.null&cancelled=is.false",
            appointment_id
        );
        let body = json!({
            "profile_id": profile_id,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let updated: Vec<Appointment> = self.request(Method::PATCH, &path, Some(body), true).await?;

        updated.into_iter().next().ok_or_else(|| {
            StoreError::Conflict(format!(
                "appointment {} is no longer open",
                appointment_id
            ))
        })
    }

    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        self.find_one(&format!("/rest/v1/profiles?id=eq.{}", id)).await
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        let path = format!("/rest/v1/profiles?id=eq.{}", profile.id);
        let body = serde_json::to_value(profile)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let _: Vec<Value> = self.request(Method::PATCH, &path, Some(body), true).await?;
        Ok(())
    }
}
