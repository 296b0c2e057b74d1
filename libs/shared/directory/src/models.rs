use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A doctor document. `appointment_days` groups slot references per calendar
/// date; the map key guarantees at most one bucket per date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub hospital_id: Uuid,
    pub specialization_id: Uuid,
    #[serde(default)]
    pub qualifications: Vec<String>,
    pub practicing_since: i32,
    #[serde(default)]
    pub appointment_days: BTreeMap<NaiveDate, Vec<Uuid>>,
}

impl Doctor {
    pub fn day_bucket(&self, date: NaiveDate) -> Option<&Vec<Uuid>> {
        self.appointment_days.get(&date)
    }

    /// Appends slot ids to the bucket for `date`, creating it when absent.
    pub fn add_slots(&mut self, date: NaiveDate, slot_ids: impl IntoIterator<Item = Uuid>) {
        self.appointment_days.entry(date).or_default().extend(slot_ids);
    }

    /// Removes a slot reference from whichever day-bucket holds it.
    /// Returns false when no bucket references the slot.
    pub fn remove_slot(&mut self, slot_id: Uuid) -> bool {
        for bucket in self.appointment_days.values_mut() {
            if let Some(pos) = bucket.iter().position(|id| *id == slot_id) {
                bucket.remove(pos);
                return true;
            }
        }
        false
    }
}

/// A single bookable appointment slot. A slot with `profile_id` set is
/// booked; `cancelled` is terminal and the slot is never re-bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub time_slot: DateTime<Utc>,
    pub profile_id: Option<Uuid>,
    #[serde(default)]
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// A fresh open slot for a doctor at the given time.
    pub fn open(doctor_id: Uuid, time_slot: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            time_slot,
            profile_id: None,
            cancelled: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.profile_id.is_none() && !self.cancelled
    }

    pub fn is_booked(&self) -> bool {
        self.profile_id.is_some()
    }

    pub fn calendar_day(&self) -> NaiveDate {
        self.time_slot.date_naive()
    }
}

/// A patient profile. `appointments` mirrors the slots bound to this
/// profile; both sides are updated on every booking state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub account_id: Option<Uuid>,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    #[serde(default)]
    pub appointments: Vec<Uuid>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Appends a slot reference unless it is already present.
    pub fn add_appointment(&mut self, slot_id: Uuid) {
        if !self.appointments.contains(&slot_id) {
            self.appointments.push(slot_id);
        }
    }

    /// Removes a slot reference; no-op (false) when absent.
    pub fn remove_appointment(&mut self, slot_id: Uuid) -> bool {
        if let Some(pos) = self.appointments.iter().position(|id| *id == slot_id) {
            self.appointments.remove(pos);
            true
        } else {
            false
        }
    }
}
