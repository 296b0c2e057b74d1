use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tiers, ordered: a higher tier can do everything a lower one can.
/// Derived `Ord` follows declaration order, so `User < Hospital < Admin`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Hospital,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub hospital_id: Option<Uuid>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Role,
    /// Set for hospital-tier accounts; scopes their doctor administration.
    pub hospital_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn account_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.id).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_tiers_are_ordered() {
        assert!(Role::User < Role::Hospital);
        assert!(Role::Hospital < Role::Admin);
        assert!(Role::Admin >= Role::Hospital);
    }

    #[test]
    fn role_deserializes_from_snake_case() {
        let role: Role = serde_json::from_str("\"hospital\"").unwrap();
        assert_eq!(role, Role::Hospital);
    }
}
