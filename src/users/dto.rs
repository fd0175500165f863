use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{Gender, Role, User};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

impl From<User> for ProfileResponse {
    fn from(u: User) -> Self {
        Self {
            role: u.role(),
            gender: u.gender(),
            id: u.id,
            name: u.name,
            email: u.email,
            age: u.age,
            weight_kg: u.weight_kg,
            height_cm: u.height_cm,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("name must not be empty".into());
            }
        }
        if let Some(age) = self.age {
            if !(1..=130).contains(&age) {
                return Err("age must be between 1 and 130".into());
            }
        }
        if let Some(w) = self.weight_kg {
            if !(w > 0.0 && w < 700.0) {
                return Err("weight_kg is out of range".into());
            }
        }
        if let Some(h) = self.height_cm {
            if !(h > 0.0 && h < 300.0) {
                return Err("height_cm is out of range".into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_profile_ranges() {
        assert!(UpdateProfileRequest::default().validate().is_ok());
        let ok = UpdateProfileRequest {
            age: Some(34),
            weight_kg: Some(72.5),
            height_cm: Some(178.0),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad_age = UpdateProfileRequest {
            age: Some(0),
            ..Default::default()
        };
        assert!(bad_age.validate().is_err());

        let blank_name = UpdateProfileRequest {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert!(blank_name.validate().is_err());
    }

    #[test]
    fn gender_deserializes_from_code() {
        let req: UpdateProfileRequest = serde_json::from_str(r#"{"gender":"F"}"#).unwrap();
        assert_eq!(req.gender, Some(Gender::Female));
    }
}
