use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, not exposed in JSON
    pub role: String,                 // "user" | "admin"
    pub age: Option<i32>,
    pub gender: Option<String>,       // "M" | "F" | "O"
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::User)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender.as_deref().and_then(|g| g.parse().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O")]
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "O",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" | "m" | "male" => Ok(Gender::Male),
            "F" | "f" | "female" => Ok(Gender::Female),
            "O" | "o" | "other" => Ok(Gender::Other),
            other => Err(format!("unknown gender {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_parses_codes_and_words() {
        assert_eq!("M".parse::<Gender>(), Ok(Gender::Male));
        assert_eq!("female".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!("O".parse::<Gender>(), Ok(Gender::Other));
        assert!("x".parse::<Gender>().is_err());
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"F\"");
    }

    #[test]
    fn role_parsing() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("root".parse::<Role>().is_err());
    }
}
