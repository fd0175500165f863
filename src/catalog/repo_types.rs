use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Catalog food. `calories` is kcal for one portion; meal items multiply it by quantity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FoodItem {
    pub id: Uuid,
    pub name: String,
    pub calories: i32,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub fiber_g: Option<f64>,
    pub category: Option<String>,
    pub is_predefined: bool,
    pub user_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl FoodItem {
    pub fn category(&self) -> Option<FoodCategory> {
        self.category.as_deref().and_then(|c| c.parse().ok())
    }

    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.is_predefined || self.user_id == Some(user_id)
    }
}

/// Catalog exercise. `calories_burnt` is measured over `duration_mins`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExerciseItem {
    pub id: Uuid,
    pub name: String,
    pub duration_mins: i32,
    pub calories_burnt: i32,
    pub difficulty: Option<String>,
    pub requires_equipment: bool,
    pub muscle_groups: Vec<String>,
    pub is_predefined: bool,
    pub user_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl ExerciseItem {
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty.as_deref().and_then(|d| d.parse().ok())
    }

    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.is_predefined || self.user_id == Some(user_id)
    }

    /// Fails with `InvalidCatalogData` when the reference duration cannot scale.
    pub fn calories_per_minute(&self) -> AppResult<f64> {
        per_minute(self.id, self.calories_burnt, self.duration_mins)
    }
}

pub(crate) fn per_minute(id: Uuid, calories_burnt: i32, duration_mins: i32) -> AppResult<f64> {
    if duration_mins <= 0 {
        return Err(AppError::InvalidCatalogData {
            exercise_item_id: id,
            duration_mins,
        });
    }
    Ok(f64::from(calories_burnt) / f64::from(duration_mins))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodCategory {
    Grains,
    Fruits,
    Vegetables,
    Proteins,
    Dairy,
    Fats,
    Snacks,
    Beverages,
    Other,
}

impl FoodCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FoodCategory::Grains => "grains",
            FoodCategory::Fruits => "fruits",
            FoodCategory::Vegetables => "vegetables",
            FoodCategory::Proteins => "proteins",
            FoodCategory::Dairy => "dairy",
            FoodCategory::Fats => "fats",
            FoodCategory::Snacks => "snacks",
            FoodCategory::Beverages => "beverages",
            FoodCategory::Other => "other",
        }
    }
}

impl fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FoodCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "grains" => FoodCategory::Grains,
            "fruits" => FoodCategory::Fruits,
            "vegetables" => FoodCategory::Vegetables,
            "proteins" => FoodCategory::Proteins,
            "dairy" => FoodCategory::Dairy,
            "fats" => FoodCategory::Fats,
            "snacks" => FoodCategory::Snacks,
            "beverages" => FoodCategory::Beverages,
            "other" => FoodCategory::Other,
            other => return Err(format!("unknown food category {}", other)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    fn rank(&self) -> i32 {
        match self {
            Difficulty::Beginner => 0,
            Difficulty::Intermediate => 1,
            Difficulty::Advanced => 2,
        }
    }

    /// One tier apart, e.g. beginner and intermediate.
    pub fn is_adjacent(&self, other: Difficulty) -> bool {
        (self.rank() - other.rank()).abs() == 1
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(format!("unknown difficulty {}", other)),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn food(name: &str, calories: i32) -> FoodItem {
        FoodItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            calories,
            protein_g: None,
            carbs_g: None,
            fat_g: None,
            fiber_g: None,
            category: None,
            is_predefined: true,
            user_id: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn exercise(name: &str, duration_mins: i32, calories_burnt: i32) -> ExerciseItem {
        ExerciseItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            duration_mins,
            calories_burnt,
            difficulty: None,
            requires_equipment: false,
            muscle_groups: Vec::new(),
            is_predefined: true,
            user_id: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
