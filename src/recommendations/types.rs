use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::catalog::repo_types::{ExerciseItem, FoodItem};
use crate::recommendations::scoring::MealType;

/// What a recommendation points at. Exactly one catalog table per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "item_id", rename_all = "lowercase")]
pub enum RecommendationTarget {
    Food(Uuid),
    Exercise(Uuid),
}

impl RecommendationTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            RecommendationTarget::Food(_) => "food",
            RecommendationTarget::Exercise(_) => "exercise",
        }
    }

    pub fn food_item_id(&self) -> Option<Uuid> {
        match self {
            RecommendationTarget::Food(id) => Some(*id),
            RecommendationTarget::Exercise(_) => None,
        }
    }

    pub fn exercise_item_id(&self) -> Option<Uuid> {
        match self {
            RecommendationTarget::Exercise(id) => Some(*id),
            RecommendationTarget::Food(_) => None,
        }
    }
}

/// Write-once scorer output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target: RecommendationTarget,
    pub date: Date,
    pub score: f64,
    pub reason: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewRecommendation {
    pub user_id: Uuid,
    pub target: RecommendationTarget,
    pub date: Date,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct RecommendationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub food_item_id: Option<Uuid>,
    pub exercise_item_id: Option<Uuid>,
    pub date: Date,
    pub score: f64,
    pub reason: Option<String>,
    pub created_at: OffsetDateTime,
}

impl TryFrom<RecommendationRow> for Recommendation {
    type Error = anyhow::Error;

    fn try_from(row: RecommendationRow) -> Result<Self, Self::Error> {
        let target = match (row.kind.as_str(), row.food_item_id, row.exercise_item_id) {
            ("food", Some(id), None) => RecommendationTarget::Food(id),
            ("exercise", None, Some(id)) => RecommendationTarget::Exercise(id),
            (kind, _, _) => anyhow::bail!(
                "recommendation {} has inconsistent target columns for kind {:?}",
                row.id,
                kind
            ),
        };
        Ok(Recommendation {
            id: row.id,
            user_id: row.user_id,
            target,
            date: row.date,
            score: row.score,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendedFood {
    pub recommendation: Recommendation,
    pub food: FoodItem,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendedExercise {
    pub recommendation: Recommendation,
    pub exercise: ExerciseItem,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealSuggestion {
    pub meal_type: MealType,
    pub target_calories: f64,
    pub suggestion: Option<RecommendedFood>,
}

/// Output of the daily generation: best food per meal plus a workout shortlist.
#[derive(Debug, Clone, Serialize)]
pub struct DailyPlan {
    pub user_id: Uuid,
    pub date: Date,
    pub daily_calories: f64,
    pub meals: Vec<MealSuggestion>,
    pub exercises: Vec<RecommendedExercise>,
}
