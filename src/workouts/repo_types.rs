use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::repo_types::per_minute;

/// A logged session joined with its catalog exercise.
#[derive(Debug, Clone, FromRow)]
pub struct WorkoutRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exercise_item_id: Uuid,
    pub name: String,
    pub performed_at: OffsetDateTime,
    pub duration_mins: i32,
    pub calories_burnt: i32,
    pub reference_duration: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Workout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exercise_item_id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub performed_at: OffsetDateTime,
    pub duration_mins: i32,
    /// `None` when the catalog entry has no usable reference duration.
    pub estimated_calories: Option<i32>,
}

impl From<WorkoutRow> for Workout {
    fn from(r: WorkoutRow) -> Self {
        let estimated_calories = per_minute(r.exercise_item_id, r.calories_burnt, r.reference_duration)
            .ok()
            .map(|pm| (pm * f64::from(r.duration_mins)) as i32);
        Self {
            id: r.id,
            user_id: r.user_id,
            exercise_item_id: r.exercise_item_id,
            name: r.name,
            performed_at: r.performed_at,
            duration_mins: r.duration_mins,
            estimated_calories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(reference_duration: i32, duration_mins: i32) -> WorkoutRow {
        WorkoutRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            exercise_item_id: Uuid::new_v4(),
            name: "Running".into(),
            performed_at: OffsetDateTime::now_utc(),
            duration_mins,
            calories_burnt: 300,
            reference_duration,
        }
    }

    #[test]
    fn estimate_scales_from_reference_duration() {
        assert_eq!(Workout::from(row(30, 15)).estimated_calories, Some(150));
        assert_eq!(Workout::from(row(30, 0)).estimated_calories, Some(0));
    }

    #[test]
    fn corrupt_reference_duration_has_no_estimate() {
        assert_eq!(Workout::from(row(0, 15)).estimated_calories, None);
    }
}
