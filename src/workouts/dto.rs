use serde::Deserialize;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::analytics::store::day_bounds;

#[derive(Debug, Clone, Deserialize)]
pub struct LogWorkoutRequest {
    pub exercise_item_id: Uuid,
    /// Defaults to now.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub performed_at: Option<OffsetDateTime>,
    /// Defaults to the exercise's reference duration.
    pub duration_mins: Option<i32>,
}

impl LogWorkoutRequest {
    pub fn validate(&self) -> Result<(), String> {
        match self.duration_mins {
            Some(d) if d < 0 => Err("duration_mins must not be negative".into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkoutListQuery {
    pub start: Option<Date>,
    pub end: Option<Date>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl WorkoutListQuery {
    /// `[start of start, end of end)` in UTC; either side may be open.
    pub fn bounds(&self) -> Result<(Option<OffsetDateTime>, Option<OffsetDateTime>), String> {
        if let (Some(s), Some(e)) = (self.start, self.end) {
            if s > e {
                return Err("start must not be after end".into());
            }
        }
        Ok((
            self.start.map(|d| day_bounds(d).0),
            self.end.map(|d| day_bounds(d).1),
        ))
    }

    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn negative_duration_is_rejected_zero_is_fine() {
        let mut req: LogWorkoutRequest = serde_json::from_str(&format!(
            r#"{{"exercise_item_id":"{}","performed_at":"2024-01-01T07:30:00Z","duration_mins":-1}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert_eq!(req.performed_at, Some(datetime!(2024-01-01 7:30 UTC)));
        assert!(req.validate().is_err());
        req.duration_mins = Some(0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn bounds_cover_whole_days() {
        let q = WorkoutListQuery {
            start: Some(date!(2024 - 01 - 01)),
            end: Some(date!(2024 - 01 - 03)),
            ..Default::default()
        };
        let (from, to) = q.bounds().unwrap();
        assert_eq!(from, Some(datetime!(2024-01-01 0:00 UTC)));
        assert_eq!(to, Some(datetime!(2024-01-04 0:00 UTC)));

        let backwards = WorkoutListQuery {
            start: Some(date!(2024 - 01 - 03)),
            end: Some(date!(2024 - 01 - 01)),
            ..Default::default()
        };
        assert!(backwards.bounds().is_err());
        assert_eq!(WorkoutListQuery::default().bounds().unwrap(), (None, None));
    }
}
