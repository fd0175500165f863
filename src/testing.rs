//! In-memory stand-in for the PostgreSQL stores, used by engine and router tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{
    analytics::{
        store::{day_bounds, AnalyticsStore},
        types::{BurnRow, DailyAnalytics, IntakeRow},
    },
    catalog::repo_types::{ExerciseItem, FoodItem},
    recommendations::{
        scoring::UserProfile,
        store::RecommendationStore,
        types::{NewRecommendation, Recommendation},
    },
};

struct MealLine {
    user_id: Uuid,
    date: Date,
    food_item_id: Uuid,
    quantity: i32,
}

struct ExerciseLog {
    user_id: Uuid,
    exercise_item_id: Uuid,
    performed_at: OffsetDateTime,
    duration_mins: i32,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, UserProfile>,
    foods: Vec<FoodItem>,
    exercises: Vec<ExerciseItem>,
    meal_lines: Vec<MealLine>,
    logs: Vec<ExerciseLog>,
    analytics: Vec<DailyAnalytics>,
    recommendations: Vec<Recommendation>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut guard = self.inner.lock().unwrap();
        f(&mut guard)
    }

    pub fn add_user(&self, profile: UserProfile) -> Uuid {
        let id = Uuid::new_v4();
        self.with(|s| s.users.insert(id, profile));
        id
    }

    pub fn add_food(&self, item: FoodItem) -> Uuid {
        let id = item.id;
        self.with(|s| s.foods.push(item));
        id
    }

    pub fn add_exercise(&self, item: ExerciseItem) -> Uuid {
        let id = item.id;
        self.with(|s| s.exercises.push(item));
        id
    }

    /// One meal on `date` with `(food_item_id, quantity)` lines.
    pub fn log_meal(&self, user_id: Uuid, date: Date, items: &[(Uuid, i32)]) {
        self.with(|s| {
            for (food_item_id, quantity) in items {
                s.meal_lines.push(MealLine {
                    user_id,
                    date,
                    food_item_id: *food_item_id,
                    quantity: *quantity,
                });
            }
        });
    }

    pub fn log_exercise(
        &self,
        user_id: Uuid,
        exercise_item_id: Uuid,
        performed_at: OffsetDateTime,
        duration_mins: i32,
    ) {
        self.with(|s| {
            s.logs.push(ExerciseLog {
                user_id,
                exercise_item_id,
                performed_at,
                duration_mins,
            })
        });
    }

    pub fn analytics_rows(&self, user_id: Uuid, date: Date) -> usize {
        self.with(|s| {
            s.analytics
                .iter()
                .filter(|r| r.user_id == user_id && r.date == date)
                .count()
        })
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        self.with(|s| s.recommendations.clone())
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn intake_for_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<IntakeRow>> {
        self.with(|s| {
            s.meal_lines
                .iter()
                .filter(|l| l.user_id == user_id && l.date == date)
                .map(|l| {
                    let food = s
                        .foods
                        .iter()
                        .find(|f| f.id == l.food_item_id)
                        .ok_or_else(|| anyhow::anyhow!("food {} missing", l.food_item_id))?;
                    Ok(IntakeRow {
                        calories: food.calories,
                        quantity: l.quantity,
                    })
                })
                .collect()
        })
    }

    async fn burn_for_day(&self, user_id: Uuid, date: Date) -> anyhow::Result<Vec<BurnRow>> {
        let (from, to) = day_bounds(date);
        self.with(|s| {
            s.logs
                .iter()
                .filter(|l| l.user_id == user_id && l.performed_at >= from && l.performed_at < to)
                .map(|l| {
                    let ex = s
                        .exercises
                        .iter()
                        .find(|e| e.id == l.exercise_item_id)
                        .ok_or_else(|| anyhow::anyhow!("exercise {} missing", l.exercise_item_id))?;
                    Ok(BurnRow {
                        exercise_item_id: ex.id,
                        calories_burnt: ex.calories_burnt,
                        reference_duration: ex.duration_mins,
                        duration_mins: l.duration_mins,
                    })
                })
                .collect()
        })
    }

    async fn upsert_daily(
        &self,
        user_id: Uuid,
        date: Date,
        calories_in: i32,
        calories_out: i32,
        net: i32,
    ) -> anyhow::Result<DailyAnalytics> {
        Ok(self.with(|s| {
            match s
                .analytics
                .iter_mut()
                .find(|r| r.user_id == user_id && r.date == date)
            {
                Some(row) => {
                    row.total_calories_in = calories_in;
                    row.total_calories_out = calories_out;
                    row.net_calories = net;
                    row.clone()
                }
                None => {
                    let row = DailyAnalytics {
                        id: Uuid::new_v4(),
                        user_id,
                        date,
                        total_calories_in: calories_in,
                        total_calories_out: calories_out,
                        net_calories: net,
                    };
                    s.analytics.push(row.clone());
                    row
                }
            }
        }))
    }

    async fn list_daily(
        &self,
        user_id: Uuid,
        start: Option<Date>,
        end: Option<Date>,
    ) -> anyhow::Result<Vec<DailyAnalytics>> {
        let mut rows: Vec<DailyAnalytics> = self.with(|s| {
            s.analytics
                .iter()
                .filter(|r| r.user_id == user_id)
                .filter(|r| start.map_or(true, |d| r.date >= d))
                .filter(|r| end.map_or(true, |d| r.date <= d))
                .cloned()
                .collect()
        });
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }
}

#[async_trait]
impl RecommendationStore for MemoryStore {
    async fn profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        Ok(self.with(|s| s.users.get(&user_id).cloned()))
    }

    async fn food_candidates(&self, user_id: Uuid) -> anyhow::Result<Vec<FoodItem>> {
        Ok(self.with(|s| {
            s.foods
                .iter()
                .filter(|f| f.is_visible_to(user_id))
                .cloned()
                .collect()
        }))
    }

    async fn exercise_candidates(&self, user_id: Uuid) -> anyhow::Result<Vec<ExerciseItem>> {
        Ok(self.with(|s| {
            s.exercises
                .iter()
                .filter(|e| e.is_visible_to(user_id))
                .cloned()
                .collect()
        }))
    }

    async fn recent_food_ids(
        &self,
        user_id: Uuid,
        since: Date,
        until: Date,
    ) -> anyhow::Result<HashSet<Uuid>> {
        Ok(self.with(|s| {
            s.meal_lines
                .iter()
                .filter(|l| l.user_id == user_id && l.date >= since && l.date <= until)
                .map(|l| l.food_item_id)
                .collect()
        }))
    }

    async fn recent_exercise_ids(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> anyhow::Result<HashSet<Uuid>> {
        Ok(self.with(|s| {
            s.logs
                .iter()
                .filter(|l| l.user_id == user_id && l.performed_at >= since && l.performed_at < until)
                .map(|l| l.exercise_item_id)
                .collect()
        }))
    }

    async fn workout_durations(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
        until: OffsetDateTime,
    ) -> anyhow::Result<Vec<i32>> {
        Ok(self.with(|s| {
            s.logs
                .iter()
                .filter(|l| l.user_id == user_id && l.performed_at >= since && l.performed_at < until)
                .map(|l| l.duration_mins)
                .collect()
        }))
    }

    async fn insert_recommendations(
        &self,
        recs: &[NewRecommendation],
    ) -> anyhow::Result<Vec<Recommendation>> {
        let now = OffsetDateTime::now_utc();
        let saved: Vec<Recommendation> = recs
            .iter()
            .map(|r| Recommendation {
                id: Uuid::new_v4(),
                user_id: r.user_id,
                target: r.target,
                date: r.date,
                score: r.score,
                reason: Some(r.reason.clone()),
                created_at: now,
            })
            .collect();
        self.with(|s| s.recommendations.extend(saved.iter().cloned()));
        Ok(saved)
    }

    async fn list_recommendations(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<Recommendation>> {
        Ok(self.with(|s| {
            s.recommendations
                .iter()
                .rev()
                .filter(|r| r.user_id == user_id)
                .take(limit.max(0) as usize)
                .cloned()
                .collect()
        }))
    }
}
