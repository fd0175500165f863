use std::sync::Arc;

use time::{Date, Duration, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    analytics::store::day_bounds,
    catalog::repo_types::{ExerciseItem, FoodItem},
    config::EngineConfig,
    error::{AppError, AppResult},
    recommendations::{
        scoring::{
            daily_calorie_need, fitness_level, meal_target, score_exercise_candidates,
            score_food_candidates, MealType, Scored, UserProfile, FITNESS_WINDOW_DAYS,
        },
        store::RecommendationStore,
        types::{
            DailyPlan, MealSuggestion, NewRecommendation, Recommendation, RecommendationTarget,
            RecommendedExercise, RecommendedFood,
        },
    },
};

fn trailing(date: Date, days: i64) -> (Date, Date) {
    (date - Duration::days(days.max(1) - 1), date)
}

/// Scores catalog candidates against the caller's history and persists the winners.
pub struct RecommendationService {
    store: Arc<dyn RecommendationStore>,
    config: EngineConfig,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn RecommendationStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    async fn profile(&self, user_id: Uuid) -> AppResult<UserProfile> {
        self.store
            .profile(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    fn limit_or_default(&self, limit: Option<usize>) -> usize {
        limit.unwrap_or(self.config.recommendation_limit).max(1)
    }

    /// Trailing lookback window ending with `date` (inclusive).
    fn window(&self, date: Date) -> (Date, Date) {
        trailing(date, self.config.lookback_days)
    }

    async fn ranked_foods(
        &self,
        user_id: Uuid,
        meal_type: MealType,
        target: f64,
        date: Date,
    ) -> AppResult<Vec<Scored<FoodItem>>> {
        let (since, until) = self.window(date);
        let recent = self.store.recent_food_ids(user_id, since, until).await?;
        let candidates = self.store.food_candidates(user_id).await?;
        Ok(score_food_candidates(candidates, meal_type, &recent, target))
    }

    async fn ranked_exercises(
        &self,
        user_id: Uuid,
        date: Date,
    ) -> AppResult<Vec<Scored<ExerciseItem>>> {
        let (since, until) = trailing(date, FITNESS_WINDOW_DAYS);
        let durations = self
            .store
            .workout_durations(user_id, day_bounds(since).0, day_bounds(until).1)
            .await?;
        let level = fitness_level(&durations, FITNESS_WINDOW_DAYS);

        let (since, until) = self.window(date);
        let (from, _) = day_bounds(since);
        let (_, to) = day_bounds(until);
        let recent = self.store.recent_exercise_ids(user_id, from, to).await?;
        let candidates = self.store.exercise_candidates(user_id).await?;
        Ok(score_exercise_candidates(candidates, level, &recent))
    }

    fn food_rec(user_id: Uuid, date: Date, s: &Scored<FoodItem>) -> NewRecommendation {
        NewRecommendation {
            user_id,
            target: RecommendationTarget::Food(s.item.id),
            date,
            score: s.score,
            reason: s.reason.clone(),
        }
    }

    fn exercise_rec(user_id: Uuid, date: Date, s: &Scored<ExerciseItem>) -> NewRecommendation {
        NewRecommendation {
            user_id,
            target: RecommendationTarget::Exercise(s.item.id),
            date,
            score: s.score,
            reason: s.reason.clone(),
        }
    }

    pub async fn recommend_foods(
        &self,
        user_id: Uuid,
        meal_type: MealType,
        limit: Option<usize>,
    ) -> AppResult<Vec<RecommendedFood>> {
        self.recommend_foods_on(user_id, meal_type, limit, OffsetDateTime::now_utc().date())
            .await
    }

    #[instrument(skip(self))]
    pub async fn recommend_foods_on(
        &self,
        user_id: Uuid,
        meal_type: MealType,
        limit: Option<usize>,
        date: Date,
    ) -> AppResult<Vec<RecommendedFood>> {
        let profile = self.profile(user_id).await?;
        let target = meal_target(daily_calorie_need(&profile, &self.config), meal_type);

        let top: Vec<Scored<FoodItem>> = self
            .ranked_foods(user_id, meal_type, target, date)
            .await?
            .into_iter()
            .take(self.limit_or_default(limit))
            .collect();
        if top.is_empty() {
            return Ok(Vec::new());
        }

        let new: Vec<NewRecommendation> =
            top.iter().map(|s| Self::food_rec(user_id, date, s)).collect();
        let saved = self.store.insert_recommendations(&new).await?;
        info!(user_id = %user_id, %meal_type, count = saved.len(), target, "food recommendations stored");

        Ok(saved
            .into_iter()
            .zip(top)
            .map(|(recommendation, s)| RecommendedFood {
                recommendation,
                food: s.item,
            })
            .collect())
    }

    pub async fn recommend_exercises(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
    ) -> AppResult<Vec<RecommendedExercise>> {
        self.recommend_exercises_on(user_id, limit, OffsetDateTime::now_utc().date())
            .await
    }

    #[instrument(skip(self))]
    pub async fn recommend_exercises_on(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
        date: Date,
    ) -> AppResult<Vec<RecommendedExercise>> {
        // Unknown users are rejected before any scoring.
        self.profile(user_id).await?;

        let top: Vec<Scored<ExerciseItem>> = self
            .ranked_exercises(user_id, date)
            .await?
            .into_iter()
            .take(self.limit_or_default(limit))
            .collect();
        if top.is_empty() {
            return Ok(Vec::new());
        }

        let new: Vec<NewRecommendation> = top
            .iter()
            .map(|s| Self::exercise_rec(user_id, date, s))
            .collect();
        let saved = self.store.insert_recommendations(&new).await?;
        info!(user_id = %user_id, count = saved.len(), "exercise recommendations stored");

        Ok(saved
            .into_iter()
            .zip(top)
            .map(|(recommendation, s)| RecommendedExercise {
                recommendation,
                exercise: s.item,
            })
            .collect())
    }

    /// Best food for every meal type plus the configured number of exercises,
    /// stored in one batch.
    #[instrument(skip(self))]
    pub async fn generate_daily(&self, user_id: Uuid, date: Date) -> AppResult<DailyPlan> {
        let profile = self.profile(user_id).await?;
        let daily = daily_calorie_need(&profile, &self.config);

        let mut picks: Vec<(MealType, f64, Option<Scored<FoodItem>>)> = Vec::new();
        for meal_type in MealType::ALL {
            let target = meal_target(daily, meal_type);
            let best = self
                .ranked_foods(user_id, meal_type, target, date)
                .await?
                .into_iter()
                .next();
            picks.push((meal_type, target, best));
        }
        let exercises: Vec<Scored<ExerciseItem>> = self
            .ranked_exercises(user_id, date)
            .await?
            .into_iter()
            .take(self.config.recommendation_limit)
            .collect();

        let mut new: Vec<NewRecommendation> = picks
            .iter()
            .filter_map(|(_, _, best)| best.as_ref())
            .map(|s| Self::food_rec(user_id, date, s))
            .collect();
        new.extend(exercises.iter().map(|s| Self::exercise_rec(user_id, date, s)));

        let saved = if new.is_empty() {
            Vec::new()
        } else {
            self.store.insert_recommendations(&new).await?
        };
        let mut saved = saved.into_iter();

        // `saved` is in insertion order: foods first (meals with a pick), then exercises.
        let mut meals = Vec::with_capacity(picks.len());
        for (meal_type, target, best) in picks {
            let suggestion = match best {
                Some(s) => saved.next().map(|recommendation| RecommendedFood {
                    recommendation,
                    food: s.item,
                }),
                None => None,
            };
            meals.push(MealSuggestion {
                meal_type,
                target_calories: target,
                suggestion,
            });
        }
        let exercises = saved
            .zip(exercises)
            .map(|(recommendation, s)| RecommendedExercise {
                recommendation,
                exercise: s.item,
            })
            .collect();

        info!(user_id = %user_id, %date, daily_calories = daily, "daily plan generated");
        Ok(DailyPlan {
            user_id,
            date,
            daily_calories: daily,
            meals,
            exercises,
        })
    }

    pub async fn list(&self, user_id: Uuid, limit: Option<usize>) -> AppResult<Vec<Recommendation>> {
        let limit = limit.unwrap_or(50).clamp(1, 500) as i64;
        Ok(self.store.list_recommendations(user_id, limit).await?)
    }
}
