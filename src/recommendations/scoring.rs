//! Heuristic, additive scoring of catalog candidates. Pure functions only;
//! the service layer feeds them history and persists the results.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::auth::repo_types::Gender;
use crate::catalog::repo_types::{Difficulty, ExerciseItem, FoodCategory, FoodItem};
use crate::config::EngineConfig;

pub const MACRO_BALANCE_POINTS: f64 = 30.0;
pub const CALORIE_FIT_POINTS: f64 = 25.0;
pub const FIBER_CAP: f64 = 20.0;
pub const FOOD_NOVELTY_POINTS: f64 = 15.0;
pub const MEAL_AFFINITY_POINTS: f64 = 10.0;

pub const DIFFICULTY_EXACT_POINTS: f64 = 30.0;
pub const DIFFICULTY_ADJACENT_POINTS: f64 = 20.0;
pub const BURN_CAP: f64 = 25.0;
pub const EXERCISE_NOVELTY_POINTS: f64 = 20.0;
pub const NO_EQUIPMENT_POINTS: f64 = 15.0;
pub const MULTI_MUSCLE_POINTS: f64 = 10.0;

/// Fitness tiers always look at this many trailing days, independent of the
/// novelty lookback.
pub const FITNESS_WINDOW_DAYS: i64 = 30;

const PROTEIN_SHARE: (f64, f64) = (0.15, 0.35);
const CALORIE_BAND: (f64, f64) = (0.1, 2.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    /// Share of the daily calorie need.
    pub fn fraction(&self) -> f64 {
        match self {
            MealType::Breakfast => 0.25,
            MealType::Lunch => 0.35,
            MealType::Dinner => 0.30,
            MealType::Snack => 0.10,
        }
    }

    pub fn favored_categories(&self) -> &'static [FoodCategory] {
        use FoodCategory::*;
        match self {
            MealType::Breakfast => &[Grains, Fruits, Dairy],
            MealType::Lunch => &[Proteins, Vegetables, Grains],
            MealType::Dinner => &[Proteins, Vegetables],
            MealType::Snack => &[Fruits, Snacks, Dairy],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => Err(format!("unknown meal type {}", other)),
        }
    }
}

/// Demographics the BMR formula needs; any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfile {
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
}

/// Mifflin–St Jeor.
pub fn bmr(weight_kg: f64, height_cm: f64, age: i32, gender: Option<Gender>) -> f64 {
    let s = match gender {
        Some(Gender::Male) => 5.0,
        Some(Gender::Female) => -161.0,
        // midpoint of the two sexed constants
        Some(Gender::Other) | None => -78.0,
    };
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age) + s
}

/// Daily calorie need; profiles without an age use the configured default.
pub fn daily_calorie_need(profile: &UserProfile, cfg: &EngineConfig) -> f64 {
    match profile.age {
        Some(age) => {
            let weight = profile.weight_kg.unwrap_or(cfg.default_weight_kg);
            let height = profile.height_cm.unwrap_or(cfg.default_height_cm);
            bmr(weight, height, age, profile.gender) * cfg.activity_factor
        }
        None => cfg.default_daily_calories,
    }
}

pub fn meal_target(daily_need: f64, meal_type: MealType) -> f64 {
    daily_need * meal_type.fraction()
}

/// Buckets recent workouts into a tier. `durations` are the logged minutes of
/// every session in the trailing `window_days`.
pub fn fitness_level(durations: &[i32], window_days: i64) -> Difficulty {
    if durations.is_empty() || window_days <= 0 {
        return Difficulty::Beginner;
    }
    let count = durations.len() as f64;
    let avg_duration = durations.iter().map(|d| f64::from(*d)).sum::<f64>() / count;
    let per_week = count / (window_days as f64 / 7.0);

    if avg_duration >= 45.0 && per_week >= 4.0 {
        Difficulty::Advanced
    } else if avg_duration >= 30.0 && per_week >= 3.0 {
        Difficulty::Intermediate
    } else {
        Difficulty::Beginner
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Scored<T> {
    pub item: T,
    pub score: f64,
    pub reason: String,
}

fn reason_text(reasons: &[String]) -> String {
    if reasons.is_empty() {
        "available in your catalog".to_string()
    } else {
        reasons.join(", ")
    }
}

/// Stable: equal scores keep candidate order.
fn rank<T>(scored: &mut [Scored<T>]) {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

fn macro_balanced(food: &FoodItem) -> bool {
    let (Some(p), Some(c), Some(f)) = (food.protein_g, food.carbs_g, food.fat_g) else {
        return false;
    };
    let total = p + c + f;
    if total <= 0.0 {
        return false;
    }
    let share = p / total;
    share >= PROTEIN_SHARE.0 && share <= PROTEIN_SHARE.1
}

pub fn score_food(
    food: &FoodItem,
    meal_type: MealType,
    recent: &HashSet<Uuid>,
    target: f64,
) -> (f64, String) {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    if macro_balanced(food) {
        score += MACRO_BALANCE_POINTS;
        reasons.push("balanced macros".to_string());
    }
    if (f64::from(food.calories) - target).abs() < 0.2 * target {
        score += CALORIE_FIT_POINTS;
        reasons.push(format!("fits your {} calorie target", meal_type));
    }
    let fiber = (food.fiber_g.unwrap_or(0.0).max(0.0) * 2.0).min(FIBER_CAP);
    if fiber > 0.0 {
        score += fiber;
        reasons.push("good source of fiber".to_string());
    }
    if !recent.contains(&food.id) {
        score += FOOD_NOVELTY_POINTS;
        reasons.push("something new".to_string());
    }
    if food
        .category()
        .is_some_and(|c| meal_type.favored_categories().contains(&c))
    {
        score += MEAL_AFFINITY_POINTS;
        reasons.push(format!("suits {}", meal_type));
    }

    (score, reason_text(&reasons))
}

/// Filters candidates to the calorie band around `target`, scores and ranks them.
pub fn score_food_candidates(
    candidates: Vec<FoodItem>,
    meal_type: MealType,
    recent: &HashSet<Uuid>,
    target: f64,
) -> Vec<Scored<FoodItem>> {
    let (lo, hi) = (CALORIE_BAND.0 * target, CALORIE_BAND.1 * target);
    let mut scored: Vec<Scored<FoodItem>> = candidates
        .into_iter()
        .filter(|f| {
            let cal = f64::from(f.calories);
            cal >= lo && cal <= hi
        })
        .map(|item| {
            let (score, reason) = score_food(&item, meal_type, recent, target);
            Scored {
                item,
                score,
                reason,
            }
        })
        .collect();
    rank(&mut scored);
    scored
}

/// `None` when the catalog row cannot be scored (non-positive reference duration).
pub fn score_exercise(
    exercise: &ExerciseItem,
    level: Difficulty,
    recent: &HashSet<Uuid>,
) -> Option<(f64, String)> {
    let per_minute = exercise.calories_per_minute().ok()?;
    let mut score = 0.0;
    let mut reasons = Vec::new();

    match exercise.difficulty() {
        Some(d) if d == level => {
            score += DIFFICULTY_EXACT_POINTS;
            reasons.push(format!("matches your {} level", level));
        }
        Some(d) if d.is_adjacent(level) => {
            score += DIFFICULTY_ADJACENT_POINTS;
            reasons.push(format!("close to your {} level", level));
        }
        _ => {}
    }
    let burn = (per_minute * 2.0).clamp(0.0, BURN_CAP);
    if burn > 0.0 {
        score += burn;
        reasons.push("good calorie burn".to_string());
    }
    if !recent.contains(&exercise.id) {
        score += EXERCISE_NOVELTY_POINTS;
        reasons.push("something new".to_string());
    }
    if !exercise.requires_equipment {
        score += NO_EQUIPMENT_POINTS;
        reasons.push("no equipment needed".to_string());
    }
    if exercise.muscle_groups.len() > 1 {
        score += MULTI_MUSCLE_POINTS;
        reasons.push("works several muscle groups".to_string());
    }

    Some((score, reason_text(&reasons)))
}

pub fn score_exercise_candidates(
    candidates: Vec<ExerciseItem>,
    level: Difficulty,
    recent: &HashSet<Uuid>,
) -> Vec<Scored<ExerciseItem>> {
    let mut scored: Vec<Scored<ExerciseItem>> = candidates
        .into_iter()
        .filter_map(|item| match score_exercise(&item, level, recent) {
            Some((score, reason)) => Some(Scored {
                item,
                score,
                reason,
            }),
            None => {
                warn!(
                    exercise_item_id = %item.id,
                    duration_mins = item.duration_mins,
                    "skipping exercise with invalid reference duration"
                );
                None
            }
        })
        .collect();
    rank(&mut scored);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::repo_types::fixtures::{exercise, food};

    fn macro_food(name: &str, calories: i32, p: f64, c: f64, f: f64) -> FoodItem {
        let mut item = food(name, calories);
        item.protein_g = Some(p);
        item.carbs_g = Some(c);
        item.fat_g = Some(f);
        item
    }

    #[test]
    fn bmr_matches_mifflin_st_jeor() {
        // 10*80 + 6.25*180 - 5*30 + 5
        assert_eq!(bmr(80.0, 180.0, 30, Some(Gender::Male)), 1780.0);
        // 10*60 + 6.25*165 - 5*25 - 161
        assert_eq!(bmr(60.0, 165.0, 25, Some(Gender::Female)), 1345.25);
        assert_eq!(bmr(70.0, 170.0, 40, None), 1484.5);
    }

    #[test]
    fn profile_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(daily_calorie_need(&UserProfile::default(), &cfg), 2000.0);

        let aged = UserProfile {
            age: Some(40),
            ..Default::default()
        };
        // defaults 70 kg / 170 cm, unknown gender, activity 1.2
        let expected = 1484.5 * 1.2;
        assert!((daily_calorie_need(&aged, &cfg) - expected).abs() < 1e-9);
    }

    #[test]
    fn meal_fractions_sum_to_one() {
        let total: f64 = MealType::ALL.iter().map(|m| m.fraction()).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(meal_target(2000.0, MealType::Lunch), 700.0);
    }

    #[test]
    fn food_points_add_up() {
        let mut oats = macro_food("Oats", 500, 20.0, 60.0, 20.0);
        oats.fiber_g = Some(4.0);
        oats.category = Some("grains".into());
        let (score, reason) = score_food(&oats, MealType::Breakfast, &HashSet::new(), 500.0);
        // macros 30 + fit 25 + fiber 8 + novelty 15 + affinity 10
        assert_eq!(score, 88.0);
        assert!(reason.contains("balanced macros"));
        assert!(reason.contains("suits breakfast"));
    }

    #[test]
    fn fiber_bonus_is_capped_and_history_removes_novelty() {
        let mut bran = food("Bran", 100);
        bran.fiber_g = Some(50.0);
        let recent: HashSet<Uuid> = [bran.id].into_iter().collect();
        let (score, _) = score_food(&bran, MealType::Dinner, &recent, 1000.0);
        assert_eq!(score, FIBER_CAP);
    }

    #[test]
    fn protein_share_outside_band_gets_no_macro_bonus() {
        let steak = macro_food("Steak", 500, 60.0, 0.0, 20.0);
        assert!(!macro_balanced(&steak));
        let partial = {
            let mut f = food("Partial", 500);
            f.protein_g = Some(20.0);
            f
        };
        assert!(!macro_balanced(&partial));
    }

    #[test]
    fn calorie_band_prefilters_candidates() {
        let tiny = food("Mint", 5);
        let huge = food("Feast", 5000);
        let ok = food("Sandwich", 450);
        let ranked = score_food_candidates(
            vec![tiny, huge, ok.clone()],
            MealType::Lunch,
            &HashSet::new(),
            700.0,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].item.id, ok.id);
    }

    #[test]
    fn empty_pool_returns_empty_list() {
        assert!(score_food_candidates(vec![], MealType::Snack, &HashSet::new(), 200.0).is_empty());
        assert!(score_exercise_candidates(vec![], Difficulty::Beginner, &HashSet::new()).is_empty());
    }

    #[test]
    fn ties_keep_catalog_order_and_ranking_is_deterministic() {
        let a = food("A", 300);
        let b = food("B", 300);
        let c = food("C", 300);
        let mut best = food("Best", 300);
        best.fiber_g = Some(3.0);
        let candidates = vec![a.clone(), b.clone(), best.clone(), c.clone()];

        let first = score_food_candidates(candidates.clone(), MealType::Snack, &HashSet::new(), 300.0);
        let ids: Vec<Uuid> = first.iter().map(|s| s.item.id).collect();
        assert_eq!(ids, vec![best.id, a.id, b.id, c.id]);

        for _ in 0..5 {
            let again = score_food_candidates(candidates.clone(), MealType::Snack, &HashSet::new(), 300.0);
            let again_ids: Vec<Uuid> = again.iter().map(|s| s.item.id).collect();
            assert_eq!(again_ids, ids);
        }
    }

    #[test]
    fn exercise_points_add_up() {
        let mut burpees = exercise("Burpees", 10, 150);
        burpees.difficulty = Some("intermediate".into());
        burpees.muscle_groups = vec!["legs".into(), "chest".into()];
        // exact 30 + burn min(15*2, 25) + novelty 20 + no equipment 15 + multi 10
        let (score, _) =
            score_exercise(&burpees, Difficulty::Intermediate, &HashSet::new()).unwrap();
        assert_eq!(score, 100.0);

        let (adjacent, _) =
            score_exercise(&burpees, Difficulty::Advanced, &HashSet::new()).unwrap();
        assert_eq!(adjacent, 90.0);

        burpees.difficulty = Some("advanced".into());
        let (far, _) = score_exercise(&burpees, Difficulty::Beginner, &HashSet::new()).unwrap();
        assert_eq!(far, 70.0);
    }

    #[test]
    fn zero_duration_exercise_is_skipped() {
        let broken = exercise("Broken", 0, 100);
        let walk = exercise("Walk", 30, 120);
        let ranked = score_exercise_candidates(
            vec![broken, walk.clone()],
            Difficulty::Beginner,
            &HashSet::new(),
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].item.id, walk.id);
    }

    #[test]
    fn fitness_tiers() {
        assert_eq!(fitness_level(&[], 30), Difficulty::Beginner);
        // 18 sessions of 50 min over 30 days = 4.2/week
        assert_eq!(fitness_level(&[50; 18], 30), Difficulty::Advanced);
        // 13 sessions of 35 min = 3.03/week
        assert_eq!(fitness_level(&[35; 13], 30), Difficulty::Intermediate);
        // long but rare sessions
        assert_eq!(fitness_level(&[90; 4], 30), Difficulty::Beginner);
    }

    #[test]
    fn meal_type_parsing() {
        assert_eq!("Dinner".parse::<MealType>(), Ok(MealType::Dinner));
        assert!("brunch".parse::<MealType>().is_err());
    }
}
