use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_date: Date,
    pub meal_time: Time,
    pub created_at: OffsetDateTime,
}

/// A meal item joined with the catalog entry it points at.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MealItemLine {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub food_item_id: Uuid,
    pub name: String,
    /// Per portion.
    pub calories: i32,
    pub quantity: i32,
}

impl MealItemLine {
    pub fn total_calories(&self) -> i64 {
        i64::from(self.calories) * i64::from(self.quantity)
    }
}

/// Read model: a meal with its items and attached photos.
#[derive(Debug, Clone)]
pub struct MealWithItems {
    pub meal: Meal,
    pub items: Vec<MealItemLine>,
    pub image_ids: Vec<Uuid>,
}

impl MealWithItems {
    pub fn total_calories(&self) -> i64 {
        self.items.iter().map(MealItemLine::total_calories).sum()
    }

    /// Groups item lines and `(meal_id, image_id)` pairs under their meals,
    /// keeping the order of `meals`.
    pub fn assemble(
        meals: Vec<Meal>,
        lines: Vec<MealItemLine>,
        images: Vec<(Uuid, Uuid)>,
    ) -> Vec<MealWithItems> {
        let mut out: Vec<MealWithItems> = meals
            .into_iter()
            .map(|meal| MealWithItems {
                meal,
                items: Vec::new(),
                image_ids: Vec::new(),
            })
            .collect();
        for line in lines {
            if let Some(m) = out.iter_mut().find(|m| m.meal.id == line.meal_id) {
                m.items.push(line);
            }
        }
        for (meal_id, image_id) in images {
            if let Some(m) = out.iter_mut().find(|m| m.meal.id == meal_id) {
                m.image_ids.push(image_id);
            }
        }
        out
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use time::macros::{date, time};

    pub fn meal(user_id: Uuid) -> Meal {
        Meal {
            id: Uuid::new_v4(),
            user_id,
            meal_date: date!(2024 - 01 - 01),
            meal_time: time!(12:30),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn line(meal_id: Uuid, calories: i32, quantity: i32) -> MealItemLine {
        MealItemLine {
            id: Uuid::new_v4(),
            meal_id,
            food_item_id: Uuid::new_v4(),
            name: "food".into(),
            calories,
            quantity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{line, meal};
    use super::*;

    #[test]
    fn total_calories_multiplies_by_quantity() {
        let m = meal(Uuid::new_v4());
        let id = m.id;
        let with = MealWithItems {
            meal: m,
            items: vec![line(id, 100, 2), line(id, 50, 1)],
            image_ids: Vec::new(),
        };
        assert_eq!(with.total_calories(), 250);
    }

    #[test]
    fn assemble_groups_by_meal_in_order() {
        let user = Uuid::new_v4();
        let (a, b) = (meal(user), meal(user));
        let (a_id, b_id) = (a.id, b.id);
        let image = Uuid::new_v4();

        let out = MealWithItems::assemble(
            vec![b, a],
            vec![line(a_id, 10, 1), line(b_id, 20, 3), line(a_id, 5, 2)],
            vec![(a_id, image)],
        );
        assert_eq!(out[0].meal.id, b_id);
        assert_eq!(out[0].total_calories(), 60);
        assert!(out[0].image_ids.is_empty());
        assert_eq!(out[1].items.len(), 2);
        assert_eq!(out[1].total_calories(), 20);
        assert_eq!(out[1].image_ids, vec![image]);
    }

    #[test]
    fn meal_without_items_totals_zero() {
        let with = MealWithItems {
            meal: meal(Uuid::new_v4()),
            items: Vec::new(),
            image_ids: Vec::new(),
        };
        assert_eq!(with.total_calories(), 0);
    }
}
