use super::NutritionLog;
use crate::messages::{LoggedMeal, MealEntry, NutritionEstimate};
use crate::{AlfredoError, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct InMemoryNutritionLog {
    meals: Arc<RwLock<Vec<LoggedMeal>>>,
}

impl InMemoryNutritionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meals(&self) -> Vec<LoggedMeal> {
        self.meals.read().clone()
    }
}

/// Sum of ingredient macros
pub fn meal_totals(entry: &MealEntry) -> NutritionEstimate {
    entry
        .ingredients
        .iter()
        .fold(NutritionEstimate::default(), |acc, i| NutritionEstimate {
            calories: acc.calories + i.calories,
            protein: acc.protein + i.protein,
            carbs: acc.carbs + i.carbs,
            fat: acc.fat + i.fat,
        })
}

#[async_trait]
impl NutritionLog for InMemoryNutritionLog {
    async fn append_meal(&self, entry: MealEntry) -> Result<LoggedMeal> {
        if entry.name.trim().is_empty() {
            return Err(AlfredoError::PersistenceError("meal needs a name".to_string()));
        }

        let meal = LoggedMeal {
            id: Uuid::new_v4(),
            totals: meal_totals(&entry),
            entry,
            logged_at: Utc::now(),
        };
        self.meals.write().push(meal.clone());
        Ok(meal)
    }

    async fn today_totals(&self) -> Result<NutritionEstimate> {
        let today = Utc::now().date_naive();
        let totals = self
            .meals
            .read()
            .iter()
            .filter(|m| m.logged_at.date_naive() == today)
            .fold(NutritionEstimate::default(), |acc, m| NutritionEstimate {
                calories: acc.calories + m.totals.calories,
                protein: acc.protein + m.totals.protein,
                carbs: acc.carbs + m.totals.carbs,
                fat: acc.fat + m.totals.fat,
            });
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{MealIngredient, MealType};

    fn entry(name: &str, calories: f64) -> MealEntry {
        MealEntry {
            name: name.to_string(),
            meal_type: MealType::Snack,
            ingredients: vec![MealIngredient {
                quantity: 1.0,
                unit: "piece".to_string(),
                calories,
                protein: 1.0,
                carbs: 2.0,
                fat: 0.5,
            }],
        }
    }

    #[tokio::test]
    async fn test_append_and_totals() {
        let log = InMemoryNutritionLog::new();
        let meal = log.append_meal(entry("apple (voice logged)", 52.0)).await.unwrap();
        assert_eq!(meal.totals.calories, 52.0);

        log.append_meal(entry("bread (voice logged)", 5.0)).await.unwrap();
        let totals = log.today_totals().await.unwrap();
        assert_eq!(totals.calories, 57.0);
        assert_eq!(totals.fat, 1.0);
        assert_eq!(log.meals().len(), 2);
    }

    #[tokio::test]
    async fn test_unnamed_meal_rejected() {
        let log = InMemoryNutritionLog::new();
        assert!(log.append_meal(entry("  ", 1.0)).await.is_err());
        assert!(log.meals().is_empty());
    }
}
