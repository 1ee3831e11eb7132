//! Post-hoc check of the batch-cook cadence the Analyst is asked to follow.

use std::fmt;
use std::str::FromStr;

use super::types::{MealAction, PlannedMeal, SLOT_LABELS};

const WEEKDAY_SLOTS: usize = 5;
const SATURDAY_DINNER: usize = 6;
const SUNDAY_LUNCH: usize = 7;
const SUNDAY_DINNER: usize = 8;

/// What to do with a proposal that breaks the cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CadenceMode {
    Off,
    /// Log violations and continue.
    #[default]
    Warn,
    /// Fail the request.
    Reject,
}

impl FromStr for CadenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(CadenceMode::Off),
            "warn" => Ok(CadenceMode::Warn),
            "reject" => Ok(CadenceMode::Reject),
            other => Err(format!(
                "unknown CADENCE_MODE '{}' (expected off, warn or reject)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadenceViolation {
    /// `None` for whole-proposal problems.
    pub slot: Option<usize>,
    pub message: String,
}

impl CadenceViolation {
    fn at(slot: usize, message: impl Into<String>) -> Self {
        Self {
            slot: Some(slot),
            message: message.into(),
        }
    }
}

impl fmt::Display for CadenceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            Some(slot) => write!(
                f,
                "{} (slot {}): {}",
                SLOT_LABELS.get(slot).copied().unwrap_or("?"),
                slot,
                self.message
            ),
            None => f.write_str(&self.message),
        }
    }
}

/// Every cadence rule `meals` breaks; empty when the proposal conforms.
///
/// Rules: nine slots; Monday, Saturday dinner and Sunday dinner are cooked; Sunday lunch reuses
/// Saturday dinner; no two adjacent weekday dinners are both cooked; a reuse slot names the
/// same dish as the nearest cooked slot before it.
pub fn check_cadence(meals: &[PlannedMeal]) -> Vec<CadenceViolation> {
    if meals.len() != SLOT_LABELS.len() {
        return vec![CadenceViolation {
            slot: None,
            message: format!("expected {} slots, got {}", SLOT_LABELS.len(), meals.len()),
        }];
    }

    let mut violations = Vec::new();
    for slot in [0, SATURDAY_DINNER, SUNDAY_DINNER] {
        if meals[slot].action != MealAction::Cook {
            violations.push(CadenceViolation::at(slot, "must be a Cook slot"));
        }
    }
    if meals[SUNDAY_LUNCH].action != MealAction::Reuse {
        violations.push(CadenceViolation::at(SUNDAY_LUNCH, "must reuse Saturday dinner"));
    }
    for slot in 1..WEEKDAY_SLOTS {
        if meals[slot - 1].action == MealAction::Cook && meals[slot].action == MealAction::Cook {
            violations.push(CadenceViolation::at(slot, "follows another Cook weekday"));
        }
    }

    let mut last_cooked: Option<&str> = None;
    for (slot, meal) in meals.iter().enumerate() {
        match meal.action {
            MealAction::Cook => last_cooked = Some(meal.recipe_title.trim()),
            MealAction::Reuse => match last_cooked {
                Some(title) if title.eq_ignore_ascii_case(meal.recipe_title.trim()) => {}
                Some(title) => violations.push(CadenceViolation::at(
                    slot,
                    format!("reuses '{}' but the previous Cook was '{}'", meal.recipe_title, title),
                )),
                None => violations.push(CadenceViolation::at(slot, "reuses a meal before anything was cooked")),
            },
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal(action: MealAction, title: &str) -> PlannedMeal {
        PlannedMeal {
            day: String::new(),
            action,
            recipe_id: None,
            recipe_title: title.to_string(),
            note: String::new(),
        }
    }

    fn conforming() -> Vec<PlannedMeal> {
        use MealAction::*;
        vec![
            meal(Cook, "Chili"),
            meal(Reuse, "Chili"),
            meal(Cook, "Curry"),
            meal(Reuse, "Curry"),
            meal(Cook, "Tacos"),
            meal(Reuse, "Tacos"),
            meal(Cook, "Roast chicken"),
            meal(Reuse, "Roast chicken"),
            meal(Cook, "Miso soup"),
        ]
    }

    #[test]
    fn test_conforming_week() {
        assert!(check_cadence(&conforming()).is_empty());
    }

    #[test]
    fn test_wrong_slot_count() {
        let violations = check_cadence(&conforming()[..7]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].slot, None);
    }

    #[test]
    fn test_adjacent_weekday_cooks() {
        let mut meals = conforming();
        meals[1] = meal(MealAction::Cook, "Pasta");
        let slots: Vec<_> = check_cadence(&meals).into_iter().filter_map(|v| v.slot).collect();
        assert!(slots.contains(&1));
        assert!(slots.contains(&2));
    }

    #[test]
    fn test_reuse_must_match_previous_cook() {
        let mut meals = conforming();
        meals[7] = meal(MealAction::Reuse, "Chili");
        let violations = check_cadence(&meals);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].slot, Some(7));
    }

    #[test]
    fn test_weekend_anchors() {
        let mut meals = conforming();
        meals[8] = meal(MealAction::Reuse, "Roast chicken");
        meals[0] = meal(MealAction::Reuse, "Chili");
        let slots: Vec<_> = check_cadence(&meals).into_iter().filter_map(|v| v.slot).collect();
        assert!(slots.contains(&0));
        assert!(slots.contains(&8));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Reject".parse::<CadenceMode>().unwrap(), CadenceMode::Reject);
        assert_eq!(CadenceMode::default(), CadenceMode::Warn);
        assert!("maybe".parse::<CadenceMode>().is_err());
    }
}
