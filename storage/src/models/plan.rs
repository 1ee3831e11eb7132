use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::StorageError;

/// Lifecycle status of a meal plan.
///
/// `Draft`, `Adjusting` and `Final` occupy their week; `Superseded` marks a plan that a newer
/// draft for the same week replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Draft,
    Adjusting,
    Final,
    Superseded,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Adjusting => "adjusting",
            PlanStatus::Final => "final",
            PlanStatus::Superseded => "superseded",
        }
    }

    pub fn occupies_week(&self) -> bool {
        !matches!(self, PlanStatus::Superseded)
    }

    pub fn can_transition_to(&self, next: PlanStatus) -> bool {
        use PlanStatus::*;
        matches!(
            (self, next),
            (Draft, Final)
                | (Draft, Adjusting)
                | (Adjusting, Draft)
                | (Draft, Superseded)
                | (Adjusting, Superseded)
                | (Final, Superseded)
        )
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(PlanStatus::Draft),
            "adjusting" => Ok(PlanStatus::Adjusting),
            "final" => Ok(PlanStatus::Final),
            "superseded" => Ok(PlanStatus::Superseded),
            other => Err(StorageError::InvalidData(format!("unknown plan status '{}'", other))),
        }
    }
}

/// One meal slot of a formatted plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<String>,
    pub recipe_title: String,
    #[serde(default)]
    pub prep_time: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealPlan {
    /// `None` until persisted.
    pub id: Option<i64>,
    pub user_id: i64,
    /// Monday of the planned week.
    pub week_start: NaiveDate,
    pub status: PlanStatus,
    pub days: Vec<DayPlan>,
    /// `None` while the plan is a draft.
    pub shopping_list: Option<Vec<String>>,
    /// The request text the plan was generated from.
    pub request: String,
    pub created_at: DateTime<Utc>,
}

impl MealPlan {
    pub fn new_draft(user_id: i64, week_start: NaiveDate, days: Vec<DayPlan>, request: impl Into<String>) -> Self {
        Self {
            id: None,
            user_id,
            week_start,
            status: PlanStatus::Draft,
            days,
            shopping_list: None,
            request: request.into(),
            created_at: Utc::now(),
        }
    }
}

/// Shopping list written when a plan is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingList {
    pub id: Option<i64>,
    pub user_id: i64,
    pub meal_plan_id: i64,
    pub items: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            PlanStatus::Draft,
            PlanStatus::Adjusting,
            PlanStatus::Final,
            PlanStatus::Superseded,
        ] {
            assert_eq!(status.as_str().parse::<PlanStatus>().unwrap(), status);
        }
        assert!("archived".parse::<PlanStatus>().is_err());
    }

    #[test]
    fn test_final_only_leaves_by_supersession() {
        assert!(!PlanStatus::Final.can_transition_to(PlanStatus::Draft));
        assert!(!PlanStatus::Final.can_transition_to(PlanStatus::Adjusting));
        assert!(PlanStatus::Final.can_transition_to(PlanStatus::Superseded));
        assert!(!PlanStatus::Superseded.can_transition_to(PlanStatus::Draft));
    }

    #[test]
    fn test_day_plan_without_recipe_id_deserializes() {
        let day: DayPlan =
            serde_json::from_str(r#"{"day":"Monday","recipe_title":"Cook: Pasta"}"#).unwrap();
        assert_eq!(day.recipe_id, None);
        assert_eq!(day.prep_time, "");
    }
}
