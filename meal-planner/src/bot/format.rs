use storage::MealPlan;

use crate::clipper::ClippedRecipe;

pub const HELP_TEXT: &str = "Tell me what you feel like eating next week, for example \
\"quick vegetarian dinners, nothing spicy\", and I'll draft a plan from our recipes.\n\
You can then confirm it to get a shopping list, ask for changes, or start over.\n\
Send a link to a recipe page (optionally followed by \"tag: soup, quick\") to save it to the blog.";

fn days_text(plan: &MealPlan) -> String {
    let mut out = String::new();
    for day in &plan.days {
        out.push_str(&format!("\n{}: {}", day.day, day.recipe_title));
        if !day.prep_time.is_empty() {
            out.push_str(&format!(" ({})", day.prep_time));
        }
        if !day.note.is_empty() {
            out.push_str(&format!("\n  {}", day.note));
        }
    }
    out
}

pub fn format_draft(plan: &MealPlan) -> String {
    format!(
        "Draft plan for the week of {}:\n{}\n\nConfirm to get the shopping list, Adjust to change something, or Start Over.",
        plan.week_start,
        days_text(plan)
    )
}

pub fn format_final(plan: &MealPlan) -> String {
    format!("Plan confirmed for the week of {}:\n{}", plan.week_start, days_text(plan))
}

/// Sent as its own message after [`format_final`] so a long week and a long list each stay
/// under the chat message limit.
pub fn format_shopping_list(plan: &MealPlan) -> String {
    match plan.shopping_list.as_deref() {
        Some(items) if !items.is_empty() => {
            let mut text = String::from("Shopping list:");
            for item in items {
                text.push_str(&format!("\n- {}", item));
            }
            text
        }
        _ => "No shopping needed.".to_string(),
    }
}

pub fn format_clipped(clipped: &ClippedRecipe) -> String {
    let mut text = format!("Recipe saved: {}", clipped.post.title);
    if !clipped.recipe.tags.is_empty() {
        text.push_str(&format!("\nTags: {}", clipped.recipe.tags.join(", ")));
    }
    text.push_str("\nIt can now show up in your plans.");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use storage::DayPlan;

    fn plan() -> MealPlan {
        MealPlan::new_draft(
            1,
            NaiveDate::from_ymd_opt(2024, 6, 17).unwrap(),
            vec![DayPlan {
                day: "Monday dinner".to_string(),
                recipe_id: Some("a".to_string()),
                recipe_title: "Cook: Pasta".to_string(),
                prep_time: "30 min".to_string(),
                note: "Double the sauce".to_string(),
            }],
            "pasta",
        )
    }

    #[test]
    fn test_draft_text() {
        let text = format_draft(&plan());
        assert!(text.contains("week of 2024-06-17"));
        assert!(text.contains("Monday dinner: Cook: Pasta (30 min)\n  Double the sauce"));
    }

    #[test]
    fn test_final_text_and_list_are_separate() {
        let mut plan = plan();
        plan.shopping_list = Some(vec!["Pasta".to_string(), "Tomato".to_string()]);
        let text = format_final(&plan);
        assert!(text.starts_with("Plan confirmed for the week of 2024-06-17"));
        assert!(!text.contains("Shopping list"));
        assert_eq!(format_shopping_list(&plan), "Shopping list:\n- Pasta\n- Tomato");
    }

    #[test]
    fn test_empty_list_text() {
        let mut plan = plan();
        assert_eq!(format_shopping_list(&plan), "No shopping needed.");
        plan.shopping_list = Some(Vec::new());
        assert_eq!(format_shopping_list(&plan), "No shopping needed.");
    }
}
