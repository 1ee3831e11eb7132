//! Inline-button payloads. Telegram caps callback data at 64 bytes, so requests carried in
//! `redo` / `next` payloads are truncated on a char boundary.

use chrono::NaiveDate;

use crate::planner::is_week_start;

pub const MAX_ACTION_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    Confirm { plan_id: i64 },
    Adjust { plan_id: i64 },
    StartOver { plan_id: i64 },
    /// Replace the plan occupying `week_start` with a fresh one for `request`.
    Redo { week_start: NaiveDate, request: String },
    /// Plan `request` for `week_start` instead.
    NextWeek { week_start: NaiveDate, request: String },
}

impl PlanAction {
    pub fn encode(&self) -> String {
        match self {
            PlanAction::Confirm { plan_id } => format!("confirm|{}", plan_id),
            PlanAction::Adjust { plan_id } => format!("adjust|{}", plan_id),
            PlanAction::StartOver { plan_id } => format!("startover|{}", plan_id),
            PlanAction::Redo { week_start, request } => with_request(format!("redo|{}|", week_start), request),
            PlanAction::NextWeek { week_start, request } => with_request(format!("next|{}|", week_start), request),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let (kind, rest) = data.split_once('|')?;
        match kind {
            "confirm" => Some(PlanAction::Confirm { plan_id: rest.parse().ok()? }),
            "adjust" => Some(PlanAction::Adjust { plan_id: rest.parse().ok()? }),
            "startover" => Some(PlanAction::StartOver { plan_id: rest.parse().ok()? }),
            "redo" | "next" => {
                let (week, request) = rest.split_once('|')?;
                let week_start = NaiveDate::parse_from_str(week, "%Y-%m-%d")
                    .ok()
                    .filter(|d| is_week_start(*d))?;
                let request = request.to_string();
                Some(if kind == "redo" {
                    PlanAction::Redo { week_start, request }
                } else {
                    PlanAction::NextWeek { week_start, request }
                })
            }
            _ => None,
        }
    }
}

fn with_request(mut prefix: String, request: &str) -> String {
    let budget = MAX_ACTION_BYTES.saturating_sub(prefix.len());
    let mut end = request.len().min(budget);
    while !request.is_char_boundary(end) {
        end -= 1;
    }
    prefix.push_str(&request[..end]);
    prefix
}
