//! Project (R&D order) records.
//!
//! A project is one order moving through the pipeline. Its completion
//! percentage is derived purely from the current stage position; stage
//! advances append to an audit timeline rather than overwriting history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::deadline;
use crate::fields::Priority;
use crate::stage::{self, Stage, STAGES};

/// An R&D order tracked through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub project_name: String,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default, deserialize_with = "stage::lenient_stage")]
    pub current_stage: Option<Stage>,
    #[serde(default, deserialize_with = "deadline::lenient_date")]
    pub estimated_completion: Option<NaiveDate>,
    pub priority: Priority,
    /// Score supplied by the external risk-scoring system, if any.
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub timeline: Vec<StageEvent>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

/// One stage-advance event in an order's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEvent {
    pub stage: Stage,
    pub entered: NaiveDate,
}

impl Project {
    /// Completion percentage derived from the current stage position.
    pub fn progress(&self) -> f64 {
        stage::progress_percent(self.current_stage)
    }

    /// Move the order to the next pipeline stage, recording a timeline entry.
    ///
    /// An order with no stage enters the first stage. Returns the new stage,
    /// or `None` if the order is already at the end of the pipeline.
    pub fn advance(&mut self, today: NaiveDate) -> Option<Stage> {
        let next = match self.current_stage {
            Some(s) => s.next()?,
            None => STAGES[0],
        };
        self.current_stage = Some(next);
        self.timeline.push(StageEvent {
            stage: next,
            entered: today,
        });
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn order(stage: Option<Stage>) -> Project {
        Project {
            id: 1,
            project_name: "Test rig".into(),
            order_number: None,
            current_stage: stage,
            estimated_completion: None,
            priority: Priority::Medium,
            risk_score: None,
            timeline: Vec::new(),
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    #[test]
    fn advance_enters_first_stage_from_unset() {
        let mut p = order(None);
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(p.advance(today), Some(Stage::Requirements));
        assert_eq!(p.current_stage, Some(Stage::Requirements));
        assert_eq!(p.timeline.len(), 1);
        assert_eq!(p.timeline[0].entered, today);
    }

    #[test]
    fn advance_stops_at_shipping() {
        let mut p = order(Some(Stage::Shipping));
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(p.advance(today), None);
        assert_eq!(p.current_stage, Some(Stage::Shipping));
        assert!(p.timeline.is_empty());
    }

    #[test]
    fn unknown_stage_id_loads_as_none() {
        let json = r#"{
            "id": 7,
            "project_name": "Gearbox",
            "current_stage": "polishing",
            "estimated_completion": "not-a-date",
            "priority": "high",
            "created_at_utc": 0,
            "updated_at_utc": 0
        }"#;
        let p: Project = serde_json::from_str(json).unwrap();
        assert_eq!(p.current_stage, None);
        assert_eq!(p.estimated_completion, None);
        assert_eq!(p.progress(), 0.0);
    }
}
