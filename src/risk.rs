//! Risk classification for orders.
//!
//! An order is at risk when its remaining time and stage progress suggest it
//! will miss its estimated completion. The boolean classifier is separate
//! from the display bucketing of externally supplied risk scores.

use chrono::NaiveDateTime;

use crate::deadline;
use crate::project::Project;

/// Whether an order is at risk of missing its estimated completion.
///
/// True iff the order has an estimated completion date and either the
/// deadline is at most 7 days away with progress below 80%, or the deadline
/// has passed with progress below 100%. An order with no estimated
/// completion is never at risk.
pub fn is_at_risk(project: &Project, now: NaiveDateTime) -> bool {
    let Some(due) = project.estimated_completion else {
        return false;
    };
    let progress = project.progress();
    (deadline::days_until_due(due, now) <= 7 && progress < 80.0)
        || (deadline::is_overdue(due, now) && progress < 100.0)
}

/// Visual severity bucket for an externally supplied risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    LowMedium,
    Medium,
    High,
}

impl RiskLevel {
    /// Bucket a raw risk score: >= 70 high, >= 40 medium, >= 20 low-medium.
    pub fn from_score(score: f64) -> RiskLevel {
        if score >= 70.0 {
            RiskLevel::High
        } else if score >= 40.0 {
            RiskLevel::Medium
        } else if score >= 20.0 {
            RiskLevel::LowMedium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::LowMedium => "low-medium",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Priority;
    use crate::stage::Stage;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn order(stage: Option<Stage>, due: Option<NaiveDate>) -> Project {
        Project {
            id: 1,
            project_name: "Spindle assembly".into(),
            order_number: Some("RD-2024-117".into()),
            current_stage: stage,
            estimated_completion: due,
            priority: Priority::Medium,
            risk_score: None,
            timeline: Vec::new(),
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    #[test]
    fn no_deadline_is_never_at_risk() {
        // Even at 0% progress.
        assert!(!is_at_risk(&order(None, None), now()));
        assert!(!is_at_risk(&order(Some(Stage::Requirements), None), now()));
    }

    #[test]
    fn near_deadline_with_low_progress_is_at_risk() {
        let due = now().date() + Duration::days(5);
        let p = order(Some(Stage::Requirements), Some(due));
        assert!((p.progress() - 12.5).abs() < f64::EPSILON);
        assert!(is_at_risk(&p, now()));
    }

    #[test]
    fn near_deadline_with_high_progress_is_safe() {
        let due = now().date() + Duration::days(5);
        // Testing = stage 7 of 8 = 87.5%.
        let p = order(Some(Stage::Testing), Some(due));
        assert!(!is_at_risk(&p, now()));
    }

    #[test]
    fn far_deadline_at_last_stage_is_safe() {
        let due = now().date() + Duration::days(30);
        let p = order(Some(Stage::Shipping), Some(due));
        assert!(!is_at_risk(&p, now()));
    }

    #[test]
    fn overdue_below_full_progress_is_at_risk() {
        let due = now().date() - Duration::days(1);
        assert!(is_at_risk(&order(Some(Stage::Testing), Some(due)), now()));
        // At 100% the overdue rule no longer applies.
        assert!(!is_at_risk(&order(Some(Stage::Shipping), Some(due)), now()));
    }

    #[test]
    fn score_buckets() {
        assert_eq!(RiskLevel::from_score(85.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(70.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(69.9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(20.0), RiskLevel::LowMedium);
        assert_eq!(RiskLevel::from_score(19.9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
    }
}
