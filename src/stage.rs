//! Pipeline stage model for the R&D order lifecycle.
//!
//! Orders move through a fixed, ordered pipeline from requirements capture to
//! shipping. The stage order is configuration data: position in the pipeline
//! is the sole input to progress calculation.

use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

/// A step in the fixed order lifecycle pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Requirements,
    StructuralDesign,
    DetailDesign,
    Procurement,
    Manufacturing,
    Assembly,
    Testing,
    Shipping,
}

/// All stages in lifecycle order. The last entry represents completion.
pub const STAGES: [Stage; 8] = [
    Stage::Requirements,
    Stage::StructuralDesign,
    Stage::DetailDesign,
    Stage::Procurement,
    Stage::Manufacturing,
    Stage::Assembly,
    Stage::Testing,
    Stage::Shipping,
];

impl Stage {
    /// Zero-based position of this stage in the pipeline.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire identifier, matching the on-disk snake_case form.
    pub fn id(self) -> &'static str {
        match self {
            Stage::Requirements => "requirements",
            Stage::StructuralDesign => "structural_design",
            Stage::DetailDesign => "detail_design",
            Stage::Procurement => "procurement",
            Stage::Manufacturing => "manufacturing",
            Stage::Assembly => "assembly",
            Stage::Testing => "testing",
            Stage::Shipping => "shipping",
        }
    }

    /// Look up a stage by its wire identifier. Unknown ids resolve to `None`.
    pub fn from_id(s: &str) -> Option<Stage> {
        STAGES.iter().copied().find(|stage| stage.id() == s.trim())
    }

    /// The stage after this one, or `None` at the end of the pipeline.
    pub fn next(self) -> Option<Stage> {
        STAGES.get(self.index() + 1).copied()
    }
}

/// Completion percentage for an order at the given stage.
///
/// The current stage counts as a full stage-unit, so the first stage already
/// reports 12.5% ("stage entered" rather than "stage completed"). An order
/// with no stage, or whose stored stage id was unrecognised, reports 0.
pub fn progress_percent(stage: Option<Stage>) -> f64 {
    match stage {
        Some(s) => (s.index() + 1) as f64 / STAGES.len() as f64 * 100.0,
        None => 0.0,
    }
}

/// Deserialize a stage field leniently: empty, missing, or unknown stage ids
/// become `None` so one bad record cannot fail a whole database load.
pub fn lenient_stage<'de, D>(de: D) -> Result<Option<Stage>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.as_deref().and_then(Stage::from_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_stable() {
        assert_eq!(Stage::Requirements.index(), 0);
        assert_eq!(Stage::Shipping.index(), STAGES.len() - 1);
        for (i, s) in STAGES.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn from_id_round_trips_and_rejects_unknown() {
        for s in STAGES {
            assert_eq!(Stage::from_id(s.id()), Some(s));
        }
        assert_eq!(Stage::from_id("painting"), None);
        assert_eq!(Stage::from_id(""), None);
    }

    #[test]
    fn next_walks_the_pipeline() {
        assert_eq!(Stage::Requirements.next(), Some(Stage::StructuralDesign));
        assert_eq!(Stage::Testing.next(), Some(Stage::Shipping));
        assert_eq!(Stage::Shipping.next(), None);
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_100() {
        let mut last = 0.0;
        for s in STAGES {
            let p = progress_percent(Some(s));
            assert!(p > last, "{:?} did not increase progress", s);
            last = p;
        }
        assert_eq!(progress_percent(Some(Stage::Shipping)), 100.0);
    }

    #[test]
    fn first_stage_counts_as_entered() {
        assert_eq!(progress_percent(Some(Stage::Requirements)), 12.5);
    }

    #[test]
    fn missing_stage_is_zero_progress() {
        assert_eq!(progress_percent(None), 0.0);
    }
}
