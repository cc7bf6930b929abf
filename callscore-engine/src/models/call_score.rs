//! Call score types
//!
//! `CallScore` is the persisted output shape. Field names are stable:
//! `total`, `stepScores`, `coaching`, `scoringMethod`, `scoredAt`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use super::BridgeStep;

// ============================================================================
// Credit and color
// ============================================================================

/// Partial-credit value awarded for a step: exactly 0, 0.5 or 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreCredit {
    None,
    Partial,
    Full,
}

impl ScoreCredit {
    pub fn value(self) -> f64 {
        match self {
            ScoreCredit::None => 0.0,
            ScoreCredit::Partial => 0.5,
            ScoreCredit::Full => 1.0,
        }
    }

    /// Exact match against {0, 0.5, 1}; anything else is rejected
    pub fn from_value(value: f64) -> Option<Self> {
        if value == 0.0 {
            Some(ScoreCredit::None)
        } else if value == 0.5 {
            Some(ScoreCredit::Partial)
        } else if value == 1.0 {
            Some(ScoreCredit::Full)
        } else {
            None
        }
    }

    pub fn color(self) -> ScoreColor {
        ScoreColor::from_credit(self)
    }
}

impl fmt::Display for ScoreCredit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreCredit::None => write!(f, "0"),
            ScoreCredit::Partial => write!(f, "0.5"),
            ScoreCredit::Full => write!(f, "1"),
        }
    }
}

impl Serialize for ScoreCredit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScoreCredit::None => serializer.serialize_u8(0),
            ScoreCredit::Partial => serializer.serialize_f64(0.5),
            ScoreCredit::Full => serializer.serialize_u8(1),
        }
    }
}

impl<'de> Deserialize<'de> for ScoreCredit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        ScoreCredit::from_value(value).ok_or_else(|| {
            serde::de::Error::custom(format!("credit must be 0, 0.5 or 1, got {}", value))
        })
    }
}

/// Traffic-light indicator, always derived from credit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreColor {
    Green,
    Yellow,
    Red,
}

impl ScoreColor {
    pub fn from_credit(credit: ScoreCredit) -> Self {
        match credit {
            ScoreCredit::Full => ScoreColor::Green,
            ScoreCredit::Partial => ScoreColor::Yellow,
            ScoreCredit::None => ScoreColor::Red,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "green" => Some(ScoreColor::Green),
            "yellow" => Some(ScoreColor::Yellow),
            "red" => Some(ScoreColor::Red),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreColor::Green => "green",
            ScoreColor::Yellow => "yellow",
            ScoreColor::Red => "red",
        }
    }
}

// ============================================================================
// Step score
// ============================================================================

/// Score for a single bridge step
///
/// `color` is private: it is computed from `credit` on construction and
/// checked against it on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StepScoreRecord")]
pub struct StepScore {
    /// Bridge step key
    pub step: String,
    pub step_name: String,
    pub weight: u32,
    pub credit: ScoreCredit,
    color: ScoreColor,
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Assistant conversation that produced this score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_thread_ref: Option<String>,
    /// Assistant run that produced this score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_run_ref: Option<String>,
}

impl StepScore {
    pub fn new(step: &BridgeStep, credit: ScoreCredit, notes: impl Into<String>) -> Self {
        Self {
            step: step.key.clone(),
            step_name: step.name.clone(),
            weight: step.weight,
            credit,
            color: credit.color(),
            notes: notes.into(),
            reasoning: None,
            external_thread_ref: None,
            external_run_ref: None,
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_external_refs(mut self, thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        self.external_thread_ref = Some(thread_id.into());
        self.external_run_ref = Some(run_id.into());
        self
    }

    pub fn color(&self) -> ScoreColor {
        self.color
    }

    /// Weighted contribution to the call total (unrounded)
    pub fn weighted_value(&self) -> f64 {
        f64::from(self.weight) * self.credit.value()
    }
}

/// Wire shape of a stored step score, validated before becoming a `StepScore`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepScoreRecord {
    step: String,
    step_name: String,
    weight: u32,
    credit: ScoreCredit,
    color: ScoreColor,
    notes: String,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    external_thread_ref: Option<String>,
    #[serde(default)]
    external_run_ref: Option<String>,
}

impl TryFrom<StepScoreRecord> for StepScore {
    type Error = String;

    fn try_from(record: StepScoreRecord) -> Result<Self, Self::Error> {
        if record.color != record.credit.color() {
            return Err(format!(
                "color '{}' does not match credit {} for step '{}'",
                record.color.as_str(),
                record.credit,
                record.step
            ));
        }

        Ok(Self {
            step: record.step,
            step_name: record.step_name,
            weight: record.weight,
            credit: record.credit,
            color: record.color,
            notes: record.notes,
            reasoning: record.reasoning,
            external_thread_ref: record.external_thread_ref,
            external_run_ref: record.external_run_ref,
        })
    }
}

// ============================================================================
// Coaching
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovementArea {
    pub area: String,
    pub how_to_improve: String,
    /// Bridge step (key or name) this improvement relates to
    pub bridge_step: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coaching {
    pub things_they_did_well: Vec<String>,
    pub areas_for_improvement: Vec<ImprovementArea>,
}

impl Coaching {
    /// Fixed coaching substituted when the assistant's coaching reply is unusable
    pub fn fallback() -> Self {
        Self {
            things_they_did_well: vec!["Call analysis completed".to_string()],
            areas_for_improvement: vec![ImprovementArea {
                area: "System error".to_string(),
                how_to_improve: "Coaching feedback could not be generated for this call. \
                                 Review the step scores and notes, or rescore the call later."
                    .to_string(),
                bridge_step: "general".to_string(),
            }],
        }
    }
}

// ============================================================================
// Call score
// ============================================================================

/// Which evaluator produced a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMethod {
    Local,
    Remote,
}

impl ScoringMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoringMethod::Local => "local",
            ScoringMethod::Remote => "remote",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "local" => Some(ScoringMethod::Local),
            "remote" => Some(ScoringMethod::Remote),
            _ => None,
        }
    }
}

impl fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rounded weighted sum: `round(Σ weight × credit)`
pub fn weighted_total(step_scores: &[StepScore]) -> i64 {
    let sum: f64 = step_scores.iter().map(StepScore::weighted_value).sum();
    sum.round() as i64
}

/// Weighted scorecard for one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallScore {
    pub total: i64,
    pub step_scores: Vec<StepScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coaching: Option<Coaching>,
    pub scoring_method: ScoringMethod,
    pub scored_at: DateTime<Utc>,
}

impl CallScore {
    /// Assemble a score, computing `total` from the step scores
    pub fn assemble(
        step_scores: Vec<StepScore>,
        coaching: Option<Coaching>,
        scoring_method: ScoringMethod,
    ) -> Self {
        Self {
            total: weighted_total(&step_scores),
            step_scores,
            coaching,
            scoring_method,
            scored_at: Utc::now(),
        }
    }

    /// Check total, color, ordering and key-set invariants against a rubric
    ///
    /// `steps` may be in any order; they are compared sorted by `order`.
    pub fn validate_against(&self, steps: &[BridgeStep]) -> Result<(), String> {
        if self.total != weighted_total(&self.step_scores) {
            return Err(format!(
                "total {} does not equal weighted sum {}",
                self.total,
                weighted_total(&self.step_scores)
            ));
        }

        let mut seen = HashSet::new();
        for score in &self.step_scores {
            if !seen.insert(score.step.as_str()) {
                return Err(format!("duplicate step score '{}'", score.step));
            }
            if score.color() != score.credit.color() {
                return Err(format!("color mismatch for step '{}'", score.step));
            }
        }

        let mut ordered: Vec<&BridgeStep> = steps.iter().collect();
        ordered.sort_by_key(|s| s.order);
        let expected: Vec<&str> = ordered.iter().map(|s| s.key.as_str()).collect();
        let actual: Vec<&str> = self.step_scores.iter().map(|s| s.step.as_str()).collect();
        if expected != actual {
            return Err(format!(
                "step scores {:?} do not match configured steps {:?}",
                actual, expected
            ));
        }

        Ok(())
    }
}
