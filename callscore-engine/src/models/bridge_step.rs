//! Bridge steps: the ordered, weighted scoring rubric

use serde::{Deserialize, Serialize};

/// One weighted dimension of the scoring rubric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStep {
    /// Unique step key, e.g. "pinpoint_pain"
    pub key: String,
    /// Display name
    pub name: String,
    /// Positive weight
    pub weight: u32,
    /// Position in the rubric (ascending)
    pub order: i32,
    /// Rubric text overriding the built-in default in remote prompts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
}

impl BridgeStep {
    pub fn new(key: impl Into<String>, name: impl Into<String>, weight: u32, order: i32) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            weight,
            order,
            custom_prompt: None,
        }
    }

    pub fn with_custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = Some(prompt.into());
        self
    }

    /// Canonical step this key refers to, if any
    pub fn canonical(&self) -> Option<CanonicalStep> {
        CanonicalStep::from_key(&self.key)
    }

    /// Rubric text for remote prompts: custom prompt, else canonical default,
    /// else a generic rubric built from the step name
    pub fn rubric(&self) -> String {
        if let Some(prompt) = self.custom_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
            return prompt.to_string();
        }

        match self.canonical() {
            Some(step) => step.default_rubric().to_string(),
            None => format!(
                "Evaluate how well the sales rep performed the \"{}\" step of the call. \
                 Award full credit when the step is clearly and completely executed, \
                 partial credit when it is attempted but incomplete, and no credit when \
                 it is missing.",
                self.name
            ),
        }
    }
}

/// The six built-in rubric dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalStep {
    PinpointPain,
    Qualify,
    SolutionSuccess,
    QandA,
    NextSteps,
    CloseOrSchedule,
}

impl CanonicalStep {
    pub const ALL: [CanonicalStep; 6] = [
        CanonicalStep::PinpointPain,
        CanonicalStep::Qualify,
        CanonicalStep::SolutionSuccess,
        CanonicalStep::QandA,
        CanonicalStep::NextSteps,
        CanonicalStep::CloseOrSchedule,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CanonicalStep::PinpointPain => "pinpoint_pain",
            CanonicalStep::Qualify => "qualify",
            CanonicalStep::SolutionSuccess => "solution_success",
            CanonicalStep::QandA => "qa",
            CanonicalStep::NextSteps => "next_steps",
            CanonicalStep::CloseOrSchedule => "close_or_schedule",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CanonicalStep::PinpointPain => "Pinpoint Pain",
            CanonicalStep::Qualify => "Qualify",
            CanonicalStep::SolutionSuccess => "Solution Success",
            CanonicalStep::QandA => "Q&A",
            CanonicalStep::NextSteps => "Next Steps",
            CanonicalStep::CloseOrSchedule => "Close or Schedule",
        }
    }

    pub fn default_weight(self) -> u32 {
        match self {
            CanonicalStep::PinpointPain => 5,
            _ => 3,
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.key() == key)
    }

    pub fn default_rubric(self) -> &'static str {
        match self {
            CanonicalStep::PinpointPain => {
                "Did the rep uncover the prospect's specific business pain? Look for open \
                 questions about problems, challenges and their impact, and for the prospect \
                 describing concrete costs or frustrations."
            }
            CanonicalStep::Qualify => {
                "Did the rep qualify the opportunity? Full credit requires budget, decision \
                 authority and timeline to all be discussed; partial credit if only some are."
            }
            CanonicalStep::SolutionSuccess => {
                "Did the rep connect the solution to the prospect's pain and back it with proof \
                 such as a customer example or case study?"
            }
            CanonicalStep::QandA => {
                "Did the rep invite questions, answer them clearly and handle objections or \
                 concerns directly?"
            }
            CanonicalStep::NextSteps => {
                "Did the rep define concrete next steps with owners, and did both sides commit \
                 to specific actions?"
            }
            CanonicalStep::CloseOrSchedule => {
                "Did the rep ask for the business or secure a scheduled follow-up with a \
                 specific date and time?"
            }
        }
    }
}

/// Canonical rubric: six steps with weights {5,3,3,3,3,3}, ordered 1..=6
pub fn canonical_bridge_steps() -> Vec<BridgeStep> {
    CanonicalStep::ALL
        .iter()
        .zip(1..)
        .map(|(step, order)| BridgeStep::new(step.key(), step.name(), step.default_weight(), order))
        .collect()
}
