//! Assistant reply parsing and validation
//!
//! Assistant output is untrusted text. Replies are reduced to the first
//! balanced `{...}` span, parsed as loose JSON, and then checked field by
//! field. Nothing is deserialized straight into engine types.

use serde_json::{Map, Value};

use crate::error::ScoringError;
use crate::models::{Coaching, ImprovementArea, ScoreColor, ScoreCredit};

pub const DEFAULT_NOTES: &str = "No notes provided";
pub const DEFAULT_REASONING: &str = "No reasoning provided";

/// Validated step reply
#[derive(Debug, Clone, PartialEq)]
pub struct StepReply {
    pub credit: ScoreCredit,
    pub notes: String,
    pub reasoning: String,
}

/// First balanced `{...}` span in `text`
///
/// Braces inside JSON string literals are ignored, so notes containing `}` do
/// not cut the object short.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_object(text: &str) -> Result<Map<String, Value>, ScoringError> {
    let span = extract_json_object(text)
        .ok_or_else(|| ScoringError::ResponseParse("no JSON object found in reply".to_string()))?;

    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ScoringError::ResponseParse("reply JSON is not an object".to_string())),
        Err(e) => Err(ScoringError::ResponseParse(format!("invalid JSON: {}", e))),
    }
}

fn credit_field(value: Option<&Value>) -> Result<ScoreCredit, ScoringError> {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ScoringError::ResponseParse(format!("credit missing or not numeric: {:?}", value)))?;

    ScoreCredit::from_value(number)
        .ok_or_else(|| ScoringError::ResponseParse(format!("credit must be 0, 0.5 or 1, got {}", number)))
}

fn color_field(value: Option<&Value>) -> Result<ScoreColor, ScoringError> {
    value
        .and_then(Value::as_str)
        .and_then(|s| ScoreColor::parse(s.trim()))
        .ok_or_else(|| {
            ScoringError::ResponseParse(format!("color must be green, yellow or red, got {:?}", value))
        })
}

fn text_field(map: &Map<String, Value>, key: &str, default: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Validate a step-scoring reply: `{credit, color, notes, reasoning}`
///
/// `color` must be a valid color, but the stored color is always derived from
/// `credit`; a disagreeing color is logged and overridden.
pub fn parse_step_reply(text: &str) -> Result<StepReply, ScoringError> {
    let map = parse_object(text)?;
    let credit = credit_field(map.get("credit"))?;
    let color = color_field(map.get("color"))?;

    if color != credit.color() {
        tracing::debug!(
            credit = %credit,
            reported_color = color.as_str(),
            "Assistant color disagrees with credit; deriving color from credit"
        );
    }

    Ok(StepReply {
        credit,
        notes: text_field(&map, "notes", DEFAULT_NOTES),
        reasoning: text_field(&map, "reasoning", DEFAULT_REASONING),
    })
}

fn string_list(value: Option<&Value>, field: &str) -> Result<Vec<String>, ScoringError> {
    let items = value
        .and_then(Value::as_array)
        .ok_or_else(|| ScoringError::ResponseParse(format!("{} must be an array", field)))?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| ScoringError::ResponseParse(format!("{} entries must be strings", field)))
        })
        .collect()
}

fn improvement_list(value: Option<&Value>) -> Result<Vec<ImprovementArea>, ScoringError> {
    let items = value
        .and_then(Value::as_array)
        .ok_or_else(|| ScoringError::ResponseParse("areasForImprovement must be an array".to_string()))?;

    items
        .iter()
        .map(|item| -> Result<ImprovementArea, ScoringError> {
            let obj = item.as_object().ok_or_else(|| {
                ScoringError::ResponseParse("areasForImprovement entries must be objects".to_string())
            })?;
            let field = |key: &str| {
                obj.get(key)
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| {
                        ScoringError::ResponseParse(format!("areasForImprovement entry missing '{}'", key))
                    })
            };

            Ok(ImprovementArea {
                area: field("area")?,
                how_to_improve: field("howToImprove")?,
                bridge_step: field("bridgeStep")?,
            })
        })
        .collect()
}

/// Validate a coaching reply: `{thingsTheyDidWell: string[], areasForImprovement: {...}[]}`
///
/// Both lists must be present and non-empty.
pub fn parse_coaching_reply(text: &str) -> Result<Coaching, ScoringError> {
    let map = parse_object(text)?;
    let things_they_did_well = string_list(map.get("thingsTheyDidWell"), "thingsTheyDidWell")?;
    let areas_for_improvement = improvement_list(map.get("areasForImprovement"))?;

    if things_they_did_well.is_empty() || areas_for_improvement.is_empty() {
        return Err(ScoringError::ResponseParse("coaching lists must not be empty".to_string()));
    }

    Ok(Coaching {
        things_they_did_well,
        areas_for_improvement,
    })
}
