//! Prompt construction for the assistant service

use crate::models::{BridgeStep, StepScore};

/// Message asking the assistant to score one bridge step
pub fn step_prompt(step: &BridgeStep, transcript: &str) -> String {
    format!(
        "You are scoring one step of a sales call against a rubric.\n\
         \n\
         Step: {name}\n\
         Weight: {weight}\n\
         Rubric:\n{rubric}\n\
         \n\
         Award credit 1 for full execution, 0.5 for partial execution and 0 when the step is \
         missing. Color must match the credit: 1 = \"green\", 0.5 = \"yellow\", 0 = \"red\".\n\
         \n\
         Respond with a single JSON object and nothing else:\n\
         {{\"credit\": 0 | 0.5 | 1, \"color\": \"green\" | \"yellow\" | \"red\", \
         \"notes\": \"evidence from the transcript\", \"reasoning\": \"why this credit\"}}\n\
         \n\
         Transcript:\n{transcript}",
        name = step.name,
        weight = step.weight,
        rubric = step.rubric(),
        transcript = transcript,
    )
}

/// Message asking the assistant for coaching feedback given all step results
pub fn coaching_prompt(transcript: &str, step_scores: &[StepScore]) -> String {
    let results = step_scores
        .iter()
        .map(|s| {
            format!(
                "- {} (weight {}): credit {}, {}. Notes: {}",
                s.step_name,
                s.weight,
                s.credit,
                s.color().as_str(),
                s.notes
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a sales coach. Using the transcript and the step-by-step scores below, write \
         coaching feedback for the rep.\n\
         \n\
         Step results:\n{results}\n\
         \n\
         Respond with a single JSON object and nothing else:\n\
         {{\"thingsTheyDidWell\": [three short strings], \
         \"areasForImprovement\": [three objects of the form \
         {{\"area\": string, \"howToImprove\": string, \"bridgeStep\": string}}]}}\n\
         \n\
         Transcript:\n{transcript}",
        results = results,
        transcript = transcript,
    )
}
