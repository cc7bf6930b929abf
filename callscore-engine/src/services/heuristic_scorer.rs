//! Local heuristic scorer
//!
//! Deterministic, case-insensitive keyword/pattern analysis of a transcript.
//! No I/O, never fails: every call returns a complete `CallScore` whose step
//! scores match the rubric it was given.
//!
//! **Counting rules:** keyword and phrase groups count *distinct* entries found
//! at the start of a word in the lowercased transcript ("problems" counts as
//! "problem", "tissues" does not count as "issue"); pattern groups count
//! distinct patterns that match at least once; question marks are counted
//! literally. Typographic apostrophes are folded to `'` before matching.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{
    canonical_bridge_steps, BridgeStep, CallScore, CanonicalStep, Coaching, ImprovementArea,
    ScoreCredit, ScoringMethod, StepScore,
};

// ============================================================================
// Rule tables
// ============================================================================

const PAIN_KEYWORDS: &[&str] = &[
    "problem", "issue", "challenge", "struggle", "difficulty", "pain", "frustrating",
    "annoying", "costing", "losing", "waste", "inefficient",
];

const PAIN_QUESTION_PATTERNS: &[&str] = &[
    r"what[^.?!]*problem",
    r"what[^.?!]*challenge",
    r"how[^.?!]*affecting",
    r"how[^.?!]*impact",
    r"why[^.?!]*(difficult|struggl|frustrat)",
    r"what[^.?!]*cost",
];

const BUDGET_KEYWORDS: &[&str] = &[
    "budget", "price", "pricing", "invest", "spend", "afford", "cost",
];

const AUTHORITY_KEYWORDS: &[&str] = &[
    "decision maker", "decision-maker", "decide", "decision", "approve", "approval",
    "sign off", "sign-off", "stakeholder", "authority",
];

const TIMELINE_KEYWORDS: &[&str] = &[
    "timeline", "timeframe", "time frame", "deadline", "by when", "this quarter",
    "next quarter", "end of the month", "end of the year", "go live", "go-live",
    "implement by",
];

const SOLUTION_KEYWORDS: &[&str] = &[
    "solution", "solve", "fix", "address", "help", "benefit", "advantage", "feature",
    "capability", "outcome", "result",
];

const EXAMPLE_KEYWORDS: &[&str] = &[
    "for example", "for instance", "case study", "customers like", "one of our clients",
    "one of our customers", "we helped", "we've helped", "similar company", "testimonial",
    "success story",
];

const OBJECTION_KEYWORDS: &[&str] = &[
    "concern", "worried", "worry", "hesitant", "objection", "not sure", "too expensive",
    "push back", "pushback", "understand your", "fair question", "good question",
    "great question",
];

const NEXT_STEP_PHRASES: &[&str] = &[
    "next step", "follow up", "follow-up", "move forward", "moving forward", "action item",
    "going forward", "after this call",
];

const ACTION_PHRASES: &[&str] = &[
    "i will", "i'll", "we will", "we'll", "i'm going to", "we're going to", "let's",
    "commit", "agree to", "send over", "send you",
];

const CLOSE_KEYWORDS: &[&str] = &[
    "sign the contract", "sign the agreement", "purchase order", "ready to buy",
    "ready to sign", "ready to move ahead", "close the deal", "get started today",
    "let's get started", "send the contract", "send over the contract",
];

const SCHEDULE_KEYWORDS: &[&str] = &[
    "schedule", "calendar", "book a", "set up a meeting", "set up a call", "meeting",
    "demo",
];

const DATE_TIME_PATTERNS: &[&str] = &[
    r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
    r"\b(tomorrow|next week)\b",
    r"\b\d{1,2}(:\d{2})?\s?(am|pm)\b",
    r"\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}",
    r"\b\d{1,2}/\d{1,2}\b",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static heuristic pattern must compile"))
        .collect()
}

static PAIN_QUESTION_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| compile(PAIN_QUESTION_PATTERNS));
static DATE_TIME_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| compile(DATE_TIME_PATTERNS));

fn starts_word_at(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(i, _)| {
        text[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

fn matched_keywords<'a>(text: &str, keywords: &[&'a str]) -> Vec<&'a str> {
    keywords.iter().copied().filter(|k| starts_word_at(text, k)).collect()
}

/// Lowercase and fold typographic apostrophes
fn normalize(transcript: &str) -> String {
    transcript.to_lowercase().replace('\u{2019}', "'")
}

fn matched_patterns(text: &str, patterns: &[Regex]) -> usize {
    patterns.iter().filter(|re| re.is_match(text)).count()
}

fn list(found: &[&str]) -> String {
    if found.is_empty() {
        "none".to_string()
    } else {
        found.join(", ")
    }
}

// ============================================================================
// Scorer
// ============================================================================

/// Deterministic text-pattern scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHeuristicScorer;

impl LocalHeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score against the canonical six-step rubric
    pub fn score(&self, transcript: &str) -> CallScore {
        self.score_with_steps(transcript, &canonical_bridge_steps())
    }

    /// Score against a configured rubric, timestamped now
    pub fn score_with_steps(&self, transcript: &str, steps: &[BridgeStep]) -> CallScore {
        self.score_at(transcript, steps, Utc::now())
    }

    /// Fully pure variant: identical inputs give identical output
    pub fn score_at(&self, transcript: &str, steps: &[BridgeStep], scored_at: DateTime<Utc>) -> CallScore {
        let step_scores = self.evaluate_steps(transcript, steps);
        let coaching = local_coaching(&step_scores);

        let mut score = CallScore::assemble(step_scores, Some(coaching), ScoringMethod::Local);
        score.scored_at = scored_at;
        score
    }

    /// Per-step scores ordered by `BridgeStep::order`
    ///
    /// Steps without a local heuristic get credit 0 and a note saying so.
    pub fn evaluate_steps(&self, transcript: &str, steps: &[BridgeStep]) -> Vec<StepScore> {
        let text = normalize(transcript);

        let mut ordered: Vec<&BridgeStep> = steps.iter().collect();
        ordered.sort_by_key(|s| s.order);

        ordered
            .into_iter()
            .map(|step| {
                let (credit, notes) = match step.canonical() {
                    Some(canonical) => evaluate(canonical, &text),
                    None => (
                        ScoreCredit::None,
                        format!("No local heuristic available for step '{}'", step.key),
                    ),
                };
                StepScore::new(step, credit, notes)
            })
            .collect()
    }
}

/// Evaluate one canonical dimension against lowercased text
pub fn evaluate(step: CanonicalStep, text: &str) -> (ScoreCredit, String) {
    match step {
        CanonicalStep::PinpointPain => pinpoint_pain(text),
        CanonicalStep::Qualify => qualify(text),
        CanonicalStep::SolutionSuccess => solution_success(text),
        CanonicalStep::QandA => questions_and_answers(text),
        CanonicalStep::NextSteps => next_steps(text),
        CanonicalStep::CloseOrSchedule => close_or_schedule(text),
    }
}

fn pinpoint_pain(text: &str) -> (ScoreCredit, String) {
    let keywords = matched_keywords(text, PAIN_KEYWORDS);
    let questions = matched_patterns(text, &PAIN_QUESTION_REGEXES);

    let credit = if keywords.len() >= 3 && questions >= 2 {
        ScoreCredit::Full
    } else if keywords.len() >= 2 || questions >= 1 {
        ScoreCredit::Partial
    } else {
        ScoreCredit::None
    };

    let notes = format!(
        "Pain keywords: {} ({}); pain-discovery questions: {}",
        keywords.len(),
        list(&keywords),
        questions
    );
    (credit, notes)
}

fn qualify(text: &str) -> (ScoreCredit, String) {
    let budget = matched_keywords(text, BUDGET_KEYWORDS);
    let authority = matched_keywords(text, AUTHORITY_KEYWORDS);
    let timeline = matched_keywords(text, TIMELINE_KEYWORDS);

    let groups = [&budget, &authority, &timeline]
        .iter()
        .filter(|found| !found.is_empty())
        .count();

    let credit = match groups {
        3 => ScoreCredit::Full,
        2 => ScoreCredit::Partial,
        _ => ScoreCredit::None,
    };

    let notes = format!(
        "Qualification groups present: {}/3 (budget: {}; authority: {}; timeline: {})",
        groups,
        list(&budget),
        list(&authority),
        list(&timeline)
    );
    (credit, notes)
}

fn solution_success(text: &str) -> (ScoreCredit, String) {
    let keywords = matched_keywords(text, SOLUTION_KEYWORDS);
    let examples = matched_keywords(text, EXAMPLE_KEYWORDS);

    let credit = if keywords.len() >= 4 && !examples.is_empty() {
        ScoreCredit::Full
    } else if keywords.len() >= 2 {
        ScoreCredit::Partial
    } else {
        ScoreCredit::None
    };

    let notes = format!(
        "Solution keywords: {} ({}); proof/example present: {}",
        keywords.len(),
        list(&keywords),
        if examples.is_empty() { "no".to_string() } else { format!("yes ({})", list(&examples)) }
    );
    (credit, notes)
}

fn questions_and_answers(text: &str) -> (ScoreCredit, String) {
    let questions = text.matches('?').count();
    let objections = matched_keywords(text, OBJECTION_KEYWORDS);

    let credit = if questions >= 5 && objections.len() >= 2 {
        ScoreCredit::Full
    } else if questions >= 3 || !objections.is_empty() {
        ScoreCredit::Partial
    } else {
        ScoreCredit::None
    };

    let notes = format!(
        "Question marks: {}; objection-handling keywords: {} ({})",
        questions,
        objections.len(),
        list(&objections)
    );
    (credit, notes)
}

fn next_steps(text: &str) -> (ScoreCredit, String) {
    let steps = matched_keywords(text, NEXT_STEP_PHRASES);
    let actions = matched_keywords(text, ACTION_PHRASES);

    let credit = if steps.len() >= 2 && actions.len() >= 2 {
        ScoreCredit::Full
    } else if !steps.is_empty() || !actions.is_empty() {
        ScoreCredit::Partial
    } else {
        ScoreCredit::None
    };

    let notes = format!(
        "Next-step phrases: {} ({}); action commitments: {} ({})",
        steps.len(),
        list(&steps),
        actions.len(),
        list(&actions)
    );
    (credit, notes)
}

fn close_or_schedule(text: &str) -> (ScoreCredit, String) {
    let close = matched_keywords(text, CLOSE_KEYWORDS);
    let schedule = matched_keywords(text, SCHEDULE_KEYWORDS);
    let dated = matched_patterns(text, &DATE_TIME_REGEXES) > 0;

    let credit = if !close.is_empty() || (!schedule.is_empty() && dated) {
        ScoreCredit::Full
    } else if !schedule.is_empty() {
        ScoreCredit::Partial
    } else {
        ScoreCredit::None
    };

    let notes = format!(
        "Close keywords: {} ({}); schedule keywords: {} ({}); date/time mentioned: {}",
        close.len(),
        list(&close),
        schedule.len(),
        list(&schedule),
        if dated { "yes" } else { "no" }
    );
    (credit, notes)
}

// ============================================================================
// Coaching
// ============================================================================

fn improvement_tip(step: &StepScore) -> String {
    match CanonicalStep::from_key(&step.step) {
        Some(CanonicalStep::PinpointPain) => {
            "Ask open questions about the prospect's problems and how they are affecting the business."
        }
        Some(CanonicalStep::Qualify) => {
            "Cover budget, decision-making authority and timeline before presenting."
        }
        Some(CanonicalStep::SolutionSuccess) => {
            "Tie each capability to the stated pain and back it with a customer example."
        }
        Some(CanonicalStep::QandA) => {
            "Invite questions throughout and address concerns directly."
        }
        Some(CanonicalStep::NextSteps) => {
            "Agree on concrete next steps with owners before ending the call."
        }
        Some(CanonicalStep::CloseOrSchedule) => {
            "Ask for the business or book a follow-up with a specific date and time."
        }
        None => "Review this step against the rubric and practise it on the next call.",
    }
    .to_string()
}

/// Coaching derived from step credits: full-credit steps are strengths, the
/// lowest-credit steps (up to three) are improvement areas
fn local_coaching(step_scores: &[StepScore]) -> Coaching {
    let things_they_did_well: Vec<String> = step_scores
        .iter()
        .filter(|s| s.credit == ScoreCredit::Full)
        .map(|s| format!("{}: {}", s.step_name, s.notes))
        .collect();

    let mut weakest: Vec<&StepScore> = step_scores
        .iter()
        .filter(|s| s.credit != ScoreCredit::Full)
        .collect();
    // Stable sort keeps rubric order among equal credits; heavier steps first
    weakest.sort_by(|a, b| {
        a.credit
            .value()
            .total_cmp(&b.credit.value())
            .then(b.weight.cmp(&a.weight))
    });

    let areas_for_improvement = weakest
        .into_iter()
        .take(3)
        .map(|s| ImprovementArea {
            area: s.step_name.clone(),
            how_to_improve: improvement_tip(s),
            bridge_step: s.step.clone(),
        })
        .collect();

    Coaching {
        things_they_did_well,
        areas_for_improvement,
    }
}
