//! Record types and request/response models for the four record kinds.
//!
//! Every persisted record carries a store-assigned numeric `id` and a
//! store-assigned `created_at`; neither is ever writable by callers. Update
//! requests wrap every field in `Option` so that omitted fields are
//! distinguishable from supplied values and never touch storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Error, Result};

// =============================================================================
// ENUMS
// =============================================================================

/// Classification of a captured thought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThoughtKind {
    Idea,
    Task,
    Observation,
    Reminder,
    Question,
    Note,
}

impl ThoughtKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idea => "idea",
            Self::Task => "task",
            Self::Observation => "observation",
            Self::Reminder => "reminder",
            Self::Question => "question",
            Self::Note => "note",
        }
    }
}

impl std::fmt::Display for ThoughtKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThoughtKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "idea" => Ok(Self::Idea),
            "task" => Ok(Self::Task),
            "observation" => Ok(Self::Observation),
            "reminder" => Ok(Self::Reminder),
            "question" => Ok(Self::Question),
            "note" => Ok(Self::Note),
            other => Err(Error::Validation(format!("unknown thought type: {other}"))),
        }
    }
}

/// Urgency level attached to thoughts (`priority`) and experiences
/// (`importance`). Both fields share the same three-valued scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(Error::Validation(format!("unknown urgency level: {other}"))),
        }
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for list operations.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Upper bound on page size for list operations.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Pagination window for list operations.
///
/// Constructed only through [`Page::new`], which rejects out-of-range input,
/// so a `Page` is always safe to interpolate into a `LIMIT ... OFFSET ...`
/// clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    /// Build a page from raw caller input. A `limit` outside `[1, 100]` or a
    /// negative `offset` is the caller's mistake and is rejected rather than
    /// adjusted.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(Error::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        let offset = offset.unwrap_or(0);
        if offset < 0 {
            return Err(Error::Validation("offset must not be negative".into()));
        }
        Ok(Self { limit, offset })
    }
}

// =============================================================================
// THOUGHTS
// =============================================================================

/// A captured free-form thought, possibly enriched by the language model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    pub id: i32,
    /// Raw text as captured (typed or transcribed).
    pub transcription: String,
    /// Cleaned-up version produced by enrichment; empty when unenriched.
    pub processed: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Option<ThoughtKind>,
    pub priority: Option<Urgency>,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Structured result of language-model enrichment over raw thought text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtAnalysis {
    pub processed: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub kind: ThoughtKind,
    #[serde(default)]
    pub priority: Option<Urgency>,
    pub summary: String,
}

impl ThoughtAnalysis {
    /// Placeholder analysis for thoughts stored without enrichment.
    pub fn empty() -> Self {
        Self {
            processed: String::new(),
            categories: Vec::new(),
            tags: Vec::new(),
            kind: ThoughtKind::Note,
            priority: None,
            summary: String::new(),
        }
    }
}

/// Payload for storing a new thought.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThoughtRequest {
    pub transcription: String,
    #[serde(flatten)]
    pub analysis: ThoughtAnalysis,
}

impl CreateThoughtRequest {
    pub fn validate(&self) -> Result<()> {
        if self.transcription.trim().is_empty() {
            return Err(Error::Validation("transcription must not be empty".into()));
        }
        Ok(())
    }
}

/// Sparse update for a thought; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateThoughtRequest {
    pub transcription: Option<String>,
    pub processed: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub kind: Option<ThoughtKind>,
    pub priority: Option<Urgency>,
    pub summary: Option<String>,
}

// =============================================================================
// PROCEDURES AND STEPS
// =============================================================================

/// A single step inside a procedure. Owned exclusively by its procedure;
/// removed only when the procedure is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: i32,
    pub procedure_id: i32,
    pub content: String,
    /// Presentation position within the procedure; unique per procedure.
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

/// A procedure with its full ordered step list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub trigger_phrases: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Steps ordered ascending by `order`.
    pub steps: Vec<Step>,
}

/// Listing row for procedures: step count instead of the step payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureSummary {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub trigger_phrases: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub step_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProcedureRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub trigger_phrases: Vec<String>,
}

impl CreateProcedureRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("title must not be empty".into()));
        }
        Ok(())
    }
}

/// Sparse update for a procedure; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProcedureRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub trigger_phrases: Option<Vec<String>>,
}

/// One incoming step in a bulk insertion.
///
/// A missing or non-positive `order` requests auto-assignment: the store
/// continues from the highest order already present in the procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStep {
    pub content: String,
    #[serde(default)]
    pub order: Option<i32>,
}

impl NewStep {
    /// Explicit order if the caller supplied a positive value.
    pub fn explicit_order(&self) -> Option<i32> {
        self.order.filter(|o| *o > 0)
    }
}

/// Batch of steps to append to a procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddStepsRequest {
    pub steps: Vec<NewStep>,
}

impl AddStepsRequest {
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::Validation("steps must not be empty".into()));
        }
        if self.steps.iter().any(|s| s.content.trim().is_empty()) {
            return Err(Error::Validation("step content must not be empty".into()));
        }
        Ok(())
    }
}

/// Update for a single step. Omitting `order` retains the current position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStepRequest {
    pub content: String,
    #[serde(default)]
    pub order: Option<i32>,
}

impl UpdateStepRequest {
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(Error::Validation("step content must not be empty".into()));
        }
        Ok(())
    }
}

// =============================================================================
// TECHNICAL DECISIONS
// =============================================================================

/// An alternative that was considered but not chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeOption {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
}

/// A recorded technical decision with its context and reasoning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalDecision {
    pub id: i32,
    pub title: String,
    pub context: String,
    pub decision: String,
    pub reasoning: String,
    pub alternatives: Vec<AlternativeOption>,
    pub consequences: Vec<String>,
    pub tags: Vec<String>,
    pub related_resources: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDecisionRequest {
    pub title: String,
    pub context: String,
    pub decision: String,
    pub reasoning: String,
    #[serde(default)]
    pub alternatives: Vec<AlternativeOption>,
    #[serde(default)]
    pub consequences: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_resources: Vec<String>,
}

impl CreateDecisionRequest {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("title", &self.title),
            ("context", &self.context),
            ("decision", &self.decision),
            ("reasoning", &self.reasoning),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Sparse update for a technical decision.
///
/// `alternatives` is replaced whole when supplied; individual entries cannot
/// be patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDecisionRequest {
    pub title: Option<String>,
    pub context: Option<String>,
    pub decision: Option<String>,
    pub reasoning: Option<String>,
    pub alternatives: Option<Vec<AlternativeOption>>,
    pub consequences: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub related_resources: Option<Vec<String>>,
}

// =============================================================================
// EXPERIENCES
// =============================================================================

/// A past experience: situation faced, actions taken, outcome, learnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub id: i32,
    pub title: String,
    pub situation: String,
    pub actions: Vec<String>,
    pub outcome: String,
    pub learnings: Vec<String>,
    pub context: Option<String>,
    pub tags: Vec<String>,
    pub related_resources: Vec<String>,
    pub importance: Option<Urgency>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExperienceRequest {
    pub title: String,
    pub situation: String,
    #[serde(default)]
    pub actions: Vec<String>,
    pub outcome: String,
    #[serde(default)]
    pub learnings: Vec<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_resources: Vec<String>,
    #[serde(default)]
    pub importance: Option<Urgency>,
}

impl CreateExperienceRequest {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("title", &self.title),
            ("situation", &self.situation),
            ("outcome", &self.outcome),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Sparse update for an experience.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExperienceRequest {
    pub title: Option<String>,
    pub situation: Option<String>,
    pub actions: Option<Vec<String>>,
    pub outcome: Option<String>,
    pub learnings: Option<Vec<String>>,
    pub context: Option<String>,
    pub tags: Option<Vec<String>>,
    pub related_resources: Option<Vec<String>>,
    pub importance: Option<Urgency>,
}

/// Filters for listing technical decisions and experiences.
///
/// `tags` is superset containment: a record matches only when its tag set
/// contains every filter tag.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub tags: Vec<String>,
    pub importance: Option<Urgency>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thought_kind_serde_lowercase() {
        let json = serde_json::to_string(&ThoughtKind::Observation).unwrap();
        assert_eq!(json, "\"observation\"");
        let parsed: ThoughtKind = serde_json::from_str("\"reminder\"").unwrap();
        assert_eq!(parsed, ThoughtKind::Reminder);
    }

    #[test]
    fn test_thought_kind_rejects_unknown() {
        assert!(serde_json::from_str::<ThoughtKind>("\"musing\"").is_err());
        assert!("musing".parse::<ThoughtKind>().is_err());
    }

    #[test]
    fn test_urgency_round_trip() {
        for u in [Urgency::Low, Urgency::Medium, Urgency::High] {
            let parsed: Urgency = u.as_str().parse().unwrap();
            assert_eq!(parsed, u);
        }
    }

    #[test]
    fn test_page_defaults_when_unspecified() {
        let page = Page::new(None, None).unwrap();
        assert_eq!(page.limit, 10);
        assert_eq!(page.offset, 0);
    }

    #[test]
    fn test_page_accepts_in_range_input() {
        let page = Page::new(Some(100), Some(25)).unwrap();
        assert_eq!(page.limit, 100);
        assert_eq!(page.offset, 25);
    }

    #[test]
    fn test_page_rejects_out_of_range_limit() {
        for limit in [0, -3, 101, 500] {
            assert!(matches!(
                Page::new(Some(limit), None),
                Err(Error::Validation(_))
            ));
        }
    }

    #[test]
    fn test_page_rejects_negative_offset() {
        assert!(matches!(
            Page::new(None, Some(-1)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_new_step_explicit_order() {
        let auto = NewStep {
            content: "build".into(),
            order: None,
        };
        assert_eq!(auto.explicit_order(), None);

        let zero = NewStep {
            content: "build".into(),
            order: Some(0),
        };
        assert_eq!(zero.explicit_order(), None, "non-positive requests auto");

        let explicit = NewStep {
            content: "build".into(),
            order: Some(3),
        };
        assert_eq!(explicit.explicit_order(), Some(3));
    }

    #[test]
    fn test_create_thought_rejects_blank_transcription() {
        let req = CreateThoughtRequest {
            transcription: "   ".into(),
            analysis: ThoughtAnalysis::empty(),
        };
        assert!(matches!(req.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_create_decision_requires_all_core_fields() {
        let req = CreateDecisionRequest {
            title: "Adopt sqlx".into(),
            context: "need a db layer".into(),
            decision: "use sqlx".into(),
            reasoning: "".into(),
            alternatives: vec![],
            consequences: vec![],
            tags: vec![],
            related_resources: vec![],
        };
        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("reasoning"));
    }

    #[test]
    fn test_add_steps_rejects_empty_batch() {
        let req = AddStepsRequest { steps: vec![] };
        assert!(matches!(req.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_thought_analysis_type_field_rename() {
        let json = r#"{
            "processed": "Buy milk on the way home",
            "categories": ["errand"],
            "tags": ["shopping"],
            "type": "task",
            "priority": "low",
            "summary": "Milk run"
        }"#;
        let analysis: ThoughtAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.kind, ThoughtKind::Task);
        assert_eq!(analysis.priority, Some(Urgency::Low));
    }

    #[test]
    fn test_thought_analysis_priority_defaults_to_none() {
        let json = r#"{
            "processed": "x",
            "categories": [],
            "tags": [],
            "type": "note",
            "summary": ""
        }"#;
        let analysis: ThoughtAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(analysis.priority, None);
    }

    #[test]
    fn test_alternative_option_defaults() {
        let json = r#"{"name": "Diesel", "description": "Full ORM"}"#;
        let alt: AlternativeOption = serde_json::from_str(json).unwrap();
        assert!(alt.pros.is_empty());
        assert!(alt.cons.is_empty());
    }
}
