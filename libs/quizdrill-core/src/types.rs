//! Core types for the quiz trainer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stable question identifier.
///
/// Assigned from the record's ordinal position in the bank file, so ids stay
/// stable as long as existing records are not reordered.
pub type QuestionId = u32;

/// The correct answer for a question.
///
/// The variant is the single source of truth for whether a question is
/// single-select or multi-select; grading dispatches on it rather than
/// inspecting value shapes at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    /// One choice letter, e.g. "A".
    Single(String),
    /// The full required set of choice letters, e.g. {"B", "C"}.
    Multiple(BTreeSet<String>),
}

/// A normalized multiple-choice question.
///
/// Options carry their choice-letter prefix as rendered, e.g. "A. Paris".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub options: Vec<String>,
    pub answer: CorrectAnswer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    pub fn is_multi_select(&self) -> bool {
        matches!(self.answer, CorrectAnswer::Multiple(_))
    }
}

/// A user-submitted answer, holding option strings as rendered.
///
/// Serializes untagged so the persisted form is a plain string for
/// single-select and an array for multi-select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Submission {
    Single(String),
    Multiple(Vec<String>),
}

impl Submission {
    /// True when nothing was actually selected.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Single(text) => text.trim().is_empty(),
            Self::Multiple(texts) => texts.is_empty(),
        }
    }
}

/// Question-type filter applied before batch generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFilter {
    All,
    SingleOnly,
    MultiOnly,
}

impl Default for TypeFilter {
    fn default() -> Self {
        Self::All
    }
}

impl TypeFilter {
    pub fn matches(&self, question: &Question) -> bool {
        match self {
            Self::All => true,
            Self::SingleOnly => !question.is_multi_select(),
            Self::MultiOnly => question.is_multi_select(),
        }
    }
}

/// Which batch generator entry point is used when a new round starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizMode {
    Normal,
    ErrorDrill,
}

impl Default for QuizMode {
    fn default() -> Self {
        Self::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(id: QuestionId) -> Question {
        Question {
            id,
            text: "capital?".into(),
            options: vec!["A. Paris".into(), "B. Lyon".into()],
            answer: CorrectAnswer::Single("A".into()),
            explanation: None,
        }
    }

    fn multi(id: QuestionId) -> Question {
        Question {
            id,
            text: "pick two".into(),
            options: vec!["A. x".into(), "B. y".into(), "C. z".into()],
            answer: CorrectAnswer::Multiple(["B".to_string(), "C".to_string()].into()),
            explanation: None,
        }
    }

    #[test]
    fn filter_matches_by_kind() {
        assert!(TypeFilter::All.matches(&single(0)));
        assert!(TypeFilter::All.matches(&multi(1)));
        assert!(TypeFilter::SingleOnly.matches(&single(0)));
        assert!(!TypeFilter::SingleOnly.matches(&multi(1)));
        assert!(TypeFilter::MultiOnly.matches(&multi(1)));
        assert!(!TypeFilter::MultiOnly.matches(&single(0)));
    }

    #[test]
    fn blank_submissions() {
        assert!(Submission::Single("  ".into()).is_blank());
        assert!(Submission::Multiple(vec![]).is_blank());
        assert!(!Submission::Single("A. Paris".into()).is_blank());
        assert!(!Submission::Multiple(vec!["B. y".into()]).is_blank());
    }

    #[test]
    fn submission_wire_format_is_untagged() {
        let one = serde_json::to_string(&Submission::Single("A. Paris".into())).unwrap();
        assert_eq!(one, "\"A. Paris\"");
        let many =
            serde_json::to_string(&Submission::Multiple(vec!["B. y".into(), "C. z".into()]))
                .unwrap();
        assert_eq!(many, "[\"B. y\",\"C. z\"]");
    }
}
