//! Question bank loading.
//!
//! The bank is a JSON array of records. Field names may be English or
//! Chinese (`question`/`题干`, `options`/`选项`, `answer`/`正确答案`,
//! `explanation`/`解析`). Records that fail normalization are dropped and
//! listed in the returned [`Bank`] so the caller can log them; multi-select
//! is detected by the answer being an array or a `|`-separated string.

use crate::error::BankError;
use crate::grading::choice_letter;
use crate::types::{CorrectAnswer, Question, QuestionId};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// A loaded bank: the usable questions plus the records that were dropped.
#[derive(Debug, Clone)]
pub struct Bank {
    pub questions: Vec<Question>,
    pub dropped: Vec<Dropped>,
}

/// One record that did not survive normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dropped {
    /// Ordinal position of the record in the bank file.
    pub index: usize,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingField,
    BadAnswer,
    LetterMismatch,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField => write!(f, "record is missing a required field"),
            Self::BadAnswer => write!(f, "answer has no usable choice letters"),
            Self::LetterMismatch => write!(f, "answer letter does not match any option"),
        }
    }
}

/// Load and normalize a question bank file.
pub fn load(path: &Path) -> Result<Bank, BankError> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

/// Parse question bank content into normalized questions.
///
/// Ids are the record's ordinal position in the bank file, so dropping an
/// invalid record leaves a gap rather than renumbering everything after it.
pub fn parse(content: &str) -> Result<Bank, BankError> {
    let data: Value = serde_json::from_str(content)?;
    let records = data.as_array().ok_or(BankError::NotAnArray)?;

    let mut questions = Vec::new();
    let mut dropped = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        match normalize(idx as QuestionId, record) {
            Ok(question) => questions.push(question),
            Err(reason) => dropped.push(Dropped { index: idx, reason }),
        }
    }

    if questions.is_empty() {
        return Err(BankError::NoQuestions);
    }
    Ok(Bank { questions, dropped })
}

fn field<'a>(record: &'a Value, english: &str, localized: &str) -> Option<&'a Value> {
    record.get(english).or_else(|| record.get(localized))
}

fn normalize(id: QuestionId, record: &Value) -> Result<Question, DropReason> {
    let text = field(record, "question", "题干")
        .and_then(Value::as_str)
        .ok_or(DropReason::MissingField)?
        .to_string();

    let options: Vec<String> = field(record, "options", "选项")
        .and_then(Value::as_array)
        .ok_or(DropReason::MissingField)?
        .iter()
        .map(|opt| match opt.as_str() {
            Some(s) => s.to_string(),
            None => opt.to_string(),
        })
        .collect();
    if options.is_empty() {
        return Err(DropReason::MissingField);
    }

    let raw_answer = field(record, "answer", "正确答案").ok_or(DropReason::MissingField)?;
    let answer = normalize_answer(raw_answer).ok_or(DropReason::BadAnswer)?;

    // every answer letter must name one of the options
    let option_letters: BTreeSet<String> = options.iter().map(|o| choice_letter(o)).collect();
    let valid = match &answer {
        CorrectAnswer::Single(letter) => option_letters.contains(letter),
        CorrectAnswer::Multiple(letters) => {
            !letters.is_empty() && letters.iter().all(|l| option_letters.contains(l))
        }
    };
    if !valid {
        return Err(DropReason::LetterMismatch);
    }

    let explanation = field(record, "explanation", "解析")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(Question {
        id,
        text,
        options,
        answer,
        explanation,
    })
}

fn normalize_answer(raw: &Value) -> Option<CorrectAnswer> {
    match raw {
        Value::Array(letters) => {
            let set: BTreeSet<String> = letters
                .iter()
                .filter_map(Value::as_str)
                .map(|l| l.trim().to_uppercase())
                .collect();
            if set.is_empty() {
                None
            } else {
                Some(CorrectAnswer::Multiple(set))
            }
        }
        Value::String(s) if s.contains('|') => {
            let set: BTreeSet<String> =
                s.split('|').map(|l| l.trim().to_uppercase()).collect();
            Some(CorrectAnswer::Multiple(set))
        }
        Value::String(s) => {
            let letter = s.trim().to_uppercase();
            if letter.is_empty() {
                None
            } else {
                Some(CorrectAnswer::Single(letter))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_english_records() {
        let content = r#"[
            {"question": "Capital of France?",
             "options": ["A. Paris", "B. Lyon"],
             "answer": "a",
             "explanation": "Paris is the capital."}
        ]"#;
        let bank = parse(content).unwrap();
        assert_eq!(bank.questions.len(), 1);
        assert!(bank.dropped.is_empty());
        assert_eq!(bank.questions[0].id, 0);
        assert_eq!(bank.questions[0].answer, CorrectAnswer::Single("A".into()));
        assert_eq!(
            bank.questions[0].explanation.as_deref(),
            Some("Paris is the capital.")
        );
    }

    #[test]
    fn parse_localized_records() {
        let content = r#"[
            {"题干": "选择正确项", "选项": ["A. 对", "B. 错"], "正确答案": "B"}
        ]"#;
        let questions = parse(content).unwrap().questions;
        assert_eq!(questions[0].text, "选择正确项");
        assert_eq!(questions[0].answer, CorrectAnswer::Single("B".into()));
        assert_eq!(questions[0].explanation, None);
    }

    #[test]
    fn multi_select_from_pipe_separated_answer() {
        let content = r#"[
            {"question": "pick", "options": ["A. x", "B. y", "C. z"], "answer": "b|C"}
        ]"#;
        let questions = parse(content).unwrap().questions;
        assert_eq!(
            questions[0].answer,
            CorrectAnswer::Multiple(["B".to_string(), "C".to_string()].into())
        );
    }

    #[test]
    fn multi_select_from_array_answer() {
        let content = r#"[
            {"question": "pick", "options": ["A. x", "B. y"], "answer": ["A", "b"]}
        ]"#;
        let questions = parse(content).unwrap().questions;
        assert!(questions[0].is_multi_select());
    }

    #[test]
    fn invalid_records_are_dropped_and_ids_keep_gaps() {
        let content = r#"[
            {"question": "ok 0", "options": ["A. x"], "answer": "A"},
            {"question": "no options", "answer": "A"},
            {"options": ["A. x"], "answer": "A"},
            {"question": "ok 3", "options": ["A. x"], "answer": "A"}
        ]"#;
        let bank = parse(content).unwrap();
        let ids: Vec<u32> = bank.questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![0, 3]);
        assert_eq!(
            bank.dropped,
            vec![
                Dropped {
                    index: 1,
                    reason: DropReason::MissingField
                },
                Dropped {
                    index: 2,
                    reason: DropReason::MissingField
                },
            ]
        );
    }

    #[test]
    fn answer_letter_must_match_an_option() {
        let content = r#"[
            {"question": "bad", "options": ["A. x", "B. y"], "answer": "C"},
            {"question": "bad multi", "options": ["A. x", "B. y"], "answer": "A|C"},
            {"question": "good", "options": ["A. x", "B. y"], "answer": "B"}
        ]"#;
        let bank = parse(content).unwrap();
        assert_eq!(bank.questions.len(), 1);
        assert_eq!(bank.questions[0].text, "good");
        assert!(bank
            .dropped
            .iter()
            .all(|d| d.reason == DropReason::LetterMismatch));
        assert_eq!(bank.dropped.len(), 2);
    }

    #[test]
    fn non_array_bank_is_rejected() {
        assert!(matches!(parse("{}"), Err(BankError::NotAnArray)));
    }

    #[test]
    fn empty_bank_is_rejected() {
        assert!(matches!(parse("[]"), Err(BankError::NoQuestions)));
        let all_invalid = r#"[{"question": "x"}]"#;
        assert!(matches!(parse(all_invalid), Err(BankError::NoQuestions)));
    }
}
