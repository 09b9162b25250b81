//! Answer grading.
//!
//! An option string carries its choice letter as a prefix ("A. Paris"); the
//! letter is everything before the first `.`, trimmed and uppercased. Grading
//! compares letters, never full option text, so cosmetic edits to option
//! wording do not invalidate stored progress.

use crate::error::GradeError;
use crate::types::{CorrectAnswer, Question, Submission};
use std::collections::BTreeSet;

/// Extract the choice letter from an option or submission string.
pub fn choice_letter(option: &str) -> String {
    option
        .split('.')
        .next()
        .unwrap_or("")
        .trim()
        .to_uppercase()
}

/// Grade a submission against a question.
///
/// Multi-select requires exact set equality: one missing or one extra
/// selection marks the whole answer wrong. Blank submissions and
/// single/multi shape mismatches are rejected before any grading happens.
pub fn grade(question: &Question, submitted: &Submission) -> Result<bool, GradeError> {
    if submitted.is_blank() {
        return Err(GradeError::EmptySubmission);
    }

    match (&question.answer, submitted) {
        (CorrectAnswer::Single(expected), Submission::Single(text)) => {
            Ok(choice_letter(text) == *expected)
        }
        (CorrectAnswer::Multiple(expected), Submission::Multiple(texts)) => {
            let chosen: BTreeSet<String> = texts.iter().map(|t| choice_letter(t)).collect();
            Ok(chosen == *expected)
        }
        _ => Err(GradeError::SelectionMismatch),
    }
}

/// The full option texts for a question's correct answer, for result display.
pub fn correct_option_texts(question: &Question) -> Vec<String> {
    match &question.answer {
        CorrectAnswer::Single(letter) => question
            .options
            .iter()
            .filter(|opt| choice_letter(opt) == *letter)
            .cloned()
            .collect(),
        CorrectAnswer::Multiple(letters) => question
            .options
            .iter()
            .filter(|opt| letters.contains(&choice_letter(opt)))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paris() -> Question {
        Question {
            id: 0,
            text: "Capital of France?".into(),
            options: vec!["A. Paris".into(), "B. Lyon".into()],
            answer: CorrectAnswer::Single("A".into()),
            explanation: None,
        }
    }

    fn pick_bc() -> Question {
        Question {
            id: 1,
            text: "Pick B and C".into(),
            options: vec!["A. w".into(), "B. x".into(), "C. y".into(), "D. z".into()],
            answer: CorrectAnswer::Multiple(["B".to_string(), "C".to_string()].into()),
            explanation: None,
        }
    }

    #[test]
    fn letter_extraction() {
        assert_eq!(choice_letter("A. Paris"), "A");
        assert_eq!(choice_letter("  b .  Lyon"), "B");
        assert_eq!(choice_letter("C"), "C");
        assert_eq!(choice_letter(""), "");
    }

    #[test]
    fn single_select_grading() {
        let q = paris();
        assert_eq!(grade(&q, &Submission::Single("A. Paris".into())), Ok(true));
        assert_eq!(grade(&q, &Submission::Single("B. Lyon".into())), Ok(false));
    }

    #[test]
    fn multi_select_requires_exact_set() {
        let q = pick_bc();
        let ok = Submission::Multiple(vec!["B. x".into(), "C. y".into()]);
        assert_eq!(grade(&q, &ok), Ok(true));

        // order does not matter
        let reversed = Submission::Multiple(vec!["C. y".into(), "B. x".into()]);
        assert_eq!(grade(&q, &reversed), Ok(true));

        let missing = Submission::Multiple(vec!["B. x".into()]);
        assert_eq!(grade(&q, &missing), Ok(false));

        let extra = Submission::Multiple(vec!["B. x".into(), "C. y".into(), "D. z".into()]);
        assert_eq!(grade(&q, &extra), Ok(false));
    }

    #[test]
    fn blank_submissions_are_rejected() {
        assert_eq!(
            grade(&paris(), &Submission::Single("   ".into())),
            Err(GradeError::EmptySubmission)
        );
        assert_eq!(
            grade(&pick_bc(), &Submission::Multiple(vec![])),
            Err(GradeError::EmptySubmission)
        );
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        assert_eq!(
            grade(&paris(), &Submission::Multiple(vec!["A. Paris".into()])),
            Err(GradeError::SelectionMismatch)
        );
        assert_eq!(
            grade(&pick_bc(), &Submission::Single("B. x".into())),
            Err(GradeError::SelectionMismatch)
        );
    }

    #[test]
    fn correct_texts_for_display() {
        assert_eq!(correct_option_texts(&paris()), vec!["A. Paris".to_string()]);
        assert_eq!(
            correct_option_texts(&pick_bc()),
            vec!["B. x".to_string(), "C. y".to_string()]
        );
    }
}
