//! Error types for quizdrill-core.

use crate::types::QuestionId;
use thiserror::Error;

/// Errors while loading the question bank. Fatal: no session starts without
/// a usable bank.
#[derive(Debug, Error)]
pub enum BankError {
    #[error("cannot read question bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("question bank is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("question bank must be a JSON array")]
    NotAnArray,

    #[error("question bank contains no usable questions")]
    NoQuestions,
}

/// Errors from the persistence gateway. Recoverable: reads fall back to an
/// empty ledger, writes are reported without rolling back local state.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway I/O error: {0}")]
    Io(String),

    #[error("gateway backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    #[error("cannot decode progress row: {0}")]
    Decode(String),
}

/// A submission rejected before grading. No ledger mutation happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GradeError {
    #[error("no answer was selected")]
    EmptySubmission,

    #[error("submission shape does not match the question type")]
    SelectionMismatch,
}

/// Batch generation outcomes that are not batches.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("no missed questions to drill")]
    NothingToDrill,
}

/// Errors surfaced by session commands.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("user id must not be blank")]
    EmptyUserId,

    #[error(transparent)]
    Grade(#[from] GradeError),

    #[error("no question is currently being served")]
    NoActiveQuestion,

    #[error("question {0} was already answered this round")]
    AlreadyAnswered(QuestionId),

    #[error("question {0} has not been answered yet")]
    NotYetAnswered(QuestionId),

    #[error("unknown question id {0}")]
    UnknownQuestion(QuestionId),
}
