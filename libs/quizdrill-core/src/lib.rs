//! Adaptive multiple-choice drill engine.
//!
//! Provides:
//! - Question bank loading and normalization (JSON, English or Chinese fields)
//! - The mastery ledger: per-user mastered/missed/miss-count state
//! - Tiered batch generation weighted toward missed questions
//! - The session state machine (submit, grade, advance, round rollover)
//! - The persistence gateway contract and progress-row codec

pub mod bank;
pub mod batch;
pub mod error;
pub mod gateway;
pub mod grading;
pub mod ledger;
pub mod session;
pub mod types;

pub use bank::{Bank, DropReason, Dropped};
pub use batch::BatchPlan;
pub use error::{BankError, BatchError, GatewayError, GradeError, SessionError};
pub use gateway::{MemoryGateway, PersistenceGateway, ProgressRecord, RowHandle};
pub use grading::grade;
pub use ledger::{Ledger, ProgressStats, Tier};
pub use session::{
    Advance, Graded, ReviewEntry, RoundStart, Session, SessionConfig, StartReport, WritePolicy,
};
pub use types::{CorrectAnswer, Question, QuestionId, QuizMode, Submission, TypeFilter};
