//! The mastery ledger: the durable per-user record of which questions are
//! mastered, which are missed, how often each was missed, and the last wrong
//! answer given.
//!
//! Invariants, enforced by keeping fields private:
//! - `mastered` and `missed` are disjoint
//! - every missed id has a miss count >= 1
//! - mastering a question clears its entire miss history

use crate::types::{QuestionId, Submission};
use std::collections::{HashMap, HashSet};

/// Which partition a question falls into relative to a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Missed,
    Mastered,
    Unseen,
}

/// Per-user mastery state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    mastered: HashSet<QuestionId>,
    missed: HashSet<QuestionId>,
    miss_counts: HashMap<QuestionId, u32>,
    last_wrong: HashMap<QuestionId, Submission>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted parts, repairing rows that predate the
    /// invariants: an id in both sets is kept as missed (it still needs
    /// review), and a missed id without a counter gets a count of 1.
    pub fn from_parts(
        mastered: HashSet<QuestionId>,
        missed: HashSet<QuestionId>,
        mut miss_counts: HashMap<QuestionId, u32>,
        last_wrong: HashMap<QuestionId, Submission>,
    ) -> Self {
        let mastered: HashSet<QuestionId> =
            mastered.into_iter().filter(|id| !missed.contains(id)).collect();
        for id in &missed {
            let count = miss_counts.entry(*id).or_insert(1);
            if *count == 0 {
                *count = 1;
            }
        }
        Self {
            mastered,
            missed,
            miss_counts,
            last_wrong,
        }
    }

    pub fn mastered(&self) -> &HashSet<QuestionId> {
        &self.mastered
    }

    pub fn missed(&self) -> &HashSet<QuestionId> {
        &self.missed
    }

    pub fn miss_counts(&self) -> &HashMap<QuestionId, u32> {
        &self.miss_counts
    }

    pub fn last_wrong(&self, id: QuestionId) -> Option<&Submission> {
        self.last_wrong.get(&id)
    }

    pub fn last_wrong_answers(&self) -> &HashMap<QuestionId, Submission> {
        &self.last_wrong
    }

    pub fn tier_of(&self, id: QuestionId) -> Tier {
        if self.missed.contains(&id) {
            Tier::Missed
        } else if self.mastered.contains(&id) {
            Tier::Mastered
        } else {
            Tier::Unseen
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mastered.is_empty()
            && self.missed.is_empty()
            && self.miss_counts.is_empty()
            && self.last_wrong.is_empty()
    }

    /// Apply one graded result. This is the single canonical state transition:
    /// correct masters the question and clears its miss history, incorrect
    /// marks it missed, bumps the counter and records the wrong answer.
    pub fn apply_result(&mut self, id: QuestionId, submitted: Submission, is_correct: bool) {
        if is_correct {
            self.mastered.insert(id);
            self.missed.remove(&id);
            self.miss_counts.remove(&id);
            self.last_wrong.remove(&id);
        } else {
            self.missed.insert(id);
            self.mastered.remove(&id);
            *self.miss_counts.entry(id).or_insert(0) += 1;
            self.last_wrong.insert(id, submitted);
        }
    }

    /// Direct mastery override, bypassing grading. Used from the review list.
    pub fn mark_mastered(&mut self, id: QuestionId) {
        self.mastered.insert(id);
        self.missed.remove(&id);
        self.miss_counts.remove(&id);
        self.last_wrong.remove(&id);
    }

    /// Drop miss history for questions that have since been mastered.
    /// Returns how many entries were removed.
    pub fn clear_corrected(&mut self) -> usize {
        let corrected: Vec<QuestionId> = self
            .miss_counts
            .keys()
            .filter(|id| self.mastered.contains(id))
            .copied()
            .collect();
        for id in &corrected {
            self.miss_counts.remove(id);
            self.last_wrong.remove(id);
        }
        corrected.len()
    }

    /// Zero all four fields.
    pub fn reset(&mut self) {
        self.mastered.clear();
        self.missed.clear();
        self.miss_counts.clear();
        self.last_wrong.clear();
    }

    pub fn stats(&self, total_questions: usize) -> ProgressStats {
        ProgressStats {
            total_questions,
            mastered: self.mastered.len(),
            missed: self.missed.len(),
            tracked_mistakes: self.miss_counts.len(),
            corrected_mistakes: self
                .miss_counts
                .keys()
                .filter(|id| self.mastered.contains(id))
                .count(),
            max_miss_count: self.miss_counts.values().copied().max().unwrap_or(0),
        }
    }
}

/// Progress counters for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStats {
    pub total_questions: usize,
    pub mastered: usize,
    pub missed: usize,
    /// Questions with miss history, including ones since corrected.
    pub tracked_mistakes: usize,
    /// Tracked mistakes whose question is currently mastered.
    pub corrected_mistakes: usize,
    pub max_miss_count: u32,
}

impl ProgressStats {
    pub fn mastery_rate(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            self.mastered as f64 / self.total_questions as f64
        }
    }
}
