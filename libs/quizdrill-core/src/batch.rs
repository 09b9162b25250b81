//! Batch generation: building one round's working set of questions.
//!
//! A normal batch front-loads remediation while still surfacing new material:
//! half the slots go to missed questions, a quarter to mastered review, the
//! rest to unseen questions. The combined fill is shuffled so tiers are
//! interleaved rather than blocked.

use crate::error::BatchError;
use crate::ledger::{Ledger, Tier};
use crate::types::{Question, TypeFilter};
use rand::seq::SliceRandom;
use rand::Rng;

/// A generated batch plus how many questions each tier contributed.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub questions: Vec<Question>,
    pub from_missed: usize,
    pub from_review: usize,
    pub from_unseen: usize,
}

impl BatchPlan {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Generate a normal-mode batch.
///
/// An empty filtered question set yields an empty batch; the caller treats
/// that as "round finished", not as an error. A batch shorter than
/// `batch_size` just means the bank ran out of eligible questions.
pub fn generate<R: Rng + ?Sized>(
    questions: &[Question],
    ledger: &Ledger,
    batch_size: usize,
    filter: TypeFilter,
    rng: &mut R,
) -> BatchPlan {
    let mut missed = Vec::new();
    let mut mastered = Vec::new();
    let mut unseen = Vec::new();
    for question in questions.iter().filter(|q| filter.matches(q)) {
        match ledger.tier_of(question.id) {
            Tier::Missed => missed.push(question),
            Tier::Mastered => mastered.push(question),
            Tier::Unseen => unseen.push(question),
        }
    }

    let missed_slots = batch_size / 2;
    let review_slots = batch_size / 4;

    let mut picked: Vec<&Question> = missed.iter().take(missed_slots).copied().collect();
    let from_missed = picked.len();

    let review: Vec<&Question> = mastered
        .choose_multiple(rng, review_slots.min(mastered.len()))
        .copied()
        .collect();
    let from_review = review.len();
    picked.extend(review);

    let remainder = batch_size.saturating_sub(picked.len());
    let fresh: Vec<&Question> = unseen
        .choose_multiple(rng, remainder.min(unseen.len()))
        .copied()
        .collect();
    let from_unseen = fresh.len();
    picked.extend(fresh);

    picked.shuffle(rng);
    picked.truncate(batch_size);

    BatchPlan {
        questions: picked.into_iter().cloned().collect(),
        from_missed,
        from_review,
        from_unseen,
    }
}

/// Generate an error-drill batch: up to `max_size` questions sampled from the
/// missed tier only.
///
/// An empty missed tier (after the filter) is a distinct outcome, not an
/// empty batch, so the caller can redirect to normal-mode generation.
pub fn generate_error_batch<R: Rng + ?Sized>(
    questions: &[Question],
    ledger: &Ledger,
    max_size: usize,
    filter: TypeFilter,
    rng: &mut R,
) -> Result<BatchPlan, BatchError> {
    let missed: Vec<&Question> = questions
        .iter()
        .filter(|q| filter.matches(q) && ledger.tier_of(q.id) == Tier::Missed)
        .collect();

    if missed.is_empty() {
        return Err(BatchError::NothingToDrill);
    }

    let mut picked: Vec<&Question> = missed
        .choose_multiple(rng, max_size.min(missed.len()))
        .copied()
        .collect();
    picked.shuffle(rng);
    let from_missed = picked.len();

    Ok(BatchPlan {
        questions: picked.into_iter().cloned().collect(),
        from_missed,
        from_review: 0,
        from_unseen: 0,
    })
}
