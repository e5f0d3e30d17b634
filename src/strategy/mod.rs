//! Strategy engine: underwriting filter, desirability scoring, and budget
//! allocation.

pub mod allocation;
pub mod filter;
pub mod scorer;

use rust_decimal::Decimal;
use tracing::info;

use crate::types::{
    DecisionReason, LoanRecord, NotepickerError, OwnedLoanSet, PurchaseDecision,
    ScoredCandidate,
};
use filter::{EligibilityFilter, RejectionTally};

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Outcome of filtering and scoring one listing batch.
#[derive(Debug, Clone)]
pub struct Selection {
    pub listed: usize,
    /// Eligible loans with their scores, ranked best-first.
    pub candidates: Vec<ScoredCandidate>,
    pub rejections: RejectionTally,
}

/// Pipelines underwriting → scoring → ranking for a listing batch, then
/// allocates the budget once the account's cash and holdings are known.
///
/// Holds no per-run state: the same selector can be reused for any number
/// of batches.
pub struct LoanSelector {
    filter: EligibilityFilter,
    min_score: f64,
}

impl LoanSelector {
    pub fn new(filter: EligibilityFilter, min_score: f64) -> Self {
        Self { filter, min_score }
    }

    pub fn filter(&self) -> &EligibilityFilter {
        &self.filter
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    /// Filter a raw listing and score the survivors.
    pub fn select(&self, records: &[LoanRecord]) -> Selection {
        let outcome = self.filter.filter_batch(records);

        let mut candidates: Vec<ScoredCandidate> = outcome
            .eligible
            .into_iter()
            .map(|loan| {
                let score = scorer::score(&loan);
                ScoredCandidate { loan, score }
            })
            .collect();
        allocation::rank(&mut candidates);

        info!(
            listed = records.len(),
            eligible = candidates.len(),
            rejected = outcome.rejections.total(),
            "Underwriting complete"
        );

        Selection {
            listed: records.len(),
            candidates,
            rejections: outcome.rejections,
        }
    }

    /// Decide what to buy from a selection given cash on hand and holdings.
    pub fn allocate(
        &self,
        selection: &Selection,
        owned: &OwnedLoanSet,
        available_cash: Decimal,
        per_loan_amount: Decimal,
    ) -> Result<Vec<PurchaseDecision>, NotepickerError> {
        let decisions = allocation::allocate(
            selection.candidates.clone(),
            owned,
            available_cash,
            per_loan_amount,
            self.min_score,
        )?;

        let count = |reason: DecisionReason| decisions.iter().filter(|d| d.reason == reason).count();
        info!(
            candidates = decisions.len(),
            would_buy = count(DecisionReason::WouldBuy),
            already_owned = count(DecisionReason::AlreadyOwned),
            low_score = count(DecisionReason::LowScore),
            out_of_budget = count(DecisionReason::OutOfBudget),
            "Allocation complete"
        );

        Ok(decisions)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
