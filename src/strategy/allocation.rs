//! Ranking and budget allocation.
//!
//! Orders scored candidates best-first and walks the list once, deciding for
//! each one whether it would be bought or why not.

use rust_decimal::prelude::*;
use tracing::debug;

use crate::types::{
    DecisionReason, NotepickerError, OwnedLoanSet, PurchaseDecision, ScoredCandidate,
};

/// Number of loans the available cash can fund at `per_loan_amount` each.
pub fn budget_count(
    available_cash: Decimal,
    per_loan_amount: Decimal,
) -> Result<usize, NotepickerError> {
    if per_loan_amount <= Decimal::ZERO {
        return Err(NotepickerError::Config(format!(
            "per-loan amount must be positive, got {per_loan_amount}"
        )));
    }
    if available_cash < Decimal::ZERO {
        return Err(NotepickerError::Config(format!(
            "available cash must not be negative, got {available_cash}"
        )));
    }

    let ratio = available_cash.checked_div(per_loan_amount).ok_or_else(|| {
        NotepickerError::Config(format!(
            "per-loan amount {per_loan_amount} is too small for available cash {available_cash}"
        ))
    })?;

    Ok(ratio.floor().to_usize().unwrap_or(usize::MAX))
}

/// Stable sort by score, highest first. Equal scores keep listing order.
pub fn rank(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Classify every candidate.
///
/// Precedence: already owned, then below `min_score`, then out of budget,
/// otherwise bought. The returned list is in score-descending order and
/// covers every candidate exactly once.
pub fn allocate(
    mut candidates: Vec<ScoredCandidate>,
    owned: &OwnedLoanSet,
    available_cash: Decimal,
    per_loan_amount: Decimal,
    min_score: f64,
) -> Result<Vec<PurchaseDecision>, NotepickerError> {
    let budget = budget_count(available_cash, per_loan_amount)?;
    rank(&mut candidates);

    let mut bought = 0usize;
    let decisions = candidates
        .into_iter()
        .map(|c| {
            let reason = if owned.contains(c.loan.id) {
                DecisionReason::AlreadyOwned
            } else if c.score < min_score {
                DecisionReason::LowScore
            } else if bought >= budget {
                DecisionReason::OutOfBudget
            } else {
                bought += 1;
                DecisionReason::WouldBuy
            };
            debug!(loan_id = c.loan.id, score = c.score, reason = %reason, "Allocated");
            PurchaseDecision {
                loan: c.loan,
                score: c.score,
                reason,
            }
        })
        .collect();

    Ok(decisions)
}

/// The decisions marked for purchase, in the order they were ranked.
pub fn purchases(decisions: &[PurchaseDecision]) -> Vec<&PurchaseDecision> {
    decisions.iter().filter(|d| d.is_purchase()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
