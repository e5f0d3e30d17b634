//! Desirability scoring.
//!
//! Scores a loan that already passed underwriting. The base rewards a low
//! debt-service ratio; a grade modifier scales it, doubled for clean-history
//! homeowners and divided down by a recency-weighted delinquency penalty.

use crate::types::{Grade, HomeOwnership, LoanListing};

/// Grade at which the grade component of the modifier is zero.
pub const GRADE_ANCHOR: Grade = Grade::C;
/// Weight of each sub-grade level.
pub const SUB_GRADE_WEIGHT: f64 = 0.33;
/// Window over which a past delinquency's weight decays to zero.
pub const DELINQUENCY_RECENCY_MONTHS: f64 = 24.0;

/// Score an eligible loan. Pure: the same listing always yields the same
/// value. Higher is better; the result may be negative.
pub fn score(loan: &LoanListing) -> f64 {
    let base = (1.0 - loan.debt_service_ratio()) * 100.0;
    base * modifier(loan)
}

/// Grade, ownership and delinquency adjustment applied to the base score.
pub fn modifier(loan: &LoanListing) -> f64 {
    let mut modifier = f64::from(loan.grade.ordinal() - GRADE_ANCHOR.ordinal())
        + f64::from(loan.sub_grade.level) * SUB_GRADE_WEIGHT;

    let delinquencies = loan.delinquencies_2_years;

    if loan.home_ownership == HomeOwnership::Own && delinquencies == 0 {
        modifier *= 2.0;
    }

    if delinquencies > 0 {
        modifier /= delinquency_divisor(delinquencies, loan.months_since_last_delinquency);
    }

    modifier
}

/// `d + 2d * recency`, where recency falls from 1 (just happened) to 0
/// (at least 24 months ago). Always `>= d`, so never zero for `d > 0`.
fn delinquency_divisor(delinquencies: i64, months_since_last: Option<i64>) -> f64 {
    let d = delinquencies as f64;
    // Unknown date is treated as the most recent.
    let months = months_since_last.unwrap_or(0) as f64;
    let recency = (1.0 - months / DELINQUENCY_RECENCY_MONTHS).clamp(0.0, 1.0);
    d + (2.0 * d) * recency
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
