//! Underwriting eligibility filter.
//!
//! Applies the fixed set of underwriting rules to each listing, in a fixed
//! order, stopping at the first failure. Rejections are tallied per rule so
//! an operator can see which rule is eliminating the most candidates.

use std::fmt;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::{Grade, HomeOwnership, LoanListing, LoanPurpose, LoanRecord};

// ---------------------------------------------------------------------------
// Policy constants
// ---------------------------------------------------------------------------

/// Minimum employment tenure in months.
pub const MIN_EMPLOYMENT_MONTHS: i64 = 36;
/// Excluded borrower state.
pub const EXCLUDED_STATE: &str = "CA";
/// Minimum number of credit lines on file.
pub const MIN_TOTAL_ACCOUNTS: i64 = 6;
/// Purposes we are willing to fund.
pub const ALLOWED_PURPOSES: &[LoanPurpose] = &[
    LoanPurpose::DebtConsolidation,
    LoanPurpose::Wedding,
    LoanPurpose::Moving,
    LoanPurpose::House,
];
/// Ceiling on monthly installment / monthly income.
pub const MAX_DEBT_SERVICE_RATIO: f64 = 0.1075;
/// Ceiling on self-reported annual income.
pub const MAX_ANNUAL_INCOME: f64 = 120_000.0;

/// Tunable part of the underwriting policy.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct UnderwritingPolicy {
    /// Worst grade still accepted. A loan passes when `grade <= max_grade`
    /// on the A (best) … G (worst) scale.
    #[serde(default = "default_max_grade")]
    pub max_grade: Grade,
}

fn default_max_grade() -> Grade {
    Grade::C
}

impl Default for UnderwritingPolicy {
    fn default() -> Self {
        Self {
            max_grade: default_max_grade(),
        }
    }
}

// ---------------------------------------------------------------------------
// Rejection reasons
// ---------------------------------------------------------------------------

/// The rule a listing failed. Variants are declared in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionRule {
    InvalidRecord,
    EmploymentLength,
    Grade,
    AddressState,
    HomeOwnership,
    TotalAccounts,
    Purpose,
    AccountsDelinquent,
    Chargeoffs,
    Bankruptcies,
    TaxLiens,
    DebtToIncome,
    AnnualIncome,
}

const RULE_COUNT: usize = 13;

impl RejectionRule {
    pub const ALL: [RejectionRule; RULE_COUNT] = [
        RejectionRule::InvalidRecord,
        RejectionRule::EmploymentLength,
        RejectionRule::Grade,
        RejectionRule::AddressState,
        RejectionRule::HomeOwnership,
        RejectionRule::TotalAccounts,
        RejectionRule::Purpose,
        RejectionRule::AccountsDelinquent,
        RejectionRule::Chargeoffs,
        RejectionRule::Bankruptcies,
        RejectionRule::TaxLiens,
        RejectionRule::DebtToIncome,
        RejectionRule::AnnualIncome,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Stable tag used in logs.
    pub fn tag(self) -> &'static str {
        match self {
            RejectionRule::InvalidRecord => "INVALID_RECORD",
            RejectionRule::EmploymentLength => "EMPLOYMENT_LENGTH",
            RejectionRule::Grade => "GRADE",
            RejectionRule::AddressState => "ADDRESS_STATE",
            RejectionRule::HomeOwnership => "HOME_OWNERSHIP",
            RejectionRule::TotalAccounts => "TOTAL_ACCOUNTS",
            RejectionRule::Purpose => "PURPOSE",
            RejectionRule::AccountsDelinquent => "ACCOUNTS_DELINQUENT",
            RejectionRule::Chargeoffs => "CHARGEOFFS",
            RejectionRule::Bankruptcies => "BANKRUPTCIES",
            RejectionRule::TaxLiens => "TAX_LIENS",
            RejectionRule::DebtToIncome => "DEBT_TO_INCOME",
            RejectionRule::AnnualIncome => "ANNUAL_INCOME",
        }
    }
}

impl fmt::Display for RejectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Per-rule rejection counts for one batch. Every rule starts at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionTally {
    counts: [usize; RULE_COUNT],
}

impl RejectionTally {
    pub fn record(&mut self, rule: RejectionRule) {
        self.counts[rule.index()] += 1;
    }

    pub fn count(&self, rule: RejectionRule) -> usize {
        self.counts[rule.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// All rules with their counts, in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (RejectionRule, usize)> + '_ {
        RejectionRule::ALL.iter().map(|r| (*r, self.count(*r)))
    }

    /// The rule responsible for the most rejections, if any.
    pub fn most_restrictive(&self) -> Option<(RejectionRule, usize)> {
        self.iter()
            .filter(|(_, n)| *n > 0)
            .fold(None, |best, (rule, n)| match best {
                Some((_, best_n)) if best_n >= n => best,
                _ => Some((rule, n)),
            })
    }
}

impl fmt::Display for RejectionTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(rule, n)| format!("{rule}={n}"))
            .collect();
        if parts.is_empty() {
            write!(f, "no rejections")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Result of filtering a listing batch.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Eligible loans, in listing order.
    pub eligible: Vec<LoanListing>,
    pub rejections: RejectionTally,
}

pub struct EligibilityFilter {
    policy: UnderwritingPolicy,
}

impl EligibilityFilter {
    pub fn new(policy: UnderwritingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &UnderwritingPolicy {
        &self.policy
    }

    pub fn is_eligible(&self, loan: &LoanListing) -> bool {
        self.evaluate(loan).is_ok()
    }

    /// Run every rule in order and report the first one the loan fails.
    pub fn evaluate(&self, loan: &LoanListing) -> Result<(), RejectionRule> {
        // Ratios below divide by income; reject anything that would make
        // them non-finite.
        if !(loan.installment.is_finite() && loan.installment > 0.0)
            || !(loan.annual_income.is_finite() && loan.annual_income > 0.0)
        {
            return Err(RejectionRule::InvalidRecord);
        }

        if loan.employment_length_months < MIN_EMPLOYMENT_MONTHS {
            return Err(RejectionRule::EmploymentLength);
        }
        if loan.grade > self.policy.max_grade {
            return Err(RejectionRule::Grade);
        }
        if loan.address_state.eq_ignore_ascii_case(EXCLUDED_STATE) {
            return Err(RejectionRule::AddressState);
        }
        if loan.home_ownership == HomeOwnership::Rent {
            return Err(RejectionRule::HomeOwnership);
        }
        if loan.total_accounts < MIN_TOTAL_ACCOUNTS {
            return Err(RejectionRule::TotalAccounts);
        }
        if !ALLOWED_PURPOSES.contains(&loan.purpose) {
            return Err(RejectionRule::Purpose);
        }
        if loan.accounts_now_delinquent != 0 {
            return Err(RejectionRule::AccountsDelinquent);
        }
        if loan.chargeoffs_within_12_months != 0 {
            return Err(RejectionRule::Chargeoffs);
        }
        if loan.public_record_bankruptcies != 0 {
            return Err(RejectionRule::Bankruptcies);
        }
        if loan.tax_liens != 0 {
            return Err(RejectionRule::TaxLiens);
        }
        if loan.debt_service_ratio() > MAX_DEBT_SERVICE_RATIO {
            return Err(RejectionRule::DebtToIncome);
        }
        if loan.annual_income > MAX_ANNUAL_INCOME {
            return Err(RejectionRule::AnnualIncome);
        }

        Ok(())
    }

    /// Validate and filter a raw listing batch.
    pub fn filter_batch(&self, records: &[LoanRecord]) -> FilterOutcome {
        let mut eligible = Vec::new();
        let mut rejections = RejectionTally::default();

        for record in records {
            let loan = match LoanListing::try_from(record) {
                Ok(loan) => loan,
                Err(e) => {
                    debug!(error = %e, "Malformed listing record");
                    rejections.record(RejectionRule::InvalidRecord);
                    continue;
                }
            };

            match self.evaluate(&loan) {
                Ok(()) => eligible.push(loan),
                Err(rule) => {
                    debug!(loan_id = loan.id, rule = %rule, "Loan rejected");
                    rejections.record(rule);
                }
            }
        }

        if eligible.is_empty() && !records.is_empty() {
            warn!(
                listed = records.len(),
                rejections = %rejections,
                most_restrictive = ?rejections.most_restrictive().map(|(r, _)| r.tag()),
                "No loans passed underwriting"
            );
        }

        FilterOutcome {
            eligible,
            rejections,
        }
    }
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self::new(UnderwritingPolicy::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
