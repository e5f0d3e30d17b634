//! Shared types for the NOTEPICKER agent.
//!
//! The listing record comes in two shapes: `LoanRecord` is the loosely
//! typed wire form returned by the marketplace (every field optional), and
//! `LoanListing` is the validated form the strategy pipeline works on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Grades
// ---------------------------------------------------------------------------

/// Marketplace risk tier. `A` is the best, `G` the worst; the derived
/// ordering follows that scale (`A < B < … < G`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl Grade {
    /// All grades, best to worst.
    pub const ALL: &'static [Grade] = &[
        Grade::A,
        Grade::B,
        Grade::C,
        Grade::D,
        Grade::E,
        Grade::F,
        Grade::G,
    ];

    /// Position on the A→0 … G→6 scale.
    pub fn ordinal(self) -> i32 {
        self as i32
    }

    pub fn letter(self) -> char {
        match self {
            Grade::A => 'A',
            Grade::B => 'B',
            Grade::C => 'C',
            Grade::D => 'D',
            Grade::E => 'E',
            Grade::F => 'F',
            Grade::G => 'G',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(Grade::A),
            'B' => Some(Grade::B),
            'C' => Some(Grade::C),
            'D' => Some(Grade::D),
            'E' => Some(Grade::E),
            'F' => Some(Grade::F),
            'G' => Some(Grade::G),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl std::str::FromStr for Grade {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Grade::from_letter(c).ok_or_else(|| anyhow::anyhow!("Unknown grade: {s}"))
            }
            _ => Err(anyhow::anyhow!("Unknown grade: {s}")),
        }
    }
}

/// Finer risk tier, e.g. `C4`: a grade letter followed by a level 1–5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubGrade {
    pub grade: Grade,
    pub level: u8,
}

impl fmt::Display for SubGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.grade, self.level)
    }
}

impl std::str::FromStr for SubGrade {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let (Some(letter), Some(digit), None) = (chars.next(), chars.next(), chars.next()) else {
            anyhow::bail!("Malformed sub-grade: {s}");
        };
        let grade = Grade::from_letter(letter)
            .ok_or_else(|| anyhow::anyhow!("Unknown grade in sub-grade: {s}"))?;
        let level = digit
            .to_digit(10)
            .filter(|d| (1..=5).contains(d))
            .ok_or_else(|| anyhow::anyhow!("Sub-grade level out of range: {s}"))?;
        Ok(SubGrade {
            grade,
            level: level as u8,
        })
    }
}

// ---------------------------------------------------------------------------
// Borrower attributes
// ---------------------------------------------------------------------------

/// Borrower's home ownership status. Unrecognised values map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HomeOwnership {
    Own,
    Rent,
    Mortgage,
    Other,
}

impl From<&str> for HomeOwnership {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "OWN" => HomeOwnership::Own,
            "RENT" => HomeOwnership::Rent,
            "MORTGAGE" => HomeOwnership::Mortgage,
            _ => HomeOwnership::Other,
        }
    }
}

impl fmt::Display for HomeOwnership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomeOwnership::Own => write!(f, "OWN"),
            HomeOwnership::Rent => write!(f, "RENT"),
            HomeOwnership::Mortgage => write!(f, "MORTGAGE"),
            HomeOwnership::Other => write!(f, "OTHER"),
        }
    }
}

/// Stated purpose of the loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoanPurpose {
    DebtConsolidation,
    CreditCard,
    HomeImprovement,
    MajorPurchase,
    Medical,
    Car,
    SmallBusiness,
    Vacation,
    Wedding,
    Moving,
    House,
    RenewableEnergy,
    Educational,
    Other,
}

impl From<&str> for LoanPurpose {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "debt_consolidation" => LoanPurpose::DebtConsolidation,
            "credit_card" => LoanPurpose::CreditCard,
            "home_improvement" => LoanPurpose::HomeImprovement,
            "major_purchase" => LoanPurpose::MajorPurchase,
            "medical" => LoanPurpose::Medical,
            "car" => LoanPurpose::Car,
            "small_business" => LoanPurpose::SmallBusiness,
            "vacation" => LoanPurpose::Vacation,
            "wedding" => LoanPurpose::Wedding,
            "moving" => LoanPurpose::Moving,
            "house" => LoanPurpose::House,
            "renewable_energy" => LoanPurpose::RenewableEnergy,
            "educational" => LoanPurpose::Educational,
            _ => LoanPurpose::Other,
        }
    }
}

impl fmt::Display for LoanPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanPurpose::DebtConsolidation => "debt_consolidation",
            LoanPurpose::CreditCard => "credit_card",
            LoanPurpose::HomeImprovement => "home_improvement",
            LoanPurpose::MajorPurchase => "major_purchase",
            LoanPurpose::Medical => "medical",
            LoanPurpose::Car => "car",
            LoanPurpose::SmallBusiness => "small_business",
            LoanPurpose::Vacation => "vacation",
            LoanPurpose::Wedding => "wedding",
            LoanPurpose::Moving => "moving",
            LoanPurpose::House => "house",
            LoanPurpose::RenewableEnergy => "renewable_energy",
            LoanPurpose::Educational => "educational",
            LoanPurpose::Other => "other",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One entry of the marketplace listing, exactly as it arrives on the wire.
/// Every field is optional so that a partial record still deserialises and
/// can be rejected by the filter instead of failing the whole listing.
/// A value of the wrong type reads as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoanRecord {
    #[serde(deserialize_with = "lenient::id")]
    pub id: Option<u64>,
    /// Employment length in months.
    #[serde(deserialize_with = "lenient::int")]
    pub emp_length: Option<i64>,
    #[serde(deserialize_with = "lenient::text")]
    pub grade: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub sub_grade: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub addr_state: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub home_ownership: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub total_acc: Option<i64>,
    #[serde(deserialize_with = "lenient::text")]
    pub purpose: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub acc_now_delinq: Option<i64>,
    #[serde(deserialize_with = "lenient::int")]
    pub chargeoff_within12_mths: Option<i64>,
    #[serde(deserialize_with = "lenient::int")]
    pub pub_rec_bankruptcies: Option<i64>,
    #[serde(deserialize_with = "lenient::int")]
    pub tax_liens: Option<i64>,
    /// Monthly payment.
    #[serde(deserialize_with = "lenient::float")]
    pub installment: Option<f64>,
    /// Self-reported annual income.
    #[serde(deserialize_with = "lenient::float")]
    pub annual_inc: Option<f64>,
    #[serde(deserialize_with = "lenient::int")]
    pub delinq2_yrs: Option<i64>,
    #[serde(deserialize_with = "lenient::int")]
    pub mths_since_last_delinq: Option<i64>,
}

impl LoanRecord {
    /// Decode one listing entry. An entry that is not even an object
    /// becomes an empty record, which the filter rejects as invalid.
    pub fn from_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// Field decoders for `LoanRecord` that map wrong-typed values to `None`.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(match &value {
            Value::Number(n) if n.is_u64() => n.as_u64(),
            _ => as_int(&value).and_then(|v| u64::try_from(v).ok()),
        })
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(as_int(&Value::deserialize(d)?))
    }

    pub fn float<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        let value = Value::deserialize(d)?;
        let parsed = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        Ok(parsed.filter(|f: &f64| f.is_finite()))
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    /// Integers, integral floats (`12.0`) and numeric strings.
    fn as_int(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// A validated listing entry. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanListing {
    pub id: u64,
    pub employment_length_months: i64,
    pub grade: Grade,
    pub sub_grade: SubGrade,
    pub address_state: String,
    pub home_ownership: HomeOwnership,
    pub total_accounts: i64,
    pub purpose: LoanPurpose,
    pub accounts_now_delinquent: i64,
    pub chargeoffs_within_12_months: i64,
    pub public_record_bankruptcies: i64,
    pub tax_liens: i64,
    pub installment: f64,
    pub annual_income: f64,
    pub delinquencies_2_years: i64,
    pub months_since_last_delinquency: Option<i64>,
}

impl fmt::Display for LoanListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "loan {} [{}] {} {} | inst=${:.2}/mo inc=${:.0}/yr | {}",
            self.id,
            self.sub_grade,
            self.purpose,
            self.address_state,
            self.installment,
            self.annual_income,
            self.home_ownership,
        )
    }
}

impl LoanListing {
    /// Monthly installment as a fraction of monthly income.
    pub fn debt_service_ratio(&self) -> f64 {
        self.installment / (self.annual_income / 12.0)
    }

    /// Helper to build a test listing that passes every underwriting rule.
    #[cfg(test)]
    pub fn sample(id: u64) -> Self {
        LoanListing {
            id,
            employment_length_months: 60,
            grade: Grade::C,
            sub_grade: SubGrade {
                grade: Grade::C,
                level: 3,
            },
            address_state: "NY".to_string(),
            home_ownership: HomeOwnership::Mortgage,
            total_accounts: 12,
            purpose: LoanPurpose::DebtConsolidation,
            accounts_now_delinquent: 0,
            chargeoffs_within_12_months: 0,
            public_record_bankruptcies: 0,
            tax_liens: 0,
            installment: 300.0,
            annual_income: 60_000.0,
            delinquencies_2_years: 0,
            months_since_last_delinquency: None,
        }
    }
}

impl TryFrom<&LoanRecord> for LoanListing {
    type Error = NotepickerError;

    fn try_from(r: &LoanRecord) -> Result<Self, Self::Error> {
        let id = r.id.ok_or_else(|| invalid(None, "id"))?;
        let need = |v: Option<i64>, field: &str| v.ok_or_else(|| invalid(Some(id), field));

        let grade: Grade = r
            .grade
            .as_deref()
            .ok_or_else(|| invalid(Some(id), "grade"))?
            .parse()
            .map_err(|_| invalid(Some(id), "grade"))?;
        let sub_grade: SubGrade = r
            .sub_grade
            .as_deref()
            .ok_or_else(|| invalid(Some(id), "subGrade"))?
            .parse()
            .map_err(|_| invalid(Some(id), "subGrade"))?;

        Ok(LoanListing {
            id,
            employment_length_months: need(r.emp_length, "empLength")?,
            grade,
            sub_grade,
            address_state: r
                .addr_state
                .clone()
                .ok_or_else(|| invalid(Some(id), "addrState"))?,
            home_ownership: r
                .home_ownership
                .as_deref()
                .map(HomeOwnership::from)
                .ok_or_else(|| invalid(Some(id), "homeOwnership"))?,
            total_accounts: need(r.total_acc, "totalAcc")?,
            purpose: r
                .purpose
                .as_deref()
                .map(LoanPurpose::from)
                .ok_or_else(|| invalid(Some(id), "purpose"))?,
            accounts_now_delinquent: need(r.acc_now_delinq, "accNowDelinq")?,
            chargeoffs_within_12_months: need(r.chargeoff_within12_mths, "chargeoffWithin12Mths")?,
            public_record_bankruptcies: need(r.pub_rec_bankruptcies, "pubRecBankruptcies")?,
            tax_liens: need(r.tax_liens, "taxLiens")?,
            installment: r
                .installment
                .ok_or_else(|| invalid(Some(id), "installment"))?,
            annual_income: r
                .annual_inc
                .ok_or_else(|| invalid(Some(id), "annualInc"))?,
            delinquencies_2_years: need(r.delinq2_yrs, "delinq2Yrs")?,
            months_since_last_delinquency: r.mths_since_last_delinq,
        })
    }
}

fn invalid(loan_id: Option<u64>, field: &str) -> NotepickerError {
    NotepickerError::InvalidRecord {
        loan_id,
        field: field.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Holdings
// ---------------------------------------------------------------------------

/// A note held by the investor (a fractional share of one loan).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub loan_id: u64,
    #[serde(default)]
    pub note_id: Option<u64>,
    #[serde(default)]
    pub order_id: Option<u64>,
    #[serde(default)]
    pub portfolio_name: Option<String>,
}

/// Ids of loans already held by the investor. Built once per run.
#[derive(Debug, Clone, Default)]
pub struct OwnedLoanSet {
    ids: HashSet<u64>,
}

impl OwnedLoanSet {
    pub fn from_notes(notes: &[Note]) -> Self {
        Self {
            ids: notes.iter().map(|n| n.loan_id).collect(),
        }
    }

    pub fn contains(&self, loan_id: u64) -> bool {
        self.ids.contains(&loan_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<u64> for OwnedLoanSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy types
// ---------------------------------------------------------------------------

/// An eligible loan together with its desirability score.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub loan: LoanListing,
    pub score: f64,
}

/// Why a candidate was (or was not) bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DecisionReason {
    WouldBuy,
    AlreadyOwned,
    LowScore,
    OutOfBudget,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::WouldBuy => write!(f, "would buy"),
            DecisionReason::AlreadyOwned => write!(f, "already owned"),
            DecisionReason::LowScore => write!(f, "low scoring loan"),
            DecisionReason::OutOfBudget => write!(f, "out of budget"),
        }
    }
}

/// Final classification of one candidate.
#[derive(Debug, Clone)]
pub struct PurchaseDecision {
    pub loan: LoanListing,
    pub score: f64,
    pub reason: DecisionReason,
}

impl PurchaseDecision {
    pub fn is_purchase(&self) -> bool {
        self.reason == DecisionReason::WouldBuy
    }
}

impl fmt::Display for PurchaseDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loan {} score={:.2} ({})", self.loan.id, self.score, self.reason)
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// A named grouping of notes in the investor's account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub portfolio_id: u64,
    pub portfolio_name: String,
    #[serde(default)]
    pub portfolio_description: Option<String>,
}

/// One line of an order submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub loan_id: u64,
    pub requested_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_id: Option<u64>,
}

/// Per-loan outcome reported by the marketplace after an order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub loan_id: u64,
    #[serde(default)]
    pub requested_amount: Decimal,
    #[serde(default)]
    pub invested_amount: Decimal,
    #[serde(default)]
    pub execution_status: Vec<String>,
}

impl OrderConfirmation {
    /// Whether any amount was actually invested.
    pub fn is_filled(&self) -> bool {
        self.invested_amount > Decimal::ZERO
    }
}

/// Marketplace response to an order submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(default)]
    pub order_instruct_id: Option<u64>,
    #[serde(default)]
    pub order_confirmations: Vec<OrderConfirmation>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for NOTEPICKER.
#[derive(Debug, thiserror::Error)]
pub enum NotepickerError {
    #[error("Marketplace error ({marketplace}): {message}")]
    Marketplace { marketplace: String, message: String },

    #[error("Invalid loan record (loan {loan_id:?}): missing or malformed {field}")]
    InvalidRecord { loan_id: Option<u64>, field: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
