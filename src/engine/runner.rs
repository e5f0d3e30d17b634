//! Single-run orchestration.
//!
//! listing → underwriting → scoring → cash & holdings → allocation →
//! execution. Any marketplace error aborts the run.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use tracing::info;

use crate::config::RunConfiguration;
use crate::engine::executor::{ExecutionReport, Executor};
use crate::marketplace::LendingMarketplace;
use crate::strategy::allocation::{self, budget_count};
use crate::strategy::filter::{EligibilityFilter, RejectionTally};
use crate::strategy::LoanSelector;
use crate::types::{DecisionReason, OwnedLoanSet, PurchaseDecision};

/// Everything that happened during one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub listed: usize,
    pub eligible: usize,
    pub rejections: RejectionTally,
    pub available_cash: Decimal,
    pub budget_count: usize,
    pub owned_loans: usize,
    /// Every eligible loan, ranked, with its classification.
    pub decisions: Vec<PurchaseDecision>,
    pub execution: ExecutionReport,
}

impl RunReport {
    pub fn count(&self, reason: DecisionReason) -> usize {
        self.decisions.iter().filter(|d| d.reason == reason).count()
    }
}

pub struct Runner {
    config: RunConfiguration,
    investor_id: u64,
    selector: LoanSelector,
    executor: Executor,
}

impl Runner {
    pub fn new(config: RunConfiguration, investor_id: u64) -> Self {
        let selector = LoanSelector::new(EligibilityFilter::new(config.policy), config.min_loan_score);
        let executor = Executor::new(config.dry_run);
        Self {
            config,
            investor_id,
            selector,
            executor,
        }
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Run once, naming any new portfolio after today's local date.
    pub async fn run(&self, marketplace: &dyn LendingMarketplace) -> Result<RunReport> {
        self.run_on(marketplace, Local::now().date_naive()).await
    }

    pub async fn run_on(
        &self,
        marketplace: &dyn LendingMarketplace,
        date: NaiveDate,
    ) -> Result<RunReport> {
        info!(
            marketplace = marketplace.name(),
            investor_id = self.investor_id,
            dry_run = self.config.dry_run,
            min_score = self.config.min_loan_score,
            amount = %self.config.amount_to_invest,
            max_grade = %self.config.policy.max_grade,
            "Starting run"
        );

        // 1. Listing → eligible, scored, ranked candidates
        let records = marketplace
            .fetch_listing(self.config.show_all_loans)
            .await
            .context("Failed to fetch loan listing")?;
        let selection = self.selector.select(&records);
        info!(count = selection.candidates.len(), "Found loans of interest");

        // 2. Funds on hand
        let available_cash = marketplace
            .available_cash(self.investor_id)
            .await
            .context("Failed to fetch available cash")?;
        let budget = budget_count(available_cash, self.config.amount_to_invest)?;
        info!(
            available_cash = %available_cash,
            budget_count = budget,
            "Funds available"
        );

        // 3. Holdings
        let notes = marketplace
            .owned_notes(self.investor_id)
            .await
            .context("Failed to fetch owned notes")?;
        let owned = OwnedLoanSet::from_notes(&notes);

        // 4. Allocation
        let decisions = self.selector.allocate(
            &selection,
            &owned,
            available_cash,
            self.config.amount_to_invest,
        )?;
        for d in &decisions {
            info!(
                url = %marketplace.loan_url(d.loan.id),
                score = format!("{:.2}", d.score),
                reason = %d.reason,
                "Decision"
            );
        }

        // 5. Execution
        let purchases = allocation::purchases(&decisions);
        let execution = self
            .executor
            .execute(
                marketplace,
                self.investor_id,
                &purchases,
                self.config.amount_to_invest,
                date,
            )
            .await?;

        Ok(RunReport {
            listed: selection.listed,
            eligible: selection.candidates.len(),
            rejections: selection.rejections,
            available_cash,
            budget_count: budget,
            owned_loans: owned.len(),
            decisions,
            execution,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
