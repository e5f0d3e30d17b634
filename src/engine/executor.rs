//! Order executor.
//!
//! Turns the purchase decisions into marketplace orders. Live mode creates a
//! portfolio named after the run date and submits every order in one batch;
//! dry-run mode only reports what would have been bought.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::marketplace::LendingMarketplace;
use crate::types::{OrderConfirmation, OrderRequest, Portfolio, PurchaseDecision};

// ---------------------------------------------------------------------------
// Execution result
// ---------------------------------------------------------------------------

/// Result of executing one run's purchases.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub dry_run: bool,
    /// Identifier of the submission: the marketplace's order instruction id
    /// in live mode, a generated `dry-run-…` id otherwise. `None` when there
    /// was nothing to buy.
    pub order_ref: Option<String>,
    pub portfolio: Option<Portfolio>,
    pub orders: Vec<OrderRequest>,
    pub confirmations: Vec<OrderConfirmation>,
    pub total_requested: Decimal,
    pub total_invested: Decimal,
}

impl ExecutionReport {
    fn empty(dry_run: bool) -> Self {
        Self {
            dry_run,
            order_ref: None,
            portfolio: None,
            orders: Vec::new(),
            confirmations: Vec::new(),
            total_requested: Decimal::ZERO,
            total_invested: Decimal::ZERO,
        }
    }

    /// Orders the marketplace reports as (at least partially) filled.
    pub fn filled(&self) -> usize {
        self.confirmations.iter().filter(|c| c.is_filled()).count()
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor {
    dry_run: bool,
}

impl Executor {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Portfolio name used for purchases made on `date`.
    pub fn portfolio_name(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Buy every `WouldBuy` decision at `amount` each.
    ///
    /// `purchases` must already be in the order they should be funded.
    pub async fn execute(
        &self,
        marketplace: &dyn LendingMarketplace,
        investor_id: u64,
        purchases: &[&PurchaseDecision],
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::empty(self.dry_run);

        if purchases.is_empty() {
            info!("Nothing to buy");
            return Ok(report);
        }

        if self.dry_run {
            info!("*** Virtual mode (to act, pass the --buy flag) ***");
            info!(count = purchases.len(), "Would have purchased:");
            for decision in purchases {
                info!(
                    loan_id = decision.loan.id,
                    score = format!("{:.2}", decision.score),
                    amount = %amount,
                    url = %marketplace.loan_url(decision.loan.id),
                    "[DRY RUN] Would buy"
                );
            }
            report.order_ref = Some(format!("dry-run-{}", uuid::Uuid::new_v4()));
            report.orders = build_orders(purchases, amount, None);
            report.total_requested = amount * Decimal::from(purchases.len());
            return Ok(report);
        }

        info!(count = purchases.len(), "Buying loans");

        let name = Self::portfolio_name(date);
        let portfolio = marketplace
            .create_portfolio(investor_id, &name)
            .await
            .with_context(|| format!("Failed to create portfolio {name}"))?;

        let orders = build_orders(purchases, amount, Some(portfolio.portfolio_id));
        let response = marketplace
            .submit_order(investor_id, &orders)
            .await
            .context("Order submission failed")?;

        match serde_json::to_string(&response) {
            Ok(json) => info!(response = %json, "Order submitted"),
            Err(e) => warn!(error = %e, "Could not serialise order response"),
        }

        for confirmation in response.order_confirmations.iter().filter(|c| !c.is_filled()) {
            warn!(
                loan_id = confirmation.loan_id,
                status = ?confirmation.execution_status,
                "Order not filled"
            );
        }

        report.order_ref = response.order_instruct_id.map(|id| id.to_string());
        report.total_requested = orders.iter().map(|o| o.requested_amount).sum();
        report.total_invested = response
            .order_confirmations
            .iter()
            .map(|c| c.invested_amount)
            .sum();
        report.portfolio = Some(portfolio);
        report.orders = orders;
        report.confirmations = response.order_confirmations;

        info!(
            ordered = report.orders.len(),
            filled = report.filled(),
            invested = %report.total_invested,
            "Order execution complete"
        );

        Ok(report)
    }
}

fn build_orders(
    purchases: &[&PurchaseDecision],
    amount: Decimal,
    portfolio_id: Option<u64>,
) -> Vec<OrderRequest> {
    purchases
        .iter()
        .map(|d| OrderRequest {
            loan_id: d.loan.id,
            requested_amount: amount,
            portfolio_id,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
