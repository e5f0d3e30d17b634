//! Mock marketplace for integration testing.
//!
//! Provides a deterministic `LendingMarketplace` implementation that
//! serves a fixed listing, tracks cash and holdings, and fills orders
//! in memory with no network access.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use notepicker::marketplace::LendingMarketplace;
use notepicker::types::{
    LoanRecord, Note, OrderConfirmation, OrderRequest, OrderResponse, Portfolio,
};

/// All state is in-memory and controllable from test code.
pub struct MockMarketplace {
    listing: Vec<LoanRecord>,
    cash: Arc<Mutex<Decimal>>,
    notes: Arc<Mutex<Vec<Note>>>,
    portfolios: Arc<Mutex<Vec<Portfolio>>>,
    orders: Arc<Mutex<Vec<OrderRequest>>>,
    /// Loans that stop funding before an order reaches them.
    withdrawn: Arc<Mutex<HashSet<u64>>>,
    /// If set, all operations will return this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockMarketplace {
    pub fn new(listing: Vec<LoanRecord>, cash: Decimal) -> Self {
        Self {
            listing,
            cash: Arc::new(Mutex::new(cash)),
            notes: Arc::new(Mutex::new(Vec::new())),
            portfolios: Arc::new(Mutex::new(Vec::new())),
            orders: Arc::new(Mutex::new(Vec::new())),
            withdrawn: Arc::new(Mutex::new(HashSet::new())),
            force_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Seed holdings as if bought in an earlier run.
    pub fn with_owned(self, loan_ids: &[u64]) -> Self {
        self.notes
            .lock()
            .unwrap()
            .extend(loan_ids.iter().map(|id| Note {
                loan_id: *id,
                note_id: Some(id + 10_000),
                order_id: None,
                portfolio_name: Some("seed".to_string()),
            }));
        self
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn withdraw(&self, loan_id: u64) {
        self.withdrawn.lock().unwrap().insert(loan_id);
    }

    pub fn cash(&self) -> Decimal {
        *self.cash.lock().unwrap()
    }

    pub fn set_cash(&self, cash: Decimal) {
        *self.cash.lock().unwrap() = cash;
    }

    pub fn owned_ids(&self) -> Vec<u64> {
        self.notes.lock().unwrap().iter().map(|n| n.loan_id).collect()
    }

    pub fn portfolios(&self) -> Vec<Portfolio> {
        self.portfolios.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<OrderRequest> {
        self.orders.lock().unwrap().clone()
    }

    fn check_error(&self) -> Result<()> {
        match self.force_error.lock().unwrap().as_ref() {
            Some(err) => Err(anyhow!("{}", err)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LendingMarketplace for MockMarketplace {
    async fn fetch_listing(&self, _show_all: bool) -> Result<Vec<LoanRecord>> {
        self.check_error()?;
        Ok(self.listing.clone())
    }

    async fn available_cash(&self, _investor_id: u64) -> Result<Decimal> {
        self.check_error()?;
        Ok(self.cash())
    }

    async fn owned_notes(&self, _investor_id: u64) -> Result<Vec<Note>> {
        self.check_error()?;
        Ok(self.notes.lock().unwrap().clone())
    }

    async fn create_portfolio(&self, _investor_id: u64, name: &str) -> Result<Portfolio> {
        self.check_error()?;
        let mut portfolios = self.portfolios.lock().unwrap();
        let portfolio = Portfolio {
            portfolio_id: 500 + portfolios.len() as u64,
            portfolio_name: name.to_string(),
            portfolio_description: None,
        };
        portfolios.push(portfolio.clone());
        Ok(portfolio)
    }

    async fn submit_order(
        &self,
        _investor_id: u64,
        orders: &[OrderRequest],
    ) -> Result<OrderResponse> {
        self.check_error()?;

        let withdrawn = self.withdrawn.lock().unwrap();
        let mut cash = self.cash.lock().unwrap();
        let mut notes = self.notes.lock().unwrap();
        let portfolio_name = orders
            .first()
            .and_then(|o| o.portfolio_id)
            .and_then(|id| {
                self.portfolios
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|p| p.portfolio_id == id)
                    .map(|p| p.portfolio_name.clone())
            });

        let mut confirmations = Vec::new();
        for order in orders {
            let (invested, status) = if withdrawn.contains(&order.loan_id) {
                (Decimal::ZERO, "NOT_AN_IN_FUNDING_LOAN")
            } else if *cash < order.requested_amount {
                (Decimal::ZERO, "INSUFFICIENT_CASH")
            } else {
                *cash -= order.requested_amount;
                notes.push(Note {
                    loan_id: order.loan_id,
                    note_id: Some(order.loan_id + 10_000),
                    order_id: Some(1),
                    portfolio_name: portfolio_name.clone(),
                });
                (order.requested_amount, "ORDER_FULFILLED")
            };
            confirmations.push(OrderConfirmation {
                loan_id: order.loan_id,
                requested_amount: order.requested_amount,
                invested_amount: invested,
                execution_status: vec![status.to_string()],
            });
        }

        self.orders.lock().unwrap().extend_from_slice(orders);

        Ok(OrderResponse {
            order_instruct_id: Some(1),
            order_confirmations: confirmations,
        })
    }

    fn loan_url(&self, loan_id: u64) -> String {
        format!("https://mock.example.com/loan/{loan_id}")
    }

    fn name(&self) -> &str {
        "mock"
    }
}
