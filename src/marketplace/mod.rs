//! Marketplace integrations.
//!
//! Defines the `LendingMarketplace` trait and provides the LendingClub
//! investor API implementation.

pub mod lending_club;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{LoanRecord, Note, OrderRequest, OrderResponse, Portfolio};

/// Abstraction over a peer-to-peer lending marketplace's investor API.
///
/// Implementors perform all network I/O; the strategy layer only ever sees
/// the values returned here.
#[async_trait]
pub trait LendingMarketplace: Send + Sync {
    /// Fetch the loans currently open for funding. With `show_all` unset,
    /// the marketplace only returns loans listed in the most recent batch.
    async fn fetch_listing(&self, show_all: bool) -> Result<Vec<LoanRecord>>;

    /// Cash available for new investments in the investor's account.
    async fn available_cash(&self, investor_id: u64) -> Result<Decimal>;

    /// Notes currently held by the investor.
    async fn owned_notes(&self, investor_id: u64) -> Result<Vec<Note>>;

    /// Create a named portfolio to hold newly purchased notes.
    async fn create_portfolio(&self, investor_id: u64, name: &str) -> Result<Portfolio>;

    /// Submit a batch of buy orders.
    async fn submit_order(&self, investor_id: u64, orders: &[OrderRequest])
        -> Result<OrderResponse>;

    /// Public detail page for a loan, for reports.
    fn loan_url(&self, loan_id: u64) -> String;

    /// Marketplace name for logging and identification.
    fn name(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    mockall::mock! {
        pub Market {}

        #[async_trait]
        impl LendingMarketplace for Market {
            async fn fetch_listing(&self, show_all: bool) -> Result<Vec<LoanRecord>>;
            async fn available_cash(&self, investor_id: u64) -> Result<Decimal>;
            async fn owned_notes(&self, investor_id: u64) -> Result<Vec<Note>>;
            async fn create_portfolio(&self, investor_id: u64, name: &str) -> Result<Portfolio>;
            async fn submit_order(
                &self,
                investor_id: u64,
                orders: &[OrderRequest],
            ) -> Result<OrderResponse>;
            fn loan_url(&self, loan_id: u64) -> String;
            fn name(&self) -> &str;
        }
    }
}
