//! LendingClub investor API integration.
//!
//! API docs: https://www.lendingclub.com/developers/api-overview
//! Base URL: https://api.lendingclub.com/api/investor/v1
//! Auth: `Authorization: {api_key}` on every request.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::LendingMarketplace;
use crate::types::{LoanRecord, Note, NotepickerError, OrderRequest, OrderResponse, Portfolio};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://api.lendingclub.com/api/investor/v1";
const BROWSE_URL: &str = "https://www.lendingclub.com/browse/loanDetail.action?loan_id=";
const MARKETPLACE_NAME: &str = "lendingclub";

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

/// `GET loans/listing`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingResponse {
    #[serde(default)]
    as_of_date: Option<String>,
    /// Absent when nothing is listed. Entries are decoded one by one so a
    /// malformed loan cannot fail the whole listing.
    #[serde(default)]
    loans: Vec<serde_json::Value>,
}

impl ListingResponse {
    fn into_records(self) -> Vec<LoanRecord> {
        self.loans.into_iter().map(LoanRecord::from_json).collect()
    }
}

/// `GET accounts/{id}/availablecash`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailableCashResponse {
    available_cash: Decimal,
}

/// `GET accounts/{id}/notes`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotesResponse {
    #[serde(default)]
    my_notes: Vec<Note>,
}

/// `POST accounts/{id}/portfolios`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePortfolioRequest<'a> {
    actor_id: u64,
    portfolio_name: &'a str,
    /// Always sent; `null` when there is no description.
    portfolio_description: Option<&'a str>,
}

/// `POST accounts/{id}/orders`
#[derive(Debug, Serialize)]
struct SubmitOrderRequest<'a> {
    aid: u64,
    orders: &'a [OrderRequest],
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// LendingClub investor API client.
pub struct LendingClubClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
}

impl LendingClubClient {
    pub fn new(api_key: SecretString, base_url: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("NOTEPICKER/0.1.0 (note-buying-agent)")
            .build()
            .context("Failed to build HTTP client for LendingClub")?;

        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, "LendingClub GET");

        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.api_key.expose_secret().as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("LendingClub {what} request failed"))?;

        Self::parse(resp, what).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T> {
        let url = self.url(path);
        debug!(url = %url, "LendingClub POST");

        let resp = self
            .http
            .post(&url)
            .header("Authorization", self.api_key.expose_secret().as_str())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .with_context(|| format!("LendingClub {what} request failed"))?;

        Self::parse(resp, what).await
    }

    async fn parse<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(NotepickerError::Marketplace {
                marketplace: MARKETPLACE_NAME.to_string(),
                message: format!("{what} returned {status}: {body}"),
            });
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse LendingClub {what} response"))
    }
}

/// Detail page for a loan on the public site.
pub fn loan_detail_url(loan_id: u64) -> String {
    format!("{BROWSE_URL}{loan_id}")
}

#[async_trait]
impl LendingMarketplace for LendingClubClient {
    async fn fetch_listing(&self, show_all: bool) -> Result<Vec<LoanRecord>> {
        let listing: ListingResponse = self
            .get(&format!("loans/listing?showAll={show_all}"), "listing")
            .await?;

        info!(
            loans = listing.loans.len(),
            as_of = ?listing.as_of_date,
            "LendingClub listing fetched"
        );

        Ok(listing.into_records())
    }

    async fn available_cash(&self, investor_id: u64) -> Result<Decimal> {
        let cash: AvailableCashResponse = self
            .get(&format!("accounts/{investor_id}/availablecash"), "available cash")
            .await?;
        Ok(cash.available_cash)
    }

    async fn owned_notes(&self, investor_id: u64) -> Result<Vec<Note>> {
        let notes: NotesResponse = self
            .get(&format!("accounts/{investor_id}/notes"), "notes")
            .await?;
        Ok(notes.my_notes)
    }

    async fn create_portfolio(&self, investor_id: u64, name: &str) -> Result<Portfolio> {
        let body = CreatePortfolioRequest {
            actor_id: investor_id,
            portfolio_name: name,
            portfolio_description: None,
        };
        let portfolio: Portfolio = self
            .post(&format!("accounts/{investor_id}/portfolios"), &body, "create portfolio")
            .await?;

        info!(
            portfolio_id = portfolio.portfolio_id,
            name = %portfolio.portfolio_name,
            "LendingClub portfolio created"
        );

        Ok(portfolio)
    }

    async fn submit_order(
        &self,
        investor_id: u64,
        orders: &[OrderRequest],
    ) -> Result<OrderResponse> {
        let body = SubmitOrderRequest {
            aid: investor_id,
            orders,
        };
        self.post(&format!("accounts/{investor_id}/orders"), &body, "submit order")
            .await
    }

    fn loan_url(&self, loan_id: u64) -> String {
        loan_detail_url(loan_id)
    }

    fn name(&self) -> &str {
        MARKETPLACE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
