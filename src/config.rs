//! Configuration loading from TOML with environment and CLI overrides.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! `NOTEPICKER_*` environment variables override the file, and command-line
//! flags override both. The API key is referenced by env-var name in the
//! config and resolved at runtime.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

use crate::strategy::filter::UnderwritingPolicy;
use crate::types::NotepickerError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub marketplace: MarketplaceConfig,
    pub investing: InvestingConfig,
    #[serde(default)]
    pub policy: UnderwritingPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketplaceConfig {
    /// Override for the investor API root (sandbox or proxy).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub investor_id: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InvestingConfig {
    /// Amount put into each note, in account currency.
    pub amount_to_invest: Decimal,
    #[serde(default = "default_min_loan_score")]
    pub min_loan_score: f64,
    /// Place real orders. Off means dry-run.
    #[serde(default)]
    pub buy: bool,
    /// Consider the full listing rather than only the latest batch.
    #[serde(default = "default_show_all_loans")]
    pub show_all_loans: bool,
}

fn default_api_key_env() -> String {
    "LENDINGCLUB_API_KEY".to_string()
}

fn default_min_loan_score() -> f64 {
    70.0
}

fn default_show_all_loans() -> bool {
    true
}

/// Values supplied on the command line. `None` leaves the configured value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub buy: bool,
    pub min_loan_score: Option<f64>,
    pub amount_to_invest: Option<Decimal>,
    pub investor_id: Option<u64>,
}

/// Validated, immutable settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    pub min_loan_score: f64,
    pub amount_to_invest: Decimal,
    pub dry_run: bool,
    pub show_all_loans: bool,
    pub policy: UnderwritingPolicy,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `NOTEPICKER_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("NOTEPICKER_INVESTOR_ID") {
            self.marketplace.investor_id = Some(
                v.trim()
                    .parse()
                    .with_context(|| format!("Invalid NOTEPICKER_INVESTOR_ID: {v}"))?,
            );
        }
        if let Some(v) = lookup("NOTEPICKER_MIN_LOAN_SCORE") {
            self.investing.min_loan_score = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid NOTEPICKER_MIN_LOAN_SCORE: {v}"))?;
        }
        if let Some(v) = lookup("NOTEPICKER_AMOUNT_TO_INVEST") {
            self.investing.amount_to_invest = v
                .trim()
                .parse()
                .with_context(|| format!("Invalid NOTEPICKER_AMOUNT_TO_INVEST: {v}"))?;
        }
        Ok(())
    }

    /// Apply command-line overrides. `--buy` can only switch buying on.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if overrides.buy {
            self.investing.buy = true;
        }
        if let Some(score) = overrides.min_loan_score {
            self.investing.min_loan_score = score;
        }
        if let Some(amount) = overrides.amount_to_invest {
            self.investing.amount_to_invest = amount;
        }
        if let Some(id) = overrides.investor_id {
            self.marketplace.investor_id = Some(id);
        }
    }

    /// Validate and freeze the settings used by the strategy pipeline.
    pub fn run_configuration(&self) -> Result<RunConfiguration, NotepickerError> {
        let investing = &self.investing;
        if investing.amount_to_invest <= Decimal::ZERO {
            return Err(NotepickerError::Config(format!(
                "amount_to_invest must be positive, got {}",
                investing.amount_to_invest
            )));
        }
        if !investing.min_loan_score.is_finite() {
            return Err(NotepickerError::Config(format!(
                "min_loan_score must be a finite number, got {}",
                investing.min_loan_score
            )));
        }

        Ok(RunConfiguration {
            min_loan_score: investing.min_loan_score,
            amount_to_invest: investing.amount_to_invest,
            dry_run: !investing.buy,
            show_all_loans: investing.show_all_loans,
            policy: self.policy,
        })
    }

    pub fn investor_id(&self) -> Result<u64, NotepickerError> {
        match self.marketplace.investor_id {
            Some(id) if id > 0 => Ok(id),
            _ => Err(NotepickerError::Config(
                "investor_id is not set (config, NOTEPICKER_INVESTOR_ID or --investor-id)"
                    .to_string(),
            )),
        }
    }

    /// Resolve the marketplace API key from the configured env var.
    pub fn resolve_api_key(&self) -> Result<SecretString> {
        let key = Self::resolve_env(&self.marketplace.api_key_env)?;
        if key.trim().is_empty() {
            anyhow::bail!(NotepickerError::Config(format!(
                "{} is set but empty",
                self.marketplace.api_key_env
            )));
        }
        Ok(SecretString::new(key))
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
