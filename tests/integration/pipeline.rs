//! Full listing → decide → buy runs through `Runner`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use notepicker::config::RunConfiguration;
use notepicker::engine::runner::Runner;
use notepicker::strategy::filter::{RejectionRule, UnderwritingPolicy};
use notepicker::types::{DecisionReason, LoanRecord};

use crate::mock_marketplace::MockMarketplace;

const INVESTOR: u64 = 42;

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn config(dry_run: bool, min_score: f64) -> RunConfiguration {
    RunConfiguration {
        min_loan_score: min_score,
        amount_to_invest: dec!(25),
        dry_run,
        show_all_loans: true,
        policy: UnderwritingPolicy::default(),
    }
}

/// C5 homeowner with a clean history, ten years employed, 60k/yr.
fn eligible(id: u64, installment: f64) -> LoanRecord {
    LoanRecord {
        id: Some(id),
        emp_length: Some(120),
        grade: Some("C".to_string()),
        sub_grade: Some("C5".to_string()),
        addr_state: Some("OH".to_string()),
        home_ownership: Some("OWN".to_string()),
        total_acc: Some(20),
        purpose: Some("debt_consolidation".to_string()),
        acc_now_delinq: Some(0),
        chargeoff_within12_mths: Some(0),
        pub_rec_bankruptcies: Some(0),
        tax_liens: Some(0),
        installment: Some(installment),
        annual_inc: Some(60_000.0),
        delinq2_yrs: Some(0),
        mths_since_last_delinq: None,
    }
}

/// Four buyable loans (scores 323.4, 316.8, 310.2, 303.6 by id) and four
/// that fail underwriting for different reasons.
fn listing() -> Vec<LoanRecord> {
    let mut in_california = eligible(90, 100.0);
    in_california.addr_state = Some("CA".to_string());

    let mut grade_f = eligible(91, 100.0);
    grade_f.grade = Some("F".to_string());
    grade_f.sub_grade = Some("F1".to_string());

    let mut no_installment = eligible(92, 100.0);
    no_installment.installment = None;

    let mut renter = eligible(93, 100.0);
    renter.home_ownership = Some("RENT".to_string());

    vec![
        eligible(3, 300.0),
        in_california,
        eligible(1, 100.0),
        grade_f,
        eligible(4, 400.0),
        no_installment,
        eligible(2, 200.0),
        renter,
    ]
}

fn ids_with(report: &notepicker::engine::runner::RunReport, reason: DecisionReason) -> Vec<u64> {
    report
        .decisions
        .iter()
        .filter(|d| d.reason == reason)
        .map(|d| d.loan.id)
        .collect()
}

#[tokio::test]
async fn test_dry_run_reports_without_ordering() {
    let market = MockMarketplace::new(listing(), dec!(100));
    let runner = Runner::new(config(true, 0.0), INVESTOR);

    let report = runner.run_on(&market, run_date()).await.unwrap();

    assert_eq!(report.listed, 8);
    assert_eq!(report.eligible, 4);
    assert_eq!(report.rejections.total(), 4);
    assert_eq!(report.rejections.count(RejectionRule::AddressState), 1);
    assert_eq!(report.rejections.count(RejectionRule::Grade), 1);
    assert_eq!(report.rejections.count(RejectionRule::InvalidRecord), 1);
    assert_eq!(report.rejections.count(RejectionRule::HomeOwnership), 1);

    assert_eq!(report.budget_count, 4);
    assert_eq!(ids_with(&report, DecisionReason::WouldBuy), vec![1, 2, 3, 4]);
    assert!(report.execution.dry_run);
    assert_eq!(report.execution.orders.len(), 4);
    assert_eq!(report.execution.total_requested, dec!(100));

    assert!(market.portfolios().is_empty());
    assert!(market.submitted().is_empty());
    assert_eq!(market.cash(), dec!(100));
}

#[tokio::test]
async fn test_live_run_buys_best_loans_within_budget() {
    let market = MockMarketplace::new(listing(), dec!(60));
    let runner = Runner::new(config(false, 0.0), INVESTOR);

    let report = runner.run_on(&market, run_date()).await.unwrap();

    assert_eq!(report.budget_count, 2);
    assert_eq!(ids_with(&report, DecisionReason::WouldBuy), vec![1, 2]);
    assert_eq!(ids_with(&report, DecisionReason::OutOfBudget), vec![3, 4]);

    let portfolios = market.portfolios();
    assert_eq!(portfolios.len(), 1);
    assert_eq!(portfolios[0].portfolio_name, "2026-10-19");

    let submitted: Vec<u64> = market.submitted().iter().map(|o| o.loan_id).collect();
    assert_eq!(submitted, vec![1, 2]);
    assert!(market
        .submitted()
        .iter()
        .all(|o| o.requested_amount == dec!(25) && o.portfolio_id == Some(500)));

    assert_eq!(report.execution.filled(), 2);
    assert_eq!(report.execution.total_invested, dec!(50));
    assert_eq!(market.cash(), dec!(10));
    assert_eq!(market.owned_ids(), vec![1, 2]);
}

#[tokio::test]
async fn test_next_run_skips_loans_bought_earlier() {
    let market = MockMarketplace::new(listing(), dec!(60));
    let runner = Runner::new(config(false, 0.0), INVESTOR);
    runner.run_on(&market, run_date()).await.unwrap();

    market.set_cash(dec!(50));
    let report = runner.run_on(&market, run_date()).await.unwrap();

    assert_eq!(report.owned_loans, 2);
    assert_eq!(ids_with(&report, DecisionReason::AlreadyOwned), vec![1, 2]);
    assert_eq!(ids_with(&report, DecisionReason::WouldBuy), vec![3, 4]);
    assert_eq!(market.owned_ids(), vec![1, 2, 3, 4]);
    assert_eq!(market.cash(), Decimal::ZERO);
}

#[tokio::test]
async fn test_owned_loans_do_not_use_budget() {
    let market = MockMarketplace::new(listing(), dec!(25)).with_owned(&[1]);
    let runner = Runner::new(config(false, 0.0), INVESTOR);

    let report = runner.run_on(&market, run_date()).await.unwrap();

    assert_eq!(ids_with(&report, DecisionReason::AlreadyOwned), vec![1]);
    assert_eq!(ids_with(&report, DecisionReason::WouldBuy), vec![2]);
    assert_eq!(ids_with(&report, DecisionReason::OutOfBudget), vec![3, 4]);
}

#[tokio::test]
async fn test_low_scores_are_never_bought() {
    let market = MockMarketplace::new(listing(), dec!(1000));
    let runner = Runner::new(config(false, 313.0), INVESTOR);

    let report = runner.run_on(&market, run_date()).await.unwrap();

    assert_eq!(ids_with(&report, DecisionReason::WouldBuy), vec![1, 2]);
    assert_eq!(ids_with(&report, DecisionReason::LowScore), vec![3, 4]);
    assert_eq!(market.submitted().len(), 2);
}

#[tokio::test]
async fn test_unfilled_order_is_reported() {
    let market = MockMarketplace::new(listing(), dec!(100));
    market.withdraw(2);
    let runner = Runner::new(config(false, 0.0), INVESTOR);

    let report = runner.run_on(&market, run_date()).await.unwrap();

    assert_eq!(report.execution.orders.len(), 4);
    assert_eq!(report.execution.filled(), 3);
    assert_eq!(report.execution.total_invested, dec!(75));
    assert!(!market.owned_ids().contains(&2));
}

#[tokio::test]
async fn test_no_cash_means_no_order() {
    let market = MockMarketplace::new(listing(), dec!(10));
    let runner = Runner::new(config(false, 0.0), INVESTOR);

    let report = runner.run_on(&market, run_date()).await.unwrap();

    assert_eq!(report.budget_count, 0);
    assert_eq!(report.count(DecisionReason::OutOfBudget), 4);
    assert!(market.portfolios().is_empty());
    assert!(market.submitted().is_empty());
}

#[tokio::test]
async fn test_marketplace_failure_aborts_run() {
    let market = MockMarketplace::new(listing(), dec!(100));
    market.set_error("503 Service Unavailable");
    let runner = Runner::new(config(false, 0.0), INVESTOR);

    let err = runner.run_on(&market, run_date()).await.unwrap_err();

    assert!(format!("{err:#}").contains("503 Service Unavailable"));
    assert!(market.submitted().is_empty());
}

#[test]
fn test_empty_listing() {
    let market = MockMarketplace::new(Vec::new(), dec!(100));
    let runner = Runner::new(config(false, 0.0), INVESTOR);

    let report = tokio_test::block_on(runner.run_on(&market, run_date())).unwrap();

    assert_eq!(report.listed, 0);
    assert!(report.decisions.is_empty());
    assert!(report.rejections.total() == 0);
    assert!(market.portfolios().is_empty());
}

#[tokio::test]
async fn test_malformed_entries_are_rejected_not_fatal() {
    let mut records = listing();
    records.push(LoanRecord::from_json(serde_json::json!({
        "id": 94, "empLength": "n/a", "grade": "C", "subGrade": "C5",
        "addrState": "OH", "homeOwnership": "OWN", "totalAcc": 20,
        "purpose": "moving", "accNowDelinq": 0, "chargeoffWithin12Mths": 0,
        "pubRecBankruptcies": 0, "taxLiens": 0, "installment": 100.0,
        "annualInc": 60000.0, "delinq2Yrs": 0
    })));
    records.push(LoanRecord::from_json(serde_json::json!(null)));

    let market = MockMarketplace::new(records, dec!(100));
    let runner = Runner::new(config(true, 0.0), INVESTOR);

    let report = runner.run_on(&market, run_date()).await.unwrap();

    assert_eq!(report.listed, 10);
    assert_eq!(report.eligible, 4);
    assert_eq!(report.rejections.count(RejectionRule::InvalidRecord), 3);
    assert_eq!(ids_with(&report, DecisionReason::WouldBuy), vec![1, 2, 3, 4]);
}
