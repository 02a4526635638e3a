use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use insight_pipeline::csv_io::{load_jobs, report_filename, write_jobs, write_report, ReportKind};
use insight_pipeline::onboarding::sample_jobs;
use insight_pipeline::quoting::{quick_estimate, similar_jobs};
use insight_pipeline::types::{
    Company, CompanyProfile, JobType, JobUpdate, OnboardingData, QuoteCosts, QuoteDraft,
};
use insight_pipeline::*;
use insight_profit::CostBreakdown;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const JOBS_CSV: &str = "\
title,job_type,location,client,crew,total_revenue,labor_cost,material_cost,equipment_cost,subcontractor_cost,date_completed,notes
Hull Repaint,Marine,Dry Dock 2,Harbor Lines,Marine Team,40000,12000,6000,4000,2000,2024-01-20,
Pier Extension,Marine,North Pier,Harbor Lines,Marine Team,90000,30000,20000,10000,5000,2024-02-11,Diving delays
Freight Move,Logistics,Depot 4,Cargo Partners,Fleet A,15000,6000,1000,5000,2000,2024-02-28,
Site Clearance,Construction,Lot 9,Cargo Partners,Team Beta,20000,9000,4000,6000,2500,2024-03-05,Loss on excavation
";

fn onboarded_book(store: Arc<dyn KeyValueStore>) -> JobBook {
    JobBook::new(Repository::new(store, "co_1"), Company::new("co_1", "Harbor Works"))
}

async fn import_csv(book: &mut JobBook) -> CompanySnapshot {
    let imported = load_jobs(JOBS_CSV.as_bytes()).unwrap();
    book.initialize_company_data(OnboardingData {
        imported_jobs: Some(imported.jobs),
        clients: imported.clients,
        ..Default::default()
    })
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Onboarding through reports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sample_onboarding_flags_every_sample_job() {
    let mut book = onboarded_book(Arc::new(MemoryStore::new()));
    let snapshot = book
        .initialize_company_data(OnboardingData {
            imported_jobs: Some(sample_jobs()),
            ..Default::default()
        })
        .await
        .unwrap();

    let margins: Vec<f64> = snapshot.jobs.iter().map(|j| (j.margin * 100.0).round() / 100.0).collect();
    assert_eq!(margins, vec![5.88, 4.17, 3.08]);

    let summary = summarize(&snapshot.jobs, &snapshot.quotes, book.policy()).unwrap();
    assert_eq!(summary.total_revenue, 270000.0);
    assert_eq!(summary.total_costs, 258000.0);
    assert_eq!(summary.total_profit, 12000.0);
    assert!((summary.average_margin - 12000.0 / 270000.0 * 100.0).abs() < 1e-9);
    assert_eq!(summary.red_flag_jobs.len(), 3);
    assert_eq!(summary.red_flag_share, 100.0);

    let clients = client_profitability(&snapshot.jobs, &snapshot.clients, book.policy()).unwrap();
    let names: Vec<&str> = clients.iter().map(|r| r.client.as_str()).collect();
    assert_eq!(
        names,
        vec!["Downtown Development Corp", "Industrial Solutions Ltd", "Port Authority"]
    );

    let analysis = margin_analysis(&snapshot.jobs, book.policy()).unwrap();
    assert_eq!(analysis.distribution.len(), 1);
    assert_eq!(analysis.distribution[0].range, "0-10%");
    assert_eq!(analysis.distribution[0].count, 3);
    assert_eq!(analysis.health.low_margin, 3);
}

#[tokio::test]
async fn csv_import_feeds_reports() {
    let mut book = onboarded_book(Arc::new(MemoryStore::new()));
    let snapshot = import_csv(&mut book).await;
    assert_eq!(snapshot.jobs.len(), 4);
    assert_eq!(snapshot.clients.len(), 2);

    let by_type = job_type_performance(&snapshot.jobs, book.policy()).unwrap();
    let types: Vec<JobType> = by_type.iter().map(|r| r.job_type).collect();
    assert_eq!(types, vec![JobType::Marine, JobType::Construction, JobType::Logistics]);
    assert_eq!(by_type[0].job_count, 2);
    assert_eq!(by_type[0].total_revenue, 130000.0);

    let analysis = margin_analysis(&snapshot.jobs, book.policy()).unwrap();
    assert_eq!(analysis.health.loss_making, 1);
    assert_eq!(analysis.health.profitable, 2);
    assert_eq!(analysis.health.low_margin, 1);

    let summary = summarize(&snapshot.jobs, &[], book.policy()).unwrap();
    let months: Vec<&str> = summary.monthly_trend.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(months, vec!["Jan 2024", "Feb 2024", "Mar 2024"]);
}

#[tokio::test]
async fn edits_and_quotes_flow_through_storage() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut book = onboarded_book(store.clone());
    let snapshot = import_csv(&mut book).await;

    let loss = snapshot
        .jobs
        .iter()
        .find(|j| j.title == "Site Clearance")
        .unwrap();
    assert!(loss.margin < 0.0);
    let fixed = book
        .update_job(
            &loss.id,
            JobUpdate {
                actual_costs: Some(CostBreakdown::new(9000.0, 4000.0, 2000.0, 0.0)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!((fixed.margin - 25.0).abs() < 1e-9);
    assert!(!fixed.is_red_flag);

    let history = book.jobs().await.unwrap();
    let estimate = quick_estimate(JobType::Marine, &history);
    assert_eq!(estimate.labor, 21000.0);
    assert_eq!(similar_jobs(JobType::Marine, "pier maintenance", &history).len(), 1);

    let quote = book
        .add_quote(QuoteDraft {
            client_name: "Harbor Lines".into(),
            job_type: JobType::Marine,
            description: "Pier maintenance".into(),
            costs: estimate,
            overhead_markup: None,
            custom_markup: 0.0,
        })
        .await
        .unwrap();
    assert!(!quote.is_margin_alert);

    // A second book over the same store sees the same records.
    let reopened = onboarded_book(store);
    let reloaded = reopened.snapshot().await.unwrap();
    assert_eq!(reloaded.quotes, vec![quote]);
    assert!(reloaded.jobs.iter().any(|j| j.id == fixed.id && j.margin == fixed.margin));
}

#[tokio::test]
async fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let mut book = onboarded_book(store);
        import_csv(&mut book).await;
    }
    assert!(dir.path().join("jie_jobs_co_1.json").exists());

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let book = onboarded_book(store);
    assert_eq!(book.jobs().await.unwrap().len(), 4);
}

#[tokio::test]
async fn company_settings_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());
        let mut book = JobBook::open(Repository::new(store, "c1")).await.unwrap();
        book.initialize_company_data(OnboardingData {
            company: CompanyProfile {
                red_flag_threshold: Some(5.0),
                default_overhead_markup: Some(25.0),
                ..Default::default()
            },
            imported_jobs: Some(sample_jobs()),
            ..Default::default()
        })
        .await
        .unwrap();
    }
    assert!(dir.path().join("jie_company_c1.json").exists());

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(dir.path()).await.unwrap());
    let book = JobBook::open(Repository::new(store, "c1")).await.unwrap();
    assert!(book.company().is_onboarded);
    assert_eq!(book.company().red_flag_threshold, 5.0);
    assert_eq!(book.policy().red_flag_threshold, 5.0);

    // stored jobs and new quotes are judged under the same saved settings
    let jobs = book.jobs().await.unwrap();
    let flags: Vec<bool> = jobs.iter().map(|j| j.is_red_flag).collect();
    assert_eq!(flags, vec![false, true, true]);
    let quote = book
        .add_quote(QuoteDraft {
            client_name: "Port Authority".into(),
            costs: QuoteCosts::new(1000.0, 0.0, 0.0),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(quote.overhead_markup, 25.0);
    assert_eq!(quote.quoted_price, 1250.0);
}

#[tokio::test]
async fn filters_and_exports() {
    let mut book = onboarded_book(Arc::new(MemoryStore::new()));
    let snapshot = import_csv(&mut book).await;

    let red = JobFilter {
        status: JobStatusFilter::RedFlag,
        ..Default::default()
    }
    .apply(snapshot.jobs.clone(), book.policy());
    let titles: Vec<&str> = red.kept.iter().map(|j| j.title.as_str()).collect();
    assert_eq!(titles, vec!["Freight Move", "Site Clearance"]);

    let now = snapshot.jobs[3].date_completed + Duration::days(10);
    assert_eq!(DateRange::Last30.apply(&snapshot.jobs, now).len(), 2);

    let mut jobs_csv = Vec::new();
    write_jobs(&snapshot.jobs, &snapshot.clients, &mut jobs_csv).unwrap();
    let text = String::from_utf8(jobs_csv).unwrap();
    assert_eq!(text.lines().count(), 5);
    assert!(text.contains("\"Harbor Lines\""));
    assert!(!text.contains("\"Unknown\""));

    let rows = client_profitability(&snapshot.jobs, &snapshot.clients, book.policy()).unwrap();
    let mut report = Vec::new();
    write_report(&rows, &mut report).unwrap();
    let report = String::from_utf8(report).unwrap();
    assert!(report.starts_with(
        "\"client\",\"jobCount\",\"totalRevenue\",\"totalCosts\",\"profit\",\"margin\"\n"
    ));

    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    assert_eq!(
        report_filename(ReportKind::MarginAnalysis, today),
        "margin_analysis_2024-03-15.csv"
    );
}
