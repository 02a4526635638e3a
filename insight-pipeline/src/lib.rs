//! Job book for service businesses: records, storage, quoting and reports.
//!
//! The job book keeps one company's jobs, quotes and master data in an
//! injected key-value store. Every margin and red flag is derived by
//! `insight-profit`; this crate only moves records in and out of storage
//! and shapes them into dashboards, reports and CSV files.

pub mod csv_io;
pub mod dashboard;
pub mod error;
pub mod job_book;
pub mod onboarding;
pub mod quoting;
pub mod reports;
pub mod repository;
pub mod types;
pub mod util;

pub use dashboard::{summarize, DashboardSummary};
pub use error::{PipelineError, PipelineResult};
pub use job_book::{CompanySnapshot, JobBook};
pub use repository::{Collection, FileStore, KeyValueStore, MemoryStore, Repository};
pub use reports::{
    client_profitability, job_type_performance, margin_analysis, DateRange, JobFilter,
    JobStatusFilter, MarginHealth,
};
