//! Student activity reporting: filter activity records, aggregate them and
//! render accreditation reports (NAAC, AICTE, NIRF, Internal) as PDF
//! documents or XLSX workbooks.

pub mod analytics;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod report;
pub mod store;

pub use analytics::build_report_data;
pub use models::{ReportData, ReportFilter, ReportFormat};
pub use report::{render, RenderContext, RenderedReport};
pub use store::{JsonStore, RecordStore, Snapshot};
