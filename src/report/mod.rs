//! Report rendering: shared header/summary content plus one renderer per
//! output kind. Which sections appear is decided by the template's plan in
//! [`template`].

pub mod document;
pub mod template;
pub mod workbook;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone};

use crate::analytics::percentage;
use crate::error::ReportError;
use crate::models::{
    Activity, ActivityType, OutputKind, ReportData, ReportFilter, ReportFormat, ReportSummary,
};

pub const REPORT_TITLE: &str = "Student Activity Report";
pub const DEFAULT_PLATFORM_NAME: &str = "Student Activity Platform";
pub const NO_FILTERS: &str = "No filters applied";

/// Detailed activity tables never list more than this many rows.
pub const DETAIL_ROW_LIMIT: usize = 100;

/// Inputs that are not part of the data: when the report was produced and
/// the platform name printed in footers. `generated_at` keeps its UTC offset
/// so header and file name show the local calendar date.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub generated_at: DateTime<FixedOffset>,
    pub platform_name: String,
}

impl RenderContext {
    pub fn new(platform_name: impl Into<String>) -> Self {
        Self {
            generated_at: Local::now().fixed_offset(),
            platform_name: platform_name.into(),
        }
    }

    pub fn at<Tz: TimeZone>(mut self, generated_at: DateTime<Tz>) -> Self {
        self.generated_at = generated_at.fixed_offset();
        self
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(DEFAULT_PLATFORM_NAME)
    }
}

/// A finished report held in memory until it is saved.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl RenderedReport {
    /// Writes the report into `dir` under its computed file name.
    pub fn save(&self, dir: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

pub fn render(
    data: &ReportData,
    format: ReportFormat,
    filter: &ReportFilter,
    ctx: &RenderContext,
) -> Result<RenderedReport, ReportError> {
    let bytes = match format.kind {
        OutputKind::Document => document::render(data, format.template, filter, ctx)?,
        OutputKind::Workbook => workbook::render(data, format.template, filter, ctx)?,
    };

    tracing::debug!(
        template = %format.template,
        kind = %format.kind,
        bytes = bytes.len(),
        "report rendered"
    );

    Ok(RenderedReport {
        file_name: file_name(format, ctx.generated_at.date_naive()),
        bytes,
    })
}

/// `<template>_Activity_Report_<YYYY-MM-DD>.<ext>`
pub fn file_name(format: ReportFormat, date: NaiveDate) -> String {
    format!(
        "{}_Activity_Report_{}.{}",
        format.template.label(),
        date.format("%Y-%m-%d"),
        format.kind.extension()
    )
}

/// One "Label: values" part per active dimension, joined with " | ".
pub fn filter_summary(filter: &ReportFilter) -> String {
    let mut parts = Vec::new();

    if !filter.year.is_empty() {
        parts.push(format!("Years: {}", join(&filter.year)));
    }
    if !filter.department.is_empty() {
        parts.push(format!("Departments: {}", filter.department.join(", ")));
    }
    if !filter.activity_type.is_empty() {
        parts.push(format!("Types: {}", join(&filter.activity_type)));
    }
    if let Some(range) = filter.date_range {
        parts.push(format!(
            "Date Range: {} - {}",
            format_date(range.start),
            format_date(range.end)
        ));
    }

    if parts.is_empty() {
        NO_FILTERS.to_string()
    } else {
        parts.join(" | ")
    }
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Activity dates in tables: "15 Jan 2024".
pub fn format_date(date: NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}

/// Generation date in report headers: "15/1/2024".
pub fn format_generated_on(generated_at: DateTime<FixedOffset>) -> String {
    generated_at.format("%-d/%-m/%Y").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricValue {
    Count(usize),
    Percent(u32),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Count(count) => write!(f, "{count}"),
            MetricValue::Percent(percent) => write!(f, "{percent}%"),
        }
    }
}

/// Executive summary rows shared by both output kinds. Categories with no
/// activities read as 0.
pub fn executive_summary(summary: &ReportSummary) -> Vec<(&'static str, MetricValue)> {
    vec![
        ("Total Activities", MetricValue::Count(summary.total_activities)),
        ("Active Students", MetricValue::Count(summary.total_students)),
        ("Approval Rate", MetricValue::Percent(summary.approval_rate)),
        (
            "Academic Activities",
            MetricValue::Count(summary.type_count(ActivityType::Academic)),
        ),
        (
            "Extra-curricular Activities",
            MetricValue::Count(summary.type_count(ActivityType::Extracurricular)),
        ),
        (
            "Volunteering Activities",
            MetricValue::Count(summary.type_count(ActivityType::Volunteering)),
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentRow {
    pub department: String,
    pub count: usize,
    pub share: MetricValue,
}

/// Department distribution with each department's share of all filtered
/// activities. The share is 0% rather than undefined when nothing matched.
pub fn department_rows(summary: &ReportSummary) -> Vec<DepartmentRow> {
    summary
        .activities_by_department
        .iter()
        .map(|(department, &count)| DepartmentRow {
            department: department.clone(),
            count,
            share: MetricValue::Percent(percentage(count, summary.total_activities)),
        })
        .collect()
}

/// Student, title, type, date and status for the first
/// [`DETAIL_ROW_LIMIT`] activities, in their stored order.
pub fn detail_rows(activities: &[Activity]) -> Vec<[String; 5]> {
    activities
        .iter()
        .take(DETAIL_ROW_LIMIT)
        .map(|activity| {
            [
                activity.student_name.clone(),
                activity.title.clone(),
                activity.activity_type.to_string(),
                format_date(activity.date),
                activity.status.to_string(),
            ]
        })
        .collect()
}
