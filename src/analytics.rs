use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Months, NaiveDate};

use crate::filter::{self, FilteredRecords};
use crate::models::{
    Activity, ActivityType, MonthlyTrend, ReportData, ReportFilter, ReportSummary, User,
};
use crate::store::Snapshot;

pub const UNKNOWN_DEPARTMENT: &str = "Unknown";
pub const TREND_MONTHS: u32 = 12;

/// Filters the snapshot and aggregates what is left.
pub fn build_report_data(
    snapshot: &Snapshot,
    filter: &ReportFilter,
    today: NaiveDate,
) -> ReportData {
    let filtered = filter::apply(snapshot, filter);
    let summary = summarize(&filtered, &snapshot.users, today);

    tracing::debug!(
        total_activities = summary.total_activities,
        total_students = summary.total_students,
        approval_rate = summary.approval_rate,
        "report data rebuilt"
    );

    ReportData {
        summary,
        activities: filtered.activities,
        students: filtered.students,
    }
}

/// `all_users` is the unfiltered user list; department lookups go through it
/// even when a department filter narrowed `filtered.students`.
pub fn summarize(
    filtered: &FilteredRecords,
    all_users: &[User],
    today: NaiveDate,
) -> ReportSummary {
    ReportSummary {
        total_activities: filtered.activities.len(),
        total_students: filtered.students.len(),
        approval_rate: approval_rate(&filtered.activities),
        activities_by_type: count_by_type(&filtered.activities),
        activities_by_department: count_by_department(&filtered.activities, all_users),
        monthly_trends: monthly_trends(&filtered.activities, today),
    }
}

pub fn count_by_type(activities: &[Activity]) -> BTreeMap<ActivityType, usize> {
    let mut counts = BTreeMap::new();
    for activity in activities {
        *counts.entry(activity.activity_type).or_insert(0) += 1;
    }
    counts
}

pub fn count_by_department(activities: &[Activity], all_users: &[User]) -> BTreeMap<String, usize> {
    let mut by_id: HashMap<&str, &User> = HashMap::new();
    for user in all_users {
        by_id.entry(user.id.as_str()).or_insert(user);
    }

    let mut counts = BTreeMap::new();

    for activity in activities {
        let department = by_id
            .get(activity.student_id.as_str())
            .and_then(|student| student.department_or_course())
            .unwrap_or(UNKNOWN_DEPARTMENT);
        *counts.entry(department.to_string()).or_insert(0) += 1;
    }

    counts
}

/// Activity counts for the twelve calendar months ending with `today`'s month,
/// oldest first, labelled like "Jan 2024".
pub fn monthly_trends(activities: &[Activity], today: NaiveDate) -> Vec<MonthlyTrend> {
    let current = first_of_month(today);

    (0..TREND_MONTHS)
        .rev()
        .map(|back| {
            let month = current
                .checked_sub_months(Months::new(back))
                .unwrap_or(current);
            let count = activities
                .iter()
                .filter(|a| a.date.year() == month.year() && a.date.month() == month.month())
                .count();
            MonthlyTrend {
                month: month.format("%b %Y").to_string(),
                count,
            }
        })
        .collect()
}

/// Percentage of approved activities rounded to the nearest integer; 0 when empty.
pub fn approval_rate(activities: &[Activity]) -> u32 {
    let approved = activities.iter().filter(|a| a.is_approved()).count();
    percentage(approved, activities.len())
}

/// `round(100 * part / whole)`, or 0 for an empty whole.
pub fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 * 100.0 / whole as f64).round() as u32
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
