use std::collections::HashSet;

use crate::models::{Activity, ReportFilter, User};
use crate::store::Snapshot;

/// Activities and students left after a filter pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredRecords {
    pub activities: Vec<Activity>,
    pub students: Vec<User>,
}

/// Narrows the snapshot one dimension at a time: year, department, activity
/// type, then date range. Dimensions left empty impose nothing.
pub fn apply(snapshot: &Snapshot, filter: &ReportFilter) -> FilteredRecords {
    let mut activities: Vec<Activity> = snapshot.activities.clone();
    let mut students: Vec<User> = snapshot
        .users
        .iter()
        .filter(|user| user.is_student())
        .cloned()
        .collect();

    activities.retain(|activity| filter.matches_year(activity.date));

    if !filter.department.is_empty() {
        students.retain(|student| {
            let department = student.department_or_course().unwrap_or("");
            filter.department.iter().any(|wanted| wanted == department)
        });
        let student_ids: HashSet<&str> = students.iter().map(|s| s.id.as_str()).collect();
        activities.retain(|activity| student_ids.contains(activity.student_id.as_str()));
    }

    activities.retain(|activity| filter.matches_type(activity.activity_type));
    activities.retain(|activity| filter.matches_date(activity.date));

    tracing::debug!(
        activities = activities.len(),
        students = students.len(),
        "filter applied"
    );

    FilteredRecords {
        activities,
        students,
    }
}
