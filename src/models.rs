use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Academic,
    Extracurricular,
    Volunteering,
}

impl ActivityType {
    pub const ALL: [ActivityType; 3] = [
        ActivityType::Academic,
        ActivityType::Extracurricular,
        ActivityType::Volunteering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Academic => "academic",
            ActivityType::Extracurricular => "extracurricular",
            ActivityType::Volunteering => "volunteering",
        }
    }

    /// Human label used in report tables ("Extra-curricular" etc.).
    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::Academic => "Academic",
            ActivityType::Extracurricular => "Extra-curricular",
            ActivityType::Volunteering => "Volunteering",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "academic" => Ok(ActivityType::Academic),
            "extracurricular" | "extra-curricular" => Ok(ActivityType::Extracurricular),
            "volunteering" => Ok(ActivityType::Volunteering),
            _ => Err(ParseError::unknown("activity type", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Pending,
    Approved,
    Rejected,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Pending => "pending",
            ActivityStatus::Approved => "approved",
            ActivityStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityStatus {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ActivityStatus::Pending),
            "approved" => Ok(ActivityStatus::Approved),
            "rejected" => Ok(ActivityStatus::Rejected),
            _ => Err(ParseError::unknown("activity status", value)),
        }
    }
}

/// A student-submitted activity record as kept in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub status: ActivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

impl Activity {
    pub fn is_approved(&self) -> bool {
        self.status == ActivityStatus::Approved
    }

    /// Reviewer fields must be set exactly when the activity has left `pending`.
    /// Feedback is optional on a reviewed activity.
    pub fn review_fields_consistent(&self) -> bool {
        match self.status {
            ActivityStatus::Pending => {
                self.reviewed_by.is_none() && self.reviewed_at.is_none() && self.feedback.is_none()
            }
            ActivityStatus::Approved | ActivityStatus::Rejected => {
                self.reviewed_by.is_some() && self.reviewed_at.is_some()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Fields owned by other parts of the platform, carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl User {
    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    /// Department for faculty, course for students; empty strings count as missing.
    pub fn department_or_course(&self) -> Option<&str> {
        non_empty(self.department.as_deref()).or_else(|| non_empty(self.course.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Closed calendar interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    #[serde(with = "calendar_date")]
    pub start: NaiveDate,
    #[serde(with = "calendar_date")]
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Optional-field predicate bag. Empty vectors and a missing range impose no
/// constraint; values are OR-ed within a dimension and AND-ed across them.
///
/// Unknown keys are rejected when deserializing, but a known key holding
/// `null` or a malformed value leaves that dimension unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReportFilter {
    #[serde(
        default,
        deserialize_with = "lenient::dimension",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub year: Vec<i32>,
    #[serde(
        default,
        deserialize_with = "lenient::dimension",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub department: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient::dimension",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub activity_type: Vec<ActivityType>,
    #[serde(
        default,
        deserialize_with = "lenient::date_range",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_range: Option<DateRange>,
}

impl ReportFilter {
    pub fn builder() -> ReportFilterBuilder {
        ReportFilterBuilder::default()
    }

    pub fn into_builder(self) -> ReportFilterBuilder {
        ReportFilterBuilder { filter: self }
    }

    pub fn is_empty(&self) -> bool {
        self.year.is_empty()
            && self.department.is_empty()
            && self.activity_type.is_empty()
            && self.date_range.is_none()
    }

    pub fn matches_year(&self, date: NaiveDate) -> bool {
        self.year.is_empty() || self.year.contains(&date.year())
    }

    pub fn matches_type(&self, activity_type: ActivityType) -> bool {
        self.activity_type.is_empty() || self.activity_type.contains(&activity_type)
    }

    pub fn matches_date(&self, date: NaiveDate) -> bool {
        self.date_range.map_or(true, |range| range.contains(date))
    }
}

/// Typed builder over the four recognised filter dimensions.
#[derive(Debug, Clone, Default)]
pub struct ReportFilterBuilder {
    filter: ReportFilter,
}

impl ReportFilterBuilder {
    pub fn year(mut self, year: i32) -> Self {
        push_unique(&mut self.filter.year, year);
        self
    }

    pub fn years(self, years: impl IntoIterator<Item = i32>) -> Self {
        years.into_iter().fold(self, |builder, year| builder.year(year))
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        push_unique(&mut self.filter.department, department.into());
        self
    }

    pub fn departments<S: Into<String>>(self, departments: impl IntoIterator<Item = S>) -> Self {
        departments
            .into_iter()
            .fold(self, |builder, department| builder.department(department))
    }

    pub fn activity_type(mut self, activity_type: ActivityType) -> Self {
        push_unique(&mut self.filter.activity_type, activity_type);
        self
    }

    pub fn activity_types(self, types: impl IntoIterator<Item = ActivityType>) -> Self {
        types
            .into_iter()
            .fold(self, |builder, activity_type| builder.activity_type(activity_type))
    }

    pub fn date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.filter.date_range = Some(DateRange::new(start, end));
        self
    }

    pub fn build(self) -> ReportFilter {
        self.filter
    }
}

fn push_unique<T: PartialEq>(values: &mut Vec<T>, value: T) {
    if !values.contains(&value) {
        values.push(value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTrend {
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_activities: usize,
    pub total_students: usize,
    pub approval_rate: u32,
    pub activities_by_type: BTreeMap<ActivityType, usize>,
    pub activities_by_department: BTreeMap<String, usize>,
    pub monthly_trends: Vec<MonthlyTrend>,
}

impl ReportSummary {
    pub fn type_count(&self, activity_type: ActivityType) -> usize {
        self.activities_by_type
            .get(&activity_type)
            .copied()
            .unwrap_or(0)
    }
}

/// Aggregates plus the records that produced them. Rebuilt for every render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub summary: ReportSummary,
    pub activities: Vec<Activity>,
    pub students: Vec<User>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    Naac,
    Aicte,
    Nirf,
    Internal,
}

impl Template {
    pub const ALL: [Template; 4] = [
        Template::Naac,
        Template::Aicte,
        Template::Nirf,
        Template::Internal,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Template::Naac => "NAAC",
            Template::Aicte => "AICTE",
            Template::Nirf => "NIRF",
            Template::Internal => "Internal",
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Template {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Template::ALL
            .into_iter()
            .find(|template| template.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ParseError::unknown("template", value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// Paginated PDF document.
    Document,
    /// Multi-sheet XLSX workbook.
    Workbook,
}

impl OutputKind {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputKind::Document => "pdf",
            OutputKind::Workbook => "xlsx",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Document => f.write_str("PDF"),
            OutputKind::Workbook => f.write_str("Excel"),
        }
    }
}

impl FromStr for OutputKind {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" | "document" => Ok(OutputKind::Document),
            "excel" | "xlsx" | "workbook" => Ok(OutputKind::Workbook),
            _ => Err(ParseError::unknown("report format", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportFormat {
    pub kind: OutputKind,
    pub template: Template,
}

impl ReportFormat {
    pub fn new(kind: OutputKind, template: Template) -> Self {
        Self { kind, template }
    }
}

/// Reads the calendar date from `YYYY-MM-DD` or any timestamp that starts with one.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

mod calendar_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_calendar_date(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid date '{raw}'")))
    }
}

/// Deserializers for filter dimensions that degrade to "no constraint".
mod lenient {
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::{parse_calendar_date, DateRange};

    /// `null` or anything that is not a list of valid values yields an empty
    /// dimension.
    pub fn dimension<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        match serde_json::from_value(value) {
            Ok(values) => Ok(values),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed filter dimension");
                Ok(Vec::new())
            }
        }
    }

    /// Both bounds must be present and parse as dates; otherwise the range is
    /// dropped. Keys other than `start` and `end` are still rejected.
    pub fn date_range<'de, D>(deserializer: D) -> Result<Option<DateRange>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = match Value::deserialize(deserializer)? {
            Value::Null => return Ok(None),
            Value::Object(map) => map,
            other => {
                tracing::warn!(value = %other, "ignoring malformed date range");
                return Ok(None);
            }
        };

        if let Some(key) = map.keys().find(|key| !matches!(key.as_str(), "start" | "end")) {
            return Err(D::Error::unknown_field(key, &["start", "end"]));
        }

        let bound = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .and_then(parse_calendar_date)
        };
        match (bound("start"), bound("end")) {
            (Some(start), Some(end)) => Ok(Some(DateRange::new(start, end))),
            _ => {
                tracing::warn!("date range needs a valid start and end; ignoring it");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_reads_camel_case_json() {
        let json = r#"{
            "id": "1",
            "studentId": "1",
            "studentName": "Alice Johnson",
            "type": "academic",
            "title": "Research Paper on Machine Learning",
            "description": "Published research paper",
            "date": "2024-01-15",
            "status": "approved",
            "feedback": "Excellent research work",
            "reviewedBy": "Dr. Sarah Wilson",
            "reviewedAt": "2024-01-20",
            "createdAt": "2024-01-15"
        }"#;

        let activity: Activity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.activity_type, ActivityType::Academic);
        assert_eq!(activity.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert!(activity.is_approved());
        assert!(activity.review_fields_consistent());
    }

    #[test]
    fn activity_date_accepts_timestamps() {
        assert_eq!(
            parse_calendar_date("2024-03-09T10:15:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
        assert_eq!(parse_calendar_date("March 9"), None);
    }

    #[test]
    fn pending_activity_with_reviewer_is_inconsistent() {
        let json = r#"{
            "id": "2", "studentId": "1", "studentName": "Alice Johnson",
            "type": "extracurricular", "title": "Hackathon Winner",
            "date": "2024-02-10", "status": "pending", "reviewedBy": "Dr. Sarah Wilson"
        }"#;
        let activity: Activity = serde_json::from_str(json).unwrap();
        assert!(!activity.review_fields_consistent());
    }

    #[test]
    fn user_keeps_unmodelled_fields() {
        let json = r#"{
            "id": "3", "email": "faculty1@university.edu", "password": "password123",
            "role": "faculty", "name": "Dr. Sarah Wilson", "department": "Computer Science"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.department_or_course(), Some("Computer Science"));

        let round_trip = serde_json::to_value(&user).unwrap();
        assert_eq!(round_trip["password"], "password123");
    }

    #[test]
    fn department_falls_back_to_course() {
        let user = User {
            id: "1".to_string(),
            email: "student1@university.edu".to_string(),
            name: "Alice Johnson".to_string(),
            role: Role::Student,
            course: Some("Computer Science".to_string()),
            branch: None,
            year: Some(3),
            department: Some(String::new()),
            extra: BTreeMap::new(),
        };
        assert_eq!(user.department_or_course(), Some("Computer Science"));
    }

    #[test]
    fn filter_rejects_unknown_keys() {
        let err = serde_json::from_str::<ReportFilter>(r#"{"studentStatus": ["active"]}"#);
        assert!(err.is_err());

        let filter: ReportFilter = serde_json::from_str(
            r#"{"year": [2024], "activityType": ["academic"],
                "dateRange": {"start": "2024-01-01", "end": "2024-06-30"}}"#,
        )
        .unwrap();
        assert_eq!(filter.year, vec![2024]);
        assert_eq!(filter.activity_type, vec![ActivityType::Academic]);
        assert!(filter.date_range.is_some());
    }

    #[test]
    fn unknown_date_range_key_is_rejected() {
        let err = serde_json::from_str::<ReportFilter>(
            r#"{"dateRange": {"start": "2024-01-01", "end": "2024-02-01", "tz": "UTC"}}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn null_dimensions_impose_nothing() {
        let filter: ReportFilter = serde_json::from_str(r#"{"year": null}"#).unwrap();
        assert!(filter.is_empty());

        let filter: ReportFilter =
            serde_json::from_str(r#"{"department": null, "activityType": ["academic"]}"#).unwrap();
        assert!(filter.department.is_empty());
        assert_eq!(filter.activity_type, vec![ActivityType::Academic]);
    }

    #[test]
    fn malformed_dimensions_impose_nothing() {
        let filter: ReportFilter = serde_json::from_str(
            r#"{"year": "2024", "activityType": ["academic", "sports"], "department": ["Physics"]}"#,
        )
        .unwrap();
        assert!(filter.year.is_empty());
        assert!(filter.activity_type.is_empty());
        assert_eq!(filter.department, vec!["Physics".to_string()]);
    }

    #[test]
    fn incomplete_date_range_is_dropped() {
        let half: ReportFilter =
            serde_json::from_str(r#"{"dateRange": {"start": "2024-01-01"}}"#).unwrap();
        assert_eq!(half.date_range, None);

        let blank: ReportFilter =
            serde_json::from_str(r#"{"dateRange": {"start": "", "end": ""}}"#).unwrap();
        assert_eq!(blank.date_range, None);

        let wrong_shape: ReportFilter =
            serde_json::from_str(r#"{"dateRange": "2024", "year": [2024]}"#).unwrap();
        assert_eq!(wrong_shape.date_range, None);
        assert_eq!(wrong_shape.year, vec![2024]);
    }

    #[test]
    fn date_range_accepts_timestamps() {
        let filter: ReportFilter = serde_json::from_str(
            r#"{"dateRange": {"start": "2024-01-01T00:00:00Z", "end": "2024-03-31"}}"#,
        )
        .unwrap();
        assert_eq!(
            filter.date_range,
            Some(DateRange::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            ))
        );
    }

    #[test]
    fn builder_deduplicates_values() {
        let filter = ReportFilter::builder()
            .years([2024, 2024, 2023])
            .department("Computer Science")
            .department("Computer Science")
            .build();
        assert_eq!(filter.year, vec![2024, 2023]);
        assert_eq!(filter.department.len(), 1);
        assert!(!filter.is_empty());
        assert!(ReportFilter::default().is_empty());
    }

    #[test]
    fn template_and_kind_parse_case_insensitively() {
        assert_eq!("naac".parse::<Template>().unwrap(), Template::Naac);
        assert_eq!("Internal".parse::<Template>().unwrap(), Template::Internal);
        assert!("QS".parse::<Template>().is_err());
        assert_eq!("Excel".parse::<OutputKind>().unwrap(), OutputKind::Workbook);
        assert_eq!("pdf".parse::<OutputKind>().unwrap(), OutputKind::Document);
        assert_eq!(
            "Extra-curricular".parse::<ActivityType>().unwrap(),
            ActivityType::Extracurricular
        );
    }
}
