//! Multi-sheet workbook. Sheets are assembled as plain rows first and then
//! written out as XLSX.

use rust_xlsxwriter::{Format, Workbook};

use crate::analytics::percentage;
use crate::error::ReportError;
use crate::models::{ActivityType, ReportData, ReportFilter, Template};
use crate::report::template::WorkbookSheet;
use crate::report::{
    department_rows, executive_summary, filter_summary, format_date, format_generated_on,
    MetricValue, RenderContext, REPORT_TITLE,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    /// Column or section header, written in bold.
    Heading(String),
    Blank,
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn heading(value: impl Into<String>) -> Self {
        Cell::Heading(value.into())
    }

    fn count(value: usize) -> Self {
        Cell::Number(value as f64)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) | Cell::Heading(text) => Some(text),
            Cell::Number(_) | Cell::Blank => None,
        }
    }
}

impl From<MetricValue> for Cell {
    fn from(value: MetricValue) -> Self {
        match value {
            MetricValue::Count(count) => Cell::count(count),
            MetricValue::Percent(_) => Cell::Text(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    fn row(&mut self, cells: Vec<Cell>) {
        self.rows.push(cells);
    }

    fn headings(&mut self, labels: &[&str]) {
        self.rows
            .push(labels.iter().map(|label| Cell::heading(*label)).collect());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookModel {
    pub sheets: Vec<Sheet>,
}

impl WorkbookModel {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str()).collect()
    }

    pub fn to_xlsx(&self) -> Result<Vec<u8>, ReportError> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(sheet.name.as_str())?;

            for (row_index, row) in sheet.rows.iter().enumerate() {
                let row_num = row_index as u32;
                for (col_index, cell) in row.iter().enumerate() {
                    let col_num = col_index as u16;
                    match cell {
                        Cell::Text(text) => {
                            worksheet.write_string(row_num, col_num, text.as_str())?;
                        }
                        Cell::Heading(text) => {
                            worksheet.write_string_with_format(
                                row_num,
                                col_num,
                                text.as_str(),
                                &bold,
                            )?;
                        }
                        Cell::Number(value) => {
                            worksheet.write_number(row_num, col_num, *value)?;
                        }
                        Cell::Blank => {}
                    }
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}

pub fn render(
    data: &ReportData,
    template: Template,
    filter: &ReportFilter,
    ctx: &RenderContext,
) -> Result<Vec<u8>, ReportError> {
    build(data, template, filter, ctx).to_xlsx()
}

pub fn build(
    data: &ReportData,
    template: Template,
    filter: &ReportFilter,
    ctx: &RenderContext,
) -> WorkbookModel {
    let sheets = template
        .workbook_sheets()
        .into_iter()
        .map(|sheet| match sheet {
            WorkbookSheet::Summary => summary_sheet(data, template, filter, ctx),
            WorkbookSheet::Activities => activities_sheet(data),
            WorkbookSheet::Students => students_sheet(data),
            WorkbookSheet::MonthlyTrends => trends_sheet(data),
            WorkbookSheet::Criteria => criteria_sheet(data, template),
        })
        .collect();

    WorkbookModel { sheets }
}

fn summary_sheet(
    data: &ReportData,
    template: Template,
    filter: &ReportFilter,
    ctx: &RenderContext,
) -> Sheet {
    let mut sheet = Sheet::new("Summary");

    sheet.row(vec![Cell::heading(format!("{REPORT_TITLE} - {template}"))]);
    sheet.row(vec![
        Cell::text("Generated on:"),
        Cell::text(format_generated_on(ctx.generated_at)),
    ]);
    sheet.row(vec![
        Cell::text("Report Filters:"),
        Cell::text(filter_summary(filter)),
    ]);
    sheet.row(vec![Cell::Blank]);

    sheet.row(vec![Cell::heading("Executive Summary")]);
    sheet.headings(&["Metric", "Value"]);
    for (label, value) in executive_summary(&data.summary) {
        sheet.row(vec![Cell::text(label), Cell::from(value)]);
    }
    sheet.row(vec![Cell::Blank]);

    sheet.row(vec![Cell::heading("Department-wise Distribution")]);
    sheet.headings(&["Department", "Activities", "Percentage"]);
    for row in department_rows(&data.summary) {
        sheet.row(vec![
            Cell::text(row.department),
            Cell::count(row.count),
            Cell::from(row.share),
        ]);
    }

    sheet
}

fn activities_sheet(data: &ReportData) -> Sheet {
    let mut sheet = Sheet::new("Activities");
    sheet.headings(&[
        "Student Name",
        "Activity Title",
        "Activity Type",
        "Date",
        "Status",
        "Description",
        "Reviewed By",
        "Feedback",
    ]);

    for activity in &data.activities {
        sheet.row(vec![
            Cell::text(activity.student_name.as_str()),
            Cell::text(activity.title.as_str()),
            Cell::text(activity.activity_type.as_str()),
            Cell::text(format_date(activity.date)),
            Cell::text(activity.status.as_str()),
            Cell::text(activity.description.as_str()),
            Cell::text(activity.reviewed_by.clone().unwrap_or_default()),
            Cell::text(activity.feedback.clone().unwrap_or_default()),
        ]);
    }

    sheet
}

/// Per-student totals are counted here from the report's activity list rather
/// than taken from the aggregated summary.
fn students_sheet(data: &ReportData) -> Sheet {
    let mut sheet = Sheet::new("Students");
    sheet.headings(&[
        "Student Name",
        "Email",
        "Course/Department",
        "Year",
        "Total Activities",
        "Approved Activities",
    ]);

    for student in &data.students {
        let (total, approved) = data
            .activities
            .iter()
            .filter(|activity| activity.student_id == student.id)
            .fold((0usize, 0usize), |(total, approved), activity| {
                (total + 1, approved + usize::from(activity.is_approved()))
            });

        let course = student
            .course
            .as_deref()
            .filter(|c| !c.is_empty())
            .or(student.department.as_deref())
            .unwrap_or_default();

        sheet.row(vec![
            Cell::text(student.name.as_str()),
            Cell::text(student.email.as_str()),
            Cell::text(course),
            Cell::text(student.year.map(|y| y.to_string()).unwrap_or_default()),
            Cell::count(total),
            Cell::count(approved),
        ]);
    }

    sheet
}

fn trends_sheet(data: &ReportData) -> Sheet {
    let mut sheet = Sheet::new("Monthly Trends");
    sheet.headings(&["Month", "Activity Count"]);
    for trend in &data.summary.monthly_trends {
        sheet.row(vec![Cell::text(trend.month.as_str()), Cell::count(trend.count)]);
    }
    sheet
}

/// Participation and approval rate per category. A category with no
/// activities divides by 1, so its rate reads 0%.
fn criteria_sheet(data: &ReportData, template: Template) -> Sheet {
    let mut sheet = Sheet::new(format!("{template} Criteria"));
    sheet.headings(&[
        "Criteria",
        "Academic",
        "Extra-curricular",
        "Volunteering",
        "Total",
    ]);

    let mut participation = vec![Cell::text("Student Participation")];
    let mut approval = vec![Cell::text("Approval Rate")];

    for activity_type in ActivityType::ALL {
        let in_category = data.summary.type_count(activity_type);
        let approved = data
            .activities
            .iter()
            .filter(|a| a.activity_type == activity_type && a.is_approved())
            .count();

        participation.push(Cell::count(in_category));
        approval.push(Cell::from(MetricValue::Percent(percentage(
            approved,
            in_category.max(1),
        ))));
    }

    participation.push(Cell::count(data.summary.total_activities));
    approval.push(Cell::from(MetricValue::Percent(data.summary.approval_rate)));

    sheet.row(participation);
    sheet.row(approval);
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::build_report_data;
    use crate::models::{Activity, ActivityStatus};
    use crate::store::{sample_snapshot, Snapshot};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn ctx() -> RenderContext {
        RenderContext::default().at(Utc.with_ymd_and_hms(2024, 3, 18, 9, 0, 0).unwrap())
    }

    fn sample_data(filter: &ReportFilter) -> ReportData {
        build_report_data(
            &sample_snapshot(),
            filter,
            NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
        )
    }

    fn text_at(sheet: &Sheet, row: usize, col: usize) -> Option<&str> {
        sheet.rows.get(row)?.get(col)?.as_text()
    }

    #[test]
    fn sheet_sets_follow_template() {
        let data = sample_data(&ReportFilter::default());
        let filter = ReportFilter::default();

        assert_eq!(
            build(&data, Template::Naac, &filter, &ctx()).sheet_names(),
            vec!["Summary", "Activities", "Students", "NAAC Criteria"]
        );
        assert_eq!(
            build(&data, Template::Nirf, &filter, &ctx()).sheet_names(),
            vec!["Summary", "Activities", "Students", "Monthly Trends"]
        );
        assert_eq!(
            build(&data, Template::Internal, &filter, &ctx()).sheet_names(),
            vec!["Summary", "Activities", "Students", "Monthly Trends"]
        );
    }

    #[test]
    fn summary_sheet_flattens_header_and_tables() {
        let filter = ReportFilter::builder().year(2024).build();
        let data = sample_data(&filter);
        let model = build(&data, Template::Aicte, &filter, &ctx());
        let summary = model.sheet("Summary").unwrap();

        assert_eq!(text_at(summary, 0, 0), Some("Student Activity Report - AICTE"));
        assert_eq!(text_at(summary, 1, 1), Some("18/3/2024"));
        assert_eq!(text_at(summary, 2, 1), Some("Years: 2024"));
        assert_eq!(summary.rows[6], vec![Cell::text("Total Activities"), Cell::Number(3.0)]);
        assert_eq!(text_at(summary, 8, 1), Some("67%"));
        assert_eq!(text_at(summary, 13, 0), Some("Department-wise Distribution"));
        assert_eq!(
            summary.rows[15],
            vec![
                Cell::text("Computer Science"),
                Cell::Number(2.0),
                Cell::text("67%")
            ]
        );
    }

    #[test]
    fn students_sheet_counts_per_student() {
        let data = sample_data(&ReportFilter::default());
        let model = build(&data, Template::Internal, &ReportFilter::default(), &ctx());
        let students = model.sheet("Students").unwrap();

        assert_eq!(students.rows.len(), 3);
        assert_eq!(
            students.rows[1],
            vec![
                Cell::text("Alice Johnson"),
                Cell::text("student1@university.edu"),
                Cell::text("Computer Science"),
                Cell::text("3"),
                Cell::Number(2.0),
                Cell::Number(1.0),
            ]
        );
    }

    #[test]
    fn activities_sheet_has_reviewer_columns() {
        let data = sample_data(&ReportFilter::default());
        let model = build(&data, Template::Nirf, &ReportFilter::default(), &ctx());
        let activities = model.sheet("Activities").unwrap();

        assert_eq!(activities.rows.len(), 4);
        assert_eq!(text_at(activities, 1, 3), Some("15 Jan 2024"));
        assert_eq!(text_at(activities, 1, 6), Some("Dr. Sarah Wilson"));
        assert_eq!(text_at(activities, 2, 6), Some(""));
    }

    #[test]
    fn criteria_rates_guard_empty_categories() {
        let data = sample_data(&ReportFilter::default());
        let model = build(&data, Template::Naac, &ReportFilter::default(), &ctx());
        let criteria = model.sheet("NAAC Criteria").unwrap();

        assert_eq!(
            criteria.rows[1],
            vec![
                Cell::text("Student Participation"),
                Cell::Number(1.0),
                Cell::Number(1.0),
                Cell::Number(1.0),
                Cell::Number(3.0),
            ]
        );
        assert_eq!(
            criteria.rows[2],
            vec![
                Cell::text("Approval Rate"),
                Cell::text("100%"),
                Cell::text("0%"),
                Cell::text("100%"),
                Cell::text("67%"),
            ]
        );

        let empty = build_report_data(
            &Snapshot::default(),
            &ReportFilter::default(),
            NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
        );
        let model = build(&empty, Template::Aicte, &ReportFilter::default(), &ctx());
        let criteria = model.sheet("AICTE Criteria").unwrap();
        assert!(criteria.rows[2][1..].iter().all(|cell| cell == &Cell::text("0%")));
    }

    #[test]
    fn trends_sheet_has_twelve_rows() {
        let data = sample_data(&ReportFilter::default());
        let model = build(&data, Template::Nirf, &ReportFilter::default(), &ctx());
        let trends = model.sheet("Monthly Trends").unwrap();

        assert_eq!(trends.rows.len(), 13);
        assert_eq!(trends.rows[10], vec![Cell::text("Jan 2024"), Cell::Number(2.0)]);
    }

    #[test]
    fn writes_xlsx_bytes() {
        let mut snapshot = sample_snapshot();
        snapshot.activities.push(Activity {
            id: "4".to_string(),
            status: ActivityStatus::Rejected,
            reviewed_by: Some("Dr. Sarah Wilson".to_string()),
            reviewed_at: Some("2024-02-12".to_string()),
            ..snapshot.activities[1].clone()
        });
        let data = build_report_data(
            &snapshot,
            &ReportFilter::default(),
            NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
        );

        let bytes = render(&data, Template::Naac, &ReportFilter::default(), &ctx()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
