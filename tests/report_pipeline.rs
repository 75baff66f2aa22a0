use std::fs;

use chrono::{NaiveDate, TimeZone, Utc};

use student_activity_reports::models::{ActivityType, OutputKind, ReportFormat, Template};
use student_activity_reports::report::workbook;
use student_activity_reports::{
    build_report_data, render, JsonStore, RecordStore, RenderContext, ReportFilter,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 18).unwrap()
}

fn context() -> RenderContext {
    RenderContext::new("Campus Portal").at(Utc.with_ymd_and_hms(2024, 3, 18, 9, 30, 0).unwrap())
}

fn seeded_store(dir: &std::path::Path) -> JsonStore {
    let store = JsonStore::new(dir);
    store.seed().unwrap();

    let csv_path = dir.join("import.csv");
    fs::write(
        &csv_path,
        "student_name,student_email,course,year,type,title,description,date,status,reviewed_by,feedback,reviewed_at,id\n\
         Carol Diaz,carol@university.edu,Mechanical Engineering,1,volunteering,Beach Cleanup,,2024-03-05,approved,Prof. Michael Brown,Great,2024-03-06T10:00:00Z,\n\
         Alice Johnson,student1@university.edu,Computer Science,3,academic,Research Poster,,2024-02-20,pending,,,,\n",
    )
    .unwrap();
    assert_eq!(store.import_csv(&csv_path).unwrap(), 2);
    store
}

#[test]
fn imported_records_flow_into_the_summary() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());
    let snapshot = store.snapshot().unwrap();

    let data = build_report_data(&snapshot, &ReportFilter::default(), today());
    let summary = &data.summary;

    assert_eq!(summary.total_activities, 5);
    assert_eq!(summary.total_students, 3);
    assert_eq!(summary.approval_rate, 60);
    assert_eq!(summary.type_count(ActivityType::Academic), 2);
    assert_eq!(summary.type_count(ActivityType::Volunteering), 2);
    assert_eq!(summary.activities_by_department.get("Computer Science"), Some(&3));
    assert_eq!(summary.activities_by_department.get("Mechanical Engineering"), Some(&1));
    assert_eq!(summary.monthly_trends.len(), 12);
    assert_eq!(summary.monthly_trends.last().unwrap().count, 1);
}

#[test]
fn department_filter_narrows_students_and_activities() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());
    let snapshot = store.snapshot().unwrap();

    let filter = ReportFilter::builder()
        .department("Computer Science")
        .activity_type(ActivityType::Academic)
        .build();
    let data = build_report_data(&snapshot, &filter, today());

    assert_eq!(data.summary.total_activities, 2);
    assert_eq!(data.summary.total_students, 1);
    assert!(data
        .activities
        .iter()
        .all(|activity| activity.student_name == "Alice Johnson"));
}

#[test]
fn rendered_reports_are_saved_under_their_file_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());
    let snapshot = store.snapshot().unwrap();
    let filter = ReportFilter::builder().year(2024).build();
    let data = build_report_data(&snapshot, &filter, today());
    let out_dir = dir.path().join("reports");

    let pdf = render(
        &data,
        ReportFormat::new(OutputKind::Document, Template::Naac),
        &filter,
        &context(),
    )
    .unwrap();
    assert_eq!(pdf.file_name, "NAAC_Activity_Report_2024-03-18.pdf");
    assert!(pdf.bytes.starts_with(b"%PDF"));

    let xlsx = render(
        &data,
        ReportFormat::new(OutputKind::Workbook, Template::Internal),
        &filter,
        &context(),
    )
    .unwrap();
    assert_eq!(xlsx.file_name, "Internal_Activity_Report_2024-03-18.xlsx");
    assert!(xlsx.bytes.starts_with(b"PK"));

    let pdf_path = pdf.save(&out_dir).unwrap();
    let xlsx_path = xlsx.save(&out_dir).unwrap();
    assert_eq!(fs::read(pdf_path).unwrap(), pdf.bytes);
    assert_eq!(fs::read(xlsx_path).unwrap(), xlsx.bytes);
}

#[test]
fn workbook_lists_every_filtered_student() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(dir.path());
    let snapshot = store.snapshot().unwrap();
    let filter = ReportFilter::default();
    let data = build_report_data(&snapshot, &filter, today());

    let model = workbook::build(&data, Template::Aicte, &filter, &context());
    assert_eq!(
        model.sheet_names(),
        vec!["Summary", "Activities", "Students", "AICTE Criteria"]
    );

    let students = model.sheet("Students").unwrap();
    // header plus one row per student
    assert_eq!(students.rows.len(), 4);
    let activities = model.sheet("Activities").unwrap();
    assert_eq!(activities.rows.len(), 6);
}
