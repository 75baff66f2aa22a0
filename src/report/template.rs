//! Per-template section plans. Adding a template means adding a variant and
//! its plan here; the renderers only walk the plans.

use crate::models::Template;
use crate::report::DETAIL_ROW_LIMIT;

/// Sections that may follow the header and executive summary in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSection {
    DepartmentDistribution,
    MonthlyTrends,
    ActivityDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookSheet {
    Summary,
    Activities,
    Students,
    MonthlyTrends,
    Criteria,
}

impl Template {
    pub fn document_sections(&self, activity_count: usize) -> Vec<DocumentSection> {
        let mut sections = Vec::new();

        match self {
            Template::Naac | Template::Aicte => {
                sections.push(DocumentSection::DepartmentDistribution)
            }
            Template::Nirf => sections.push(DocumentSection::MonthlyTrends),
            Template::Internal => {}
        }

        if *self == Template::Internal || activity_count <= DETAIL_ROW_LIMIT {
            sections.push(DocumentSection::ActivityDetails);
        }

        sections
    }

    pub fn workbook_sheets(&self) -> Vec<WorkbookSheet> {
        let mut sheets = vec![
            WorkbookSheet::Summary,
            WorkbookSheet::Activities,
            WorkbookSheet::Students,
        ];

        match self {
            Template::Nirf | Template::Internal => sheets.push(WorkbookSheet::MonthlyTrends),
            Template::Naac | Template::Aicte => sheets.push(WorkbookSheet::Criteria),
        }

        sheets
    }
}
