//! Paginated A4 document. The layout is computed into a [`PagedDocument`]
//! first, so the page count is known when footers are stamped, and then
//! written out as PDF.

use printpdf::{BuiltinFont, Line, Mm, PdfDocument, Point};

use crate::error::ReportError;
use crate::models::{ReportData, ReportFilter, Template};
use crate::report::template::DocumentSection;
use crate::report::{
    department_rows, detail_rows, executive_summary, filter_summary, format_generated_on,
    RenderContext, REPORT_TITLE,
};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const CONTENT_BOTTOM_MM: f32 = PAGE_HEIGHT_MM - 20.0;
const FOOTER_BASELINE_MM: f32 = PAGE_HEIGHT_MM - 10.0;
/// A section heading past this line starts on a fresh page.
const SECTION_BREAK_MM: f32 = 200.0;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH_EM: f32 = 0.5;
const CELL_PADDING_MM: f32 = 1.5;
/// Stroke width of table grid lines, in points.
const GRID_STROKE_PT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// A line of text positioned in millimetres; `y` is the baseline measured
/// from the top of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub weight: FontWeight,
}

/// A straight grid line between two points, in the same coordinates as
/// [`TextRun`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub from: (f32, f32),
    pub to: (f32, f32),
}

impl Rule {
    pub fn is_horizontal(&self) -> bool {
        self.from.1 == self.to.1
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub runs: Vec<TextRun>,
    pub rules: Vec<Rule>,
}

impl Page {
    pub fn contains(&self, needle: &str) -> bool {
        self.runs.iter().any(|run| run.text.contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagedDocument {
    pub pages: Vec<Page>,
}

impl PagedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.pages.iter().any(|page| page.contains(needle))
    }

    pub fn to_pdf(&self, title: &str) -> Result<Vec<u8>, ReportError> {
        let (doc, first_page, first_layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;

        for (index, page) in self.pages.iter().enumerate() {
            let (page_index, layer_index) = if index == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content")
            };
            let layer = doc.get_page(page_index).get_layer(layer_index);
            layer.set_outline_thickness(GRID_STROKE_PT);

            for rule in &page.rules {
                layer.add_line(Line {
                    points: vec![
                        (pdf_point(rule.from), false),
                        (pdf_point(rule.to), false),
                    ],
                    is_closed: false,
                });
            }

            for run in &page.runs {
                let font = match run.weight {
                    FontWeight::Regular => &regular,
                    FontWeight::Bold => &bold,
                };
                layer.use_text(
                    run.text.clone(),
                    run.size,
                    Mm(run.x),
                    Mm(PAGE_HEIGHT_MM - run.y),
                    font,
                );
            }
        }

        doc.save_to_bytes().map_err(pdf_error)
    }
}

/// Layout coordinates measure `y` from the top; PDF measures from the bottom.
fn pdf_point((x, y): (f32, f32)) -> Point {
    Point::new(Mm(x), Mm(PAGE_HEIGHT_MM - y))
}

fn pdf_error<E: std::fmt::Debug>(err: E) -> ReportError {
    ReportError::Pdf(format!("{err:?}"))
}

pub fn render(
    data: &ReportData,
    template: Template,
    filter: &ReportFilter,
    ctx: &RenderContext,
) -> Result<Vec<u8>, ReportError> {
    let document = layout(data, template, filter, ctx);
    document.to_pdf(&format!("{template} {REPORT_TITLE}"))
}

/// Lays out header, executive summary, the template's sections and footers.
pub fn layout(
    data: &ReportData,
    template: Template,
    filter: &ReportFilter,
    ctx: &RenderContext,
) -> PagedDocument {
    let mut pages = Layout::new();

    pages.centered(&format!("{template} {REPORT_TITLE}"), 20.0, 20.0, FontWeight::Bold);
    pages.y = 35.0;
    pages.line(
        &format!("Generated on: {}", format_generated_on(ctx.generated_at)),
        12.0,
        FontWeight::Regular,
    );
    pages.y = 45.0;
    pages.paragraph(
        &format!("Report Filters: {}", filter_summary(filter)),
        12.0,
    );
    pages.y = pages.y.max(60.0);

    pages.heading("Executive Summary");
    let summary_rows: Vec<Vec<String>> = executive_summary(&data.summary)
        .into_iter()
        .map(|(label, value)| vec![label.to_string(), value.to_string()])
        .collect();
    pages.table(&[("Metric", 85.0), ("Value", 85.0)], &summary_rows, 10.0);

    for section in template.document_sections(data.activities.len()) {
        match section {
            DocumentSection::DepartmentDistribution => {
                pages.break_if_past(SECTION_BREAK_MM);
                pages.heading("Department-wise Activity Distribution");
                let rows: Vec<Vec<String>> = department_rows(&data.summary)
                    .into_iter()
                    .map(|row| {
                        vec![row.department, row.count.to_string(), row.share.to_string()]
                    })
                    .collect();
                pages.table(
                    &[("Department", 80.0), ("Activities", 45.0), ("Percentage", 45.0)],
                    &rows,
                    10.0,
                );
            }
            DocumentSection::MonthlyTrends => {
                pages.break_if_past(SECTION_BREAK_MM);
                pages.heading("Monthly Activity Trends");
                let rows: Vec<Vec<String>> = data
                    .summary
                    .monthly_trends
                    .iter()
                    .map(|trend| vec![trend.month.clone(), trend.count.to_string()])
                    .collect();
                pages.table(&[("Month", 85.0), ("Activities", 85.0)], &rows, 10.0);
            }
            DocumentSection::ActivityDetails => {
                pages.new_page();
                pages.heading("Detailed Activity List");
                let rows: Vec<Vec<String>> = detail_rows(&data.activities)
                    .into_iter()
                    .map(Vec::from)
                    .collect();
                pages.table(
                    &[
                        ("Student", 35.0),
                        ("Activity", 60.0),
                        ("Type", 25.0),
                        ("Date", 25.0),
                        ("Status", 25.0),
                    ],
                    &rows,
                    8.0,
                );
            }
        }
    }

    let mut document = PagedDocument { pages: pages.pages };
    stamp_footers(&mut document, template, &ctx.platform_name);
    document
}

fn stamp_footers(document: &mut PagedDocument, template: Template, platform_name: &str) {
    let total = document.pages.len();
    for (index, page) in document.pages.iter_mut().enumerate() {
        let text = format!(
            "Page {} of {} | {} | {} Report",
            index + 1,
            total,
            platform_name,
            template
        );
        let x = centered_x(&text, 10.0);
        page.runs.push(TextRun {
            text,
            x,
            y: FOOTER_BASELINE_MM,
            size: 10.0,
            weight: FontWeight::Regular,
        });
    }
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * GLYPH_WIDTH_EM
}

fn centered_x(text: &str, size: f32) -> f32 {
    ((PAGE_WIDTH_MM - text_width(text, size)) / 2.0).max(0.0)
}

/// Shortens `text` to fit `width` millimetres, marking the cut with "...".
fn fit(text: &str, width: f32, size: f32) -> String {
    let capacity = (width / (size * PT_TO_MM * GLYPH_WIDTH_EM)).floor() as usize;
    if text.chars().count() <= capacity {
        return text.to_string();
    }
    let kept: String = text.chars().take(capacity.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Splits on whitespace into lines no wider than `width` millimetres.
fn wrap(text: &str, width: f32, size: f32) -> Vec<String> {
    let capacity = ((width / (size * PT_TO_MM * GLYPH_WIDTH_EM)).floor() as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed =
            current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if !current.is_empty() && needed > capacity {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Cursor over a growing list of pages.
struct Layout {
    pages: Vec<Page>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: MARGIN_MM,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = MARGIN_MM;
    }

    fn break_if_past(&mut self, limit: f32) {
        if self.y > limit {
            self.new_page();
        }
    }

    fn push(&mut self, text: String, x: f32, size: f32, weight: FontWeight) {
        let y = self.y;
        if let Some(page) = self.pages.last_mut() {
            page.runs.push(TextRun {
                text,
                x,
                y,
                size,
                weight,
            });
        }
    }

    fn rule(&mut self, from: (f32, f32), to: (f32, f32)) {
        if let Some(page) = self.pages.last_mut() {
            page.rules.push(Rule { from, to });
        }
    }

    fn centered(&mut self, text: &str, y: f32, size: f32, weight: FontWeight) {
        self.y = y;
        self.push(text.to_string(), centered_x(text, size), size, weight);
    }

    fn line(&mut self, text: &str, size: f32, weight: FontWeight) {
        self.push(text.to_string(), MARGIN_MM, size, weight);
    }

    fn paragraph(&mut self, text: &str, size: f32) {
        let line_height = size * PT_TO_MM * 1.5;
        for line in wrap(text, PAGE_WIDTH_MM - 2.0 * MARGIN_MM, size) {
            self.line(&line, size, FontWeight::Regular);
            self.y += line_height;
        }
    }

    fn heading(&mut self, title: &str) {
        self.line(title, 16.0, FontWeight::Bold);
        self.y += 15.0;
    }

    /// Grid table starting at the cursor. The header row repeats on every page
    /// the table spills onto and opens the grid there; the cursor ends 20 mm
    /// below the last row.
    fn table(&mut self, columns: &[(&str, f32)], rows: &[Vec<String>], size: f32) {
        let row_height = size * PT_TO_MM * 1.15 + 2.0 * CELL_PADDING_MM + 1.0;
        let headers: Vec<&str> = columns.iter().map(|(header, _)| *header).collect();

        if self.y + 2.0 * row_height > CONTENT_BOTTOM_MM {
            self.new_page();
        }
        self.table_row(&headers, columns, size, row_height, FontWeight::Bold);

        for row in rows {
            if self.y + row_height > CONTENT_BOTTOM_MM {
                self.new_page();
                self.table_row(&headers, columns, size, row_height, FontWeight::Bold);
            }
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            self.table_row(&cells, columns, size, row_height, FontWeight::Regular);
        }

        self.y += 20.0;
    }

    fn table_row(
        &mut self,
        cells: &[&str],
        columns: &[(&str, f32)],
        size: f32,
        row_height: f32,
        weight: FontWeight,
    ) {
        let top = self.y;
        let bottom = top + row_height;
        let right = MARGIN_MM + columns.iter().map(|(_, width)| width).sum::<f32>();
        let mut x = MARGIN_MM;

        if weight == FontWeight::Bold {
            self.rule((MARGIN_MM, top), (right, top));
        }
        self.rule((MARGIN_MM, bottom), (right, bottom));
        self.rule((MARGIN_MM, top), (MARGIN_MM, bottom));

        self.y = bottom - CELL_PADDING_MM - 1.0;
        for (cell, (_, width)) in cells.iter().zip(columns) {
            let text = fit(cell, width - 2.0 * CELL_PADDING_MM, size);
            self.push(text, x + CELL_PADDING_MM, size, weight);
            x += width;
            self.rule((x, top), (x, bottom));
        }
        self.y = bottom;
    }
}
