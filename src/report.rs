use crate::analytics::{self, ClassStanding, GradeShare, LabelValue, SortOrder, StudentMark};
use crate::chart::{ChartImage, DashboardCharts};
use crate::error::{SchoolError, SchoolResult};
use crate::models::StudentWithClass;
use crate::pdf::{Document, Font, A4_HEIGHT, A4_WIDTH};
use crate::store::RecordStore;
use serde::Serialize;
use std::path::Path;
use std::sync::OnceLock;
use tera::{Context, Tera};

/// Everything a report shows, read from the store in one pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub generated_at: String,
    pub students: Vec<StudentWithClass>,
    pub student_marks: Vec<StudentMark>,
    pub class_counts: Vec<LabelValue>,
    pub class_averages: Vec<LabelValue>,
    pub class_standings: Vec<ClassStanding>,
    pub grades: Vec<GradeShare>,
}

pub fn collect(store: &RecordStore) -> SchoolResult<ReportData> {
    Ok(ReportData {
        generated_at: chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        students: store.list_students_with_class()?,
        student_marks: analytics::student_marks(store)?,
        class_counts: analytics::class_counts(store, SortOrder::Grouped)?,
        class_averages: analytics::class_averages(store, SortOrder::Grouped)?,
        class_standings: analytics::class_standings(store)?,
        grades: analytics::grade_distribution(store, SortOrder::Grouped)?,
    })
}

fn opt_i64(v: Option<i64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

// ---------------------------------------------------------------------------
// HTML

const DASHBOARD_TEMPLATE: &str = "dashboard.html";

static TEMPLATES: OnceLock<Result<Tera, String>> = OnceLock::new();

/// The dashboard template, registered once. The `.html` name keeps Tera's
/// autoescaping on for every interpolated value.
fn templates() -> SchoolResult<&'static Tera> {
    TEMPLATES
        .get_or_init(|| {
            let mut tera = Tera::default();
            tera.add_raw_template(
                DASHBOARD_TEMPLATE,
                include_str!("templates/dashboard.html"),
            )
            .map_err(|e| error_chain(&e))?;
            Ok(tera)
        })
        .as_ref()
        .map_err(|e| SchoolError::render("html", e))
}

fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[derive(Serialize)]
struct LegendItem<'a> {
    label: &'a str,
    value: &'a str,
    color: &'a str,
}

#[derive(Serialize)]
struct ChartCard<'a> {
    title: &'a str,
    data_uri: String,
    legend: Vec<LegendItem<'a>>,
}

impl<'a> ChartCard<'a> {
    fn from_chart(chart: &'a ChartImage) -> Self {
        ChartCard {
            title: &chart.title,
            data_uri: chart.data_uri(),
            legend: chart
                .labels
                .iter()
                .zip(&chart.value_labels)
                .zip(&chart.colors)
                .map(|((label, value), color)| LegendItem {
                    label,
                    value,
                    color,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct CountRow<'a> {
    label: &'a str,
    students: i64,
}

#[derive(Serialize)]
struct MarkRow<'a> {
    name: &'a str,
    marks: String,
}

pub fn render_html(data: &ReportData, charts: &DashboardCharts) -> SchoolResult<String> {
    let cards = [
        ChartCard::from_chart(&charts.class_bar),
        ChartCard::from_chart(&charts.grade_pie),
    ];
    let class_counts: Vec<CountRow<'_>> = data
        .class_counts
        .iter()
        .map(|c| CountRow {
            label: &c.label,
            students: c.value as i64,
        })
        .collect();
    let student_marks: Vec<MarkRow<'_>> = data
        .student_marks
        .iter()
        .map(|s| MarkRow {
            name: &s.name,
            marks: opt_i64(s.marks),
        })
        .collect();

    let mut context = Context::new();
    context.insert("generated_at", &data.generated_at);
    context.insert("charts", &cards);
    context.insert("class_counts", &class_counts);
    context.insert("student_marks", &student_marks);

    templates()?
        .render(DASHBOARD_TEMPLATE, &context)
        .map_err(|e| SchoolError::render("html", error_chain(&e)))
}

// ---------------------------------------------------------------------------
// PDF

const MARGIN: f64 = 40.0;
const TOP: f64 = A4_HEIGHT - MARGIN;
const BOTTOM: f64 = 56.0;
const ROW_HEIGHT: f64 = 14.0;
const BODY_SIZE: f64 = 9.0;

struct Column {
    header: &'static str,
    x: f64,
    max_chars: usize,
}

fn col(header: &'static str, x: f64, max_chars: usize) -> Column {
    Column {
        header,
        x,
        max_chars,
    }
}

fn student_columns() -> [Column; 10] {
    [
        col("Roll", MARGIN, 6),
        col("Name", 78.0, 26),
        col("Class", 210.0, 16),
        col("Section", 295.0, 8),
        col("Gender", 340.0, 8),
        col("Marks", 385.0, 6),
        col("Grade", 420.0, 6),
        col("Notebook", 455.0, 4),
        col("Copy", 500.0, 4),
        col("Projects", 530.0, 5),
    ]
}

fn class_columns() -> [Column; 3] {
    [
        col("Class", MARGIN, 40),
        col("Students", 280.0, 8),
        col("Average marks", 360.0, 10),
    ]
}

fn grade_columns() -> [Column; 3] {
    [
        col("Grade", MARGIN, 20),
        col("Students", 280.0, 8),
        col("Share", 360.0, 10),
    ]
}

fn clip(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('~');
    out
}

/// Running write position across pages.
struct Cursor {
    page: usize,
    y: f64,
}

fn ensure_room(doc: &mut Document, cur: &mut Cursor, needed: f64) -> bool {
    if cur.y - needed >= BOTTOM {
        return false;
    }
    cur.page = doc.add_page();
    cur.y = TOP;
    true
}

fn table_header(doc: &mut Document, cur: &mut Cursor, columns: &[Column]) {
    let page = doc.page_mut(cur.page);
    for c in columns {
        page.text(c.x, cur.y, BODY_SIZE, Font::Bold, c.header);
    }
    page.rule(MARGIN, cur.y - 4.0, A4_WIDTH - MARGIN, cur.y - 4.0, 0.2);
    cur.y -= ROW_HEIGHT;
}

/// Draws a titled table, repeating the header row after each page break.
fn draw_table(
    doc: &mut Document,
    cur: &mut Cursor,
    title: &str,
    columns: &[Column],
    rows: &[Vec<String>],
    empty_message: &str,
) {
    ensure_room(doc, cur, 3.0 * ROW_HEIGHT + 10.0);
    doc.page_mut(cur.page)
        .text(MARGIN, cur.y, 12.0, Font::Bold, title);
    cur.y -= ROW_HEIGHT + 6.0;
    table_header(doc, cur, columns);

    if rows.is_empty() {
        doc.page_mut(cur.page)
            .text(MARGIN, cur.y, BODY_SIZE, Font::Regular, empty_message);
        cur.y -= ROW_HEIGHT;
    }
    for row in rows {
        if ensure_room(doc, cur, ROW_HEIGHT) {
            table_header(doc, cur, columns);
        }
        let page = doc.page_mut(cur.page);
        for (c, cell) in columns.iter().zip(row) {
            page.text(c.x, cur.y, BODY_SIZE, Font::Regular, &clip(cell, c.max_chars));
        }
        page.rule(MARGIN, cur.y - 4.0, A4_WIDTH - MARGIN, cur.y - 4.0, 0.85);
        cur.y -= ROW_HEIGHT;
    }
    cur.y -= ROW_HEIGHT;
}

fn student_rows(data: &ReportData) -> Vec<Vec<String>> {
    data.students
        .iter()
        .map(|row| {
            let s = &row.student;
            vec![
                opt_i64(s.roll),
                s.name.clone(),
                row.class_name.clone().unwrap_or_default(),
                s.section.clone(),
                s.gender.clone().unwrap_or_default(),
                opt_i64(s.marks),
                s.grade.clone().unwrap_or_default(),
                yes_no(s.notebook).to_string(),
                yes_no(s.copy_checked).to_string(),
                s.projects.to_string(),
            ]
        })
        .collect()
}

fn class_rows(data: &ReportData) -> Vec<Vec<String>> {
    data.class_standings
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.students.to_string(),
                c.average
                    .map(|avg| format!("{:.1}", avg))
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect()
}

fn grade_rows(data: &ReportData) -> Vec<Vec<String>> {
    data.grades
        .iter()
        .map(|g| {
            vec![
                g.grade.clone(),
                g.count.to_string(),
                format!("{:.1}%", g.percent),
            ]
        })
        .collect()
}

/// Lays the report out as an A4 document: student table, then class and
/// grade summaries, then page numbers.
pub fn render_pdf(data: &ReportData) -> Document {
    let mut doc = Document::new("Student Report");
    let mut cur = Cursor {
        page: doc.add_page(),
        y: TOP,
    };

    {
        let page = doc.page_mut(cur.page);
        page.text(MARGIN, cur.y, 18.0, Font::Bold, "Student Report");
        page.text(
            MARGIN,
            cur.y - 16.0,
            BODY_SIZE,
            Font::Regular,
            &format!(
                "Generated {} - {} students",
                data.generated_at,
                data.students.len()
            ),
        );
    }
    cur.y -= 44.0;

    draw_table(
        &mut doc,
        &mut cur,
        "Students",
        &student_columns(),
        &student_rows(data),
        "No student records.",
    );
    draw_table(
        &mut doc,
        &mut cur,
        "Class Summary",
        &class_columns(),
        &class_rows(data),
        "No classes with students.",
    );
    draw_table(
        &mut doc,
        &mut cur,
        "Grade Distribution",
        &grade_columns(),
        &grade_rows(data),
        "No graded students.",
    );

    let total = doc.page_count();
    for i in 0..total {
        doc.page_mut(i).text(
            A4_WIDTH - MARGIN - 50.0,
            MARGIN - 16.0,
            8.0,
            Font::Regular,
            &format!("Page {} of {}", i + 1, total),
        );
    }
    doc
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfSummary {
    pub path: String,
    pub page_count: usize,
    pub student_count: usize,
    pub byte_count: usize,
}

pub fn write_pdf(data: &ReportData, out_path: &Path) -> SchoolResult<PdfSummary> {
    let doc = render_pdf(data);
    let bytes = doc.to_bytes();
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SchoolError::render("pdf", e))?;
    }
    std::fs::write(out_path, &bytes).map_err(|e| SchoolError::render("pdf", e))?;
    tracing::info!(
        path = %out_path.display(),
        pages = doc.page_count(),
        students = data.students.len(),
        "wrote pdf report"
    );
    Ok(PdfSummary {
        path: out_path.to_string_lossy().to_string(),
        page_count: doc.page_count(),
        student_count: data.students.len(),
        byte_count: bytes.len(),
    })
}
