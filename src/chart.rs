use crate::analytics::{GradeShare, LabelValue};
use crate::error::{SchoolError, SchoolResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, Rgb, RgbImage};
use serde::Serialize;
use std::f64::consts::PI;
use std::io::Cursor;

pub const BAR_WIDTH: u32 = 640;
pub const BAR_HEIGHT: u32 = 400;
pub const PIE_SIZE: u32 = 400;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([55, 65, 81]);
const GRID: Rgb<u8> = Rgb([229, 231, 235]);

pub const PALETTE: [Rgb<u8>; 8] = [
    Rgb([37, 99, 235]),
    Rgb([249, 115, 22]),
    Rgb([22, 163, 74]),
    Rgb([220, 38, 38]),
    Rgb([147, 51, 234]),
    Rgb([146, 64, 14]),
    Rgb([219, 39, 119]),
    Rgb([107, 114, 128]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    Bar,
    Pie,
}

/// A rendered chart plus the series it was drawn from, so the caller can lay
/// out titles and legends next to the image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartImage {
    pub kind: ChartKind,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub value_labels: Vec<String>,
    pub colors: Vec<String>,
    pub png_base64: String,
}

impl ChartImage {
    pub fn png_bytes(&self) -> SchoolResult<Vec<u8>> {
        STANDARD
            .decode(&self.png_base64)
            .map_err(|e| SchoolError::render("chart", e))
    }

    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.png_base64)
    }
}

fn palette_color(i: usize) -> Rgb<u8> {
    PALETTE[i % PALETTE.len()]
}

fn hex(c: Rgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", c.0[0], c.0[1], c.0[2])
}

fn fill_rect(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    for y in y0.max(0)..y1.min(h) {
        for x in x0.max(0)..x1.min(w) {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

fn encode_png(img: &RgbImage) -> SchoolResult<String> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| SchoolError::render("png", e))?;
    Ok(STANDARD.encode(buf))
}

/// Bar chart of label -> value. The y axis spans 0..max(100, largest value).
pub fn bar_chart(title: &str, rows: &[LabelValue]) -> SchoolResult<ChartImage> {
    let mut img = RgbImage::from_pixel(BAR_WIDTH, BAR_HEIGHT, BACKGROUND);

    let (left, right, top, bottom) = (48_i64, BAR_WIDTH as i64 - 16, 16_i64, BAR_HEIGHT as i64 - 40);
    let plot_h = (bottom - top) as f64;
    let y_max = rows.iter().map(|r| r.value).fold(100.0_f64, f64::max);

    for step in 1..=5 {
        let y = bottom - ((plot_h * step as f64) / 5.0).round() as i64;
        fill_rect(&mut img, left, y, right, y + 1, GRID);
    }

    if !rows.is_empty() {
        let slot = (right - left) as f64 / rows.len() as f64;
        for (i, row) in rows.iter().enumerate() {
            let bar_h = ((row.value.max(0.0) / y_max) * plot_h).round() as i64;
            let x0 = left + (slot * i as f64 + slot * 0.2).round() as i64;
            let x1 = left + (slot * i as f64 + slot * 0.8).round() as i64;
            fill_rect(&mut img, x0, bottom - bar_h, x1.max(x0 + 1), bottom, palette_color(i));
        }
    }

    fill_rect(&mut img, left - 1, top, left + 1, bottom + 1, AXIS);
    fill_rect(&mut img, left - 1, bottom, right, bottom + 2, AXIS);

    Ok(ChartImage {
        kind: ChartKind::Bar,
        title: title.to_string(),
        width: BAR_WIDTH,
        height: BAR_HEIGHT,
        labels: rows.iter().map(|r| r.label.clone()).collect(),
        values: rows.iter().map(|r| r.value).collect(),
        value_labels: rows.iter().map(|r| format!("{:.1}", r.value)).collect(),
        colors: (0..rows.len()).map(|i| hex(palette_color(i))).collect(),
        png_base64: encode_png(&img)?,
    })
}

/// Pie chart of grade -> count, slices clockwise from twelve o'clock in input
/// order. Labels carry the one-decimal percentage.
pub fn pie_chart(title: &str, shares: &[GradeShare]) -> SchoolResult<ChartImage> {
    let mut img = RgbImage::from_pixel(PIE_SIZE, PIE_SIZE, BACKGROUND);
    let center = PIE_SIZE as f64 / 2.0;
    let radius = center - 30.0;

    let total: i64 = shares.iter().map(|s| s.count.max(0)).sum();
    let mut bounds = Vec::with_capacity(shares.len());
    let mut acc = 0_i64;
    for s in shares {
        acc += s.count.max(0);
        bounds.push(if total > 0 { acc as f64 / total as f64 } else { 0.0 });
    }

    for y in 0..PIE_SIZE {
        for x in 0..PIE_SIZE {
            let dx = x as f64 + 0.5 - center;
            let dy = y as f64 + 0.5 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist > radius {
                continue;
            }
            if total == 0 {
                if dist >= radius - 2.0 {
                    img.put_pixel(x, y, GRID);
                }
                continue;
            }
            let mut angle = dx.atan2(-dy);
            if angle < 0.0 {
                angle += 2.0 * PI;
            }
            let frac = angle / (2.0 * PI);
            let idx = bounds
                .iter()
                .position(|b| frac < *b)
                .unwrap_or(bounds.len() - 1);
            img.put_pixel(x, y, palette_color(idx));
        }
    }

    Ok(ChartImage {
        kind: ChartKind::Pie,
        title: title.to_string(),
        width: PIE_SIZE,
        height: PIE_SIZE,
        labels: shares.iter().map(|s| s.grade.clone()).collect(),
        values: shares.iter().map(|s| s.percent).collect(),
        value_labels: shares.iter().map(|s| format!("{:.1}%", s.percent)).collect(),
        colors: (0..shares.len()).map(|i| hex(palette_color(i))).collect(),
        png_base64: encode_png(&img)?,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCharts {
    pub class_bar: ChartImage,
    pub grade_pie: ChartImage,
}

pub fn dashboard_charts(
    class_averages: &[LabelValue],
    grades: &[GradeShare],
) -> SchoolResult<DashboardCharts> {
    Ok(DashboardCharts {
        class_bar: bar_chart("Class-wise Average Marks", class_averages)?,
        grade_pie: pie_chart("Grade Distribution", grades)?,
    })
}
