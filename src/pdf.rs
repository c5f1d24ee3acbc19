//! Minimal PDF 1.4 writer: text in the two standard Helvetica faces and
//! straight rules, enough for tabular reports. No images, no compression.

use std::fmt::Write as _;

pub const A4_WIDTH: f64 = 595.0;
pub const A4_HEIGHT: f64 = 842.0;

// Fixed object numbers; pages start after these.
const CATALOG_OBJ: usize = 1;
const PAGES_OBJ: usize = 2;
const FONT_REGULAR_OBJ: usize = 3;
const FONT_BOLD_OBJ: usize = 4;
const INFO_OBJ: usize = 5;
const FIRST_PAGE_OBJ: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Escapes a string for a PDF literal. Latin-1 characters become octal
/// escapes (WinAnsi matches Latin-1 there); anything else becomes `?`.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            ' '..='~' => out.push(c),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}

#[derive(Debug, Default, Clone)]
pub struct Page {
    ops: String,
}

impl Page {
    pub fn text(&mut self, x: f64, y: f64, size: f64, font: Font, text: &str) {
        let _ = writeln!(
            self.ops,
            "BT /{} {} Tf {:.2} {:.2} Td ({}) Tj ET",
            font.resource(),
            size,
            x,
            y,
            escape_text(text)
        );
    }

    /// Horizontal or vertical rule, `gray` in 0.0 (black) ..= 1.0 (white).
    pub fn rule(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, gray: f64) {
        let _ = writeln!(
            self.ops,
            "{:.2} G 0.5 w {:.2} {:.2} m {:.2} {:.2} l S",
            gray, x1, y1, x2, y2
        );
    }

    pub fn content(&self) -> &str {
        &self.ops
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    title: String,
    pages: Vec<Page>,
}

impl Document {
    pub fn new(title: &str) -> Self {
        Document {
            title: title.to_string(),
            pages: Vec::new(),
        }
    }

    pub fn add_page(&mut self) -> usize {
        self.pages.push(Page::default());
        self.pages.len() - 1
    }

    pub fn page_mut(&mut self, index: usize) -> &mut Page {
        &mut self.pages[index]
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pages = self.pages.clone();
        if pages.is_empty() {
            pages.push(Page::default());
        }
        let object_count = FIRST_PAGE_OBJ + 2 * pages.len();

        let mut out: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; object_count];
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let mut put = |out: &mut Vec<u8>, num: usize, body: &str| {
            offsets[num] = out.len();
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", num, body).as_bytes());
        };

        put(
            &mut out,
            CATALOG_OBJ,
            &format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_OBJ),
        );
        let kids = (0..pages.len())
            .map(|i| format!("{} 0 R", FIRST_PAGE_OBJ + 2 * i))
            .collect::<Vec<_>>()
            .join(" ");
        put(
            &mut out,
            PAGES_OBJ,
            &format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids,
                pages.len()
            ),
        );
        put(
            &mut out,
            FONT_REGULAR_OBJ,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
        );
        put(
            &mut out,
            FONT_BOLD_OBJ,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>",
        );
        put(
            &mut out,
            INFO_OBJ,
            &format!(
                "<< /Title ({}) /Producer (gradebookd {}) >>",
                escape_text(&self.title),
                env!("CARGO_PKG_VERSION")
            ),
        );

        for (i, page) in pages.iter().enumerate() {
            let page_obj = FIRST_PAGE_OBJ + 2 * i;
            let content_obj = page_obj + 1;
            put(
                &mut out,
                page_obj,
                &format!(
                    "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] \
                     /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >> >> /Contents {} 0 R >>",
                    PAGES_OBJ, A4_WIDTH, A4_HEIGHT, FONT_REGULAR_OBJ, FONT_BOLD_OBJ, content_obj
                ),
            );
            let content = page.content();
            put(
                &mut out,
                content_obj,
                &format!(
                    "<< /Length {} >>\nstream\n{}\nendstream",
                    content.len(),
                    content
                ),
            );
        }

        let xref_offset = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", object_count);
        for offset in offsets.iter().skip(1) {
            let _ = write!(xref, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            object_count, CATALOG_OBJ, INFO_OBJ, xref_offset
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}
