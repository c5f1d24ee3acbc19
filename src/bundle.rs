use crate::chart::DashboardCharts;
use crate::report::{self, ReportData};
use anyhow::{anyhow, Context};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const PDF_ENTRY: &str = "report.pdf";
const HTML_ENTRY: &str = "report.html";
const CLASS_CHART_ENTRY: &str = "charts/class_averages.png";
const GRADE_CHART_ENTRY: &str = "charts/grade_distribution.png";
pub const BUNDLE_FORMAT_V1: &str = "gradebook-report-v1";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    pub name: String,
    pub sha256: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub bundle_format: String,
    pub path: String,
    pub entries: Vec<BundleEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySummary {
    pub bundle_format: String,
    pub generated_at: String,
    pub verified_entries: usize,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Writes `report.pdf`, `report.html` and both chart PNGs into a zip, plus a
/// manifest carrying a SHA-256 per entry.
pub fn export_report_bundle(
    data: &ReportData,
    charts: &DashboardCharts,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let payloads: Vec<(&str, Vec<u8>)> = vec![
        (PDF_ENTRY, report::render_pdf(data).to_bytes()),
        (HTML_ENTRY, report::render_html(data, charts)?.into_bytes()),
        (CLASS_CHART_ENTRY, charts.class_bar.png_bytes()?),
        (GRADE_CHART_ENTRY, charts.grade_pie.png_bytes()?),
    ];

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let entries: Vec<BundleEntry> = payloads
        .iter()
        .map(|(name, bytes)| BundleEntry {
            name: name.to_string(),
            sha256: sha256_hex(bytes),
            size: bytes.len(),
        })
        .collect();

    // The PNGs carry no text; their titles and legends travel here and in
    // report.html.
    let chart_meta: Vec<serde_json::Value> = [
        (CLASS_CHART_ENTRY, &charts.class_bar),
        (GRADE_CHART_ENTRY, &charts.grade_pie),
    ]
    .iter()
    .map(|(entry, chart)| {
        json!({
            "entry": entry,
            "title": chart.title,
            "labels": chart.labels,
            "valueLabels": chart.value_labels,
            "colors": chart.colors,
            "legendIn": HTML_ENTRY,
        })
    })
    .collect();

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "generatedAt": data.generated_at,
        "studentCount": data.students.len(),
        "entries": entries,
        "charts": chart_meta,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (name, bytes) in &payloads {
        zip.start_file(*name, opts)
            .with_context(|| format!("failed to start entry {}", name))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write entry {}", name))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;
    tracing::info!(path = %out_path.display(), entries = entries.len(), "wrote report bundle");

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        path: out_path.to_string_lossy().to_string(),
        entries,
    })
}

/// Re-reads a bundle and checks each manifest digest against its entry.
pub fn verify_report_bundle(in_path: &Path) -> anyhow::Result<VerifySummary> {
    if !is_zip_file(in_path)? {
        return Err(anyhow!(
            "not a zip bundle: {}",
            in_path.to_string_lossy()
        ));
    }
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let entries = manifest
        .get("entries")
        .and_then(|v| v.as_array())
        .context("manifest has no entries")?;
    for entry in entries {
        let name = entry
            .get("name")
            .and_then(|v| v.as_str())
            .context("manifest entry without name")?;
        let expected = entry
            .get("sha256")
            .and_then(|v| v.as_str())
            .context("manifest entry without sha256")?;
        let mut bytes = Vec::new();
        archive
            .by_name(name)
            .with_context(|| format!("bundle missing {}", name))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read {}", name))?;
        let actual = sha256_hex(&bytes);
        if actual != expected {
            return Err(anyhow!(
                "digest mismatch for {}: expected {}, found {}",
                name,
                expected,
                actual
            ));
        }
    }

    Ok(VerifySummary {
        bundle_format: format.to_string(),
        generated_at: manifest
            .get("generatedAt")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        verified_entries: entries.len(),
    })
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::dashboard_charts;

    fn empty_data() -> ReportData {
        ReportData {
            generated_at: "2026-01-01 00:00 UTC".to_string(),
            students: Vec::new(),
            student_marks: Vec::new(),
            class_counts: Vec::new(),
            class_averages: Vec::new(),
            class_standings: Vec::new(),
            grades: Vec::new(),
        }
    }

    #[test]
    fn export_then_verify() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("nested").join("bundle.zip");
        let data = empty_data();
        let charts = dashboard_charts(&[], &[]).expect("charts");

        let summary = export_report_bundle(&data, &charts, &out).expect("export");
        assert_eq!(summary.entries.len(), 4);
        assert!(summary.entries.iter().all(|e| e.sha256.len() == 64 && e.size > 0));

        let mut manifest_text = String::new();
        ZipArchive::new(File::open(&out).expect("open"))
            .expect("zip")
            .by_name(MANIFEST_ENTRY)
            .expect("manifest")
            .read_to_string(&mut manifest_text)
            .expect("read");
        let manifest: serde_json::Value = serde_json::from_str(&manifest_text).expect("json");
        assert_eq!(
            manifest.pointer("/charts/0/entry"),
            Some(&json!(CLASS_CHART_ENTRY))
        );
        assert_eq!(
            manifest.pointer("/charts/0/title"),
            Some(&json!("Class-wise Average Marks"))
        );
        assert_eq!(
            manifest.pointer("/charts/1/legendIn"),
            Some(&json!(HTML_ENTRY))
        );

        let verified = verify_report_bundle(&out).expect("verify");
        assert_eq!(verified.bundle_format, BUNDLE_FORMAT_V1);
        assert_eq!(verified.generated_at, "2026-01-01 00:00 UTC");
        assert_eq!(verified.verified_entries, 4);
    }

    #[test]
    fn verify_detects_tampered_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("tampered.zip");
        let mut zip = ZipWriter::new(File::create(&out).expect("create"));
        let opts = FileOptions::default();
        let manifest = json!({
            "format": BUNDLE_FORMAT_V1,
            "generatedAt": "x",
            "entries": [{ "name": HTML_ENTRY, "sha256": sha256_hex(b"original"), "size": 8 }],
        });
        zip.start_file(MANIFEST_ENTRY, opts).expect("start");
        zip.write_all(manifest.to_string().as_bytes()).expect("write");
        zip.start_file(HTML_ENTRY, opts).expect("start");
        zip.write_all(b"modified").expect("write");
        zip.finish().expect("finish");

        let e = verify_report_bundle(&out).expect_err("digest mismatch");
        assert!(e.to_string().contains("digest mismatch"));
    }

    #[test]
    fn verify_rejects_unknown_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("other.zip");
        let mut zip = ZipWriter::new(File::create(&out).expect("create"));
        zip.start_file(MANIFEST_ENTRY, FileOptions::default())
            .expect("start");
        zip.write_all(br#"{"format":"something-else","entries":[]}"#)
            .expect("write");
        zip.finish().expect("finish");

        let e = verify_report_bundle(&out).expect_err("format");
        assert!(e.to_string().contains("unsupported bundle format"));
    }
}
