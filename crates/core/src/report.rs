use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::{
    analyzer::NO_CTA_PLACEHOLDER,
    error::{AnalysisError, Result},
    types::Finding,
};

pub const TRANSCRIPT_PREVIEW_CHARS: usize = 1000;
pub const SHEET_NAME: &str = "Video Analysis";

#[derive(Debug, Clone, PartialEq)]
pub enum ReportValue {
    Text(String),
    Number(i64),
}

impl From<&str> for ReportValue {
    fn from(value: &str) -> Self {
        ReportValue::Text(value.to_string())
    }
}

impl From<String> for ReportValue {
    fn from(value: String) -> Self {
        ReportValue::Text(value)
    }
}

impl From<i64> for ReportValue {
    fn from(value: i64) -> Self {
        ReportValue::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub metric: &'static str,
    pub value: ReportValue,
}

impl ReportRow {
    pub fn new(metric: &'static str, value: impl Into<ReportValue>) -> Self {
        Self {
            metric,
            value: value.into(),
        }
    }
}

/// The summarizable parts of a finished analysis.
pub struct ReportSummary<'a> {
    pub source_id: &'a str,
    pub duration_secs: u64,
    pub hook: &'a Finding,
    pub cta: &'a Finding,
    pub transcript: &'a str,
    pub keyframe_count: usize,
}

pub trait ReportWriter: Send + Sync {
    fn write_report(&self, rows: &[ReportRow], dest: &Path) -> Result<PathBuf>;
}

/// First [`TRANSCRIPT_PREVIEW_CHARS`] characters, with `...` when cut.
pub fn transcript_preview(transcript: &str) -> String {
    match transcript.char_indices().nth(TRANSCRIPT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &transcript[..cut]),
        None => transcript.to_string(),
    }
}

fn approx_time(finding: &Finding) -> ReportValue {
    match finding.start_sec {
        Some(secs) => ReportValue::Number(secs as i64),
        None => ReportValue::Text("n/a".to_string()),
    }
}

pub fn report_rows(summary: &ReportSummary<'_>) -> Vec<ReportRow> {
    vec![
        ReportRow::new("Video URL or file", summary.source_id),
        ReportRow::new("Duration (s)", summary.duration_secs as i64),
        ReportRow::new("Hook", summary.hook.text().unwrap_or("Not found")),
        ReportRow::new("Hook sentence index", summary.hook.index()),
        ReportRow {
            metric: "Hook approx time (s)",
            value: approx_time(summary.hook),
        },
        ReportRow::new("CTA", summary.cta.text().unwrap_or(NO_CTA_PLACEHOLDER)),
        ReportRow::new("CTA sentence index", summary.cta.index()),
        ReportRow {
            metric: "CTA approx time (s)",
            value: approx_time(summary.cta),
        },
        ReportRow::new("Transcript (truncated)", transcript_preview(summary.transcript)),
        ReportRow::new("Keyframes extracted (count)", summary.keyframe_count as i64),
    ]
}

/// Writes a single-sheet `.xlsx` with Metric/Value columns.
#[derive(Debug, Default, Clone, Copy)]
pub struct XlsxReportWriter;

impl XlsxReportWriter {
    fn build(rows: &[ReportRow], dest: &Path) -> std::result::Result<(), XlsxError> {
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;
        worksheet.set_column_width(0, 30)?;
        worksheet.set_column_width(1, 80)?;
        worksheet.write_string_with_format(0, 0, "Metric", &header)?;
        worksheet.write_string_with_format(0, 1, "Value", &header)?;

        for (i, row) in rows.iter().enumerate() {
            let r = i as u32 + 1;
            worksheet.write_string(r, 0, row.metric)?;
            match &row.value {
                ReportValue::Text(text) => worksheet.write_string(r, 1, text.as_str())?,
                ReportValue::Number(n) => worksheet.write_number(r, 1, *n as f64)?,
            };
        }

        workbook.save(dest)
    }
}

impl ReportWriter for XlsxReportWriter {
    fn write_report(&self, rows: &[ReportRow], dest: &Path) -> Result<PathBuf> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AnalysisError::Report {
                report_path: dest.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        Self::build(rows, dest).map_err(|e| AnalysisError::Report {
            report_path: dest.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(dest.to_path_buf())
    }
}
