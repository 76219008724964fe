//! Plain-text analysis report.

use chrono::{DateTime, Utc};

use crate::record::VerdictRecord;
use crate::verdict::Verdict;

const RULE: &str = "==================================================";

/// Confidence as shown in reports; whole numbers keep one decimal (`83.0`).
fn format_confidence(confidence: f64) -> String {
    if confidence.is_finite() && confidence.fract() == 0.0 {
        format!("{confidence:.1}")
    } else {
        confidence.to_string()
    }
}

/// Render the downloadable text report for a verdict record.
pub fn render_report(record: &VerdictRecord, generated_at: DateTime<Utc>) -> String {
    let model = record
        .model_path
        .as_deref()
        .unwrap_or("Demo Frame Analysis");

    let confidence = format_confidence(record.confidence);
    let mut report = format!(
        "DEEPFAKE DETECTION ANALYSIS REPORT\n\
         =====================================\n\
         \n\
         Video File: {video}\n\
         Analysis Date: {timestamp}\n\
         \n\
         DETECTION RESULT:\n\
         -----------------\n\
         Verdict: {verdict}\n\
         Confidence: {confidence}%\n\
         \n\
         ANALYSIS MODE:\n\
         -----------------\n\
         Mode: {mode}\n\
         Model: {model}\n\
         \n\
         INTERPRETATION:\n\
         -----------------\n",
        video = record.video,
        timestamp = record.timestamp,
        verdict = record.verdict,
        confidence = confidence,
        mode = record.mode,
        model = model,
    );

    match record.verdict {
        Verdict::Real => report.push_str(
            "This video appears to be AUTHENTIC.\n\
             No significant AI generation artifacts were detected.\n",
        ),
        Verdict::Fake => report.push_str(
            "This video appears to be AI-GENERATED or MANIPULATED.\n\
             The analysis detected characteristics consistent with deepfake techniques.\n",
        ),
    }

    report.push_str(&format!("\nConfidence Level: {confidence}%\n"));
    report.push_str("\n(Higher confidence = stronger evidence for the verdict)\n");
    report.push('\n');
    report.push_str(RULE);
    report.push('\n');
    report.push_str(&format!(
        "Report Generated: {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    report
}

/// Attachment file name for a report: `report_<video stem>.txt`.
pub fn report_filename(video: &str) -> String {
    let stem = video.split('.').next().filter(|s| !s.is_empty()).unwrap_or("video");
    format!("report_{stem}.txt")
}
