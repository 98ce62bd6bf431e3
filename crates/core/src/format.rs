use crate::{
    analyzer::NO_CTA_PLACEHOLDER,
    types::{AnalysisResult, Finding},
};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Numbered sentences with their approximate start times
pub fn format_sentences_with_timestamps(result: &AnalysisResult) -> String {
    result
        .sentences
        .iter()
        .zip(&result.timings)
        .map(|(sentence, timing)| {
            format!(
                "[{}] #{} {}",
                format_timestamp(timing.start_sec),
                sentence.index,
                sentence.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_finding(finding: &Finding, missing: &str) -> String {
    match (finding.text(), finding.start_sec) {
        (Some(text), Some(start)) => format!(
            "[~{}] \"{}\" (sentence #{})",
            format_timestamp(start),
            text,
            finding.index()
        ),
        _ => missing.to_string(),
    }
}

/// Format an analysis as human-readable markdown
pub fn format_analysis_readable(result: &AnalysisResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", result.source_id));
    output.push_str(&format!(
        "**Duration:** {} | **Sentences:** {} | **Keyframes:** {}\n\n",
        format_timestamp(result.duration_secs),
        result.sentences.len(),
        result.keyframes.len()
    ));

    output.push_str("## Hook\n\n");
    output.push_str(&format_finding(&result.hook, "Not found"));
    output.push_str("\n\n");

    output.push_str("## Call to action\n\n");
    output.push_str(&format_finding(&result.cta, NO_CTA_PLACEHOLDER));
    output.push_str("\n\n");

    if !result.sentences.is_empty() {
        output.push_str("## Transcript\n\n");
        output.push_str(&format_sentences_with_timestamps(result));
        output.push_str("\n\n");
    }

    output.push_str("## Artifacts\n\n");
    output.push_str(&format!("• Report: {}\n", result.report));
    if let (Some(first), Some(last)) = (result.keyframes.first(), result.keyframes.last()) {
        output.push_str(&format!("• Keyframes: {} … {}\n", first, last));
    }

    output
}
