//! Plain-file renderings of a stored analysis.

use originality_core::{AnalysisRecord, DetectionStatus, HighlightedSegment, InputType};
use serde_json::json;

use crate::output::{suggestion_marker, uniqueness_label};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Colored terminal report
    Terminal,
    /// Plain text report
    Text,
    /// One row per similarity match
    Csv,
    /// Record, matches and highlighted segments
    Json,
}

const BANNER: &str =
    "================================================================================";
const RULE: &str =
    "--------------------------------------------------------------------------------";

pub fn render(
    record: &AnalysisRecord,
    segments: &[HighlightedSegment],
    format: ExportFormat,
) -> Result<String, serde_json::Error> {
    Ok(match format {
        ExportFormat::Terminal | ExportFormat::Text => export_text(record),
        ExportFormat::Csv => export_csv(record),
        ExportFormat::Json => export_json(record, segments)?,
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn export_text(record: &AnalysisRecord) -> String {
    let referenced = record.matches.iter().filter(|m| m.is_referenced).count();
    let unreferenced = record.matches.len() - referenced;
    let input = match record.input_type {
        InputType::Pdf => "PDF Document",
        InputType::Text => "Text Input",
    };
    let score = record
        .overall_similarity_score
        .map(|s| format!("{:.1}%", s))
        .unwrap_or_else(|| "N/A".to_string());
    let detection = match record.reference_detection_status {
        Some(DetectionStatus::Success) => "Successful",
        _ => "Failed",
    };

    let mut out = String::new();
    out.push_str(&format!(
        "{BANNER}\nACADEMIC RESEARCH SIMILARITY & ORIGINALITY ANALYSIS REPORT\n{BANNER}\n\n"
    ));
    out.push_str(&format!("ANALYSIS DETAILS\n{RULE}\n"));
    out.push_str(&format!("Title: {}\n", record.title));
    out.push_str(&format!("Input Type: {}\n", input));
    out.push_str(&format!("Status: {}\n\n", capitalize(record.status.as_str())));

    out.push_str(&format!("ORIGINALITY ASSESSMENT\n{RULE}\n"));
    out.push_str(&format!("Overall Similarity Score: {}\n", score));
    out.push_str(&format!(
        "Uniqueness Level: {}\n",
        uniqueness_label(record.uniqueness_level)
    ));
    out.push_str(&format!("Reference Detection: {}\n\n", detection));
    out.push_str(&format!("Properly Referenced Matches: {}\n", referenced));
    out.push_str(&format!("Unreferenced Matches: {}\n", unreferenced));

    if let Some(o) = &record.research_overview {
        out.push_str(&format!("\nRESEARCH OVERVIEW\n{RULE}\n"));
        out.push_str(&format!("Problem Summary: {}\n", o.problem_summary));
        out.push_str(&format!("Methodology: {}\n", o.methodology));
        out.push_str(&format!("Contribution: {}\n", o.contribution));
        out.push_str(&format!("Research Domain: {}\n", o.domain));
    }

    if !record.matches.is_empty() {
        out.push_str(&format!("\nSIMILARITY MATCHES\n{RULE}\n"));
        for (i, m) in record.matches.iter().enumerate() {
            out.push_str(&format!("\n[{}] {}\n", i + 1, m.paper_title));
            out.push_str(&format!("    Source: {}\n", m.paper_source));
            out.push_str(&format!("    Similarity: {:.1}%\n", m.similarity_percentage));
            out.push_str(&format!(
                "    Status: {}\n",
                if m.is_referenced {
                    "Properly Referenced"
                } else {
                    "UNREFERENCED"
                }
            ));
            out.push_str(&format!("    Section: {}\n", m.section_name));
            if !m.paper_url.is_empty() {
                out.push_str(&format!("    URL: {}\n", m.paper_url));
            }
            out.push_str(&format!("\n    Your Text: \"{}\"\n", m.matched_text_user));
            out.push_str(&format!("    Matched Concept: \"{}\"\n", m.matched_text_paper));
        }
    }

    if !record.guidance_suggestions.is_empty() {
        out.push_str(&format!("\nRECOMMENDATIONS\n{RULE}\n"));
        for s in &record.guidance_suggestions {
            out.push_str(&format!("{} {}\n", suggestion_marker(s.kind), s.message));
        }
    }

    out.push_str(&format!(
        "\n{BANNER}\nDISCLAIMER\n{RULE}\n\
Similarity results are relative to the indexed academic literature and do not\n\
constitute a plagiarism verdict. This analysis is provided for academic guidance\n\
purposes only.\n{BANNER}\n"
    ));
    out
}

fn csv_escape(s: &str) -> String {
    if s.contains('"') || s.contains(',') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn export_csv(record: &AnalysisRecord) -> String {
    let mut out = String::from(
        "Paper Title,Source,Similarity %,Referenced,Section,Your Text,Matched Text,URL\n",
    );
    for m in &record.matches {
        let row = [
            csv_escape(&m.paper_title),
            csv_escape(&m.paper_source),
            format!("{:.1}", m.similarity_percentage),
            if m.is_referenced { "Yes" } else { "No" }.to_string(),
            csv_escape(&m.section_name),
            csv_escape(&m.matched_text_user),
            csv_escape(&m.matched_text_paper),
            csv_escape(&m.paper_url),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn export_json(
    record: &AnalysisRecord,
    segments: &[HighlightedSegment],
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&json!({
        "analysis": record,
        "highlightedSegments": segments,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use originality_core::{
        AnalysisStatus, PdfExtractionStatus, SimilarityMatch, UniquenessLevel,
    };

    fn record() -> AnalysisRecord {
        AnalysisRecord {
            id: 1,
            title: "Draft".into(),
            input_type: InputType::Text,
            original_text: "Body".into(),
            pdf_extraction_status: PdfExtractionStatus::NotApplicable,
            status: AnalysisStatus::Completed,
            body_text: Some("Body".into()),
            references_text: Some("References".into()),
            reference_detection_status: Some(DetectionStatus::Success),
            overall_similarity_score: Some(33.34),
            uniqueness_level: Some(UniquenessLevel::Medium),
            research_overview: None,
            novelty_analysis: None,
            identified_assumptions: None,
            guidance_suggestions: vec![],
            matches: vec![SimilarityMatch {
                paper_title: "Graphs, \"revisited\"".into(),
                paper_source: "arXiv".into(),
                paper_url: "http://arxiv.org/abs/1".into(),
                matched_text_user: "Body".into(),
                matched_text_paper: "body".into(),
                similarity_percentage: 33.34,
                is_referenced: true,
                section_name: "Introduction".into(),
            }],
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn csv_quotes_commas_and_quotes() {
        let csv = export_csv(&record());
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("Paper Title,Source"));
        assert_eq!(
            lines.next().unwrap(),
            "\"Graphs, \"\"revisited\"\"\",arXiv,33.3,Yes,Introduction,Body,body,http://arxiv.org/abs/1"
        );
    }

    #[test]
    fn text_report_summarizes_assessment() {
        let text = export_text(&record());
        assert!(text.contains("Status: Completed"));
        assert!(text.contains("Overall Similarity Score: 33.3%"));
        assert!(text.contains("Reference Detection: Successful"));
        assert!(text.contains("Properly Referenced Matches: 1"));
        assert!(!text.contains("RESEARCH OVERVIEW"));
    }

    #[test]
    fn json_wraps_record_and_segments() {
        let json = export_json(&record(), &[]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["analysis"]["status"], "completed");
        assert_eq!(value["analysis"]["matches"][0]["isReferenced"], true);
        assert!(value["highlightedSegments"].as_array().unwrap().is_empty());
    }
}
