use std::io::Write;

use originality_core::{
    AnalysisRecord, AnalysisStatus, DetectionStatus, GuidanceSuggestion, HighlightedSegment,
    IdentifiedAssumptions, InputType, NoveltyAnalysis, PdfExtractionStatus, ResearchOverview,
    SegmentKind, SegmentedDocument, SimilarityMatch, SuggestionKind, UniquenessLevel,
};
use originality_parsing::truncate_chars;
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

const RULE: &str =
    "--------------------------------------------------------------------------------";

pub fn uniqueness_label(level: Option<UniquenessLevel>) -> &'static str {
    match level {
        Some(UniquenessLevel::High) => "High Uniqueness",
        Some(UniquenessLevel::Medium) => "Medium Uniqueness",
        Some(UniquenessLevel::Low) => "Low Uniqueness",
        None => "Not Assessed",
    }
}

pub fn suggestion_marker(kind: SuggestionKind) -> &'static str {
    match kind {
        SuggestionKind::Positive => "✓",
        SuggestionKind::Citation => "!",
        SuggestionKind::Rewrite => "→",
    }
}

fn heading(w: &mut dyn Write, title: &str, color: ColorMode) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", title.bold())?;
        writeln!(w, "{}", RULE.dimmed())?;
    } else {
        writeln!(w, "{}", title)?;
        writeln!(w, "{}", RULE)?;
    }
    Ok(())
}

fn warn_line(w: &mut dyn Write, message: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "WARNING:".yellow().bold(), message.yellow())
    } else {
        writeln!(w, "WARNING: {}", message)
    }
}

/// Print the segmentation result of a dry run.
pub fn print_dry_run(
    w: &mut dyn Write,
    file_name: &str,
    segmented: &SegmentedDocument,
    query: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "DRY RUN:".bold().cyan(), file_name.bold())?;
    } else {
        writeln!(w, "DRY RUN: {}", file_name)?;
    }
    writeln!(
        w,
        "Reference detection: {}",
        segmented.detection_status.as_str()
    )?;
    writeln!(w, "Body: {} characters", segmented.body_text.chars().count())?;
    writeln!(
        w,
        "References: {} characters",
        segmented.references_text.chars().count()
    )?;
    if query.is_empty() {
        writeln!(w, "Search query: (none, literature retrieval would be skipped)")?;
    } else {
        writeln!(w, "Search query: \"{}\"", query)?;
    }

    if !segmented.references_text.is_empty() {
        heading(w, "REFERENCES SECTION", color)?;
        let preview = truncate_chars(&segmented.references_text, 600);
        writeln!(w, "{}", preview)?;
        if preview.len() < segmented.references_text.len() {
            writeln!(w, "...")?;
        }
    }
    Ok(())
}

/// Print warnings that qualify how far the results can be trusted.
pub fn print_warnings(
    w: &mut dyn Write,
    record: &AnalysisRecord,
    color: ColorMode,
) -> std::io::Result<()> {
    let mut any = false;
    if record.reference_detection_status == Some(DetectionStatus::Failed) {
        warn_line(w, "Reference detection failed for this document.", color)?;
        warn_line(
            w,
            "Similarity classification between referenced and unreferenced content may be unreliable.",
            color,
        )?;
        any = true;
    }
    match record.pdf_extraction_status {
        PdfExtractionStatus::Partial => {
            warn_line(
                w,
                "PDF text extraction was incomplete. Analysis results may be limited.",
                color,
            )?;
            any = true;
        }
        PdfExtractionStatus::Failed => {
            warn_line(
                w,
                "PDF text extraction failed. Analysis results may be limited.",
                color,
            )?;
            any = true;
        }
        PdfExtractionStatus::Success | PdfExtractionStatus::NotApplicable => {}
    }
    if any {
        writeln!(w)?;
    }
    Ok(())
}

/// Print title, status and the originality assessment.
pub fn print_summary(
    w: &mut dyn Write,
    record: &AnalysisRecord,
    color: ColorMode,
) -> std::io::Result<()> {
    let input = match record.input_type {
        InputType::Pdf => "PDF Document",
        InputType::Text => "Text Input",
    };
    writeln!(w, "Analysis #{}: {}", record.id, record.title)?;
    writeln!(w, "Input Type: {}", input)?;
    writeln!(w, "Status: {}", record.status.as_str())?;

    if record.status != AnalysisStatus::Completed {
        return Ok(());
    }

    let score = record
        .overall_similarity_score
        .map(|s| format!("{:.1}%", s))
        .unwrap_or_else(|| "N/A".to_string());
    let label = uniqueness_label(record.uniqueness_level);
    if color.enabled() {
        let label = match record.uniqueness_level {
            Some(UniquenessLevel::High) => label.green().bold().to_string(),
            Some(UniquenessLevel::Medium) => label.yellow().bold().to_string(),
            Some(UniquenessLevel::Low) => label.red().bold().to_string(),
            None => label.dimmed().to_string(),
        };
        writeln!(w, "Overall Similarity Score: {}", score.bold())?;
        writeln!(w, "Uniqueness Level: {}", label)?;
    } else {
        writeln!(w, "Overall Similarity Score: {}", score)?;
        writeln!(w, "Uniqueness Level: {}", label)?;
    }

    let referenced = record.matches.iter().filter(|m| m.is_referenced).count();
    writeln!(w, "Properly Referenced Matches: {}", referenced)?;
    writeln!(
        w,
        "Unreferenced Matches: {}",
        record.matches.len() - referenced
    )?;
    Ok(())
}

/// Print the analyzed text with matched spans marked.
///
/// Without color, referenced spans are wrapped in `[[...]]` and
/// unreferenced spans in `<<...>>`.
pub fn print_highlighted_text(
    w: &mut dyn Write,
    segments: &[HighlightedSegment],
    color: ColorMode,
) -> std::io::Result<()> {
    heading(w, "HIGHLIGHTED TEXT", color)?;
    if color.enabled() {
        writeln!(
            w,
            "{}",
            format!(
                "({} = referenced, {} = unreferenced)",
                "green".green(),
                "red".red()
            )
            .dimmed()
        )?;
    } else {
        writeln!(w, "([[...]] = referenced, <<...>> = unreferenced)")?;
    }
    writeln!(w)?;

    for segment in segments {
        match (segment.kind, color.enabled()) {
            (SegmentKind::Unique, _) => write!(w, "{}", segment.text)?,
            (SegmentKind::Referenced, true) => write!(w, "{}", segment.text.green())?,
            (SegmentKind::Unreferenced, true) => {
                write!(w, "{}", segment.text.red().underline())?
            }
            (SegmentKind::Referenced, false) => write!(w, "[[{}]]", segment.text)?,
            (SegmentKind::Unreferenced, false) => write!(w, "<<{}>>", segment.text)?,
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Print one block per similarity match.
pub fn print_matches(
    w: &mut dyn Write,
    matches: &[SimilarityMatch],
    color: ColorMode,
) -> std::io::Result<()> {
    if matches.is_empty() {
        return Ok(());
    }
    heading(w, "SIMILARITY MATCHES", color)?;

    for (i, m) in matches.iter().enumerate() {
        let status = if m.is_referenced {
            "Properly Referenced"
        } else {
            "UNREFERENCED"
        };
        writeln!(w)?;
        if color.enabled() {
            let status = if m.is_referenced {
                status.green().to_string()
            } else {
                status.red().bold().to_string()
            };
            writeln!(w, "[{}] {}", i + 1, m.paper_title.bold())?;
            writeln!(w, "    Source: {}", m.paper_source)?;
            writeln!(w, "    Similarity: {:.1}%", m.similarity_percentage)?;
            writeln!(w, "    Status: {}", status)?;
        } else {
            writeln!(w, "[{}] {}", i + 1, m.paper_title)?;
            writeln!(w, "    Source: {}", m.paper_source)?;
            writeln!(w, "    Similarity: {:.1}%", m.similarity_percentage)?;
            writeln!(w, "    Status: {}", status)?;
        }
        writeln!(w, "    Section: {}", m.section_name)?;
        if !m.paper_url.is_empty() {
            writeln!(w, "    URL: {}", m.paper_url)?;
        }
        writeln!(w, "    Your Text: \"{}\"", m.matched_text_user)?;
        writeln!(w, "    Matched Concept: \"{}\"", m.matched_text_paper)?;
    }
    Ok(())
}

pub fn print_overview(
    w: &mut dyn Write,
    overview: &ResearchOverview,
    color: ColorMode,
) -> std::io::Result<()> {
    heading(w, "RESEARCH OVERVIEW", color)?;
    writeln!(w, "Problem Summary: {}", or_na(&overview.problem_summary))?;
    writeln!(w, "Methodology: {}", or_na(&overview.methodology))?;
    writeln!(w, "Contribution: {}", or_na(&overview.contribution))?;
    writeln!(w, "Research Domain: {}", or_na(&overview.domain))?;
    Ok(())
}

pub fn print_novelty(
    w: &mut dyn Write,
    novelty: &NoveltyAnalysis,
    color: ColorMode,
) -> std::io::Result<()> {
    heading(w, "NOVELTY", color)?;
    writeln!(w, "{}", novelty.summary)?;
    for aspect in &novelty.novel_aspects {
        writeln!(w, "  - {}", aspect)?;
    }
    if !novelty.contrast_with_existing.is_empty() {
        writeln!(w, "Contrast: {}", novelty.contrast_with_existing)?;
    }
    Ok(())
}

pub fn print_assumptions(
    w: &mut dyn Write,
    assumptions: &IdentifiedAssumptions,
    color: ColorMode,
) -> std::io::Result<()> {
    if assumptions.assumptions.is_empty() {
        return Ok(());
    }
    heading(w, "ASSUMPTIONS", color)?;
    for a in &assumptions.assumptions {
        if color.enabled() {
            writeln!(w, "  [{}] {}", a.category.cyan(), a.statement)?;
        } else {
            writeln!(w, "  [{}] {}", a.category, a.statement)?;
        }
    }
    Ok(())
}

pub fn print_guidance(
    w: &mut dyn Write,
    suggestions: &[GuidanceSuggestion],
    color: ColorMode,
) -> std::io::Result<()> {
    if suggestions.is_empty() {
        return Ok(());
    }
    heading(w, "RECOMMENDATIONS", color)?;
    for s in suggestions {
        let marker = suggestion_marker(s.kind);
        if color.enabled() {
            let marker = match s.kind {
                SuggestionKind::Positive => marker.green().to_string(),
                SuggestionKind::Citation => marker.yellow().to_string(),
                SuggestionKind::Rewrite => marker.cyan().to_string(),
            };
            writeln!(w, "{} {}", marker, s.message)?;
        } else {
            writeln!(w, "{} {}", marker, s.message)?;
        }
    }
    Ok(())
}

pub fn print_disclaimer(w: &mut dyn Write, color: ColorMode) -> std::io::Result<()> {
    let text = "Similarity results are relative to the indexed academic literature and do not \
constitute a plagiarism verdict.";
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", text.dimmed())?;
    } else {
        writeln!(w, "{}", text)?;
    }
    Ok(())
}

/// Print the full terminal report for a stored analysis.
pub fn print_report(
    w: &mut dyn Write,
    record: &AnalysisRecord,
    segments: &[HighlightedSegment],
    color: ColorMode,
) -> std::io::Result<()> {
    print_warnings(w, record, color)?;
    print_summary(w, record, color)?;
    if record.status != AnalysisStatus::Completed {
        return Ok(());
    }

    print_highlighted_text(w, segments, color)?;
    print_matches(w, &record.matches, color)?;
    if let Some(overview) = &record.research_overview {
        print_overview(w, overview, color)?;
    }
    if let Some(novelty) = &record.novelty_analysis {
        print_novelty(w, novelty, color)?;
    }
    if let Some(assumptions) = &record.identified_assumptions {
        print_assumptions(w, assumptions, color)?;
    }
    print_guidance(w, &record.guidance_suggestions, color)?;
    print_disclaimer(w, color)?;
    Ok(())
}

fn or_na(s: &str) -> &str {
    if s.trim().is_empty() { "N/A" } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;
    use originality_core::highlight::highlight_segments;

    fn record() -> AnalysisRecord {
        AnalysisRecord {
            id: 4,
            title: "Draft".into(),
            input_type: InputType::Pdf,
            original_text: "We study graphs. We cite GCNs.".into(),
            pdf_extraction_status: PdfExtractionStatus::Partial,
            status: AnalysisStatus::Completed,
            body_text: Some("We study graphs. We cite GCNs.".into()),
            references_text: Some(String::new()),
            reference_detection_status: Some(DetectionStatus::Failed),
            overall_similarity_score: Some(40.0),
            uniqueness_level: Some(UniquenessLevel::Medium),
            research_overview: None,
            novelty_analysis: None,
            identified_assumptions: None,
            guidance_suggestions: vec![GuidanceSuggestion {
                kind: SuggestionKind::Citation,
                section: None,
                message: "Cite the GCN paper.".into(),
            }],
            matches: vec![SimilarityMatch {
                paper_title: "GCN".into(),
                paper_source: "arXiv".into(),
                paper_url: String::new(),
                matched_text_user: "We cite GCNs.".into(),
                matched_text_paper: "graph convolution".into(),
                similarity_percentage: 40.0,
                is_referenced: false,
                section_name: "Unknown".into(),
            }],
            created_at: 0,
            updated_at: 0,
        }
    }

    fn render(record: &AnalysisRecord) -> String {
        let segments = highlight_segments(record.display_text(), &record.matches);
        let mut buf = Vec::new();
        print_report(&mut buf, record, &segments, ColorMode(false)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn report_includes_warnings_and_marked_spans() {
        let out = render(&record());
        assert!(out.contains("WARNING: Reference detection failed for this document."));
        assert!(out.contains("PDF text extraction was incomplete."));
        assert!(out.contains("We study graphs. <<We cite GCNs.>>"));
        assert!(out.contains("Uniqueness Level: Medium Uniqueness"));
        assert!(out.contains("Unreferenced Matches: 1"));
        assert!(out.contains("! Cite the GCN paper."));
        assert!(!out.contains("URL:"));
    }

    #[test]
    fn unfinished_analysis_prints_only_summary() {
        let mut r = record();
        r.status = AnalysisStatus::Processing;
        let out = render(&r);
        assert!(out.contains("Status: processing"));
        assert!(!out.contains("HIGHLIGHTED TEXT"));
        assert!(!out.contains("Overall Similarity Score"));
    }

    #[test]
    fn dry_run_reports_skipped_query() {
        let segmented = SegmentedDocument {
            body_text: "tiny".into(),
            references_text: String::new(),
            detection_status: DetectionStatus::Failed,
        };
        let mut buf = Vec::new();
        print_dry_run(&mut buf, "draft.txt", &segmented, "", ColorMode(false)).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("Reference detection: failed"));
        assert!(out.contains("retrieval would be skipped"));
    }
}
