use ragloop_core::payload::SourceError;
use ragloop_knowledge::{relevance_label, SearchResult};
use std::fmt::Write;

/// Appends ranked results. A document header is written whenever the
/// originating document changes between consecutive results.
pub(crate) fn write_results(out: &mut String, results: &[SearchResult]) {
    let mut current_doc: Option<&str> = None;
    for (i, result) in results.iter().enumerate() {
        if current_doc != Some(result.knowledge_id.as_str()) {
            current_doc = Some(result.knowledge_id.as_str());
            if i > 0 {
                out.push('\n');
            }
            let title = if result.knowledge_title.is_empty() {
                result.knowledge_id.as_str()
            } else {
                result.knowledge_title.as_str()
            };
            let _ = writeln!(out, "【Source document: {title}】\n");
        }

        let _ = writeln!(out, "Result #{}:", i + 1);
        let _ = writeln!(
            out,
            "  📍 Relevance: {:.2} ({})",
            result.score,
            relevance_label(result.score)
        );
        let _ = writeln!(out, "  🔗 Match type: {}", result.match_type.label());
        let _ = writeln!(out, "  📄 Content: {}", result.content);
        let _ = writeln!(out, "  🆔 chunk_id: {}\n", result.id);
    }
}

/// Appends the partial-failure block, if any source failed.
pub(crate) fn write_errors(out: &mut String, errors: &[SourceError]) {
    if errors.is_empty() {
        return;
    }
    out.push_str("=== ⚠️ Partial failures ===\n");
    for err in errors {
        let _ = writeln!(out, "  - {err}");
    }
    out.push('\n');
}
