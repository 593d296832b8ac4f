//! Search command implementation (retrieval only, no language model)

use crate::error::Result;
use crate::models::RetrievedFragment;
use crate::pipeline::Pipeline;
use serde::Serialize;

/// Search result for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub k: usize,
    pub results: Vec<RetrievedFragment>,
}

pub async fn cmd_search(pipeline: &Pipeline, query: &str, k: Option<usize>) -> Result<SearchResult> {
    let k = pipeline.config.resolve_k(k);
    let results = pipeline.retriever.retrieve(query, k).await?;
    Ok(SearchResult {
        query: query.to_string(),
        k,
        results,
    })
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut preview: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        preview = format!("{}...", preview.trim_end());
    }
    preview
}

/// Print search results to console
pub fn print_search_results(result: &SearchResult) {
    println!("\n🔍 Query: {}\n", result.query);

    if result.results.is_empty() {
        println!("No results. Run 'docqa ingest' to build the index.");
        return;
    }

    println!("Found {} results:\n", result.results.len());
    for (i, hit) in result.results.iter().enumerate() {
        println!(
            "{}. [distance: {:.3}] {}, Page {}",
            i + 1,
            hit.score,
            hit.fragment.source,
            hit.fragment.page
        );
        println!("   {}\n", preview(&hit.fragment.text, 200));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pipeline_in, write_doc};
    use tempfile::TempDir;

    #[test]
    fn test_preview_truncates_on_chars() {
        assert_eq!(preview("short", 200), "short");
        assert_eq!(preview("ééééé", 3), "ééé...");
    }

    #[tokio::test]
    async fn test_search_uses_configured_k() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, llm) = pipeline_in(tmp.path(), "unused");
        write_doc(
            tmp.path(),
            "a.txt",
            "Vso is the stall speed in landing configuration, measured with full flaps.",
        );
        write_doc(
            tmp.path(),
            "b.txt",
            "Fuel burn at cruise depends on altitude, power setting and outside temperature.",
        );
        crate::commands::cmd_ingest(&pipeline).await.unwrap();

        let result = cmd_search(&pipeline, "stall speed", None).await.unwrap();
        assert_eq!(result.k, 5);
        assert_eq!(result.results.len(), 2);
        assert_eq!(llm.calls(), 0);
    }
}
