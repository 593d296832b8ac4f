//! Ask command implementation

use crate::error::Result;
use crate::ground::ground;
use crate::models::RetrievedFragment;
use crate::pipeline::Pipeline;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Ask options
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    /// Number of fragments to retrieve (configured default if unset)
    pub k: Option<usize>,
    /// Include the retrieved fragments in the response
    pub debug: bool,
}

/// One retrieved fragment as reported back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkInfo {
    pub text: String,
    pub source: String,
    pub page: u32,
    pub score: f32,
}

impl From<RetrievedFragment> for ChunkInfo {
    fn from(hit: RetrievedFragment) -> Self {
        Self {
            text: hit.fragment.text,
            source: hit.fragment.source,
            page: hit.fragment.page,
            score: hit.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub citations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_chunks: Option<Vec<ChunkInfo>>,
}

/// Retrieve, ground, and package the answer.
///
/// Language model failures are folded into the answer text; retrieval
/// failures (e.g. the query cannot be embedded) are returned as errors.
pub async fn cmd_ask(pipeline: &Pipeline, question: &str, options: AskOptions) -> Result<AskResponse> {
    let k = pipeline.config.resolve_k(options.k);
    info!("Asking (k={}): {}", k, question);

    let retrieved = pipeline.retriever.retrieve(question, k).await?;
    let answer = ground(question, &retrieved, pipeline.llm.as_ref()).await;

    Ok(AskResponse {
        answer: answer.text,
        citations: answer.citations,
        retrieved_chunks: options
            .debug
            .then(|| retrieved.into_iter().map(ChunkInfo::from).collect()),
    })
}

/// Print an answer to console
pub fn print_answer(response: &AskResponse) {
    println!("\n{}\n", response.answer);

    if !response.citations.is_empty() {
        println!("Citations:");
        for citation in &response.citations {
            println!("  - {}", citation);
        }
    }

    if let Some(chunks) = &response.retrieved_chunks {
        println!("\nRetrieved {} chunk(s):", chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            println!(
                "  {}. [score: {:.3}] {}, Page {}",
                i + 1,
                chunk.score,
                chunk.source,
                chunk.page
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cmd_ingest;
    use crate::ground::REFUSAL;
    use crate::testing::{pipeline_in, write_doc};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ask_without_index_refuses() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, llm) = pipeline_in(tmp.path(), "Answer: 61 knots.\nCitations: POH, Page 4");

        let response = cmd_ask(
            &pipeline,
            "What is Vso?",
            AskOptions {
                debug: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(response.answer, REFUSAL);
        assert!(response.citations.is_empty());
        assert_eq!(response.retrieved_chunks, Some(vec![]));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_ask_debug_controls_chunks() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_in(
            tmp.path(),
            "Answer: Vso is the stall speed.\nCitations: doc.txt, Page 1",
        );
        write_doc(
            tmp.path(),
            "doc.txt",
            "Vso is the stall speed in landing configuration, measured with full flaps.",
        );
        cmd_ingest(&pipeline).await.unwrap();

        let plain = cmd_ask(&pipeline, "What is Vso?", AskOptions::default())
            .await
            .unwrap();
        assert_eq!(plain.answer, "Vso is the stall speed.");
        assert_eq!(plain.citations, vec!["doc.txt, Page 1".to_string()]);
        assert!(plain.retrieved_chunks.is_none());
        assert!(serde_json::to_value(&plain)
            .unwrap()
            .get("retrieved_chunks")
            .is_none());

        let debug = cmd_ask(
            &pipeline,
            "What is Vso?",
            AskOptions {
                k: Some(3),
                debug: true,
            },
        )
        .await
        .unwrap();
        let chunks = debug.retrieved_chunks.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source, "doc.txt");
        assert!(chunks[0].score >= 0.0);
    }
}
