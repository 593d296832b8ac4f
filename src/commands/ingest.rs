//! Ingest command implementation
//!
//! Rebuilds the index from scratch: load pages, chunk, embed, persist, then
//! publish the new state to the pipeline's retriever.

use crate::chunk::Chunker;
use crate::error::Result;
use crate::index::build_index;
use crate::parse::load_documents;
use crate::pipeline::Pipeline;
use crate::retrieve::Resident;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Outcome of one ingestion run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IngestOutcome {
    Success {
        chunks_count: usize,
        documents_count: usize,
        pages_count: usize,
        /// Persisted version, absent when no fragments survived chunking
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    Error {
        message: String,
    },
}

impl IngestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, IngestOutcome::Success { .. })
    }
}

/// Build and persist a new index without touching any live state.
///
/// An empty corpus is reported as [`IngestOutcome::Error`] and leaves the
/// persisted index alone. A corpus that yields no fragments retires the
/// live index.
pub async fn run_ingestion(pipeline: &Pipeline) -> Result<(IngestOutcome, Option<Resident>)> {
    let config = &pipeline.config;
    let data_dir = config.data_dir();
    info!("Ingesting documents from {:?}", data_dir);

    let pages = load_documents(&data_dir).await?;
    if pages.is_empty() {
        warn!("No documents found in {:?}", data_dir);
        return Ok((
            IngestOutcome::Error {
                message: "No documents found".to_string(),
            },
            None,
        ));
    }

    let documents_count = pages
        .iter()
        .map(|p| p.source.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    let fragments = Chunker::from_config(&config.chunk).fragments(&pages);
    info!(
        "Created {} fragments from {} page(s) of {} document(s)",
        fragments.len(),
        pages.len(),
        documents_count
    );

    let store = pipeline.store();
    let embedder = pipeline.embedder.get().await?;
    let Some(index) =
        build_index(&fragments, embedder.as_ref(), config.embedding.batch_size).await?
    else {
        store.clear()?;
        return Ok((
            IngestOutcome::Success {
                chunks_count: 0,
                documents_count,
                pages_count: pages.len(),
                version: None,
            },
            None,
        ));
    };

    let manifest = store.save(&index, &fragments, embedder.model_name())?;
    let outcome = IngestOutcome::Success {
        chunks_count: fragments.len(),
        documents_count,
        pages_count: pages.len(),
        version: Some(manifest.version),
    };
    Ok((
        outcome,
        Some(Resident {
            index,
            fragments,
            embedder,
        }),
    ))
}

/// Rebuild the index and make it live. Concurrent runs are serialized.
pub async fn cmd_ingest(pipeline: &Pipeline) -> Result<IngestOutcome> {
    let _guard = pipeline.lock_ingest().await;
    let (outcome, resident) = run_ingestion(pipeline).await?;
    if outcome.is_success() {
        pipeline.publish(resident).await;
    }
    Ok(outcome)
}

/// Print ingestion outcome to console
pub fn print_ingest_outcome(outcome: &IngestOutcome) {
    match outcome {
        IngestOutcome::Success {
            chunks_count,
            documents_count,
            pages_count,
            version,
        } => {
            println!("\n✓ Ingestion complete\n");
            println!("Documents: {}", documents_count);
            println!("Pages: {}", pages_count);
            println!("Chunks: {}", chunks_count);
            match version {
                Some(version) => println!("Index version: {}", version),
                None => println!("No chunks survived filtering; no index is live"),
            }
        }
        IngestOutcome::Error { message } => {
            println!("\n✗ Ingestion failed: {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pipeline_in, write_doc};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ingest_missing_corpus() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_in(tmp.path(), "unused");

        let outcome = cmd_ingest(&pipeline).await.unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::Error {
                message: "No documents found".to_string()
            }
        );
        assert!(pipeline.store().current_version().unwrap().is_none());
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({"status": "error", "message": "No documents found"})
        );
    }

    #[tokio::test]
    async fn test_ingest_builds_and_publishes() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_in(tmp.path(), "unused");
        write_doc(
            tmp.path(),
            "doc.txt",
            "Vso is the stall speed in landing configuration, measured with full flaps.",
        );

        let outcome = cmd_ingest(&pipeline).await.unwrap();
        let IngestOutcome::Success {
            chunks_count,
            documents_count,
            version,
            ..
        } = outcome
        else {
            panic!("expected success");
        };
        assert_eq!(chunks_count, 1);
        assert_eq!(documents_count, 1);
        assert_eq!(pipeline.store().current_version().unwrap(), version);

        let hits = pipeline.retriever.retrieve("What is Vso?", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fragment.source, "doc.txt");
        assert_eq!(hits[0].fragment.page, 1);
    }

    #[tokio::test]
    async fn test_ingest_without_fragments_retires_index() {
        let tmp = TempDir::new().unwrap();
        let (pipeline, _) = pipeline_in(tmp.path(), "unused");
        write_doc(
            tmp.path(),
            "doc.txt",
            "Vso is the stall speed in landing configuration, measured with full flaps.",
        );
        cmd_ingest(&pipeline).await.unwrap();

        write_doc(tmp.path(), "doc.txt", "Too short to index.");
        let outcome = cmd_ingest(&pipeline).await.unwrap();
        assert!(matches!(
            outcome,
            IngestOutcome::Success {
                chunks_count: 0,
                version: None,
                ..
            }
        ));
        assert!(pipeline.retriever.retrieve("Vso", 5).await.unwrap().is_empty());
    }
}
