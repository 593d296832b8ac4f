//! Question generation for evaluation
//!
//! Samples indexed fragments and asks the language model for one question
//! per fragment in each category. The sample order is derived from a seed so
//! that runs are reproducible.

use crate::error::{Error, Result};
use crate::ground::prompts::{question_prompt, QUESTION_SYSTEM_PROMPT};
use crate::models::Fragment;
use crate::pipeline::Pipeline;
use crate::progress::progress_bar;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Generated questions must be longer than this many characters.
const MIN_QUESTION_CHARS: usize = 10;

/// A question paired with the fragment it was written from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub source_chunk_id: Option<usize>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
}

fn default_category() -> String {
    "general".to_string()
}

/// Question generation options
#[derive(Debug, Clone)]
pub struct QuestionOptions {
    /// (category, count) in generation order
    pub categories: Vec<(String, usize)>,
    pub seed: u64,
    pub output: PathBuf,
}

impl QuestionOptions {
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let q = &pipeline.config.questions;
        Self {
            categories: vec![
                ("factual".to_string(), q.factual),
                ("applied".to_string(), q.applied),
                ("reasoning".to_string(), q.reasoning),
            ],
            seed: 0,
            output: pipeline.config.questions_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionStats {
    pub requested: usize,
    pub generated: usize,
    pub failed: usize,
    pub output: PathBuf,
}

/// Deterministic shuffle: order fragments by a seeded hash of their id.
fn sample_order(fragments: Vec<Fragment>, seed: u64) -> Vec<Fragment> {
    let mut keyed: Vec<([u8; 32], Fragment)> = fragments
        .into_iter()
        .map(|f| {
            let mut hasher = blake3::Hasher::new();
            hasher.update(&seed.to_le_bytes());
            hasher.update(&(f.id as u64).to_le_bytes());
            (*hasher.finalize().as_bytes(), f)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, f)| f).collect()
}

pub async fn cmd_generate_questions(
    pipeline: &Pipeline,
    options: QuestionOptions,
) -> Result<QuestionStats> {
    let stored = pipeline.store().load()?.ok_or_else(|| {
        Error::Index("No index found. Run 'docqa ingest' first.".to_string())
    })?;
    info!(
        "Loaded {} fragments, sampling for question generation",
        stored.fragments.len()
    );

    let requested: usize = options.categories.iter().map(|(_, n)| n).sum();
    let mut queue = sample_order(stored.fragments, options.seed);
    let mut questions = Vec::with_capacity(requested);
    let mut failed = 0;
    let pb = progress_bar(requested as u64, "generating questions");

    for (category, count) in &options.categories {
        let mut produced = 0;
        while produced < *count {
            let Some(fragment) = queue.pop() else {
                warn!("Ran out of fragments while generating {} questions", category);
                break;
            };

            let prompt = question_prompt(category, &fragment.text);
            match pipeline.llm.complete(QUESTION_SYSTEM_PROMPT, &prompt).await {
                Ok(reply) => {
                    let question = reply.trim();
                    if question.chars().count() > MIN_QUESTION_CHARS {
                        debug!("Generated {} question: {}", category, question);
                        questions.push(GeneratedQuestion {
                            question: question.to_string(),
                            category: category.clone(),
                            source_chunk_id: Some(fragment.id),
                            source: Some(fragment.source.clone()),
                            page: Some(fragment.page),
                        });
                        produced += 1;
                        pb.inc(1);
                    } else {
                        debug!("Discarding short reply for fragment {}", fragment.id);
                    }
                }
                Err(e) => {
                    warn!("Question generation failed for fragment {}: {}", fragment.id, e);
                    failed += 1;
                }
            }
        }
    }
    pb.finish_and_clear();

    if let Some(parent) = options.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&options.output, serde_json::to_string_pretty(&questions)?)?;
    info!("Saved {} questions to {:?}", questions.len(), options.output);

    Ok(QuestionStats {
        requested,
        generated: questions.len(),
        failed,
        output: options.output,
    })
}

/// Print question generation stats to console
pub fn print_question_stats(stats: &QuestionStats) {
    println!("\n✓ Question generation complete\n");
    println!("Requested: {}", stats.requested);
    println!("Generated: {}", stats.generated);
    if stats.failed > 0 {
        println!("Failed: {}", stats.failed);
    }
    println!("Saved to: {}", stats.output.display());
}
