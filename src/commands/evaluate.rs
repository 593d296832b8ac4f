//! Evaluation command implementation
//!
//! Runs every generated question through the pipeline and writes the raw
//! results plus a markdown summary.

use crate::commands::ask::{cmd_ask, AskOptions, AskResponse};
use crate::commands::questions::GeneratedQuestion;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::progress::progress_bar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

const RESULTS_FILE: &str = "evaluation_results.json";
const REPORT_FILE: &str = "report.md";

/// Lowercase phrase that marks an answer as a refusal
const REFUSAL_PHRASE: &str = "not available in the provided document";

/// Outcome for a single question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub question: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_chunk_id: Option<usize>,
    pub answer: String,
    pub citations: Vec<String>,
    pub latency_ms: u64,
    pub refused: bool,
    #[serde(default)]
    pub retrieved_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieved_sources: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorySummary {
    pub count: usize,
    pub answered: usize,
    pub refused: usize,
}

impl CategorySummary {
    pub fn refusal_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.refused as f64 / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub total: usize,
    pub answered: usize,
    pub refused: usize,
    pub errors: usize,
    pub avg_latency_ms: f64,
    pub by_category: BTreeMap<String, CategorySummary>,
    pub results_path: PathBuf,
    pub report_path: PathBuf,
}

/// Evaluation options
#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    pub questions: PathBuf,
    pub output_dir: PathBuf,
    pub k: Option<usize>,
}

impl EvaluateOptions {
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        Self {
            questions: pipeline.config.questions_file(),
            output_dir: pipeline.config.eval_output_dir(),
            k: None,
        }
    }
}

fn is_refusal_text(answer: &str) -> bool {
    answer.to_lowercase().contains(REFUSAL_PHRASE)
}

fn record_from(question: &GeneratedQuestion, response: AskResponse, latency_ms: u64) -> EvaluationRecord {
    let retrieved_count = response.retrieved_chunks.as_ref().map_or(0, Vec::len);
    let retrieved_sources = response.retrieved_chunks.map(|chunks| {
        chunks
            .into_iter()
            .map(|c| format!("{}, Page {}", c.source, c.page))
            .collect()
    });
    EvaluationRecord {
        question: question.question.clone(),
        category: question.category.clone(),
        source_chunk_id: question.source_chunk_id,
        refused: is_refusal_text(&response.answer),
        answer: response.answer,
        citations: response.citations,
        latency_ms,
        retrieved_count,
        error: None,
        retrieved_sources,
    }
}

pub fn load_questions(path: &Path) -> Result<Vec<GeneratedQuestion>> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Questions file not found: {}. Run 'docqa questions' first.",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub async fn cmd_evaluate(pipeline: &Pipeline, options: EvaluateOptions) -> Result<EvaluationSummary> {
    let questions = load_questions(&options.questions)?;
    info!("Evaluating {} questions", questions.len());

    let mut records = Vec::with_capacity(questions.len());
    let pb = progress_bar(questions.len() as u64, "evaluating");

    for question in &questions {
        let started = Instant::now();
        let ask = AskOptions {
            k: options.k,
            debug: true,
        };
        let record = match cmd_ask(pipeline, &question.question, ask).await {
            Ok(response) => record_from(question, response, started.elapsed().as_millis() as u64),
            Err(e) => {
                warn!("Question failed: {}: {}", question.question, e);
                EvaluationRecord {
                    question: question.question.clone(),
                    category: question.category.clone(),
                    source_chunk_id: question.source_chunk_id,
                    answer: String::new(),
                    citations: Vec::new(),
                    latency_ms: started.elapsed().as_millis() as u64,
                    refused: false,
                    retrieved_count: 0,
                    error: Some(e.to_string()),
                    retrieved_sources: None,
                }
            }
        };
        records.push(record);
        pb.inc(1);
    }
    pb.finish_and_clear();

    std::fs::create_dir_all(&options.output_dir)?;
    let results_path = options.output_dir.join(RESULTS_FILE);
    std::fs::write(&results_path, serde_json::to_string_pretty(&records)?)?;

    let summary = summarize(&records, results_path, options.output_dir.join(REPORT_FILE));
    std::fs::write(&summary.report_path, render_report(&summary))?;
    info!("Wrote evaluation report to {:?}", summary.report_path);

    Ok(summary)
}

fn summarize(records: &[EvaluationRecord], results_path: PathBuf, report_path: PathBuf) -> EvaluationSummary {
    let mut by_category: BTreeMap<String, CategorySummary> = BTreeMap::new();
    let (mut answered, mut refused, mut errors) = (0, 0, 0);

    for record in records {
        let entry = by_category.entry(record.category.clone()).or_default();
        entry.count += 1;
        if record.error.is_some() {
            errors += 1;
        } else if record.refused {
            refused += 1;
            entry.refused += 1;
        } else {
            answered += 1;
            entry.answered += 1;
        }
    }

    let avg_latency_ms = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.latency_ms as f64).sum::<f64>() / records.len() as f64
    };

    EvaluationSummary {
        total: records.len(),
        answered,
        refused,
        errors,
        avg_latency_ms,
        by_category,
        results_path,
        report_path,
    }
}

fn render_report(summary: &EvaluationSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Evaluation Report\n");
    let _ = writeln!(out, "- Total questions: {}", summary.total);
    let _ = writeln!(out, "- Answered: {}", summary.answered);
    let _ = writeln!(out, "- Refused: {}", summary.refused);
    let _ = writeln!(out, "- Errors: {}", summary.errors);
    let _ = writeln!(out, "- Average latency: {:.0} ms\n", summary.avg_latency_ms);
    let _ = writeln!(out, "## By category\n");
    let _ = writeln!(out, "| Category | Count | Answered | Refusal rate |");
    let _ = writeln!(out, "|---|---|---|---|");
    for (category, stats) in &summary.by_category {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.1}% |",
            category,
            stats.count,
            stats.answered,
            stats.refusal_rate() * 100.0
        );
    }
    out
}

/// Print evaluation summary to console
pub fn print_evaluation_summary(summary: &EvaluationSummary) {
    println!("\n✓ Evaluation complete\n");
    println!("Questions: {}", summary.total);
    println!("Answered: {}", summary.answered);
    println!("Refused: {}", summary.refused);
    if summary.errors > 0 {
        println!("Errors: {}", summary.errors);
    }
    println!("Average latency: {:.0} ms", summary.avg_latency_ms);
    println!("\nResults: {}", summary.results_path.display());
    println!("Report: {}", summary.report_path.display());
}
