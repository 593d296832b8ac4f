//! Answer grounding
//!
//! Turns a question plus retrieved fragments into an [`Answer`]: build the
//! constrained prompt, call the language model, then parse and normalize its
//! `Answer: ... / Citations: ...` reply. Whenever the answer is a refusal the
//! canonical [`REFUSAL`] sentence is returned with no citations.

pub mod prompts;

pub use prompts::{REFUSAL, REFUSAL_MARKER, SYSTEM_PROMPT};

use crate::llm::LanguageModel;
use crate::models::{Answer, RetrievedFragment};
use tracing::{debug, warn};

const ANSWER_LABEL: &str = "Answer:";
const CITATIONS_LABEL: &str = "Citations:";

/// Split a model reply into answer text and citations.
///
/// Everything before the first `Citations:` is the answer (with any
/// `Answer:` label removed); the text up to the next `Citations:`, if any,
/// is split on `;`. Never fails.
pub fn parse_answer(raw: &str) -> Answer {
    match raw.split_once(CITATIONS_LABEL) {
        Some((answer, citations)) => Answer::new(
            strip_answer_label(answer),
            citations
                .split(CITATIONS_LABEL)
                .next()
                .unwrap_or("")
                .split(';')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        None => Answer::new(strip_answer_label(raw), Vec::new()),
    }
}

fn strip_answer_label(text: &str) -> String {
    text.replace(ANSWER_LABEL, "").trim().to_string()
}

/// Replace any refusal-looking answer with the canonical refusal.
pub fn normalize_refusal(answer: Answer) -> Answer {
    if answer.text.contains(REFUSAL_MARKER) {
        Answer::new(REFUSAL, Vec::new())
    } else {
        answer
    }
}

pub fn is_refusal(answer: &Answer) -> bool {
    answer.text == REFUSAL && answer.citations.is_empty()
}

/// Answer `question` strictly from `retrieved`.
///
/// The model is always consulted. With no retrieved fragments the result is
/// the refusal whatever the model replies, even if the call fails. Otherwise
/// model failures become an answer text and are never returned as errors.
pub async fn ground(
    question: &str,
    retrieved: &[RetrievedFragment],
    llm: &dyn LanguageModel,
) -> Answer {
    let prompt = prompts::answer_prompt(question, retrieved);
    debug!("Prompting {} with {} fragment(s)", llm.model_name(), retrieved.len());

    let reply = llm.complete(SYSTEM_PROMPT, &prompt).await;

    if retrieved.is_empty() {
        if let Err(e) = &reply {
            warn!("Language model call failed: {}", e);
        }
        return Answer::new(REFUSAL, Vec::new());
    }

    match reply {
        Ok(raw) => normalize_refusal(parse_answer(&raw)),
        Err(e) => {
            warn!("Language model call failed: {}", e);
            Answer::new(format!("Error communicating with LLM: {}", e), Vec::new())
        }
    }
}
