use crate::models::RetrievedFragment;

/// The one sentence that signals "no supported answer".
pub const REFUSAL: &str = "This information is not available in the provided document(s).";

/// Any answer containing this marker is normalized to [`REFUSAL`].
pub const REFUSAL_MARKER: &str = "This information is not available";

pub const SYSTEM_PROMPT: &str = r#"You are an assistant for a private document collection.
You answer questions ONLY based on the provided context.

GUARDRAILS:
1. If the answer is not present in the context below, you must respond EXACTLY with:
"This information is not available in the provided document(s)."
2. Do NOT use outside knowledge or hallucinate.
3. Your response must be structured as follows:
Answer: [Your answer here]
Citations: [List of citations separated by semicolon, e.g. "Book 1, Page 23; Manual, Page 10"]
"#;

/// Render retrieved fragments as numbered context blocks.
pub fn context_blocks(retrieved: &[RetrievedFragment]) -> String {
    retrieved
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "--- Chunk {} ---\nSource: {}\nPage: {}\nText: {}\n\n",
                i + 1,
                hit.fragment.source,
                hit.fragment.page,
                hit.fragment.text
            )
        })
        .collect()
}

/// User message for a grounded question.
pub fn answer_prompt(question: &str, retrieved: &[RetrievedFragment]) -> String {
    if retrieved.is_empty() {
        return format!("Context: None\n\nQuestion: {question}");
    }

    let context = context_blocks(retrieved);
    format!(
        r#"
CONTEXT:
{context}

QUESTION:
{question}

Based strictly on the context above, answer the question.
Remember to provide citations in the format "Source, Page" separated by semicolon.
If the answer is not in the context, say "{REFUSAL}"
"#
    )
}

pub const QUESTION_SYSTEM_PROMPT: &str =
    "You write exam questions for a document collection. Reply with the question only.";

/// User message asking for one question of `category` about `text`.
pub fn question_prompt(category: &str, text: &str) -> String {
    let excerpt: String = text.chars().take(1500).collect();
    format!(
        r#"Based strictly on the following text, generate 1 {category} question.

Definition of {category} question:
- factual: Simple definition or lookup.
- applied: Scenario-based, operational or procedural.
- reasoning: Multi-step, trade-offs, conditional logic.

Text:
{excerpt}

Output ONLY the question.
"#
    )
}
