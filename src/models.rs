//! Core data types shared across the pipeline, plus the embedding model registry.

use serde::{Deserialize, Serialize};

/// Text of one page of one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub text: String,
    /// File name of the originating document (e.g. `book1.pdf`)
    pub source: String,
    /// 1-based page number
    pub page: u32,
}

/// A bounded slice of page text, the unit of retrieval.
///
/// `id` is the fragment's position in the fragment store and also the row of
/// its vector in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    pub source: String,
    pub page: u32,
    pub id: usize,
}

/// A copy of a stored fragment annotated with its squared L2 distance to the
/// query. Lower is more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedFragment {
    #[serde(flatten)]
    pub fragment: Fragment,
    pub score: f32,
}

/// A grounded answer with its parsed citations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<String>,
}

impl Answer {
    pub fn new(text: impl Into<String>, citations: Vec<String>) -> Self {
        Self {
            text: text.into(),
            citations,
        }
    }
}

const ALL_MINILM_L6_V2: &str = "sentence-transformers/all-MiniLM-L6-v2";
const ALL_MINILM_L12_V2: &str = "sentence-transformers/all-MiniLM-L12-v2";
const BGE_SMALL_EN_V15: &str = "BAAI/bge-small-en-v1.5";
const BGE_BASE_EN_V15: &str = "BAAI/bge-base-en-v1.5";
const BGE_LARGE_EN_V15: &str = "BAAI/bge-large-en-v1.5";
const NOMIC_EMBED_TEXT_V15: &str = "nomic-ai/nomic-embed-text-v1.5";

/// Known local embedding models and their output dimension.
pub const EMBEDDING_MODELS: &[(&str, usize)] = &[
    (ALL_MINILM_L6_V2, 384),
    (ALL_MINILM_L12_V2, 384),
    (BGE_SMALL_EN_V15, 384),
    (BGE_BASE_EN_V15, 768),
    (BGE_LARGE_EN_V15, 1024),
    (NOMIC_EMBED_TEXT_V15, 768),
];

pub fn embedding_dimension_for_model(model: &str) -> Option<usize> {
    EMBEDDING_MODELS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, dim)| *dim)
}
