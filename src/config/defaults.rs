//! Default values for configuration

/// Default directory scanned for source documents
pub fn default_data_dir() -> String {
    "data".to_string()
}

/// Default directory holding persisted index versions
pub fn default_index_dir() -> String {
    "index".to_string()
}

/// Default embedding model (sentence-transformers/all-MiniLM-L6-v2)
pub fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default window length in characters
pub fn default_chunk_size() -> usize {
    800
}

/// Default characters shared between consecutive windows
pub fn default_chunk_overlap() -> usize {
    100
}

/// Default number of fragments retrieved per question
pub fn default_retrieval_k() -> usize {
    5
}

/// Upper bound accepted for k
pub fn default_retrieval_max_k() -> usize {
    50
}

/// Default distance threshold (recorded, not applied)
pub fn default_score_threshold() -> f32 {
    1.5
}

/// Default OpenAI-compatible endpoint
pub fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

/// Default chat model
pub fn default_llm_model() -> String {
    "openai/gpt-oss-120b".to_string()
}

/// Default environment variable name for the model API key
pub fn default_llm_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

pub fn default_llm_temperature() -> f32 {
    0.0
}

pub fn default_llm_max_tokens() -> u32 {
    8192
}

pub fn default_llm_top_p() -> f32 {
    1.0
}

/// Default request timeout in seconds
pub fn default_llm_timeout() -> u64 {
    60
}

/// Default retry count for transient model failures
pub fn default_llm_retries() -> usize {
    2
}

/// Default HTTP bind address
pub fn default_server_bind() -> String {
    "0.0.0.0:8000".to_string()
}

/// Default output file for generated questions
pub fn default_questions_output() -> String {
    "questions.json".to_string()
}

pub fn default_questions_factual() -> usize {
    20
}

pub fn default_questions_applied() -> usize {
    20
}

pub fn default_questions_reasoning() -> usize {
    10
}

/// Default directory for evaluation results and report
pub fn default_eval_output_dir() -> String {
    "eval".to_string()
}
