//! docqa - grounded question answering over a local document corpus
//!
//! This crate provides:
//! - Ingestion of PDF and text documents into a persisted vector index
//! - Retrieval of the nearest fragments for a question
//! - Answers from a hosted language model, constrained to the retrieved
//!   context and cited by source and page
//! - A CLI and an HTTP server exposing the pipeline

pub mod chunk;
pub mod commands;
pub mod config;
pub mod embed;
pub mod error;
pub mod ground;
pub mod index;
pub mod llm;
pub mod models;
pub mod parse;
pub mod pipeline;
pub mod progress;
pub mod retrieve;
pub mod server;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::Pipeline;

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::Config;
    use crate::embed::testing::HashEmbedder;
    use crate::embed::LazyEmbedder;
    use crate::llm::testing::ScriptedModel;
    use crate::pipeline::Pipeline;
    use crate::retrieve::Retriever;
    use std::path::Path;
    use std::sync::Arc;

    fn pipeline_with(dir: &Path, llm: Arc<ScriptedModel>) -> Pipeline {
        let mut config = Config::default();
        config.init_paths(Some(dir.to_path_buf()));
        let embedder = Arc::new(LazyEmbedder::ready(Arc::new(HashEmbedder::new(64))));
        let retriever = Retriever::from_config(&config, embedder.clone());
        Pipeline::new(config, embedder, retriever, llm)
    }

    /// Pipeline rooted at `dir` whose model always answers `reply`
    pub fn pipeline_in(dir: &Path, reply: &str) -> (Pipeline, Arc<ScriptedModel>) {
        let llm = Arc::new(ScriptedModel::replying(reply));
        (pipeline_with(dir, llm.clone()), llm)
    }

    /// Pipeline rooted at `dir` whose model always errors
    pub fn failing_pipeline_in(dir: &Path) -> (Pipeline, Arc<ScriptedModel>) {
        let llm = Arc::new(ScriptedModel::failing("model unavailable"));
        (pipeline_with(dir, llm.clone()), llm)
    }

    /// Write a document into the pipeline's data directory
    pub fn write_doc(dir: &Path, name: &str, text: &str) {
        let data = dir.join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join(name), text).unwrap();
    }
}
