//! The wired-up question answering pipeline
//!
//! One [`Pipeline`] owns the configuration, the shared embedder, the
//! retriever handle and the language model. The CLI builds one per process;
//! the HTTP server shares one across requests behind an `Arc`.

use crate::config::Config;
use crate::embed::LazyEmbedder;
use crate::error::Result;
use crate::llm::{create_language_model, LanguageModel};
use crate::retrieve::{Resident, Retriever};
use crate::store::IndexStore;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Pipeline {
    pub config: Config,
    pub embedder: Arc<LazyEmbedder>,
    pub retriever: Retriever,
    pub llm: Arc<dyn LanguageModel>,
    ingest_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        embedder: Arc<LazyEmbedder>,
        retriever: Retriever,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            config,
            embedder,
            retriever,
            llm,
            ingest_lock: Mutex::new(()),
        }
    }

    /// Build the pipeline described by `config`. Nothing is loaded yet.
    pub fn from_config(config: Config) -> Result<Self> {
        let embedder = Arc::new(LazyEmbedder::new(&config.embedding));
        let retriever = Retriever::from_config(&config, embedder.clone());
        let llm = create_language_model(&config.llm, config.llm_api_key())?;
        Ok(Self::new(config, embedder, retriever, llm))
    }

    pub fn store(&self) -> IndexStore {
        IndexStore::open(self.config.index_dir())
    }

    /// Held for the duration of an ingestion run
    pub(crate) async fn lock_ingest(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.ingest_lock.lock().await
    }

    /// Make a freshly built index the live one for subsequent queries
    pub(crate) async fn publish(&self, resident: Option<Resident>) {
        match resident {
            Some(resident) => self.retriever.install(resident).await,
            None => self.retriever.invalidate().await,
        }
    }
}
