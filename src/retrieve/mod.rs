//! Query-time retrieval over the resident index
//!
//! [`Retriever`] is the shared handle on resident state (index, fragment
//! store and embedder). State is loaded on first use, exactly once even under
//! concurrent first requests, and can be replaced wholesale after a new
//! ingestion run. In-flight queries keep the `Arc` they started with.

use crate::config::Config;
use crate::embed::{embed_query, Embedder, LazyEmbedder};
use crate::error::{Error, Result};
use crate::index::FlatIndex;
use crate::models::{Fragment, RetrievedFragment};
use crate::store::IndexStore;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Index, fragment store and the embedder that built them.
pub struct Resident {
    pub index: FlatIndex,
    pub fragments: Vec<Fragment>,
    pub embedder: Arc<dyn Embedder>,
}

impl Resident {
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Nearest fragments to an already-embedded query, ascending by distance.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedFragment>> {
        let neighbors = self.index.search(query, k)?;
        Ok(neighbors
            .into_iter()
            .filter_map(|n| {
                let fragment = self.fragments.get(n.label?)?;
                Some(RetrievedFragment {
                    fragment: fragment.clone(),
                    score: n.distance,
                })
            })
            .collect())
    }
}

/// Source of resident state
#[async_trait]
pub trait ResidentLoader: Send + Sync {
    /// `Ok(None)` when no index has been persisted yet
    async fn load(&self) -> Result<Option<Resident>>;
}

/// Loads the live version from an [`IndexStore`], pairing it with the
/// shared embedder.
pub struct DiskLoader {
    store: IndexStore,
    embedder: Arc<LazyEmbedder>,
}

impl DiskLoader {
    pub fn new(store: IndexStore, embedder: Arc<LazyEmbedder>) -> Self {
        Self { store, embedder }
    }
}

#[async_trait]
impl ResidentLoader for DiskLoader {
    async fn load(&self) -> Result<Option<Resident>> {
        let store = self.store.clone();
        let stored = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| Error::Index(format!("Task join error: {}", e)))??;

        let Some(stored) = stored else {
            return Ok(None);
        };

        let embedder = self.embedder.get().await?;
        if !stored.manifest.embedding_model.is_empty()
            && stored.manifest.embedding_model != embedder.model_name()
        {
            warn!(
                "Index was built with '{}' but queries use '{}'",
                stored.manifest.embedding_model,
                embedder.model_name()
            );
        }

        info!(
            "Loaded index version {} ({} fragments)",
            stored.manifest.version,
            stored.fragments.len()
        );
        Ok(Some(Resident {
            index: stored.index,
            fragments: stored.fragments,
            embedder,
        }))
    }
}

/// Shared handle on resident state
pub struct Retriever {
    loader: Box<dyn ResidentLoader>,
    state: RwLock<Option<Arc<Resident>>>,
    load_lock: Mutex<()>,
}

impl Retriever {
    pub fn new(loader: impl ResidentLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            state: RwLock::new(None),
            load_lock: Mutex::new(()),
        }
    }

    /// Retriever over the configured index directory
    pub fn from_config(config: &Config, embedder: Arc<LazyEmbedder>) -> Self {
        Self::new(DiskLoader::new(IndexStore::open(config.index_dir()), embedder))
    }

    /// Resident state, loading it on first use. `None` if nothing is persisted.
    ///
    /// A failed or empty load is retried on the next call.
    pub async fn resident(&self) -> Result<Option<Arc<Resident>>> {
        if let Some(resident) = self.state.read().await.as_ref() {
            return Ok(Some(resident.clone()));
        }

        let _guard = self.load_lock.lock().await;
        if let Some(resident) = self.state.read().await.as_ref() {
            return Ok(Some(resident.clone()));
        }

        debug!("Loading resident index");
        let loaded = self.loader.load().await?.map(Arc::new);
        *self.state.write().await = loaded.clone();
        Ok(loaded)
    }

    /// Atomically replace the resident state
    pub async fn install(&self, resident: Resident) {
        let _guard = self.load_lock.lock().await;
        *self.state.write().await = Some(Arc::new(resident));
        info!("Installed new resident index");
    }

    /// Drop the resident state; the next query reloads from the loader
    pub async fn invalidate(&self) {
        let _guard = self.load_lock.lock().await;
        *self.state.write().await = None;
    }

    /// The `k` fragments nearest to `query`, ascending by distance.
    ///
    /// Returns an empty list when no index is available. Each result is an
    /// independent copy of the stored fragment.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedFragment>> {
        let Some(resident) = self.resident().await? else {
            debug!("No index available, returning no fragments");
            return Ok(Vec::new());
        };

        let vector = embed_query(resident.embedder.as_ref(), query).await?;
        let hits = resident.search(&vector, k)?;
        debug!("Retrieved {} fragment(s) for k={}", hits.len(), k);
        Ok(hits)
    }
}
