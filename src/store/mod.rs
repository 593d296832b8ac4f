//! Versioned on-disk storage for the index and fragment store
//!
//! Layout under the index directory:
//!
//! ```text
//! CURRENT                       name of the live version
//! versions/<version>/index.bin
//! versions/<version>/fragments.json
//! versions/<version>/manifest.json
//! ```
//!
//! A version directory is fully written before `CURRENT` is replaced by
//! rename, so readers see either the old pair or the new pair.

use crate::error::{Error, Result};
use crate::index::FlatIndex;
use crate::models::Fragment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const CURRENT_FILE: &str = "CURRENT";
const VERSIONS_DIR: &str = "versions";
const INDEX_FILE: &str = "index.bin";
const FRAGMENTS_FILE: &str = "fragments.json";
const MANIFEST_FILE: &str = "manifest.json";

/// Versions kept on disk after a successful save (the live one included).
const RETAINED_VERSIONS: usize = 2;

/// Metadata describing one persisted version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub fragment_count: usize,
    pub dimension: usize,
    pub embedding_model: String,
}

/// A fully loaded version
#[derive(Debug, Clone)]
pub struct StoredIndex {
    pub manifest: Manifest,
    pub index: FlatIndex,
    pub fragments: Vec<Fragment>,
}

/// Handle on an index directory
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn current_path(&self) -> PathBuf {
        self.root.join(CURRENT_FILE)
    }

    fn versions_dir(&self) -> PathBuf {
        self.root.join(VERSIONS_DIR)
    }

    fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir().join(version)
    }

    /// Name of the live version, if any
    pub fn current_version(&self) -> Result<Option<String>> {
        match fs::read_to_string(self.current_path()) {
            Ok(content) => {
                let name = content.trim();
                Ok((!name.is_empty()).then(|| name.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a new version and make it live.
    pub fn save(
        &self,
        index: &FlatIndex,
        fragments: &[Fragment],
        embedding_model: &str,
    ) -> Result<Manifest> {
        if index.len() != fragments.len() {
            return Err(Error::Index(format!(
                "index holds {} vectors but there are {} fragments",
                index.len(),
                fragments.len()
            )));
        }

        let created_at = Utc::now();
        let version = format!(
            "{}-{}",
            created_at.format("%Y%m%dT%H%M%S%.3fZ"),
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        let manifest = Manifest {
            version: version.clone(),
            created_at,
            fragment_count: fragments.len(),
            dimension: index.dimension(),
            embedding_model: embedding_model.to_string(),
        };

        let dir = self.version_dir(&version);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(INDEX_FILE), index.to_bytes())?;
        fs::write(dir.join(FRAGMENTS_FILE), serde_json::to_vec(fragments)?)?;
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )?;

        let current = self.current_path();
        let tmp = current.with_extension("tmp");
        fs::write(&tmp, version.as_bytes())?;
        fs::rename(&tmp, &current)?;
        info!(
            "Saved index version {} ({} fragments)",
            version,
            fragments.len()
        );

        self.prune();
        Ok(manifest)
    }

    /// Retire the live version so that no index is available.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(self.current_path()) {
            Ok(()) => {
                info!("Cleared live index in {:?}", self.root);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Load the live version. `None` when no complete version is present.
    pub fn load(&self) -> Result<Option<StoredIndex>> {
        let Some(version) = self.current_version()? else {
            debug!("No CURRENT pointer in {:?}", self.root);
            return Ok(None);
        };
        let dir = self.version_dir(&version);
        let (index_path, fragments_path) = (dir.join(INDEX_FILE), dir.join(FRAGMENTS_FILE));
        if !index_path.exists() || !fragments_path.exists() {
            warn!("Index version {} is incomplete, ignoring", version);
            return Ok(None);
        }

        let index = FlatIndex::from_bytes(&fs::read(&index_path)?)?;
        let fragments: Vec<Fragment> = serde_json::from_slice(&fs::read(&fragments_path)?)?;
        if index.len() != fragments.len() {
            return Err(Error::Index(format!(
                "version {} holds {} vectors but {} fragments",
                version,
                index.len(),
                fragments.len()
            )));
        }

        let manifest = match fs::read(dir.join(MANIFEST_FILE)) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Manifest {
                version: version.clone(),
                created_at: Utc::now(),
                fragment_count: fragments.len(),
                dimension: index.dimension(),
                embedding_model: String::new(),
            },
            Err(e) => return Err(e.into()),
        };

        debug!("Loaded index version {}", version);
        Ok(Some(StoredIndex {
            manifest,
            index,
            fragments,
        }))
    }

    /// Manifest of the live version without loading vectors
    pub fn manifest(&self) -> Result<Option<Manifest>> {
        let Some(version) = self.current_version()? else {
            return Ok(None);
        };
        match fs::read(self.version_dir(&version).join(MANIFEST_FILE)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove all but the newest versions. Failures are logged, not returned.
    fn prune(&self) {
        let current = self.current_version().ok().flatten();
        let mut versions: Vec<String> = match fs::read_dir(self.versions_dir()) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().is_dir())
                .filter_map(|e| e.file_name().into_string().ok())
                .collect(),
            Err(e) => {
                warn!("Failed to list index versions: {}", e);
                return;
            }
        };
        versions.retain(|v| current.as_deref() != Some(v.as_str()));
        versions.sort();
        versions.reverse();

        for stale in versions.into_iter().skip(RETAINED_VERSIONS - 1) {
            if let Err(e) = fs::remove_dir_all(self.version_dir(&stale)) {
                warn!("Failed to remove index version {}: {}", stale, e);
            } else {
                debug!("Removed index version {}", stale);
            }
        }
    }
}
