//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::parse::discover_documents;
use crate::store::{IndexStore, Manifest};
use serde::Serialize;
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub config_exists: bool,
    pub data_dir: String,
    pub document_count: usize,
    pub index_dir: String,
    pub index: Option<Manifest>,
    pub embedding_model: String,
    pub llm_model: String,
    pub llm_base_url: String,
    pub api_key_set: bool,
}

/// Get system status
pub fn cmd_status(config: &Config) -> Result<StatusInfo> {
    info!("Getting status");

    let data_dir = config.data_dir();
    let document_count = discover_documents(&data_dir).len();
    let index = IndexStore::open(config.index_dir()).manifest()?;

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        config_exists: config.paths.config_file.exists(),
        data_dir: data_dir.display().to_string(),
        document_count,
        index_dir: config.index_dir().display().to_string(),
        index,
        embedding_model: config.embedding.model.clone(),
        llm_model: config.llm.model.clone(),
        llm_base_url: config.llm.base_url.clone(),
        api_key_set: config.llm_api_key().is_some(),
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 docqa Status\n");
    let marker = if status.config_exists { "" } else { " (defaults, file not found)" };
    println!("Configuration: {}{}", status.config_path, marker);
    println!("\nDocuments:");
    println!("  Directory: {}", status.data_dir);
    println!("  Files: {}", status.document_count);
    println!("\nIndex:");
    println!("  Directory: {}", status.index_dir);
    match &status.index {
        Some(manifest) => {
            println!("  Status: ✓ Ready");
            println!("  Version: {}", manifest.version);
            println!("  Built: {}", manifest.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("  Fragments: {}", manifest.fragment_count);
            println!("  Dimension: {}", manifest.dimension);
        }
        None => println!("  Status: ⚠ Not built (run 'docqa ingest')"),
    }
    println!("\nEmbedding Model: {}", status.embedding_model);
    println!("\nLanguage Model:");
    println!("  Model: {}", status.llm_model);
    println!("  Endpoint: {}", status.llm_base_url);
    println!(
        "  API key: {}",
        if status.api_key_set { "✓ Set" } else { "✗ Not set" }
    );
}
