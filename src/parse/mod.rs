//! Document loading and page text extraction
//!
//! The corpus is the set of files directly inside the data directory.
//! PDFs yield one [`PageText`] per page; plain text and Markdown files are a
//! single page 1. A file that fails to extract is logged and skipped.

#[cfg(feature = "pdf")]
mod pdf;

use crate::error::{Error, Result};
use crate::models::PageText;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Document formats the loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    PlainText,
}

impl DocumentKind {
    /// Detect document kind from file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" | "text" | "md" | "markdown" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }
}

/// Supported files directly inside `dir`, sorted by name
pub fn discover_documents(dir: &Path) -> Vec<(PathBuf, DocumentKind)> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.into_path();
            DocumentKind::from_extension(&path).map(|kind| (path, kind))
        })
        .collect()
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Extract page texts from one file. Empty pages are dropped.
pub fn extract_pages(path: &Path, kind: DocumentKind) -> Result<Vec<PageText>> {
    let source = source_name(path);
    let pages = match kind {
        DocumentKind::PlainText => vec![std::fs::read_to_string(path)?],
        DocumentKind::Pdf => pdf_pages(path)?,
    };

    Ok(pages
        .into_iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(i, text)| PageText {
            text,
            source: source.clone(),
            page: i as u32 + 1,
        })
        .collect())
}

#[cfg(feature = "pdf")]
fn pdf_pages(path: &Path) -> Result<Vec<String>> {
    pdf::extract_pages(&std::fs::read(path)?)
}

#[cfg(not(feature = "pdf"))]
fn pdf_pages(path: &Path) -> Result<Vec<String>> {
    Err(Error::Extraction(format!(
        "{}: PDF support not compiled in (enable the `pdf` feature)",
        path.display()
    )))
}

/// Load every page of every supported document in `dir`.
///
/// A missing directory yields no pages. Per-file failures, including panics
/// inside the PDF parser, are logged and the file is skipped.
pub async fn load_documents(dir: &Path) -> Result<Vec<PageText>> {
    if !dir.is_dir() {
        warn!("Data directory {:?} does not exist", dir);
        return Ok(Vec::new());
    }

    let mut pages = Vec::new();
    for (path, kind) in discover_documents(dir) {
        debug!("Extracting {:?}", path);
        let task_path = path.clone();
        let extracted = tokio::task::spawn_blocking(move || extract_pages(&task_path, kind))
            .await
            .map_err(|e| Error::Extraction(format!("extractor crashed: {}", e)))
            .and_then(|result| result);

        match extracted {
            Ok(doc_pages) => {
                info!("Loaded {} page(s) from {}", doc_pages.len(), source_name(&path));
                pages.extend(doc_pages);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }

    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(
            DocumentKind::from_extension(Path::new("a/Manual.PDF")),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_extension(Path::new("notes.md")),
            Some(DocumentKind::PlainText)
        );
        assert_eq!(DocumentKind::from_extension(Path::new("image.png")), None);
        assert_eq!(DocumentKind::from_extension(Path::new("README")), None);
    }

    #[test]
    fn test_discover_is_not_recursive() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.txt"), "b").unwrap();
        std::fs::write(tmp.path().join("a.md"), "a").unwrap();
        std::fs::write(tmp.path().join("skip.png"), "x").unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(tmp.path().join("nested/c.txt"), "c").unwrap();

        let names: Vec<_> = discover_documents(tmp.path())
            .into_iter()
            .map(|(p, _)| source_name(&p))
            .collect();
        assert_eq!(names, vec!["a.md", "b.txt"]);
    }

    #[tokio::test]
    async fn test_load_documents_text_and_missing_dir() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "Vso is the stall speed.").unwrap();
        std::fs::write(tmp.path().join("empty.txt"), "   \n").unwrap();

        let pages = load_documents(tmp.path()).await.unwrap();
        assert_eq!(
            pages,
            vec![PageText {
                text: "Vso is the stall speed.".to_string(),
                source: "notes.txt".to_string(),
                page: 1,
            }]
        );

        assert!(load_documents(&tmp.path().join("absent")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broken_pdf_is_skipped() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("broken.pdf"), b"not a pdf at all").unwrap();
        std::fs::write(tmp.path().join("ok.txt"), "Readable text page.").unwrap();

        let pages = load_documents(tmp.path()).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].source, "ok.txt");
    }
}
