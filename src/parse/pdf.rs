//! PDF page extraction

use crate::error::{Error, Result};

/// Text of each page, in page order
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>> {
    pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| Error::Extraction(format!("PDF extraction failed: {}", e)))
}
