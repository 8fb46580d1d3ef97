use std::path::Path;

use super::LineExtractor;
use crate::error::ExtractError;
use crate::parser::lines::classify_lines;

/// Text-layer PDFs, read page by page.
pub struct PdfExtractor;

impl LineExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let bytes = std::fs::read(path)?;
        let pages = page_texts(&bytes)?;
        Ok(page_lines(&pages))
    }
}

fn page_texts(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    // pdf-extract can panic on malformed PDFs
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
        Err(_) => Err(ExtractError::Pdf(
            "extraction panicked (malformed file)".to_string(),
        )),
    }
}

/// Scanned pages have no text layer and contribute nothing.
fn page_lines(pages: &[String]) -> Vec<String> {
    pages.iter().flat_map(|p| classify_lines(p)).collect()
}
