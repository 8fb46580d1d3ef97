//! Per-format adapters that turn a document into candidate record lines.
//!
//! Dispatch happens here, by file extension. The parser never sees a format:
//! every extractor hands back plain, trimmed lines that start with the marker.

pub mod pdf;
pub mod table;

use std::path::Path;

use tracing::{debug, warn};

use crate::error::ExtractError;

pub use pdf::PdfExtractor;
pub use table::{DelimitedExtractor, SpreadsheetExtractor};

/// Capability shared by every document format.
pub trait LineExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// .xlsx, .xls, .xlsm, .xlsb, .ods
    Spreadsheet,
    /// .csv
    Delimited,
    /// .pdf
    Paginated,
    Unsupported,
}

pub fn detect_kind(path: &Path) -> DocumentKind {
    let ext = extension(path);
    match ext.as_str() {
        "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => DocumentKind::Spreadsheet,
        "csv" => DocumentKind::Delimited,
        "pdf" => DocumentKind::Paginated,
        _ => DocumentKind::Unsupported,
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

pub fn extractor_for(kind: DocumentKind) -> Option<Box<dyn LineExtractor>> {
    match kind {
        DocumentKind::Spreadsheet => Some(Box::new(SpreadsheetExtractor)),
        DocumentKind::Delimited => Some(Box::new(DelimitedExtractor)),
        DocumentKind::Paginated => Some(Box::new(PdfExtractor)),
        DocumentKind::Unsupported => None,
    }
}

/// Extract candidate lines from one document, propagating any failure.
pub fn extract_document(path: &Path) -> Result<Vec<String>, ExtractError> {
    let extractor = extractor_for(detect_kind(path))
        .ok_or_else(|| ExtractError::Unsupported(extension(path)))?;
    extractor.extract(path)
}

/// Like [`extract_document`], but a broken document yields no lines.
/// The failure is logged and processing of other sources continues.
pub fn extract_document_lines(path: &Path) -> Vec<String> {
    match extract_document(path) {
        Ok(lines) => {
            debug!("{}: {} candidate lines", path.display(), lines.len());
            lines
        }
        Err(e) => {
            warn!("Skipping document {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_by_extension() {
        assert_eq!(detect_kind(Path::new("a/Cotas.XLSX")), DocumentKind::Spreadsheet);
        assert_eq!(detect_kind(Path::new("b.xls")), DocumentKind::Spreadsheet);
        assert_eq!(detect_kind(Path::new("b.ods")), DocumentKind::Spreadsheet);
        assert_eq!(detect_kind(Path::new("c.csv")), DocumentKind::Delimited);
        assert_eq!(detect_kind(Path::new("d.Pdf")), DocumentKind::Paginated);
        assert_eq!(detect_kind(Path::new("logo.png")), DocumentKind::Unsupported);
        assert_eq!(detect_kind(Path::new("Planilha_base")), DocumentKind::Unsupported);
    }

    #[test]
    fn unsupported_is_an_error() {
        let err = extract_document(Path::new("assinatura.png")).unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(ext) if ext == "png"));
    }

    #[test]
    fn csv_fixture_through_dispatch() {
        let lines = extract_document(Path::new("tests/fixtures/cotas.csv")).unwrap();
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l.starts_with("CF")));
    }

    #[test]
    fn corrupt_documents_yield_nothing() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["broken.pdf", "broken.xlsx", "broken.ods"] {
            let path = dir.path().join(name);
            std::fs::write(&path, b"\x00\x01 definitely not a document \xff").unwrap();
            assert!(extract_document(&path).is_err(), "{} should fail", name);
            assert!(extract_document_lines(&path).is_empty());
        }
    }

    #[test]
    fn missing_file_yields_nothing() {
        assert!(extract_document_lines(Path::new("tests/fixtures/nope.csv")).is_empty());
    }
}
