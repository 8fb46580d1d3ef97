use std::path::PathBuf;

use thiserror::Error;

/// Faults that abort a run. Anything else degrades the output silently.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source unavailable: {source_name}: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// A single document could not be read. Caught per file; never fatal for attachments.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("pdf: {0}")]
    Pdf(String),

    #[error("unsupported document type: .{0}")]
    Unsupported(String),
}
