//! Source traversal → parsing → consolidation → fixed-width file.
//!
//! Sources are visited one at a time in a fixed order: for each selected
//! message its body, then its attachments; the base spreadsheet last. Only
//! an unreachable mailbox, an unreadable base spreadsheet or a failed write
//! stop the run. A broken attachment only costs its own records.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::Config;
use crate::consolidate::ConsolidatedSet;
use crate::emit;
use crate::error::PipelineError;
use crate::extract::{self, DelimitedExtractor, DocumentKind, LineExtractor, SpreadsheetExtractor};
use crate::mailbox::{MailStore, MessageFilter, SqliteMailbox};
use crate::parser::{self, lines::classify_lines};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub messages: usize,
    pub attachments: usize,
    pub lines: usize,
    pub records: usize,
    pub consolidated: usize,
    pub output: Option<PathBuf>,
}

pub fn open_mailbox(path: &Path) -> Result<SqliteMailbox, PipelineError> {
    SqliteMailbox::open(path).map_err(|e| PipelineError::unavailable("mailbox", format!("{:#}", e)))
}

pub fn filter_for(config: &Config) -> MessageFilter {
    MessageFilter {
        subject: config.subject_filter.clone(),
        sender: config.sender_filter.clone(),
    }
}

/// Lines of the base spreadsheet. Unlike attachments, failure here is fatal.
pub fn base_lines(path: &Path) -> Result<Vec<String>, PipelineError> {
    let result = match extract::detect_kind(path) {
        DocumentKind::Delimited => DelimitedExtractor.extract(path),
        _ => SpreadsheetExtractor.extract(path),
    };
    result.map_err(|e| PipelineError::unavailable(format!("base spreadsheet {}", path.display()), e))
}

/// Every candidate line from every source, in traversal order.
pub fn collect_lines(
    store: &dyn MailStore,
    filter: &MessageFilter,
    base: &Path,
    summary: &mut RunSummary,
) -> Result<Vec<String>, PipelineError> {
    let messages = store
        .messages(filter)
        .map_err(|e| PipelineError::unavailable("mailbox", format!("{:#}", e)))?;
    info!("{} messages match subject {:?}", messages.len(), filter.subject);
    summary.messages = messages.len();

    let staging = tempfile::tempdir()
        .map_err(|e| PipelineError::unavailable("attachment staging directory", e))?;

    let pb = ProgressBar::new(messages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} messages")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let mut lines = Vec::new();
    for msg in &messages {
        let body = classify_lines(&msg.body);
        debug!(
            "Message {} from {} ({}): {} body lines",
            msg.id,
            msg.sender,
            msg.subject,
            body.len()
        );
        lines.extend(body);

        let saved = store
            .save_attachments(msg, staging.path())
            .map_err(|e| PipelineError::unavailable("mailbox", format!("{:#}", e)))?;
        summary.attachments += saved.len();
        for path in &saved {
            lines.extend(extract::extract_document_lines(path));
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let base = base_lines(base)?;
    info!("Base spreadsheet: {} candidate lines", base.len());
    lines.extend(base);

    summary.lines = lines.len();
    Ok(lines)
}

/// Everything up to, but not including, writing the file.
pub fn consolidate_sources(
    store: &dyn MailStore,
    config: &Config,
) -> Result<(ConsolidatedSet, RunSummary), PipelineError> {
    let mut summary = RunSummary::default();
    let lines = collect_lines(store, &filter_for(config), &config.base_spreadsheet, &mut summary)?;

    let records = parser::parse_lines(&lines);
    summary.records = records.len();

    let set: ConsolidatedSet = records.into_iter().collect();
    summary.consolidated = set.len();
    info!(
        "{} lines → {} records → {} after consolidation",
        summary.lines, summary.records, summary.consolidated
    );
    Ok((set, summary))
}

pub fn run(store: &dyn MailStore, config: &Config) -> Result<RunSummary, PipelineError> {
    config.layout.validate()?;
    let (set, mut summary) = consolidate_sources(store, config)?;
    emit::write_prn(&set, &config.layout, &config.output)?;
    summary.output = Some(config.output.clone());
    Ok(summary)
}
