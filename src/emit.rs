use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::config::{Column, Layout};
use crate::consolidate::ConsolidatedSet;
use crate::error::PipelineError;
use crate::parser::record::{Record, DATE_FORMAT};

/// Literal start of every output line.
pub const PREFIX: &str = "CF ";
const VALUE_DECIMALS: usize = 10;

fn field_text(record: &Record, column: Column) -> String {
    match column {
        Column::Identifier => record.identifier.clone(),
        Column::Date => record.date.format(DATE_FORMAT).to_string(),
        Column::Value => format!("{:.*}", VALUE_DECIMALS, record.value),
        Column::TaxId => record.tax_id.clone(),
    }
}

/// One positional line, without the newline. Each field is left-justified
/// and space-filled to its column width; longer fields overflow unchanged.
pub fn format_line(record: &Record, layout: &Layout) -> String {
    let mut line = String::from(PREFIX);
    for (column, width) in layout.columns() {
        line.push_str(&format!("{:<width$}", field_text(record, column), width = width));
    }
    line
}

/// The whole file body, records in ascending tax id order.
pub fn render(set: &ConsolidatedSet, layout: &Layout) -> String {
    let mut out = String::new();
    for record in set.records() {
        out.push_str(&format_line(record, layout));
        out.push('\n');
    }
    out
}

/// Write the file next to its destination, then rename it into place,
/// so a failure never leaves a truncated file behind.
pub fn write_prn(set: &ConsolidatedSet, layout: &Layout, path: &Path) -> Result<usize, PipelineError> {
    let fail = |source: std::io::Error| PipelineError::WriteFailure {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(fail)?;

    let body = render(set, layout);
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(fail)?;
    tmp.write_all(body.as_bytes()).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;

    info!("Wrote {} records to {}", set.len(), path.display());
    Ok(set.len())
}
