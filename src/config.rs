use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PipelineError;

const DEFAULT_BASE_SPREADSHEET: &str = "Planilha_base";
const DEFAULT_OUTPUT: &str = "cotacoes_definitivo.prn";
const DEFAULT_MAILBOX: &str = "data/mailbox.sqlite";
const DEFAULT_SUBJECT_FILTER: &str = "Cotas";

/// Logical columns of the positional output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Identifier,
    Date,
    Value,
    TaxId,
}

impl Column {
    pub const ALL: [Column; 4] = [Column::Identifier, Column::Date, Column::Value, Column::TaxId];
}

/// Column order and widths for the fixed-width emitter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Layout {
    pub order: Vec<Column>,
    pub widths: BTreeMap<Column, usize>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            order: Column::ALL.to_vec(),
            widths: BTreeMap::from([
                (Column::Identifier, 15),
                (Column::Date, 30),
                (Column::Value, 70),
                (Column::TaxId, 20),
            ]),
        }
    }
}

impl Layout {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.order.is_empty() {
            return Err(PipelineError::Config("layout.order is empty".into()));
        }
        for (i, col) in self.order.iter().enumerate() {
            if self.order[..i].contains(col) {
                return Err(PipelineError::Config(format!(
                    "layout.order lists {:?} more than once",
                    col
                )));
            }
            if !self.widths.contains_key(col) {
                return Err(PipelineError::Config(format!(
                    "layout.widths has no width for {:?}",
                    col
                )));
            }
        }
        Ok(())
    }

    /// (column, width) pairs in output order. Call `validate` first.
    pub fn columns(&self) -> impl Iterator<Item = (Column, usize)> + '_ {
        self.order
            .iter()
            .map(|c| (*c, self.widths.get(c).copied().unwrap_or(0)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub base_spreadsheet: PathBuf,
    pub output: PathBuf,
    pub mailbox: PathBuf,
    pub subject_filter: String,
    pub sender_filter: Option<String>,
    pub layout: Layout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_spreadsheet: PathBuf::from(DEFAULT_BASE_SPREADSHEET),
            output: PathBuf::from(DEFAULT_OUTPUT),
            mailbox: PathBuf::from(DEFAULT_MAILBOX),
            subject_filter: DEFAULT_SUBJECT_FILTER.to_string(),
            sender_filter: None,
            layout: Layout::default(),
        }
    }
}

/// Per-invocation overrides taken from the command line.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct Overrides {
    /// Base reference spreadsheet (.xlsx/.xls/.ods/.csv)
    #[arg(long)]
    pub base: Option<PathBuf>,
    /// Destination of the fixed-width file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Only messages whose subject contains this text
    #[arg(long)]
    pub subject: Option<String>,
    /// Only messages whose sender contains this text
    #[arg(long)]
    pub sender: Option<String>,
}

impl Config {
    /// Load from a TOML file, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p).map_err(|e| {
                    PipelineError::Config(format!("cannot read {}: {}", p.display(), e))
                })?;
                info!("Loaded config from {}", p.display());
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, PipelineError> {
        let config: Config =
            toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.layout.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(base) = overrides.base {
            self.base_spreadsheet = base;
        }
        if let Some(output) = overrides.output {
            self.output = output;
        }
        if let Some(subject) = overrides.subject {
            self.subject_filter = subject;
        }
        if overrides.sender.is_some() {
            self.sender_filter = overrides.sender;
        }
    }
}
