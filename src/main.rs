mod config;
mod consolidate;
mod emit;
mod error;
mod extract;
mod mailbox;
mod parser;
mod pipeline;

use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use config::{Config, Overrides};
use consolidate::ConsolidatedSet;
use mailbox::{NewMessage, SqliteMailbox};

#[derive(Parser)]
#[command(name = "cota_prn", about = "Collect fund quotation (CF) lines into a fixed-width PRN file")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// SQLite mailbox (overrides the config file)
    #[arg(long, global = true)]
    mailbox: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, consolidate and write the PRN file
    Run {
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Show the consolidated records without writing the file
    Preview {
        #[command(flatten)]
        overrides: Overrides,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Print all records as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Store a message (and its attachments) in the mailbox
    Import {
        #[arg(long)]
        subject: String,
        #[arg(long, default_value = "")]
        sender: String,
        /// File holding the message body
        #[arg(long)]
        body: Option<PathBuf>,
        /// Attachment files (repeatable)
        #[arg(short, long = "attach")]
        attachments: Vec<PathBuf>,
    },
    /// Show mailbox statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(mailbox) = cli.mailbox {
        config.mailbox = mailbox;
    }

    let result = match cli.command {
        Commands::Run { overrides } => {
            config.apply(overrides);
            let store = pipeline::open_mailbox(&config.mailbox)?;
            let s = pipeline::run(&store, &config)?;
            println!(
                "{} messages, {} attachments: {} lines, {} records, {} written to {}",
                s.messages,
                s.attachments,
                s.lines,
                s.records,
                s.consolidated,
                s.output.as_deref().unwrap_or(&config.output).display()
            );
            Ok(())
        }
        Commands::Preview {
            overrides,
            limit,
            json,
        } => {
            config.apply(overrides);
            let store = pipeline::open_mailbox(&config.mailbox)?;
            let (set, summary) = pipeline::consolidate_sources(&store, &config)?;
            if json {
                let records: Vec<_> = set.records().collect();
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if set.is_empty() {
                println!("No records found ({} candidate lines).", summary.lines);
            } else {
                println!("{}", render_preview(&set, limit, &summary));
            }
            Ok(())
        }
        Commands::Import {
            subject,
            sender,
            body,
            attachments,
        } => {
            let store = SqliteMailbox::create(&config.mailbox)?;
            let body = match body {
                Some(p) => std::fs::read_to_string(&p)
                    .with_context(|| format!("Failed to read body {}", p.display()))?,
                None => String::new(),
            };
            let mut files = Vec::with_capacity(attachments.len());
            for path in &attachments {
                let content = std::fs::read(path)
                    .with_context(|| format!("Failed to read attachment {}", path.display()))?;
                files.push((file_name(path), content));
            }
            let id = store.insert_message(&NewMessage {
                subject: &subject,
                sender: &sender,
                body: &body,
                attachments: files,
            })?;
            println!(
                "Stored message {} with {} attachments in {}",
                id,
                attachments.len(),
                config.mailbox.display()
            );
            Ok(())
        }
        Commands::Stats => {
            let store = pipeline::open_mailbox(&config.mailbox)?;
            let s = store.stats(&pipeline::filter_for(&config))?;
            println!("Messages:    {}", s.messages);
            println!("Attachments: {}", s.attachments);
            println!("Matching:    {} (subject {:?})", s.matching, config.subject_filter);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string())
}

/// Identifiers wider than their column are cut with `{:.12}`; the file itself never truncates.
fn render_preview(set: &ConsolidatedSet, limit: usize, summary: &pipeline::RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3} | {:<12} | {:<10} | {:>22} | {:<18}",
        "#", "CF", "Data", "Cota", "CNPJ"
    );
    let _ = writeln!(out, "{}", "-".repeat(78));
    for (i, r) in set.records().take(limit).enumerate() {
        let _ = writeln!(
            out,
            "{:>3} | {:<12.12} | {:<10} | {:>22.10} | {:<18}",
            i + 1,
            r.identifier,
            r.date.format(parser::record::DATE_FORMAT).to_string(),
            r.value,
            r.tax_id
        );
    }
    let _ = write!(
        out,
        "\n{} of {} records | {} lines from {} messages",
        set.len().min(limit),
        set.len(),
        summary.lines,
        summary.messages
    );
    out
}
