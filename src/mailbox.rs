use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use tracing::warn;

/// Source of quotation e-mails. Only iteration, body text and attachment
/// materialization are needed by the pipeline.
pub trait MailStore {
    fn messages(&self, filter: &MessageFilter) -> Result<Vec<Message>>;

    /// Write every attachment of `message` into `dir` and return the paths.
    /// An attachment that cannot be written is logged and skipped.
    fn save_attachments(&self, message: &Message, dir: &Path) -> Result<Vec<PathBuf>>;
}

/// Case-sensitive substring filters; an empty subject matches everything.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub subject: String,
    pub sender: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub subject: String,
    pub sender: String,
    pub body: String,
    pub attachments: Vec<AttachmentMeta>,
}

#[derive(Debug, Clone)]
pub struct AttachmentMeta {
    pub id: i64,
    pub file_name: String,
}

pub struct NewMessage<'a> {
    pub subject: &'a str,
    pub sender: &'a str,
    pub body: &'a str,
    pub attachments: Vec<(String, Vec<u8>)>,
}

pub struct Stats {
    pub messages: usize,
    pub attachments: usize,
    pub matching: usize,
}

/// Mailbox kept in a SQLite file, attachments stored as blobs.
#[derive(Debug)]
pub struct SqliteMailbox {
    conn: Connection,
}

impl SqliteMailbox {
    /// Open an existing mailbox. A missing file or one without the mailbox
    /// tables is an error, not an empty mailbox. Nothing is written.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("mailbox {} does not exist", path.display());
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open mailbox {}", path.display()))?;
        let tables: usize = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('messages', 'attachments')",
            [],
            |r| r.get(0),
        )?;
        if tables != 2 {
            anyhow::bail!("{} is not a mailbox (run import first)", path.display());
        }
        Ok(Self { conn })
    }

    /// Open or create, used when importing.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::initialized(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::initialized(Connection::open_in_memory()?)
    }

    fn initialized(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn insert_message(&self, msg: &NewMessage) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO messages (subject, sender, body) VALUES (?1, ?2, ?3)",
            rusqlite::params![msg.subject, msg.sender, msg.body],
        )?;
        let message_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO attachments (message_id, file_name, content) VALUES (?1, ?2, ?3)",
            )?;
            for (name, content) in &msg.attachments {
                stmt.execute(rusqlite::params![message_id, name, content])?;
            }
        }
        tx.commit()?;
        Ok(message_id)
    }

    pub fn stats(&self, filter: &MessageFilter) -> Result<Stats> {
        let messages: usize =
            self.conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0))?;
        let attachments: usize =
            self.conn.query_row("SELECT COUNT(*) FROM attachments", [], |r| r.get(0))?;
        let matching: usize = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM messages WHERE {}", FILTER_SQL),
            rusqlite::params![filter.subject, filter.sender],
            |r| r.get(0),
        )?;
        Ok(Stats {
            messages,
            attachments,
            matching,
        })
    }

    fn attachment_content(&self, attachment_id: i64) -> Result<Option<Vec<u8>>> {
        let content = self
            .conn
            .query_row(
                "SELECT content FROM attachments WHERE id = ?1",
                [attachment_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(content)
    }

    fn attachment_meta(&self, message_id: i64) -> Result<Vec<AttachmentMeta>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, file_name FROM attachments WHERE message_id = ?1 ORDER BY id")?;
        let rows = stmt
            .query_map([message_id], |row| {
                Ok(AttachmentMeta {
                    id: row.get(0)?,
                    file_name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

// instr() is case-sensitive, like a plain substring test
const FILTER_SQL: &str = "instr(subject, ?1) > 0 AND (?2 IS NULL OR instr(sender, ?2) > 0)";

impl MailStore for SqliteMailbox {
    fn messages(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        let sql = format!(
            "SELECT id, subject, sender, body FROM messages WHERE {} ORDER BY id",
            FILTER_SQL
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut messages = stmt
            .query_map(rusqlite::params![filter.subject, filter.sender], |row| {
                Ok(Message {
                    id: row.get(0)?,
                    subject: row.get(1)?,
                    sender: row.get(2)?,
                    body: row.get(3)?,
                    attachments: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for msg in &mut messages {
            msg.attachments = self.attachment_meta(msg.id)?;
        }
        Ok(messages)
    }

    fn save_attachments(&self, message: &Message, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut saved = Vec::with_capacity(message.attachments.len());
        for att in &message.attachments {
            let Some(content) = self.attachment_content(att.id)? else {
                continue;
            };
            let path = dir.join(attachment_file_name(att));
            match std::fs::write(&path, content) {
                Ok(()) => saved.push(path),
                Err(e) => warn!("Could not save attachment {}: {}", att.file_name, e),
            }
        }
        Ok(saved)
    }
}

/// Unique, traversal-safe file name that keeps the original extension.
fn attachment_file_name(att: &AttachmentMeta) -> String {
    let base = Path::new(&att.file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("attachment");
    format!("{:04}-{}", att.id, base)
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY,
            subject     TEXT NOT NULL,
            sender      TEXT NOT NULL,
            body        TEXT NOT NULL,
            received_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS attachments (
            id          INTEGER PRIMARY KEY,
            message_id  INTEGER NOT NULL REFERENCES messages(id),
            file_name   TEXT NOT NULL,
            content     BLOB NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_attachments_message ON attachments(message_id);
        ",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox() -> SqliteMailbox {
        let mb = SqliteMailbox::open_in_memory().unwrap();
        mb.insert_message(&NewMessage {
            subject: "Cotas 10/05",
            sender: "custodia@banco.com.br",
            body: "CF 1 10/05/2024 1.0 11.111.111/0001-11",
            attachments: vec![
                ("cotas.csv".into(), b"CF,2\n".to_vec()),
                ("../../etc/evil.pdf".into(), b"%PDF".to_vec()),
            ],
        })
        .unwrap();
        mb.insert_message(&NewMessage {
            subject: "Reuniao",
            sender: "custodia@banco.com.br",
            body: "nada",
            attachments: vec![],
        })
        .unwrap();
        mb.insert_message(&NewMessage {
            subject: "cotas minusculas",
            sender: "outro@corretora.com",
            body: "",
            attachments: vec![],
        })
        .unwrap();
        mb
    }

    #[test]
    fn subject_filter_is_case_sensitive() {
        let mb = mailbox();
        let msgs = mb
            .messages(&MessageFilter {
                subject: "Cotas".into(),
                sender: None,
            })
            .unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].subject, "Cotas 10/05");
        assert_eq!(msgs[0].attachments.len(), 2);
    }

    #[test]
    fn sender_filter() {
        let mb = mailbox();
        let filter = MessageFilter {
            subject: String::new(),
            sender: Some("corretora".into()),
        };
        let msgs = mb.messages(&filter).unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].sender, "outro@corretora.com");
    }

    #[test]
    fn empty_filter_matches_all_in_order() {
        let mb = mailbox();
        let msgs = mb.messages(&MessageFilter::default()).unwrap();
        let ids: Vec<i64> = msgs.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn attachments_materialized_inside_dir() {
        let mb = mailbox();
        let dir = tempfile::tempdir().unwrap();
        let msgs = mb.messages(&MessageFilter::default()).unwrap();
        let paths = mb.save_attachments(&msgs[0], dir.path()).unwrap();
        assert_eq!(paths.len(), 2);
        for p in &paths {
            assert_eq!(p.parent().unwrap(), dir.path());
        }
        assert!(paths[0].to_string_lossy().ends_with("cotas.csv"));
        assert!(paths[1].to_string_lossy().ends_with("evil.pdf"));
        assert_eq!(std::fs::read(&paths[0]).unwrap(), b"CF,2\n");
    }

    #[test]
    fn stats_count() {
        let mb = mailbox();
        let s = mb
            .stats(&MessageFilter {
                subject: "Cotas".into(),
                sender: Some("custodia".into()),
            })
            .unwrap();
        assert_eq!(s.messages, 3);
        assert_eq!(s.attachments, 2);
        assert_eq!(s.matching, 1);
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SqliteMailbox::open(&dir.path().join("missing.sqlite")).is_err());
    }

    #[test]
    fn open_reads_an_imported_mailbox() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mail").join("box.sqlite");
        SqliteMailbox::create(&path)
            .unwrap()
            .insert_message(&NewMessage {
                subject: "Cotas",
                sender: "custodia@banco.com.br",
                body: "CF 1 10/05/2024 1.0 11.111.111/0001-11",
                attachments: vec![("cotas.csv".into(), b"CF,2\n".to_vec())],
            })
            .unwrap();

        let mb = SqliteMailbox::open(&path).unwrap();
        let s = mb
            .stats(&MessageFilter {
                subject: "Cotas".into(),
                sender: None,
            })
            .unwrap();
        assert_eq!((s.messages, s.attachments, s.matching), (1, 1, 1));
    }

    #[test]
    fn open_does_not_create_the_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.sqlite");
        std::fs::write(&path, b"").unwrap();

        assert!(SqliteMailbox::open(&path).is_err());
        let conn = Connection::open(&path).unwrap();
        let tables: usize = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tables, 0);
    }
}
