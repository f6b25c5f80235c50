use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

/// Size past which the oldest entries are dropped on the next append (1 MB).
const MAX_LOG_SIZE: u64 = 1_048_576;

/// Header written at the top of a new recovery log.
const FILE_HEADER: &str = "\
<!-- todoodle recovery log: data that could not be loaded or saved normally.
     If a task went missing, check here.
     View with: td recovery
     Clear with: td recovery clear -->

---
";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Category of a recovery entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// A persisted value that failed to decode at load time
    Decode,
    /// A persistence write that failed
    Write,
    /// A store file that could not be parsed at all
    Corrupt,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Decode => write!(f, "decode"),
            RecoveryCategory::Write => write!(f, "write"),
            RecoveryCategory::Corrupt => write!(f, "corrupt"),
        }
    }
}

impl RecoveryCategory {
    pub fn parse_category(s: &str) -> Option<Self> {
        match s {
            "decode" => Some(RecoveryCategory::Decode),
            "write" => Some(RecoveryCategory::Write),
            "corrupt" => Some(RecoveryCategory::Corrupt),
            _ => None,
        }
    }
}

/// A single entry in the recovery log.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

impl RecoveryEntry {
    /// Entry stamped with the current time
    pub fn now(category: RecoveryCategory, description: impl Into<String>) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            category,
            description: description.into(),
            fields: Vec::new(),
            body: String::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Path helper
// ---------------------------------------------------------------------------

/// Return the path to the recovery log file.
pub fn recovery_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(".recovery.log")
}

// ---------------------------------------------------------------------------
// Atomic file write
// ---------------------------------------------------------------------------

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry formatting
// ---------------------------------------------------------------------------

impl RecoveryEntry {
    /// Format this entry as a markdown block for the recovery log.
    fn to_markdown(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "## {} [{}] {}\n",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.category,
            self.description,
        ));
        out.push('\n');

        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }

        if !self.body.is_empty() {
            let fence = code_fence(&self.body);
            out.push('\n');
            out.push_str(&fence);
            out.push_str("text\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fence);
            out.push('\n');
        }

        out.push('\n');
        out.push_str("---\n");
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "category": self.category.to_string(),
            "description": self.description,
            "fields": fields,
            "body": self.body,
        })
    }
}

/// A backtick fence longer than any backtick run inside `body`.
fn code_fence(body: &str) -> String {
    let longest = body.split(|c| c != '`').map(str::len).max().unwrap_or(0);
    "`".repeat((longest + 1).max(3))
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Append a recovery entry to the log. Errors are swallowed and logged.
pub fn log_recovery(data_dir: &Path, entry: RecoveryEntry) {
    warn_on_failure(data_dir, try_log_recovery(data_dir, entry));
}

/// Like [`log_recovery`], but skips the entry when the most recent one has
/// the same category, description and body.
pub fn log_recovery_unique(data_dir: &Path, entry: RecoveryEntry) {
    warn_on_failure(data_dir, try_log_recovery_unique(data_dir, entry));
}

/// [`log_recovery_unique`] for callers that must know whether the entry is
/// on disk. `Ok` also covers an entry that was already the latest one.
pub fn try_log_recovery_unique(data_dir: &Path, entry: RecoveryEntry) -> io::Result<()> {
    let latest = read_recovery_entries(data_dir, Some(1));
    if let Some(last) = latest.first()
        && last.category == entry.category
        && last.description == entry.description
        && last.body == entry.body.trim_end_matches('\n')
    {
        return Ok(());
    }
    try_log_recovery(data_dir, entry)
}

fn warn_on_failure(data_dir: &Path, result: io::Result<()>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, dir = %data_dir.display(), "could not write to recovery log");
    }
}

/// Append a recovery entry, reporting failure to the caller.
pub fn try_log_recovery(data_dir: &Path, entry: RecoveryEntry) -> io::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let path = recovery_log_path(data_dir);

    if let Ok(meta) = std::fs::metadata(&path)
        && meta.len() > MAX_LOG_SIZE
    {
        trim_oldest(&path)?;
    }

    let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())?;
    Ok(())
}

/// Drop the oldest half of the entries.
fn trim_oldest(path: &Path) -> io::Result<()> {
    let content = std::fs::read_to_string(path)?;
    let entries = parse_entries(&content);
    let keep = entries.len() / 2;
    let mut out = String::from(FILE_HEADER);
    for entry in &entries[entries.len() - keep..] {
        out.push_str(&entry.to_markdown());
    }
    atomic_write(path, out.as_bytes())
}

// ---------------------------------------------------------------------------
// Reading entries
// ---------------------------------------------------------------------------

/// Read recovery entries, most recent first.
pub fn read_recovery_entries(data_dir: &Path, limit: Option<usize>) -> Vec<RecoveryEntry> {
    let path = recovery_log_path(data_dir);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    let mut entries = parse_entries(&content);
    entries.reverse();
    if let Some(n) = limit {
        entries.truncate(n);
    }
    entries
}

/// Delete the recovery log. Returns the number of entries it held.
pub fn clear_recovery(data_dir: &Path) -> io::Result<usize> {
    let path = recovery_log_path(data_dir);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };
    let count = parse_entries(&content).len();
    std::fs::remove_file(&path)?;
    Ok(count)
}

/// Parse all entries from the log content string, oldest first.
fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let Some(header) = line.strip_prefix("## ") else {
            continue;
        };
        let Some((timestamp, category, description)) = parse_entry_header(header) else {
            continue;
        };

        let mut fields = Vec::new();
        let mut body = String::new();
        // Length of the open fence while inside the body block.
        let mut fence: Option<usize> = None;

        for line in lines.by_ref() {
            if let Some(len) = fence {
                if line.len() >= len && line.bytes().all(|b| b == b'`') {
                    fence = None;
                } else {
                    if !body.is_empty() {
                        body.push('\n');
                    }
                    body.push_str(line);
                }
                continue;
            }
            if line == "---" {
                break;
            }
            if line.starts_with("```") {
                fence = Some(line.bytes().take_while(|b| *b == b'`').count());
                continue;
            }
            if let Some((key, value)) = line.trim().split_once(": ") {
                fields.push((key.to_string(), value.to_string()));
            }
        }

        entries.push(RecoveryEntry {
            timestamp,
            category,
            description,
            fields,
            body,
        });
    }

    entries
}

/// Parse an entry header: `<timestamp> [<category>] <description>`
fn parse_entry_header(header: &str) -> Option<(DateTime<Utc>, RecoveryCategory, String)> {
    let (timestamp_str, rest) = header.split_once(" [")?;
    let (category_str, description) = rest.split_once("] ")?;

    let timestamp = DateTime::parse_from_rfc3339(timestamp_str)
        .ok()?
        .with_timezone(&Utc);
    let category = RecoveryCategory::parse_category(category_str)?;

    Some((timestamp, category, description.to_string()))
}
