//! Markdown Import
//!
//! Migrates a directory of Markdown notes into entries: one top-level
//! entry per file, plus one entry per `##` section whose content is long
//! enough to stand alone. Section entries reference their parent. One bad
//! file never aborts the batch; failures are collected into the report.

use std::path::{Path, PathBuf};

use crate::memory::{EntryInput, MemoryType};
use crate::storage::{MemoryStore, StorageError};

/// Sections shorter than this are folded into the parent entry only.
pub const SECTION_MIN_CHARS: usize = 100;

/// Markdown import error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Unreadable file or directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed input document
    #[error("parse error in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    /// Storage rejected an imported entry
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One collected failure
#[derive(Debug)]
pub struct MigrationFailure {
    pub path: PathBuf,
    pub error: MigrateError,
}

/// Outcome of a directory import
#[derive(Debug, Default)]
pub struct MigrationReport {
    /// Files successfully imported
    pub files: usize,
    /// Entries written (file entries + section entries)
    pub entries: usize,
    /// Per-file failures; the batch continues past them
    pub failures: Vec<MigrationFailure>,
}

/// Import every `.md` file in a directory into `namespace`.
pub fn import_markdown_dir(
    store: &MemoryStore,
    dir: &Path,
    namespace: &str,
) -> Result<MigrationReport, MigrateError> {
    let mut report = MigrationReport::default();

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    paths.sort();

    for path in paths {
        match import_markdown_file(store, &path, namespace) {
            Ok(count) => {
                report.files += 1;
                report.entries += count;
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "markdown import failed");
                report.failures.push(MigrationFailure { path, error });
            }
        }
    }

    tracing::info!(
        files = report.files,
        entries = report.entries,
        failures = report.failures.len(),
        "markdown import finished"
    );
    Ok(report)
}

/// Import one file. Returns the number of entries written.
pub fn import_markdown_file(
    store: &MemoryStore,
    path: &Path,
    namespace: &str,
) -> Result<usize, MigrateError> {
    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(MigrateError::Parse {
            path: path.to_path_buf(),
            reason: "empty document".to_string(),
        });
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let doc = parse_document(&text, stem);

    let mut parent = EntryInput::new(namespace, slugify(stem), text.clone());
    parent.memory_type = MemoryType::Semantic;
    parent.metadata.insert(
        "source".to_string(),
        serde_json::Value::String(path.display().to_string()),
    );
    parent.metadata.insert(
        "title".to_string(),
        serde_json::Value::String(doc.title.clone()),
    );
    let parent = store.store(parent)?;
    let mut written = 1usize;

    for section in doc.sections {
        if section.body.trim().chars().count() < SECTION_MIN_CHARS {
            continue;
        }
        let mut input = EntryInput::new(
            namespace,
            format!("{}/{}", slugify(stem), slugify(&section.heading)),
            section.body.trim().to_string(),
        );
        input.memory_type = MemoryType::Semantic;
        input.references = vec![parent.id.clone()];
        input.metadata.insert(
            "source".to_string(),
            serde_json::Value::String(path.display().to_string()),
        );
        input.metadata.insert(
            "heading".to_string(),
            serde_json::Value::String(section.heading.clone()),
        );
        store.store(input)?;
        written += 1;
    }

    Ok(written)
}

struct Section {
    heading: String,
    body: String,
}

struct Document {
    title: String,
    sections: Vec<Section>,
}

/// Split a document into its `##` sections. The `#` title, when present,
/// names the document.
fn parse_document(text: &str, fallback_title: &str) -> Document {
    let mut title = fallback_title.to_string();
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;

    for line in text.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(Section {
                heading: heading.trim().to_string(),
                body: String::new(),
            });
        } else if let Some(doc_title) = line.strip_prefix("# ") {
            if current.is_none() {
                title = doc_title.trim().to_string();
            }
        } else if let Some(section) = current.as_mut() {
            section.body.push_str(line);
            section.body.push('\n');
        }
    }
    if let Some(section) = current.take() {
        sections.push(section);
    }

    Document { title, sections }
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let trimmed = slug.trim_end_matches('-').to_string();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed
    }
}

// ============================================================================
// TESTS
// ============================================================================
