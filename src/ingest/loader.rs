//! File loading with extension dispatch.
//!
//! Supported formats map to a `FileKind` variant; adding a format means
//! adding a variant and one arm in `read_file`.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

use super::Document;
use crate::core::config::{DEFAULT_MAX_FILE_SIZE, SUPPORTED_EXTENSIONS};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("unsupported file type: .{0}")]
    UnsupportedFormat(String),
    #[error("file too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },
    #[error("failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Markdown,
    Pdf,
    Docx,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(FileKind::Text),
            "md" => Some(FileKind::Markdown),
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::Docx),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Result of a directory sweep: the union of successfully loaded documents
/// plus the number of supported files that failed to load.
#[derive(Debug, Default)]
pub struct DirectoryLoad {
    pub documents: Vec<Document>,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    max_file_size: u64,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Load a single file. Existence, extension and size are validated
    /// before any parsing happens.
    pub fn load_path(&self, path: &Path) -> Result<Vec<Document>, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        let kind = FileKind::from_extension(&ext)
            .ok_or_else(|| LoadError::UnsupportedFormat(ext.clone()))?;

        let size = fs::metadata(path)?.len();
        if size > self.max_file_size {
            return Err(LoadError::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        let content = read_file(path, kind)?;

        let mut metadata = Map::new();
        let source = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        metadata.insert("source".to_string(), Value::String(source));
        metadata.insert(
            "file_path".to_string(),
            Value::String(path.display().to_string()),
        );
        metadata.insert("file_type".to_string(), Value::String(format!(".{}", ext)));

        Ok(vec![Document::with_metadata(content, metadata)])
    }

    /// Load every supported file directly under `dir`. A file that fails to
    /// load is logged and counted, never aborts the sweep.
    pub fn load_directory(&self, dir: &Path) -> Result<DirectoryLoad, LoadError> {
        if !dir.is_dir() {
            return Err(LoadError::NotFound(dir.display().to_string()));
        }

        let mut entries: Vec<_> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && FileKind::from_path(path).is_some())
            .collect();
        entries.sort();

        let mut result = DirectoryLoad::default();
        for path in entries {
            match self.load_path(&path) {
                Ok(documents) => result.documents.extend(documents),
                Err(err) => {
                    tracing::warn!("Skipping {}: {}", path.display(), err);
                    result.skipped += 1;
                }
            }
        }

        Ok(result)
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

fn read_file(path: &Path, kind: FileKind) -> Result<String, LoadError> {
    match kind {
        FileKind::Text | FileKind::Markdown => Ok(fs::read_to_string(path)?),
        FileKind::Pdf => pdf_extract::extract_text(path).map_err(|err| LoadError::Parse {
            path: path.display().to_string(),
            reason: err.to_string(),
        }),
        FileKind::Docx => read_docx(path),
    }
}

/// A .docx file is a zip archive; the body text lives in
/// `word/document.xml`.
fn read_docx(path: &Path) -> Result<String, LoadError> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|err| LoadError::Parse {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| LoadError::Parse {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?
        .read_to_string(&mut xml)
        .map_err(LoadError::Io)?;

    Ok(extract_docx_text(&xml))
}

/// Strip WordprocessingML markup, keeping paragraph structure.
fn extract_docx_text(xml: &str) -> String {
    let with_breaks = xml.replace("</w:p>", "\n\n").replace("<w:tab/>", "\t");

    let mut result = String::new();
    let mut in_tag = false;
    for c in with_breaks.chars() {
        if c == '<' {
            in_tag = true;
        } else if c == '>' {
            in_tag = false;
        } else if !in_tag {
            result.push(c);
        }
    }

    let lines: Vec<&str> = result
        .lines()
        .map(|l| l.trim_end())
        .collect();
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn kind_dispatch_covers_supported_set() {
        for ext in SUPPORTED_EXTENSIONS {
            assert!(FileKind::from_extension(ext).is_some(), "missing {}", ext);
        }
        assert!(FileKind::from_extension("exe").is_none());
        assert!(FileKind::from_extension("PDF").is_some());
    }

    #[test]
    fn load_text_file_sets_source_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "hello world").unwrap();

        let docs = DocumentLoader::default().load_path(&path).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "hello world");
        assert_eq!(docs[0].source(), "notes.txt");
        assert_eq!(
            docs[0].metadata.get("file_type").and_then(|v| v.as_str()),
            Some(".txt")
        );
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "a,b,c").unwrap();

        let err = DocumentLoader::default().load_path(&path).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat(ext) if ext == "csv"));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "x".repeat(64)).unwrap();

        let err = DocumentLoader::new(16).load_path(&path).unwrap_err();
        assert!(matches!(err, LoadError::FileTooLarge { size: 64, limit: 16 }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = DocumentLoader::default()
            .load_path(Path::new("/nonexistent/file.txt"))
            .unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn directory_sweep_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        fs::write(dir.path().join("b.md"), "# beta").unwrap();
        fs::write(dir.path().join("ignored.csv"), "c,s,v").unwrap();
        // Supported extension but not a real zip archive.
        fs::write(dir.path().join("broken.docx"), "not a docx").unwrap();

        let loaded = DocumentLoader::default()
            .load_directory(dir.path())
            .unwrap();
        assert_eq!(loaded.documents.len(), 2);
        assert_eq!(loaded.skipped, 1);
    }

    #[test]
    fn docx_extraction_strips_markup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.docx");

        let file = fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(
                "word/document.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        writer
            .write_all(
                b"<w:document><w:body><w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>\
                  <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p></w:body></w:document>",
            )
            .unwrap();
        writer.finish().unwrap();

        let docs = DocumentLoader::default().load_path(&path).unwrap();
        assert!(docs[0].content.contains("First paragraph"));
        assert!(docs[0].content.contains("Second paragraph"));
        assert!(!docs[0].content.contains('<'));
    }
}
