//! Plain-text extraction from local document files.
//!
//! One file path in, one UTF-8 string out, with no structural fidelity:
//! tables and formatting are dropped. Supported: `.txt`/`.md` (read as-is),
//! `.pdf` (pdf-extract), `.docx` (OOXML text runs). The extraction itself is
//! synchronous; callers run it on the blocking thread pool via
//! [`extract_file`] so the event loop stays responsive.

use std::io::Read;
use std::path::{Path, PathBuf};

/// Maximum decompressed bytes read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction failure. All causes collapse to one user-visible error; the
/// caller treats extraction as a single fallible step.
#[derive(Debug)]
pub struct ExtractError(String);

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "text extraction failed: {}", self.0)
    }
}

impl std::error::Error for ExtractError {}

impl ExtractError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Extract text from a file on the blocking thread pool and await the
/// single result back on the calling task.
pub async fn extract_file(path: PathBuf) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || extract_file_sync(&path))
        .await
        .map_err(|e| ExtractError::new(e.to_string()))?
}

/// Synchronous extraction entry point, dispatching on file extension.
pub fn extract_file_sync(path: &Path) -> Result<String, ExtractError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "md" => {
            std::fs::read_to_string(path).map_err(|e| ExtractError::new(e.to_string()))
        }
        "pdf" => {
            let bytes = std::fs::read(path).map_err(|e| ExtractError::new(e.to_string()))?;
            extract_pdf(&bytes)
        }
        "docx" => {
            let bytes = std::fs::read(path).map_err(|e| ExtractError::new(e.to_string()))?;
            extract_docx(&bytes)
        }
        other => Err(ExtractError::new(format!(
            "unsupported file type: .{} (supported: .txt, .md, .pdf, .docx)",
            other
        ))),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::new(e.to_string()))
}

/// Pull the `w:t` text runs out of `word/document.xml`, joined by paragraph
/// breaks where the document has them.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::new(e.to_string()))?;

    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::new("word/document.xml not found"))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::new(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::new("word/document.xml exceeds size limit"));
    }

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(doc_xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.ends_with('\n') && !out.is_empty() {
                    out.push_str("\n\n");
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::new(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_error() {
        let err = extract_file_sync(Path::new("/nonexistent/notes.txt")).unwrap_err();
        assert!(err.to_string().contains("text extraction failed"));
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let err = extract_file_sync(Path::new("slides.pptx")).unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }

    #[test]
    fn invalid_pdf_is_an_error() {
        assert!(extract_pdf(b"not a pdf").is_err());
    }

    #[test]
    fn invalid_docx_is_an_error() {
        assert!(extract_docx(b"not a zip").is_err());
    }

    #[tokio::test]
    async fn extracts_plain_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.md");
        std::fs::write(&path, "Employees get 20 days leave.").unwrap();

        let text = extract_file(path).await.unwrap();
        assert_eq!(text, "Employees get 20 days leave.");
    }

    #[tokio::test]
    async fn failed_extraction_reports_single_error() {
        let err = extract_file(PathBuf::from("/nonexistent/handbook.pdf"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("text extraction failed"));
    }
}
