use quick_xml::events::Event;
use quick_xml::Reader;
use std::any::Any;
use std::io::{Cursor, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TEXT_MIME: &str = "text/plain";

/// Extensions offered by the file picker.
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["pdf", "docx", "txt", "md"];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported format ({name}). Please upload PDF, DOCX, TXT, or MD.")]
    UnsupportedFormat { name: String },

    #[error("The document appears to be empty.")]
    EmptyDocument,

    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    #[error("Failed to read DOCX: {0}")]
    Docx(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    /// MIME type decides first; plain-text files may also be recognised by name.
    pub fn detect(name: &str, mime: Option<&str>) -> Option<Self> {
        let lower = name.to_lowercase();
        match mime {
            Some(PDF_MIME) => Some(DocumentFormat::Pdf),
            Some(DOCX_MIME) => Some(DocumentFormat::Docx),
            Some(TEXT_MIME) => Some(DocumentFormat::Text),
            _ if lower.ends_with(".md") || lower.ends_with(".txt") => Some(DocumentFormat::Text),
            _ => None,
        }
    }
}

/// A file handed over by the user: its name, declared MIME type and contents.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, mime: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.map(String::from),
            bytes,
        }
    }

    /// Reads a local file, declaring the MIME type a file picker would report for it.
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime = guess_mime(&name);
        Ok(Self::new(name, mime, bytes))
    }
}

fn guess_mime(name: &str) -> Option<&'static str> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;
    match ext.as_str() {
        "pdf" => Some(PDF_MIME),
        "docx" => Some(DOCX_MIME),
        "txt" => Some(TEXT_MIME),
        _ => None,
    }
}

/// Text extraction for the library-backed formats.
pub trait TextExtractor {
    /// Text of each page, in page order.
    fn pdf_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError>;
    fn docx_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Extracts plain text from an upload, dispatching on its format.
pub fn extract_text(extractor: &dyn TextExtractor, upload: &Upload) -> Result<String, ExtractError> {
    let format = DocumentFormat::detect(&upload.name, upload.mime.as_deref()).ok_or_else(|| {
        ExtractError::UnsupportedFormat {
            name: upload.name.clone(),
        }
    })?;

    let text = match format {
        DocumentFormat::Pdf => {
            let mut text = String::new();
            for page in extractor.pdf_pages(&upload.bytes)? {
                text.push_str(&page);
                text.push('\n');
            }
            text
        }
        DocumentFormat::Docx => extractor.docx_text(&upload.bytes)?,
        DocumentFormat::Text => String::from_utf8_lossy(&upload.bytes).into_owned(),
    };

    debug!(
        "Extracted {} chars from {} ({:?}, {} bytes)",
        text.len(),
        upload.name,
        format,
        upload.bytes.len()
    );

    if text.trim().is_empty() {
        return Err(ExtractError::EmptyDocument);
    }
    Ok(text)
}

/// `pdf-extract` for PDFs, `zip` + `quick-xml` for DOCX.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryExtractor;

impl TextExtractor for LibraryExtractor {
    fn pdf_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        // pdf-extract panics on fonts and encodings it does not support.
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }))
        .map_err(|payload| {
            ExtractError::Pdf(format!("unsupported PDF structure ({})", panic_message(payload.as_ref())))
        })?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
        Ok(pages.iter().map(|page| join_page_items(page)).collect())
    }

    fn docx_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Docx(e.to_string()))?
            .read_to_string(&mut xml)?;
        document_xml_text(&xml)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Collapses a page's text items into one space-separated line.
fn join_page_items(page: &str) -> String {
    page.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Raw text of a WordprocessingML body: runs concatenated, paragraphs separated by a blank line.
fn document_xml_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                b"w:p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| ExtractError::Docx(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs.join("\n\n"))
}
