use std::path::Path;

/// Upload formats the extractor understands. Detection is by file extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Extensions accepted on upload, for error messages.
    pub const ACCEPTED: &'static [&'static str] = &["pdf", "docx"];

    /// Detects the format from a file name or path, ignoring extension case.
    pub fn from_filename(name: &str) -> Option<Self> {
        Self::from_path(Path::new(name))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }

    /// Canonical lower-case extension used for server-side storage names.
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}
