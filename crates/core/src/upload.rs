//! Pre-flight checks for strategy documents. Everything here runs before a
//! single byte leaves the process.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    PlainText,
    Markdown,
    Png,
    Jpeg,
}

impl DocumentKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "text/plain" => Some(Self::PlainText),
            "text/markdown" | "text/x-markdown" => Some(Self::Markdown),
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::PlainText => "text/plain",
            Self::Markdown => "text/markdown",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::PlainText | Self::Markdown)
    }
}

/// A document as received from the dashboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), content_type, bytes }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Upload that passed validation and may be sent to the analysis gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedDocument {
    pub file_name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("`{file_name}` is empty")]
    Empty { file_name: String },
    #[error("`{file_name}` is {size} bytes; files must be smaller than {limit} bytes")]
    TooLarge { file_name: String, size: u64, limit: u64 },
    #[error("`{file_name}` is not a supported document type (pdf, txt, md, png, jpg)")]
    UnsupportedType { file_name: String },
}

impl UploadRejection {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Empty { .. } => "The selected file is empty. Choose a document with content.",
            Self::TooLarge { .. } => "File is too large. Upload a document under 10MB.",
            Self::UnsupportedType { .. } => {
                "Unsupported file type. Upload a PDF, TXT, MD, PNG or JPG document."
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Exclusive upper bound.
    pub max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self { max_bytes: DEFAULT_MAX_UPLOAD_BYTES }
    }
}

impl UploadPolicy {
    pub fn validate(&self, upload: DocumentUpload) -> Result<ValidatedDocument, UploadRejection> {
        let size = upload.size();
        if size >= self.max_bytes {
            return Err(UploadRejection::TooLarge {
                file_name: upload.file_name,
                size,
                limit: self.max_bytes,
            });
        }
        if size == 0 {
            return Err(UploadRejection::Empty { file_name: upload.file_name });
        }

        let Some(kind) = detect_kind(&upload.file_name, upload.content_type.as_deref()) else {
            return Err(UploadRejection::UnsupportedType { file_name: upload.file_name });
        };

        Ok(ValidatedDocument { file_name: upload.file_name, kind, bytes: upload.bytes })
    }
}

/// The extension decides when present; the MIME type is only consulted for
/// extension-less names.
fn detect_kind(file_name: &str, content_type: Option<&str>) -> Option<DocumentKind> {
    match Path::new(file_name).extension().and_then(|extension| extension.to_str()) {
        Some(extension) => DocumentKind::from_extension(extension),
        None => content_type.and_then(DocumentKind::from_mime),
    }
}
