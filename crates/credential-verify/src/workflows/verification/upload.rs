use std::path::Path;

use mime::Mime;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// An uploaded certificate as handed over by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    pub bytes: Vec<u8>,
    pub declared_size: u64,
    pub content_type: String,
    pub file_name: String,
}

impl UploadedDocument {
    pub fn new(
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            declared_size: bytes.len() as u64,
            bytes,
            content_type: content_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Largest of the declared and the received size.
    pub fn effective_size(&self) -> u64 {
        self.declared_size.max(self.bytes.len() as u64)
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Accepted document families after policy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Jpeg,
    Png,
}

impl DocumentKind {
    pub fn is_raster(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }

    /// Extension used when the original is filed away.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn canonical_mime(self) -> Mime {
        match self {
            Self::Pdf => mime::APPLICATION_PDF,
            Self::Jpeg => mime::IMAGE_JPEG,
            Self::Png => mime::IMAGE_PNG,
        }
    }

    fn from_mime(value: &Mime) -> Option<Self> {
        let subtype = value.subtype().as_str();
        if value.type_() == mime::APPLICATION && subtype == "pdf" {
            Some(Self::Pdf)
        } else if value.type_() != mime::IMAGE {
            None
        } else {
            match subtype {
                // `image/jpg` is not registered but scanners still send it.
                "jpeg" | "jpg" => Some(Self::Jpeg),
                "png" => Some(Self::Png),
                _ => None,
            }
        }
    }
}

/// The specific reason an upload was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadViolation {
    #[error("file size {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },
    #[error("file is empty")]
    Empty,
    #[error("unsupported file type '{0}'; upload a PDF, JPG, or PNG file")]
    UnsupportedType(String),
    #[error("file '{0}' has no extension")]
    MissingExtension(String),
    #[error("invalid file extension '.{0}'")]
    UnsupportedExtension(String),
    #[error("file extension '.{extension}' does not match content type '{content_type}'")]
    ExtensionMismatch {
        extension: String,
        content_type: String,
    },
}

/// Size, MIME, and extension rules for certificate uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

impl UploadPolicy {
    pub fn new(max_bytes: u64) -> Self {
        let max_bytes = if max_bytes == 0 {
            DEFAULT_MAX_UPLOAD_BYTES
        } else {
            max_bytes
        };
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check `upload` against the policy, returning the document family on success.
    pub fn check(&self, upload: &UploadedDocument) -> Result<DocumentKind, UploadViolation> {
        let size = upload.effective_size();
        if size > self.max_bytes {
            return Err(UploadViolation::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        if upload.bytes.is_empty() {
            return Err(UploadViolation::Empty);
        }

        let declared = upload.content_type.trim();
        let kind = declared
            .parse::<Mime>()
            .ok()
            .as_ref()
            .and_then(DocumentKind::from_mime)
            .ok_or_else(|| UploadViolation::UnsupportedType(declared.to_string()))?;

        let extension = upload
            .extension()
            .ok_or_else(|| UploadViolation::MissingExtension(upload.file_name.clone()))?;

        let guessed = mime_guess::from_ext(&extension);
        let extension_kind = guessed
            .iter()
            .find_map(|candidate| DocumentKind::from_mime(&candidate))
            .ok_or_else(|| UploadViolation::UnsupportedExtension(extension.clone()))?;

        if extension_kind != kind {
            return Err(UploadViolation::ExtensionMismatch {
                extension,
                content_type: declared.to_string(),
            });
        }

        Ok(kind)
    }
}
