//! Upload validation
//!
//! Front ends run [`FileValidator::validate`] before handing content to the workflow engine,
//! so rejected files never reach the object store.

use crate::keys::dotted_extension;

/// Pre-upload constraint violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File extension '{0}' is not allowed.")]
    ExtensionNotAllowed(String),

    #[error("Content type '{0}' is not allowed.")]
    ContentTypeNotAllowed(String),

    #[error("Empty files are not allowed.")]
    EmptyFile,

    #[error("File size ({size} bytes) exceeds the maximum allowed size ({max} bytes).")]
    FileTooLarge { size: u64, max: u64 },
}

/// Upload validator
///
/// Empty allow-lists accept everything; a missing ceiling accepts any non-empty size.
#[derive(Debug, Clone, Default)]
pub struct FileValidator {
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
    max_file_size: Option<u64>,
}

impl FileValidator {
    pub fn new(
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
        max_file_size: Option<u64>,
    ) -> Self {
        // Normalize to ".ext" so the list accepts both "png" and ".png".
        let allowed_extensions = allowed_extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.trim().to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{}", ext)
                }
            })
            .collect();

        Self {
            allowed_extensions,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.trim().to_lowercase())
                .collect(),
            max_file_size,
        }
    }

    pub fn validate_extension(&self, file_name: &str) -> Result<(), ValidationError> {
        if self.allowed_extensions.is_empty() {
            return Ok(());
        }

        let extension = dotted_extension(file_name);
        if extension.is_empty() || !self.allowed_extensions.contains(&extension.to_lowercase()) {
            return Err(ValidationError::ExtensionNotAllowed(extension.to_string()));
        }

        Ok(())
    }

    pub fn validate_content_type(&self, content_type: Option<&str>) -> Result<(), ValidationError> {
        if self.allowed_content_types.is_empty() {
            return Ok(());
        }

        match content_type.map(str::trim).filter(|ct| !ct.is_empty()) {
            Some(ct) if self.allowed_content_types.contains(&ct.to_lowercase()) => Ok(()),
            other => Err(ValidationError::ContentTypeNotAllowed(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn validate_size(&self, length: u64) -> Result<(), ValidationError> {
        if length == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if let Some(max) = self.max_file_size {
            if length > max {
                return Err(ValidationError::FileTooLarge { size: length, max });
            }
        }

        Ok(())
    }

    /// Extension, then content type, then size.
    pub fn validate(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        length: u64,
    ) -> Result<(), ValidationError> {
        self.validate_extension(file_name)?;
        self.validate_content_type(content_type)?;
        self.validate_size(length)
    }
}
