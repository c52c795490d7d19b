//! Input validation helpers for uploads.

use crate::constants::TAG_MAX_LENGTH;
use crate::error::AppError;

/// Reject an upload that declares no content.
pub fn validate_upload_size(size: u64) -> Result<(), AppError> {
    if size == 0 {
        return Err(AppError::ValidationFailed(
            "Upload is empty (declared size is 0 bytes)".to_string(),
        ));
    }
    Ok(())
}

/// Reject tags carrying control characters. Tab and newlines are allowed.
pub fn validate_tag(tag: &str) -> Result<(), AppError> {
    if let Some(c) = tag
        .chars()
        .find(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
    {
        return Err(AppError::ValidationFailed(format!(
            "Tag contains a control character (U+{:04X})",
            c as u32
        )));
    }
    Ok(())
}

/// Truncate a tag to [`TAG_MAX_LENGTH`] bytes without splitting a character.
pub fn truncate_tag(tag: &str) -> String {
    if tag.len() <= TAG_MAX_LENGTH {
        return tag.to_string();
    }
    let mut end = TAG_MAX_LENGTH;
    while !tag.is_char_boundary(end) {
        end -= 1;
    }
    tag[..end].to_string()
}
