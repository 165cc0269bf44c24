//! Turning document bytes into page text.

use crate::error::BackendError;
use crate::models::document::Document;

const PAGE_BREAK: char = '\x0c';

/// Extract the text of every page.
///
/// PDF input goes through `pdf-extract`; anything else must be UTF-8 text.
/// Pages are separated by form feeds.
pub fn document_text(document: &Document) -> Result<Vec<String>, BackendError> {
    let bytes = document.bytes();

    let text = if bytes.starts_with(b"%PDF") {
        pdf_text(bytes)?
    } else {
        std::str::from_utf8(bytes)
            .map_err(|e| {
                BackendError::Unreadable(format!("{} is not PDF or UTF-8 text: {e}", document.filename()))
            })?
            .to_string()
    };

    Ok(text.split(PAGE_BREAK).map(str::to_string).collect())
}

#[cfg(feature = "pdf")]
fn pdf_text(bytes: &[u8]) -> Result<String, BackendError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| BackendError::Unreadable(e.to_string()))
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(_bytes: &[u8]) -> Result<String, BackendError> {
    Err(BackendError::Unreadable(
        "PDF support is not enabled in this build".to_string(),
    ))
}
