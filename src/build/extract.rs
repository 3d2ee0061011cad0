//! Extraction of embedded per-element data layouts.
//!
//! An element module may declare per-cell state with a `struct data { ... }`
//! block. The block is lifted out verbatim so the generated header can
//! publish it under an element-specific name.

use thiserror::Error;

/// Token sequence introducing an element's data layout.
pub const DATA_LAYOUT_MARKER: &str = "struct data {";

/// Error extracting a data layout from an element module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// End of input reached before the opening brace was balanced
    #[error("element '{element}': data layout at byte {offset} is never closed ({depth} unclosed)")]
    Unterminated { element: String, offset: usize, depth: usize },
}

impl ExtractionError {
    /// Name of the offending element.
    pub fn element(&self) -> &str {
        match self {
            ExtractionError::Unterminated { element, .. } => element,
        }
    }
}

/// Extract the data layout declaration of one element.
///
/// Returns `Ok(None)` when the module declares no layout. Otherwise returns
/// the text from the marker through its matching closing brace, unmodified.
/// Only the first marker is honoured.
pub fn extract_data_layout(element: &str, source: &str) -> Result<Option<String>, ExtractionError> {
    let Some(offset) = source.find(DATA_LAYOUT_MARKER) else {
        return Ok(None);
    };

    // The marker ends with the opening brace.
    let body_start = offset + DATA_LAYOUT_MARKER.len();
    let mut depth: usize = 1;

    for (i, byte) in source.as_bytes()[body_start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    let end = body_start + i + 1;
                    return Ok(Some(source[offset..end].to_string()));
                }
            }
            _ => {}
        }
    }

    Err(ExtractionError::Unterminated { element: element.to_string(), offset, depth })
}
