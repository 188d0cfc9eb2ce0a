//! Single-note completion popup.

use super::WorkflowDomainError;
use serde::{Deserialize, Serialize};

/// Configuration of the completion popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionPopupSpec {
    /// Prompt shown above the note field.
    pub prompt: String,
    /// Whether the note must be non-blank.
    pub required: bool,
    /// Maximum note length in characters.
    pub max_chars: usize,
    /// Whether dismissal is blocked until submission succeeds.
    pub force_completion: bool,
}

impl CompletionPopupSpec {
    /// Validates a submitted note, trimming surrounding whitespace.
    ///
    /// Returns `None` for a blank optional note.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyNote`] for a blank required note
    /// and [`WorkflowDomainError::NoteTooLong`] when the limit is exceeded.
    pub fn validate(&self, note: &str) -> Result<Option<CompletionNote>, WorkflowDomainError> {
        let trimmed = note.trim();
        if trimmed.is_empty() {
            return if self.required {
                Err(WorkflowDomainError::EmptyNote)
            } else {
                Ok(None)
            };
        }
        if trimmed.chars().count() > self.max_chars {
            return Err(WorkflowDomainError::NoteTooLong {
                max_chars: self.max_chars,
            });
        }
        Ok(Some(CompletionNote(trimmed.to_owned())))
    }
}

/// Validated completion note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionNote(String);

impl CompletionNote {
    /// Returns the note text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CompletionNote {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
