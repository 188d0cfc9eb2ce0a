//! Error types for pre-condition workflow validation and session state.

use super::WorkflowSessionState;
use thiserror::Error;

/// Errors returned while validating workflow payloads or moving a session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowDomainError {
    /// A required checklist field is missing or unset.
    #[error("checklist '{checklist}' requires field '{field}'")]
    MissingRequiredField {
        /// Checklist name.
        checklist: String,
        /// Field key.
        field: String,
    },

    /// A submitted key is not part of the checklist.
    #[error("checklist '{checklist}' has no field '{field}'")]
    UnknownField {
        /// Checklist name.
        checklist: String,
        /// Submitted key.
        field: String,
    },

    /// A submitted value has the wrong type.
    #[error("checklist '{checklist}' field '{field}': {reason}")]
    InvalidFieldValue {
        /// Checklist name.
        checklist: String,
        /// Field key.
        field: String,
        /// Reason string.
        reason: String,
    },

    /// The checklist schema declares the same key twice.
    #[error("checklist '{checklist}' declares field '{field}' more than once")]
    DuplicateField {
        /// Checklist name.
        checklist: String,
        /// Field key.
        field: String,
    },

    /// Not enough photos were captured.
    #[error("completion form requires {required} photo(s), {provided} captured")]
    InsufficientPhotos {
        /// Minimum photo count.
        required: usize,
        /// Captured photo count.
        provided: usize,
    },

    /// A captured photo has no content.
    #[error("photo '{0}' is empty")]
    EmptyPhoto(String),

    /// The completion form requires a signature.
    #[error("completion form requires a signature")]
    MissingSignature,

    /// The signature has no signer name or image.
    #[error("signature is incomplete")]
    IncompleteSignature,

    /// The popup requires a note.
    #[error("completion note must not be empty")]
    EmptyNote,

    /// The popup note exceeds the allowed length.
    #[error("completion note exceeds {max_chars} characters")]
    NoteTooLong {
        /// Allowed length.
        max_chars: usize,
    },

    /// The submission does not match the workflow the session opened.
    #[error("submission of kind '{submitted}' does not match workflow '{expected}'")]
    SubmissionMismatch {
        /// Workflow name.
        expected: &'static str,
        /// Submission kind.
        submitted: &'static str,
    },

    /// The session cannot be dismissed before a successful submission.
    #[error("workflow must be completed before it can be dismissed")]
    ForcedCompletion,

    /// A submission is being persisted.
    #[error("workflow submission is already in flight")]
    SubmissionInFlight,

    /// The session already ended.
    #[error("workflow session is {0}")]
    SessionClosed(WorkflowSessionState),
}
