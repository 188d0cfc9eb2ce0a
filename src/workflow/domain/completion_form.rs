//! Multi-step completion form: photos, then signature, then review.

use super::WorkflowDomainError;
use serde::{Deserialize, Serialize};

/// Photo captured as completion evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoCapture {
    /// Original file name.
    pub file_name: String,
    /// MIME type reported by the capture device.
    pub content_type: String,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
}

impl PhotoCapture {
    /// Creates a JPEG capture.
    #[must_use]
    pub fn jpeg(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: "image/jpeg".to_owned(),
            bytes,
        }
    }
}

/// Signature captured on the completion form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureCapture {
    /// Name typed by the signer.
    pub signer_name: String,
    /// Rendered signature image.
    pub image_png: Vec<u8>,
}

/// Requirements of a completion form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionFormSpec {
    /// Minimum number of photos.
    pub min_photos: usize,
    /// Whether a signature must be captured.
    pub require_signature: bool,
    /// Whether dismissal is blocked until submission succeeds.
    pub force_completion: bool,
}

impl CompletionFormSpec {
    /// Validates a draft before submission.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError`] when photos are missing or empty, or a
    /// required signature is absent or incomplete.
    pub fn validate(&self, draft: &CompletionFormDraft) -> Result<(), WorkflowDomainError> {
        if draft.photos.len() < self.min_photos {
            return Err(WorkflowDomainError::InsufficientPhotos {
                required: self.min_photos,
                provided: draft.photos.len(),
            });
        }
        if let Some(empty) = draft.photos.iter().find(|photo| photo.bytes.is_empty()) {
            return Err(WorkflowDomainError::EmptyPhoto(empty.file_name.clone()));
        }
        match &draft.signature {
            None if self.require_signature => Err(WorkflowDomainError::MissingSignature),
            Some(signature)
                if signature.signer_name.trim().is_empty() || signature.image_png.is_empty() =>
            {
                Err(WorkflowDomainError::IncompleteSignature)
            }
            _ => Ok(()),
        }
    }
}

/// Step the completion form is currently on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionFormStep {
    /// Collecting photos.
    Photos,
    /// Collecting the signature.
    Signature,
    /// Everything captured, awaiting submission.
    Review,
}

/// Completion form answers gathered so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionFormDraft {
    photos: Vec<PhotoCapture>,
    signature: Option<SignatureCapture>,
}

impl CompletionFormDraft {
    /// Creates an empty draft.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            photos: Vec::new(),
            signature: None,
        }
    }

    /// Adds a photo.
    #[must_use]
    pub fn with_photo(mut self, photo: PhotoCapture) -> Self {
        self.photos.push(photo);
        self
    }

    /// Sets the signature.
    #[must_use]
    pub fn with_signature(mut self, signature: SignatureCapture) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Removes a photo by position, returning it when present.
    pub fn remove_photo(&mut self, index: usize) -> Option<PhotoCapture> {
        (index < self.photos.len()).then(|| self.photos.remove(index))
    }

    /// Returns captured photos.
    #[must_use]
    pub fn photos(&self) -> &[PhotoCapture] {
        &self.photos
    }

    /// Returns the captured signature.
    #[must_use]
    pub const fn signature(&self) -> Option<&SignatureCapture> {
        self.signature.as_ref()
    }

    /// Returns the step the form should show next under `spec`.
    #[must_use]
    pub fn current_step(&self, spec: &CompletionFormSpec) -> CompletionFormStep {
        if self.photos.len() < spec.min_photos {
            CompletionFormStep::Photos
        } else if spec.require_signature && self.signature.is_none() {
            CompletionFormStep::Signature
        } else {
            CompletionFormStep::Review
        }
    }
}
