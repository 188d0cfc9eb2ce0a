//! Checklist schemas and submitted answers.

use super::WorkflowDomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Answers keyed by checklist field key.
pub type ChecklistValues = BTreeMap<String, Value>;

/// Type of a single checklist answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistFieldType {
    /// Yes/no tick box. Required boxes must be ticked.
    Boolean,
    /// Free text. Required text must not be blank.
    Text,
}

/// One question on a checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistField {
    /// Stable answer key.
    pub key: String,
    /// Label shown to the dispatcher.
    pub label: String,
    /// Answer type.
    pub field_type: ChecklistFieldType,
    /// Whether an answer must be given.
    pub required: bool,
}

impl ChecklistField {
    /// Creates a required tick box.
    #[must_use]
    pub fn checkbox(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type: ChecklistFieldType::Boolean,
            required: true,
        }
    }

    /// Creates a text field.
    #[must_use]
    pub fn text(key: impl Into<String>, label: impl Into<String>, required: bool) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type: ChecklistFieldType::Text,
            required,
        }
    }
}

/// Named set of checklist questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistSchema {
    name: String,
    fields: Vec<ChecklistField>,
    force_completion: bool,
    skippable_with_evidence: bool,
}

impl ChecklistSchema {
    /// Creates an empty, dismissible checklist.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            force_completion: false,
            skippable_with_evidence: false,
        }
    }

    /// Appends a field.
    #[must_use]
    pub fn with_field(mut self, field: ChecklistField) -> Self {
        self.fields.push(field);
        self
    }

    /// Prevents dismissal until the checklist has been submitted.
    #[must_use]
    pub const fn forced(mut self) -> Self {
        self.force_completion = true;
        self
    }

    /// Lets the checklist be skipped when evidence from a prior attempt
    /// already exists.
    #[must_use]
    pub const fn skippable_with_evidence(mut self) -> Self {
        self.skippable_with_evidence = true;
        self
    }

    /// Returns the checklist name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the checklist fields in display order.
    #[must_use]
    pub fn fields(&self) -> &[ChecklistField] {
        &self.fields
    }

    /// Returns whether dismissal is blocked.
    #[must_use]
    pub const fn force_completion(&self) -> bool {
        self.force_completion
    }

    /// Returns whether prior evidence skips the checklist.
    #[must_use]
    pub const fn is_skippable_with_evidence(&self) -> bool {
        self.skippable_with_evidence
    }

    /// Validates submitted answers against the schema.
    ///
    /// Optional fields that were not answered are recorded as `null`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError`] when a key is unknown, a value has the
    /// wrong type, or a required field is unanswered.
    pub fn validate(&self, values: &ChecklistValues) -> Result<ValidatedChecklist, WorkflowDomainError> {
        self.ensure_unique_keys()?;
        let known: BTreeSet<&str> = self.fields.iter().map(|field| field.key.as_str()).collect();
        if let Some(unknown) = values.keys().find(|key| !known.contains(key.as_str())) {
            return Err(WorkflowDomainError::UnknownField {
                checklist: self.name.clone(),
                field: unknown.clone(),
            });
        }

        let mut answers = BTreeMap::new();
        for field in &self.fields {
            let value = values.get(&field.key).cloned().unwrap_or(Value::Null);
            let answer = self.validate_field(field, &value)?;
            answers.insert(field.key.clone(), answer);
        }

        Ok(ValidatedChecklist {
            checklist: self.name.clone(),
            answers,
        })
    }

    fn validate_field(&self, field: &ChecklistField, value: &Value) -> Result<Value, WorkflowDomainError> {
        let missing = || WorkflowDomainError::MissingRequiredField {
            checklist: self.name.clone(),
            field: field.key.clone(),
        };
        let invalid = |reason: &str| WorkflowDomainError::InvalidFieldValue {
            checklist: self.name.clone(),
            field: field.key.clone(),
            reason: reason.to_owned(),
        };

        match (field.field_type, value) {
            (_, Value::Null) if field.required => Err(missing()),
            (_, Value::Null) => Ok(Value::Null),
            (ChecklistFieldType::Boolean, Value::Bool(false)) if field.required => Err(missing()),
            (ChecklistFieldType::Boolean, Value::Bool(ticked)) => Ok(Value::Bool(*ticked)),
            (ChecklistFieldType::Boolean, _) => Err(invalid("expected a boolean")),
            (ChecklistFieldType::Text, Value::String(text)) => {
                let trimmed = text.trim();
                if trimmed.is_empty() && field.required {
                    return Err(missing());
                }
                Ok(Value::String(trimmed.to_owned()))
            }
            (ChecklistFieldType::Text, _) => Err(invalid("expected text")),
        }
    }

    fn ensure_unique_keys(&self) -> Result<(), WorkflowDomainError> {
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.key.as_str()) {
                return Err(WorkflowDomainError::DuplicateField {
                    checklist: self.name.clone(),
                    field: field.key.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Checklist answers that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedChecklist {
    checklist: String,
    answers: BTreeMap<String, Value>,
}

impl ValidatedChecklist {
    /// Returns the checklist name.
    #[must_use]
    pub fn checklist(&self) -> &str {
        &self.checklist
    }

    /// Returns every answer, including `null` for skipped optional fields.
    #[must_use]
    pub const fn answers(&self) -> &BTreeMap<String, Value> {
        &self.answers
    }
}
