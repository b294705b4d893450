//! Submission draft validation
//!
//! The draft is the explicit structure request bodies are parsed into
//! before anything touches the database. Field invariants are enforced
//! here, at write time, and every failing field contributes a message to
//! the aggregated validation error.

use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

/// A submission as received from the client, before persistence
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SubmissionDraft {
    #[validate(custom(function = "validate_title"))]
    pub title: String,

    #[validate(length(min = 1, message = "Please provide at least one author"))]
    pub authors: Vec<String>,

    #[validate(length(min = 50, message = "Abstract must be at least 50 characters"))]
    pub abstract_text: String,

    #[validate(length(min = 1, message = "Please provide at least one keyword"))]
    pub keywords: Vec<String>,

    pub journal_name: Option<String>,

    pub impact_factor: Option<String>,

    pub description: Option<String>,

    pub publisher: Option<String>,

    pub category: Option<String>,

    pub issn: Option<String>,

    /// Defaults to the submission time when absent
    pub publication_date: Option<DateTime<Utc>>,

    pub open_access: bool,

    pub references: Vec<String>,

    pub citations: i32,
}

impl SubmissionDraft {
    /// Validate the draft, aggregating all field-level messages
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|errors| AppError::Validation {
            messages: validation_messages(&errors),
        })
    }
}

fn validate_title(title: &str) -> std::result::Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(title_error("Please provide a title"));
    }
    if title.chars().count() > 200 {
        return Err(title_error("Title cannot be more than 200 characters"));
    }
    Ok(())
}

fn title_error(message: &'static str) -> ValidationError {
    let mut error = ValidationError::new("title");
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Flatten a `ValidationErrors` tree into its messages, sorted so the
/// aggregate is deterministic regardless of field iteration order
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field))
            })
        })
        .collect();
    messages.sort();
    messages
}

/// Split a comma-separated form field into trimmed, non-empty entries
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_draft() -> SubmissionDraft {
        SubmissionDraft {
            title: "On the Electrodynamics of Moving Bodies".into(),
            authors: vec!["A. Einstein".into()],
            abstract_text: "It is known that Maxwell's electrodynamics, as usually understood \
                            at the present time, leads to asymmetries."
                .into(),
            keywords: vec!["electrodynamics".into(), "relativity".into()],
            open_access: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(valid_draft().check().is_ok());
    }

    #[test]
    fn test_missing_fields_are_aggregated() {
        let draft = SubmissionDraft {
            title: String::new(),
            authors: Vec::new(),
            abstract_text: "too short".into(),
            keywords: Vec::new(),
            ..Default::default()
        };

        match draft.check() {
            Err(AppError::Validation { messages }) => {
                assert_eq!(
                    messages,
                    vec![
                        "Abstract must be at least 50 characters".to_string(),
                        "Please provide a title".to_string(),
                        "Please provide at least one author".to_string(),
                        "Please provide at least one keyword".to_string(),
                    ]
                );
            }
            other => panic!("expected aggregated validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_overlong_title_is_rejected() {
        let mut draft = valid_draft();
        draft.title = "x".repeat(201);

        match draft.check() {
            Err(AppError::Validation { messages }) => {
                assert_eq!(messages, vec!["Title cannot be more than 200 characters"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_split_list_trims_and_drops_empties() {
        assert_eq!(
            split_list("alpha, beta ,,  gamma"),
            vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()]
        );
        assert!(split_list("  ,  ").is_empty());
        assert!(split_list("").is_empty());
    }
}
