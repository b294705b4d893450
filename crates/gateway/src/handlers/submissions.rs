//! Journal submission lifecycle handlers
//!
//! The status endpoint accepts any of the three statuses from any current
//! status; what is restricted is who may call it, via the route-level
//! guards. Derived file URLs all flow through the storage collaborator's
//! single derivation so the permanent URL never reaches a response from the
//! read endpoints.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use crate::handlers::{DataResponse, ListResponse, MessageResponse};
use crate::middleware::OptionalAuth;
use crate::AppState;
use peerview_common::{
    auth::AuthContext,
    db::draft::{split_list, SubmissionDraft},
    db::models::{FileKind, Submission, SubmissionStatus},
    db::StatusCounts,
    errors::{AppError, Result},
    mail::notify_reviewers,
    metrics::{record_status_transition, record_submission, record_upload, record_storage_delete},
    storage::{DeriveOptions, ObjectStore},
};

/// A submission as it appears on the wire
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub id: Uuid,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub journal_name: Option<String>,
    pub impact_factor: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub category: Option<String>,
    pub issn: Option<String>,
    pub publication_date: Option<DateTime<FixedOffset>>,
    pub file_url: String,
    pub file_type: String,
    pub status: String,
    pub open_access: bool,
    pub references: Vec<String>,
    pub citations: i32,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<FixedOffset>>,
    pub review_comments: Option<String>,
    pub submitted_by: Option<Uuid>,
    pub submitted_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl SubmissionView {
    /// Base form carrying the stored permanent URL and no derived variants
    pub fn plain(submission: Submission) -> Self {
        Self {
            id: submission.id,
            title: submission.title,
            authors: submission.authors,
            abstract_text: submission.abstract_text,
            keywords: submission.keywords,
            journal_name: submission.journal_name,
            impact_factor: submission.impact_factor,
            description: submission.description,
            publisher: submission.publisher,
            category: submission.category,
            issn: submission.issn,
            publication_date: submission.publication_date,
            file_url: submission.file_url,
            file_type: submission.file_type,
            status: submission.status,
            open_access: submission.open_access,
            references: submission.references,
            citations: submission.citations,
            reviewed_by: submission.reviewed_by,
            reviewed_at: submission.reviewed_at,
            review_comments: submission.review_comments,
            submitted_by: submission.submitted_by,
            submitted_at: submission.submitted_at,
            updated_at: submission.updated_at,
            preview_url: None,
            download_url: None,
        }
    }

    /// Listing form: page-1 thumbnail for pdfs, permanent URL untouched
    pub fn listing(submission: Submission, store: &dyn ObjectStore) -> Self {
        let preview = submission
            .is_pdf()
            .then(|| store.derive_url(&submission.asset_id, &DeriveOptions::preview(300, 400)));

        let mut view = Self::plain(submission);
        view.preview_url = preview;
        view
    }

    /// Public detail form: a signed time-limited URL replaces the permanent one
    pub fn public(submission: Submission, store: &dyn ObjectStore, expires_at: i64) -> Self {
        let signed = store.derive_url(&submission.asset_id, &DeriveOptions::signed(expires_at));
        let preview = submission
            .is_pdf()
            .then(|| store.derive_url(&submission.asset_id, &DeriveOptions::preview(600, 800)));

        let mut view = Self::plain(submission);
        view.file_url = signed;
        view.preview_url = preview;
        view
    }

    /// Review form: larger preview plus a forced-download signed variant
    pub fn review(submission: Submission, store: &dyn ObjectStore, expires_at: i64) -> Self {
        let signed = store.derive_url(&submission.asset_id, &DeriveOptions::signed(expires_at));
        let download =
            store.derive_url(&submission.asset_id, &DeriveOptions::download(expires_at));
        let preview = submission
            .is_pdf()
            .then(|| store.derive_url(&submission.asset_id, &DeriveOptions::preview(800, 1000)));

        let mut view = Self::plain(submission);
        view.file_url = signed;
        view.download_url = Some(download);
        view.preview_url = preview;
        view
    }
}

/// Extension of the uploaded filename, without the dot
fn file_extension(filename: &str) -> Option<&str> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

/// When the signed URLs being derived right now stop resolving
fn signed_url_expiry(state: &AppState) -> i64 {
    (Utc::now() + chrono::Duration::seconds(state.config.storage.signed_url_ttl_secs as i64))
        .timestamp()
}

fn form_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation {
        messages: vec![format!("Malformed form data: {}", e)],
    }
}

/// Accept a manuscript: multipart metadata plus exactly one file field.
///
/// The extension gate runs before anything touches the provider; the upload
/// happens before the record is written, so a provider failure leaves no
/// partial submission behind. Reviewer notification is spawned after the
/// write and can never fail the request.
pub async fn submit(
    State(state): State<AppState>,
    OptionalAuth(caller): OptionalAuth,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DataResponse<SubmissionView>>)> {
    let mut draft = SubmissionDraft::default();
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "file" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(form_error)?.to_vec();
            file = Some((filename, bytes));
            continue;
        }

        let value = field.text().await.map_err(form_error)?;
        match name.as_str() {
            "title" => draft.title = value,
            "authors" => draft.authors = split_list(&value),
            "abstract" => draft.abstract_text = value,
            "keywords" => draft.keywords = split_list(&value),
            "journalName" => draft.journal_name = non_empty(value),
            "impactFactor" => draft.impact_factor = non_empty(value),
            "description" => draft.description = non_empty(value),
            "publisher" => draft.publisher = non_empty(value),
            "category" => draft.category = non_empty(value),
            "issn" => draft.issn = non_empty(value),
            "publicationDate" => draft.publication_date = value.parse().ok(),
            "openAccess" => draft.open_access = value == "true",
            "references" => draft.references = split_list(&value),
            "citations" => draft.citations = value.parse().unwrap_or(0),
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or_else(|| AppError::InvalidFile {
        message: "No file uploaded".to_string(),
    })?;

    let kind = file_extension(&filename)
        .and_then(FileKind::from_extension)
        .ok_or_else(|| AppError::InvalidFile {
            message: "Invalid file type. Only PDF and Word documents are allowed".to_string(),
        })?;

    // Validate before the upload so a bad draft costs no provider round-trip
    draft.check()?;

    let upload_start = Instant::now();
    let stored = match state.store.upload(bytes, &filename, kind).await {
        Ok(stored) => {
            record_upload(upload_start.elapsed().as_secs_f64(), true);
            stored
        }
        Err(e) => {
            record_upload(upload_start.elapsed().as_secs_f64(), false);
            return Err(e);
        }
    };

    let submitted_by = caller.map(|ctx| ctx.subject);
    let submission = state
        .repo
        .create_submission(&draft, &stored, kind, submitted_by)
        .await?;
    record_submission(kind.as_str());

    tracing::info!(
        submission_id = %submission.id,
        file_type = %kind,
        anonymous = submitted_by.is_none(),
        "Journal submission received"
    );

    // Reviewer notification is decoupled from the response path; its
    // outcome terminates in the dispatcher's log
    let mailer = state.mailer.clone();
    let tokens = state.tokens.clone();
    let config = state.config.clone();
    let submission_id = submission.id;
    tokio::spawn(async move {
        notify_reviewers(
            mailer.as_ref(),
            &tokens,
            &config.auth,
            &config.mail,
            submission_id,
        )
        .await;
    });

    let view = SubmissionView::listing(submission, state.store.as_ref());
    Ok((StatusCode::CREATED, Json(DataResponse::new(view))))
}

/// All submissions, newest first, with listing previews
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<SubmissionView>>> {
    let submissions = state.repo.list_submissions().await?;

    let views = submissions
        .into_iter()
        .map(|submission| SubmissionView::listing(submission, state.store.as_ref()))
        .collect();

    Ok(Json(ListResponse::new(views)))
}

/// Single submission with a signed time-limited file URL
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<SubmissionView>>> {
    let submission = state
        .repo
        .find_submission_by_id(id)
        .await?
        .ok_or(AppError::SubmissionNotFound)?;

    let view = SubmissionView::public(submission, state.store.as_ref(), signed_url_expiry(&state));
    Ok(Json(DataResponse::new(view)))
}

/// Reviewer-facing detail: larger preview and a forced-download URL
pub async fn get_for_review(
    State(state): State<AppState>,
    Extension(_ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataResponse<SubmissionView>>> {
    let submission = state
        .repo
        .find_submission_by_id(id)
        .await?
        .ok_or(AppError::SubmissionNotFound)?;

    let view = SubmissionView::review(submission, state.store.as_ref(), signed_url_expiry(&state));
    Ok(Json(DataResponse::new(view)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub review_comments: Option<String>,
}

/// Record a status transition on behalf of the acting reviewer or admin
pub async fn update_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<DataResponse<SubmissionView>>> {
    let status = SubmissionStatus::parse(&request.status).ok_or_else(|| AppError::Validation {
        messages: vec!["Invalid status value".to_string()],
    })?;

    let submission = state
        .repo
        .update_submission_status(id, status, ctx.subject, request.review_comments)
        .await?
        .ok_or(AppError::SubmissionNotFound)?;
    record_status_transition(status.as_str());

    tracing::info!(
        submission_id = %id,
        status = %status.as_str(),
        reviewed_by = %ctx.subject,
        "Submission status updated"
    );

    Ok(Json(DataResponse::new(SubmissionView::plain(submission))))
}

/// Counts by status, zero-filled on an empty store
pub async fn stats(
    State(state): State<AppState>,
    Extension(_ctx): Extension<AuthContext>,
) -> Result<Json<DataResponse<StatusCounts>>> {
    let counts = state.repo.submission_status_counts().await?;
    Ok(Json(DataResponse::new(counts)))
}

/// Remove a submission and, best-effort, its stored file.
///
/// A provider failure is logged and swallowed; the metadata record goes
/// away regardless. Nothing is asked of the provider when the id has no
/// record.
pub async fn delete_submission(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>> {
    let submission = state
        .repo
        .find_submission_by_id(id)
        .await?
        .ok_or(AppError::SubmissionNotFound)?;

    match state.store.delete(&submission.asset_id).await {
        Ok(()) => record_storage_delete(true),
        Err(e) => {
            record_storage_delete(false);
            tracing::warn!(
                submission_id = %id,
                asset_id = %submission.asset_id,
                error = %e,
                "Failed to delete stored file, continuing"
            );
        }
    }

    state.repo.delete_submission(id).await?;

    tracing::info!(submission_id = %id, deleted_by = %ctx.subject, "Submission deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: "Journal deleted successfully",
    }))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerview_common::{config::AppConfig, storage::MemoryObjectStore};

    fn sample_submission(file_type: &str) -> Submission {
        let now: DateTime<FixedOffset> = Utc::now().into();
        Submission {
            id: Uuid::new_v4(),
            title: "On the Electrodynamics of Moving Bodies".into(),
            authors: vec!["A. Einstein".into()],
            abstract_text: "It is known that Maxwell's electrodynamics, as usually understood \
                            at the present time, leads to asymmetries."
                .into(),
            keywords: vec!["electrodynamics".into()],
            journal_name: None,
            impact_factor: None,
            description: None,
            publisher: None,
            category: None,
            issn: None,
            publication_date: Some(now),
            file_url: "https://files.mediavault.example.com/peerview-dev/raw/journals/asset-1"
                .into(),
            file_type: file_type.into(),
            asset_id: "journals/asset-1".into(),
            status: "pending".into(),
            open_access: true,
            references: Vec::new(),
            citations: 0,
            reviewed_by: None,
            reviewed_at: None,
            review_comments: None,
            submitted_by: None,
            submitted_at: now,
            updated_at: now,
        }
    }

    fn test_store() -> MemoryObjectStore {
        MemoryObjectStore::new(AppConfig::default().storage)
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("paper.pdf"), Some("pdf"));
        assert_eq!(file_extension("paper.final.docx"), Some("docx"));
        assert_eq!(file_extension("paper"), None);
        assert_eq!(file_extension(".pdf"), None);
        assert_eq!(file_extension("paper."), None);
        assert_eq!(file_extension(""), None);
    }

    #[test]
    fn test_extension_gate_rejects_executables() {
        assert!(file_extension("malware.exe")
            .and_then(FileKind::from_extension)
            .is_none());
        assert_eq!(
            file_extension("Paper.PDF").and_then(FileKind::from_extension),
            Some(FileKind::Pdf)
        );
    }

    #[test]
    fn test_public_view_replaces_permanent_url_with_signed() {
        let store = test_store();
        let submission = sample_submission("pdf");
        let permanent = submission.file_url.clone();

        let view = SubmissionView::public(submission, &store, 1_900_000_000);

        assert_ne!(view.file_url, permanent);
        assert!(view.file_url.contains("signature="));
        assert!(view.file_url.contains("expires_at=1900000000"));
        assert!(view.preview_url.as_ref().unwrap().contains("w_600"));
        assert!(view.download_url.is_none());
    }

    #[test]
    fn test_review_view_adds_forced_download_variant() {
        let store = test_store();
        let view = SubmissionView::review(sample_submission("pdf"), &store, 1_900_000_000);

        assert!(view.preview_url.as_ref().unwrap().contains("w_800"));
        let download = view.download_url.unwrap();
        assert!(download.contains("attachment=true"));
        assert!(download.contains("signature="));
        assert_ne!(download, view.file_url);
    }

    #[test]
    fn test_listing_view_keeps_permanent_url_and_previews_pdfs_only() {
        let store = test_store();

        let pdf = SubmissionView::listing(sample_submission("pdf"), &store);
        assert!(pdf.preview_url.as_ref().unwrap().contains("w_300"));
        assert!(!pdf.file_url.contains("signature="));

        let doc = SubmissionView::listing(sample_submission("doc"), &store);
        assert!(doc.preview_url.is_none());
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let store = test_store();
        let view = SubmissionView::public(sample_submission("pdf"), &store, 1_900_000_000);

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("fileUrl").is_some());
        assert!(json.get("abstract").is_some());
        assert!(json.get("openAccess").is_some());
        assert!(json.get("previewUrl").is_some());
        assert!(json.get("file_url").is_none());
        // No download variant on the public form
        assert!(json.get("downloadUrl").is_none());
    }

    #[test]
    fn test_non_empty_trims_optional_fields() {
        assert_eq!(non_empty("  ".into()), None);
        assert_eq!(non_empty(" 1234-5678 ".into()), Some("1234-5678".into()));
    }
}
