//! Journal submission entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a submission.
///
/// The status endpoint accepts any of the three values from any source
/// status, so there is no transition table here, only the closed enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    /// Strict parse; anything outside the three-value enum is rejected
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubmissionStatus::Pending),
            "approved" => Some(SubmissionStatus::Approved),
            "rejected" => Some(SubmissionStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

impl From<SubmissionStatus> for String {
    fn from(status: SubmissionStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Accepted manuscript file types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Doc,
    Docx,
}

impl FileKind {
    /// Match a file extension (without the dot) against the allowed set
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileKind::Pdf),
            "doc" => Some(FileKind::Doc),
            "docx" => Some(FileKind::Docx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Doc => "doc",
            FileKind::Docx => "docx",
        }
    }

    /// Content type sent to the storage provider on upload
    pub fn mime_type(&self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Doc => "application/msword",
            FileKind::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<FileKind> for String {
    fn from(kind: FileKind) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    pub authors: Vec<String>,

    #[sea_orm(column_type = "Text")]
    pub abstract_text: String,

    pub keywords: Vec<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub journal_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub impact_factor: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub publisher: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub category: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub issn: Option<String>,

    pub publication_date: Option<DateTimeWithTimeZone>,

    /// Permanent provider URL; read endpoints replace this with a signed
    /// time-limited URL before it leaves the API
    #[sea_orm(column_type = "Text")]
    pub file_url: String,

    #[sea_orm(column_type = "Text")]
    pub file_type: String,

    /// Provider content identifier used to re-derive access URLs
    #[sea_orm(column_type = "Text")]
    pub asset_id: String,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub open_access: bool,

    pub references: Vec<String>,

    pub citations: i32,

    /// Weak reference to the reviewing user
    pub reviewed_by: Option<Uuid>,

    pub reviewed_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub review_comments: Option<String>,

    /// Weak reference to the submitting user; null for anonymous submissions
    pub submitted_by: Option<Uuid>,

    pub submitted_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the lifecycle status as an enum
    pub fn submission_status(&self) -> SubmissionStatus {
        SubmissionStatus::parse(&self.status).unwrap_or(SubmissionStatus::Pending)
    }

    /// Whether the stored file is a PDF (the only kind with derived previews)
    pub fn is_pdf(&self) -> bool {
        self.file_type == "pdf"
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_strict() {
        assert_eq!(SubmissionStatus::parse("pending"), Some(SubmissionStatus::Pending));
        assert_eq!(SubmissionStatus::parse("approved"), Some(SubmissionStatus::Approved));
        assert_eq!(SubmissionStatus::parse("rejected"), Some(SubmissionStatus::Rejected));

        assert_eq!(SubmissionStatus::parse("archived"), None);
        assert_eq!(SubmissionStatus::parse("Pending"), None);
        assert_eq!(SubmissionStatus::parse(""), None);
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::Approved,
            SubmissionStatus::Rejected,
        ] {
            assert_eq!(SubmissionStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_file_kind_from_extension() {
        assert_eq!(FileKind::from_extension("pdf"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_extension("PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_extension("doc"), Some(FileKind::Doc));
        assert_eq!(FileKind::from_extension("docx"), Some(FileKind::Docx));

        assert_eq!(FileKind::from_extension("exe"), None);
        assert_eq!(FileKind::from_extension("pdf.exe"), None);
        assert_eq!(FileKind::from_extension(""), None);
    }
}
