//! Repository pattern for database operations
//!
//! One facade over the pool for all user and submission access. Schema
//! invariants are enforced here, at write time; handlers never touch the
//! entities directly.

use crate::auth::Role;
use crate::db::draft::SubmissionDraft;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::Result;
use crate::storage::StoredObject;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, Set, Statement,
};
use serde::Serialize;
use uuid::Uuid;

/// Submission counts aggregated by lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user. The email is stored lowercased so uniqueness is
    /// case-insensitive.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User> {
        let now = chrono::Utc::now();

        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            email: Set(email.trim().to_lowercase()),
            password_hash: Set(password_hash.to_string()),
            role: Set(role.as_str().to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        user.insert(self.conn()).await.map_err(Into::into)
    }

    /// Find a user by email, matching case-insensitively
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email.trim().to_lowercase()))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Find a user by ID
    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// All users holding the reviewer role
    pub async fn list_reviewers(&self) -> Result<Vec<User>> {
        UserEntity::find()
            .filter(UserColumn::Role.eq(Role::Reviewer.as_str()))
            .order_by_asc(UserColumn::Name)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Submission Operations
    // ========================================================================

    /// Validate and persist a new submission with status `pending`.
    ///
    /// The draft is checked first; every failing field contributes to the
    /// aggregated validation error and nothing is written on failure.
    pub async fn create_submission(
        &self,
        draft: &SubmissionDraft,
        stored: &StoredObject,
        file_type: FileKind,
        submitted_by: Option<Uuid>,
    ) -> Result<Submission> {
        draft.check()?;

        let now = chrono::Utc::now();

        let submission = SubmissionActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(draft.title.trim().to_string()),
            authors: Set(draft.authors.clone()),
            abstract_text: Set(draft.abstract_text.clone()),
            keywords: Set(draft.keywords.clone()),
            journal_name: Set(draft.journal_name.clone()),
            impact_factor: Set(draft.impact_factor.clone()),
            description: Set(draft.description.clone()),
            publisher: Set(draft.publisher.clone()),
            category: Set(draft.category.clone()),
            issn: Set(draft.issn.clone()),
            publication_date: Set(Some(draft.publication_date.unwrap_or(now).into())),
            file_url: Set(stored.url.clone()),
            file_type: Set(file_type.as_str().to_string()),
            asset_id: Set(stored.asset_id.clone()),
            status: Set(SubmissionStatus::Pending.as_str().to_string()),
            open_access: Set(draft.open_access),
            references: Set(draft.references.clone()),
            citations: Set(draft.citations),
            reviewed_by: Set(None),
            reviewed_at: Set(None),
            review_comments: Set(None),
            submitted_by: Set(submitted_by),
            submitted_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        submission.insert(self.conn()).await.map_err(Into::into)
    }

    /// Find a submission by ID
    pub async fn find_submission_by_id(&self, id: Uuid) -> Result<Option<Submission>> {
        SubmissionEntity::find_by_id(id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// All submissions, newest first
    pub async fn list_submissions(&self) -> Result<Vec<Submission>> {
        SubmissionEntity::find()
            .order_by_desc(SubmissionColumn::SubmittedAt)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Record a status transition.
    ///
    /// Any of the three statuses is accepted from any current status. The
    /// reviewer identity and timestamp are recorded alongside and
    /// `updated_at` is refreshed. Returns `None` when the id has no record.
    pub async fn update_submission_status(
        &self,
        id: Uuid,
        status: SubmissionStatus,
        reviewed_by: Uuid,
        comments: Option<String>,
    ) -> Result<Option<Submission>> {
        let Some(existing) = SubmissionEntity::find_by_id(id).one(self.conn()).await? else {
            return Ok(None);
        };

        let now = chrono::Utc::now();

        let mut submission: SubmissionActiveModel = existing.into();
        submission.status = Set(status.as_str().to_string());
        submission.reviewed_by = Set(Some(reviewed_by));
        submission.reviewed_at = Set(Some(now.into()));
        submission.review_comments = Set(comments);
        submission.updated_at = Set(now.into());

        submission
            .update(self.conn())
            .await
            .map(Some)
            .map_err(Into::into)
    }

    /// Delete a submission record; returns `false` when the id has no record
    pub async fn delete_submission(&self, id: Uuid) -> Result<bool> {
        let result = SubmissionEntity::delete_by_id(id).exec(self.conn()).await?;
        Ok(result.rows_affected > 0)
    }

    /// Counts by status, zero-filled when the table is empty
    pub async fn submission_status_counts(&self) -> Result<StatusCounts> {
        let stmt = Statement::from_string(
            DbBackend::Postgres,
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'approved') AS approved,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected
            FROM submissions
            "#,
        );

        match self.conn().query_one(stmt).await? {
            Some(row) => Ok(StatusCounts {
                total: row.try_get_by_index::<i64>(0)?,
                pending: row.try_get_by_index::<i64>(1)?,
                approved: row.try_get_by_index::<i64>(2)?,
                rejected: row.try_get_by_index::<i64>(3)?,
            }),
            None => Ok(StatusCounts::default()),
        }
    }
}
