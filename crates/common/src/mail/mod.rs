//! Reviewer notification dispatch
//!
//! Sending is a side effect of submission, never part of its outcome: the
//! caller spawns `notify_reviewers` after the record is written and the
//! result terminates here, in the log.

use crate::auth::{Role, TokenManager};
use crate::config::{AuthConfig, MailConfig};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Subject line for reviewer invitations
pub const REVIEW_INVITATION_SUBJECT: &str = "New Journal Submission for Review";

/// Narrow interface over the mail provider
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &[String], subject: &str, html: &str) -> Result<()>;
}

/// JSON API mail client
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailConfig,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
}

impl HttpMailer {
    /// Create a client with the configured send timeout
    pub fn new(config: MailConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to build mail client: {}", e),
            })?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl MailSender for HttpMailer {
    async fn send(&self, to: &[String], subject: &str, html: &str) -> Result<()> {
        let url = format!("{}/messages", self.config.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&SendRequest {
                from: &self.config.from_address,
                to,
                subject,
                html,
            })
            .send()
            .await
            .map_err(|e| AppError::Mail {
                message: format!("Send request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Mail {
                message: format!("Provider error {}: {}", status, body),
            });
        }

        Ok(())
    }
}

/// Compose the reviewer-facing invitation body
fn review_invitation_html(review_link: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #2c3e50;">New Journal Submission for Review</h2>
  <p>A new journal has been submitted and requires your review.</p>
  <p>Please click the link below to review the submission:</p>
  <a href="{review_link}" style="display: inline-block; padding: 10px 20px; background-color: #3498db; color: white; text-decoration: none; border-radius: 5px; margin: 15px 0;">Review Journal</a>
  <p>If you didn't request this, please ignore this email.</p>
  <hr style="border: none; border-top: 1px solid #eee; margin: 20px 0;">
  <p style="font-size: 12px; color: #777;">This link will expire in 7 days. For security reasons, please do not share this link.</p>
</div>"#
    )
}

/// Invite the configured reviewers to review a submission.
///
/// Issues a time-boxed capability token scoped to the submission id and
/// sends one message to the whole whitelist. Failures are logged and
/// reported as `false`, never raised.
pub async fn notify_reviewers(
    mailer: &dyn MailSender,
    tokens: &TokenManager,
    auth: &AuthConfig,
    mail: &MailConfig,
    submission_id: Uuid,
) -> bool {
    let recipients: Vec<String> = auth
        .reviewer_emails
        .iter()
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
        .collect();

    if recipients.is_empty() {
        tracing::warn!(
            submission_id = %submission_id,
            "No reviewer addresses configured, skipping invitation"
        );
        return false;
    }

    let token = match tokens.issue_with_ttl(submission_id, Role::Reviewer, auth.invitation_ttl_secs)
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(
                submission_id = %submission_id,
                error = %e,
                "Failed to issue invitation token"
            );
            return false;
        }
    };

    let review_link = format!(
        "{}/review/{}?token={}",
        mail.review_base_url, submission_id, token
    );
    let html = review_invitation_html(&review_link);

    match mailer
        .send(&recipients, REVIEW_INVITATION_SUBJECT, &html)
        .await
    {
        Ok(()) => {
            tracing::info!(
                submission_id = %submission_id,
                recipients = recipients.len(),
                "Review invitation sent"
            );
            crate::metrics::record_notification(true);
            true
        }
        Err(e) => {
            tracing::warn!(
                submission_id = %submission_id,
                error = %e,
                "Failed to send review invitation"
            );
            crate::metrics::record_notification(false);
            false
        }
    }
}

/// Recording mailer for tests
pub struct RecordingMailer {
    fail: bool,
    sent: Mutex<Vec<SentMessage>>,
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A mailer whose every send fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for RecordingMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(&self, to: &[String], subject: &str, html: &str) -> Result<()> {
        if self.fail {
            return Err(AppError::Mail {
                message: "Simulated provider outage".to_string(),
            });
        }

        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_vec(),
            subject: subject.to_string(),
            html: html.to_string(),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn test_configs() -> (AuthConfig, MailConfig) {
        let defaults = AppConfig::default();
        let mut auth = defaults.auth;
        auth.reviewer_emails = vec!["rev1@lab.edu".into(), " rev2@lab.edu ".into()];
        (auth, defaults.mail)
    }

    #[tokio::test]
    async fn test_notify_reviewers_sends_capability_link() {
        let (auth, mail) = test_configs();
        let mailer = RecordingMailer::new();
        let tokens = TokenManager::new("test_secret", 3600);
        let submission_id = Uuid::new_v4();

        assert!(notify_reviewers(&mailer, &tokens, &auth, &mail, submission_id).await);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["rev1@lab.edu", "rev2@lab.edu"]);
        assert_eq!(sent[0].subject, REVIEW_INVITATION_SUBJECT);

        let link_needle = format!("{}/review/{}?token=", mail.review_base_url, submission_id);
        assert!(sent[0].html.contains(&link_needle));

        // The embedded token is a reviewer capability scoped to the submission
        let token_start = sent[0].html.find("?token=").unwrap() + "?token=".len();
        let token: String = sent[0].html[token_start..]
            .chars()
            .take_while(|c| *c != '"')
            .collect();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.role, Role::Reviewer);
        assert_eq!(claims.subject_id().unwrap(), submission_id);
    }

    #[tokio::test]
    async fn test_notify_reviewers_swallows_send_failure() {
        let (auth, mail) = test_configs();
        let mailer = RecordingMailer::failing();
        let tokens = TokenManager::new("test_secret", 3600);

        assert!(!notify_reviewers(&mailer, &tokens, &auth, &mail, Uuid::new_v4()).await);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_notify_reviewers_skips_empty_whitelist() {
        let (mut auth, mail) = test_configs();
        auth.reviewer_emails = vec!["   ".into()];
        let mailer = RecordingMailer::new();
        let tokens = TokenManager::new("test_secret", 3600);

        assert!(!notify_reviewers(&mailer, &tokens, &auth, &mail, Uuid::new_v4()).await);
        assert!(mailer.sent().is_empty());
    }
}
