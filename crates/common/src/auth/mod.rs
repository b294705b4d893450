//! Authentication and authorization utilities
//!
//! Provides:
//! - JWT token generation and validation (login sessions and scoped
//!   reviewer-invitation capability tokens share one key and encoding)
//! - Whitelist-based role assignment at registration
//! - Password hashing
//! - The verified identity context attached to requests

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Roles a credential can carry.
///
/// Assigned from the registration whitelist, never from client input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Reviewer,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Reviewer => "reviewer",
            Role::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "reviewer" => Some(Role::Reviewer),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims structure
///
/// `sub` is a user id for login tokens and a submission id for
/// reviewer-invitation capability tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject
    pub sub: String,

    /// Role granted by this credential
    pub role: Role,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    /// Parse the subject as a UUID
    pub fn subject_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)
    }
}

/// Issues and verifies signed, time-bound credentials
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl TokenManager {
    /// Create a new token manager with the given secret and default TTL
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs: ttl_secs as i64,
        }
    }

    /// Issue a credential with the default TTL
    pub fn issue(&self, subject: Uuid, role: Role) -> Result<String> {
        self.issue_for(subject, role, self.ttl_secs)
    }

    /// Issue a credential with an explicit TTL, e.g. the 7-day
    /// reviewer-invitation token scoped to a submission id
    pub fn issue_with_ttl(&self, subject: Uuid, role: Role, ttl_secs: u64) -> Result<String> {
        self.issue_for(subject, role, ttl_secs as i64)
    }

    fn issue_for(&self, subject: Uuid, role: Role, ttl_secs: i64) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(ttl_secs);

        let claims = Claims {
            sub: subject.to_string(),
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a credential
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }
}

/// Assign a role for a registration attempt.
///
/// Case-insensitive, trimmed match against the configured admin address and
/// the reviewer whitelist. Registration is closed-world: any other address
/// is rejected.
pub fn assign_role(email: &str, config: &AuthConfig) -> Result<Role> {
    let candidate = email.trim().to_lowercase();

    if candidate == config.admin_email.trim().to_lowercase() {
        return Ok(Role::Admin);
    }

    if config
        .reviewer_emails
        .iter()
        .any(|allowed| allowed.trim().to_lowercase() == candidate)
    {
        return Ok(Role::Reviewer);
    }

    Err(AppError::Forbidden {
        message: "Access Denied. Only invited reviewers and administrators can register."
            .to_string(),
    })
}

/// Hash a password for storage (argon2id, random salt)
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Extract a bearer credential from request headers.
///
/// Accepts the dedicated token header, falling back to a standard
/// "Bearer "-prefixed authorization header.
pub fn extract_token<'h>(headers: &'h HeaderMap, token_header: &str) -> Option<&'h str> {
    if let Some(value) = headers.get(token_header).and_then(|v| v.to_str().ok()) {
        if !value.is_empty() {
            return Some(value);
        }
    }

    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Verified identity and role attached to a request after authorization
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Token subject (a user id for login tokens)
    pub subject: Uuid,

    /// Verified role
    pub role: Role,
}

impl AuthContext {
    /// Require membership in `allowed`; an empty slice means any
    /// authenticated caller passes
    pub fn require_any(&self, allowed: &[Role]) -> Result<()> {
        if allowed.is_empty() || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: "Not authorized to access this route".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn whitelist_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test_secret".into(),
            token_ttl_secs: 3600,
            invitation_ttl_secs: 604_800,
            admin_email: "Editor@Journal.org".into(),
            reviewer_emails: vec!["rev1@lab.edu ".into(), "REV2@lab.edu".into()],
            token_header: "x-auth-token".into(),
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let manager = TokenManager::new("test_secret", 3600);

        let user_id = Uuid::new_v4();
        let token = manager.issue(user_id, Role::Reviewer).unwrap();
        let claims = manager.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, Role::Reviewer);
        assert_eq!(claims.subject_id().unwrap(), user_id);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let manager = TokenManager::new("test_secret", 3600);

        // Encode claims that expired well past the validation leeway
        let past = Utc::now() - Duration::hours(2);
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: Role::Admin,
            exp: past.timestamp(),
            iat: (past - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test_secret"),
        )
        .unwrap();

        match manager.verify(&token) {
            Err(AppError::ExpiredToken) => {}
            other => panic!("expected ExpiredToken, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let issuer = TokenManager::new("secret_a", 3600);
        let verifier = TokenManager::new("secret_b", 3600);

        let token = issuer.issue(Uuid::new_v4(), Role::Admin).unwrap();
        match verifier.verify(&token) {
            Err(AppError::InvalidToken) => {}
            other => panic!("expected InvalidToken, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn test_invitation_token_is_scoped_to_submission() {
        let manager = TokenManager::new("test_secret", 3600);
        let submission_id = Uuid::new_v4();

        let token = manager
            .issue_with_ttl(submission_id, Role::Reviewer, 604_800)
            .unwrap();
        let claims = manager.verify(&token).unwrap();

        assert_eq!(claims.subject_id().unwrap(), submission_id);
        assert_eq!(claims.role, Role::Reviewer);
        assert!(claims.exp - claims.iat >= 604_000);
    }

    #[test]
    fn test_assign_role_admin_case_insensitive() {
        let config = whitelist_config();
        assert_eq!(assign_role("editor@journal.org", &config).unwrap(), Role::Admin);
        assert_eq!(assign_role("  EDITOR@JOURNAL.ORG  ", &config).unwrap(), Role::Admin);
    }

    #[test]
    fn test_assign_role_reviewer_whitelist() {
        let config = whitelist_config();
        assert_eq!(assign_role("rev1@lab.edu", &config).unwrap(), Role::Reviewer);
        assert_eq!(assign_role("rev2@LAB.edu", &config).unwrap(), Role::Reviewer);
    }

    #[test]
    fn test_assign_role_rejects_unlisted_email() {
        let config = whitelist_config();
        match assign_role("stranger@example.com", &config) {
            Err(AppError::Forbidden { .. }) => {}
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }

    #[test]
    fn test_assign_role_is_deterministic() {
        let config = whitelist_config();
        let first = assign_role("rev1@lab.edu", &config).unwrap();
        let second = assign_role("rev1@lab.edu", &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
        assert!(!verify_password("anything", "not a phc string"));
    }

    #[test]
    fn test_extract_token_prefers_dedicated_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-auth-token", HeaderValue::from_static("tok_dedicated"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer tok_bearer"),
        );
        assert_eq!(extract_token(&headers, "x-auth-token"), Some("tok_dedicated"));
    }

    #[test]
    fn test_extract_token_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer tok_bearer"),
        );
        assert_eq!(extract_token(&headers, "x-auth-token"), Some("tok_bearer"));

        let mut basic = HeaderMap::new();
        basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token(&basic, "x-auth-token"), None);

        assert_eq!(extract_token(&HeaderMap::new(), "x-auth-token"), None);
    }

    #[test]
    fn test_require_any() {
        let ctx = AuthContext {
            subject: Uuid::new_v4(),
            role: Role::Reviewer,
        };

        assert!(ctx.require_any(&[]).is_ok());
        assert!(ctx.require_any(&[Role::Reviewer, Role::Admin]).is_ok());
        match ctx.require_any(&[Role::Admin]) {
            Err(AppError::Forbidden { .. }) => {}
            other => panic!("expected Forbidden, got {:?}", other),
        }
    }
}
