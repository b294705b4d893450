//! Out-of-band administrator bootstrap.
//!
//! Registration is closed-world, so on a fresh deployment this is the only
//! way the configured admin account comes into being. Idempotent: running
//! it again against an existing account is a no-op.

use peerview_common::{
    auth::{hash_password, Role},
    config::AppConfig,
    db::{DbPool, Repository},
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load()?;
    let admin_email = config.auth.admin_email.trim().to_lowercase();

    let password = std::env::var("ADMIN_PASSWORD")
        .map_err(|_| anyhow::anyhow!("ADMIN_PASSWORD must be set"))?;

    let db = DbPool::new(&config.database).await?;
    let repo = Repository::new(db);

    if let Some(existing) = repo.find_user_by_email(&admin_email).await? {
        info!(email = %existing.email, "Admin already exists, nothing to do");
        return Ok(());
    }

    let password_hash = hash_password(&password)?;
    let admin = repo
        .create_user("System Admin", &admin_email, &password_hash, Role::Admin)
        .await?;

    info!(user_id = %admin.id, email = %admin.email, "Admin user created");
    Ok(())
}
