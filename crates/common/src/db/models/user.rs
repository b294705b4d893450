//! User entity

use crate::auth::Role;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// Stored lowercased; uniqueness is case-insensitive
    #[sea_orm(column_type = "Text", unique)]
    pub email: String,

    /// Argon2 PHC string; never serialized
    #[serde(skip_serializing, default)]
    #[sea_orm(column_type = "Text")]
    pub password_hash: String,

    #[sea_orm(column_type = "Text")]
    pub role: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the role as an enum
    pub fn user_role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::User)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = Model {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@lab.edu".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            role: "reviewer".into(),
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_unknown_role_falls_back_to_user() {
        let mut user = Model {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@lab.edu".into(),
            password_hash: String::new(),
            role: "reviewer".into(),
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        };
        assert_eq!(user.user_role(), Role::Reviewer);

        user.role = "superuser".into();
        assert_eq!(user.user_role(), Role::User);
    }
}
