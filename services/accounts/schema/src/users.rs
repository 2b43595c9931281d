use sea_orm::entity::prelude::*;

/// Account owned by the accounts service.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string; `None` until the user sets a password.
    pub password_hash: Option<String>,
    pub is_verified: bool,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_auth_otps::Entity")]
    UserAuthOtps,
}

impl Related<super::user_auth_otps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserAuthOtps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
