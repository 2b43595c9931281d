use sea_orm::entity::prelude::*;

/// Signed OTP envelope. The plaintext code is never stored; `id` is the
/// signing salt.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_otps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub envelope: String,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub timeout_secs: i64,
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
