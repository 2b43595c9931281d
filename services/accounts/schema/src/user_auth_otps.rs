use sea_orm::entity::prelude::*;

/// Binds the live OTP for one (user, reason) pair. Unique on `(reason, user_id)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_auth_otps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub otp_id: Uuid,
    /// `OtpReason` storage name, e.g. `FORGOT_PASSWORD`.
    pub reason: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::auth_otps::Entity",
        from = "Column::OtpId",
        to = "super::auth_otps::Column::Id"
    )]
    AuthOtp,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::auth_otps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AuthOtp.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
