use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserAuthOtps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserAuthOtps::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserAuthOtps::UserId).uuid().not_null())
                    .col(ColumnDef::new(UserAuthOtps::OtpId).uuid().not_null())
                    .col(
                        ColumnDef::new(UserAuthOtps::Reason)
                            .string_len(64)
                            .not_null()
                            .default("ACTIVATE_USER"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UserAuthOtps::Table, UserAuthOtps::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(UserAuthOtps::Table, UserAuthOtps::OtpId)
                            .to(AuthOtps::Table, AuthOtps::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One live OTP per user and reason; the binder upserts against this.
        manager
            .create_index(
                Index::create()
                    .table(UserAuthOtps::Table)
                    .col(UserAuthOtps::Reason)
                    .col(UserAuthOtps::UserId)
                    .unique()
                    .name("unique_reason_for_user")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(UserAuthOtps::Table)
                    .col(UserAuthOtps::OtpId)
                    .name("idx_user_auth_otps_otp_id")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserAuthOtps::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UserAuthOtps {
    Table,
    Id,
    UserId,
    OtpId,
    Reason,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}

#[derive(Iden)]
enum AuthOtps {
    Table,
    Id,
}
