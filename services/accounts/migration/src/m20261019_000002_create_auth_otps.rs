use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AuthOtps::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AuthOtps::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AuthOtps::Envelope).string_len(128).not_null())
                    .col(
                        ColumnDef::new(AuthOtps::IssuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AuthOtps::TimeoutSecs)
                            .big_integer()
                            .not_null()
                            .default(120),
                    )
                    .to_owned(),
            )
            .await?;

        // Sweep scans by issuance time.
        manager
            .create_index(
                Index::create()
                    .table(AuthOtps::Table)
                    .col(AuthOtps::IssuedAt)
                    .name("idx_auth_otps_issued_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuthOtps::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AuthOtps {
    Table,
    Id,
    Envelope,
    IssuedAt,
    TimeoutSecs,
}
