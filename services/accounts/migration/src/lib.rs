use sea_orm_migration::prelude::*;

mod m20261019_000001_create_users;
mod m20261019_000002_create_auth_otps;
mod m20261019_000003_create_user_auth_otps;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261019_000001_create_users::Migration),
            Box::new(m20261019_000002_create_auth_otps::Migration),
            Box::new(m20261019_000003_create_user_auth_otps::Migration),
        ]
    }
}
