//! One-shot purge of expired OTP records. Meant to be run by an external
//! scheduler (cron, Kubernetes CronJob).

use std::sync::Arc;

use sea_orm::Database;
use tracing::error;

use bazargan_accounts::infra::db::DbOtpRepository;
use bazargan_accounts::usecase::sweep::PurgeExpiredOtpsUseCase;
use bazargan_core::tracing::init_tracing;
use bazargan_otp::SystemClock;

#[tokio::main]
async fn main() {
    init_tracing();

    // Only the database is needed; signing keys are not read here.
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
    let db = Database::connect(&database_url)
        .await
        .expect("failed to connect to database");

    let usecase = PurgeExpiredOtpsUseCase {
        otps: DbOtpRepository { db },
        clock: Arc::new(SystemClock),
    };

    if let Err(e) = usecase.execute().await {
        error!(error = ?e, "otp sweep failed");
        std::process::exit(1);
    }
}
