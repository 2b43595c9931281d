use sea_orm::Database;
use tracing::info;

use bazargan_accounts::config::AccountsConfig;
use bazargan_accounts::infra::notifier::AppNotifier;
use bazargan_accounts::router::build_router;
use bazargan_accounts::state::AppState;
use bazargan_core::tracing::init_tracing;
use bazargan_otp::OtpCodec;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = AccountsConfig::from_env();
    let policies = config.otp_policies().expect("invalid OTP configuration");
    let codec = OtpCodec::with_system_clock(config.signing_keys());

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let notifier = AppNotifier::from_config(config.notifier.clone())
        .await
        .expect("failed to set up otp delivery");

    let state = AppState {
        db,
        codec,
        policies,
        notifier,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.accounts_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("accounts service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
