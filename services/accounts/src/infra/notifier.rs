//! Delivery channel selection. The console channel writes codes to the log
//! and is only for local development.

use chrono::Duration;
use tracing::{info, warn};

use bazargan_domain::otp::OtpReason;
use bazargan_otp::OtpCode;

use crate::config::NotifierConfig;
use crate::domain::repository::OtpNotifier;
use crate::infra::smtp::SmtpNotifier;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl OtpNotifier for ConsoleNotifier {
    async fn deliver(
        &self,
        email: &str,
        code: OtpCode,
        ttl: Duration,
        reason: OtpReason,
    ) -> anyhow::Result<()> {
        info!(
            target: "otp_delivery",
            %email,
            %code,
            ttl_secs = ttl.num_seconds(),
            subject = reason.label(),
            "otp delivered to console"
        );
        Ok(())
    }
}

/// The notifier the service runs with, chosen once at startup.
#[derive(Clone)]
pub enum AppNotifier {
    Console(ConsoleNotifier),
    Smtp(SmtpNotifier),
}

impl AppNotifier {
    pub async fn from_config(config: NotifierConfig) -> anyhow::Result<Self> {
        match config {
            NotifierConfig::Console => {
                warn!("console notifier selected; otp codes will be written to the log");
                Ok(Self::Console(ConsoleNotifier))
            }
            NotifierConfig::Smtp(smtp) => Ok(Self::Smtp(SmtpNotifier::connect(smtp).await?)),
        }
    }
}

impl OtpNotifier for AppNotifier {
    async fn deliver(
        &self,
        email: &str,
        code: OtpCode,
        ttl: Duration,
        reason: OtpReason,
    ) -> anyhow::Result<()> {
        match self {
            Self::Console(n) => n.deliver(email, code, ttl, reason).await,
            Self::Smtp(n) => n.deliver(email, code, ttl, reason).await,
        }
    }
}
