//! Production delivery channel: codes are mailed over SMTP.

use std::sync::Arc;

use anyhow::Context as _;
use chrono::Duration;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::info;

use bazargan_domain::otp::OtpReason;
use bazargan_otp::OtpCode;

use crate::config::SmtpConfig;
use crate::domain::repository::OtpNotifier;

#[derive(Clone)]
pub struct SmtpNotifier {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpNotifier {
    /// Build the relay transport and check that the server accepts us.
    pub async fn connect(config: SmtpConfig) -> anyhow::Result<Self> {
        let from = from_mailbox(&config)?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .context("create smtp transport")?
            .port(config.port)
            .credentials(Credentials::new(config.username, config.password))
            .build();

        let reachable = transport
            .test_connection()
            .await
            .context("smtp connection test")?;
        anyhow::ensure!(reachable, "smtp server {} rejected the connection test", config.host);

        info!(host = %config.host, port = config.port, "smtp connection established");
        Ok(Self {
            transport: Arc::new(transport),
            from,
        })
    }
}

impl OtpNotifier for SmtpNotifier {
    async fn deliver(
        &self,
        email: &str,
        code: OtpCode,
        ttl: Duration,
        reason: OtpReason,
    ) -> anyhow::Result<()> {
        let message = build_message(&self.from, email, code, ttl, reason)?;
        self.transport
            .send(message)
            .await
            .context("send otp email")?;
        info!(target: "otp_delivery", %email, subject = reason.label(), "otp emailed");
        Ok(())
    }
}

fn from_mailbox(config: &SmtpConfig) -> anyhow::Result<Mailbox> {
    let address = config
        .from_email
        .parse()
        .context("parse SMTP_FROM_EMAIL")?;
    Ok(Mailbox::new(config.from_name.clone(), address))
}

fn build_message(
    from: &Mailbox,
    to: &str,
    code: OtpCode,
    ttl: Duration,
    reason: OtpReason,
) -> anyhow::Result<Message> {
    let to: Mailbox = to.parse().context("parse recipient address")?;
    let body = format!(
        "Your code is: {code}\n\n\
         It expires in {}.\n\n\
         If you didn't request this, you can safely ignore this email.\n",
        expires_in(ttl)
    );

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(reason.label())
        .header(ContentType::TEXT_PLAIN)
        .body(body)
        .context("build otp email")
}

fn expires_in(ttl: Duration) -> String {
    let secs = ttl.num_seconds();
    if secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{secs} seconds")
    }
}
