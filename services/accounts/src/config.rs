use chrono::Duration;

use bazargan_otp::{OtpPolicy, SigningKeys};

use crate::domain::types::OtpPolicies;

/// Accounts service configuration loaded from environment variables.
#[derive(Debug)]
pub struct AccountsConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Secret used to sign OTP envelopes. Env var: `SECRET_KEY`.
    pub secret_key: String,
    /// Retired secrets still accepted when verifying, comma-separated.
    /// Env var: `SECRET_KEY_FALLBACKS`.
    pub secret_key_fallbacks: Vec<String>,
    /// TCP port to listen on (default 3113). Env var: `ACCOUNTS_PORT`.
    pub accounts_port: u16,
    /// Emailed code length (default 6). Env var: `OTP_LENGTH`.
    pub otp_length: usize,
    /// Emailed code lifetime (default 120). Env var: `OTP_TIMEOUT_SECS`.
    pub otp_timeout_secs: i64,
    /// Second-step token length (default 12). Env var: `TOKEN_LENGTH`.
    pub token_length: usize,
    /// Second-step token lifetime (default 600). Env var: `TOKEN_TIMEOUT_SECS`.
    pub token_timeout_secs: i64,
    /// Delivery channel for emailed codes. See [`NotifierConfig`].
    pub notifier: NotifierConfig,
}

/// Where codes are delivered.
///
/// SMTP unless `ACCOUNTS_NOTIFIER=console`, which writes codes to the log and
/// is meant for local development only.
#[derive(Debug, Clone)]
pub enum NotifierConfig {
    Console,
    Smtp(SmtpConfig),
}

#[derive(Clone)]
pub struct SmtpConfig {
    /// Env var: `SMTP_HOST`.
    pub host: String,
    /// Implicit TLS port (default 465). Env var: `SMTP_PORT`.
    pub port: u16,
    /// Env var: `SMTP_USERNAME`.
    pub username: String,
    /// Env var: `SMTP_PASSWORD`.
    pub password: String,
    /// Env var: `SMTP_FROM_EMAIL`.
    pub from_email: String,
    /// Env var: `SMTP_FROM_NAME`.
    pub from_name: Option<String>,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

impl NotifierConfig {
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| var(key).filter(|v| !v.is_empty());
        let require = |key: &str| var(key).ok_or_else(|| anyhow::anyhow!("{key} is not set"));

        match var("ACCOUNTS_NOTIFIER").as_deref() {
            Some("console") => return Ok(Self::Console),
            None | Some("smtp") => {}
            Some(other) => anyhow::bail!("unknown ACCOUNTS_NOTIFIER: {other}"),
        }

        Ok(Self::Smtp(SmtpConfig {
            host: require("SMTP_HOST")?,
            port: var("SMTP_PORT")
                .map(|p| p.parse::<u16>())
                .transpose()
                .map_err(|e| anyhow::anyhow!("invalid SMTP_PORT: {e}"))?
                .unwrap_or(465),
            username: require("SMTP_USERNAME")?,
            password: require("SMTP_PASSWORD")?,
            from_email: require("SMTP_FROM_EMAIL")?,
            from_name: var("SMTP_FROM_NAME"),
        }))
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AccountsConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            secret_key: std::env::var("SECRET_KEY").expect("SECRET_KEY"),
            secret_key_fallbacks: std::env::var("SECRET_KEY_FALLBACKS")
                .map(|v| parse_fallbacks(&v))
                .unwrap_or_default(),
            accounts_port: env_or("ACCOUNTS_PORT", 3113),
            otp_length: env_or("OTP_LENGTH", 6),
            otp_timeout_secs: env_or("OTP_TIMEOUT_SECS", 120),
            token_length: env_or("TOKEN_LENGTH", 12),
            token_timeout_secs: env_or("TOKEN_TIMEOUT_SECS", 600),
            notifier: NotifierConfig::from_lookup(|key| std::env::var(key).ok())
                .expect("invalid notifier configuration"),
        }
    }

    pub fn signing_keys(&self) -> SigningKeys {
        SigningKeys::new(self.secret_key.as_bytes())
            .with_fallbacks(self.secret_key_fallbacks.iter().map(String::as_bytes))
    }

    pub fn otp_policies(&self) -> anyhow::Result<OtpPolicies> {
        Ok(OtpPolicies {
            code: OtpPolicy::new(self.otp_length, Duration::seconds(self.otp_timeout_secs))?,
            token: OtpPolicy::new(self.token_length, Duration::seconds(self.token_timeout_secs))?,
        })
    }
}

fn parse_fallbacks(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
