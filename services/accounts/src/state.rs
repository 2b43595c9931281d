use sea_orm::DatabaseConnection;

use bazargan_otp::OtpCodec;

use crate::domain::types::OtpPolicies;
use crate::infra::db::{DbOtpRepository, DbUserRepository};
use crate::infra::notifier::AppNotifier;
use crate::password::Argon2Hasher;
use crate::usecase::otp::OtpBinder;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub codec: OtpCodec,
    pub policies: OtpPolicies,
    pub notifier: AppNotifier,
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn otp_repo(&self) -> DbOtpRepository {
        DbOtpRepository {
            db: self.db.clone(),
        }
    }

    pub fn binder(&self) -> OtpBinder<DbOtpRepository> {
        OtpBinder {
            otps: self.otp_repo(),
            codec: self.codec.clone(),
            policies: self.policies,
        }
    }

    pub fn notifier(&self) -> AppNotifier {
        self.notifier.clone()
    }

    pub fn hasher(&self) -> Argon2Hasher {
        Argon2Hasher
    }
}
