use std::sync::Arc;

use tracing::info;

use bazargan_otp::Clock;

use crate::domain::repository::OtpRepository;
use crate::error::AccountsServiceError;

/// Deletes OTP records past their timeout. Bindings go with them (cascade).
pub struct PurgeExpiredOtpsUseCase<O: OtpRepository> {
    pub otps: O,
    pub clock: Arc<dyn Clock>,
}

impl<O: OtpRepository> PurgeExpiredOtpsUseCase<O> {
    pub async fn execute(&self) -> Result<u64, AccountsServiceError> {
        let now = self.clock.now();
        let purged = self.otps.purge_expired(now).await?;
        info!(purged, "expired otps purged");
        Ok(purged)
    }
}
