use anyhow::Context as _;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, SqlErr, TransactionError, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use bazargan_accounts_schema::{auth_otps, user_auth_otps, users};
use bazargan_domain::id::{OtpId, UserId};
use bazargan_domain::otp::OtpReason;
use bazargan_otp::OtpRecord;

use crate::domain::repository::{OtpRepository, UserRepository};
use crate::domain::types::{Account, AccountChange, BoundOtp, OtpBinding};
use crate::error::AccountsServiceError;

// ── User repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserRepository {
    pub db: DatabaseConnection,
}

impl UserRepository for DbUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountsServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find user by email")?;
        Ok(model.map(account_from_model))
    }

    async fn create(
        &self,
        account: &Account,
        changes: &[AccountChange],
    ) -> Result<(), AccountsServiceError> {
        let result = self
            .db
            .transaction::<_, (), CreateUserError>(|txn| {
                let account = account.clone();
                let changes = changes.to_vec();
                Box::pin(async move {
                    users::ActiveModel {
                        id: Set(account.id.0),
                        email: Set(account.email),
                        password_hash: Set(account.password_hash),
                        is_verified: Set(account.is_verified),
                        is_active: Set(account.is_active),
                        created_at: Set(account.created_at),
                    }
                    .insert(txn)
                    .await
                    .map_err(|err| match err.sql_err() {
                        Some(SqlErr::UniqueConstraintViolation(_)) => CreateUserError::EmailTaken,
                        _ => CreateUserError::Db(err),
                    })?;

                    for change in &changes {
                        apply_change(txn, account.id, change).await?;
                    }
                    Ok(())
                })
            })
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Transaction(CreateUserError::EmailTaken)) => {
                Err(AccountsServiceError::EmailTaken)
            }
            Err(err) => Err(anyhow::Error::new(err).context("create user").into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CreateUserError {
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

fn account_from_model(model: users::Model) -> Account {
    Account {
        id: UserId(model.id),
        email: model.email,
        password_hash: model.password_hash,
        is_verified: model.is_verified,
        is_active: model.is_active,
        created_at: model.created_at,
    }
}

// ── OTP repository ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOtpRepository {
    pub db: DatabaseConnection,
}

impl OtpRepository for DbOtpRepository {
    async fn bind(
        &self,
        user_id: UserId,
        reason: OtpReason,
        otp: &OtpRecord,
    ) -> Result<OtpBinding, AccountsServiceError> {
        let model = self
            .db
            .transaction::<_, user_auth_otps::Model, sea_orm::DbErr>(|txn| {
                let otp = otp.clone();
                Box::pin(async move { bind_otp(txn, user_id, reason, &otp).await })
            })
            .await
            .context("bind otp")?;
        Ok(binding_from_model(model)?)
    }

    async fn find_bound(
        &self,
        user_id: UserId,
        reason: OtpReason,
    ) -> Result<Option<BoundOtp>, AccountsServiceError> {
        let found = user_auth_otps::Entity::find()
            .filter(user_auth_otps::Column::UserId.eq(user_id.0))
            .filter(user_auth_otps::Column::Reason.eq(reason.as_str()))
            .find_also_related(auth_otps::Entity)
            .one(&self.db)
            .await
            .context("find bound otp")?;

        // The FK makes a binding without its record unreachable outside a race
        // with the sweep; treat it as absent.
        let Some((binding, Some(otp))) = found else {
            return Ok(None);
        };
        Ok(Some(BoundOtp {
            binding: binding_from_model(binding)?,
            otp: record_from_model(otp),
        }))
    }

    async fn consume(
        &self,
        binding: &OtpBinding,
        changes: &[AccountChange],
    ) -> Result<bool, AccountsServiceError> {
        let consumed = self
            .db
            .transaction::<_, bool, sea_orm::DbErr>(|txn| {
                let binding = binding.clone();
                let changes = changes.to_vec();
                Box::pin(async move {
                    // Conditional on otp_id: a concurrent consume or reissue
                    // leaves nothing to delete here.
                    let deleted = user_auth_otps::Entity::delete_many()
                        .filter(user_auth_otps::Column::Id.eq(binding.id))
                        .filter(user_auth_otps::Column::OtpId.eq(binding.otp_id.0))
                        .exec(txn)
                        .await?;
                    if deleted.rows_affected == 0 {
                        return Ok(false);
                    }

                    auth_otps::Entity::delete_by_id(binding.otp_id.0)
                        .exec(txn)
                        .await?;

                    for change in &changes {
                        apply_change(txn, binding.user_id, change).await?;
                    }
                    Ok(true)
                })
            })
            .await
            .context("consume otp")?;
        Ok(consumed)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AccountsServiceError> {
        let now = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        let result = auth_otps::Entity::delete_many()
            .filter(Expr::cust_with_values(
                "issued_at + make_interval(secs => timeout_secs) < $1",
                [now],
            ))
            .exec(&self.db)
            .await
            .context("purge expired otps")?;
        Ok(result.rows_affected)
    }
}

/// Insert `otp` and point the (user, reason) binding at it. The upsert on
/// `(reason, user_id)` turns a concurrent first issue into a repoint.
async fn bind_otp(
    txn: &DatabaseTransaction,
    user_id: UserId,
    reason: OtpReason,
    otp: &OtpRecord,
) -> Result<user_auth_otps::Model, sea_orm::DbErr> {
    auth_otps::ActiveModel {
        id: Set(otp.id.0),
        envelope: Set(otp.envelope.clone()),
        issued_at: Set(otp.issued_at),
        timeout_secs: Set(otp.timeout.num_seconds()),
    }
    .insert(txn)
    .await?;

    let binding = user_auth_otps::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id.0),
        otp_id: Set(otp.id.0),
        reason: Set(reason.as_str().to_owned()),
    };
    user_auth_otps::Entity::insert(binding)
        .on_conflict(
            OnConflict::columns([
                user_auth_otps::Column::Reason,
                user_auth_otps::Column::UserId,
            ])
            .update_column(user_auth_otps::Column::OtpId)
            .to_owned(),
        )
        .exec_with_returning(txn)
        .await
}

async fn apply_change(
    txn: &DatabaseTransaction,
    user_id: UserId,
    change: &AccountChange,
) -> Result<(), sea_orm::DbErr> {
    match change {
        AccountChange::MarkVerified => {
            users::Entity::update_many()
                .col_expr(users::Column::IsVerified, Expr::value(true))
                .filter(users::Column::Id.eq(user_id.0))
                .exec(txn)
                .await?;
        }
        AccountChange::SetPassword { password_hash } => {
            users::Entity::update_many()
                .col_expr(users::Column::PasswordHash, Expr::value(password_hash.clone()))
                .filter(users::Column::Id.eq(user_id.0))
                .exec(txn)
                .await?;
        }
        AccountChange::Bind { reason, otp } => {
            bind_otp(txn, user_id, *reason, otp).await?;
        }
    }
    Ok(())
}

fn binding_from_model(model: user_auth_otps::Model) -> anyhow::Result<OtpBinding> {
    let reason = model
        .reason
        .parse::<OtpReason>()
        .context("decode otp binding reason")?;
    Ok(OtpBinding {
        id: model.id,
        user_id: UserId(model.user_id),
        otp_id: OtpId(model.otp_id),
        reason,
    })
}

fn record_from_model(model: auth_otps::Model) -> OtpRecord {
    OtpRecord {
        id: OtpId(model.id),
        envelope: model.envelope,
        issued_at: model.issued_at,
        timeout: Duration::seconds(model.timeout_secs),
    }
}
