use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use bazargan_accounts::domain::repository::{
    OtpNotifier, OtpRepository, PasswordHasher, UserRepository,
};
use bazargan_accounts::domain::types::{
    Account, AccountChange, BoundOtp, OtpBinding, OtpPolicies,
};
use bazargan_accounts::error::AccountsServiceError;
use bazargan_accounts::password::Argon2Hasher;
use bazargan_accounts::usecase::otp::OtpBinder;
use bazargan_domain::id::{OtpId, UserId};
use bazargan_domain::otp::OtpReason;
use bazargan_otp::{ManualClock, OtpCode, OtpCodec, OtpRecord, SigningKeys};

// ── InMemoryStore ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StoreState {
    pub users: Vec<Account>,
    pub otps: HashMap<OtpId, OtpRecord>,
    pub bindings: Vec<OtpBinding>,
}

impl StoreState {
    fn bind(&mut self, user_id: UserId, reason: OtpReason, otp: &OtpRecord) -> OtpBinding {
        self.otps.insert(otp.id, otp.clone());
        if let Some(existing) = self
            .bindings
            .iter_mut()
            .find(|b| b.user_id == user_id && b.reason == reason)
        {
            existing.otp_id = otp.id;
            return existing.clone();
        }
        let binding = OtpBinding {
            id: Uuid::new_v4(),
            user_id,
            otp_id: otp.id,
            reason,
        };
        self.bindings.push(binding.clone());
        binding
    }

    fn apply(&mut self, user_id: UserId, change: &AccountChange) {
        match change {
            AccountChange::MarkVerified => {
                if let Some(user) = self.users.iter_mut().find(|u| u.id == user_id) {
                    user.is_verified = true;
                }
            }
            AccountChange::SetPassword { password_hash } => {
                if let Some(user) = self.users.iter_mut().find(|u| u.id == user_id) {
                    user.password_hash = Some(password_hash.clone());
                }
            }
            AccountChange::Bind { reason, otp } => {
                self.bind(user_id, *reason, otp);
            }
        }
    }
}

/// Users, OTP records and bindings behind one lock, so `consume` is atomic
/// the way the database transaction is.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    pub state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn with_users(users: Vec<Account>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().users = users;
        store
    }

    pub fn account(&self, email: &str) -> Option<Account> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }

    pub fn binding_count(&self) -> usize {
        self.state.lock().unwrap().bindings.len()
    }

    pub fn otp_count(&self) -> usize {
        self.state.lock().unwrap().otps.len()
    }
}

impl UserRepository for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountsServiceError> {
        Ok(self.account(email))
    }

    async fn create(
        &self,
        account: &Account,
        changes: &[AccountChange],
    ) -> Result<(), AccountsServiceError> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.email == account.email) {
            return Err(AccountsServiceError::EmailTaken);
        }
        state.users.push(account.clone());
        for change in changes {
            state.apply(account.id, change);
        }
        Ok(())
    }
}

impl OtpRepository for InMemoryStore {
    async fn bind(
        &self,
        user_id: UserId,
        reason: OtpReason,
        otp: &OtpRecord,
    ) -> Result<OtpBinding, AccountsServiceError> {
        Ok(self.state.lock().unwrap().bind(user_id, reason, otp))
    }

    async fn find_bound(
        &self,
        user_id: UserId,
        reason: OtpReason,
    ) -> Result<Option<BoundOtp>, AccountsServiceError> {
        let state = self.state.lock().unwrap();
        let found = state
            .bindings
            .iter()
            .find(|b| b.user_id == user_id && b.reason == reason)
            .and_then(|b| {
                state.otps.get(&b.otp_id).map(|otp| BoundOtp {
                    binding: b.clone(),
                    otp: otp.clone(),
                })
            });
        Ok(found)
    }

    async fn consume(
        &self,
        binding: &OtpBinding,
        changes: &[AccountChange],
    ) -> Result<bool, AccountsServiceError> {
        let mut state = self.state.lock().unwrap();
        let Some(pos) = state
            .bindings
            .iter()
            .position(|b| b.id == binding.id && b.otp_id == binding.otp_id)
        else {
            return Ok(false);
        };
        state.bindings.remove(pos);
        state.otps.remove(&binding.otp_id);

        for change in changes {
            state.apply(binding.user_id, change);
        }
        Ok(true)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AccountsServiceError> {
        let mut state = self.state.lock().unwrap();
        let before = state.otps.len();
        state.otps.retain(|_, otp| !otp.has_expired(now));
        let purged = (before - state.otps.len()) as u64;

        let StoreState { otps, bindings, .. } = &mut *state;
        bindings.retain(|b| otps.contains_key(&b.otp_id));
        Ok(purged)
    }
}

// ── Notifiers ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Delivery {
    pub email: String,
    pub code: OtpCode,
    pub ttl: Duration,
    pub reason: OtpReason,
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl RecordingNotifier {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn last_code(&self) -> OtpCode {
        self.deliveries
            .lock()
            .unwrap()
            .last()
            .map(|d| d.code)
            .expect("no otp was delivered")
    }
}

impl OtpNotifier for RecordingNotifier {
    async fn deliver(
        &self,
        email: &str,
        code: OtpCode,
        ttl: Duration,
        reason: OtpReason,
    ) -> anyhow::Result<()> {
        self.deliveries.lock().unwrap().push(Delivery {
            email: email.to_owned(),
            code,
            ttl,
            reason,
        });
        Ok(())
    }
}

pub struct FailingNotifier;

impl OtpNotifier for FailingNotifier {
    async fn deliver(
        &self,
        _email: &str,
        _code: OtpCode,
        _ttl: Duration,
        _reason: OtpReason,
    ) -> anyhow::Result<()> {
        anyhow::bail!("smtp unavailable")
    }
}

// ── Password hashing ─────────────────────────────────────────────────────────

/// Argon2 hasher that counts how often it is asked to hash.
#[derive(Clone, Default)]
pub struct CountingHasher {
    pub calls: Arc<AtomicUsize>,
}

impl CountingHasher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PasswordHasher for CountingHasher {
    async fn hash(&self, password: String) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Argon2Hasher.hash(password).await
    }
}

pub fn password_matches(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
}

pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(t0()))
}

pub fn test_codec(clock: &Arc<ManualClock>) -> OtpCodec {
    OtpCodec::new(SigningKeys::new("integration-test-secret"), clock.clone())
}

pub fn test_binder(store: &InMemoryStore, clock: &Arc<ManualClock>) -> OtpBinder<InMemoryStore> {
    OtpBinder {
        otps: store.clone(),
        codec: test_codec(clock),
        policies: OtpPolicies::default(),
    }
}

pub fn test_account(email: &str) -> Account {
    Account {
        id: UserId(Uuid::now_v7()),
        email: email.to_owned(),
        password_hash: None,
        is_verified: false,
        is_active: true,
        created_at: t0(),
    }
}

/// Any code of the same length that differs from `code`.
pub fn wrong_code(code: OtpCode, length: usize) -> OtpCode {
    let floor = 10u64.pow(length as u32 - 1);
    let ceiling = 10u64.pow(length as u32) - 1;
    if code.value() == ceiling {
        OtpCode::from(floor)
    } else {
        OtpCode::from(code.value() + 1)
    }
}
