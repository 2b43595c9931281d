use chrono::Duration;

use bazargan_accounts::domain::repository::OtpRepository;
use bazargan_accounts::domain::types::AccountChange;
use bazargan_accounts::error::AccountsServiceError;
use bazargan_accounts::usecase::otp::OtpBinder;
use bazargan_domain::otp::OtpReason;
use bazargan_otp::OtpCode;

use crate::helpers::{InMemoryStore, test_account, test_binder, test_clock, test_codec, wrong_code};

#[tokio::test]
async fn should_issue_and_consume_code_once() {
    let user = test_account("buyer@example.com");
    let store = InMemoryStore::with_users(vec![user.clone()]);
    let clock = test_clock();
    let binder = test_binder(&store, &clock);

    let issued = binder
        .issue_for_user(user.id, OtpReason::ActivateUser)
        .await
        .unwrap();
    assert_eq!(issued.binding.user_id, user.id);
    assert_eq!(issued.binding.otp_id, issued.otp.record.id);
    assert_eq!(store.binding_count(), 1);

    binder
        .consume(user.id, OtpReason::ActivateUser, issued.otp.code, &[])
        .await
        .unwrap();
    assert_eq!(store.binding_count(), 0, "binding should be deleted on consume");
    assert_eq!(store.otp_count(), 0, "record should be deleted on consume");

    let replay = binder
        .consume(user.id, OtpReason::ActivateUser, issued.otp.code, &[])
        .await;
    assert!(
        matches!(replay, Err(AccountsServiceError::InvalidOtp)),
        "expected InvalidOtp on replay, got {replay:?}"
    );
}

#[tokio::test]
async fn should_keep_binding_after_wrong_code() {
    let user = test_account("buyer@example.com");
    let store = InMemoryStore::with_users(vec![user.clone()]);
    let clock = test_clock();
    let binder = test_binder(&store, &clock);

    let issued = binder
        .issue_for_user(user.id, OtpReason::ForgotPassword)
        .await
        .unwrap();

    let result = binder
        .consume(
            user.id,
            OtpReason::ForgotPassword,
            wrong_code(issued.otp.code, 6),
            &[AccountChange::MarkVerified],
        )
        .await;
    assert!(
        matches!(result, Err(AccountsServiceError::InvalidOtp)),
        "expected InvalidOtp, got {result:?}"
    );
    assert_eq!(store.binding_count(), 1, "failed attempt must not consume");
    assert!(
        !store.account("buyer@example.com").unwrap().is_verified,
        "changes must not apply on failure"
    );

    binder
        .consume(user.id, OtpReason::ForgotPassword, issued.otp.code, &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn should_reject_when_nothing_is_bound() {
    let user = test_account("buyer@example.com");
    let store = InMemoryStore::with_users(vec![user.clone()]);
    let clock = test_clock();
    let binder = test_binder(&store, &clock);

    let result = binder
        .consume(user.id, OtpReason::ActivateUser, OtpCode::from(123_456u64), &[])
        .await;
    assert!(
        matches!(result, Err(AccountsServiceError::InvalidOtp)),
        "expected InvalidOtp, got {result:?}"
    );
}

#[tokio::test]
async fn should_repoint_binding_on_reissue() {
    let user = test_account("buyer@example.com");
    let store = InMemoryStore::with_users(vec![user.clone()]);
    let clock = test_clock();
    let binder = test_binder(&store, &clock);

    let first = binder
        .issue_for_user(user.id, OtpReason::ActivateUser)
        .await
        .unwrap();
    let second = binder
        .issue_for_user(user.id, OtpReason::ActivateUser)
        .await
        .unwrap();

    assert_eq!(first.binding.id, second.binding.id, "same binding row is reused");
    assert_ne!(first.otp.record.id, second.otp.record.id, "a fresh record is minted");
    assert_eq!(store.binding_count(), 1);

    if first.otp.code != second.otp.code {
        let stale = binder
            .consume(user.id, OtpReason::ActivateUser, first.otp.code, &[])
            .await;
        assert!(
            matches!(stale, Err(AccountsServiceError::InvalidOtp)),
            "previous code should stop working, got {stale:?}"
        );
    }

    binder
        .consume(user.id, OtpReason::ActivateUser, second.otp.code, &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn should_accept_at_timeout_and_reject_one_second_later() {
    let user = test_account("buyer@example.com");
    let store = InMemoryStore::with_users(vec![user.clone()]);
    let clock = test_clock();
    let binder = test_binder(&store, &clock);

    let issued = binder
        .issue_for_user(user.id, OtpReason::ActivateUser)
        .await
        .unwrap();
    clock.advance(Duration::seconds(121));
    let late = binder
        .consume(user.id, OtpReason::ActivateUser, issued.otp.code, &[])
        .await;
    assert!(
        matches!(late, Err(AccountsServiceError::InvalidOtp)),
        "expected InvalidOtp after 121s, got {late:?}"
    );

    let reissued = binder
        .issue_for_user(user.id, OtpReason::ActivateUser)
        .await
        .unwrap();
    clock.advance(Duration::seconds(120));
    binder
        .consume(user.id, OtpReason::ActivateUser, reissued.otp.code, &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn should_keep_reasons_independent() {
    let user = test_account("buyer@example.com");
    let store = InMemoryStore::with_users(vec![user.clone()]);
    let clock = test_clock();
    let binder = test_binder(&store, &clock);

    let activation = binder
        .issue_for_user(user.id, OtpReason::ActivateUser)
        .await
        .unwrap();
    let reset = binder
        .issue_for_user(user.id, OtpReason::ForgotPassword)
        .await
        .unwrap();
    let reset_token = binder
        .issue_for_user(user.id, OtpReason::ForgotPasswordToken)
        .await
        .unwrap();
    assert_eq!(store.binding_count(), 3, "one binding per reason");

    if activation.otp.code != reset.otp.code {
        let crossed = binder
            .consume(user.id, OtpReason::ForgotPassword, activation.otp.code, &[])
            .await;
        assert!(
            matches!(crossed, Err(AccountsServiceError::InvalidOtp)),
            "a code bound to one reason must not satisfy another, got {crossed:?}"
        );
    }

    binder
        .consume(user.id, OtpReason::ActivateUser, activation.otp.code, &[])
        .await
        .unwrap();
    binder
        .consume(user.id, OtpReason::ForgotPassword, reset.otp.code, &[])
        .await
        .unwrap();
    assert_eq!(store.binding_count(), 1, "token binding survives its sibling");
    binder
        .consume(user.id, OtpReason::ForgotPasswordToken, reset_token.otp.code, &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn should_use_token_policy_for_second_step_reasons() {
    let user = test_account("buyer@example.com");
    let store = InMemoryStore::with_users(vec![user.clone()]);
    let clock = test_clock();
    let binder = test_binder(&store, &clock);

    let issued = binder
        .issue_for_user(user.id, OtpReason::ForgotPasswordToken)
        .await
        .unwrap();
    assert_eq!(issued.otp.code.to_string().len(), 12);
    assert_eq!(issued.otp.record.timeout, Duration::seconds(600));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_keep_one_binding_under_concurrent_issue() {
    let user = test_account("buyer@example.com");
    let store = InMemoryStore::with_users(vec![user.clone()]);
    let clock = test_clock();
    let user_id = user.id;

    let tasks = (0..8).map(|_| {
        let binder = test_binder(&store, &clock);
        tokio::spawn(async move {
            binder
                .issue_for_user(user_id, OtpReason::ActivateUser)
                .await
        })
    });
    let results = futures::future::join_all(tasks).await;

    let issued: Vec<_> = results
        .into_iter()
        .map(|r| r.expect("task panicked").expect("issue failed"))
        .collect();
    assert_eq!(store.binding_count(), 1, "unique (reason, user) must hold");
    assert!(
        issued.iter().all(|i| i.binding.id == issued[0].binding.id),
        "every issuer should land on the same binding"
    );

    let bound = store
        .find_bound(user.id, OtpReason::ActivateUser)
        .await
        .unwrap()
        .expect("binding should exist");
    assert!(issued.iter().any(|i| i.otp.record.id == bound.otp.id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_let_one_concurrent_consumer_win() {
    let user = test_account("buyer@example.com");
    let store = InMemoryStore::with_users(vec![user.clone()]);
    let clock = test_clock();

    let issued = test_binder(&store, &clock)
        .issue_for_user(user.id, OtpReason::ActivateUser)
        .await
        .unwrap();
    let code = issued.otp.code;
    let user_id = user.id;

    let tasks = (0..4).map(|_| {
        let binder = OtpBinder {
            otps: store.clone(),
            codec: test_codec(&clock),
            policies: Default::default(),
        };
        tokio::spawn(async move {
            binder
                .consume(user_id, OtpReason::ActivateUser, code, &[AccountChange::MarkVerified])
                .await
        })
    });
    let results = futures::future::join_all(tasks).await;

    let wins = results
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(wins, 1, "exactly one consumer should succeed");
    assert!(store.account("buyer@example.com").unwrap().is_verified);
}
