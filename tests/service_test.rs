mod common;

use anyhow::Result;
use common::{TripFixture, date, expense, registration, signer, test_service, trip_draft};
use tempfile::TempDir;
use trip_ledger::application::{AppError, ErrorKind, TripService};
use trip_ledger::domain::{
    ExpenseChanges, MAX_AMOUNT_CENTS, ParticipantChanges, ParticipantDraft, TripChanges, User,
    ValidationError, apply_payments,
};
use trip_ledger::storage::{Repository, is_unique_violation};
use uuid::Uuid;

// ========================
// Accounts
// ========================

#[tokio::test]
async fn test_register_and_login() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let user = service
        .register(registration("Ana", "ana@example.com"))
        .await?;
    assert_eq!(user.name, "Ana");

    let login = service.login("ANA@example.com", common::PASSWORD).await?;
    assert_eq!(login.user.id, user.id);

    let me = service.authenticate(&login.token).await?;
    assert_eq!(me, user);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_email_is_a_conflict() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service
        .register(registration("Ana", "ana@example.com"))
        .await?;
    let err = service
        .register(registration("Other Ana", "Ana@Example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::EmailInUse(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.status_code(), 409);
    assert_eq!(err.to_string(), "Email is already in use");

    Ok(())
}

#[tokio::test]
async fn test_email_uniqueness_is_enforced_by_storage() -> Result<()> {
    let temp = TempDir::new()?;
    let db_url = format!("sqlite:{}?mode=rwc", temp.path().join("test.db").display());
    let repo = Repository::init(&db_url).await?;

    repo.save_user(&User::new(registration("Ana", "ana@example.com"), String::new()))
        .await?;
    let err = repo
        .save_user(&User::new(
            registration("Other Ana", "ANA@example.COM"),
            String::new(),
        ))
        .await
        .unwrap_err();
    assert!(is_unique_violation(&err));

    let service = TripService::new(repo, signer());
    let err = service
        .register(registration("Third Ana", "Ana@Example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmailInUse(_)));

    Ok(())
}

#[tokio::test]
async fn test_concurrent_registrations_conflict() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let attempts = (0..4).map(|i| {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .register(registration(&format!("Ana {i}"), "ana@example.com"))
                .await
        })
    });
    let mut registered = 0;
    for attempt in attempts.collect::<Vec<_>>() {
        match attempt.await? {
            Ok(_) => registered += 1,
            Err(err) => assert_eq!(err.status_code(), 409, "{err}"),
        }
    }
    assert_eq!(registered, 1);

    Ok(())
}

#[tokio::test]
async fn test_login_with_wrong_password() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .register(registration("Ana", "ana@example.com"))
        .await?;

    let err = service
        .login("ana@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));

    let err = service
        .login("nobody@example.com", common::PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));
    assert_eq!(err.status_code(), 401);

    Ok(())
}

#[tokio::test]
async fn test_authenticate_rejects_bad_tokens() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.authenticate("not-a-token").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    // Signed with a different secret
    let (other, _other_temp) = {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("other.db");
        let other = trip_ledger::application::TripService::init(
            path.to_str().unwrap(),
            trip_ledger::application::TokenSigner::new("other", chrono::Duration::hours(1)),
        )
        .await?;
        (other, temp)
    };
    other
        .register(registration("Ana", "ana@example.com"))
        .await?;
    let foreign = other.login("ana@example.com", common::PASSWORD).await?;

    let err = service.authenticate(&foreign.token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Auth);

    Ok(())
}

// ========================
// Trips
// ========================

#[tokio::test]
async fn test_create_and_list_trips() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = service
        .register(registration("Ana", "ana@example.com"))
        .await?;
    let luis = service
        .register(registration("Luis", "luis@example.com"))
        .await?;

    let mut later = trip_draft("Porto");
    later.start_date = Some(date("2024-09-01"));
    later.end_date = Some(date("2024-09-03"));
    service.create_trip(ana.id, later).await?;
    service.create_trip(ana.id, trip_draft("Lisbon")).await?;
    service.create_trip(luis.id, trip_draft("Madrid")).await?;

    let trips = service.list_trips(ana.id).await?;
    let names: Vec<&str> = trips.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Lisbon", "Porto"]);

    Ok(())
}

#[tokio::test]
async fn test_create_trip_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = service
        .register(registration("Ana", "ana@example.com"))
        .await?;

    let mut inverted = trip_draft("Lisbon");
    inverted.start_date = Some(date("2024-06-10"));
    inverted.end_date = Some(date("2024-06-01"));
    let err = service.create_trip(ana.id, inverted).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::InvertedDates { .. })
    ));

    let err = service
        .create_trip(ana.id, trip_draft("   "))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Trip name is required");

    let mut no_currency = trip_draft("Lisbon");
    no_currency.currency = "euro".into();
    let err = service.create_trip(ana.id, no_currency).await.unwrap_err();
    assert_eq!(err.status_code(), 400);

    assert!(service.list_trips(ana.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_same_day_trip_is_valid() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let ana = service
        .register(registration("Ana", "ana@example.com"))
        .await?;

    let mut draft = trip_draft("Day trip");
    draft.start_date = Some(date("2024-06-01"));
    draft.end_date = Some(date("2024-06-01"));
    let trip = service.create_trip(ana.id, draft).await?;
    assert_eq!(trip.start_date, trip.end_date);

    Ok(())
}

#[tokio::test]
async fn test_trip_ownership_is_enforced() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["Ana", "Luis"]).await?;
    let intruder = service
        .register(registration("Eve", "eve@example.com"))
        .await?;

    let err = service.get_trip(intruder.id, fx.trip.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(err.status_code(), 403);

    assert!(matches!(
        service.summary(intruder.id, fx.trip.id).await.unwrap_err(),
        AppError::Forbidden(_)
    ));
    assert!(matches!(
        service
            .add_expense(intruder.id, fx.trip.id, expense(100, "2024-06-02", fx.id(0)))
            .await
            .unwrap_err(),
        AppError::Forbidden(_)
    ));

    let err = service.get_trip(fx.owner.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::TripNotFound(_)));
    assert_eq!(err.status_code(), 404);

    Ok(())
}

#[tokio::test]
async fn test_update_trip() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &[]).await?;

    let updated = service
        .update_trip(
            fx.owner.id,
            fx.trip.id,
            TripChanges {
                name: Some("Lisbon & Sintra".into()),
                end_date: Some(date("2024-06-12")),
                ..TripChanges::default()
            },
        )
        .await?;
    assert_eq!(updated.name, "Lisbon & Sintra");

    let stored = service.get_trip(fx.owner.id, fx.trip.id).await?;
    assert_eq!(stored, updated);

    // Moving the end before the start is rejected and nothing changes
    let err = service
        .update_trip(
            fx.owner.id,
            fx.trip.id,
            TripChanges {
                end_date: Some(date("2024-05-01")),
                ..TripChanges::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(service.get_trip(fx.owner.id, fx.trip.id).await?, updated);

    Ok(())
}

#[tokio::test]
async fn test_narrowing_trip_dates_keeps_recorded_expenses() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["Ana", "Luis"]).await?;
    let late = service
        .add_expense(fx.owner.id, fx.trip.id, expense(4000, "2024-06-09", fx.id(0)))
        .await?;

    service
        .update_trip(
            fx.owner.id,
            fx.trip.id,
            TripChanges {
                end_date: Some(date("2024-06-05")),
                ..TripChanges::default()
            },
        )
        .await?;

    let expenses = service.list_expenses(fx.owner.id, fx.trip.id).await?;
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].id, late.id);
    let summary = service.summary(fx.owner.id, fx.trip.id).await?;
    assert_eq!(summary.total_amount, 4000);

    // Edits to that expense are checked against the new range
    let err = service
        .update_expense(
            fx.owner.id,
            fx.trip.id,
            late.id,
            ExpenseChanges {
                date: Some(date("2024-06-08")),
                ..ExpenseChanges::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::DateOutsideTrip { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_delete_trip_cascades() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["Ana", "Luis"]).await?;
    service
        .add_expense(fx.owner.id, fx.trip.id, expense(10000, "2024-06-02", fx.id(0)))
        .await?;

    service.delete_trip(fx.owner.id, fx.trip.id).await?;

    assert!(service.list_trips(fx.owner.id).await?.is_empty());
    assert!(matches!(
        service
            .list_expenses(fx.owner.id, fx.trip.id)
            .await
            .unwrap_err(),
        AppError::TripNotFound(_)
    ));

    Ok(())
}

// ========================
// Participants
// ========================

#[tokio::test]
async fn test_participants_keep_insertion_order() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["Zoe", "Ana", "Marco"]).await?;

    let names: Vec<String> = service
        .list_participants(fx.owner.id, fx.trip.id)
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Zoe", "Ana", "Marco"]);

    Ok(())
}

#[tokio::test]
async fn test_add_participant_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &[]).await?;

    let err = service
        .add_participant(
            fx.owner.id,
            fx.trip.id,
            ParticipantDraft {
                name: "  ".into(),
                email: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = service
        .add_participant(
            fx.owner.id,
            Uuid::new_v4(),
            ParticipantDraft {
                name: "Ana".into(),
                email: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    Ok(())
}

#[tokio::test]
async fn test_update_participant() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["Ana"]).await?;

    let updated = service
        .update_participant(
            fx.owner.id,
            fx.trip.id,
            fx.id(0),
            ParticipantChanges {
                name: Some("Ana María".into()),
                email: Some("ana@example.com".into()),
            },
        )
        .await?;
    assert_eq!(updated.name, "Ana María");
    assert_eq!(updated.email.as_deref(), Some("ana@example.com"));

    let err = service
        .update_participant(
            fx.owner.id,
            fx.trip.id,
            Uuid::new_v4(),
            ParticipantChanges::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ParticipantNotFound(_)));

    Ok(())
}

// ========================
// Expenses
// ========================

#[tokio::test]
async fn test_non_positive_amount_is_rejected_before_storage() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["Ana", "Luis"]).await?;

    for amount in [0, -500] {
        let err = service
            .add_expense(fx.owner.id, fx.trip.id, expense(amount, "2024-06-02", fx.id(0)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Amount must be greater than 0");
        assert_eq!(err.status_code(), 400);
    }

    assert!(service.list_expenses(fx.owner.id, fx.trip.id).await?.is_empty());
    let summary = service.summary(fx.owner.id, fx.trip.id).await?;
    assert_eq!(summary.total_amount, 0);

    Ok(())
}

#[tokio::test]
async fn test_oversized_amount_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["Ana", "Luis"]).await?;

    for payer in [fx.id(0), fx.id(1)] {
        let err = service
            .add_expense(
                fx.owner.id,
                fx.trip.id,
                expense(9_000_000_000_000_000_000, "2024-06-02", payer),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::AmountTooLarge(_))
        ));
    }

    let recorded = service
        .add_expense(
            fx.owner.id,
            fx.trip.id,
            expense(MAX_AMOUNT_CENTS, "2024-06-02", fx.id(0)),
        )
        .await?;
    let err = service
        .update_expense(
            fx.owner.id,
            fx.trip.id,
            recorded.id,
            ExpenseChanges {
                amount: Some(MAX_AMOUNT_CENTS + 1),
                ..ExpenseChanges::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let summary = service.summary(fx.owner.id, fx.trip.id).await?;
    assert_eq!(summary.total_amount, MAX_AMOUNT_CENTS);
    assert_eq!(summary.balance_sum(), 0);
    let settlement = service.settlement(fx.owner.id, fx.trip.id).await?;
    assert_eq!(settlement.payments.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_unknown_payer_is_a_validation_error() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["Ana"]).await?;
    let other = service
        .create_trip(fx.owner.id, trip_draft("Other trip"))
        .await?;
    let stranger = service
        .add_participant(
            fx.owner.id,
            other.id,
            ParticipantDraft {
                name: "Stranger".into(),
                email: None,
            },
        )
        .await?;

    for payer in [Uuid::new_v4(), stranger.id] {
        let err = service
            .add_expense(fx.owner.id, fx.trip.id, expense(1000, "2024-06-02", payer))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::PayerNotInTrip)
        ));
    }

    Ok(())
}

#[tokio::test]
async fn test_expense_date_must_fall_within_trip() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["Ana"]).await?;

    // Both ends are inclusive
    service
        .add_expense(fx.owner.id, fx.trip.id, expense(100, "2024-06-01", fx.id(0)))
        .await?;
    service
        .add_expense(fx.owner.id, fx.trip.id, expense(100, "2024-06-10", fx.id(0)))
        .await?;

    let err = service
        .add_expense(fx.owner.id, fx.trip.id, expense(100, "2024-06-11", fx.id(0)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::DateOutsideTrip { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_update_and_delete_expense() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["Ana", "Luis"]).await?;
    let recorded = service
        .add_expense(fx.owner.id, fx.trip.id, expense(10000, "2024-06-02", fx.id(0)))
        .await?;

    let updated = service
        .update_expense(
            fx.owner.id,
            fx.trip.id,
            recorded.id,
            ExpenseChanges {
                amount: Some(6000),
                payer_id: Some(fx.id(1)),
                description: Some("Dinner".into()),
                ..ExpenseChanges::default()
            },
        )
        .await?;
    assert_eq!(updated.amount_cents, 6000);
    assert_eq!(updated.payer_id, fx.id(1));

    let summary = service.summary(fx.owner.id, fx.trip.id).await?;
    assert_eq!(summary.balance_of(fx.id(1)), Some(3000));

    // An invalid change leaves the stored expense alone
    let err = service
        .update_expense(
            fx.owner.id,
            fx.trip.id,
            recorded.id,
            ExpenseChanges {
                amount: Some(0),
                ..ExpenseChanges::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        service.list_expenses(fx.owner.id, fx.trip.id).await?[0].amount_cents,
        6000
    );

    service
        .delete_expense(fx.owner.id, fx.trip.id, recorded.id)
        .await?;
    assert!(service.list_expenses(fx.owner.id, fx.trip.id).await?.is_empty());

    let err = service
        .delete_expense(fx.owner.id, fx.trip.id, recorded.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ExpenseNotFound(_)));

    Ok(())
}

// ========================
// Summary & settlement
// ========================

#[tokio::test]
async fn test_two_participants_one_expense() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["A", "B"]).await?;
    service
        .add_expense(fx.owner.id, fx.trip.id, expense(10000, "2024-06-02", fx.id(0)))
        .await?;

    let summary = service.summary(fx.owner.id, fx.trip.id).await?;
    assert_eq!(summary.total_amount, 10000);
    assert_eq!(summary.balance_of(fx.id(0)), Some(5000));
    assert_eq!(summary.balance_of(fx.id(1)), Some(-5000));

    let settlement = service.settlement(fx.owner.id, fx.trip.id).await?;
    assert_eq!(settlement.payments.len(), 1);
    let payment = &settlement.payments[0];
    assert_eq!(payment.payer_name, "B");
    assert_eq!(payment.receiver_name, "A");
    assert_eq!(payment.amount, 5000);

    Ok(())
}

#[tokio::test]
async fn test_one_creditor_two_debtors() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["A", "B", "C"]).await?;
    service
        .add_expense(fx.owner.id, fx.trip.id, expense(9000, "2024-06-02", fx.id(0)))
        .await?;
    service
        .add_expense(fx.owner.id, fx.trip.id, expense(3000, "2024-06-03", fx.id(0)))
        .await?;

    let summary = service.summary(fx.owner.id, fx.trip.id).await?;
    let settlement = service.settlement(fx.owner.id, fx.trip.id).await?;

    assert_eq!(settlement.payments.len(), 2);
    assert!(settlement.payments.iter().all(|p| p.receiver_id == fx.id(0)));
    let paid: i64 = settlement.payments.iter().map(|p| p.amount).sum();
    assert_eq!(Some(paid), summary.balance_of(fx.id(0)));

    Ok(())
}

#[tokio::test]
async fn test_trip_without_expenses() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["A", "B", "C"]).await?;

    let summary = service.summary(fx.owner.id, fx.trip.id).await?;
    assert_eq!(summary.total_amount, 0);
    assert!(summary.participants.iter().all(|p| p.balance == 0));

    let settlement = service.settlement(fx.owner.id, fx.trip.id).await?;
    assert!(settlement.payments.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_settlement_zeroes_every_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = TripFixture::create(&service, &["A", "B", "C", "D", "E"]).await?;

    let spending = [
        (0, 12345, "2024-06-01"),
        (1, 999, "2024-06-02"),
        (1, 4001, "2024-06-03"),
        (3, 25000, "2024-06-04"),
        (4, 1, "2024-06-05"),
        (0, 7777, "2024-06-09"),
    ];
    for (payer, amount, on) in spending {
        service
            .add_expense(fx.owner.id, fx.trip.id, expense(amount, on, fx.id(payer)))
            .await?;
    }

    let summary = service.summary(fx.owner.id, fx.trip.id).await?;
    assert_eq!(summary.balance_sum(), 0);
    assert_eq!(summary.total_amount, 50123);

    let settlement = service.settlement(fx.owner.id, fx.trip.id).await?;
    assert!(settlement.payments.len() <= fx.participants.len() - 1);
    assert!(settlement.payments.iter().all(|p| p.amount > 0));

    let owed: i64 = summary
        .participants
        .iter()
        .map(|p| p.balance.max(0))
        .sum();
    let paid: i64 = settlement.payments.iter().map(|p| p.amount).sum();
    assert_eq!(owed, paid);

    for (_, balance) in apply_payments(&summary, &settlement.payments) {
        assert_eq!(balance, 0);
    }

    Ok(())
}
