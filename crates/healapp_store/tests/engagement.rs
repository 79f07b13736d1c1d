use chrono::{NaiveDate, NaiveDateTime};
use healapp_store::model::account::{Role, User, UserId};
use healapp_store::model::engagement::{
    Consultation, ConsultationStatus, Payment, PaymentCard, PaymentMethod, PaymentStatus,
    ServiceRef,
};
use healapp_store::repo::{
    ConsultationRepository, PaymentCardRepository, PaymentRepository, RoleRepository,
    SqliteConsultationRepository, SqlitePaymentCardRepository, SqlitePaymentRepository,
    SqliteRoleRepository, SqliteUserRepository, UserRepository,
};
use healapp_store::{open_db_in_memory, Accessor, ConstraintKind, DbError, RepoError};
use rusqlite::Connection;

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn users(conn: &Connection, usernames: &[&str]) -> Vec<UserId> {
    let role_id = SqliteRoleRepository::try_new(conn)
        .unwrap()
        .create(&Role::new("CUSTOMER"))
        .unwrap();
    let repo = SqliteUserRepository::try_new(conn).unwrap();
    usernames
        .iter()
        .map(|name| {
            repo.create(&User::new(
                *name,
                format!("{name}@example.com"),
                "Test Person",
                "hash",
                role_id,
            ))
            .unwrap()
        })
        .collect()
}

fn card(user_id: UserId, number: &str) -> PaymentCard {
    PaymentCard::new(user_id, number, "NGUYEN LAN", "08", "2029")
}

#[test]
fn consultations_in_range_are_ordered_by_start() {
    let conn = open_db_in_memory().unwrap();
    let ids = users(&conn, &["cust.a", "cust.b", "dr.c"]);
    let (alice, bob, doctor) = (ids[0], ids[1], ids[2]);
    let repo = SqliteConsultationRepository::try_new(&conn).unwrap();

    repo.create(&Consultation::new(bob, doctor, at(3, 14), at(3, 15))).unwrap();
    let first = repo
        .create(&Consultation::new(alice, doctor, at(3, 9), at(3, 10)))
        .unwrap();
    let mut later = Consultation::new(alice, doctor, at(10, 9), at(10, 10));
    later.status = ConsultationStatus::Confirmed;
    repo.create(&later).unwrap();

    let week = repo
        .find_by_consultant_in_range(doctor, at(1, 0), at(7, 23))
        .unwrap();
    assert_eq!(week.len(), 2);
    assert_eq!(week[0].id, first);
    assert!(week[0].start_time < week[1].start_time);

    let boundary = repo
        .find_by_consultant_in_range(doctor, at(3, 9), at(3, 9))
        .unwrap();
    assert_eq!(boundary.len(), 1);

    assert_eq!(repo.find_by_user_involved(doctor).unwrap().len(), 3);
    assert_eq!(repo.find_by_user_involved(bob).unwrap().len(), 1);
    assert_eq!(
        repo.find_by_customer_and_status(alice, ConsultationStatus::Confirmed)
            .unwrap()
            .len(),
        1
    );
    assert_eq!(
        repo.find_by_consultant_and_status(doctor, ConsultationStatus::Pending)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn consultation_ending_before_start_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let ids = users(&conn, &["cust.d", "dr.e"]);
    let repo = SqliteConsultationRepository::try_new(&conn).unwrap();

    let err = repo
        .create(&Consultation::new(ids[0], ids[1], at(5, 10), at(5, 9)))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert!(repo.find_by_customer(ids[0]).unwrap().is_empty());
}

#[test]
fn payments_are_looked_up_by_service_and_gateway_reference() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePaymentRepository::try_new(&conn).unwrap();
    let service = ServiceRef::StiTest(11);

    let mut failed = Payment::new(3, service, PaymentMethod::Visa, 450_000);
    failed.status = PaymentStatus::Failed;
    failed.created_at = at(1, 8);
    failed.stripe_payment_intent_id = Some("pi_001".to_string());
    repo.create(&failed).unwrap();

    let mut retry = Payment::new(3, service, PaymentMethod::QrCode, 450_000);
    retry.created_at = at(1, 9);
    retry.qr_payment_reference = Some("QR-2024-0001".to_string());
    let retry_id = repo.create(&retry).unwrap();

    repo.create(&Payment::new(3, ServiceRef::Consultation(11), PaymentMethod::Cod, 200_000))
        .unwrap();

    let newest = repo.find_by_service(service).unwrap().unwrap();
    assert_eq!(newest.id, retry_id);
    assert_eq!(newest.service, service);
    assert_eq!(repo.find_all_by_service(service).unwrap().len(), 2);

    assert_eq!(
        repo.find_by_stripe_payment_intent("pi_001")
            .unwrap()
            .unwrap()
            .status,
        PaymentStatus::Failed
    );
    assert_eq!(
        repo.find_by_qr_reference("QR-2024-0001").unwrap().unwrap().id,
        retry_id
    );
    assert!(repo.find_by_transaction_id("missing").unwrap().is_none());

    let pending = repo.find_pending_for_user_and_service(3, service).unwrap();
    assert_eq!(pending.iter().map(|p| p.id).collect::<Vec<_>>(), vec![retry_id]);
}

#[test]
fn expiry_and_revenue_queries_respect_bounds() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePaymentRepository::try_new(&conn).unwrap();

    for (day, amount, status) in [
        (2, 100_000, PaymentStatus::Completed),
        (4, 250_000, PaymentStatus::Completed),
        (4, 999_000, PaymentStatus::Refunded),
    ] {
        let mut payment = Payment::new(8, ServiceRef::StiPackage(1), PaymentMethod::Visa, amount);
        payment.status = status;
        payment.created_at = at(day, 12);
        repo.create(&payment).unwrap();
    }

    let mut stale = Payment::new(8, ServiceRef::StiService(2), PaymentMethod::QrCode, 50_000);
    stale.expires_at = Some(at(5, 0));
    repo.create(&stale).unwrap();

    assert_eq!(
        repo.sum_amount_by_status_since(PaymentStatus::Completed, at(1, 0))
            .unwrap(),
        350_000
    );
    assert_eq!(
        repo.sum_amount_by_status_since(PaymentStatus::Completed, at(4, 12))
            .unwrap(),
        250_000
    );
    assert_eq!(
        repo.sum_amount_by_status_since(PaymentStatus::Expired, at(1, 0))
            .unwrap(),
        0
    );
    assert_eq!(
        repo.count_by_status_since(PaymentStatus::Completed, at(3, 0))
            .unwrap(),
        1
    );

    let expiring = repo
        .find_by_status_expiring_before(PaymentStatus::Pending, at(6, 0))
        .unwrap();
    assert_eq!(expiring.len(), 1);
    assert!(repo
        .find_by_status_expiring_before(PaymentStatus::Pending, at(5, 0))
        .unwrap()
        .is_empty());
    assert_eq!(
        repo.find_by_method_status_expiring_after(
            PaymentMethod::QrCode,
            PaymentStatus::Pending,
            at(4, 0)
        )
        .unwrap()
        .len(),
        1
    );
    assert_eq!(
        repo.find_by_method_and_status(PaymentMethod::Visa, PaymentStatus::Completed)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn set_default_card_leaves_exactly_one_default() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePaymentCardRepository::try_new(&conn).unwrap();

    let mut first = card(5, "4111111111111111");
    first.is_default = true;
    let first_id = repo.create(&first).unwrap();
    let second_id = repo.create(&card(5, "5500000000000004")).unwrap();
    let other_user = repo.create(&card(6, "4111111111111111")).unwrap();
    repo.set_default_card(6, other_user).unwrap();

    repo.set_default_card(5, second_id).unwrap();

    let default = repo.find_default_for_user(5).unwrap().unwrap();
    assert_eq!(default.id, second_id);
    let active = repo.find_active_by_user(5).unwrap();
    assert_eq!(active.iter().filter(|c| c.is_default).count(), 1);
    assert_eq!(active[0].id, second_id);
    assert_eq!(
        repo.find_active_for_user(first_id, 5)
            .unwrap()
            .map(|c| c.is_default),
        Some(false)
    );
    assert!(repo.has_default_card(6).unwrap());
}

#[test]
fn set_default_card_for_foreign_card_fails_and_keeps_current_default() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePaymentCardRepository::try_new(&conn).unwrap();

    let mut mine = card(5, "4111111111111111");
    mine.is_default = true;
    let mine_id = repo.create(&mine).unwrap();
    let theirs = repo.create(&card(6, "5500000000000004")).unwrap();

    let err = repo.set_default_card(5, theirs).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { id, .. } if id == theirs));
    assert_eq!(repo.find_default_for_user(5).unwrap().unwrap().id, mine_id);
}

#[test]
fn set_default_card_joins_caller_transaction() {
    let conn = open_db_in_memory().unwrap();
    {
        let repo = SqlitePaymentCardRepository::try_new(&conn).unwrap();
        let mut first = card(5, "4111111111111111");
        first.is_default = true;
        repo.create(&first).unwrap();
    }

    let tx = conn.unchecked_transaction().unwrap();
    let second_id = {
        let repo = SqlitePaymentCardRepository::try_new(&tx).unwrap();
        let second_id = repo.create(&card(5, "5500000000000004")).unwrap();
        repo.set_default_card(5, second_id).unwrap();
        assert_eq!(repo.find_default_for_user(5).unwrap().unwrap().id, second_id);
        second_id
    };
    tx.rollback().unwrap();

    let repo = SqlitePaymentCardRepository::try_new(&conn).unwrap();
    assert!(repo.find_by_id(second_id).unwrap().is_none());
    assert_eq!(repo.count_active_by_user(5).unwrap(), 1);
    assert!(repo.has_default_card(5).unwrap());
}

#[test]
fn failed_set_default_card_inside_caller_transaction_keeps_default() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePaymentCardRepository::try_new(&conn).unwrap();
    let mut first = card(5, "4111111111111111");
    first.is_default = true;
    let first_id = repo.create(&first).unwrap();

    let tx = conn.unchecked_transaction().unwrap();
    let pending_id = {
        let repo = SqlitePaymentCardRepository::try_new(&tx).unwrap();
        let pending_id = repo.create(&card(5, "5500000000000004")).unwrap();
        let err = repo.set_default_card(5, 999).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { id: 999, .. }));
        assert!(repo.has_default_card(5).unwrap());
        assert!(!tx.is_autocommit());
        pending_id
    };
    tx.commit().unwrap();

    assert_eq!(repo.find_default_for_user(5).unwrap().unwrap().id, first_id);
    assert!(repo.find_by_id(pending_id).unwrap().is_some());
}

#[test]
fn reset_default_cards_skips_inactive_cards() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePaymentCardRepository::try_new(&conn).unwrap();

    let mut retired = card(5, "4111111111111111");
    retired.is_default = true;
    retired.is_active = false;
    let retired_id = repo.create(&retired).unwrap();
    let mut current = card(5, "5500000000000004");
    current.is_default = true;
    repo.create(&current).unwrap();

    assert_eq!(repo.reset_default_cards(5).unwrap(), 1);
    assert!(!repo.has_default_card(5).unwrap());
    let untouched = repo.find_by_id(retired_id).unwrap().unwrap();
    assert!(untouched.is_default);
    assert_eq!(untouched.updated_at, retired.updated_at);
}

#[test]
fn second_default_card_violates_unique_index() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePaymentCardRepository::try_new(&conn).unwrap();

    let mut first = card(5, "4111111111111111");
    first.is_default = true;
    repo.create(&first).unwrap();
    let mut second = card(5, "5500000000000004");
    second.is_default = true;

    let err = repo.create(&second).unwrap_err();
    assert_eq!(
        err.db_error().and_then(DbError::constraint_kind),
        Some(ConstraintKind::Unique)
    );

    assert_eq!(repo.reset_default_cards(5).unwrap(), 1);
    assert!(!repo.has_default_card(5).unwrap());
    repo.create(&second).unwrap();
    assert!(repo.has_default_card(5).unwrap());
}

#[test]
fn card_number_lookups_are_scoped_to_active_cards_of_user() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePaymentCardRepository::try_new(&conn).unwrap();

    let mut retired = card(5, "4111111111111111");
    retired.is_active = false;
    repo.create(&retired).unwrap();
    repo.create(&card(6, "4111111111111111")).unwrap();

    assert!(!repo.exists_active_card_number(5, "4111111111111111").unwrap());
    assert!(repo.exists_active_card_number(6, "4111111111111111").unwrap());
    assert!(repo
        .find_active_by_card_number(5, "4111111111111111")
        .unwrap()
        .is_none());
    assert_eq!(repo.count_active_by_user(5).unwrap(), 0);

    let err = repo.create(&card(5, "4111-1111")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}
