//! Consultation, payment and payment-card accessors.
//!
//! # Invariants
//! - Payment lookups by service always match both discriminator and id.
//! - `set_default_card` leaves exactly one default active card for the user.

use super::{expect_one, sqlite_accessor, Accessor, RepoResult};
use crate::model::account::UserId;
use crate::model::engagement::{
    Consultation, ConsultationField, ConsultationId, ConsultationStatus, Payment, PaymentCard,
    PaymentCardField, PaymentCardId, PaymentField, PaymentId, PaymentMethod, PaymentStatus,
    ServiceRef,
};
use crate::query::{Executor, Filter, IntoValue, Sort};
use chrono::{Local, NaiveDateTime};
use log::info;
use rusqlite::params;

/// Consultation bookings. Every lookup is an unpaged bounded list.
pub trait ConsultationRepository {
    fn create(&self, consultation: &Consultation) -> RepoResult<ConsultationId>;
    fn find_by_customer(&self, customer_id: UserId) -> RepoResult<Vec<Consultation>>;
    fn find_by_consultant(&self, consultant_id: UserId) -> RepoResult<Vec<Consultation>>;
    fn find_by_status(&self, status: ConsultationStatus) -> RepoResult<Vec<Consultation>>;
    fn find_by_customer_and_status(
        &self,
        customer_id: UserId,
        status: ConsultationStatus,
    ) -> RepoResult<Vec<Consultation>>;
    fn find_by_consultant_and_status(
        &self,
        consultant_id: UserId,
        status: ConsultationStatus,
    ) -> RepoResult<Vec<Consultation>>;
    /// Consultations starting within `[start, end]`, earliest first.
    fn find_by_consultant_in_range(
        &self,
        consultant_id: UserId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> RepoResult<Vec<Consultation>>;
    /// Consultations where `user_id` is the customer or the consultant.
    fn find_by_user_involved(&self, user_id: UserId) -> RepoResult<Vec<Consultation>>;
}

sqlite_accessor! {
    /// SQLite-backed consultation accessor.
    SqliteConsultationRepository => Consultation
}

impl ConsultationRepository for SqliteConsultationRepository<'_> {
    fn create(&self, consultation: &Consultation) -> RepoResult<ConsultationId> {
        consultation.validate()?;
        self.executor().insert::<Consultation>(
            &[
                "customer_id",
                "consultant_id",
                "start_time",
                "end_time",
                "status",
                "meet_url",
                "created_at",
                "updated_at",
            ],
            params![
                consultation.customer_id,
                consultation.consultant_id,
                consultation.start_time,
                consultation.end_time,
                consultation.status,
                consultation.meet_url,
                consultation.created_at,
                consultation.updated_at,
            ],
        )
    }

    fn find_by_customer(&self, customer_id: UserId) -> RepoResult<Vec<Consultation>> {
        self.find_all(&Filter::eq(ConsultationField::CustomerId, customer_id), &[])
    }

    fn find_by_consultant(&self, consultant_id: UserId) -> RepoResult<Vec<Consultation>> {
        self.find_all(
            &Filter::eq(ConsultationField::ConsultantId, consultant_id),
            &[],
        )
    }

    fn find_by_status(&self, status: ConsultationStatus) -> RepoResult<Vec<Consultation>> {
        self.find_all(&Filter::eq(ConsultationField::Status, status), &[])
    }

    fn find_by_customer_and_status(
        &self,
        customer_id: UserId,
        status: ConsultationStatus,
    ) -> RepoResult<Vec<Consultation>> {
        let filter = Filter::eq(ConsultationField::CustomerId, customer_id)
            .and(Filter::eq(ConsultationField::Status, status));
        self.find_all(&filter, &[])
    }

    fn find_by_consultant_and_status(
        &self,
        consultant_id: UserId,
        status: ConsultationStatus,
    ) -> RepoResult<Vec<Consultation>> {
        let filter = Filter::eq(ConsultationField::ConsultantId, consultant_id)
            .and(Filter::eq(ConsultationField::Status, status));
        self.find_all(&filter, &[])
    }

    fn find_by_consultant_in_range(
        &self,
        consultant_id: UserId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> RepoResult<Vec<Consultation>> {
        let filter = Filter::eq(ConsultationField::ConsultantId, consultant_id)
            .and(Filter::between(ConsultationField::StartTime, start, end));
        self.find_all(&filter, &[Sort::asc(ConsultationField::StartTime)])
    }

    fn find_by_user_involved(&self, user_id: UserId) -> RepoResult<Vec<Consultation>> {
        let filter = Filter::eq(ConsultationField::CustomerId, user_id)
            .or(Filter::eq(ConsultationField::ConsultantId, user_id));
        self.find_all(&filter, &[])
    }
}

/// Payment records and their external gateway references.
pub trait PaymentRepository {
    fn create(&self, payment: &Payment) -> RepoResult<PaymentId>;
    /// Newest payment for `service`.
    fn find_by_service(&self, service: ServiceRef) -> RepoResult<Option<Payment>>;
    fn find_all_by_service(&self, service: ServiceRef) -> RepoResult<Vec<Payment>>;
    fn find_by_user(&self, user_id: UserId) -> RepoResult<Vec<Payment>>;
    fn find_by_user_and_status(
        &self,
        user_id: UserId,
        status: PaymentStatus,
    ) -> RepoResult<Vec<Payment>>;
    fn find_by_method_and_status(
        &self,
        method: PaymentMethod,
        status: PaymentStatus,
    ) -> RepoResult<Vec<Payment>>;
    fn find_by_status(&self, status: PaymentStatus) -> RepoResult<Vec<Payment>>;
    /// Payments in `status` whose expiry is strictly before `before`.
    fn find_by_status_expiring_before(
        &self,
        status: PaymentStatus,
        before: NaiveDateTime,
    ) -> RepoResult<Vec<Payment>>;
    fn find_by_stripe_payment_intent(&self, intent_id: &str) -> RepoResult<Option<Payment>>;
    fn find_by_qr_reference(&self, reference: &str) -> RepoResult<Option<Payment>>;
    fn find_by_transaction_id(&self, transaction_id: &str) -> RepoResult<Option<Payment>>;
    /// Payments with `method` and `status` whose expiry is strictly after `after`.
    fn find_by_method_status_expiring_after(
        &self,
        method: PaymentMethod,
        status: PaymentStatus,
        after: NaiveDateTime,
    ) -> RepoResult<Vec<Payment>>;
    fn count_by_status_since(&self, status: PaymentStatus, from: NaiveDateTime)
        -> RepoResult<u64>;
    /// Total amount of payments in `status` created at or after `from`.
    fn sum_amount_by_status_since(
        &self,
        status: PaymentStatus,
        from: NaiveDateTime,
    ) -> RepoResult<i64>;
    fn find_pending_for_user_and_service(
        &self,
        user_id: UserId,
        service: ServiceRef,
    ) -> RepoResult<Vec<Payment>>;
}

sqlite_accessor! {
    /// SQLite-backed payment accessor.
    SqlitePaymentRepository => Payment
}

fn service_filter(service: ServiceRef) -> Filter<PaymentField> {
    Filter::eq(PaymentField::ServiceType, service.service_type())
        .and(Filter::eq(PaymentField::ServiceId, service.id()))
}

fn status_since(status: PaymentStatus, from: NaiveDateTime) -> Filter<PaymentField> {
    Filter::eq(PaymentField::Status, status).and(Filter::ge(PaymentField::CreatedAt, from))
}

fn newest_payments() -> [Sort<PaymentField>; 1] {
    [Sort::desc(PaymentField::CreatedAt)]
}

impl PaymentRepository for SqlitePaymentRepository<'_> {
    fn create(&self, payment: &Payment) -> RepoResult<PaymentId> {
        payment.validate()?;
        self.executor().insert::<Payment>(
            &[
                "user_id",
                "service_type",
                "service_id",
                "payment_method",
                "payment_status",
                "amount",
                "currency",
                "stripe_payment_intent_id",
                "qr_payment_reference",
                "qr_code_url",
                "transaction_id",
                "description",
                "notes",
                "created_at",
                "updated_at",
                "paid_at",
                "expires_at",
                "refund_id",
                "refunded_at",
                "refund_amount",
            ],
            params![
                payment.user_id,
                payment.service.service_type(),
                payment.service.id(),
                payment.method,
                payment.status,
                payment.amount,
                payment.currency,
                payment.stripe_payment_intent_id,
                payment.qr_payment_reference,
                payment.qr_code_url,
                payment.transaction_id,
                payment.description,
                payment.notes,
                payment.created_at,
                payment.updated_at,
                payment.paid_at,
                payment.expires_at,
                payment.refund_id,
                payment.refunded_at,
                payment.refund_amount,
            ],
        )
    }

    fn find_by_service(&self, service: ServiceRef) -> RepoResult<Option<Payment>> {
        self.find_first(&service_filter(service), &newest_payments())
    }

    fn find_all_by_service(&self, service: ServiceRef) -> RepoResult<Vec<Payment>> {
        self.find_all(&service_filter(service), &newest_payments())
    }

    fn find_by_user(&self, user_id: UserId) -> RepoResult<Vec<Payment>> {
        self.find_all(&Filter::eq(PaymentField::UserId, user_id), &newest_payments())
    }

    fn find_by_user_and_status(
        &self,
        user_id: UserId,
        status: PaymentStatus,
    ) -> RepoResult<Vec<Payment>> {
        let filter = Filter::eq(PaymentField::UserId, user_id)
            .and(Filter::eq(PaymentField::Status, status));
        self.find_all(&filter, &newest_payments())
    }

    fn find_by_method_and_status(
        &self,
        method: PaymentMethod,
        status: PaymentStatus,
    ) -> RepoResult<Vec<Payment>> {
        let filter = Filter::eq(PaymentField::Method, method)
            .and(Filter::eq(PaymentField::Status, status));
        self.find_all(&filter, &[])
    }

    fn find_by_status(&self, status: PaymentStatus) -> RepoResult<Vec<Payment>> {
        self.find_all(&Filter::eq(PaymentField::Status, status), &[])
    }

    fn find_by_status_expiring_before(
        &self,
        status: PaymentStatus,
        before: NaiveDateTime,
    ) -> RepoResult<Vec<Payment>> {
        let filter = Filter::eq(PaymentField::Status, status)
            .and(Filter::lt(PaymentField::ExpiresAt, before));
        self.find_all(&filter, &[Sort::asc(PaymentField::ExpiresAt)])
    }

    fn find_by_stripe_payment_intent(&self, intent_id: &str) -> RepoResult<Option<Payment>> {
        self.find_first(
            &Filter::eq(PaymentField::StripePaymentIntentId, intent_id),
            &[],
        )
    }

    fn find_by_qr_reference(&self, reference: &str) -> RepoResult<Option<Payment>> {
        self.find_first(&Filter::eq(PaymentField::QrPaymentReference, reference), &[])
    }

    fn find_by_transaction_id(&self, transaction_id: &str) -> RepoResult<Option<Payment>> {
        self.find_first(&Filter::eq(PaymentField::TransactionId, transaction_id), &[])
    }

    fn find_by_method_status_expiring_after(
        &self,
        method: PaymentMethod,
        status: PaymentStatus,
        after: NaiveDateTime,
    ) -> RepoResult<Vec<Payment>> {
        let filter = Filter::eq(PaymentField::Method, method)
            .and(Filter::eq(PaymentField::Status, status))
            .and(Filter::gt(PaymentField::ExpiresAt, after));
        self.find_all(&filter, &[])
    }

    fn count_by_status_since(
        &self,
        status: PaymentStatus,
        from: NaiveDateTime,
    ) -> RepoResult<u64> {
        self.count(&status_since(status, from))
    }

    fn sum_amount_by_status_since(
        &self,
        status: PaymentStatus,
        from: NaiveDateTime,
    ) -> RepoResult<i64> {
        self.executor()
            .sum::<Payment>(PaymentField::Amount, &status_since(status, from))
    }

    fn find_pending_for_user_and_service(
        &self,
        user_id: UserId,
        service: ServiceRef,
    ) -> RepoResult<Vec<Payment>> {
        let filter = Filter::eq(PaymentField::UserId, user_id)
            .and(service_filter(service))
            .and(Filter::eq(PaymentField::Status, PaymentStatus::Pending));
        self.find_all(&filter, &newest_payments())
    }
}

/// Saved payment cards of a user.
pub trait PaymentCardRepository {
    fn create(&self, card: &PaymentCard) -> RepoResult<PaymentCardId>;
    /// Active cards, the default first, then newest first.
    fn find_active_by_user(&self, user_id: UserId) -> RepoResult<Vec<PaymentCard>>;
    fn find_default_for_user(&self, user_id: UserId) -> RepoResult<Option<PaymentCard>>;
    fn has_default_card(&self, user_id: UserId) -> RepoResult<bool>;
    fn find_active_for_user(
        &self,
        card_id: PaymentCardId,
        user_id: UserId,
    ) -> RepoResult<Option<PaymentCard>>;
    fn count_active_by_user(&self, user_id: UserId) -> RepoResult<u64>;
    /// Clears the default flag on the user's active cards; returns affected rows.
    ///
    /// Inactive cards keep their flag and `updated_at`.
    fn reset_default_cards(&self, user_id: UserId) -> RepoResult<usize>;
    fn exists_active_card_number(&self, user_id: UserId, card_number: &str) -> RepoResult<bool>;
    fn find_active_by_card_number(
        &self,
        user_id: UserId,
        card_number: &str,
    ) -> RepoResult<Option<PaymentCard>>;
    /// Makes `card_id` the only default card of the user.
    ///
    /// Runs in its own transaction, or in a savepoint when the connection already has one open.
    /// Fails with `NotFound` when the card is not an active card of the user.
    fn set_default_card(&self, user_id: UserId, card_id: PaymentCardId) -> RepoResult<()>;
}

sqlite_accessor! {
    /// SQLite-backed payment-card accessor.
    SqlitePaymentCardRepository => PaymentCard
}

fn active_cards_of(user_id: UserId) -> Filter<PaymentCardField> {
    Filter::eq(PaymentCardField::UserId, user_id).and(Filter::eq(PaymentCardField::IsActive, true))
}

fn clear_default(exec: &Executor<'_>, user_id: UserId) -> RepoResult<usize> {
    exec.update_where::<PaymentCard>(
        &[
            (PaymentCardField::IsDefault, false.into_value()),
            (
                PaymentCardField::UpdatedAt,
                Local::now().naive_local().into_value(),
            ),
        ],
        &active_cards_of(user_id).and(Filter::eq(PaymentCardField::IsDefault, true)),
    )
}

impl PaymentCardRepository for SqlitePaymentCardRepository<'_> {
    fn create(&self, card: &PaymentCard) -> RepoResult<PaymentCardId> {
        card.validate()?;
        self.executor().insert::<PaymentCard>(
            &[
                "user_id",
                "card_number",
                "card_holder_name",
                "expiry_month",
                "expiry_year",
                "card_type",
                "nickname",
                "is_default",
                "is_active",
                "created_at",
                "updated_at",
            ],
            params![
                card.user_id,
                card.card_number,
                card.card_holder_name,
                card.expiry_month,
                card.expiry_year,
                card.card_type,
                card.nickname,
                card.is_default,
                card.is_active,
                card.created_at,
                card.updated_at,
            ],
        )
    }

    fn find_active_by_user(&self, user_id: UserId) -> RepoResult<Vec<PaymentCard>> {
        self.find_all(
            &active_cards_of(user_id),
            &[
                Sort::desc(PaymentCardField::IsDefault),
                Sort::desc(PaymentCardField::CreatedAt),
            ],
        )
    }

    fn find_default_for_user(&self, user_id: UserId) -> RepoResult<Option<PaymentCard>> {
        let filter =
            active_cards_of(user_id).and(Filter::eq(PaymentCardField::IsDefault, true));
        self.find_first(&filter, &[])
    }

    fn has_default_card(&self, user_id: UserId) -> RepoResult<bool> {
        let filter =
            active_cards_of(user_id).and(Filter::eq(PaymentCardField::IsDefault, true));
        self.exists(&filter)
    }

    fn find_active_for_user(
        &self,
        card_id: PaymentCardId,
        user_id: UserId,
    ) -> RepoResult<Option<PaymentCard>> {
        let filter = Filter::eq(PaymentCardField::Id, card_id).and(active_cards_of(user_id));
        self.find_first(&filter, &[])
    }

    fn count_active_by_user(&self, user_id: UserId) -> RepoResult<u64> {
        self.count(&active_cards_of(user_id))
    }

    fn reset_default_cards(&self, user_id: UserId) -> RepoResult<usize> {
        clear_default(self.executor(), user_id)
    }

    fn exists_active_card_number(&self, user_id: UserId, card_number: &str) -> RepoResult<bool> {
        let filter = active_cards_of(user_id)
            .and(Filter::eq(PaymentCardField::CardNumber, card_number));
        self.exists(&filter)
    }

    fn find_active_by_card_number(
        &self,
        user_id: UserId,
        card_number: &str,
    ) -> RepoResult<Option<PaymentCard>> {
        let filter = active_cards_of(user_id)
            .and(Filter::eq(PaymentCardField::CardNumber, card_number));
        self.find_first(&filter, &[])
    }

    fn set_default_card(&self, user_id: UserId, card_id: PaymentCardId) -> RepoResult<()> {
        let limits = self.executor().limits();
        self.executor().atomically(|conn| {
            let exec = Executor::new(conn, limits);
            let cleared = clear_default(&exec, user_id)?;
            let changed = exec.update_where::<PaymentCard>(
                &[
                    (PaymentCardField::IsDefault, true.into_value()),
                    (
                        PaymentCardField::UpdatedAt,
                        Local::now().naive_local().into_value(),
                    ),
                ],
                &Filter::eq(PaymentCardField::Id, card_id).and(active_cards_of(user_id)),
            )?;
            expect_one::<PaymentCard>(changed, card_id)?;
            info!(
                "event=default_card_set module=store status=ok user_id={user_id} card_id={card_id} cleared={cleared}"
            );
            Ok(())
        })
    }
}
