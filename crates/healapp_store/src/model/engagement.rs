//! Consultations, payments and saved payment cards.
//!
//! # Invariants
//! - A consultation never ends before it starts.
//! - A payment's `(service_type, service_id)` is a polymorphic reference, not a foreign key.
//! - Amounts are integers in the currency's smallest unit.
//! - A user has at most one active default card.

use super::account::UserId;
use super::{
    db_enum, limit_chars, read_enum, read_flag, require_match, require_ordered, require_range,
    require_text, ValidationError,
};
use crate::query::{entity_fields, Entity};
use crate::repo::RepoResult;
use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type ConsultationId = i64;
pub type PaymentId = i64;
pub type PaymentCardId = i64;

static CARD_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{16}$").expect("invalid static regex"));
static EXPIRY_MONTH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])$").expect("invalid static regex"));
static EXPIRY_YEAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}$").expect("invalid static regex"));

db_enum! {
    ConsultationStatus {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Canceled => "CANCELED",
        Completed => "COMPLETED",
    }
}

db_enum! {
    PaymentMethod {
        /// Cash on delivery.
        Cod => "COD",
        Visa => "VISA",
        QrCode => "QR_CODE",
    }
}

db_enum! {
    PaymentStatus {
        Pending => "PENDING",
        Processing => "PROCESSING",
        Completed => "COMPLETED",
        Failed => "FAILED",
        Expired => "EXPIRED",
        Cancelled => "CANCELLED",
        Refunded => "REFUNDED",
    }
}

db_enum! {
    /// Discriminator of [`ServiceRef`].
    ServiceType {
        StiTest => "STI",
        StiService => "STI_SERVICE",
        StiPackage => "STI_PACKAGE",
        Consultation => "CONSULTATION",
    }
}

/// What a payment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceRef {
    #[serde(rename = "STI")]
    StiTest(i64),
    StiService(i64),
    StiPackage(i64),
    Consultation(i64),
}

impl ServiceRef {
    pub fn new(service_type: ServiceType, id: i64) -> Self {
        match service_type {
            ServiceType::StiTest => Self::StiTest(id),
            ServiceType::StiService => Self::StiService(id),
            ServiceType::StiPackage => Self::StiPackage(id),
            ServiceType::Consultation => Self::Consultation(id),
        }
    }

    pub fn service_type(self) -> ServiceType {
        match self {
            Self::StiTest(_) => ServiceType::StiTest,
            Self::StiService(_) => ServiceType::StiService,
            Self::StiPackage(_) => ServiceType::StiPackage,
            Self::Consultation(_) => ServiceType::Consultation,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Self::StiTest(id) | Self::StiService(id) | Self::StiPackage(id) | Self::Consultation(id) => {
                id
            }
        }
    }
}

/// Booked session between a customer and a consultant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: ConsultationId,
    pub customer_id: UserId,
    pub consultant_id: UserId,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: ConsultationStatus,
    pub meet_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl Consultation {
    pub fn new(
        customer_id: UserId,
        consultant_id: UserId,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> Self {
        Self {
            id: 0,
            customer_id,
            consultant_id,
            start_time,
            end_time,
            status: ConsultationStatus::Pending,
            meet_url: None,
            created_at: Local::now().naive_local(),
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_ordered("start_time", &self.start_time, "end_time", &self.end_time)
    }
}

entity_fields! {
    ConsultationField {
        Id => "consultation_id",
        CustomerId => "customer_id",
        ConsultantId => "consultant_id",
        StartTime => "start_time",
        EndTime => "end_time",
        Status => "status",
        CreatedAt => "created_at",
    }
}

impl Entity for Consultation {
    type Field = ConsultationField;
    const NAME: &'static str = "consultation";
    const TABLE: &'static str = "consultations";
    const PRIMARY_KEY: &'static str = "consultation_id";
    const COLUMNS: &'static [&'static str] = &[
        "consultation_id",
        "customer_id",
        "consultant_id",
        "start_time",
        "end_time",
        "status",
        "meet_url",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("consultation_id")?,
            customer_id: row.get("customer_id")?,
            consultant_id: row.get("consultant_id")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            status: read_enum(row, Self::TABLE, "status")?,
            meet_url: row.get("meet_url")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Payment attempt for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub service: ServiceRef,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub amount: i64,
    /// ISO 4217 code, `VND` unless stated.
    pub currency: String,
    pub stripe_payment_intent_id: Option<String>,
    pub qr_payment_reference: Option<String>,
    pub qr_code_url: Option<String>,
    pub transaction_id: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub paid_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
    pub refund_id: Option<String>,
    pub refunded_at: Option<NaiveDateTime>,
    pub refund_amount: Option<i64>,
}

impl Payment {
    pub fn new(user_id: UserId, service: ServiceRef, method: PaymentMethod, amount: i64) -> Self {
        let now = Local::now().naive_local();
        Self {
            id: 0,
            user_id,
            service,
            method,
            status: PaymentStatus::Pending,
            amount,
            currency: "VND".to_string(),
            stripe_payment_intent_id: None,
            qr_payment_reference: None,
            qr_code_url: None,
            transaction_id: None,
            description: None,
            notes: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
            expires_at: None,
            refund_id: None,
            refunded_at: None,
            refund_amount: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_range("amount", self.amount, 0, i64::MAX)?;
        if let Some(refund) = self.refund_amount {
            require_range("refund_amount", refund, 0, self.amount)?;
        }
        require_text("currency", &self.currency)?;
        limit_chars("currency", Some(&self.currency), 3)
    }
}

entity_fields! {
    PaymentField {
        Id => "payment_id",
        UserId => "user_id",
        ServiceType => "service_type",
        ServiceId => "service_id",
        Method => "payment_method",
        Status => "payment_status",
        Amount => "amount",
        StripePaymentIntentId => "stripe_payment_intent_id",
        QrPaymentReference => "qr_payment_reference",
        TransactionId => "transaction_id",
        CreatedAt => "created_at",
        PaidAt => "paid_at",
        ExpiresAt => "expires_at",
    }
}

impl Entity for Payment {
    type Field = PaymentField;
    const NAME: &'static str = "payment";
    const TABLE: &'static str = "payments";
    const PRIMARY_KEY: &'static str = "payment_id";
    const COLUMNS: &'static [&'static str] = &[
        "payment_id",
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
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let service_type: ServiceType = read_enum(row, Self::TABLE, "service_type")?;
        Ok(Self {
            id: row.get("payment_id")?,
            user_id: row.get("user_id")?,
            service: ServiceRef::new(service_type, row.get("service_id")?),
            method: read_enum(row, Self::TABLE, "payment_method")?,
            status: read_enum(row, Self::TABLE, "payment_status")?,
            amount: row.get("amount")?,
            currency: row.get("currency")?,
            stripe_payment_intent_id: row.get("stripe_payment_intent_id")?,
            qr_payment_reference: row.get("qr_payment_reference")?,
            qr_code_url: row.get("qr_code_url")?,
            transaction_id: row.get("transaction_id")?,
            description: row.get("description")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            paid_at: row.get("paid_at")?,
            expires_at: row.get("expires_at")?,
            refund_id: row.get("refund_id")?,
            refunded_at: row.get("refunded_at")?,
            refund_amount: row.get("refund_amount")?,
        })
    }
}

/// Saved card. The security code is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCard {
    pub id: PaymentCardId,
    pub user_id: UserId,
    pub card_number: String,
    pub card_holder_name: String,
    /// `01`..`12`.
    pub expiry_month: String,
    pub expiry_year: String,
    pub card_type: Option<String>,
    pub nickname: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PaymentCard {
    pub fn new(
        user_id: UserId,
        card_number: impl Into<String>,
        card_holder_name: impl Into<String>,
        expiry_month: impl Into<String>,
        expiry_year: impl Into<String>,
    ) -> Self {
        let now = Local::now().naive_local();
        Self {
            id: 0,
            user_id,
            card_number: card_number.into(),
            card_holder_name: card_holder_name.into(),
            expiry_month: expiry_month.into(),
            expiry_year: expiry_year.into(),
            card_type: None,
            nickname: None,
            is_default: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_match(
            "card_number",
            &self.card_number,
            &CARD_NUMBER_PATTERN,
            "16 digits",
        )?;
        require_text("card_holder_name", &self.card_holder_name)?;
        limit_chars("card_holder_name", Some(&self.card_holder_name), 100)?;
        require_match(
            "expiry_month",
            &self.expiry_month,
            &EXPIRY_MONTH_PATTERN,
            "`01` to `12`",
        )?;
        require_match(
            "expiry_year",
            &self.expiry_year,
            &EXPIRY_YEAR_PATTERN,
            "4 digits",
        )?;
        limit_chars("card_type", self.card_type.as_deref(), 20)?;
        limit_chars("nickname", self.nickname.as_deref(), 50)
    }

    /// Last four digits, for display.
    pub fn last_four(&self) -> &str {
        let len = self.card_number.len();
        self.card_number.get(len.saturating_sub(4)..).unwrap_or("")
    }
}

entity_fields! {
    PaymentCardField {
        Id => "payment_info_id",
        UserId => "user_id",
        CardNumber => "card_number",
        IsDefault => "is_default",
        IsActive => "is_active",
        CreatedAt => "created_at",
        UpdatedAt => "updated_at",
    }
}

impl Entity for PaymentCard {
    type Field = PaymentCardField;
    const NAME: &'static str = "payment card";
    const TABLE: &'static str = "payment_cards";
    const PRIMARY_KEY: &'static str = "payment_info_id";
    const COLUMNS: &'static [&'static str] = &[
        "payment_info_id",
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
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("payment_info_id")?,
            user_id: row.get("user_id")?,
            card_number: row.get("card_number")?,
            card_holder_name: row.get("card_holder_name")?,
            expiry_month: row.get("expiry_month")?,
            expiry_year: row.get("expiry_year")?,
            card_type: row.get("card_type")?,
            nickname: row.get("nickname")?,
            is_default: read_flag(row, Self::TABLE, "is_default")?,
            is_active: read_flag(row, Self::TABLE, "is_active")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}
