//! STI testing catalogue (services, components, packages) and customer test bookings.
//!
//! # Invariants
//! - Prices are non-negative integers in the smallest currency unit.
//! - A package links each service at most once.
//! - A test booking references a service, a package, or neither, never by value copy.

use super::account::UserId;
use super::{
    db_enum, limit_chars, read_enum, read_flag, require_range, require_text, ValidationError,
};
use crate::query::{entity_fields, Entity};
use crate::repo::RepoResult;
use chrono::{Local, NaiveDateTime};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type StiServiceId = i64;
pub type ComponentId = i64;
pub type StiPackageId = i64;
pub type StiTestId = i64;
pub type TestResultId = i64;
pub type ConsultantNoteId = i64;

db_enum! {
    /// Progress of a test booking, from booking to delivered results.
    StiTestStatus {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Sampled => "SAMPLED",
        Resulted => "RESULTED",
        Completed => "COMPLETED",
        Canceled => "CANCELED",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StiService {
    pub id: StiServiceId,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl StiService {
    pub fn new(name: impl Into<String>, price: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            price,
            is_active: true,
            created_at: Local::now().naive_local(),
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_range("price", self.price, 0, i64::MAX)
    }
}

entity_fields! {
    StiServiceField {
        Id => "service_id",
        Name => "name",
        Description => "description",
        Price => "price",
        IsActive => "is_active",
        CreatedAt => "created_at",
    }
}

impl Entity for StiService {
    type Field = StiServiceField;
    const NAME: &'static str = "STI service";
    const TABLE: &'static str = "sti_services";
    const PRIMARY_KEY: &'static str = "service_id";
    const COLUMNS: &'static [&'static str] = &[
        "service_id",
        "name",
        "description",
        "price",
        "is_active",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("service_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            price: row.get("price")?,
            is_active: read_flag(row, Self::TABLE, "is_active")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// One measured value a service reports, e.g. an antibody titre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTestComponent {
    pub id: ComponentId,
    pub service_id: StiServiceId,
    pub test_name: String,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    pub interpretation: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl ServiceTestComponent {
    pub fn new(service_id: StiServiceId, test_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            service_id,
            test_name: test_name.into(),
            unit: None,
            reference_range: None,
            interpretation: None,
            created_at: Local::now().naive_local(),
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_component_text(
            &self.test_name,
            self.unit.as_deref(),
            self.reference_range.as_deref(),
            self.interpretation.as_deref(),
        )
    }
}

/// Replacement values for the editable columns of a component.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentUpdate {
    pub test_name: String,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    pub interpretation: Option<String>,
}

impl ComponentUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_component_text(
            &self.test_name,
            self.unit.as_deref(),
            self.reference_range.as_deref(),
            self.interpretation.as_deref(),
        )
    }
}

fn check_component_text(
    test_name: &str,
    unit: Option<&str>,
    reference_range: Option<&str>,
    interpretation: Option<&str>,
) -> Result<(), ValidationError> {
    require_text("test_name", test_name)?;
    limit_chars("test_name", Some(test_name), 100)?;
    limit_chars("unit", unit, 50)?;
    limit_chars("reference_range", reference_range, 100)?;
    limit_chars("interpretation", interpretation, 200)
}

entity_fields! {
    ServiceTestComponentField {
        Id => "component_id",
        ServiceId => "service_id",
        TestName => "test_name",
    }
}

impl Entity for ServiceTestComponent {
    type Field = ServiceTestComponentField;
    const NAME: &'static str = "test component";
    const TABLE: &'static str = "service_test_components";
    const PRIMARY_KEY: &'static str = "component_id";
    const COLUMNS: &'static [&'static str] = &[
        "component_id",
        "service_id",
        "test_name",
        "unit",
        "reference_range",
        "interpretation",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("component_id")?,
            service_id: row.get("service_id")?,
            test_name: row.get("test_name")?,
            unit: row.get("unit")?,
            reference_range: row.get("reference_range")?,
            interpretation: row.get("interpretation")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// A service together with its components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StiServiceWithComponents {
    pub service: StiService,
    pub components: Vec<ServiceTestComponent>,
}

/// Bundle of services sold at one price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StiPackage {
    pub id: StiPackageId,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl StiPackage {
    pub fn new(name: impl Into<String>, price: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            price,
            is_active: true,
            created_at: Local::now().naive_local(),
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("package_name", &self.name)?;
        require_range("package_price", self.price, 0, i64::MAX)
    }
}

entity_fields! {
    StiPackageField {
        Id => "package_id",
        Name => "package_name",
        Description => "description",
        Price => "package_price",
        IsActive => "is_active",
        CreatedAt => "created_at",
        /// Names of the linked services, separated by U+001F.
        LinkedServiceNames => "(SELECT group_concat(s.name, char(31)) FROM package_services ps JOIN sti_services s ON s.service_id = ps.service_id WHERE ps.package_id = sti_packages.package_id)",
    }
}

impl Entity for StiPackage {
    type Field = StiPackageField;
    const NAME: &'static str = "STI package";
    const TABLE: &'static str = "sti_packages";
    const PRIMARY_KEY: &'static str = "package_id";
    const COLUMNS: &'static [&'static str] = &[
        "package_id",
        "package_name",
        "description",
        "package_price",
        "is_active",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("package_id")?,
            name: row.get("package_name")?,
            description: row.get("description")?,
            price: row.get("package_price")?,
            is_active: read_flag(row, Self::TABLE, "is_active")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// A package together with its linked services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StiPackageWithServices {
    pub package: StiPackage,
    pub services: Vec<StiService>,
}

/// Link row between a package and a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageService {
    pub id: i64,
    pub package_id: StiPackageId,
    pub service_id: StiServiceId,
}

impl PackageService {
    pub fn new(package_id: StiPackageId, service_id: StiServiceId) -> Self {
        Self {
            id: 0,
            package_id,
            service_id,
        }
    }
}

entity_fields! {
    PackageServiceField {
        Id => "id",
        PackageId => "package_id",
        ServiceId => "service_id",
    }
}

impl Entity for PackageService {
    type Field = PackageServiceField;
    const NAME: &'static str = "package service";
    const TABLE: &'static str = "package_services";
    const PRIMARY_KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "package_id", "service_id"];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            package_id: row.get("package_id")?,
            service_id: row.get("service_id")?,
        })
    }
}

/// A customer's booked test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StiTest {
    pub id: StiTestId,
    pub customer_id: UserId,
    pub service_id: Option<StiServiceId>,
    pub package_id: Option<StiPackageId>,
    pub staff_id: Option<UserId>,
    pub consultant_id: Option<UserId>,
    pub appointment_date: NaiveDateTime,
    pub total_price: i64,
    pub customer_notes: Option<String>,
    pub consultant_notes: Option<String>,
    pub result_date: Option<NaiveDateTime>,
    pub status: StiTestStatus,
    pub cancel_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl StiTest {
    pub fn new(customer_id: UserId, appointment_date: NaiveDateTime) -> Self {
        let now = Local::now().naive_local();
        Self {
            id: 0,
            customer_id,
            service_id: None,
            package_id: None,
            staff_id: None,
            consultant_id: None,
            appointment_date,
            total_price: 0,
            customer_notes: None,
            consultant_notes: None,
            result_date: None,
            status: StiTestStatus::Pending,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_range("total_price", self.total_price, 0, i64::MAX)
    }
}

entity_fields! {
    StiTestField {
        Id => "test_id",
        CustomerId => "customer_id",
        ServiceId => "service_id",
        PackageId => "package_id",
        StaffId => "staff_id",
        ConsultantId => "consultant_id",
        AppointmentDate => "appointment_date",
        /// Calendar day of the appointment, `YYYY-MM-DD`.
        AppointmentDay => "date(appointment_date)",
        ConsultantNotes => "consultant_notes",
        ResultDate => "result_date",
        Status => "status",
        CreatedAt => "created_at",
        CreatedYear => "CAST(strftime('%Y', created_at) AS INTEGER)",
        CreatedMonth => "CAST(strftime('%m', created_at) AS INTEGER)",
        UpdatedAt => "updated_at",
    }
}

impl Entity for StiTest {
    type Field = StiTestField;
    const NAME: &'static str = "STI test";
    const TABLE: &'static str = "sti_tests";
    const PRIMARY_KEY: &'static str = "test_id";
    const COLUMNS: &'static [&'static str] = &[
        "test_id",
        "customer_id",
        "service_id",
        "package_id",
        "staff_id",
        "consultant_id",
        "appointment_date",
        "total_price",
        "customer_notes",
        "consultant_notes",
        "result_date",
        "status",
        "cancel_reason",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("test_id")?,
            customer_id: row.get("customer_id")?,
            service_id: row.get("service_id")?,
            package_id: row.get("package_id")?,
            staff_id: row.get("staff_id")?,
            consultant_id: row.get("consultant_id")?,
            appointment_date: row.get("appointment_date")?,
            total_price: row.get("total_price")?,
            customer_notes: row.get("customer_notes")?,
            consultant_notes: row.get("consultant_notes")?,
            result_date: row.get("result_date")?,
            status: read_enum(row, Self::TABLE, "status")?,
            cancel_reason: row.get("cancel_reason")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Measured value of one component within one test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: TestResultId,
    pub test_id: StiTestId,
    pub component_id: ComponentId,
    /// Service the component came from, when the test was a package.
    pub source_service_id: Option<StiServiceId>,
    pub result_value: Option<String>,
    pub normal_range: Option<String>,
    pub unit: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl TestResult {
    pub fn new(test_id: StiTestId, component_id: ComponentId) -> Self {
        Self {
            id: 0,
            test_id,
            component_id,
            source_service_id: None,
            result_value: None,
            normal_range: None,
            unit: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Local::now().naive_local(),
            updated_at: None,
        }
    }
}

entity_fields! {
    TestResultField {
        Id => "result_id",
        TestId => "test_id",
        ComponentId => "component_id",
        SourceServiceId => "source_service_id",
        SourceServiceName => "(SELECT s.name FROM sti_services s WHERE s.service_id = test_results.source_service_id)",
        ComponentName => "(SELECT c.test_name FROM service_test_components c WHERE c.component_id = test_results.component_id)",
    }
}

impl Entity for TestResult {
    type Field = TestResultField;
    const NAME: &'static str = "test result";
    const TABLE: &'static str = "test_results";
    const PRIMARY_KEY: &'static str = "result_id";
    const COLUMNS: &'static [&'static str] = &[
        "result_id",
        "test_id",
        "component_id",
        "source_service_id",
        "result_value",
        "normal_range",
        "unit",
        "reviewed_by",
        "reviewed_at",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("result_id")?,
            test_id: row.get("test_id")?,
            component_id: row.get("component_id")?,
            source_service_id: row.get("source_service_id")?,
            result_value: row.get("result_value")?,
            normal_range: row.get("normal_range")?,
            unit: row.get("unit")?,
            reviewed_by: row.get("reviewed_by")?,
            reviewed_at: row.get("reviewed_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// A consultant's note on one service within a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestServiceConsultantNote {
    pub id: ConsultantNoteId,
    pub test_id: StiTestId,
    pub service_id: StiServiceId,
    pub consultant_id: Option<UserId>,
    pub note: String,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl TestServiceConsultantNote {
    pub fn new(test_id: StiTestId, service_id: StiServiceId, note: impl Into<String>) -> Self {
        Self {
            id: 0,
            test_id,
            service_id,
            consultant_id: None,
            note: note.into(),
            created_at: Local::now().naive_local(),
            updated_at: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("note", &self.note)
    }
}

entity_fields! {
    TestServiceConsultantNoteField {
        Id => "note_id",
        TestId => "test_id",
        ServiceId => "service_id",
        ConsultantId => "consultant_id",
        CreatedAt => "created_at",
    }
}

impl Entity for TestServiceConsultantNote {
    type Field = TestServiceConsultantNoteField;
    const NAME: &'static str = "consultant note";
    const TABLE: &'static str = "test_service_consultant_notes";
    const PRIMARY_KEY: &'static str = "note_id";
    const COLUMNS: &'static [&'static str] = &[
        "note_id",
        "test_id",
        "service_id",
        "consultant_id",
        "note",
        "created_at",
        "updated_at",
    ];

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            id: row.get("note_id")?,
            test_id: row.get("test_id")?,
            service_id: row.get("service_id")?,
            consultant_id: row.get("consultant_id")?,
            note: row.get("note")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ComponentUpdate, StiPackage, StiService};
    use crate::model::ValidationError;

    #[test]
    fn negative_prices_are_rejected() {
        assert!(StiService::new("HIV Ag/Ab", 250_000).validate().is_ok());
        assert!(matches!(
            StiPackage::new("Basic", -1).validate(),
            Err(ValidationError::OutOfRange { field: "package_price", .. })
        ));
    }

    #[test]
    fn component_update_limits_text_lengths() {
        let update = ComponentUpdate {
            test_name: "Anti-HCV".to_string(),
            unit: Some("x".repeat(51)),
            ..ComponentUpdate::default()
        };
        assert_eq!(
            update.validate(),
            Err(ValidationError::TooLong {
                field: "unit",
                max_chars: 50
            })
        );
    }
}
