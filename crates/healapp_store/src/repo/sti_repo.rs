//! STI catalogue and test-booking accessors.
//!
//! # Responsibility
//! - Serve service and package catalogue lookups, including composites with their
//!   components or linked services.
//! - Serve test-booking queues for staff and consultants.
//!
//! # Invariants
//! - Package-to-service lookups go through `package_services` only.
//! - Composite reads issue one statement for the parent and one per child list.

use super::{expect_one, sqlite_accessor, Accessor, RepoError, RepoResult};
use crate::model::account::UserId;
use crate::model::sti::{
    ComponentId, ComponentUpdate, ConsultantNoteId, PackageService, PackageServiceField,
    ServiceTestComponent, ServiceTestComponentField, StiPackage, StiPackageField, StiPackageId,
    StiPackageWithServices, StiService, StiServiceField, StiServiceId, StiServiceWithComponents,
    StiTest, StiTestField, StiTestId, StiTestStatus, TestResult, TestResultField, TestResultId,
    TestServiceConsultantNote, TestServiceConsultantNoteField,
};
use crate::query::{Executor, Filter, Page, PageRequest, Sort};
use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::params;
use rusqlite::types::Value;

const SERVICE_IN_PACKAGE_SQL: &str =
    "service_id IN (SELECT ps.service_id FROM package_services ps WHERE ps.package_id = ?)";
const PACKAGE_HAS_SERVICE_SQL: &str = "EXISTS (
    SELECT 1 FROM package_services ps
    WHERE ps.package_id = sti_packages.package_id AND ps.service_id = ?
)";
const PACKAGE_HAS_ALL_SERVICES_SQL: &str = "(
    SELECT COUNT(DISTINCT ps.service_id) FROM package_services ps
    WHERE ps.package_id = sti_packages.package_id
      AND ps.service_id IN (SELECT value FROM json_each(?))
) = ?";

/// STI service catalogue.
pub trait StiServiceRepository {
    fn create(&self, service: &StiService) -> RepoResult<StiServiceId>;
    fn find_active(&self) -> RepoResult<Vec<StiService>>;
    fn page_active(&self, request: &PageRequest<StiServiceField>)
        -> RepoResult<Page<StiService>>;
    fn find_by_name_ignore_case(&self, name: &str) -> RepoResult<Option<StiService>>;
    fn exists_by_name_ignore_case(&self, name: &str) -> RepoResult<bool>;
    /// Active services whose name or description contains `keyword`.
    fn search_active(&self, keyword: &str) -> RepoResult<Vec<StiService>>;
    fn page_search_active(
        &self,
        keyword: &str,
        request: &PageRequest<StiServiceField>,
    ) -> RepoResult<Page<StiService>>;
    /// Active services priced within `[min_price, max_price]`.
    fn find_by_price_range(&self, min_price: i64, max_price: i64)
        -> RepoResult<Vec<StiService>>;
    fn count_active(&self) -> RepoResult<u64>;
    /// The service with its components in insertion order.
    fn find_with_components(
        &self,
        id: StiServiceId,
    ) -> RepoResult<Option<StiServiceWithComponents>>;
}

sqlite_accessor! {
    /// SQLite-backed STI service accessor.
    SqliteStiServiceRepository => StiService
}

fn active_services() -> Filter<StiServiceField> {
    Filter::eq(StiServiceField::IsActive, true)
}

fn service_keyword(keyword: &str) -> Filter<StiServiceField> {
    active_services().and(Filter::any_contains(
        &[StiServiceField::Name, StiServiceField::Description],
        keyword,
    ))
}

impl StiServiceRepository for SqliteStiServiceRepository<'_> {
    fn create(&self, service: &StiService) -> RepoResult<StiServiceId> {
        service.validate()?;
        self.executor().insert::<StiService>(
            &[
                "name",
                "description",
                "price",
                "is_active",
                "created_at",
                "updated_at",
            ],
            params![
                service.name,
                service.description,
                service.price,
                service.is_active,
                service.created_at,
                service.updated_at,
            ],
        )
    }

    fn find_active(&self) -> RepoResult<Vec<StiService>> {
        self.find_all(&active_services(), &[])
    }

    fn page_active(
        &self,
        request: &PageRequest<StiServiceField>,
    ) -> RepoResult<Page<StiService>> {
        self.find_page(&active_services(), request)
    }

    fn find_by_name_ignore_case(&self, name: &str) -> RepoResult<Option<StiService>> {
        self.find_first(&Filter::eq_ignore_case(StiServiceField::Name, name), &[])
    }

    fn exists_by_name_ignore_case(&self, name: &str) -> RepoResult<bool> {
        self.exists(&Filter::eq_ignore_case(StiServiceField::Name, name))
    }

    fn search_active(&self, keyword: &str) -> RepoResult<Vec<StiService>> {
        self.find_all(&service_keyword(keyword), &[])
    }

    fn page_search_active(
        &self,
        keyword: &str,
        request: &PageRequest<StiServiceField>,
    ) -> RepoResult<Page<StiService>> {
        self.find_page(&service_keyword(keyword), request)
    }

    fn find_by_price_range(
        &self,
        min_price: i64,
        max_price: i64,
    ) -> RepoResult<Vec<StiService>> {
        let filter =
            active_services().and(Filter::between(StiServiceField::Price, min_price, max_price));
        self.find_all(&filter, &[])
    }

    fn count_active(&self) -> RepoResult<u64> {
        self.count(&active_services())
    }

    fn find_with_components(
        &self,
        id: StiServiceId,
    ) -> RepoResult<Option<StiServiceWithComponents>> {
        let Some(service) = self.find_by_id(id)? else {
            return Ok(None);
        };
        let components = self.executor().find_all::<ServiceTestComponent>(
            &Filter::eq(ServiceTestComponentField::ServiceId, id),
            &[],
        )?;
        Ok(Some(StiServiceWithComponents {
            service,
            components,
        }))
    }
}

pub trait ServiceTestComponentRepository {
    fn create(&self, component: &ServiceTestComponent) -> RepoResult<ComponentId>;
    fn find_by_service(&self, service_id: StiServiceId) -> RepoResult<Vec<ServiceTestComponent>>;
    /// Overwrites the editable columns; `NotFound` when `id` does not exist.
    fn update_component(&self, id: ComponentId, update: &ComponentUpdate) -> RepoResult<()>;
    fn exists_by_id(&self, id: ComponentId) -> RepoResult<bool>;
}

sqlite_accessor! {
    /// SQLite-backed test-component accessor.
    SqliteServiceTestComponentRepository => ServiceTestComponent
}

impl ServiceTestComponentRepository for SqliteServiceTestComponentRepository<'_> {
    fn create(&self, component: &ServiceTestComponent) -> RepoResult<ComponentId> {
        component.validate()?;
        self.executor().insert::<ServiceTestComponent>(
            &[
                "service_id",
                "test_name",
                "unit",
                "reference_range",
                "interpretation",
                "created_at",
                "updated_at",
            ],
            params![
                component.service_id,
                component.test_name,
                component.unit,
                component.reference_range,
                component.interpretation,
                component.created_at,
                component.updated_at,
            ],
        )
    }

    fn find_by_service(&self, service_id: StiServiceId) -> RepoResult<Vec<ServiceTestComponent>> {
        self.find_all(
            &Filter::eq(ServiceTestComponentField::ServiceId, service_id),
            &[],
        )
    }

    fn update_component(&self, id: ComponentId, update: &ComponentUpdate) -> RepoResult<()> {
        update.validate()?;
        let changed = self.executor().update_by_id::<ServiceTestComponent>(
            id,
            &[
                "test_name",
                "unit",
                "reference_range",
                "interpretation",
                "updated_at",
            ],
            params![
                update.test_name,
                update.unit,
                update.reference_range,
                update.interpretation,
                Local::now().naive_local(),
            ],
        )?;
        expect_one::<ServiceTestComponent>(changed, id)
    }

    fn exists_by_id(&self, id: ComponentId) -> RepoResult<bool> {
        self.exists(&Filter::eq(ServiceTestComponentField::Id, id))
    }
}

/// STI package catalogue.
pub trait StiPackageRepository {
    fn create(&self, package: &StiPackage) -> RepoResult<StiPackageId>;
    /// Active packages ordered by name.
    fn find_active_by_name(&self) -> RepoResult<Vec<StiPackage>>;
    fn find_by_name_ignore_case(&self, name: &str) -> RepoResult<Option<StiPackage>>;
    fn exists_by_name_ignore_case(&self, name: &str) -> RepoResult<bool>;
    fn find_with_services(&self, id: StiPackageId) -> RepoResult<Option<StiPackageWithServices>>;
    /// Active packages ordered by name, each with its services.
    fn find_active_with_services(&self) -> RepoResult<Vec<StiPackageWithServices>>;
    /// Every package ordered by name, each with its services.
    fn find_all_with_services(&self) -> RepoResult<Vec<StiPackageWithServices>>;
    /// Active packages priced within `[min_price, max_price]`.
    fn find_by_price_range(&self, min_price: i64, max_price: i64)
        -> RepoResult<Vec<StiPackage>>;
    /// Active packages linking `service_id`.
    fn find_by_service(&self, service_id: StiServiceId) -> RepoResult<Vec<StiPackage>>;
    /// Active packages linking every one of `service_ids`; empty when `service_ids` is.
    fn find_containing_all_services(
        &self,
        service_ids: &[StiServiceId],
    ) -> RepoResult<Vec<StiPackage>>;
    /// Active packages whose name, description or any linked service name contains `keyword`.
    fn find_by_keyword(&self, keyword: &str) -> RepoResult<Vec<StiPackage>>;
}

sqlite_accessor! {
    /// SQLite-backed STI package accessor.
    SqliteStiPackageRepository => StiPackage
}

fn active_packages() -> Filter<StiPackageField> {
    Filter::eq(StiPackageField::IsActive, true)
}

impl SqliteStiPackageRepository<'_> {
    fn with_services(&self, package: StiPackage) -> RepoResult<StiPackageWithServices> {
        let services = linked_services(self.executor(), package.id)?;
        Ok(StiPackageWithServices { package, services })
    }
}

fn linked_services(exec: &Executor<'_>, package_id: StiPackageId) -> RepoResult<Vec<StiService>> {
    exec.find_all::<StiService>(
        &Filter::sql(SERVICE_IN_PACKAGE_SQL, vec![Value::Integer(package_id)]),
        &[Sort::asc(StiServiceField::Name)],
    )
}

impl StiPackageRepository for SqliteStiPackageRepository<'_> {
    fn create(&self, package: &StiPackage) -> RepoResult<StiPackageId> {
        package.validate()?;
        self.executor().insert::<StiPackage>(
            &[
                "package_name",
                "description",
                "package_price",
                "is_active",
                "created_at",
                "updated_at",
            ],
            params![
                package.name,
                package.description,
                package.price,
                package.is_active,
                package.created_at,
                package.updated_at,
            ],
        )
    }

    fn find_active_by_name(&self) -> RepoResult<Vec<StiPackage>> {
        self.find_all(&active_packages(), &[Sort::asc(StiPackageField::Name)])
    }

    fn find_by_name_ignore_case(&self, name: &str) -> RepoResult<Option<StiPackage>> {
        self.find_first(&Filter::eq_ignore_case(StiPackageField::Name, name), &[])
    }

    fn exists_by_name_ignore_case(&self, name: &str) -> RepoResult<bool> {
        self.exists(&Filter::eq_ignore_case(StiPackageField::Name, name))
    }

    fn find_with_services(&self, id: StiPackageId) -> RepoResult<Option<StiPackageWithServices>> {
        self.find_by_id(id)?
            .map(|package| self.with_services(package))
            .transpose()
    }

    fn find_active_with_services(&self) -> RepoResult<Vec<StiPackageWithServices>> {
        self.find_active_by_name()?
            .into_iter()
            .map(|package| self.with_services(package))
            .collect()
    }

    fn find_all_with_services(&self) -> RepoResult<Vec<StiPackageWithServices>> {
        self.find_all(&Filter::All, &[Sort::asc(StiPackageField::Name)])?
            .into_iter()
            .map(|package| self.with_services(package))
            .collect()
    }

    fn find_by_price_range(
        &self,
        min_price: i64,
        max_price: i64,
    ) -> RepoResult<Vec<StiPackage>> {
        let filter =
            active_packages().and(Filter::between(StiPackageField::Price, min_price, max_price));
        self.find_all(&filter, &[])
    }

    fn find_by_service(&self, service_id: StiServiceId) -> RepoResult<Vec<StiPackage>> {
        let filter = active_packages().and(Filter::sql(
            PACKAGE_HAS_SERVICE_SQL,
            vec![Value::Integer(service_id)],
        ));
        self.find_all(&filter, &[])
    }

    fn find_containing_all_services(
        &self,
        service_ids: &[StiServiceId],
    ) -> RepoResult<Vec<StiPackage>> {
        let mut wanted = service_ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let ids_json =
            serde_json::to_string(&wanted).map_err(|err| RepoError::InvalidData(err.to_string()))?;
        let wanted_count = i64::try_from(wanted.len()).unwrap_or(i64::MAX);
        let filter = active_packages().and(Filter::sql(
            PACKAGE_HAS_ALL_SERVICES_SQL,
            vec![Value::Text(ids_json), Value::Integer(wanted_count)],
        ));
        self.find_all(&filter, &[])
    }

    fn find_by_keyword(&self, keyword: &str) -> RepoResult<Vec<StiPackage>> {
        let filter = active_packages().and(Filter::any_contains(
            &[
                StiPackageField::Name,
                StiPackageField::Description,
                StiPackageField::LinkedServiceNames,
            ],
            keyword,
        ));
        self.find_all(&filter, &[])
    }
}

pub trait PackageServiceRepository {
    fn create(&self, link: &PackageService) -> RepoResult<i64>;
    fn find_by_package(&self, package_id: StiPackageId) -> RepoResult<Vec<PackageService>>;
    /// Unlinks every service from the package; returns removed rows.
    fn delete_by_package(&self, package_id: StiPackageId) -> RepoResult<usize>;
}

sqlite_accessor! {
    /// SQLite-backed package/service link accessor.
    SqlitePackageServiceRepository => PackageService
}

impl PackageServiceRepository for SqlitePackageServiceRepository<'_> {
    fn create(&self, link: &PackageService) -> RepoResult<i64> {
        self.executor().insert::<PackageService>(
            &["package_id", "service_id"],
            params![link.package_id, link.service_id],
        )
    }

    fn find_by_package(&self, package_id: StiPackageId) -> RepoResult<Vec<PackageService>> {
        self.find_all(&Filter::eq(PackageServiceField::PackageId, package_id), &[])
    }

    fn delete_by_package(&self, package_id: StiPackageId) -> RepoResult<usize> {
        self.delete_where(&Filter::eq(PackageServiceField::PackageId, package_id))
    }
}

/// Customer test bookings.
pub trait StiTestRepository {
    fn create(&self, test: &StiTest) -> RepoResult<StiTestId>;
    fn find_by_customer(&self, customer_id: UserId) -> RepoResult<Vec<StiTest>>;
    fn find_by_customer_newest_first(&self, customer_id: UserId) -> RepoResult<Vec<StiTest>>;
    fn page_by_customer(
        &self,
        customer_id: UserId,
        request: &PageRequest<StiTestField>,
    ) -> RepoResult<Page<StiTest>>;
    fn find_by_status(&self, status: StiTestStatus) -> RepoResult<Vec<StiTest>>;
    fn page_by_status(
        &self,
        status: StiTestStatus,
        request: &PageRequest<StiTestField>,
    ) -> RepoResult<Page<StiTest>>;
    fn find_by_staff(&self, staff_id: UserId) -> RepoResult<Vec<StiTest>>;
    fn find_by_consultant(&self, consultant_id: UserId) -> RepoResult<Vec<StiTest>>;
    fn find_by_service(&self, service_id: StiServiceId) -> RepoResult<Vec<StiTest>>;
    fn find_by_customer_and_status(
        &self,
        customer_id: UserId,
        status: StiTestStatus,
    ) -> RepoResult<Vec<StiTest>>;
    /// Bookings whose appointment falls on `day`.
    fn find_by_appointment_day(&self, day: NaiveDate) -> RepoResult<Vec<StiTest>>;
    /// Bookings with an appointment within `[from, to]`.
    fn find_by_appointment_range(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepoResult<Vec<StiTest>>;
    /// Pending bookings, oldest first.
    fn find_pending_tests(&self) -> RepoResult<Vec<StiTest>>;
    /// Sampled bookings by appointment, earliest first.
    fn find_sampled_tests(&self) -> RepoResult<Vec<StiTest>>;
    /// Resulted bookings by result date, earliest first.
    fn find_resulted_tests(&self) -> RepoResult<Vec<StiTest>>;
    fn count_by_status(&self, status: StiTestStatus) -> RepoResult<u64>;
    fn count_by_customer_and_status(
        &self,
        customer_id: UserId,
        status: StiTestStatus,
    ) -> RepoResult<u64>;
    /// `(month, bookings created)` for each month of `year` with any booking.
    fn monthly_statistics(&self, year: i32) -> RepoResult<Vec<(u32, u64)>>;
    /// Sampled or later bookings without consultant notes, recently updated first.
    fn find_pending_consultant_notes(&self) -> RepoResult<Vec<StiTest>>;
    /// Sampled or later bookings, recently updated first.
    fn find_consultant_accessible(&self) -> RepoResult<Vec<StiTest>>;
    fn find_by_customer_service_and_status(
        &self,
        customer_id: UserId,
        service_id: StiServiceId,
        status: StiTestStatus,
    ) -> RepoResult<Vec<StiTest>>;
}

sqlite_accessor! {
    /// SQLite-backed test-booking accessor.
    SqliteStiTestRepository => StiTest
}

fn consultant_visible() -> Filter<StiTestField> {
    Filter::is_in(
        StiTestField::Status,
        [
            StiTestStatus::Sampled,
            StiTestStatus::Resulted,
            StiTestStatus::Completed,
        ],
    )
}

fn customer_with_status(customer_id: UserId, status: StiTestStatus) -> Filter<StiTestField> {
    Filter::eq(StiTestField::CustomerId, customer_id).and(Filter::eq(StiTestField::Status, status))
}

impl StiTestRepository for SqliteStiTestRepository<'_> {
    fn create(&self, test: &StiTest) -> RepoResult<StiTestId> {
        test.validate()?;
        self.executor().insert::<StiTest>(
            &[
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
            ],
            params![
                test.customer_id,
                test.service_id,
                test.package_id,
                test.staff_id,
                test.consultant_id,
                test.appointment_date,
                test.total_price,
                test.customer_notes,
                test.consultant_notes,
                test.result_date,
                test.status,
                test.cancel_reason,
                test.created_at,
                test.updated_at,
            ],
        )
    }

    fn find_by_customer(&self, customer_id: UserId) -> RepoResult<Vec<StiTest>> {
        self.find_all(&Filter::eq(StiTestField::CustomerId, customer_id), &[])
    }

    fn find_by_customer_newest_first(&self, customer_id: UserId) -> RepoResult<Vec<StiTest>> {
        self.find_all(
            &Filter::eq(StiTestField::CustomerId, customer_id),
            &[Sort::desc(StiTestField::CreatedAt)],
        )
    }

    fn page_by_customer(
        &self,
        customer_id: UserId,
        request: &PageRequest<StiTestField>,
    ) -> RepoResult<Page<StiTest>> {
        self.find_page(&Filter::eq(StiTestField::CustomerId, customer_id), request)
    }

    fn find_by_status(&self, status: StiTestStatus) -> RepoResult<Vec<StiTest>> {
        self.find_all(&Filter::eq(StiTestField::Status, status), &[])
    }

    fn page_by_status(
        &self,
        status: StiTestStatus,
        request: &PageRequest<StiTestField>,
    ) -> RepoResult<Page<StiTest>> {
        self.find_page(&Filter::eq(StiTestField::Status, status), request)
    }

    fn find_by_staff(&self, staff_id: UserId) -> RepoResult<Vec<StiTest>> {
        self.find_all(&Filter::eq(StiTestField::StaffId, staff_id), &[])
    }

    fn find_by_consultant(&self, consultant_id: UserId) -> RepoResult<Vec<StiTest>> {
        self.find_all(&Filter::eq(StiTestField::ConsultantId, consultant_id), &[])
    }

    fn find_by_service(&self, service_id: StiServiceId) -> RepoResult<Vec<StiTest>> {
        self.find_all(&Filter::eq(StiTestField::ServiceId, service_id), &[])
    }

    fn find_by_customer_and_status(
        &self,
        customer_id: UserId,
        status: StiTestStatus,
    ) -> RepoResult<Vec<StiTest>> {
        self.find_all(&customer_with_status(customer_id, status), &[])
    }

    fn find_by_appointment_day(&self, day: NaiveDate) -> RepoResult<Vec<StiTest>> {
        self.find_all(
            &Filter::eq(StiTestField::AppointmentDay, day),
            &[Sort::asc(StiTestField::AppointmentDate)],
        )
    }

    fn find_by_appointment_range(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> RepoResult<Vec<StiTest>> {
        self.find_all(
            &Filter::between(StiTestField::AppointmentDate, from, to),
            &[Sort::asc(StiTestField::AppointmentDate)],
        )
    }

    fn find_pending_tests(&self) -> RepoResult<Vec<StiTest>> {
        self.find_all(
            &Filter::eq(StiTestField::Status, StiTestStatus::Pending),
            &[Sort::asc(StiTestField::CreatedAt)],
        )
    }

    fn find_sampled_tests(&self) -> RepoResult<Vec<StiTest>> {
        self.find_all(
            &Filter::eq(StiTestField::Status, StiTestStatus::Sampled),
            &[Sort::asc(StiTestField::AppointmentDate)],
        )
    }

    fn find_resulted_tests(&self) -> RepoResult<Vec<StiTest>> {
        self.find_all(
            &Filter::eq(StiTestField::Status, StiTestStatus::Resulted),
            &[Sort::asc(StiTestField::ResultDate)],
        )
    }

    fn count_by_status(&self, status: StiTestStatus) -> RepoResult<u64> {
        self.count(&Filter::eq(StiTestField::Status, status))
    }

    fn count_by_customer_and_status(
        &self,
        customer_id: UserId,
        status: StiTestStatus,
    ) -> RepoResult<u64> {
        self.count(&customer_with_status(customer_id, status))
    }

    fn monthly_statistics(&self, year: i32) -> RepoResult<Vec<(u32, u64)>> {
        self.executor().group_count::<StiTest, u32>(
            StiTestField::CreatedMonth,
            &Filter::eq(StiTestField::CreatedYear, year),
        )
    }

    fn find_pending_consultant_notes(&self) -> RepoResult<Vec<StiTest>> {
        self.find_all(
            &consultant_visible().and(Filter::is_blank(StiTestField::ConsultantNotes)),
            &[Sort::desc(StiTestField::UpdatedAt)],
        )
    }

    fn find_consultant_accessible(&self) -> RepoResult<Vec<StiTest>> {
        self.find_all(&consultant_visible(), &[Sort::desc(StiTestField::UpdatedAt)])
    }

    fn find_by_customer_service_and_status(
        &self,
        customer_id: UserId,
        service_id: StiServiceId,
        status: StiTestStatus,
    ) -> RepoResult<Vec<StiTest>> {
        let filter = customer_with_status(customer_id, status)
            .and(Filter::eq(StiTestField::ServiceId, service_id));
        self.find_all(&filter, &[])
    }
}

pub trait TestResultRepository {
    fn create(&self, result: &TestResult) -> RepoResult<TestResultId>;
    fn find_by_test(&self, test_id: StiTestId) -> RepoResult<Vec<TestResult>>;
    /// Ordered by source service name, then component name.
    fn find_by_test_ordered(&self, test_id: StiTestId) -> RepoResult<Vec<TestResult>>;
    fn find_by_test_and_source_service(
        &self,
        test_id: StiTestId,
        service_id: StiServiceId,
    ) -> RepoResult<Vec<TestResult>>;
    fn find_by_test_and_component(
        &self,
        test_id: StiTestId,
        component_id: ComponentId,
    ) -> RepoResult<Option<TestResult>>;
}

sqlite_accessor! {
    /// SQLite-backed test-result accessor.
    SqliteTestResultRepository => TestResult
}

impl TestResultRepository for SqliteTestResultRepository<'_> {
    fn create(&self, result: &TestResult) -> RepoResult<TestResultId> {
        self.executor().insert::<TestResult>(
            &[
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
            ],
            params![
                result.test_id,
                result.component_id,
                result.source_service_id,
                result.result_value,
                result.normal_range,
                result.unit,
                result.reviewed_by,
                result.reviewed_at,
                result.created_at,
                result.updated_at,
            ],
        )
    }

    fn find_by_test(&self, test_id: StiTestId) -> RepoResult<Vec<TestResult>> {
        self.find_all(&Filter::eq(TestResultField::TestId, test_id), &[])
    }

    fn find_by_test_ordered(&self, test_id: StiTestId) -> RepoResult<Vec<TestResult>> {
        self.find_all(
            &Filter::eq(TestResultField::TestId, test_id),
            &[
                Sort::asc(TestResultField::SourceServiceName),
                Sort::asc(TestResultField::ComponentName),
            ],
        )
    }

    fn find_by_test_and_source_service(
        &self,
        test_id: StiTestId,
        service_id: StiServiceId,
    ) -> RepoResult<Vec<TestResult>> {
        let filter = Filter::eq(TestResultField::TestId, test_id)
            .and(Filter::eq(TestResultField::SourceServiceId, service_id));
        self.find_all(&filter, &[])
    }

    fn find_by_test_and_component(
        &self,
        test_id: StiTestId,
        component_id: ComponentId,
    ) -> RepoResult<Option<TestResult>> {
        let filter = Filter::eq(TestResultField::TestId, test_id)
            .and(Filter::eq(TestResultField::ComponentId, component_id));
        self.find_first(&filter, &[])
    }
}

pub trait TestServiceConsultantNoteRepository {
    fn create(&self, note: &TestServiceConsultantNote) -> RepoResult<ConsultantNoteId>;
    fn find_by_test(&self, test_id: StiTestId) -> RepoResult<Vec<TestServiceConsultantNote>>;
    fn find_by_test_and_service(
        &self,
        test_id: StiTestId,
        service_id: StiServiceId,
    ) -> RepoResult<Vec<TestServiceConsultantNote>>;
}

sqlite_accessor! {
    /// SQLite-backed per-service consultant note accessor.
    SqliteTestServiceConsultantNoteRepository => TestServiceConsultantNote
}

impl TestServiceConsultantNoteRepository for SqliteTestServiceConsultantNoteRepository<'_> {
    fn create(&self, note: &TestServiceConsultantNote) -> RepoResult<ConsultantNoteId> {
        note.validate()?;
        self.executor().insert::<TestServiceConsultantNote>(
            &[
                "test_id",
                "service_id",
                "consultant_id",
                "note",
                "created_at",
                "updated_at",
            ],
            params![
                note.test_id,
                note.service_id,
                note.consultant_id,
                note.note,
                note.created_at,
                note.updated_at,
            ],
        )
    }

    fn find_by_test(&self, test_id: StiTestId) -> RepoResult<Vec<TestServiceConsultantNote>> {
        self.find_all(
            &Filter::eq(TestServiceConsultantNoteField::TestId, test_id),
            &[Sort::asc(TestServiceConsultantNoteField::CreatedAt)],
        )
    }

    fn find_by_test_and_service(
        &self,
        test_id: StiTestId,
        service_id: StiServiceId,
    ) -> RepoResult<Vec<TestServiceConsultantNote>> {
        let filter = Filter::eq(TestServiceConsultantNoteField::TestId, test_id)
            .and(Filter::eq(TestServiceConsultantNoteField::ServiceId, service_id));
        self.find_all(&filter, &[Sort::asc(TestServiceConsultantNoteField::CreatedAt)])
    }
}
