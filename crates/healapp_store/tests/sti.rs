use chrono::{NaiveDate, NaiveDateTime};
use healapp_store::model::account::UserId;
use healapp_store::model::sti::{
    ComponentUpdate, PackageService, ServiceTestComponent, StiPackage, StiService, StiServiceId,
    StiTest, StiTestStatus, TestResult, TestServiceConsultantNote,
};
use healapp_store::repo::{
    PackageServiceRepository, ServiceTestComponentRepository, SqlitePackageServiceRepository,
    SqliteServiceTestComponentRepository, SqliteStiPackageRepository, SqliteStiServiceRepository,
    SqliteStiTestRepository, SqliteTestResultRepository,
    SqliteTestServiceConsultantNoteRepository, StiPackageRepository, StiServiceRepository,
    StiTestRepository, TestResultRepository, TestServiceConsultantNoteRepository,
};
use healapp_store::{open_db_in_memory, ConstraintKind, DbError, PageRequest, RepoError};
use rusqlite::{params, Connection};

fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn seed_users(conn: &Connection, ids: &[UserId]) {
    conn.execute("INSERT INTO roles (role_id, role_name) VALUES (1, 'CUSTOMER');", [])
        .unwrap();
    for id in ids {
        conn.execute(
            "INSERT INTO users (user_id, full_name, email, username, password_hash, role_id, created_date)
             VALUES (?1, 'Patient', ?2, ?3, 'hash', 1, '2024-01-01 00:00:00');",
            params![id, format!("patient{id}@example.com"), format!("patient{id}")],
        )
        .unwrap();
    }
}

fn service(conn: &Connection, name: &str, price: i64) -> StiServiceId {
    SqliteStiServiceRepository::try_new(conn)
        .unwrap()
        .create(&StiService::new(name, price))
        .unwrap()
}

fn test_on(customer_id: UserId, appointment: NaiveDateTime, status: StiTestStatus) -> StiTest {
    let mut test = StiTest::new(customer_id, appointment);
    test.status = status;
    test
}

#[test]
fn service_lookups_ignore_case_and_skip_inactive() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStiServiceRepository::try_new(&conn).unwrap();

    repo.create(&StiService::new("HIV Test", 300_000)).unwrap();
    repo.create(&StiService::new("Syphilis Test", 150_000)).unwrap();
    let mut retired = StiService::new("HIV Rapid Test", 90_000);
    retired.is_active = false;
    repo.create(&retired).unwrap();

    assert!(repo.exists_by_name_ignore_case("hiv test").unwrap());
    assert_eq!(
        repo.find_by_name_ignore_case("SYPHILIS TEST")
            .unwrap()
            .unwrap()
            .price,
        150_000
    );
    assert_eq!(repo.search_active("hiv").unwrap().len(), 1);
    assert_eq!(repo.find_by_price_range(100_000, 300_000).unwrap().len(), 2);
    assert_eq!(repo.find_by_price_range(100_000, 299_999).unwrap().len(), 1);
    assert_eq!(repo.count_active().unwrap(), 2);

    let err = repo.create(&StiService::new("Negative", -1)).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn vietnamese_names_match_regardless_of_case() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStiServiceRepository::try_new(&conn).unwrap();

    let hiv = repo.create(&StiService::new("XÉT NGHIỆM HIV", 300_000)).unwrap();
    repo.create(&StiService::new("Xét nghiệm Giang mai", 150_000)).unwrap();
    repo.create(&StiService::new("Tư vấn sức khỏe", 100_000)).unwrap();

    assert_eq!(repo.search_active("xét nghiệm").unwrap().len(), 2);
    assert_eq!(repo.search_active("GIANG MAI").unwrap().len(), 1);
    assert_eq!(
        repo.page_search_active("Nghiệm", &PageRequest::new(0, 1))
            .unwrap()
            .total,
        2
    );
    assert_eq!(
        repo.find_by_name_ignore_case("xét nghiệm hiv")
            .unwrap()
            .unwrap()
            .id,
        hiv
    );
    assert!(repo.exists_by_name_ignore_case("TƯ VẤN SỨC KHỎE").unwrap());
}

#[test]
fn service_loads_with_its_components() {
    let conn = open_db_in_memory().unwrap();
    let hiv = service(&conn, "HIV Test", 300_000);
    let services = SqliteStiServiceRepository::try_new(&conn).unwrap();
    let components = SqliteServiceTestComponentRepository::try_new(&conn).unwrap();

    let antibody = components
        .create(&ServiceTestComponent::new(hiv, "HIV-1/2 antibody"))
        .unwrap();
    components
        .create(&ServiceTestComponent::new(hiv, "p24 antigen"))
        .unwrap();

    let loaded = services.find_with_components(hiv).unwrap().unwrap();
    assert_eq!(loaded.service.name, "HIV Test");
    assert_eq!(loaded.components.len(), 2);
    assert!(services.find_with_components(hiv + 50).unwrap().is_none());

    components
        .update_component(
            antibody,
            &ComponentUpdate {
                test_name: "HIV-1/2 antibody (ELISA)".to_string(),
                unit: Some("S/CO".to_string()),
                reference_range: Some("< 1.0".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    let updated = components
        .find_by_service(hiv)
        .unwrap()
        .into_iter()
        .find(|c| c.id == antibody)
        .unwrap();
    assert_eq!(updated.test_name, "HIV-1/2 antibody (ELISA)");
    assert_eq!(updated.unit.as_deref(), Some("S/CO"));
    assert!(updated.updated_at.is_some());
}

#[test]
fn updating_missing_component_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteServiceTestComponentRepository::try_new(&conn).unwrap();

    let err = repo
        .update_component(
            999,
            &ComponentUpdate {
                test_name: "Gram stain".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { id: 999, .. }));
    assert!(!repo.exists_by_id(999).unwrap());
}

#[test]
fn package_keyword_search_reaches_linked_service_names() {
    let conn = open_db_in_memory().unwrap();
    let hiv = service(&conn, "HIV Test", 300_000);
    let syphilis = service(&conn, "Syphilis Test", 150_000);
    let packages = SqliteStiPackageRepository::try_new(&conn).unwrap();
    let links = SqlitePackageServiceRepository::try_new(&conn).unwrap();

    let basic = packages.create(&StiPackage::new("HIV Package", 280_000)).unwrap();
    let full = packages
        .create(&StiPackage::new("Full Screening", 400_000))
        .unwrap();
    links.create(&PackageService::new(basic, hiv)).unwrap();
    links.create(&PackageService::new(full, hiv)).unwrap();
    links.create(&PackageService::new(full, syphilis)).unwrap();

    let by_name = packages.find_by_keyword("package").unwrap();
    assert_eq!(by_name.iter().map(|p| p.id).collect::<Vec<_>>(), vec![basic]);

    let mut by_service = packages
        .find_by_keyword("syphilis")
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect::<Vec<_>>();
    by_service.sort_unstable();
    assert_eq!(by_service, vec![full]);

    assert_eq!(packages.find_by_keyword("hiv").unwrap().len(), 2);
    assert_eq!(packages.find_by_service(syphilis).unwrap().len(), 1);

    let err = links.create(&PackageService::new(full, hiv)).unwrap_err();
    assert_eq!(
        err.db_error().and_then(DbError::constraint_kind),
        Some(ConstraintKind::Unique)
    );
}

#[test]
fn containing_all_services_requires_every_id() {
    let conn = open_db_in_memory().unwrap();
    let hiv = service(&conn, "HIV Test", 300_000);
    let syphilis = service(&conn, "Syphilis Test", 150_000);
    let hepatitis = service(&conn, "Hepatitis B Test", 200_000);
    let packages = SqliteStiPackageRepository::try_new(&conn).unwrap();
    let links = SqlitePackageServiceRepository::try_new(&conn).unwrap();

    let pair = packages.create(&StiPackage::new("Duo", 400_000)).unwrap();
    let trio = packages.create(&StiPackage::new("Trio", 600_000)).unwrap();
    for (package, service_id) in [
        (pair, hiv),
        (pair, syphilis),
        (trio, hiv),
        (trio, syphilis),
        (trio, hepatitis),
    ] {
        links.create(&PackageService::new(package, service_id)).unwrap();
    }

    let mut both = packages
        .find_containing_all_services(&[syphilis, hiv, hiv])
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect::<Vec<_>>();
    both.sort_unstable();
    assert_eq!(both, vec![pair, trio]);

    let with_hepatitis = packages
        .find_containing_all_services(&[hiv, hepatitis])
        .unwrap();
    assert_eq!(with_hepatitis.len(), 1);
    assert_eq!(with_hepatitis[0].id, trio);

    assert!(packages.find_containing_all_services(&[]).unwrap().is_empty());
}

#[test]
fn package_loads_with_services_sorted_by_name() {
    let conn = open_db_in_memory().unwrap();
    let syphilis = service(&conn, "Syphilis Test", 150_000);
    let chlamydia = service(&conn, "Chlamydia Test", 180_000);
    let packages = SqliteStiPackageRepository::try_new(&conn).unwrap();
    let links = SqlitePackageServiceRepository::try_new(&conn).unwrap();

    let package = packages.create(&StiPackage::new("Couple Check", 300_000)).unwrap();
    links.create(&PackageService::new(package, syphilis)).unwrap();
    links.create(&PackageService::new(package, chlamydia)).unwrap();
    let mut hidden = StiPackage::new("Legacy Bundle", 100_000);
    hidden.is_active = false;
    packages.create(&hidden).unwrap();

    let loaded = packages.find_with_services(package).unwrap().unwrap();
    let names = loaded
        .services
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Chlamydia Test", "Syphilis Test"]);

    assert_eq!(packages.find_active_with_services().unwrap().len(), 1);
    assert_eq!(packages.find_all_with_services().unwrap().len(), 2);

    assert_eq!(links.delete_by_package(package).unwrap(), 2);
    assert!(packages
        .find_with_services(package)
        .unwrap()
        .unwrap()
        .services
        .is_empty());
}

#[test]
fn tests_group_by_appointment_day_and_month() {
    let conn = open_db_in_memory().unwrap();
    seed_users(&conn, &[1, 2]);
    let repo = SqliteStiTestRepository::try_new(&conn).unwrap();

    for (customer, created, appointment) in [
        (1, at(2024, 3, 2, 8), at(2024, 3, 9, 8)),
        (1, at(2024, 3, 20, 8), at(2024, 3, 9, 15)),
        (2, at(2024, 7, 1, 8), at(2024, 7, 4, 10)),
        (2, at(2023, 3, 1, 8), at(2023, 3, 9, 8)),
    ] {
        let mut test = test_on(customer, appointment, StiTestStatus::Pending);
        test.created_at = created;
        test.updated_at = created;
        repo.create(&test).unwrap();
    }

    let day = repo
        .find_by_appointment_day(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
        .unwrap();
    assert_eq!(day.len(), 2);
    assert!(day[0].appointment_date < day[1].appointment_date);

    assert_eq!(repo.monthly_statistics(2024).unwrap(), vec![(3, 2), (7, 1)]);
    assert_eq!(repo.monthly_statistics(2023).unwrap(), vec![(3, 1)]);
    assert!(repo.monthly_statistics(2022).unwrap().is_empty());

    assert_eq!(
        repo.find_by_appointment_range(at(2024, 3, 9, 8), at(2024, 7, 4, 10))
            .unwrap()
            .len(),
        3
    );
    assert_eq!(repo.find_pending_tests().unwrap().len(), 4);
    assert_eq!(
        repo.count_by_customer_and_status(2, StiTestStatus::Pending)
            .unwrap(),
        2
    );
}

#[test]
fn consultants_see_sampled_and_later_tests_only() {
    let conn = open_db_in_memory().unwrap();
    seed_users(&conn, &[1]);
    let repo = SqliteStiTestRepository::try_new(&conn).unwrap();
    let appointment = at(2024, 5, 2, 9);

    repo.create(&test_on(1, appointment, StiTestStatus::Confirmed)).unwrap();
    let sampled = repo
        .create(&test_on(1, appointment, StiTestStatus::Sampled))
        .unwrap();
    let mut noted = test_on(1, appointment, StiTestStatus::Resulted);
    noted.consultant_notes = Some("Follow up in three months".to_string());
    repo.create(&noted).unwrap();
    let mut blank = test_on(1, appointment, StiTestStatus::Completed);
    blank.consultant_notes = Some(String::new());
    let blank_id = repo.create(&blank).unwrap();
    repo.create(&test_on(1, appointment, StiTestStatus::Canceled)).unwrap();

    assert_eq!(repo.find_consultant_accessible().unwrap().len(), 3);
    let mut pending = repo
        .find_pending_consultant_notes()
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect::<Vec<_>>();
    pending.sort_unstable();
    assert_eq!(pending, vec![sampled, blank_id]);
    assert_eq!(repo.find_sampled_tests().unwrap().len(), 1);
    assert_eq!(repo.count_by_status(StiTestStatus::Canceled).unwrap(), 1);
}

#[test]
fn sti_test_needs_existing_customer() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStiTestRepository::try_new(&conn).unwrap();

    let err = repo
        .create(&test_on(404, at(2024, 5, 2, 9), StiTestStatus::Pending))
        .unwrap_err();
    assert_eq!(
        err.db_error().and_then(DbError::constraint_kind),
        Some(ConstraintKind::ForeignKey)
    );
}

#[test]
fn results_order_by_service_then_component_name() {
    let conn = open_db_in_memory().unwrap();
    seed_users(&conn, &[1]);
    let syphilis = service(&conn, "Syphilis Test", 150_000);
    let hiv = service(&conn, "HIV Test", 300_000);
    let components = SqliteServiceTestComponentRepository::try_new(&conn).unwrap();
    let treponemal = components
        .create(&ServiceTestComponent::new(syphilis, "Treponemal"))
        .unwrap();
    let p24 = components
        .create(&ServiceTestComponent::new(hiv, "p24 antigen"))
        .unwrap();
    let antibody = components
        .create(&ServiceTestComponent::new(hiv, "Antibody"))
        .unwrap();

    let test_id = SqliteStiTestRepository::try_new(&conn)
        .unwrap()
        .create(&test_on(1, at(2024, 5, 2, 9), StiTestStatus::Resulted))
        .unwrap();
    let results = SqliteTestResultRepository::try_new(&conn).unwrap();
    for (component, source) in [(treponemal, syphilis), (p24, hiv), (antibody, hiv)] {
        let mut result = TestResult::new(test_id, component);
        result.source_service_id = Some(source);
        result.result_value = Some("Negative".to_string());
        results.create(&result).unwrap();
    }

    let ordered = results
        .find_by_test_ordered(test_id)
        .unwrap()
        .into_iter()
        .map(|r| r.component_id)
        .collect::<Vec<_>>();
    assert_eq!(ordered, vec![antibody, p24, treponemal]);
    assert_eq!(
        results
            .find_by_test_and_source_service(test_id, hiv)
            .unwrap()
            .len(),
        2
    );
    assert!(results
        .find_by_test_and_component(test_id, treponemal)
        .unwrap()
        .is_some());

    let notes = SqliteTestServiceConsultantNoteRepository::try_new(&conn).unwrap();
    notes
        .create(&TestServiceConsultantNote::new(test_id, hiv, "No exposure risk"))
        .unwrap();
    assert_eq!(notes.find_by_test_and_service(test_id, hiv).unwrap().len(), 1);
    assert!(notes
        .find_by_test_and_service(test_id, syphilis)
        .unwrap()
        .is_empty());

    conn.execute("DELETE FROM sti_tests WHERE test_id = ?1;", [test_id])
        .unwrap();
    assert!(results.find_by_test(test_id).unwrap().is_empty());
    assert!(notes.find_by_test(test_id).unwrap().is_empty());
}
