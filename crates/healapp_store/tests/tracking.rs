use chrono::{Local, NaiveDate, NaiveTime};
use healapp_store::model::account::UserId;
use healapp_store::model::cycle::{ControlPills, MenstrualCycle, PillLog, PregnancyProbLog};
use healapp_store::model::notification::{
    Notification, NotificationPreference, NotificationType,
};
use healapp_store::repo::{
    ControlPillsRepository, MenstrualCycleRepository, NotificationPreferenceRepository,
    NotificationRepository, PillLogRepository, PregnancyProbLogRepository,
    SqliteControlPillsRepository, SqliteMenstrualCycleRepository,
    SqliteNotificationPreferenceRepository, SqliteNotificationRepository,
    SqlitePillLogRepository, SqlitePregnancyProbLogRepository,
};
use healapp_store::{open_db_in_memory, Accessor, ConstraintKind, DbError, RepoError};
use rusqlite::{params, Connection};

fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn seed_users(conn: &Connection, ids: &[UserId]) {
    conn.execute("INSERT INTO roles (role_id, role_name) VALUES (1, 'CUSTOMER');", [])
        .unwrap();
    for id in ids {
        conn.execute(
            "INSERT INTO users (user_id, full_name, email, username, password_hash, role_id, created_date)
             VALUES (?1, 'Tracker', ?2, ?3, 'hash', 1, '2024-01-01 00:00:00');",
            params![id, format!("tracker{id}@example.com"), format!("tracker{id}")],
        )
        .unwrap();
    }
}

fn evening() -> NaiveTime {
    NaiveTime::from_hms_opt(21, 30, 0).unwrap()
}

#[test]
fn latest_cycle_before_today_excludes_today() {
    let conn = open_db_in_memory().unwrap();
    seed_users(&conn, &[1, 2]);
    let repo = SqliteMenstrualCycleRepository::try_new(&conn).unwrap();

    let march = repo
        .create(&MenstrualCycle::new(1, day(3, 1), 5, 28, day(3, 15)))
        .unwrap();
    let april = repo
        .create(&MenstrualCycle::new(1, day(4, 1), 5, 28, day(4, 15)))
        .unwrap();
    repo.create(&MenstrualCycle::new(2, day(3, 20), 4, 30, day(4, 3)))
        .unwrap();

    assert_eq!(
        repo.find_latest_before(1, day(4, 1)).unwrap().unwrap().id,
        march
    );
    assert_eq!(
        repo.find_latest_before(1, day(4, 2)).unwrap().unwrap().id,
        april
    );
    assert!(repo.find_latest_before(1, day(3, 1)).unwrap().is_none());
    assert_eq!(repo.find_latest_by_user(1).unwrap().unwrap().id, april);

    let all = repo.find_all_by_user(1).unwrap();
    assert_eq!(all.iter().map(|c| c.id).collect::<Vec<_>>(), vec![march, april]);
}

#[test]
fn cycle_validation_bounds_bleeding_days() {
    let conn = open_db_in_memory().unwrap();
    seed_users(&conn, &[1]);
    let repo = SqliteMenstrualCycleRepository::try_new(&conn).unwrap();

    for days in [0, 31] {
        let err = repo
            .create(&MenstrualCycle::new(1, day(5, 1), days, 28, day(5, 15)))
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }
    let err = repo
        .create(&MenstrualCycle::new(1, day(5, 10), 5, 28, day(5, 1)))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert!(repo.find_all_by_user(1).unwrap().is_empty());
}

#[test]
fn pregnancy_logs_follow_date_range_and_cascade() {
    let conn = open_db_in_memory().unwrap();
    seed_users(&conn, &[1]);
    let cycles = SqliteMenstrualCycleRepository::try_new(&conn).unwrap();
    let logs = SqlitePregnancyProbLogRepository::try_new(&conn).unwrap();

    let cycle = cycles
        .create(&MenstrualCycle::new(1, day(6, 1), 5, 28, day(6, 15)))
        .unwrap();
    for (d, probability) in [(16, 15.0), (13, 8.5), (14, 20.0), (15, 33.3)] {
        logs.create(&PregnancyProbLog::new(cycle, day(6, d), probability))
            .unwrap();
    }

    let window = logs
        .find_by_cycle_between(cycle, day(6, 14), day(6, 15))
        .unwrap();
    assert_eq!(
        window.iter().map(|l| l.date).collect::<Vec<_>>(),
        vec![day(6, 14), day(6, 15)]
    );
    let peak = logs.find_by_cycle_and_date(cycle, day(6, 15)).unwrap().unwrap();
    assert!((peak.probability - 33.3).abs() < 1e-9);
    assert_eq!(logs.find_by_cycle(cycle).unwrap()[0].date, day(6, 13));

    let err = logs
        .create(&PregnancyProbLog::new(cycle, day(6, 17), 120.0))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    assert!(cycles.delete_by_id(cycle).unwrap());
    assert!(logs.find_by_cycle(cycle).unwrap().is_empty());
}

#[test]
fn pill_logs_after_a_day_are_purged() {
    let conn = open_db_in_memory().unwrap();
    seed_users(&conn, &[1]);
    let schedules = SqliteControlPillsRepository::try_new(&conn).unwrap();
    let logs = SqlitePillLogRepository::try_new(&conn).unwrap();

    let pills = schedules
        .create(&ControlPills::new(1, day(7, 1), day(7, 28), evening(), 21, 7))
        .unwrap();
    let other = schedules
        .create(&ControlPills::new(1, day(8, 1), day(8, 28), evening(), 21, 7))
        .unwrap();
    for d in [9, 10, 11, 12] {
        logs.create(&PillLog::new(pills, day(7, d))).unwrap();
    }
    logs.create(&PillLog::new(other, day(7, 12))).unwrap();

    assert_eq!(logs.delete_logs_after(pills, day(7, 10)).unwrap(), 2);
    assert_eq!(
        logs.find_by_pills(pills)
            .unwrap()
            .iter()
            .map(|l| l.log_date)
            .collect::<Vec<_>>(),
        vec![day(7, 9), day(7, 10)]
    );
    assert!(logs.find_by_pills_and_date(other, day(7, 12)).unwrap().is_some());
    assert_eq!(logs.delete_logs_after(pills, day(7, 10)).unwrap(), 0);

    let err = logs.create(&PillLog::new(pills, day(7, 9))).unwrap_err();
    assert_eq!(
        err.db_error().and_then(DbError::constraint_kind),
        Some(ConstraintKind::Unique)
    );
}

#[test]
fn purge_after_today_keeps_todays_log() {
    let conn = open_db_in_memory().unwrap();
    seed_users(&conn, &[1]);
    let today = Local::now().date_naive();
    let tomorrow = today.succ_opt().unwrap();
    let pills = SqliteControlPillsRepository::try_new(&conn)
        .unwrap()
        .create(&ControlPills::new(1, today, tomorrow, evening(), 21, 7))
        .unwrap();
    let logs = SqlitePillLogRepository::try_new(&conn).unwrap();
    logs.create(&PillLog::new(pills, today)).unwrap();
    logs.create(&PillLog::new(pills, tomorrow)).unwrap();

    assert_eq!(logs.delete_logs_after_today(pills).unwrap(), 1);
    let kept = logs.find_by_pills(pills).unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].log_date, today);
}

#[test]
fn pill_schedules_filter_by_user_and_activity() {
    let conn = open_db_in_memory().unwrap();
    seed_users(&conn, &[1, 2]);
    let repo = SqliteControlPillsRepository::try_new(&conn).unwrap();

    repo.create(&ControlPills::new(1, day(7, 1), day(7, 28), evening(), 21, 7))
        .unwrap();
    let mut stopped = ControlPills::new(1, day(6, 1), day(6, 28), evening(), 21, 7);
    stopped.is_active = false;
    repo.create(&stopped).unwrap();
    repo.create(&ControlPills::new(2, day(7, 1), day(7, 28), evening(), 24, 4))
        .unwrap();

    assert_eq!(repo.find_by_user_and_active(1, true).unwrap().len(), 1);
    assert_eq!(repo.find_by_user_and_active(1, false).unwrap().len(), 1);
    assert_eq!(repo.find_by_active(true).unwrap().len(), 2);
    assert_eq!(repo.find_by_user(1).unwrap().len(), 2);

    let err = repo
        .create(&ControlPills::new(1, day(7, 28), day(7, 1), evening(), 21, 7))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn notifications_list_latest_schedule_first() {
    let conn = open_db_in_memory().unwrap();
    seed_users(&conn, &[1, 2]);
    let repo = SqliteNotificationRepository::try_new(&conn).unwrap();

    let earlier = day(7, 1).and_time(evening());
    let later = day(7, 2).and_time(evening());
    repo.create(&Notification::new(
        1,
        NotificationType::PillReminder,
        "Take your pill",
        earlier,
    ))
    .unwrap();
    let latest = repo
        .create(&Notification::new(
            1,
            NotificationType::Ovulation,
            "Ovulation expected today",
            later,
        ))
        .unwrap();
    repo.create(&Notification::new(
        2,
        NotificationType::PillReminder,
        "Take your pill",
        later,
    ))
    .unwrap();

    let listed = repo.find_by_user_newest_first(1).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, latest);
    assert_eq!(listed[1].scheduled_at, earlier);

    let err = repo
        .create(&Notification::new(1, NotificationType::Ovulation, "", later))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn preferences_are_unique_per_type_and_updatable() {
    let conn = open_db_in_memory().unwrap();
    seed_users(&conn, &[1, 2]);
    let repo = SqliteNotificationPreferenceRepository::try_new(&conn).unwrap();

    repo.create(&NotificationPreference::new(
        1,
        NotificationType::PillReminder,
        evening(),
    ))
    .unwrap();
    repo.create(&NotificationPreference::new(
        1,
        NotificationType::Ovulation,
        evening(),
    ))
    .unwrap();

    let err = repo
        .create(&NotificationPreference::new(
            1,
            NotificationType::PillReminder,
            evening(),
        ))
        .unwrap_err();
    assert_eq!(
        err.db_error().and_then(DbError::constraint_kind),
        Some(ConstraintKind::Unique)
    );

    assert_eq!(
        repo.update_enabled(1, NotificationType::PillReminder, false)
            .unwrap(),
        1
    );
    let morning = NaiveTime::from_hms_opt(7, 15, 0).unwrap();
    assert_eq!(
        repo.update_remind_time(1, NotificationType::Ovulation, morning)
            .unwrap(),
        1
    );
    assert_eq!(
        repo.update_enabled(2, NotificationType::PillReminder, false)
            .unwrap(),
        0
    );

    let pill = repo
        .find_by_user_and_type(1, NotificationType::PillReminder)
        .unwrap()
        .unwrap();
    assert!(!pill.enabled);
    assert_eq!(pill.remind_time, evening());
    let ovulation = repo
        .find_by_user_and_type(1, NotificationType::Ovulation)
        .unwrap()
        .unwrap();
    assert!(ovulation.enabled);
    assert_eq!(ovulation.remind_time, morning);
    assert_eq!(repo.find_by_user(1).unwrap().len(), 2);
    assert!(repo.find_by_user(2).unwrap().is_empty());
}
